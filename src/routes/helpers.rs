//! Shared lookup helpers for Rocket route handlers.

use rocket_db_pools::sqlx::{self, PgPool};

use crate::error::ApiError;
use crate::models::{Calificacion, Role, Score, USER_COLUMNS, User};

/// Load a user by id, or [`ApiError::NotFound`].
pub async fn fetch_user(pool: &PgPool, user_id: i32) -> Result<User, ApiError> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = $1");
    sqlx::query_as::<_, User>(&query)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Usuario con ID {user_id} no encontrado")))
}

/// Load a user by id and require the given role; missing users are 404,
/// role mismatches are 422.
pub async fn fetch_user_with_role(
    pool: &PgPool,
    user_id: i32,
    role: Role,
) -> Result<User, ApiError> {
    let user = fetch_user(pool, user_id).await?;
    if user.role != role {
        return Err(ApiError::Validation(format!(
            "El usuario {user_id} no tiene rol de {}",
            role.as_str()
        )));
    }
    Ok(user)
}

/// Load a subject by id, or [`ApiError::NotFound`].
pub async fn fetch_score(pool: &PgPool, score_id: i32) -> Result<Score, ApiError> {
    sqlx::query_as::<_, Score>(
        "SELECT score_id, materia, description, professor_id FROM scores WHERE score_id = $1",
    )
    .bind(score_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("Materia con ID {score_id} no encontrada")))
}

/// Load a grade by id, or [`ApiError::NotFound`].
pub async fn fetch_calificacion(pool: &PgPool, calificacion_id: i32) -> Result<Calificacion, ApiError> {
    sqlx::query_as::<_, Calificacion>(
        "SELECT calificacion_id, valor, tipo, fecha, comentario, student_id, score_id, professor_id
         FROM calificaciones WHERE calificacion_id = $1",
    )
    .bind(calificacion_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| {
        ApiError::NotFound(format!("Calificación con ID {calificacion_id} no encontrada"))
    })
}
