//! Grade (calificación) endpoints: CRUD plus per-student and per-subject
//! listings.

use chrono::NaiveDate;
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::{State, delete, get, patch, post};
use rocket_db_pools::sqlx;
use rocket_okapi::openapi;
use schemars::JsonSchema;
use serde::Deserialize;

use crate::auth::{Access, AuthUser, RequireProfessor, Resource, authorize};
use crate::error::ApiError;
use crate::models::{Calificacion, CalificacionTipo, Role};
use crate::routes::helpers::{fetch_calificacion, fetch_score, fetch_user, fetch_user_with_role};

const MAX_COMENTARIO_LEN: usize = 500;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CalificacionCreate {
    pub valor: f64,
    pub tipo: CalificacionTipo,
    /// Defaults to the current date when omitted.
    pub fecha: Option<NaiveDate>,
    pub comentario: Option<String>,
    pub student_id: i32,
    pub score_id: i32,
    pub professor_id: i32,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct CalificacionUpdate {
    pub valor: Option<f64>,
    pub tipo: Option<CalificacionTipo>,
    pub fecha: Option<NaiveDate>,
    pub comentario: Option<String>,
}

fn validate_valor(valor: f64) -> Result<(), ApiError> {
    if !valor.is_finite() || !(0.0..=100.0).contains(&valor) {
        return Err(ApiError::Validation(
            "El valor de la calificación debe estar entre 0 y 100".to_string(),
        ));
    }
    Ok(())
}

fn validate_comentario(comentario: &Option<String>) -> Result<(), ApiError> {
    if let Some(text) = comentario {
        if text.chars().count() > MAX_COMENTARIO_LEN {
            return Err(ApiError::Validation(
                "El comentario no puede superar 500 caracteres".to_string(),
            ));
        }
    }
    Ok(())
}

/// Issue a grade. A professor may only grade subjects they own and only in
/// their own name; admins may issue on behalf of any professor.
#[openapi(tag = "Calificaciones")]
#[post("/calificaciones", data = "<payload>")]
pub async fn create_calificacion(
    payload: Json<CalificacionCreate>,
    pool: &State<sqlx::PgPool>,
    professor: RequireProfessor,
) -> Result<status::Created<Json<Calificacion>>, ApiError> {
    let grade = payload.into_inner();

    validate_valor(grade.valor)?;
    validate_comentario(&grade.comentario)?;

    let score = fetch_score(pool.inner(), grade.score_id).await?;
    fetch_user_with_role(pool.inner(), grade.student_id, Role::Student).await?;
    fetch_user_with_role(pool.inner(), grade.professor_id, Role::Professor).await?;

    authorize(
        &professor.0.actor(),
        Access::Create,
        &Resource::GradeIssuance {
            professor_id: grade.professor_id,
            subject_owner_id: score.professor_id,
        },
    )?;

    let fecha = grade
        .fecha
        .unwrap_or_else(|| chrono::Utc::now().date_naive());

    let created = sqlx::query_as::<_, Calificacion>(
        "INSERT INTO calificaciones (valor, tipo, fecha, comentario, student_id, score_id, professor_id)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         RETURNING calificacion_id, valor, tipo, fecha, comentario, student_id, score_id, professor_id",
    )
    .bind(grade.valor)
    .bind(grade.tipo)
    .bind(fecha)
    .bind(&grade.comentario)
    .bind(grade.student_id)
    .bind(grade.score_id)
    .bind(grade.professor_id)
    .fetch_one(pool.inner())
    .await?;

    log::info!(
        "issued calificacion {} for student {} in materia {}",
        created.calificacion_id,
        created.student_id,
        created.score_id
    );

    let location = format!("/calificaciones/{}", created.calificacion_id);
    Ok(status::Created::new(location).body(Json(created)))
}

/// Fetch a single grade. Public.
#[openapi(tag = "Calificaciones")]
#[get("/calificaciones/<calificacion_id>")]
pub async fn read_calificacion(
    calificacion_id: i32,
    pool: &State<sqlx::PgPool>,
) -> Result<Json<Calificacion>, ApiError> {
    let grade = fetch_calificacion(pool.inner(), calificacion_id).await?;
    Ok(Json(grade))
}

/// Update a grade; issuing professor or admin.
#[openapi(tag = "Calificaciones")]
#[patch("/calificaciones/<calificacion_id>", data = "<payload>")]
pub async fn update_calificacion(
    calificacion_id: i32,
    payload: Json<CalificacionUpdate>,
    pool: &State<sqlx::PgPool>,
    current: AuthUser,
) -> Result<Json<Calificacion>, ApiError> {
    let update = payload.into_inner();

    if let Some(valor) = update.valor {
        validate_valor(valor)?;
    }
    validate_comentario(&update.comentario)?;

    let mut grade = fetch_calificacion(pool.inner(), calificacion_id).await?;

    authorize(
        &current.actor(),
        Access::Update,
        &Resource::Grade {
            professor_id: grade.professor_id,
        },
    )?;

    if let Some(valor) = update.valor {
        grade.valor = valor;
    }
    if let Some(tipo) = update.tipo {
        grade.tipo = tipo;
    }
    if let Some(fecha) = update.fecha {
        grade.fecha = fecha;
    }
    if let Some(comentario) = update.comentario {
        grade.comentario = Some(comentario);
    }

    sqlx::query(
        "UPDATE calificaciones SET valor = $1, tipo = $2, fecha = $3, comentario = $4
         WHERE calificacion_id = $5",
    )
    .bind(grade.valor)
    .bind(grade.tipo)
    .bind(grade.fecha)
    .bind(&grade.comentario)
    .bind(calificacion_id)
    .execute(pool.inner())
    .await?;

    Ok(Json(grade))
}

/// Delete a grade; issuing professor or admin.
#[openapi(tag = "Calificaciones")]
#[delete("/calificaciones/<calificacion_id>")]
pub async fn delete_calificacion(
    calificacion_id: i32,
    pool: &State<sqlx::PgPool>,
    current: AuthUser,
) -> Result<status::NoContent, ApiError> {
    let grade = fetch_calificacion(pool.inner(), calificacion_id).await?;

    authorize(
        &current.actor(),
        Access::Delete,
        &Resource::Grade {
            professor_id: grade.professor_id,
        },
    )?;

    sqlx::query("DELETE FROM calificaciones WHERE calificacion_id = $1")
        .bind(calificacion_id)
        .execute(pool.inner())
        .await?;

    log::info!("deleted calificacion {}", calificacion_id);
    Ok(status::NoContent)
}

/// List one student's grades. The student themself, any professor, or an
/// admin.
#[openapi(tag = "Calificaciones")]
#[get("/calificaciones/por_estudiante/<student_id>")]
pub async fn list_by_student(
    student_id: i32,
    pool: &State<sqlx::PgPool>,
    current: AuthUser,
) -> Result<Json<Vec<Calificacion>>, ApiError> {
    authorize(
        &current.actor(),
        Access::Read,
        &Resource::StudentGrades { student_id },
    )?;

    fetch_user(pool.inner(), student_id).await?;

    let grades: Vec<Calificacion> = sqlx::query_as(
        "SELECT calificacion_id, valor, tipo, fecha, comentario, student_id, score_id, professor_id
         FROM calificaciones WHERE student_id = $1 ORDER BY fecha DESC, calificacion_id DESC",
    )
    .bind(student_id)
    .fetch_all(pool.inner())
    .await?;

    Ok(Json(grades))
}

/// List a subject's grades. Public.
#[openapi(tag = "Calificaciones")]
#[get("/calificaciones/por_materia/<score_id>")]
pub async fn list_by_score(
    score_id: i32,
    pool: &State<sqlx::PgPool>,
) -> Result<Json<Vec<Calificacion>>, ApiError> {
    fetch_score(pool.inner(), score_id).await?;

    let grades: Vec<Calificacion> = sqlx::query_as(
        "SELECT calificacion_id, valor, tipo, fecha, comentario, student_id, score_id, professor_id
         FROM calificaciones WHERE score_id = $1 ORDER BY fecha DESC, calificacion_id DESC",
    )
    .bind(score_id)
    .fetch_all(pool.inner())
    .await?;

    Ok(Json(grades))
}
