//! User account endpoints: registration, profile access, admin management.

use std::ops::DerefMut;

use chrono::{Datelike, NaiveDate};
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::{State, delete, get, patch, post};
use rocket_db_pools::sqlx;
use rocket_okapi::openapi;
use schemars::JsonSchema;
use serde::Deserialize;

use crate::auth::{Access, AuthState, AuthUser, RequireAdmin, Resource, authorize};
use crate::error::ApiError;
use crate::models::{Gender, Role, USER_COLUMNS, User, UserPublic};
use crate::routes::helpers::fetch_user;
use crate::routes::params::PaginationParams;

/// Registration payload. The role decides which role-specific field is
/// required or allowed.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct UserCreate {
    pub name_complete: String,
    pub name_user: String,
    pub cedula: String,
    pub email: String,
    pub gender: Gender,
    pub birth_date: Option<NaiveDate>,
    pub password: String,
    pub role: Role,
    pub specialization: Option<String>,
    pub career: Option<String>,
}

/// Partial update payload. Role and cedula are immutable and deliberately
/// absent here.
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct UserUpdate {
    pub name_complete: Option<String>,
    pub email: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub specialization: Option<String>,
    pub career: Option<String>,
    pub password: Option<String>,
}

pub(crate) fn calculate_age(birth_date: Option<NaiveDate>) -> Option<i32> {
    let birth = birth_date?;
    let today = chrono::Utc::now().date_naive();
    let mut age = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    Some(age)
}

/// Specialization belongs to professors, career to students; anything else
/// fails validation instead of being silently dropped.
fn validate_role_fields(
    role: Role,
    specialization: &Option<String>,
    career: &Option<String>,
) -> Result<(), ApiError> {
    if role == Role::Professor && specialization.as_deref().map_or(true, |s| s.trim().is_empty()) {
        return Err(ApiError::Validation(
            "Especialización requerida para profesores".to_string(),
        ));
    }
    if role != Role::Professor && specialization.is_some() {
        return Err(ApiError::Validation(
            "Solo los profesores tienen especialización".to_string(),
        ));
    }
    if role != Role::Student && career.is_some() {
        return Err(ApiError::Validation(
            "Solo los estudiantes tienen carrera".to_string(),
        ));
    }
    Ok(())
}

fn validate_cedula(cedula: &str) -> Result<(), ApiError> {
    let len = cedula.chars().count();
    if !(7..=12).contains(&len) {
        return Err(ApiError::Validation(
            "La cédula debe tener entre 7 y 12 caracteres".to_string(),
        ));
    }
    Ok(())
}

/// Register a new user. Open to unauthenticated callers.
#[openapi(tag = "Usuarios")]
#[post("/usuarios", data = "<payload>")]
pub async fn create_user(
    state: &State<AuthState>,
    pool: &State<sqlx::PgPool>,
    payload: Json<UserCreate>,
) -> Result<status::Created<Json<UserPublic>>, ApiError> {
    let user = payload.into_inner();

    if user.name_user.trim().is_empty() || user.password.is_empty() {
        return Err(ApiError::Validation(
            "Nombre de usuario y contraseña son requeridos".to_string(),
        ));
    }
    validate_cedula(&user.cedula)?;
    validate_role_fields(user.role, &user.specialization, &user.career)?;

    let hashed_password = state
        .password_service
        .hash_password(&user.password)
        .map_err(ApiError::from)?;
    let age = calculate_age(user.birth_date);

    let mut tx = pool.begin().await?;

    let existing: Option<(i32,)> = sqlx::query_as(
        "SELECT user_id FROM users WHERE email = $1 OR name_user = $2 OR cedula = $3",
    )
    .bind(&user.email)
    .bind(&user.name_user)
    .bind(&user.cedula)
    .fetch_optional(tx.deref_mut())
    .await?;

    if existing.is_some() {
        return Err(ApiError::Conflict(
            "El email, nombre de usuario o cédula ya están registrados".to_string(),
        ));
    }

    let insert = format!(
        "INSERT INTO users \
         (name_complete, name_user, cedula, email, gender, birth_date, age, role, \
          hashed_password, specialization, career) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
         RETURNING {USER_COLUMNS}"
    );
    let created = sqlx::query_as::<_, User>(&insert)
        .bind(&user.name_complete)
        .bind(&user.name_user)
        .bind(&user.cedula)
        .bind(&user.email)
        .bind(user.gender)
        .bind(user.birth_date)
        .bind(age)
        .bind(user.role)
        .bind(&hashed_password)
        .bind(&user.specialization)
        .bind(&user.career)
        .fetch_one(tx.deref_mut())
        .await?;

    tx.commit().await?;

    log::info!("registered user '{}' ({})", created.name_user, created.role.as_str());

    let location = format!("/usuarios/{}", created.user_id);
    Ok(status::Created::new(location).body(Json(UserPublic::from(created))))
}

/// Return the authenticated actor's own public view.
#[openapi(tag = "Usuarios")]
#[get("/usuarios/me")]
pub async fn read_users_me(user: AuthUser) -> Json<UserPublic> {
    Json(UserPublic::from(user.0))
}

/// Fetch a user by id; self or admin only.
#[openapi(tag = "Usuarios")]
#[get("/usuarios/<user_id>")]
pub async fn read_user(
    user_id: i32,
    pool: &State<sqlx::PgPool>,
    current: AuthUser,
) -> Result<Json<UserPublic>, ApiError> {
    authorize(&current.actor(), Access::Read, &Resource::User { user_id })?;
    let user = fetch_user(pool.inner(), user_id).await?;
    Ok(Json(UserPublic::from(user)))
}

/// Partially update a user; self or admin only.
#[openapi(tag = "Usuarios")]
#[patch("/usuarios/<user_id>", data = "<payload>")]
pub async fn update_user(
    user_id: i32,
    payload: Json<UserUpdate>,
    state: &State<AuthState>,
    pool: &State<sqlx::PgPool>,
    current: AuthUser,
) -> Result<Json<UserPublic>, ApiError> {
    authorize(&current.actor(), Access::Update, &Resource::User { user_id })?;

    let update = payload.into_inner();
    let mut tx = pool.begin().await?;

    let select = format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = $1");
    let mut user = sqlx::query_as::<_, User>(&select)
        .bind(user_id)
        .fetch_optional(tx.deref_mut())
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Usuario con ID {user_id} no encontrado")))?;

    // Role-specific fields are validated against the stored (immutable) role.
    if update.specialization.is_some() && user.role != Role::Professor {
        return Err(ApiError::Validation(
            "Solo los profesores tienen especialización".to_string(),
        ));
    }
    if update.career.is_some() && user.role != Role::Student {
        return Err(ApiError::Validation(
            "Solo los estudiantes tienen carrera".to_string(),
        ));
    }

    if let Some(email) = &update.email {
        let taken: Option<(i32,)> =
            sqlx::query_as("SELECT user_id FROM users WHERE email = $1 AND user_id != $2")
                .bind(email)
                .bind(user_id)
                .fetch_optional(tx.deref_mut())
                .await?;
        if taken.is_some() {
            return Err(ApiError::Conflict(
                "El email ya está en uso por otro usuario".to_string(),
            ));
        }
        user.email = email.clone();
    }

    if let Some(name_complete) = update.name_complete {
        user.name_complete = name_complete;
    }
    if let Some(birth_date) = update.birth_date {
        user.birth_date = Some(birth_date);
        user.age = calculate_age(Some(birth_date));
    }
    if let Some(specialization) = update.specialization {
        user.specialization = Some(specialization);
    }
    if let Some(career) = update.career {
        user.career = Some(career);
    }
    if let Some(password) = &update.password {
        user.hashed_password = state
            .password_service
            .hash_password(password)
            .map_err(ApiError::from)?;
    }

    sqlx::query(
        "UPDATE users SET name_complete = $1, email = $2, birth_date = $3, age = $4, \
         specialization = $5, career = $6, hashed_password = $7 WHERE user_id = $8",
    )
    .bind(&user.name_complete)
    .bind(&user.email)
    .bind(user.birth_date)
    .bind(user.age)
    .bind(&user.specialization)
    .bind(&user.career)
    .bind(&user.hashed_password)
    .bind(user_id)
    .execute(tx.deref_mut())
    .await?;

    tx.commit().await?;

    Ok(Json(UserPublic::from(user)))
}

/// Delete a user; admin only.
#[openapi(tag = "Usuarios")]
#[delete("/usuarios/<user_id>")]
pub async fn delete_user(
    user_id: i32,
    pool: &State<sqlx::PgPool>,
    _admin: RequireAdmin,
) -> Result<status::NoContent, ApiError> {
    let result = sqlx::query("DELETE FROM users WHERE user_id = $1")
        .bind(user_id)
        .execute(pool.inner())
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound(format!(
            "Usuario con ID {user_id} no encontrado"
        )));
    }

    log::info!("deleted user {}", user_id);
    Ok(status::NoContent)
}

/// List all users; admin only, offset-paginated.
#[openapi(tag = "Usuarios")]
#[get("/usuarios?<params..>")]
pub async fn list_users(
    pool: &State<sqlx::PgPool>,
    params: Option<PaginationParams>,
    current: AuthUser,
) -> Result<Json<Vec<UserPublic>>, ApiError> {
    authorize(&current.actor(), Access::Read, &Resource::UserList)?;

    let params = params.unwrap_or_default();
    let query = format!(
        "SELECT {USER_COLUMNS} FROM users ORDER BY user_id ASC LIMIT $1 OFFSET $2"
    );
    let users = sqlx::query_as::<_, User>(&query)
        .bind(params.limit())
        .bind(params.skip())
        .fetch_all(pool.inner())
        .await?;

    Ok(Json(users.into_iter().map(UserPublic::from).collect()))
}
