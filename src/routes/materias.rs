//! Subject (materia) endpoints: CRUD plus enrollment management.

use rocket::response::status;
use rocket::serde::json::Json;
use rocket::{State, delete, get, patch, post};
use rocket_db_pools::sqlx;
use rocket_okapi::openapi;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::auth::{Access, AuthUser, RequireProfessor, Resource, authorize};
use crate::error::ApiError;
use crate::models::{Role, Score, USER_COLUMNS, User, UserPublic};
use crate::routes::helpers::{fetch_score, fetch_user_with_role};
use crate::routes::params::PaginationParams;

const MAX_DESCRIPTION_LEN: usize = 500;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ScoreCreate {
    pub materia: String,
    pub description: Option<String>,
    pub professor_id: i32,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ScoreUpdate {
    pub materia: Option<String>,
    pub description: Option<String>,
    pub professor_id: Option<i32>,
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct EnrollResponse {
    pub message: String,
}

fn validate_description(description: &Option<String>) -> Result<(), ApiError> {
    if let Some(text) = description {
        if text.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(ApiError::Validation(
                "La descripción no puede superar 500 caracteres".to_string(),
            ));
        }
    }
    Ok(())
}

/// Create a subject. Professors may only attribute subjects to themselves;
/// admins may create on behalf of any professor.
#[openapi(tag = "Materias")]
#[post("/materias", data = "<payload>")]
pub async fn create_score(
    payload: Json<ScoreCreate>,
    pool: &State<sqlx::PgPool>,
    professor: RequireProfessor,
) -> Result<status::Created<Json<Score>>, ApiError> {
    let score = payload.into_inner();

    if score.materia.trim().is_empty() {
        return Err(ApiError::Validation(
            "El nombre de la materia es requerido".to_string(),
        ));
    }
    validate_description(&score.description)?;

    authorize(
        &professor.0.actor(),
        Access::Create,
        &Resource::SubjectAttribution {
            professor_id: score.professor_id,
        },
    )?;

    // The owning professor must exist and actually hold the professor role.
    fetch_user_with_role(pool.inner(), score.professor_id, Role::Professor).await?;

    let created = sqlx::query_as::<_, Score>(
        "INSERT INTO scores (materia, description, professor_id) VALUES ($1, $2, $3)
         RETURNING score_id, materia, description, professor_id",
    )
    .bind(&score.materia)
    .bind(&score.description)
    .bind(score.professor_id)
    .fetch_one(pool.inner())
    .await?;

    log::info!("created materia '{}' (id {})", created.materia, created.score_id);

    let location = format!("/materias/{}", created.score_id);
    Ok(status::Created::new(location).body(Json(created)))
}

/// List subjects, offset-paginated. Public.
#[openapi(tag = "Materias")]
#[get("/materias?<params..>")]
pub async fn list_scores(
    pool: &State<sqlx::PgPool>,
    params: Option<PaginationParams>,
) -> Result<Json<Vec<Score>>, ApiError> {
    let params = params.unwrap_or_default();
    let scores: Vec<Score> = sqlx::query_as(
        "SELECT score_id, materia, description, professor_id FROM scores
         ORDER BY score_id ASC LIMIT $1 OFFSET $2",
    )
    .bind(params.limit())
    .bind(params.skip())
    .fetch_all(pool.inner())
    .await?;

    Ok(Json(scores))
}

/// Fetch a single subject. Public.
#[openapi(tag = "Materias")]
#[get("/materias/<score_id>")]
pub async fn read_score(
    score_id: i32,
    pool: &State<sqlx::PgPool>,
) -> Result<Json<Score>, ApiError> {
    let score = fetch_score(pool.inner(), score_id).await?;
    Ok(Json(score))
}

/// Update a subject; owning professor or admin.
#[openapi(tag = "Materias")]
#[patch("/materias/<score_id>", data = "<payload>")]
pub async fn update_score(
    score_id: i32,
    payload: Json<ScoreUpdate>,
    pool: &State<sqlx::PgPool>,
    current: AuthUser,
) -> Result<Json<Score>, ApiError> {
    let update = payload.into_inner();
    validate_description(&update.description)?;

    let mut score = fetch_score(pool.inner(), score_id).await?;

    authorize(
        &current.actor(),
        Access::Update,
        &Resource::Subject {
            professor_id: score.professor_id,
        },
    )?;

    if let Some(new_professor_id) = update.professor_id {
        if new_professor_id != score.professor_id {
            // Reassignment attributes the subject to someone else; only an
            // admin passes this check.
            authorize(
                &current.actor(),
                Access::Update,
                &Resource::SubjectAttribution {
                    professor_id: new_professor_id,
                },
            )?;
            fetch_user_with_role(pool.inner(), new_professor_id, Role::Professor).await?;
            score.professor_id = new_professor_id;
        }
    }

    if let Some(materia) = update.materia {
        if materia.trim().is_empty() {
            return Err(ApiError::Validation(
                "El nombre de la materia es requerido".to_string(),
            ));
        }
        score.materia = materia;
    }
    if let Some(description) = update.description {
        score.description = Some(description);
    }

    sqlx::query("UPDATE scores SET materia = $1, description = $2, professor_id = $3 WHERE score_id = $4")
        .bind(&score.materia)
        .bind(&score.description)
        .bind(score.professor_id)
        .bind(score_id)
        .execute(pool.inner())
        .await?;

    Ok(Json(score))
}

/// Delete a subject; owning professor or admin. Enrollments and grades for
/// the subject go with it (FK cascade, single statement, atomic).
#[openapi(tag = "Materias")]
#[delete("/materias/<score_id>")]
pub async fn delete_score(
    score_id: i32,
    pool: &State<sqlx::PgPool>,
    current: AuthUser,
) -> Result<status::NoContent, ApiError> {
    let score = fetch_score(pool.inner(), score_id).await?;

    authorize(
        &current.actor(),
        Access::Delete,
        &Resource::Subject {
            professor_id: score.professor_id,
        },
    )?;

    sqlx::query("DELETE FROM scores WHERE score_id = $1")
        .bind(score_id)
        .execute(pool.inner())
        .await?;

    log::info!("deleted materia {}", score_id);
    Ok(status::NoContent)
}

/// Enroll a student in a subject; subject owner or admin. Enrolling the
/// same student twice is a conflict.
#[openapi(tag = "Materias")]
#[post("/materias/<score_id>/inscribir?<student_id>")]
pub async fn enroll_student(
    score_id: i32,
    student_id: i32,
    pool: &State<sqlx::PgPool>,
    current: AuthUser,
) -> Result<Json<EnrollResponse>, ApiError> {
    let score = fetch_score(pool.inner(), score_id).await?;

    authorize(
        &current.actor(),
        Access::Create,
        &Resource::Enrollment {
            subject_owner_id: score.professor_id,
        },
    )?;

    let student = fetch_user_with_role(pool.inner(), student_id, Role::Student).await?;

    // The composite primary key turns a duplicate enrollment into a 23505,
    // which the error mapping reports as a conflict.
    sqlx::query("INSERT INTO student_score_link (student_id, score_id) VALUES ($1, $2)")
        .bind(student_id)
        .bind(score_id)
        .execute(pool.inner())
        .await?;

    Ok(Json(EnrollResponse {
        message: format!(
            "Estudiante '{}' inscrito en '{}'",
            student.name_user, score.materia
        ),
    }))
}

/// List the students enrolled in a subject; subject owner or admin.
#[openapi(tag = "Materias")]
#[get("/materias/<score_id>/estudiantes")]
pub async fn list_enrolled_students(
    score_id: i32,
    pool: &State<sqlx::PgPool>,
    current: AuthUser,
) -> Result<Json<Vec<UserPublic>>, ApiError> {
    let score = fetch_score(pool.inner(), score_id).await?;

    authorize(
        &current.actor(),
        Access::Read,
        &Resource::Enrollment {
            subject_owner_id: score.professor_id,
        },
    )?;

    let query = format!(
        "SELECT {USER_COLUMNS} FROM users
         JOIN student_score_link ON student_score_link.student_id = users.user_id
         WHERE student_score_link.score_id = $1
         ORDER BY users.user_id ASC"
    );
    let students = sqlx::query_as::<_, User>(&query)
        .bind(score_id)
        .fetch_all(pool.inner())
        .await?;

    Ok(Json(students.into_iter().map(UserPublic::from).collect()))
}

/// Remove a student's enrollment; subject owner or admin.
#[openapi(tag = "Materias")]
#[delete("/materias/<score_id>/estudiantes/<student_id>")]
pub async fn unenroll_student(
    score_id: i32,
    student_id: i32,
    pool: &State<sqlx::PgPool>,
    current: AuthUser,
) -> Result<status::NoContent, ApiError> {
    let score = fetch_score(pool.inner(), score_id).await?;

    authorize(
        &current.actor(),
        Access::Delete,
        &Resource::Enrollment {
            subject_owner_id: score.professor_id,
        },
    )?;

    let result = sqlx::query(
        "DELETE FROM student_score_link WHERE student_id = $1 AND score_id = $2",
    )
    .bind(student_id)
    .bind(score_id)
    .execute(pool.inner())
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::NotFound(format!(
            "El estudiante {student_id} no está inscrito en la materia {score_id}"
        )));
    }

    Ok(status::NoContent)
}
