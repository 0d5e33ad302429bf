use chrono::NaiveDate;
use rocket_db_pools::sqlx::FromRow;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// ===== Enumerations (mirrored as Postgres enum types in migrations) =====

/// Roles recognized by the system. The role stored on a user row must always
/// agree with the role claim of any token that resolves to that user.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, rocket_db_pools::sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum Role {
    Student,
    Professor,
    Admin,
}

impl Role {
    /// Parse a role claim. Unknown values are rejected rather than mapped to
    /// a default, so a tampered role claim can never resolve to a user.
    pub fn from_claim(role: &str) -> Option<Self> {
        match role {
            "student" => Some(Role::Student),
            "professor" => Some(Role::Professor),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Professor => "professor",
            Role::Admin => "admin",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, rocket_db_pools::sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_gender", rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

/// Categories of academic evaluations.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, rocket_db_pools::sqlx::Type,
)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "calificacion_tipo", rename_all = "snake_case")]
pub enum CalificacionTipo {
    Parcial,
    NotaFinal,
    Practica,
    Quiz,
    Laboratorio,
    Proyecto,
    Semestral,
    Tarea,
    Presentacion,
}

// ===== User =====

/// Full user row, including the password hash. Never serialized directly;
/// handlers convert to [`UserPublic`] before responding.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub user_id: i32,
    pub name_complete: String,
    pub name_user: String,
    pub cedula: String,
    pub email: String,
    pub gender: Gender,
    pub birth_date: Option<NaiveDate>,
    pub age: Option<i32>,
    pub role: Role,
    pub hashed_password: String,
    pub specialization: Option<String>,
    pub career: Option<String>,
}

/// Column list matching [`User`]'s field order, for explicit SELECTs.
pub const USER_COLUMNS: &str = "user_id, name_complete, name_user, cedula, email, gender, \
     birth_date, age, role, hashed_password, specialization, career";

/// Sanitized user view returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UserPublic {
    pub user_id: i32,
    pub name_complete: String,
    pub name_user: String,
    pub cedula: String,
    pub email: String,
    pub gender: Gender,
    pub birth_date: Option<NaiveDate>,
    pub age: Option<i32>,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub career: Option<String>,
}

impl From<User> for UserPublic {
    fn from(user: User) -> Self {
        UserPublic {
            user_id: user.user_id,
            name_complete: user.name_complete,
            name_user: user.name_user,
            cedula: user.cedula,
            email: user.email,
            gender: user.gender,
            birth_date: user.birth_date,
            age: user.age,
            role: user.role,
            specialization: user.specialization,
            career: user.career,
        }
    }
}

// ===== Score (materia) =====

/// A course owned by exactly one professor.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, FromRow)]
pub struct Score {
    pub score_id: i32,
    pub materia: String,
    pub description: Option<String>,
    pub professor_id: i32,
}

// ===== Calificacion (grade) =====

/// A scored evaluation linking one student, one subject, and the professor
/// who issued it.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, FromRow)]
pub struct Calificacion {
    pub calificacion_id: i32,
    pub valor: f64,
    pub tipo: CalificacionTipo,
    pub fecha: NaiveDate,
    pub comentario: Option<String>,
    pub student_id: i32,
    pub score_id: i32,
    pub professor_id: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_claims_round_trip() {
        for role in [Role::Student, Role::Professor, Role::Admin] {
            assert_eq!(Role::from_claim(role.as_str()), Some(role));
        }
    }

    #[test]
    fn unknown_role_claim_is_rejected() {
        assert_eq!(Role::from_claim("superuser"), None);
        assert_eq!(Role::from_claim(""), None);
        assert_eq!(Role::from_claim("Admin"), None);
    }

    #[test]
    fn public_view_drops_password_hash() {
        let user = User {
            user_id: 7,
            name_complete: "Ana María".into(),
            name_user: "ana".into(),
            cedula: "1234567".into(),
            email: "ana@x.com".into(),
            gender: Gender::Female,
            birth_date: None,
            age: None,
            role: Role::Student,
            hashed_password: "$argon2id$not-a-real-hash".into(),
            specialization: None,
            career: Some("Ingeniería".into()),
        };

        let public = UserPublic::from(user);
        let json = serde_json::to_value(&public).expect("serializable");
        assert!(json.get("hashed_password").is_none());
        assert_eq!(json["name_user"], "ana");
        assert_eq!(json["career"], "Ingeniería");
    }

    #[test]
    fn calificacion_tipo_uses_snake_case_wire_names() {
        let json = serde_json::to_string(&CalificacionTipo::NotaFinal).expect("serializable");
        assert_eq!(json, "\"nota_final\"");
        let parsed: CalificacionTipo = serde_json::from_str("\"parcial\"").expect("parses");
        assert_eq!(parsed, CalificacionTipo::Parcial);
    }
}
