use rocket::Request;
use rocket::State;
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use rocket_db_pools::sqlx;
use rocket_okapi::r#gen::OpenApiGenerator;
use rocket_okapi::okapi::openapi3::{
    Object, SecurityRequirement, SecurityScheme, SecuritySchemeData,
};
use rocket_okapi::request::{OpenApiFromRequest, RequestHeaderInput};

use crate::auth::policy::Actor;
use crate::auth::{AuthError, AuthResult, AuthState};
use crate::models::{Role, USER_COLUMNS, User};

/// The identity resolved from a validated bearer token. Holds the full user
/// row; handlers derive sanitized views from it.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl AuthUser {
    pub fn id(&self) -> i32 {
        self.0.user_id
    }

    pub fn role(&self) -> Role {
        self.0.role
    }

    pub fn is_admin(&self) -> bool {
        matches!(self.0.role, Role::Admin)
    }

    pub fn actor(&self) -> Actor {
        Actor {
            user_id: self.0.user_id,
            role: self.0.role,
        }
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthUser {
    type Error = AuthError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match resolve_identity(request).await {
            Ok(user) => Outcome::Success(user),
            Err(err) => Outcome::Error((err.status(), err)),
        }
    }
}

/// Guard for admin-only routes; 403 for any other authenticated role.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub AuthUser);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for RequireAdmin {
    type Error = AuthError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match AuthUser::from_request(request).await {
            Outcome::Success(user) => {
                if user.is_admin() {
                    Outcome::Success(RequireAdmin(user))
                } else {
                    Outcome::Error((Status::Forbidden, AuthError::Forbidden))
                }
            }
            Outcome::Error(err) => Outcome::Error(err),
            Outcome::Forward(_) => Outcome::Error((Status::Unauthorized, AuthError::Unauthorized)),
        }
    }
}

/// Guard for routes reserved to professors or admins.
#[derive(Debug, Clone)]
pub struct RequireProfessor(pub AuthUser);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for RequireProfessor {
    type Error = AuthError;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match AuthUser::from_request(request).await {
            Outcome::Success(user) => match user.role() {
                Role::Professor | Role::Admin => Outcome::Success(RequireProfessor(user)),
                Role::Student => Outcome::Error((Status::Forbidden, AuthError::Forbidden)),
            },
            Outcome::Error(err) => Outcome::Error(err),
            Outcome::Forward(_) => Outcome::Error((Status::Unauthorized, AuthError::Unauthorized)),
        }
    }
}

async fn resolve_identity(request: &Request<'_>) -> AuthResult<AuthUser> {
    let token = bearer_token_from_request(request)?;

    let auth_state = request
        .guard::<&State<AuthState>>()
        .await
        .succeeded()
        .ok_or_else(|| AuthError::Config("AuthState missing from state".into()))?;

    let pool = request
        .guard::<&State<sqlx::PgPool>>()
        .await
        .succeeded()
        .ok_or_else(|| AuthError::Config("database pool missing from state".into()))?;

    let claims = auth_state.jwt_service.decode_access_token(token)?;

    // Resolution is keyed by the exact claimed role: a token claiming one
    // role never matches a user stored under another, so role confusion
    // cannot impersonate across the role boundary.
    let role = Role::from_claim(&claims.role).ok_or(AuthError::UnknownRole)?;

    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE name_user = $1 AND role = $2");
    let user = sqlx::query_as::<_, User>(&query)
        .bind(&claims.sub)
        .bind(role)
        .fetch_optional(pool.inner())
        .await?
        .ok_or(AuthError::UserNotFound)?;

    Ok(AuthUser(user))
}

fn bearer_token_from_request<'a>(request: &'a Request<'_>) -> AuthResult<&'a str> {
    let header = request
        .headers()
        .get_one("Authorization")
        .ok_or(AuthError::Unauthorized)?;
    parse_bearer(header).ok_or(AuthError::Unauthorized)
}

fn parse_bearer(header: &str) -> Option<&str> {
    let mut parts = header.splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let token = parts.next().unwrap_or_default();
    if scheme.eq_ignore_ascii_case("Bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

fn bearer_security() -> rocket_okapi::Result<RequestHeaderInput> {
    let scheme = SecurityScheme {
        description: Some("JWT access token obtained from POST /token.".to_owned()),
        data: SecuritySchemeData::Http {
            scheme: "bearer".to_owned(),
            bearer_format: Some("JWT".to_owned()),
        },
        extensions: Object::default(),
    };
    let mut requirement = SecurityRequirement::new();
    requirement.insert("bearer_token".to_owned(), Vec::new());
    Ok(RequestHeaderInput::Security(
        "bearer_token".to_owned(),
        scheme,
        requirement,
    ))
}

impl<'r> OpenApiFromRequest<'r> for AuthUser {
    fn from_request_input(
        _gen: &mut OpenApiGenerator,
        _name: String,
        _required: bool,
    ) -> rocket_okapi::Result<RequestHeaderInput> {
        bearer_security()
    }
}

impl<'r> OpenApiFromRequest<'r> for RequireAdmin {
    fn from_request_input(
        _gen: &mut OpenApiGenerator,
        _name: String,
        _required: bool,
    ) -> rocket_okapi::Result<RequestHeaderInput> {
        bearer_security()
    }
}

impl<'r> OpenApiFromRequest<'r> for RequireProfessor {
    fn from_request_input(
        _gen: &mut OpenApiGenerator,
        _name: String,
        _required: bool,
    ) -> rocket_okapi::Result<RequestHeaderInput> {
        bearer_security()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bearer_headers() {
        assert_eq!(parse_bearer("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(parse_bearer("bearer lowercase-scheme"), Some("lowercase-scheme"));
        assert_eq!(parse_bearer("Bearer"), None);
        assert_eq!(parse_bearer("Bearer "), None);
        assert_eq!(parse_bearer("Basic dXNlcjpwYXNz"), None);
    }
}
