use rocket::State;
use rocket::form::Form;
use rocket::serde::json::Json;
use rocket::post;
use rocket_db_pools::sqlx;

use crate::auth::AuthState;
use crate::auth::responses::{LoginRequest, Token};
use crate::error::ApiError;
use crate::models::{USER_COLUMNS, User};

/// Exchange a username/password form for a bearer access token.
///
/// Unknown usernames and wrong passwords are indistinguishable to the
/// caller; both yield 401.
#[post("/token", data = "<form>")]
pub async fn login_for_access_token(
    state: &State<AuthState>,
    pool: &State<sqlx::PgPool>,
    form: Form<LoginRequest>,
) -> Result<Json<Token>, ApiError> {
    let username = form.username.trim();
    if username.is_empty() || form.password.is_empty() {
        return Err(ApiError::Unauthenticated("Credenciales inválidas".to_string()));
    }

    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE name_user = $1");
    let user = sqlx::query_as::<_, User>(&query)
        .bind(username)
        .fetch_optional(pool.inner())
        .await?;

    let Some(user) = user else {
        return Err(ApiError::Unauthenticated("Credenciales inválidas".to_string()));
    };

    let verified = state
        .password_service
        .verify_password(&form.password, &user.hashed_password)
        .map_err(ApiError::from)?;

    if !verified {
        return Err(ApiError::Unauthenticated("Credenciales inválidas".to_string()));
    }

    let signed = state
        .jwt_service
        .issue_access_token(&user.name_user, user.role, user.user_id)
        .map_err(ApiError::from)?;

    log::info!("issued access token for '{}'", user.name_user);

    Ok(Json(Token::bearer(signed.token)))
}
