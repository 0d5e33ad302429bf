use rocket::form::FromForm;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// OAuth2-style password login form.
#[derive(Debug, FromForm)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Bearer token response for `POST /token`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
}

impl Token {
    pub fn bearer(access_token: String) -> Self {
        Token {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}
