use rocket::http::Status;
use rocket::response::{self, Responder};
use rocket::{Request, Response};
use rocket_db_pools::sqlx;
use rocket_okapi::r#gen::OpenApiGenerator;
use rocket_okapi::okapi::openapi3::{RefOr, Response as OpenApiResponse, Responses};
use rocket_okapi::response::OpenApiResponderInner;
use serde::Serialize;
use std::io::Cursor;

use crate::auth::AuthError;

/// Error taxonomy for resource routes. Each variant maps to a stable status
/// code; bodies are JSON `{error, message}`.
#[derive(Debug)]
pub enum ApiError {
    Unauthenticated(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    Validation(String),
    Database(sqlx::Error),
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let (status, error_type, message) = match self {
            ApiError::Unauthenticated(msg) => {
                log::debug!("unauthenticated: {}", msg);
                (Status::Unauthorized, "Unauthenticated", msg)
            }
            ApiError::Forbidden(msg) => {
                log::debug!("forbidden: {}", msg);
                (Status::Forbidden, "Forbidden", msg)
            }
            ApiError::NotFound(msg) => {
                log::debug!("not found: {}", msg);
                (Status::NotFound, "NotFound", msg)
            }
            ApiError::Conflict(msg) => {
                log::debug!("conflict: {}", msg);
                (Status::Conflict, "Conflict", msg)
            }
            ApiError::Validation(msg) => {
                log::debug!("validation error: {}", msg);
                (Status::UnprocessableEntity, "ValidationError", msg)
            }
            ApiError::Database(e) => {
                log::error!("database error: {}", e);
                (Status::InternalServerError, "InternalError", e.to_string())
            }
            ApiError::Internal(msg) => {
                log::error!("internal error: {}", msg);
                (Status::InternalServerError, "InternalError", msg)
            }
        };

        let error_response = ErrorResponse {
            error: error_type.to_string(),
            message,
        };

        let json = serde_json::to_string(&error_response).unwrap_or_else(|_| {
            r#"{"error":"SerializationError","message":"Failed to serialize error"}"#.to_string()
        });

        let mut builder = Response::build();
        builder
            .status(status)
            .header(rocket::http::ContentType::JSON)
            .sized_body(json.len(), Cursor::new(json));

        if status == Status::Unauthorized {
            builder.raw_header("WWW-Authenticate", "Bearer");
        }

        builder.ok()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        if matches!(err, sqlx::Error::RowNotFound) {
            return ApiError::NotFound("Resource not found".to_string());
        }

        // Unique-constraint violations surface as conflicts, not 500s.
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().map(|code| code == "23505").unwrap_or(false) {
                return ApiError::Conflict("A record with these unique fields already exists".to_string());
            }
        }

        ApiError::Database(err)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err.status().code {
            401 => ApiError::Unauthenticated(err.to_string()),
            403 => ApiError::Forbidden(err.to_string()),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

impl OpenApiResponderInner for ApiError {
    fn responses(_gen: &mut OpenApiGenerator) -> rocket_okapi::Result<Responses> {
        let mut responses = Responses::default();
        for (code, description) in [
            ("401", "Missing, invalid, or expired bearer token."),
            ("403", "Authenticated, but not allowed to perform this action."),
            ("404", "The target resource does not exist."),
            ("409", "Uniqueness or duplicate-enrollment violation."),
            ("422", "Structural or range validation failure."),
            ("500", "Unexpected storage failure; transaction rolled back."),
        ] {
            responses.responses.insert(
                code.to_string(),
                RefOr::Object(OpenApiResponse {
                    description: description.to_string(),
                    ..Default::default()
                }),
            );
        }
        Ok(responses)
    }
}
