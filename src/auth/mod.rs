//! Authentication and authorization: configuration, credential handling,
//! token minting, Rocket request guards, and the access-control policy.

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod guards;
pub mod jwt;
pub mod passwords;
pub mod policy;
pub mod responses;
pub mod routes;

pub use config::AuthConfig;
pub use error::{AuthError, AuthResult};
pub use guards::{AuthUser, RequireAdmin, RequireProfessor};
pub use jwt::JwtService;
pub use passwords::PasswordService;
pub use policy::{Access, Actor, Resource, authorize};

#[derive(Clone)]
pub struct AuthState {
    pub config: AuthConfig,
    pub password_service: Arc<PasswordService>,
    pub jwt_service: Arc<JwtService>,
}

impl AuthState {
    pub fn new(
        config: AuthConfig,
        password_service: PasswordService,
        jwt_service: JwtService,
    ) -> Self {
        Self {
            config,
            password_service: Arc::new(password_service),
            jwt_service: Arc::new(jwt_service),
        }
    }

    /// Build the full auth state from environment configuration.
    pub fn from_env() -> AuthResult<Self> {
        let config = AuthConfig::from_env()?;
        let password_service = PasswordService::new()?;
        let jwt_service = JwtService::from_config(&config)?;
        Ok(Self::new(config, password_service, jwt_service))
    }
}
