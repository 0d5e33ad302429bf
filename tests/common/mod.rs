#![allow(dead_code)]

use academia_api::api_routes;
use academia_api::models::Role;
use academia_api::test_support::{TestDatabase, TestRocketBuilder, test_auth_state};
use rocket::http::Header;
use rocket::local::asynchronous::Client;

/// Provision a disposable database and a Rocket client with the full route
/// set mounted. The database must outlive the client.
pub async fn setup() -> (TestDatabase, Client) {
    let db = TestDatabase::new().await.expect("provision test database");

    let client = TestRocketBuilder::new()
        .manage_pg_pool(db.pool_clone())
        .manage_auth_state(test_auth_state())
        .mount_routes(api_routes())
        .async_client()
        .await;

    (db, client)
}

/// Issue an access token the server under test will accept.
pub fn token_for(name_user: &str, role: Role, user_id: i32) -> String {
    test_auth_state()
        .jwt_service
        .issue_access_token(name_user, role, user_id)
        .expect("issue test token")
        .token
}

pub fn bearer(token: &str) -> Header<'static> {
    Header::new("Authorization", format!("Bearer {token}"))
}
