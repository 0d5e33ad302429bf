mod common;

use academia_api::auth::{AuthConfig, JwtService};
use academia_api::models::Role;
use academia_api::test_support::{TEST_JWT_SECRET, TestFixtures, test_auth_state};
use common::{bearer, setup, token_for};
use rocket::http::{ContentType, Status};
use serde_json::Value;

#[tokio::test]
async fn login_issues_a_bearer_token_and_me_resolves_it() {
    let (db, client) = setup().await;
    let fixtures = TestFixtures::new(db.pool());

    let auth_state = test_auth_state();
    let hash = auth_state
        .password_service
        .hash_password("secreta123")
        .expect("hash password");

    fixtures
        .insert_user("ana", "1234567", "ana@x.com", Role::Student, &hash, None)
        .await
        .expect("seed user");

    // Wrong password is rejected without revealing which field was wrong.
    let response = client
        .post("/token")
        .header(ContentType::Form)
        .body("username=ana&password=equivocada")
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Unauthorized);

    // Correct credentials return a bearer token.
    let response = client
        .post("/token")
        .header(ContentType::Form)
        .body("username=ana&password=secreta123")
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let payload: Value = response.into_json().await.expect("token payload");
    assert_eq!(payload["token_type"], "bearer");
    let token = payload["access_token"].as_str().expect("token string");

    let response = client
        .get("/usuarios/me")
        .header(bearer(token))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let me: Value = response.into_json().await.expect("me payload");
    assert_eq!(me["name_user"], "ana");
    assert!(me.get("hashed_password").is_none());

    db.close().await.expect("drop test database");
}

#[tokio::test]
async fn unknown_usernames_are_unauthorized() {
    let (db, client) = setup().await;

    let response = client
        .post("/token")
        .header(ContentType::Form)
        .body("username=nadie&password=loquesea")
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Unauthorized);

    db.close().await.expect("drop test database");
}

#[tokio::test]
async fn garbage_and_missing_tokens_are_unauthorized() {
    let (db, client) = setup().await;

    let response = client.get("/usuarios/me").dispatch().await;
    assert_eq!(response.status(), Status::Unauthorized);

    let response = client
        .get("/usuarios/me")
        .header(bearer("token_invalido"))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Unauthorized);

    db.close().await.expect("drop test database");
}

#[tokio::test]
async fn expired_tokens_are_unauthorized() {
    let (db, client) = setup().await;
    let fixtures = TestFixtures::new(db.pool());

    let user_id = fixtures
        .insert_user("ana", "1234567", "ana@x.com", Role::Student, "unused", None)
        .await
        .expect("seed user");

    // Same secret as the server, but a TTL far enough in the past to clear
    // the validation leeway.
    let expired_service = JwtService::from_config(&AuthConfig {
        issuer: "https://academia.test".into(),
        audience: "academia-api".into(),
        access_token_ttl_secs: -120,
        jwt_secret: TEST_JWT_SECRET.into(),
    })
    .expect("jwt service");
    let token = expired_service
        .issue_access_token("ana", Role::Student, user_id)
        .expect("issue token");

    let response = client
        .get("/usuarios/me")
        .header(bearer(&token.token))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Unauthorized);

    db.close().await.expect("drop test database");
}

#[tokio::test]
async fn role_claims_resolve_against_the_matching_role_only() {
    let (db, client) = setup().await;
    let fixtures = TestFixtures::new(db.pool());

    let user_id = fixtures
        .insert_user("ana", "1234567", "ana@x.com", Role::Student, "unused", None)
        .await
        .expect("seed user");

    // A token claiming professor for a user stored as student resolves to
    // nothing: no cross-role fallback scan.
    let token = token_for("ana", Role::Professor, user_id);
    let response = client
        .get("/usuarios/me")
        .header(bearer(&token))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Unauthorized);

    // The honest claim works.
    let token = token_for("ana", Role::Student, user_id);
    let response = client
        .get("/usuarios/me")
        .header(bearer(&token))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    db.close().await.expect("drop test database");
}
