mod common;

use academia_api::models::{Calificacion, CalificacionTipo, Role};
use academia_api::test_support::TestFixtures;
use common::{bearer, setup, token_for};
use rocket::http::{ContentType, Status};
use serde_json::json;

struct Seeded {
    prof: i32,
    rival: i32,
    ana: i32,
    score: i32,
}

async fn seed(fixtures: &TestFixtures<'_>) -> Seeded {
    let prof = fixtures
        .insert_user(
            "prof",
            "7777777",
            "prof@x.com",
            Role::Professor,
            "unused",
            Some("Química"),
        )
        .await
        .expect("seed professor");
    let rival = fixtures
        .insert_user(
            "rival",
            "8888888",
            "rival@x.com",
            Role::Professor,
            "unused",
            Some("Física"),
        )
        .await
        .expect("seed rival professor");
    let ana = fixtures
        .insert_user("ana", "1234567", "ana@x.com", Role::Student, "unused", None)
        .await
        .expect("seed student");
    let score = fixtures
        .insert_score("Bioquímica", prof)
        .await
        .expect("seed score");

    Seeded {
        prof,
        rival,
        ana,
        score,
    }
}

#[tokio::test]
async fn grade_crud_by_the_issuing_professor() {
    let (db, client) = setup().await;
    let fixtures = TestFixtures::new(db.pool());
    let ids = seed(&fixtures).await;

    let prof_token = token_for("prof", Role::Professor, ids.prof);

    let response = client
        .post("/calificaciones")
        .header(ContentType::JSON)
        .header(bearer(&prof_token))
        .body(
            json!({
                "valor": 88.0,
                "tipo": "parcial",
                "comentario": "Buen desempeño",
                "student_id": ids.ana,
                "score_id": ids.score,
                "professor_id": ids.prof
            })
            .to_string(),
        )
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Created);
    let grade: Calificacion = response.into_json().await.expect("grade payload");
    assert_eq!(grade.valor, 88.0);
    assert_eq!(grade.tipo, CalificacionTipo::Parcial);

    // Public read.
    let response = client
        .get(format!("/calificaciones/{}", grade.calificacion_id))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    // Update by the issuer.
    let response = client
        .patch(format!("/calificaciones/{}", grade.calificacion_id))
        .header(ContentType::JSON)
        .header(bearer(&prof_token))
        .body(json!({"valor": 95.0}).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let updated: Calificacion = response.into_json().await.expect("updated payload");
    assert_eq!(updated.valor, 95.0);

    // Delete by the issuer.
    let response = client
        .delete(format!("/calificaciones/{}", grade.calificacion_id))
        .header(bearer(&prof_token))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NoContent);

    let response = client
        .get(format!("/calificaciones/{}", grade.calificacion_id))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NotFound);

    db.close().await.expect("drop test database");
}

#[tokio::test]
async fn grade_values_outside_range_fail_validation() {
    let (db, client) = setup().await;
    let fixtures = TestFixtures::new(db.pool());
    let ids = seed(&fixtures).await;

    let prof_token = token_for("prof", Role::Professor, ids.prof);

    for valor in [-1.0, 100.5] {
        let response = client
            .post("/calificaciones")
            .header(ContentType::JSON)
            .header(bearer(&prof_token))
            .body(
                json!({
                    "valor": valor,
                    "tipo": "quiz",
                    "student_id": ids.ana,
                    "score_id": ids.score,
                    "professor_id": ids.prof
                })
                .to_string(),
            )
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::UnprocessableEntity);
    }

    // Unknown tipo values are rejected by deserialization.
    let response = client
        .post("/calificaciones")
        .header(ContentType::JSON)
        .header(bearer(&prof_token))
        .body(
            json!({
                "valor": 75.0,
                "tipo": "invalido",
                "student_id": ids.ana,
                "score_id": ids.score,
                "professor_id": ids.prof
            })
            .to_string(),
        )
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::UnprocessableEntity);

    db.close().await.expect("drop test database");
}

#[tokio::test]
async fn grades_are_issued_only_for_owned_subjects() {
    let (db, client) = setup().await;
    let fixtures = TestFixtures::new(db.pool());
    let ids = seed(&fixtures).await;

    // rival does not own the subject.
    let response = client
        .post("/calificaciones")
        .header(ContentType::JSON)
        .header(bearer(&token_for("rival", Role::Professor, ids.rival)))
        .body(
            json!({
                "valor": 50.0,
                "tipo": "tarea",
                "student_id": ids.ana,
                "score_id": ids.score,
                "professor_id": ids.rival
            })
            .to_string(),
        )
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Forbidden);

    // The owner cannot attribute the grade to a colleague either.
    let response = client
        .post("/calificaciones")
        .header(ContentType::JSON)
        .header(bearer(&token_for("prof", Role::Professor, ids.prof)))
        .body(
            json!({
                "valor": 50.0,
                "tipo": "tarea",
                "student_id": ids.ana,
                "score_id": ids.score,
                "professor_id": ids.rival
            })
            .to_string(),
        )
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Forbidden);

    db.close().await.expect("drop test database");
}

#[tokio::test]
async fn grade_mutation_is_restricted_to_the_issuer_or_admin() {
    let (db, client) = setup().await;
    let fixtures = TestFixtures::new(db.pool());
    let ids = seed(&fixtures).await;

    let grade = fixtures
        .insert_calificacion(80.0, CalificacionTipo::Parcial, ids.ana, ids.score, ids.prof)
        .await
        .expect("seed grade");

    let rival_token = token_for("rival", Role::Professor, ids.rival);

    let response = client
        .patch(format!("/calificaciones/{grade}"))
        .header(ContentType::JSON)
        .header(bearer(&rival_token))
        .body(json!({"valor": 10.0}).to_string())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Forbidden);

    let response = client
        .delete(format!("/calificaciones/{grade}"))
        .header(bearer(&rival_token))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Forbidden);

    // An admin can clean up any grade.
    let root = fixtures
        .insert_user("root", "9999999", "root@x.com", Role::Admin, "unused", None)
        .await
        .expect("seed admin");
    let response = client
        .delete(format!("/calificaciones/{grade}"))
        .header(bearer(&token_for("root", Role::Admin, root)))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NoContent);

    db.close().await.expect("drop test database");
}

#[tokio::test]
async fn filtered_listings_by_student_and_subject() {
    let (db, client) = setup().await;
    let fixtures = TestFixtures::new(db.pool());
    let ids = seed(&fixtures).await;

    fixtures
        .insert_calificacion(77.0, CalificacionTipo::Quiz, ids.ana, ids.score, ids.prof)
        .await
        .expect("seed grade");

    // The student sees their own grades.
    let response = client
        .get(format!("/calificaciones/por_estudiante/{}", ids.ana))
        .header(bearer(&token_for("ana", Role::Student, ids.ana)))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let grades: Vec<Calificacion> = response.into_json().await.expect("grades");
    assert_eq!(grades.len(), 1);

    // Another student's record is off limits.
    let benito = fixtures
        .insert_user("benito", "7654321", "benito@x.com", Role::Student, "unused", None)
        .await
        .expect("seed benito");
    let response = client
        .get(format!("/calificaciones/por_estudiante/{}", ids.ana))
        .header(bearer(&token_for("benito", Role::Student, benito)))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Forbidden);

    // Professors may consult any student.
    let response = client
        .get(format!("/calificaciones/por_estudiante/{}", ids.ana))
        .header(bearer(&token_for("rival", Role::Professor, ids.rival)))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    // The per-subject listing is public.
    let response = client
        .get(format!("/calificaciones/por_materia/{}", ids.score))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let grades: Vec<Calificacion> = response.into_json().await.expect("grades");
    assert_eq!(grades.len(), 1);

    let response = client
        .get("/calificaciones/por_materia/999999")
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NotFound);

    db.close().await.expect("drop test database");
}
