//! HTTP surface: status codes and bodies.

use actix_web::http::StatusCode;
use actix_web::test;
use serde_json::{Value, json};

use super::test_helpers::*;

fn submission_body() -> Value {
    json!({
        "user_id": "user-1",
        "problem_slug": PROBLEM,
        "language_id": PYTHON,
        "code": "def solve(a, b):\n    return a + b\n",
    })
}

#[actix_rt::test]
async fn test_submit_then_poll() {
    let env = TestEnv::start(2).await;
    let app = create_test_app(&env).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/submissions")
        .set_json(submission_body())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);

    let created: Value = test::read_body_json(resp).await;
    assert_eq!(created["status"], "processing");
    assert_eq!(created["kind"], "submit");
    assert_eq!(created["test_cases"].as_array().unwrap().len(), 2);
    let submission_id = created["submission_id"].as_str().unwrap().to_string();

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/submissions/{}", submission_id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let status: Value = test::read_body_json(resp).await;
    assert_eq!(status["status"], "processing");
    assert_eq!(status["total"], 2);
    assert_eq!(status["finished_count"], 0);
}

#[actix_rt::test]
async fn test_run_endpoint_uses_sample() {
    let env = TestEnv::start(4).await;
    let app = create_test_app(&env).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/runs")
        .set_json(submission_body())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);

    let created: Value = test::read_body_json(resp).await;
    assert_eq!(created["kind"], "run");
    assert_eq!(created["test_cases"].as_array().unwrap().len(), 1);
}

#[actix_rt::test]
async fn test_webhook_round_trip_over_http() {
    let catalog = StaticCatalog::default().with_problem(PROBLEM, corpus(1));
    let env = TestEnv::start_with(catalog, Some("hook-secret")).await;
    accept_all(&env.judge).await;
    let app = create_test_app(&env).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/submissions")
        .set_json(submission_body())
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    let result_id = created["test_cases"][0]["result_id"].as_str().unwrap().to_string();
    let submission_id = created["submission_id"].as_str().unwrap().to_string();

    let payload = json!({
        "status": { "id": 3, "description": "Accepted" },
        "stdout": "1\n",
        "time": "0.004",
        "memory": 3140,
        "token": "tok-http",
    });

    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/webhooks/judge/{}?secret=wrong", result_id))
        .set_json(payload.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/webhooks/judge/{}", result_id))
        .set_json(payload.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/webhooks/judge/{}?secret=hook-secret", result_id))
        .set_json(payload.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let ack: Value = test::read_body_json(resp).await;
    assert_eq!(ack["disposition"], "applied");
    assert_eq!(ack["submission_status"], "accepted");

    // Redelivery after finalization is still acknowledged
    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/webhooks/judge/{}?secret=hook-secret", result_id))
        .set_json(payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let ack: Value = test::read_body_json(resp).await;
    assert_eq!(ack["disposition"], "ignored");

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/submissions/{}", submission_id))
        .to_request();
    let status: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(status["status"], "accepted");
    assert_eq!(status["test_cases"][0]["time_seconds"], 0.004);
}

#[actix_rt::test]
async fn test_unknown_and_malformed_ids() {
    let env = TestEnv::start(1).await;
    let app = create_test_app(&env).await;

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/submissions/{}", uuid::Uuid::now_v7()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "NOT_FOUND");

    let req = test::TestRequest::get()
        .uri("/api/v1/submissions/not-a-uuid")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/webhooks/judge/{}", uuid::Uuid::now_v7()))
        .set_json(json!({ "status": { "id": 3 } }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn test_malformed_bodies_rejected() {
    let env = TestEnv::start(1).await;
    let app = create_test_app(&env).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/submissions")
        .insert_header(("content-type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "VALIDATION_ERROR");

    let mut missing_code = submission_body();
    missing_code["code"] = json!("");
    let req = test::TestRequest::post()
        .uri("/api/v1/submissions")
        .set_json(missing_code)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/webhooks/judge/{}", uuid::Uuid::now_v7()))
        .insert_header(("content-type", "application/json"))
        .set_payload("")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::put()
        .uri(&format!("/api/v1/webhooks/judge/{}", uuid::Uuid::now_v7()))
        .insert_header(("content-type", "application/json"))
        .set_payload("{\"status\": ")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_rt::test]
async fn test_list_and_health() {
    let env = TestEnv::start(1).await;
    let app = create_test_app(&env).await;

    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri("/api/v1/submissions")
            .set_json(submission_body())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
    }

    let req = test::TestRequest::get()
        .uri("/api/v1/submissions?user_id=user-1&limit=1")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let page: Value = test::read_body_json(resp).await;
    assert_eq!(page["submissions"].as_array().unwrap().len(), 1);
    assert_eq!(page["pagination"]["total"], 2);

    let req = test::TestRequest::get()
        .uri("/api/v1/submissions?status=bogus")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get().uri("/api/v1/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get().uri("/api/v1/ready").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}
