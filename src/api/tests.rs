use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::test_support::{fixture_record, json_request, read_json, setup_test_context};

#[tokio::test]
async fn root_and_health() {
    let ctx = setup_test_context(Vec::new()).await;

    let response =
        ctx.app.clone().oneshot(json_request(Method::GET, "/", None, None)).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["message"], "Exam Marking API");
    assert_eq!(body["docs_url"], "/api/v1/docs");

    let response =
        ctx.app.oneshot(json_request(Method::GET, "/healthz", None, None)).await.expect("response");
    let body = read_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["components"]["upstream"], "healthy");
}

#[tokio::test]
async fn metrics_disabled_returns_404() {
    let ctx = setup_test_context(Vec::new()).await;
    let response =
        ctx.app.oneshot(json_request(Method::GET, "/metrics", None, None)).await.expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn sections_pass_through() {
    let ctx = setup_test_context(Vec::new()).await;
    let response = ctx
        .app
        .oneshot(json_request(Method::GET, "/api/v1/sections", None, None))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await, json!([{ "id": 1, "title": "X" }, { "id": 2, "title": "Y" }]));
}

#[tokio::test]
async fn list_marks_returns_view_and_count() {
    let records = (1..=3).map(|id| fixture_record(id, "Asha")).collect();
    let ctx = setup_test_context(records).await;

    let response = ctx
        .app
        .oneshot(json_request(Method::GET, "/api/v1/exams/5/marks?page=1&page_size=2", None, None))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    assert_eq!(body["count"], 3);
    assert_eq!(body["records"].as_array().map(Vec::len), Some(2));
    let first = &body["records"][0];
    assert_eq!(first["selected_paper_id"], 100);
    assert_eq!(first["obtained_marks"], 11.0);
    assert_eq!(first["attendance_status"], "present");
    assert_eq!(first["sections"][0]["attemptable_questions"], 2);
    assert_eq!(first["sections"][0]["question_count"], 3);
}

#[tokio::test]
async fn list_marks_rejects_bad_filters() {
    let ctx = setup_test_context(Vec::new()).await;

    let response = ctx
        .app
        .clone()
        .oneshot(json_request(Method::GET, "/api/v1/exams/5/marks?page=0", None, None))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = ctx
        .app
        .oneshot(json_request(Method::GET, "/api/v1/exams/5/marks?section_id=1,x", None, None))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(response).await["detail"], "Invalid section id 'x'");
}

#[tokio::test]
async fn entry_validation_and_submit_flow() {
    let ctx = setup_test_context(vec![fixture_record(1, "Asha")]).await;
    let load = json_request(Method::GET, "/api/v1/exams/5/marks", None, None);
    assert_eq!(ctx.app.clone().oneshot(load).await.expect("response").status(), StatusCode::OK);

    let entry = |value: &str, question_id: i64| {
        json_request(
            Method::PUT,
            "/api/v1/exams/5/marks/1/entries",
            None,
            Some(json!({ "question_id": question_id, "value": value })),
        )
    };

    let response = ctx.app.clone().oneshot(entry("12", 1)).await.expect("response");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(read_json(response).await["detail"], "Marks cannot be more than 10");

    let response = ctx.app.clone().oneshot(entry("na", 2)).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["marks"], 0.0);
    assert_eq!(body["is_attempted"], false);
    assert_eq!(body["record"]["has_pending_marks"], true);

    let response = ctx.app.clone().oneshot(entry("4", 3)).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let preview = json_request(Method::POST, "/api/v1/exams/5/marks/1/preview", None, None);
    let response = ctx.app.clone().oneshot(preview).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["obtained_marks"], 10.0);
    assert_eq!(body["question_paper_id"], 100);
    assert_eq!(body["question_data"][1], json!({ "question_id": 2, "marks": 0.0, "is_attempted": false }));
    assert!(ctx.gateway.persisted().is_empty());

    let submit = json_request(Method::POST, "/api/v1/exams/5/marks/1/submit", None, None);
    let response = ctx.app.clone().oneshot(submit).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Marks saved");
    assert_eq!(body["cleared_entries"], 2);
    assert_eq!(ctx.gateway.persisted().len(), 1);
}

#[tokio::test]
async fn submit_over_section_cap_is_unprocessable() {
    let ctx = setup_test_context(vec![fixture_record(1, "Asha")]).await;
    let load = json_request(Method::GET, "/api/v1/exams/5/marks", None, None);
    ctx.app.clone().oneshot(load).await.expect("response");

    let entry = json_request(
        Method::PUT,
        "/api/v1/exams/5/marks/1/entries",
        None,
        Some(json!({ "question_id": 3, "value": "2" })),
    );
    ctx.app.clone().oneshot(entry).await.expect("response");

    let submit = json_request(Method::POST, "/api/v1/exams/5/marks/1/submit", None, None);
    let response = ctx.app.oneshot(submit).await.expect("response");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        read_json(response).await["detail"],
        "Section A: Only 2 question(s) can be attempted out of 3. You have attempted 3 questions."
    );
    assert!(ctx.gateway.persisted().is_empty());
}

#[tokio::test]
async fn unknown_record_and_paper() {
    let ctx = setup_test_context(vec![fixture_record(1, "Asha")]).await;
    let load = json_request(Method::GET, "/api/v1/exams/5/marks", None, None);
    ctx.app.clone().oneshot(load).await.expect("response");

    let preview = json_request(Method::POST, "/api/v1/exams/5/marks/9/preview", None, None);
    let response = ctx.app.clone().oneshot(preview).await.expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let select = json_request(
        Method::PUT,
        "/api/v1/exams/5/marks/1/paper",
        None,
        Some(json!({ "question_paper_id": 101 })),
    );
    let response = ctx.app.clone().oneshot(select).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["selected_paper_id"], 101);

    let select = json_request(
        Method::PUT,
        "/api/v1/exams/5/marks/1/paper",
        None,
        Some(json!({ "question_paper_id": 555 })),
    );
    let response = ctx.app.oneshot(select).await.expect("response");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn upstream_rejection_is_bad_gateway() {
    let ctx = setup_test_context(vec![fixture_record(1, "Asha")]).await;
    let load = json_request(Method::GET, "/api/v1/exams/5/marks", None, None);
    ctx.app.clone().oneshot(load).await.expect("response");
    ctx.gateway.reject_next("Exam is locked");

    let submit = json_request(Method::POST, "/api/v1/exams/5/marks/1/submit", None, None);
    let response = ctx.app.oneshot(submit).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(read_json(response).await["detail"], "Exam is locked");
}

#[tokio::test]
async fn attendance_requires_records() {
    let ctx = setup_test_context(vec![fixture_record(1, "Asha")]).await;

    let empty = json_request(
        Method::POST,
        "/api/v1/exams/5/attendance",
        None,
        Some(json!({ "record_ids": [], "attendance_status": "absent" })),
    );
    let response = ctx.app.clone().oneshot(empty).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let update = json_request(
        Method::POST,
        "/api/v1/exams/5/attendance",
        None,
        Some(json!({ "record_ids": [1], "attendance_status": "medical-leave" })),
    );
    let response = ctx.app.oneshot(update).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["updated"], 1);
    assert_eq!(body["attendance_status"], "medical-leave");
}

#[tokio::test]
async fn report_returns_rows() {
    let records = (1..=3).map(|id| fixture_record(id, "Asha")).collect();
    let ctx = setup_test_context(records).await;

    let response = ctx
        .app
        .oneshot(json_request(Method::GET, "/api/v1/exams/5/report?page_size=1", None, None))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    assert_eq!(body["record_count"], 3);
    assert_eq!(body["rows"][0], json!(["Class 8_Section-X_Midterm_Set-SET A"]));
    assert!(body["generated_at"].as_str().is_some_and(|value| value.ends_with('Z')));
}
