//! Requests through the full router: extractor, handlers, and error envelope.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use serde_json::json;

use residence_hub_core::{Role, UserId};
use residence_hub_integration_tests::{TestContext, call, token_for};

#[tokio::test]
async fn health_checks_answer() {
    let ctx = TestContext::new();
    let router = ctx.router();

    let (status, _) = call(&router, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(&router, Method::GET, "/health/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn api_requires_a_known_bearer() {
    let ctx = TestContext::new();
    let router = ctx.router();

    let (status, body) = call(&router, Method::GET, "/api/v1/residences", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = call(
        &router,
        Method::GET,
        "/api/v1/residences",
        Some("not.a.jwt"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let ghost = token_for(UserId::generate());
    let (status, _) = call(
        &router,
        Method::GET,
        "/api/v1/residences",
        Some(&ghost),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn membership_lifecycle_over_http() {
    let ctx = TestContext::new();
    let admin = ctx.user("admin", Role::Admin).await;
    let resident = ctx.user("resident", Role::User).await;
    let admin_token = token_for(admin.id);
    let resident_token = token_for(resident.id);
    let router = ctx.router();

    let (status, body) = call(
        &router,
        Method::POST,
        "/api/v1/residences",
        Some(&admin_token),
        Some(json!({
            "name": "Harbour View",
            "code": "RES-100",
            "city": "Porto",
            "type": "apartment"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["type"], "apartment");
    let residence_id = body["data"]["id"].as_str().unwrap().to_owned();

    let (status, body) = call(
        &router,
        Method::POST,
        &format!("/api/v1/residences/{residence_id}/join"),
        Some(&resident_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["joinStatus"], "PENDING");
    let membership_id = body["data"]["id"].as_str().unwrap().to_owned();

    let (status, _) = call(
        &router,
        Method::GET,
        &format!("/api/v1/residences/{residence_id}/pending"),
        Some(&resident_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(
        &router,
        Method::GET,
        &format!("/api/v1/residences/{residence_id}/pending"),
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["meta"]["totalCount"], 1);

    let (status, _) = call(
        &router,
        Method::PATCH,
        &format!("/api/v1/memberships/{membership_id}"),
        Some(&admin_token),
        Some(json!({ "joinStatus": "PENDING" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(
        &router,
        Method::PATCH,
        &format!("/api/v1/memberships/{membership_id}"),
        Some(&admin_token),
        Some(json!({ "joinStatus": "APPROVED" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["joinStatus"], "APPROVED");

    let (status, body) = call(
        &router,
        Method::GET,
        "/api/v1/memberships/mine",
        Some(&resident_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([residence_id]));
}

#[tokio::test]
async fn unknown_membership_is_not_found() {
    let ctx = TestContext::new();
    let admin = ctx.user("admin", Role::Admin).await;
    let router = ctx.router();

    let (status, body) = call(
        &router,
        Method::PATCH,
        &format!("/api/v1/memberships/{}", UserId::generate()),
        Some(&token_for(admin.id)),
        Some(json!({ "joinStatus": "APPROVED" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "membership not found");
}

#[tokio::test]
async fn malformed_path_id_is_a_bad_request() {
    let ctx = TestContext::new();
    let admin = ctx.user("admin", Role::Admin).await;
    let router = ctx.router();

    let (status, body) = call(
        &router,
        Method::GET,
        "/api/v1/news/not-a-uuid",
        Some(&token_for(admin.id)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["data"].is_null());
    assert!(!body["message"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn mistyped_body_is_a_bad_request() {
    let ctx = TestContext::new();
    let admin = ctx.user("admin", Role::Admin).await;
    let router = ctx.router();

    let (status, body) = call(
        &router,
        Method::POST,
        "/api/v1/residences",
        Some(&token_for(admin.id)),
        Some(json!({ "code": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn unknown_query_value_is_a_bad_request() {
    let ctx = TestContext::new();
    let user = ctx.user("resident", Role::User).await;
    let router = ctx.router();

    let (status, body) = call(
        &router,
        Method::GET,
        "/api/v1/appointments?status=SOMEDAY",
        Some(&token_for(user.id)),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn reports_filter_by_issue_type() {
    let ctx = TestContext::new();
    let admin = ctx.user("admin", Role::Admin).await;
    let resident = ctx.user("resident", Role::User).await;
    let residence = ctx.residence("RES-900", admin.id).await;
    let admin_token = token_for(admin.id);
    let router = ctx.router();

    let (status, _) = call(
        &router,
        Method::POST,
        "/api/v1/issue-types",
        Some(&token_for(resident.id)),
        Some(json!({ "type": "Plumbing" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(
        &router,
        Method::POST,
        "/api/v1/issue-types",
        Some(&admin_token),
        Some(json!({ "type": "Plumbing" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["type"], "Plumbing");
    let type_id = body["data"]["id"].as_str().unwrap().to_owned();

    for issue_type_id in [json!(type_id), json!(null)] {
        let (status, _) = call(
            &router,
            Method::POST,
            "/api/v1/issue-reports",
            Some(&admin_token),
            Some(json!({
                "residenceId": residence.id,
                "issueTypeId": issue_type_id,
                "description": "Boiler pressure drops overnight"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = call(
        &router,
        Method::GET,
        &format!("/api/v1/issue-reports?issueTypeId={type_id}"),
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["meta"]["totalCount"], 1);
    assert_eq!(body["data"]["data"][0]["issueTypeId"], type_id.as_str());

    let (status, body) = call(
        &router,
        Method::POST,
        "/api/v1/issue-reports",
        Some(&admin_token),
        Some(json!({
            "residenceId": residence.id,
            "issueTypeId": UserId::generate(),
            "description": "Lift is stuck"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "issue type not found");
}
