use assert_matches::assert_matches;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_config::AppConfig;
use staff_cell::models::{CreateStaffRequest, StaffError, StaffRole};
use staff_cell::services::StaffService;

fn test_config(url: &str) -> AppConfig {
    AppConfig {
        supabase_url: url.to_string(),
        supabase_service_key: "test-service-key".to_string(),
        mail_api_url: String::new(),
        mail_api_key: String::new(),
        mail_from: "x@y.z".to_string(),
        store_timeout_ms: 2000,
        reschedule_revalidates: false,
        port: 3000,
    }
}

fn staff_row(user_id: &str, username: &str, role: &str) -> serde_json::Value {
    json!({
        "id": 7,
        "user_id": user_id,
        "fullname": "Sam Smith",
        "role": role,
        "username": username,
        "email": "sam@clinic.test",
        "contact": "0851234567"
    })
}

#[tokio::test]
async fn fetches_staff_by_business_key() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("user_id", "eq.DOC001"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([staff_row("DOC001", "drsmith", "Doctor")])),
        )
        .mount(&mock_server)
        .await;

    let service = StaffService::new(&test_config(&mock_server.uri()));
    let staff = service.get_staff("DOC001").await.unwrap();

    assert_eq!(staff.username, "drsmith");
    assert_eq!(staff.role, StaffRole::Doctor);
    assert!(staff.role.is_schedulable());
}

#[tokio::test]
async fn missing_staff_maps_to_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let service = StaffService::new(&test_config(&mock_server.uri()));
    let err = service.get_staff("DOC404").await.unwrap_err();

    assert_matches!(err, StaffError::NotFound);
}

#[tokio::test]
async fn create_generates_role_prefixed_user_id() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/users"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!([staff_row("NUR1739", "nursek", "Nurse")])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = StaffService::new(&test_config(&mock_server.uri()));
    let staff = service
        .create_staff(CreateStaffRequest {
            user_id: None,
            fullname: "Kay Nolan".to_string(),
            role: StaffRole::Nurse,
            username: "nursek".to_string(),
            email: None,
            contact: None,
        })
        .await
        .unwrap();

    assert_eq!(staff.user_id, "NUR1739");
}

#[tokio::test]
async fn duplicate_username_maps_to_conflict() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(409).set_body_string(
            r#"{"code":"23505","message":"duplicate key value violates unique constraint"}"#,
        ))
        .mount(&mock_server)
        .await;

    let service = StaffService::new(&test_config(&mock_server.uri()));
    let err = service
        .create_staff(CreateStaffRequest {
            user_id: Some("DOC002".to_string()),
            fullname: "Sam Smith".to_string(),
            role: StaffRole::Doctor,
            username: "drsmith".to_string(),
            email: None,
            contact: None,
        })
        .await
        .unwrap_err();

    assert_matches!(err, StaffError::UsernameTaken(u) if u == "drsmith");
}

#[tokio::test]
async fn deleting_missing_staff_is_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/users"))
        .and(query_param("id", "eq.42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let service = StaffService::new(&test_config(&mock_server.uri()));
    let err = service.delete_staff(42).await.unwrap_err();

    assert_matches!(err, StaffError::NotFound);
}

#[tokio::test]
async fn delete_reports_success_only_when_a_row_went_away() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/users"))
        .and(query_param("id", "eq.7"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([staff_row("DOC001", "drsmith", "Doctor")])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = StaffService::new(&test_config(&mock_server.uri()));
    service.delete_staff(7).await.unwrap();
}
