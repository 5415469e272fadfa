/// Router-level tests driven through `tower::ServiceExt::oneshot`
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use battery_leads_api::api;
use battery_leads_api::config::Config;
use battery_leads_api::db_storage::MemoryStore;
use battery_leads_api::handlers::AppState;
use battery_leads_api::sheets_client::SheetForwarder;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const ADMIN_TOKEN: &str = "test-admin-token";

fn test_config() -> Config {
    Config {
        database_url: "postgres://localhost/test".to_string(),
        port: 3000,
        sheets_web_app_url: None,
        sheets_secret_key: String::new(),
        sheets_timeout_secs: 10,
        admin_api_token: Some(ADMIN_TOKEN.to_string()),
    }
}

fn test_app() -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let state = Arc::new(AppState {
        config: test_config(),
        leads: store.clone(),
        vehicles: store.clone(),
        sheets: SheetForwarder::disabled(),
    });
    (api::app(api::api_routes(), state), store)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let (app, _) = test_app();
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "healthy");
}

#[tokio::test]
async fn test_create_lead_success() {
    let (app, store) = test_app();
    let response = app
        .oneshot(post_json(
            "/api/v1/leads",
            json!({
                "phone": "9876543210",
                "type": "enterprise",
                "payload": {"orgType": "datacentre", "loadEstimate": "25000"}
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Thank you! Our team will contact you shortly.");

    let leads = store.leads();
    assert_eq!(leads.len(), 1);
    assert_eq!(leads[0].score, 100);
}

#[tokio::test]
async fn test_create_lead_missing_fields() {
    let (app, store) = test_app();
    let response = app
        .oneshot(post_json("/api/v1/leads", json!({"type": "contact"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "Missing required fields: phone, type"
    );
    assert!(store.leads().is_empty());
}

#[tokio::test]
async fn test_create_lead_invalid_type() {
    let (app, _) = test_app();
    let response = app
        .oneshot(post_json(
            "/api/v1/leads",
            json!({"phone": "9876543210", "type": "newsletter"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Invalid lead type");
}

#[tokio::test]
async fn test_honeypot_looks_like_success() {
    let (app, store) = test_app();
    let response = app
        .oneshot(post_json(
            "/api/v1/leads",
            json!({"phone": "9876543210", "type": "contact", "website": "http://spam"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["success"], true);
    assert!(store.leads().is_empty());
}

#[tokio::test]
async fn test_whitespace_honeypot_stores_nothing() {
    let (app, store) = test_app();
    let response = app
        .oneshot(post_json(
            "/api/v1/leads",
            json!({"phone": "123", "type": "contact", "website": "   "}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["success"], true);
    assert!(store.leads().is_empty());
}

#[tokio::test]
async fn test_non_string_honeypot_looks_like_success() {
    let (app, store) = test_app();
    let response = app
        .oneshot(post_json(
            "/api/v1/leads",
            json!({"phone": "1", "type": "contact", "website": true}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["success"], true);
    assert!(store.leads().is_empty());
}

#[tokio::test]
async fn test_numeric_phone_is_accepted() {
    let (app, store) = test_app();
    let response = app
        .oneshot(post_json(
            "/api/v1/leads",
            json!({"phone": 9876543210u64, "type": "contact"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let leads = store.leads();
    assert_eq!(leads.len(), 1);
    assert_eq!(leads[0].phone, "9876543210");
}

#[tokio::test]
async fn test_padded_type_is_rejected() {
    let (app, store) = test_app();
    let response = app
        .oneshot(post_json(
            "/api/v1/leads",
            json!({"phone": "1", "type": " contact "}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "Invalid lead type");
    assert!(store.leads().is_empty());
}

#[tokio::test]
async fn test_malformed_json_is_400_with_error_body() {
    let (app, store) = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/leads")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{\"phone\": "))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());
    assert!(store.leads().is_empty());
}

#[tokio::test]
async fn test_store_failure_is_opaque_500() {
    let (app, store) = test_app();
    store.fail_writes(true);

    let response = app
        .oneshot(post_json(
            "/api/v1/leads",
            json!({"phone": "9876543210", "type": "contact"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert!(!body["error"].as_str().unwrap().contains("store rejected"));
}

#[tokio::test]
async fn test_list_leads_requires_admin_token() {
    let (app, _) = test_app();
    let response = app
        .oneshot(Request::builder().uri("/api/v1/leads").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_can_list_and_update_leads() {
    let (app, store) = test_app();

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/v1/leads",
            json!({"phone": "9876543210", "type": "battery_finder"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/leads?status=new")
                .header(header::AUTHORIZATION, format!("Bearer {}", ADMIN_TOKEN))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let listed = body_json(response).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["type"], "battery_finder");

    let id = store.leads()[0].id;
    let response = app
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri(format!("/api/v1/leads/{}", id))
                .header(header::AUTHORIZATION, format!("Bearer {}", ADMIN_TOKEN))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({"status": "contacted", "score": 150, "notes": "called back"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body_json(response).await;
    assert_eq!(updated["status"], "contacted");
    assert_eq!(updated["score"], 100);
    assert_eq!(updated["notes"], "called back");
}

#[tokio::test]
async fn test_update_unknown_lead_is_404() {
    let (app, _) = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri(format!("/api/v1/leads/{}", uuid::Uuid::new_v4()))
                .header(header::AUTHORIZATION, format!("Bearer {}", ADMIN_TOKEN))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({"status": "closed"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_vehicle_import_json_body() {
    let (app, store) = test_app();
    let response = app
        .oneshot(post_json(
            "/api/v1/vehicles/import",
            json!({"csv": "brand,model,capacity_ah\nTata,Nexon,70\nKia,Seltos,0"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body, json!({"success": true, "imported": 2, "total": 2}));
    assert_eq!(store.vehicles()[1].capacity_ah, None);
}

#[tokio::test]
async fn test_vehicle_import_raw_text_body() {
    let (app, store) = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/vehicles/import")
                .header(header::CONTENT_TYPE, "text/csv")
                .body(Body::from("Make,Vehicle Model\nMaruti,Swift"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(store.vehicles()[0].brand, "Maruti");
}

#[tokio::test]
async fn test_vehicle_import_multipart_upload() {
    let (app, store) = test_app();
    let boundary = "XBOUNDARYX";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"vehicles.csv\"\r\n\
         Content-Type: text/csv\r\n\r\nbrand,model\nHyundai,Creta\n\r\n--{b}--\r\n",
        b = boundary
    );

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/vehicles/import")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", boundary),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(store.vehicles()[0].model, "Creta");
}

#[tokio::test]
async fn test_vehicle_import_without_rows() {
    let (app, _) = test_app();
    let response = app
        .oneshot(post_json("/api/v1/vehicles/import", json!({"csv": "brand,model"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_vehicles_by_brand() {
    let (app, _) = test_app();
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/v1/vehicles/import",
            json!({"data": "brand,model\nTata,Nexon\nKia,Seltos\nTata,Punch"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/vehicles?brand=tata")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let vehicles = body_json(response).await;
    assert_eq!(vehicles.as_array().unwrap().len(), 2);
}
