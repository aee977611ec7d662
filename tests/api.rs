//! Интеграционные тесты HTTP API

use axum::body::Body;
use axum::http::{Request, StatusCode};
use customer_segmentation::api::{create_router, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

fn test_app() -> axum::Router {
    create_router(AppState::default())
}

fn sample_transactions() -> Value {
    let mut rows = Vec::new();
    for (i, customer) in ["17850", "13047", "12345", "98765", "55555"].iter().enumerate() {
        for j in 0..=i {
            let category = if j % 2 == 0 { "home" } else { "beauty" };
            let discount = if j == 1 { json!("PROMO") } else { Value::Null };
            rows.push(json!({
                "CustomerId": customer,
                "OrderId": format!("{}-{}", customer, j),
                "order_date": format!("2024-0{}-1{}T10:00:00", 1 + i, j),
                "sku": format!("SKU{}", j),
                "Category Level1": category,
                "Sum of FinalPrice": 10.0 * (i + 1) as f64 + j as f64,
                "Sum of QtyFinal": 1 + j,
                "DiscountDescription": discount
            }));
        }
    }
    Value::Array(rows)
}

async fn post_json(app: axum::Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_features_endpoint() {
    let (status, body) = post_json(
        test_app(),
        "/api/features",
        json!({ "transactions": sample_transactions() }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let customers = body.as_array().unwrap();
    assert_eq!(customers.len(), 5);
    let first = customers
        .iter()
        .find(|c| c["customer_id"] == "17850")
        .unwrap();
    assert_eq!(first["frequency"], 1);
    assert_eq!(first["customer_tenure_days"], 0);
    assert_eq!(first["avg_days_between"], 0.0);
}

#[tokio::test]
async fn test_rfm_endpoint_attaches_scores() {
    let (status, body) = post_json(
        test_app(),
        "/api/rfm",
        json!({ "transactions": sample_transactions() }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    for customer in body.as_array().unwrap() {
        let sum = customer["rfm_sum"].as_u64().unwrap();
        assert!((3..=15).contains(&sum));
        assert!(customer["rfm_segment"].is_string());
    }
}

#[tokio::test]
async fn test_segment_endpoint() {
    let request = json!({
        "transactions": sample_transactions(),
        "clustering": {
            "k": 2,
            "feature_columns": ["frequency", "monetary"],
            "scale": true,
            "remove_outliers": false
        }
    });
    let (status, body) = post_json(test_app(), "/api/segment", request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["customers"].as_array().unwrap().len(), 5);
    assert_eq!(body["clustering"]["assignments"].as_array().unwrap().len(), 5);
    assert_eq!(body["clustering"]["centers"].as_array().unwrap().len(), 2);
    assert_eq!(body["clustering"]["feature_columns"], json!(["frequency", "monetary"]));
    assert_eq!(body["summary"]["total_customers"], 5);
}

#[tokio::test]
async fn test_segment_rejects_oversized_k() {
    let request = json!({
        "transactions": sample_transactions(),
        "clustering": { "k": 9 }
    });
    let (status, body) = post_json(test_app(), "/api/segment", request).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "clustering_precondition");
}

#[tokio::test]
async fn test_segment_rejects_unknown_column() {
    let request = json!({
        "transactions": sample_transactions(),
        "clustering": { "k": 2, "feature_columns": ["loyalty_points"] }
    });
    let (status, body) = post_json(test_app(), "/api/segment", request).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "data_shape");
}
