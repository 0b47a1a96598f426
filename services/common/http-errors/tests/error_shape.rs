use common_http_errors::ApiError;
use axum::response::IntoResponse;
use axum::body::to_bytes;

#[tokio::test]
async fn body_carries_code_and_message() {
    let err = ApiError::Internal { code: "signing_failed", trace_id: None, message: Some("passphrase not configured".into()) };
    let resp = err.into_response();
    assert_eq!(resp.status().as_u16(), 500);
    let body_bytes = to_bytes(resp.into_body(), 1024*8).await.unwrap();
    let v: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
    assert_eq!(v["code"], "signing_failed");
    assert_eq!(v["message"], "passphrase not configured");
    assert!(v.get("trace_id").is_none(), "unset trace_id must be omitted: {v}");
}
