use uuid::Uuid;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use payment_cell::StripeClient;
use shared_config::AppConfig;

fn test_config() -> AppConfig {
    AppConfig {
        database_url: String::new(),
        jwt_secret: "test".to_string(),
        stripe_secret_key: "sk_test_123".to_string(),
        stripe_webhook_secret: "whsec_test".to_string(),
        frontend_url: "https://app.example.com".to_string(),
        email_api_url: String::new(),
        email_api_key: String::new(),
        email_from: String::new(),
        storage_url: String::new(),
        storage_api_key: String::new(),
        port: 0,
    }
}

#[tokio::test]
async fn creates_checkout_session_with_appointment_reference() {
    let server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/checkout/sessions"))
        .and(body_string_contains("mode=payment"))
        .and(body_string_contains("client_reference_id"))
        .and(body_string_contains(appointment_id.to_string()))
        // 2500 rupees, sent to the provider in paise.
        .and(body_string_contains("unit_amount%5D=250000"))
        .and(body_string_contains("customer_email=pat%40example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "cs_test_abc",
            "url": "https://checkout.example.com/cs_test_abc"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = StripeClient::new(&test_config()).with_api_base(&server.uri());
    let session = client
        .create_checkout_session(appointment_id, 2500, "pat@example.com")
        .await
        .unwrap();

    assert_eq!(session.id, "cs_test_abc");
    assert_eq!(session.url, "https://checkout.example.com/cs_test_abc");
}

#[tokio::test]
async fn provider_error_is_surfaced_not_swallowed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/checkout/sessions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .mount(&server)
        .await;

    let client = StripeClient::new(&test_config()).with_api_base(&server.uri());
    let result = client
        .create_checkout_session(Uuid::new_v4(), 2500, "pat@example.com")
        .await;

    assert!(result.is_err());
}
