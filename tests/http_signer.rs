//! Integration tests for the HTTP certificate signer against a mock signing daemon.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zts_instance::config::SignerConfig;
use zts_instance::signer::RetryConfig;
use zts_instance::{CertSigner, HttpCertSigner, InstanceError, InstanceManager};

const CERT_PEM: &str = "-----BEGIN CERTIFICATE-----\nMIIBinstance\n-----END CERTIFICATE-----\n";
const CA_PEM: &str = "-----BEGIN CERTIFICATE-----\nMIIBca\n-----END CERTIFICATE-----\n";

fn fast_retry(max_attempts: u32) -> RetryConfig {
    RetryConfig {
        max_attempts,
        initial_backoff: Duration::from_millis(5),
        max_backoff: Duration::from_millis(20),
        backoff_multiplier: 2.0,
    }
}

async fn signer_for(server: &MockServer) -> HttpCertSigner {
    HttpCertSigner::new(&server.uri(), Duration::from_secs(5)).unwrap().with_retry_config(fast_retry(3))
}

#[tokio::test]
async fn sign_returns_certificate_on_created() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/x509"))
        .and(body_json(json!({ "csr": "csr-pem" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "pem": CERT_PEM })))
        .expect(1)
        .mount(&server)
        .await;

    let signer = signer_for(&server).await;
    let cert = signer.generate_x509_certificate("csr-pem").await.unwrap();
    assert_eq!(cert.as_deref(), Some(CERT_PEM));
}

#[tokio::test]
async fn sign_declined_on_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/x509"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let signer = signer_for(&server).await;
    assert!(signer.generate_x509_certificate("csr-pem").await.unwrap().is_none());
}

#[tokio::test]
async fn sign_server_error_is_a_decline_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/x509"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let signer = signer_for(&server).await;
    assert!(signer.generate_x509_certificate("csr-pem").await.unwrap().is_none());
}

#[tokio::test]
async fn malformed_body_is_a_signer_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/x509"))
        .respond_with(ResponseTemplate::new(201).set_body_string("not json"))
        .mount(&server)
        .await;

    let signer = signer_for(&server).await;
    let err = signer.generate_x509_certificate("csr-pem").await.unwrap_err();
    assert!(matches!(err, InstanceError::Signer { .. }));
}

#[tokio::test]
async fn ca_certificate_fetched_with_get() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/x509"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "pem": CA_PEM })))
        .mount(&server)
        .await;

    let signer = signer_for(&server).await;
    assert_eq!(signer.get_ca_certificate().await.unwrap().as_deref(), Some(CA_PEM));
}

#[tokio::test]
async fn missing_ca_certificate_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/x509"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let signer = signer_for(&server).await;
    assert!(signer.get_ca_certificate().await.unwrap().is_none());
}

#[tokio::test]
async fn ca_error_status_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/x509"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let signer = signer_for(&server).await;
    assert!(signer.get_ca_certificate().await.unwrap().is_none());
}

#[tokio::test]
async fn unreachable_signer_fails_after_retries() {
    // Bind then drop a listener to get a port nothing is listening on.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let signer = HttpCertSigner::new(&format!("http://127.0.0.1:{}", port), Duration::from_secs(2))
        .unwrap()
        .with_retry_config(fast_retry(2));

    let err = signer.generate_x509_certificate("csr-pem").await.unwrap_err();
    assert!(matches!(err, InstanceError::Signer { .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn manager_issues_identity_through_http_signer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/x509"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "pem": CERT_PEM })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/x509"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "pem": CA_PEM })))
        .mount(&server)
        .await;

    let config = SignerConfig { url: Some(server.uri()), ..Default::default() };
    let signer = HttpCertSigner::from_config(&config).unwrap().unwrap();
    let manager = InstanceManager::new(None);

    let identity =
        manager.generate_identity(&signer, "csr-pem", "athenz.api", None).await.unwrap().unwrap();
    assert_eq!(identity.name, "athenz.api");
    assert_eq!(identity.x509_certificate, CERT_PEM);
    assert_eq!(identity.x509_certificate_signer.as_deref(), Some(CA_PEM));
}

#[tokio::test]
async fn manager_propagates_ca_fault_after_signature() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/x509"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "pem": CERT_PEM })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/x509"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .mount(&server)
        .await;

    let signer = signer_for(&server).await;
    let manager = InstanceManager::new(None);

    let result = manager.generate_identity(&signer, "csr-pem", "athenz.api", None).await;
    assert!(matches!(result, Err(InstanceError::Signer { .. })));
}

#[test]
fn no_signer_url_means_no_signer() {
    let config = SignerConfig::default();
    assert!(HttpCertSigner::from_config(&config).unwrap().is_none());
}
