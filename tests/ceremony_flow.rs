// End-to-end tests for the two-phase ceremony flow over HTTP
use std::sync::Arc;

use actix_web::http::header;
use actix_web::{test, web, App};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use passgate::settings::{PassgateSettings, RelyingPartySettings, SessionSettings};
use passgate::{handlers, CeremonyService, MemoryCredentialStore};
use serde_json::Value;

fn test_settings() -> PassgateSettings {
    PassgateSettings {
        relying_party: RelyingPartySettings {
            rp_id: "localhost".to_string(),
            rp_origin: "http://localhost:5500".to_string(),
            ..Default::default()
        },
        session: SessionSettings {
            secret: "an example very very secret key.".to_string(),
        },
        ..Default::default()
    }
}

macro_rules! test_app {
    () => {{
        let settings = test_settings();
        let store = Arc::new(MemoryCredentialStore::new());
        let service = CeremonyService::new(&settings, store).expect("service must assemble");
        test::init_service(
            App::new()
                .app_data(web::Data::new(service))
                .app_data(web::Data::new(settings))
                .configure(handlers::configure),
        )
        .await
    }};
}

// Parses as a credential-creation response but cannot pass verification
const DUMMY_ATTESTATION: &[u8] = br#"{
    "id": "dGVzdC1jcmVkZW50aWFs",
    "rawId": "dGVzdC1jcmVkZW50aWFs",
    "response": {
        "attestationObject": "o2NmbXRkbm9uZQ",
        "clientDataJSON": "eyJ0eXBlIjoid2ViYXV0aG4uY3JlYXRlIn0"
    },
    "type": "public-key"
}"#;

const DUMMY_ASSERTION: &[u8] = br#"{
    "id": "dGVzdC1jcmVkZW50aWFs",
    "rawId": "dGVzdC1jcmVkZW50aWFs",
    "response": {
        "authenticatorData": "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA",
        "clientDataJSON": "eyJ0eXBlIjoid2ViYXV0aG4uZ2V0In0",
        "signature": "AAAA",
        "userHandle": null
    },
    "type": "public-key"
}"#;

fn session_cookie<B>(resp: &actix_web::dev::ServiceResponse<B>) -> Option<actix_web::cookie::Cookie<'static>> {
    resp.response()
        .cookies()
        .find(|c| c.name() == "session")
        .map(|c| c.into_owned())
}

fn assert_invalidation_cookie<B>(resp: &actix_web::dev::ServiceResponse<B>) {
    let cookie = session_cookie(resp).expect("finalize must always set a session cookie");
    assert_eq!(cookie.value(), "", "invalidation cookie has an empty value");
    assert!(
        cookie.max_age().expect("max-age set").is_negative(),
        "invalidation cookie has a negative max-age"
    );
}

#[actix_web::test]
async fn attestation_initialize_issues_challenge_and_cookie() {
    let app = test_app!();

    let req = test::TestRequest::post()
        .uri("/attestation/initialize")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert!(resp.status().is_success());
    let cookie = session_cookie(&resp).expect("session cookie issued");
    assert!(!cookie.value().is_empty());
    assert_eq!(cookie.http_only(), Some(true));
    assert!(cookie.max_age().is_none(), "browser-session lifetime");

    let body: Value = test::read_body_json(resp).await;
    let challenge = body["publicKey"]["challenge"]
        .as_str()
        .expect("challenge field present");
    assert!(!challenge.is_empty());
}

#[actix_web::test]
async fn attestation_initialize_negotiates_cbor_envelope() {
    let app = test_app!();

    let req = test::TestRequest::post()
        .uri("/attestation/initialize")
        .insert_header((header::ACCEPT, "application/cbor"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert!(resp.status().is_success());
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/cbor"
    );
    assert!(session_cookie(&resp).is_some());

    let body = test::read_body(resp).await;
    let envelope: ciborium::value::Value =
        ciborium::de::from_reader(&body[..]).expect("body is valid CBOR");
    assert!(envelope.as_map().is_some());
}

#[actix_web::test]
async fn attestation_initialize_accepts_identity_body() {
    let app = test_app!();

    let req = test::TestRequest::post()
        .uri("/attestation/initialize")
        .set_json(serde_json::json!({"name": "alice", "display_name": "Alice"}))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert!(resp.status().is_success());
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["publicKey"]["user"]["name"], "alice");
}

#[actix_web::test]
async fn two_initializations_yield_distinct_cookies() {
    let app = test_app!();

    let first = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/attestation/initialize")
            .to_request(),
    )
    .await;
    let second = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/attestation/initialize")
            .to_request(),
    )
    .await;

    let c1 = session_cookie(&first).unwrap();
    let c2 = session_cookie(&second).unwrap();
    assert_ne!(c1.value(), c2.value(), "every ceremony gets a fresh token");
}

#[actix_web::test]
async fn attestation_finalize_rejects_forged_response_and_clears_session() {
    let app = test_app!();

    let init = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/attestation/initialize")
            .to_request(),
    )
    .await;
    let cookie = session_cookie(&init).unwrap();

    let req = test::TestRequest::post()
        .uri("/attestation/finalize")
        .cookie(cookie.clone())
        .set_payload(DUMMY_ATTESTATION)
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert!(resp.status().is_client_error());
    assert_invalidation_cookie(&resp);
    let first_status = resp.status();
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].is_string());

    // Replaying the consumed cookie fails the same way; the only replay
    // protection is the invalidation already handed to the client
    let replay = test::TestRequest::post()
        .uri("/attestation/finalize")
        .cookie(cookie)
        .set_payload(DUMMY_ATTESTATION)
        .to_request();
    let resp = test::call_service(&app, replay).await;

    assert_eq!(resp.status(), first_status);
    assert_invalidation_cookie(&resp);
}

#[actix_web::test]
async fn attestation_finalize_accepts_query_session_carrier() {
    let app = test_app!();

    let init = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/attestation/initialize")
            .to_request(),
    )
    .await;
    let cookie = session_cookie(&init).unwrap();

    // No cookie on the request; the opaque token rides the query string
    let encoded = cookie
        .value()
        .replace('+', "%2B")
        .replace('/', "%2F")
        .replace('=', "%3D");
    let req = test::TestRequest::post()
        .uri(&format!("/attestation/finalize?session={encoded}"))
        .set_payload(DUMMY_ATTESTATION)
        .to_request();
    let resp = test::call_service(&app, req).await;

    // The session is recovered (not missing), then the forged response is
    // rejected downstream
    assert!(resp.status().is_client_error());
    assert_invalidation_cookie(&resp);
    let body: Value = test::read_body_json(resp).await;
    assert_ne!(body["error"], "missing_session");
    assert_ne!(body["error"], "invalid_encoding");
}

#[actix_web::test]
async fn attestation_finalize_without_cookie_is_an_error() {
    let app = test_app!();

    let req = test::TestRequest::post()
        .uri("/attestation/finalize")
        .set_payload(DUMMY_ATTESTATION)
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert!(resp.status().is_client_error());
    assert_invalidation_cookie(&resp);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "missing_session");
}

#[actix_web::test]
async fn attestation_finalize_survives_tampered_cookie() {
    let app = test_app!();

    let init = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/attestation/initialize")
            .to_request(),
    )
    .await;
    let cookie = session_cookie(&init).unwrap();

    // Flip one bit in the ciphertext portion of the token
    let mut token = STANDARD.decode(cookie.value()).unwrap();
    let last = token.len() - 1;
    token[last] ^= 0x01;
    let tampered = actix_web::cookie::Cookie::new("session", STANDARD.encode(&token));

    let req = test::TestRequest::post()
        .uri("/attestation/finalize")
        .cookie(tampered)
        .set_payload(DUMMY_ATTESTATION)
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert!(resp.status().is_client_error());
    assert_invalidation_cookie(&resp);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "invalid_session");

    // The process is still healthy afterwards
    let ping = test::call_service(&app, test::TestRequest::get().uri("/ping").to_request()).await;
    assert!(ping.status().is_success());
}

#[actix_web::test]
async fn attestation_finalize_rejects_garbage_cookie_value() {
    let app = test_app!();

    let garbage = actix_web::cookie::Cookie::new("session", "not base64 at all");
    let req = test::TestRequest::post()
        .uri("/attestation/finalize")
        .cookie(garbage)
        .set_payload(DUMMY_ATTESTATION)
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert!(resp.status().is_client_error());
    assert_invalidation_cookie(&resp);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "invalid_encoding");
}

#[actix_web::test]
async fn assertion_initialize_requires_registered_credentials() {
    let app = test_app!();

    let req = test::TestRequest::post()
        .uri("/assertion/initialize")
        .set_json(serde_json::json!({"name": "nobody"}))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert!(resp.status().is_client_error());
    assert!(
        session_cookie(&resp).is_none(),
        "a failed initialize must not set a cookie"
    );

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "no_credentials");
}

#[actix_web::test]
async fn assertion_finalize_rejects_attestation_cookie() {
    let app = test_app!();

    let init = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/attestation/initialize")
            .to_request(),
    )
    .await;
    let cookie = session_cookie(&init).unwrap();

    let req = test::TestRequest::post()
        .uri("/assertion/finalize")
        .cookie(cookie)
        .set_payload(DUMMY_ASSERTION)
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert!(resp.status().is_client_error());
    assert_invalidation_cookie(&resp);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "wrong_ceremony");
}

#[actix_web::test]
async fn ping_reports_version() {
    let app = test_app!();

    let resp = test::call_service(&app, test::TestRequest::get().uri("/ping").to_request()).await;
    assert!(resp.status().is_success());

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}
