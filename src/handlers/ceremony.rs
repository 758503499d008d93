//! Ceremony request handlers
//!
//! Thin HTTP layer over [`CeremonyService`]: identity construction from the
//! request, content negotiation for challenge payloads, and the conversion
//! of every ceremony error into a structured response. Finalize handlers
//! prepare the invalidation cookie before doing anything else, so it is
//! attached no matter which path the request takes.

use actix_web::cookie::Cookie;
use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use serde_json::json;

use crate::ceremony::{CeremonyError, CeremonyService, RequestIdentity};
use crate::session::{SessionError, SESSION_COOKIE};
use crate::settings::PassgateSettings;
use crate::utils::ResponseBuilder;

/// Identity selection accepted by the initialize endpoints
#[derive(Debug, Deserialize, Default)]
pub struct IdentityRequest {
    pub name: Option<String>,
    pub display_name: Option<String>,
}

/// Alternate session carrier for finalize calls
///
/// The cookie is authoritative; clients that hold the opaque token
/// themselves may pass it as `?session=` instead.
#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    pub session: Option<String>,
}

/// Start a registration ceremony
///
/// Responds with the creation challenge options (JSON, or a CBOR envelope
/// when the client asks for it) and sets the session cookie. On failure no
/// cookie is set; the ceremony never started.
pub async fn attestation_initialize(
    req: HttpRequest,
    body: web::Bytes,
    service: web::Data<CeremonyService>,
    settings: web::Data<PassgateSettings>,
) -> HttpResponse {
    let identity = match request_identity(&body, &settings) {
        Ok(identity) => identity,
        Err(response) => return *response,
    };

    match service.initialize_registration(&identity) {
        Ok((options, cookie)) => challenge_response(&req, &options, cookie),
        Err(e) => {
            log::warn!("attestation initialize failed: {e}");
            error_response(&e, None)
        }
    }
}

/// Complete a registration ceremony
///
/// The raw body is the credential-creation response document; the ceremony
/// state comes from the `session` request cookie. The session cookie is
/// cleared on every outcome.
pub async fn attestation_finalize(
    req: HttpRequest,
    query: web::Query<SessionQuery>,
    body: web::Bytes,
    service: web::Data<CeremonyService>,
) -> HttpResponse {
    let cleared = service.invalidation_cookie();
    let cookie_value = session_value(&req, &query);

    match service.finalize_registration(cookie_value.as_deref(), &body) {
        Ok(passkey) => ResponseBuilder::ok().with_cookie(cleared).json(&json!({
            "status": "registered",
            "credential_id": passkey.cred_id(),
        })),
        Err(e) => {
            log::warn!("attestation finalize failed: {e}");
            error_response(&e, Some(cleared))
        }
    }
}

/// Start an authentication ceremony
pub async fn assertion_initialize(
    req: HttpRequest,
    body: web::Bytes,
    service: web::Data<CeremonyService>,
    settings: web::Data<PassgateSettings>,
) -> HttpResponse {
    let identity = match request_identity(&body, &settings) {
        Ok(identity) => identity,
        Err(response) => return *response,
    };

    match service.initialize_authentication(&identity) {
        Ok((options, cookie)) => challenge_response(&req, &options, cookie),
        Err(e) => {
            log::warn!("assertion initialize failed: {e}");
            error_response(&e, None)
        }
    }
}

/// Complete an authentication ceremony
pub async fn assertion_finalize(
    req: HttpRequest,
    query: web::Query<SessionQuery>,
    body: web::Bytes,
    service: web::Data<CeremonyService>,
) -> HttpResponse {
    let cleared = service.invalidation_cookie();
    let cookie_value = session_value(&req, &query);

    match service.finalize_authentication(cookie_value.as_deref(), &body) {
        Ok(result) => ResponseBuilder::ok().with_cookie(cleared).json(&json!({
            "status": "authenticated",
            "credential_id": result.cred_id(),
            "user_verified": result.user_verified(),
        })),
        Err(e) => {
            log::warn!("assertion finalize failed: {e}");
            error_response(&e, Some(cleared))
        }
    }
}

/// Build the request identity from an optional JSON body
///
/// An empty body selects the configured default identity, matching clients
/// that initialize with a bare POST.
fn request_identity(
    body: &web::Bytes,
    settings: &PassgateSettings,
) -> Result<RequestIdentity, Box<HttpResponse>> {
    let request: IdentityRequest = if body.is_empty() {
        IdentityRequest::default()
    } else {
        serde_json::from_slice(body).map_err(|e| {
            Box::new(
                ResponseBuilder::bad_request()
                    .with_error_code("invalid_request")
                    .with_message(&format!("failed to parse identity request: {e}"))
                    .build(),
            )
        })?
    };

    let name = request
        .name
        .unwrap_or_else(|| settings.relying_party.default_user_name.clone());
    let display_name = request
        .display_name
        .unwrap_or_else(|| settings.relying_party.default_display_name.clone());

    Ok(RequestIdentity::new(&name, &display_name))
}

fn session_value(req: &HttpRequest, query: &SessionQuery) -> Option<String> {
    req.cookie(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .or_else(|| query.session.clone())
}

/// One logical challenge payload, two encodings
///
/// Clients that accept `application/cbor` get a binary envelope; everyone
/// else gets JSON. If the negotiated encoding fails to serialize, no cookie
/// is set.
fn challenge_response<T: serde::Serialize>(
    req: &HttpRequest,
    options: &T,
    cookie: Cookie<'static>,
) -> HttpResponse {
    if wants_cbor(req) {
        let mut buf = Vec::new();
        match ciborium::ser::into_writer(options, &mut buf) {
            Ok(()) => HttpResponse::Ok()
                .content_type("application/cbor")
                .cookie(cookie)
                .body(buf),
            Err(e) => {
                log::error!("failed to encode challenge options as CBOR: {e}");
                ResponseBuilder::internal_server_error()
                    .with_error_code("encoding_failed")
                    .with_message("Failed to encode challenge options")
                    .build()
            }
        }
    } else {
        HttpResponse::Ok().cookie(cookie).json(options)
    }
}

fn wants_cbor(req: &HttpRequest) -> bool {
    req.headers()
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|accept| accept.contains("application/cbor"))
}

/// Convert a ceremony error to its HTTP response, optionally with a cookie
fn error_response(error: &CeremonyError, cookie: Option<Cookie<'static>>) -> HttpResponse {
    let builder = match error {
        CeremonyError::Verification(_) => ResponseBuilder::unauthorized(),
        CeremonyError::NoCredentials => ResponseBuilder::not_found(),
        CeremonyError::Challenge(_) | CeremonyError::Store(_) => {
            ResponseBuilder::internal_server_error()
        }
        CeremonyError::Session(e) => match e {
            SessionError::InvalidEncoding
            | SessionError::TruncatedToken
            | SessionError::Tampered
            | SessionError::MalformedSession => ResponseBuilder::bad_request(),
            _ => ResponseBuilder::internal_server_error(),
        },
        _ => ResponseBuilder::bad_request(),
    };

    let builder = builder
        .with_error_code(error_code(error))
        .with_message(&error.to_string());

    match cookie {
        Some(cookie) => builder.with_cookie(cookie).build(),
        None => builder.build(),
    }
}

fn error_code(error: &CeremonyError) -> &'static str {
    match error {
        CeremonyError::MissingSession => "missing_session",
        CeremonyError::Session(e) => match e {
            SessionError::InvalidEncoding => "invalid_encoding",
            SessionError::TruncatedToken | SessionError::Tampered => "invalid_session",
            SessionError::MalformedSession => "malformed_session",
            _ => "server_error",
        },
        CeremonyError::WrongCeremony { .. } => "wrong_ceremony",
        CeremonyError::InvalidClientData(_) => "invalid_credential",
        CeremonyError::Challenge(_) => "challenge_failed",
        CeremonyError::Verification(_) => "verification_failed",
        CeremonyError::NoCredentials => "no_credentials",
        CeremonyError::Store(_) => "store_unavailable",
    }
}
