//! Cookie transport for encrypted session tokens
//!
//! The encrypted token is the only copy of ceremony state, carried as a
//! base64 cookie value. Issuance uses browser-session lifetime (no max-age);
//! invalidation overwrites the cookie with an empty value and a negative
//! max-age so a finalized ceremony cannot present the same cookie again.

use actix_web::cookie::{time::Duration, Cookie, SameSite};
use base64::{engine::general_purpose::STANDARD, Engine as _};

use super::errors::SessionError;

/// Name of the ceremony session cookie
pub const SESSION_COOKIE: &str = "session";

/// Factory for session cookies with the security attributes applied
///
/// The ceremony runs cross-origin (the login page is served elsewhere), so
/// cookies are `SameSite=None` with credentialed CORS on the HTTP layer.
/// `secure` is config-gated to keep plain-HTTP development workable.
#[derive(Clone)]
pub struct SessionCookieFactory {
    secure: bool,
}

impl SessionCookieFactory {
    #[must_use]
    pub fn new(secure: bool) -> Self {
        Self { secure }
    }

    /// Wrap an encrypted token into the session cookie
    ///
    /// No max-age is set: the cookie lives for the browser session and the
    /// finalize path clears it explicitly.
    #[must_use]
    pub fn issue(&self, token: &[u8]) -> Cookie<'static> {
        Cookie::build(SESSION_COOKIE, STANDARD.encode(token))
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::None)
            .path("/")
            .finish()
    }

    /// Recover the encrypted token from a raw cookie value
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidEncoding` on malformed base64. This is
    /// a recoverable, client-visible failure; the value never reaches the
    /// cipher.
    pub fn extract(value: &str) -> Result<Vec<u8>, SessionError> {
        STANDARD
            .decode(value)
            .map_err(|_| SessionError::InvalidEncoding)
    }

    /// Cookie that clears the session unconditionally
    ///
    /// Issued on every finalize response, success or failure.
    #[must_use]
    pub fn invalidate(&self) -> Cookie<'static> {
        Cookie::build(SESSION_COOKIE, "")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::None)
            .path("/")
            .max_age(Duration::seconds(-1))
            .finish()
    }
}
