//! Serialization of ceremony state for cookie transport
//!
//! A [`CeremonySession`] bundles the collaborator's opaque challenge state
//! with the bookkeeping needed to resume the ceremony: which kind of
//! ceremony it is and which identity started it. The encoding is
//! field-tagged JSON, so additive changes to the collaborator's state shape
//! do not break cookies issued before a deploy.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use webauthn_rs::prelude::{PasskeyAuthentication, PasskeyRegistration};

use super::errors::SessionError;

/// Challenge state carried between initialize and finalize
///
/// Tagged with the ceremony kind so an attestation cookie presented to the
/// assertion endpoint (or vice versa) fails decoding into the wrong arm
/// instead of being verified against the wrong ceremony.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", content = "state", rename_all = "snake_case")]
pub enum CeremonyState {
    /// Registration challenge issued by `start_passkey_registration`
    Attestation(PasskeyRegistration),
    /// Authentication challenge issued by `start_passkey_authentication`
    Assertion(PasskeyAuthentication),
}

/// One in-flight ceremony, as stored inside the session cookie
#[derive(Debug, Serialize, Deserialize)]
pub struct CeremonySession {
    /// Handle of the identity undertaking the ceremony
    pub user_handle: Uuid,
    /// Login name, kept for logging and store lookups on finalize
    pub user_name: String,
    #[serde(flatten)]
    pub state: CeremonyState,
}

/// Serialize a session to its canonical byte form
///
/// # Errors
///
/// Returns `SessionError::Encoding` if serialization fails.
pub fn encode(session: &CeremonySession) -> Result<Vec<u8>, SessionError> {
    serde_json::to_vec(session).map_err(|e| {
        log::error!("failed to encode ceremony session: {e}");
        SessionError::Encoding
    })
}

/// Parse bytes produced by [`encode`] back into a session
///
/// # Errors
///
/// Returns `SessionError::MalformedSession` when the bytes do not parse
/// into the expected structure. Plaintext recovered from a decrypted token
/// still goes through this gate, so a token that somehow opens but carries
/// junk is rejected here.
pub fn decode(bytes: &[u8]) -> Result<CeremonySession, SessionError> {
    serde_json::from_slice(bytes).map_err(|e| {
        log::debug!("failed to decode ceremony session: {e}");
        SessionError::MalformedSession
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use webauthn_rs::prelude::Url;
    use webauthn_rs::{Webauthn, WebauthnBuilder};

    fn test_webauthn() -> Webauthn {
        let origin = Url::parse("http://localhost:5500").unwrap();
        WebauthnBuilder::new("localhost", &origin)
            .unwrap()
            .rp_name("passgate")
            .build()
            .unwrap()
    }

    fn registration_session() -> CeremonySession {
        let webauthn = test_webauthn();
        let handle = Uuid::new_v4();
        let (_, state) = webauthn
            .start_passkey_registration(handle, "alice", "Alice", None)
            .unwrap();

        CeremonySession {
            user_handle: handle,
            user_name: "alice".to_string(),
            state: CeremonyState::Attestation(state),
        }
    }

    #[test]
    fn test_round_trip() {
        let session = registration_session();

        let bytes = encode(&session).unwrap();
        let decoded = decode(&bytes).unwrap();

        assert_eq!(decoded.user_handle, session.user_handle);
        assert_eq!(decoded.user_name, session.user_name);

        // Re-encoding the decoded session must describe the same value
        let original: Value = serde_json::from_slice(&bytes).unwrap();
        let round_tripped: Value = serde_json::from_slice(&encode(&decoded).unwrap()).unwrap();
        assert_eq!(original, round_tripped);
    }

    #[test]
    fn test_encoding_is_field_tagged() {
        let session = registration_session();
        let value: Value = serde_json::from_slice(&encode(&session).unwrap()).unwrap();

        assert_eq!(value["kind"], "attestation");
        assert!(value["state"].is_object());
        assert!(value["user_handle"].is_string());
    }

    #[test]
    fn test_malformed_bytes_rejected() {
        assert!(matches!(
            decode(b"not json at all"),
            Err(SessionError::MalformedSession)
        ));
        assert!(matches!(decode(b""), Err(SessionError::MalformedSession)));
        // Valid JSON, wrong structure
        assert!(matches!(
            decode(br#"{"kind":"attestation"}"#),
            Err(SessionError::MalformedSession)
        ));
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let session = registration_session();
        let mut value: Value = serde_json::from_slice(&encode(&session).unwrap()).unwrap();
        value["kind"] = Value::String("renewal".to_string());

        let bytes = serde_json::to_vec(&value).unwrap();
        assert!(matches!(
            decode(&bytes),
            Err(SessionError::MalformedSession)
        ));
    }
}
