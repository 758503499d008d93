//! Identity capability interface
//!
//! The verification collaborator only needs a narrow view of whoever is
//! undertaking a ceremony, so identities are consumed through a small trait
//! instead of a concrete user model. Persistence of identities is not this
//! crate's concern; the request-scoped implementation below is built fresh
//! per call and dropped with the request.

use uuid::Uuid;
use webauthn_rs::prelude::CredentialID;

/// What the ceremony layer needs to know about a principal
pub trait Identity {
    /// Stable unique handle for the identity
    fn user_handle(&self) -> Uuid;

    /// Login name
    fn user_name(&self) -> &str;

    /// Human-readable name shown by the authenticator UI
    fn display_name(&self) -> &str;

    /// Optional icon URL
    fn icon_url(&self) -> Option<&str> {
        None
    }

    /// Credential ids already bound to this identity
    ///
    /// Used as the exclusion list when registering, so an authenticator will
    /// not re-register a credential it already holds. Empty in a fresh
    /// registration flow.
    fn credential_ids(&self) -> Vec<CredentialID> {
        Vec::new()
    }
}

/// Identity assembled from a single request
///
/// The handle is derived deterministically from the login name, so the same
/// name maps to the same handle across independent ceremonies without any
/// identity storage.
#[derive(Debug, Clone)]
pub struct RequestIdentity {
    handle: Uuid,
    name: String,
    display_name: String,
}

impl RequestIdentity {
    #[must_use]
    pub fn new(name: &str, display_name: &str) -> Self {
        Self {
            handle: Uuid::new_v5(&Uuid::NAMESPACE_URL, name.as_bytes()),
            name: name.to_string(),
            display_name: display_name.to_string(),
        }
    }
}

impl Identity for RequestIdentity {
    fn user_handle(&self) -> Uuid {
        self.handle
    }

    fn user_name(&self) -> &str {
        &self.name
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }
}
