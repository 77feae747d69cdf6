//! # Sync Token Verification
//!
//! Shared-secret check for inbound completion callbacks.

use subtle::ConstantTimeEq;

/// Process-wide callback secret
#[derive(Clone)]
pub struct SyncToken {
    secret: String,
}

impl std::fmt::Debug for SyncToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncToken")
            .field("configured", &!self.secret.is_empty())
            .finish()
    }
}

impl SyncToken {
    /// An empty secret rejects every presented token
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.secret.is_empty()
    }

    /// Constant-time comparison against the configured secret
    pub fn verify(&self, presented: Option<&str>) -> bool {
        let Some(presented) = presented else {
            return false;
        };
        if !self.is_configured() {
            return false;
        }
        self.secret.as_bytes().ct_eq(presented.as_bytes()).into()
    }
}
