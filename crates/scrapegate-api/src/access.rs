//! Scoped access gate - validates the `(tag, token)` pair of a scrape.
//!
//! Tokens are compared as SHA-256 digests with a constant-time equality
//! check over 32 bytes, whatever the length of the presented token.
//! Unknown tags are compared against a fixed digest and rejected exactly
//! like a wrong token.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::debug;

/// Access denied. Carries no reason: a caller must not learn whether the
/// tag exists.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("unauthorized")]
    Unauthorized,
}

pub type AuthResult<T> = Result<T, AuthError>;

/// Source of per-tag secrets.
pub trait SecretStore: Send + Sync {
    /// The secret for `tag`, or `None` if the tag is not configured.
    fn secret_for(&self, tag: &str) -> Option<String>;
}

/// Secrets held in memory, typically resolved from the config file.
#[derive(Clone, Default)]
pub struct StaticSecrets {
    secrets: BTreeMap<String, String>,
}

impl StaticSecrets {
    pub fn new(secrets: BTreeMap<String, String>) -> Self {
        Self { secrets }
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.secrets.keys().map(String::as_str)
    }
}

impl fmt::Debug for StaticSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticSecrets")
            .field("tags", &self.tags().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl SecretStore for StaticSecrets {
    fn secret_for(&self, tag: &str) -> Option<String> {
        self.secrets.get(tag).cloned()
    }
}

/// A successfully authorized scrape scope. Lives for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessScope {
    tag: String,
}

impl AccessScope {
    pub fn tag(&self) -> &str {
        &self.tag
    }
}

/// Checks scrape tokens against the configured secret store.
#[derive(Clone)]
pub struct AccessGate {
    secrets: Arc<dyn SecretStore>,
}

impl AccessGate {
    pub fn new(secrets: impl SecretStore + 'static) -> Self {
        Self {
            secrets: Arc::new(secrets),
        }
    }

    /// Authorize `token` for `tag`.
    ///
    /// A missing token, an unknown tag, and a wrong token all return
    /// [`AuthError::Unauthorized`].
    pub fn authorize(&self, tag: &str, token: Option<&str>) -> AuthResult<AccessScope> {
        let Some(token) = token else {
            debug!(%tag, "access denied: no token presented");
            return Err(AuthError::Unauthorized);
        };

        let presented = digest(token);
        let (expected, known_tag) = match self.secrets.secret_for(tag) {
            Some(secret) => (digest(&secret), true),
            None => (digest(UNKNOWN_TAG_SENTINEL), false),
        };

        let matches: bool = presented.ct_eq(&expected).into();
        if matches && known_tag {
            Ok(AccessScope {
                tag: tag.to_string(),
            })
        } else {
            if known_tag {
                debug!(%tag, "access denied: token mismatch");
            } else {
                debug!(%tag, "access denied: unknown tag");
            }
            Err(AuthError::Unauthorized)
        }
    }
}

impl fmt::Debug for AccessGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessGate").finish_non_exhaustive()
    }
}

/// Compared against for unknown tags. A match is still rejected.
const UNKNOWN_TAG_SENTINEL: &str = "scrapegate:unknown-tag";

fn digest(token: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().into()
}
