use std::fmt;

/// Decides whether a request may publish system messages.
pub trait Authorizer: Send + Sync + fmt::Debug {
    fn authorize(&self, token: Option<&str>) -> bool;
}

/// Compares the presented token against a digest of the configured admin
/// secret. Only the digest is held in memory, so `Debug` output never
/// leaks the secret itself.
#[derive(Debug)]
pub struct SharedSecretAuthorizer {
    expected_digest: String,
}

impl SharedSecretAuthorizer {
    pub fn new(secret: &str) -> SharedSecretAuthorizer {
        SharedSecretAuthorizer {
            expected_digest: sha256::digest(secret),
        }
    }
}

impl Authorizer for SharedSecretAuthorizer {
    fn authorize(&self, token: Option<&str>) -> bool {
        match token {
            Some(token) => sha256::digest(token) == self.expected_digest,
            None => false,
        }
    }
}
