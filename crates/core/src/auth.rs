//! Session authentication shapes and the pairing/verification
//! collaborator contracts.

use futures_util::future::BoxFuture;
use mrp_protocol::Credentials;

use crate::error::Result;

/// Per-session symmetric key pair produced by the verification
/// collaborator's handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedKeys {
    pub read_key: Vec<u8>,
    pub write_key: Vec<u8>,
}

/// The two legitimate session shapes.
///
/// Carrying the credential bundle in the variant keeps the
/// conditional handshake steps (verify, configure updates) tied to
/// authenticated sessions at the type level instead of re-checking a
/// nullable field at each step.
#[derive(Debug, Clone)]
pub enum SessionAuth {
    /// No credential bundle; the session proceeds unencrypted and
    /// skips verification and update configuration.
    Unauthenticated,
    /// Credential bundle from a prior pairing; the connect handshake
    /// runs verification and attaches the derived keys.
    Authenticated(Credentials),
}

impl SessionAuth {
    pub fn from_credentials(credentials: Option<Credentials>) -> Self {
        match credentials {
            Some(credentials) => SessionAuth::Authenticated(credentials),
            None => SessionAuth::Unauthenticated,
        }
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        match self {
            SessionAuth::Unauthenticated => None,
            SessionAuth::Authenticated(credentials) => Some(credentials),
        }
    }
}

/// Long-term trust establishment. Runs its own message exchange over
/// the connection and yields a credential bundle the caller can
/// persist for later connects.
pub trait PairingExchange: Send + Sync {
    fn initiate_pair(&self) -> BoxFuture<'_, Result<Credentials>>;
}

/// Per-session cryptographic verification. Consumes the credential
/// bundle's trust material and derives the symmetric read/write keys
/// for this connection.
pub trait Verifier: Send + Sync {
    fn verify(&self) -> BoxFuture<'_, Result<DerivedKeys>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_shape_follows_credential_presence() {
        assert!(
            SessionAuth::from_credentials(None)
                .credentials()
                .is_none()
        );

        let auth = SessionAuth::from_credentials(Some(Credentials::new("abc")));
        assert_eq!(auth.credentials().unwrap().session_id, "abc");
    }
}
