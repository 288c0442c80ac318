//! Identity-provider collaborator interface
//!
//! Authentication is an external collaborator, accessed only through the
//! [`IdentityProvider`] trait. The engine itself never consults the
//! current session: every ledger and fare operation takes the acting
//! principal's id as an explicit parameter, so ambient auth state stops
//! at this boundary.
//!
//! [`MemoryIdentity`] is the in-memory stand-in used by tests and the
//! replay tool. It stores SHA-256 password digests rather than plain
//! passwords, mirroring how a real provider never sees stored plaintext.

use async_trait::async_trait;
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::sync::RwLock;
use thiserror::Error;
use uuid::Uuid;

/// Minimum accepted password length
const MIN_PASSWORD_LEN: usize = 6;

/// Role a principal acts in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Rides buses and pays fares from a wallet
    Passenger,
    /// Issues tickets aboard an assigned bus
    Conductor,
    /// Manages a fleet and its revenue
    Owner,
}

/// An authenticated principal
#[derive(Debug, Clone, PartialEq)]
pub struct Principal {
    /// Opaque principal id
    pub id: String,
    /// Sign-in email
    pub email: String,
    /// Role the principal acts in
    pub role: Role,
}

/// Errors surfaced by an identity-provider collaborator
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AuthError {
    /// Unknown email or wrong password
    ///
    /// Deliberately indistinguishable, so sign-in failures do not leak
    /// which emails exist.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// An account already exists for the email
    #[error("An account already exists for '{email}'")]
    EmailTaken {
        /// The contested email
        email: String,
    },

    /// Password shorter than the minimum length
    #[error("Password must be at least {MIN_PASSWORD_LEN} characters")]
    WeakPassword,

    /// The provider could not be reached
    #[error("Identity provider unavailable: {message}")]
    Unavailable {
        /// Description of the failure
        message: String,
    },
}

/// Identity-provider collaborator trait
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Register a new principal and sign them in
    async fn sign_up(&self, email: &str, password: &str, role: Role)
        -> Result<Principal, AuthError>;

    /// Authenticate an existing principal and start a session
    async fn sign_in(&self, email: &str, password: &str) -> Result<Principal, AuthError>;

    /// End the current session (no-op when none exists)
    async fn sign_out(&self);

    /// The currently signed-in principal, if any
    async fn current_principal(&self) -> Option<Principal>;
}

/// A registered user as stored by the in-memory provider
#[derive(Debug, Clone)]
struct StoredUser {
    id: String,
    digest: [u8; 32],
    role: Role,
}

/// In-memory identity provider
///
/// Keyed by email, holding SHA-256 password digests and a single
/// current session. Test double only; real deployments speak to a
/// managed provider.
#[derive(Debug, Default)]
pub struct MemoryIdentity {
    users: DashMap<String, StoredUser>,
    current: RwLock<Option<Principal>>,
}

impl MemoryIdentity {
    /// Create a new provider with no registered users
    pub fn new() -> Self {
        Self::default()
    }

    fn digest(password: &str) -> [u8; 32] {
        Sha256::digest(password.as_bytes()).into()
    }

    fn set_current(&self, principal: Option<Principal>) {
        if let Ok(mut current) = self.current.write() {
            *current = principal;
        }
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<Principal, AuthError> {
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }
        if self.users.contains_key(email) {
            return Err(AuthError::EmailTaken {
                email: email.to_string(),
            });
        }

        let user = StoredUser {
            id: Uuid::new_v4().to_string(),
            digest: Self::digest(password),
            role,
        };
        self.users.insert(email.to_string(), user.clone());

        let principal = Principal {
            id: user.id,
            email: email.to_string(),
            role,
        };
        self.set_current(Some(principal.clone()));
        Ok(principal)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Principal, AuthError> {
        let user = self
            .users
            .get(email)
            .ok_or(AuthError::InvalidCredentials)?
            .clone();

        if user.digest != Self::digest(password) {
            return Err(AuthError::InvalidCredentials);
        }

        let principal = Principal {
            id: user.id,
            email: email.to_string(),
            role: user.role,
        };
        self.set_current(Some(principal.clone()));
        Ok(principal)
    }

    async fn sign_out(&self) {
        self.set_current(None);
    }

    async fn current_principal(&self) -> Option<Principal> {
        self.current.read().ok().and_then(|c| c.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sign_up_then_sign_in() {
        let identity = MemoryIdentity::new();

        let registered = identity
            .sign_up("rider@fareway.lk", "secret1", Role::Passenger)
            .await
            .unwrap();
        identity.sign_out().await;

        let signed_in = identity
            .sign_in("rider@fareway.lk", "secret1")
            .await
            .unwrap();
        assert_eq!(signed_in, registered);
        assert_eq!(signed_in.role, Role::Passenger);
    }

    #[tokio::test]
    async fn test_sign_up_rejects_weak_password() {
        let identity = MemoryIdentity::new();
        let result = identity.sign_up("rider@fareway.lk", "12345", Role::Passenger).await;
        assert_eq!(result, Err(AuthError::WeakPassword));
    }

    #[tokio::test]
    async fn test_sign_up_rejects_taken_email() {
        let identity = MemoryIdentity::new();
        identity
            .sign_up("owner@fareway.lk", "secret1", Role::Owner)
            .await
            .unwrap();

        let result = identity.sign_up("owner@fareway.lk", "secret2", Role::Owner).await;
        assert_eq!(
            result,
            Err(AuthError::EmailTaken {
                email: "owner@fareway.lk".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_sign_in_wrong_password_and_unknown_email_look_alike() {
        let identity = MemoryIdentity::new();
        identity
            .sign_up("rider@fareway.lk", "secret1", Role::Passenger)
            .await
            .unwrap();

        let wrong_password = identity.sign_in("rider@fareway.lk", "nope99").await;
        let unknown_email = identity.sign_in("ghost@fareway.lk", "secret1").await;

        assert_eq!(wrong_password, Err(AuthError::InvalidCredentials));
        assert_eq!(unknown_email, Err(AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let identity = MemoryIdentity::new();
        assert!(identity.current_principal().await.is_none());

        let principal = identity
            .sign_up("conductor@fareway.lk", "secret1", Role::Conductor)
            .await
            .unwrap();
        assert_eq!(identity.current_principal().await, Some(principal));

        identity.sign_out().await;
        assert!(identity.current_principal().await.is_none());
    }
}
