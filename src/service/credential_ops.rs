use crate::db::LedgerStorage;
use crate::error::{LotError, ValidationError};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::warn;

/// SHA-256 hex digest, the format stored in `settings.admin_password`.
pub fn hash_password(plain: &str) -> String {
    hex::encode(Sha256::digest(plain.as_bytes()))
}

fn digests_match(a: &str, b: &str) -> bool {
    bool::from(a.as_bytes().ct_eq(b.as_bytes()))
}

/// Proof that the caller presented the admin password.
///
/// Only this crate can mint one, and only after a successful verification,
/// so every mutating registry call carries its own authorization.
#[derive(Debug, Clone)]
pub struct AdminToken {
    _sealed: (),
}

impl AdminToken {
    pub(crate) fn grant() -> Self {
        Self { _sealed: () }
    }
}

/// Rules applied to a password change request before anything is written.
#[derive(Debug, Clone, Copy)]
pub struct PasswordPolicy {
    pub min_len: usize,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self { min_len: 4 }
    }
}

impl PasswordPolicy {
    /// Checked in order: current password, empty new password, confirmation, length.
    pub fn validate_change(
        &self,
        current_ok: bool,
        new_password: &str,
        confirm: &str,
    ) -> Result<(), LotError> {
        if !current_ok {
            return Err(LotError::InvalidCredentials);
        }
        if new_password.is_empty() {
            return Err(ValidationError::EmptyPassword.into());
        }
        if new_password != confirm {
            return Err(ValidationError::PasswordMismatch.into());
        }
        if new_password.chars().count() < self.min_len {
            return Err(ValidationError::PasswordTooShort { min: self.min_len }.into());
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct CredentialOps {
    storage: LedgerStorage,
}

impl CredentialOps {
    pub fn new(storage: LedgerStorage) -> Self {
        Self { storage }
    }

    pub async fn get_credential_hash(&self) -> Result<Option<String>, LotError> {
        self.storage.get_credential_hash().await
    }

    /// Hash `candidate` and compare it with the stored digest in constant time.
    pub async fn verify(&self, candidate: &str) -> Result<bool, LotError> {
        let Some(stored) = self.get_credential_hash().await? else {
            warn!("no admin credential stored; rejecting login");
            return Ok(false);
        };
        Ok(digests_match(&hash_password(candidate), &stored))
    }

    /// Hash and store `new_plain`. Callers run `PasswordPolicy` first.
    pub async fn update_credential(&self, new_plain: &str) -> Result<(), LotError> {
        self.storage
            .set_credential_hash(&hash_password(new_plain))
            .await
    }
}
