//! Password hashing.

use bcrypt::BcryptError;
use idgate_core::{GatewayError, GatewayResult};
use tracing::error;

/// Lowest cost bcrypt accepts.
pub const MIN_COST: u32 = 4;
/// Highest cost bcrypt accepts.
pub const MAX_COST: u32 = 31;
/// Longest password bcrypt hashes without truncating, in bytes.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Hashes passwords with bcrypt on tokio's blocking pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    /// Creates a hasher with the given cost.
    ///
    /// # Errors
    ///
    /// Returns an internal error if `cost` is outside the range bcrypt accepts.
    pub fn new(cost: u32) -> GatewayResult<Self> {
        if !(MIN_COST..=MAX_COST).contains(&cost) {
            return Err(GatewayError::internal(format!(
                "bcrypt cost must be between {MIN_COST} and {MAX_COST}, got {cost}"
            )));
        }
        Ok(Self { cost })
    }

    /// Returns the configured cost.
    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hashes `password`, returning the encoded bcrypt string.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `password` is longer than
    /// [`MAX_PASSWORD_BYTES`].
    pub async fn hash(&self, password: String) -> GatewayResult<String> {
        let cost = self.cost;
        tokio::task::spawn_blocking(move || bcrypt::non_truncating_hash(password, cost))
            .await
            .map_err(|e| {
                error!(error = %e, "Hashing task failed");
                GatewayError::internal("failed to hash password")
            })?
            .map_err(|e| match e {
                BcryptError::Truncation(_) => GatewayError::validation(format!(
                    "invalid password, must be at most {MAX_PASSWORD_BYTES} bytes"
                )),
                e => {
                    error!(error = %e, "bcrypt failed");
                    GatewayError::internal("failed to hash password")
                }
            })
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            cost: bcrypt::DEFAULT_COST,
        }
    }
}
