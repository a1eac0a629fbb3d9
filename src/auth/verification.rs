// Email verification token generation

use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::ApiError;

/// Random bytes per token (256 bits)
pub const TOKEN_BYTES: usize = 32;

/// Generates unguessable activation tokens from the OS random source
#[derive(Debug, Clone, Copy, Default)]
pub struct VerificationTokenGenerator;

impl VerificationTokenGenerator {
    /// Generate a lower-case hex token of `2 * TOKEN_BYTES` characters
    ///
    /// Failure of the OS random source is not retried.
    pub fn generate(&self) -> Result<String, ApiError> {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| ApiError::Internal(format!("random source failure: {}", e)))?;
        Ok(hex::encode(bytes))
    }
}
