use async_trait::async_trait;

use crate::{entities::accounts, service::ServiceError};

/// Boundary for password-reset one-time codes. The credential flow only ever
/// calls `issue` and `verify`, so a real provider (per-request random codes,
/// expiry, SMS/email delivery) can replace the stub without touching it.
#[async_trait]
pub trait OtpService: Send + Sync {
    /// Issue a reset code for the account, out of band.
    async fn issue(&self, account: &accounts::Model) -> Result<(), ServiceError>;
    /// Check a code presented back by the client.
    fn verify(&self, code: &str) -> bool;
}

/// Development stand-in: a single well-known code, never delivered anywhere,
/// never expiring. NOT for production use.
pub struct FixedCodeOtpService;

const FIXED_RESET_CODE: &str = "123456";

#[async_trait]
impl OtpService for FixedCodeOtpService {
    async fn issue(&self, account: &accounts::Model) -> Result<(), ServiceError> {
        tracing::info!(
            account_uid = %account.uid,
            "password reset requested; fixed development code applies"
        );
        Ok(())
    }

    fn verify(&self, code: &str) -> bool {
        code == FIXED_RESET_CODE
    }
}
