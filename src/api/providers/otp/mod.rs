//! One-time code verification
//!
//! The verifier is authoritative for whether a user row may be created.

mod http;

pub use http::HttpOtpVerifier;

use async_trait::async_trait;

use crate::api::error::ApiError;

#[async_trait]
pub trait OtpVerifier: Send + Sync {
    fn name(&self) -> &str;

    /// Check `code` for `phone`.
    ///
    /// `Ok(false)` is a logical rejection (wrong or expired code); transport
    /// problems are errors.
    async fn verify(&self, phone: &str, code: &str) -> Result<bool, ApiError>;
}
