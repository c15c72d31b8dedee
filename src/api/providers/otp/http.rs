//! HTTP verification endpoint: `POST /api/send-otp {phone, code} -> {success}`

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::OtpVerifier;
use crate::api::error::ApiError;
use crate::config::Config;

const PROVIDER_NAME: &str = "otp";

pub struct HttpOtpVerifier {
    base_url: String,
    client: Client,
}

#[derive(Serialize)]
struct VerifyRequest<'a> {
    phone: &'a str,
    code: &'a str,
}

#[derive(Deserialize)]
struct VerifyResponse {
    #[serde(default)]
    success: bool,
}

impl HttpOtpVerifier {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        if config.otp.base_url.is_empty() {
            return Err(ApiError::not_configured(PROVIDER_NAME));
        }
        Ok(Self::new(&config.otp.base_url))
    }
}

#[async_trait]
impl OtpVerifier for HttpOtpVerifier {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn verify(&self, phone: &str, code: &str) -> Result<bool, ApiError> {
        let url = format!("{}/api/send-otp", self.base_url);
        debug!("OTP verify: {} for {}", url, phone);

        let response = self
            .client
            .post(&url)
            .json(&VerifyRequest { phone, code })
            .send()
            .await
            .map_err(|e| ApiError::network(PROVIDER_NAME, e.to_string()))?;

        if !response.status().is_success() {
            return Err(ApiError::from_response(PROVIDER_NAME, response).await);
        }

        let body: VerifyResponse = response
            .json()
            .await
            .map_err(|e| ApiError::parse(PROVIDER_NAME, e.to_string()))?;
        Ok(body.success)
    }
}
