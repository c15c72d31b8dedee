//! API client modules for external service integrations
//!
//! This module provides:
//! - Provider traits for storage, tables, code verification and geocoding
//! - The `Services` bundle the wizard steps run against
//! - Error handling shared by every provider

pub mod error;
pub mod providers;

pub use error::ApiError;
pub use providers::{
    Geocoder, HttpOtpVerifier, NominatimGeocoder, OtpVerifier, StorageProvider, SupabaseStorage,
    SupabaseTables, TableProvider,
};

use std::sync::Arc;

use crate::config::{BackendConfig, Config, GeocodingConfig};

/// Everything a wizard step needs from the outside world.
///
/// Cheap to clone; the providers are shared.
#[derive(Clone)]
pub struct Services {
    pub storage: Arc<dyn StorageProvider>,
    pub tables: Arc<dyn TableProvider>,
    pub otp: Arc<dyn OtpVerifier>,
    pub geocoder: Arc<dyn Geocoder>,
    /// Bucket and table names
    pub backend: BackendConfig,
    /// Country scope, nearby radius and debounce delay
    pub geocoding: GeocodingConfig,
}

impl Services {
    /// Bundle providers with default bucket, table and geocoding settings
    pub fn new(
        storage: Arc<dyn StorageProvider>,
        tables: Arc<dyn TableProvider>,
        otp: Arc<dyn OtpVerifier>,
        geocoder: Arc<dyn Geocoder>,
    ) -> Self {
        Self {
            storage,
            tables,
            otp,
            geocoder,
            backend: BackendConfig::default(),
            geocoding: GeocodingConfig::default(),
        }
    }

    /// Build the HTTP-backed providers from configuration.
    ///
    /// Fails with `NotConfigured` when the backend URL or key is missing.
    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        let services = Self::new(
            Arc::new(SupabaseStorage::from_config(config)?),
            Arc::new(SupabaseTables::from_config(config)?),
            Arc::new(HttpOtpVerifier::from_config(config)?),
            Arc::new(NominatimGeocoder::from_config(config)?),
        );
        Ok(services.with_settings(config))
    }

    /// Take bucket, table and geocoding settings from configuration
    pub fn with_settings(mut self, config: &Config) -> Self {
        self.backend = config.backend.clone();
        self.geocoding = config.geocoding.clone();
        self
    }

    /// Names of the configured providers, for diagnostics
    pub fn provider_names(&self) -> Vec<String> {
        vec![
            self.storage.name().to_string(),
            self.tables.name().to_string(),
            self.otp.name().to_string(),
            self.geocoder.name().to_string(),
        ]
    }
}
