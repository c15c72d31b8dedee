//! Provider trait definitions for external service integrations
//!
//! This module defines the trait interfaces the wizard depends on:
//! - Object storage (Supabase Storage)
//! - Relational tables (Supabase PostgREST)
//! - One-time code verification (HTTP endpoint)
//! - Geocoding (Nominatim)

pub mod geo;
pub mod mock;
pub mod otp;
pub mod storage;
pub mod tables;

// Re-export commonly used types
pub use geo::{Geocoder, NominatimGeocoder};
pub use otp::{HttpOtpVerifier, OtpVerifier};
pub use storage::{StorageProvider, SupabaseStorage};
pub use tables::{to_row, SupabaseTables, TableProvider};
