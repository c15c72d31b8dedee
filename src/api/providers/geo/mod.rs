//! Geocoding provider trait and implementations
//!
//! Resolves a street address to coordinates and lists shops around a point.

mod nominatim;

pub use nominatim::NominatimGeocoder;

use async_trait::async_trait;

use crate::api::error::ApiError;
use crate::types::{Coordinates, NearbyStore};

#[async_trait]
pub trait Geocoder: Send + Sync {
    fn name(&self) -> &str;

    /// First match for `address` within `country_code`, if any
    async fn geocode(
        &self,
        address: &str,
        country_code: &str,
    ) -> Result<Option<Coordinates>, ApiError>;

    /// Shops within `radius_m` meters of `around`
    async fn nearby_stores(
        &self,
        around: Coordinates,
        radius_m: u32,
    ) -> Result<Vec<NearbyStore>, ApiError>;
}
