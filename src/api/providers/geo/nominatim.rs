//! OpenStreetMap Nominatim search

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::Geocoder;
use crate::api::error::ApiError;
use crate::config::Config;
use crate::types::{Coordinates, NearbyStore};

const PROVIDER_NAME: &str = "nominatim";

pub struct NominatimGeocoder {
    base_url: String,
    user_agent: String,
    client: Client,
}

/// Search hit; lat/lon arrive as strings from the public instance
#[derive(Debug, Deserialize)]
struct Place {
    lat: Value,
    lon: Value,
    #[serde(default)]
    display_name: Option<String>,
}

impl Place {
    fn coordinates(&self) -> Option<Coordinates> {
        Coordinates::new(number(&self.lat)?, number(&self.lon)?)
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl NominatimGeocoder {
    pub fn new(base_url: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user_agent: user_agent.into(),
            client: Client::new(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        let geo = &config.geocoding;
        if geo.base_url.is_empty() {
            return Err(ApiError::not_configured(PROVIDER_NAME));
        }
        Ok(Self::new(&geo.base_url, &geo.user_agent))
    }

    async fn search(&self, query: &[(&str, String)]) -> Result<Vec<Place>, ApiError> {
        let url = format!("{}/search", self.base_url);
        debug!("Nominatim GET: {} {:?}", url, query);

        let response = self
            .client
            .get(&url)
            .header("User-Agent", &self.user_agent)
            .header("Accept", "application/json")
            .query(query)
            .send()
            .await
            .map_err(|e| ApiError::network(PROVIDER_NAME, e.to_string()))?;

        if !response.status().is_success() {
            return Err(ApiError::from_response(PROVIDER_NAME, response).await);
        }

        response
            .json()
            .await
            .map_err(|e| ApiError::parse(PROVIDER_NAME, e.to_string()))
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn geocode(
        &self,
        address: &str,
        country_code: &str,
    ) -> Result<Option<Coordinates>, ApiError> {
        let places = self
            .search(&[
                ("format", "json".to_string()),
                ("q", address.to_string()),
                ("countrycodes", country_code.to_string()),
                ("limit", "1".to_string()),
            ])
            .await?;

        Ok(places.first().and_then(Place::coordinates))
    }

    async fn nearby_stores(
        &self,
        around: Coordinates,
        radius_m: u32,
    ) -> Result<Vec<NearbyStore>, ApiError> {
        let places = self
            .search(&[
                ("format", "json".to_string()),
                ("amenity", "shop".to_string()),
                ("lat", around.lat().to_string()),
                ("lon", around.lng().to_string()),
                ("radius", radius_m.to_string()),
            ])
            .await?;

        Ok(places
            .into_iter()
            .filter_map(|place| match place.coordinates() {
                Some(coordinates) => Some(NearbyStore {
                    coordinates,
                    display_name: place.display_name.unwrap_or_default(),
                }),
                None => {
                    warn!("Skipping shop with unusable position: {:?}", place);
                    None
                }
            })
            .collect())
    }
}
