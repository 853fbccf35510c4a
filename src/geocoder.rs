//! Address geocoding through Nominatim.

use anyhow::{Context, Result};
use futures::future::join_all;
use reqwest::Client;
use serde::Deserialize;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::GeocoderConfig;
use crate::models::GeoPoint;

/// Resolves a free-text address to a coordinate
pub trait Geocoder {
    /// `Ok(None)` when the service has no match for the address
    fn geocode(&self, address: &str) -> impl Future<Output = Result<Option<GeoPoint>>> + Send;
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
}

/// Nominatim search client, spacing requests by a minimum delay
pub struct NominatimGeocoder {
    client: Client,
    url: Url,
    country_codes: Option<String>,
    min_delay: Duration,
    /// Time of the last request, shared by concurrent callers
    last_request: Mutex<Option<Instant>>,
}

impl NominatimGeocoder {
    pub fn new(config: &GeocoderConfig) -> Result<Self> {
        let url = Url::parse(&config.url).context("Invalid geocoder URL")?;
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            url,
            country_codes: config.country_codes.clone(),
            min_delay: Duration::from_millis(config.min_delay_ms),
            last_request: Mutex::new(None),
        })
    }

    async fn wait_turn(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(at) = *last {
            let elapsed = at.elapsed();
            if elapsed < self.min_delay {
                tokio::time::sleep(self.min_delay - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<GeoPoint>> {
        self.wait_turn().await;

        let mut url = self.url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("q", address)
                .append_pair("format", "json")
                .append_pair("limit", "1");
            if let Some(codes) = &self.country_codes {
                pairs.append_pair("countrycodes", codes);
            }
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Geocoding request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("Geocoder returned status {}", response.status());
        }

        let places: Vec<NominatimPlace> = response
            .json()
            .await
            .context("Failed to parse geocoder response")?;

        let Some(place) = places.into_iter().next() else {
            return Ok(None);
        };

        let lat: f64 = place.lat.parse().context("Invalid latitude in response")?;
        let lon: f64 = place.lon.parse().context("Invalid longitude in response")?;
        debug!("Geocoded '{}' to ({}, {})", address, lat, lon);
        Ok(Some(GeoPoint::new(lat, lon)))
    }
}

/// Geocode every named address concurrently.
///
/// Failures are reported per location rather than aborting the batch.
pub async fn resolve_locations<G: Geocoder>(
    geocoder: &G,
    locations: &[(String, String)],
) -> Vec<(String, Result<GeoPoint, String>)> {
    info!("Geocoding {} addresses...", locations.len());

    let tasks = locations.iter().map(|(name, address)| async move {
        let resolved = match geocoder.geocode(address).await {
            Ok(Some(point)) => Ok(point),
            Ok(None) => {
                warn!("No match for address '{}'", address);
                Err(format!("Unable to geocode address: {}", address))
            }
            Err(e) => {
                warn!("Geocoding '{}' failed: {:#}", address, e);
                Err(format!("Unable to geocode address: {} ({:#})", address, e))
            }
        };
        (name.clone(), resolved)
    });

    join_all(tasks).await
}
