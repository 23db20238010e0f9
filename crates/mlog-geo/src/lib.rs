//! Reverse geocoding for the mechanic's logbook.
//!
//! Work segments are labelled with the locality they happened in. The
//! recorder emits a [`PlaceLookup`] when a work segment closes; this crate
//! answers it against a Nominatim-compatible `/reverse` endpoint.
//!
//! Lookups are fire-and-forget: failures are logged and leave the segment's
//! fallback name in place. Nothing is retried.

use std::fmt;
use std::time::Duration;

use mlog_core::{Coordinate, PlaceLookup, SegmentId};
use serde::Deserialize;
use thiserror::Error;

/// Default request timeout for lookups.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org";
/// Zoom level at which Nominatim answers with a town/city.
const LOCALITY_ZOOM: u8 = 10;

/// Geocoding client errors.
#[derive(Debug, Error)]
pub enum GeoError {
    /// The base URL or user agent was rejected.
    #[error("invalid geocoder configuration: {reason}")]
    InvalidConfig { reason: &'static str },
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// Service returned an error response.
    #[error("geocoder error: {message}")]
    Api { message: String },
    /// Failed to parse response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Reverse geocoding client.
///
/// Cloning is cheap; clones share the underlying connection pool.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Creates a client for `base_url`.
    ///
    /// Public Nominatim instances require an identifying user agent, so an
    /// empty one is rejected.
    pub fn new(base_url: impl Into<String>, user_agent: &str) -> Result<Self, GeoError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(GeoError::InvalidConfig {
                reason: "base URL cannot be empty",
            });
        }
        if user_agent.trim().is_empty() {
            return Err(GeoError::InvalidConfig {
                reason: "user agent cannot be empty",
            });
        }

        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent(user_agent)
            .build()
            .map_err(GeoError::ClientBuild)?;

        Ok(Self { http, base_url })
    }

    /// Looks up the locality containing `coordinate`.
    ///
    /// Returns `Ok(None)` when the service knows no locality there.
    pub async fn reverse(&self, coordinate: Coordinate) -> Result<Option<String>, GeoError> {
        let url = format!("{}/reverse", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[
                ("format", "jsonv2".to_string()),
                ("lat", coordinate.latitude().to_string()),
                ("lon", coordinate.longitude().to_string()),
                ("zoom", LOCALITY_ZOOM.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(GeoError::Api {
                message: format!("status {status}: {body}"),
            });
        }
        parse_reverse_response(&body)
    }

    /// Resolves every lookup, logging failures.
    ///
    /// Each entry pairs a segment with its name, or `None` if the lookup
    /// failed or found nothing.
    pub async fn resolve_all(&self, lookups: &[PlaceLookup]) -> Vec<(SegmentId, Option<String>)> {
        let mut resolved = Vec::with_capacity(lookups.len());
        for lookup in lookups {
            let name = match self.reverse(lookup.coordinate).await {
                Ok(name) => name,
                Err(e) => {
                    tracing::warn!(
                        segment_id = %lookup.segment_id,
                        coordinate = %lookup.coordinate,
                        error = %e,
                        "place lookup failed"
                    );
                    None
                }
            };
            resolved.push((lookup.segment_id, name));
        }
        resolved
    }
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    address: Option<Address>,
}

#[derive(Debug, Deserialize)]
struct Address {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    municipality: Option<String>,
    county: Option<String>,
}

impl Address {
    fn locality(self) -> Option<String> {
        [
            self.city,
            self.town,
            self.village,
            self.municipality,
            self.county,
        ]
        .into_iter()
        .flatten()
        .map(|name| name.trim().to_string())
        .find(|name| !name.is_empty())
    }
}

fn parse_reverse_response(body: &str) -> Result<Option<String>, GeoError> {
    let payload: ReverseResponse =
        serde_json::from_str(body).map_err(|err| GeoError::InvalidResponse(err.to_string()))?;
    if let Some(error) = payload.error {
        // Nominatim answers "Unable to geocode" with 200 for open sea etc.
        tracing::debug!(%error, "geocoder found no place");
        return Ok(None);
    }
    Ok(payload.address.and_then(Address::locality))
}
