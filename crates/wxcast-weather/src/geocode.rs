//! Forward geocoding: turn a city name into coordinates.
//! Uses the Open-Meteo geocoding API - free, no API key required.

use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use tracing::instrument;
use wxcast_core::{ReqwestErrorExt, WeatherError};

use crate::provider::check_status;
use crate::types::Location;

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GeocodeResponse {
    #[serde(default)]
    pub results: Vec<GeocodeResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GeocodeResult {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub population: Option<u64>,
    pub country: Option<String>,
}

/// Pick the most populous result, or the first one when none report a population.
///
/// Ties keep the earlier result.
pub(crate) fn select_result(results: &[GeocodeResult]) -> Option<&GeocodeResult> {
    let most_populous = results
        .iter()
        .filter_map(|r| r.population.map(|p| (p, r)))
        .fold(None::<(u64, &GeocodeResult)>, |best, (p, r)| match best {
            Some((best_p, _)) if best_p >= p => best,
            _ => Some((p, r)),
        })
        .map(|(_, r)| r);

    most_populous.or_else(|| results.first())
}

#[derive(Debug, Clone)]
pub struct Geocoder {
    client: Arc<Client>,
    url: String,
}

impl Geocoder {
    pub fn new(client: Arc<Client>, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    /// Resolve a free-text city name to a single location.
    ///
    /// Single attempt; transport failures surface as `WeatherError::Network`.
    #[instrument(skip(self), level = "info")]
    pub async fn resolve(&self, query: &str) -> Result<Location, WeatherError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(WeatherError::CityNotFound(String::new()));
        }

        let response = self
            .client
            .get(&self.url)
            .query(&[("name", query)])
            .send()
            .await
            .map_err(|e| e.into_network_error())?;
        let response = check_status(response).await?;

        let body: GeocodeResponse = response
            .json()
            .await
            .map_err(|e| e.into_network_error())?;

        let chosen = select_result(&body.results)
            .ok_or_else(|| WeatherError::CityNotFound(query.to_string()))?;

        tracing::info!(
            "Resolved '{}' to {} ({}, {}) out of {} result(s)",
            query,
            chosen.name,
            chosen.latitude,
            chosen.longitude,
            body.results.len()
        );

        Ok(Location {
            query: query.to_string(),
            latitude: chosen.latitude,
            longitude: chosen.longitude,
            resolved_name: chosen.name.clone(),
            population: chosen.population,
            country: chosen.country.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(name: &str, population: Option<u64>) -> GeocodeResult {
        GeocodeResult {
            name: name.to_string(),
            latitude: 1.0,
            longitude: 2.0,
            population,
            country: None,
        }
    }

    #[test]
    fn test_selects_most_populous() {
        let results = vec![
            result("Small", Some(1_000)),
            result("Big", Some(500_000)),
            result("Medium", Some(20_000)),
        ];
        assert_eq!(select_result(&results).unwrap().name, "Big");
    }

    #[test]
    fn test_selection_ignores_order() {
        let mut results = vec![
            result("Small", Some(1_000)),
            result("Unknown", None),
            result("Big", Some(500_000)),
            result("Medium", Some(20_000)),
        ];
        for _ in 0..results.len() {
            results.rotate_left(1);
            assert_eq!(select_result(&results).unwrap().name, "Big");
            results.reverse();
            assert_eq!(select_result(&results).unwrap().name, "Big");
        }
    }

    #[test]
    fn test_population_beats_position() {
        let results = vec![result("First", None), result("Only", Some(10))];
        assert_eq!(select_result(&results).unwrap().name, "Only");
    }

    #[test]
    fn test_falls_back_to_first_without_population() {
        let results = vec![result("First", None), result("Second", None)];
        assert_eq!(select_result(&results).unwrap().name, "First");
    }

    #[test]
    fn test_zero_population_still_counts() {
        let results = vec![result("First", None), result("Hamlet", Some(0))];
        assert_eq!(select_result(&results).unwrap().name, "Hamlet");
    }

    #[test]
    fn test_empty_results() {
        assert!(select_result(&[]).is_none());
    }

    #[test]
    fn test_missing_results_key_deserializes_empty() {
        let body: GeocodeResponse = serde_json::from_str(r#"{"generationtime_ms":0.5}"#).unwrap();
        assert!(body.results.is_empty());
    }
}
