use reqwest::{Client, Response};
use std::sync::Arc;
use std::time::Duration;
use wxcast_core::{Config, NetworkError, ReqwestErrorExt, WeatherError};

use crate::aggregate::{Aggregate, TemperatureAggregator};
use crate::archive::ArchiveClient;
use crate::geocode::Geocoder;
use crate::types::{DateWindow, Location, Strategy, TemperatureUnit};

const USER_AGENT: &str = concat!("wxcast/", env!("CARGO_PKG_VERSION"));

/// Turn a non-success status into a `NetworkError`, keeping the body for diagnostics.
pub(crate) async fn check_status(response: Response) -> Result<Response, NetworkError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    tracing::debug!("Weather API returned {}: {}", status, message);
    Err(NetworkError::ServerError {
        status: status.as_u16(),
        message,
    })
}

/// Location resolver and temperature aggregator sharing one HTTP client.
#[derive(Debug, Clone)]
pub struct WeatherProvider {
    geocoder: Geocoder,
    aggregator: TemperatureAggregator,
}

impl WeatherProvider {
    pub fn new(config: &Config) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.weather.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| WeatherError::Network(e.into_network_error()))?;
        let client = Arc::new(client);

        Ok(Self {
            geocoder: Geocoder::new(client.clone(), config.endpoints.geocoding_url.clone()),
            aggregator: TemperatureAggregator::new(
                ArchiveClient::new(client, config.endpoints.archive_url.clone()),
                &config.weather,
            ),
        })
    }

    pub async fn resolve(&self, city: &str) -> Result<Location, WeatherError> {
        self.geocoder.resolve(city).await
    }

    pub async fn aggregate(
        &self,
        location: &Location,
        window: &DateWindow,
        unit: TemperatureUnit,
    ) -> Result<Aggregate, WeatherError> {
        self.aggregator.aggregate(location, window, unit).await
    }

    pub fn history_years(&self) -> u32 {
        self.aggregator.history_years()
    }

    /// Daily temperatures for a city over an explicit range.
    ///
    /// The range is checked before the city is looked up.
    pub async fn history(
        &self,
        city: &str,
        window: &DateWindow,
        unit: TemperatureUnit,
    ) -> Result<(Location, Aggregate), WeatherError> {
        if !window.is_valid() {
            return Err(WeatherError::InvalidRange {
                start: window.start,
                end: window.end,
            });
        }
        let window = DateWindow::new(window.start, window.end, Strategy::Span);
        let location = self.resolve(city).await?;
        let aggregate = self.aggregate(&location, &window, unit).await?;
        Ok((location, aggregate))
    }
}
