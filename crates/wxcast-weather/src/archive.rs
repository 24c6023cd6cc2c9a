//! Historical weather archive client and response validation.

use chrono::NaiveDate;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use tracing::instrument;
use wxcast_core::{ReqwestErrorExt, WeatherError};

use crate::provider::check_status;
use crate::types::{DailyField, DailyRecord, DateWindow, Location, TemperatureSeries, TemperatureUnit};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone)]
pub struct ArchiveClient {
    client: Arc<Client>,
    url: String,
}

impl ArchiveClient {
    pub fn new(client: Arc<Client>, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    /// Fetch one contiguous window of daily values.
    #[instrument(
        skip(self, location, daily_fields),
        fields(lat = location.latitude, lon = location.longitude),
        level = "debug"
    )]
    pub async fn fetch(
        &self,
        location: &Location,
        window: &DateWindow,
        unit: TemperatureUnit,
        daily_fields: &[DailyField],
    ) -> Result<TemperatureSeries, WeatherError> {
        if !window.is_valid() {
            return Err(WeatherError::InvalidRange {
                start: window.start,
                end: window.end,
            });
        }

        let params = query_params(location, window, unit, daily_fields);
        let response = self
            .client
            .get(&self.url)
            .query(&params)
            .send()
            .await
            .map_err(|e| e.into_network_error())?;
        let response = check_status(response).await?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| e.into_network_error())?;

        let series = parse_daily(&body, daily_fields)?;
        if series.dropped_days > 0 {
            tracing::debug!(
                "Archive returned {} day(s) without values for {}..{}",
                series.dropped_days,
                window.start,
                window.end
            );
        }
        Ok(series)
    }
}

pub(crate) fn query_params(
    location: &Location,
    window: &DateWindow,
    unit: TemperatureUnit,
    fields: &[DailyField],
) -> Vec<(&'static str, String)> {
    let daily = fields
        .iter()
        .map(DailyField::api_name)
        .collect::<Vec<_>>()
        .join(",");

    let mut params = vec![
        ("latitude", location.latitude.to_string()),
        ("longitude", location.longitude.to_string()),
        ("start_date", window.start.format(DATE_FORMAT).to_string()),
        ("end_date", window.end.format(DATE_FORMAT).to_string()),
        ("daily", daily),
        ("timezone", "auto".to_string()),
    ];
    if let Some(unit) = unit.query_param() {
        params.push(("temperature_unit", unit.to_string()));
    }
    params
}

/// Validate the `daily` object and zip its parallel arrays into records.
///
/// Missing keys and length mismatches are hard failures. A day with a `null`
/// in any requested field is dropped, never padded.
pub fn parse_daily(body: &Value, fields: &[DailyField]) -> Result<TemperatureSeries, WeatherError> {
    let daily = body
        .get("daily")
        .and_then(Value::as_object)
        .ok_or_else(|| WeatherError::IncompleteData("response has no daily object".into()))?;

    let times = daily
        .get("time")
        .and_then(Value::as_array)
        .ok_or_else(|| WeatherError::IncompleteData("daily object has no time array".into()))?;

    let mut columns = Vec::with_capacity(fields.len());
    for field in fields {
        let values = daily
            .get(field.api_name())
            .and_then(Value::as_array)
            .ok_or_else(|| {
                WeatherError::IncompleteData(format!("daily object has no {}", field.api_name()))
            })?;
        if values.len() != times.len() {
            return Err(WeatherError::IncompleteData(format!(
                "{} has {} values for {} dates",
                field.api_name(),
                values.len(),
                times.len()
            )));
        }
        columns.push((*field, values));
    }

    let mut series = TemperatureSeries::default();
    'days: for (i, time) in times.iter().enumerate() {
        let date = time
            .as_str()
            .and_then(|s| NaiveDate::parse_from_str(s, DATE_FORMAT).ok())
            .ok_or_else(|| WeatherError::IncompleteData(format!("bad date at index {i}")))?;

        let mut record = DailyRecord {
            date,
            mean: None,
            max: None,
            min: None,
            precipitation: None,
        };
        for (field, values) in &columns {
            let value = match &values[i] {
                Value::Null => {
                    series.dropped_days += 1;
                    continue 'days;
                }
                v => v.as_f64().ok_or_else(|| {
                    WeatherError::IncompleteData(format!(
                        "non-numeric {} on {}",
                        field.api_name(),
                        date
                    ))
                })?,
            };
            match field {
                DailyField::TemperatureMean => record.mean = Some(value),
                DailyField::TemperatureMax => record.max = Some(value),
                DailyField::TemperatureMin => record.min = Some(value),
                DailyField::PrecipitationSum => record.precipitation = Some(value),
            }
        }
        series.days.push(record);
    }

    if series.is_empty() {
        return Err(WeatherError::IncompleteData("no days with values".into()));
    }

    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Strategy;
    use serde_json::json;

    const MEAN_MAX_MIN: &[DailyField] = &[
        DailyField::TemperatureMean,
        DailyField::TemperatureMax,
        DailyField::TemperatureMin,
    ];

    fn location() -> Location {
        Location {
            query: "Atlanta".into(),
            latitude: 33.749,
            longitude: -84.388,
            resolved_name: "Atlanta".into(),
            population: None,
            country: None,
        }
    }

    #[test]
    fn test_parse_complete_response() {
        let body = json!({
            "daily": {
                "time": ["2025-03-01", "2025-03-02"],
                "temperature_2m_mean": [50.1, 52.3],
                "temperature_2m_max": [60.0, 61.5],
                "temperature_2m_min": [40.2, 41.0]
            }
        });
        let series = parse_daily(&body, MEAN_MAX_MIN).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.days[1].mean, Some(52.3));
        assert_eq!(series.days[0].min, Some(40.2));
        assert_eq!(series.days[0].precipitation, None);
        assert_eq!(series.dropped_days, 0);
    }

    #[test]
    fn test_length_mismatch_is_incomplete() {
        let body = json!({
            "daily": {
                "time": ["2025-03-01", "2025-03-02", "2025-03-03"],
                "temperature_2m_mean": [50.1, 52.3, 51.0],
                "temperature_2m_max": [60.0, 61.5],
                "temperature_2m_min": [40.2, 41.0, 39.9]
            }
        });
        let err = parse_daily(&body, MEAN_MAX_MIN).unwrap_err();
        assert!(matches!(err, WeatherError::IncompleteData(_)));
    }

    #[test]
    fn test_missing_field_is_incomplete() {
        let body = json!({
            "daily": {
                "time": ["2025-03-01"],
                "temperature_2m_mean": [50.1]
            }
        });
        let err = parse_daily(&body, MEAN_MAX_MIN).unwrap_err();
        assert!(err.to_string().contains("temperature_2m_max"));
    }

    #[test]
    fn test_missing_daily_is_incomplete() {
        let body = json!({ "error": true, "reason": "out of range" });
        assert!(matches!(
            parse_daily(&body, MEAN_MAX_MIN),
            Err(WeatherError::IncompleteData(_))
        ));
    }

    #[test]
    fn test_null_days_are_dropped() {
        let body = json!({
            "daily": {
                "time": ["2025-03-01", "2025-03-02", "2025-03-03"],
                "temperature_2m_mean": [50.0, 51.0, null]
            }
        });
        let series = parse_daily(&body, &[DailyField::TemperatureMean]).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.dropped_days, 1);
        assert_eq!(series.last_date(), NaiveDate::from_ymd_opt(2025, 3, 2));
    }

    #[test]
    fn test_all_null_is_incomplete() {
        let body = json!({
            "daily": {
                "time": ["2025-03-01"],
                "temperature_2m_mean": [null]
            }
        });
        assert!(parse_daily(&body, &[DailyField::TemperatureMean]).is_err());
    }

    #[test]
    fn test_celsius_omits_unit_param() {
        let window = DateWindow::recent(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(), 7);
        let params = query_params(&location(), &window, TemperatureUnit::Celsius, MEAN_MAX_MIN);
        assert!(params.iter().all(|(k, _)| *k != "temperature_unit"));

        let params =
            query_params(&location(), &window, TemperatureUnit::Fahrenheit, MEAN_MAX_MIN);
        assert!(params.contains(&("temperature_unit", "fahrenheit".to_string())));
        assert!(params.contains(&("start_date", "2025-03-03".to_string())));
        assert!(params.contains(&(
            "daily",
            "temperature_2m_mean,temperature_2m_max,temperature_2m_min".to_string()
        )));
    }

    #[test]
    fn test_strategy_fields_are_requested() {
        let fields = Strategy::HistoricalRange.daily_fields();
        assert!(fields.contains(&DailyField::PrecipitationSum));
        assert_eq!(Strategy::HistoricalSameDate.daily_fields(), &[DailyField::TemperatureMean]);
    }
}
