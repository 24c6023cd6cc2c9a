//! Reduce archive data to the statistics a prediction prompt needs.

use wxcast_core::{WeatherConfig, WeatherError};

use crate::archive::ArchiveClient;
use crate::types::{
    mean, DateWindow, Location, Strategy, Summary, TemperatureSeries, TemperatureUnit, Trend,
    YearSummary,
};

/// Trailing days averaged into the recent point estimate.
pub const POINT_ESTIMATE_DAYS: usize = 3;

/// Result of one aggregation: the statistics plus the raw series when the
/// strategy fetched a single window.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub window: DateWindow,
    pub unit: TemperatureUnit,
    pub series: Option<TemperatureSeries>,
    pub summary: Summary,
}

/// Mean of the last [`POINT_ESTIMATE_DAYS`] daily means.
pub fn point_estimate(series: &TemperatureSeries) -> Option<f64> {
    let means = series.means();
    let start = means.len().saturating_sub(POINT_ESTIMATE_DAYS);
    mean(&means[start..])
}

/// Summary of a single contiguous series.
///
/// Extremes come from the min/max columns when present, otherwise from the
/// means. Climate summaries always use the daily means.
pub fn summarize_series(
    series: &TemperatureSeries,
    strategy: Strategy,
    trend_years: u32,
) -> Result<Summary, WeatherError> {
    let means = series.means();
    let average = mean(&means)
        .ok_or_else(|| WeatherError::IncompleteData("series has no mean temperatures".into()))?;

    let (mins, maxes): (Vec<f64>, Vec<f64>) = if strategy == Strategy::Climate {
        (Vec::new(), Vec::new())
    } else {
        (
            series.days.iter().filter_map(|d| d.min).collect(),
            series.days.iter().filter_map(|d| d.max).collect(),
        )
    };
    let min = extreme(if mins.is_empty() { &means } else { &mins }, f64::min);
    let max = extreme(if maxes.is_empty() { &means } else { &maxes }, f64::max);

    let (first_date, last_date) = series
        .first_date()
        .zip(series.last_date())
        .ok_or_else(|| WeatherError::IncompleteData("empty series".into()))?;

    Ok(Summary {
        average,
        min,
        max,
        point_estimate: match strategy {
            Strategy::Recent => point_estimate(series),
            _ => None,
        },
        years: Vec::new(),
        skipped_years: 0,
        trend: match strategy {
            Strategy::Climate => Trend::from_means(&means, trend_years),
            _ => None,
        },
        first_date,
        last_date,
    })
}

/// Summary over the years that returned data. Failed years are excluded.
pub fn summarize_years(
    window: &DateWindow,
    years: Vec<YearSummary>,
    attempted: u32,
) -> Result<Summary, WeatherError> {
    let averages: Vec<f64> = years.iter().map(|y| y.average).collect();
    let average = mean(&averages).ok_or(WeatherError::InsufficientHistory { attempted })?;

    Ok(Summary {
        average,
        min: extreme(&averages, f64::min),
        max: extreme(&averages, f64::max),
        point_estimate: None,
        skipped_years: attempted.saturating_sub(years.len() as u32),
        years,
        trend: None,
        first_date: window.start,
        last_date: window.end,
    })
}

fn extreme(values: &[f64], pick: fn(f64, f64) -> f64) -> f64 {
    values.iter().copied().reduce(pick).unwrap_or(f64::NAN)
}

/// Turns a location and a date window into a [`Summary`].
#[derive(Debug, Clone)]
pub struct TemperatureAggregator {
    archive: ArchiveClient,
    history_years: u32,
    trend_years: u32,
}

impl TemperatureAggregator {
    pub fn new(archive: ArchiveClient, settings: &WeatherConfig) -> Self {
        Self {
            archive,
            history_years: settings.history_years,
            trend_years: settings.trend_years,
        }
    }

    pub fn history_years(&self) -> u32 {
        self.history_years
    }

    /// Fetch and reduce temperatures for `window` using its strategy.
    ///
    /// An inverted window fails before any request is issued.
    pub async fn aggregate(
        &self,
        location: &Location,
        window: &DateWindow,
        unit: TemperatureUnit,
    ) -> Result<Aggregate, WeatherError> {
        if !window.is_valid() {
            return Err(WeatherError::InvalidRange {
                start: window.start,
                end: window.end,
            });
        }

        match window.strategy {
            Strategy::Recent | Strategy::Span | Strategy::Climate => {
                self.single(location, window, unit).await
            }
            Strategy::HistoricalSameDate | Strategy::HistoricalRange => {
                self.scan_years(location, window, unit).await
            }
        }
    }

    async fn single(
        &self,
        location: &Location,
        window: &DateWindow,
        unit: TemperatureUnit,
    ) -> Result<Aggregate, WeatherError> {
        let series = self
            .archive
            .fetch(location, window, unit, window.strategy.daily_fields())
            .await?;
        let summary = summarize_series(&series, window.strategy, self.trend_years)?;

        tracing::info!(
            "Summarized {} day(s) for {}: avg {:.1}{}",
            series.len(),
            location.resolved_name,
            summary.average,
            unit.symbol()
        );

        Ok(Aggregate {
            window: *window,
            unit,
            series: Some(series),
            summary,
        })
    }

    /// One request per prior year; a failing year is skipped, not fatal.
    async fn scan_years(
        &self,
        location: &Location,
        window: &DateWindow,
        unit: TemperatureUnit,
    ) -> Result<Aggregate, WeatherError> {
        let mut years = Vec::new();

        for offset in 1..=self.history_years {
            let Some(past) = window.shift_years_back(offset) else {
                tracing::warn!("Cannot shift {:?} back {} year(s); skipping", window, offset);
                continue;
            };

            match self
                .archive
                .fetch(location, &past, unit, window.strategy.daily_fields())
                .await
            {
                Ok(series) => match YearSummary::from_series(&past, &series) {
                    Some(year) => years.push(year),
                    None => tracing::warn!("No mean temperatures for {}; skipping", past.start),
                },
                Err(e) => {
                    tracing::warn!(
                        "Skipping {}..{} for {}: {}",
                        past.start,
                        past.end,
                        location.resolved_name,
                        e
                    );
                }
            }
        }

        let summary = summarize_years(window, years, self.history_years)?;
        if summary.skipped_years > 0 {
            tracing::warn!(
                "{} of {} historical year(s) unavailable for {}",
                summary.skipped_years,
                self.history_years,
                location.resolved_name
            );
        }

        Ok(Aggregate {
            window: *window,
            unit,
            series: None,
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DailyRecord;
    use chrono::NaiveDate;

    fn series(means: &[f64]) -> TemperatureSeries {
        let start = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        TemperatureSeries {
            days: means
                .iter()
                .enumerate()
                .map(|(i, m)| DailyRecord {
                    date: start + chrono::Days::new(i as u64),
                    mean: Some(*m),
                    max: Some(m + 5.0),
                    min: Some(m - 5.0),
                    precipitation: None,
                })
                .collect(),
            dropped_days: 0,
        }
    }

    fn year(year: i32, average: f64) -> YearSummary {
        YearSummary {
            year,
            average,
            average_max: None,
            average_min: None,
            precipitation_total: None,
        }
    }

    fn window() -> DateWindow {
        DateWindow::same_date(NaiveDate::from_ymd_opt(2025, 7, 4).unwrap(), 3)
    }

    #[test]
    fn test_point_estimate_uses_last_three_means() {
        let s = series(&[40.0, 42.0, 44.0, 50.0, 52.0, 57.0]);
        assert_eq!(point_estimate(&s), Some(53.0));
    }

    #[test]
    fn test_point_estimate_short_series() {
        assert_eq!(point_estimate(&series(&[40.0, 44.0])), Some(42.0));
        assert_eq!(point_estimate(&TemperatureSeries::default()), None);
    }

    #[test]
    fn test_recent_summary_uses_min_max_columns() {
        let s = series(&[40.0, 50.0, 60.0]);
        let summary = summarize_series(&s, Strategy::Recent, 5).unwrap();
        assert!((summary.average - 50.0).abs() < 1e-9);
        assert_eq!(summary.min, 35.0);
        assert_eq!(summary.max, 65.0);
        assert_eq!(summary.point_estimate, Some(50.0));
        assert!(summary.trend.is_none());
    }

    #[test]
    fn test_span_summary_has_no_point_estimate() {
        let summary = summarize_series(&series(&[1.0, 2.0]), Strategy::Span, 5).unwrap();
        assert_eq!(summary.point_estimate, None);
        assert!(summary.trend.is_none());
    }

    #[test]
    fn test_climate_extremes_come_from_means() {
        let s = series(&[10.0, 20.0, 30.0]);

        let climate = summarize_series(&s, Strategy::Climate, 5).unwrap();
        assert_eq!(climate.min, 10.0);
        assert_eq!(climate.max, 30.0);

        let span = summarize_series(&s, Strategy::Span, 5).unwrap();
        assert_eq!(span.min, 5.0);
        assert_eq!(span.max, 35.0);
    }

    #[test]
    fn test_years_average_only_successful_years() {
        let years = vec![year(2024, 80.0), year(2022, 70.0), year(2019, 75.0)];
        let summary = summarize_years(&window(), years, 10).unwrap();
        assert!((summary.average - 75.0).abs() < 1e-9);
        assert_eq!(summary.min, 70.0);
        assert_eq!(summary.max, 80.0);
        assert_eq!(summary.skipped_years, 7);
        assert_eq!(summary.years.len(), 3);
    }

    #[test]
    fn test_no_years_is_insufficient_history() {
        let err = summarize_years(&window(), Vec::new(), 10).unwrap_err();
        assert!(matches!(err, WeatherError::InsufficientHistory { attempted: 10 }));
    }
}
