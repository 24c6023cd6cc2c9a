use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

pub use wxcast_core::TemperatureUnit;

/// A place resolved from a free-text query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// The text the user typed
    pub query: String,
    pub latitude: f64,
    pub longitude: f64,
    pub resolved_name: String,
    pub population: Option<u64>,
    pub country: Option<String>,
}

impl Location {
    /// Name with country for display, e.g. "Atlanta, United States".
    pub fn display_name(&self) -> String {
        match &self.country {
            Some(country) if !country.is_empty() && country != &self.resolved_name => {
                format!("{}, {}", self.resolved_name, country)
            }
            _ => self.resolved_name.clone(),
        }
    }
}

/// How a date window is turned into archive requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// One request over a trailing window ending today
    Recent,
    /// One request per prior year around the same calendar date
    HistoricalSameDate,
    /// One request per prior year over the same date range
    HistoricalRange,
    /// One request over an arbitrary contiguous window
    Span,
    /// One multi-decade request of daily means, with a trend
    Climate,
}

impl Strategy {
    pub fn is_historical(&self) -> bool {
        matches!(self, Self::HistoricalSameDate | Self::HistoricalRange)
    }

    /// Daily fields requested from the archive.
    pub fn daily_fields(&self) -> &'static [DailyField] {
        match self {
            Self::Recent | Self::Span => &[
                DailyField::TemperatureMax,
                DailyField::TemperatureMin,
                DailyField::TemperatureMean,
            ],
            Self::HistoricalSameDate | Self::Climate => &[DailyField::TemperatureMean],
            Self::HistoricalRange => &[
                DailyField::TemperatureMax,
                DailyField::TemperatureMin,
                DailyField::TemperatureMean,
                DailyField::PrecipitationSum,
            ],
        }
    }
}

/// A daily variable of the archive endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DailyField {
    TemperatureMean,
    TemperatureMax,
    TemperatureMin,
    PrecipitationSum,
}

impl DailyField {
    pub fn api_name(&self) -> &'static str {
        match self {
            Self::TemperatureMean => "temperature_2m_mean",
            Self::TemperatureMax => "temperature_2m_max",
            Self::TemperatureMin => "temperature_2m_min",
            Self::PrecipitationSum => "precipitation_sum",
        }
    }
}

/// Inclusive date range plus the strategy used to fetch it.
///
/// For historical strategies the window describes the target period; each
/// scanned year uses the same window shifted back by whole years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub strategy: Strategy,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate, strategy: Strategy) -> Self {
        Self {
            start,
            end,
            strategy,
        }
    }

    /// `[today - days, today]`
    pub fn recent(today: NaiveDate, days: i64) -> Self {
        Self::new(offset(today, -days), today, Strategy::Recent)
    }

    /// `target ± radius`, scanned across prior years.
    pub fn same_date(target: NaiveDate, radius: i64) -> Self {
        Self::new(
            offset(target, -radius),
            offset(target, radius),
            Strategy::HistoricalSameDate,
        )
    }

    /// A week starting at `target`, scanned across prior years.
    pub fn historical_range(target: NaiveDate) -> Self {
        Self::new(target, offset(target, 6), Strategy::HistoricalRange)
    }

    /// The last `years` years ending today, as one contiguous request.
    pub fn climate_span(today: NaiveDate, years: u32) -> Self {
        Self::new(offset(today, -365 * i64::from(years)), today, Strategy::Climate)
    }

    /// Pick the window for a prediction `days_ahead` days from `today`.
    ///
    /// Near-future requests use the trailing window; anything further out
    /// looks at the same date in prior years.
    pub fn for_days_ahead(
        today: NaiveDate,
        days_ahead: i64,
        near_future_days: i64,
        recent_days: i64,
        radius: i64,
    ) -> Self {
        if days_ahead <= near_future_days {
            Self::recent(today, recent_days)
        } else {
            Self::same_date(offset(today, days_ahead), radius)
        }
    }

    pub fn is_valid(&self) -> bool {
        self.end >= self.start
    }

    pub fn len_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Center of the window, the date a same-date scan is about.
    pub fn center(&self) -> NaiveDate {
        offset(self.start, (self.end - self.start).num_days() / 2)
    }

    /// The same window `years` years earlier. Feb 29 maps to Feb 28.
    pub fn shift_years_back(&self, years: u32) -> Option<Self> {
        let months = Months::new(12 * years);
        Some(Self {
            start: self.start.checked_sub_months(months)?,
            end: self.end.checked_sub_months(months)?,
            strategy: self.strategy,
        })
    }
}

fn offset(date: NaiveDate, days: i64) -> NaiveDate {
    let shifted = if days >= 0 {
        date.checked_add_days(Days::new(days.unsigned_abs()))
    } else {
        date.checked_sub_days(Days::new(days.unsigned_abs()))
    };
    shifted.unwrap_or(date)
}

/// One day of archive data. Fields that were not requested are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    pub date: NaiveDate,
    pub mean: Option<f64>,
    pub max: Option<f64>,
    pub min: Option<f64>,
    pub precipitation: Option<f64>,
}

/// Chronological daily records from one archive response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemperatureSeries {
    pub days: Vec<DailyRecord>,
    /// Days the archive returned without values (not yet published)
    pub dropped_days: usize,
}

impl TemperatureSeries {
    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn means(&self) -> Vec<f64> {
        self.days.iter().filter_map(|d| d.mean).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.days.first().map(|d| d.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.days.last().map(|d| d.date)
    }
}

/// Average conditions for one scanned year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearSummary {
    pub year: i32,
    pub average: f64,
    pub average_max: Option<f64>,
    pub average_min: Option<f64>,
    pub precipitation_total: Option<f64>,
}

impl YearSummary {
    pub fn from_series(window: &DateWindow, series: &TemperatureSeries) -> Option<Self> {
        let average = mean(&series.means())?;
        let maxes: Vec<f64> = series.days.iter().filter_map(|d| d.max).collect();
        let mins: Vec<f64> = series.days.iter().filter_map(|d| d.min).collect();
        let precipitation: Vec<f64> = series.days.iter().filter_map(|d| d.precipitation).collect();

        Some(Self {
            year: window.center().year(),
            average,
            average_max: mean(&maxes),
            average_min: mean(&mins),
            precipitation_total: (!precipitation.is_empty()).then(|| precipitation.iter().sum()),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Warming,
    Cooling,
    Stable,
}

/// Change between the start and the end of a long series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    /// Last-period mean minus first-period mean
    pub delta: f64,
    pub period_years: u32,
    pub direction: TrendDirection,
}

impl Trend {
    /// Compare the first and last `years * 365` daily means.
    ///
    /// Returns `None` unless the series is longer than both periods together.
    pub fn from_means(means: &[f64], years: u32) -> Option<Self> {
        let period = 365 * years as usize;
        if period == 0 || means.len() <= 2 * period {
            return None;
        }
        let first = mean(&means[..period])?;
        let last = mean(&means[means.len() - period..])?;
        let delta = last - first;
        let direction = if delta > 0.0 {
            TrendDirection::Warming
        } else if delta < 0.0 {
            TrendDirection::Cooling
        } else {
            TrendDirection::Stable
        };

        Some(Self {
            delta,
            period_years: years,
            direction,
        })
    }
}

/// Reduced statistics sent to the composer. Recomputed on every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub average: f64,
    pub min: f64,
    pub max: f64,
    /// Mean of the last few daily means (recent strategy only)
    pub point_estimate: Option<f64>,
    /// Per-year breakdown (historical strategies only)
    pub years: Vec<YearSummary>,
    /// Scanned years that failed or returned no data
    pub skipped_years: u32,
    pub trend: Option<Trend>,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
