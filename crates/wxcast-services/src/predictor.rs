//! The resolve → aggregate → compose pipeline behind every prediction.

use chrono::{Days, NaiveDate};
use tracing::instrument;
use wxcast_core::{AppError, Config, Lifecycle, Stage, TemperatureUnit, WeatherConfig, WeatherError};
use wxcast_weather::{Aggregate, DateWindow, Location, WeatherProvider};

use crate::gemini::{GenerateRequest, GenerativeClient, Source};
use crate::prompt;

/// Narrative output of one completed pipeline.
#[derive(Debug, Clone)]
pub struct PredictionResult {
    pub location: Location,
    pub target_date: NaiveDate,
    pub unit_symbol: &'static str,
    pub narrative_text: String,
    pub sources: Vec<Source>,
    pub aggregate: Aggregate,
    /// Prompt that produced `narrative_text`
    pub prompt: String,
    /// Generative attempts, including retries
    pub attempts: u32,
}

/// A finished lifecycle and what it produced.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub lifecycle: Lifecycle,
    pub result: Result<PredictionResult, AppError>,
}

impl PipelineOutcome {
    pub fn is_done(&self) -> bool {
        self.lifecycle.stage() == Stage::Done
    }
}

/// Target date `days_ahead` days after `today`. Negative offsets are rejected.
pub fn target_date(today: NaiveDate, days_ahead: i64) -> Result<NaiveDate, WeatherError> {
    u64::try_from(days_ahead)
        .ok()
        .and_then(|days| today.checked_add_days(Days::new(days)))
        .ok_or_else(|| WeatherError::InvalidRange {
            start: today,
            end: today
                .checked_sub_days(Days::new(days_ahead.unsigned_abs()))
                .unwrap_or(today),
        })
}

/// Owns the weather provider and the generative client for one host.
#[derive(Debug, Clone)]
pub struct Predictor {
    weather: WeatherProvider,
    model: GenerativeClient,
    settings: WeatherConfig,
}

impl Predictor {
    pub fn new(config: &Config, api_key: &str) -> Result<Self, AppError> {
        Ok(Self::from_parts(
            WeatherProvider::new(config)?,
            GenerativeClient::new(config, api_key)?,
            config.weather.clone(),
        ))
    }

    pub fn from_parts(weather: WeatherProvider, model: GenerativeClient, settings: WeatherConfig) -> Self {
        Self {
            weather,
            model,
            settings,
        }
    }

    pub fn weather(&self) -> &WeatherProvider {
        &self.weather
    }

    pub fn model(&self) -> &GenerativeClient {
        &self.model
    }

    pub fn settings(&self) -> &WeatherConfig {
        &self.settings
    }

    /// Window used for a prediction `days_ahead` days out.
    pub fn window_for(&self, today: NaiveDate, days_ahead: i64) -> DateWindow {
        DateWindow::for_days_ahead(
            today,
            days_ahead,
            self.settings.near_future_days,
            self.settings.recent_window_days,
            self.settings.window_radius_days,
        )
    }

    /// Value-only prediction for `days_ahead` days after `today`.
    #[instrument(skip(self), level = "info")]
    pub async fn predict(
        &self,
        city: &str,
        days_ahead: i64,
        unit: TemperatureUnit,
        today: NaiveDate,
    ) -> PipelineOutcome {
        let mut lifecycle = Lifecycle::new();
        let result = match target_date(today, days_ahead) {
            Ok(target) => {
                let window = self.window_for(today, days_ahead);
                self.run(&mut lifecycle, city, target, window, unit, |location, aggregate| {
                    GenerateRequest::prompt(prompt::single_shot(
                        &location.display_name(),
                        target,
                        aggregate,
                    ))
                })
                .await
            }
            Err(e) => Err(e.into()),
        };
        finish(lifecycle, result)
    }

    /// Value-only prediction for the week starting `days_ahead` days after
    /// `today`, grounded on the same week in each prior year.
    #[instrument(skip(self), level = "info")]
    pub async fn predict_week(
        &self,
        city: &str,
        days_ahead: i64,
        unit: TemperatureUnit,
        today: NaiveDate,
    ) -> PipelineOutcome {
        let target = match target_date(today, days_ahead) {
            Ok(target) => target,
            Err(e) => return rejected(e.into()),
        };
        let window = DateWindow::historical_range(target);
        self.execute(city, target, window, unit, |location, aggregate| {
            GenerateRequest::prompt(prompt::single_shot(
                &location.display_name(),
                target,
                aggregate,
            ))
        })
        .await
    }

    /// Grounded narrative forecast built on a multi-decade climate span.
    #[instrument(skip(self), level = "info")]
    pub async fn long_range(
        &self,
        city: &str,
        target: NaiveDate,
        unit: TemperatureUnit,
        today: NaiveDate,
    ) -> PipelineOutcome {
        if target < today {
            return rejected(WeatherError::InvalidRange { start: today, end: target }.into());
        }
        let mut lifecycle = Lifecycle::new();
        let window = DateWindow::climate_span(today, self.settings.span_years);
        let result = self
            .run(&mut lifecycle, city, target, window, unit, |location, aggregate| {
                GenerateRequest::prompt(prompt::long_range(&location.display_name(), target, aggregate))
                    .with_system_instruction(prompt::LONG_RANGE_SYSTEM)
                    .with_search_grounding()
            })
            .await;
        finish(lifecycle, result)
    }

    /// Run one lifecycle with a caller-supplied prompt.
    ///
    /// `compose` sees the resolved location and the aggregate and builds the
    /// request for the generative endpoint.
    pub async fn execute<F>(
        &self,
        city: &str,
        target: NaiveDate,
        window: DateWindow,
        unit: TemperatureUnit,
        compose: F,
    ) -> PipelineOutcome
    where
        F: FnOnce(&Location, &Aggregate) -> GenerateRequest,
    {
        let mut lifecycle = Lifecycle::new();
        let result = self
            .run(&mut lifecycle, city, target, window, unit, compose)
            .await;
        finish(lifecycle, result)
    }

    async fn run<F>(
        &self,
        lifecycle: &mut Lifecycle,
        city: &str,
        target: NaiveDate,
        window: DateWindow,
        unit: TemperatureUnit,
        compose: F,
    ) -> Result<PredictionResult, AppError>
    where
        F: FnOnce(&Location, &Aggregate) -> GenerateRequest,
    {
        lifecycle.advance(Stage::Resolving)?;
        let location = self.weather.resolve(city).await?;

        lifecycle.advance(Stage::Aggregating)?;
        let aggregate = self.weather.aggregate(&location, &window, unit).await?;
        tracing::info!(
            "{} {:?} {}",
            location.resolved_name,
            window.strategy,
            prompt::describe(&aggregate.summary, unit)
        );

        lifecycle.advance(Stage::Composing)?;
        let request = compose(&location, &aggregate);
        let generation = self.model.generate(&request).await?;

        lifecycle.advance(Stage::Done)?;
        Ok(PredictionResult {
            location,
            target_date: target,
            unit_symbol: unit.symbol(),
            narrative_text: generation.text.trim().to_string(),
            sources: generation.sources,
            aggregate,
            prompt: request.prompt_text().to_string(),
            attempts: generation.attempts,
        })
    }
}

/// Outcome for a request rejected before any stage ran.
pub fn rejected(error: AppError) -> PipelineOutcome {
    finish(Lifecycle::new(), Err(error))
}

fn finish(mut lifecycle: Lifecycle, result: Result<PredictionResult, AppError>) -> PipelineOutcome {
    if let Err(e) = &result {
        tracing::warn!("Prediction failed while {}: {}", lifecycle.stage(), e);
        if let Err(transition) = lifecycle.fail(e.kind()) {
            tracing::error!("{}", transition);
        }
    }
    PipelineOutcome { lifecycle, result }
}
