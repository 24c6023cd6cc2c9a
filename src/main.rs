mod cli;

use anyhow::Result;
use chrono::{Local, NaiveDate};
use clap::Parser;
use std::process::ExitCode;
use tokio::io::{AsyncBufReadExt, BufReader};
use wxcast_core::{App, AppError, TemperatureUnit};
use wxcast_services::{ChatAssistant, ChatSession, PipelineOutcome, Predictor};
use wxcast_weather::{DateWindow, Strategy, WeatherProvider};

use cli::{Cli, Command};

/// Exit code when the host cannot start at all.
const EXIT_FATAL: u8 = 2;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    wxcast_core::init()?;
    let cli = Cli::parse();

    let app = App::new(cli.config.as_deref())?;
    for warning in &app.validation().warnings {
        tracing::warn!("Config: {}", warning);
    }

    let unit = cli.unit.unwrap_or(app.config().weather.temperature_unit);
    let today = Local::now().date_naive();
    tracing::info!("wxcast started ({}, today is {})", unit.symbol(), today);

    let api_key = if cli.command.needs_model() {
        match app.require_api_key() {
            Ok(key) => Some(key),
            Err(e) => {
                let e = AppError::from(e);
                tracing::error!("{}", e);
                eprintln!("{}", e.user_message());
                return Ok(ExitCode::from(EXIT_FATAL));
            }
        }
    } else {
        None
    };
    let predictor = || Predictor::new(app.config(), api_key.unwrap_or_default());

    let code = match cli.command {
        Command::History { city, start, end } => {
            let provider = WeatherProvider::new(app.config())?;
            history(&provider, &city, start, end, unit).await
        }
        Command::Predict { city, days, week } => {
            let predictor = predictor()?;
            let outcome = if week {
                predictor.predict_week(&city, days, unit, today).await
            } else {
                predictor.predict(&city, days, unit, today).await
            };
            report(outcome)
        }
        Command::LongRange { city, date } => {
            report(predictor()?.long_range(&city, date, unit, today).await)
        }
        Command::Chat => chat(ChatAssistant::new(predictor()?, unit)).await?,
    };
    Ok(code)
}

fn fail(e: &AppError) -> ExitCode {
    tracing::debug!("{:?}", e);
    eprintln!("{}", e.user_message());
    ExitCode::FAILURE
}

fn report(outcome: PipelineOutcome) -> ExitCode {
    let result = match outcome.result {
        Ok(result) => result,
        Err(e) => return fail(&e),
    };

    println!(
        "{} on {}: {}",
        result.location.display_name(),
        result.target_date,
        result.narrative_text
    );
    if result.aggregate.summary.skipped_years > 0 {
        println!(
            "(note: {} year(s) of history were unavailable)",
            result.aggregate.summary.skipped_years
        );
    }
    if !result.sources.is_empty() {
        println!("\nSources:");
        for source in &result.sources {
            println!("  {} <{}>", source.title, source.uri);
        }
    }
    ExitCode::SUCCESS
}

async fn history(
    provider: &WeatherProvider,
    city: &str,
    start: NaiveDate,
    end: NaiveDate,
    unit: TemperatureUnit,
) -> ExitCode {
    let window = DateWindow::new(start, end, Strategy::Span);
    let (location, aggregate) = match provider.history(city, &window, unit).await {
        Ok(found) => found,
        Err(e) => return fail(&e.into()),
    };

    let symbol = unit.symbol();
    println!("{} ({} to {})", location.display_name(), start, end);
    println!("{:<12} {:>9} {:>9} {:>9}", "date", "mean", "min", "max");
    if let Some(series) = &aggregate.series {
        for day in &series.days {
            let cell = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{v:.1}{symbol}"));
            println!(
                "{:<12} {:>9} {:>9} {:>9}",
                day.date.to_string(),
                cell(day.mean),
                cell(day.min),
                cell(day.max)
            );
        }
        if series.dropped_days > 0 {
            println!("({} day(s) without data omitted)", series.dropped_days);
        }
    }
    let summary = &aggregate.summary;
    println!(
        "\naverage {:.1}{symbol}, low {:.1}{symbol}, high {:.1}{symbol}",
        summary.average, summary.min, summary.max
    );
    ExitCode::SUCCESS
}

/// Read questions from stdin until EOF, keeping one session for the process.
async fn chat(assistant: ChatAssistant) -> Result<ExitCode> {
    println!("Ask about the weather anywhere. Ctrl-D to quit.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut session = ChatSession::new();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let today = Local::now().date_naive();
        let (next, reply) = assistant.respond(&session, &line, today).await;
        println!("{}\n", reply.text);
        session = next;
    }

    tracing::info!("Chat ended after {} message(s)", session.len());
    Ok(ExitCode::SUCCESS)
}
