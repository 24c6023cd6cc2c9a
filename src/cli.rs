//! Command-line arguments.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use wxcast_core::TemperatureUnit;

/// Weather-grounded temperature predictions
#[derive(Parser, Debug)]
#[command(name = "wxcast")]
#[command(about = "Temperature predictions grounded on historical weather data")]
#[command(version)]
pub struct Cli {
    /// Config file to use instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Temperature unit: fahrenheit (f) or celsius (c). Overrides the config file.
    #[arg(long, short, global = true, value_name = "UNIT")]
    pub unit: Option<TemperatureUnit>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Predict the temperature a few days out as a bare value or range
    Predict {
        city: String,
        /// Days after today
        #[arg(long, short, default_value_t = 1)]
        days: i64,
        /// Predict the week starting on that day from the same week in prior years
        #[arg(long)]
        week: bool,
    },
    /// Narrative forecast for a distant date, grounded on decades of data
    LongRange {
        city: String,
        /// Target date (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,
    },
    /// Daily temperatures for a city over a date range
    History {
        city: String,
        /// First day (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,
        /// Last day (YYYY-MM-DD)
        #[arg(long)]
        end: NaiveDate,
    },
    /// Chat with the weather assistant, one message per line
    Chat,
}

impl Command {
    /// Whether the command calls the generative endpoint.
    pub fn needs_model(&self) -> bool {
        !matches!(self, Command::History { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predict_args() {
        let cli = Cli::try_parse_from(["wxcast", "predict", "Atlanta", "--days", "3", "-u", "c"]).unwrap();
        assert_eq!(cli.unit, Some(TemperatureUnit::Celsius));
        match cli.command {
            Command::Predict { city, days, week } => {
                assert_eq!(city, "Atlanta");
                assert_eq!(days, 3);
                assert!(!week);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_predict_week_flag() {
        let cli = Cli::try_parse_from(["wxcast", "predict", "Lisbon", "-d", "20", "--week"]).unwrap();
        assert!(cli.command.needs_model());
        assert!(matches!(cli.command, Command::Predict { days: 20, week: true, .. }));
    }

    #[test]
    fn test_history_needs_no_model() {
        let cli = Cli::try_parse_from([
            "wxcast", "history", "Paris", "--start", "2024-01-01", "--end", "2024-01-07",
        ])
        .unwrap();
        assert!(!cli.command.needs_model());
        assert!(Cli::try_parse_from(["wxcast", "chat"]).unwrap().command.needs_model());
    }

    #[test]
    fn test_rejects_bad_unit_and_date() {
        assert!(Cli::try_parse_from(["wxcast", "predict", "Oslo", "--unit", "kelvin"]).is_err());
        assert!(Cli::try_parse_from(["wxcast", "long-range", "Oslo", "--date", "soon"]).is_err());
    }
}
