//! Prompt templates and parsers for model replies.
//!
//! Every template is a pure function of its inputs so the same summary always
//! renders the same prompt.

use chrono::NaiveDate;
use std::fmt::Write;
use wxcast_core::{PredictionError, TemperatureUnit};
use wxcast_weather::{Aggregate, Strategy, Summary, TrendDirection};

use crate::chat::ChatSession;

/// Words that mark a chat message as a weather question.
pub const WEATHER_WORDS: &[&str] = &[
    "weather",
    "temperature",
    "temp",
    "hot",
    "cold",
    "warm",
    "climate",
];

pub fn is_weather_question(text: &str) -> bool {
    let lower = text.to_lowercase();
    WEATHER_WORDS.iter().any(|word| lower.contains(word))
}

/// System persona for the grounded long-range forecast.
pub const LONG_RANGE_SYSTEM: &str = "You are a conceptual, long-range atmospheric modeling AI. \
Your task is to generate a plausible, detailed weather scenario for the future date requested by the user, \
explicitly analyzing the provided HISTORICAL DATA SUMMARY.

1. Analyze Premise: Use the historical data summary as the primary input for multi-year climate tendencies.
2. Grounding: Use real-time search results to contextualize the current climate, seasonal expectations, and geography of the location.
3. Output Format: Respond with a single, cohesive paragraph that includes the predicted conditions, \
a temperature range in BOTH Fahrenheit and Celsius, and a summary of the wind patterns.
4. Tone: Be authoritative and confident.";

fn f1(value: f64, unit: TemperatureUnit) -> String {
    format!("{value:.1}{}", unit.symbol())
}

/// Value-only prediction: the model must answer with a temperature or range.
pub fn single_shot(city: &str, target_date: NaiveDate, aggregate: &Aggregate) -> String {
    let unit = aggregate.unit;
    let summary = &aggregate.summary;
    let symbol = unit.symbol();

    let mut data = String::new();
    match summary.point_estimate {
        Some(estimate) => {
            let _ = writeln!(
                data,
                "Recent Data ({} to {}):",
                summary.first_date, summary.last_date
            );
            let _ = writeln!(data, "- Average temperature: {}", f1(summary.average, unit));
            let _ = writeln!(data, "- Coldest: {}", f1(summary.min, unit));
            let _ = writeln!(data, "- Hottest: {}", f1(summary.max, unit));
            let _ = writeln!(data, "- Recent trend estimate: {}", f1(estimate, unit));
        }
        None if !summary.years.is_empty() => {
            let period = match aggregate.window.strategy {
                Strategy::HistoricalRange => "same week",
                _ => "same date",
            };
            let _ = writeln!(
                data,
                "Historical Data ({period}, {} prior years):",
                summary.years.len()
            );
            let _ = writeln!(data, "- Average temperature: {}", f1(summary.average, unit));
            let _ = writeln!(data, "- Coldest year: {}", f1(summary.min, unit));
            let _ = writeln!(data, "- Hottest year: {}", f1(summary.max, unit));
            let totals: Vec<f64> = summary
                .years
                .iter()
                .filter_map(|y| y.precipitation_total)
                .collect();
            if !totals.is_empty() {
                let average = totals.iter().sum::<f64>() / totals.len() as f64;
                let _ = writeln!(data, "- Average weekly precipitation: {average:.1} mm");
            }
        }
        None => {
            let _ = writeln!(
                data,
                "Historical Data ({} to {}):",
                summary.first_date, summary.last_date
            );
            let _ = writeln!(data, "- Average temperature: {}", f1(summary.average, unit));
            let _ = writeln!(data, "- Coldest: {}", f1(summary.min, unit));
            let _ = writeln!(data, "- Hottest: {}", f1(summary.max, unit));
        }
    }

    format!(
        "Based on this weather data for {city}, predict the temperature for {target_date}:

{data}
IMPORTANT: Respond with ONLY a temperature value or range. No explanation, no analysis, no extra text.
Examples of valid responses:
- \"65{symbol}\"
- \"58-72{symbol}\"
- \"45.5{symbol}\"

Your response:"
    )
}

/// Chat answer grounded on the trailing window and its point estimate.
pub fn recent_chat(
    city: &str,
    target_date: NaiveDate,
    aggregate: &Aggregate,
    question: &str,
    transcript: &str,
) -> String {
    let unit = aggregate.unit;
    let summary = &aggregate.summary;

    let mut daily = String::new();
    let mut last_days = Vec::new();
    if let Some(series) = &aggregate.series {
        for day in &series.days {
            if let Some(mean) = day.mean {
                let _ = writeln!(daily, "{}: {}", day.date, f1(mean, unit));
                last_days.push(f1(mean, unit));
            }
        }
    }
    let tail = last_days.len().saturating_sub(3);
    let last_three = last_days[tail..].join(", ");
    let estimate = summary.point_estimate.unwrap_or(summary.average);

    format!(
        "{transcript}Here's the RECENT weather data for {city}:

Average temperature (last {days} days): {avg}
Highest: {max}
Lowest: {min}
Last 3 days: {last_three}

Daily temperatures:
{daily}
Based on the recent trend, {target_date} is predicted to be around {estimate}.

User's question: {question}

Answer their question using this recent weather data and prediction.",
        days = daily.lines().count(),
        avg = f1(summary.average, unit),
        max = f1(summary.max, unit),
        min = f1(summary.min, unit),
        estimate = f1(estimate, unit),
    )
}

/// Chat answer grounded on the same calendar date in prior years.
pub fn historical_chat(
    city: &str,
    target_date: NaiveDate,
    aggregate: &Aggregate,
    question: &str,
    transcript: &str,
) -> String {
    let unit = aggregate.unit;
    let summary = &aggregate.summary;

    let mut history = String::new();
    for year in &summary.years {
        let _ = write!(history, "{}: {}", year.year, f1(year.average, unit));
        if let (Some(lo), Some(hi)) = (year.average_min, year.average_max) {
            let _ = write!(history, " (lows {}, highs {})", f1(lo, unit), f1(hi, unit));
        }
        if let Some(rain) = year.precipitation_total {
            let _ = write!(history, ", {rain:.1} mm precipitation");
        }
        history.push('\n');
    }
    let coverage = if summary.skipped_years > 0 {
        format!(
            "\nNote: {} of {} years had no data, so coverage is thin.\n",
            summary.skipped_years,
            summary.years.len() as u32 + summary.skipped_years
        )
    } else {
        String::new()
    };

    format!(
        "{transcript}Here's HISTORICAL data for {city} around {day} from the past {n} years:

Historical average for this time of year: {avg}
Historical range: {min} to {max}

Year-by-year data for this date:
{history}{coverage}
Target prediction date: {target_date}
User's question: {question}

Based on this historical pattern, predict what the weather will be like on {target_date}. \
Use the historical average as your baseline and consider any trends you see in the data.",
        day = target_date.format("%B %d"),
        n = summary.years.len() as u32 + summary.skipped_years,
        avg = f1(summary.average, unit),
        min = f1(summary.min, unit),
        max = f1(summary.max, unit),
    )
}

/// The "HISTORICAL DATA SUMMARY" block for the long-range forecast.
pub fn historical_summary(city: &str, aggregate: &Aggregate) -> String {
    let unit = aggregate.unit;
    let summary = &aggregate.summary;
    let symbol = unit.symbol();
    let years = ((summary.last_date - summary.first_date).num_days() + 1) / 365;

    let trend = match summary.trend {
        Some(trend) => {
            let verdict = match trend.direction {
                TrendDirection::Warming => "This indicates a clear warming trend over the period.",
                TrendDirection::Cooling => "This indicates a slight cooling trend over the period.",
                TrendDirection::Stable => "The overall temperature trend is stable.",
            };
            format!(
                "The average temperature has shown a change of {:.2} {symbol} between the first {n} years and the last {n} years of data. {verdict}",
                trend.delta,
                n = trend.period_years,
            )
        }
        None => "Insufficient data points for a detailed multi-year trend comparison.".to_string(),
    };

    format!(
        "HISTORICAL DATA SUMMARY ({years}-Year Analysis for {city} in {symbol}):

* Time Span: {first} to {last}.
* Overall Average Mean Temperature: {avg:.2} {symbol}.
* Extreme Low: {min:.2} {symbol}.
* Extreme High: {max:.2} {symbol}.
* Long-Term Trend: {trend}

You MUST use these specific numbers and trends to form the foundation of your conceptual prediction.",
        first = summary.first_date,
        last = summary.last_date,
        avg = summary.average,
        min = summary.min,
        max = summary.max,
    )
}

/// Grounded narrative forecast built around [`historical_summary`].
pub fn long_range(city: &str, target_date: NaiveDate, aggregate: &Aggregate) -> String {
    let unit = aggregate.unit;
    format!(
        "Analyze the following detailed Historical Data Summary for {city}, paying close attention \
to the recorded average, extremes, and long-term trend. Use this analysis, along with real-time \
global climate context (from Search grounding), to generate a prediction.

--- HISTORICAL DATA START ---
{summary}
--- HISTORICAL DATA END ---

Prediction Query: Based on this historical data and current climate knowledge, provide a detailed \
conceptual weather forecast for {city} on {target_date}. The temperature prediction MUST be primarily \
in {primary}, but also include {secondary}.",
        summary = historical_summary(city, aggregate),
        primary = unit.symbol(),
        secondary = unit.secondary().symbol(),
    )
}

/// Ask the model to pull a city and a time phrase out of a chat message.
pub fn extraction(question: &str) -> String {
    format!(
        "From this question, extract:
1. The city name
2. When they're asking about (e.g., \"tomorrow\", \"next week\", \"January 15\", \"in 30 days\")

Question: \"{question}\"

Respond in this exact format:
City: [city name]
When: [time reference]"
    )
}

/// Ask the model to turn a time phrase into a whole number of days from today.
pub fn day_offset(today: NaiveDate, when: &str) -> String {
    format!(
        "Today is {today}. The user asked about: \"{when}\"

How many days from today is this? Just give me a number.
If it's \"tomorrow\", say 1.
If it's \"next week\", say 7.
If it's a specific date, calculate the difference.
If you're not sure or they didn't specify, say 1.

Just respond with a single number, nothing else."
    )
}

/// Plain conversation turn with the transcript as context.
pub fn general_chat(session: &ChatSession, question: &str) -> String {
    format!(
        "You are a friendly weather assistant.\n\n{}User: {question}",
        session.transcript()
    )
}

/// City and time phrase pulled from an extraction reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub city: Option<String>,
    pub when: Option<String>,
}

fn clean(value: &str) -> Option<String> {
    let cleaned: String = value
        .chars()
        .filter(|c| !matches!(c, '"' | '\'' | '[' | ']' | '*'))
        .collect();
    let cleaned = cleaned.trim();
    (!cleaned.is_empty() && !cleaned.eq_ignore_ascii_case("unknown") && !cleaned.eq_ignore_ascii_case("none"))
        .then(|| cleaned.to_string())
}

/// Parse `City: ...` / `When: ...` lines. Unknown lines are ignored.
pub fn parse_extraction(reply: &str) -> Extraction {
    let mut extraction = Extraction::default();
    for line in reply.lines() {
        let line = line.trim().trim_start_matches(['*', '-', ' ']);
        if let Some(rest) = strip_label(line, "city:") {
            extraction.city = clean(rest);
        } else if let Some(rest) = strip_label(line, "when:") {
            extraction.when = clean(rest);
        }
    }
    extraction
}

fn strip_label<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    let head = line.get(..label.len())?;
    head.eq_ignore_ascii_case(label).then(|| &line[label.len()..])
}

/// Parse a reply that should be a single integer number of days.
pub fn parse_day_offset(reply: &str) -> Result<i64, PredictionError> {
    let trimmed = reply
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '`' || c == '.')
        .trim();
    trimmed.parse::<i64>().map_err(|_| {
        PredictionError::MalformedResponse(format!("expected a number of days, got {reply:?}"))
    })
}

/// One-line summary for logs and display, e.g. "avg 61.2°F (48.0°F..72.0°F)".
pub fn describe(summary: &Summary, unit: TemperatureUnit) -> String {
    format!(
        "avg {} ({}..{})",
        f1(summary.average, unit),
        f1(summary.min, unit),
        f1(summary.max, unit)
    )
}
