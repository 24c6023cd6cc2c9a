//! Conversational weather assistant.
//!
//! The conversation lives in a [`ChatSession`] value owned by the host.
//! [`ChatAssistant::respond`] never mutates the session it is given; it
//! returns the next session with the new turn appended.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use wxcast_core::{AppError, ErrorKind, TemperatureUnit};
use wxcast_weather::Strategy;

use crate::gemini::GenerateRequest;
use crate::predictor::{rejected, target_date, PipelineOutcome, Predictor};
use crate::prompt;

const CLARIFY_CITY: &str = "I couldn't tell which city you're asking about. \
Could you tell me the city, for example \"What will the weather be in Denver next week?\"";

/// Day offset used when the question names no time.
const DEFAULT_DAYS_AHEAD: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Ordered conversation history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// This session plus one user/assistant exchange.
    pub fn with_turn(&self, user: impl Into<String>, assistant: impl Into<String>) -> Self {
        let mut messages = self.messages.clone();
        messages.push(ChatMessage {
            role: Role::User,
            content: user.into(),
        });
        messages.push(ChatMessage {
            role: Role::Assistant,
            content: assistant.into(),
        });
        Self { messages }
    }

    /// Prior turns as `User: ...` / `Assistant: ...` lines, or empty.
    pub fn transcript(&self) -> String {
        if self.messages.is_empty() {
            return String::new();
        }
        let mut out = String::from("Previous conversation:\n");
        for message in &self.messages {
            let speaker = match message.role {
                Role::User => "User",
                Role::Assistant => "Assistant",
            };
            out.push_str(speaker);
            out.push_str(": ");
            out.push_str(&message.content);
            out.push('\n');
        }
        out.push('\n');
        out
    }
}

/// How a reply was produced.
#[derive(Debug)]
pub enum ReplyKind {
    /// Plain conversation, no weather data involved
    General,
    /// The question named no city
    Clarification,
    /// A full pipeline ran
    Forecast(Box<PipelineOutcome>),
}

#[derive(Debug)]
pub struct ChatReply {
    pub text: String,
    pub kind: ReplyKind,
    /// Set when the reply is an error message
    pub error: Option<ErrorKind>,
}

impl ChatReply {
    fn ok(text: String, kind: ReplyKind) -> Self {
        Self {
            text,
            kind,
            error: None,
        }
    }

    fn failed(error: &AppError, kind: ReplyKind) -> Self {
        Self {
            text: error.user_message().to_string(),
            kind,
            error: Some(error.kind()),
        }
    }

    fn forecast(outcome: PipelineOutcome) -> Self {
        let (text, error) = match &outcome.result {
            Ok(result) => (result.narrative_text.clone(), None),
            Err(e) => (e.user_message().to_string(), Some(e.kind())),
        };
        Self {
            text,
            kind: ReplyKind::Forecast(Box::new(outcome)),
            error,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatAssistant {
    predictor: Predictor,
    unit: TemperatureUnit,
}

impl ChatAssistant {
    pub fn new(predictor: Predictor, unit: TemperatureUnit) -> Self {
        Self { predictor, unit }
    }

    /// Answer `input` in the context of `session`.
    ///
    /// Weather questions take two model calls to extract the city and the day
    /// offset, then a full pipeline run. Every failure becomes an assistant
    /// message so the conversation can continue.
    #[instrument(skip(self, session), fields(turns = session.len()), level = "info")]
    pub async fn respond(
        &self,
        session: &ChatSession,
        input: &str,
        today: NaiveDate,
    ) -> (ChatSession, ChatReply) {
        let input = input.trim();
        let reply = if prompt::is_weather_question(input) {
            self.weather_reply(session, input, today).await
        } else {
            self.general_reply(session, input).await
        };
        (session.with_turn(input, reply.text.clone()), reply)
    }

    async fn general_reply(&self, session: &ChatSession, input: &str) -> ChatReply {
        let request = GenerateRequest::prompt(prompt::general_chat(session, input));
        match self.predictor.model().generate(&request).await {
            Ok(generation) => ChatReply::ok(generation.text.trim().to_string(), ReplyKind::General),
            Err(e) => ChatReply::failed(&e.into(), ReplyKind::General),
        }
    }

    async fn weather_reply(&self, session: &ChatSession, input: &str, today: NaiveDate) -> ChatReply {
        let (city, days_ahead) = match self.interpret(input, today).await {
            Ok(Some(parsed)) => parsed,
            Ok(None) => return ChatReply::ok(CLARIFY_CITY.to_string(), ReplyKind::Clarification),
            Err(e) => return ChatReply::failed(&e, ReplyKind::General),
        };

        let target = match target_date(today, days_ahead) {
            Ok(target) => target,
            Err(e) => return ChatReply::forecast(rejected(e.into())),
        };
        let window = self.predictor.window_for(today, days_ahead);
        let transcript = session.transcript();

        let outcome = self
            .predictor
            .execute(&city, target, window, self.unit, |location, aggregate| {
                let name = location.display_name();
                let text = match window.strategy {
                    Strategy::Recent => {
                        prompt::recent_chat(&name, target, aggregate, input, &transcript)
                    }
                    _ => prompt::historical_chat(&name, target, aggregate, input, &transcript),
                };
                GenerateRequest::prompt(text)
            })
            .await;

        ChatReply::forecast(outcome)
    }

    /// City and day offset for a weather question, or `None` without a city.
    async fn interpret(&self, input: &str, today: NaiveDate) -> Result<Option<(String, i64)>, AppError> {
        let model = self.predictor.model();

        let reply = model
            .generate(&GenerateRequest::prompt(prompt::extraction(input)))
            .await?;
        let extraction = prompt::parse_extraction(&reply.text);
        tracing::debug!("Extracted {:?}", extraction);

        let Some(city) = extraction.city else {
            return Ok(None);
        };

        let days_ahead = match extraction.when {
            Some(when) => {
                let reply = model
                    .generate(&GenerateRequest::prompt(prompt::day_offset(today, &when)))
                    .await?;
                prompt::parse_day_offset(&reply.text)?
            }
            None => DEFAULT_DAYS_AHEAD,
        };

        tracing::info!("Chat question resolved to {} in {} day(s)", city, days_ahead);
        Ok(Some((city, days_ahead)))
    }
}
