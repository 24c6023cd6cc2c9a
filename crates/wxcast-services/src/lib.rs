//! Prediction services: generative client, prompt templates, the prediction
//! pipeline and the chat assistant.

pub mod chat;
pub mod gemini;
pub mod predictor;
pub mod prompt;
pub mod retry;

pub use chat::{ChatAssistant, ChatMessage, ChatReply, ChatSession, ReplyKind, Role};
pub use gemini::{parse_generation, GenerateRequest, Generation, GenerativeClient, Source};
pub use predictor::{rejected, target_date, PipelineOutcome, PredictionResult, Predictor};
pub use retry::{with_retry, RetryConfig, RetryDecision};
