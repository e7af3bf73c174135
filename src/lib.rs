#![allow(clippy::future_not_send)]

pub mod cli;
pub mod config;
pub mod gate;
mod logging;
pub mod openai;
pub mod options;
pub mod output;
pub mod prompts;
mod render;
pub mod session;

use async_trait::async_trait;
use openai::OpenAIError;
use thiserror::Error;

/// The two messages sent to the model for one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub system: String,
    pub user: String,
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error(transparent)]
    OpenAI(#[from] OpenAIError),
    #[error("{0}")]
    Other(String),
}

impl ModelError {
    pub const fn is_rate_limited(&self) -> bool {
        matches!(self, Self::OpenAI(OpenAIError::RateLimited(_)))
    }
}

/// A hosted chat model. `Ok(None)` means the call succeeded but produced no text.
#[async_trait]
pub trait Model: Send + Sync {
    async fn send(&self, conversation: &Conversation) -> Result<Option<String>, ModelError>;
}
