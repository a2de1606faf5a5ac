use llm_core::{FailureCategory, TransportError};
use thiserror::Error;

/// Errors surfaced by a chat turn.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid API key. Please set OPENAI_API_KEY to a valid key.")]
    InvalidApiKey,

    #[error(transparent)]
    Transport(#[from] TransportError),
}

const QUOTA_HELP: &str = "\n\nThis is a billing/quota issue. Please:\n\
• Check your OpenAI billing at https://platform.openai.com/account/billing\n\
• Add credits or set up a payment method\n\
• Verify you haven't exceeded your usage limits";

const AUTH_HELP: &str = "\n\nThis is an authentication issue. Please:\n\
• Verify OPENAI_API_KEY is set correctly\n\
• Make sure the API key starts with 'sk-'";

const CONNECTIVITY_HELP: &str = "\n\nPlease check:\n\
• Your API key is valid\n\
• You have an internet connection\n\
• Your OpenAI account has credits";

impl ChatError {
    pub fn category(&self) -> FailureCategory {
        match self {
            ChatError::InvalidApiKey => FailureCategory::Authentication,
            ChatError::Transport(e) => e.category(),
            ChatError::InvalidInput(_) => FailureCategory::Connectivity,
        }
    }

    /// Guidance appended to the error shown in the conversation.
    pub fn help_text(&self) -> &'static str {
        match self.category() {
            FailureCategory::Quota => QUOTA_HELP,
            FailureCategory::Authentication => AUTH_HELP,
            FailureCategory::Connectivity => CONNECTIVITY_HELP,
        }
    }

    /// Text of the assistant message that replaces a failed reply.
    pub fn to_chat_content(&self) -> String {
        tracing::error!("chat turn failed: {}", self);
        format!("I'm sorry, I encountered an error: {}{}", self, self.help_text())
    }
}
