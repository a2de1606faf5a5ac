pub mod buffer;
pub mod config;
pub mod conversation;
pub mod error;
pub mod pacer;
pub mod session;
pub mod validation;

pub use buffer::StreamBuffer;
pub use config::CompanionConfig;
pub use conversation::{ChatMessage, Conversation, WELCOME_MESSAGE};
pub use error::ChatError;
pub use pacer::{DisplayPacer, DisplaySink, PacerHandle};
pub use session::ChatSession;
