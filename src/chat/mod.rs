pub mod command;
pub mod conversation;

pub use command::ChatInput;
pub use conversation::{ChatError, ChatMessage, Conversation, Role};
