//! 记忆层：单回合对话记录

pub mod conversation;

pub use conversation::{Conversation, Message, Role};
