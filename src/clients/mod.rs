pub mod openai;
pub mod scripted;
pub mod traits;

pub use openai::{OpenAiChatModel, create_model};
pub use scripted::ScriptedModel;
pub use traits::{ChatMessage, ChatRole, LanguageModel};
