pub mod composer;
pub mod openai;
pub mod persona;
pub mod provider;
pub mod router;

pub use composer::{Composed, ReplyComposer};
pub use provider::{LlmProvider, ProviderError};
