pub mod client;
pub mod error;
pub mod signature;
pub mod webhook;

pub use client::LineClient;
pub use error::LineError;
pub use webhook::{Classified, WebhookEvent, WebhookPayload};
