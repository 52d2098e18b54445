pub mod chunk;
pub mod dispatcher;
pub mod error;
pub mod messenger;
pub mod pacer;
pub mod plan;
pub mod types;

pub use dispatcher::{DispatchReport, Dispatcher};
pub use error::{DispatchError, SendError};
pub use messenger::Messenger;
pub use pacer::{DelayWindow, NoDelay, Pacer, TokioPacer};
pub use plan::PlanBuilder;
pub use types::{DispatchPlan, InboundEvent, OutboundMessage};
