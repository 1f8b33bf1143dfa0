pub mod backend;
pub mod log;
pub mod noop;
pub mod webhook;

pub use backend::{NotifyBackend, PassReport};
pub use log::LogBackend;
pub use noop::NoopBackend;
pub use webhook::WebhookBackend;
