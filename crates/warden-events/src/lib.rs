//! In-process pub/sub for domain events (§4.8), separate from the audit
//! trail and from engineering logs.

pub mod bus;
pub mod event;
pub mod handler;

pub use bus::EventBus;
pub use event::Event;
pub use handler::{EventHandler, FnHandler};
