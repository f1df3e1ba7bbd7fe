//! vaultgate-hooks: audit event dispatch.
//!
//! The gateway emits an event for every session, tool call and approval
//! decision. Handlers subscribe to one [`EventKind`] or to everything.

pub mod audit;
pub mod events;
pub mod registry;

pub use events::{EventKind, HookEvent};
pub use registry::{HookHandler, HookRegistry};
