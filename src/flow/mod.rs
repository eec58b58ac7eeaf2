//! Wizard state machine over a partially filled application record.
//!
//! The record lives in the session as one JSON entry per flow. Every step
//! loads it through [`FlowStateManager`], is gated by [`FlowGuard`], and
//! writes back a shallow [`StatePatch`].

pub mod children;
pub mod codec;
mod error;
pub mod guard;
mod id;
pub mod manager;
pub mod navigation;
mod outcome;
pub mod service;
pub mod state;
pub mod variant;

pub use error::FlowError;
pub use guard::FlowGuard;
pub use id::FlowId;
pub use manager::FlowStateManager;
pub use outcome::{Destination, FlowOutcome, Redirect, RedirectReason, RouteTarget};
pub use service::{Access, FlowService};
pub use state::{FlowState, StateField, StatePatch};
pub use variant::{FlowKind, FlowVariant, Step, StepScope};
