//! Position management: turns direction reversals into intents.
//!
//! - `machine`: the Flat / Long / Short state machine and its enable flags
//! - `venue`: the execution collaborator trait the machine talks to
//!
//! The machine emits intents, never fills. Position state is owned by the venue.

pub mod machine;
pub mod venue;

pub use machine::{PositionStateMachine, TradeFlags};
pub use venue::{ExecutionVenue, Rejection};
