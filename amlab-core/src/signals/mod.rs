//! Signal side of the strategy: direction of the published AML and the
//! intents derived from it.
//!
//! Signals never look at position state; only the position state machine does.

pub mod direction;
pub mod intent;

pub use direction::{Direction, DirectionTracker, DirectionUpdate, Transition};
pub use intent::{IntentKind, OrderIntent, Protection};
