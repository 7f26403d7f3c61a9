//! The AML strategy: one finished bar in, one `BarOutput` out.
//!
//! Each bar runs window → fractal → smoother → direction → position state
//! machine synchronously. The only collaborator is the execution venue, which
//! is consulted for the position sign and handed at most one intent per bar.
//!
//! A rejected intent is not resubmitted within its bar. The next bar is
//! decided from the current direction and position sign even without a new
//! reversal, so a venue that recovers picks the entry up one bar late.

use crate::config::AmlStrategyConfig;
use crate::domain::Bar;
use crate::indicators::{AmlFilter, AmlReading};
use crate::position_management::{ExecutionVenue, PositionStateMachine, Rejection};
use crate::signals::{Direction, DirectionTracker, OrderIntent, Transition};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// What the strategy produced for one bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarOutput {
    pub time: DateTime<Utc>,
    /// Published AML value, `None` while the window is filling.
    pub aml_value: Option<f64>,
    pub reading: Option<AmlReading>,
    pub direction: Direction,
    pub transition: Option<Transition>,
    pub intent: OrderIntent,
    /// Set when the venue refused `intent`.
    pub rejection: Option<Rejection>,
    /// The decision was re-run because the previous bar was rejected.
    #[serde(default)]
    pub retried: bool,
}

impl BarOutput {
    /// True if an intent was issued and accepted.
    pub fn accepted(&self) -> bool {
        !self.intent.is_none() && self.rejection.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct AmlStrategy {
    config: AmlStrategyConfig,
    filter: AmlFilter,
    tracker: DirectionTracker,
    machine: PositionStateMachine,
    retry_pending: bool,
}

impl AmlStrategy {
    /// Build from a config that has already passed `validate()`. An invalid
    /// price step is replaced here, once.
    pub fn new(config: AmlStrategyConfig) -> Self {
        let config = config.resolved();
        let filter = AmlFilter::new(config.params());
        let machine = PositionStateMachine::new(config.flags(), config.volume, config.protection());
        Self {
            config,
            filter,
            tracker: DirectionTracker::new(),
            machine,
            retry_pending: false,
        }
    }

    pub fn config(&self) -> &AmlStrategyConfig {
        &self.config
    }

    pub fn filter(&self) -> &AmlFilter {
        &self.filter
    }

    pub fn direction(&self) -> Direction {
        self.tracker.current()
    }

    /// Discard all buffers and the last direction; warm-up starts over.
    pub fn reset(&mut self) {
        self.filter.reset();
        self.tracker.reset();
        self.retry_pending = false;
    }

    /// Process one finished bar.
    pub fn on_bar<V>(&mut self, bar: &Bar, venue: &mut V) -> BarOutput
    where
        V: ExecutionVenue + ?Sized,
    {
        let reading = self.filter.update(bar);

        let (direction, transition) = match &reading {
            Some(r) => {
                let update = self.tracker.observe(r.previous, r.value);
                (update.direction, update.transition)
            }
            None => (self.tracker.current(), None),
        };
        if let Some(t) = transition {
            debug!(time = %bar.time, transition = ?t, "direction reversal");
        }

        let retried = transition.is_none() && self.retry_pending;
        let edge = if retried {
            debug!(time = %bar.time, direction = ?self.tracker.current(), "re-deciding after rejection");
            Transition::toward(self.tracker.current())
        } else {
            transition
        };

        let intent = self.machine.decide(edge, venue.position());
        let rejection = if intent.is_none() {
            None
        } else {
            match venue.submit(&intent) {
                Ok(()) => {
                    info!(
                        time = %bar.time,
                        kind = ?intent.kind,
                        volume = intent.volume,
                        "intent submitted"
                    );
                    None
                }
                Err(rejection) => {
                    warn!(time = %bar.time, kind = ?intent.kind, %rejection, "intent rejected");
                    Some(rejection)
                }
            }
        };
        self.retry_pending = rejection.is_some();

        BarOutput {
            time: bar.time,
            aml_value: reading.map(|r| r.value),
            reading,
            direction,
            transition,
            intent,
            rejection,
            retried,
        }
    }
}
