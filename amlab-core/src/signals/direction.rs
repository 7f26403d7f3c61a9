//! Direction of the published AML and its reversals.

use serde::{Deserialize, Serialize};

/// Direction of the published AML between two consecutive bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    /// No non-flat direction observed yet.
    Flat,
}

/// A reversal of the tracked direction.
///
/// The first non-flat direction after start counts as a reversal from the
/// opposite side, so `Flat → Up` is reported as `DownToUp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Transition {
    DownToUp,
    UpToDown,
}

impl Transition {
    /// The reversal that ends in `direction`, `None` for `Flat`.
    pub fn toward(direction: Direction) -> Option<Transition> {
        match direction {
            Direction::Up => Some(Transition::DownToUp),
            Direction::Down => Some(Transition::UpToDown),
            Direction::Flat => None,
        }
    }
}

/// Result of one tracker observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectionUpdate {
    pub direction: Direction,
    pub transition: Option<Transition>,
}

/// Compares consecutive published values. A tie repeats the last known
/// direction rather than counting as a reversal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectionTracker {
    last: Option<Direction>,
}

impl DirectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last non-flat direction, or `Flat` if none yet.
    pub fn current(&self) -> Direction {
        self.last.unwrap_or(Direction::Flat)
    }

    pub fn reset(&mut self) {
        self.last = None;
    }

    /// Observe `current` against the value published on the previous bar.
    pub fn observe(&mut self, previous: Option<f64>, current: f64) -> DirectionUpdate {
        let observed = match previous {
            Some(prev) if current > prev => Some(Direction::Up),
            Some(prev) if current < prev => Some(Direction::Down),
            _ => None,
        };

        let transition = match observed {
            Some(dir) if self.last != Some(dir) => {
                self.last = Some(dir);
                Transition::toward(dir)
            }
            _ => None,
        };

        DirectionUpdate {
            direction: self.current(),
            transition,
        }
    }
}
