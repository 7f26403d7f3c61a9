//! Position state machine: direction reversals + enable flags → intents.
//!
//! | Reversal  | Flag             | Position     | Intent                          |
//! |-----------|------------------|--------------|---------------------------------|
//! | Down→Up   | `buy_pos_open`   | Flat / Short | OpenLong (volume + short size)  |
//! | Down→Up   | `sell_pos_close` | Short        | CloseShort (short size)         |
//! | Up→Down   | `sell_pos_open`  | Flat / Long  | OpenShort (volume + long size)  |
//! | Up→Down   | `buy_pos_close`  | Long         | CloseLong (long size)           |
//!
//! Opening takes precedence over closing, since an open against an opposite
//! position also flattens it.

use crate::domain::PositionSide;
use crate::signals::{IntentKind, OrderIntent, Protection, Transition};
use serde::{Deserialize, Serialize};

/// Independent enable flags for each transition type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeFlags {
    pub buy_pos_open: bool,
    pub sell_pos_open: bool,
    pub buy_pos_close: bool,
    pub sell_pos_close: bool,
}

impl TradeFlags {
    pub fn all() -> Self {
        Self {
            buy_pos_open: true,
            sell_pos_open: true,
            buy_pos_close: true,
            sell_pos_close: true,
        }
    }

    pub fn none() -> Self {
        Self {
            buy_pos_open: false,
            sell_pos_open: false,
            buy_pos_close: false,
            sell_pos_close: false,
        }
    }

    pub fn long_only() -> Self {
        Self {
            buy_pos_open: true,
            buy_pos_close: true,
            ..Self::none()
        }
    }
}

impl Default for TradeFlags {
    fn default() -> Self {
        Self::all()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionStateMachine {
    flags: TradeFlags,
    volume: f64,
    protection: Protection,
}

impl PositionStateMachine {
    pub fn new(flags: TradeFlags, volume: f64, protection: Protection) -> Self {
        assert!(volume > 0.0, "volume must be > 0");
        Self {
            flags,
            volume,
            protection,
        }
    }

    pub fn flags(&self) -> &TradeFlags {
        &self.flags
    }

    /// Decide the intent for this bar from the reversal (if any) and the
    /// venue's signed position.
    pub fn decide(&self, transition: Option<Transition>, position: f64) -> OrderIntent {
        let side = PositionSide::from_quantity(position);
        let size = position.abs();

        match transition {
            None => OrderIntent::none(),
            Some(Transition::DownToUp) => {
                if self.flags.buy_pos_open && side != PositionSide::Long {
                    self.intent(IntentKind::OpenLong, self.volume + size)
                } else if self.flags.sell_pos_close && side == PositionSide::Short {
                    self.intent(IntentKind::CloseShort, size)
                } else {
                    OrderIntent::none()
                }
            }
            Some(Transition::UpToDown) => {
                if self.flags.sell_pos_open && side != PositionSide::Short {
                    self.intent(IntentKind::OpenShort, self.volume + size)
                } else if self.flags.buy_pos_close && side == PositionSide::Long {
                    self.intent(IntentKind::CloseLong, size)
                } else {
                    OrderIntent::none()
                }
            }
        }
    }

    fn intent(&self, kind: IntentKind, volume: f64) -> OrderIntent {
        OrderIntent::new(kind, volume, self.protection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn protection() -> Protection {
        Protection {
            stop_loss_ticks: 10,
            take_profit_ticks: 20,
        }
    }

    fn machine(flags: TradeFlags) -> PositionStateMachine {
        PositionStateMachine::new(flags, 1.0, protection())
    }

    #[test]
    fn no_transition_no_intent() {
        let m = machine(TradeFlags::all());
        assert!(m.decide(None, 0.0).is_none());
        assert!(m.decide(None, -3.0).is_none());
    }

    #[test]
    fn up_from_flat_opens_long() {
        let intent = machine(TradeFlags::all()).decide(Some(Transition::DownToUp), 0.0);
        assert_eq!(intent.kind, IntentKind::OpenLong);
        assert_eq!(intent.volume, 1.0);
        assert_eq!(intent.protection, protection());
    }

    #[test]
    fn up_from_short_reverses_with_extra_volume() {
        let intent = machine(TradeFlags::all()).decide(Some(Transition::DownToUp), -2.0);
        assert_eq!(intent.kind, IntentKind::OpenLong);
        assert_eq!(intent.volume, 3.0);
    }

    #[test]
    fn up_when_already_long_does_nothing() {
        let intent = machine(TradeFlags::all()).decide(Some(Transition::DownToUp), 1.0);
        assert!(intent.is_none());
    }

    #[test]
    fn close_only_deployment_closes_short() {
        let flags = TradeFlags {
            sell_pos_close: true,
            ..TradeFlags::none()
        };
        let m = machine(flags);
        let intent = m.decide(Some(Transition::DownToUp), -2.0);
        assert_eq!(intent.kind, IntentKind::CloseShort);
        assert_eq!(intent.volume, 2.0);
        assert!(m.decide(Some(Transition::DownToUp), 0.0).is_none());
    }

    #[test]
    fn down_from_long_reverses() {
        let intent = machine(TradeFlags::all()).decide(Some(Transition::UpToDown), 1.0);
        assert_eq!(intent.kind, IntentKind::OpenShort);
        assert_eq!(intent.volume, 2.0);
    }

    #[test]
    fn long_only_closes_long_on_down() {
        let m = machine(TradeFlags::long_only());
        let intent = m.decide(Some(Transition::UpToDown), 1.0);
        assert_eq!(intent.kind, IntentKind::CloseLong);
        assert_eq!(intent.volume, 1.0);
        assert!(m.decide(Some(Transition::UpToDown), 0.0).is_none());
    }

    #[test]
    fn disabled_flags_never_trade() {
        let m = machine(TradeFlags::none());
        for t in [Transition::DownToUp, Transition::UpToDown] {
            for pos in [-1.0, 0.0, 1.0] {
                assert!(m.decide(Some(t), pos).is_none());
            }
        }
    }

    #[test]
    #[should_panic(expected = "volume must be > 0")]
    fn rejects_zero_volume() {
        PositionStateMachine::new(TradeFlags::all(), 0.0, Protection::default());
    }
}
