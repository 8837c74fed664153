//! Steering action.
use crate::types::VehicleControl;
use drive_core::{Act, DiscreteAct};
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;

/// Discrete steering command. The vehicle always drives with full throttle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum SteerAct {
    Left,
    Straight,
    Right,
}

impl SteerAct {
    pub const ALL: [SteerAct; 3] = [SteerAct::Left, SteerAct::Straight, SteerAct::Right];

    /// Vehicle control realizing this action.
    pub fn control(&self, throttle: f32, steer_amount: f32) -> VehicleControl {
        let steer = match self {
            Self::Left => -steer_amount,
            Self::Straight => 0.0,
            Self::Right => steer_amount,
        };
        VehicleControl {
            throttle,
            steer,
            brake: 0.0,
        }
    }
}

impl Act for SteerAct {}

impl DiscreteAct for SteerAct {
    fn n_actions() -> usize {
        Self::ALL.len()
    }

    fn from_index(ix: usize) -> Option<Self> {
        Self::ALL.get(ix).copied()
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

impl From<SteerAct> for i64 {
    fn from(act: SteerAct) -> Self {
        act as i64
    }
}

impl TryFrom<i64> for SteerAct {
    type Error = anyhow::Error;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        usize::try_from(value)
            .ok()
            .and_then(Self::from_index)
            .ok_or_else(|| anyhow::anyhow!("Invalid steering action index: {}", value))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_index() {
        for (i, act) in SteerAct::ALL.iter().enumerate() {
            assert_eq!(act.index(), i);
            assert_eq!(i64::from(*act), i as i64);
            assert_eq!(SteerAct::try_from(i as i64).unwrap(), *act);
        }
        assert!(SteerAct::try_from(3).is_err());
        assert!(SteerAct::try_from(-1).is_err());
        assert_eq!(SteerAct::n_actions(), 3);
    }

    #[test]
    fn test_control() {
        let c = SteerAct::Left.control(1.0, 0.5);
        assert_eq!((c.throttle, c.steer, c.brake), (1.0, -0.5, 0.0));
        assert_eq!(SteerAct::Straight.control(1.0, 0.5).steer, 0.0);
        assert_eq!(SteerAct::Right.control(0.8, 1.0).steer, 1.0);
    }
}
