//! Gameplay simulation
//!
//! All lane logic lives here. It never talks to an engine directly, only
//! through the [`crate::host`] traits:
//! - Ball launch/reset state machine
//! - Gutter assist
//! - One-shot pin fall triggers
//! - Pin-set lifecycle and score

pub mod ball;
pub mod coordinator;
pub mod fall_trigger;
pub mod gutter;
pub mod indicator;
pub mod lane;

pub use ball::{BallController, BallSetup, BallState};
pub use coordinator::{CoordinatorSetup, GameCoordinator, PinSet, ResetPhase};
pub use fall_trigger::{FallTrigger, ScoreListener};
pub use gutter::GutterZone;
pub use indicator::LaunchIndicator;
pub use lane::{Lane, LaneHandles, LaneInput};
