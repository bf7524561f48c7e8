//! Core types for semshutter

mod event;
mod hint;
mod mode;
mod sample;

pub use event::{CaptureState, LoopEvent, TriggerSource};
pub use hint::{GateResult, Hint};
pub use mode::ValidationMode;
pub use sample::{clamp_unit, Fusion, ScoreSample};
