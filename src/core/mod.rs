//! Core modules for semshutter

pub mod fusion;
pub mod stability;
pub mod capture_loop;
pub mod sample_parser;
pub mod source;
pub mod api;

pub use fusion::{fuse, fuse_with, FusionConfig, FusionPolicy};
pub use stability::{GateConfig, SlidingWindow, StabilityGate};
pub use capture_loop::{CaptureDecisionLoop, LoopConfig, TriggerPolicy};
pub use sample_parser::SampleParser;
pub use source::{ScoreSource, ScriptedSource, TimedSample, TraceSource};
pub use api::{create_router, run_server};
