//! Leak detection pipeline
//!
//! The detection core: bounded window buffer, statistical feature
//! extraction, unsupervised anomaly scoring, and deterministic severity
//! classification, tied together by the [`DetectionEngine`].
//!
//! Control flow:
//! reading -> [`WindowBuffer`] -> [`features::extract`] ->
//! {[`AnomalyScorer`], [`SeverityScorer`]} -> [`DetectionResult`]
//! (crate::types::DetectionResult)

mod window;
pub mod features;
mod anomaly;
mod scoring;
mod engine;

pub use anomaly::{AnomalyScorer, ModelInfo};
pub use engine::DetectionEngine;
pub use features::FeatureError;
pub use scoring::SeverityScorer;
pub use window::WindowBuffer;
