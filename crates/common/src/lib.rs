//! `splice-common`: Shared types, errors, and configuration for the splice
//! timeline editor.
//!
//! This crate is the foundation the model and command crates depend on:
//!
//! - **Types**: `Frames`, `TrackType`, `CompositeMode`, `Rect`
//! - **Effects**: `PropertyValue`, `KeyframeItem` (filter parameter values)
//! - **Errors**: `TimelineError`, `GraphError`, `EditError` (thiserror-based)
//! - **Config**: `EditConfig`, `TransitionPreset`

pub mod config;
pub mod effect;
pub mod error;
pub mod types;

// Re-export commonly used items at crate root
pub use config::{EditConfig, TransitionPreset};
pub use effect::{is_ordered_curve, KeyframeItem, PropertyValue};
pub use error::{EditError, EditResult, GraphError, TimelineError, TimelineResult};
pub use types::{CompositeMode, Frames, Rect, TrackType};
