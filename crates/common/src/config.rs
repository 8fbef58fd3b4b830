//! Configuration for the timeline model and the command layer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::effect::PropertyValue;
use crate::error::EditError;

/// Service and default properties used when a new transition entry is created.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransitionPreset {
    /// Service name of the video blend (e.g. "luma").
    pub service: String,
    /// Initial service properties.
    pub properties: BTreeMap<String, PropertyValue>,
}

impl Default for TransitionPreset {
    fn default() -> Self {
        let mut properties = BTreeMap::new();
        properties.insert("softness".to_string(), PropertyValue::Double(0.0));
        properties.insert("invert".to_string(), PropertyValue::Int(0));
        Self {
            service: "luma".to_string(),
            properties,
        }
    }
}

/// Top-level editor configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditConfig {
    /// Maximum number of undo steps kept by the command history.
    pub history_limit: usize,
    /// Preset for transitions created by drags and trims.
    pub transition: TransitionPreset,
    /// Keyframe edits on the same filter merge only within this window.
    pub keyframe_merge_window_ms: u64,
    /// Compositor property edited by blend-mode commands.
    pub blend_property: String,
    /// Service name of the compositing transition given to video tracks.
    pub compositor_service: String,
}

impl Default for EditConfig {
    fn default() -> Self {
        Self {
            history_limit: 100,
            transition: TransitionPreset::default(),
            keyframe_merge_window_ms: 1000,
            blend_property: "blend_mode".to_string(),
            compositor_service: "frei0r.cairoblend".to_string(),
        }
    }
}

impl EditConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, EditError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| EditError::Config(e.to_string()))?;
        config.validate()?;
        tracing::debug!(
            history_limit = config.history_limit,
            transition = %config.transition.service,
            "Loaded edit configuration"
        );
        Ok(config)
    }

    pub fn keyframe_merge_window(&self) -> Duration {
        Duration::from_millis(self.keyframe_merge_window_ms)
    }

    pub fn validate(&self) -> Result<(), EditError> {
        if self.history_limit == 0 {
            return Err(EditError::Config(
                "history_limit must be > 0".to_string(),
            ));
        }
        if self.transition.service.is_empty() {
            return Err(EditError::Config(
                "transition service must not be empty".to_string(),
            ));
        }
        if self.blend_property.is_empty() {
            return Err(EditError::Config(
                "blend_property must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
