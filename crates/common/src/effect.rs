//! Filter parameter values and keyframe items.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::types::{Frames, Rect};

/// Concrete value of a named filter or service property.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Double(f64),
    Int(i64),
    String(String),
    Rect(Rect),
}

impl PropertyValue {
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Self::Double(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_rect(&self) -> Option<Rect> {
        match self {
            Self::Rect(v) => Some(*v),
            _ => None,
        }
    }

    /// Name of the value kind, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Double(_) => "double",
            Self::Int(_) => "int",
            Self::String(_) => "string",
            Self::Rect(_) => "rect",
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Double(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::String(v) => f.write_str(v),
            Self::Rect(v) => write!(f, "{v}"),
        }
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Rect> for PropertyValue {
    fn from(v: Rect) -> Self {
        Self::Rect(v)
    }
}

/// One point of a filter's keyframe curve: the parameter values in effect
/// at `frame` (relative to the start of the filtered clip).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeyframeItem {
    pub frame: Frames,
    pub values: BTreeMap<String, PropertyValue>,
}

impl KeyframeItem {
    pub fn new(frame: Frames) -> Self {
        Self {
            frame,
            values: BTreeMap::new(),
        }
    }

    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.values.get(name)
    }
}

/// Whether a keyframe curve is ordered by frame with no duplicate frames.
pub fn is_ordered_curve(items: &[KeyframeItem]) -> bool {
    items.windows(2).all(|w| w[0].frame < w[1].frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_accessors() {
        assert_eq!(PropertyValue::Double(0.5).as_double(), Some(0.5));
        assert_eq!(PropertyValue::Int(3).as_double(), Some(3.0));
        assert_eq!(PropertyValue::from("luma").as_str(), Some("luma"));
        assert_eq!(PropertyValue::Int(3).as_str(), None);
        let r = Rect::new(0.0, 0.0, 10.0, 20.0);
        assert_eq!(PropertyValue::from(r).as_rect(), Some(r));
    }

    #[test]
    fn keyframe_builder() {
        let kf = KeyframeItem::new(12).with_value("opacity", 0.25);
        assert_eq!(kf.frame, 12);
        assert_eq!(kf.get("opacity").and_then(PropertyValue::as_double), Some(0.25));
    }

    #[test]
    fn curve_ordering() {
        let curve = vec![KeyframeItem::new(0), KeyframeItem::new(10), KeyframeItem::new(30)];
        assert!(is_ordered_curve(&curve));
        let bad = vec![KeyframeItem::new(10), KeyframeItem::new(10)];
        assert!(!is_ordered_curve(&bad));
    }
}
