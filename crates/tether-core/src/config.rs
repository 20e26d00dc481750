use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Engine-wide settings. Every field has a default, so partial JSON config files are valid.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub store: StoreConfig,
    pub graph: GraphRules,
    pub render: RenderConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoreConfig {
    /// How long a fetched list is served without refetching.
    pub stale_time_ms: u64,
    /// Background refresh period; `None` disables interval refetching.
    pub refetch_interval_ms: Option<u64>,
    pub refetch_on_focus: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            stale_time_ms: 30_000,
            refetch_interval_ms: None,
            refetch_on_focus: true,
        }
    }
}

impl StoreConfig {
    pub fn stale_time(&self) -> Duration {
        Duration::from_millis(self.stale_time_ms)
    }

    pub fn refetch_interval(&self) -> Option<Duration> {
        self.refetch_interval_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GraphRules {
    /// Whether `B -> A` may be created while `A -> B` exists.
    pub allow_reverse_edges: bool,
    pub label_max_len: usize,
    pub description_max_len: usize,
}

impl Default for GraphRules {
    fn default() -> Self {
        Self {
            allow_reverse_edges: true,
            label_max_len: 100,
            description_max_len: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RenderConfig {
    pub hit_stroke_width: f64,
    pub stroke_width: f64,
    pub selected_stroke_width: f64,
    pub unselected_opacity: f64,
    pub endpoint_dot_radius: f64,
    pub endpoint_dot_opacity: f64,
    pub badge_font_size: f64,
    pub glow_blur: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            hit_stroke_width: 12.0,
            stroke_width: 1.5,
            selected_stroke_width: 2.5,
            unselected_opacity: 0.6,
            endpoint_dot_radius: 3.0,
            endpoint_dot_opacity: 0.4,
            badge_font_size: 10.0,
            glow_blur: 3.0,
        }
    }
}

impl EngineConfig {
    /// Deep-merges `overrides` onto the defaults.
    pub fn from_json_overrides(overrides: &Value) -> Result<Self> {
        let mut base = serde_json::to_value(Self::default())?;
        deep_merge_value(&mut base, overrides);
        serde_json::from_value(base).map_err(|err| Error::InvalidConfig {
            message: err.to_string(),
        })
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let overrides: Value = serde_json::from_str(text).map_err(|err| Error::InvalidConfig {
            message: err.to_string(),
        })?;
        Self::from_json_overrides(&overrides)
    }
}

fn deep_merge_value(base: &mut Value, incoming: &Value) {
    match (base, incoming) {
        (Value::Object(base_map), Value::Object(in_map)) => {
            for (key, in_value) in in_map {
                match base_map.get_mut(key) {
                    Some(base_value) => deep_merge_value(base_value, in_value),
                    None => {
                        base_map.insert(key.clone(), in_value.clone());
                    }
                }
            }
        }
        (base_slot, in_value) => {
            *base_slot = in_value.clone();
        }
    }
}
