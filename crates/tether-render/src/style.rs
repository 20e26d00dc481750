//! Visual encoding: status picks the color, type picks the dash pattern.

use serde::Serialize;
use tether_core::{Connection, ConnectionStatus, ConnectionType, RenderConfig};

pub fn status_color(status: ConnectionStatus) -> &'static str {
    match status {
        ConnectionStatus::Active => "#22c55e",
        ConnectionStatus::Inactive => "#94a3b8",
        ConnectionStatus::Error => "#ef4444",
        ConnectionStatus::Pending => "#eab308",
    }
}

/// `stroke-dasharray` for a connection type; `None` draws a solid line.
pub fn dash_array(connection_type: ConnectionType) -> Option<&'static str> {
    match connection_type {
        ConnectionType::Integrates => Some("8 4"),
        ConnectionType::DataTransfer => Some("4 4"),
        ConnectionType::AuthProvider => Some("12 4"),
        ConnectionType::Webhook => Some("6 2"),
        ConnectionType::Uses | ConnectionType::ApiCall | ConnectionType::Sdk => None,
    }
}

/// Arrowhead marker id suffix for a status (`arrow-active`, ...).
pub fn marker_name(status: ConnectionStatus) -> String {
    format!("arrow-{}", status.as_str())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeStyle {
    pub color: &'static str,
    pub dash_array: Option<&'static str>,
    pub stroke_width: f64,
    pub opacity: f64,
    pub hit_stroke_width: f64,
    pub glow: bool,
    pub marker: String,
}

impl EdgeStyle {
    pub fn resolve(connection: &Connection, selected: bool, config: &RenderConfig) -> Self {
        Self {
            color: status_color(connection.connection_status),
            dash_array: dash_array(connection.connection_type),
            stroke_width: if selected {
                config.selected_stroke_width
            } else {
                config.stroke_width
            },
            opacity: if selected {
                1.0
            } else {
                config.unselected_opacity
            },
            hit_stroke_width: config.hit_stroke_width,
            glow: selected,
            marker: marker_name(connection.connection_status),
        }
    }
}
