//! Derives the drawable overlay from a rect snapshot and a connection list.
//!
//! Scene building never fails. Connections whose endpoints are not measured (or that loop back to
//! their own node) are listed in [`Scene::skipped`] and drawn nowhere; they reappear on a later
//! pass once both rectangles exist.

use crate::route::{EdgeRoute, route};
use crate::style::EdgeStyle;
use crate::text::{DeterministicTextMeasurer, TextMeasurer, TextStyle};
use serde::Serialize;
use std::sync::Arc;
use tether_core::geom::{Point, Rect, rect};
use tether_core::{Connection, ConnectionId, NodeId, RectSnapshot, RenderConfig};

const BADGE_PADDING_X: f64 = 6.0;
const BADGE_PADDING_Y: f64 = 3.0;
const HIT_TEST_SEGMENTS: usize = 32;

#[derive(Clone)]
pub struct SceneOptions {
    pub render: RenderConfig,
    pub text_measurer: Arc<dyn TextMeasurer + Send + Sync>,
}

impl Default for SceneOptions {
    fn default() -> Self {
        Self {
            render: RenderConfig::default(),
            text_measurer: Arc::new(DeterministicTextMeasurer::default()),
        }
    }
}

impl SceneOptions {
    pub fn with_render(render: RenderConfig) -> Self {
        Self {
            render,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    MissingSource,
    MissingTarget,
    SelfLoop,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedEdge {
    pub connection_id: ConnectionId,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointDot {
    pub node_id: NodeId,
    pub center: Point,
    pub radius: f64,
    pub opacity: f64,
}

/// Midpoint label of the selected edge; also where the inline editor anchors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Badge {
    pub text: String,
    pub center: Point,
    pub width: f64,
    pub height: f64,
    pub font_size: f64,
    pub source: NodeId,
    pub target: NodeId,
}

impl Badge {
    pub fn bounds(&self) -> Rect {
        rect(
            self.center.x - self.width / 2.0,
            self.center.y - self.height / 2.0,
            self.width,
            self.height,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeVisual {
    pub connection_id: ConnectionId,
    pub source: NodeId,
    pub target: NodeId,
    pub route: EdgeRoute,
    pub path_d: String,
    pub style: EdgeStyle,
    pub selected: bool,
    pub endpoints: [EndpointDot; 2],
    pub badge: Option<Badge>,
}

impl EdgeVisual {
    /// Distance from `p` to the sampled curve.
    pub fn distance_to(&self, p: Point) -> f64 {
        let samples = self.route.path.sample(HIT_TEST_SEGMENTS);
        samples
            .windows(2)
            .map(|w| distance_to_segment(p, w[0], w[1]))
            .fold(f64::INFINITY, f64::min)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scene {
    pub width: f64,
    pub height: f64,
    /// Paint order; the selected edge (if any) comes last.
    pub edges: Vec<EdgeVisual>,
    pub skipped: Vec<SkippedEdge>,
    #[serde(skip)]
    pub config: RenderConfig,
}

impl Scene {
    pub fn build(
        rects: &RectSnapshot,
        connections: &[Connection],
        selected: Option<&ConnectionId>,
        options: &SceneOptions,
    ) -> Self {
        let mut edges = Vec::with_capacity(connections.len());
        let mut skipped = Vec::new();
        let mut selected_edge = None;

        for connection in connections {
            let resolved = if connection.is_self_loop() {
                Err(SkipReason::SelfLoop)
            } else {
                match (rects.get(&connection.source), rects.get(&connection.target)) {
                    (None, _) => Err(SkipReason::MissingSource),
                    (_, None) => Err(SkipReason::MissingTarget),
                    (Some(source), Some(target)) => Ok(route(source, target)),
                }
            };
            let edge_route = match resolved {
                Ok(r) => r,
                Err(reason) => {
                    tracing::debug!(connection = %connection.id, ?reason, "edge skipped");
                    skipped.push(SkippedEdge {
                        connection_id: connection.id.clone(),
                        reason,
                    });
                    continue;
                }
            };

            let is_selected = selected == Some(&connection.id);
            let visual = edge_visual(connection, edge_route, is_selected, options);
            if is_selected {
                selected_edge = Some(visual);
            } else {
                edges.push(visual);
            }
        }
        edges.extend(selected_edge);

        let (width, height) = rects.iter().fold((0.0_f64, 0.0_f64), |(w, h), r| {
            (w.max(r.right()), h.max(r.bottom()))
        });

        Self {
            width,
            height,
            edges,
            skipped,
            config: options.render.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn edge(&self, id: &ConnectionId) -> Option<&EdgeVisual> {
        self.edges.iter().find(|e| &e.connection_id == id)
    }

    pub fn selected_edge(&self) -> Option<&EdgeVisual> {
        self.edges.last().filter(|e| e.selected)
    }

    pub fn skip_reason(&self, id: &ConnectionId) -> Option<SkipReason> {
        self.skipped
            .iter()
            .find(|s| &s.connection_id == id)
            .map(|s| s.reason)
    }

    /// Edge under `p`, using each edge's widened hit stroke. The selected edge wins ties, then the
    /// nearest curve.
    pub fn hit_test(&self, p: Point) -> Option<&ConnectionId> {
        let mut best: Option<(&EdgeVisual, f64)> = None;
        for edge in &self.edges {
            let distance = edge.distance_to(p);
            if distance > edge.style.hit_stroke_width / 2.0 {
                continue;
            }
            if edge.selected {
                return Some(&edge.connection_id);
            }
            if best.is_none_or(|(_, d)| distance < d) {
                best = Some((edge, distance));
            }
        }
        best.map(|(edge, _)| &edge.connection_id)
    }
}

fn edge_visual(
    connection: &Connection,
    edge_route: EdgeRoute,
    selected: bool,
    options: &SceneOptions,
) -> EdgeVisual {
    let config = &options.render;
    let (radius, opacity) = if selected {
        (config.endpoint_dot_radius + 1.0, 1.0)
    } else {
        (config.endpoint_dot_radius, config.endpoint_dot_opacity)
    };
    let endpoints = [
        EndpointDot {
            node_id: connection.source.clone(),
            center: edge_route.start(),
            radius,
            opacity,
        },
        EndpointDot {
            node_id: connection.target.clone(),
            center: edge_route.end(),
            radius,
            opacity,
        },
    ];

    let badge = selected.then(|| {
        let text = connection.display_label().to_string();
        let metrics = options
            .text_measurer
            .measure(&text, &TextStyle::sized(config.badge_font_size));
        Badge {
            center: edge_route.midpoint,
            width: metrics.width + 2.0 * BADGE_PADDING_X,
            height: metrics.height + 2.0 * BADGE_PADDING_Y,
            font_size: config.badge_font_size,
            source: connection.source.clone(),
            target: connection.target.clone(),
            text,
        }
    });

    EdgeVisual {
        connection_id: connection.id.clone(),
        source: connection.source.clone(),
        target: connection.target.clone(),
        path_d: edge_route.path.path_d(),
        route: edge_route,
        style: EdgeStyle::resolve(connection, selected, config),
        selected,
        endpoints,
        badge,
    }
}

fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let ab = b - a;
    let len2 = ab.square_length();
    if len2 == 0.0 {
        return (p - a).length();
    }
    let t = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    (p - (a + ab * t)).length()
}
