#![forbid(unsafe_code)]

//! Edge overlay for tether graphs: routing, visual encoding, hit-testing, selection/editing and
//! SVG output. Everything here reads the core's snapshots; nothing writes layout.

pub mod error;
pub mod interaction;
pub mod route;
pub mod scene;
pub mod style;
pub mod svg;
pub mod text;
pub mod view;

pub use error::{Error, Result};
pub use interaction::{EdgeEditor, GraphHost, Interaction};
pub use route::{AnchorPair, CubicBezier, EdgeRoute, route};
pub use scene::{Badge, EdgeVisual, EndpointDot, Scene, SceneOptions, SkipReason, SkippedEdge};
pub use style::{EdgeStyle, dash_array, status_color};
pub use svg::{SvgRenderOptions, render_svg};
pub use text::{DeterministicTextMeasurer, TextMeasurer, TextMetrics, TextStyle};
pub use view::{GraphView, Notice, NoticeLevel};
