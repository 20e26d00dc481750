#![forbid(unsafe_code)]

//! `tether` draws and edits the connections between services laid out by someone else.
//!
//! The host renders the service nodes; `tether` measures where they ended up, keeps an optimistic
//! cache of the project's connections, and derives an edge overlay that can be hit-tested or
//! serialized to SVG.
//!
//! # Features
//!
//! - `render`: edge routing, scene building and SVG output (`tether::render`)
//! - `http`: the reqwest-backed remote (`HttpGraphApi`)

pub use tether_core::*;

#[cfg(feature = "render")]
pub mod render {
    pub use tether_render::{
        AnchorPair, Badge, CubicBezier, DeterministicTextMeasurer, EdgeEditor, EdgeRoute,
        EdgeStyle, EdgeVisual, EndpointDot, GraphHost, GraphView, Interaction, Notice,
        NoticeLevel, Scene, SceneOptions, SkipReason, SkippedEdge, SvgRenderOptions, TextMeasurer,
        TextMetrics, TextStyle, dash_array, render_svg, route, status_color,
    };

    use tether_core::{Connection, ConnectionId, GraphApi, GraphStore, RectSnapshot};

    #[derive(Debug, thiserror::Error)]
    pub enum HeadlessError {
        #[error(transparent)]
        Core(#[from] tether_core::Error),
        #[error(transparent)]
        Render(#[from] tether_render::Error),
    }

    pub type Result<T> = std::result::Result<T, HeadlessError>;

    /// Converts an arbitrary string into an id token safe to use as an SVG id prefix.
    pub fn sanitize_svg_id(raw: &str) -> String {
        tether_render::svg::sanitize_id(raw)
    }

    /// Bundles scene and SVG options for one-shot, executor-free rendering.
    #[derive(Clone, Default)]
    pub struct HeadlessRenderer {
        pub scene: SceneOptions,
        pub svg: SvgRenderOptions,
    }

    impl HeadlessRenderer {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_config(config: &tether_core::EngineConfig) -> Self {
            Self {
                scene: SceneOptions::with_render(config.render.clone()),
                svg: SvgRenderOptions::default(),
            }
        }

        pub fn scene(
            &self,
            rects: &RectSnapshot,
            connections: &[Connection],
            selected: Option<&ConnectionId>,
        ) -> Scene {
            Scene::build(rects, connections, selected, &self.scene)
        }

        pub fn render_svg(
            &self,
            rects: &RectSnapshot,
            connections: &[Connection],
            selected: Option<&ConnectionId>,
        ) -> String {
            render_svg(&self.scene(rects, connections, selected), &self.svg)
        }

        /// Loads the store's connections through `api` (served from cache when fresh) and renders
        /// them against `rects`.
        pub async fn render_store_svg<A: GraphApi>(
            &self,
            store: &GraphStore,
            api: &A,
            rects: &RectSnapshot,
            selected: Option<&ConnectionId>,
        ) -> Result<String> {
            let snapshot = store.connections(api).await?;
            Ok(self.render_svg(rects, snapshot.connections(), selected))
        }
    }
}
