use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::io::Read;
use tether_core::geom::Point;
use tether_core::{Connection, ConnectionId, EngineConfig, NodeId, NodeRect, RectSnapshot};
use tether_render::{
    AnchorPair, Scene, SceneOptions, SkippedEdge, SvgRenderOptions, render_svg,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Tether(tether_core::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Tether(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<tether_core::Error> for CliError {
    fn from(value: tether_core::Error) -> Self {
        Self::Tether(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
enum Command {
    Route,
    Scene,
    #[default]
    Render,
}

#[derive(Debug, Default)]
struct Args {
    command: Command,
    input: Option<String>,
    pretty: bool,
    config: Option<String>,
    selected: Option<String>,
    id_prefix: Option<String>,
    no_hit_paths: bool,
    out: Option<String>,
}

/// Layout snapshot as exported by a host: measured rects keyed by node id plus the connection list.
#[derive(Debug, Deserialize)]
struct SnapshotIn {
    #[serde(default)]
    rects: IndexMap<String, RectIn>,
    #[serde(default)]
    connections: Vec<Connection>,
    #[serde(default)]
    selected: Option<ConnectionId>,
}

#[derive(Debug, Deserialize)]
struct RectIn {
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

#[derive(Serialize)]
struct RouteOut<'a> {
    connection_id: &'a ConnectionId,
    source: &'a NodeId,
    target: &'a NodeId,
    anchors: AnchorPair,
    start: Point,
    end: Point,
    midpoint: Point,
    path: &'a str,
}

#[derive(Serialize)]
struct RoutesOut<'a> {
    routes: Vec<RouteOut<'a>>,
    skipped: &'a [SkippedEdge],
}

fn usage() -> &'static str {
    "tether-cli\n\
\n\
USAGE:\n\
  tether-cli route [--pretty] [--config <path>] [<snapshot>|-]\n\
  tether-cli scene [--pretty] [--config <path>] [--select <connection-id>] [<snapshot>|-]\n\
  tether-cli [render] [--config <path>] [--select <connection-id>] [--id <prefix>] [--no-hit-paths] [--out <path>] [<snapshot>|-]\n\
\n\
NOTES:\n\
  - If <snapshot> is omitted or '-', input is read from stdin.\n\
  - A snapshot is JSON: {\"rects\": {<node-id>: {x, y, width, height}}, \"connections\": [...], \"selected\": <id>?}.\n\
  - --config deep-merges a JSON engine config over the defaults.\n\
  - render prints SVG to stdout by default; use --out to write a file.\n\
  - Set TETHER_LOG (e.g. TETHER_LOG=debug) to see diagnostics on stderr.\n\
"
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args::default();

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "route" => args.command = Command::Route,
            "scene" => args.command = Command::Scene,
            "render" => args.command = Command::Render,
            "--pretty" => args.pretty = true,
            "--no-hit-paths" => args.no_hit_paths = true,
            "--config" => {
                let Some(path) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.config = Some(path.clone());
            }
            "--select" => {
                let Some(id) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.selected = Some(id.clone());
            }
            "--id" => {
                let Some(id) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.id_prefix = Some(id.clone());
            }
            "--out" => {
                let Some(out) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.out = Some(out.clone());
            }
            "-" => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some("-".to_string());
            }
            other if other.starts_with('-') => return Err(CliError::Usage(usage())),
            path => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some(path.to_string());
            }
        }
    }

    Ok(args)
}

fn read_input(input: Option<&str>) -> Result<String, CliError> {
    match input {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Some(path) => Ok(std::fs::read_to_string(path)?),
    }
}

fn write_json(value: &impl Serialize, pretty: bool) -> Result<(), CliError> {
    if pretty {
        serde_json::to_writer_pretty(std::io::stdout().lock(), value)?;
    } else {
        serde_json::to_writer(std::io::stdout().lock(), value)?;
    }
    Ok(())
}

fn write_text(text: &str, out: Option<&str>) -> Result<(), CliError> {
    match out {
        None => {
            print!("{text}");
            Ok(())
        }
        Some(path) => {
            std::fs::write(path, text)?;
            Ok(())
        }
    }
}

fn load_config(path: Option<&str>) -> Result<EngineConfig, CliError> {
    match path {
        None => Ok(EngineConfig::default()),
        Some(path) => Ok(EngineConfig::from_json_str(&std::fs::read_to_string(path)?)?),
    }
}

fn rect_snapshot(rects: IndexMap<String, RectIn>) -> RectSnapshot {
    RectSnapshot::from_rects(
        rects
            .into_iter()
            .map(|(id, r)| NodeRect::new(id, r.x, r.y, r.width, r.height)),
    )
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("TETHER_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run(args: Args) -> Result<(), CliError> {
    let text = read_input(args.input.as_deref())?;
    let snapshot: SnapshotIn = serde_json::from_str(&text)?;
    let config = load_config(args.config.as_deref())?;
    let options = SceneOptions::with_render(config.render);

    let rects = rect_snapshot(snapshot.rects);
    tracing::debug!(
        nodes = rects.len(),
        connections = snapshot.connections.len(),
        "snapshot loaded"
    );
    let selected = args
        .selected
        .map(ConnectionId::new)
        .or(snapshot.selected);

    match args.command {
        Command::Route => {
            let scene = Scene::build(&rects, &snapshot.connections, None, &options);
            let routes = scene
                .edges
                .iter()
                .map(|edge| RouteOut {
                    connection_id: &edge.connection_id,
                    source: &edge.source,
                    target: &edge.target,
                    anchors: edge.route.anchors,
                    start: edge.route.start(),
                    end: edge.route.end(),
                    midpoint: edge.route.midpoint,
                    path: &edge.path_d,
                })
                .collect();
            write_json(
                &RoutesOut {
                    routes,
                    skipped: &scene.skipped,
                },
                args.pretty,
            )
        }
        Command::Scene => {
            let scene = Scene::build(&rects, &snapshot.connections, selected.as_ref(), &options);
            write_json(&scene, args.pretty)
        }
        Command::Render => {
            let scene = Scene::build(&rects, &snapshot.connections, selected.as_ref(), &options);
            let mut svg_options = SvgRenderOptions {
                include_hit_paths: !args.no_hit_paths,
                ..SvgRenderOptions::default()
            };
            if let Some(prefix) = args.id_prefix {
                svg_options.id_prefix = prefix;
            }
            let svg = render_svg(&scene, &svg_options);
            write_text(&svg, args.out.as_deref())
        }
    }
}

fn main() {
    init_logging();

    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = run(args) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        std::iter::once("tether-cli")
            .chain(parts.iter().copied())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn render_is_the_default_command() {
        let args = parse_args(&argv(&["layout.json"])).unwrap();
        assert!(matches!(args.command, Command::Render));
        assert_eq!(args.input.as_deref(), Some("layout.json"));
    }

    #[test]
    fn flags_and_values_are_collected() {
        let args = parse_args(&argv(&[
            "scene", "--pretty", "--select", "c1", "--config", "cfg.json", "-",
        ]))
        .unwrap();
        assert!(matches!(args.command, Command::Scene));
        assert!(args.pretty);
        assert_eq!(args.selected.as_deref(), Some("c1"));
        assert_eq!(args.config.as_deref(), Some("cfg.json"));
        assert_eq!(args.input.as_deref(), Some("-"));
    }

    #[test]
    fn bad_arguments_are_usage_errors() {
        for bad in [&["--out"][..], &["--bogus"], &["a.json", "b.json"]] {
            assert!(matches!(
                parse_args(&argv(bad)),
                Err(CliError::Usage(_))
            ));
        }
    }

    #[test]
    fn snapshot_rects_keep_their_ids() {
        let snapshot: SnapshotIn = serde_json::from_str(
            r#"{ "rects": { "api": { "x": 1, "y": 2, "width": 30, "height": 40 } } }"#,
        )
        .unwrap();
        assert!(snapshot.connections.is_empty());
        let rects = rect_snapshot(snapshot.rects);
        let api = rects.get(&NodeId::new("api")).unwrap();
        assert_eq!((api.x, api.y, api.right(), api.bottom()), (1.0, 2.0, 31.0, 42.0));
    }
}
