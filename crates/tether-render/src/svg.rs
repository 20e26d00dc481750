//! Standalone SVG serialization of a [`Scene`].

use crate::scene::{Badge, EdgeVisual, Scene};
use crate::style::{marker_name, status_color};
use std::fmt::Write as _;
use tether_core::ConnectionStatus;

#[derive(Debug, Clone)]
pub struct SvgRenderOptions {
    /// Prefix for marker and filter ids, so several overlays can share one document.
    pub id_prefix: String,
    /// Emit the transparent, widened hit paths. Static exports usually drop them.
    pub include_hit_paths: bool,
}

impl Default for SvgRenderOptions {
    fn default() -> Self {
        Self {
            id_prefix: "tether".to_string(),
            include_hit_paths: true,
        }
    }
}

pub fn render_svg(scene: &Scene, options: &SvgRenderOptions) -> String {
    let prefix = sanitize_id(&options.id_prefix);
    let mut out = String::with_capacity(512 + scene.edges.len() * 384);

    out.push_str(r#"<svg xmlns="http://www.w3.org/2000/svg" class="tether-overlay" width=""#);
    fmt_into(&mut out, scene.width);
    out.push_str(r#"" height=""#);
    fmt_into(&mut out, scene.height);
    out.push_str(r#"" viewBox="0 0 "#);
    fmt_into(&mut out, scene.width);
    out.push(' ');
    fmt_into(&mut out, scene.height);
    out.push_str(r#"" style="overflow: visible">"#);

    write_defs(&mut out, &prefix, scene.config.glow_blur);
    for edge in &scene.edges {
        write_edge(&mut out, edge, &prefix, options);
    }

    out.push_str("</svg>");
    out
}

fn write_defs(out: &mut String, prefix: &str, glow_blur: f64) {
    out.push_str("<defs>");
    for status in ConnectionStatus::ALL {
        let _ = write!(
            out,
            r#"<marker id="{prefix}-{}" markerWidth="8" markerHeight="6" refX="7" refY="3" orient="auto"><polygon points="0 0, 8 3, 0 6" fill="{}"/></marker>"#,
            marker_name(*status),
            status_color(*status),
        );
    }
    let _ = write!(
        out,
        r#"<filter id="{prefix}-glow" x="-50%" y="-50%" width="200%" height="200%"><feGaussianBlur stdDeviation=""#
    );
    fmt_into(out, glow_blur);
    out.push_str(r#"" result="blur"/><feMerge><feMergeNode in="blur"/><feMergeNode in="SourceGraphic"/></feMerge></filter>"#);
    out.push_str("</defs>");
}

fn write_edge(out: &mut String, edge: &EdgeVisual, prefix: &str, options: &SvgRenderOptions) {
    let style = &edge.style;

    out.push_str(r#"<g class="edge"#);
    if edge.selected {
        out.push_str(" selected");
    }
    out.push_str(r#"" data-connection-id=""#);
    escape_xml_into(out, edge.connection_id.as_str());
    out.push_str(r#"">"#);

    if options.include_hit_paths {
        out.push_str(r#"<path class="edge-hit" d=""#);
        out.push_str(&edge.path_d);
        out.push_str(r#"" fill="none" stroke="transparent" stroke-width=""#);
        fmt_into(out, style.hit_stroke_width);
        out.push_str(r#""/>"#);
    }

    out.push_str(r#"<path class="edge-line" d=""#);
    out.push_str(&edge.path_d);
    let _ = write!(out, r#"" fill="none" stroke="{}" stroke-width=""#, style.color);
    fmt_into(out, style.stroke_width);
    out.push('"');
    if let Some(dash) = style.dash_array {
        let _ = write!(out, r#" stroke-dasharray="{dash}""#);
    }
    out.push_str(r#" stroke-opacity=""#);
    fmt_into(out, style.opacity);
    let _ = write!(out, r#"" marker-end="url(#{prefix}-{})""#, style.marker);
    if style.glow {
        let _ = write!(out, r#" filter="url(#{prefix}-glow)""#);
    }
    out.push_str("/>");

    for dot in &edge.endpoints {
        out.push_str(r#"<circle class="edge-endpoint" data-node-id=""#);
        escape_xml_into(out, dot.node_id.as_str());
        out.push_str(r#"" cx=""#);
        fmt_into(out, dot.center.x);
        out.push_str(r#"" cy=""#);
        fmt_into(out, dot.center.y);
        out.push_str(r#"" r=""#);
        fmt_into(out, dot.radius);
        let _ = write!(out, r#"" fill="{}" fill-opacity=""#, style.color);
        fmt_into(out, dot.opacity);
        out.push_str(r#""/>"#);
    }

    if let Some(badge) = &edge.badge {
        write_badge(out, badge, style.color);
    }

    out.push_str("</g>");
}

fn write_badge(out: &mut String, badge: &Badge, color: &str) {
    let bounds = badge.bounds();
    out.push_str(r#"<g class="edge-badge"><title>"#);
    escape_xml_into(out, badge.source.as_str());
    out.push_str(" → ");
    escape_xml_into(out, badge.target.as_str());
    out.push_str(r#"</title><rect x=""#);
    fmt_into(out, bounds.origin.x);
    out.push_str(r#"" y=""#);
    fmt_into(out, bounds.origin.y);
    out.push_str(r#"" width=""#);
    fmt_into(out, bounds.size.width);
    out.push_str(r#"" height=""#);
    fmt_into(out, bounds.size.height);
    let _ = write!(out, r#"" rx="4" fill="white" stroke="{color}"/><text x=""#);
    fmt_into(out, badge.center.x);
    out.push_str(r#"" y=""#);
    fmt_into(out, badge.center.y);
    out.push_str(r#"" text-anchor="middle" dominant-baseline="central" font-size=""#);
    fmt_into(out, badge.font_size);
    out.push_str(r#"">"#);
    escape_xml_into(out, &badge.text);
    out.push_str("</text></g>");
}

/// Conservative id token: unsupported characters become `-`, and the result starts with a letter.
pub fn sanitize_id(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return "tether".to_string();
    }
    let mut out = String::with_capacity(raw.len() + 2);
    if !raw.starts_with(|c: char| c.is_ascii_alphabetic()) {
        out.push_str("t-");
    }
    for ch in raw.chars() {
        let ok = ch.is_ascii_alphanumeric() || ch == '-' || ch == '_';
        out.push(if ok { ch } else { '-' });
    }
    out
}

/// Attribute numbers: no `-0`, no float noise near integers.
fn fmt_into(out: &mut String, v: f64) {
    if !v.is_finite() {
        out.push('0');
        return;
    }
    let mut v = if v.abs() < 1e-9 { 0.0 } else { v };
    let nearest = v.round();
    if (v - nearest).abs() < 1e-6 {
        v = nearest;
    }
    if v == 0.0 {
        v = 0.0;
    }
    let _ = write!(out, "{v}");
}

fn escape_xml_into(out: &mut String, text: &str) {
    let mut start = 0usize;
    for (i, b) in text.bytes().enumerate() {
        let esc = match b {
            b'&' => "&amp;",
            b'<' => "&lt;",
            b'>' => "&gt;",
            b'"' => "&quot;",
            b'\'' => "&#39;",
            _ => continue,
        };
        out.push_str(&text[start..i]);
        out.push_str(esc);
        start = i + 1;
    }
    out.push_str(&text[start..]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_drop_noise_and_negative_zero() {
        let mut out = String::new();
        for v in [-0.0, 1.0000000001, 2.5, f64::NAN] {
            fmt_into(&mut out, v);
            out.push(' ');
        }
        assert_eq!(out, "0 1 2.5 0 ");
    }

    #[test]
    fn text_is_escaped() {
        let mut out = String::new();
        escape_xml_into(&mut out, r#"a<b & "c">'d'"#);
        assert_eq!(out, "a&lt;b &amp; &quot;c&quot;&gt;&#39;d&#39;");
    }

    #[test]
    fn ids_are_sanitized() {
        assert_eq!(sanitize_id("  "), "tether");
        assert_eq!(sanitize_id("9 lives"), "t-9-lives");
        assert_eq!(sanitize_id("map.view"), "map-view");
    }
}
