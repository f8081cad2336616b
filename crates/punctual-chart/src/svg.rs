//! SVG canvas backend.

use crate::canvas::Canvas;
use crate::render::Viewport;
use std::fmt::Write;

/// Accumulates SVG elements; `finish` wraps them in a document.
#[derive(Debug, Clone)]
pub struct SvgCanvas {
    width: f64,
    height: f64,
    background: Option<String>,
    body: String,
}

impl SvgCanvas {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            width: viewport.width,
            height: viewport.height,
            background: None,
            body: String::new(),
        }
    }

    pub fn with_background(mut self, color: impl Into<String>) -> Self {
        self.background = Some(color.into());
        self
    }

    pub fn finish(self) -> String {
        let mut doc = String::with_capacity(self.body.len() + 256);
        let _ = write!(
            doc,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = fmt_num(self.width),
            h = fmt_num(self.height),
        );
        doc.push('\n');
        if let Some(background) = &self.background {
            let _ = writeln!(
                doc,
                r#"<rect width="100%" height="100%" fill="{}"/>"#,
                escape(background)
            );
        }
        doc.push_str(&self.body);
        doc.push_str("</svg>\n");
        doc
    }
}

/// Two decimals, trailing zeros dropped.
fn fmt_num(v: f64) -> String {
    let s = format!("{v:.2}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

impl Canvas for SvgCanvas {
    fn line(&mut self, from: (f64, f64), to: (f64, f64), color: &str, width: f64) {
        let _ = writeln!(
            self.body,
            r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-width="{}"/>"#,
            fmt_num(from.0),
            fmt_num(from.1),
            fmt_num(to.0),
            fmt_num(to.1),
            escape(color),
            fmt_num(width)
        );
    }

    fn polyline(&mut self, points: &[(f64, f64)], color: &str, width: f64) {
        let coords = points
            .iter()
            .map(|(x, y)| format!("{},{}", fmt_num(*x), fmt_num(*y)))
            .collect::<Vec<_>>()
            .join(" ");
        let _ = writeln!(
            self.body,
            r#"<polyline points="{coords}" fill="none" stroke="{}" stroke-width="{}"/>"#,
            escape(color),
            fmt_num(width)
        );
    }

    fn circle(&mut self, center: (f64, f64), radius: f64, color: &str) {
        let _ = writeln!(
            self.body,
            r#"<circle cx="{}" cy="{}" r="{}" fill="{}"/>"#,
            fmt_num(center.0),
            fmt_num(center.1),
            fmt_num(radius),
            escape(color)
        );
    }
}
