// Rendering of markup sequences into displayable images.
// The cache treats the sink as opaque; the only requirement is that a sink
// returns the same image for the same input.

use std::fmt;

/// How hard the sink should try.
/// Typeset is the normal mode. Fallback trades fidelity for robustness.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RenderMode {
    Typeset,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    /// MIME type of the bytes, like "image/svg+xml".
    pub format: &'static str,
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderError(pub String);

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "render failed: {}", self.0)
    }
}

impl std::error::Error for RenderError {}

pub trait RenderSink: Send + Sync {
    fn render(
        &self,
        lines: &[String],
        font_size: u32,
        mode: RenderMode,
    ) -> Result<RenderedImage, RenderError>;
}

/// Sizing for a rendered hypothesis.
/// Longer hypotheses get a smaller font and a taller figure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    pub font_size: u32,
    /// Figure dimensions in inches.
    pub width: f64,
    pub height: f64,
    pub dpi: u32,
    /// Vertical distance between lines, as a fraction of the figure height.
    pub line_step: f64,
}

impl Layout {
    pub fn for_lines(count: usize, base_font: u32) -> Layout {
        let count = count.max(1);
        let shrink = (count / 3) as u32;
        Layout {
            font_size: base_font.saturating_sub(shrink).max(8),
            width: 6.0,
            height: f64::max(2.0, 0.6 + 0.25 * count as f64),
            dpi: 120,
            line_step: 0.12,
        }
    }

    pub fn pixel_width(&self) -> u32 {
        (self.width * self.dpi as f64).round() as u32
    }

    pub fn pixel_height(&self) -> u32 {
        (self.height * self.dpi as f64).round() as u32
    }
}

fn escape_xml(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
}

// XML 1.0 can't carry most control characters, even escaped.
fn is_xml_illegal(c: char) -> bool {
    c.is_control() && !matches!(c, '\t' | '\n' | '\r')
}

/// Writes markup lines into an SVG document, one text element per line.
#[derive(Debug, Default, Clone, Copy)]
pub struct SvgSink;

impl SvgSink {
    const TYPESET_FONTS: &'static str = "STIX Two Math, Cambria Math, serif";
    const FALLBACK_FONTS: &'static str = "serif";
}

impl RenderSink for SvgSink {
    fn render(
        &self,
        lines: &[String],
        font_size: u32,
        mode: RenderMode,
    ) -> Result<RenderedImage, RenderError> {
        let layout = Layout::for_lines(lines.len(), font_size);
        let (width, height) = (layout.pixel_width(), layout.pixel_height());
        let fonts = match mode {
            RenderMode::Typeset => Self::TYPESET_FONTS,
            RenderMode::Fallback => Self::FALLBACK_FONTS,
        };

        let mut svg = format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{}\" height=\"{}\" \
             font-family=\"{}\" font-size=\"{}\">\n",
            width, height, fonts, layout.font_size
        );
        let x = (0.05 * width as f64).round() as u32;
        for (i, line) in lines.iter().enumerate() {
            let cleaned: String = if line.chars().any(is_xml_illegal) {
                if mode == RenderMode::Typeset {
                    return Err(RenderError(format!(
                        "line {} contains characters that cannot be typeset",
                        i + 1
                    )));
                }
                line.chars()
                    .map(|c| if is_xml_illegal(c) { '\u{FFFD}' } else { c })
                    .collect()
            } else {
                line.clone()
            };
            let y = (layout.line_step * i as f64 * height as f64).round() as u32 + layout.font_size;
            svg.push_str(&format!("  <text x=\"{}\" y=\"{}\">", x, y));
            escape_xml(&cleaned, &mut svg);
            svg.push_str("</text>\n");
        }
        svg.push_str("</svg>\n");

        Ok(RenderedImage {
            format: "image/svg+xml",
            width,
            height,
            bytes: svg.into_bytes(),
        })
    }
}
