//! Minimal single-page PDF writer.
//!
//! Draws text in the two standard Helvetica faces and stroked rectangles.
//! Coordinates are in points from the top-left corner of a US-Letter page;
//! the writer flips them into PDF user space. Content streams are left
//! uncompressed.

use std::io::Write;

use crate::error::RenderError;

pub const PAGE_WIDTH: f32 = 612.0;
pub const PAGE_HEIGHT: f32 = 792.0;

/// Distance from the top of a line box to the baseline, per 1000 units of size.
const ASCENDER: f32 = 718.0;
/// Line advance as a multiple of the font size.
const LINE_HEIGHT: f32 = 1.15;

/// Standard base-14 faces available on every page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Helvetica,
    HelveticaBold,
}

impl Font {
    fn resource_name(&self) -> &'static str {
        match self {
            Self::Helvetica => "F1",
            Self::HelveticaBold => "F2",
        }
    }

    fn base_font(&self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
        }
    }

    /// Glyph advance in 1/1000 em. Characters outside printable ASCII use
    /// the width of a digit.
    fn glyph_width(&self, c: char) -> u16 {
        let table = match self {
            Self::Helvetica => &HELVETICA_WIDTHS,
            Self::HelveticaBold => &HELVETICA_BOLD_WIDTHS,
        };
        match c as u32 {
            code @ 32..=126 => table[(code - 32) as usize],
            _ => 556,
        }
    }

    /// Width of `text` in points at `size`.
    pub fn text_width(&self, text: &str, size: f32) -> f32 {
        let units: u32 = text.chars().map(|c| u32::from(self.glyph_width(c))).sum();
        units as f32 * size / 1000.0
    }
}

#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// Encode `text` as a PDF literal string body in WinAnsi.
///
/// Latin-1 characters map to their own byte; anything else becomes `?`.
fn encode_literal(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '(' | ')' | '\\' => {
                out.push(b'\\');
                out.push(c as u8);
            }
            '\n' | '\r' | '\t' => out.push(b' '),
            c if (c as u32) < 0x20 => {}
            c if (c as u32) < 0x7f || (0xa0..=0xff).contains(&(c as u32)) => out.push(c as u8),
            _ => out.push(b'?'),
        }
    }
    out
}

/// Split `text` into lines no wider than `width`. A single word wider than
/// `width` gets a line of its own.
pub fn wrap(font: Font, size: f32, width: f32, text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }
        let candidate = format!("{current} {word}");
        if font.text_width(&candidate, size) <= width {
            current = candidate;
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Drawing surface for one page.
#[derive(Debug, Default)]
pub struct Canvas {
    content: Vec<u8>,
}

impl Canvas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw `text` with its line box's top-left corner at (`x`, `y`).
    pub fn text(&mut self, font: Font, size: f32, x: f32, y: f32, text: &str) {
        let baseline = PAGE_HEIGHT - y - ASCENDER * size / 1000.0;
        self.content.extend_from_slice(
            format!(
                "BT /{} {size:.2} Tf {x:.2} {baseline:.2} Td (",
                font.resource_name()
            )
            .as_bytes(),
        );
        self.content.extend_from_slice(&encode_literal(text));
        self.content.extend_from_slice(b") Tj ET\n");
    }

    /// Draw `text` centered in the band starting at `left` spanning `width`.
    pub fn text_centered(&mut self, font: Font, size: f32, left: f32, width: f32, y: f32, text: &str) {
        let x = left + (width - font.text_width(text, size)).max(0.0) / 2.0;
        self.text(font, size, x, y, text);
    }

    /// Draw `text` wrapped to `width`, one line per line box. Returns the
    /// y coordinate below the last line.
    pub fn text_box(&mut self, font: Font, size: f32, x: f32, y: f32, width: f32, text: &str) -> f32 {
        let mut y = y;
        for line in wrap(font, size, width, text) {
            self.text(font, size, x, y, &line);
            y += size * LINE_HEIGHT;
        }
        y
    }

    /// Stroke a rectangle whose top-left corner is at (`x`, `y`).
    pub fn stroke_rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        let bottom = PAGE_HEIGHT - y - height;
        self.content
            .extend_from_slice(format!("{x:.2} {bottom:.2} {width:.2} {height:.2} re S\n").as_bytes());
    }

    /// Serialize the page as a complete PDF document.
    pub fn into_pdf(self) -> Result<Vec<u8>, RenderError> {
        let mut out: Vec<u8> = Vec::new();
        let mut offsets = Vec::with_capacity(6);

        out.write_all(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n")?;

        let objects: [Vec<u8>; 5] = [
            b"<< /Type /Catalog /Pages 2 0 R >>".to_vec(),
            b"<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_vec(),
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] \
                 /Resources << /Font << /F1 4 0 R /F2 5 0 R >> >> /Contents 6 0 R >>"
            )
            .into_bytes(),
            font_dict(Font::Helvetica).into_bytes(),
            font_dict(Font::HelveticaBold).into_bytes(),
        ];

        for (i, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            writeln!(out, "{} 0 obj", i + 1)?;
            out.write_all(body)?;
            out.write_all(b"\nendobj\n")?;
        }

        offsets.push(out.len());
        write!(out, "6 0 obj\n<< /Length {} >>\nstream\n", self.content.len())?;
        out.write_all(&self.content)?;
        out.write_all(b"\nendstream\nendobj\n")?;

        let xref = out.len();
        write!(out, "xref\n0 {}\n0000000000 65535 f \n", offsets.len() + 1)?;
        for offset in &offsets {
            write!(out, "{offset:010} 00000 n \n")?;
        }
        write!(
            out,
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n",
            offsets.len() + 1
        )?;

        Ok(out)
    }
}

fn font_dict(font: Font) -> String {
    format!(
        "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
        font.base_font()
    )
}
