//! Overlay geometry.
//!
//! Everything here is a pure function of canvas size and measured text, so
//! placement can be tested without rendering a single glyph.

use super::types::ImageSize;

/// Size-dependent constants for one canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayMetrics {
    pub margin: u32,
    pub watermark_px: u32,
    pub caption_px: u32,
    pub photographer_px: u32,
    pub pattern_px: u32,
    /// Perpendicular distance between neighbouring diagonal pattern lines.
    pub pattern_spacing: u32,
    /// Gap between repeated text instances along one pattern line.
    pub pattern_gap: u32,
}

impl OverlayMetrics {
    pub fn for_canvas(size: ImageSize) -> Self {
        let width = size.width;
        Self {
            margin: (width / 80).max(15),
            watermark_px: (width / 60).max(16),
            caption_px: (width / 80).max(12),
            photographer_px: (width / 90).max(10),
            pattern_px: (width / 30).max(18),
            pattern_spacing: (width / 6).max(60),
            pattern_gap: 60,
        }
    }
}

/// Top-left corner of a block anchored to a canvas corner, inset by `margin`.
/// Coordinates go negative when the block is larger than the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    TopRight,
    BottomLeft,
    BottomRight,
}

pub fn anchor_position(
    anchor: Anchor,
    canvas: ImageSize,
    block_width: u32,
    block_height: u32,
    margin: u32,
) -> (i32, i32) {
    let w = canvas.width as i32;
    let h = canvas.height as i32;
    let bw = block_width as i32;
    let bh = block_height as i32;
    let m = margin as i32;

    match anchor {
        Anchor::TopRight => (w - bw - m, m),
        Anchor::BottomLeft => (m, h - bh - m),
        Anchor::BottomRight => (w - bw - m, h - bh - m),
    }
}

/// Greedy line breaking: words are appended while the measured line stays
/// within `max_width`. A single word wider than the limit gets its own line.
pub fn wrap_text<F>(text: &str, max_width: u32, measure: F) -> Vec<String>
where
    F: Fn(&str) -> u32,
{
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }

        let candidate = format!("{} {}", current, word);
        if measure(&candidate) <= max_width {
            current = candidate;
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }

    lines
}

/// One repeated text instance of the protected-mode pattern.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternPlacement {
    /// Index of the diagonal line, 0 through the canvas center.
    pub line: i32,
    /// Center of the instance in canvas coordinates.
    pub center_x: f32,
    pub center_y: f32,
    /// Top-left corner of the (rotated) stamp.
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy)]
pub struct PatternGeometry {
    /// Side of the square, rotated text stamp.
    pub stamp_size: u32,
    /// Distance between instance centers along a line.
    pub pitch: u32,
    pub spacing: u32,
}

const INV_SQRT_2: f32 = std::f32::consts::FRAC_1_SQRT_2;

/// Positions of every visible text instance of the diagonal pattern.
///
/// Lines rise at 45 degrees (bottom-left to top-right) and are stacked along
/// the perpendicular through the canvas center. Enough lines are generated
/// to reach past both far corners, and each line runs beyond the canvas on
/// both ends. Odd lines are shifted by half a pitch so instances interleave.
pub fn diagonal_placements(canvas: ImageSize, geometry: PatternGeometry) -> Vec<PatternPlacement> {
    let width = canvas.width as f32;
    let height = canvas.height as f32;
    let diagonal = (width * width + height * height).sqrt();
    let half_diagonal = diagonal / 2.0;
    let spacing = geometry.spacing.max(1) as f32;
    let pitch = geometry.pitch.max(1) as f32;
    let stamp = geometry.stamp_size as i32;

    let line_count = (half_diagonal / spacing).ceil() as i32 + 1;
    let steps = ((half_diagonal + pitch) / pitch).ceil() as i32 + 1;

    let cx = width / 2.0;
    let cy = height / 2.0;
    // direction along a line, and the perpendicular between lines
    let (ux, uy) = (INV_SQRT_2, -INV_SQRT_2);
    let (nx, ny) = (INV_SQRT_2, INV_SQRT_2);

    let mut placements = Vec::new();
    for line in -line_count..=line_count {
        let offset = line as f32 * spacing;
        let stagger = if line.rem_euclid(2) == 1 { pitch / 2.0 } else { 0.0 };
        let origin_x = cx + nx * offset;
        let origin_y = cy + ny * offset;

        for step in -steps..=steps {
            let t = step as f32 * pitch + stagger;
            let center_x = origin_x + ux * t;
            let center_y = origin_y + uy * t;
            let x = (center_x - stamp as f32 / 2.0).round() as i32;
            let y = (center_y - stamp as f32 / 2.0).round() as i32;

            if !overlaps_canvas(x, y, stamp, stamp, canvas) {
                continue;
            }

            placements.push(PatternPlacement {
                line,
                center_x,
                center_y,
                x,
                y,
            });
        }
    }

    placements
}

/// Whether a `width` x `height` box at (x, y) touches the canvas at all.
pub fn overlaps_canvas(x: i32, y: i32, width: i32, height: i32, canvas: ImageSize) -> bool {
    x < canvas.width as i32 && y < canvas.height as i32 && x + width > 0 && y + height > 0
}
