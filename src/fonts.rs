use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{Blend, Canvas, draw_filled_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

/// Fonts tried in order when no explicit font is configured.
const SYSTEM_FONT_CANDIDATES: &[&str] = &[
    "arial.ttf",
    "Arial.ttf",
    "/System/Library/Fonts/Arial.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
    "/System/Library/Fonts/Helvetica.ttc",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
];

/// Finds a scalable font once and hands out sized handles to it.
pub struct FontResolver {
    candidates: Vec<PathBuf>,
    loaded: OnceLock<Option<FontVec>>,
}

impl Default for FontResolver {
    fn default() -> Self {
        Self::new(None)
    }
}

impl FontResolver {
    /// Resolver over the built-in platform list, with `preferred` tried first.
    pub fn new(preferred: Option<PathBuf>) -> Self {
        let candidates = preferred
            .into_iter()
            .chain(SYSTEM_FONT_CANDIDATES.iter().map(PathBuf::from))
            .collect();
        Self::with_candidates(candidates)
    }

    pub fn with_candidates(candidates: Vec<PathBuf>) -> Self {
        Self {
            candidates,
            loaded: OnceLock::new(),
        }
    }

    /// Resolver that always answers with the bitmap fallback.
    pub fn bitmap_only() -> Self {
        Self::with_candidates(Vec::new())
    }

    /// Returns a renderable font at `pixel_size`. Falls back to the fixed-size
    /// bitmap font when none of the candidates parse.
    pub fn resolve_font(&self, pixel_size: u32) -> FontHandle<'_> {
        match self.loaded.get_or_init(|| load_first(&self.candidates)) {
            Some(font) => FontHandle::Scalable {
                font,
                scale: PxScale::from(pixel_size.max(1) as f32),
            },
            None => FontHandle::Bitmap(BitmapFont),
        }
    }

    pub fn has_scalable_font(&self) -> bool {
        self.loaded
            .get_or_init(|| load_first(&self.candidates))
            .is_some()
    }
}

fn load_first(candidates: &[PathBuf]) -> Option<FontVec> {
    for path in candidates {
        match load_font(path) {
            Some(font) => {
                debug!("Using font {:?}", path);
                return Some(font);
            }
            None => debug!("Font candidate {:?} not usable", path),
        }
    }
    debug!("No scalable font found, using bitmap fallback");
    None
}

fn load_font(path: &Path) -> Option<FontVec> {
    let data = std::fs::read(path).ok()?;
    let is_collection = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("ttc"))
        .unwrap_or(false);
    if is_collection {
        FontVec::try_from_vec_and_index(data, 0).ok()
    } else {
        FontVec::try_from_vec(data).ok()
    }
}

/// A font at a concrete size, ready to measure and draw.
#[derive(Clone, Copy)]
pub enum FontHandle<'a> {
    Scalable { font: &'a FontVec, scale: PxScale },
    Bitmap(BitmapFont),
}

impl FontHandle<'_> {
    /// Width and height of the rendered text in pixels.
    pub fn measure(&self, text: &str) -> (u32, u32) {
        if text.is_empty() {
            return (0, 0);
        }
        match self {
            FontHandle::Scalable { font, scale } => text_size(*scale, *font, text),
            FontHandle::Bitmap(bitmap) => bitmap.measure(text),
        }
    }

    /// Vertical distance between stacked lines.
    pub fn line_height(&self) -> u32 {
        match self {
            FontHandle::Scalable { font, scale } => {
                font.as_scaled(*scale).height().ceil().max(1.0) as u32
            }
            FontHandle::Bitmap(bitmap) => bitmap.cell_height(),
        }
    }

    pub fn draw(
        &self,
        canvas: &mut Blend<RgbaImage>,
        color: Rgba<u8>,
        x: i32,
        y: i32,
        text: &str,
    ) {
        match self {
            FontHandle::Scalable { font, scale } => {
                draw_text_mut(canvas, color, x, y, *scale, *font, text)
            }
            FontHandle::Bitmap(bitmap) => bitmap.draw(canvas, color, x, y, text),
        }
    }

    pub fn is_bitmap(&self) -> bool {
        matches!(self, FontHandle::Bitmap(_))
    }
}

/// 5x7 glyphs drawn at a fixed 2x magnification.
#[derive(Debug, Clone, Copy)]
pub struct BitmapFont;

const GLYPH_COLUMNS: u32 = 5;
const GLYPH_ROWS: u32 = 7;
const BITMAP_SCALE: u32 = 2;

impl BitmapFont {
    fn advance(&self) -> u32 {
        (GLYPH_COLUMNS + 1) * BITMAP_SCALE
    }

    pub fn cell_height(&self) -> u32 {
        GLYPH_ROWS * BITMAP_SCALE
    }

    pub fn measure(&self, text: &str) -> (u32, u32) {
        let count = text.chars().count() as u32;
        if count == 0 {
            return (0, 0);
        }
        (count * self.advance() - BITMAP_SCALE, self.cell_height())
    }

    pub fn draw(
        &self,
        canvas: &mut Blend<RgbaImage>,
        color: Rgba<u8>,
        x: i32,
        y: i32,
        text: &str,
    ) {
        let (width, height) = canvas.dimensions();
        let mut cursor = x;
        for c in text.chars() {
            let rows = glyph(c);
            for (row, bits) in rows.iter().enumerate() {
                for col in 0..GLYPH_COLUMNS {
                    if bits & (1 << (GLYPH_COLUMNS - 1 - col)) == 0 {
                        continue;
                    }
                    let px = cursor + (col * BITMAP_SCALE) as i32;
                    let py = y + (row as u32 * BITMAP_SCALE) as i32;
                    if px + BITMAP_SCALE as i32 <= 0
                        || py + BITMAP_SCALE as i32 <= 0
                        || px >= width as i32
                        || py >= height as i32
                    {
                        continue;
                    }
                    draw_filled_rect_mut(
                        canvas,
                        Rect::at(px, py).of_size(BITMAP_SCALE, BITMAP_SCALE),
                        color,
                    );
                }
            }
            cursor += self.advance() as i32;
        }
    }
}

fn glyph(c: char) -> [u8; 7] {
    match c.to_ascii_uppercase() {
        ' ' => [0x00; 7],
        'A' => [0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'B' => [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E],
        'C' => [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        'D' => [0x1E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1E],
        'E' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        'F' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
        'G' => [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F],
        'H' => [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'I' => [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'J' => [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C],
        'K' => [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11],
        'L' => [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F],
        'M' => [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
        'N' => [0x11, 0x11, 0x19, 0x15, 0x13, 0x11, 0x11],
        'O' => [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'P' => [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        'Q' => [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D],
        'R' => [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        'S' => [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
        'T' => [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        'U' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'V' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04],
        'W' => [0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0A],
        'X' => [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11],
        'Y' => [0x11, 0x11, 0x11, 0x0A, 0x04, 0x04, 0x04],
        'Z' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F],
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C],
        ',' => [0x00, 0x00, 0x00, 0x00, 0x0C, 0x04, 0x08],
        '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        '_' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x1F],
        ':' => [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x0C, 0x00],
        '\'' => [0x04, 0x04, 0x08, 0x00, 0x00, 0x00, 0x00],
        '!' => [0x04, 0x04, 0x04, 0x04, 0x04, 0x00, 0x04],
        '?' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x00, 0x04],
        '/' => [0x00, 0x01, 0x02, 0x04, 0x08, 0x10, 0x00],
        '(' => [0x02, 0x04, 0x08, 0x08, 0x08, 0x04, 0x02],
        ')' => [0x08, 0x04, 0x02, 0x02, 0x02, 0x04, 0x08],
        '&' => [0x0C, 0x12, 0x14, 0x08, 0x15, 0x12, 0x0D],
        '@' => [0x0E, 0x11, 0x01, 0x0D, 0x15, 0x15, 0x0E],
        '©' => [0x0E, 0x11, 0x17, 0x19, 0x17, 0x11, 0x0E],
        // Unknown characters render as a hollow box
        _ => [0x1F, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1F],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_no_candidates_falls_back_to_bitmap() {
        let resolver = FontResolver::with_candidates(vec![PathBuf::from("/nonexistent/font.ttf")]);
        let font = resolver.resolve_font(32);
        assert!(font.is_bitmap());
        assert!(!resolver.has_scalable_font());
    }

    #[test]
    fn test_unparseable_font_file_falls_back() {
        let temp_dir = TempDir::new().unwrap();
        let bogus = temp_dir.path().join("broken.ttf");
        std::fs::write(&bogus, b"definitely not a font").unwrap();

        let resolver = FontResolver::with_candidates(vec![bogus]);
        assert!(resolver.resolve_font(20).is_bitmap());
    }

    #[test]
    fn test_bitmap_font_has_fixed_size() {
        let resolver = FontResolver::bitmap_only();
        let small = resolver.resolve_font(10).measure("ABC");
        let large = resolver.resolve_font(80).measure("ABC");
        assert_eq!(small, large);
        assert_eq!(small, (34, 14));
        assert_eq!(resolver.resolve_font(10).measure(""), (0, 0));
    }

    #[test]
    fn test_relative_candidates_are_bare_file_names() {
        let resolver = FontResolver::new(None);
        assert_eq!(resolver.candidates.len(), SYSTEM_FONT_CANDIDATES.len());
        for candidate in resolver.candidates.iter().filter(|c| c.is_relative()) {
            assert_eq!(candidate.components().count(), 1, "{:?}", candidate);
        }
    }

    #[test]
    fn test_bitmap_font_draws_pixels() {
        let mut canvas = Blend(RgbaImage::new(60, 20));
        let font = FontHandle::Bitmap(BitmapFont);
        font.draw(&mut canvas, Rgba([255, 255, 255, 255]), 2, 2, "Hi");
        assert!(canvas.0.pixels().any(|p| p[3] > 0));
    }

    #[test]
    fn test_bitmap_font_clips_outside_canvas() {
        let mut canvas = Blend(RgbaImage::new(10, 10));
        let font = FontHandle::Bitmap(BitmapFont);
        font.draw(&mut canvas, Rgba([255, 255, 255, 255]), -500, -500, "CLIPPED");
        font.draw(&mut canvas, Rgba([255, 255, 255, 255]), 500, 500, "CLIPPED");
        assert!(canvas.0.pixels().all(|p| p[3] == 0));
    }

    #[test]
    fn test_system_font_scales_with_size() {
        let resolver = FontResolver::default();
        if !resolver.has_scalable_font() {
            // Can't test without a font installed
            return;
        }
        let (small_w, small_h) = resolver.resolve_font(12).measure("Watermark");
        let (large_w, large_h) = resolver.resolve_font(48).measure("Watermark");
        assert!(large_w > small_w);
        assert!(large_h > small_h);
    }
}
