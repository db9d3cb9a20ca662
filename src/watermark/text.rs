use crate::fonts::FontHandle;
use image::{Rgba, RgbaImage};
use imageproc::drawing::{Blend, draw_filled_rect_mut};
use imageproc::rect::Rect;

/// Colors and padding for one kind of text block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub text_color: Rgba<u8>,
    pub backing_color: Rgba<u8>,
    pub padding: u32,
}

pub const WATERMARK_STYLE: TextStyle = TextStyle {
    text_color: Rgba([255, 255, 255, 220]),
    backing_color: Rgba([0, 0, 0, 100]),
    padding: 6,
};

pub const PHOTOGRAPHER_STYLE: TextStyle = TextStyle {
    text_color: Rgba([255, 255, 255, 200]),
    backing_color: Rgba([0, 0, 0, 80]),
    padding: 4,
};

pub const CAPTION_STYLE: TextStyle = TextStyle {
    text_color: Rgba([255, 255, 255, 200]),
    backing_color: Rgba([0, 0, 0, 120]),
    padding: 5,
};

/// Roughly 20% opaque white for the protected-mode pattern.
pub const PATTERN_TEXT_COLOR: Rgba<u8> = Rgba([255, 255, 255, 51]);

/// Measured lines of text, laid out top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBlock {
    pub lines: Vec<String>,
    pub line_widths: Vec<u32>,
    pub line_advance: u32,
    pub width: u32,
    pub height: u32,
}

impl TextBlock {
    pub fn measure(font: &FontHandle<'_>, lines: Vec<String>) -> Self {
        let line_widths: Vec<u32> = lines.iter().map(|line| font.measure(line).0).collect();
        let width = line_widths.iter().copied().max().unwrap_or(0);

        let (line_advance, height) = match lines.len() {
            0 => (0, 0),
            // A lone line uses its measured height so the backing hugs it
            1 => {
                let (_, h) = font.measure(&lines[0]);
                (h, h)
            }
            n => {
                let advance = font.line_height() + font.line_height() / 5;
                (advance, advance * (n as u32 - 1) + font.line_height())
            }
        };

        Self {
            lines,
            line_widths,
            line_advance,
            width,
            height,
        }
    }

    pub fn single(font: &FontHandle<'_>, text: &str) -> Self {
        Self::measure(font, vec![text.to_string()])
    }

    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|line| line.is_empty())
    }

    /// Size including the backing padding on every side.
    pub fn padded_size(&self, style: &TextStyle) -> (u32, u32) {
        (
            self.width + 2 * style.padding,
            self.height + 2 * style.padding,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineAlign {
    Left,
    Center,
}

/// Draw a block whose text starts at (x, y), with its backing rectangle
/// extending `style.padding` beyond the text on every side.
pub fn draw_text_block(
    canvas: &mut Blend<RgbaImage>,
    font: &FontHandle<'_>,
    block: &TextBlock,
    x: i32,
    y: i32,
    align: LineAlign,
    style: &TextStyle,
) {
    if block.is_empty() {
        return;
    }

    let pad = style.padding as i32;
    let (backing_w, backing_h) = block.padded_size(style);
    if backing_w > 0 && backing_h > 0 {
        draw_filled_rect_mut(
            canvas,
            Rect::at(x - pad, y - pad).of_size(backing_w, backing_h),
            style.backing_color,
        );
    }

    for (index, line) in block.lines.iter().enumerate() {
        let line_x = match align {
            LineAlign::Left => x,
            LineAlign::Center => x + (block.width as i32 - block.line_widths[index] as i32) / 2,
        };
        let line_y = y + (index as u32 * block.line_advance) as i32;
        font.draw(canvas, style.text_color, line_x, line_y, line);
    }
}

/// Render `text` alone onto a transparent square and rotate it 45 degrees
/// counter-clockwise, so it reads bottom-left to top-right.
pub fn render_diagonal_stamp(font: &FontHandle<'_>, text: &str, color: Rgba<u8>) -> RgbaImage {
    use imageproc::geometric_transformations::{Interpolation, rotate_about_center};

    let (text_w, text_h) = font.measure(text);
    let side = ((text_w as f32).hypot(text_h as f32).ceil() as u32 + 2).max(1);
    let mut square = Blend(RgbaImage::new(side, side));
    let x = (side as i32 - text_w as i32) / 2;
    let y = (side as i32 - text_h as i32) / 2;
    font.draw(&mut square, color, x, y, text);

    rotate_about_center(
        &square.0,
        -std::f32::consts::FRAC_PI_4,
        Interpolation::Bilinear,
        Rgba([0, 0, 0, 0]),
    )
}
