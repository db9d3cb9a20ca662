use super::WatermarkError;
use super::formats::{self, EncodeSettings};
use super::layout::{
    Anchor, OverlayMetrics, PatternGeometry, anchor_position, diagonal_placements,
    overlaps_canvas, wrap_text,
};
use super::logo::{LogoPreparer, faded};
use super::text::{
    CAPTION_STYLE, LineAlign, PATTERN_TEXT_COLOR, PHOTOGRAPHER_STYLE, TextBlock, WATERMARK_STYLE,
    draw_text_block, render_diagonal_stamp,
};
use super::types::{ImageSize, OutputFormat, WatermarkOutcome, WatermarkRequest};
use crate::attribution::{AttributionEntry, AttributionLogger, AttributionStore, AuditRow};
use crate::discovery::{self, ImageRecord};
use crate::fonts::FontResolver;
use image::{DynamicImage, ImageDecoder, ImageReader, RgbaImage, imageops, imageops::FilterType};
use imageproc::drawing::Blend;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

/// Alpha multiplier for the logo copies stamped into the diagonal pattern.
const PATTERN_LOGO_FADE: f32 = 0.5;
/// Every n-th pattern instance gets a logo stamp next to it.
const PATTERN_LOGO_EVERY: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessorSettings {
    /// Larger images are scaled down to fit inside this box.
    pub max_size: ImageSize,
    pub encode: EncodeSettings,
    /// Font tried before the built-in candidate list.
    pub font_path: Option<PathBuf>,
}

impl Default for ProcessorSettings {
    fn default() -> Self {
        Self {
            max_size: ImageSize::new(1920, 1080),
            encode: EncodeSettings::default(),
            font_path: None,
        }
    }
}

/// Applies watermarks to single images.
///
/// Logo and attribution data are loaded once up front and only read while
/// processing, so one processor can serve any number of requests.
pub struct WatermarkProcessor {
    settings: ProcessorSettings,
    fonts: FontResolver,
    logo: LogoPreparer,
    attribution: AttributionStore,
    logger: AttributionLogger,
}

impl Default for WatermarkProcessor {
    fn default() -> Self {
        Self::new(ProcessorSettings::default())
    }
}

impl WatermarkProcessor {
    pub fn new(settings: ProcessorSettings) -> Self {
        let fonts = FontResolver::new(settings.font_path.clone());
        Self {
            settings,
            fonts,
            logo: LogoPreparer::new(),
            attribution: AttributionStore::new(),
            logger: AttributionLogger::new(),
        }
    }

    /// Replace the font resolver, e.g. to pin rendering to the bitmap font.
    pub fn with_font_resolver(mut self, fonts: FontResolver) -> Self {
        self.fonts = fonts;
        self
    }

    pub fn load_logo(&mut self, path: &Path) -> bool {
        self.logo.load(path)
    }

    pub fn has_logo(&self) -> bool {
        self.logo.is_loaded()
    }

    pub fn load_attribution_csv(&mut self, path: &Path) -> usize {
        self.attribution.load(path)
    }

    pub fn find_all_images(&self, root: &Path) -> Vec<ImageRecord> {
        discovery::find_all_images(root)
    }

    /// Watermark one image, reporting failure as `false` after logging it.
    pub fn add_watermark(&self, request: &WatermarkRequest) -> bool {
        match self.try_add_watermark(request) {
            Ok(outcome) => {
                debug!(
                    "Watermarked {:?} -> {:?} ({} -> {})",
                    request.source_path,
                    request.destination_path,
                    outcome.original_size,
                    outcome.final_size
                );
                true
            }
            Err(e) => {
                error!("Error processing {:?}: {}", request.source_path, e);
                false
            }
        }
    }

    pub fn try_add_watermark(
        &self,
        request: &WatermarkRequest,
    ) -> Result<WatermarkOutcome, WatermarkError> {
        let format = OutputFormat::from_path(&request.destination_path)
            .ok_or_else(|| WatermarkError::UnsupportedFormat(request.destination_path.clone()))?;
        let filename = request
            .source_path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .ok_or_else(|| WatermarkError::InvalidSource(request.source_path.clone()))?;

        let (decoded, icc_profile) = decode_source(&request.source_path)?;
        let original_size = ImageSize::new(decoded.width(), decoded.height());
        let base = downscale_to_fit(decoded, self.settings.max_size);
        let final_size = ImageSize::new(base.width(), base.height());

        let attribution = self.attribution.lookup(&filename);
        let photographer = resolve_photographer(request.photographer.as_deref(), &attribution);

        let overlay = self.render_overlay(final_size, request, &attribution, &photographer);
        let mut composited = base.to_rgba8();
        imageops::overlay(&mut composited, &overlay, 0, 0);
        let output = formats::adapt_for_format(composited, format);

        if let Some(parent) = request.destination_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        formats::save(
            &output,
            &request.destination_path,
            format,
            &self.settings.encode,
            icc_profile.as_deref(),
        )?;

        self.logger.append(
            &request.log_path,
            &AuditRow::new(
                &filename,
                &photographer,
                &attribution.team_name,
                &attribution.caption,
                &request.watermark_text,
                request.mode,
                original_size,
                final_size,
            ),
        );

        Ok(WatermarkOutcome {
            original_size,
            final_size,
            photographer,
        })
    }

    /// Draw every overlay element for a canvas of `size` onto a transparent
    /// buffer. Draw order: pattern, logo, watermark text, caption, credit.
    pub fn render_overlay(
        &self,
        size: ImageSize,
        request: &WatermarkRequest,
        attribution: &AttributionEntry,
        photographer: &str,
    ) -> RgbaImage {
        let metrics = OverlayMetrics::for_canvas(size);
        let mut canvas = Blend(RgbaImage::new(size.width, size.height));
        let logo = self.logo.scaled_for(size, request.mode);

        if request.mode.has_diagonal_pattern() && !request.watermark_text.trim().is_empty() {
            self.draw_diagonal_pattern(
                &mut canvas,
                size,
                &metrics,
                &request.watermark_text,
                logo.as_ref(),
            );
        }

        if let Some(logo) = &logo {
            let (x, y) = anchor_position(
                Anchor::BottomLeft,
                size,
                logo.width(),
                logo.height(),
                metrics.margin,
            );
            imageops::overlay(&mut canvas.0, logo, x as i64, y as i64);
        }

        let watermark_font = self.fonts.resolve_font(metrics.watermark_px);
        let watermark = TextBlock::single(&watermark_font, &request.watermark_text);
        let mut caption_floor = size.height as i32 - metrics.margin as i32;
        if !watermark.is_empty() {
            let (x, y) = anchor_position(
                Anchor::BottomRight,
                size,
                watermark.width,
                watermark.height,
                metrics.margin,
            );
            draw_text_block(
                &mut canvas,
                &watermark_font,
                &watermark,
                x,
                y,
                LineAlign::Left,
                &WATERMARK_STYLE,
            );
            caption_floor = y - WATERMARK_STYLE.padding as i32;
        }

        if !attribution.caption.trim().is_empty() {
            let caption_font = self.fonts.resolve_font(metrics.caption_px);
            let lines = self.caption_lines(&attribution.caption, size);
            let caption = TextBlock::measure(&caption_font, lines);
            let x = (size.width as i32 - caption.width as i32) / 2;
            let y = caption_floor
                - (metrics.margin / 2) as i32
                - CAPTION_STYLE.padding as i32
                - caption.height as i32;
            draw_text_block(
                &mut canvas,
                &caption_font,
                &caption,
                x,
                y,
                LineAlign::Center,
                &CAPTION_STYLE,
            );
        }

        if !photographer.is_empty() {
            let credit_font = self.fonts.resolve_font(metrics.photographer_px);
            let credit = TextBlock::single(&credit_font, photographer);
            let (x, y) = anchor_position(
                Anchor::TopRight,
                size,
                credit.width,
                credit.height,
                metrics.margin,
            );
            draw_text_block(
                &mut canvas,
                &credit_font,
                &credit,
                x,
                y,
                LineAlign::Left,
                &PHOTOGRAPHER_STYLE,
            );
        }

        canvas.0
    }

    /// Caption broken into lines no wider than the canvas minus both margins.
    pub fn caption_lines(&self, caption: &str, size: ImageSize) -> Vec<String> {
        let metrics = OverlayMetrics::for_canvas(size);
        let font = self.fonts.resolve_font(metrics.caption_px);
        let max_width = size.width.saturating_sub(2 * metrics.margin);
        wrap_text(caption, max_width, |line| font.measure(line).0)
    }

    /// Width in pixels of `text` set in the caption font for `size`.
    pub fn caption_width(&self, text: &str, size: ImageSize) -> u32 {
        let metrics = OverlayMetrics::for_canvas(size);
        self.fonts.resolve_font(metrics.caption_px).measure(text).0
    }

    fn draw_diagonal_pattern(
        &self,
        canvas: &mut Blend<RgbaImage>,
        size: ImageSize,
        metrics: &OverlayMetrics,
        text: &str,
        logo: Option<&RgbaImage>,
    ) {
        let font = self.fonts.resolve_font(metrics.pattern_px);
        let (text_width, _) = font.measure(text);
        let stamp = render_diagonal_stamp(&font, text, PATTERN_TEXT_COLOR);
        let geometry = PatternGeometry {
            stamp_size: stamp.width(),
            pitch: text_width + metrics.pattern_gap,
            spacing: metrics.pattern_spacing,
        };
        let placements = diagonal_placements(size, geometry);
        let faint_logo = logo.map(|logo| faded(logo, PATTERN_LOGO_FADE));

        // halfway to the next instance along the rising diagonal
        let half_step = geometry.pitch as f32 / 2.0 * std::f32::consts::FRAC_1_SQRT_2;
        let mut logo_count = 0;

        for (index, placement) in placements.iter().enumerate() {
            imageops::overlay(&mut canvas.0, &stamp, placement.x as i64, placement.y as i64);

            let Some(faint) = &faint_logo else { continue };
            if index % PATTERN_LOGO_EVERY != 0 {
                continue;
            }
            let logo_x =
                (placement.center_x + half_step - faint.width() as f32 / 2.0).round() as i32;
            let logo_y =
                (placement.center_y - half_step - faint.height() as f32 / 2.0).round() as i32;
            if overlaps_canvas(
                logo_x,
                logo_y,
                faint.width() as i32,
                faint.height() as i32,
                size,
            ) {
                imageops::overlay(&mut canvas.0, faint, logo_x as i64, logo_y as i64);
                logo_count += 1;
            }
        }

        debug!(
            "Diagonal pattern: {} text instances, {} logo stamps",
            placements.len(),
            logo_count
        );
    }
}

/// An explicitly supplied photographer wins over the attribution CSV.
pub fn resolve_photographer(explicit: Option<&str>, attribution: &AttributionEntry) -> String {
    match explicit {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => attribution.photographer.clone(),
    }
}

/// Scale down, keeping aspect ratio, so the image fits inside `bounds`.
/// Never upscales.
pub fn downscale_to_fit(image: DynamicImage, bounds: ImageSize) -> DynamicImage {
    let size = ImageSize::new(image.width(), image.height());
    if size.exceeds(bounds) {
        debug!("Downscaling {} to fit {}", size, bounds);
        image.resize(bounds.width, bounds.height, FilterType::Lanczos3)
    } else {
        image
    }
}

/// Decode `path`, keeping its embedded ICC profile if the decoder exposes one.
fn decode_source(path: &Path) -> Result<(DynamicImage, Option<Vec<u8>>), WatermarkError> {
    let reader = ImageReader::open(path)?.with_guessed_format()?;
    let mut decoder = reader.into_decoder()?;
    let icc_profile = match decoder.icc_profile() {
        Ok(profile) => profile,
        Err(e) => {
            debug!("Could not read ICC profile from {:?}: {}", path, e);
            None
        }
    };
    let image = DynamicImage::from_decoder(decoder)?;
    Ok((image, icc_profile))
}
