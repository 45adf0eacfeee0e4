//! Crop and brightness/contrast editing of a stored image.
//!
//! # Design
//! - Crop rectangles are expressed in displayed pixels and scaled to native
//!   resolution by [`ScaleFactors`] at render time.
//! - Filters follow CSS semantics: brightness multiplies each channel,
//!   contrast scales the distance from mid-grey. 100% is the identity.
//! - Output is JPEG at quality 95 and replaces the stored content in place.

use std::fmt::{self, Display, Formatter};

use cloudgallery_api_models::ImageRecord;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView, Rgba, RgbaImage, imageops};
use tracing::{debug, info};

use crate::api::ApiClient;
use crate::error::{ClientError, ClientResult};
use crate::routes::Route;

/// JPEG quality used when exporting edits.
pub const JPEG_QUALITY: u8 = 95;
/// Lowest accepted filter percentage.
pub const MIN_FILTER_PERCENT: u16 = 50;
/// Highest accepted filter percentage.
pub const MAX_FILTER_PERCENT: u16 = 150;
/// Filter percentage that leaves pixels unchanged.
pub const IDENTITY_PERCENT: u16 = 100;
/// Share of the fitted width used by a freshly centred crop.
const CENTERED_CROP_SHARE: f64 = 0.9;
/// How far, in displayed pixels, a crop may overhang the image edge.
pub const CROP_EDGE_TOLERANCE: f64 = 1.0;

/// Crop aspect ratio presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AspectRatio {
    /// Unconstrained.
    #[default]
    Free,
    /// 1:1.
    Square,
    /// 4:3.
    FourThree,
    /// 16:9.
    SixteenNine,
}

impl AspectRatio {
    /// Width over height, or `None` when unconstrained.
    #[must_use]
    pub fn value(self) -> Option<f64> {
        match self {
            Self::Free => None,
            Self::Square => Some(1.0),
            Self::FourThree => Some(4.0 / 3.0),
            Self::SixteenNine => Some(16.0 / 9.0),
        }
    }

    /// Parse `free`, `1:1`, `4:3`, or `16:9`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "free" => Some(Self::Free),
            "1:1" | "square" => Some(Self::Square),
            "4:3" => Some(Self::FourThree),
            "16:9" => Some(Self::SixteenNine),
            _ => None,
        }
    }
}

impl Display for AspectRatio {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Free => "free",
            Self::Square => "1:1",
            Self::FourThree => "4:3",
            Self::SixteenNine => "16:9",
        })
    }
}

/// Crop rectangle in displayed pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

impl CropRect {
    /// Whether the rectangle has positive area.
    #[must_use]
    pub fn is_committed(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    /// Require finite coordinates, positive area, and a rectangle inside
    /// `bounds` give or take [`CROP_EDGE_TOLERANCE`].
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the first violated constraint.
    pub fn check_within(&self, bounds: (f64, f64)) -> ClientResult<()> {
        let coordinates = [self.x, self.y, self.width, self.height];
        if !coordinates.iter().all(|value| value.is_finite()) {
            return Err(ClientError::validation(
                "crop coordinates must be finite numbers",
            ));
        }
        if !self.is_committed() {
            return Err(ClientError::validation(
                "crop width and height must be positive",
            ));
        }
        let inside = self.x >= -CROP_EDGE_TOLERANCE
            && self.y >= -CROP_EDGE_TOLERANCE
            && self.x + self.width <= bounds.0 + CROP_EDGE_TOLERANCE
            && self.y + self.height <= bounds.1 + CROP_EDGE_TOLERANCE;
        if !inside {
            return Err(ClientError::validation(format!(
                "crop must lie inside the {}x{} image",
                bounds.0, bounds.1
            )));
        }
        Ok(())
    }
}

/// Largest rectangle of `aspect` inside the media, shrunk to 90% of its width
/// and centred.
#[must_use]
pub fn center_aspect_crop(media_width: f64, media_height: f64, aspect: f64) -> CropRect {
    let fitted_height = media_width / aspect;
    let fitted_width = if fitted_height > media_height {
        media_height * aspect
    } else {
        media_width
    };
    let width = fitted_width * CENTERED_CROP_SHARE;
    let height = width / aspect;
    CropRect {
        x: (media_width - width) / 2.0,
        y: (media_height - height) / 2.0,
        width,
        height,
    }
}

/// Brightness and contrast in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterSettings {
    brightness: u16,
    contrast: u16,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            brightness: IDENTITY_PERCENT,
            contrast: IDENTITY_PERCENT,
        }
    }
}

impl FilterSettings {
    /// Build validated settings.
    ///
    /// # Errors
    ///
    /// Returns a validation error when either value falls outside 50–150.
    pub fn new(brightness: u16, contrast: u16) -> ClientResult<Self> {
        Ok(Self {
            brightness: check_percent("brightness", brightness)?,
            contrast: check_percent("contrast", contrast)?,
        })
    }

    /// Brightness percentage.
    #[must_use]
    pub const fn brightness(&self) -> u16 {
        self.brightness
    }

    /// Contrast percentage.
    #[must_use]
    pub const fn contrast(&self) -> u16 {
        self.contrast
    }

    /// Whether applying the filter changes nothing.
    #[must_use]
    pub const fn is_identity(&self) -> bool {
        self.brightness == IDENTITY_PERCENT && self.contrast == IDENTITY_PERCENT
    }

    /// CSS filter string for previews.
    #[must_use]
    pub fn css(&self) -> String {
        format!(
            "brightness({}%) contrast({}%)",
            self.brightness, self.contrast
        )
    }

    fn apply_channel(&self, value: u8) -> u8 {
        let brightness = f64::from(self.brightness) / 100.0;
        let contrast = f64::from(self.contrast) / 100.0;
        let lit = f64::from(value) / 255.0 * brightness;
        let contrasted = (lit - 0.5).mul_add(contrast, 0.5);
        to_channel(contrasted.clamp(0.0, 1.0) * 255.0)
    }
}

fn check_percent(field: &str, value: u16) -> ClientResult<u16> {
    if (MIN_FILTER_PERCENT..=MAX_FILTER_PERCENT).contains(&value) {
        Ok(value)
    } else {
        Err(ClientError::validation(format!(
            "{field} must be between {MIN_FILTER_PERCENT} and {MAX_FILTER_PERCENT} percent"
        )))
    }
}

/// Native-to-displayed size ratio on each axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleFactors {
    /// Horizontal factor.
    pub x: f64,
    /// Vertical factor.
    pub y: f64,
}

impl ScaleFactors {
    /// Factors from natural and displayed sizes.
    ///
    /// # Errors
    ///
    /// Returns a validation error when a displayed dimension is not a
    /// positive finite number.
    pub fn new(natural: (u32, u32), displayed: (f64, f64)) -> ClientResult<Self> {
        let valid = |value: f64| value.is_finite() && value > 0.0;
        if !valid(displayed.0) || !valid(displayed.1) {
            return Err(ClientError::validation(
                "displayed size must be positive in both dimensions",
            ));
        }
        Ok(Self {
            x: f64::from(natural.0) / displayed.0,
            y: f64::from(natural.1) / displayed.1,
        })
    }

    /// Factors for an image shown at its natural size.
    #[must_use]
    pub const fn identity() -> Self {
        Self { x: 1.0, y: 1.0 }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_channel(value: f64) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_pixels(value: f64) -> u32 {
    value.round().clamp(0.0, f64::from(u32::MAX)) as u32
}

/// Render the cropped, filtered region at native resolution.
///
/// The output measures `round(w·sx) × round(h·sy)`; the sliver a crop may
/// overhang the source edge stays transparent.
///
/// # Errors
///
/// Returns a validation error when the crop is not finite, lies outside the
/// displayed image, or has no area after scaling.
pub fn render_crop(
    source: &DynamicImage,
    crop: CropRect,
    scale: ScaleFactors,
    filter: FilterSettings,
) -> ClientResult<RgbaImage> {
    let (src_width, src_height) = source.dimensions();
    crop.check_within((
        f64::from(src_width) / scale.x,
        f64::from(src_height) / scale.y,
    ))?;
    let out_width = to_pixels(crop.width * scale.x);
    let out_height = to_pixels(crop.height * scale.y);
    if out_width == 0 || out_height == 0 {
        return Err(ClientError::validation("crop region is too small"));
    }

    let left = crop.x * scale.x;
    let top = crop.y * scale.y;
    let src_x = to_pixels(left.max(0.0)).min(src_width);
    let src_y = to_pixels(top.max(0.0)).min(src_height);
    let offset_x = i64::from(to_pixels((-left).max(0.0)));
    let offset_y = i64::from(to_pixels((-top).max(0.0)));
    let visible_width = out_width.min(src_width - src_x);
    let visible_height = out_height.min(src_height - src_y);

    let mut canvas = RgbaImage::from_pixel(out_width, out_height, Rgba([0, 0, 0, 0]));
    if visible_width > 0 && visible_height > 0 {
        let region = source
            .crop_imm(src_x, src_y, visible_width, visible_height)
            .to_rgba8();
        imageops::replace(&mut canvas, &region, offset_x, offset_y);
    }

    if !filter.is_identity() {
        for pixel in canvas.pixels_mut() {
            let [r, g, b, a] = pixel.0;
            *pixel = Rgba([
                filter.apply_channel(r),
                filter.apply_channel(g),
                filter.apply_channel(b),
                a,
            ]);
        }
    }
    debug!(
        width = out_width,
        height = out_height,
        filter = %filter.css(),
        "crop rendered"
    );
    Ok(canvas)
}

/// Encode a rendered crop as JPEG.
///
/// # Errors
///
/// Returns [`ClientError::Export`] when encoding fails.
pub fn encode_jpeg(image: &RgbaImage, quality: u8) -> ClientResult<Vec<u8>> {
    let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
    let mut bytes = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut bytes, quality);
    DynamicImage::ImageRgb8(rgb).write_with_encoder(encoder)?;
    Ok(bytes)
}

/// Editing session for one image.
#[derive(Debug, Clone)]
pub struct EditorSession {
    record: ImageRecord,
    source: DynamicImage,
    displayed: (f64, f64),
    aspect: AspectRatio,
    crop: Option<CropRect>,
    completed: Option<CropRect>,
    filter: FilterSettings,
}

impl EditorSession {
    /// Load the record and its original (cache-busted) for editing.
    ///
    /// The image is treated as displayed at `displayed`, or at natural size
    /// when omitted.
    ///
    /// # Errors
    ///
    /// Returns the API error, or [`ClientError::Export`] when the original
    /// cannot be decoded.
    pub async fn open(
        api: &ApiClient,
        id: i64,
        displayed: Option<(f64, f64)>,
    ) -> ClientResult<Self> {
        let record = api.get_image(id).await?;
        let bytes = api.fetch_original(&record.filename).await?;
        let source = image::load_from_memory(&bytes)?;
        Self::from_parts(record, source, displayed)
    }

    /// Session over an already decoded source.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a non-positive displayed size.
    pub fn from_parts(
        record: ImageRecord,
        source: DynamicImage,
        displayed: Option<(f64, f64)>,
    ) -> ClientResult<Self> {
        let displayed = displayed.unwrap_or_else(|| {
            let (w, h) = source.dimensions();
            (f64::from(w), f64::from(h))
        });
        ScaleFactors::new(source.dimensions(), displayed)?;
        Ok(Self {
            record,
            source,
            displayed,
            aspect: AspectRatio::Free,
            crop: None,
            completed: None,
            filter: FilterSettings::default(),
        })
    }

    /// Record being edited.
    #[must_use]
    pub const fn record(&self) -> &ImageRecord {
        &self.record
    }

    /// Selected aspect preset.
    #[must_use]
    pub const fn aspect(&self) -> AspectRatio {
        self.aspect
    }

    /// Crop being dragged.
    #[must_use]
    pub const fn crop(&self) -> Option<CropRect> {
        self.crop
    }

    /// Last committed crop.
    #[must_use]
    pub const fn completed_crop(&self) -> Option<CropRect> {
        self.completed
    }

    /// Current filter.
    #[must_use]
    pub const fn filter(&self) -> FilterSettings {
        self.filter
    }

    /// Scale from displayed to native pixels.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a non-positive displayed size.
    pub fn scale(&self) -> ClientResult<ScaleFactors> {
        ScaleFactors::new(self.source.dimensions(), self.displayed)
    }

    /// Choose an aspect preset; fixed presets recentre and commit the crop.
    pub fn set_aspect(&mut self, aspect: AspectRatio) {
        self.aspect = aspect;
        if let Some(ratio) = aspect.value() {
            let crop = center_aspect_crop(self.displayed.0, self.displayed.1, ratio);
            self.crop = Some(crop);
            self.completed = Some(crop);
        }
    }

    /// Update the crop being dragged.
    pub const fn set_crop(&mut self, crop: CropRect) {
        self.crop = Some(crop);
    }

    /// Commit the dragged crop.
    ///
    /// # Errors
    ///
    /// Returns a validation error when nothing was dragged or the crop is not
    /// a finite rectangle inside the displayed image. The previous commit is
    /// kept in that case.
    pub fn commit_crop(&mut self) -> ClientResult<()> {
        let crop = self
            .crop
            .ok_or_else(|| ClientError::validation("select a crop region first"))?;
        crop.check_within(self.displayed)?;
        self.completed = Some(crop);
        Ok(())
    }

    /// Set brightness and contrast.
    ///
    /// # Errors
    ///
    /// Returns a validation error for values outside 50–150.
    pub fn set_filter(&mut self, brightness: u16, contrast: u16) -> ClientResult<()> {
        self.filter = FilterSettings::new(brightness, contrast)?;
        Ok(())
    }

    /// Back to free aspect, no crop, identity filter.
    pub fn reset(&mut self) {
        self.aspect = AspectRatio::Free;
        self.crop = None;
        self.completed = None;
        self.filter = FilterSettings::default();
    }

    /// Render the committed crop.
    ///
    /// # Errors
    ///
    /// Returns a validation error when no crop with positive area is committed.
    pub fn render(&self) -> ClientResult<RgbaImage> {
        let crop = self
            .completed
            .filter(CropRect::is_committed)
            .ok_or_else(|| ClientError::validation("select a valid crop region first"))?;
        render_crop(&self.source, crop, self.scale()?, self.filter)
    }

    /// Render, encode, and replace the stored content, then show the detail view.
    ///
    /// # Errors
    ///
    /// Returns a validation error without a committed crop, an export error
    /// when encoding fails, or the API error.
    pub async fn save(&self, api: &ApiClient) -> ClientResult<Route> {
        let rendered = self.render()?;
        let jpeg = encode_jpeg(&rendered, JPEG_QUALITY)?;
        api.replace_content(self.record.id, &self.record.filename, jpeg)
            .await?;
        info!(
            id = self.record.id,
            width = rendered.width(),
            height = rendered.height(),
            "edited image saved"
        );
        Ok(api.navigator().navigate(Route::ImageDetail {
            id: self.record.id,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(image::RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        }))
    }

    fn record() -> ImageRecord {
        ImageRecord {
            id: 1,
            filename: "a.jpg".to_string(),
            thumbnail: "a.jpg".to_string(),
            description: None,
            location: None,
            capture_date: None,
            resolution: None,
            ai_tags: None,
        }
    }

    #[test]
    fn centred_crop_fits_and_shrinks() {
        let crop = center_aspect_crop(1000.0, 500.0, 1.0);
        assert!((crop.width - 450.0).abs() < 1e-9);
        assert!((crop.height - 450.0).abs() < 1e-9);
        assert!((crop.x - 275.0).abs() < 1e-9);
        assert!((crop.y - 25.0).abs() < 1e-9);

        let wide = center_aspect_crop(800.0, 600.0, 16.0 / 9.0);
        assert!((wide.width - 720.0).abs() < 1e-9);
        assert!((wide.height - 405.0).abs() < 1e-9);
        assert!(wide.y >= 0.0 && wide.y + wide.height <= 600.0);
    }

    #[test]
    fn output_dimensions_follow_rounded_scale() {
        let source = gradient(1200, 900);
        let scale = ScaleFactors::new((1200, 900), (400.0, 300.0)).expect("scale");
        let crop = CropRect {
            x: 10.0,
            y: 20.0,
            width: 100.3,
            height: 50.6,
        };
        let out = render_crop(&source, crop, scale, FilterSettings::default()).expect("render");
        assert_eq!(out.dimensions(), (301, 152));
    }

    #[test]
    fn identity_filter_copies_pixels() {
        let source = gradient(64, 64);
        let crop = CropRect {
            x: 8.0,
            y: 4.0,
            width: 16.0,
            height: 16.0,
        };
        let out = render_crop(
            &source,
            crop,
            ScaleFactors::identity(),
            FilterSettings::default(),
        )
        .expect("render");
        assert_eq!(out.get_pixel(0, 0).0, [8, 4, 128, 255]);
        assert_eq!(out.get_pixel(15, 15).0, [23, 19, 128, 255]);
    }

    #[test]
    fn brightness_and_contrast_follow_css_semantics() {
        let bright = FilterSettings::new(150, 100).expect("filter");
        assert_eq!(bright.apply_channel(100), 150);
        assert_eq!(bright.apply_channel(200), 255);
        let flat = FilterSettings::new(100, 50).expect("filter");
        assert_eq!(flat.apply_channel(0), 64);
        assert_eq!(flat.apply_channel(255), 191);
        assert_eq!(bright.css(), "brightness(150%) contrast(100%)");
    }

    #[test]
    fn filter_bounds_are_enforced() {
        assert!(FilterSettings::new(49, 100).is_err());
        assert!(FilterSettings::new(100, 151).is_err());
        assert!(FilterSettings::new(50, 150).is_ok());
    }

    #[test]
    fn edge_overhang_is_transparent() {
        let source = gradient(10, 10);
        let crop = CropRect {
            x: 1.0,
            y: 1.0,
            width: 10.0,
            height: 10.0,
        };
        let out = render_crop(
            &source,
            crop,
            ScaleFactors::identity(),
            FilterSettings::default(),
        )
        .expect("render");
        assert_eq!(out.dimensions(), (10, 10));
        assert_eq!(out.get_pixel(0, 0).0[3], 255);
        assert_eq!(out.get_pixel(9, 9).0[3], 0);
    }

    #[test]
    fn unbounded_crops_are_rejected_before_allocating() {
        let source = gradient(10, 10);
        let crops = [
            CropRect {
                x: 0.0,
                y: 0.0,
                width: f64::INFINITY,
                height: f64::INFINITY,
            },
            CropRect {
                x: 0.0,
                y: 0.0,
                width: f64::NAN,
                height: 5.0,
            },
            CropRect {
                x: 0.0,
                y: 0.0,
                width: 100_000.0,
                height: 100_000.0,
            },
            CropRect {
                x: 50.0,
                y: 50.0,
                width: 5.0,
                height: 5.0,
            },
        ];
        for crop in crops {
            let err = render_crop(
                &source,
                crop,
                ScaleFactors::identity(),
                FilterSettings::default(),
            )
            .expect_err("out of bounds");
            assert!(err.is_validation(), "{crop:?}");
        }
        assert!(ScaleFactors::new((10, 10), (f64::INFINITY, 10.0)).is_err());
    }

    #[test]
    fn commit_rejects_crops_outside_the_displayed_image() {
        let mut session =
            EditorSession::from_parts(record(), gradient(40, 30), Some((20.0, 15.0)))
                .expect("session");
        session.set_crop(CropRect {
            x: 0.0,
            y: 0.0,
            width: 10.0,
            height: 10.0,
        });
        session.commit_crop().expect("inside");
        let committed = session.completed_crop();

        session.set_crop(CropRect {
            x: 0.0,
            y: 0.0,
            width: f64::INFINITY,
            height: 10.0,
        });
        assert!(session.commit_crop().expect_err("infinite").is_validation());
        session.set_crop(CropRect {
            x: 0.0,
            y: 0.0,
            width: 100_000.0,
            height: 100_000.0,
        });
        assert!(session.commit_crop().expect_err("oversized").is_validation());
        assert_eq!(session.completed_crop(), committed);
        assert_eq!(session.render().expect("render").dimensions(), (20, 20));
    }

    #[test]
    fn session_requires_committed_crop() {
        let mut session =
            EditorSession::from_parts(record(), gradient(40, 30), None).expect("session");
        assert!(session.render().expect_err("no crop").is_validation());

        session.set_crop(CropRect {
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 10.0,
        });
        assert!(session.commit_crop().expect_err("no area").is_validation());
        assert!(session.render().is_err());

        session.set_aspect(AspectRatio::Square);
        let out = session.render().expect("render");
        assert_eq!(out.dimensions(), (27, 27));

        session.reset();
        assert_eq!(session.aspect(), AspectRatio::Free);
        assert!(session.completed_crop().is_none());
        assert!(session.filter().is_identity());
    }

    #[test]
    fn jpeg_export_decodes_back_to_same_size() {
        let rendered = RgbaImage::from_pixel(33, 17, Rgba([200, 100, 50, 255]));
        let bytes = encode_jpeg(&rendered, JPEG_QUALITY).expect("encode");
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        let decoded = image::load_from_memory(&bytes).expect("decode");
        assert_eq!(decoded.dimensions(), (33, 17));
    }

    #[test]
    fn aspect_presets_parse() {
        assert_eq!(AspectRatio::parse("16:9"), Some(AspectRatio::SixteenNine));
        assert_eq!(AspectRatio::parse("FREE"), Some(AspectRatio::Free));
        assert_eq!(AspectRatio::parse("3:2"), None);
        assert_eq!(AspectRatio::Square.to_string(), "1:1");
    }
}
