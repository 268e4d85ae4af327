//! Renderers: turn content and a configuration into visual nodes.
//!
//! The registry never encodes anything itself. It hands a [`MountTarget`]
//! to a [`Renderer`], which attaches whatever nodes it produces. QR
//! encoding in the built-in renderers is delegated to the `qrcode` crate;
//! this module only lays the resulting modules out as pixels, SVG or text.

use crate::config::{ArtifactConfig, ErrorCorrection};
use crate::error::RenderError;
use crate::surface::MountTarget;

use image::{Rgba, RgbaImage};
use qrcode::{EcLevel, QrCode};
use serde_json::Value;
use std::fmt::Write;

/// Width of the light border around the symbol, in modules.
pub const DEFAULT_QUIET_ZONE: u32 = 4;

/// Pass-through option overriding [`DEFAULT_QUIET_ZONE`].
pub const QUIET_ZONE_KEY: &str = "quietZone";

/// Largest accepted quiet zone, in modules.
pub const MAX_QUIET_ZONE: u32 = 64;

/// Largest accepted `width` or `height`, in pixels.
pub const MAX_DIMENSION: u32 = 4096;

/// A visual node produced by the built-in renderers.
#[derive(Clone, Debug, PartialEq)]
pub enum Visual {
    Raster(RgbaImage),
    Svg(String),
    Text(String),
}

/// Produces the subtree for one artifact.
///
/// Implementations must not keep references to the target after
/// returning. On error, anything already attached is discarded by the
/// caller.
pub trait Renderer<N> {
    fn render(
        &self,
        target: &mut MountTarget<'_, N>,
        content: &str,
        config: &ArtifactConfig,
    ) -> Result<(), RenderError>;
}

/// A renderer backed by a closure. See [`from_fn`].
pub struct FnRenderer<F>(F);

/// Builds a renderer from a closure.
///
/// # Example
///
/// ```rust
/// use qirust_registry::renderer::{self, Visual};
///
/// let echo = renderer::from_fn::<Visual, _>(|target, content, _config| {
///     target.attach(Visual::Text(content.to_string()))?;
///     Ok(())
/// });
/// # let _ = echo;
/// ```
pub fn from_fn<N, F>(f: F) -> FnRenderer<F>
where
    F: Fn(&mut MountTarget<'_, N>, &str, &ArtifactConfig) -> Result<(), RenderError>,
{
    FnRenderer(f)
}

impl<N, F> Renderer<N> for FnRenderer<F>
where
    F: Fn(&mut MountTarget<'_, N>, &str, &ArtifactConfig) -> Result<(), RenderError>,
{
    fn render(
        &self,
        target: &mut MountTarget<'_, N>,
        content: &str,
        config: &ArtifactConfig,
    ) -> Result<(), RenderError> {
        (self.0)(target, content, config)
    }
}

/// Encoded QR modules, true = dark.
struct Modules {
    size: i64,
    dark: Vec<bool>,
}

impl Modules {
    fn encode(content: &str, level: ErrorCorrection) -> Result<Self, RenderError> {
        let code = QrCode::with_error_correction_level(content.as_bytes(), ec_level(level))
            .map_err(|e| RenderError::Encode {
                reason: e.to_string(),
            })?;
        let size = code.width() as i64;
        let dark = code
            .to_colors()
            .into_iter()
            .map(|c| c == qrcode::Color::Dark)
            .collect();
        Ok(Modules { size, dark })
    }

    // Out-of-range coordinates are light, so the quiet zone needs no special case.
    fn get(&self, x: i64, y: i64) -> bool {
        (0..self.size).contains(&x)
            && (0..self.size).contains(&y)
            && self.dark[(y * self.size + x) as usize]
    }
}

fn ec_level(level: ErrorCorrection) -> EcLevel {
    match level {
        ErrorCorrection::Low => EcLevel::L,
        ErrorCorrection::Medium => EcLevel::M,
        ErrorCorrection::Quartile => EcLevel::Q,
        ErrorCorrection::High => EcLevel::H,
    }
}

fn quiet_zone(config: &ArtifactConfig) -> Result<u32, RenderError> {
    let invalid = |value: &Value| RenderError::InvalidConfig {
        field: QUIET_ZONE_KEY.to_string(),
        reason: format!(
            "expected an integer between 0 and {}, got {}",
            MAX_QUIET_ZONE, value
        ),
    };
    match config.extra(QUIET_ZONE_KEY) {
        None => Ok(DEFAULT_QUIET_ZONE),
        Some(value) => value
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .filter(|v| *v <= MAX_QUIET_ZONE)
            .ok_or_else(|| invalid(value)),
    }
}

fn check_dimensions(config: &ArtifactConfig) -> Result<(), RenderError> {
    for (field, value) in [("width", config.width), ("height", config.height)] {
        if value == 0 || value > MAX_DIMENSION {
            return Err(RenderError::InvalidConfig {
                field: field.to_string(),
                reason: format!("must be between 1 and {}, got {}", MAX_DIMENSION, value),
            });
        }
    }
    // RGBA buffer length must fit in usize on every target.
    let fits = (config.width as usize)
        .checked_mul(config.height as usize)
        .and_then(|pixels| pixels.checked_mul(4))
        .is_some();
    if !fits {
        return Err(RenderError::InvalidConfig {
            field: "width".to_string(),
            reason: format!(
                "{}x{} pixels do not fit in memory",
                config.width, config.height
            ),
        });
    }
    Ok(())
}

/// Renders a QR code as an RGBA image of exactly `width` x `height` pixels.
#[derive(Copy, Clone, Debug, Default)]
pub struct RasterRenderer;

impl RasterRenderer {
    /// Builds the image without attaching it anywhere.
    pub fn to_image(
        &self,
        content: &str,
        config: &ArtifactConfig,
    ) -> Result<RgbaImage, RenderError> {
        check_dimensions(config)?;
        let border = quiet_zone(config)? as i64;
        let modules = Modules::encode(content, config.error_correction_level)?;

        let dimension = (modules.size + 2 * border) as u64;
        let (width, height) = (config.width as u64, config.height as u64);
        let dark = Rgba(config.foreground_color.to_rgba());
        let light = Rgba(config.background_color.to_rgba());

        Ok(RgbaImage::from_fn(config.width, config.height, |x, y| {
            let qr_x = (x as u64 * dimension / width) as i64 - border;
            let qr_y = (y as u64 * dimension / height) as i64 - border;
            if modules.get(qr_x, qr_y) {
                dark
            } else {
                light
            }
        }))
    }
}

impl Renderer<Visual> for RasterRenderer {
    fn render(
        &self,
        target: &mut MountTarget<'_, Visual>,
        content: &str,
        config: &ArtifactConfig,
    ) -> Result<(), RenderError> {
        let img = self.to_image(content, config)?;
        target.attach(Visual::Raster(img))?;
        Ok(())
    }
}

/// Renders a QR code as a standalone SVG document.
#[derive(Copy, Clone, Debug, Default)]
pub struct SvgRenderer;

impl SvgRenderer {
    /// Builds the SVG markup without attaching it anywhere.
    ///
    /// The output always uses Unix newlines.
    pub fn to_svg_string(
        &self,
        content: &str,
        config: &ArtifactConfig,
    ) -> Result<String, RenderError> {
        check_dimensions(config)?;
        let border = quiet_zone(config)? as i64;
        let modules = Modules::encode(content, config.error_correction_level)?;
        let dimension = modules.size + 2 * border;

        let mut path = String::new();
        for y in 0..modules.size {
            for x in 0..modules.size {
                if modules.get(x, y) {
                    if !path.is_empty() {
                        path.push(' ');
                    }
                    let _ = write!(path, "M{},{}h1v1h-1z", x + border, y + border);
                }
            }
        }

        let mut result = String::new();
        result += "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";
        result += &format!(
            concat!(
                "<svg xmlns=\"http://www.w3.org/2000/svg\" version=\"1.1\" ",
                "width=\"{}\" height=\"{}\" viewBox=\"0 0 {2} {2}\" ",
                "preserveAspectRatio=\"none\" shape-rendering=\"crispEdges\" stroke=\"none\">\n"
            ),
            config.width, config.height, dimension
        );
        result += &format!(
            "\t<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>\n",
            config.background_color
        );
        result += &format!("\t<path d=\"{}\" fill=\"{}\"/>\n", path, config.foreground_color);
        result += "</svg>\n";
        Ok(result)
    }
}

impl Renderer<Visual> for SvgRenderer {
    fn render(
        &self,
        target: &mut MountTarget<'_, Visual>,
        content: &str,
        config: &ArtifactConfig,
    ) -> Result<(), RenderError> {
        let svg = self.to_svg_string(content, config)?;
        target.attach(Visual::Svg(svg))?;
        Ok(())
    }
}

/// Renders a QR code as block characters, two per module.
///
/// Size and colors are ignored; only the content, error correction level
/// and quiet zone apply.
#[derive(Copy, Clone, Debug, Default)]
pub struct TextRenderer;

impl TextRenderer {
    pub fn to_text(&self, content: &str, config: &ArtifactConfig) -> Result<String, RenderError> {
        let border = quiet_zone(config)? as i64;
        let modules = Modules::encode(content, config.error_correction_level)?;

        let mut result = String::new();
        for y in -border..modules.size + border {
            for x in -border..modules.size + border {
                let c = if modules.get(x, y) { '█' } else { ' ' };
                result.push(c);
                result.push(c);
            }
            result.push('\n');
        }
        Ok(result)
    }
}

impl Renderer<Visual> for TextRenderer {
    fn render(
        &self,
        target: &mut MountTarget<'_, Visual>,
        content: &str,
        config: &ArtifactConfig,
    ) -> Result<(), RenderError> {
        let text = self.to_text(content, config)?;
        target.attach(Visual::Text(text))?;
        Ok(())
    }
}
