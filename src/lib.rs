//! # qirust-registry
//!
//! A registry for QR code artifacts rendered onto a surface.
//!
//! Every artifact gets a stable handle (`artifact-1`, `artifact-2`, ...) so it can be updated,
//! inspected and removed later without digging through the surface. The registry keeps its
//! records and the surface in agreement: each record owns exactly one mount on the surface, a
//! failed render never leaves a half-built artifact behind, and a failed update leaves the old
//! artifact exactly as it was.
//!
//! ## Features
//!
//! - Stable, never-reused handles per registry instance.
//! - Typed configuration (size, colors, error correction level) merged over defaults, with
//!   a pass-through bag for renderer-specific options.
//! - Pluggable renderers: raster images, SVG documents, block-character text, or any closure.
//! - Pluggable surfaces, including an in-memory [`Canvas`] and a keyed [`CanvasDirectory`].
//!
//! ## Installation
//!
//! Add to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! qirust-registry = "0.1" # Replace with the latest version
//! ```
//!
//! ## Example
//!
//! Manage a few codes on an in-memory canvas:
//!
//! ```rust
//! use qirust_registry::{ArtifactRegistry, Canvas, Color, ConfigOverrides, RasterRenderer};
//!
//! let canvas: Canvas = Canvas::new();
//! let mut registry = ArtifactRegistry::new(canvas, RasterRenderer);
//!
//! let site = registry
//!     .create("https://example.com", &ConfigOverrides::new().width(128).height(128))
//!     .unwrap();
//! let wifi = registry
//!     .create(
//!         "WIFI:S:home;T:WPA;P:secret;;",
//!         &ConfigOverrides::new().foreground_color(Color::rgb(0x33, 0x66, 0x99)),
//!     )
//!     .unwrap();
//!
//! assert_eq!(registry.count(), 2);
//! assert_eq!(registry.get(&site).unwrap().config.width, 128);
//!
//! registry.update(&wifi, "WIFI:S:office;T:WPA;P:secret;;").unwrap();
//! assert_eq!(registry.clear(), 2);
//! ```
//!
//! Resolve the surface by name instead:
//!
//! ```rust
//! use qirust_registry::{ArtifactRegistry, Canvas, CanvasDirectory, ConfigOverrides, SvgRenderer};
//!
//! let mut surfaces: CanvasDirectory = CanvasDirectory::new();
//! surfaces.insert("#qr-container", Canvas::new());
//!
//! let mut registry =
//!     ArtifactRegistry::locate(&mut surfaces, "#qr-container", SvgRenderer).unwrap();
//! registry.create("hello", &ConfigOverrides::new()).unwrap();
//!
//! assert!(ArtifactRegistry::locate(&mut surfaces, "#missing", SvgRenderer).is_err());
//! ```
//!
//! ## Modules
//!
//! - [`registry`]: The handle-to-artifact registry.
//! - [`config`]: Artifact configuration and merging.
//! - [`renderer`]: The renderer capability and built-in QR renderers.
//! - [`surface`]: The surface capability and the in-memory canvas.
//! - [`error`]: Error types.

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod registry;
pub mod renderer;
pub mod surface;

pub use config::{merge, ArtifactConfig, Color, ConfigOverrides, ErrorCorrection};
pub use error::{
    ConfigurationError, RegistryError, RegistryResult, RenderError, SurfaceError, ValidationError,
};
pub use registry::{ArtifactRegistry, ArtifactSnapshot, Handle};
pub use renderer::{RasterRenderer, Renderer, SvgRenderer, TextRenderer, Visual};
pub use surface::{Canvas, CanvasDirectory, MountId, MountTarget, Surface, SurfaceLocator};
