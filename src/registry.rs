//! The artifact registry.
//!
//! [`ArtifactRegistry`] owns the mapping from [`Handle`] to artifact record
//! and keeps it in lockstep with the surface: every record has exactly one
//! mount on the surface, and every mount the registry created belongs to a
//! record. Failed renders never leave a record or a mount behind.

use crate::config::{merge, ArtifactConfig, ConfigOverrides};
use crate::error::{
    ConfigurationError, RegistryResult, RenderError, SurfaceError, ValidationError,
};
use crate::renderer::Renderer;
use crate::surface::{MountId, MountTarget, Surface, SurfaceLocator};

use indexmap::IndexMap;
use serde::Serialize;
use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;
use tracing::{debug, info, warn};

/// Prefix of every minted handle.
pub const HANDLE_PREFIX: &str = "artifact-";

/// Opaque, unique identifier of a managed artifact.
///
/// Handles are minted by the registry as `artifact-1`, `artifact-2`, ...
/// and are never reused by the same registry, even after removal.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Handle(String);

impl Handle {
    fn mint(sequence: u64) -> Self {
        Handle(format!("{}{}", HANDLE_PREFIX, sequence))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Deref for Handle {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Handle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Handle {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Handle {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Handle {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// A read-only copy of one artifact's state.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ArtifactSnapshot {
    pub handle: Handle,
    pub content: String,
    pub config: ArtifactConfig,
}

struct ArtifactRecord {
    content: String,
    config: ArtifactConfig,
    mount: MountId,
}

/// Tracks rendered artifacts on one surface.
///
/// # Example
///
/// ```rust
/// use qirust_registry::{ArtifactRegistry, Canvas, ConfigOverrides, SvgRenderer};
///
/// let canvas: Canvas = Canvas::new();
/// let mut registry = ArtifactRegistry::new(canvas, SvgRenderer);
///
/// let handle = registry.create("hello", &ConfigOverrides::new()).unwrap();
/// assert_eq!(handle.as_str(), "artifact-1");
///
/// assert!(registry.update(&handle, "world").unwrap());
/// assert_eq!(registry.get(&handle).unwrap().content, "world");
///
/// assert!(registry.remove(&handle));
/// assert!(!registry.remove(&handle));
/// assert_eq!(registry.count(), 0);
/// ```
pub struct ArtifactRegistry<S, R> {
    surface: S,
    renderer: R,
    defaults: ArtifactConfig,
    records: IndexMap<Handle, ArtifactRecord>,
    counter: u64,
}

impl<'a, S, R> ArtifactRegistry<&'a mut S, R>
where
    S: Surface,
    R: Renderer<S::Node>,
{
    /// Resolves `key` once through `locator` and builds a registry on the
    /// surface it names.
    ///
    /// # Arguments
    ///
    /// * `locator` - Where surfaces are registered by key.
    /// * `key` - The lookup key, e.g. a name or selector.
    /// * `renderer` - The renderer used for every artifact.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] if the key is empty or resolves to
    /// nothing. No registry is built in that case.
    pub fn locate<L>(
        locator: &'a mut L,
        key: &str,
        renderer: R,
    ) -> Result<Self, ConfigurationError>
    where
        L: SurfaceLocator<Surface = S>,
    {
        if key.trim().is_empty() {
            return Err(ConfigurationError::EmptyKey);
        }
        let surface = locator
            .locate(key)
            .ok_or_else(|| ConfigurationError::SurfaceNotFound {
                key: key.to_string(),
            })?;
        Ok(ArtifactRegistry::new(surface, renderer))
    }
}

impl<S, R> ArtifactRegistry<S, R>
where
    S: Surface,
    R: Renderer<S::Node>,
{
    /// Builds an empty registry over `surface`.
    ///
    /// Pass `&mut surface` to keep ownership of an existing surface.
    pub fn new(surface: S, renderer: R) -> Self {
        ArtifactRegistry {
            surface,
            renderer,
            defaults: ArtifactConfig::default(),
            records: IndexMap::new(),
            counter: 0,
        }
    }

    /// Replaces the defaults that caller overrides are merged over.
    pub fn with_defaults(mut self, defaults: ArtifactConfig) -> Self {
        self.defaults = defaults;
        self
    }

    /// The configuration caller overrides are merged over.
    pub fn defaults(&self) -> &ArtifactConfig {
        &self.defaults
    }

    /// Renders `content` as a new artifact and returns its handle.
    ///
    /// `overrides` is merged over the registry defaults; the merged
    /// configuration is what the renderer sees and what [`get`](Self::get)
    /// reports afterwards.
    ///
    /// # Arguments
    ///
    /// * `content` - The text to encode. Must not be empty.
    /// * `overrides` - Options that differ from the registry defaults.
    ///
    /// # Returns
    ///
    /// The handle of the new artifact.
    ///
    /// # Errors
    ///
    /// * [`ValidationError`] if `content` is empty.
    /// * [`RenderError`] if the renderer fails. Anything it attached is
    ///   detached first and no record is stored.
    pub fn create(
        &mut self,
        content: &str,
        overrides: &ConfigOverrides,
    ) -> RegistryResult<Handle> {
        require_content("content", content)?;
        let config = merge(&self.defaults, overrides);

        self.counter += 1;
        let handle = Handle::mint(self.counter);

        let mut pending = PendingMount::append(&mut self.surface);
        if let Err(err) = pending.render(&self.renderer, content, &config) {
            warn!(handle = %handle, error = %err, "render failed, artifact not created");
            return Err(err.into());
        }
        let mount = pending.commit();

        self.records.insert(
            handle.clone(),
            ArtifactRecord {
                content: content.to_string(),
                config,
                mount,
            },
        );
        debug!(handle = %handle, "created artifact");
        Ok(handle)
    }

    /// Re-renders an artifact with new content and its stored configuration.
    ///
    /// The new subtree is rendered into a fresh mount next to the old one,
    /// and the old mount is destroyed only once rendering succeeded, so the
    /// artifact keeps its position and never disappears in between.
    ///
    /// # Arguments
    ///
    /// * `handle` - The artifact to update.
    /// * `new_content` - The text to encode instead. Must not be empty.
    ///
    /// # Returns
    ///
    /// `Ok(true)` once the artifact shows the new content, `Ok(false)` if
    /// `handle` is unknown.
    ///
    /// # Errors
    ///
    /// * [`ValidationError`] if `new_content` is empty.
    /// * [`RenderError`] if the renderer fails. The previous record and its
    ///   subtree are left intact.
    pub fn update(&mut self, handle: &str, new_content: &str) -> RegistryResult<bool> {
        require_content("new_content", new_content)?;

        let Some(record) = self.records.get_mut(handle) else {
            return Ok(false);
        };

        let mut pending =
            PendingMount::after(&mut self.surface, record.mount).map_err(RenderError::from)?;
        if let Err(err) = pending.render(&self.renderer, new_content, &record.config) {
            warn!(handle = %handle, error = %err, "render failed, artifact left unchanged");
            return Err(err.into());
        }
        let mount = pending.commit();

        self.surface.destroy_mount(record.mount);
        record.mount = mount;
        record.content = new_content.to_string();
        debug!(handle = %handle, "updated artifact");
        Ok(true)
    }

    /// Detaches an artifact and forgets it.
    ///
    /// Returns whether `handle` was present.
    pub fn remove(&mut self, handle: &str) -> bool {
        match self.records.shift_remove(handle) {
            Some(record) => {
                self.surface.destroy_mount(record.mount);
                debug!(handle = %handle, "removed artifact");
                true
            }
            None => false,
        }
    }

    /// Detaches every artifact and returns how many there were.
    pub fn clear(&mut self) -> usize {
        let records = std::mem::take(&mut self.records);
        let removed = records.len();
        for record in records.into_values() {
            self.surface.destroy_mount(record.mount);
        }
        info!(removed, "cleared registry");
        removed
    }

    /// Returns a snapshot of one artifact, or `None` if `handle` is unknown.
    pub fn get(&self, handle: &str) -> Option<ArtifactSnapshot> {
        self.records
            .get_key_value(handle)
            .map(|(handle, record)| snapshot(handle, record))
    }

    /// Returns snapshots of every artifact, in creation order.
    pub fn list(&self) -> Vec<ArtifactSnapshot> {
        self.records
            .iter()
            .map(|(handle, record)| snapshot(handle, record))
            .collect()
    }

    /// Number of managed artifacts. Always equals `list().len()`.
    pub fn count(&self) -> usize {
        self.records.len()
    }

    /// Whether no artifacts are managed.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether `handle` names a managed artifact.
    pub fn contains(&self, handle: &str) -> bool {
        self.records.contains_key(handle)
    }

    /// Returns every handle, in creation order.
    pub fn handles(&self) -> Vec<Handle> {
        self.records.keys().cloned().collect()
    }

    /// Read access to the underlying surface.
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Gives back the surface and renderer. Attached artifacts stay on the
    /// surface.
    pub fn into_parts(self) -> (S, R) {
        (self.surface, self.renderer)
    }
}

fn require_content(field: &'static str, content: &str) -> Result<(), ValidationError> {
    if content.is_empty() {
        return Err(ValidationError::EmptyContent { field });
    }
    Ok(())
}

/// A mount that has not been committed to a record yet.
///
/// Dropping it destroys the mount, so a failing or panicking renderer
/// never leaves nodes on the surface.
struct PendingMount<'s, S: Surface> {
    surface: &'s mut S,
    mount: MountId,
    armed: bool,
}

impl<'s, S: Surface> PendingMount<'s, S> {
    fn append(surface: &'s mut S) -> Self {
        let mount = surface.create_mount();
        PendingMount {
            surface,
            mount,
            armed: true,
        }
    }

    fn after(surface: &'s mut S, sibling: MountId) -> Result<Self, SurfaceError> {
        let mount = surface.create_mount_after(sibling)?;
        Ok(PendingMount {
            surface,
            mount,
            armed: true,
        })
    }

    fn render<R>(
        &mut self,
        renderer: &R,
        content: &str,
        config: &ArtifactConfig,
    ) -> Result<(), RenderError>
    where
        R: Renderer<S::Node>,
    {
        let mut target = MountTarget::new(&mut *self.surface, self.mount);
        renderer.render(&mut target, content, config)
    }

    /// Keeps the mount and hands it over to the caller.
    fn commit(mut self) -> MountId {
        self.armed = false;
        self.mount
    }
}

impl<S: Surface> Drop for PendingMount<'_, S> {
    fn drop(&mut self) {
        if self.armed {
            self.surface.destroy_mount(self.mount);
        }
    }
}

fn snapshot(handle: &Handle, record: &ArtifactRecord) -> ArtifactSnapshot {
    ArtifactSnapshot {
        handle: handle.clone(),
        content: record.content.clone(),
        config: record.config.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Color, ErrorCorrection};
    use crate::error::RegistryError;
    use crate::renderer::{from_fn, TextRenderer, Visual};
    use crate::surface::{Canvas, CanvasDirectory};
    use std::panic::{self, AssertUnwindSafe};

    fn registry() -> ArtifactRegistry<Canvas, TextRenderer> {
        ArtifactRegistry::new(Canvas::new(), TextRenderer)
    }

    #[test]
    fn test_handles_count_up_from_one() {
        let mut registry = registry();
        let a = registry.create("a", &ConfigOverrides::new()).unwrap();
        let b = registry.create("b", &ConfigOverrides::new()).unwrap();
        assert_eq!(a, "artifact-1");
        assert_eq!(b, "artifact-2");
    }

    #[test]
    fn test_handles_not_reused_after_removal() {
        let mut registry = registry();
        let a = registry.create("a", &ConfigOverrides::new()).unwrap();
        registry.remove(&a);
        let b = registry.create("b", &ConfigOverrides::new()).unwrap();
        assert_eq!(b, "artifact-2");
    }

    #[test]
    fn test_independent_registries_have_independent_counters() {
        let mut first = registry();
        let mut second = registry();
        first.create("a", &ConfigOverrides::new()).unwrap();
        let h = second.create("b", &ConfigOverrides::new()).unwrap();
        assert_eq!(h, "artifact-1");
    }

    #[test]
    fn test_create_rejects_empty_content() {
        let mut registry = registry();
        let err = registry.create("", &ConfigOverrides::new()).unwrap_err();
        assert_eq!(
            err,
            RegistryError::Validation(ValidationError::EmptyContent { field: "content" })
        );
        assert_eq!(registry.count(), 0);
        assert!(registry.surface().is_empty());
    }

    #[test]
    fn test_create_merges_overrides_over_defaults() {
        let defaults = ArtifactConfig {
            foreground_color: Color::rgb(0x22, 0x22, 0x22),
            ..ArtifactConfig::default()
        };
        let mut registry = registry().with_defaults(defaults);
        let h = registry
            .create(
                "x",
                &ConfigOverrides::new()
                    .width(64)
                    .error_correction_level(ErrorCorrection::High),
            )
            .unwrap();

        let config = registry.get(&h).unwrap().config;
        assert_eq!(config.width, 64);
        assert_eq!(config.height, 256);
        assert_eq!(config.foreground_color, Color::rgb(0x22, 0x22, 0x22));
        assert_eq!(config.error_correction_level, ErrorCorrection::High);
    }

    #[test]
    fn test_update_rejects_empty_content_even_for_unknown_handle() {
        let mut registry = registry();
        assert!(matches!(
            registry.update("artifact-9", ""),
            Err(RegistryError::Validation(_))
        ));
    }

    #[test]
    fn test_update_unknown_handle_returns_false() {
        let mut registry = registry();
        assert_eq!(registry.update("artifact-9", "x").unwrap(), false);
    }

    #[test]
    fn test_update_keeps_position_on_surface() {
        let mut registry = registry();
        let a = registry.create("a", &ConfigOverrides::new()).unwrap();
        let b = registry.create("b", &ConfigOverrides::new()).unwrap();
        let c = registry.create("c", &ConfigOverrides::new()).unwrap();

        let before = registry.surface().mounts();
        registry.update(&b, "bb").unwrap();
        let after = registry.surface().mounts();

        assert_eq!(after.len(), 3);
        assert_eq!(after[0], before[0]);
        assert_ne!(after[1], before[1]);
        assert_eq!(after[2], before[2]);
        assert_eq!(registry.handles(), vec![a, b, c]);
    }

    #[test]
    fn test_update_replaces_rendered_node() {
        let echo = from_fn::<Visual, _>(|target, content, _config| {
            target.attach(Visual::Text(content.to_string()))?;
            Ok(())
        });
        let mut registry = ArtifactRegistry::new(Canvas::<Visual>::new(), echo);
        let h = registry.create("old", &ConfigOverrides::new()).unwrap();
        registry.update(&h, "new").unwrap();

        let canvas = registry.surface();
        assert_eq!(canvas.node_count(), 1);
        let mount = canvas.mounts()[0];
        assert_eq!(canvas.nodes(mount), Some(&[Visual::Text("new".into())][..]));
    }

    #[test]
    fn test_failed_create_detaches_partial_nodes() {
        let partial = from_fn::<Visual, _>(|target, _content, _config| {
            target.attach(Visual::Text("half".into()))?;
            Err(RenderError::backend("partial", "gave up"))
        });
        let mut registry = ArtifactRegistry::new(Canvas::<Visual>::new(), partial);

        let err = registry.create("x", &ConfigOverrides::new()).unwrap_err();
        assert!(matches!(err, RegistryError::Render(_)));
        assert_eq!(registry.count(), 0);
        assert!(registry.surface().is_empty());
        assert_eq!(registry.surface().node_count(), 0);
    }

    #[test]
    fn test_panicking_renderer_leaves_no_mount() {
        let renderer = from_fn::<Visual, _>(|target, content, _config| {
            target.attach(Visual::Text(content.to_string()))?;
            if content == "boom" {
                panic!("renderer blew up");
            }
            Ok(())
        });
        let mut registry = ArtifactRegistry::new(Canvas::<Visual>::new(), renderer);

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            registry.create("boom", &ConfigOverrides::new())
        }));
        assert!(result.is_err());
        assert_eq!(registry.count(), 0);
        assert!(registry.surface().is_empty());

        let kept = registry.create("kept", &ConfigOverrides::new()).unwrap();
        let result = panic::catch_unwind(AssertUnwindSafe(|| registry.update(&kept, "boom")));
        assert!(result.is_err());
        assert_eq!(registry.get(&kept).unwrap().content, "kept");

        let canvas = registry.surface();
        assert_eq!(canvas.mount_count(), 1);
        assert_eq!(
            canvas.nodes(canvas.mounts()[0]),
            Some(&[Visual::Text("kept".into())][..])
        );
    }

    #[test]
    fn test_contains_and_is_empty_track_records() {
        let mut registry = registry();
        assert!(registry.is_empty());
        assert!(!registry.contains("artifact-1"));

        let h = registry.create("a", &ConfigOverrides::new()).unwrap();
        assert!(!registry.is_empty());
        assert!(registry.contains(&h));

        registry.remove(&h);
        assert!(registry.is_empty());
        assert!(!registry.contains(&h));
    }

    #[test]
    fn test_defaults_reflect_with_defaults() {
        assert_eq!(registry().defaults(), &ArtifactConfig::default());

        let custom = ArtifactConfig {
            width: 512,
            ..ArtifactConfig::default()
        };
        let registry = registry().with_defaults(custom.clone());
        assert_eq!(registry.defaults(), &custom);
    }

    #[test]
    fn test_clear_returns_previous_count() {
        let mut registry = registry();
        for content in ["a", "b", "c"] {
            registry.create(content, &ConfigOverrides::new()).unwrap();
        }
        assert_eq!(registry.clear(), 3);
        assert_eq!(registry.count(), 0);
        assert!(registry.list().is_empty());
        assert!(registry.surface().is_empty());
        assert_eq!(registry.clear(), 0);
    }

    #[test]
    fn test_locate_resolves_named_surface() {
        let mut directory: CanvasDirectory = CanvasDirectory::new();
        directory.insert("#codes", Canvas::new());
        {
            let mut registry =
                ArtifactRegistry::locate(&mut directory, "#codes", TextRenderer).unwrap();
            registry.create("hello", &ConfigOverrides::new()).unwrap();
        }
        assert_eq!(directory.get("#codes").unwrap().mount_count(), 1);
    }

    #[test]
    fn test_locate_fails_for_unknown_or_empty_key() {
        let mut directory: CanvasDirectory = CanvasDirectory::new();
        assert_eq!(
            ArtifactRegistry::locate(&mut directory, "#nope", TextRenderer).err(),
            Some(ConfigurationError::SurfaceNotFound {
                key: "#nope".to_string()
            })
        );
        assert_eq!(
            ArtifactRegistry::locate(&mut directory, "  ", TextRenderer).err(),
            Some(ConfigurationError::EmptyKey)
        );
    }

    #[test]
    fn test_registry_over_borrowed_surface() {
        let mut canvas: Canvas = Canvas::new();
        {
            let mut registry = ArtifactRegistry::new(&mut canvas, TextRenderer);
            registry.create("hello", &ConfigOverrides::new()).unwrap();
        }
        assert_eq!(canvas.mount_count(), 1);
    }
}
