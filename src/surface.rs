//! Surfaces: the containers artifacts are attached to.
//!
//! A surface is an ordered list of mount points. Each artifact gets its own
//! mount, a renderer attaches nodes under it, and destroying the mount
//! detaches everything that was attached there.

use crate::error::SurfaceError;
use crate::renderer::Visual;

use indexmap::IndexMap;
use std::fmt;
use tracing::trace;

/// Identifies one mount point on a surface.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MountId(u64);

impl MountId {
    pub const fn new(value: u64) -> Self {
        MountId(value)
    }

    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A container that holds mount points in a stable sibling order.
pub trait Surface {
    /// The visual node type this surface can hold.
    type Node;

    /// Appends a new, empty mount point as the last child.
    fn create_mount(&mut self) -> MountId;

    /// Inserts a new, empty mount point directly after `sibling`.
    fn create_mount_after(&mut self, sibling: MountId) -> Result<MountId, SurfaceError>;

    /// Attaches `node` under `mount`.
    fn attach(&mut self, mount: MountId, node: Self::Node) -> Result<(), SurfaceError>;

    /// Detaches every node under `mount` and removes the mount itself.
    ///
    /// Returns `false` if the mount did not exist.
    fn destroy_mount(&mut self, mount: MountId) -> bool;

    /// Returns the mount points in sibling order.
    fn mounts(&self) -> Vec<MountId>;
}

impl<S: Surface + ?Sized> Surface for &mut S {
    type Node = S::Node;

    fn create_mount(&mut self) -> MountId {
        (**self).create_mount()
    }

    fn create_mount_after(&mut self, sibling: MountId) -> Result<MountId, SurfaceError> {
        (**self).create_mount_after(sibling)
    }

    fn attach(&mut self, mount: MountId, node: Self::Node) -> Result<(), SurfaceError> {
        (**self).attach(mount, node)
    }

    fn destroy_mount(&mut self, mount: MountId) -> bool {
        (**self).destroy_mount(mount)
    }

    fn mounts(&self) -> Vec<MountId> {
        (**self).mounts()
    }
}

/// Resolves a lookup key (a name, a selector) to a surface.
pub trait SurfaceLocator {
    type Surface: Surface;

    fn locate(&mut self, key: &str) -> Option<&mut Self::Surface>;
}

/// The single mount a renderer is allowed to write into.
///
/// Renderers never see the rest of the surface, so they cannot disturb
/// another artifact's nodes.
pub struct MountTarget<'a, N> {
    surface: &'a mut dyn Surface<Node = N>,
    mount: MountId,
}

impl<'a, N> MountTarget<'a, N> {
    pub(crate) fn new(surface: &'a mut dyn Surface<Node = N>, mount: MountId) -> Self {
        MountTarget { surface, mount }
    }

    pub fn mount(&self) -> MountId {
        self.mount
    }

    /// Attaches a node under this target's mount.
    pub fn attach(&mut self, node: N) -> Result<(), SurfaceError> {
        self.surface.attach(self.mount, node)
    }
}

struct Mount<N> {
    id: MountId,
    nodes: Vec<N>,
}

/// An in-memory surface.
///
/// # Example
///
/// ```rust
/// use qirust_registry::surface::{Canvas, Surface};
///
/// let mut canvas: Canvas<&str> = Canvas::new();
/// let first = canvas.create_mount();
/// let second = canvas.create_mount();
/// canvas.attach(first, "node").unwrap();
///
/// assert_eq!(canvas.mounts(), vec![first, second]);
/// assert_eq!(canvas.nodes(first), Some(&["node"][..]));
/// ```
pub struct Canvas<N = Visual> {
    next_mount: u64,
    mounts: Vec<Mount<N>>,
}

impl<N> Default for Canvas<N> {
    fn default() -> Self {
        Canvas {
            next_mount: 0,
            mounts: Vec::new(),
        }
    }
}

impl<N> Canvas<N> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the nodes attached under `mount`.
    pub fn nodes(&self, mount: MountId) -> Option<&[N]> {
        self.position(mount).map(|i| self.mounts[i].nodes.as_slice())
    }

    /// Total number of nodes across all mounts.
    pub fn node_count(&self) -> usize {
        self.mounts.iter().map(|m| m.nodes.len()).sum()
    }

    pub fn mount_count(&self) -> usize {
        self.mounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }

    fn position(&self, mount: MountId) -> Option<usize> {
        self.mounts.iter().position(|m| m.id == mount)
    }

    fn mint(&mut self) -> MountId {
        self.next_mount += 1;
        MountId(self.next_mount)
    }
}

impl<N> Surface for Canvas<N> {
    type Node = N;

    fn create_mount(&mut self) -> MountId {
        let id = self.mint();
        self.mounts.push(Mount {
            id,
            nodes: Vec::new(),
        });
        trace!(mount = %id, "created mount");
        id
    }

    fn create_mount_after(&mut self, sibling: MountId) -> Result<MountId, SurfaceError> {
        let index = self
            .position(sibling)
            .ok_or(SurfaceError::UnknownMount { mount: sibling.0 })?;
        let id = self.mint();
        self.mounts.insert(
            index + 1,
            Mount {
                id,
                nodes: Vec::new(),
            },
        );
        trace!(mount = %id, after = %sibling, "created mount");
        Ok(id)
    }

    fn attach(&mut self, mount: MountId, node: N) -> Result<(), SurfaceError> {
        let index = self
            .position(mount)
            .ok_or(SurfaceError::UnknownMount { mount: mount.0 })?;
        self.mounts[index].nodes.push(node);
        Ok(())
    }

    fn destroy_mount(&mut self, mount: MountId) -> bool {
        match self.position(mount) {
            Some(index) => {
                let removed = self.mounts.remove(index);
                trace!(mount = %mount, nodes = removed.nodes.len(), "destroyed mount");
                true
            }
            None => false,
        }
    }

    fn mounts(&self) -> Vec<MountId> {
        self.mounts.iter().map(|m| m.id).collect()
    }
}

/// Named canvases, resolvable by key.
pub struct CanvasDirectory<N = Visual> {
    canvases: IndexMap<String, Canvas<N>>,
}

impl<N> Default for CanvasDirectory<N> {
    fn default() -> Self {
        CanvasDirectory {
            canvases: IndexMap::new(),
        }
    }
}

impl<N> CanvasDirectory<N> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a canvas under `key`, returning any canvas it replaced.
    pub fn insert(&mut self, key: impl Into<String>, canvas: Canvas<N>) -> Option<Canvas<N>> {
        self.canvases.insert(key.into(), canvas)
    }

    pub fn get(&self, key: &str) -> Option<&Canvas<N>> {
        self.canvases.get(key)
    }
}

impl<N> SurfaceLocator for CanvasDirectory<N> {
    type Surface = Canvas<N>;

    fn locate(&mut self, key: &str) -> Option<&mut Canvas<N>> {
        self.canvases.get_mut(key)
    }
}
