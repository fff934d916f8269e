//! Drawing-surface abstraction.
//!
//! `SurfaceBackend` is what the host provides (an SVG/DOM root, a canvas, or
//! the headless `MemorySurface`). `DrawingSurfaceHandle` wraps one backend for
//! one facade: it memoizes named regions, owns pointer listener callbacks and
//! tears everything down in one call.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::core::{Point, Viewport};
use crate::error::{ChartError, ChartResult};
use crate::interaction::{PointerInput, PointerKind};
use crate::render::RegionScene;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegionId(u64);

impl RegionId {
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ListenerId(u64);

/// Contract implemented by the host drawing surface.
///
/// Every call is synchronous. `render_region` replaces the region content.
pub trait SurfaceBackend {
    fn create_region(&mut self, parent: Option<RegionId>, name: &str) -> ChartResult<RegionId>;
    fn remove_region(&mut self, region: RegionId) -> ChartResult<()>;
    fn render_region(&mut self, region: RegionId, scene: &RegionScene) -> ChartResult<()>;
    fn set_region_position(&mut self, region: RegionId, x: f64, y: f64) -> ChartResult<()>;
    fn set_region_visible(&mut self, region: RegionId, visible: bool) -> ChartResult<()>;
    fn attach_listener(&mut self, region: RegionId, kind: PointerKind) -> ChartResult<()>;
    fn detach_listener(&mut self, region: RegionId, kind: PointerKind) -> ChartResult<()>;
    /// Size of the host container, when the host can measure it.
    fn container_size(&self) -> Option<Viewport>;
}

type SharedBackend = Rc<RefCell<dyn SurfaceBackend>>;
type PointerCallback = Rc<dyn Fn(PointerInput) -> ChartResult<()>>;

#[derive(Debug, Default)]
struct RegionState {
    scene: RegionScene,
    position: Option<Point>,
    visible: bool,
}

struct RegionInner {
    id: RegionId,
    name: String,
    parent: Option<RegionId>,
    state: RefCell<RegionState>,
    surface: Weak<RefCell<SurfaceInner>>,
}

/// Named child area of the drawing surface.
///
/// Cloning yields another handle to the same region; use `Region::ptr_eq`
/// to check identity.
#[derive(Clone)]
pub struct Region {
    inner: Rc<RegionInner>,
}

impl Region {
    #[must_use]
    pub fn id(&self) -> RegionId {
        self.inner.id
    }

    /// Qualified name, e.g. `canvas/series`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    #[must_use]
    pub fn parent(&self) -> Option<RegionId> {
        self.inner.parent
    }

    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.inner, &b.inner)
    }

    /// Replaces the region content with `scene`.
    pub fn render(&self, scene: RegionScene) -> ChartResult<()> {
        scene.validate()?;
        let backend = self.live_backend()?;
        backend.borrow_mut().render_region(self.inner.id, &scene)?;
        trace!(region = %self.inner.name, primitives = scene.primitive_count(), "region rendered");
        self.inner.state.borrow_mut().scene = scene;
        Ok(())
    }

    pub fn set_position(&self, x: f64, y: f64) -> ChartResult<()> {
        if !x.is_finite() || !y.is_finite() {
            return Err(ChartError::InvalidData(
                "region position must be finite".to_owned(),
            ));
        }
        let backend = self.live_backend()?;
        backend.borrow_mut().set_region_position(self.inner.id, x, y)?;
        self.inner.state.borrow_mut().position = Some(Point::new(x, y));
        Ok(())
    }

    pub fn set_visible(&self, visible: bool) -> ChartResult<()> {
        let backend = self.live_backend()?;
        backend
            .borrow_mut()
            .set_region_visible(self.inner.id, visible)?;
        self.inner.state.borrow_mut().visible = visible;
        Ok(())
    }

    #[must_use]
    pub fn position(&self) -> Option<Point> {
        self.inner.state.borrow().position
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.inner.state.borrow().visible
    }

    /// Last scene rendered into this region.
    #[must_use]
    pub fn scene(&self) -> RegionScene {
        self.inner.state.borrow().scene.clone()
    }

    fn live_backend(&self) -> ChartResult<SharedBackend> {
        let surface = self.inner.surface.upgrade().ok_or(ChartError::HandleClosed)?;
        let surface = surface.borrow();
        if surface.closed {
            return Err(ChartError::HandleClosed);
        }
        Ok(Rc::clone(&surface.backend))
    }
}

impl fmt::Debug for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Region")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .finish()
    }
}

struct Listener {
    id: ListenerId,
    region: RegionId,
    kind: PointerKind,
    callback: PointerCallback,
}

struct SurfaceInner {
    backend: SharedBackend,
    regions: IndexMap<String, Region>,
    listeners: Vec<Listener>,
    next_listener: u64,
    closed: bool,
}

/// Per-facade wrapper over the host surface.
#[derive(Clone)]
pub struct DrawingSurfaceHandle {
    inner: Rc<RefCell<SurfaceInner>>,
}

impl DrawingSurfaceHandle {
    #[must_use]
    pub fn new(backend: Rc<RefCell<dyn SurfaceBackend>>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(SurfaceInner {
                backend,
                regions: IndexMap::new(),
                listeners: Vec::new(),
                next_listener: 0,
                closed: false,
            })),
        }
    }

    /// Top-level region named `name`, created on first call.
    pub fn element_for(&self, name: &str) -> ChartResult<Region> {
        self.region_with(None, name.to_owned())
    }

    /// Child region of `parent`, memoized as `parent/name`.
    pub fn child_of(&self, parent: &Region, name: &str) -> ChartResult<Region> {
        self.region_with(Some(parent.id()), format!("{}/{name}", parent.name()))
    }

    /// Region next to `region` under the same parent, memoized by name.
    pub fn sibling_of(&self, region: &Region, name: &str) -> ChartResult<Region> {
        match region.name().rsplit_once('/') {
            Some((prefix, _)) => self.region_with(region.parent(), format!("{prefix}/{name}")),
            None => self.region_with(None, name.to_owned()),
        }
    }

    fn region_with(&self, parent: Option<RegionId>, qualified: String) -> ChartResult<Region> {
        if qualified.is_empty() || qualified.ends_with('/') {
            return Err(ChartError::InvalidData(
                "region name must not be empty".to_owned(),
            ));
        }
        let mut inner = self.inner.borrow_mut();
        if inner.closed {
            return Err(ChartError::HandleClosed);
        }
        if let Some(existing) = inner.regions.get(&qualified) {
            return Ok(existing.clone());
        }

        let id = inner
            .backend
            .borrow_mut()
            .create_region(parent, &qualified)?;
        let region = Region {
            inner: Rc::new(RegionInner {
                id,
                name: qualified.clone(),
                parent,
                state: RefCell::new(RegionState {
                    visible: true,
                    ..RegionState::default()
                }),
                surface: Rc::downgrade(&self.inner),
            }),
        };
        debug!(region = %qualified, id = id.raw(), "region created");
        inner.regions.insert(qualified, region.clone());
        Ok(region)
    }

    /// Looks up an existing region without creating it.
    #[must_use]
    pub fn region(&self, qualified: &str) -> Option<Region> {
        self.inner.borrow().regions.get(qualified).cloned()
    }

    pub fn add_listener(
        &self,
        region: &Region,
        kind: PointerKind,
        callback: impl Fn(PointerInput) -> ChartResult<()> + 'static,
    ) -> ChartResult<ListenerId> {
        let mut inner = self.inner.borrow_mut();
        if inner.closed {
            return Err(ChartError::HandleClosed);
        }
        inner.backend.borrow_mut().attach_listener(region.id(), kind)?;
        let id = ListenerId(inner.next_listener);
        inner.next_listener = inner.next_listener.wrapping_add(1);
        inner.listeners.push(Listener {
            id,
            region: region.id(),
            kind,
            callback: Rc::new(callback),
        });
        Ok(id)
    }

    pub fn remove_listener(&self, id: ListenerId) -> ChartResult<bool> {
        let mut inner = self.inner.borrow_mut();
        let Some(index) = inner.listeners.iter().position(|l| l.id == id) else {
            return Ok(false);
        };
        let listener = inner.listeners.remove(index);
        inner
            .backend
            .borrow_mut()
            .detach_listener(listener.region, listener.kind)?;
        Ok(true)
    }

    /// Delivers host pointer input to the listeners registered on `region`.
    pub fn dispatch_pointer(&self, region: &Region, input: PointerInput) -> ChartResult<usize> {
        let callbacks: Vec<PointerCallback> = {
            let inner = self.inner.borrow();
            if inner.closed {
                return Err(ChartError::HandleClosed);
            }
            inner
                .listeners
                .iter()
                .filter(|l| l.region == region.id() && l.kind == input.kind)
                .map(|l| Rc::clone(&l.callback))
                .collect()
        };
        for callback in &callbacks {
            callback(input)?;
        }
        Ok(callbacks.len())
    }

    #[must_use]
    pub fn container_size(&self) -> Option<Viewport> {
        let backend = Rc::clone(&self.inner.borrow().backend);
        let size = backend.borrow().container_size();
        size
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.borrow().closed
    }

    #[must_use]
    pub fn region_count(&self) -> usize {
        self.inner.borrow().regions.len()
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    /// Detaches every listener and removes every region, children first.
    ///
    /// A failing removal does not stop the rest; the first error is returned.
    /// Calling it again is a no-op.
    pub fn teardown(&self) -> ChartResult<()> {
        let mut inner = self.inner.borrow_mut();
        if inner.closed {
            return Ok(());
        }
        inner.closed = true;
        let backend = Rc::clone(&inner.backend);
        let mut backend = backend.borrow_mut();

        let listeners = std::mem::take(&mut inner.listeners);
        for listener in &listeners {
            if let Err(err) = backend.detach_listener(listener.region, listener.kind) {
                warn!(error = %err, region = listener.region.raw(), "listener detach failed");
            }
        }
        let regions = std::mem::take(&mut inner.regions);
        let removed = regions.len();
        let mut outcome = Ok(());
        for region in regions.values().rev() {
            if let Err(err) = backend.remove_region(region.id()) {
                warn!(error = %err, region = %region.name(), "region removal failed");
                outcome = outcome.and(Err(err));
            }
        }
        debug!(regions = removed, listeners = listeners.len(), "drawing surface torn down");
        outcome
    }
}

impl fmt::Debug for DrawingSurfaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("DrawingSurfaceHandle")
            .field("regions", &inner.regions.keys().collect::<Vec<_>>())
            .field("listeners", &inner.listeners.len())
            .field("closed", &inner.closed)
            .finish()
    }
}
