use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, trace, warn};

use crate::components::{Canvas, Component, ComponentContext, SeriesComponent};
use crate::core::{
    ChartConfig, ComputedWriter, ConfigMerger, MergedConfig, PartitionWrite, ReadOnlyState,
    StatePath, StateStore,
};
use crate::error::{ChartError, ChartResult};
use crate::interaction::{DEFAULT_MAX_EVENT_DEPTH, EventBus, PointerInput};
use crate::render::{DrawingSurfaceHandle, Region, SurfaceBackend};

use super::{ChartKind, ChartProps, FacadeSnapshot, FacadeState, LifecycleOp};

/// Name of the root region every component hangs off.
const ROOT_REGION: &str = "canvas";

/// Suffix for generated `uid`s, shared by every facade in the process.
static NEXT_UID: AtomicU64 = AtomicU64::new(1);

struct Components<K: ChartKind> {
    root: Region,
    canvas: Canvas,
    series: K::Series,
    focus: K::Focus,
}

/// Public entry point for one chart instance.
///
/// Owns the state store, the event bus and the drawing surface handle, and
/// drives Canvas, Series and Focus through `update`/`draw`/`resize`/`close`.
/// Nothing draws until `draw` is called, so successive updates batch.
pub struct Facade<K: ChartKind, B: SurfaceBackend + 'static> {
    kind: K,
    backend: Rc<RefCell<B>>,
    surface: DrawingSurfaceHandle,
    store: StateStore,
    events: EventBus,
    lifecycle: FacadeState,
    dirty: bool,
    components: Option<Components<K>>,
}

impl<K: ChartKind, B: SurfaceBackend + 'static> Facade<K, B> {
    /// Merges `props` over the chart defaults. Without a caller-supplied
    /// `uid` the facade gets `<visualization><n>`, unique in the process.
    /// The surface is not touched until the first `draw`.
    pub fn new(kind: K, backend: B, props: ChartProps) -> ChartResult<Self> {
        let mut config = ConfigMerger::merge(&kind.default_config(), &props.config);
        if !config.contains("uid") {
            let suffix = NEXT_UID.fetch_add(1, Ordering::Relaxed);
            config.set("uid", format!("{}{suffix}", kind.visualization_name()));
        }
        let accessors = kind.default_accessors().merged(&props.accessors);
        let data = match &props.data {
            Some(data) => ConfigMerger::merge_value(&kind.default_data(), data),
            None => kind.default_data(),
        };
        let events = EventBus::with_max_depth(event_depth(&config)?);

        let backend = Rc::new(RefCell::new(backend));
        let shared: Rc<RefCell<dyn SurfaceBackend>> = backend.clone();
        let facade = Self {
            surface: DrawingSurfaceHandle::new(shared),
            store: StateStore::new(MergedConfig::new(data, config, accessors)),
            kind,
            backend,
            events,
            lifecycle: FacadeState::Constructed,
            dirty: true,
            components: None,
        };
        debug!(
            visualization = facade.kind.visualization_name(),
            uid = %facade.uid(),
            "facade constructed"
        );
        Ok(facade)
    }

    /// Re-merges the supplied partitions over the current ones and marks the
    /// facade dirty. Does not draw.
    pub fn update(&mut self, props: ChartProps) -> ChartResult<()> {
        let next = self.lifecycle.next(LifecycleOp::Update)?;
        let current = self.store.snapshot();
        let depth = event_depth(&ConfigMerger::merge(current.config(), &props.config))?;

        if let Some(data) = props.data {
            self.store.write(PartitionWrite::Data(data))?;
        }
        if !props.config.is_empty() {
            self.store.write(PartitionWrite::Config(props.config))?;
        }
        if !props.accessors.is_empty() {
            self.store.write(PartitionWrite::Accessors(props.accessors))?;
        }
        self.events.set_max_depth(depth)?;
        self.dirty = true;
        self.transition(next);
        Ok(())
    }

    /// Renders against current state and returns the root region.
    ///
    /// The first call builds Canvas, Series and Focus in that order; later
    /// calls re-draw the same components. A call with nothing changed since
    /// the last successful draw does nothing.
    pub fn draw(&mut self) -> ChartResult<Region> {
        let next = self.lifecycle.next(LifecycleOp::Draw)?;
        if self.components.is_none() {
            let built = self.instantiate();
            if built.is_err() {
                self.store.revoke_writers();
            }
            self.components = Some(built?);
        }
        let Some(components) = self.components.as_mut() else {
            return Err(ChartError::InvalidLifecycle {
                state: self.lifecycle.name(),
                operation: LifecycleOp::Draw.name(),
            });
        };
        if !self.dirty && self.lifecycle == FacadeState::Drawn {
            trace!("draw skipped, state unchanged");
            return Ok(components.root.clone());
        }

        components.series.prepare_data()?;
        components.canvas.draw()?;
        components.series.draw()?;
        components.focus.draw()?;
        let root = components.root.clone();

        self.dirty = false;
        self.transition(next);
        Ok(root)
    }

    /// Recomputes canvas geometry and re-lays out Series and Focus. Pending
    /// updates are prepared first so the relayout sees current data. Before
    /// the first draw it only marks the facade dirty.
    pub fn resize(&mut self) -> ChartResult<()> {
        let next = self.lifecycle.next(LifecycleOp::Resize)?;
        let Some(components) = self.components.as_mut() else {
            debug!(state = self.lifecycle.name(), "resize deferred to first draw");
            self.dirty = true;
            self.transition(next);
            return Ok(());
        };
        if self.dirty {
            components.series.prepare_data()?;
        }
        components.canvas.draw()?;
        components.series.draw()?;
        components.focus.draw()?;

        self.dirty = false;
        self.transition(next);
        Ok(())
    }

    /// Unsubscribes component handlers, releases computed writers and tears
    /// down every region and listener. All later calls fail with
    /// `FacadeClosed`.
    pub fn close(&mut self) -> ChartResult<()> {
        let next = self.lifecycle.next(LifecycleOp::Close)?;
        self.transition(next);

        let mut outcome = Ok(());
        if let Some(mut components) = self.components.take() {
            for result in [
                components.focus.close(),
                components.series.close(),
                components.canvas.close(),
            ] {
                if let Err(err) = result {
                    warn!(error = %err, "component close failed");
                    outcome = outcome.and(Err(err));
                }
            }
        }
        self.store.revoke_writers();
        if let Err(err) = self.surface.teardown() {
            outcome = outcome.and(Err(err));
        }
        outcome
    }

    /// Child region of the root, memoized by name (`series` is the region
    /// the series draws into).
    pub fn element_for(&self, name: &str) -> ChartResult<Region> {
        self.ensure_open()?;
        let components = self
            .components
            .as_ref()
            .ok_or(ChartError::InvalidLifecycle {
                state: self.lifecycle.name(),
                operation: "element_for",
            })?;
        self.surface.child_of(&components.root, name)
    }

    /// Forwards host pointer input to the listeners registered on `region`.
    pub fn dispatch_pointer(&self, region: &Region, input: PointerInput) -> ChartResult<usize> {
        self.ensure_open()?;
        if self.components.is_none() {
            return Err(ChartError::InvalidLifecycle {
                state: self.lifecycle.name(),
                operation: "dispatch_pointer",
            });
        }
        self.surface.dispatch_pointer(region, input)
    }

    #[must_use]
    pub fn state(&self) -> ReadOnlyState {
        self.store.read_only()
    }

    /// The facade's event bus. Hosts may subscribe and emit on it.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    #[must_use]
    pub fn lifecycle(&self) -> FacadeState {
        self.lifecycle
    }

    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[must_use]
    pub fn kind(&self) -> &K {
        &self.kind
    }

    #[must_use]
    pub fn uid(&self) -> String {
        self.store
            .snapshot()
            .config()
            .str_or("uid", self.kind.visualization_name())
            .to_owned()
    }

    #[must_use]
    pub fn backend(&self) -> Ref<'_, B> {
        self.backend.borrow()
    }

    /// Host-side access, e.g. to report a new container size before `resize`.
    #[must_use]
    pub fn backend_mut(&self) -> RefMut<'_, B> {
        self.backend.borrow_mut()
    }

    pub fn snapshot(&self) -> ChartResult<FacadeSnapshot> {
        self.ensure_open()?;
        let merged = self.store.snapshot();
        Ok(FacadeSnapshot {
            visualization: self.kind.visualization_name().to_owned(),
            uid: self.uid(),
            lifecycle: self.lifecycle,
            dirty: self.dirty,
            generation: self.store.generation(),
            config: merged.config().clone(),
            computed: merged.computed().to_value_map(),
        })
    }

    pub fn snapshot_json_pretty(&self) -> ChartResult<String> {
        self.snapshot()?.to_json_contract_v1_pretty()
    }

    fn ensure_open(&self) -> ChartResult<()> {
        if self.lifecycle == FacadeState::Closed {
            return Err(ChartError::FacadeClosed);
        }
        Ok(())
    }

    fn transition(&mut self, next: FacadeState) {
        if next != self.lifecycle {
            debug!(from = self.lifecycle.name(), to = next.name(), "facade lifecycle transition");
            self.lifecycle = next;
        }
    }

    fn instantiate(&self) -> ChartResult<Components<K>> {
        let root = self.surface.element_for(ROOT_REGION)?;
        let canvas = Canvas::new(self.context(
            root.clone(),
            Some(self.store.computed_writer(StatePath::parse("canvas")?)?),
        ));
        let series = self.kind.create_series(self.context(
            self.surface.child_of(&root, "series")?,
            Some(self.store.computed_writer(StatePath::parse("series")?)?),
        ))?;
        let focus = self
            .kind
            .create_focus(self.context(self.surface.child_of(&root, "focus")?, None))?;
        debug!(
            visualization = self.kind.visualization_name(),
            "components instantiated"
        );
        Ok(Components {
            root,
            canvas,
            series,
            focus,
        })
    }

    fn context(&self, region: Region, writer: Option<ComputedWriter>) -> ComponentContext {
        ComponentContext {
            state: self.store.read_only(),
            writer,
            events: self.events.clone(),
            surface: self.surface.clone(),
            region,
        }
    }
}

impl<K: ChartKind, B: SurfaceBackend + 'static> std::fmt::Debug for Facade<K, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Facade")
            .field("visualization", &self.kind.visualization_name())
            .field("lifecycle", &self.lifecycle)
            .field("dirty", &self.dirty)
            .field("surface", &self.surface)
            .finish()
    }
}

fn event_depth(config: &ChartConfig) -> ChartResult<usize> {
    let depth = config.u32_or("maxEventDepth", DEFAULT_MAX_EVENT_DEPTH as u32);
    if depth == 0 {
        return Err(ChartError::InvalidData(
            "maxEventDepth must be >= 1".to_owned(),
        ));
    }
    Ok(depth as usize)
}
