//! Rendering components and the contract the facade drives them through.
//!
//! A component gets a read-only state view, optionally a writer for its own
//! computed key, the facade's event bus and the region it draws into. It never
//! sees the other components directly; it reads what they published under
//! `computed`.

mod canvas;

pub use canvas::{Canvas, CanvasGeometry};

use crate::core::{ComputedWriter, ReadOnlyState};
use crate::error::{ChartError, ChartResult};
use crate::interaction::EventBus;
use crate::render::{DrawingSurfaceHandle, Region};

/// Dependencies injected into one component at construction.
#[derive(Debug)]
pub struct ComponentContext {
    pub state: ReadOnlyState,
    pub writer: Option<ComputedWriter>,
    pub events: EventBus,
    pub surface: DrawingSurfaceHandle,
    pub region: Region,
}

impl ComponentContext {
    /// Writer granted to this component; components without one are
    /// terminal consumers.
    pub fn writer(&self) -> ChartResult<&ComputedWriter> {
        self.writer.as_ref().ok_or_else(|| {
            ChartError::InvalidData(format!(
                "component drawing into `{}` has no computed writer",
                self.region.name()
            ))
        })
    }
}

pub trait Component {
    /// Owner tag used for event subscriptions.
    fn name(&self) -> &str;

    fn context(&self) -> &ComponentContext;

    /// Re-renders against current state. Must be idempotent.
    fn draw(&mut self) -> ChartResult<()>;

    /// Child region of this component's region, memoized by name.
    fn element_for(&self, name: &str) -> ChartResult<Region> {
        let context = self.context();
        context.surface.child_of(&context.region, name)
    }

    /// Drops event subscriptions owned by this component.
    fn close(&mut self) -> ChartResult<()> {
        let name = self.name().to_owned();
        self.context().events.off_owner(&name);
        Ok(())
    }
}

/// The data-bound component of a chart.
pub trait SeriesComponent: Component {
    /// Evaluates accessors and builds the chart model without touching any
    /// region, so accessor failures abort a draw before anything changes.
    fn prepare_data(&mut self) -> ChartResult<()>;
}
