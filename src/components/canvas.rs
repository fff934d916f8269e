use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::core::{Margins, Point, Viewport};
use crate::error::{ChartError, ChartResult};
use crate::render::{Color, RectPrimitive, RegionScene};

use super::{Component, ComponentContext};

/// Published under `computed.canvas`.
///
/// `width`/`height` are the drawing area net of margins; `origin` is the
/// drawing area's top-left corner inside the container.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasGeometry {
    pub width: f64,
    pub height: f64,
    pub margins: Margins,
    pub origin: Point,
    pub container: Viewport,
}

/// Root component: sizes the container and publishes drawing-area geometry.
#[derive(Debug)]
pub struct Canvas {
    context: ComponentContext,
    geometry: Option<CanvasGeometry>,
}

impl Canvas {
    #[must_use]
    pub fn new(context: ComponentContext) -> Self {
        Self {
            context,
            geometry: None,
        }
    }

    #[must_use]
    pub fn geometry(&self) -> Option<CanvasGeometry> {
        self.geometry
    }

    /// Host-measured container size wins; config `width`/`height` is the fallback.
    fn resolve_geometry(&self) -> ChartResult<CanvasGeometry> {
        let snapshot = self.context.state.snapshot();
        let config = snapshot.config();
        let container = self.context.surface.container_size().unwrap_or_else(|| {
            Viewport::new(config.u32_or("width", 0), config.u32_or("height", 0))
        });
        if !container.is_valid() {
            return Err(ChartError::InvalidViewport {
                width: container.width,
                height: container.height,
            });
        }

        let margins = Margins::new(
            config.f64_or("marginTop", 0.0),
            config.f64_or("marginRight", 0.0),
            config.f64_or("marginBottom", 0.0),
            config.f64_or("marginLeft", 0.0),
        );
        if !margins.is_valid() {
            return Err(ChartError::InvalidData(
                "canvas margins must be finite and >= 0".to_owned(),
            ));
        }

        let width = f64::from(container.width) - margins.horizontal();
        let height = f64::from(container.height) - margins.vertical();
        if width <= 0.0 || height <= 0.0 {
            return Err(ChartError::InvalidData(format!(
                "margins leave no drawing area in a {}x{} container",
                container.width, container.height
            )));
        }

        Ok(CanvasGeometry {
            width,
            height,
            margins,
            origin: Point::new(margins.left, margins.top),
            container,
        })
    }
}

impl Component for Canvas {
    fn name(&self) -> &str {
        "canvas"
    }

    fn context(&self) -> &ComponentContext {
        &self.context
    }

    fn draw(&mut self) -> ChartResult<()> {
        let geometry = self.resolve_geometry()?;
        self.context.writer()?.write(&geometry)?;

        let frame = RectPrimitive::new(
            0.0,
            0.0,
            f64::from(geometry.container.width),
            f64::from(geometry.container.height),
            Color::rgba(0.0, 0.0, 0.0, 0.0),
        );
        self.context.region.render(RegionScene::new().with_rect(frame))?;
        trace!(
            width = geometry.width,
            height = geometry.height,
            "canvas geometry published"
        );
        self.geometry = Some(geometry);
        Ok(())
    }
}
