use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::components::{CanvasGeometry, Component, ComponentContext, SeriesComponent};
use crate::core::{ChartConfig, Point, ReadOnlyState};
use crate::error::{ChartError, ChartResult};
use crate::interaction::{
    EventBus, LinkPointerEvent, NodePointerEvent, PointerInput, PointerKind, events,
};
use crate::render::{Color, LinePrimitive, RectPrimitive, RegionScene, TextHAlign, TextPrimitive};

use super::layout::{LayoutParams, SeriesLayout, compute_layout};
use super::model::ProcessFlowModel;

/// Extra pick radius around links, in pixels.
const LINK_PICK_TOLERANCE: f64 = 2.0;

#[derive(Debug, Clone, PartialEq, Default)]
enum Hovered {
    #[default]
    Nothing,
    Node(String),
    Link(String, String),
}

/// Draws nodes and links and turns pointer input into `node:*`/`link:*` events.
#[derive(Debug)]
pub struct Series {
    context: ComponentContext,
    model: Option<ProcessFlowModel>,
    hovered: Rc<RefCell<Hovered>>,
    listening: bool,
}

impl Series {
    #[must_use]
    pub fn new(context: ComponentContext) -> Self {
        Self {
            context,
            model: None,
            hovered: Rc::new(RefCell::new(Hovered::Nothing)),
            listening: false,
        }
    }

    #[must_use]
    pub fn model(&self) -> Option<&ProcessFlowModel> {
        self.model.as_ref()
    }

    fn attach_listeners(&mut self) -> ChartResult<()> {
        if self.listening {
            return Ok(());
        }
        for kind in [PointerKind::Move, PointerKind::Click, PointerKind::Leave] {
            let state = self.context.state.clone();
            let bus = self.context.events.clone();
            let hovered = Rc::clone(&self.hovered);
            self.context
                .surface
                .add_listener(&self.context.region, kind, move |input| {
                    handle_pointer(&state, &bus, &hovered, input)
                })?;
        }
        self.listening = true;
        Ok(())
    }
}

impl Component for Series {
    fn name(&self) -> &str {
        "series"
    }

    fn context(&self) -> &ComponentContext {
        &self.context
    }

    fn draw(&mut self) -> ChartResult<()> {
        if self.model.is_none() {
            self.prepare_data()?;
        }
        let snapshot = self.context.state.snapshot();
        let canvas: CanvasGeometry = snapshot.computed_as("canvas")?.ok_or_else(|| {
            ChartError::InvalidData("series drawn before canvas geometry was published".to_owned())
        })?;
        let params = LayoutParams::from_config(snapshot.config())?;
        let layout = match &self.model {
            Some(model) => compute_layout(model, &canvas, &params)?,
            None => SeriesLayout::default(),
        };
        let scene = build_scene(&layout, snapshot.config())?;

        self.context.writer()?.write(&layout)?;
        self.context.region.set_position(canvas.origin.x, canvas.origin.y)?;
        self.context.region.render(scene)?;
        self.attach_listeners()?;
        trace!(
            nodes = layout.node_layout.len(),
            links = layout.link_layout.len(),
            "series drawn"
        );
        Ok(())
    }
}

impl SeriesComponent for Series {
    fn prepare_data(&mut self) -> ChartResult<()> {
        let snapshot = self.context.state.snapshot();
        let model = ProcessFlowModel::from_data(snapshot.data(), snapshot.accessors())?;
        self.model = Some(model);
        Ok(())
    }
}

fn build_scene(layout: &SeriesLayout, config: &ChartConfig) -> ChartResult<RegionScene> {
    let link_color = Color::from_hex(config.str_or("linkStroke", "#aaaaaa"))?;
    let node_color = Color::from_hex(config.str_or("nodeColor", "#1f77b4"))?;
    let label_color = Color::rgb(0.2, 0.2, 0.2);
    let font_size = config.f64_or("fontSize", 11.0);
    let label_offset = config.f64_or("labelOffset", 5.0);

    let mut scene = RegionScene::new();
    for link in &layout.link_layout {
        scene = scene.with_line(LinePrimitive::new(
            link.x1, link.y1, link.x2, link.y2, link.width, link_color,
        ));
    }
    for node in layout.node_layout.values() {
        scene = scene.with_rect(RectPrimitive::circle(node.x, node.y, node.size, node_color));
        if !node.label.is_empty() {
            scene = scene.with_text(TextPrimitive::new(
                node.label.clone(),
                node.x,
                node.y + node.size / 2.0 + label_offset + font_size,
                font_size,
                label_color,
                TextHAlign::Center,
            ));
        }
    }
    Ok(scene)
}

/// Hit test against the latest published layout, then emit transitions.
///
/// The hover record is updated before emitting so re-entrant emits see the
/// new state.
fn handle_pointer(
    state: &ReadOnlyState,
    bus: &EventBus,
    hovered: &Rc<RefCell<Hovered>>,
    input: PointerInput,
) -> ChartResult<()> {
    let snapshot = state.snapshot();
    let Some(layout) = snapshot.computed_as::<SeriesLayout>("series")? else {
        return Ok(());
    };
    let canvas: Option<CanvasGeometry> = snapshot.computed_as("canvas")?;
    let origin = canvas.map_or(Point::default(), |geometry| geometry.origin);

    let target = match input.kind {
        PointerKind::Leave => Hovered::Nothing,
        PointerKind::Move | PointerKind::Click => pick(&layout, input.point()),
    };

    if input.kind == PointerKind::Click {
        if let Hovered::Node(id) = &target {
            if let Some(node) = layout.node_layout.get(id) {
                bus.emit_serialized(
                    events::NODE_CLICK,
                    &NodePointerEvent {
                        id: id.clone(),
                        x: node.screen_x,
                        y: node.screen_y,
                    },
                )?;
            }
        }
        return Ok(());
    }

    let previous = hovered.replace(target.clone());
    if previous == target {
        return Ok(());
    }
    match previous {
        Hovered::Node(id) => {
            let (x, y) = match layout.node_layout.get(&id) {
                Some(node) => (node.screen_x, node.screen_y),
                None => {
                    debug!(node = %id, "hovered node gone from computed.series");
                    (input.x + origin.x, input.y + origin.y)
                }
            };
            bus.emit_serialized(events::NODE_OUT, &NodePointerEvent { id, x, y })?;
        }
        Hovered::Link(source, target) => {
            bus.emit_serialized(
                events::LINK_OUT,
                &LinkPointerEvent {
                    source,
                    target,
                    x: input.x + origin.x,
                    y: input.y + origin.y,
                },
            )?;
        }
        Hovered::Nothing => {}
    }
    match target {
        Hovered::Node(id) => {
            if let Some(node) = layout.node_layout.get(&id) {
                let payload = NodePointerEvent {
                    x: node.screen_x,
                    y: node.screen_y,
                    id,
                };
                bus.emit_serialized(events::NODE_HOVER, &payload)?;
            }
        }
        Hovered::Link(source, target) => {
            bus.emit_serialized(
                events::LINK_HOVER,
                &LinkPointerEvent {
                    source,
                    target,
                    x: input.x + origin.x,
                    y: input.y + origin.y,
                },
            )?;
        }
        Hovered::Nothing => {}
    }
    Ok(())
}

/// Nodes win over links; the last drawn node wins among overlapping nodes.
fn pick(layout: &SeriesLayout, point: Point) -> Hovered {
    if let Some(node) = layout
        .node_layout
        .values()
        .rev()
        .find(|node| point.distance_to(Point::new(node.x, node.y)) <= node.size / 2.0)
    {
        return Hovered::Node(node.id.clone());
    }
    layout
        .link_layout
        .iter()
        .rev()
        .find(|link| {
            point.distance_to_segment(Point::new(link.x1, link.y1), Point::new(link.x2, link.y2))
                <= link.width / 2.0 + LINK_PICK_TOLERANCE
        })
        .map_or(Hovered::Nothing, |link| {
            Hovered::Link(link.source.clone(), link.target.clone())
        })
}
