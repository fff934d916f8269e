use std::cell::RefCell;
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace};

use crate::components::{Component, ComponentContext};
use crate::core::{ChartConfig, ReadOnlyState};
use crate::error::{ChartError, ChartResult};
use crate::interaction::{LinkPointerEvent, NodePointerEvent, events};
use crate::render::{Color, RectPrimitive, Region, RegionScene, TextHAlign, TextPrimitive};

use super::layout::{NodeLayout, SeriesLayout};

const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);
const LABEL_COLOR: Color = Color::rgb(0.1, 0.1, 0.1);
const HOVER_RING_WIDTH: f64 = 1.5;

#[derive(Debug, Default)]
struct FocusRecord {
    node: Option<String>,
    link: Option<(String, String)>,
    highlighted: Option<String>,
}

/// Everything an event handler needs; shared between the component and
/// its subscriptions.
#[derive(Debug)]
struct FocusShared {
    state: ReadOnlyState,
    overlay: Region,
    highlight: Region,
    record: RefCell<FocusRecord>,
}

/// Tooltip/highlight overlay driven by `node:*` and `link:*` events.
///
/// The click highlight lives in a sibling region so hiding the hover overlay
/// leaves it in place. Reads `computed.series` but publishes nothing.
#[derive(Debug)]
pub struct Focus {
    context: ComponentContext,
    shared: Rc<FocusShared>,
}

impl Focus {
    pub fn new(context: ComponentContext) -> ChartResult<Self> {
        let highlight = context.surface.sibling_of(&context.region, "highlight")?;
        context.region.set_visible(false)?;
        highlight.set_visible(false)?;
        let shared = Rc::new(FocusShared {
            state: context.state.clone(),
            overlay: context.region.clone(),
            highlight,
            record: RefCell::new(FocusRecord::default()),
        });

        let focus = Self { context, shared };
        focus.subscribe(events::NODE_HOVER, |shared, payload: NodePointerEvent| {
            shared.show_node(&payload.id, payload.x, payload.y)
        });
        focus.subscribe(events::NODE_OUT, |shared, _: NodePointerEvent| {
            shared.hide_overlay()
        });
        focus.subscribe(events::NODE_CLICK, |shared, payload: NodePointerEvent| {
            shared.toggle_highlight(&payload.id)
        });
        focus.subscribe(events::LINK_HOVER, |shared, payload: LinkPointerEvent| {
            shared.show_link(payload)
        });
        focus.subscribe(events::LINK_OUT, |shared, _: LinkPointerEvent| {
            shared.hide_overlay()
        });
        Ok(focus)
    }

    /// Id of the node the overlay currently describes.
    #[must_use]
    pub fn focused_node(&self) -> Option<String> {
        self.shared.record.borrow().node.clone()
    }

    #[must_use]
    pub fn highlighted_node(&self) -> Option<String> {
        self.shared.record.borrow().highlighted.clone()
    }

    fn subscribe<P, F>(&self, event: &'static str, react: F)
    where
        P: DeserializeOwned,
        F: Fn(&FocusShared, P) -> ChartResult<()> + 'static,
    {
        let shared = Rc::clone(&self.shared);
        self.context
            .events
            .on_owned(self.name(), event, move |payload: &Value| {
                let parsed = serde_json::from_value::<P>(payload.clone()).map_err(|e| {
                    ChartError::InvalidData(format!("malformed `{event}` payload: {e}"))
                })?;
                react(&shared, parsed)
            });
    }
}

impl Component for Focus {
    fn name(&self) -> &str {
        "focus"
    }

    fn context(&self) -> &ComponentContext {
        &self.context
    }

    /// Re-anchors the overlay and highlight to the freshly published layout.
    fn draw(&mut self) -> ChartResult<()> {
        let layout = self.shared.layout()?;
        let (node, link, highlighted) = {
            let record = self.shared.record.borrow();
            (
                record.node.clone(),
                record.link.clone(),
                record.highlighted.clone(),
            )
        };

        if let Some(id) = node {
            match layout.node_layout.get(&id) {
                Some(found) => self.shared.show_node(&id, found.screen_x, found.screen_y)?,
                None => self.shared.hide_overlay()?,
            }
        } else if let Some((source, target)) = link {
            let still_drawn = layout
                .link_layout
                .iter()
                .any(|l| l.source == source && l.target == target);
            if !still_drawn {
                self.shared.hide_overlay()?;
            }
        }

        if let Some(id) = highlighted {
            match layout.node_layout.get(&id) {
                Some(found) => self.shared.place_highlight(found)?,
                None => self.shared.clear_highlight()?,
            }
        }
        trace!("focus redrawn");
        Ok(())
    }
}

impl FocusShared {
    fn layout(&self) -> ChartResult<SeriesLayout> {
        Ok(self
            .state
            .computed_as::<SeriesLayout>("series")?
            .unwrap_or_default())
    }

    fn config(&self) -> ChartConfig {
        self.state.snapshot().config().clone()
    }

    fn show_node(&self, id: &str, x: f64, y: f64) -> ChartResult<()> {
        let layout = self.layout()?;
        let config = self.config();
        let node = layout.node_layout.get(id);
        let size = node.map_or(0.0, |n| n.size);
        let padding = config.f64_or("labelPadding", 5.0);
        let offset = config.f64_or("labelOffset", 5.0);
        let font_size = config.f64_or("fontSize", 11.0);
        let ring_color = Color::from_hex(config.str_or("highlightColor", "#0000ff"))?;

        let mut scene = RegionScene::new().with_rect(
            RectPrimitive::circle(0.0, 0.0, size + 2.0 * padding, TRANSPARENT)
                .with_stroke(ring_color, HOVER_RING_WIDTH),
        );
        let label = node.map_or(id, |n| n.label.as_str());
        let text = if config.bool_or("showNodeFocusLabels", true) {
            let value = node.map_or(0.0, |n| n.value);
            format!("{label}: {value}")
        } else {
            label.to_owned()
        };
        if !text.is_empty() {
            scene = scene.with_text(TextPrimitive::new(
                text,
                0.0,
                -(size / 2.0 + padding + offset),
                font_size,
                LABEL_COLOR,
                TextHAlign::Center,
            ));
        }

        self.overlay.set_position(x, y)?;
        self.overlay.render(scene)?;
        self.overlay.set_visible(true)?;
        let mut record = self.record.borrow_mut();
        record.node = Some(id.to_owned());
        record.link = None;
        Ok(())
    }

    fn show_link(&self, payload: LinkPointerEvent) -> ChartResult<()> {
        let config = self.config();
        if !config.bool_or("showLinkFocusLabels", true) {
            return Ok(());
        }
        let layout = self.layout()?;
        let value = layout
            .link_layout
            .iter()
            .find(|l| l.source == payload.source && l.target == payload.target)
            .map_or(0.0, |l| l.value);
        let text = format!("{} \u{2192} {}: {value}", payload.source, payload.target);
        let scene = RegionScene::new().with_text(TextPrimitive::new(
            text,
            0.0,
            -config.f64_or("labelOffset", 5.0),
            config.f64_or("fontSize", 11.0),
            LABEL_COLOR,
            TextHAlign::Center,
        ));

        self.overlay.set_position(payload.x, payload.y)?;
        self.overlay.render(scene)?;
        self.overlay.set_visible(true)?;
        let mut record = self.record.borrow_mut();
        record.node = None;
        record.link = Some((payload.source, payload.target));
        Ok(())
    }

    fn hide_overlay(&self) -> ChartResult<()> {
        self.overlay.set_visible(false)?;
        self.overlay.render(RegionScene::new())?;
        let mut record = self.record.borrow_mut();
        record.node = None;
        record.link = None;
        Ok(())
    }

    fn toggle_highlight(&self, id: &str) -> ChartResult<()> {
        let already = self.record.borrow().highlighted.as_deref() == Some(id);
        if already {
            return self.clear_highlight();
        }
        let layout = self.layout()?;
        match layout.node_layout.get(id) {
            Some(node) => self.place_highlight(node),
            None => {
                debug!(node = id, "ignoring click on a node missing from layout");
                Ok(())
            }
        }
    }

    fn place_highlight(&self, node: &NodeLayout) -> ChartResult<()> {
        let config = self.config();
        let color = Color::from_hex(config.str_or("highlightColor", "#0000ff"))?;
        let border = config.f64_or("nodeBorderWidth", 10.0);
        let ring = RectPrimitive::circle(0.0, 0.0, node.size + border, TRANSPARENT)
            .with_stroke(color, border);

        self.highlight.set_position(node.screen_x, node.screen_y)?;
        self.highlight.render(RegionScene::new().with_rect(ring))?;
        self.highlight.set_visible(true)?;
        self.record.borrow_mut().highlighted = Some(node.id.clone());
        Ok(())
    }

    fn clear_highlight(&self) -> ChartResult<()> {
        self.highlight.set_visible(false)?;
        self.highlight.render(RegionScene::new())?;
        self.record.borrow_mut().highlighted = None;
        Ok(())
    }
}
