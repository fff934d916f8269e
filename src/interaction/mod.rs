mod event_bus;

pub use event_bus::{DEFAULT_MAX_EVENT_DEPTH, EventBus, HOST_OWNER, SubscriptionId};

use serde::{Deserialize, Serialize};

use crate::core::Point;

/// Event names emitted by series components.
pub mod events {
    pub const NODE_HOVER: &str = "node:hover";
    pub const NODE_OUT: &str = "node:out";
    pub const NODE_CLICK: &str = "node:click";
    pub const LINK_HOVER: &str = "link:hover";
    pub const LINK_OUT: &str = "link:out";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointerKind {
    Move,
    Click,
    Leave,
}

/// Low-level pointer input delivered by the host surface, in region-local pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerInput {
    pub kind: PointerKind,
    pub x: f64,
    pub y: f64,
}

impl PointerInput {
    #[must_use]
    pub const fn moved(x: f64, y: f64) -> Self {
        Self {
            kind: PointerKind::Move,
            x,
            y,
        }
    }

    #[must_use]
    pub const fn click(x: f64, y: f64) -> Self {
        Self {
            kind: PointerKind::Click,
            x,
            y,
        }
    }

    #[must_use]
    pub const fn leave() -> Self {
        Self {
            kind: PointerKind::Leave,
            x: 0.0,
            y: 0.0,
        }
    }

    #[must_use]
    pub fn point(self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Payload of `node:*` events: node identity plus its screen position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodePointerEvent {
    pub id: String,
    pub x: f64,
    pub y: f64,
}

/// Payload of `link:*` events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkPointerEvent {
    pub source: String,
    pub target: String,
    pub x: f64,
    pub y: f64,
}
