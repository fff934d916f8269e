use serde::{Deserialize, Serialize};

use crate::error::{ChartError, ChartResult};

/// Facade lifecycle. `Ready` and `Drawn` are re-entered through `update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FacadeState {
    #[default]
    Constructed,
    Ready,
    Drawn,
    Closed,
}

impl FacadeState {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Constructed => "constructed",
            Self::Ready => "ready",
            Self::Drawn => "drawn",
            Self::Closed => "closed",
        }
    }

    /// State after `op` succeeds.
    ///
    /// Every operation fails with `FacadeClosed` once closed. A resize
    /// before the first draw keeps the state; the facade defers it.
    pub fn next(self, op: LifecycleOp) -> ChartResult<Self> {
        if self == Self::Closed {
            return Err(ChartError::FacadeClosed);
        }
        Ok(match op {
            LifecycleOp::Update => Self::Ready,
            LifecycleOp::Draw => Self::Drawn,
            LifecycleOp::Resize => self,
            LifecycleOp::Close => Self::Closed,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleOp {
    Update,
    Draw,
    Resize,
    Close,
}

impl LifecycleOp {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Update => "update",
            Self::Draw => "draw",
            Self::Resize => "resize",
            Self::Close => "close",
        }
    }
}
