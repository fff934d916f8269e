//! chart-facade: declarative chart facade.
//!
//! Callers hand a `Facade` partial `{data, config, accessors}` props; the
//! facade merges them over chart defaults, keeps them in a copy-on-write
//! state store and drives Canvas, Series and Focus components through a
//! `update`/`draw`/`resize`/`close` lifecycle. Components talk to each other
//! only through single-writer computed state and a synchronous event bus.

pub mod api;
pub mod charts;
pub mod components;
pub mod core;
pub mod error;
pub mod interaction;
pub mod render;
pub mod telemetry;

pub use api::{ChartKind, ChartProps, Facade, FacadeState};
pub use charts::ProcessFlow;
pub use error::{ChartError, ChartResult};
