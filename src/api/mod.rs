//! Public facade, its lifecycle and the chart-kind contract.

mod chart_kind;
mod facade;
mod lifecycle;
mod props;
mod snapshot;

pub use chart_kind::ChartKind;
pub use facade::Facade;
pub use lifecycle::{FacadeState, LifecycleOp};
pub use props::ChartProps;
pub use snapshot::{FACADE_SNAPSHOT_JSON_SCHEMA_V1, FacadeSnapshot, FacadeSnapshotJsonContractV1};
