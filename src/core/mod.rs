pub mod accessors;
pub mod config;
pub mod scale;
pub mod state;
pub mod types;

pub use accessors::{Accessor, AccessorTable};
pub use config::{ChartConfig, ConfigMerger};
pub use scale::LinearScale;
pub use state::{
    ComputedTable, ComputedWriter, MergedConfig, Partition, PartitionWrite, ReadOnlyState,
    StatePath, StateStore,
};
pub use types::{Margins, Point, Viewport};
