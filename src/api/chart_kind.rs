use serde_json::{Value, json};

use crate::components::{Component, ComponentContext, SeriesComponent};
use crate::core::{AccessorTable, ChartConfig};
use crate::error::ChartResult;

/// Everything that makes one chart type different from another.
///
/// The facade owns the lifecycle; a kind only contributes defaults and
/// builds its data-bound and overlay components.
pub trait ChartKind {
    type Series: SeriesComponent;
    type Focus: Component;

    fn visualization_name(&self) -> &'static str;

    fn default_config(&self) -> ChartConfig;

    fn default_accessors(&self) -> AccessorTable;

    /// Data used when the caller supplies none.
    fn default_data(&self) -> Value {
        json!({})
    }

    fn create_series(&self, context: ComponentContext) -> ChartResult<Self::Series>;

    fn create_focus(&self, context: ComponentContext) -> ChartResult<Self::Focus>;
}
