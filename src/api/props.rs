use serde_json::Value;

use crate::core::{Accessor, AccessorTable, ChartConfig};

/// Partial `{data, config, accessors}` passed to `Facade::new` and
/// `Facade::update`. Anything left empty keeps its current value.
#[derive(Debug, Clone, Default)]
pub struct ChartProps {
    pub data: Option<Value>,
    pub config: ChartConfig,
    pub accessors: AccessorTable,
}

impl ChartProps {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: ChartConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.set(key, value);
        self
    }

    #[must_use]
    pub fn with_accessor(mut self, role: impl Into<String>, accessor: Accessor) -> Self {
        self.accessors.set(role, accessor);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_none() && self.config.is_empty() && self.accessors.is_empty()
    }
}
