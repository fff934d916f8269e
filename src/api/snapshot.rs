use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::ChartConfig;
use crate::error::{ChartError, ChartResult};

use super::FacadeState;

pub const FACADE_SNAPSHOT_JSON_SCHEMA_V1: u32 = 1;

/// Serializable state of one facade, used by regression tests and
/// debugging tooling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacadeSnapshot {
    pub visualization: String,
    pub uid: String,
    pub lifecycle: FacadeState,
    pub dirty: bool,
    pub generation: u64,
    pub config: ChartConfig,
    pub computed: IndexMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacadeSnapshotJsonContractV1 {
    pub schema_version: u32,
    pub snapshot: FacadeSnapshot,
}

impl FacadeSnapshot {
    pub fn to_json_contract_v1_pretty(&self) -> ChartResult<String> {
        let payload = FacadeSnapshotJsonContractV1 {
            schema_version: FACADE_SNAPSHOT_JSON_SCHEMA_V1,
            snapshot: self.clone(),
        };
        serde_json::to_string_pretty(&payload).map_err(|e| {
            ChartError::InvalidData(format!("failed to serialize snapshot contract v1: {e}"))
        })
    }

    /// Accepts either a bare snapshot or a versioned contract payload.
    pub fn from_json_compat_str(input: &str) -> ChartResult<Self> {
        if let Ok(snapshot) = serde_json::from_str::<FacadeSnapshot>(input) {
            return Ok(snapshot);
        }
        let payload: FacadeSnapshotJsonContractV1 = serde_json::from_str(input).map_err(|e| {
            ChartError::InvalidData(format!("failed to parse snapshot json payload: {e}"))
        })?;
        if payload.schema_version != FACADE_SNAPSHOT_JSON_SCHEMA_V1 {
            return Err(ChartError::InvalidData(format!(
                "unsupported snapshot schema version: {}",
                payload.schema_version
            )));
        }
        Ok(payload.snapshot)
    }

    /// Typed view of one computed entry.
    pub fn computed_as<T: serde::de::DeserializeOwned>(&self, key: &str) -> ChartResult<Option<T>> {
        self.computed
            .get(key)
            .map(|value| {
                serde_json::from_value(value.clone()).map_err(|e| {
                    ChartError::InvalidData(format!("computed `{key}` has unexpected shape: {e}"))
                })
            })
            .transpose()
    }
}
