//! Read/write state container shared by a facade and its components.
//!
//! The store keeps one `MergedConfig` snapshot behind an `Rc`. Every write
//! builds a new snapshot that shares the untouched partitions (and untouched
//! computed keys) with the previous one, so a reader holding an older
//! snapshot never observes a half-applied write.
//!
//! Components never see the store itself. They get a `ReadOnlyState` and, when
//! they produce shared output, a `ComputedWriter` scoped to one path under
//! `computed`. Each top-level computed key has at most one writer.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::core::accessors::AccessorTable;
use crate::core::config::{ChartConfig, ConfigMerger};
use crate::error::{ChartError, ChartResult};

/// Dotted path under the `computed` partition, e.g. `series.nodeLayout`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StatePath {
    segments: SmallVec<[String; 4]>,
}

impl StatePath {
    pub fn new<I, S>(segments: I) -> ChartResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: SmallVec<[String; 4]> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(ChartError::InvalidData(
                "state path must not be empty".to_owned(),
            ));
        }
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(ChartError::InvalidData(
                "state path segments must not be empty".to_owned(),
            ));
        }
        Ok(Self { segments })
    }

    pub fn parse(dotted: &str) -> ChartResult<Self> {
        Self::new(dotted.split('.'))
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Top-level computed key owned by this path.
    #[must_use]
    pub fn root(&self) -> &str {
        self.segments.first().map_or("", String::as_str)
    }

    #[must_use]
    pub fn starts_with(&self, prefix: &Self) -> bool {
        self.segments.len() >= prefix.segments.len()
            && self
                .segments
                .iter()
                .zip(prefix.segments.iter())
                .all(|(a, b)| a == b)
    }

    #[must_use]
    pub fn join(&self, child: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(child.split('.').filter(|s| !s.is_empty()).map(str::to_owned));
        Self { segments }
    }
}

impl fmt::Display for StatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    Data,
    Config,
    Accessors,
    Computed,
}

impl Partition {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::Config => "config",
            Self::Accessors => "accessors",
            Self::Computed => "computed",
        }
    }
}

/// Partial write routed through `StateStore::write`.
#[derive(Debug, Clone)]
pub enum PartitionWrite {
    Data(Value),
    Config(ChartConfig),
    Accessors(AccessorTable),
    /// Always rejected; computed output goes through a `ComputedWriter`.
    Computed(Value),
}

impl PartitionWrite {
    #[must_use]
    pub const fn partition(&self) -> Partition {
        match self {
            Self::Data(_) => Partition::Data,
            Self::Config(_) => Partition::Config,
            Self::Accessors(_) => Partition::Accessors,
            Self::Computed(_) => Partition::Computed,
        }
    }
}

/// Component name to derived output. Values are shared between snapshots
/// until their owner rewrites them.
#[derive(Debug, Clone, Default)]
pub struct ComputedTable {
    entries: IndexMap<String, Rc<Value>>,
}

impl ComputedTable {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key).map(Rc::as_ref)
    }

    #[must_use]
    pub fn get_path(&self, path: &StatePath) -> Option<&Value> {
        let (root, rest) = path.segments().split_first()?;
        rest.iter()
            .try_fold(self.get(root)?, |value, segment| value.get(segment))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn to_value_map(&self) -> IndexMap<String, Value> {
        self.entries
            .iter()
            .map(|(key, value)| (key.clone(), value.as_ref().clone()))
            .collect()
    }

    fn shares_entry_with(&self, other: &Self, key: &str) -> bool {
        match (self.entries.get(key), other.entries.get(key)) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Immutable snapshot of the four state partitions.
#[derive(Debug, Clone)]
pub struct MergedConfig {
    data: Rc<Value>,
    config: Rc<ChartConfig>,
    accessors: Rc<AccessorTable>,
    computed: Rc<ComputedTable>,
}

impl MergedConfig {
    #[must_use]
    pub fn new(data: Value, config: ChartConfig, accessors: AccessorTable) -> Self {
        Self {
            data: Rc::new(data),
            config: Rc::new(config),
            accessors: Rc::new(accessors),
            computed: Rc::new(ComputedTable::default()),
        }
    }

    #[must_use]
    pub fn data(&self) -> &Value {
        &self.data
    }

    #[must_use]
    pub fn config(&self) -> &ChartConfig {
        &self.config
    }

    #[must_use]
    pub fn accessors(&self) -> &AccessorTable {
        &self.accessors
    }

    #[must_use]
    pub fn computed(&self) -> &ComputedTable {
        &self.computed
    }

    /// Deserializes `computed.<key>`; `Ok(None)` before the owner first wrote it.
    pub fn computed_as<T: DeserializeOwned>(&self, key: &str) -> ChartResult<Option<T>> {
        self.computed
            .get(key)
            .map(|value| {
                serde_json::from_value(value.clone()).map_err(|e| {
                    ChartError::InvalidData(format!("computed `{key}` has unexpected shape: {e}"))
                })
            })
            .transpose()
    }

    /// True when both snapshots hold the very same partition allocation.
    #[must_use]
    pub fn shares_partition_with(&self, other: &Self, partition: Partition) -> bool {
        match partition {
            Partition::Data => Rc::ptr_eq(&self.data, &other.data),
            Partition::Config => Rc::ptr_eq(&self.config, &other.config),
            Partition::Accessors => Rc::ptr_eq(&self.accessors, &other.accessors),
            Partition::Computed => Rc::ptr_eq(&self.computed, &other.computed),
        }
    }

    #[must_use]
    pub fn shares_computed_key_with(&self, other: &Self, key: &str) -> bool {
        self.computed.shares_entry_with(&other.computed, key)
    }
}

#[derive(Debug)]
struct StoreInner {
    current: Rc<MergedConfig>,
    grants: IndexMap<String, u64>,
    next_grant: u64,
    generation: u64,
}

impl StoreInner {
    fn replace(&mut self, next: MergedConfig) {
        self.current = Rc::new(next);
        self.generation = self.generation.wrapping_add(1);
    }

    fn grant_is_live(&self, key: &str, token: u64) -> bool {
        self.grants.get(key) == Some(&token)
    }
}

/// Owner of one facade's state. Not clonable: only the facade writes
/// `data`/`config`/`accessors` and hands out scoped capabilities.
#[derive(Debug)]
pub struct StateStore {
    inner: Rc<RefCell<StoreInner>>,
}

impl StateStore {
    #[must_use]
    pub fn new(initial: MergedConfig) -> Self {
        Self {
            inner: Rc::new(RefCell::new(StoreInner {
                current: Rc::new(initial),
                grants: IndexMap::new(),
                next_grant: 0,
                generation: 0,
            })),
        }
    }

    #[must_use]
    pub fn read_only(&self) -> ReadOnlyState {
        ReadOnlyState {
            inner: Rc::clone(&self.inner),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> Rc<MergedConfig> {
        Rc::clone(&self.inner.borrow().current)
    }

    /// Monotonic write counter; bumps on every completed write.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.inner.borrow().generation
    }

    /// Applies a partial write to `data`, `config` or `accessors`.
    ///
    /// Keys present in the partial value replace existing keys; absent keys
    /// keep their previous value.
    pub fn write(&self, update: PartitionWrite) -> ChartResult<()> {
        let mut inner = self.inner.borrow_mut();
        let mut next = MergedConfig::clone(&inner.current);
        match update {
            PartitionWrite::Data(partial) => {
                next.data = Rc::new(ConfigMerger::merge_value(&next.data, &partial));
            }
            PartitionWrite::Config(partial) => {
                next.config = Rc::new(ConfigMerger::merge(&next.config, &partial));
            }
            PartitionWrite::Accessors(partial) => {
                next.accessors = Rc::new(next.accessors.merged(&partial));
            }
            PartitionWrite::Computed(_) => {
                return Err(ChartError::ScopeViolation {
                    granted: "<none>".to_owned(),
                    attempted: Partition::Computed.name().to_owned(),
                });
            }
        }
        inner.replace(next);
        trace!(generation = inner.generation, "state partition written");
        Ok(())
    }

    /// Grants the single writer for `path.root()`.
    pub fn computed_writer(&self, path: StatePath) -> ChartResult<ComputedWriter> {
        let mut inner = self.inner.borrow_mut();
        let key = path.root().to_owned();
        if inner.grants.contains_key(&key) {
            return Err(ChartError::WriterConflict { key });
        }
        let token = inner.next_grant;
        inner.next_grant = inner.next_grant.wrapping_add(1);
        inner.grants.insert(key.clone(), token);
        debug!(key = %key, path = %path, "computed writer granted");
        Ok(ComputedWriter {
            path,
            token,
            inner: Rc::clone(&self.inner),
        })
    }

    #[must_use]
    pub fn has_writer(&self, key: &str) -> bool {
        self.inner.borrow().grants.contains_key(key)
    }

    /// Releases every grant; outstanding writers fail with `HandleClosed`.
    pub fn revoke_writers(&self) {
        let mut inner = self.inner.borrow_mut();
        let released = inner.grants.len();
        inner.grants.clear();
        debug!(released, "computed writers revoked");
    }
}

/// Read-only view handed to components.
#[derive(Debug, Clone)]
pub struct ReadOnlyState {
    inner: Rc<RefCell<StoreInner>>,
}

impl ReadOnlyState {
    /// Consistent with the latest completed write; never mutated afterwards.
    #[must_use]
    pub fn snapshot(&self) -> Rc<MergedConfig> {
        Rc::clone(&self.inner.borrow().current)
    }

    pub fn computed_as<T: DeserializeOwned>(&self, key: &str) -> ChartResult<Option<T>> {
        self.snapshot().computed_as(key)
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.inner.borrow().generation
    }
}

/// Capability to write one subtree of `computed`.
#[derive(Debug)]
pub struct ComputedWriter {
    path: StatePath,
    token: u64,
    inner: Rc<RefCell<StoreInner>>,
}

impl ComputedWriter {
    #[must_use]
    pub fn path(&self) -> &StatePath {
        &self.path
    }

    /// Replaces the value at the granted path.
    pub fn write<T: Serialize>(&self, value: &T) -> ChartResult<()> {
        self.write_at(&self.path, value)
    }

    /// Writes at `path`, which must lie within the granted path.
    pub fn write_at<T: Serialize>(&self, path: &StatePath, value: &T) -> ChartResult<()> {
        if !path.starts_with(&self.path) {
            return Err(ChartError::ScopeViolation {
                granted: self.path.to_string(),
                attempted: path.to_string(),
            });
        }
        let value = serde_json::to_value(value).map_err(|e| {
            ChartError::InvalidData(format!("failed to serialize computed `{path}`: {e}"))
        })?;

        let mut inner = self.inner.borrow_mut();
        if !inner.grant_is_live(self.path.root(), self.token) {
            return Err(ChartError::HandleClosed);
        }

        let mut next = MergedConfig::clone(&inner.current);
        let mut computed = ComputedTable::clone(&next.computed);
        let (root, rest) = match path.segments().split_first() {
            Some(parts) => parts,
            None => return Err(ChartError::InvalidData("empty computed path".to_owned())),
        };
        let mut slot = computed
            .entries
            .get(root)
            .map_or(Value::Null, |existing| existing.as_ref().clone());
        set_nested(&mut slot, rest, value);
        computed.entries.insert(root.clone(), Rc::new(slot));
        next.computed = Rc::new(computed);
        inner.replace(next);
        trace!(path = %path, generation = inner.generation, "computed state written");
        Ok(())
    }

    /// Removes the granted subtree.
    pub fn clear(&self) -> ChartResult<()> {
        let mut inner = self.inner.borrow_mut();
        if !inner.grant_is_live(self.path.root(), self.token) {
            return Err(ChartError::HandleClosed);
        }
        let mut next = MergedConfig::clone(&inner.current);
        let mut computed = ComputedTable::clone(&next.computed);
        computed.entries.shift_remove(self.path.root());
        next.computed = Rc::new(computed);
        inner.replace(next);
        Ok(())
    }
}

fn set_nested(target: &mut Value, segments: &[String], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *target = value;
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(map) = target {
        let slot = map.entry(head.clone()).or_insert(Value::Null);
        set_nested(slot, rest, value);
    }
}
