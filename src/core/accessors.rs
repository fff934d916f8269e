use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::{ChartError, ChartResult};

type AccessorFn = dyn Fn(&Value) -> Result<Value, String>;

/// Pure extraction function from one raw data element to a role value.
///
/// Raw data stays opaque to the core; accessors are the only code that
/// interprets its shape. A failing accessor reports a reason string which the
/// caller turns into `ChartError::DataAccessError`.
#[derive(Clone)]
pub struct Accessor {
    inner: Rc<AccessorFn>,
}

impl Accessor {
    pub fn new(f: impl Fn(&Value) -> Result<Value, String> + 'static) -> Self {
        Self { inner: Rc::new(f) }
    }

    /// Reads a required object field.
    pub fn field(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(move |element| {
            element
                .get(&name)
                .cloned()
                .ok_or_else(|| format!("missing field `{name}`"))
        })
    }

    /// Reads an object field, falling back to `default` when absent or null.
    pub fn field_or(name: impl Into<String>, default: Value) -> Self {
        let name = name.into();
        Self::new(move |element| match element.get(&name) {
            None | Some(Value::Null) => Ok(default.clone()),
            Some(value) => Ok(value.clone()),
        })
    }

    pub fn constant(value: Value) -> Self {
        Self::new(move |_| Ok(value.clone()))
    }

    pub fn call(&self, element: &Value) -> Result<Value, String> {
        (self.inner)(element)
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Accessor(..)")
    }
}

/// Role name (dotted, e.g. `node.value`) to accessor.
#[derive(Clone, Default)]
pub struct AccessorTable {
    roles: IndexMap<String, Accessor>,
}

impl AccessorTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, role: impl Into<String>, accessor: Accessor) -> Self {
        self.roles.insert(role.into(), accessor);
        self
    }

    pub fn set(&mut self, role: impl Into<String>, accessor: Accessor) -> Option<Accessor> {
        self.roles.insert(role.into(), accessor)
    }

    #[must_use]
    pub fn get(&self, role: &str) -> Option<&Accessor> {
        self.roles.get(role)
    }

    pub fn require(&self, role: &str) -> ChartResult<&Accessor> {
        self.roles.get(role).ok_or_else(|| {
            ChartError::InvalidData(format!("no accessor registered for role `{role}`"))
        })
    }

    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.roles.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.roles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Role-wise override, same shallow rule as config merging.
    #[must_use]
    pub fn merged(&self, overrides: &Self) -> Self {
        let mut roles = self.roles.clone();
        for (role, accessor) in &overrides.roles {
            roles.insert(role.clone(), accessor.clone());
        }
        Self { roles }
    }

    /// Invokes `role` on `element`, tagging failures with the element index.
    pub fn evaluate(&self, role: &str, index: usize, element: &Value) -> ChartResult<Value> {
        self.require(role)?
            .call(element)
            .map_err(|reason| ChartError::DataAccessError {
                role: role.to_owned(),
                index,
                reason,
            })
    }

    pub fn evaluate_f64(&self, role: &str, index: usize, element: &Value) -> ChartResult<f64> {
        let value = self.evaluate(role, index, element)?;
        value
            .as_f64()
            .filter(|number| number.is_finite())
            .ok_or_else(|| ChartError::DataAccessError {
                role: role.to_owned(),
                index,
                reason: format!("expected a finite number, got {value}"),
            })
    }

    /// Strings pass through, numbers are rendered, anything else fails.
    pub fn evaluate_key(&self, role: &str, index: usize, element: &Value) -> ChartResult<String> {
        match self.evaluate(role, index, element)? {
            Value::String(text) => Ok(text),
            Value::Number(number) => Ok(number.to_string()),
            other => Err(ChartError::DataAccessError {
                role: role.to_owned(),
                index,
                reason: format!("expected a string or number, got {other}"),
            }),
        }
    }

    pub fn evaluate_array(
        &self,
        role: &str,
        index: usize,
        element: &Value,
    ) -> ChartResult<Vec<Value>> {
        match self.evaluate(role, index, element)? {
            Value::Array(items) => Ok(items),
            Value::Null => Ok(Vec::new()),
            other => Err(ChartError::DataAccessError {
                role: role.to_owned(),
                index,
                reason: format!("expected an array, got {other}"),
            }),
        }
    }
}

impl fmt::Debug for AccessorTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.roles.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Accessor, AccessorTable};
    use crate::error::ChartError;

    #[test]
    fn failing_accessor_reports_role_and_index() {
        let table = AccessorTable::new().with("node.value", Accessor::field("value"));

        let err = table
            .evaluate_f64("node.value", 3, &json!({"id": "a"}))
            .expect_err("missing field must fail");

        match err {
            ChartError::DataAccessError { role, index, reason } => {
                assert_eq!(role, "node.value");
                assert_eq!(index, 3);
                assert!(reason.contains("value"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn override_replaces_single_role() {
        let base = AccessorTable::new()
            .with("node.id", Accessor::field("id"))
            .with("node.value", Accessor::field("value"));
        let overrides = AccessorTable::new().with("node.value", Accessor::constant(json!(1)));

        let merged = base.merged(&overrides);

        assert!(merged.get("node.id").expect("id").ptr_eq(base.get("node.id").expect("id")));
        assert_eq!(
            merged.evaluate_f64("node.value", 0, &json!({})).expect("constant"),
            1.0
        );
    }

    #[test]
    fn numeric_keys_render_as_strings() {
        let table = AccessorTable::new().with("node.id", Accessor::field("id"));
        assert_eq!(table.evaluate_key("node.id", 0, &json!({"id": 7})).expect("key"), "7");
    }

    #[test]
    fn missing_role_is_invalid_data() {
        let err = AccessorTable::new()
            .evaluate("node.id", 0, &json!({}))
            .expect_err("unregistered role");
        assert!(matches!(err, ChartError::InvalidData(_)));
    }
}
