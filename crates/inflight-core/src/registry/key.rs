use std::borrow::Borrow;
use std::fmt;

/// Key identifying one logical operation instance.
///
/// Identical keys share single-flight semantics; distinct keys are fully
/// independent. Keys should carry the target resource id so that unrelated
/// operations never collide (`update_employee_17`, not `update_employee`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct OperationKey(String);

impl OperationKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Key for an operation on one resource: `"<operation>_<id>"`.
    pub fn scoped(operation: &str, resource_id: impl fmt::Display) -> Self {
        Self(format!("{operation}_{resource_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for OperationKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for OperationKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for OperationKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for OperationKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&OperationKey> for OperationKey {
    fn from(k: &OperationKey) -> Self {
        k.clone()
    }
}
