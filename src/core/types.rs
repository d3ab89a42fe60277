use serde::{Deserialize, Serialize};

use super::error::{CouplingError, CouplingResult};

/// Identity of one module slot: a module-type name plus an instance id.
///
/// Rendered as a single string key, e.g. `"storage_1"`. The instance id is
/// everything after the last underscore, so module-type names may themselves
/// contain underscores (`"fuel_storage_1"` → type `fuel_storage`, instance
/// `1`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotId {
    pub(crate) module_type: String,
    pub(crate) instance: String,
}

impl SlotId {
    /// Create a new slot id from its parts.
    pub fn new(module_type: impl Into<String>, instance: impl Into<String>) -> Self {
        Self {
            module_type: module_type.into(),
            instance: instance.into(),
        }
    }

    /// Parse a slot id from its rendered key form.
    ///
    /// Fails with a configuration error when the key has no underscore or
    /// either part is empty.
    pub fn parse(key: &str) -> CouplingResult<Self> {
        let key = key.trim();
        let split = key.rfind('_').ok_or_else(|| {
            CouplingError::Configuration(format!(
                "slot key '{}' is not of the form <module-type>_<instance>",
                key
            ))
        })?;
        let (module_type, instance) = (&key[..split], &key[split + 1..]);
        if module_type.is_empty() || instance.is_empty() {
            return Err(CouplingError::Configuration(format!(
                "slot key '{}' has an empty module-type or instance part",
                key
            )));
        }
        Ok(Self::new(module_type, instance))
    }

    /// Get the module-type name.
    pub fn module_type(&self) -> &str {
        &self.module_type
    }

    /// Get the instance id.
    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// Render the single-string key form.
    pub fn key(&self) -> String {
        format!("{}_{}", self.module_type, self.instance)
    }
}

impl std::fmt::Display for SlotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.module_type, self.instance)
    }
}
