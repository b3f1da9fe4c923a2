use serde::{Deserialize, Serialize};

/// One logical versioned artifact lineage: a `(model_id, filename)` pair.
///
/// Every upload targets exactly one slot. Retention limits, pending-file
/// uniqueness and upload mutual exclusion are all scoped to a slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Slot {
    pub model_id: String,
    pub filename: String,
}

impl Slot {
    /// Create a new slot key.
    pub fn new(model_id: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            filename: filename.into(),
        }
    }

    /// Name of the distributed lock guarding uploads into this slot.
    #[must_use]
    pub fn lock_name(&self) -> String {
        format!("slot:{}:{}", self.model_id, self.filename)
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.model_id, self.filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_name_is_scoped_to_model_and_filename() {
        let slot = Slot::new("m-1", "weights.bin");
        assert_eq!(slot.lock_name(), "slot:m-1:weights.bin");
        assert_ne!(
            slot.lock_name(),
            Slot::new("m-2", "weights.bin").lock_name()
        );
    }

    #[test]
    fn display() {
        assert_eq!(Slot::new("m", "f").to_string(), "m/f");
    }
}
