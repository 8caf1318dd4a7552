//! Mutation types for dependency manifests.

use crate::manifest::ManifestError;

/// The kind of change applied to a manifest entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOp {
    /// Insert the dependency, or replace its version if already present.
    Add,

    /// Delete the dependency. Removing an absent entry is a no-op.
    Remove,

    /// Replace the version of an existing dependency, inserting it if absent.
    Upgrade,
}

impl MutationOp {
    /// Returns the operation as a string for logging.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Remove => "remove",
            Self::Upgrade => "upgrade",
        }
    }
}

/// A single change to a named entry in a dependency manifest.
#[derive(Debug, Clone)]
pub struct ManifestMutation {
    /// Name of the dependency entry to add/remove/modify.
    pub dependency_name: String,

    /// Target version; absent for a removal.
    pub target_version: Option<String>,

    /// What to do with the entry.
    pub operation: MutationOp,
}

impl ManifestMutation {
    /// Creates a mutation that adds a dependency at the given version.
    #[must_use]
    pub fn add(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            dependency_name: name.into(),
            target_version: Some(version.into()),
            operation: MutationOp::Add,
        }
    }

    /// Creates a mutation that upgrades a dependency to the given version.
    #[must_use]
    pub fn upgrade(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            dependency_name: name.into(),
            target_version: Some(version.into()),
            operation: MutationOp::Upgrade,
        }
    }

    /// Creates a mutation that removes a dependency.
    #[must_use]
    pub fn remove(name: impl Into<String>) -> Self {
        Self {
            dependency_name: name.into(),
            target_version: None,
            operation: MutationOp::Remove,
        }
    }

    /// Checks the mutation's internal consistency.
    ///
    /// `Remove` must not carry a version; `Add` and `Upgrade` require a
    /// non-empty one.
    pub fn validate(&self) -> Result<(), ManifestError> {
        match self.operation {
            MutationOp::Remove => {
                if self.target_version.is_some() {
                    return Err(ManifestError::InvalidMutation {
                        name: self.dependency_name.clone(),
                        message: "a removal must not specify a target version".to_string(),
                    });
                }
            }
            MutationOp::Add | MutationOp::Upgrade => {
                if self.target_version.as_deref().unwrap_or("").is_empty() {
                    return Err(ManifestError::InvalidMutation {
                        name: self.dependency_name.clone(),
                        message: format!(
                            "operation '{}' requires a non-empty target version",
                            self.operation.as_str()
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remove_rejects_target_version() {
        let mutation = ManifestMutation {
            dependency_name: "app-a".to_string(),
            target_version: Some("1.0.0".to_string()),
            operation: MutationOp::Remove,
        };
        assert!(matches!(
            mutation.validate(),
            Err(ManifestError::InvalidMutation { .. })
        ));
    }

    #[test]
    fn upgrade_requires_version() {
        let mutation = ManifestMutation {
            dependency_name: "app-a".to_string(),
            target_version: None,
            operation: MutationOp::Upgrade,
        };
        assert!(mutation.validate().is_err());

        let empty = ManifestMutation {
            dependency_name: "app-a".to_string(),
            target_version: Some(String::new()),
            operation: MutationOp::Add,
        };
        assert!(empty.validate().is_err());
    }

    #[test]
    fn constructors_are_valid() {
        assert!(ManifestMutation::add("a", "1.0.0").validate().is_ok());
        assert!(ManifestMutation::upgrade("a", "2.0.0").validate().is_ok());
        assert!(ManifestMutation::remove("a").validate().is_ok());
    }
}
