//! Pure mutation of an environment's dependency manifest.
//!
//! This module applies a single add/remove/upgrade to a `requirements.yaml`
//! style document. Untouched entries keep their order and their unknown keys
//! so a promotion pull request only diffs the entry it changed.

mod error;
mod mutation;
mod requirements;

pub use error::ManifestError;
pub use mutation::{ManifestMutation, MutationOp};
pub use requirements::{Dependency, Requirements};

/// Applies a mutation to a serialized manifest document.
///
/// This is a pure function: it performs no I/O. A mutation that changes
/// nothing (removing an absent entry, or setting a version to its current
/// value) returns the input document byte-identically.
///
/// # Errors
///
/// Returns [`ManifestError::Malformed`] when the document cannot be parsed
/// and [`ManifestError::InvalidMutation`] when the mutation is internally
/// inconsistent.
pub fn apply(document: &str, mutation: &ManifestMutation) -> Result<String, ManifestError> {
    mutation.validate()?;

    let mut requirements: Requirements =
        serde_yaml::from_str(document).map_err(|source| ManifestError::Malformed { source })?;

    let changed = match mutation.operation {
        MutationOp::Add | MutationOp::Upgrade => {
            // validate() guarantees the version is present and non-empty
            let version = mutation.target_version.as_deref().unwrap_or_default();
            requirements.set_version(&mutation.dependency_name, version)
        }
        MutationOp::Remove => requirements.remove(&mutation.dependency_name),
    };

    if !changed {
        return Ok(document.to_string());
    }

    serde_yaml::to_string(&requirements).map_err(|source| ManifestError::Serialize { source })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = "dependencies:
- name: app-a
  version: 1.0.0
- name: app-b
  version: 2.3.1
  repository: https://charts.example.com
";

    #[test]
    fn upgrade_changes_only_the_named_entry() {
        let mutated = apply(DOCUMENT, &ManifestMutation::upgrade("app-a", "1.1.0")).unwrap();
        let requirements: Requirements = serde_yaml::from_str(&mutated).unwrap();

        assert_eq!(requirements.find("app-a").unwrap().version, "1.1.0");
        let untouched = requirements.find("app-b").unwrap();
        assert_eq!(untouched.version, "2.3.1");
        assert_eq!(
            untouched.repository.as_deref(),
            Some("https://charts.example.com")
        );
    }

    #[test]
    fn add_appends_a_new_entry() {
        let mutated = apply(DOCUMENT, &ManifestMutation::add("app-c", "0.1.0")).unwrap();
        let requirements: Requirements = serde_yaml::from_str(&mutated).unwrap();

        assert_eq!(requirements.dependencies.len(), 3);
        assert_eq!(requirements.dependencies[2].name, "app-c");
        assert_eq!(requirements.dependencies[0].name, "app-a");
    }

    #[test]
    fn removing_an_absent_entry_is_byte_identical() {
        let mutated = apply(DOCUMENT, &ManifestMutation::remove("app-z")).unwrap();
        assert_eq!(mutated, DOCUMENT);
    }

    #[test]
    fn upgrading_to_the_current_version_is_byte_identical() {
        let mutated = apply(DOCUMENT, &ManifestMutation::upgrade("app-a", "1.0.0")).unwrap();
        assert_eq!(mutated, DOCUMENT);
    }

    #[test]
    fn apply_then_inverse_preserves_untouched_entries() {
        let upgraded = apply(DOCUMENT, &ManifestMutation::upgrade("app-a", "9.9.9")).unwrap();
        let restored = apply(&upgraded, &ManifestMutation::upgrade("app-a", "1.0.0")).unwrap();

        let before: Requirements = serde_yaml::from_str(DOCUMENT).unwrap();
        let after: Requirements = serde_yaml::from_str(&restored).unwrap();
        assert_eq!(before.dependencies.len(), after.dependencies.len());
        for (b, a) in before.dependencies.iter().zip(after.dependencies.iter()) {
            assert_eq!(b.name, a.name);
            assert_eq!(b.version, a.version);
            assert_eq!(b.repository, a.repository);
        }
    }

    #[test]
    fn unknown_keys_survive_a_mutation() {
        let document = "dependencies:
- name: app-a
  version: 1.0.0
  condition: app-a.enabled
";
        let mutated = apply(document, &ManifestMutation::upgrade("app-a", "2.0.0")).unwrap();
        let requirements: Requirements = serde_yaml::from_str(&mutated).unwrap();
        assert!(requirements.dependencies[0].extra.contains_key("condition"));
    }

    #[test]
    fn malformed_document_is_rejected() {
        let result = apply("dependencies: {not: [a, list", &ManifestMutation::remove("a"));
        assert!(matches!(result, Err(ManifestError::Malformed { .. })));
    }
}
