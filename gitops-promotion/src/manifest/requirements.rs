//! The dependency-declaration document of an environment repository.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A helm-style `requirements.yaml` document listing the applications
/// deployed to an environment and their versions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Requirements {
    /// Declared application dependencies, in file order.
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
}

/// A single application entry in a [`Requirements`] document.
///
/// Keys this engine does not understand are preserved verbatim through
/// `extra` so a mutation never drops unrelated configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dependency {
    /// Chart/application name.
    pub name: String,

    /// Deployed version.
    pub version: String,

    /// Optional chart repository URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,

    /// Optional alias the entry is deployed under.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    /// Any further keys, carried through untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl Dependency {
    /// Creates a minimal entry with just a name and version.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            repository: None,
            alias: None,
            extra: BTreeMap::new(),
        }
    }

    fn matches(&self, name: &str) -> bool {
        self.name == name || self.alias.as_deref() == Some(name)
    }
}

impl Requirements {
    /// Finds the entry for an application by name or alias.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Dependency> {
        self.dependencies.iter().find(|d| d.matches(name))
    }

    /// Sets the version of an application, inserting a new entry when the
    /// application is not yet declared.
    ///
    /// Returns `true` when the document changed.
    pub fn set_version(&mut self, name: &str, version: &str) -> bool {
        for dependency in &mut self.dependencies {
            if dependency.matches(name) {
                if dependency.version == version {
                    return false;
                }
                dependency.version = version.to_string();
                return true;
            }
        }
        self.dependencies.push(Dependency::new(name, version));
        true
    }

    /// Removes an application entry.
    ///
    /// Returns `true` when the document changed; removing an absent entry
    /// changes nothing.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.dependencies.len();
        self.dependencies.retain(|d| !d.matches(name));
        self.dependencies.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Requirements {
        Requirements {
            dependencies: vec![
                Dependency::new("app-a", "1.0.0"),
                Dependency::new("app-b", "2.3.1"),
            ],
        }
    }

    #[test]
    fn set_version_replaces_existing_entry() {
        let mut requirements = sample();
        assert!(requirements.set_version("app-a", "1.1.0"));
        assert_eq!(requirements.find("app-a").unwrap().version, "1.1.0");
        assert_eq!(requirements.dependencies.len(), 2);
    }

    #[test]
    fn set_version_to_same_value_reports_unchanged() {
        let mut requirements = sample();
        assert!(!requirements.set_version("app-a", "1.0.0"));
    }

    #[test]
    fn set_version_inserts_missing_entry() {
        let mut requirements = sample();
        assert!(requirements.set_version("app-c", "0.1.0"));
        assert_eq!(requirements.dependencies.len(), 3);
        assert_eq!(requirements.dependencies[2].name, "app-c");
    }

    #[test]
    fn remove_deletes_entry_by_alias() {
        let mut requirements = sample();
        requirements.dependencies[1].alias = Some("backend".to_string());
        assert!(requirements.remove("backend"));
        assert_eq!(requirements.dependencies.len(), 1);
    }

    #[test]
    fn remove_missing_entry_reports_unchanged() {
        let mut requirements = sample();
        assert!(!requirements.remove("app-z"));
        assert_eq!(requirements.dependencies.len(), 2);
    }
}
