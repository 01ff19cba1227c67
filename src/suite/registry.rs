//! Suite registry: ordered, immutable test collections.
//!
//! Suites register once at startup and are read-only for the rest of the
//! process. Iteration preserves declared order because tests carry data-flow
//! dependencies (loading precedes querying).

use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RegistryError;

use super::definition::TestDefinition;

/// A named, ordered collection of related tests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suite {
    /// Stable identifier, unique within a registry.
    pub id: String,
    /// Human-readable name.
    #[serde(default)]
    pub name: String,
    /// One-line description.
    #[serde(default)]
    pub description: String,
    /// Tests in declared order.
    #[serde(default)]
    tests: Vec<TestDefinition>,
}

impl Suite {
    /// Creates an empty suite.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            tests: Vec::new(),
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Appends a test, preserving declared order.
    pub fn add_test(mut self, test: TestDefinition) -> Self {
        self.tests.push(test);
        self
    }

    /// Tests in declared order.
    pub fn tests(&self) -> &[TestDefinition] {
        &self.tests
    }

    /// Number of tests in the suite.
    pub fn len(&self) -> usize {
        self.tests.len()
    }

    /// True when the suite has no tests.
    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }
}

/// Runtime filter over suites and tests, supplied per run.
#[derive(Debug, Clone, Default)]
pub struct RunFilter {
    /// When set, only these suites run.
    pub suite_ids: Option<BTreeSet<String>>,
    /// When set, only these tests run.
    pub test_ids: Option<BTreeSet<String>>,
}

impl RunFilter {
    /// Runs everything.
    pub fn all() -> Self {
        Self::default()
    }

    /// Restricts the run to the given suites.
    pub fn suites<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            suite_ids: Some(ids.into_iter().map(Into::into).collect()),
            test_ids: None,
        }
    }

    /// Restricts the run to the given tests.
    pub fn tests<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            suite_ids: None,
            test_ids: Some(ids.into_iter().map(Into::into).collect()),
        }
    }
}

/// Holds suites in declared order; read-only after construction.
#[derive(Debug, Default)]
pub struct SuiteRegistry {
    suites: Vec<Suite>,
}

impl SuiteRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a suite, running the schema check on every test.
    ///
    /// Tests loaded from suite files may omit `suite_id` and `name`; both
    /// are filled in here.
    pub fn register(&mut self, mut suite: Suite) -> Result<(), RegistryError> {
        if suite.id.trim().is_empty() {
            return Err(RegistryError::InvalidDefinition {
                id: String::new(),
                reason: "suite id must not be empty".to_string(),
            });
        }
        if self.suites.iter().any(|s| s.id == suite.id) {
            return Err(RegistryError::DuplicateSuite(suite.id));
        }

        let mut seen = HashSet::new();
        for test in &mut suite.tests {
            if test.suite_id.is_empty() {
                test.suite_id = suite.id.clone();
            }
            if test.name.is_empty() {
                test.name = test.id.clone();
            }
            test.validate().map_err(|reason| {
                RegistryError::InvalidDefinition {
                    id: test.id.clone(),
                    reason,
                }
            })?;
            if !seen.insert(test.id.clone()) {
                return Err(RegistryError::InvalidDefinition {
                    id: test.id.clone(),
                    reason: format!("duplicate test id within suite '{}'", suite.id),
                });
            }
        }

        debug!(suite_id = %suite.id, tests = suite.len(), "Registered suite");
        self.suites.push(suite);
        Ok(())
    }

    /// Loads and registers a suite from a YAML file.
    pub fn register_yaml_file(&mut self, path: &Path) -> Result<(), RegistryError> {
        let contents = std::fs::read_to_string(path)?;
        self.register_yaml(&contents)
    }

    /// Loads and registers a suite from YAML text.
    pub fn register_yaml(&mut self, yaml: &str) -> Result<(), RegistryError> {
        let suite: Suite = serde_yaml::from_str(yaml)?;
        self.register(suite)
    }

    /// Suites in declared order.
    pub fn suites(&self) -> &[Suite] {
        &self.suites
    }

    /// Looks up a suite by id.
    pub fn get(&self, suite_id: &str) -> Result<&Suite, RegistryError> {
        self.suites
            .iter()
            .find(|s| s.id == suite_id)
            .ok_or_else(|| RegistryError::SuiteNotFound(suite_id.to_string()))
    }

    /// Total number of tests across all suites.
    pub fn test_count(&self) -> usize {
        self.suites.iter().map(Suite::len).sum()
    }

    /// Resolves a filter to `(suite, selected tests)` pairs in declared
    /// order. Unknown suite or test ids fail before the run starts.
    pub fn select<'a>(
        &'a self,
        filter: &RunFilter,
    ) -> Result<Vec<(&'a Suite, Vec<&'a TestDefinition>)>, RegistryError> {
        if let Some(ref wanted) = filter.suite_ids {
            for id in wanted {
                if !self.suites.iter().any(|s| &s.id == id) {
                    return Err(RegistryError::SuiteNotFound(id.clone()));
                }
            }
        }
        if let Some(ref wanted) = filter.test_ids {
            for id in wanted {
                let known = self
                    .suites
                    .iter()
                    .flat_map(|s| s.tests())
                    .any(|t| &t.id == id);
                if !known {
                    return Err(RegistryError::TestNotFound(id.clone()));
                }
            }
        }

        let mut selected = Vec::new();
        for suite in &self.suites {
            if let Some(ref wanted) = filter.suite_ids {
                if !wanted.contains(&suite.id) {
                    continue;
                }
            }
            let tests: Vec<&TestDefinition> = suite
                .tests()
                .iter()
                .filter(|t| {
                    filter
                        .test_ids
                        .as_ref()
                        .is_none_or(|wanted| wanted.contains(&t.id))
                })
                .collect();
            if !tests.is_empty() {
                selected.push((suite, tests));
            }
        }
        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suite::definition::{ExpectedCall, Expectation};

    fn test_def(id: &str) -> TestDefinition {
        TestDefinition::new(
            id,
            "",
            "Compute the GC content",
            Expectation::call(ExpectedCall::new("compute_gc")),
            5,
        )
    }

    fn sample_registry() -> SuiteRegistry {
        let mut registry = SuiteRegistry::new();
        registry
            .register(
                Suite::new("loading", "Data loading")
                    .add_test(test_def("load-001"))
                    .add_test(test_def("load-002")),
            )
            .unwrap();
        registry
            .register(Suite::new("analysis", "Analysis").add_test(test_def("gc-001")))
            .unwrap();
        registry
    }

    #[test]
    fn test_register_fills_suite_id_and_name() {
        let registry = sample_registry();
        let suite = registry.get("loading").unwrap();
        assert_eq!(suite.tests()[0].suite_id, "loading");
        assert_eq!(suite.tests()[0].name, "load-001");
    }

    #[test]
    fn test_duplicate_suite_rejected() {
        let mut registry = sample_registry();
        let result = registry.register(Suite::new("loading", "Again"));
        assert!(matches!(result, Err(RegistryError::DuplicateSuite(_))));
    }

    #[test]
    fn test_duplicate_test_id_rejected() {
        let mut registry = SuiteRegistry::new();
        let result = registry.register(
            Suite::new("s", "S")
                .add_test(test_def("t-001"))
                .add_test(test_def("t-001")),
        );
        assert!(matches!(
            result,
            Err(RegistryError::InvalidDefinition { .. })
        ));
    }

    #[test]
    fn test_invalid_definition_rejected() {
        let mut registry = SuiteRegistry::new();
        let mut bad = test_def("t-001");
        bad.max_score = 0;
        let result = registry.register(Suite::new("s", "S").add_test(bad));
        assert!(matches!(
            result,
            Err(RegistryError::InvalidDefinition { .. })
        ));
    }

    #[test]
    fn test_select_all_preserves_order() {
        let registry = sample_registry();
        let selected = registry.select(&RunFilter::all()).unwrap();
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].0.id, "loading");
        assert_eq!(selected[0].1.len(), 2);
        assert_eq!(selected[1].0.id, "analysis");
    }

    #[test]
    fn test_select_by_suite() {
        let registry = sample_registry();
        let selected = registry
            .select(&RunFilter::suites(vec!["analysis"]))
            .unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].0.id, "analysis");
    }

    #[test]
    fn test_select_by_test_id() {
        let registry = sample_registry();
        let selected = registry.select(&RunFilter::tests(vec!["load-002"])).unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].1.len(), 1);
        assert_eq!(selected[0].1[0].id, "load-002");
    }

    #[test]
    fn test_unknown_suite_fails_before_run() {
        let registry = sample_registry();
        let result = registry.select(&RunFilter::suites(vec!["nope"]));
        assert!(matches!(result, Err(RegistryError::SuiteNotFound(_))));
    }

    #[test]
    fn test_unknown_test_fails_before_run() {
        let registry = sample_registry();
        let result = registry.select(&RunFilter::tests(vec!["nope-001"]));
        assert!(matches!(result, Err(RegistryError::TestNotFound(_))));
    }

    #[test]
    fn test_register_from_yaml() {
        let yaml = r#"
id: navigation
name: Navigation
description: Coordinate jumps and gene lookups
tests:
  - id: nav-001
    category: navigation
    instruction: "Search for the gene \"lacZ\"."
    max_score: 5
    expected:
      type: function_call
      calls:
        - tool_name: search_gene_by_name
          parameters:
            name: lacZ
"#;
        let mut registry = SuiteRegistry::new();
        registry.register_yaml(yaml).unwrap();
        let suite = registry.get("navigation").unwrap();
        assert_eq!(suite.len(), 1);
        assert_eq!(suite.tests()[0].suite_id, "navigation");
        assert_eq!(suite.tests()[0].max_score, 5);
    }
}
