//! Test suites: definitions, the registry, and the built-in catalog.

pub mod catalog;
pub mod definition;
pub mod registry;

pub use definition::{
    Category, Complexity, ExpectedCall, ExpectedValue, Expectation, FieldType, TestDefinition,
    TestKind,
};
pub use registry::{RunFilter, Suite, SuiteRegistry};
