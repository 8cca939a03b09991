//! Canonical dataset entities and their structural invariants.
//!
//! Every artifact the pipeline produces flows through the types in this
//! module. Hard invariants (ID prefixes, axis cardinality, minimum criteria
//! and policy counts, target-index consistency) are enforced by the fallible
//! constructors: code that would build an invalid entity gets a `ModelError`
//! instead of an object, so no generation path can emit corrupt data.

pub mod entities;
pub mod manifest;

pub use entities::{
    example_id, test_case_id, DatasetExample, DialogFormat, DialogMessage, Evidence, InputData,
    Policy, PolicyKind, SourceKind, TestCase, UseCase, EXAMPLE_PREFIX, POLICY_PREFIX,
    ROLE_OPERATOR, ROLE_USER, TEST_CASE_PREFIX, USE_CASE_PREFIX,
};
pub use manifest::{ArtifactCounts, LlmSettings, RunManifest};
