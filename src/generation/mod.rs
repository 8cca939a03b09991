//! Test-case and example generation.
//!
//! The pipeline flows variation construction ([`pairwise`] over [`axes`])
//! into format-adapter dispatch ([`formats`]), with synthesis-engine
//! supplements ([`engines`]) and a last-resort generator ([`fallback`])
//! behind the [`orchestrator`] state machine; [`coverage`] is the gate at
//! the end.

pub mod axes;
pub mod classifier;
pub mod coverage;
pub mod engines;
pub mod fallback;
pub mod formats;
pub mod orchestrator;
pub mod pairwise;

pub use axes::{dominant_axes, Axis, AxisConfig, AxisTable};
pub use classifier::{classify_source_kind, detect_case_profile, CaseProfile};
pub use coverage::enforce_coverage;
pub use engines::{adapt_record, builtin_backends, Adapted, NativeRecord, SynthesisBackend};
pub use fallback::generate_fallback_batch;
pub use formats::{adapter_for, ExampleRequest, FormatAdapter};
pub use orchestrator::{Orchestrator, UseCaseArtifacts};
pub use pairwise::{generate_variations, Variation};
