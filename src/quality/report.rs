//! Quality metrics over a generated example set.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::models::DatasetExample;

/// Markers that flag an input as likely placeholder text.
const PLACEHOLDER_MARKERS: [&str; 4] = ["todo", "tbd", "placeholder", "xxx"];

/// Inputs shorter than this are flagged as suspiciously thin.
const MIN_INPUT_CHARS: usize = 10;

/// Advisory quality metrics for one example set.
#[derive(Debug)]
pub struct QualityReport {
    pub total_examples: usize,
    /// Input texts shared by more than one example, with their counts.
    pub duplicate_inputs: Vec<(String, usize)>,
    pub case_distribution: BTreeMap<String, usize>,
    pub format_distribution: BTreeMap<String, usize>,
    pub generator_distribution: BTreeMap<String, usize>,
    /// Ids of examples whose input looks like placeholder text.
    pub placeholder_examples: Vec<String>,
    pub avg_criteria: f64,
    pub avg_policies: f64,
}

impl QualityReport {
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Quality report ({} examples)", self.total_examples);
        let _ = writeln!(
            out,
            "  avg criteria {:.1}, avg policies {:.1}",
            self.avg_criteria, self.avg_policies
        );
        render_distribution(&mut out, "cases", &self.case_distribution);
        render_distribution(&mut out, "formats", &self.format_distribution);
        render_distribution(&mut out, "generators", &self.generator_distribution);
        if !self.duplicate_inputs.is_empty() {
            let _ = writeln!(out, "  duplicate inputs ({}):", self.duplicate_inputs.len());
            for (text, count) in &self.duplicate_inputs {
                let _ = writeln!(out, "    - {count}x {}", truncate(text, 60));
            }
        }
        if !self.placeholder_examples.is_empty() {
            let _ = writeln!(
                out,
                "  placeholder-looking inputs ({}): {}",
                self.placeholder_examples.len(),
                self.placeholder_examples.join(", ")
            );
        }
        out
    }
}

fn render_distribution(out: &mut String, label: &str, distribution: &BTreeMap<String, usize>) {
    let rendered = distribution
        .iter()
        .map(|(key, count)| format!("{key}={count}"))
        .collect::<Vec<_>>()
        .join(", ");
    let _ = writeln!(out, "  {label}: {rendered}");
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let head: String = text.chars().take(max).collect();
        format!("{head}…")
    }
}

/// Full input text of an example, across all messages.
fn input_text(example: &DatasetExample) -> String {
    example
        .input
        .messages
        .iter()
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

fn looks_placeholder(text: &str) -> bool {
    if text.trim().chars().count() < MIN_INPUT_CHARS {
        return true;
    }
    let lowered = text.to_lowercase();
    PLACEHOLDER_MARKERS.iter().any(|m| lowered.contains(m))
}

/// Computes the advisory metrics for `examples`.
pub fn analyze_examples(examples: &[DatasetExample]) -> QualityReport {
    let mut input_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut case_distribution: BTreeMap<String, usize> = BTreeMap::new();
    let mut format_distribution: BTreeMap<String, usize> = BTreeMap::new();
    let mut generator_distribution: BTreeMap<String, usize> = BTreeMap::new();
    let mut placeholder_examples = Vec::new();
    let mut criteria_total = 0usize;
    let mut policy_total = 0usize;

    for example in examples {
        let text = input_text(example);
        *input_counts.entry(text.clone()).or_default() += 1;
        *case_distribution.entry(example.case.clone()).or_default() += 1;
        *format_distribution
            .entry(example.format.to_string())
            .or_default() += 1;
        let generator = example.generator().unwrap_or("unknown").to_string();
        *generator_distribution.entry(generator).or_default() += 1;

        if looks_placeholder(&text) {
            placeholder_examples.push(example.id.clone());
        }
        criteria_total += example.evaluation_criteria.len();
        policy_total += example.policy_ids.len();
    }

    let duplicate_inputs: Vec<(String, usize)> = input_counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .collect();

    let denom = examples.len().max(1) as f64;
    QualityReport {
        total_examples: examples.len(),
        duplicate_inputs,
        case_distribution,
        format_distribution,
        generator_distribution,
        placeholder_examples,
        avg_criteria: criteria_total as f64 / denom,
        avg_policies: policy_total as f64 / denom,
    }
}
