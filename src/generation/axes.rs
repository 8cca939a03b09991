//! Parameter-axis tables and dominant-axis derivation.
//!
//! Each case (domain) has a fixed table of categorical axes with a neutral
//! default value per axis. Variations are parameter assignments over one
//! table; the 2-3 axes whose values deviate from their defaults become the
//! variation's "dominant" axes, the label of what the test case is testing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// One categorical axis: its value domain and neutral default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Axis {
    pub name: String,
    pub values: Vec<String>,
    /// The neutral value; a variation holding it is not "testing" this axis.
    pub default: String,
}

impl Axis {
    pub fn new(name: &str, values: &[&str], default: &str) -> Self {
        Self {
            name: name.to_string(),
            values: values.iter().map(|v| v.to_string()).collect(),
            default: default.to_string(),
        }
    }
}

/// The axis table for one case, plus the axes used to pad short dominant
/// lists up to the minimum of two.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AxisTable {
    pub case: String,
    pub axes: Vec<Axis>,
    pub pad_axes: Vec<String>,
}

impl AxisTable {
    /// The neutral parameter assignment for this table.
    pub fn defaults(&self) -> BTreeMap<String, String> {
        self.axes
            .iter()
            .map(|axis| (axis.name.clone(), axis.default.clone()))
            .collect()
    }

    /// Looks up an axis by name.
    pub fn axis(&self, name: &str) -> Option<&Axis> {
        self.axes.iter().find(|axis| axis.name == name)
    }
}

/// Fixed priority for choosing dominant axes when more than three deviate
/// from their defaults.
const DOMINANCE_PRIORITY: [&str; 7] = [
    "adversarial",
    "escalation_needed",
    "user_aggression",
    "tone",
    "punctuation_errors",
    "slang_profanity_emoji",
    "requires_account_access",
];

/// Read-only mapping from case identifier to axis table.
///
/// Injected configuration, built once at startup; unknown cases fall back to
/// the default table with a warning.
#[derive(Debug, Clone)]
pub struct AxisConfig {
    tables: BTreeMap<String, AxisTable>,
    default_case: String,
}

impl AxisConfig {
    /// Builds a configuration from explicit tables.
    ///
    /// `default_case` must name one of the tables; falls back to the first
    /// table's case otherwise.
    pub fn new(tables: Vec<AxisTable>, default_case: &str) -> Self {
        let mut map = BTreeMap::new();
        for table in tables {
            map.insert(table.case.clone(), table);
        }
        let default_case = if map.contains_key(default_case) {
            default_case.to_string()
        } else {
            map.keys().next().cloned().unwrap_or_default()
        };
        Self {
            tables: map,
            default_case,
        }
    }

    /// The built-in tables for the shipped cases.
    pub fn builtin() -> Self {
        let dialog_axes = vec![
            Axis::new("tone", &["neutral", "negative", "aggressive"], "neutral"),
            Axis::new("has_order_id", &["true", "false"], "true"),
            Axis::new("requires_account_access", &["true", "false"], "false"),
            Axis::new("language", &["ru", "en"], "ru"),
            Axis::new(
                "adversarial",
                &["none", "profanity", "injection", "garbage"],
                "none",
            ),
        ];

        let support_bot = AxisTable {
            case: "support_bot".to_string(),
            axes: dialog_axes.clone(),
            pad_axes: vec!["tone".to_string(), "adversarial".to_string()],
        };

        let doctor_booking = AxisTable {
            case: "doctor_booking".to_string(),
            axes: dialog_axes,
            pad_axes: vec!["tone".to_string(), "adversarial".to_string()],
        };

        let operator_quality = AxisTable {
            case: "operator_quality".to_string(),
            axes: vec![
                Axis::new("phrase_length", &["short", "medium", "long"], "medium"),
                Axis::new("punctuation_errors", &["none", "minor", "severe"], "none"),
                Axis::new(
                    "slang_profanity_emoji",
                    &["none", "moderate", "excessive"],
                    "none",
                ),
                Axis::new("medical_terms", &["none", "present"], "none"),
                Axis::new(
                    "user_aggression",
                    &["neutral", "frustrated", "angry"],
                    "neutral",
                ),
                Axis::new("escalation_needed", &["no", "yes"], "no"),
            ],
            pad_axes: vec![
                "punctuation_errors".to_string(),
                "user_aggression".to_string(),
            ],
        };

        Self::new(
            vec![support_bot, doctor_booking, operator_quality],
            "support_bot",
        )
    }

    /// The case identifiers this configuration knows.
    pub fn known_cases(&self) -> Vec<&str> {
        self.tables.keys().map(|k| k.as_str()).collect()
    }

    /// The table for `case`, or the default table with a warning when the
    /// case is unknown.
    pub fn table_for(&self, case: &str) -> &AxisTable {
        if let Some(table) = self.tables.get(case) {
            return table;
        }
        warn!(
            case,
            fallback = %self.default_case,
            "Unknown case identifier, using default axis table"
        );
        // default_case always names an entry; new() guarantees it.
        &self.tables[&self.default_case]
    }
}

/// Derives the 2-3 dominant axes of a parameter assignment.
///
/// Non-default axes in table order, trimmed to three by the fixed priority
/// when more deviate, padded with the table's pad axes when fewer than two
/// do.
pub fn dominant_axes(table: &AxisTable, parameters: &BTreeMap<String, String>) -> Vec<String> {
    let mut deviating: Vec<String> = table
        .axes
        .iter()
        .filter(|axis| {
            parameters
                .get(&axis.name)
                .is_some_and(|value| *value != axis.default)
        })
        .map(|axis| axis.name.clone())
        .collect();

    if deviating.len() > 3 {
        let mut chosen: Vec<String> = Vec::with_capacity(3);
        for name in DOMINANCE_PRIORITY {
            if chosen.len() == 3 {
                break;
            }
            if deviating.iter().any(|d| d == name) {
                chosen.push(name.to_string());
            }
        }
        // Priority list may not cover every axis; fill from table order.
        for name in &deviating {
            if chosen.len() == 3 {
                break;
            }
            if !chosen.contains(name) {
                chosen.push(name.clone());
            }
        }
        deviating = chosen;
    }

    let mut pad_iter = table.pad_axes.iter();
    while deviating.len() < 2 {
        match pad_iter.next() {
            Some(pad) if !deviating.contains(pad) => deviating.push(pad.clone()),
            Some(_) => {}
            // Pad axes exhausted; fall back to table order.
            None => {
                let Some(axis) = table
                    .axes
                    .iter()
                    .find(|axis| !deviating.contains(&axis.name))
                else {
                    break;
                };
                deviating.push(axis.name.clone());
            }
        }
    }

    deviating
}
