// pipeguard-core/src/domain/quality/report.rs

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::quality::rule::RuleCategory;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Pass,
    Fail,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Pass => write!(f, "pass"),
            Verdict::Fail => write!(f, "fail"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnScore {
    pub column: String,
    pub non_null: usize,
    pub distinct: usize,
    pub completeness: f64,
    pub uniqueness: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub rule: String,
    pub row: usize,
    pub value: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleResult {
    pub rule: String,
    pub category: RuleCategory,
    pub mandatory: bool,
    /// Records on which the rule had inputs to judge.
    pub checked: usize,
    pub violation_count: usize,
    pub violations: Vec<Violation>,
    /// More violations happened than were stored.
    pub truncated: bool,
}

impl RuleResult {
    pub fn validity(&self) -> Option<f64> {
        if self.checked == 0 {
            return None;
        }
        Some((self.checked - self.violation_count) as f64 / self.checked as f64)
    }
}

/// Why a report failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum GateFailure {
    MandatoryRule {
        rule: String,
        violations: usize,
    },
    Completeness {
        column: String,
        value: f64,
        threshold: f64,
    },
    Uniqueness {
        column: String,
        value: f64,
    },
}

impl fmt::Display for GateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateFailure::MandatoryRule { rule, violations } => {
                write!(f, "mandatory rule '{}' has {} violation(s)", rule, violations)
            }
            GateFailure::Completeness {
                column,
                value,
                threshold,
            } => write!(
                f,
                "completeness of '{}' is {:.2}% (threshold {:.2}%)",
                column,
                value * 100.0,
                threshold * 100.0
            ),
            GateFailure::Uniqueness { column, value } => write!(
                f,
                "unique key '{}' has duplicates (uniqueness {:.2}%)",
                column,
                value * 100.0
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub table: String,
    pub total_records: usize,
    /// Records breaking at least one mandatory rule, counted once each.
    #[serde(default)]
    pub rejected_records: usize,
    pub columns: Vec<ColumnScore>,
    pub unique_keys: Vec<String>,
    pub rules: Vec<RuleResult>,
    pub verdict: Verdict,
    pub failures: Vec<GateFailure>,
}

impl QualityReport {
    pub fn passed(&self) -> bool {
        self.verdict == Verdict::Pass
    }

    pub fn column(&self, name: &str) -> Option<&ColumnScore> {
        self.columns.iter().find(|c| c.column == name)
    }

    pub fn completeness(&self, column: &str) -> Option<f64> {
        self.column(column).map(|c| c.completeness)
    }

    pub fn uniqueness(&self, column: &str) -> Option<f64> {
        self.column(column).map(|c| c.uniqueness)
    }

    pub fn rule(&self, name: &str) -> Option<&RuleResult> {
        self.rules.iter().find(|r| r.rule == name)
    }

    pub fn total_violations(&self) -> usize {
        self.rules.iter().map(|r| r.violation_count).sum()
    }

    /// Non-null cells over all cells of the scored columns.
    pub fn overall_completeness(&self) -> Option<f64> {
        let cells = self.total_records * self.columns.len();
        if cells == 0 {
            return None;
        }
        let filled: usize = self.columns.iter().map(|c| c.non_null).sum();
        Some(filled as f64 / cells as f64)
    }

    /// Lowest uniqueness among the unique-key columns.
    pub fn key_uniqueness(&self) -> Option<f64> {
        self.unique_keys
            .iter()
            .filter_map(|k| self.uniqueness(k))
            .reduce(f64::min)
    }

    /// Share of passing checks across every non-presence rule.
    pub fn overall_validity(&self) -> Option<f64> {
        let (checked, violations) = self
            .rules
            .iter()
            .filter(|r| r.category != RuleCategory::Presence)
            .fold((0usize, 0usize), |(c, v), r| {
                (c + r.checked, v + r.violation_count)
            });
        if checked == 0 {
            return None;
        }
        Some((checked - violations) as f64 / checked as f64)
    }

    pub fn summary_line(&self) -> String {
        format!(
            "{}: {} records, {} violations, verdict={}",
            self.table,
            self.total_records,
            self.total_violations(),
            self.verdict
        )
    }
}
