// pipeguard-core/src/domain/quality/rule.rs

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::domain::batch::{Record, Value};

/// Classification of a rule, as exposed in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    Presence,
    Format,
    Range,
    Membership,
    CrossField,
}

/// Compiled form of a rule check. Patterns are compiled once, when the gate is built.
#[derive(Debug, Clone)]
pub enum RuleKind {
    Presence {
        column: String,
    },
    Format {
        column: String,
        pattern: Regex,
    },
    Range {
        column: String,
        min: f64,
        max: f64,
    },
    DateRange {
        column: String,
        min: NaiveDate,
        max: NaiveDate,
    },
    Membership {
        column: String,
        allowed: BTreeSet<String>,
    },
    DateOrder {
        start_column: String,
        end_column: String,
    },
    DurationDays {
        start_column: String,
        end_column: String,
        min_days: i64,
        max_days: i64,
    },
    RatioCap {
        numerator: String,
        denominator: String,
        max_ratio: f64,
    },
    RatioWindow {
        numerator: String,
        denominator: String,
        min_ratio: f64,
        max_ratio: f64,
    },
}

/// Result of one rule on one record.
#[derive(Debug, Clone, PartialEq)]
pub enum Check {
    Pass,
    /// Inputs missing; presence is some other rule's business.
    Skip,
    Violation(String),
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    pub kind: RuleKind,
    pub mandatory: bool,
}

impl Rule {
    pub fn new(name: impl Into<String>, kind: RuleKind, mandatory: bool) -> Self {
        Self {
            name: name.into(),
            kind,
            mandatory,
        }
    }

    pub fn category(&self) -> RuleCategory {
        match self.kind {
            RuleKind::Presence { .. } => RuleCategory::Presence,
            RuleKind::Format { .. } => RuleCategory::Format,
            RuleKind::Range { .. } | RuleKind::DateRange { .. } => RuleCategory::Range,
            RuleKind::Membership { .. } => RuleCategory::Membership,
            RuleKind::DateOrder { .. }
            | RuleKind::DurationDays { .. }
            | RuleKind::RatioCap { .. }
            | RuleKind::RatioWindow { .. } => RuleCategory::CrossField,
        }
    }

    /// Columns the rule reads, in declaration order.
    pub fn columns(&self) -> Vec<&str> {
        match &self.kind {
            RuleKind::Presence { column }
            | RuleKind::Format { column, .. }
            | RuleKind::Range { column, .. }
            | RuleKind::DateRange { column, .. }
            | RuleKind::Membership { column, .. } => vec![column.as_str()],
            RuleKind::DateOrder {
                start_column,
                end_column,
            }
            | RuleKind::DurationDays {
                start_column,
                end_column,
                ..
            } => vec![start_column.as_str(), end_column.as_str()],
            RuleKind::RatioCap {
                numerator,
                denominator,
                ..
            }
            | RuleKind::RatioWindow {
                numerator,
                denominator,
                ..
            } => vec![numerator.as_str(), denominator.as_str()],
        }
    }

    pub fn check(&self, record: &Record) -> Check {
        match &self.kind {
            RuleKind::Presence { column } => match field(record, column) {
                Some(_) => Check::Pass,
                None => Check::Violation("null".to_string()),
            },

            RuleKind::Format { column, pattern } => match field(record, column) {
                None => Check::Skip,
                Some(v) => {
                    let text = v.to_string();
                    if pattern.is_match(&text) {
                        Check::Pass
                    } else {
                        Check::Violation(text)
                    }
                }
            },

            RuleKind::Range { column, min, max } => match field(record, column) {
                None => Check::Skip,
                Some(v) => match v.as_f64() {
                    Some(n) if n >= *min && n <= *max => Check::Pass,
                    _ => Check::Violation(v.to_string()),
                },
            },

            RuleKind::DateRange { column, min, max } => match field(record, column) {
                None => Check::Skip,
                Some(v) => match v.as_date() {
                    Some(d) if d >= *min && d <= *max => Check::Pass,
                    _ => Check::Violation(v.to_string()),
                },
            },

            RuleKind::Membership { column, allowed } => match field(record, column) {
                None => Check::Skip,
                Some(v) => {
                    let text = v.to_string();
                    if allowed.contains(&text) {
                        Check::Pass
                    } else {
                        Check::Violation(text)
                    }
                }
            },

            RuleKind::DateOrder {
                start_column,
                end_column,
            } => match pair(record, start_column, end_column) {
                None => Check::Skip,
                Some((start, end)) => match (start.as_date(), end.as_date()) {
                    (Some(s), Some(e)) if e > s => Check::Pass,
                    _ => Check::Violation(format!("{} -> {}", start, end)),
                },
            },

            RuleKind::DurationDays {
                start_column,
                end_column,
                min_days,
                max_days,
            } => match pair(record, start_column, end_column) {
                None => Check::Skip,
                Some((start, end)) => match (start.as_date(), end.as_date()) {
                    (Some(s), Some(e)) => {
                        let days = (e - s).num_days();
                        if days >= *min_days && days <= *max_days {
                            Check::Pass
                        } else {
                            Check::Violation(format!("{} days", days))
                        }
                    }
                    _ => Check::Violation(format!("{} -> {}", start, end)),
                },
            },

            RuleKind::RatioCap {
                numerator,
                denominator,
                max_ratio,
            } => match ratio(record, numerator, denominator) {
                Ratio::Missing => Check::Skip,
                Ratio::Value(r) if r <= *max_ratio => Check::Pass,
                Ratio::Value(r) => Check::Violation(format!("{:.4}", r)),
                Ratio::Invalid(raw) => Check::Violation(raw),
            },

            RuleKind::RatioWindow {
                numerator,
                denominator,
                min_ratio,
                max_ratio,
            } => match ratio(record, numerator, denominator) {
                Ratio::Missing => Check::Skip,
                Ratio::Value(r) if r >= *min_ratio && r <= *max_ratio => Check::Pass,
                Ratio::Value(r) => Check::Violation(format!("{:.4}", r)),
                Ratio::Invalid(raw) => Check::Violation(raw),
            },
        }
    }
}

fn field<'a>(record: &'a Record, column: &str) -> Option<&'a Value> {
    record.get(column).filter(|v| !v.is_missing())
}

fn pair<'a>(record: &'a Record, left: &str, right: &str) -> Option<(&'a Value, &'a Value)> {
    Some((field(record, left)?, field(record, right)?))
}

enum Ratio {
    Missing,
    Value(f64),
    Invalid(String),
}

fn ratio(record: &Record, numerator: &str, denominator: &str) -> Ratio {
    let Some((num, den)) = pair(record, numerator, denominator) else {
        return Ratio::Missing;
    };
    match (num.as_f64(), den.as_f64()) {
        (Some(n), Some(d)) if d != 0.0 => Ratio::Value(n / d),
        _ => Ratio::Invalid(format!("{} / {}", num, den)),
    }
}
