// pipeguard-core/src/domain/quality/config.rs

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::domain::error::DomainError;
use crate::domain::quality::gate::QualityGate;
use crate::domain::quality::rule::{Rule, RuleKind};

pub const DEFAULT_MAX_VIOLATION_MESSAGES: usize = 100;

/// Declarative rule as written in `quality.yml`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Validate)]
pub struct RuleSpec {
    #[validate(length(min = 1, message = "Rule name cannot be empty"))]
    pub name: String,

    #[serde(default = "default_mandatory")]
    pub mandatory: bool,

    #[serde(flatten)]
    pub check: CheckSpec,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckSpec {
    Presence {
        column: String,
    },
    Format {
        column: String,
        pattern: String,
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
        values: Vec<String>,
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

/// Quality contract for one table.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Validate)]
pub struct QualityGateConfig {
    #[validate(length(min = 1, message = "Table name cannot be empty"))]
    pub table: String,

    /// Local file holding the batch (CSV or JSON array of objects).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Column used to drop duplicate records before validation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dedupe_key: Option<String>,

    #[serde(default)]
    pub schema: Vec<String>,

    #[serde(default)]
    pub unique_keys: Vec<String>,

    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(default = "default_completeness_threshold")]
    pub completeness_threshold: f64,

    #[validate(range(min = 1))]
    #[serde(default = "default_max_violation_messages")]
    pub max_violation_messages: usize,

    #[validate(nested)]
    #[validate(custom(function = "validate_unique_rule_names"))]
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

fn default_mandatory() -> bool {
    true
}

fn default_completeness_threshold() -> f64 {
    0.95
}

fn default_max_violation_messages() -> usize {
    DEFAULT_MAX_VIOLATION_MESSAGES
}

fn validate_unique_rule_names(rules: &[RuleSpec]) -> Result<(), ValidationError> {
    let mut seen = std::collections::HashSet::new();
    for rule in rules {
        if !seen.insert(rule.name.as_str()) {
            let mut err = ValidationError::new("duplicate_rule_name");
            err.message = Some(format!("Rule '{}' is declared twice", rule.name).into());
            return Err(err);
        }
    }
    Ok(())
}

impl RuleSpec {
    pub fn new(name: impl Into<String>, mandatory: bool, check: CheckSpec) -> Self {
        Self {
            name: name.into(),
            mandatory,
            check,
        }
    }

    pub fn compile(&self) -> Result<Rule, DomainError> {
        let invalid = |reason: String| DomainError::InvalidRule {
            rule: self.name.clone(),
            reason,
        };

        let kind = match &self.check {
            CheckSpec::Presence { column } => RuleKind::Presence {
                column: column.clone(),
            },
            CheckSpec::Format { column, pattern } => RuleKind::Format {
                column: column.clone(),
                pattern: Regex::new(pattern).map_err(|e| invalid(e.to_string()))?,
            },
            CheckSpec::Range { column, min, max } => {
                if min > max {
                    return Err(invalid(format!("min {} is greater than max {}", min, max)));
                }
                RuleKind::Range {
                    column: column.clone(),
                    min: *min,
                    max: *max,
                }
            }
            CheckSpec::DateRange { column, min, max } => {
                if min > max {
                    return Err(invalid(format!("min {} is after max {}", min, max)));
                }
                RuleKind::DateRange {
                    column: column.clone(),
                    min: *min,
                    max: *max,
                }
            }
            CheckSpec::Membership { column, values } => {
                if values.is_empty() {
                    return Err(invalid("membership rule needs at least one value".into()));
                }
                RuleKind::Membership {
                    column: column.clone(),
                    allowed: values.iter().cloned().collect(),
                }
            }
            CheckSpec::DateOrder {
                start_column,
                end_column,
            } => RuleKind::DateOrder {
                start_column: start_column.clone(),
                end_column: end_column.clone(),
            },
            CheckSpec::DurationDays {
                start_column,
                end_column,
                min_days,
                max_days,
            } => {
                if min_days > max_days {
                    return Err(invalid(format!(
                        "min_days {} is greater than max_days {}",
                        min_days, max_days
                    )));
                }
                RuleKind::DurationDays {
                    start_column: start_column.clone(),
                    end_column: end_column.clone(),
                    min_days: *min_days,
                    max_days: *max_days,
                }
            }
            CheckSpec::RatioCap {
                numerator,
                denominator,
                max_ratio,
            } => RuleKind::RatioCap {
                numerator: numerator.clone(),
                denominator: denominator.clone(),
                max_ratio: *max_ratio,
            },
            CheckSpec::RatioWindow {
                numerator,
                denominator,
                min_ratio,
                max_ratio,
            } => {
                if min_ratio > max_ratio {
                    return Err(invalid(format!(
                        "min_ratio {} is greater than max_ratio {}",
                        min_ratio, max_ratio
                    )));
                }
                RuleKind::RatioWindow {
                    numerator: numerator.clone(),
                    denominator: denominator.clone(),
                    min_ratio: *min_ratio,
                    max_ratio: *max_ratio,
                }
            }
        };

        Ok(Rule::new(self.name.clone(), kind, self.mandatory))
    }
}

impl QualityGateConfig {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            source: None,
            dedupe_key: None,
            schema: Vec::new(),
            unique_keys: Vec::new(),
            completeness_threshold: default_completeness_threshold(),
            max_violation_messages: DEFAULT_MAX_VIOLATION_MESSAGES,
            rules: Vec::new(),
        }
    }

    pub fn with_schema<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.schema = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_unique_key(mut self, column: impl Into<String>) -> Self {
        self.unique_keys.push(column.into());
        self
    }

    pub fn with_rule(mut self, rule: RuleSpec) -> Self {
        self.rules.push(rule);
        self
    }

    /// Validates the declaration and compiles every rule.
    pub fn build(&self) -> Result<QualityGate, DomainError> {
        self.validate()
            .map_err(|e| DomainError::InvalidConfig(format!("table '{}': {}", self.table, e)))?;
        QualityGate::new(self)
    }

    /// Contract for the `policies` table of the insurance warehouse.
    pub fn insurance_policies() -> Self {
        let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default();
        let list = |values: &[&str]| values.iter().map(|v| v.to_string()).collect();

        Self::new("policies")
            .with_schema([
                "policy_id",
                "customer_id",
                "premium",
                "start_date",
                "end_date",
                "policy_type",
                "status",
            ])
            .with_unique_key("policy_id")
            .with_rule(RuleSpec::new(
                "policy_id_format",
                true,
                CheckSpec::Format {
                    column: "policy_id".into(),
                    pattern: r"^POL\d{3,}$".into(),
                },
            ))
            .with_rule(RuleSpec::new(
                "customer_id_format",
                true,
                CheckSpec::Format {
                    column: "customer_id".into(),
                    pattern: r"^CUST\d{3,}$".into(),
                },
            ))
            .with_rule(RuleSpec::new(
                "agent_id_format",
                false,
                CheckSpec::Format {
                    column: "agent_id".into(),
                    pattern: r"^AGT\d{3,}$".into(),
                },
            ))
            .with_rule(RuleSpec::new(
                "premium_range",
                true,
                CheckSpec::Range {
                    column: "premium".into(),
                    min: 100.0,
                    max: 100_000.0,
                },
            ))
            .with_rule(RuleSpec::new(
                "coverage_amount_range",
                true,
                CheckSpec::Range {
                    column: "coverage_amount".into(),
                    min: 1_000.0,
                    max: 10_000_000.0,
                },
            ))
            .with_rule(RuleSpec::new(
                "policy_type_values",
                true,
                CheckSpec::Membership {
                    column: "policy_type".into(),
                    values: list(&["AUTO", "HOME", "LIFE", "HEALTH", "BUSINESS"]),
                },
            ))
            .with_rule(RuleSpec::new(
                "status_values",
                true,
                CheckSpec::Membership {
                    column: "status".into(),
                    values: list(&["ACTIVE", "PENDING", "CANCELLED", "EXPIRED", "SUSPENDED"]),
                },
            ))
            .with_rule(RuleSpec::new(
                "end_after_start",
                true,
                CheckSpec::DateOrder {
                    start_column: "start_date".into(),
                    end_column: "end_date".into(),
                },
            ))
            .with_rule(RuleSpec::new(
                "start_date_window",
                false,
                CheckSpec::DateRange {
                    column: "start_date".into(),
                    min: date(2020, 1, 1),
                    max: date(2030, 12, 31),
                },
            ))
            .with_rule(RuleSpec::new(
                "end_date_window",
                false,
                CheckSpec::DateRange {
                    column: "end_date".into(),
                    min: date(2020, 1, 1),
                    max: date(2030, 12, 31),
                },
            ))
            .with_rule(RuleSpec::new(
                "policy_duration",
                false,
                CheckSpec::DurationDays {
                    start_column: "start_date".into(),
                    end_column: "end_date".into(),
                    min_days: 30,
                    max_days: 365 * 5,
                },
            ))
            .with_rule(RuleSpec::new(
                "deductible_cap",
                true,
                CheckSpec::RatioCap {
                    numerator: "deductible".into(),
                    denominator: "coverage_amount".into(),
                    max_ratio: 0.5,
                },
            ))
            .with_rule(RuleSpec::new(
                "premium_to_coverage",
                false,
                CheckSpec::RatioWindow {
                    numerator: "premium".into(),
                    denominator: "coverage_amount".into(),
                    min_ratio: 0.01,
                    max_ratio: 0.10,
                },
            ))
    }
}
