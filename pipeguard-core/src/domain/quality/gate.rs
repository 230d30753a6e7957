// pipeguard-core/src/domain/quality/gate.rs

use std::collections::HashSet;

use crate::domain::batch::{Batch, Value};
use crate::domain::error::DomainError;
use crate::domain::quality::config::QualityGateConfig;
use crate::domain::quality::report::{
    ColumnScore, GateFailure, QualityReport, RuleResult, Verdict, Violation,
};
use crate::domain::quality::rule::{Check, Rule, RuleCategory};

/// Compiled quality contract for one table.
///
/// Evaluation is a pure function of the batch: no I/O, no interior state, so a
/// single gate can be shared across threads and run over independent batches.
#[derive(Debug, Clone)]
pub struct QualityGate {
    table: String,
    schema: Vec<String>,
    unique_keys: Vec<String>,
    completeness_threshold: f64,
    max_violation_messages: usize,
    rules: Vec<Rule>,
}

impl QualityGate {
    pub fn new(config: &QualityGateConfig) -> Result<Self, DomainError> {
        let rules = config
            .rules
            .iter()
            .map(|spec| spec.compile())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            table: config.table.clone(),
            schema: config.schema.clone(),
            unique_keys: config.unique_keys.clone(),
            completeness_threshold: config.completeness_threshold,
            max_violation_messages: config.max_violation_messages.max(1),
            rules,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn evaluate(&self, batch: &Batch) -> Result<QualityReport, DomainError> {
        if batch.is_empty() {
            return Err(DomainError::EmptyBatch(self.table.clone()));
        }

        let declared = self.declared_columns(batch);
        let mut scored: Vec<&str> = declared.clone();
        for key in &self.unique_keys {
            if !scored.contains(&key.as_str()) {
                scored.push(key);
            }
        }

        let columns: Vec<ColumnScore> = scored.iter().map(|c| score_column(batch, c)).collect();

        let mut rules: Vec<RuleResult> = declared
            .iter()
            .map(|c| self.presence_result(batch, c))
            .collect();
        let mut rejected = vec![false; batch.len()];
        for rule in &self.rules {
            rules.push(self.rule_result(batch, rule, &mut rejected));
        }

        let failures = self.failures(&declared, &columns, &rules);
        let verdict = if failures.is_empty() {
            Verdict::Pass
        } else {
            Verdict::Fail
        };

        Ok(QualityReport {
            table: self.table.clone(),
            total_records: batch.len(),
            rejected_records: rejected.iter().filter(|r| **r).count(),
            columns,
            unique_keys: self.unique_keys.clone(),
            rules,
            verdict,
            failures,
        })
    }

    /// Gate schema first, then any extra column the batch itself declares.
    fn declared_columns<'a>(&'a self, batch: &'a Batch) -> Vec<&'a str> {
        let mut declared: Vec<&str> = self.schema.iter().map(String::as_str).collect();
        for column in &batch.schema {
            if !declared.contains(&column.as_str()) {
                declared.push(column);
            }
        }
        declared
    }

    fn presence_result(&self, batch: &Batch, column: &str) -> RuleResult {
        let name = format!("{}_present", column);
        let mut collector = Collector::new(&name, self.max_violation_messages);
        for (row, record) in batch.records.iter().enumerate() {
            match record.get(column) {
                Some(v) if !v.is_missing() => collector.pass(),
                Some(v) => collector.violation(row, v.to_string()),
                None => collector.violation(row, "absent".to_string()),
            }
        }
        collector.finish(RuleCategory::Presence, false)
    }

    /// `rejected` marks the rows that break a mandatory rule.
    fn rule_result(&self, batch: &Batch, rule: &Rule, rejected: &mut [bool]) -> RuleResult {
        let mut collector = Collector::new(&rule.name, self.max_violation_messages);
        for (row, record) in batch.records.iter().enumerate() {
            match rule.check(record) {
                Check::Pass => collector.pass(),
                Check::Skip => {}
                Check::Violation(value) => {
                    if rule.mandatory {
                        rejected[row] = true;
                    }
                    collector.violation(row, value);
                }
            }
        }
        collector.finish(rule.category(), rule.mandatory)
    }

    fn failures(
        &self,
        declared: &[&str],
        columns: &[ColumnScore],
        rules: &[RuleResult],
    ) -> Vec<GateFailure> {
        let mut failures: Vec<GateFailure> = rules
            .iter()
            .filter(|r| r.mandatory && r.violation_count > 0)
            .map(|r| GateFailure::MandatoryRule {
                rule: r.rule.clone(),
                violations: r.violation_count,
            })
            .collect();

        for score in columns {
            if declared.contains(&score.column.as_str())
                && score.completeness < self.completeness_threshold
            {
                failures.push(GateFailure::Completeness {
                    column: score.column.clone(),
                    value: score.completeness,
                    threshold: self.completeness_threshold,
                });
            }
        }

        for key in &self.unique_keys {
            if let Some(score) = columns.iter().find(|c| &c.column == key) {
                if score.uniqueness < 1.0 {
                    failures.push(GateFailure::Uniqueness {
                        column: key.clone(),
                        value: score.uniqueness,
                    });
                }
            }
        }

        failures
    }
}

fn score_column(batch: &Batch, column: &str) -> ColumnScore {
    let mut non_null = 0usize;
    let mut distinct = HashSet::new();

    for key in batch
        .records
        .iter()
        .filter_map(|r| r.get(column))
        .filter_map(Value::key)
    {
        non_null += 1;
        distinct.insert(key);
    }

    let completeness = non_null as f64 / batch.len() as f64;
    let uniqueness = if non_null == 0 {
        0.0
    } else {
        distinct.len() as f64 / non_null as f64
    };

    ColumnScore {
        column: column.to_string(),
        non_null,
        distinct: distinct.len(),
        completeness,
        uniqueness,
    }
}

/// Accumulates violations for one rule, keeping at most `cap` messages.
struct Collector<'a> {
    rule: &'a str,
    cap: usize,
    checked: usize,
    count: usize,
    violations: Vec<Violation>,
}

impl<'a> Collector<'a> {
    fn new(rule: &'a str, cap: usize) -> Self {
        Self {
            rule,
            cap,
            checked: 0,
            count: 0,
            violations: Vec::new(),
        }
    }

    fn pass(&mut self) {
        self.checked += 1;
    }

    fn violation(&mut self, row: usize, value: String) {
        self.checked += 1;
        self.count += 1;
        if self.violations.len() < self.cap {
            self.violations.push(Violation {
                rule: self.rule.to_string(),
                row,
                message: format!("{} failed at row {}: '{}'", self.rule, row, value),
                value,
            });
        }
    }

    fn finish(self, category: RuleCategory, mandatory: bool) -> RuleResult {
        RuleResult {
            rule: self.rule.to_string(),
            category,
            mandatory,
            checked: self.checked,
            violation_count: self.count,
            truncated: self.count > self.violations.len(),
            violations: self.violations,
        }
    }
}
