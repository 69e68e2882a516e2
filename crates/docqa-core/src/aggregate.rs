//! Per-rule verdict aggregation with bounded failure sampling.
//!
//! Counts combine by addition, so merging partial aggregates is commutative
//! and associative: batch order and the number of workers cannot change the
//! totals. Samples keep the first `capacity` failures seen (no eviction);
//! their contents depend on arrival order, which only matters when several
//! workers feed the same collection.

use std::collections::BTreeMap;

use docqa_contracts::{
    report::{AggregateResult, FailureSample},
    rule::{Evaluation, Verdict},
};

use crate::{
    path::{Matched, PathMatch},
    plan::{CompiledRule, ValidationPlan},
};

/// Running totals for one rule.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleAggregate {
    evaluated: u64,
    passed: u64,
    fail_by_kind: BTreeMap<Verdict, u64>,
    samples: Vec<FailureSample>,
    capacity: usize,
}

impl RuleAggregate {
    /// An empty aggregate retaining at most `capacity` failure samples.
    pub fn new(capacity: usize) -> Self {
        Self {
            evaluated: 0,
            passed: 0,
            fail_by_kind: BTreeMap::new(),
            samples: Vec::new(),
            capacity,
        }
    }

    /// Record one verdict.
    pub fn record(&mut self, document_id: &str, matched: &PathMatch<'_>, evaluation: Evaluation) {
        self.evaluated += 1;
        if evaluation.verdict.is_pass() {
            self.passed += 1;
            return;
        }

        *self.fail_by_kind.entry(evaluation.verdict).or_insert(0) += 1;

        if self.samples.len() < self.capacity {
            let value = match matched.value {
                Matched::Value(v) => Some(v.clone()),
                Matched::Null => Some(serde_json::Value::Null),
                Matched::Absent => None,
            };
            self.samples.push(FailureSample {
                document_id: document_id.to_string(),
                location: matched.location.to_string(),
                value,
                verdict: evaluation.verdict,
                detail: evaluation.detail,
            });
        }
    }

    /// Fold `other` into this aggregate.
    pub fn merge(&mut self, other: RuleAggregate) {
        self.evaluated += other.evaluated;
        self.passed += other.passed;
        for (verdict, count) in other.fail_by_kind {
            *self.fail_by_kind.entry(verdict).or_insert(0) += count;
        }
        let room = self.capacity.saturating_sub(self.samples.len());
        self.samples.extend(other.samples.into_iter().take(room));
    }

    pub fn evaluated(&self) -> u64 {
        self.evaluated
    }

    pub fn passed(&self) -> u64 {
        self.passed
    }

    pub fn failed(&self) -> u64 {
        self.fail_by_kind.values().sum()
    }

    pub fn samples(&self) -> &[FailureSample] {
        &self.samples
    }

    /// Freeze into the report form, labelled with `rule`'s metadata.
    pub fn finalize(self, rule: &CompiledRule) -> AggregateResult {
        let failed = self.failed();
        AggregateResult {
            rule_index: rule.index,
            rule_id: rule.label().to_string(),
            description: rule.spec.description.clone(),
            path: rule.spec.path.clone(),
            kind: rule.spec.kind.clone(),
            evaluated: self.evaluated,
            passed: self.passed,
            failed,
            fail_by_kind: self.fail_by_kind,
            samples: self.samples,
        }
    }
}

/// Aggregates for every rule of a plan, plus document counters.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanAggregate {
    rules: Vec<RuleAggregate>,
    documents: u64,
    documents_failed: u64,
}

impl PlanAggregate {
    pub fn new(rule_count: usize, sample_capacity: usize) -> Self {
        Self {
            rules: (0..rule_count).map(|_| RuleAggregate::new(sample_capacity)).collect(),
            documents: 0,
            documents_failed: 0,
        }
    }

    pub fn for_plan(plan: &ValidationPlan, sample_capacity: usize) -> Self {
        Self::new(plan.len(), sample_capacity)
    }

    pub fn rule(&self, index: usize) -> &RuleAggregate {
        &self.rules[index]
    }

    pub(crate) fn rule_mut(&mut self, index: usize) -> &mut RuleAggregate {
        &mut self.rules[index]
    }

    pub(crate) fn record_document(&mut self, failed: bool) {
        self.documents += 1;
        if failed {
            self.documents_failed += 1;
        }
    }

    pub fn documents(&self) -> u64 {
        self.documents
    }

    pub fn documents_failed(&self) -> u64 {
        self.documents_failed
    }

    /// Fold a partial aggregate for the same plan into this one.
    pub fn merge(&mut self, other: PlanAggregate) {
        debug_assert_eq!(self.rules.len(), other.rules.len());
        self.documents += other.documents;
        self.documents_failed += other.documents_failed;
        for (mine, theirs) in self.rules.iter_mut().zip(other.rules) {
            mine.merge(theirs);
        }
    }

    /// Freeze into one `AggregateResult` per rule, in plan order.
    pub fn finalize(self, plan: &ValidationPlan) -> Vec<AggregateResult> {
        self.rules
            .into_iter()
            .zip(plan.rules())
            .map(|(aggregate, rule)| aggregate.finalize(rule))
            .collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
