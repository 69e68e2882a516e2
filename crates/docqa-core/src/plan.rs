//! Validation plan compilation and per-document evaluation.
//!
//! `compile` turns a collection's ordered `FieldRuleSpec`s into a
//! `ValidationPlan`: each spec's path is parsed and its kind bound to an
//! evaluator through a `RuleBinder`. All problems in a rule list are
//! collected before returning so operators can fix the configuration in one
//! pass.
//!
//! Rules are independent. Every rule is evaluated for every document and no
//! rule's verdict can influence another's; plan order only affects how
//! results are listed.

use std::panic::{self, AssertUnwindSafe};

use serde_json::Value;
use tracing::debug;

use docqa_contracts::{
    document::ScannedDocument,
    error::{DqError, DqResult},
    rule::{Evaluation, FieldRuleSpec},
};

use crate::{
    aggregate::{PlanAggregate, RuleAggregate},
    path::{resolve, PathMatch, PathPattern},
    traits::{Evaluator, RuleBinder},
};

/// One rule ready for execution.
pub struct CompiledRule {
    /// Position in the plan, used to address its aggregate.
    pub index: usize,
    pub spec: FieldRuleSpec,
    pub pattern: PathPattern,
    label: String,
    evaluator: Box<dyn Evaluator>,
}

impl CompiledRule {
    /// The name this rule is reported under.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Resolve this rule's path and evaluate every match.
    pub fn evaluate<'d>(&self, document: &'d Value) -> Vec<(PathMatch<'d>, Evaluation)> {
        resolve(document, &self.pattern)
            .into_iter()
            .map(|m| {
                let evaluation = self.evaluator.evaluate(&m.value);
                (m, evaluation)
            })
            .collect()
    }

    /// Evaluate against one document and record the verdicts. Returns true
    /// if any verdict failed.
    fn apply(&self, document: &ScannedDocument, aggregate: &mut RuleAggregate) -> bool {
        let mut failed = false;
        for (matched, evaluation) in self.evaluate(&document.body) {
            failed |= !evaluation.verdict.is_pass();
            aggregate.record(&document.id, &matched, evaluation);
        }
        failed
    }
}

impl std::fmt::Debug for CompiledRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledRule")
            .field("index", &self.index)
            .field("label", &self.label)
            .field("pattern", &self.pattern.as_str())
            .finish_non_exhaustive()
    }
}

/// The compiled, read-only rule set for one collection.
#[derive(Debug)]
pub struct ValidationPlan {
    collection: String,
    rules: Vec<CompiledRule>,
}

impl ValidationPlan {
    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluate every rule against `document`, recording into `aggregate`.
    ///
    /// A panic inside an evaluator is an engine defect: it is caught and
    /// returned as `DqError::EngineDefect` naming the document and rule.
    pub fn evaluate_document(
        &self,
        document: &ScannedDocument,
        aggregate: &mut PlanAggregate,
    ) -> DqResult<()> {
        let mut document_failed = false;

        for rule in &self.rules {
            let rule_aggregate = aggregate.rule_mut(rule.index);
            let outcome =
                panic::catch_unwind(AssertUnwindSafe(|| rule.apply(document, rule_aggregate)));

            match outcome {
                Ok(failed) => document_failed |= failed,
                Err(payload) => {
                    return Err(DqError::EngineDefect {
                        collection: self.collection.clone(),
                        document_id: document.id.clone(),
                        rule: rule.label.clone(),
                        reason: panic_message(payload.as_ref()),
                    });
                }
            }
        }

        aggregate.record_document(document_failed);
        Ok(())
    }
}

/// Compile `specs` for `collection`.
///
/// Fails with `DqError::ConfigError` when a path is malformed, a kind is
/// unknown to `binder`, or a kind's parameters are missing or invalid.
pub fn compile(
    collection: &str,
    specs: &[FieldRuleSpec],
    binder: &dyn RuleBinder,
) -> DqResult<ValidationPlan> {
    let mut rules = Vec::with_capacity(specs.len());
    let mut problems: Vec<String> = Vec::new();

    for (index, spec) in specs.iter().enumerate() {
        let label = spec.label();

        let pattern = PathPattern::parse(&spec.path)
            .map_err(|e| problems.push(format!("rule {} ({label}): {e}", index + 1)));
        let evaluator = binder
            .bind(&spec.kind, &spec.params)
            .map_err(|reason| problems.push(format!("rule {} ({label}): {reason}", index + 1)));

        if let (Ok(pattern), Ok(evaluator)) = (pattern, evaluator) {
            debug!(collection, rule = %label, path = %pattern, "compiled rule");
            rules.push(CompiledRule {
                index,
                spec: spec.clone(),
                pattern,
                label,
                evaluator,
            });
        }
    }

    if !problems.is_empty() {
        return Err(DqError::config(collection, problems.join("; ")));
    }

    Ok(ValidationPlan {
        collection: collection.to_string(),
        rules,
    })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "evaluator panicked".to_string()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::{json, Map, Value};

    use docqa_contracts::{
        document::ScannedDocument,
        error::DqError,
        rule::{Evaluation, FieldRuleSpec, Verdict},
    };

    use super::compile;
    use crate::{
        aggregate::PlanAggregate,
        traits::{Evaluator, RuleBinder},
    };

    // ── Mock helpers ──────────────────────────────────────────────────────────

    /// Passes strings equal to "ok", fails everything else with FAIL_VALUE.
    struct EqualsOk;

    impl Evaluator for EqualsOk {
        fn check(&self, value: &Value) -> Evaluation {
            if value == "ok" {
                Evaluation::pass()
            } else {
                Evaluation::fail(Verdict::FailValue, format!("{value} is not ok"))
            }
        }
    }

    struct Panics;

    impl Evaluator for Panics {
        fn check(&self, _value: &Value) -> Evaluation {
            panic!("boom");
        }
    }

    /// Knows "equals-ok" and "panics"; "equals-ok" rejects any params.
    struct MockBinder;

    impl RuleBinder for MockBinder {
        fn bind(
            &self,
            kind: &str,
            params: &Map<String, Value>,
        ) -> Result<Box<dyn Evaluator>, String> {
            match kind {
                "equals-ok" if params.is_empty() => Ok(Box::new(EqualsOk)),
                "equals-ok" => Err("equals-ok takes no parameters".to_string()),
                "panics" => Ok(Box::new(Panics)),
                other => Err(format!("unknown rule kind '{other}'")),
            }
        }
    }

    fn doc(body: Value) -> ScannedDocument {
        ScannedDocument::new(0, body)
    }

    // ── Compilation ───────────────────────────────────────────────────────────

    #[test]
    fn compiles_rules_in_declared_order() {
        let specs = vec![
            FieldRuleSpec::new("a", "equals-ok"),
            FieldRuleSpec::new("b[].c", "equals-ok").with_id("nested"),
        ];
        let plan = compile("orders", &specs, &MockBinder).unwrap();

        assert_eq!(plan.collection(), "orders");
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.rules()[0].label(), "equals-ok:a");
        assert_eq!(plan.rules()[1].label(), "nested");
        assert_eq!(plan.rules()[1].index, 1);
    }

    #[test]
    fn empty_rule_list_compiles_to_empty_plan() {
        let plan = compile("orders", &[], &MockBinder).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn compile_collects_every_problem() {
        let specs = vec![
            FieldRuleSpec::new("a..b", "equals-ok"),
            FieldRuleSpec::new("ok", "regex"),
            FieldRuleSpec::new("ok", "equals-ok").with_param("x", json!(1)),
        ];

        match compile("orders", &specs, &MockBinder) {
            Err(DqError::ConfigError { collection, reason }) => {
                assert_eq!(collection, "orders");
                assert!(reason.contains("rule 1"), "missing path problem: {reason}");
                assert!(reason.contains("unknown rule kind 'regex'"), "{reason}");
                assert!(reason.contains("takes no parameters"), "{reason}");
            }
            other => panic!("expected ConfigError, got {:?}", other),
        }
    }

    // ── Evaluation ────────────────────────────────────────────────────────────

    #[test]
    fn every_rule_runs_even_after_failures() {
        let specs = vec![
            FieldRuleSpec::new("order_total", "equals-ok"),
            FieldRuleSpec::new("status", "equals-ok"),
        ];
        let plan = compile("orders", &specs, &MockBinder).unwrap();
        let mut agg = PlanAggregate::for_plan(&plan, 10);

        plan.evaluate_document(&doc(json!({ "status": "ok" })), &mut agg).unwrap();

        let results = agg.finalize(&plan);
        assert_eq!(results[0].fail_by_kind.get(&Verdict::FailMissing), Some(&1));
        assert_eq!(results[1].passed, 1);
        assert_eq!(results[1].failed, 0);
    }

    #[test]
    fn wildcard_rule_produces_one_verdict_per_match() {
        let plan = compile("orders", &[FieldRuleSpec::new("items[].v", "equals-ok")], &MockBinder)
            .unwrap();

        let verdicts: Vec<Verdict> = plan.rules()[0]
            .evaluate(&json!({ "items": [{ "v": "ok" }, { "v": "no" }, { "v": null }] }))
            .into_iter()
            .map(|(_, e)| e.verdict)
            .collect();

        assert_eq!(verdicts, vec![Verdict::Pass, Verdict::FailValue, Verdict::FailNull]);
    }

    #[test]
    fn panicking_evaluator_is_reported_as_engine_defect() {
        let specs = vec![FieldRuleSpec::new("a", "panics").with_id("bad-rule")];
        let plan = compile("orders", &specs, &MockBinder).unwrap();
        let mut agg = PlanAggregate::for_plan(&plan, 10);

        let err = plan
            .evaluate_document(&doc(json!({ "_id": "o-1", "a": 1 })), &mut agg)
            .unwrap_err();

        match err {
            DqError::EngineDefect { collection, document_id, rule, reason } => {
                assert_eq!(collection, "orders");
                assert_eq!(document_id, "o-1");
                assert_eq!(rule, "bad-rule");
                assert_eq!(reason, "boom");
            }
            other => panic!("expected EngineDefect, got {:?}", other),
        }
    }
}
