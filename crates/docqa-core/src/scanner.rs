//! The per-collection scanner.
//!
//! The scanner is the single producer: it owns the source cursor and reads
//! documents in batches. With one worker, batches are evaluated inline on
//! the calling thread. With more, batches travel through a bounded channel
//! to scoped worker threads, each accumulating a private `PlanAggregate`;
//! the partials are merged once the scope ends. The bounded channel blocks
//! the producer while workers lag behind, so fetched documents never pile up.
//!
//! Stopping conditions:
//!
//! - source exhausted, or `max_documents` reached → complete
//! - source yields an error → stop reading, keep what was evaluated
//! - cancel token set → stop reading, discard partials, `DqError::Cancelled`
//! - evaluator panic → stop, discard partials, `DqError::EngineDefect`

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread;

use tracing::{debug, warn};

use docqa_contracts::{
    document::{ScannedDocument, SourceError},
    error::{DqError, DqResult},
};

use crate::{
    aggregate::PlanAggregate,
    plan::ValidationPlan,
    traits::{DocumentSource, DocumentStream},
};

/// Tuning for one collection scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSettings {
    /// Documents per batch pulled from the cursor.
    pub batch_size: usize,
    /// Evaluation threads. `0` or `1` evaluates inline.
    pub workers: usize,
    /// Batches buffered between producer and workers. `0` means
    /// `2 * workers`.
    pub queue_depth: usize,
    /// Failure samples retained per rule.
    pub sample_capacity: usize,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            batch_size: 500,
            workers: 1,
            queue_depth: 0,
            sample_capacity: 25,
        }
    }
}

impl ScanSettings {
    fn effective_queue_depth(&self) -> usize {
        if self.queue_depth == 0 {
            self.workers.max(1) * 2
        } else {
            self.queue_depth
        }
    }
}

/// Shared flag an operator sets to abort the run.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What a scan produced.
#[derive(Debug)]
pub struct ScanOutcome {
    pub aggregate: PlanAggregate,
    /// Set when the source failed and the scan stopped early.
    pub interrupted: Option<SourceError>,
}

/// Reads a document stream in fixed-size batches, stopping at the first
/// source error or at the document limit.
struct BatchReader<'s> {
    stream: DocumentStream<'s>,
    batch_size: usize,
    remaining: Option<u64>,
    error: Option<SourceError>,
    done: bool,
}

impl<'s> BatchReader<'s> {
    fn new(stream: DocumentStream<'s>, batch_size: usize, limit: Option<u64>) -> Self {
        Self {
            stream,
            batch_size: batch_size.max(1),
            remaining: limit,
            error: None,
            done: false,
        }
    }

    fn next_batch(&mut self) -> Option<Vec<ScannedDocument>> {
        if self.done {
            return None;
        }

        let mut batch = Vec::with_capacity(self.batch_size);
        while batch.len() < self.batch_size {
            if self.remaining == Some(0) {
                self.done = true;
                break;
            }
            match self.stream.next() {
                Some(Ok(document)) => {
                    batch.push(document);
                    if let Some(remaining) = self.remaining.as_mut() {
                        *remaining -= 1;
                    }
                }
                Some(Err(e)) => {
                    self.error = Some(e);
                    self.done = true;
                    break;
                }
                None => {
                    self.done = true;
                    break;
                }
            }
        }

        if batch.is_empty() {
            None
        } else {
            Some(batch)
        }
    }
}

/// Scans one collection against its plan.
pub struct Scanner<'a> {
    plan: &'a ValidationPlan,
    source: &'a dyn DocumentSource,
    settings: &'a ScanSettings,
    cancel: &'a CancelToken,
}

impl<'a> Scanner<'a> {
    pub fn new(
        plan: &'a ValidationPlan,
        source: &'a dyn DocumentSource,
        settings: &'a ScanSettings,
        cancel: &'a CancelToken,
    ) -> Self {
        Self {
            plan,
            source,
            settings,
            cancel,
        }
    }

    /// Read up to `limit` documents and evaluate every rule against each.
    pub fn scan(&self, limit: Option<u64>) -> DqResult<ScanOutcome> {
        let collection = self.plan.collection();

        let stream = match self.source.scan(collection, None) {
            Ok(stream) => stream,
            Err(e) => {
                warn!(collection, error = %e, "could not open cursor");
                return Ok(ScanOutcome {
                    aggregate: PlanAggregate::for_plan(self.plan, self.settings.sample_capacity),
                    interrupted: Some(e),
                });
            }
        };

        let mut reader = BatchReader::new(stream, self.settings.batch_size, limit);
        let aggregate = if self.settings.workers <= 1 {
            self.scan_inline(&mut reader)?
        } else {
            self.scan_parallel(&mut reader)?
        };

        if let Some(e) = &reader.error {
            warn!(
                collection,
                documents = aggregate.documents(),
                error = %e,
                "source failed mid-scan; results are partial"
            );
        }

        Ok(ScanOutcome {
            aggregate,
            interrupted: reader.error.take(),
        })
    }

    fn cancelled(&self) -> DqError {
        DqError::Cancelled {
            collection: self.plan.collection().to_string(),
        }
    }

    fn scan_inline(&self, reader: &mut BatchReader<'_>) -> DqResult<PlanAggregate> {
        let mut aggregate = PlanAggregate::for_plan(self.plan, self.settings.sample_capacity);

        loop {
            if self.cancel.is_cancelled() {
                return Err(self.cancelled());
            }
            let Some(batch) = reader.next_batch() else {
                break;
            };
            for document in &batch {
                self.plan.evaluate_document(document, &mut aggregate)?;
            }
            debug!(
                collection = self.plan.collection(),
                batch = batch.len(),
                total = aggregate.documents(),
                "batch evaluated"
            );
        }

        Ok(aggregate)
    }

    fn scan_parallel(&self, reader: &mut BatchReader<'_>) -> DqResult<PlanAggregate> {
        let plan = self.plan;
        let capacity = self.settings.sample_capacity;
        let (tx, rx) = crossbeam_channel::bounded::<Vec<ScannedDocument>>(
            self.settings.effective_queue_depth(),
        );
        let abort = AtomicBool::new(false);
        let mut cancelled = false;

        let results: Vec<DqResult<PlanAggregate>> = thread::scope(|s| {
            let handles: Vec<_> = (0..self.settings.workers)
                .map(|worker| {
                    let rx = rx.clone();
                    let abort = &abort;
                    s.spawn(move || {
                        let mut partial = PlanAggregate::for_plan(plan, capacity);
                        for batch in rx.iter() {
                            if abort.load(Ordering::Relaxed) {
                                break;
                            }
                            for document in &batch {
                                if let Err(e) = plan.evaluate_document(document, &mut partial) {
                                    abort.store(true, Ordering::Relaxed);
                                    return Err(e);
                                }
                            }
                        }
                        debug!(
                            collection = plan.collection(),
                            worker,
                            documents = partial.documents(),
                            "worker finished"
                        );
                        Ok(partial)
                    })
                })
                .collect();
            drop(rx);

            // Single producer: only this thread touches the cursor.
            loop {
                if self.cancel.is_cancelled() {
                    cancelled = true;
                    break;
                }
                if abort.load(Ordering::Relaxed) {
                    break;
                }
                let Some(batch) = reader.next_batch() else {
                    break;
                };
                if tx.send(batch).is_err() {
                    break;
                }
            }
            drop(tx);

            handles
                .into_iter()
                .map(|h| {
                    h.join().unwrap_or_else(|_| {
                        Err(DqError::EngineDefect {
                            collection: plan.collection().to_string(),
                            document_id: "unknown".to_string(),
                            rule: "unknown".to_string(),
                            reason: "worker thread panicked".to_string(),
                        })
                    })
                })
                .collect()
        });

        if cancelled {
            return Err(self.cancelled());
        }

        let mut merged = PlanAggregate::for_plan(plan, capacity);
        for result in results {
            merged.merge(result?);
        }
        Ok(merged)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::{json, Map, Value};

    use docqa_contracts::{
        document::{ScannedDocument, SourceError, SourceResult},
        error::DqError,
        rule::{Evaluation, FieldRuleSpec, Verdict},
    };

    use super::{CancelToken, ScanSettings, Scanner};
    use crate::{
        plan::{compile, ValidationPlan},
        traits::{DocumentSource, DocumentStream, Evaluator, RuleBinder},
    };

    // ── Mock helpers ──────────────────────────────────────────────────────────

    /// Passes non-negative numbers, fails everything else with FAIL_RANGE.
    struct NonNegative;

    impl Evaluator for NonNegative {
        fn check(&self, value: &Value) -> Evaluation {
            match value.as_f64() {
                Some(n) if n >= 0.0 => Evaluation::pass(),
                _ => Evaluation::fail(Verdict::FailRange, "negative"),
            }
        }
    }

    struct Binder;

    impl RuleBinder for Binder {
        fn bind(
            &self,
            _kind: &str,
            _params: &Map<String, Value>,
        ) -> Result<Box<dyn Evaluator>, String> {
            Ok(Box::new(NonNegative))
        }
    }

    /// Serves `docs`, optionally failing after `fail_after` documents, and
    /// counts how many documents were pulled.
    struct VecSource {
        docs: Vec<Value>,
        fail_after: Option<usize>,
        pulled: AtomicUsize,
    }

    impl VecSource {
        fn new(docs: Vec<Value>) -> Self {
            Self { docs, fail_after: None, pulled: AtomicUsize::new(0) }
        }
    }

    impl DocumentSource for VecSource {
        fn collection_exists(&self, _name: &str) -> SourceResult<bool> {
            Ok(true)
        }

        fn count(&self, _name: &str) -> SourceResult<u64> {
            Ok(self.docs.len() as u64)
        }

        fn scan(&self, _name: &str, _resume_from: Option<u64>) -> SourceResult<DocumentStream<'_>> {
            let fail_after = self.fail_after;
            let pulled = &self.pulled;
            Ok(Box::new(self.docs.iter().enumerate().map(move |(i, body)| {
                if fail_after == Some(i) {
                    return Err(SourceError::fatal("cursor lost"));
                }
                pulled.fetch_add(1, Ordering::SeqCst);
                Ok(ScannedDocument::new(i as u64, body.clone()))
            })))
        }
    }

    fn plan() -> ValidationPlan {
        compile("metrics", &[FieldRuleSpec::new("values[]", "non-negative")], &Binder).unwrap()
    }

    /// 100 documents, each with two values; every 10th document has a
    /// negative second value.
    fn docs() -> Vec<Value> {
        (0..100)
            .map(|i| {
                let second = if i % 10 == 0 { -1 } else { i };
                json!({ "_id": format!("m-{i}"), "values": [i, second] })
            })
            .collect()
    }

    fn settings(workers: usize) -> ScanSettings {
        ScanSettings { batch_size: 7, workers, queue_depth: 0, sample_capacity: 4 }
    }

    // ── Tests ─────────────────────────────────────────────────────────────────

    #[test]
    fn inline_scan_counts_every_match() {
        let plan = plan();
        let source = VecSource::new(docs());
        let outcome = Scanner::new(&plan, &source, &settings(1), &CancelToken::new())
            .scan(None)
            .unwrap();

        assert!(outcome.interrupted.is_none());
        assert_eq!(outcome.aggregate.documents(), 100);
        assert_eq!(outcome.aggregate.documents_failed(), 10);

        let rule = outcome.aggregate.rule(0);
        assert_eq!(rule.evaluated(), 200);
        assert_eq!(rule.failed(), 10);
        assert_eq!(rule.samples().len(), 4);
        assert_eq!(rule.samples()[0].document_id, "m-0");
        assert_eq!(rule.samples()[0].location, "values[1]");
    }

    #[test]
    fn worker_pool_matches_inline_totals() {
        let plan = plan();
        let source = VecSource::new(docs());
        let inline = Scanner::new(&plan, &source, &settings(1), &CancelToken::new())
            .scan(None)
            .unwrap();
        let pooled = Scanner::new(&plan, &source, &settings(4), &CancelToken::new())
            .scan(None)
            .unwrap();

        let (a, b) = (inline.aggregate.rule(0), pooled.aggregate.rule(0));
        assert_eq!(a.evaluated(), b.evaluated());
        assert_eq!(a.passed(), b.passed());
        assert_eq!(a.failed(), b.failed());
        assert_eq!(inline.aggregate.documents(), pooled.aggregate.documents());
        assert_eq!(pooled.aggregate.documents_failed(), 10);
        assert_eq!(b.samples().len(), 4);
    }

    #[test]
    fn limit_caps_documents_read() {
        let plan = plan();
        let source = VecSource::new(docs());
        let outcome = Scanner::new(&plan, &source, &settings(1), &CancelToken::new())
            .scan(Some(15))
            .unwrap();

        assert_eq!(outcome.aggregate.documents(), 15);
        assert!(outcome.interrupted.is_none());
        assert_eq!(source.pulled.load(Ordering::SeqCst), 15);
    }

    #[test]
    fn source_error_keeps_partial_results() {
        let plan = plan();
        let mut source = VecSource::new(docs());
        source.fail_after = Some(30);

        for workers in [1, 3] {
            let outcome = Scanner::new(&plan, &source, &settings(workers), &CancelToken::new())
                .scan(None)
                .unwrap();
            assert_eq!(outcome.aggregate.documents(), 30, "workers = {workers}");
            assert_eq!(
                outcome.interrupted.as_ref().map(|e| e.reason.as_str()),
                Some("cursor lost")
            );
        }
    }

    #[test]
    fn cancelled_scan_discards_results() {
        let plan = plan();
        let source = VecSource::new(docs());
        let cancel = CancelToken::new();
        cancel.cancel();

        for workers in [1, 2] {
            let result = Scanner::new(&plan, &source, &settings(workers), &cancel).scan(None);
            match result {
                Err(DqError::Cancelled { collection }) => assert_eq!(collection, "metrics"),
                other => panic!(
                    "expected Cancelled, got {:?}",
                    other.map(|o| o.aggregate.documents())
                ),
            }
        }
        assert_eq!(source.pulled.load(Ordering::SeqCst), 0, "no documents read after cancel");
    }

    #[test]
    fn empty_collection_scans_cleanly() {
        let plan = plan();
        let source = VecSource::new(vec![]);
        let outcome = Scanner::new(&plan, &source, &settings(2), &CancelToken::new())
            .scan(None)
            .unwrap();
        assert_eq!(outcome.aggregate.documents(), 0);
        assert_eq!(outcome.aggregate.rule(0).evaluated(), 0);
    }
}
