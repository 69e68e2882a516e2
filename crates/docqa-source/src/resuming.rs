//! Retry wrapper for unreliable sources.
//!
//! `ResumingSource` retries transient failures of the wrapped source with
//! exponential backoff. When a cursor fails mid-scan it reopens the cursor
//! after the last bookmark it delivered, so the scanner sees every document
//! once and never twice. The retry budget is per call (per scan for
//! cursors); non-transient errors pass through immediately.

use std::thread;
use std::time::Duration;

use tracing::warn;

use docqa_contracts::document::{ScannedDocument, SourceError, SourceResult};
use docqa_core::traits::{DocumentSource, DocumentStream};

/// Upper bound on the backoff exponent.
const MAX_BACKOFF_SHIFT: u32 = 5;

pub struct ResumingSource<S> {
    inner: S,
    max_retries: u32,
    base_delay: Duration,
}

impl<S: DocumentSource> ResumingSource<S> {
    /// Wrap `inner` with 3 retries and a 100 ms base delay.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            max_retries: 3,
            base_delay: Duration::from_millis(100),
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Delay before retry number `attempt` (1-based).
    fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(MAX_BACKOFF_SHIFT);
        self.base_delay * (1u32 << shift)
    }

    fn retry<T>(&self, op: &str, name: &str, f: impl Fn() -> SourceResult<T>) -> SourceResult<T> {
        let mut attempt = 0;
        loop {
            match f() {
                Err(e) if e.transient && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = self.backoff(attempt);
                    warn!(
                        collection = name,
                        op,
                        attempt,
                        ?delay,
                        error = %e,
                        "retrying source call"
                    );
                    thread::sleep(delay);
                }
                other => return other,
            }
        }
    }
}

impl<S: DocumentSource> DocumentSource for ResumingSource<S> {
    fn collection_exists(&self, name: &str) -> SourceResult<bool> {
        self.retry("collection_exists", name, || self.inner.collection_exists(name))
    }

    fn count(&self, name: &str) -> SourceResult<u64> {
        self.retry("count", name, || self.inner.count(name))
    }

    fn scan(&self, name: &str, resume_from: Option<u64>) -> SourceResult<DocumentStream<'_>> {
        let cursor = self.retry("scan", name, || self.inner.scan(name, resume_from))?;
        Ok(Box::new(ResumingStream {
            source: self,
            name: name.to_string(),
            cursor,
            last_bookmark: resume_from,
            attempts: 0,
            finished: false,
        }))
    }
}

struct ResumingStream<'a, S> {
    source: &'a ResumingSource<S>,
    name: String,
    cursor: DocumentStream<'a>,
    last_bookmark: Option<u64>,
    attempts: u32,
    finished: bool,
}

impl<S: DocumentSource> Iterator for ResumingStream<'_, S> {
    type Item = SourceResult<ScannedDocument>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.finished {
                return None;
            }
            match self.cursor.next() {
                None => return None,
                Some(Ok(doc)) => {
                    self.last_bookmark = Some(doc.bookmark);
                    return Some(Ok(doc));
                }
                Some(Err(e)) if e.transient && self.attempts < self.source.max_retries => {
                    self.attempts += 1;
                    let delay = self.source.backoff(self.attempts);
                    warn!(
                        collection = %self.name,
                        attempt = self.attempts,
                        resume_from = ?self.last_bookmark,
                        ?delay,
                        error = %e,
                        "cursor failed; reopening"
                    );
                    thread::sleep(delay);
                    self.cursor = match self.source.inner.scan(&self.name, self.last_bookmark) {
                        Ok(cursor) => cursor,
                        Err(e) => Box::new(std::iter::once(Err::<ScannedDocument, SourceError>(e))),
                    };
                }
                Some(Err(e)) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use serde_json::json;

    use docqa_contracts::document::{ScannedDocument, SourceError, SourceResult};
    use docqa_core::traits::{DocumentSource, DocumentStream};

    use super::ResumingSource;

    /// Ten documents; each cursor fails (with `error`) after delivering
    /// `per_cursor` documents, until `failures` cursors have failed.
    struct Flaky {
        per_cursor: usize,
        failures: u32,
        error: SourceError,
        opened: AtomicU32,
    }

    impl Flaky {
        fn new(per_cursor: usize, failures: u32, error: SourceError) -> Self {
            Self { per_cursor, failures, error, opened: AtomicU32::new(0) }
        }
    }

    impl DocumentSource for Flaky {
        fn collection_exists(&self, _name: &str) -> SourceResult<bool> {
            Ok(true)
        }

        fn count(&self, _name: &str) -> SourceResult<u64> {
            Ok(10)
        }

        fn scan(
            &self,
            _name: &str,
            resume_from: Option<u64>,
        ) -> SourceResult<DocumentStream<'_>> {
            let opened = self.opened.fetch_add(1, Ordering::SeqCst);
            let start = resume_from.map_or(0, |b| b + 1);
            let docs = (start..10)
                .map(|i| Ok(ScannedDocument::new(i, json!({ "_id": i.to_string() }))));

            if opened < self.failures {
                let error = self.error.clone();
                Ok(Box::new(docs.take(self.per_cursor).chain(std::iter::once(Err(error)))))
            } else {
                Ok(Box::new(docs))
            }
        }
    }

    fn wrap(inner: Flaky) -> ResumingSource<Flaky> {
        ResumingSource::new(inner).with_base_delay(Duration::from_millis(1))
    }

    fn bookmarks(results: &[SourceResult<ScannedDocument>]) -> Vec<u64> {
        results.iter().filter_map(|r| r.as_ref().ok()).map(|d| d.bookmark).collect()
    }

    #[test]
    fn transient_failures_resume_without_duplicates() {
        let source = wrap(Flaky::new(3, 2, SourceError::transient("connection reset")));
        let results: Vec<_> = source.scan("c", None).unwrap().collect();

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(bookmarks(&results), (0..10).collect::<Vec<_>>());
        assert_eq!(source.inner().opened.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn gives_up_after_max_retries() {
        let source = wrap(Flaky::new(1, 10, SourceError::transient("timeout"))).with_max_retries(2);
        let results: Vec<_> = source.scan("c", None).unwrap().collect();

        assert_eq!(bookmarks(&results), vec![0, 1, 2]);
        assert!(results.last().unwrap().is_err());
    }

    #[test]
    fn fatal_errors_are_not_retried() {
        let source = wrap(Flaky::new(2, 1, SourceError::fatal("corrupt page")));
        let results: Vec<_> = source.scan("c", None).unwrap().collect();

        assert_eq!(bookmarks(&results), vec![0, 1]);
        assert_eq!(results.last().unwrap().as_ref().unwrap_err().reason, "corrupt page");
        assert_eq!(source.inner().opened.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let source = ResumingSource::new(Flaky::new(0, 0, SourceError::fatal("x")))
            .with_base_delay(Duration::from_millis(10));
        assert_eq!(source.backoff(1), Duration::from_millis(10));
        assert_eq!(source.backoff(3), Duration::from_millis(40));
        assert_eq!(source.backoff(20), Duration::from_millis(320));
    }
}
