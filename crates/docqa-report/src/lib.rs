//! # docqa-report
//!
//! `ReportSink` implementations for the docqa engine.
//!
//! - [`memory::InMemoryReportSink`]: keeps published reports for inspection
//! - [`json_file::JsonFileReportSink`]: writes the run report as pretty JSON
//! - [`summary::SummarySink`]: writes a plain-text summary to any writer
//! - [`fanout::FanOutSink`]: publishes to several sinks in order

pub mod fanout;
pub mod json_file;
pub mod memory;
pub mod summary;

pub use fanout::FanOutSink;
pub use json_file::JsonFileReportSink;
pub use memory::InMemoryReportSink;
pub use summary::{render_summary, SummarySink};

#[cfg(test)]
pub(crate) mod fixtures {
    use std::collections::BTreeMap;

    use chrono::Utc;
    use serde_json::json;

    use docqa_contracts::{
        report::{
            AggregateResult, CollectionReport, CountFinding, FailureSample, RunId, RunReport,
            ScanStatus,
        },
        rule::Verdict,
    };

    /// A run with one scanned collection (two failures, short count) and one
    /// missing collection.
    pub fn run_report() -> RunReport {
        let now = Utc::now();
        let mut orders =
            CollectionReport::skipped("orders", true, ScanStatus::Complete, Some(5), now);
        orders.actual_count = Some(3);
        orders.count_finding = Some(CountFinding::new(5, 3));
        orders.documents_scanned = 3;
        orders.documents_failed = 2;
        orders.rule_results = vec![AggregateResult {
            rule_index: 0,
            rule_id: "categorical:items[].category".to_string(),
            description: None,
            path: "items[].category".to_string(),
            kind: "categorical".to_string(),
            evaluated: 4,
            passed: 2,
            failed: 2,
            fail_by_kind: BTreeMap::from([(Verdict::FailValue, 1), (Verdict::FailMissing, 1)]),
            samples: vec![FailureSample {
                document_id: "o-2".to_string(),
                location: "items[1].category".to_string(),
                value: Some(json!("Z")),
                verdict: Verdict::FailValue,
                detail: Some("\"Z\" is not one of [\"A\",\"B\"]".to_string()),
            }],
        }];

        RunReport {
            run_id: RunId::new(),
            started_at: now,
            finished_at: now,
            config_digest: "0123456789abcdef".repeat(4),
            collections: vec![
                orders,
                CollectionReport::skipped("users", false, ScanStatus::Missing, None, now),
            ],
        }
    }
}
