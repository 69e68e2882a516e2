//! Publishing one report to several sinks.

use tracing::error;

use docqa_contracts::{error::DqResult, report::RunReport};
use docqa_core::traits::ReportSink;

/// Publishes to every sink in order. A failing sink does not stop the
/// others; the first failure is returned once all have been tried.
#[derive(Default)]
pub struct FanOutSink {
    sinks: Vec<Box<dyn ReportSink>>,
}

impl FanOutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Box<dyn ReportSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl ReportSink for FanOutSink {
    fn publish(&self, report: &RunReport) -> DqResult<()> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(e) = sink.publish(report) {
                error!(error = %e, "report sink failed");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
