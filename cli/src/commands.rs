//! Subcommand implementations. Each returns the process exit status.

use std::io;
use std::path::Path;

use tracing::{error, info};

use docqa_contracts::report::RunReport;
use docqa_core::{RunPlan, Runner, ScanSettings};
use docqa_eval::EvaluatorRegistry;
use docqa_report::{FanOutSink, JsonFileReportSink, SummarySink};
use docqa_rules::RulesConfig;
use docqa_source::{JsonLinesSource, ResumingSource};

use crate::RunArgs;

pub const EXIT_OK: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_VIOLATIONS: u8 = 2;

pub fn run(args: &RunArgs) -> u8 {
    let config = match RulesConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return EXIT_FAILURE;
        }
    };

    let Some(directory) = args.data.clone().or_else(|| config.data_directory()) else {
        eprintln!("error: no data directory; pass --data or set [source] directory");
        return EXIT_FAILURE;
    };

    let settings = effective_settings(config.scan_settings(), args);
    let registry = EvaluatorRegistry::standard();
    let plan = RunPlan::compile(config.collections(), &registry);

    let mut source = ResumingSource::new(JsonLinesSource::new(&directory));
    if let Some(retries) = config.max_retries() {
        source = source.with_max_retries(retries);
    }

    let mut sink = FanOutSink::new().with(Box::new(SummarySink::new(io::stdout())));
    if let Some(path) = &args.report {
        sink = sink.with(Box::new(JsonFileReportSink::new(path)));
    }

    info!(
        config = %args.config.display(),
        data = %directory.display(),
        collections = plan.collections().len(),
        "starting run"
    );
    let runner = Runner::new(Box::new(source), Box::new(sink), settings);
    match runner.run(&plan) {
        Ok(report) => exit_status(&report, args.fail_on_violations),
        Err(e) => {
            error!(error = %e, "run failed");
            eprintln!("error: {e}");
            EXIT_FAILURE
        }
    }
}

pub fn check_config(path: &Path) -> u8 {
    let config = match RulesConfig::from_file(path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return EXIT_FAILURE;
        }
    };

    let plan = RunPlan::compile(config.collections(), &EvaluatorRegistry::standard());
    let mut status = EXIT_OK;
    for collection in plan.collections() {
        match &collection.plan {
            Ok(compiled) => println!("{}: {} rules ok", collection.name, compiled.len()),
            Err(e) => {
                println!("{}: {e}", collection.name);
                status = EXIT_VIOLATIONS;
            }
        }
    }
    status
}

/// Command-line flags over the rule file's `[settings]`.
pub fn effective_settings(mut settings: ScanSettings, args: &RunArgs) -> ScanSettings {
    if let Some(workers) = args.workers {
        settings.workers = workers.max(1);
    }
    if let Some(batch_size) = args.batch_size {
        settings.batch_size = batch_size.max(1);
    }
    if let Some(capacity) = args.sample_capacity {
        settings.sample_capacity = capacity;
    }
    settings
}

/// Exit status for a finished run.
pub fn exit_status(report: &RunReport, fail_on_violations: bool) -> u8 {
    if report.has_inaccessible_collection() {
        EXIT_FAILURE
    } else if fail_on_violations && (report.total_violations() > 0 || report.has_invalid_config()) {
        EXIT_VIOLATIONS
    } else {
        EXIT_OK
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use chrono::Utc;

    use docqa_contracts::report::{CollectionReport, CountFinding, RunId, RunReport, ScanStatus};
    use docqa_core::ScanSettings;

    use super::{effective_settings, exit_status, EXIT_FAILURE, EXIT_OK, EXIT_VIOLATIONS};
    use crate::RunArgs;

    fn report(collections: Vec<CollectionReport>) -> RunReport {
        let now = Utc::now();
        RunReport {
            run_id: RunId::new(),
            started_at: now,
            finished_at: now,
            config_digest: String::new(),
            collections,
        }
    }

    fn collection(status: ScanStatus) -> CollectionReport {
        CollectionReport::skipped("c", true, status, None, Utc::now())
    }

    fn args() -> RunArgs {
        RunArgs {
            config: PathBuf::from("rules.toml"),
            data: None,
            report: None,
            workers: None,
            batch_size: None,
            sample_capacity: None,
            fail_on_violations: false,
        }
    }

    #[test]
    fn clean_run_exits_zero_either_way() {
        let r = report(vec![collection(ScanStatus::Complete)]);
        assert_eq!(exit_status(&r, false), EXIT_OK);
        assert_eq!(exit_status(&r, true), EXIT_OK);
    }

    #[test]
    fn inaccessible_collection_always_fails() {
        let r = report(vec![collection(ScanStatus::Missing)]);
        assert_eq!(exit_status(&r, false), EXIT_FAILURE);
    }

    #[test]
    fn findings_only_fail_when_asked() {
        let mut short = collection(ScanStatus::Complete);
        short.count_finding = Some(CountFinding::new(10, 3));
        let r = report(vec![short]);
        assert_eq!(exit_status(&r, false), EXIT_OK);
        assert_eq!(exit_status(&r, true), EXIT_VIOLATIONS);

        let invalid = report(vec![collection(ScanStatus::ConfigInvalid { reason: "x".into() })]);
        assert_eq!(exit_status(&invalid, false), EXIT_OK);
        assert_eq!(exit_status(&invalid, true), EXIT_VIOLATIONS);
    }

    #[test]
    fn flags_override_file_settings() {
        let mut a = args();
        a.workers = Some(0);
        a.sample_capacity = Some(3);
        let settings = effective_settings(ScanSettings::default(), &a);
        assert_eq!(settings.workers, 1);
        assert_eq!(settings.sample_capacity, 3);
        assert_eq!(settings.batch_size, ScanSettings::default().batch_size);
    }
}
