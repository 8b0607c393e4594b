use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use xbench_case::Case;
use xbench_compare::compare_case;
use xbench_core::BenchError;
use xbench_engine::{Derivation, Registry};
use xbench_extract::{extract_run, RunQuantities};
use xbench_report::{case_lines, CaseReport, ReportSink, RunEntry};
use xbench_run::{Executor, RunOptions, RunRecord};

/// Totals of one benchmark invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Cases run.
    pub cases: usize,
    /// Commands seen, launched or not.
    pub runs: usize,
    /// Commands that did not launch or whose solver did not exit cleanly.
    pub failed_runs: usize,
    /// Verdicts that did not pass.
    pub failing_verdicts: usize,
    /// Cases with at least one failing verdict, in run order.
    pub failed_cases: Vec<String>,
}

impl Summary {
    /// `0` when every verdict passed, `1` otherwise.
    pub fn exit_code(&self) -> u8 {
        if self.failed_cases.is_empty() {
            0
        } else {
            1
        }
    }

    fn absorb(&mut self, report: &CaseReport) {
        self.cases += 1;
        self.runs += report.runs.len();
        self.failed_runs += report.runs.iter().filter(|run| run.failed()).count();
        let failures = report.comparison.failures();
        self.failing_verdicts += failures;
        if failures > 0 {
            self.failed_cases.push(report.case_id.clone());
        }
    }
}

/// Runs cases sequentially against one registry.
pub struct Harness<'r> {
    registry: &'r Registry,
    executor: Executor<'r>,
    derivations: Vec<Derivation>,
}

impl<'r> Harness<'r> {
    /// Harness over `registry`.
    pub fn new(registry: &'r Registry, options: RunOptions) -> Self {
        Self {
            registry,
            executor: Executor::new(registry, options),
            derivations: registry.derivations(),
        }
    }

    fn extract(&self, record: &RunRecord) -> Option<RunQuantities> {
        let spec = self.registry.spec(&record.engine.engine)?;
        Some(extract_run(spec, record, &self.derivations))
    }

    /// Executes, extracts and compares one case.
    ///
    /// Engines appear in the order of their first command. Every launched
    /// engine takes part in the comparison. Values are extracted whatever the
    /// exit status, later runs overriding earlier ones; a run that never
    /// launched only adds extraction failures.
    pub fn run_case(&self, case: &Case) -> CaseReport {
        let mut report = CaseReport::new(&case.id, self.registry.config_hash().map(str::to_string));
        let mut engines: IndexMap<String, RunQuantities> = IndexMap::new();

        for (position, command) in case.commands.iter().enumerate() {
            let index = position + 1;
            let mut entry = RunEntry {
                index,
                line: command.line,
                command: command.text.clone(),
                record: None,
                error: None,
            };
            match self.executor.execute(&case.id, index, &command.text) {
                Ok(record) => {
                    let slot = engines
                        .entry(record.engine.label())
                        .or_insert_with(|| RunQuantities::new(record.engine.clone()));
                    if let Some(quantities) = self.extract(&record) {
                        slot.merge(quantities);
                    }
                    if let Err(error) = self.executor.cleanup(&record) {
                        tracing::warn!(case = %case.id, error = %error, "run cleanup failed");
                    }
                    entry.record = Some(record);
                }
                Err(error) => {
                    tracing::warn!(
                        case = %case.id,
                        line = command.line,
                        error = %error,
                        "command not run"
                    );
                    entry.error = Some(error);
                }
            }
            report.runs.push(entry);
        }

        report.values = engines.into_values().collect();
        report.comparison = compare_case(case, &report.values, |family| {
            self.registry.family_rule(family)
        });
        for (line, failed) in case_lines(&report.comparison) {
            if failed {
                tracing::error!("{line}");
            } else {
                tracing::info!("{line}");
            }
        }
        report
    }

    /// Runs every case, writing each report as soon as it is complete.
    pub fn run_all(&self, cases: &[Case], sink: &mut ReportSink) -> Result<Summary, BenchError> {
        let mut summary = Summary::default();
        for case in cases {
            let report = self.run_case(case);
            sink.write_case(&report)?;
            summary.absorb(&report);
        }
        tracing::info!(
            cases = summary.cases,
            runs = summary.runs,
            failed_runs = summary.failed_runs,
            failing_verdicts = summary.failing_verdicts,
            "benchmark finished"
        );
        Ok(summary)
    }
}
