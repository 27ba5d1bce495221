/// Step and scenario bookkeeping shared by every runner.
use serde::Serialize;
use std::time::Instant;

use crate::events;

/// Result of a scenario step.
#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    pub step: String,
    pub ok: bool,
    pub elapsed_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Result of a full scenario run.
#[derive(Debug, Serialize)]
pub struct ScenarioResult {
    pub event: &'static str,
    pub scenario: String,
    pub steps: Vec<StepResult>,
    pub total_ms: f64,
    pub passed: usize,
    pub failed: usize,
}

impl ScenarioResult {
    pub fn new(scenario: &str) -> Self {
        Self {
            event: "scenario",
            scenario: scenario.into(),
            steps: Vec::new(),
            total_ms: 0.0,
            passed: 0,
            failed: 0,
        }
    }

    pub fn add(&mut self, step: StepResult) {
        if step.ok {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
        self.steps.push(step);
    }

    /// Run `f` as a timed step and record it.
    pub fn step(&mut self, name: &str, f: impl FnOnce() -> Result<String, String>) {
        let start = Instant::now();
        let outcome = f();
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        let (ok, detail) = match outcome {
            Ok(detail) => (true, (!detail.is_empty()).then_some(detail)),
            Err(detail) => (false, Some(detail)),
        };
        self.add(StepResult {
            step: name.into(),
            ok,
            elapsed_ms,
            detail,
        });
    }

    pub fn finalize(&mut self, start: Instant) {
        self.total_ms = start.elapsed().as_secs_f64() * 1000.0;
    }

    pub fn success(&self) -> bool {
        self.failed == 0
    }

    pub fn print_summary(&self) {
        let icon = if self.success() { "PASS" } else { "FAIL" };
        eprintln!("\n[{icon}] Scenario: {} ({:.1}ms)", self.scenario, self.total_ms);
        eprintln!("  {} passed, {} failed", self.passed, self.failed);
        for step in &self.steps {
            let mark = if step.ok { " ok" } else { "FAIL" };
            eprint!("  [{mark}] {} ({:.1}ms)", step.step, step.elapsed_ms);
            if let Some(detail) = &step.detail {
                eprint!(": {detail}");
            }
            eprintln!();
        }
    }

    pub fn emit_jsonl(&self) {
        events::emit(self);
    }
}

/// Turn a check into a step outcome.
pub fn ensure(cond: bool, msg: impl Into<String>) -> Result<(), String> {
    if cond {
        Ok(())
    } else {
        Err(msg.into())
    }
}

/// Expect an operation to be refused with a particular error.
pub fn expect_err<T>(
    result: Result<T, folio_groups::GroupError>,
    want: fn(&folio_groups::GroupError) -> bool,
    what: &str,
) -> Result<String, String> {
    match result {
        Ok(_) => Err(format!("{what}: unexpectedly succeeded")),
        Err(e) if want(&e) => Ok(format!("refused: {e}")),
        Err(e) => Err(format!("{what}: wrong error: {e}")),
    }
}
