//! Sequential reachability check of the Binance public REST API.
//!
//! Each step issues one `GET`, prints what it saw, and either hands over to
//! the next step or ends the run. There are no retries.
pub mod format;
pub mod steps;
pub mod transport;

use std::io::{self, Write};

use crate::probe::format::snippet;
use crate::probe::steps::{PayloadSummary, ProbeStep};
use crate::probe::transport::{HttpGet, TransportError};

/// HTTP 451 Unavailable For Legal Reasons, Binance's geo-block answer.
pub const STATUS_BLOCKED: u16 = 451;

const RULE_WIDTH: usize = 60;
const SNIPPET_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Passed(PayloadSummary),
    Blocked,
    UnexpectedStatus { status: u16, snippet: String },
    TransportFailed(String),
    MalformedBody(String),
}

impl StepOutcome {
    pub fn is_pass(&self) -> bool {
        matches!(self, StepOutcome::Passed(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    pub step: ProbeStep,
    pub status: Option<u16>,
    pub outcome: StepOutcome,
}

/// Steps that were actually attempted, in order. A failed step is always
/// the last one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbeReport {
    pub steps: Vec<StepReport>,
}

impl ProbeReport {
    pub fn passed(&self) -> bool {
        self.steps.len() == ProbeStep::ALL.len() && self.steps.iter().all(|s| s.outcome.is_pass())
    }

    /// Process exit status: 0 when every step passed, 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        if self.passed() {
            0
        } else {
            1
        }
    }
}

pub struct ConnectivityProbe<T: HttpGet> {
    transport: T,
}

impl<T: HttpGet> ConnectivityProbe<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Run the steps in order, writing the human-readable report to `out`.
    /// Stops at the first step that does not pass.
    pub fn run<W: Write>(&self, out: &mut W) -> io::Result<ProbeReport> {
        let rule = "=".repeat(RULE_WIDTH);
        writeln!(out, "{}", rule)?;
        writeln!(out, "Testing Binance API Access")?;
        writeln!(out, "{}", rule)?;
        writeln!(
            out,
            "Time: {}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.6f")
        )?;

        let mut report = ProbeReport::default();
        for step in ProbeStep::ALL {
            let step_report = self.run_step(step, out)?;
            let passed = step_report.outcome.is_pass();
            report.steps.push(step_report);
            if !passed {
                log::info!("Probe stopped at step {}", step.number());
                return Ok(report);
            }
            writeln!(out)?;
        }

        writeln!(out, "{}", rule)?;
        writeln!(out, "✅ ALL TESTS PASSED - Binance API is accessible!")?;
        writeln!(out, "   This host can run the bot without 451 errors")?;
        writeln!(out, "{}", rule)?;
        Ok(report)
    }

    fn run_step<W: Write>(&self, step: ProbeStep, out: &mut W) -> io::Result<StepReport> {
        writeln!(
            out,
            "Test {}: {} (GET {})",
            step.number(),
            step.title(),
            step.path()
        )?;
        writeln!(out, "{}", "-".repeat(RULE_WIDTH))?;

        let response = match self.transport.get(step.path(), step.query()) {
            Ok(response) => response,
            Err(err) => {
                if let Some(status) = err.status() {
                    writeln!(out, "Status Code: {}", status)?;
                }
                writeln!(out, "❌ ERROR: {} - {}", step.failure_action(), err)?;
                return Ok(StepReport {
                    step,
                    status: err.status(),
                    outcome: StepOutcome::TransportFailed(describe(&err)),
                });
            }
        };

        writeln!(out, "Status Code: {}", response.status)?;
        let outcome = match response.status {
            STATUS_BLOCKED => {
                writeln!(
                    out,
                    "❌ ERROR: 451 - Service unavailable from restricted location"
                )?;
                if step == ProbeStep::ExchangeInfo {
                    writeln!(out, "   This host's location is blocked by Binance")?;
                }
                StepOutcome::Blocked
            }
            200 => match step.summarize(&response.body) {
                Ok(summary) => {
                    writeln!(out, "✅ SUCCESS: {}", step.success_message())?;
                    for line in summary.lines() {
                        writeln!(out, "{}", line)?;
                    }
                    StepOutcome::Passed(summary)
                }
                Err(reason) => {
                    writeln!(out, "❌ ERROR: Malformed response body - {}", reason)?;
                    StepOutcome::MalformedBody(reason)
                }
            },
            status => {
                let snippet = snippet(&response.body, SNIPPET_CHARS).to_string();
                writeln!(out, "⚠️  Unexpected status code: {}", status)?;
                writeln!(out, "   Response: {}", snippet)?;
                StepOutcome::UnexpectedStatus { status, snippet }
            }
        };

        Ok(StepReport {
            step,
            status: Some(response.status),
            outcome,
        })
    }
}

fn describe(err: &TransportError) -> String {
    match err {
        TransportError::Request { url, source } => format!("{}: {}", url, source),
        other => other.to_string(),
    }
}
