//! Server-driven preflight validation for job submissions.
//!
//! Before a job is sent, the service is asked for the rules that apply to the
//! job type. Each rule names a scene query, a comparison and a message. The
//! rules are evaluated against the running authoring application and the
//! first rule whose comparison matches blocks the submission.
//!
//! The pass fails open: a rule whose query cannot be evaluated is skipped,
//! and when the application's scripting environment is not present at all
//! the whole pass is skipped.

mod matcher;
mod query;
mod rule;

pub use matcher::{match_rule, match_values};
pub use query::{EvalError, QueryFn, QueryRegistry, QueryValue, RegistryHost, SceneState, ScriptHost};
pub use rule::{rules_from_value, OperationType, PreflightRule, MATCH_PLACEHOLDER};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Preflight errors. Evaluation failures never surface here.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PreflightError {
    /// Job type unset or unknown; nothing was sent
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The rule service answered with a non-success code
    #[error("rule service error: {0}")]
    RemoteProtocol(String),

    /// The rule service could not be reached
    #[error("rule service unreachable: {message}")]
    Unreachable { message: String, timed_out: bool },

    /// A rule matched its blocking condition
    #[error("{message}")]
    Violation {
        /// Position of the rule in server order
        rule_index: usize,
        /// Rule template with `%match%` substituted
        message: String,
        /// Offending values, in match order
        matches: Vec<String>,
    },
}

/// Where preflight rules come from.
pub trait RuleSource {
    /// Fetch the rules for a job type, in server order.
    fn fetch_rules(&self, job_type: &str) -> Result<Vec<PreflightRule>, PreflightError>;
}

impl<F> RuleSource for F
where
    F: Fn(&str) -> Result<Vec<PreflightRule>, PreflightError>,
{
    fn fetch_rules(&self, job_type: &str) -> Result<Vec<PreflightRule>, PreflightError> {
        self(job_type)
    }
}

/// Fetch rules, refusing an empty job type before any request is made.
pub fn fetch_rules(source: &dyn RuleSource, job_type: &str) -> Result<Vec<PreflightRule>, PreflightError> {
    let job_type = job_type.trim();
    if job_type.is_empty() {
        return Err(PreflightError::Configuration(
            "job type is not set; cannot fetch preflight rules".to_string(),
        ));
    }
    source.fetch_rules(job_type)
}

/// Preflight pass state.
///
/// NOT_RUN → FETCHING → (SKIPPED | EVALUATING) → (PASSED | BLOCKED)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PreflightState {
    NotRun,
    Fetching,
    Skipped,
    Evaluating,
    Passed,
    Blocked,
}

impl PreflightState {
    /// Check if transition from this state to target is valid
    pub fn can_transition_to(&self, target: PreflightState) -> bool {
        matches!(
            (self, target),
            (PreflightState::NotRun, PreflightState::Fetching)
                // empty rule set passes without evaluating anything
                | (PreflightState::Fetching, PreflightState::Passed)
                | (PreflightState::Fetching, PreflightState::Skipped)
                | (PreflightState::Fetching, PreflightState::Evaluating)
                | (PreflightState::Evaluating, PreflightState::Passed)
                | (PreflightState::Evaluating, PreflightState::Blocked)
        )
    }

    /// Returns true once the pass has finished
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PreflightState::Skipped | PreflightState::Passed | PreflightState::Blocked
        )
    }

    /// Returns true if submission may go ahead from this state
    pub fn permits_submission(&self) -> bool {
        matches!(self, PreflightState::Skipped | PreflightState::Passed)
    }
}

/// Why a pass was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No scripting host was supplied (standalone use)
    NoHost,
    /// A host was supplied but reports itself unavailable
    HostUnavailable,
}

/// Result of a pass that did not block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PreflightOutcome {
    /// Every rule evaluated (or was skipped) without a match
    Passed {
        rules_evaluated: usize,
        rules_skipped: usize,
    },
    /// Rules existed but no scripting host could evaluate them
    Skipped { reason: SkipReason, rule_count: usize },
}

/// One preflight pass for one submission attempt.
pub struct Preflight<'a> {
    source: &'a dyn RuleSource,
    host: Option<&'a dyn ScriptHost>,
    state: PreflightState,
}

impl<'a> Preflight<'a> {
    /// Prepare a pass against a rule source and an optional scripting host
    pub fn new(source: &'a dyn RuleSource, host: Option<&'a dyn ScriptHost>) -> Self {
        Self {
            source,
            host,
            state: PreflightState::NotRun,
        }
    }

    /// Current state
    pub fn state(&self) -> PreflightState {
        self.state
    }

    fn transition(&mut self, target: PreflightState) {
        debug_assert!(
            self.state.can_transition_to(target),
            "invalid preflight transition {:?} -> {:?}",
            self.state,
            target
        );
        debug!(from = ?self.state, to = ?target, "preflight transition");
        self.state = target;
    }

    /// Run the pass for a job type.
    ///
    /// Returns `Ok` when submission may proceed and
    /// `Err(PreflightError::Violation)` for the first rule that matches.
    /// Fetch failures propagate; the state then stays at `Fetching`.
    pub fn run(&mut self, job_type: &str) -> Result<PreflightOutcome, PreflightError> {
        self.transition(PreflightState::Fetching);
        let rules = fetch_rules(self.source, job_type)?;

        if rules.is_empty() {
            self.transition(PreflightState::Passed);
            return Ok(PreflightOutcome::Passed {
                rules_evaluated: 0,
                rules_skipped: 0,
            });
        }

        let host = match self.host {
            Some(host) if host.is_available() => host,
            Some(host) => {
                info!(host = host.name(), rules = rules.len(), "scripting host unavailable, skipping preflight");
                self.transition(PreflightState::Skipped);
                return Ok(PreflightOutcome::Skipped {
                    reason: SkipReason::HostUnavailable,
                    rule_count: rules.len(),
                });
            }
            None => {
                info!(job_type, rules = rules.len(), "no scripting host, skipping preflight");
                self.transition(PreflightState::Skipped);
                return Ok(PreflightOutcome::Skipped {
                    reason: SkipReason::NoHost,
                    rule_count: rules.len(),
                });
            }
        };

        self.transition(PreflightState::Evaluating);
        let mut rules_evaluated = 0;
        let mut rules_skipped = 0;

        for (rule_index, rule) in rules.iter().enumerate() {
            let values = match host.evaluate(&rule.api_call) {
                Ok(value) => value.into_values(),
                Err(e) => {
                    warn!(rule_index, api_call = %rule.api_call, error = %e, "preflight rule inconclusive, skipping");
                    rules_skipped += 1;
                    continue;
                }
            };
            rules_evaluated += 1;

            let matches = match_rule(rule, &values);
            if !matches.is_empty() {
                let message = rule.format_error(&matches);
                warn!(rule_index, api_call = %rule.api_call, %message, "preflight blocked submission");
                self.transition(PreflightState::Blocked);
                return Err(PreflightError::Violation {
                    rule_index,
                    message,
                    matches,
                });
            }
        }

        self.transition(PreflightState::Passed);
        Ok(PreflightOutcome::Passed {
            rules_evaluated,
            rules_skipped,
        })
    }
}

/// Run one preflight pass.
pub fn run_preflight(
    source: &dyn RuleSource,
    host: Option<&dyn ScriptHost>,
    job_type: &str,
) -> Result<PreflightOutcome, PreflightError> {
    Preflight::new(source, host).run(job_type)
}
