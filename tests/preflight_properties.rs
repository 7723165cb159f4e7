//! Preflight pass properties
//!
//! Tests the preflight engine against scripted hosts and rule sources:
//! - Skipping when the host is absent or unavailable
//! - Membership matching for `equal` / `not_equal`
//! - Fail-open evaluation errors and fail-fast violations
//! - Rule fetch errors and the pass state machine

mod fixtures;

use std::cell::Cell;

use fixtures::{rule, strings, FixtureScene, ScriptedHost};
use serde_json::{json, Value};
use zync_preflight::{
    rules_from_value, run_preflight, Preflight, PreflightError, PreflightOutcome, PreflightRule,
    PreflightState, QueryRegistry, RegistryHost, SkipReason,
};

fn source(rules: Value) -> impl Fn(&str) -> Result<Vec<PreflightRule>, PreflightError> {
    move |_job_type: &str| rules_from_value(rules.clone())
}

fn violation(result: Result<PreflightOutcome, PreflightError>) -> (usize, String, Vec<String>) {
    match result {
        Err(PreflightError::Violation {
            rule_index,
            message,
            matches,
        }) => (rule_index, message, matches),
        other => panic!("expected a violation, got {other:?}"),
    }
}

// =============================================================================
// Host availability
// =============================================================================

mod host_availability_tests {
    use super::*;

    #[test]
    fn test_unavailable_host_never_raises() {
        let rules = json!([
            rule("getMissingPlugins()", "not_equal", &[], "Missing plugins: %match%"),
            rule("getRenderer()", "equal", &["vray"], "Renderer %match% not allowed"),
        ]);
        let host = ScriptedHost::unavailable().answer("getRenderer()", "vray");
        let calls = host.calls();

        let outcome = run_preflight(&source(rules), Some(&host), "maya").unwrap();
        assert_eq!(
            outcome,
            PreflightOutcome::Skipped {
                reason: SkipReason::HostUnavailable,
                rule_count: 2
            }
        );
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn test_absent_host_skips() {
        let rules = json!([rule("getRenderer()", "equal", &["vray"], "%match%")]);
        let outcome = run_preflight(&source(rules), None, "maya").unwrap();
        assert!(matches!(
            outcome,
            PreflightOutcome::Skipped {
                reason: SkipReason::NoHost,
                ..
            }
        ));
    }

    #[test]
    fn test_empty_rules_do_not_consult_host() {
        struct PanickingHost {
            asked: Cell<bool>,
        }
        impl zync_preflight::ScriptHost for PanickingHost {
            fn name(&self) -> &str {
                "never"
            }
            fn is_available(&self) -> bool {
                self.asked.set(true);
                false
            }
            fn evaluate(&self, _: &str) -> Result<zync_preflight::QueryValue, zync_preflight::EvalError> {
                panic!("host must not be evaluated");
            }
        }

        let host = PanickingHost { asked: Cell::new(false) };
        let outcome = run_preflight(&source(json!([])), Some(&host), "nuke").unwrap();
        assert_eq!(
            outcome,
            PreflightOutcome::Passed {
                rules_evaluated: 0,
                rules_skipped: 0
            }
        );
        assert!(!host.asked.get());

        let outcome = run_preflight(&source(json!([])), None, "nuke").unwrap();
        assert!(matches!(outcome, PreflightOutcome::Passed { .. }));
    }
}

// =============================================================================
// Matching
// =============================================================================

mod matching_tests {
    use super::*;

    #[test]
    fn test_equal_matches_members() {
        let rules = json!([rule("getCameras()", "equal", &["A", "B"], "Bad cameras: %match%")]);
        let host = ScriptedHost::new().answer("getCameras()", strings(&["A", "C"]));

        let (index, message, matches) = violation(run_preflight(&source(rules), Some(&host), "maya"));
        assert_eq!(index, 0);
        assert_eq!(matches, vec!["A".to_string()]);
        assert_eq!(message, "Bad cameras: A");
    }

    #[test]
    fn test_not_equal_matches_non_members() {
        let rules = json!([rule("getCameras()", "not_equal", &["A"], "Unexpected: %match%")]);
        let host = ScriptedHost::new().answer("getCameras()", strings(&["A", "B"]));

        let (_, message, matches) = violation(run_preflight(&source(rules), Some(&host), "maya"));
        assert_eq!(matches, vec!["B".to_string()]);
        assert_eq!(message, "Unexpected: B");
    }

    #[test]
    fn test_missing_plugins_scenario() {
        let rules = json!([rule("getMissingPlugins()", "not_equal", &[], "Missing plugins: %match%")]);
        let host = ScriptedHost::new().answer("getMissingPlugins()", strings(&["pluginX"]));

        let (_, message, _) = violation(run_preflight(&source(rules), Some(&host), "maya"));
        assert_eq!(message, "Missing plugins: pluginX");
    }

    #[test]
    fn test_scalar_renderer_scenario_passes() {
        let rules = json!([rule(
            "getRenderer()",
            "equal",
            &["unsupported_renderer"],
            "Unsupported renderer in use: %match%"
        )]);
        let host = ScriptedHost::new().answer("getRenderer()", "vray");

        let outcome = run_preflight(&source(rules), Some(&host), "maya").unwrap();
        assert_eq!(
            outcome,
            PreflightOutcome::Passed {
                rules_evaluated: 1,
                rules_skipped: 0
            }
        );
    }

    #[test]
    fn test_matches_joined_in_encounter_order() {
        let rules = json!([rule("getMissingFiles()", "not_equal", &[], "Missing: %match%")]);
        let host = ScriptedHost::new().answer("getMissingFiles()", strings(&["z.exr", "a.exr", "m.exr"]));

        let (_, message, matches) = violation(run_preflight(&source(rules), Some(&host), "nuke"));
        assert_eq!(matches, strings(&["z.exr", "a.exr", "m.exr"]));
        assert_eq!(message, "Missing: z.exr, a.exr, m.exr");
    }

    #[test]
    fn test_numeric_condition_matches_string_result() {
        let rules = json!([{
            "api_call": "getVersion()",
            "operation_type": "equal",
            "condition": [2014, "2013"],
            "error": "Maya %match% is not supported"
        }]);
        let host = ScriptedHost::new().answer("getVersion()", "2014");

        let (_, message, _) = violation(run_preflight(&source(rules), Some(&host), "maya"));
        assert_eq!(message, "Maya 2014 is not supported");
    }
}

// =============================================================================
// Ordering, fail-open and fail-fast
// =============================================================================

mod ordering_tests {
    use super::*;

    #[test]
    fn test_evaluation_error_does_not_mask_later_violation() {
        let rules = json!([
            rule("getRenderLayers()", "equal", &["x"], "first: %match%"),
            rule("getMissingPlugins()", "not_equal", &[], "second: %match%"),
        ]);
        let host = ScriptedHost::new()
            .fail("getRenderLayers()", "no scene open")
            .answer("getMissingPlugins()", strings(&["mtoa"]));

        let (index, message, _) = violation(run_preflight(&source(rules), Some(&host), "maya"));
        assert_eq!(index, 1);
        assert_eq!(message, "second: mtoa");
    }

    #[test]
    fn test_first_violation_stops_the_pass() {
        let rules = json!([
            rule("getCameras()", "equal", &["persp"], "first: %match%"),
            rule("getRenderer()", "equal", &["sw"], "second: %match%"),
        ]);
        let host = ScriptedHost::new()
            .answer("getCameras()", strings(&["persp"]))
            .answer("getRenderer()", "sw");
        let calls = host.calls();

        let (index, message, _) = violation(run_preflight(&source(rules), Some(&host), "maya"));
        assert_eq!(index, 0);
        assert_eq!(message, "first: persp");
        assert_eq!(*calls.borrow(), strings(&["getCameras()"]));
    }

    #[test]
    fn test_rules_evaluated_in_server_order() {
        let rules = json!([
            rule("getVersion()", "equal", &["never"], "%match%"),
            rule("getRenderer()", "equal", &["never"], "%match%"),
            rule("getCameras()", "equal", &["never"], "%match%"),
        ]);
        let host = ScriptedHost::new()
            .answer("getVersion()", "2016")
            .answer("getRenderer()", "vray")
            .fail("getCameras()", "boom");
        let calls = host.calls();

        let outcome = run_preflight(&source(rules), Some(&host), "maya").unwrap();
        assert_eq!(
            outcome,
            PreflightOutcome::Passed {
                rules_evaluated: 2,
                rules_skipped: 1
            }
        );
        assert_eq!(*calls.borrow(), strings(&["getVersion()", "getRenderer()", "getCameras()"]));
    }

    #[test]
    fn test_unknown_query_is_skipped() {
        let rules = json!([
            rule("import os; os.remove('/')", "equal", &["x"], "%match%"),
            rule("getMissingPlugins()", "not_equal", &[], "Missing plugins: %match%"),
        ]);
        let scene = FixtureScene {
            missing_plugins: Some(strings(&["Mayatomr"])),
            ..Default::default()
        };
        let host = RegistryHost::new(QueryRegistry::maya(), scene);

        let (index, message, _) = violation(run_preflight(&source(rules), Some(&host), "maya"));
        assert_eq!(index, 1);
        assert_eq!(message, "Missing plugins: Mayatomr");
    }
}

// =============================================================================
// Fetch and state machine
// =============================================================================

mod fetch_tests {
    use super::*;

    #[test]
    fn test_empty_job_type_is_configuration_error_before_fetch() {
        let fetched = Cell::new(false);
        let source = |_: &str| -> Result<Vec<PreflightRule>, PreflightError> {
            fetched.set(true);
            Ok(Vec::new())
        };

        let err = run_preflight(&source, None, "  ").unwrap_err();
        assert!(matches!(err, PreflightError::Configuration(_)));
        assert!(!fetched.get());
    }

    #[test]
    fn test_remote_error_propagates() {
        let source = |_: &str| -> Result<Vec<PreflightRule>, PreflightError> {
            Err(PreflightError::RemoteProtocol("unknown job type".to_string()))
        };
        let err = run_preflight(&source, None, "houdini").unwrap_err();
        assert_eq!(err, PreflightError::RemoteProtocol("unknown job type".to_string()));
    }

    #[test]
    fn test_state_after_block() {
        let rules = source(json!([rule("getRenderer()", "equal", &["sw"], "%match%")]));
        let host = ScriptedHost::new().answer("getRenderer()", "sw");

        let mut pass = Preflight::new(&rules, Some(&host));
        assert_eq!(pass.state(), PreflightState::NotRun);
        assert!(pass.run("maya").is_err());
        assert_eq!(pass.state(), PreflightState::Blocked);
        assert!(pass.state().is_terminal());
        assert!(!pass.state().permits_submission());
    }

    #[test]
    fn test_state_after_skip() {
        let rules = source(json!([rule("getRenderer()", "equal", &["sw"], "%match%")]));
        let mut pass = Preflight::new(&rules, None);
        pass.run("maya").unwrap();
        assert_eq!(pass.state(), PreflightState::Skipped);
        assert!(pass.state().permits_submission());
    }
}
