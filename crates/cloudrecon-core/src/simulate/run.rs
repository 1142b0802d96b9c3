//! Drive a scenario through a `Reconciler` against scripted endpoints.

use std::time::{Duration, Instant};

use super::endpoint::ScriptedEndpoint;
use super::scenario::{Mode, Scenario};
use crate::reconcile::{Phase, Policies, Reconciler};
use crate::retry::{secs_to_duration, Operation, ReconcileError, StatusTable};

/// Result of one simulated reconciliation.
#[derive(Debug)]
pub struct SimulationReport {
    pub mode: Mode,
    pub issue_calls: usize,
    pub poll_calls: usize,
    pub elapsed: Duration,
    /// Final status (if the last response carried one) or the error.
    pub outcome: Result<Option<String>, ReconcileError>,
}

impl SimulationReport {
    pub fn phase(&self) -> Phase {
        Phase::after(&self.outcome)
    }
}

fn budgeted(policies: &Policies, max_elapsed: Duration) -> Policies {
    Policies {
        read: policies.read.with_max_elapsed(max_elapsed),
        write: policies.write.with_max_elapsed(max_elapsed),
        poll: policies.poll.with_max_elapsed(max_elapsed),
    }
}

/// Run `scenario` with `reconciler`'s gate, error table and context.
///
/// `max_elapsed_secs` in the scenario overrides all three budgets.
pub fn run_scenario(scenario: &Scenario, reconciler: &Reconciler) -> SimulationReport {
    let reconciler = match scenario.max_elapsed_secs {
        Some(secs) => {
            let policies = budgeted(reconciler.policies(), secs_to_duration(secs));
            reconciler.clone().with_policies(policies)
        }
        None => reconciler.clone(),
    };

    let mut op = Operation::new(scenario.action.as_str());
    if !scenario.idempotent {
        op = op.non_idempotent();
    }
    let poll_op = Operation::new(scenario.poll_action());
    let table = StatusTable::new()
        .pending(&scenario.pending)
        .ready(&scenario.ready);
    let issue = ScriptedEndpoint::new(scenario.issue.clone());
    let poll = ScriptedEndpoint::new(scenario.poll.clone());

    tracing::info!(mode = ?scenario.mode, action = %op.action, "running scenario");
    let start = Instant::now();
    let outcome = match scenario.mode {
        Mode::Read => reconciler.read(&op, || issue.call()),
        Mode::Write => reconciler.write(&op, || issue.call()),
        Mode::Delete => reconciler
            .delete(&op, || issue.call().map(drop))
            .map(|()| None),
        Mode::MutateThenPoll => {
            reconciler.mutate_then_poll(&op, || issue.call(), &poll_op, |_| poll.observe(&table))
        }
        Mode::DeleteThenPoll => reconciler
            .delete_then_poll(
                &op,
                || issue.call().map(drop),
                &poll_op,
                || poll.observe(&table).map(|p| p.map(drop)),
            )
            .map(|()| None),
    };

    SimulationReport {
        mode: scenario.mode,
        issue_calls: issue.calls(),
        poll_calls: poll.calls(),
        elapsed: start.elapsed(),
        outcome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::RetryPolicy;
    use crate::simulate::parse_scenario;

    fn fast() -> Reconciler {
        let policy = RetryPolicy::new(
            Duration::from_secs(2),
            Duration::from_millis(1),
            Duration::from_millis(4),
            2.0,
            false,
        );
        Reconciler::default().with_policies(Policies::uniform(policy))
    }

    #[test]
    fn creating_three_times_then_failed() {
        let s = parse_scenario(
            r#"{
                "action": "CreateFunction",
                "poll_action": "GetFunction",
                "issue": ["ok"],
                "poll": [{"status": "CREATING"}, {"status": "CREATING"},
                         {"status": "CREATING"}, {"status": "CREATE_FAILED"}],
                "pending": ["CREATING"],
                "ready": ["ACTIVE"]
            }"#,
        )
        .unwrap();
        let report = run_scenario(&s, &fast());
        assert_eq!(report.issue_calls, 1);
        assert_eq!(report.poll_calls, 4);
        assert_eq!(report.phase(), Phase::Failed);
        assert!(matches!(
            report.outcome,
            Err(ReconcileError::TerminalFailure { ref status, .. }) if status == "CREATE_FAILED"
        ));
    }

    #[test]
    fn settles_with_final_status() {
        let s = parse_scenario(
            r#"{
                "action": "CreateDisks",
                "poll_action": "DescribeDisks",
                "issue": [{"error": "RequestLimitExceeded"}, "ok"],
                "poll": [{"status": "PENDING"}, {"error": "ResourceNotFound.DiskNotFound"}, {"status": "ATTACHED"}],
                "pending": ["PENDING"],
                "ready": ["ATTACHED", "UNATTACHED"]
            }"#,
        )
        .unwrap();
        let report = run_scenario(&s, &fast());
        assert_eq!(report.issue_calls, 2);
        assert_eq!(report.poll_calls, 3);
        assert_eq!(report.outcome.unwrap(), Some("ATTACHED".to_string()));
    }

    #[test]
    fn non_idempotent_transport_error_is_fatal() {
        let s = parse_scenario(
            r#"{
                "mode": "write",
                "action": "RunInstances",
                "idempotent": false,
                "issue": [{"error": "ClientError.NetworkError"}, "ok"]
            }"#,
        )
        .unwrap();
        let report = run_scenario(&s, &fast());
        assert_eq!(report.issue_calls, 1);
        let err = report.outcome.unwrap_err();
        assert_eq!(err.remote().map(|e| e.code.as_str()), Some("ClientError.NetworkError"));
    }

    #[test]
    fn delete_of_missing_resource_succeeds() {
        let s = parse_scenario(
            r#"{"mode": "delete", "action": "DeleteFunction",
                "issue": [{"error": "ResourceNotFound.FunctionName"}]}"#,
        )
        .unwrap();
        let report = run_scenario(&s, &fast());
        assert!(report.outcome.is_ok());
        assert_eq!(report.phase(), Phase::Settled);
    }

    #[test]
    fn scenario_budget_overrides_policies() {
        let s = parse_scenario(
            r#"{"mode": "read", "action": "DescribeInstances",
                "issue": [{"error": "InternalError"}], "max_elapsed_secs": 0.02}"#,
        )
        .unwrap();
        let report = run_scenario(&s, &fast());
        assert_eq!(report.phase(), Phase::TimedOut);
        assert!(report.elapsed < Duration::from_secs(1));
        assert!(report.issue_calls >= 2);
    }

    #[test]
    fn huge_scenario_budget_is_capped() {
        let s = parse_scenario(
            r#"{"mode": "read", "action": "X", "issue": ["ok"], "max_elapsed_secs": 1e30}"#,
        )
        .unwrap();
        let report = run_scenario(&s, &fast());
        assert_eq!(report.phase(), Phase::Settled);
        assert_eq!(report.issue_calls, 1);
        assert_eq!(
            budgeted(fast().policies(), secs_to_duration(1e30)).read.max_elapsed,
            crate::retry::MAX_DURATION
        );
    }
}
