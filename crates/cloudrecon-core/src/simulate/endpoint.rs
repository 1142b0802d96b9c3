//! A fake vendor endpoint that replays scripted responses.

use std::sync::atomic::{AtomicUsize, Ordering};

use super::scenario::Step;
use crate::retry::{PollResult, RemoteError, StatusTable};

/// Replays `steps` in order, one per call; the last step repeats forever.
/// An empty script always answers `ok`. Safe to share across threads.
#[derive(Debug, Default)]
pub struct ScriptedEndpoint {
    steps: Vec<Step>,
    calls: AtomicUsize,
}

impl ScriptedEndpoint {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of calls answered so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_step(&self) -> (usize, Step) {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let step = match self.steps.len() {
            0 => Step::Ok,
            len => self.steps[n.min(len - 1)].clone(),
        };
        (n + 1, step)
    }

    /// Direct call. `ok` yields `None`, a status step yields the status.
    pub fn call(&self) -> Result<Option<String>, RemoteError> {
        match self.next_step() {
            (_, Step::Ok) => Ok(None),
            (_, Step::Status(s)) => Ok(Some(s)),
            (n, Step::Error(code)) => Err(scripted_error(code, n)),
        }
    }

    /// Status poll. `ok` is ready; a status is mapped through `table`.
    pub fn observe(&self, table: &StatusTable) -> Result<PollResult<Option<String>>, RemoteError> {
        match self.next_step() {
            (_, Step::Ok) => Ok(PollResult::Ready(None)),
            (_, Step::Status(s)) => Ok(table.observe(&s, Some(s.clone()))),
            (n, Step::Error(code)) => Err(scripted_error(code, n)),
        }
    }
}

fn scripted_error(code: String, call: usize) -> RemoteError {
    RemoteError::new(code, "scripted failure").with_request_id(format!("sim-{call}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeats_last_step() {
        let ep = ScriptedEndpoint::new(vec![Step::Error("ResourceBusy".into()), Step::Ok]);
        assert!(ep.call().is_err());
        assert_eq!(ep.call().unwrap(), None);
        assert_eq!(ep.call().unwrap(), None);
        assert_eq!(ep.calls(), 3);
    }

    #[test]
    fn empty_script_is_ok() {
        let ep = ScriptedEndpoint::default();
        assert_eq!(ep.call().unwrap(), None);
    }

    #[test]
    fn errors_carry_call_number() {
        let ep = ScriptedEndpoint::new(vec![Step::Ok, Step::Error("InternalError".into())]);
        ep.call().unwrap();
        let err = ep.call().unwrap_err();
        assert_eq!(err.code, "InternalError");
        assert_eq!(err.request_id.as_deref(), Some("sim-2"));
    }

    #[test]
    fn observe_maps_statuses() {
        let table = StatusTable::new().pending(["CREATING"]).ready(["ACTIVE"]);
        let ep = ScriptedEndpoint::new(vec![
            Step::Status("creating".into()),
            Step::Status("active".into()),
            Step::Status("CREATE_FAILED".into()),
        ]);
        assert!(matches!(ep.observe(&table).unwrap(), PollResult::Pending { .. }));
        assert_eq!(
            ep.observe(&table).unwrap(),
            PollResult::Ready(Some("active".to_string()))
        );
        assert!(matches!(ep.observe(&table).unwrap(), PollResult::Failed { .. }));
    }
}
