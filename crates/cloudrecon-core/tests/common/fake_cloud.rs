//! In-memory stand-in for a vendor compute API.
//!
//! New instances walk through a fixed list of statuses, one per describe
//! call, and stay on the last one. Deleted instances report `SHUTTING-DOWN`
//! twice and then disappear. Optionally every Nth call is throttled.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use cloudrecon_core::RemoteError;

const DELETE_POLLS: usize = 2;

struct Instance {
    lifecycle: Vec<String>,
    polls: usize,
    deleting: bool,
}

pub struct FakeCloud {
    lifecycle: Vec<String>,
    throttle_every: usize,
    counter: AtomicUsize,
    instances: Mutex<HashMap<String, Instance>>,
    calls: Mutex<Vec<(String, Instant)>>,
}

impl FakeCloud {
    pub fn new(lifecycle: &[&str]) -> Self {
        Self {
            lifecycle: lifecycle.iter().map(|s| s.to_string()).collect(),
            throttle_every: 0,
            counter: AtomicUsize::new(0),
            instances: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Reject every `n`th call (across all actions) with `RequestLimitExceeded`.
    pub fn with_throttle_every(mut self, n: usize) -> Self {
        self.throttle_every = n;
        self
    }

    fn enter(&self, action: &str) -> Result<(), RemoteError> {
        self.calls
            .lock()
            .unwrap()
            .push((action.to_string(), Instant::now()));
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        if self.throttle_every > 0 && n % self.throttle_every == 0 {
            return Err(RemoteError::new("RequestLimitExceeded", "slow down")
                .with_request_id(format!("req-{n}")));
        }
        Ok(())
    }

    pub fn run_instance(&self) -> Result<String, RemoteError> {
        self.enter("RunInstances")?;
        let mut instances = self.instances.lock().unwrap();
        let id = format!("ins-{}", instances.len() + 1);
        instances.insert(
            id.clone(),
            Instance {
                lifecycle: self.lifecycle.clone(),
                polls: 0,
                deleting: false,
            },
        );
        Ok(id)
    }

    pub fn describe_instance(&self, id: &str) -> Result<String, RemoteError> {
        self.enter("DescribeInstances")?;
        let mut instances = self.instances.lock().unwrap();
        let not_found = || RemoteError::new("InvalidInstanceId.NotFound", format!("{id} not found"));
        let inst = instances.get_mut(id).ok_or_else(not_found)?;
        if inst.deleting && inst.polls >= DELETE_POLLS {
            instances.remove(id);
            return Err(not_found());
        }
        inst.polls += 1;
        let idx = (inst.polls - 1).min(inst.lifecycle.len().saturating_sub(1));
        Ok(inst.lifecycle.get(idx).cloned().unwrap_or_default())
    }

    pub fn terminate_instance(&self, id: &str) -> Result<(), RemoteError> {
        self.enter("TerminateInstances")?;
        let mut instances = self.instances.lock().unwrap();
        match instances.get_mut(id) {
            Some(inst) => {
                inst.lifecycle = vec!["SHUTTING-DOWN".to_string()];
                inst.polls = 0;
                inst.deleting = true;
                Ok(())
            }
            None => Err(RemoteError::new("InvalidInstanceId.NotFound", format!("{id} not found"))),
        }
    }

    pub fn exists(&self, id: &str) -> bool {
        self.instances.lock().unwrap().contains_key(id)
    }

    pub fn calls_for(&self, action: &str) -> Vec<Instant> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(a, _)| a == action)
            .map(|(_, t)| *t)
            .collect()
    }
}
