/// One remote call as seen by the retry loop.
///
/// `action` is the vendor API action name (e.g. `CreateAutoScalingGroup`);
/// it keys the rate limiter and tags log lines. Operations are built fresh per
/// call site invocation and hold no state across attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub action: String,
    pub idempotent: bool,
}

impl Operation {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            idempotent: true,
        }
    }

    /// Mark the call as unsafe to replay after an ambiguous transport failure.
    pub fn non_idempotent(mut self) -> Self {
        self.idempotent = false;
        self
    }
}
