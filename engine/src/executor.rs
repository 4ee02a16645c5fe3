//! Plan Executor
//!
//! Drives a `Plan` through a modality's operation library. The driver owns the
//! contract shared by every modality:
//!
//! - operations run strictly in plan order, one at a time
//! - an op name outside the vocabulary is logged as `skip` and execution continues
//! - malformed parameters or a failing op are logged as `error` and execution continues
//! - a failing op never leaves a half-applied artifact: each step works on a
//!   copy of the state that is committed only when the step succeeds
//! - every plan op contributes at least one log entry, in plan order
//!
//! The state machine is `Pending -> Running { step } -> Done`; `Done` is always
//! reached, whatever the intermediate statuses were.

use sdk::{ExecutionLogEntry, OpSpec, Plan, StepError};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// A closed operation vocabulary, deserialized from `{"op": name, ...}`
pub trait Operation: DeserializeOwned {
    /// Names recognized by this vocabulary
    const VOCABULARY: &'static [&'static str];

    /// Whether `name` belongs to the vocabulary
    fn is_known(name: &str) -> bool {
        Self::VOCABULARY.contains(&name)
    }
}

/// Applies one typed operation to the accumulated state
pub trait StepHandler {
    /// Artifact plus whatever derived state the modality threads through steps
    type State: Clone;

    /// The modality's operation vocabulary
    type Op: Operation;

    /// Apply `op` to `state`, returning the log entries it produced
    ///
    /// `spec` is the raw plan entry, for ops that echo parameters into the log.
    /// On error the driver discards `state`.
    fn apply(
        &mut self,
        state: &mut Self::State,
        op: Self::Op,
        spec: &OpSpec,
    ) -> Result<Vec<ExecutionLogEntry>, StepError>;
}

/// Lifecycle of one plan run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Pending,
    Running { step: usize },
    Done,
}

/// Final artifact and ordered log of one plan run
#[derive(Debug, Clone)]
pub struct Execution<S> {
    pub artifact: S,
    pub log: Vec<ExecutionLogEntry>,
}

/// Sequential plan driver over a modality's `StepHandler`
pub struct PlanExecutor<H> {
    handler: H,
    state: RunState,
}

impl<H: StepHandler> PlanExecutor<H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            state: RunState::Pending,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn into_handler(self) -> H {
        self.handler
    }

    /// Run every op of `plan` against `artifact`
    pub fn run(&mut self, plan: &Plan, artifact: H::State) -> Execution<H::State> {
        self.state = RunState::Pending;
        let mut artifact = artifact;
        let mut log = Vec::with_capacity(plan.len());

        for (index, spec) in plan.ops.iter().enumerate() {
            self.state = RunState::Running { step: index };
            let name = spec.name();

            if !H::Op::is_known(name) {
                warn!("Step {} skipped: unknown op '{}'", index, name);
                log.push(ExecutionLogEntry::skip(name, "unknown"));
                continue;
            }

            let op = match parse_op::<H::Op>(spec) {
                Ok(op) => op,
                Err(e) => {
                    warn!("Step {} ({}) rejected: {}", index, name, e);
                    log.push(ExecutionLogEntry::error(name, e.to_string()));
                    continue;
                }
            };

            let mut working = artifact.clone();
            match self.handler.apply(&mut working, op, spec) {
                Ok(entries) => {
                    debug!("Step {} ({}) produced {} log entries", index, name, entries.len());
                    artifact = working;
                    if entries.is_empty() {
                        log.push(ExecutionLogEntry::ok(name));
                    } else {
                        log.extend(entries);
                    }
                }
                Err(e) => {
                    warn!("Step {} ({}) failed: {}", index, name, e);
                    log.push(ExecutionLogEntry::error(name, e.to_string()));
                }
            }
        }

        self.state = RunState::Done;
        Execution { artifact, log }
    }
}

/// Deserialize a plan entry into the typed vocabulary
pub fn parse_op<O: Operation>(spec: &OpSpec) -> Result<O, StepError> {
    serde_json::from_value(spec.to_value()).map_err(|e| StepError::InvalidParams {
        op: spec.name().to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdk::StepStatus;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    #[serde(tag = "op", rename_all = "snake_case")]
    enum CounterOp {
        Add { amount: i64 },
        Fail,
        Quiet,
    }

    impl Operation for CounterOp {
        const VOCABULARY: &'static [&'static str] = &["add", "fail", "quiet"];
    }

    struct Counter;

    impl StepHandler for Counter {
        type State = Vec<i64>;
        type Op = CounterOp;

        fn apply(
            &mut self,
            state: &mut Vec<i64>,
            op: CounterOp,
            _spec: &OpSpec,
        ) -> Result<Vec<ExecutionLogEntry>, StepError> {
            match op {
                CounterOp::Add { amount } => {
                    state.push(amount);
                    Ok(vec![ExecutionLogEntry::ok("add").with("amount", amount)])
                }
                CounterOp::Fail => {
                    // Mutates before failing; the driver must discard it
                    state.clear();
                    Err(StepError::Failed("boom".to_string()))
                }
                CounterOp::Quiet => Ok(vec![]),
            }
        }
    }

    fn plan(ops: Vec<OpSpec>) -> Plan {
        Plan::new(ops, "test")
    }

    #[test]
    fn test_unknown_op_is_skipped_in_place() {
        let mut executor = PlanExecutor::new(Counter);
        let run = executor.run(
            &plan(vec![
                OpSpec::new("add").with("amount", 1),
                OpSpec::new("teleport"),
                OpSpec::new("add").with("amount", 2),
            ]),
            vec![],
        );

        assert_eq!(run.artifact, vec![1, 2]);
        assert_eq!(run.log.len(), 3);
        assert_eq!(run.log[1].status, StepStatus::Skip);
        assert_eq!(run.log[1].op, "teleport");
        assert_eq!(executor.state(), RunState::Done);
    }

    #[test]
    fn test_failed_step_rolls_back_and_continues() {
        let mut executor = PlanExecutor::new(Counter);
        let run = executor.run(
            &plan(vec![
                OpSpec::new("add").with("amount", 5),
                OpSpec::new("fail"),
                OpSpec::new("add").with("amount", 6),
            ]),
            vec![],
        );

        assert_eq!(run.artifact, vec![5, 6]);
        assert_eq!(run.log[1].status, StepStatus::Error);
        assert_eq!(run.log[1].detail("error").unwrap(), "boom");
    }

    #[test]
    fn test_malformed_params_are_step_errors() {
        let mut executor = PlanExecutor::new(Counter);
        let run = executor.run(&plan(vec![OpSpec::new("add")]), vec![7]);

        assert_eq!(run.artifact, vec![7]);
        assert_eq!(run.log.len(), 1);
        assert_eq!(run.log[0].status, StepStatus::Error);
        let message = run.log[0].detail("error").unwrap().as_str().unwrap();
        assert!(message.contains("amount"));
    }

    #[test]
    fn test_every_op_gets_an_entry() {
        let mut executor = PlanExecutor::new(Counter);
        let run = executor.run(&plan(vec![OpSpec::new("quiet"), OpSpec::new("quiet")]), vec![]);

        assert_eq!(run.log.len(), 2);
        assert!(run.log.iter().all(|e| e.status == StepStatus::Ok));
    }

    #[test]
    fn test_all_failing_plan_returns_input() {
        let mut executor = PlanExecutor::new(Counter);
        let run = executor.run(
            &plan(vec![OpSpec::new("fail"), OpSpec::new("nope"), OpSpec::new("fail")]),
            vec![1, 2, 3],
        );

        assert_eq!(run.artifact, vec![1, 2, 3]);
        assert_eq!(run.log.len(), 3);
        assert_eq!(executor.state(), RunState::Done);
    }
}
