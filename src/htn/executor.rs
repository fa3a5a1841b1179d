use std::{thread, time::Duration};

use log::{debug, info, warn};
use serde_json::Map;

use super::{
    domain::{ActionDef, Domain},
    ethics::{EthicsContext, EthicsGate, Verdict},
    state::{apply_effects, check_preconditions, Literal, State},
};

pub const DEFAULT_ACTION_DELAY: Duration = Duration::from_millis(300);

/// Carries out the real-world part of an action before its effects are applied.
pub trait Actuator: Send + Sync {
    fn actuate(&self, action: &ActionDef);
}

/// Stands in for side effects by sleeping.
pub struct SimulatedActuator {
    pub delay: Duration,
}

impl Default for SimulatedActuator {
    fn default() -> Self {
        Self { delay: DEFAULT_ACTION_DELAY }
    }
}

impl Actuator for SimulatedActuator {
    fn actuate(&self, action: &ActionDef) {
        info!("Executing action: {}", action.task);
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
    }
}

pub struct NoopActuator;

impl Actuator for NoopActuator {
    fn actuate(&self, _action: &ActionDef) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    /// Gate consultation failed and the action ran anyway.
    AppliedGateFailed(String),
    UnknownAction,
    Denied(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub action: String,
    pub outcome: Outcome,
}

/// The step whose preconditions did not hold. Nothing after it was attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Halt {
    pub index: usize,
    pub action: String,
    pub missing: Vec<Literal>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    pub state: State,
    pub steps: Vec<Step>,
    pub halted: Option<Halt>,
}

impl Execution {
    pub fn applied(&self) -> impl Iterator<Item = &str> {
        self.steps
            .iter()
            .filter(|s| matches!(s.outcome, Outcome::Applied | Outcome::AppliedGateFailed(_)))
            .map(|s| s.action.as_str())
    }

    pub fn completed(&self) -> bool {
        self.halted.is_none()
    }
}

const HARM_REASON: &str = "Action contains harmful keywords";

/// Runs flat plans step by step: unknown actions and denied actions are
/// skipped, the first unmet precondition halts the rest of the plan.
pub struct Executor {
    gate: Option<Box<dyn EthicsGate>>,
    actuator: Box<dyn Actuator>,
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor {
    pub fn new() -> Self {
        Self { gate: None, actuator: Box::new(SimulatedActuator::default()) }
    }

    pub fn with_gate(mut self, gate: Box<dyn EthicsGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn with_actuator(mut self, actuator: Box<dyn Actuator>) -> Self {
        self.actuator = actuator;
        self
    }

    fn check(&self, action: &str) -> Result<Verdict, String> {
        let context = EthicsContext::for_action(action);
        if context.human_harm {
            return Ok(Verdict::deny(vec![HARM_REASON.to_owned()]));
        }
        match self.gate {
            Some(ref gate) => gate
                .is_action_allowed(action, &Map::new(), &context.to_map())
                .map_err(|e| e.to_string()),
            None => {
                warn!("No principles gate configured, allowing action: {}", action);
                Ok(Verdict::allow())
            }
        }
    }

    pub fn run(&self, state: &State, plan: &[String], domain: &Domain) -> Execution {
        let mut state = state.clone();
        let mut steps = Vec::with_capacity(plan.len());
        info!("Starting plan execution with {} actions", plan.len());

        for (i, name) in plan.iter().enumerate() {
            debug!("Step {}/{}: {}", i + 1, plan.len(), name);
            let action = match domain.find_action(name) {
                Some(a) => a,
                None => {
                    warn!("No action definition for {}", name);
                    steps.push(Step { action: name.clone(), outcome: Outcome::UnknownAction });
                    continue;
                }
            };

            let (ok, missing) = check_preconditions(&state, &action.preconditions);
            if !ok {
                let names: Vec<String> = missing.iter().map(|m| m.to_string()).collect();
                warn!("Preconditions failed for {}: missing {:?}", name, names);
                let halted = Some(Halt { index: i, action: name.clone(), missing });
                return Execution { state, steps, halted };
            }

            let outcome = match self.check(name) {
                Ok(verdict) if !verdict.allowed => {
                    warn!("Action blocked by principles: {}. Reasons: {:?}", name, verdict.reasons);
                    let outcome = Outcome::Denied(verdict.reasons);
                    steps.push(Step { action: name.clone(), outcome });
                    continue;
                }
                Ok(_) => Outcome::Applied,
                Err(e) => {
                    warn!("Principles check failed for {}: {}", name, e);
                    Outcome::AppliedGateFailed(e)
                }
            };

            self.actuator.actuate(action);
            apply_effects(&mut state, &action.effects);
            debug!("State after {}: {}", name, state);
            steps.push(Step { action: name.clone(), outcome });
        }

        info!("Plan execution completed. Final state: {}", state);
        Execution { state, steps, halted: None }
    }
}

/// Executes without a gate or actuation delay and returns the final state.
pub fn execute(state: &State, plan: &[String], domain: &Domain) -> State {
    Executor::new().with_actuator(Box::new(NoopActuator)).run(state, plan, domain).state
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::Value;

    use super::*;
    use crate::htn::ethics::{GateError, StaticGate};

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| String::from(*s)).collect()
    }

    fn domain() -> Domain {
        Domain::new(
            vec![],
            vec![
                ActionDef::new("X", &[], &["x"]).unwrap(),
                ActionDef::new("Y", &["y_ready"], &["y"]).unwrap(),
                ActionDef::new("Z", &[], &["z"]).unwrap(),
                ActionDef::new("harm_human", &[], &["human_harmed"]).unwrap(),
                ActionDef::new("steal", &[], &["has_stolen_item"]).unwrap(),
            ],
        )
    }

    fn executor(gate: StaticGate) -> Executor {
        Executor::new().with_gate(Box::new(gate)).with_actuator(Box::new(NoopActuator))
    }

    struct FailingGate;

    impl EthicsGate for FailingGate {
        fn is_action_allowed(
            &self,
            _: &str,
            _: &Map<String, Value>,
            _: &Map<String, Value>,
        ) -> Result<Verdict, GateError> {
            Err(GateError::Status(503))
        }
    }

    #[test]
    fn test_precondition_failure_halts() {
        let start = State::new();
        let execution =
            executor(StaticGate::allow_all()).run(&start, &names(&["X", "Y", "Z"]), &domain());
        assert!(execution.state.get("x"));
        assert!(!execution.state.get("y"));
        assert!(!execution.state.get("z"));
        let halt = Halt {
            index: 1,
            action: "Y".to_owned(),
            missing: vec![Literal::positive("y_ready")],
        };
        assert_eq!(execution.halted, Some(halt));
        assert_eq!(start, State::new());
    }

    #[test]
    fn test_unknown_action_is_skipped() {
        let execution =
            executor(StaticGate::allow_all()).run(&State::new(), &names(&["Nope", "X"]), &domain());
        assert!(execution.completed());
        assert_eq!(execution.steps[0].outcome, Outcome::UnknownAction);
        assert_eq!(execution.applied().collect::<Vec<_>>(), vec!["X"]);
    }

    #[test]
    fn test_harm_keyword_skips_without_gate_call() {
        let gate = Arc::new(StaticGate::allow_all());
        let exec = Executor::new()
            .with_gate(Box::new(Arc::clone(&gate)))
            .with_actuator(Box::new(NoopActuator));
        let execution = exec.run(&State::new(), &names(&["harm_human", "X"]), &domain());
        assert!(!execution.state.get("human_harmed"));
        assert!(execution.state.get("x"));
        assert_eq!(execution.steps[0].outcome, Outcome::Denied(vec![HARM_REASON.to_owned()]));
        assert_eq!(gate.calls(), vec!["X".to_owned()]);
    }

    #[test]
    fn test_gate_denial_continues() {
        let gate = StaticGate::allow_all().deny("steal", "theft");
        let execution = executor(gate).run(&State::new(), &names(&["steal", "Z"]), &domain());
        assert!(execution.completed());
        assert!(!execution.state.get("has_stolen_item"));
        assert!(execution.state.get("z"));
    }

    #[test]
    fn test_gate_error_fails_open() {
        let exec =
            Executor::new().with_gate(Box::new(FailingGate)).with_actuator(Box::new(NoopActuator));
        let execution = exec.run(&State::new(), &names(&["X"]), &domain());
        assert!(execution.state.get("x"));
        assert!(matches!(execution.steps[0].outcome, Outcome::AppliedGateFailed(_)));
    }

    #[test]
    fn test_no_gate_allows() {
        let state = execute(&State::new(), &names(&["X", "steal"]), &domain());
        assert!(state.get("x"));
        assert!(state.get("has_stolen_item"));
        // keyword filter still applies
        assert_eq!(execute(&State::new(), &names(&["harm_human"]), &domain()), State::new());
    }
}
