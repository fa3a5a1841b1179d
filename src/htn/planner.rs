use std::{
    collections::HashSet,
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use log::debug;

use super::{
    domain::Domain,
    state::{apply_effects, check_preconditions, Literal, State},
};

/// Shared flag used to stop a running decomposition from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// Every decomposition of the goal failed.
    NoPlan,
    Cancelled,
    /// More decomposition calls than the configured limit were needed.
    ExpansionLimit(usize),
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoPlan => write!(f, "no plan found"),
            Self::Cancelled => write!(f, "planning cancelled"),
            Self::ExpansionLimit(n) => write!(f, "planning stopped after {} task expansions", n),
        }
    }
}

impl std::error::Error for PlanError {}

/// Why a task could not be planned, as seen from the task library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// The action exists but these preconditions do not hold.
    PreconditionGap(Vec<Literal>),
    /// Neither a method nor an action is declared for the task.
    NoApplicableOperator,
    /// Methods exist but none of them decomposes in the given state. Cycles
    /// end up here too.
    Unresolvable,
}

/// Recursive HTN decomposition over a task library.
pub struct Planner<'a> {
    domain: &'a Domain,
    cancel: Option<CancelToken>,
    max_expansions: Option<usize>,
}

impl<'a> Planner<'a> {
    pub fn new(domain: &'a Domain) -> Self {
        Self { domain, cancel: None, max_expansions: None }
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn with_max_expansions(mut self, limit: usize) -> Self {
        self.max_expansions = Some(limit);
        self
    }

    /// Expands `task_name` into a flat sequence of primitive action names.
    /// `state` is never modified; every trial works on a copy.
    pub fn plan(&self, state: &State, task_name: &str) -> Result<Vec<String>, PlanError> {
        let mut search = Search { planner: self, path: HashSet::new(), expansions: 0 };
        match search.decompose(state, task_name)? {
            Some(plan) => Ok(plan),
            None => Err(PlanError::NoPlan),
        }
    }
}

struct Search<'p, 'a> {
    planner: &'p Planner<'a>,
    path: HashSet<String>,
    expansions: usize,
}

impl Search<'_, '_> {
    fn decompose(
        &mut self,
        state: &State,
        task_name: &str,
    ) -> Result<Option<Vec<String>>, PlanError> {
        if let Some(ref token) = self.planner.cancel {
            if token.is_cancelled() {
                return Err(PlanError::Cancelled);
            }
        }
        self.expansions += 1;
        if let Some(limit) = self.planner.max_expansions {
            if self.expansions > limit {
                return Err(PlanError::ExpansionLimit(limit));
            }
        }
        if self.path.contains(task_name) {
            // Re-entry never expands methods again, but the primitive itself may apply.
            debug!("Cycle detected: {} is already being decomposed", task_name);
            return Ok(self.primitive(state, task_name));
        }
        self.path.insert(task_name.to_owned());
        let result = self.expand(state, task_name);
        self.path.remove(task_name);
        result
    }

    fn expand(&mut self, state: &State, task_name: &str) -> Result<Option<Vec<String>>, PlanError> {
        let domain = self.planner.domain;
        debug!("Planning {} in state {}", task_name, state);

        for (i, method) in domain.methods_for(task_name).enumerate() {
            let (ok, missing) = check_preconditions(state, &method.preconditions);
            if !ok {
                debug!("Method {}#{} not applicable, missing {:?}", task_name, i, missing);
                continue;
            }
            let mut local = state.clone();
            let mut plan = Vec::new();
            let mut complete = true;
            for subtask in &method.subtasks {
                match self.decompose(&local, subtask)? {
                    Some(subplan) => {
                        for name in &subplan {
                            if let Some(action) = domain.find_action(name) {
                                apply_effects(&mut local, &action.effects);
                            }
                        }
                        plan.extend(subplan);
                    }
                    None => {
                        debug!("Method {}#{} failed at subtask {}", task_name, i, subtask);
                        complete = false;
                        break;
                    }
                }
            }
            if complete {
                debug!("Planned {}: {:?}", task_name, plan);
                return Ok(Some(plan));
            }
        }

        Ok(self.primitive(state, task_name))
    }

    fn primitive(&self, state: &State, task_name: &str) -> Option<Vec<String>> {
        match self.planner.domain.find_action(task_name) {
            Some(action) => {
                let (ok, missing) = check_preconditions(state, &action.preconditions);
                if ok {
                    Some(vec![action.task.clone()])
                } else {
                    debug!("Action {} not applicable, missing {:?}", task_name, missing);
                    None
                }
            }
            None => {
                debug!("No applicable method or action for {}", task_name);
                None
            }
        }
    }
}

/// Plans without cancellation or limits; `None` means no plan exists.
pub fn plan(state: &State, task_name: &str, domain: &Domain) -> Option<Vec<String>> {
    Planner::new(domain).plan(state, task_name).ok()
}

/// Classifies why `task_name` is not directly achievable in `state`. Only a
/// precondition gap on an existing action can be fed to the learner.
pub fn diagnose(state: &State, task_name: &str, domain: &Domain) -> Failure {
    if !domain.has_operator(task_name) {
        return Failure::NoApplicableOperator;
    }
    if let Some(action) = domain.find_action(task_name) {
        let (ok, missing) = check_preconditions(state, &action.preconditions);
        if !ok {
            return Failure::PreconditionGap(missing);
        }
    }
    Failure::Unresolvable
}
