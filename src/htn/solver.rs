use log::{info, warn};

use super::{
    domain::MethodDef,
    executor::{Execution, Executor},
    learner::missing_for_action,
    planner::{PlanError, Planner},
    shared::SharedDomain,
    state::State,
};

pub const DEFAULT_MAX_RETRIES: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A plan was found and handed to the executor.
    Executed { plan: Vec<String>, execution: Execution },
    /// Planning failed and no action's gap could be learned.
    Stuck,
    RetriesExhausted,
    /// Planning was cancelled or hit its expansion limit.
    Aborted(PlanError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub attempts: usize,
    pub learned: Vec<MethodDef>,
    pub outcome: Outcome,
}

/// Plan, learn from precondition gaps, and retry until a plan executes.
pub struct Solver {
    pub max_retries: usize,
    pub max_expansions: Option<usize>,
}

impl Default for Solver {
    fn default() -> Self {
        Self { max_retries: DEFAULT_MAX_RETRIES, max_expansions: None }
    }
}

impl Solver {
    pub fn solve(
        &self,
        state: &State,
        goal: &str,
        domain: &SharedDomain,
        executor: &Executor,
    ) -> Report {
        let mut learned = Vec::new();
        for attempt in 1..=self.max_retries {
            info!("Planning attempt {} for {}", attempt, goal);
            let snapshot = domain.snapshot();
            let mut planner = Planner::new(&snapshot);
            if let Some(limit) = self.max_expansions {
                planner = planner.with_max_expansions(limit);
            }
            match planner.plan(state, goal) {
                Ok(plan) => {
                    info!("Plan found: {:?}", plan);
                    let execution = executor.run(state, &plan, &snapshot);
                    let outcome = Outcome::Executed { plan, execution };
                    return Report { attempts: attempt, learned, outcome };
                }
                Err(PlanError::NoPlan) => (),
                Err(e) => {
                    return Report { attempts: attempt, learned, outcome: Outcome::Aborted(e) }
                }
            }

            info!("Plan failed, attempting to learn");
            let method = snapshot.actions.iter().find_map(|action| {
                let missing = missing_for_action(action, state);
                if missing.is_empty() {
                    None
                } else {
                    domain.learn(&action.task, &missing)
                }
            });
            match method {
                Some(method) => learned.push(method),
                None => {
                    warn!("No learnable providers found for missing prerequisites of {}", goal);
                    return Report { attempts: attempt, learned, outcome: Outcome::Stuck };
                }
            }
        }
        Report { attempts: self.max_retries, learned, outcome: Outcome::RetriesExhausted }
    }
}
