//! Hierarchical task network planning with online method learning.
//!
//! Given a [`State`](htn::State) and a task library ([`Domain`](htn::Domain)),
//! the planner expands a goal task into primitive actions. When an action's
//! preconditions are unmet, the learner chains in an action that provides the
//! missing predicate and stores the result as a new method. Plans run through
//! an executor that consults an ethics gate before every action.
//!
//! ```ignore
//! use htn_learner::htn::{planner, learner, executor, Domain, State};
//!
//! let mut domain = Domain::from_file("domain.json")?;
//! let state = State::new();
//! if let Some(plan) = planner::plan(&state, "DeliverReport", &domain) {
//!     let state = executor::execute(&state, &plan, &domain);
//! }
//! ```

pub mod cli;
pub mod config;
pub mod htn;
