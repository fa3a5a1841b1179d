use log::info;

use super::{
    domain::{ActionDef, Domain, MethodDef},
    state::{check_preconditions, Literal, State},
};

/// Actions whose effects set `predicate` true, in library order. A negated
/// literal is looked up by its bare name; only positive effects count.
pub fn find_providers(predicate: &Literal, domain: &Domain) -> Vec<String> {
    let mut providers = Vec::new();
    for action in &domain.actions {
        for effect in &action.effects {
            if !effect.negated && effect.predicate == predicate.predicate {
                providers.push(action.task.clone());
            }
        }
    }
    providers
}

/// Synthesizes `task -> [provider, task]` for the first missing predicate that
/// has a provider and puts it in front of every other method. Returns false and
/// leaves the domain untouched when no provider exists.
pub fn learn_method(task_name: &str, missing: &[Literal], domain: &mut Domain) -> bool {
    for predicate in missing {
        if let Some(provider) = find_providers(predicate, domain).into_iter().next() {
            let method = MethodDef {
                task: task_name.to_owned(),
                preconditions: Vec::new(),
                subtasks: vec![provider.clone(), task_name.to_owned()],
                is_learned: true,
            };
            domain.methods.insert(0, method);
            info!(
                "Learned method for '{}' to satisfy '{}' by using '{}'",
                task_name, predicate, provider
            );
            return true;
        }
    }
    false
}

pub fn missing_for_action(action: &ActionDef, state: &State) -> Vec<Literal> {
    check_preconditions(state, &action.preconditions).1
}
