use std::sync::Arc;

use htn_learner::htn::{
    ethics::StaticGate,
    executor::{execute, Executor, NoopActuator},
    learner::learn_method,
    planner::{diagnose, plan, Failure},
    ActionDef, Domain, Literal, MethodDef, State,
};

fn names(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| String::from(*s)).collect()
}

fn publish_domain() -> Domain {
    Domain::new(
        vec![MethodDef::new("PublishDoc", &[], &["WriteDraft", "GetReview"]).unwrap()],
        vec![
            ActionDef::new("WriteDraft", &[], &["draft_written"]).unwrap(),
            ActionDef::new("GetReview", &["draft_written"], &["review_done"]).unwrap(),
            ActionDef::new("Submit", &["review_done"], &["submitted"]).unwrap(),
        ],
    )
}

#[test]
fn publish_doc_decomposes_in_order() {
    let domain = publish_domain();
    assert_eq!(
        plan(&State::new(), "PublishDoc", &domain),
        Some(names(&["WriteDraft", "GetReview"]))
    );
}

#[test]
fn submit_is_learned_from_review_gap() {
    let mut domain = publish_domain();
    let empty = State::new();

    assert_eq!(plan(&empty, "Submit", &domain), None);
    let missing = match diagnose(&empty, "Submit", &domain) {
        Failure::PreconditionGap(missing) => missing,
        other => panic!("unexpected diagnosis: {:?}", other),
    };
    assert_eq!(missing, vec![Literal::positive("review_done")]);

    assert!(learn_method("Submit", &missing, &mut domain));
    let learned = &domain.methods[0];
    assert_eq!(learned.task, "Submit");
    assert!(learned.preconditions.is_empty());
    assert_eq!(learned.subtasks, names(&["GetReview", "Submit"]));
    assert!(learned.is_learned);

    let drafted: State = vec![("draft_written", true)].into_iter().collect();
    assert_eq!(plan(&drafted, "Submit", &domain), Some(names(&["GetReview", "Submit"])));
}

#[test]
fn harmful_action_is_skipped_before_the_gate() {
    let domain =
        Domain::new(vec![], vec![ActionDef::new("harm_human", &[], &["human_harmed"]).unwrap()]);
    let gate = Arc::new(StaticGate::allow_all());
    let executor = Executor::new()
        .with_gate(Box::new(Arc::clone(&gate)))
        .with_actuator(Box::new(NoopActuator));
    let execution = executor.run(&State::new(), &names(&["harm_human"]), &domain);
    assert_eq!(execution.state, State::new());
    assert!(execution.completed());
    assert!(gate.calls().is_empty());
}

#[test]
fn execution_stops_at_first_unmet_precondition() {
    let domain = Domain::new(
        vec![],
        vec![
            ActionDef::new("X", &[], &["x"]).unwrap(),
            ActionDef::new("Y", &["y_ready"], &["y"]).unwrap(),
        ],
    );
    let state = execute(&State::new(), &names(&["X", "Y"]), &domain);
    let expected: State = vec![("x", true)].into_iter().collect();
    assert_eq!(state, expected);
}

#[test]
fn caller_state_is_never_mutated() {
    let domain = publish_domain();
    let state: State = vec![("draft_written", false), ("unrelated", true)].into_iter().collect();
    let snapshot = state.clone();
    let plan = plan(&state, "PublishDoc", &domain).unwrap();
    let after = execute(&state, &plan, &domain);
    assert_eq!(state.0, snapshot.0);
    assert!(after.get("review_done"));
}

#[test]
fn report_demo_domain_learns_and_delivers() {
    use htn_learner::htn::{
        shared::SharedDomain,
        solver::{Outcome, Solver},
    };

    let path =
        std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("domains").join("report.json");
    let shared = SharedDomain::new(Domain::from_file(path).unwrap());
    let executor = Executor::new().with_actuator(Box::new(NoopActuator));
    let report = Solver::default().solve(&State::new(), "DeliverReport", &shared, &executor);
    assert_eq!(report.learned.len(), 1);
    match report.outcome {
        Outcome::Executed { plan, execution } => {
            assert_eq!(plan, names(&["WriteDraft", "GetReview", "SubmitReport"]));
            assert!(execution.state.get("report_submitted"));
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}
