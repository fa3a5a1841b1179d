use std::time::Duration;

use clap::Parser;
use eyre::{eyre, Context, Result};
use log::{info, warn};

use htn_learner::cli::{Cli, Command, DomainCommand, DomainSource};
use htn_learner::config::Config;
use htn_learner::htn::{
    ethics::HttpPrinciplesGate,
    executor::{Execution, Executor, Outcome as StepOutcome, SimulatedActuator},
    learner,
    planner::{self, Planner},
    shared::SharedDomain,
    solver::{Outcome, Solver},
    store::{DomainRecord, DomainStore},
    Domain,
};

fn setup_logging() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    Ok(())
}

/// A loaded task library and where to write it back.
enum Loaded {
    File(std::path::PathBuf),
    Stored(DomainRecord),
}

fn load(source: &DomainSource, config: &Config) -> Result<(Domain, Loaded)> {
    match (&source.file, &source.domain) {
        (Some(path), _) => {
            let domain = Domain::from_file(path).context("Failed to load domain")?;
            Ok((domain, Loaded::File(path.clone())))
        }
        (None, Some(name)) => {
            let store = DomainStore::open(&config.store_path)?;
            let record = store.get(name)?;
            Ok((record.domain(), Loaded::Stored(record)))
        }
        (None, None) => Err(eyre!("Either --file or --domain is required")),
    }
}

fn persist(domain: Domain, loaded: Loaded, config: &Config) -> Result<()> {
    match loaded {
        Loaded::File(path) => domain.save(&path).context("Failed to save domain")?,
        Loaded::Stored(mut record) => {
            record.set_domain(domain);
            DomainStore::open(&config.store_path)?.save(&mut record)?;
        }
    }
    Ok(())
}

fn build_executor(config: &Config) -> Result<Executor> {
    let mut executor = Executor::new().with_actuator(Box::new(SimulatedActuator {
        delay: Duration::from_millis(config.action_delay_ms),
    }));
    if let Some(ref url) = config.principles_url {
        let gate = HttpPrinciplesGate::new(url).context("Failed to create principles client")?;
        info!("Principles client initialized: {}", gate.base_url());
        executor = executor.with_gate(Box::new(gate));
    }
    Ok(executor)
}

fn print_execution(execution: &Execution) {
    for step in &execution.steps {
        match step.outcome {
            StepOutcome::Applied => println!("  -> {}", step.action),
            StepOutcome::AppliedGateFailed(ref e) => {
                println!("  -> {} (principles check failed: {})", step.action, e)
            }
            StepOutcome::UnknownAction => println!("  ?  {} (no action definition)", step.action),
            StepOutcome::Denied(ref reasons) => {
                println!("  x  {} blocked: {}", step.action, reasons.join("; "))
            }
        }
    }
    if let Some(ref halt) = execution.halted {
        let missing: Vec<String> = halt.missing.iter().map(|m| m.to_string()).collect();
        println!("Halted at {}: missing [{}]", halt.action, missing.join(", "));
    }
    println!("State: {}", execution.state);
}

fn print_plan(plan: &[String]) {
    for (i, action) in plan.iter().enumerate() {
        println!("  {}. {}", i + 1, action);
    }
}

fn main() -> Result<()> {
    setup_logging().context("Failed to setup logging")?;

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.apply_env_overrides();

    match cli.command {
        Command::Plan { source, goal, state } => {
            let (domain, _) = load(&source, &config)?;
            let state = state.load()?;
            let mut planner = Planner::new(&domain);
            if let Some(limit) = config.max_expansions {
                planner = planner.with_max_expansions(limit);
            }
            match planner.plan(&state, &goal) {
                Ok(plan) => {
                    println!("Plan for {}:", goal);
                    print_plan(&plan);
                }
                Err(e) => {
                    println!("No plan for {}: {}", goal, e);
                    println!("Diagnosis: {:?}", planner::diagnose(&state, &goal, &domain));
                }
            }
        }
        Command::Run { source, goal, state, no_save } => {
            let (domain, loaded) = load(&source, &config)?;
            let state = state.load()?;
            let shared = SharedDomain::new(domain);
            let executor = build_executor(&config)?;
            let solver =
                Solver { max_retries: config.max_retries, max_expansions: config.max_expansions };
            let report = solver.solve(&state, &goal, &shared, &executor);

            for method in &report.learned {
                println!("Learned {} -> [{}]", method.task, method.subtasks.join(", "));
            }
            match report.outcome {
                Outcome::Executed { ref plan, ref execution } => {
                    println!("Plan found after {} attempt(s):", report.attempts);
                    print_plan(plan);
                    print_execution(execution);
                }
                Outcome::Stuck => {
                    println!("No learnable providers found for missing prerequisites.")
                }
                Outcome::RetriesExhausted => {
                    println!("Gave up after {} attempts.", report.attempts)
                }
                Outcome::Aborted(ref e) => println!("Planning aborted: {}", e),
            }

            if !report.learned.is_empty() {
                if no_save {
                    warn!("Discarding {} learned method(s)", report.learned.len());
                } else {
                    persist(Domain::clone(&shared.snapshot()), loaded, &config)?;
                }
            }
        }
        Command::Learn { source, task, state } => {
            let (mut domain, loaded) = load(&source, &config)?;
            let state = state.load()?;
            let action =
                domain.find_action(&task).ok_or_else(|| eyre!("No action named {}", task))?;
            let missing = learner::missing_for_action(action, &state);
            if missing.is_empty() {
                println!("{} is already applicable.", task);
            } else if learner::learn_method(&task, &missing, &mut domain) {
                println!("Learned {} -> [{}]", task, domain.methods[0].subtasks.join(", "));
                persist(domain, loaded, &config)?;
            } else {
                let missing: Vec<String> = missing.iter().map(|m| m.to_string()).collect();
                println!("No provider for any of [{}].", missing.join(", "));
            }
        }
        Command::Exec { source, actions, state } => {
            let (domain, _) = load(&source, &config)?;
            let state = state.load()?;
            let execution = build_executor(&config)?.run(&state, &actions, &domain);
            print_execution(&execution);
        }
        Command::Domain { command } => {
            let store = DomainStore::open(&config.store_path)?;
            match command {
                DomainCommand::List => {
                    for s in store.list()? {
                        println!("{}  methods={} (learned {}) actions={}  {}",
                            s.name, s.method_count, s.learned_count, s.action_count, s.description);
                    }
                }
                DomainCommand::Show { name } => {
                    let record = store.get(&name)?;
                    println!("{}: {}", record.name, record.description);
                    print!("{}", record.domain());
                }
                DomainCommand::Import { name, file, description, tags } => {
                    let domain = Domain::from_file(&file).context("Failed to load domain")?;
                    let mut record = DomainRecord::new(&name, &description, domain);
                    record.tags = tags;
                    store.create(&record)?;
                    println!("Imported {} as {}", file.display(), name);
                }
                DomainCommand::Export { name, file } => {
                    store.get(&name)?.domain().save(&file)?;
                    println!("Exported {} to {}", name, file.display());
                }
                DomainCommand::Delete { name } => {
                    store.delete(&name)?;
                    println!("Deleted {}", name);
                }
                DomainCommand::ForgetLearned { name } => {
                    let count = store.forget_learned(&name)?;
                    println!("Removed {} learned method(s) from {}", count, name);
                }
            }
        }
    }
    Ok(())
}
