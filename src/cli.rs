//! CLI argument parsing for the htn planner

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::htn::{self, State};

#[derive(Parser, Debug)]
#[command(name = "htn")]
#[command(author, version, about = "HTN planner that learns missing methods", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Where the task library comes from
#[derive(Args, Debug, Clone)]
pub struct DomainSource {
    /// Domain JSON file
    #[arg(short = 'f', long, conflicts_with = "domain")]
    pub file: Option<PathBuf>,

    /// Name of a domain in the store
    #[arg(short, long)]
    pub domain: Option<String>,
}

/// Initial world state
#[derive(Args, Debug, Clone, Default)]
pub struct StateArgs {
    /// Predicate assignment as name=true|false (repeatable)
    #[arg(short, long = "state")]
    pub state: Vec<String>,

    /// JSON object of predicate values, applied before --state
    #[arg(long)]
    pub state_file: Option<PathBuf>,
}

impl StateArgs {
    pub fn load(&self) -> Result<State, htn::Error> {
        let mut state = match self.state_file {
            Some(ref path) => State::from_file(path)?,
            None => State::new(),
        };
        for (name, value) in State::parse_assignments(&self.state)?.0 {
            state.set(&name, value);
        }
        Ok(state)
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the plan for a goal task
    Plan {
        #[command(flatten)]
        source: DomainSource,

        /// Goal task name
        #[arg(required = true)]
        goal: String,

        #[command(flatten)]
        state: StateArgs,
    },

    /// Plan, learn missing methods, and execute
    Run {
        #[command(flatten)]
        source: DomainSource,

        /// Goal task name
        #[arg(required = true)]
        goal: String,

        #[command(flatten)]
        state: StateArgs,

        /// Do not write learned methods back
        #[arg(long)]
        no_save: bool,
    },

    /// Learn a method for an action whose preconditions are not met
    Learn {
        #[command(flatten)]
        source: DomainSource,

        /// Action task name
        #[arg(required = true)]
        task: String,

        #[command(flatten)]
        state: StateArgs,
    },

    /// Execute a list of actions
    Exec {
        #[command(flatten)]
        source: DomainSource,

        /// Action names in order
        #[arg(required = true)]
        actions: Vec<String>,

        #[command(flatten)]
        state: StateArgs,
    },

    /// Manage stored domains
    Domain {
        #[command(subcommand)]
        command: DomainCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum DomainCommand {
    /// List stored domains
    List,

    /// Print a domain's methods and actions
    Show {
        #[arg(required = true)]
        name: String,
    },

    /// Store a domain JSON file under a name
    Import {
        #[arg(required = true)]
        name: String,

        #[arg(required = true)]
        file: PathBuf,

        #[arg(long, default_value = "")]
        description: String,

        /// Tag (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },

    /// Write a stored domain to a JSON file
    Export {
        #[arg(required = true)]
        name: String,

        #[arg(required = true)]
        file: PathBuf,
    },

    /// Delete a stored domain
    Delete {
        #[arg(required = true)]
        name: String,
    },

    /// Remove every learned method from a domain
    ForgetLearned {
        #[arg(required = true)]
        name: String,
    },
}
