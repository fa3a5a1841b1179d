use std::{fmt, fs, path::Path};

use serde::{Deserialize, Serialize};

use super::{state::Literal, Error};

/// Primitive operator. A task name with an action is directly executable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDef {
    pub task: String,
    #[serde(default)]
    pub preconditions: Vec<Literal>,
    #[serde(default)]
    pub effects: Vec<Literal>,
}

/// Decomposition rule for a compound task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDef {
    pub task: String,
    #[serde(default)]
    pub preconditions: Vec<Literal>,
    #[serde(default)]
    pub subtasks: Vec<String>,
    #[serde(default)]
    pub is_learned: bool,
}

impl ActionDef {
    pub fn new(task: &str, preconditions: &[&str], effects: &[&str]) -> Result<Self, Error> {
        Ok(Self {
            task: task.to_owned(),
            preconditions: parse_literals(preconditions)?,
            effects: parse_literals(effects)?,
        })
    }
}

impl MethodDef {
    pub fn new(task: &str, preconditions: &[&str], subtasks: &[&str]) -> Result<Self, Error> {
        Ok(Self {
            task: task.to_owned(),
            preconditions: parse_literals(preconditions)?,
            subtasks: subtasks.iter().map(|s| String::from(*s)).collect(),
            is_learned: false,
        })
    }
}

fn parse_literals(items: &[&str]) -> Result<Vec<Literal>, Error> {
    items.iter().map(|s| s.parse()).collect()
}

/// Task library. `methods` is a priority list, most preferred first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Domain {
    #[serde(default)]
    pub methods: Vec<MethodDef>,
    #[serde(default)]
    pub actions: Vec<ActionDef>,
}

impl Domain {
    pub fn new(methods: Vec<MethodDef>, actions: Vec<ActionDef>) -> Self {
        Self { methods, actions }
    }

    /// First action declared for `name`.
    pub fn find_action(&self, name: &str) -> Option<&ActionDef> {
        self.actions.iter().find(|a| a.task == name)
    }

    /// Methods for `name` in library order.
    pub fn methods_for<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a MethodDef> + 'a {
        self.methods.iter().filter(move |m| m.task == name)
    }

    pub fn is_primitive(&self, name: &str) -> bool {
        self.find_action(name).is_some()
    }

    pub fn has_operator(&self, name: &str) -> bool {
        self.is_primitive(name) || self.methods_for(name).next().is_some()
    }

    pub fn learned_methods(&self) -> impl Iterator<Item = &MethodDef> {
        self.methods.iter().filter(|m| m.is_learned)
    }

    /// Drops every learned method and returns how many were removed.
    pub fn forget_learned(&mut self) -> usize {
        let before = self.methods.len();
        self.methods.retain(|m| !m.is_learned);
        before - self.methods.len()
    }

    pub fn from_file<P: AsRef<Path>>(filepath: P) -> Result<Domain, Error> {
        let path = filepath.as_ref();
        let code =
            fs::read_to_string(path).map_err(|source| Error::Io { path: path.to_owned(), source })?;
        serde_json::from_str(&code).map_err(|source| Error::Json { path: path.to_owned(), source })
    }

    pub fn save<P: AsRef<Path>>(&self, filepath: P) -> Result<(), Error> {
        let path = filepath.as_ref();
        let data = serde_json::to_string_pretty(self)
            .map_err(|source| Error::Json { path: path.to_owned(), source })?;
        fs::write(path, data).map_err(|source| Error::Io { path: path.to_owned(), source })
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Methods:")?;
        for m in &self.methods {
            let pre = m.preconditions.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(", ");
            writeln!(f, "  {}{} -> [{}] (preconditions: [{}])",
                m.task, if m.is_learned { " (learned)" } else { "" }, m.subtasks.join(", "), pre)?;
        }
        writeln!(f, "Actions:")?;
        for a in &self.actions {
            let pre = a.preconditions.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(", ");
            let eff = a.effects.iter().map(|e| e.to_string()).collect::<Vec<_>>().join(", ");
            writeln!(f, "  {} (preconditions: [{}], effects: [{}])", a.task, pre, eff)?;
        }
        Ok(())
    }
}
