//! File-backed task library store, one JSON document per domain name.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};

use super::{
    domain::{ActionDef, Domain, MethodDef},
    Error,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainRecord {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub methods: Vec<MethodDef>,
    #[serde(default)]
    pub actions: Vec<ActionDef>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DomainRecord {
    pub fn new(name: &str, description: &str, domain: Domain) -> Self {
        let now = Utc::now();
        Self {
            name: name.to_owned(),
            description: description.to_owned(),
            methods: domain.methods,
            actions: domain.actions,
            tags: Vec::new(),
            metadata: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn domain(&self) -> Domain {
        Domain::new(self.methods.clone(), self.actions.clone())
    }

    pub fn set_domain(&mut self, domain: Domain) {
        self.methods = domain.methods;
        self.actions = domain.actions;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainSummary {
    pub name: String,
    pub description: String,
    pub method_count: usize,
    pub learned_count: usize,
    pub action_count: usize,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&DomainRecord> for DomainSummary {
    fn from(r: &DomainRecord) -> Self {
        Self {
            name: r.name.clone(),
            description: r.description.clone(),
            method_count: r.methods.len(),
            learned_count: r.methods.iter().filter(|m| m.is_learned).count(),
            action_count: r.actions.len(),
            tags: r.tags.clone(),
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

pub struct DomainStore {
    root: PathBuf,
}

fn validate_name(name: &str) -> Result<(), Error> {
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err(Error::InvalidName(name.to_owned()));
    }
    Ok(())
}

impl DomainStore {
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, Error> {
        let root = root.as_ref().to_owned();
        fs::create_dir_all(&root).map_err(|source| Error::Io { path: root.clone(), source })?;
        Ok(Self { root })
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, Error> {
        validate_name(name)?;
        Ok(self.root.join(format!("{}.json", name)))
    }

    pub fn exists(&self, name: &str) -> Result<bool, Error> {
        Ok(self.path_for(name)?.exists())
    }

    pub fn create(&self, record: &DomainRecord) -> Result<(), Error> {
        if self.exists(&record.name)? {
            return Err(Error::DomainExists(record.name.clone()));
        }
        self.write(record)?;
        info!("Created domain {}", record.name);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<DomainRecord, Error> {
        let path = self.path_for(name)?;
        if !path.exists() {
            return Err(Error::DomainNotFound(name.to_owned()));
        }
        let data =
            fs::read_to_string(&path).map_err(|source| Error::Io { path: path.clone(), source })?;
        serde_json::from_str(&data).map_err(|source| Error::Json { path, source })
    }

    /// Writes `record`, stamping `updated_at`.
    pub fn save(&self, record: &mut DomainRecord) -> Result<(), Error> {
        record.updated_at = Utc::now();
        self.write(record)
    }

    fn write(&self, record: &DomainRecord) -> Result<(), Error> {
        let path = self.path_for(&record.name)?;
        let data = serde_json::to_string_pretty(record)
            .map_err(|source| Error::Json { path: path.clone(), source })?;
        fs::write(&path, data).map_err(|source| Error::Io { path, source })
    }

    pub fn list(&self) -> Result<Vec<DomainSummary>, Error> {
        let io_error = |source: std::io::Error| Error::Io { path: self.root.clone(), source };
        let entries = fs::read_dir(&self.root).map_err(io_error)?;
        let mut summaries = Vec::new();
        for entry in entries {
            let path = entry.map_err(io_error)?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(name) = path.file_stem().and_then(|s| s.to_str()) {
                if validate_name(name).is_ok() {
                    summaries.push(DomainSummary::from(&self.get(name)?));
                }
            }
        }
        summaries.sort_by(|l, r| l.name.cmp(&r.name));
        Ok(summaries)
    }

    pub fn delete(&self, name: &str) -> Result<(), Error> {
        let path = self.path_for(name)?;
        if !path.exists() {
            return Err(Error::DomainNotFound(name.to_owned()));
        }
        fs::remove_file(&path).map_err(|source| Error::Io { path, source })?;
        info!("Deleted domain {}", name);
        Ok(())
    }

    fn modify<F>(&self, name: &str, f: F) -> Result<DomainRecord, Error>
    where
        F: FnOnce(&mut DomainRecord),
    {
        let mut record = self.get(name)?;
        f(&mut record);
        self.save(&mut record)?;
        Ok(record)
    }

    /// Replaces the first method for the same task, or appends.
    pub fn add_method(&self, name: &str, method: MethodDef) -> Result<(), Error> {
        self.modify(name, |r| match r.methods.iter().position(|m| m.task == method.task) {
            Some(i) => r.methods[i] = method,
            None => r.methods.push(method),
        })?;
        Ok(())
    }

    /// Replaces the first action for the same task, or appends.
    pub fn add_action(&self, name: &str, action: ActionDef) -> Result<(), Error> {
        self.modify(name, |r| match r.actions.iter().position(|a| a.task == action.task) {
            Some(i) => r.actions[i] = action,
            None => r.actions.push(action),
        })?;
        Ok(())
    }

    /// Removes the first method for `task`. Returns whether one was found.
    pub fn remove_method(&self, name: &str, task: &str) -> Result<bool, Error> {
        let mut removed = false;
        self.modify(name, |r| {
            if let Some(i) = r.methods.iter().position(|m| m.task == task) {
                r.methods.remove(i);
                removed = true;
            }
        })?;
        Ok(removed)
    }

    pub fn remove_action(&self, name: &str, task: &str) -> Result<bool, Error> {
        let mut removed = false;
        self.modify(name, |r| {
            if let Some(i) = r.actions.iter().position(|a| a.task == task) {
                r.actions.remove(i);
                removed = true;
            }
        })?;
        Ok(removed)
    }

    /// Removes every learned method and returns how many there were.
    pub fn forget_learned(&self, name: &str) -> Result<usize, Error> {
        let mut count = 0;
        self.modify(name, |r| {
            let mut domain = r.domain();
            count = domain.forget_learned();
            r.set_domain(domain);
        })?;
        Ok(count)
    }
}
