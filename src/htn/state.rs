use std::{collections::BTreeMap, convert::TryFrom, fmt, fs, path::Path, str::FromStr};

use serde::{Deserialize, Serialize};

use super::Error;

const NEGATION_PREFIX: &str = "not ";

/// A predicate that must hold (or must not hold) in a state, or that an action
/// sets true (or false). Written as `X` or `not X` in domain files.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Literal {
    pub predicate: String,
    pub negated: bool,
}

impl Literal {
    pub fn positive(predicate: &str) -> Self {
        Self { predicate: predicate.to_owned(), negated: false }
    }

    pub fn negative(predicate: &str) -> Self {
        Self { predicate: predicate.to_owned(), negated: true }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "{}{}", NEGATION_PREFIX, self.predicate)
        } else {
            write!(f, "{}", self.predicate)
        }
    }
}

impl FromStr for Literal {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (predicate, negated) = match s.strip_prefix(NEGATION_PREFIX) {
            Some(rest) => (rest, true),
            None => (s, false),
        };
        if predicate.is_empty() {
            return Err(Error::Literal(s.to_owned()));
        }
        Ok(Self { predicate: predicate.to_owned(), negated })
    }
}

impl TryFrom<String> for Literal {
    type Error = Error;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Literal> for String {
    fn from(l: Literal) -> Self {
        l.to_string()
    }
}

/// Truth assignment over predicates. Absent predicates are false. Serialized
/// as a JSON object of predicate names to booleans.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct State(pub BTreeMap<String, bool>);

impl State {
    pub fn new() -> State {
        State(BTreeMap::new())
    }

    #[inline]
    pub fn get(&self, predicate: &str) -> bool {
        self.0.get(predicate).copied().unwrap_or(false)
    }

    #[inline]
    pub fn set(&mut self, predicate: &str, value: bool) {
        self.0.insert(predicate.to_owned(), value);
    }

    pub fn holds(&self, literal: &Literal) -> bool {
        self.get(&literal.predicate) != literal.negated
    }

    pub fn apply(&mut self, effect: &Literal) {
        self.set(&effect.predicate, !effect.negated)
    }

    pub fn true_predicates(&self) -> impl Iterator<Item = &str> {
        self.0.iter().filter(|(_, v)| **v).map(|(k, _)| k.as_str())
    }

    pub fn from_file<P: AsRef<Path>>(filepath: P) -> Result<State, Error> {
        let path = filepath.as_ref();
        let data =
            fs::read_to_string(path).map_err(|source| Error::Io { path: path.to_owned(), source })?;
        serde_json::from_str(&data).map_err(|source| Error::Json { path: path.to_owned(), source })
    }

    /// Parses `name=true`, `name=false`, `name=1`, `name=0` or a bare `name` (true).
    pub fn parse_assignments<S: AsRef<str>>(items: &[S]) -> Result<State, Error> {
        let mut state = State::new();
        for item in items {
            let item = item.as_ref().trim();
            let (key, value) = match item.split_once('=') {
                Some((k, v)) => (k.trim(), v.trim()),
                None => (item, "true"),
            };
            let value = match value {
                "true" | "1" => true,
                "false" | "0" => false,
                _ => return Err(Error::Assignment(item.to_owned())),
            };
            if key.is_empty() {
                return Err(Error::Assignment(item.to_owned()));
            }
            state.set(key, value);
        }
        Ok(state)
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.true_predicates().eq(other.true_predicates())
    }
}
impl Eq for State {}

impl<K: Into<String>> std::iter::FromIterator<(K, bool)> for State {
    fn from_iter<I: IntoIterator<Item = (K, bool)>>(iter: I) -> Self {
        State(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        write!(f, "{{")?;
        for (k, v) in &self.0 {
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            write!(f, "{}={}", k, v)?;
        }
        write!(f, "}}")
    }
}

/// Returns whether every precondition holds, together with the ones that do
/// not, in their original order.
pub fn check_preconditions(state: &State, preconditions: &[Literal]) -> (bool, Vec<Literal>) {
    let missing: Vec<Literal> = preconditions.iter().filter(|p| !state.holds(p)).cloned().collect();
    (missing.is_empty(), missing)
}

pub fn apply_effects(state: &mut State, effects: &[Literal]) {
    for effect in effects {
        state.apply(effect)
    }
}
