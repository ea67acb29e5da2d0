//! Error reporting - kinds, templated messages and near-miss suggestions
//!
//! Design: Every fallible runtime operation returns `AdiResult<T>`:
//! - `ErrorKind` classifies the failure for callers that branch on it
//! - The message is a template; `^TOKEN` markers are filled in with `token()`
//! - Name lookups attach "did you mean" suggestions from the names in scope
//!
//! Failure is data: operations never panic on bad user input, and the first
//! failure short-circuits the rest of the operation through `?`.

use std::fmt;

#[cfg(test)]
mod tests;

pub type AdiResult<T> = Result<T, AdiError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad class name, bad mode string, bad bounds
    InvalidArgument,
    /// No such member, property, component or class
    NotFound,
    /// Operation not valid for this object category
    IllegalOperation,
    /// Write attempted through a read-only handle
    ReadOnly,
    /// Reference-count or data operation on a kernel object
    KernelObject,
    /// Incompatible concurrent mapping
    AlreadyMapped,
    /// Data read before it was written
    NotSet,
    /// Instantiation of a class with no storage
    AbstractClass,
    /// Elements replaced with bad values during type conversion
    Conversion { count: usize },
    /// No generic or no applicable method
    NoMethod,
    /// Illegal use of call-next-method
    MethodCombination,
    /// Reentrant runtime access
    Recursion,
    /// Object was never given a name
    NoName,
}

impl ErrorKind {
    /// Short identifier used in logs
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument => "INVARG",
            Self::NotFound => "NOTFOUND",
            Self::IllegalOperation => "ILLOP",
            Self::ReadOnly => "RDONLY",
            Self::KernelObject => "ILLKOP",
            Self::AlreadyMapped => "MAPPED",
            Self::NotSet => "NOTSET",
            Self::AbstractClass => "ABSTRACT",
            Self::Conversion { .. } => "CONER",
            Self::NoMethod => "NOMTH",
            Self::MethodCombination => "MTHERR",
            Self::Recursion => "RECUR",
            Self::NoName => "NONAME",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conversion { count } => write!(f, "CONER({})", count),
            other => f.write_str(other.code()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdiError {
    kind: ErrorKind,
    message: String,
    suggestions: Vec<String>,
}

impl AdiError {
    pub fn new(kind: ErrorKind, template: impl Into<String>) -> Self {
        Self {
            kind,
            message: template.into(),
            suggestions: Vec::new(),
        }
    }

    /// Substitute every `^NAME` marker in the message with `value`
    pub fn token(mut self, name: &str, value: impl fmt::Display) -> Self {
        let marker = format!("^{}", name);
        if self.message.contains(&marker) {
            self.message = self.message.replace(&marker, &value.to_string());
        }
        self
    }

    pub fn with_suggestion(mut self, suggestion: String) -> Self {
        self.suggestions.push(suggestion);
        self
    }

    pub fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions = suggestions;
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }

    pub fn invalid(template: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, template)
    }

    pub fn not_found(template: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, template)
    }

    pub fn illegal(template: impl Into<String>) -> Self {
        Self::new(ErrorKind::IllegalOperation, template)
    }

    pub fn kernel(template: impl Into<String>) -> Self {
        Self::new(ErrorKind::KernelObject, template)
    }

    /// Aggregate error raised after a transfer substituted bad values
    pub fn conversion(count: usize) -> Self {
        Self::new(
            ErrorKind::Conversion { count },
            "^NERR data conversion error(s) occurred",
        )
        .token("NERR", count)
    }

    /// Unknown name with suggestions drawn from `candidates`
    pub fn unknown_name<'a>(
        kind: ErrorKind,
        template: &str,
        name: &str,
        candidates: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let similar = find_similar_names(name, candidates, 2);
        Self::new(kind, template).with_suggestions(
            similar
                .into_iter()
                .map(|s| format!("did you mean '{}'?", s))
                .collect(),
        )
    }
}

impl fmt::Display for AdiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        for suggestion in &self.suggestions {
            write!(f, " ({})", suggestion)?;
        }
        Ok(())
    }
}

impl std::error::Error for AdiError {}

/// Edit distance between two names, compared case-insensitively
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Names within `max_distance` edits of `target`, closest first
pub fn find_similar_names<'a>(
    target: &str,
    candidates: impl IntoIterator<Item = &'a str>,
    max_distance: usize,
) -> Vec<String> {
    let mut similar: Vec<(usize, &str)> = candidates
        .into_iter()
        .filter(|c| *c != target)
        .map(|c| (levenshtein_distance(target, c), c))
        .filter(|(d, _)| *d <= max_distance)
        .collect();

    similar.sort_by_key(|(d, _)| *d);
    similar.into_iter().take(3).map(|(_, s)| s.to_string()).collect()
}
