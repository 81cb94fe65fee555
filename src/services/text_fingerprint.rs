//! Word-level k-shingling and Jaccard similarity for spotting overlapping
//! text between student submissions.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

pub const DEFAULT_SHINGLE_SIZE: usize = 3;

static DISALLOWED_CHARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^a-z0-9\s]").expect("DISALLOWED_CHARS is a valid regex pattern")
});

static WHITESPACE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("WHITESPACE_RUN is a valid regex pattern"));

/// Set of unique shingles that remembers the order shingles were first seen in.
#[derive(Clone, Debug, Default)]
pub struct ShingleSet {
    ordered: Vec<String>,
    members: HashSet<String>,
}

impl ShingleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the shingle was already present.
    pub fn insert(&mut self, shingle: String) -> bool {
        if self.members.contains(&shingle) {
            return false;
        }
        self.members.insert(shingle.clone());
        self.ordered.push(shingle);
        true
    }

    pub fn contains(&self, shingle: &str) -> bool {
        self.members.contains(shingle)
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// Iterates in first-insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ordered.iter().map(String::as_str)
    }
}

impl PartialEq for ShingleSet {
    fn eq(&self, other: &Self) -> bool {
        self.members == other.members
    }
}

impl Eq for ShingleSet {}

/// Lowercases, replaces anything outside `[a-z0-9\s]` with a space, collapses
/// whitespace runs and trims.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped = DISALLOWED_CHARS.replace_all(&lowered, " ");
    WHITESPACE_RUN
        .replace_all(&stripped, " ")
        .trim()
        .to_string()
}

pub fn shingle(text: &str, size: usize) -> ShingleSet {
    let mut shingles = ShingleSet::new();
    if size == 0 {
        return shingles;
    }

    let normalized = normalize(text);
    let words: Vec<&str> = normalized.split(' ').filter(|w| !w.is_empty()).collect();
    if words.len() < size {
        return shingles;
    }

    for window in words.windows(size) {
        shingles.insert(window.join(" "));
    }
    shingles
}

/// Jaccard coefficient of two shingle sets. Empty input scores 0, including
/// two empty sets.
pub fn jaccard_similarity(a: &ShingleSet, b: &ShingleSet) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let (smaller, larger) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let intersection = smaller.iter().filter(|s| larger.contains(s)).count();
    let union = a.len() + b.len() - intersection;

    intersection as f64 / union as f64
}

pub fn fingerprint(text: &str) -> ShingleSet {
    shingle(text, DEFAULT_SHINGLE_SIZE)
}

pub fn similarity(a: &ShingleSet, b: &ShingleSet) -> f64 {
    jaccard_similarity(a, b)
}
