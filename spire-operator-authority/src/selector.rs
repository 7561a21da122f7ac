use std::collections::BTreeSet;
use std::fmt;

use spire_operator_api::Selector as ApiSelector;

/// A single attestation criterion, rendered as `<kind>:<value>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Selector {
    pub kind: String,
    pub value: String,
}

impl Selector {
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }

    /// Splits a raw token at its first `:` so that it renders back verbatim.
    /// A token without a `:` becomes a selector with an empty kind.
    pub fn from_raw(token: &str) -> Self {
        match token.split_once(':') {
            Some((kind, value)) => Self::new(kind, value),
            None => Self::new("", token),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind.is_empty() {
            write!(f, "{}", self.value)
        } else {
            write!(f, "{}:{}", self.kind, self.value)
        }
    }
}

impl From<ApiSelector> for Selector {
    fn from(s: ApiSelector) -> Self {
        Self {
            kind: s.r#type,
            value: s.value,
        }
    }
}

impl From<&Selector> for ApiSelector {
    fn from(s: &Selector) -> Self {
        ApiSelector {
            r#type: s.kind.clone(),
            value: s.value.clone(),
        }
    }
}

/// Canonical, duplicate free set of selectors. Ordering of insertion never
/// affects equality or iteration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SelectorSet(BTreeSet<Selector>);

impl SelectorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, selector: Selector) -> bool {
        self.0.insert(selector)
    }

    pub fn contains(&self, selector: &Selector) -> bool {
        self.0.contains(selector)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Selector> {
        self.0.iter()
    }

    /// True when `candidate` holds exactly this set: the same number of
    /// selectors and every selector of this set present in it.
    pub fn matches(&self, candidate: &[Selector]) -> bool {
        if candidate.len() != self.len() {
            return false;
        }
        let candidate: BTreeSet<&Selector> = candidate.iter().collect();
        candidate.len() == self.len() && self.iter().all(|s| candidate.contains(s))
    }

    pub(crate) fn to_api(&self) -> Vec<ApiSelector> {
        self.iter().map(ApiSelector::from).collect()
    }
}

impl FromIterator<Selector> for SelectorSet {
    fn from_iter<I: IntoIterator<Item = Selector>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a SelectorSet {
    type Item = &'a Selector;
    type IntoIter = std::collections::btree_set::Iter<'a, Selector>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for SelectorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tokens: Vec<String> = self.iter().map(ToString::to_string).collect();
        write!(f, "[{}]", tokens.join(", "))
    }
}
