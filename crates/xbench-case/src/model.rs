use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use xbench_core::{DigitRange, Family};

/// One raw command line with the line it was read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandLine {
    /// Trimmed command text, passed to the engine registry verbatim.
    pub text: String,
    /// 1-based line number inside the command file.
    pub line: usize,
}

/// Unordered pair of engine names.
///
/// The two names are stored sorted so that `(a, b)` and `(b, a)` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EnginePair {
    first: String,
    second: String,
}

impl EnginePair {
    /// Builds a normalized pair. Returns `None` when both names are equal.
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Option<Self> {
        let (a, b) = (a.into(), b.into());
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Some(Self {
                first: a,
                second: b,
            }),
            std::cmp::Ordering::Greater => Some(Self {
                first: b,
                second: a,
            }),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// Lexicographically smaller engine name.
    pub fn first(&self) -> &str {
        &self.first
    }

    /// Lexicographically larger engine name.
    pub fn second(&self) -> &str {
        &self.second
    }

    /// Whether the pair names exactly `a` and `b`, in either order.
    pub fn matches(&self, a: &str, b: &str) -> bool {
        (self.first == a && self.second == b) || (self.first == b && self.second == a)
    }
}

impl fmt::Display for EnginePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.first, self.second)
    }
}

/// A named group of command lines sharing one tolerance policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    /// Unique case identifier.
    pub id: String,
    /// Line of the `@case` marker.
    pub line: usize,
    /// Digit ranges per family. `ext`, `abs` and `res` are always present.
    pub tolerances: BTreeMap<Family, DigitRange>,
    /// Whether `ext`/`abs` came from the shared `tol` tag.
    pub shared_ext_abs: bool,
    /// Families escalated by `need_*` flags.
    pub needs: BTreeSet<Family>,
    /// Engine pairs excluded from comparison.
    pub skip_pairs: Vec<EnginePair>,
    /// Commands in file order.
    pub commands: Vec<CommandLine>,
}

impl Case {
    /// Declared range for a family, if any.
    pub fn tolerance(&self, family: Family) -> Option<DigitRange> {
        self.tolerances.get(&family).copied()
    }

    /// Whether absence of this family must fail the pair.
    pub fn requires(&self, family: Family) -> bool {
        self.needs.contains(&family)
    }

    /// Whether the pair `(a, b)` is skipped. Both orders match.
    pub fn skips(&self, a: &str, b: &str) -> bool {
        self.skip_pairs.iter().any(|pair| pair.matches(a, b))
    }

    /// Families the comparator should evaluate, in report order.
    pub fn compared_families(&self) -> impl Iterator<Item = (Family, DigitRange)> + '_ {
        Family::ALL
            .into_iter()
            .filter_map(|family| self.tolerance(family).map(|range| (family, range)))
    }
}
