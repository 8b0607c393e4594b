#![deny(missing_docs)]
//! Pairwise tolerance comparison.
//!
//! Every unordered pair of engines that ran for a case is compared family by
//! family. Agreement is measured in digits, `-log10` of the relative error,
//! and checked against the case's inclusive digit range.

mod compare;
mod metrics;
mod verdict;

pub use compare::{compare_case, evaluate};
pub use metrics::{
    digits_of_agreement, relative_error, series_relative_error, Agreement, EPSILON,
};
pub use verdict::{CaseComparison, MissingData, PairComparison, SkippedPair, Status, Verdict};
