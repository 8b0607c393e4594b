#![deny(missing_docs)]
#![doc = "Shared kernel for the xbench solver cross-validation harness: error taxonomy, tolerance types, provenance and canonical serde helpers."]

pub mod errors;
/// Stable hashing helpers.
pub mod hash;
pub mod provenance;
/// Canonical JSON and YAML helpers.
pub mod serde;
mod types;

pub use errors::{BenchError, ErrorInfo};
pub use hash::{bytes_hash_string, stable_hash_string};
pub use provenance::{RunTiming, SchemaVersion, ValueProvenance};
pub use types::{DigitRange, Family};
