#![deny(missing_docs)]
//! Engine registry: the declarative description of every solver under test.
//!
//! An [`EngineConfig`] document lists engines in order. Each engine carries its
//! detection prefixes, executable, environment, preparation steps and the
//! extraction rules for the quantities it reports. [`Registry`] validates the
//! document once and then answers which engine owns a command line.

mod config;
mod pattern;
mod registry;

pub use config::{
    default_derivations, default_family_rule, AeffSpec, Aggregate, ArrayFormat, ArraySpec,
    CleanupSpec, ColumnRef, Derivation, EngineConfig, EngineSpec, FamilyRule, InstanceSpec,
    Occurrence, OutputSpec, Pick, PrepAction, PrepStep, Reduction, ScalarSpec, SourceKeyword,
    SourceSelector, Transform, WhenContains, EPS0,
};
pub use pattern::Pattern;
pub use registry::{Detection, EngineId, Registry, ResolvedEngine};
