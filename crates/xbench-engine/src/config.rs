use std::fs;
use std::path::Path;

use globset::Glob;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use xbench_core::serde::{from_json_slice, from_yaml_slice};
use xbench_core::{bytes_hash_string, BenchError, ErrorInfo, Family};

use crate::pattern::Pattern;

/// Vacuum permittivity in F/m.
pub const EPS0: f64 = 8.854187817620389e-12;

/// Root of the engine configuration document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Engines in declaration order. Order is the detection tie-break.
    pub engines: IndexMap<String, EngineSpec>,
    /// Per-family candidate quantities. Families left out use the defaults.
    #[serde(default)]
    pub families: IndexMap<Family, FamilyRule>,
    /// Derivation operations. Absent means the default set; an empty list disables them.
    #[serde(default)]
    pub derivations: Option<Vec<Derivation>>,
}

/// One registered solver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSpec {
    /// Literal command prefixes that identify this engine.
    #[serde(default)]
    pub detect: Vec<String>,
    /// Executable path. Relative paths with a directory component resolve against the launch directory.
    #[serde(default)]
    pub executable: Option<String>,
    /// Environment overrides.
    #[serde(default)]
    pub env: IndexMap<String, String>,
    /// Named variants sharing everything except detection, executable and env.
    #[serde(default)]
    pub instances: IndexMap<String, InstanceSpec>,
    /// Preparation steps applied inside the run directory before launch.
    #[serde(default)]
    pub prepare: Vec<PrepStep>,
    /// Quantities this engine reports.
    #[serde(default)]
    pub outputs: IndexMap<String, OutputSpec>,
    /// Artifact patterns searched after stdout.
    #[serde(default)]
    pub extra_files: Vec<String>,
    /// Effective radius in metres.
    #[serde(default)]
    pub aeff: Option<AeffSpec>,
    /// Wavelength in metres.
    #[serde(default)]
    pub lambda: Option<ScalarSpec>,
    /// Files removed when cleanup is enabled.
    #[serde(default)]
    pub cleanup: CleanupSpec,
    /// Variable receiving the thread ceiling.
    #[serde(default = "default_threads_env")]
    pub threads_env: Option<String>,
}

impl EngineSpec {
    /// Every file pattern extraction may read, deduplicated in declaration order.
    pub fn artifact_patterns(&self) -> Vec<&str> {
        let mut patterns: Vec<&str> = Vec::new();
        for output in self.outputs.values() {
            let source = match output {
                OutputSpec::Scalar(scalar) => scalar.source.as_ref(),
                OutputSpec::Array(array) => Some(&array.source),
            };
            if let Some(pattern) = source.and_then(SourceSelector::artifact_pattern) {
                push_unique(&mut patterns, pattern);
            }
        }
        for pattern in &self.extra_files {
            push_unique(&mut patterns, pattern);
        }
        let mut scalars: Vec<&ScalarSpec> = Vec::new();
        match &self.aeff {
            Some(AeffSpec::Direct(scalar)) => scalars.push(scalar),
            Some(AeffSpec::Dipoles { dipoles, spacing }) => {
                scalars.push(dipoles);
                scalars.push(spacing);
            }
            None => {}
        }
        scalars.extend(self.lambda.as_ref());
        for scalar in scalars {
            if let Some(pattern) = scalar.source.as_ref().and_then(SourceSelector::artifact_pattern) {
                push_unique(&mut patterns, pattern);
            }
        }
        patterns
    }
}

fn push_unique<'a>(patterns: &mut Vec<&'a str>, pattern: &'a str) {
    if !patterns.contains(&pattern) {
        patterns.push(pattern);
    }
}

fn default_threads_env() -> Option<String> {
    Some("OMP_NUM_THREADS".to_string())
}

/// Named engine variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceSpec {
    /// Prefixes identifying this instance.
    pub detect: Vec<String>,
    /// Executable override.
    #[serde(default)]
    pub executable: Option<String>,
    /// Extra environment, applied after the engine's.
    #[serde(default)]
    pub env: IndexMap<String, String>,
}

/// A preparation action with its optional gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepStep {
    /// What the step does.
    #[serde(flatten)]
    pub action: PrepAction,
    /// Substrings of the command line enabling the step; empty means always.
    #[serde(default)]
    pub when_contains: WhenContains,
}

impl PrepStep {
    /// Whether the step applies to the given command line.
    pub fn applies_to(&self, command: &str) -> bool {
        self.when_contains.0.is_empty()
            || self
                .when_contains
                .0
                .iter()
                .any(|needle| command.contains(needle.as_str()))
    }
}

/// Preparation action vocabulary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PrepAction {
    /// Symlink `source` into the run directory.
    Symlink {
        /// File to link, relative to the launch directory unless absolute.
        source: String,
        /// Link path inside the run directory; defaults to the source name.
        #[serde(default)]
        target: Option<String>,
    },
    /// Copy `source` into the run directory.
    Copy {
        /// File to copy, relative to the launch directory unless absolute.
        source: String,
        /// Destination inside the run directory; defaults to the source name.
        #[serde(default)]
        target: Option<String>,
    },
    /// Copy the file named by `var`; with `rewrite` the variable points at the copy.
    CopyEnv {
        /// Variable holding the file path.
        var: String,
        /// Destination inside the run directory; defaults to the file name.
        #[serde(default)]
        target: Option<String>,
        /// Point the variable at the copy for this run.
        #[serde(default)]
        rewrite: bool,
    },
}

/// One substring or a list of substrings; deserializes from either.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "OneOrMany", into = "Vec<String>")]
pub struct WhenContains(pub Vec<String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<OneOrMany> for WhenContains {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(item) => Self(vec![item]),
            OneOrMany::Many(items) => Self(items),
        }
    }
}

impl From<WhenContains> for Vec<String> {
    fn from(value: WhenContains) -> Self {
        value.0
    }
}

/// How to obtain one named quantity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutputSpec {
    /// A single number, or the norm of a 3-vector.
    Scalar(ScalarSpec),
    /// A series read from a table or dataset.
    Array(ArraySpec),
}

/// Regex-driven scalar (or vector norm) extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalarSpec {
    /// Expression with a `value` group, or `x`, `y` and `z` groups.
    pub pattern: Pattern,
    /// Multiplier applied to every parsed number.
    #[serde(default = "default_unit_factor")]
    pub unit_factor: f64,
    /// Which matches count.
    #[serde(default)]
    pub occurrence: Occurrence,
    /// Reduction, required when `occurrence` is `reduce`.
    #[serde(default)]
    pub reduce: Option<Reduction>,
    /// Restricts lookup to one source.
    #[serde(default)]
    pub source: Option<SourceSelector>,
}

fn default_unit_factor() -> f64 {
    1.0
}

impl ScalarSpec {
    /// Whether the pattern extracts a vector norm.
    pub fn is_vector(&self) -> bool {
        !self.pattern.has_group("value")
    }
}

/// Policy for patterns matching more than once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Occurrence {
    /// First match only.
    #[default]
    First,
    /// Last match only.
    Last,
    /// Every match, as a series.
    All,
    /// Every match folded by the spec's reduction.
    Reduce,
}

/// Named reductions over all matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reduction {
    /// Arithmetic mean.
    Mean,
    /// Smallest value.
    Min,
    /// Largest value.
    Max,
    /// Sum of values.
    Sum,
}

impl Reduction {
    /// Applies the reduction. `None` on an empty slice.
    pub fn apply(&self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        Some(match self {
            Reduction::Mean => values.iter().sum::<f64>() / values.len() as f64,
            Reduction::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Reduction::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Reduction::Sum => values.iter().sum(),
        })
    }
}

/// Where a quantity is read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceSelector {
    /// The captured stdout.
    Keyword(SourceKeyword),
    /// One file, relative to the run directory unless absolute.
    Path {
        /// File path.
        path: String,
    },
    /// The best of several files matching a glob.
    Glob {
        /// File glob, relative to the run directory unless absolute.
        glob: String,
        /// Tie-break among matches.
        #[serde(default)]
        pick: Pick,
    },
}

impl SourceSelector {
    /// The artifact pattern this selector needs collected, if any.
    pub fn artifact_pattern(&self) -> Option<&str> {
        match self {
            SourceSelector::Keyword(SourceKeyword::Stdout) => None,
            SourceSelector::Path { path } => Some(path),
            SourceSelector::Glob { glob, .. } => Some(glob),
        }
    }
}

/// Named non-file sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKeyword {
    /// Solver standard output.
    Stdout,
}

/// Tie-break among several glob matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pick {
    /// Newest modification time.
    #[default]
    MostRecent,
    /// Lexicographically first path.
    First,
}

/// Array extraction: a reader plus post-processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArraySpec {
    /// Reader and its options.
    #[serde(flatten)]
    pub format: ArrayFormat,
    /// Where the table lives; stdout by default.
    #[serde(default = "default_array_source")]
    pub source: SourceSelector,
    /// Applied in order after reading.
    #[serde(default)]
    pub transforms: Vec<Transform>,
}

fn default_array_source() -> SourceSelector {
    SourceSelector::Keyword(SourceKeyword::Stdout)
}

/// Array readers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum ArrayFormat {
    /// Named dataset inside an HDF5 file.
    Dataset {
        /// Dataset path inside the file.
        dataset: String,
    },
    /// One delimited column.
    Column {
        /// Column to read.
        column: ColumnRef,
        /// Field separator; whitespace when absent.
        #[serde(default)]
        delimiter: Option<char>,
        /// Prefix marking lines to ignore.
        #[serde(default)]
        comment: Option<String>,
    },
    /// Several delimited columns flattened row-major.
    Columns {
        /// Columns to read, in output order.
        columns: Vec<ColumnRef>,
        /// Field separator; whitespace when absent.
        #[serde(default)]
        delimiter: Option<char>,
        /// Prefix marking lines to ignore.
        #[serde(default)]
        comment: Option<String>,
    },
    /// Whitespace table following the first line matching `header`.
    FixedTable {
        /// Expression locating the table header.
        header: Pattern,
        /// Zero-based columns to keep; all when empty.
        #[serde(default)]
        columns: Vec<usize>,
        /// Lines skipped after the header.
        #[serde(default)]
        skip: usize,
    },
}

/// Column addressed by zero-based index or by header name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnRef {
    /// Zero-based position.
    Index(usize),
    /// Header name.
    Name(String),
}

/// Post-extraction array transforms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    /// Drops zero elements.
    Nonzero,
    /// Divides every element by a scalar quantity of the same run.
    DivideBy(String),
    /// Squares every element.
    Square,
}

/// Effective radius: direct, or reconstructed from a dipole count and spacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AeffSpec {
    /// `aeff = d * (3N / 4pi)^(1/3)`.
    Dipoles {
        /// Dipole count `N`.
        dipoles: ScalarSpec,
        /// Dipole spacing `d` in metres.
        spacing: ScalarSpec,
    },
    /// Read as reported.
    Direct(ScalarSpec),
}

/// Names and globs removed from a run directory by cleanup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleanupSpec {
    /// Exact file names removed anywhere in the run directory.
    #[serde(default)]
    pub remove_names: Vec<String>,
    /// Globs relative to the run directory.
    #[serde(default)]
    pub remove_globs: Vec<String>,
}

/// Candidate quantities for a family, in priority order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyRule {
    /// Quantity names, most preferred first.
    pub quantities: Vec<String>,
    /// Series aggregation.
    #[serde(default)]
    pub aggregate: Aggregate,
}

/// Summary of element-wise errors for series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregate {
    /// Largest relative error (fewest digits).
    #[default]
    Worst,
    /// Mean relative error.
    Mean,
}

/// Named physical relations filling missing quantities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Derivation {
    /// `C = Q * pi * aeff^2` and the reverse.
    EfficiencyPair {
        /// Cross-section quantity.
        cross_section: String,
        /// Efficiency quantity.
        efficiency: String,
        /// Effective radius quantity.
        #[serde(default = "default_radius")]
        radius: String,
    },
    /// `target = 2F / (eps0 * E0^2)`.
    PressureCrossSection {
        /// Force magnitude quantity.
        force: String,
        /// Incident field amplitude quantity.
        field: String,
        /// Quantity filled.
        target: String,
    },
    /// `target = T * 2k / (pi * aeff^2 * eps0 * E0^2)` with `k = 2 pi / lambda`.
    TorqueEfficiency {
        /// Torque magnitude quantity.
        torque: String,
        /// Incident field amplitude quantity.
        field: String,
        /// Wavelength quantity.
        #[serde(default = "default_wavelength")]
        wavelength: String,
        /// Effective radius quantity.
        #[serde(default = "default_radius")]
        radius: String,
        /// Quantity filled.
        target: String,
    },
}

fn default_radius() -> String {
    "aeff".to_string()
}

fn default_wavelength() -> String {
    "lambda".to_string()
}

impl Derivation {
    /// Operation name recorded as the origin of derived values.
    pub fn op_name(&self) -> &'static str {
        match self {
            Derivation::EfficiencyPair { .. } => "efficiency_pair",
            Derivation::PressureCrossSection { .. } => "pressure_cross_section",
            Derivation::TorqueEfficiency { .. } => "torque_efficiency",
        }
    }
}

/// Default family vocabulary.
pub fn default_family_rule(family: Family) -> FamilyRule {
    let quantities: &[&str] = match family {
        Family::Ext => &["Cext", "Qext"],
        Family::Abs => &["Cabs", "Qabs"],
        Family::Res => &["residual1"],
        Family::Int => &["int_field"],
        Family::Force => &["Cpr", "force"],
        Family::Torque => &["Qtrq"],
        Family::Mueller => &["mueller"],
    };
    FamilyRule {
        quantities: quantities.iter().map(|name| name.to_string()).collect(),
        aggregate: Aggregate::Worst,
    }
}

/// Default derivation set.
pub fn default_derivations() -> Vec<Derivation> {
    vec![
        Derivation::EfficiencyPair {
            cross_section: "Cext".into(),
            efficiency: "Qext".into(),
            radius: default_radius(),
        },
        Derivation::EfficiencyPair {
            cross_section: "Cabs".into(),
            efficiency: "Qabs".into(),
            radius: default_radius(),
        },
        Derivation::PressureCrossSection {
            force: "force".into(),
            field: "E0".into(),
            target: "Cpr".into(),
        },
        Derivation::TorqueEfficiency {
            torque: "torque".into(),
            field: "E0".into(),
            wavelength: default_wavelength(),
            radius: default_radius(),
            target: "Qtrq".into(),
        },
    ]
}

fn config_error(code: &str, message: impl Into<String>) -> BenchError {
    BenchError::Config(ErrorInfo::new(code, message))
}

fn engine_error(code: &str, engine: &str, message: impl Into<String>) -> BenchError {
    BenchError::Config(ErrorInfo::new(code, message).with_context("engine", engine))
}

impl EngineConfig {
    /// Parses a document, choosing JSON or YAML by the file extension.
    ///
    /// Returns the configuration with the SHA256 of the raw bytes. Validation
    /// happens in [`crate::Registry::from_config`].
    pub fn load(path: &Path) -> Result<(Self, String), BenchError> {
        let bytes = fs::read(path).map_err(|err| {
            BenchError::Config(
                ErrorInfo::new("engine.read", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        let parsed: Result<Self, BenchError> = match extension.as_deref() {
            Some("json") => from_json_slice(&bytes),
            Some("yaml") | Some("yml") => from_yaml_slice(&bytes),
            _ => {
                return Err(BenchError::Config(
                    ErrorInfo::new(
                        "engine.unsupported_format",
                        "engine configuration must be .json, .yaml or .yml",
                    )
                    .with_context("path", path.display().to_string()),
                ))
            }
        };
        let config = parsed.map_err(|err| {
            BenchError::Config(
                ErrorInfo::new("engine.parse", err.info().message.clone())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        Ok((config, bytes_hash_string(&bytes)))
    }

    /// Rule for a family, falling back to the default vocabulary.
    pub fn family_rule(&self, family: Family) -> FamilyRule {
        self.families
            .get(&family)
            .cloned()
            .unwrap_or_else(|| default_family_rule(family))
    }

    /// Effective derivation list.
    pub fn derivations(&self) -> Vec<Derivation> {
        self.derivations.clone().unwrap_or_else(default_derivations)
    }

    /// Structural validation run at load time.
    pub fn validate(&self) -> Result<(), BenchError> {
        if self.engines.is_empty() {
            return Err(config_error(
                "engine.empty",
                "engine configuration declares no engines",
            ));
        }
        for (name, spec) in &self.engines {
            validate_engine(name, spec)?;
        }
        for (family, rule) in &self.families {
            if rule.quantities.is_empty() {
                return Err(BenchError::Config(
                    ErrorInfo::new("engine.empty_family", "family lists no quantities")
                        .with_context("family", family.as_str()),
                ));
            }
        }
        Ok(())
    }
}

fn validate_engine(name: &str, spec: &EngineSpec) -> Result<(), BenchError> {
    if name.is_empty() || name.contains('@') || name.contains(char::is_whitespace) {
        return Err(engine_error(
            "engine.bad_name",
            name,
            "engine names must be non-empty without `@` or whitespace",
        ));
    }
    if spec.detect.is_empty() && spec.instances.is_empty() {
        return Err(engine_error(
            "engine.no_detect",
            name,
            "engine needs detection prefixes or instances",
        ));
    }
    if spec.detect.iter().any(|prefix| prefix.trim().is_empty()) {
        return Err(engine_error(
            "engine.empty_prefix",
            name,
            "detection prefixes must be non-empty",
        ));
    }
    if !spec.detect.is_empty() && spec.executable.is_none() {
        return Err(engine_error(
            "engine.no_executable",
            name,
            "engine declares no executable",
        ));
    }
    for (instance, inst) in &spec.instances {
        if instance.is_empty() || instance.contains('@') {
            return Err(engine_error(
                "engine.bad_instance",
                name,
                format!("invalid instance name `{instance}`"),
            ));
        }
        if inst.detect.is_empty() || inst.detect.iter().any(|prefix| prefix.trim().is_empty()) {
            return Err(engine_error(
                "engine.empty_prefix",
                name,
                format!("instance `{instance}` needs non-empty detection prefixes"),
            ));
        }
        if inst.executable.is_none() && spec.executable.is_none() {
            return Err(engine_error(
                "engine.no_executable",
                name,
                format!("instance `{instance}` has no executable to inherit"),
            ));
        }
    }

    for (quantity, output) in &spec.outputs {
        match output {
            OutputSpec::Scalar(scalar) => validate_scalar(name, quantity, scalar)?,
            OutputSpec::Array(array) => validate_array(name, quantity, array, spec)?,
        }
    }
    match &spec.aeff {
        Some(AeffSpec::Direct(scalar)) => validate_scalar(name, "aeff", scalar)?,
        Some(AeffSpec::Dipoles { dipoles, spacing }) => {
            validate_scalar(name, "aeff.dipoles", dipoles)?;
            validate_scalar(name, "aeff.spacing", spacing)?;
        }
        None => {}
    }
    if let Some(lambda) = &spec.lambda {
        validate_scalar(name, "lambda", lambda)?;
    }
    for pattern in spec.artifact_patterns() {
        if let Err(err) = Glob::new(pattern) {
            return Err(BenchError::Config(
                ErrorInfo::new("engine.bad_glob", err.to_string())
                    .with_context("engine", name)
                    .with_context("pattern", pattern),
            ));
        }
    }
    Ok(())
}

fn validate_scalar(engine: &str, quantity: &str, spec: &ScalarSpec) -> Result<(), BenchError> {
    let quantity_error = |code: &str, message: String| {
        BenchError::Config(
            ErrorInfo::new(code, message)
                .with_context("engine", engine)
                .with_context("quantity", quantity),
        )
    };
    let pattern = &spec.pattern;
    let vector = ["x", "y", "z"].iter().all(|group| pattern.has_group(group));
    if !pattern.has_group("value") && !vector {
        return Err(quantity_error(
            "engine.pattern_groups",
            format!(
                "pattern `{}` needs a `value` group or all of `x`, `y`, `z`",
                pattern.as_str()
            ),
        ));
    }
    if !spec.unit_factor.is_finite() {
        return Err(quantity_error(
            "engine.unit_factor",
            "unit_factor must be finite".to_string(),
        ));
    }
    match (spec.occurrence, spec.reduce) {
        (Occurrence::Reduce, None) => Err(quantity_error(
            "engine.missing_reduce",
            "occurrence `reduce` needs a `reduce` operation".to_string(),
        )),
        (occurrence, Some(_)) if occurrence != Occurrence::Reduce => Err(quantity_error(
            "engine.stray_reduce",
            "`reduce` is only valid with occurrence `reduce`".to_string(),
        )),
        _ => Ok(()),
    }
}

fn validate_array(
    engine: &str,
    quantity: &str,
    array: &ArraySpec,
    spec: &EngineSpec,
) -> Result<(), BenchError> {
    let quantity_error = |code: &str, message: String| {
        BenchError::Config(
            ErrorInfo::new(code, message)
                .with_context("engine", engine)
                .with_context("quantity", quantity),
        )
    };
    match &array.format {
        ArrayFormat::Dataset { dataset } if dataset.trim().is_empty() => {
            return Err(quantity_error(
                "engine.array_dataset",
                "dataset name must be non-empty".to_string(),
            ))
        }
        ArrayFormat::Dataset { .. } => {
            if array.source == default_array_source() {
                return Err(quantity_error(
                    "engine.array_source",
                    "dataset arrays must read from a file".to_string(),
                ));
            }
        }
        ArrayFormat::Columns { columns, .. } if columns.is_empty() => {
            return Err(quantity_error(
                "engine.array_columns",
                "columns format needs at least one column".to_string(),
            ))
        }
        _ => {}
    }
    for transform in &array.transforms {
        if let Transform::DivideBy(divisor) = transform {
            let declared = matches!(spec.outputs.get(divisor), Some(OutputSpec::Scalar(_)))
                || (divisor == "aeff" && spec.aeff.is_some())
                || (divisor == "lambda" && spec.lambda.is_some());
            if !declared {
                return Err(quantity_error(
                    "engine.divide_by",
                    format!("divide_by names undeclared scalar quantity `{divisor}`"),
                ));
            }
        }
    }
    Ok(())
}
