use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use xbench_core::{BenchError, ErrorInfo, Family};

use crate::config::{Derivation, EngineConfig, EngineSpec, FamilyRule};

/// Engine name plus optional instance.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EngineId {
    /// Key in the engine configuration.
    pub engine: String,
    /// Instance key, when the command matched an instance prefix.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
}

impl EngineId {
    /// Builds an id from its parts.
    pub fn new(engine: impl Into<String>, instance: Option<String>) -> Self {
        Self {
            engine: engine.into(),
            instance,
        }
    }

    /// `engine` or `engine@instance`, used for directories and reports.
    pub fn label(&self) -> String {
        match &self.instance {
            Some(instance) => format!("{}@{}", self.engine, instance),
            None => self.engine.clone(),
        }
    }
}

impl fmt::Display for EngineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// A detectable entry with paths already resolved against the launch directory.
#[derive(Debug, Clone)]
pub struct ResolvedEngine {
    /// Engine and instance.
    pub id: EngineId,
    /// Detection prefixes, trimmed.
    pub prefixes: Vec<String>,
    /// Program launched for matching commands.
    pub executable: PathBuf,
    /// Engine env followed by instance env, values resolved.
    pub env: Vec<(String, String)>,
}

/// Result of matching a command line.
#[derive(Debug, Clone)]
pub struct Detection<'r> {
    /// Entry that matched.
    pub engine: &'r ResolvedEngine,
    /// Prefix that matched.
    pub prefix: &'r str,
    /// Command text after the matched prefix, trimmed.
    pub remaining: String,
}

/// Validated, read-only engine table.
#[derive(Debug, Clone)]
pub struct Registry {
    config: EngineConfig,
    entries: Vec<ResolvedEngine>,
    launch_dir: PathBuf,
    config_hash: Option<String>,
}

fn resolve_executable(launch_dir: &Path, value: &str) -> PathBuf {
    let path = Path::new(value);
    if path.is_absolute() || path.components().count() == 1 {
        path.to_path_buf()
    } else {
        launch_dir.join(path)
    }
}

fn resolve_env_value(launch_dir: &Path, value: &str) -> String {
    if value.starts_with("./") || value.starts_with("../") {
        launch_dir.join(value).display().to_string()
    } else {
        value.to_string()
    }
}

fn prefix_matches(command: &str, prefix: &str) -> Option<String> {
    let rest = command.strip_prefix(prefix)?;
    let boundary = rest.is_empty()
        || rest.starts_with(char::is_whitespace)
        || prefix.ends_with(char::is_whitespace);
    boundary.then(|| rest.trim().to_string())
}

impl Registry {
    /// Validates the configuration and expands engines into detection entries.
    ///
    /// Instances of an engine are tried before the engine's own prefixes,
    /// engines in declaration order.
    pub fn from_config(config: EngineConfig, launch_dir: &Path) -> Result<Self, BenchError> {
        config.validate()?;
        let mut entries = Vec::new();
        for (name, spec) in &config.engines {
            let base_env: Vec<(String, String)> = spec
                .env
                .iter()
                .map(|(key, value)| (key.clone(), resolve_env_value(launch_dir, value)))
                .collect();
            for (instance, inst) in &spec.instances {
                let executable = inst
                    .executable
                    .as_deref()
                    .or(spec.executable.as_deref())
                    .map(|exe| resolve_executable(launch_dir, exe))
                    .ok_or_else(|| missing_executable(name))?;
                let mut env = base_env.clone();
                env.extend(
                    inst.env
                        .iter()
                        .map(|(key, value)| (key.clone(), resolve_env_value(launch_dir, value))),
                );
                entries.push(ResolvedEngine {
                    id: EngineId::new(name.clone(), Some(instance.clone())),
                    prefixes: inst.detect.iter().map(|p| p.trim_start().to_string()).collect(),
                    executable,
                    env,
                });
            }
            if !spec.detect.is_empty() {
                let executable = spec
                    .executable
                    .as_deref()
                    .map(|exe| resolve_executable(launch_dir, exe))
                    .ok_or_else(|| missing_executable(name))?;
                entries.push(ResolvedEngine {
                    id: EngineId::new(name.clone(), None),
                    prefixes: spec.detect.iter().map(|p| p.trim_start().to_string()).collect(),
                    executable,
                    env: base_env,
                });
            }
        }
        Ok(Self {
            config,
            entries,
            launch_dir: launch_dir.to_path_buf(),
            config_hash: None,
        })
    }

    /// Loads a JSON or YAML document and builds the registry.
    pub fn load(path: &Path, launch_dir: &Path) -> Result<Self, BenchError> {
        let (config, hash) = EngineConfig::load(path)?;
        let mut registry = Self::from_config(config, launch_dir)?;
        registry.config_hash = Some(hash);
        Ok(registry)
    }

    /// Identifies the engine of a command line.
    pub fn detect(&self, command: &str) -> Result<Detection<'_>, BenchError> {
        let command = command.trim();
        for entry in &self.entries {
            for prefix in &entry.prefixes {
                if let Some(remaining) = prefix_matches(command, prefix) {
                    return Ok(Detection {
                        engine: entry,
                        prefix: prefix.as_str(),
                        remaining,
                    });
                }
            }
        }
        let known = self
            .entries
            .iter()
            .flat_map(|entry| entry.prefixes.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(", ");
        Err(BenchError::UnknownEngine(
            ErrorInfo::new("engine.unknown", "command matches no registered engine")
                .with_context("command", command)
                .with_hint(format!("known prefixes: {known}")),
        ))
    }

    /// Engine names and `engine@instance` labels.
    pub fn known_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.config.engines.keys().cloned().collect();
        names.extend(
            self.entries
                .iter()
                .filter(|entry| entry.id.instance.is_some())
                .map(|entry| entry.id.label()),
        );
        names
    }

    /// Declarative spec of a base engine.
    pub fn spec(&self, engine: &str) -> Option<&EngineSpec> {
        self.config.engines.get(engine)
    }

    /// Detectable entries in match order: instances before their engine.
    pub fn entries(&self) -> &[ResolvedEngine] {
        &self.entries
    }

    /// The validated configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Candidate quantities for `family`.
    pub fn family_rule(&self, family: Family) -> FamilyRule {
        self.config.family_rule(family)
    }

    /// Effective derivation list.
    pub fn derivations(&self) -> Vec<Derivation> {
        self.config.derivations()
    }

    /// Directory relative paths resolve against.
    pub fn launch_dir(&self) -> &Path {
        &self.launch_dir
    }

    /// SHA256 of the configuration file, when loaded from disk.
    pub fn config_hash(&self) -> Option<&str> {
        self.config_hash.as_deref()
    }
}

fn missing_executable(engine: &str) -> BenchError {
    BenchError::Config(
        ErrorInfo::new("engine.no_executable", "engine declares no executable")
            .with_context("engine", engine),
    )
}
