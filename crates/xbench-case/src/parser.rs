use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use xbench_core::{BenchError, DigitRange, ErrorInfo, Family};

use crate::model::{Case, CommandLine, EnginePair};

const CASE_TAG: &str = "case";

fn config_error(code: &str, message: impl Into<String>, line: usize) -> BenchError {
    BenchError::Config(
        ErrorInfo::new(code, message).with_context("line", line.to_string()),
    )
}

fn case_info(code: &str, message: impl Into<String>, case: &str, line: usize) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_context("case", case)
        .with_context("line", line.to_string())
}

fn case_error(code: &str, message: impl Into<String>, case: &str, line: usize) -> BenchError {
    BenchError::Config(case_info(code, message, case, line))
}

/// A `# @name: value` line split into its parts.
#[derive(Debug, PartialEq, Eq)]
struct TagLine<'a> {
    name: &'a str,
    value: &'a str,
}

fn split_tag(stripped: &str) -> Option<TagLine<'_>> {
    let body = stripped.strip_prefix('#')?.trim_start();
    let body = body.strip_prefix('@')?;
    let (name, value) = match body.split_once(':') {
        Some((name, value)) => (name.trim(), value.trim()),
        None => (body.trim(), ""),
    };
    Some(TagLine { name, value })
}

fn parse_range(value: &str, tag: &str, case: &str, line: usize) -> Result<DigitRange, BenchError> {
    let parts: Vec<&str> = value
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|part| !part.is_empty())
        .collect();
    let malformed = || {
        case_error(
            "case.malformed_range",
            format!("@{tag} expects two integers `<min> <max>`, got `{value}`"),
            case,
            line,
        )
    };
    if parts.len() != 2 {
        return Err(malformed());
    }
    let min = parts[0].parse::<u32>().map_err(|_| malformed())?;
    let max = parts[1].parse::<u32>().map_err(|_| malformed())?;
    DigitRange::new(min, max).ok_or_else(|| {
        case_error(
            "case.inverted_range",
            format!("@{tag} has min {min} greater than max {max}"),
            case,
            line,
        )
    })
}

fn parse_flag(value: &str, tag: &str, case: &str, line: usize) -> Result<bool, BenchError> {
    match value.to_ascii_lowercase().as_str() {
        "" | "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(case_error(
            "case.malformed_flag",
            format!("@{tag} takes no value or a boolean, got `{value}`"),
            case,
            line,
        )),
    }
}

fn family_for_tol_tag(tag: &str) -> Option<Family> {
    match tag {
        "tol_ext" => Some(Family::Ext),
        "tol_abs" => Some(Family::Abs),
        "tol_res" => Some(Family::Res),
        "tol_int" => Some(Family::Int),
        "tol_force" => Some(Family::Force),
        "tol_torque" => Some(Family::Torque),
        "tol_mueller" => Some(Family::Mueller),
        _ => None,
    }
}

fn family_for_need_tag(tag: &str) -> Option<Family> {
    tag.strip_prefix("need_")
        .and_then(|name| name.parse::<Family>().ok())
        .filter(Family::is_optional)
}

struct CaseBuilder {
    id: String,
    line: usize,
    shared: Option<DigitRange>,
    tolerances: BTreeMap<Family, DigitRange>,
    needs: BTreeMap<Family, usize>,
    skip_pairs: Vec<EnginePair>,
    commands: Vec<CommandLine>,
    seen_tags: BTreeSet<String>,
}

impl CaseBuilder {
    fn new(id: String, line: usize) -> Self {
        Self {
            id,
            line,
            shared: None,
            tolerances: BTreeMap::new(),
            needs: BTreeMap::new(),
            skip_pairs: Vec::new(),
            commands: Vec::new(),
            seen_tags: BTreeSet::new(),
        }
    }

    fn apply_tag(
        &mut self,
        tag: &TagLine<'_>,
        line: usize,
        known_engines: &BTreeSet<&str>,
    ) -> Result<(), BenchError> {
        let name = tag.name;
        if name != "skip_pairs" && !self.seen_tags.insert(name.to_string()) {
            return Err(case_error(
                "case.repeated_tag",
                format!("@{name} declared twice"),
                &self.id,
                line,
            ));
        }

        if name == "tol" {
            if self.tolerances.contains_key(&Family::Ext) || self.tolerances.contains_key(&Family::Abs)
            {
                return Err(self.shared_split_conflict(line));
            }
            self.shared = Some(parse_range(tag.value, name, &self.id, line)?);
            return Ok(());
        }

        if let Some(family) = family_for_tol_tag(name) {
            if matches!(family, Family::Ext | Family::Abs) && self.shared.is_some() {
                return Err(self.shared_split_conflict(line));
            }
            let range = parse_range(tag.value, name, &self.id, line)?;
            self.tolerances.insert(family, range);
            return Ok(());
        }

        if let Some(family) = family_for_need_tag(name) {
            if parse_flag(tag.value, name, &self.id, line)? {
                self.needs.insert(family, line);
            }
            return Ok(());
        }

        if name == "skip_pairs" {
            let pair = parse_skip_pair(tag.value, &self.id, line, known_engines)?;
            if !self.skip_pairs.contains(&pair) {
                self.skip_pairs.push(pair);
            }
            return Ok(());
        }

        Err(BenchError::Config(
            case_info("case.unknown_tag", format!("unknown tag @{name}"), &self.id, line)
                .with_hint(
                    "known tags: tol, tol_ext, tol_abs, tol_res, tol_int, tol_force, \
                     tol_torque, tol_mueller, need_int, need_force, need_torque, \
                     need_mueller, skip_pairs",
                ),
        ))
    }

    fn shared_split_conflict(&self, line: usize) -> BenchError {
        case_error(
            "case.shared_and_split_tolerance",
            "@tol cannot be combined with @tol_ext or @tol_abs",
            &self.id,
            line,
        )
    }

    fn finish(mut self) -> Result<Case, BenchError> {
        let shared_ext_abs = self.shared.is_some();
        if let Some(range) = self.shared {
            self.tolerances.insert(Family::Ext, range);
            self.tolerances.insert(Family::Abs, range);
        }

        if !self.tolerances.contains_key(&Family::Res) {
            return Err(BenchError::Config(
                case_info(
                    "case.missing_tol_res",
                    "case lacks the required @tol_res range",
                    &self.id,
                    self.line,
                )
                .with_hint("add `# @tol_res: <min> <max>`"),
            ));
        }
        let has_ext = self.tolerances.contains_key(&Family::Ext);
        let has_abs = self.tolerances.contains_key(&Family::Abs);
        if !(has_ext && has_abs) {
            return Err(case_error(
                "case.missing_tol_ext_abs",
                "case needs @tol or both @tol_ext and @tol_abs",
                &self.id,
                self.line,
            ));
        }

        for (family, line) in &self.needs {
            if !self.tolerances.contains_key(family) {
                return Err(case_error(
                    "case.need_without_tol",
                    format!("@need_{family} requires @tol_{family}"),
                    &self.id,
                    *line,
                ));
            }
        }

        if self.commands.is_empty() {
            tracing::warn!(case = %self.id, "case declares no commands");
        }

        Ok(Case {
            id: self.id,
            line: self.line,
            tolerances: self.tolerances,
            shared_ext_abs,
            needs: self.needs.into_keys().collect(),
            skip_pairs: self.skip_pairs,
            commands: self.commands,
        })
    }
}

fn parse_skip_pair(
    value: &str,
    case: &str,
    line: usize,
    known_engines: &BTreeSet<&str>,
) -> Result<EnginePair, BenchError> {
    let names: Vec<&str> = value
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|name| !name.is_empty())
        .collect();
    if names.len() != 2 {
        return Err(case_error(
            "case.malformed_skip_pair",
            format!("@skip_pairs names exactly two engines, got `{value}`"),
            case,
            line,
        ));
    }
    for name in &names {
        if !known_engines.contains(name) {
            return Err(case_error(
                "case.unknown_skip_engine",
                format!("@skip_pairs names unknown engine `{name}`"),
                case,
                line,
            ));
        }
    }
    EnginePair::new(names[0], names[1]).ok_or_else(|| {
        case_error(
            "case.degenerate_skip_pair",
            format!("@skip_pairs names `{}` twice", names[0]),
            case,
            line,
        )
    })
}

/// Parses command file text into cases.
///
/// `known_engines` holds every name a skip-pair may use: engine names and
/// `engine@instance` labels.
pub fn parse_cases<S: AsRef<str>>(text: &str, known_engines: &[S]) -> Result<Vec<Case>, BenchError> {
    let known: BTreeSet<&str> = known_engines.iter().map(AsRef::as_ref).collect();
    let mut cases: Vec<Case> = Vec::new();
    let mut seen_ids: BTreeSet<String> = BTreeSet::new();
    let mut current: Option<CaseBuilder> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let stripped = raw.trim();
        if stripped.is_empty() {
            continue;
        }

        if stripped.starts_with('#') {
            let Some(tag) = split_tag(stripped) else {
                continue;
            };
            if tag.name == CASE_TAG {
                if let Some(builder) = current.take() {
                    cases.push(builder.finish()?);
                }
                if tag.value.is_empty() {
                    return Err(config_error("case.empty_id", "@case marker without an id", line));
                }
                if !seen_ids.insert(tag.value.to_string()) {
                    return Err(case_error(
                        "case.duplicate_id",
                        format!("case `{}` declared twice", tag.value),
                        tag.value,
                        line,
                    ));
                }
                current = Some(CaseBuilder::new(tag.value.to_string(), line));
                continue;
            }
            match current.as_mut() {
                Some(builder) => builder.apply_tag(&tag, line, &known)?,
                None => {
                    return Err(config_error(
                        "case.tag_before_case",
                        format!("@{} appears before any @case marker", tag.name),
                        line,
                    ))
                }
            }
            continue;
        }

        match current.as_mut() {
            Some(builder) => builder.commands.push(CommandLine {
                text: stripped.to_string(),
                line,
            }),
            None => {
                return Err(config_error(
                    "case.command_before_case",
                    "command appears before any @case marker",
                    line,
                ))
            }
        }
    }

    if let Some(builder) = current.take() {
        cases.push(builder.finish()?);
    }
    Ok(cases)
}

/// Reads and parses a command file.
pub fn read_command_file<S: AsRef<str>>(
    path: &Path,
    known_engines: &[S],
) -> Result<Vec<Case>, BenchError> {
    let text = fs::read_to_string(path).map_err(|err| {
        BenchError::Config(
            ErrorInfo::new("case.read", err.to_string())
                .with_context("path", path.display().to_string()),
        )
    })?;
    parse_cases(&text, known_engines).map_err(|err| match err {
        BenchError::Config(info) => {
            BenchError::Config(info.with_context("path", path.display().to_string()))
        }
        other => other,
    })
}
