//! Table definition files.
//!
//! Each versioned table owns a directory `<root>/<tables_dir>/<table>/` holding
//! a definition file (JSON or YAML) that lists the table's version history:
//!
//! ```json
//! {
//!   "table_versions": ["1.0", {"version": "1.1", "requires": {"users": "1.1"}}],
//!   "row_versions": [{"version": "2", "run": ["rows.rs", "backfill"]}],
//!   "tags": ["billing"],
//!   "replaces": "legacy_orders"
//! }
//! ```

use crate::error::{CoreError, CoreResult};
use crate::table_name::{HookName, TableName};
use crate::version::Version;
use serde::{Deserialize, Deserializer};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// Parsed contents of a table definition file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TableDefinition {
    /// Free-form description, shown by `schemata status`
    #[serde(default)]
    pub description: Option<String>,

    /// Structural version history
    #[serde(default, deserialize_with = "deserialize_steps")]
    pub table_versions: Vec<StepDef>,

    /// Row-level data migrations
    #[serde(default)]
    pub row_versions: Vec<RowStepDef>,

    /// Override for the per-row version column
    #[serde(default)]
    pub vercolumn: Option<String>,

    /// Application-defined tags used for filtering
    #[serde(default)]
    pub tags: Vec<String>,

    /// Hard ordering dependencies
    #[serde(default)]
    pub needs: Vec<TableName>,

    /// Soft ordering dependencies (tolerated when undefined)
    #[serde(default)]
    pub wants: Vec<TableName>,

    /// Older table this definition supersedes
    #[serde(default)]
    pub replaces: Option<TableName>,

    /// Newer table that supersedes this one
    #[serde(default)]
    pub replaced_by: Option<TableName>,

    /// Script run by the replacement protocol
    #[serde(default)]
    pub replacement_sql: ScriptSpec,

    /// Hook run before the replacement script
    #[serde(default)]
    pub replacement_pre_run: Option<HookSpec>,

    /// Hook run after the replacement script
    #[serde(default)]
    pub replacement_post_run: Option<HookSpec>,
}

/// One structural version transition.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StepDef {
    /// Version the table reaches after this step
    pub version: Version,

    /// Tables that must exist, or reach a minimum version, first
    #[serde(default)]
    pub requires: BTreeMap<TableName, Requirement>,

    /// Hook run before the script
    #[serde(default)]
    pub pre_run: Option<HookSpec>,

    /// Hook run after the script
    #[serde(default)]
    pub post_run: Option<HookSpec>,

    /// Script to execute for this step
    #[serde(default)]
    pub sql_file: ScriptSpec,
}

impl StepDef {
    /// A step with only a target version and every other field defaulted.
    pub fn bare(version: Version) -> Self {
        Self {
            version,
            requires: BTreeMap::new(),
            pre_run: None,
            post_run: None,
            sql_file: ScriptSpec::Default,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StepEntry {
    Bare(Version),
    Detailed(StepDef),
}

fn deserialize_steps<'de, D>(deserializer: D) -> Result<Vec<StepDef>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = Vec::<StepEntry>::deserialize(deserializer)?;
    Ok(entries
        .into_iter()
        .map(|entry| match entry {
            StepEntry::Bare(version) => StepDef::bare(version),
            StepEntry::Detailed(step) => step,
        })
        .collect())
}

/// A requirement one table's step places on another table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RequirementLiteral")]
pub enum Requirement {
    /// The table must exist (any version)
    Exists,
    /// The table must be at this version or newer
    AtLeast(Version),
}

impl Requirement {
    /// Whether a table at `current` satisfies this requirement.
    pub fn is_satisfied_by(&self, current: &Version) -> bool {
        match self {
            Requirement::Exists => !current.is_missing(),
            Requirement::AtLeast(min) => current.not_older(min),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RequirementLiteral {
    Flag(bool),
    Version(Version),
}

impl TryFrom<RequirementLiteral> for Requirement {
    type Error = String;

    fn try_from(literal: RequirementLiteral) -> Result<Self, Self::Error> {
        match literal {
            RequirementLiteral::Flag(true) => Ok(Requirement::Exists),
            RequirementLiteral::Flag(false) => {
                Err("requirement must be `true` or a minimum version".to_string())
            }
            RequirementLiteral::Version(v) => Ok(Requirement::AtLeast(v)),
        }
    }
}

/// Which script a step (or replacement) runs.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "ScriptLiteral")]
pub enum ScriptSpec {
    /// Use the naming convention
    #[default]
    Default,
    /// Run no script
    Skip,
    /// Explicit path, relative to the table directory
    Path(PathBuf),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ScriptLiteral {
    Flag(bool),
    Path(String),
}

impl From<ScriptLiteral> for ScriptSpec {
    fn from(literal: ScriptLiteral) -> Self {
        match literal {
            ScriptLiteral::Flag(true) => ScriptSpec::Default,
            ScriptLiteral::Flag(false) => ScriptSpec::Skip,
            ScriptLiteral::Path(p) if p.trim().is_empty() => ScriptSpec::Skip,
            ScriptLiteral::Path(p) => ScriptSpec::Path(PathBuf::from(p.trim())),
        }
    }
}

/// Reference to a registered hook plus the parameters declared for it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "HookLiteral")]
pub struct HookSpec {
    /// Registry key of the hook
    pub name: HookName,
    /// Free-form parameters handed to the hook
    pub params: serde_json::Value,
}

impl HookSpec {
    /// A hook reference without parameters.
    pub fn named(name: HookName) -> Self {
        Self {
            name,
            params: serde_json::Value::Null,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum HookLiteral {
    Name(String),
    Pair(Vec<String>),
    Object {
        hook: String,
        #[serde(default)]
        params: serde_json::Value,
    },
}

impl TryFrom<HookLiteral> for HookSpec {
    type Error = String;

    fn try_from(literal: HookLiteral) -> Result<Self, Self::Error> {
        let (raw, params) = match literal {
            HookLiteral::Name(name) => (name, serde_json::Value::Null),
            HookLiteral::Pair(parts) => match parts.as_slice() {
                [file, function] => (pair_key(file, function), serde_json::Value::Null),
                _ => return Err("hook pair must be [file, function]".to_string()),
            },
            HookLiteral::Object { hook, params } => (hook, params),
        };
        let name = HookName::try_new(&raw).ok_or_else(|| "hook name must not be blank".to_string())?;
        Ok(HookSpec { name, params })
    }
}

/// Registry key for a `[file, function]` hook reference: `<file stem>::<function>`.
pub fn pair_key(file: &str, function: &str) -> String {
    let stem = Path::new(file.trim())
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("");
    if stem.is_empty() {
        function.trim().to_string()
    } else {
        format!("{stem}::{}", function.trim())
    }
}

/// One row-level migration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RowStepDef {
    /// Row version reached after the transform
    pub version: Version,

    /// Tables whose rows must be migrated first (existence only)
    #[serde(default, deserialize_with = "deserialize_row_requires")]
    pub requires: Vec<TableName>,

    /// Transform hook
    pub run: HookSpec,

    /// Optional fetch hook; defaults to selecting every row of the table
    #[serde(default)]
    pub fetch: Option<HookSpec>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RowRequires {
    List(Vec<TableName>),
    Map(BTreeMap<TableName, serde_json::Value>),
}

fn deserialize_row_requires<'de, D>(deserializer: D) -> Result<Vec<TableName>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RowRequires::deserialize(deserializer)? {
        RowRequires::List(names) => names,
        RowRequires::Map(map) => map.into_keys().collect(),
    })
}

impl TableDefinition {
    /// Load a definition file; `.json` is parsed as JSON, `.yml`/`.yaml` as YAML.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let parse_err = |details: String| CoreError::DefinitionParse {
            path: path.display().to_string(),
            details,
        };
        log::debug!("Loading table definition {}", path.display());
        match path.extension().and_then(|e| e.to_str()) {
            Some("yml") | Some("yaml") => {
                serde_yaml::from_str(&content).map_err(|e| parse_err(e.to_string()))
            }
            Some("json") => serde_json::from_str(&content).map_err(|e| parse_err(e.to_string())),
            other => Err(parse_err(format!(
                "unsupported definition format '{}' (expected .json, .yml or .yaml)",
                other.unwrap_or("")
            ))),
        }
    }

    /// Check structural rules that serde cannot express.
    pub fn validate(&self, table: &TableName) -> CoreResult<()> {
        let invalid = |reason: String| CoreError::DefinitionInvalid {
            table: table.to_string(),
            reason,
        };

        let mut seen: Vec<&Version> = Vec::new();
        for step in &self.table_versions {
            if seen.iter().any(|v| **v == step.version) {
                return Err(invalid(format!(
                    "duplicate table version {}",
                    step.version
                )));
            }
            if step.requires.contains_key(table.as_str()) {
                return Err(invalid(format!(
                    "step {} requires the table itself",
                    step.version
                )));
            }
            seen.push(&step.version);
        }

        let mut row_seen: Vec<&Version> = Vec::new();
        for step in &self.row_versions {
            if row_seen.iter().any(|v| **v == step.version) {
                return Err(invalid(format!("duplicate row version {}", step.version)));
            }
            row_seen.push(&step.version);
        }

        if self.replaces.as_ref().is_some_and(|r| r == table) {
            return Err(invalid("table cannot replace itself".to_string()));
        }
        if self.replaced_by.as_ref().is_some_and(|r| r == table) {
            return Err(invalid("table cannot be replaced by itself".to_string()));
        }
        if self
            .vercolumn
            .as_ref()
            .is_some_and(|c| c.trim().is_empty())
        {
            return Err(invalid("vercolumn must not be blank".to_string()));
        }
        Ok(())
    }

    /// Structural steps sorted by ascending version.
    pub fn sorted_steps(&self) -> Vec<StepDef> {
        let mut steps = self.table_versions.clone();
        steps.sort_by(|a, b| a.version.cmp(&b.version));
        steps
    }

    /// Row steps sorted by ascending version.
    pub fn sorted_row_steps(&self) -> Vec<RowStepDef> {
        let mut steps = self.row_versions.clone();
        steps.sort_by(|a, b| a.version.cmp(&b.version));
        steps
    }

    /// Tables that must be defined and ordered before this one (`needs`).
    pub fn hard_dependencies(&self) -> &[TableName] {
        &self.needs
    }

    /// Tables ordered before this one when they are defined.
    ///
    /// Collects step requirements, row requirements, the replaced table and
    /// `wants`, deduplicated in declaration order and without `needs`. Whether
    /// a requirement must exist is decided when its step is pending.
    pub fn soft_dependencies(&self) -> Vec<TableName> {
        let mut seen: HashSet<&str> = self.needs.iter().map(|n| n.as_str()).collect();
        self.table_versions
            .iter()
            .flat_map(|s| s.requires.keys())
            .chain(self.row_versions.iter().flat_map(|s| s.requires.iter()))
            .chain(self.replaces.iter())
            .chain(self.wants.iter())
            .filter(|name| seen.insert(name.as_str()))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
#[path = "definition_test.rs"]
mod tests;
