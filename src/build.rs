//! Artifact build pipeline
//!
//! Turns an asset tree into publishable artifacts under a build directory
//! that mirrors the repository layout:
//! - `*.ld.yaml` becomes `*.jsonld`, other `*.yaml` becomes `*.json`, and the
//!   YAML source is copied alongside
//! - `*.ttl` becomes `*.nt`
//!
//! An artifact is rebuilt only when it is missing or not newer than its
//! source.

use crate::catalog::{AssetFilter, AssetPath};
use crate::config::BuildArgs;
use crate::report::ValidationReport;
use anyhow::{Context, Result};
use oxigraph::model::Quad;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_BASE: &str = "assets";
pub const DEFAULT_BUILD_DIR: &str = "_build";

#[derive(Debug, Clone)]
pub struct BuildRequest {
    /// Asset tree to build, relative to the repository root.
    pub base: PathBuf,
    pub build_dir: PathBuf,
    pub filter: AssetFilter,
    /// Run the format check over every selected asset first.
    pub validate: bool,
    pub semantic: bool,
    pub json: bool,
}

impl Default for BuildRequest {
    fn default() -> Self {
        Self {
            base: PathBuf::from(DEFAULT_BASE),
            build_dir: PathBuf::from(DEFAULT_BUILD_DIR),
            filter: AssetFilter::default(),
            validate: false,
            semantic: false,
            json: false,
        }
    }
}

impl BuildRequest {
    pub fn from_args(args: &BuildArgs) -> Self {
        let defaults = Self::default();
        Self {
            base: args.base.clone().unwrap_or(defaults.base),
            build_dir: args.build_dir.clone().unwrap_or(defaults.build_dir),
            filter: AssetFilter::new(args.pattern.clone(), args.exclude.clone()),
            validate: args.validate,
            semantic: args.semantic,
            json: args.json,
        }
    }

    /// Neither artifact family selected means both.
    fn families(&self) -> (bool, bool) {
        if !self.semantic && !self.json {
            (true, true)
        } else {
            (self.semantic, self.json)
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildReport {
    /// Artifacts written, repository-relative.
    pub built: Vec<PathBuf>,
    /// Artifacts skipped because they were newer than their source.
    pub up_to_date: usize,
    pub failures: Vec<String>,
    pub validation: ValidationReport,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.validation.is_empty()
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_success() { 0 } else { 1 }
    }
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.validation.is_empty() {
            write!(f, "{}", self.validation)?;
        }
        for failure in &self.failures {
            writeln!(f, "ERROR: {failure}")?;
        }
        write!(
            f,
            "Built {} artifacts ({} up to date).",
            self.built.len(),
            self.up_to_date
        )
    }
}

/// Writes the artifacts of single assets.
#[derive(Debug, Clone)]
pub struct ArtifactBuilder {
    root: PathBuf,
    build_dir: PathBuf,
    semantic: bool,
    json: bool,
}

impl ArtifactBuilder {
    pub fn new(root: &Path, request: &BuildRequest) -> Self {
        let (semantic, json) = request.families();
        let build_dir = if request.build_dir.is_absolute() {
            request.build_dir.clone()
        } else {
            root.join(&request.build_dir)
        };
        Self {
            root: root.to_path_buf(),
            build_dir,
            semantic,
            json,
        }
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    /// Build every artifact of `asset`, recording results in `report`.
    pub fn build_asset(&self, asset: &AssetPath, report: &mut BuildReport) {
        let name = asset.file_name();
        let result = if self.json && name.ends_with(".yaml") {
            self.build_json(asset, report)
        } else if self.semantic && name.ends_with(".ttl") {
            self.build_ntriples(asset, report)
        } else {
            return;
        };
        if let Err(error) = result {
            tracing::warn!(asset = %asset, error = %error, "artifact build failed");
            report.failures.push(format!("{asset}: {error:#}"));
        }
    }

    fn destination(&self, asset: &AssetPath, file_name: &str) -> PathBuf {
        let relative_dir = asset.relative().parent().unwrap_or(Path::new(""));
        self.build_dir.join(relative_dir).join(file_name)
    }

    fn build_json(&self, asset: &AssetPath, report: &mut BuildReport) -> Result<()> {
        let name = asset.file_name();
        let artifact = match name.strip_suffix(".ld.yaml") {
            Some(stem) => format!("{stem}.jsonld"),
            None => format!("{}.json", name.trim_end_matches(".yaml")),
        };

        let dest = self.destination(asset, &artifact);
        if is_fresh(asset.absolute(), &dest) {
            report.up_to_date += 1;
        } else {
            let text = fs::read_to_string(asset.absolute())
                .with_context(|| format!("failed to read {asset}"))?;
            let document: Value = serde_yaml::from_str(&text)
                .with_context(|| format!("failed to parse YAML {asset}"))?;
            let json = serde_json::to_string_pretty(&document)?;
            self.write(&dest, json.as_bytes(), report)?;
        }

        let copy = self.destination(asset, name);
        if is_fresh(asset.absolute(), &copy) {
            report.up_to_date += 1;
            return Ok(());
        }
        let source = fs::read(asset.absolute()).with_context(|| format!("failed to read {asset}"))?;
        self.write(&copy, &source, report)
    }

    fn build_ntriples(&self, asset: &AssetPath, report: &mut BuildReport) -> Result<()> {
        let name = asset.file_name();
        let dest = self.destination(asset, &format!("{}.nt", name.trim_end_matches(".ttl")));
        if is_fresh(asset.absolute(), &dest) {
            report.up_to_date += 1;
            return Ok(());
        }
        let text = fs::read_to_string(asset.absolute())
            .with_context(|| format!("failed to read {asset}"))?;
        let ntriples = turtle_to_ntriples(&text).with_context(|| format!("failed to convert {asset}"))?;
        self.write(&dest, ntriples.as_bytes(), report)
    }

    fn write(&self, dest: &Path, content: &[u8], report: &mut BuildReport) -> Result<()> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(dest, content).with_context(|| format!("failed to write {}", dest.display()))?;
        tracing::debug!(artifact = %dest.display(), "artifact written");
        report
            .built
            .push(dest.strip_prefix(&self.root).unwrap_or(dest).to_path_buf());
        Ok(())
    }
}

/// Serialize Turtle as sorted N-Triples lines.
pub fn turtle_to_ntriples(turtle: &str) -> Result<String> {
    let store = crate::rules::parse_turtle(turtle)?;
    let mut lines = store
        .iter()
        .map(|quad| -> Result<String> {
            let Quad {
                subject,
                predicate,
                object,
                ..
            } = quad?;
            Ok(format!("{subject} {predicate} {object} .\n"))
        })
        .collect::<Result<Vec<_>>>()?;
    lines.sort();
    Ok(lines.concat())
}

/// True when `dest` exists and is strictly newer than `source`.
fn is_fresh(source: &Path, dest: &Path) -> bool {
    let modified = |path: &Path| fs::metadata(path).and_then(|m| m.modified()).ok();
    match (modified(source), modified(dest)) {
        (Some(source), Some(dest)) => dest > source,
        _ => false,
    }
}
