use crate::dispatch::CheckName;
use crate::error::ConformanceError;
use crate::semantic::{DependencyMatch, FetchPolicy};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_RULE_FILE: &str = "rules.shacl";
pub const DEFAULT_MAX_RULE_DEPTH: usize = 5;
pub const DEFAULT_RULE_CACHE_CAPACITY: usize = 100;
pub const DEFAULT_MAX_FILE_SIZE: u64 = 4 << 20;
pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_ALLOWED_NAMESPACE: &str = "https://w3id.org/italia/";
pub const DEFAULT_ONTOLOGY_DIR: &str = "assets/ontologies";
pub const DEFAULT_RESOLVER_HOST: &str = "https://ontopia-lodview.agid.gov.it/";
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

/// Settings shared by every component of the engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub repository_root: PathBuf,
    pub rule_file_name: String,
    pub max_rule_depth: usize,
    pub rule_cache_capacity: usize,
    pub max_file_size: u64,
    pub workers: usize,
    /// Only predicates under this prefix are resolved as dependencies.
    pub allowed_namespace: String,
    /// Local ontology subtree, relative to the repository root.
    pub ontology_dir: PathBuf,
    /// Prefix rewritten to `resolver_host` for remote lookups.
    pub resolver_prefix: String,
    pub resolver_host: String,
    pub fetch: FetchPolicy,
    pub dependency_match: DependencyMatch,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            repository_root: PathBuf::from("."),
            rule_file_name: DEFAULT_RULE_FILE.to_string(),
            max_rule_depth: DEFAULT_MAX_RULE_DEPTH,
            rule_cache_capacity: DEFAULT_RULE_CACHE_CAPACITY,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            workers: DEFAULT_WORKERS,
            allowed_namespace: DEFAULT_ALLOWED_NAMESPACE.to_string(),
            ontology_dir: PathBuf::from(DEFAULT_ONTOLOGY_DIR),
            resolver_prefix: DEFAULT_ALLOWED_NAMESPACE.to_string(),
            resolver_host: DEFAULT_RESOLVER_HOST.to_string(),
            fetch: FetchPolicy::default(),
            dependency_match: DependencyMatch::default(),
        }
    }
}

impl EngineConfig {
    /// Default configuration rooted at `root`.
    pub fn for_root(root: impl Into<PathBuf>) -> Self {
        Self {
            repository_root: root.into(),
            ..Self::default()
        }
    }

    pub fn from_args(args: &EngineArgs, config_file: Option<&Path>) -> Result<Self> {
        let file_config = if let Some(path) = config_file {
            load_config_file(path)?
        } else {
            PartialConfig::default()
        };

        let PartialConfig {
            repository_root: file_root,
            rule_file_name: file_rule_file_name,
            max_rule_depth: file_max_rule_depth,
            rule_cache_capacity: file_rule_cache_capacity,
            max_file_size: file_max_file_size,
            workers: file_workers,
            allowed_namespace: file_allowed_namespace,
            ontology_dir: file_ontology_dir,
            resolver_prefix: file_resolver_prefix,
            resolver_host: file_resolver_host,
            fetch_timeout_secs: file_fetch_timeout_secs,
            offline: file_offline,
            dependency_match: file_dependency_match,
        } = file_config;

        let defaults = Self::default();

        let repository_root = args
            .root
            .clone()
            .or(file_root)
            .unwrap_or(defaults.repository_root);

        let allowed_namespace = args
            .allowed_namespace
            .clone()
            .or(file_allowed_namespace)
            .unwrap_or(defaults.allowed_namespace);

        let fetch = FetchPolicy {
            timeout: Duration::from_secs(
                args.fetch_timeout_secs
                    .or(file_fetch_timeout_secs)
                    .unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS),
            ),
            offline: args.offline || file_offline.unwrap_or(false),
        };

        Ok(Self {
            repository_root,
            rule_file_name: file_rule_file_name.unwrap_or(defaults.rule_file_name),
            max_rule_depth: args
                .max_rule_depth
                .or(file_max_rule_depth)
                .unwrap_or(defaults.max_rule_depth),
            rule_cache_capacity: args
                .rule_cache_capacity
                .or(file_rule_cache_capacity)
                .unwrap_or(defaults.rule_cache_capacity),
            max_file_size: args
                .max_file_size
                .or(file_max_file_size)
                .unwrap_or(defaults.max_file_size),
            workers: args.workers.or(file_workers).unwrap_or(defaults.workers),
            resolver_prefix: file_resolver_prefix.unwrap_or_else(|| allowed_namespace.clone()),
            allowed_namespace,
            ontology_dir: args
                .ontology_dir
                .clone()
                .or(file_ontology_dir)
                .unwrap_or(defaults.ontology_dir),
            resolver_host: args
                .resolver_host
                .clone()
                .or(file_resolver_host)
                .unwrap_or(defaults.resolver_host),
            fetch,
            dependency_match: args
                .dependency_match
                .or(file_dependency_match)
                .unwrap_or(defaults.dependency_match),
        })
    }

    /// Fail fast on values the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConformanceError> {
        let fail = |message: String| Err(ConformanceError::Config(message));

        if !self.repository_root.exists() {
            return fail(format!(
                "repository root {:?} does not exist",
                self.repository_root
            ));
        }
        if !self.repository_root.is_dir() {
            return fail(format!(
                "repository root {:?} is not a directory",
                self.repository_root
            ));
        }
        if self.workers == 0 {
            return fail("at least one worker is required".to_string());
        }
        if self.max_rule_depth == 0 {
            return fail("max rule depth must be at least 1".to_string());
        }
        if self.rule_cache_capacity == 0 {
            return fail("rule cache capacity must be at least 1".to_string());
        }
        if self.max_file_size == 0 {
            return fail("max file size must be greater than zero".to_string());
        }
        if self.rule_file_name.is_empty() || self.rule_file_name.contains('/') {
            return fail(format!("invalid rule file name {:?}", self.rule_file_name));
        }
        if !self.allowed_namespace.ends_with(['/', '#']) {
            return fail(format!(
                "allowed namespace {:?} must end with '/' or '#'",
                self.allowed_namespace
            ));
        }
        if !self.resolver_host.starts_with("http://") && !self.resolver_host.starts_with("https://")
        {
            return fail(format!(
                "resolver host {:?} is not an http(s) URL",
                self.resolver_host
            ));
        }
        Ok(())
    }

    pub fn resolve_path<P: AsRef<Path>>(&self, relative: P) -> PathBuf {
        let relative = relative.as_ref();
        if relative.is_absolute() {
            relative.to_path_buf()
        } else {
            self.repository_root.join(relative)
        }
    }

    pub fn ontology_root(&self) -> PathBuf {
        self.resolve_path(&self.ontology_dir)
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "semantic-conformance",
    about = "Validate and build repositories of semantic data assets",
    version
)]
pub struct CliArgs {
    #[arg(
        long,
        value_name = "FILE",
        help = "Path to a configuration file (YAML or JSON)",
        global = true
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        env = "CONFORMANCE_DEBUG",
        help = "Raise the default log level to debug",
        global = true
    )]
    pub debug: bool,

    #[command(flatten)]
    pub engine: EngineArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Default, Clone)]
pub struct EngineArgs {
    #[arg(
        long,
        env = "CONFORMANCE_ROOT",
        value_name = "DIR",
        help = "Repository root containing the assets tree",
        global = true
    )]
    pub root: Option<PathBuf>,

    #[arg(
        long,
        env = "CONFORMANCE_WORKERS",
        value_name = "N",
        help = "Number of parallel validation workers",
        global = true
    )]
    pub workers: Option<usize>,

    #[arg(
        long,
        env = "CONFORMANCE_MAX_FILE_SIZE",
        value_name = "BYTES",
        help = "Files above this size are rejected before validation",
        global = true
    )]
    pub max_file_size: Option<u64>,

    #[arg(
        long,
        env = "CONFORMANCE_RULE_CACHE_CAPACITY",
        value_name = "N",
        help = "Maximum number of parsed rule files kept per worker",
        global = true
    )]
    pub rule_cache_capacity: Option<usize>,

    #[arg(
        long,
        env = "CONFORMANCE_MAX_RULE_DEPTH",
        value_name = "N",
        help = "Number of ancestor directories searched for a rule file",
        global = true
    )]
    pub max_rule_depth: Option<usize>,

    #[arg(
        long,
        env = "CONFORMANCE_ALLOWED_NAMESPACE",
        value_name = "IRI",
        help = "Namespace whose terms must resolve to known ontology subjects",
        global = true
    )]
    pub allowed_namespace: Option<String>,

    #[arg(
        long,
        env = "CONFORMANCE_ONTOLOGY_DIR",
        value_name = "DIR",
        help = "Local ontology subtree, relative to the repository root",
        global = true
    )]
    pub ontology_dir: Option<PathBuf>,

    #[arg(
        long,
        env = "CONFORMANCE_RESOLVER_HOST",
        value_name = "URL",
        help = "Host serving ontology terms that are not found locally",
        global = true
    )]
    pub resolver_host: Option<String>,

    #[arg(
        long,
        env = "CONFORMANCE_FETCH_TIMEOUT",
        value_name = "SECS",
        help = "Timeout of the single remote fetch attempt",
        global = true
    )]
    pub fetch_timeout_secs: Option<u64>,

    #[arg(
        long,
        env = "CONFORMANCE_OFFLINE",
        help = "Never contact the remote resolver",
        global = true
    )]
    pub offline: bool,

    #[arg(
        long,
        env = "CONFORMANCE_DEPENDENCY_MATCH",
        value_enum,
        value_name = "POLICY",
        help = "How unresolved IRIs are matched against known subjects",
        global = true
    )]
    pub dependency_match: Option<DependencyMatch>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Validate files, or every asset under the assets directory
    Validate(ValidateArgs),
    /// Build JSON and N-Triples artifacts from an asset tree
    Build(BuildArgs),
}

#[derive(Args, Debug, Default, Clone)]
pub struct ValidateArgs {
    #[arg(
        long,
        value_enum,
        value_delimiter = ',',
        value_name = "CHECK",
        help = "Checks to run on every file (defaults to format)"
    )]
    pub checks: Vec<CheckName>,

    #[arg(long, default_value = "", help = "Only scan files whose name contains this")]
    pub pattern: String,

    #[arg(long, value_name = "TEXT", help = "Skip files whose name contains this")]
    pub exclude: Vec<String>,

    #[arg(value_name = "FILES", help = "Files to validate instead of scanning the root")]
    pub files: Vec<PathBuf>,
}

#[derive(Args, Debug, Default, Clone)]
pub struct BuildArgs {
    #[arg(value_name = "BASE", help = "Asset tree to build (defaults to assets)")]
    pub base: Option<PathBuf>,

    #[arg(value_name = "BUILD_DIR", help = "Output directory (defaults to _build)")]
    pub build_dir: Option<PathBuf>,

    #[arg(long, default_value = "", help = "Only build files whose name contains this")]
    pub pattern: String,

    #[arg(long, value_name = "TEXT", help = "Skip files whose name contains this")]
    pub exclude: Vec<String>,

    #[arg(long, help = "Validate the format of every selected file first")]
    pub validate: bool,

    #[arg(long, help = "Serialize Turtle assets as N-Triples")]
    pub semantic: bool,

    #[arg(long, help = "Convert YAML assets to JSON and JSON-LD")]
    pub json: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PartialConfig {
    repository_root: Option<PathBuf>,
    rule_file_name: Option<String>,
    max_rule_depth: Option<usize>,
    rule_cache_capacity: Option<usize>,
    max_file_size: Option<u64>,
    workers: Option<usize>,
    allowed_namespace: Option<String>,
    ontology_dir: Option<PathBuf>,
    resolver_prefix: Option<String>,
    resolver_host: Option<String>,
    fetch_timeout_secs: Option<u64>,
    offline: Option<bool>,
    dependency_match: Option<DependencyMatch>,
}

fn load_config_file(path: &Path) -> Result<PartialConfig> {
    if !path.exists() {
        anyhow::bail!("config file {:?} does not exist", path);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {:?}", path))?;
    let ext = path
        .extension()
        .and_then(|os| os.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let parsed = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse YAML config {:?}", path))?,
        "json" => serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse JSON config {:?}", path))?,
        other => anyhow::bail!("unsupported config extension: {other}"),
    };
    Ok(parsed)
}
