pub mod build;
pub mod catalog;
pub mod checks;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod pool;
pub mod report;
pub mod rules;
pub mod semantic;
pub mod validators;
pub mod versioning;

pub use build::{ArtifactBuilder, BuildReport, BuildRequest};
pub use catalog::{AssetCatalog, AssetFilter, AssetPath};
pub use config::{CliArgs, Command, EngineConfig};
pub use dispatch::{CheckName, ValidationDispatcher};
pub use error::{ConformanceError, ErrorKind};
pub use logging::{LoggingConfig, init_logging};
pub use pool::{DispatcherFactory, WorkerPool};
pub use report::{FileOutcome, ValidationReport};

use anyhow::Context;
use std::path::Path;
use std::sync::Arc;

/// Every candidate asset under `base`, relative to the repository root.
pub fn discover(
    config: &EngineConfig,
    base: &Path,
    filter: &AssetFilter,
) -> Result<Vec<AssetPath>, ConformanceError> {
    let base = config.resolve_path(base);
    if !base.is_dir() {
        return Err(ConformanceError::Config(format!(
            "base path {} is not a directory",
            base.display()
        )));
    }
    let catalog = AssetCatalog::new(&config.repository_root);
    Ok(catalog.scan(&base, filter).collect())
}

/// Validate `assets` with the default validators on a worker pool.
pub async fn validate(
    config: &EngineConfig,
    assets: Vec<AssetPath>,
    checks: &[CheckName],
) -> Result<ValidationReport, ConformanceError> {
    let factory: DispatcherFactory = {
        let config = config.clone();
        Arc::new(move || ValidationDispatcher::new(&config))
    };
    validate_with(config, assets, checks, factory).await
}

/// Validate with dispatchers built by `factory`, one per worker.
pub async fn validate_with(
    config: &EngineConfig,
    assets: Vec<AssetPath>,
    checks: &[CheckName],
    factory: DispatcherFactory,
) -> Result<ValidationReport, ConformanceError> {
    config.validate()?;
    tracing::info!(files = assets.len(), workers = config.workers, "validating assets");
    Ok(WorkerPool::new(config.workers).run(assets, checks, factory).await)
}

/// Build artifacts for the selected assets, optionally validating them
/// first. Artifacts are not written when validation fails.
pub async fn build(config: &EngineConfig, request: &BuildRequest) -> anyhow::Result<BuildReport> {
    config.validate()?;
    let assets = discover(config, &request.base, &request.filter)?;
    tracing::info!(files = assets.len(), base = %request.base.display(), "building assets");

    let mut report = BuildReport::default();
    if request.validate {
        report.validation = validate(config, assets.clone(), &[CheckName::Format]).await?;
        if !report.validation.is_empty() {
            tracing::warn!(errors = report.validation.len(), "validation failed, nothing built");
            return Ok(report);
        }
    }

    let builder = ArtifactBuilder::new(&config.repository_root, request);
    tokio::task::spawn_blocking(move || {
        for asset in &assets {
            builder.build_asset(asset, &mut report);
        }
        report
    })
    .await
    .context("build task failed")
}
