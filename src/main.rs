use clap::Parser;
use semantic_conformance::build::DEFAULT_BASE;
use semantic_conformance::{
    AssetFilter, AssetPath, BuildRequest, CliArgs, Command, EngineConfig, LoggingConfig, build,
    discover, init_logging, validate,
};
use std::path::Path;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliArgs::parse();
    let guard = init_logging(LoggingConfig::from_env().with_debug(cli.debug))?;

    let config = EngineConfig::from_args(&cli.engine, cli.config.as_deref())?;
    // Fail before touching any asset.
    config.validate()?;

    let code = match &cli.command {
        Command::Validate(args) => {
            let assets = if args.files.is_empty() {
                let filter = AssetFilter::new(args.pattern.clone(), args.exclude.clone());
                discover(&config, Path::new(DEFAULT_BASE), &filter)?
            } else {
                args.files
                    .iter()
                    .map(|file| AssetPath::new(&config.repository_root, file))
                    .collect()
            };
            let report = validate(&config, assets, &args.checks).await?;
            println!("{report}");
            report.exit_code()
        }
        Command::Build(args) => {
            let report = build(&config, &BuildRequest::from_args(args)).await?;
            println!("{report}");
            report.exit_code()
        }
    };

    // Flush buffered log lines; `exit` skips destructors.
    drop(guard);
    std::process::exit(code)
}
