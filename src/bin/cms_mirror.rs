use std::process::ExitCode;

use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use cms_hospital_mirror::app::App;
use cms_hospital_mirror::catalog::CatalogHttpClient;
use cms_hospital_mirror::config::{ConfigLoader, ConfigOverrides};
use cms_hospital_mirror::error::MirrorError;
use cms_hospital_mirror::fetcher::HttpDatasetFetcher;
use cms_hospital_mirror::output::{ConsoleOutput, JsonOutput, OutputMode};
use cms_hospital_mirror::store::OutputDir;

#[derive(Parser)]
#[command(name = "cms-mirror")]
#[command(about = "Incrementally mirror CMS hospital datasets as normalized CSV files")]
#[command(version, author)]
struct Cli {
    /// Path to a JSON config file (defaults to ./cms-mirror.json when present)
    #[arg(long)]
    config: Option<String>,

    #[arg(long)]
    output_dir: Option<String>,

    /// Run metadata file holding the last run timestamp
    #[arg(long)]
    metadata: Option<String>,

    #[arg(long)]
    topic: Option<String>,

    #[arg(long)]
    catalog_url: Option<String>,

    /// Number of concurrent downloads
    #[arg(long)]
    workers: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Print the run report as JSON instead of progress lines
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<MirrorError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &MirrorError) -> u8 {
    match error {
        MirrorError::ConfigRead(_)
        | MirrorError::ConfigParse(_)
        | MirrorError::InvalidConfig(_) => 2,
        MirrorError::CatalogHttp(_)
        | MirrorError::CatalogStatus { .. }
        | MirrorError::CatalogFormat(_)
        | MirrorError::EmptyCatalog(_) => 3,
        MirrorError::DatasetsFailed { .. } => 4,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Console
    };

    let overrides = ConfigOverrides {
        catalog_url: cli.catalog_url,
        topic: cli.topic,
        output_dir: cli.output_dir,
        metadata_path: cli.metadata,
        workers: cli.workers,
        request_timeout_secs: cli.timeout_secs,
    };
    let config = ConfigLoader::resolve(cli.config.as_deref(), overrides)?;

    let catalog = CatalogHttpClient::new(config.catalog_url.clone(), config.request_timeout)?;
    let fetcher = HttpDatasetFetcher::new(
        OutputDir::new(config.output_dir.clone()),
        config.request_timeout,
    )?;
    let app = App::new(&config, catalog, fetcher);

    let report = match output_mode {
        OutputMode::Console => {
            let report = app.run(&ConsoleOutput)?;
            ConsoleOutput::print_run(&report).into_diagnostic()?;
            report
        }
        OutputMode::Json => {
            let report = app.run(&JsonOutput)?;
            JsonOutput::print_run(&report).into_diagnostic()?;
            report
        }
    };

    let failed = report.failed();
    if failed > 0 {
        return Err(MirrorError::DatasetsFailed {
            failed,
            total: report.items.len(),
        }
        .into());
    }
    Ok(())
}
