// DvP unders matrix entry point.
//
// Startup sequence:
// 1. Parse arguments
// 2. Initialize tracing (stderr, so stdout carries only the output)
// 3. Load config, copying defaults/ into config/ on first run
// 4. Run the pipeline over the configured (or overridden) data file
// 5. Print the team list, JSON rows, or the text table

use anyhow::Context;
use clap::Parser;
use dvp_cli::render;
use dvp_core::config;
use dvp_core::pipeline::Pipeline;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "dvp")]
#[command(about = "Defense-vs-position unders matrix", long_about = None)]
struct Cli {
    /// Directory holding config/ and defaults/ (defaults to the current directory)
    #[arg(long)]
    base_dir: Option<PathBuf>,

    /// Player stats CSV, overriding `data.path` from the config
    #[arg(long)]
    data: Option<PathBuf>,

    /// Only show rows for this team (exact match, case-insensitive)
    #[arg(long)]
    team: Option<String>,

    /// Print rows as JSON instead of a table
    #[arg(long, default_value = "false")]
    json: bool,

    /// Print the teams present in the data and exit
    #[arg(long, default_value = "false")]
    list_teams: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing()?;

    let base_dir = match cli.base_dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("failed to read current directory")?,
    };
    let pipeline = Pipeline::new(
        config::load_config(&base_dir).context("failed to load configuration")?,
    );
    let config = pipeline.config();
    info!(
        "Config loaded: {} statistic(s), min sample {}%, {:?} fill, {:?} baseline",
        config.dvp.stats.len(),
        config.dvp.min_sample_pct,
        config.resolver.fill,
        config.dvp.baseline
    );

    let matrix = match &cli.data {
        Some(path) => pipeline
            .run_from_path(path)
            .with_context(|| format!("failed to build unders matrix from {}", path.display()))?,
        None => pipeline.run_configured(&base_dir).with_context(|| {
            format!(
                "failed to build unders matrix from {}",
                base_dir.join(&config.data.path).display()
            )
        })?,
    };

    let summary = matrix.summary;
    info!(
        "Excluded {} of {} rows ({} unresolved interchange, {} unmapped position)",
        summary.unresolved + summary.unmapped,
        summary.input_rows,
        summary.unresolved,
        summary.unmapped
    );

    if cli.list_teams {
        print!("{}", render::teams(matrix.teams()));
        return Ok(());
    }

    let rows = matrix.view(cli.team.as_deref());
    if cli.json {
        println!("{}", render::json(&rows).context("failed to serialize rows")?);
    } else {
        print!("{}", render::table(&rows));
    }

    Ok(())
}

/// Initialize tracing to stderr so table and JSON output stay pipeable.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("dvp_core=info,dvp=info,warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
