//! Image Harvest CLI — entry point.

use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use image_harvest::{HarvestConfig, HarvestJob};
use image_harvest_cli::{commands, load_params, parse_steps, Context};

#[derive(Parser)]
#[command(
    name = "image-harvest",
    about = "Build image datasets from public sources and run transformation chains over them",
    version
)]
struct Cli {
    /// Path to a JSON config file.
    /// Also reads IMAGE_HARVEST_CONFIG, then ./image-harvest.json.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Root folder for acquired and processed images (overrides config).
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Print reports as JSON on stdout.
    #[arg(long, global = true)]
    json: bool,

    /// No progress bars or summaries.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download images for a query, falling back across sources.
    Acquire {
        /// Search text.
        query: String,

        /// Number of images wanted.
        #[arg(short = 'n', long, default_value_t = 10)]
        count: usize,
    },

    /// Run a step chain over every image in a folder.
    ///
    /// Examples:
    ///   image-harvest process images_cats --steps 1,8 --params '{"resize":[256,256],"flip":1}'
    ///   image-harvest process images_cats --steps resize,rotate --params @params.json
    Process {
        /// Folder of .jpg/.jpeg/.png images.
        folder: PathBuf,

        /// Comma-separated step ids or names, applied in order.
        #[arg(short, long, default_value = "")]
        steps: String,

        /// Parameters as inline JSON or @file.
        #[arg(short, long)]
        params: Option<String>,

        /// Worker threads (capped at 8).
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Acquire, then process the acquired folder.
    Run {
        /// Search text.
        query: String,

        /// Number of images wanted.
        #[arg(short = 'n', long, default_value_t = 10)]
        count: usize,

        /// Comma-separated step ids or names, applied in order.
        #[arg(short, long, default_value = "")]
        steps: String,

        /// Parameters as inline JSON or @file.
        #[arg(short, long)]
        params: Option<String>,
    },

    /// Run a job file: {"query", "num_images", "selected_steps", "params"}.
    Job {
        /// Path to the job JSON.
        file: PathBuf,
    },

    /// List available transformation steps.
    Steps,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   image-harvest completions bash > ~/.local/share/bash-completion/completions/image-harvest
    ///   image-harvest completions zsh > ~/.zfunc/_image-harvest
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let json = cli.json;
    if let Err(e) = run(cli).await {
        if json {
            let body = serde_json::json!({ "error": true, "message": format!("{e:#}") });
            println!("{body}");
        } else {
            eprintln!("Error: {e:#}");
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "image-harvest", &mut std::io::stdout());
        return Ok(());
    }

    let mut config = HarvestConfig::load(cli.config.as_deref())?;
    if let Some(output) = cli.output {
        config.output_root = output;
    }

    let mut ctx = Context::new(config);
    ctx.json = cli.json;
    ctx.quiet = cli.quiet;

    match cli.command {
        Commands::Acquire { query, count } => {
            commands::acquire(&ctx, &query, count).await?;
        }

        Commands::Process {
            folder,
            steps,
            params,
            workers,
        } => {
            if let Some(workers) = workers {
                ctx.config.max_workers = workers;
            }
            let params = load_params(params.as_deref())?;
            commands::process(&ctx, &folder, &parse_steps(&steps), params).await?;
        }

        Commands::Run {
            query,
            count,
            steps,
            params,
        } => {
            let job = HarvestJob {
                query,
                num_images: count,
                selected_steps: parse_steps(&steps),
                params: load_params(params.as_deref())?,
            };
            commands::run(&ctx, &job).await?;
        }

        Commands::Job { file } => {
            commands::job(&ctx, &file).await?;
        }

        Commands::Steps => commands::steps(&ctx)?,

        Commands::Completions { .. } => {}
    }

    Ok(())
}
