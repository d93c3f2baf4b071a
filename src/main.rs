use clap::{Parser, Subcommand};
use omnishot::dimensions::CustomDimensions;
use omnishot::orchestrator::Orchestrator;
use omnishot::platforms::PlatformRegistry;
use omnishot::types::{BudgetTier, OptimizationRequest};
use omnishot::{analysis, config, output};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "omnishot")]
#[command(about = "Optimize one photo for many platforms at once")]
#[command(long_about = "\
Optimize one photo for many platforms at once

Every requested platform gets its own variant: cropped to the platform's
box, colour graded, sharpened and encoded under its size limit. Higher
budgets route the image through a remote AI enhancement provider first and
fall back to local processing when the provider is slow or fails.

  omnishot optimize me.jpg -p linkedin -p github --output out/
  omnishot optimize me.jpg -p zoom --budget standard --style executive
  omnishot optimize me.jpg -p slack --width 600 --aspect-ratio 3:2 --json

Providers are configured in omnishot.toml; their API keys are read from the
environment variable each provider names.

Run 'omnishot gen-config' to generate a documented omnishot.toml.")]
#[command(version)]
struct Cli {
    /// Config file (default: ./omnishot.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace). RUST_LOG overrides when set
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Produce one optimized variant per platform
    Optimize(OptimizeArgs),
    /// List supported platforms
    Platforms,
    /// List enhancement styles
    Styles,
    /// Print the analysis and recommendations for an image
    Analyze {
        /// Source image
        image: PathBuf,
    },
    /// Print a stock omnishot.toml with all options documented
    GenConfig,
}

#[derive(clap::Args)]
struct OptimizeArgs {
    /// Source image (JPEG, PNG or WebP)
    image: PathBuf,

    /// Target platform id, repeatable (see `omnishot platforms`)
    #[arg(short, long = "platform", required = true)]
    platforms: Vec<String>,

    /// Enhancement style (see `omnishot styles`)
    #[arg(long, default_value = "professional")]
    style: String,

    /// Processing budget: basic, standard or premium
    #[arg(long, default_value = "basic")]
    budget: BudgetTier,

    /// Override every platform's output width
    #[arg(long)]
    width: Option<u32>,

    /// Override every platform's output height
    #[arg(long)]
    height: Option<u32>,

    /// Override every platform's aspect ratio, e.g. 16:9 or 1.5
    #[arg(long)]
    aspect_ratio: Option<String>,

    /// Write each variant to DIR/<platform>.<ext>
    #[arg(long)]
    output: Option<PathBuf>,

    /// Print the full result as JSON (outputs base64 encoded)
    #[arg(long)]
    json: bool,
}

impl OptimizeArgs {
    fn custom_dimensions(&self) -> Option<CustomDimensions> {
        if self.width.is_none() && self.height.is_none() && self.aspect_ratio.is_none() {
            return None;
        }
        Some(CustomDimensions {
            width: self.width,
            height: self.height,
            aspect_ratio: self.aspect_ratio.clone(),
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Optimize(args) => {
            let service_config = config::load_config(cli.config.as_deref())?;
            let orchestrator = Orchestrator::from_config(&service_config)?;

            let image = std::fs::read(&args.image)?;
            let mut request = OptimizationRequest::new(image, args.platforms.clone())
                .with_style(args.style.clone())
                .with_budget(args.budget);
            if let Some(custom) = args.custom_dimensions() {
                request = request.with_dimensions(custom);
            }

            let result = orchestrator.optimize(request).await?;

            if let Some(dir) = &args.output {
                write_outputs(dir, &result)?;
            }
            if args.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                output::print_result(&result, orchestrator.platforms(), args.output.as_deref());
            }
            tracing::debug!(stats = %orchestrator.stats(), "session stats");

            if !result.success {
                return Err("no platform produced an output".into());
            }
        }
        Command::Platforms => {
            output::print_platforms(&PlatformRegistry::builtin());
        }
        Command::Styles => {
            output::print_styles();
        }
        Command::Analyze { image } => {
            let bytes = std::fs::read(&image)?;
            let analysis = analysis::analyze(&bytes)?;
            output::print_analysis(&analysis);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Initialize the tracing subscriber. Logs go to stderr so `--json` stays clean.
fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("omnishot=info")),
        1 => EnvFilter::new("omnishot=debug"),
        _ => EnvFilter::new("omnishot=trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Write every successful variant to `dir/<platform>.<ext>`.
fn write_outputs(dir: &Path, result: &omnishot::types::AggregateResult) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;
    for (id, r) in &result.per_platform {
        if let (Some(bytes), Some(format)) = (&r.output, r.format) {
            let path = dir.join(format!("{}.{}", id, format.extension()));
            std::fs::write(&path, bytes)?;
            tracing::debug!(platform = %id, path = %path.display(), "variant written");
        }
    }
    Ok(())
}
