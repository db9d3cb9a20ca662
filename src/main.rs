use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

use photomark::{
    Config,
    batch::{BatchDriver, BatchError, BatchSummary, TracingObserver, photographer_roster},
    discovery,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Global options that apply to all commands
    #[arg(short, long, default_value = "photomark.toml", global = true)]
    config: PathBuf,

    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Watermark every image in the input folder (default if no command specified)
    Run(RunArgs),

    /// List the images and photographers a run would process
    Scan {
        #[arg(short, long)]
        input: PathBuf,
    },
}

#[derive(clap::Args, Debug, Default)]
struct RunArgs {
    /// Folder holding the submissions, loose or in photographer subfolders
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Folder the output roots are created in
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Watermark text
    #[arg(short, long)]
    text: Option<String>,

    /// Attribution CSV with filename, team_name, caption, photographer columns
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Logo image placed in the bottom-left corner
    #[arg(long)]
    logo: Option<PathBuf>,

    /// Write both normal and protected variants
    #[arg(long)]
    dual: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Set up logging first
    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Some(Commands::Scan { input }) => scan(input),
        Some(Commands::Run(args)) => run_batch(cli.config, args).await,
        None => run_batch(cli.config, RunArgs::default()).await,
    }
}

fn scan(input: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let images = discovery::find_all_images(&input);
    if images.is_empty() {
        println!("No images found in {}", input.display());
        return Ok(());
    }

    for record in &images {
        match &record.photographer {
            Some(photographer) => {
                println!("{}  [{}]", record.relative_path.display(), photographer)
            }
            None => println!("{}", record.relative_path.display()),
        }
    }

    let roster = photographer_roster(&images);
    println!();
    println!("{} images", images.len());
    if !roster.is_empty() {
        println!(
            "{} photographers: {}",
            roster.len(),
            roster.into_iter().collect::<Vec<_>>().join(", ")
        );
    }
    Ok(())
}

async fn run_batch(config_path: PathBuf, args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default(&config_path)?;
    if config_path.exists() {
        info!("Configuration loaded from: {:?}", config_path);
    } else {
        info!("Config file not found at {:?}, using defaults", config_path);
    }

    // Command line values win over the config file
    let mut options = config.batch_options();
    if let Some(input) = args.input {
        options.input_folder = input;
    }
    if let Some(output) = args.output {
        options.output_folder = output;
    }
    if let Some(text) = args.text {
        options.watermark_text = text;
    }
    if args.csv.is_some() {
        options.attribution_csv = args.csv;
    }
    if args.logo.is_some() {
        options.logo = args.logo;
    }
    options.dual_output |= args.dual;

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, finishing the current image");
                cancel.store(true, Ordering::Relaxed);
            }
        });
    }

    let settings = config.watermark.processor_settings();
    let result = tokio::task::spawn_blocking(move || {
        BatchDriver::new(settings)
            .with_cancel_flag(cancel)
            .run(&options, &TracingObserver)
    })
    .await?;

    match result {
        Ok(summary) => {
            print_summary(&summary);
            Ok(())
        }
        Err(BatchError::InvalidConfiguration(errors)) => {
            for e in &errors {
                eprintln!("Error: {}", e);
            }
            Err("Invalid batch configuration".into())
        }
        Err(e) => Err(e.into()),
    }
}

fn print_summary(summary: &BatchSummary) {
    println!("Watermarking complete");
    for variant in &summary.variants {
        println!(
            "  {}: {}/{} processed -> {}",
            variant.mode,
            variant.success_count,
            summary.total_count,
            variant.output_root.display()
        );
        println!("    log: {}", variant.log_path.display());
    }
    if summary.cancelled {
        println!(
            "  cancelled after {} of {} images",
            summary.attempted_count, summary.total_count
        );
    }
}
