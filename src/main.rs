use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use markflow::{
    Alignment, DataPaths, MarkflowConfig,
    batch::{self, BatchEvent, BatchJob},
    config::SETTABLE_KEYS,
    library::WatermarkLibrary,
    startup_checks,
    tray::ImageTray,
    watermark::WatermarkSpec,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Batch-apply logo watermarks to photos", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding config.json and the watermark library
    #[arg(short, long, default_value = "data", global = true)]
    data_dir: PathBuf,

    /// Configuration file (defaults to <data-dir>/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Watermark photos (files or directories)
    Apply {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// Show what would be picked up from the given files or directories
    Tray {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },

    /// Manage the watermark library
    #[command(subcommand)]
    Logos(LogoCommands),

    /// Show or change the saved configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// One-off settings for a single run; never written to the config file.
#[derive(Args, Debug)]
struct Overrides {
    /// Logo file name from the library
    #[arg(long)]
    logo: Option<String>,

    /// Alternate logo for backgrounds that clash with the primary one
    #[arg(long)]
    alternate: Option<String>,

    /// Logo width as a percentage of the photo width
    #[arg(long)]
    size: Option<f32>,

    /// center, left or right
    #[arg(long)]
    align: Option<Alignment>,

    /// Bottom margin as a percentage of the photo height
    #[arg(long)]
    margin: Option<f32>,

    #[arg(long, conflicts_with = "no_auto_invert")]
    auto_invert: bool,

    #[arg(long)]
    no_auto_invert: bool,

    /// Mean luma (0-255) at which the logo is swapped
    #[arg(long)]
    threshold: Option<u8>,

    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JPEG quality (1-100)
    #[arg(long)]
    quality: Option<u8>,
}

impl Overrides {
    fn apply_to(&self, config: &mut MarkflowConfig) -> Result<(), markflow::config::ConfigError> {
        if let Some(logo) = &self.logo {
            config.use_logo = Some(logo.clone());
        }
        if let Some(alternate) = &self.alternate {
            config.alternate_logo = Some(alternate.clone());
        }
        if let Some(size) = self.size {
            config.logo_size = size;
        }
        if let Some(align) = self.align {
            config.alignment = align;
        }
        if let Some(margin) = self.margin {
            config.bottom_margin = margin;
        }
        if self.auto_invert {
            config.auto_invert = true;
        }
        if self.no_auto_invert {
            config.auto_invert = false;
        }
        if let Some(threshold) = self.threshold {
            config.brightness_threshold = threshold;
        }
        if let Some(output) = &self.output {
            config.output_directory = output.clone();
        }
        if let Some(quality) = self.quality {
            config.jpeg_quality = quality;
        }
        config.validate()
    }
}

#[derive(Subcommand, Debug)]
enum LogoCommands {
    /// List watermarks in the library
    List,
    /// Copy image files into the library
    Import {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Rename a watermark (the extension is kept if omitted)
    Rename { name: String, new_name: String },
    /// Delete a watermark that is not currently selected
    Delete { name: String },
    /// Use a watermark for future batches
    Select { name: String },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Print the effective configuration
    Show,
    /// Change one setting
    Set { key: String, value: String },
    /// Print the configuration file location
    Path,
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

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let paths = DataPaths::new(cli.data_dir, cli.config);

    match cli.command {
        Commands::Apply { inputs, overrides } => run_apply(&paths, inputs, overrides).await,
        Commands::Tray { inputs } => run_tray(inputs).await,
        Commands::Logos(cmd) => handle_logo_command(&paths, cmd),
        Commands::Config(cmd) => handle_config_command(&paths, cmd),
    }
}

async fn run_apply(
    paths: &DataPaths,
    inputs: Vec<PathBuf>,
    overrides: Overrides,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = MarkflowConfig::load(&paths.config_file)?;
    overrides.apply_to(&mut config)?;

    match startup_checks::perform_startup_checks(paths, &config) {
        Ok(()) => {}
        Err(errors) => {
            for error in &errors {
                tracing::error!("Startup check failed: {}", error);
            }
            if errors.iter().any(|e| e.is_critical()) {
                tracing::error!("Critical startup check failed, exiting");
                return Err("Critical startup check failed".into());
            }
            tracing::warn!("Non-critical startup checks failed, continuing");
        }
    }

    let mut tray = ImageTray::new();
    tray.exclude(&config.output_directory);
    let added = tray.add_all(&inputs);
    info!("Added {} photo(s) to the tray", added);
    if tray.is_empty() {
        return Err("No photos found in the given inputs".into());
    }

    let intake = tray.intake().await?;
    let mut rejected = 0;
    for item in intake.iter().filter(|item| !item.is_ok()) {
        rejected += 1;
        eprintln!(
            "Skipping {}: {}",
            item.display_name,
            item.error.as_deref().unwrap_or("unknown error")
        );
    }
    let items: Vec<PathBuf> = intake
        .into_iter()
        .filter(|item| item.is_ok())
        .map(|item| item.path)
        .collect();

    let spec = WatermarkSpec::from_config(&config, &paths.watermark_directory)?;
    let job = BatchJob {
        items,
        spec: Arc::new(spec),
        output_directory: config.output_directory.clone(),
        jpeg_quality: config.jpeg_quality,
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    let worker = tokio::spawn(batch::run_batch(job, Some(tx)));

    while let Some(event) = rx.recv().await {
        match event {
            BatchEvent::Started {
                index,
                total,
                source,
            } => println!("[{}/{}] {}", index + 1, total, source.display()),
            BatchEvent::Finished {
                output, variant, ..
            } => println!("    -> {} ({:?} logo)", output.display(), variant),
            BatchEvent::Failed { error, .. } => println!("    failed: {}", error),
        }
    }

    let report = worker.await??;
    let elapsed = report.finished_at - report.started_at;
    println!(
        "Done: {} watermarked, {} failed, {} skipped in {:.1}s",
        report.succeeded.len(),
        report.failed.len(),
        rejected,
        elapsed.num_milliseconds() as f64 / 1000.0
    );

    if report.failed.is_empty() && rejected == 0 {
        Ok(())
    } else {
        Err(format!("{} photo(s) not watermarked", report.failed.len() + rejected).into())
    }
}

async fn run_tray(inputs: Vec<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let mut tray = ImageTray::new();
    tray.add_all(&inputs);
    if tray.is_empty() {
        println!("No photos found");
        return Ok(());
    }

    for item in tray.intake().await? {
        match (&item.dimensions, &item.error) {
            (Some((width, height)), _) => println!(
                "  {}  {}x{}{}",
                item.display_name,
                width,
                height,
                item.camera
                    .as_deref()
                    .map(|c| format!("  [{}]", c))
                    .unwrap_or_default()
            ),
            (None, Some(error)) => println!("  {}  ERROR: {}", item.display_name, error),
            (None, None) => println!("  {}", item.display_name),
        }
    }
    Ok(())
}

fn handle_logo_command(
    paths: &DataPaths,
    cmd: LogoCommands,
) -> Result<(), Box<dyn std::error::Error>> {
    let library = WatermarkLibrary::open(&paths.watermark_directory)?;
    let mut config = MarkflowConfig::load(&paths.config_file)?;

    match cmd {
        LogoCommands::List => {
            let assets = library.list()?;
            if assets.is_empty() {
                println!("No watermarks in {}", library.directory().display());
            } else {
                println!("Watermarks in {}:", library.directory().display());
                for asset in assets {
                    let marker = if config.use_logo.as_deref() == Some(asset.name.as_str()) {
                        "*"
                    } else if config.alternate_logo.as_deref() == Some(asset.name.as_str()) {
                        "~"
                    } else {
                        " "
                    };
                    println!("  {} {}", marker, asset.name);
                }
            }
        }
        LogoCommands::Import { files } => {
            let report = library.import(&files);
            println!("{}", report.summary());
            if report.imported.is_empty() {
                return Err("No watermarks imported".into());
            }
        }
        LogoCommands::Rename { name, new_name } => {
            let asset = library.rename(&name, &new_name, &mut config, &paths.config_file)?;
            println!("Renamed '{}' to '{}'", name, asset.name);
        }
        LogoCommands::Delete { name } => {
            library.delete(&name, &config)?;
            println!("Deleted '{}'", name);
        }
        LogoCommands::Select { name } => {
            let asset = library.select(&name, &mut config, &paths.config_file)?;
            println!("Selected '{}'", asset.name);
        }
    }

    Ok(())
}

fn handle_config_command(
    paths: &DataPaths,
    cmd: ConfigCommands,
) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        ConfigCommands::Show => {
            let config = MarkflowConfig::load(&paths.config_file)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigCommands::Set { key, value } => {
            let mut config = MarkflowConfig::load(&paths.config_file)?;
            if let Err(e) = config.set(&key, &value) {
                eprintln!("Settable keys: {}", SETTABLE_KEYS.join(", "));
                return Err(e.into());
            }
            config.save(&paths.config_file)?;
            println!("Set {} = {}", key, value);
        }
        ConfigCommands::Path => {
            println!("{}", paths.config_file.display());
        }
    }
    Ok(())
}
