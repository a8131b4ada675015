use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use voter_roll_extract::config::{Config, ExtractConfig, ServeConfig};
use voter_roll_extract::engines::EngineRegistry;
use voter_roll_extract::extract::{ExtractOptions, RollExtractor, Segmentation};
use voter_roll_extract::layout::{LineSpacing, TemplateSet};
use voter_roll_extract::output::{self, LayoutChoice, OutputFormat};
use voter_roll_extract::preprocessing::Preset;
use voter_roll_extract::rasterize::{PageRange, PageSource};
use voter_roll_extract::server;

#[derive(Parser, Debug)]
#[command(name = "voter-roll-extract")]
#[command(about = "Extract voter records from scanned voter-roll PDFs")]
#[command(version)]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    /// Path to tessdata directory (uses TESSDATA_PREFIX env var if not set)
    #[arg(long, global = true, env = "TESSDATA_PREFIX")]
    pub tessdata_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Extract the records of one document into a CSV or JSON table
    Extract(ExtractArgs),
    /// Run the HTTP extraction service
    Serve(ServeArgs),
    /// Print the known templates as JSON
    Templates {
        /// JSON file with additional templates
        #[arg(long)]
        template_file: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Scanned PDF, page image, or directory of page images
    pub input: PathBuf,

    /// Output table path
    #[arg(short, long)]
    pub output: PathBuf,

    /// Page template name
    #[arg(long, default_value = "ward-roll")]
    pub template: String,

    /// JSON file with additional templates
    #[arg(long)]
    pub template_file: Option<PathBuf>,

    /// OCR engine (ocrs, leptess)
    #[arg(long)]
    pub engine: Option<String>,

    /// Rendering resolution the template geometry is measured at
    #[arg(long, default_value_t = 300)]
    pub dpi: u32,

    /// First page to process (1-based)
    #[arg(long)]
    pub first_page: Option<usize>,

    /// Last page to process (inclusive)
    #[arg(long)]
    pub last_page: Option<usize>,

    /// Preprocessing preset (none, minimal, default, enhanced, aggressive)
    #[arg(long, default_value = "default")]
    pub preset: Preset,

    /// Cut pages into whole columns or individual cards
    #[arg(long, default_value = "columns")]
    pub segmentation: Segmentation,

    /// CSV columns (full, regional, auto)
    #[arg(long, default_value = "auto")]
    pub layout: LayoutChoice,

    /// Output format (csv, json)
    #[arg(long, default_value = "csv")]
    pub format: OutputFormat,

    /// Skip columns that fail instead of aborting the run
    #[arg(long)]
    pub isolate_columns: bool,

    /// Save reconstructed column images and OCR text here
    #[arg(long)]
    pub debug_dir: Option<PathBuf>,

    /// Blank rows between reconstructed lines
    #[arg(long, default_value_t = 12)]
    pub spacing: u32,

    /// Rows of context kept above and below each line
    #[arg(long, default_value_t = 10)]
    pub line_padding: u32,

    /// Ink runs closer than this many rows are one line
    #[arg(long, default_value_t = 10)]
    pub min_gap: u32,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Host address to bind to
    #[arg(long, env = "ROLL_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "ROLL_PORT", default_value = "9393")]
    pub port: u16,

    /// Maximum upload size in bytes (default: 100MiB)
    #[arg(long, env = "ROLL_MAX_FILE_SIZE", default_value = "104857600")]
    pub max_file_size: usize,

    /// JSON file with additional templates
    #[arg(long)]
    pub template_file: Option<PathBuf>,

    /// Default OCR engine
    #[arg(long)]
    pub engine: Option<String>,
}

impl ExtractArgs {
    fn into_config(self) -> anyhow::Result<ExtractConfig> {
        Ok(ExtractConfig {
            input: self.input,
            output: self.output,
            template: self.template,
            template_file: self.template_file,
            dpi: self.dpi,
            layout: self.layout,
            format: self.format,
            options: ExtractOptions {
                pages: PageRange::new(self.first_page, self.last_page)?,
                preset: self.preset,
                line_spacing: LineSpacing {
                    spacing: self.spacing,
                    line_padding: self.line_padding,
                    min_gap: self.min_gap,
                },
                segmentation: self.segmentation,
                isolate_columns: self.isolate_columns,
                debug_dir: self.debug_dir,
            },
        })
    }
}

impl From<ServeArgs> for ServeConfig {
    fn from(args: ServeArgs) -> Self {
        Self {
            host: args.host,
            port: args.port,
            max_file_size: args.max_file_size,
            template_file: args.template_file,
        }
    }
}

fn load_templates(template_file: Option<&PathBuf>) -> anyhow::Result<TemplateSet> {
    let mut templates = TemplateSet::builtin();
    if let Some(path) = template_file {
        templates.load_file(path)?;
    }
    Ok(templates)
}

fn run_extract(config: ExtractConfig, engine_config: Config) -> anyhow::Result<()> {
    let templates = load_templates(config.template_file.as_ref())?;
    let template = templates.get(&config.template)?.clone();
    let layout = config.layout.resolve(&template);

    let engines = EngineRegistry::new(&engine_config)?;
    let engine = engines.resolve(engine_config.engine.as_deref())?;

    let source = PageSource::open(&config.input, config.dpi)?;
    let report = RollExtractor::new(template, engine, config.options)?.run(&source)?;

    for warning in &report.warnings {
        tracing::warn!("{}", warning);
    }
    output::write_file(&config.output, &report.records, layout, config.format)?;

    tracing::info!(
        "Done: {} records from {} pages written to {:?}",
        report.records.len(),
        report.pages_processed,
        config.output
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("voter-roll-extract v{}", env!("CARGO_PKG_VERSION"));

    let mut engine_config = Config {
        engine: None,
        tessdata_path: cli.tessdata_path,
    };

    match cli.command {
        Command::Extract(args) => {
            engine_config.engine = args.engine.clone();
            let config = args.into_config()?;
            tokio::task::spawn_blocking(move || run_extract(config, engine_config)).await?
        }
        Command::Serve(args) => {
            engine_config.engine = args.engine.clone();
            let config = ServeConfig::from(args);
            tracing::info!("Binding to {}:{}", config.host, config.port);
            server::run(config, engine_config).await
        }
        Command::Templates { template_file } => {
            let templates = load_templates(template_file.as_ref())?;
            let all: Vec<_> = templates.iter().collect();
            println!("{}", serde_json::to_string_pretty(&all)?);
            Ok(())
        }
    }
}
