//! Document Translator CLI - translate DOCX and PDF files from the command line.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use doc_translator_core::{
    AppConfig, DocumentFormat, DocumentTranslator, Lang, RewriteControl, TextColor,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Debug, Clone, ValueEnum)]
enum ColorOption {
    Black,
    DarkRed,
    Blue,
}

impl From<ColorOption> for TextColor {
    fn from(opt: ColorOption) -> Self {
        match opt {
            ColorOption::Black => Self::black(),
            ColorOption::DarkRed => Self::dark_red(),
            ColorOption::Blue => Self::blue(),
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "doc-translate")]
#[command(author, version, about = "Translate DOCX and PDF documents", long_about = None)]
struct Args {
    /// Input document (.docx or .pdf)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: input-<target>.<ext>)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Source language code ("auto" to let the service detect it)
    #[arg(short = 's', long, default_value = "auto")]
    source: String,

    /// Target language code
    #[arg(short = 't', long, default_value = "es")]
    target: String,

    /// OpenAI-compatible API base URL
    #[arg(long, env = "OPENAI_API_BASE", default_value = "http://localhost:8080/v1")]
    api_base: String,

    /// API key, if the endpoint needs one
    #[arg(long, env = "OPENAI_API_KEY")]
    api_key: Option<String>,

    /// Model name for the OpenAI-compatible API
    #[arg(long, env = "OPENAI_MODEL", default_value = "default_model")]
    model: String,

    /// Overlay text color for PDF output
    #[arg(long, value_enum, default_value = "black")]
    color: ColorOption,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Disable caching
    #[arg(long)]
    no_cache: bool,

    /// Clear the on-disk translation cache and exit
    #[arg(long)]
    clear_cache: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let log_level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    if args.clear_cache {
        let count = doc_translator_core::clear_translation_cache()
            .map_err(|e| anyhow::anyhow!("Failed to clear cache: {e}"))?;
        #[allow(clippy::print_stdout)]
        {
            println!("Cleared {count} cached translations");
        }
        return Ok(());
    }

    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path).context("Failed to load config file")?
    } else {
        AppConfig::load()
    };

    // Override config with CLI arguments
    config.source_lang = Lang::new(&args.source);
    config.target_lang = Lang::new(&args.target);
    config.text_color = args.color.into();

    if args.no_cache {
        config.cache.memory_enabled = false;
        config.cache.disk_enabled = false;
    }

    config.translator =
        doc_translator_core::TranslatorConfig::new(args.api_base, args.api_key, args.model);

    let format = DocumentFormat::from_path(&args.input)
        .with_context(|| format!("Unsupported file type: {}", args.input.display()))?;

    info!("Loading {}: {}", format, args.input.display());
    let input_bytes = std::fs::read(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;

    // Magic bytes beat the extension when they disagree
    if let Some(detected) = DocumentFormat::detect(&input_bytes)
        && detected != format
    {
        anyhow::bail!(
            "File {} has a .{} extension but looks like {}",
            args.input.display(),
            format,
            detected
        );
    }

    let translator = DocumentTranslator::new(&config).context("Failed to initialize translator")?;

    let pb = ProgressBar::new(100);
    // Template is hardcoded and valid, unwrap is safe
    #[allow(clippy::unwrap_used)]
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% ({eta})")
            .unwrap()
            .progress_chars("#>-"),
    );

    let pb_progress = pb.clone();
    let ctrl = RewriteControl::new().on_progress(move |done, total| {
        let pct = if total == 0 {
            100
        } else {
            (done as u64 * 100 / total as u64).min(100)
        };
        pb_progress.set_position(pct);
    });

    let output_bytes = translator
        .translate(&input_bytes, format, &ctrl)
        .await
        .context("Translation failed")?;

    pb.finish_with_message("Translation complete");

    let output_path = args.output.unwrap_or_else(|| {
        let stem = args
            .input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("output");
        args.input
            .with_file_name(format!("{}-{}.{}", stem, args.target, format.extension()))
    });

    std::fs::write(&output_path, output_bytes)
        .with_context(|| format!("Failed to write output: {}", output_path.display()))?;

    // CLI output is intentional
    #[allow(clippy::print_stdout)]
    {
        println!("Translated document saved to: {}", output_path.display());
    }

    Ok(())
}
