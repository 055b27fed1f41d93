// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::{Path, PathBuf};

use yassa::app_config::{self, Config, SourceMode, TranslationProvider};
use yassa::file_utils::FileManager;
use yassa::formats::StyleTemplate;
use yassa::language_utils;
use yassa::providers::ffmpeg::FfmpegTool;
use yassa::providers::MediaTool;
use yassa::subtitle_matcher::{self, MatchOptions};
use yassa::timecode::TimeParseMode;
use yassa::{AssStyling, Controller, RunOutcome, SubtitleDocument, SubtitleFormat};

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    Deepl,
    Ollama,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::Deepl => TranslationProvider::DeepL,
            CliTranslationProvider::Ollama => TranslationProvider::Ollama,
        }
    }
}

/// CLI Wrapper for SourceMode to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliSourceMode {
    Auto,
    Transcribe,
    Embedded,
    External,
}

impl From<CliSourceMode> for SourceMode {
    fn from(cli_mode: CliSourceMode) -> Self {
        match cli_mode {
            CliSourceMode::Auto => SourceMode::Auto,
            CliSourceMode::Transcribe => SourceMode::Transcribe,
            CliSourceMode::Embedded => SourceMode::Embedded,
            CliSourceMode::External => SourceMode::External,
        }
    }
}

/// CLI Wrapper for SubtitleFormat to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliSubtitleFormat {
    Srt,
    Vtt,
    Ass,
}

impl From<CliSubtitleFormat> for SubtitleFormat {
    fn from(cli_format: CliSubtitleFormat) -> Self {
        match cli_format {
            CliSubtitleFormat::Srt => SubtitleFormat::Srt,
            CliSubtitleFormat::Vtt => SubtitleFormat::Vtt,
            CliSubtitleFormat::Ass => SubtitleFormat::Ass,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build translated, styled ASS subtitles for a video (or every video in a directory)
    Run(RunArgs),

    /// Convert a subtitle file to another format
    Convert(ConvertArgs),

    /// List external subtitle files matching a video, best first
    Match(MatchArgs),

    /// Show the first lines of a subtitle file
    Preview(PreviewArgs),

    /// List the subtitle streams embedded in a video
    Streams {
        /// Video file
        #[arg(value_name = "VIDEO")]
        video: PathBuf,
    },

    /// Generate shell completions for yassa
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Input video file or directory to process
    #[arg(value_name = "INPUT_PATH")]
    input_path: PathBuf,

    /// Where source subtitles come from
    #[arg(long, value_enum)]
    mode: Option<CliSourceMode>,

    /// Use this subtitle file as the source (implies external mode)
    #[arg(long, value_name = "FILE")]
    subtitle: Option<PathBuf>,

    /// Use this embedded stream index as the source (implies embedded mode)
    #[arg(long, value_name = "INDEX")]
    stream: Option<usize>,

    /// Source language code (e.g., 'ru', 'en')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language code (e.g., 'uk', 'en')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Translation provider to use
    #[arg(short, long, value_enum)]
    provider: Option<CliTranslationProvider>,

    /// Model name to use for translation (Ollama)
    #[arg(short, long)]
    model: Option<String>,

    /// Translation API key
    #[arg(long, env = "YASSA_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// ASS header template file
    #[arg(long, value_name = "FILE")]
    style: Option<PathBuf>,

    /// Output directory (defaults to the video's directory)
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,
}

#[derive(Parser, Debug)]
struct ConvertArgs {
    /// Subtitle file to convert
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output format
    #[arg(long, value_enum)]
    to: CliSubtitleFormat,

    /// Output file (defaults to the input with the new extension)
    #[arg(short, long, value_name = "OUT")]
    output: Option<PathBuf>,

    /// ASS header template file
    #[arg(long, value_name = "FILE")]
    style: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct MatchArgs {
    /// Video file
    #[arg(value_name = "VIDEO")]
    video: PathBuf,

    /// Additional directories to search
    #[arg(long = "dir", value_name = "DIR")]
    dirs: Vec<PathBuf>,

    /// Minimum filename score (0-1)
    #[arg(long)]
    min_score: Option<f64>,
}

#[derive(Parser, Debug)]
struct PreviewArgs {
    /// Subtitle file
    #[arg(value_name = "SUBTITLE")]
    subtitle: PathBuf,

    /// Number of lines to show
    #[arg(short = 'n', long, default_value_t = 5)]
    lines: usize,
}

/// YASSA - Yet Another Styled Subtitle Assembler
///
/// Converts subtitles between SRT, WebVTT and ASS, finds subtitle files for
/// videos, and assembles translated, styled ASS subtitles.
#[derive(Parser, Debug)]
#[command(name = "yassa")]
#[command(version)]
#[command(about = "Styled subtitle assembly and conversion")]
#[command(long_about = "YASSA finds or extracts subtitles for a video, translates them and writes a styled ASS file.

EXAMPLES:
    yassa run episode01.mkv                         # Full pipeline with conf.json
    yassa run -f -s ru -t uk episode01.mkv          # Force, explicit languages
    yassa run --mode transcribe episode01.mkv       # Speech recognition only
    yassa run /anime/season1/                       # Every video in a directory
    yassa convert episode01.srt --to ass            # SRT -> styled ASS
    yassa match episode01.mkv --dir ./subs          # Ranked external subtitles
    yassa preview episode01.ass -n 10               # First ten lines
    yassa streams episode01.mkv                     # Embedded subtitle streams
    yassa completions bash > yassa.bash             # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config. If the config file doesn't exist, `run` creates a
    default one.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "conf.json")]
    config: PathBuf,

    /// Set logging level
    #[arg(short, long, global = true, value_enum)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color and tag for a level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("\x1B[1;31m", "ERROR"),
            Level::Warn => ("\x1B[1;33m", "WARN "),
            Level::Info => ("\x1B[1;32m", "INFO "),
            Level::Debug => ("\x1B[1;36m", "DEBUG"),
            Level::Trace => ("\x1B[1;35m", "TRACE"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (color, tag) = Self::style_for_level(record.level());
            let _ = writeln!(std::io::stderr(), "{}{} {} {}\x1B[0m", color, now, tag, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Trace is the ceiling; the effective level is lowered with set_max_level
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();
    if let Some(level) = &cli.log_level {
        let level: app_config::LogLevel = level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "yassa", &mut std::io::stdout());
            Ok(())
        }
        Commands::Run(args) => {
            let config = load_config(&cli.config, true, cli.log_level.is_some())?;
            run_pipeline(args, config).await
        }
        Commands::Convert(args) => {
            let config = load_config(&cli.config, false, cli.log_level.is_some())?;
            convert(args, &config)
        }
        Commands::Match(args) => {
            let config = load_config(&cli.config, false, cli.log_level.is_some())?;
            list_matches(args, &config)
        }
        Commands::Preview(args) => preview(args),
        Commands::Streams { video } => {
            let config = load_config(&cli.config, false, cli.log_level.is_some())?;
            list_streams(&video, &config).await
        }
    }
}

/// Load the config file (creating it for `run`), falling back to defaults otherwise
fn load_config(path: &Path, create: bool, log_level_from_cli: bool) -> Result<Config> {
    let config = if create {
        Config::load_or_create(path)?
    } else if path.exists() {
        Config::load(path)?
    } else {
        Config::default()
    };

    if !log_level_from_cli {
        log::set_max_level(config.log_level.to_level_filter());
    }
    Ok(config)
}

async fn run_pipeline(args: RunArgs, mut config: Config) -> Result<()> {
    // Override config with CLI options if provided
    if let Some(mode) = args.mode {
        config.source.mode = mode.into();
    }
    if let Some(subtitle) = args.subtitle {
        config.source.subtitle_file = Some(subtitle);
        if args.mode.is_none() {
            config.source.mode = SourceMode::External;
        }
    }
    if let Some(stream) = args.stream {
        config.source.stream_index = Some(stream);
        if args.mode.is_none() {
            config.source.mode = SourceMode::Embedded;
        }
    }
    if let Some(source_language) = args.source_language {
        config.source_language = source_language;
    }
    if let Some(target_language) = args.target_language {
        config.target_language = target_language;
    }
    if let Some(provider) = args.provider {
        config.translation.provider = provider.into();
    }
    if let Some(model) = args.model {
        config.translation.model = model;
    }
    if let Some(api_key) = args.api_key {
        config.translation.api_key = api_key;
    }
    if let Some(style) = args.style {
        config.styling.template_path = Some(style);
    }

    config.validate().context("Configuration validation failed")?;

    let controller = Controller::with_config(config)?;
    let input_path = args.input_path;

    if input_path.is_dir() {
        controller
            .run_folder(&input_path, args.output_dir.as_deref(), args.force_overwrite)
            .await
    } else if input_path.is_file() {
        let output_dir = match args.output_dir {
            Some(dir) => dir,
            None => input_path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."))
                .to_path_buf(),
        };
        match controller.run(&input_path, &output_dir, args.force_overwrite).await? {
            RunOutcome::Written(path) => info!("Written: {}", path.display()),
            RunOutcome::Skipped(path) => info!("Unchanged: {}", path.display()),
        }
        Ok(())
    } else {
        Err(anyhow!("Input path does not exist: {:?}", input_path))
    }
}

fn convert(args: ConvertArgs, config: &Config) -> Result<()> {
    let target: SubtitleFormat = args.to.into();
    let mode = TimeParseMode::from_lenient_flag(config.codec.lenient_ass_time);
    let document = SubtitleDocument::parse_file(&args.input, mode)
        .with_context(|| format!("Failed to read {:?}", args.input))?;
    if document.is_empty() {
        warn!("{:?} contains no subtitle segments", args.input);
    }

    let output = args
        .output
        .unwrap_or_else(|| args.input.with_extension(target.extension()));
    if output == args.input {
        return Err(anyhow!("Refusing to overwrite the input file {:?}; pass --output", args.input));
    }

    let template = match args.style.as_ref().or(config.styling.template_path.as_ref()) {
        Some(path) => StyleTemplate::from_file(path)
            .with_context(|| format!("Failed to load style template {:?}", path))?,
        None => StyleTemplate::default(),
    };
    let styling = AssStyling::new(template, config.styling.rules());

    document
        .write_to_file(&output, target, &styling)
        .with_context(|| format!("Failed to write {:?}", output))?;
    info!("Converted {} segments: {}", document.len(), output.display());
    Ok(())
}

fn list_matches(args: MatchArgs, config: &Config) -> Result<()> {
    if !FileManager::file_exists(&args.video) {
        return Err(anyhow!("Video file does not exist: {:?}", args.video));
    }

    let mut search_dirs = Vec::new();
    if let Some(parent) = args.video.parent() {
        let parent = if parent.as_os_str().is_empty() { Path::new(".") } else { parent };
        search_dirs.push(parent.to_path_buf());
    }
    search_dirs.extend(config.source.search_dirs.iter().cloned());
    search_dirs.extend(args.dirs);

    let options = MatchOptions {
        min_score: args.min_score.unwrap_or(config.source.min_match_score),
        ..MatchOptions::default()
    };
    let candidates = subtitle_matcher::find_external_subtitles(&args.video, &search_dirs, &options);
    if candidates.is_empty() {
        warn!("No matching subtitle files found");
        return Ok(());
    }

    for candidate in &candidates {
        println!(
            "{:.2}  {:<8} {:<4} {:>9}  {}",
            candidate.match_score,
            language_utils::language_name(candidate.language),
            candidate.format,
            candidate.size,
            candidate.path.display()
        );
    }
    Ok(())
}

fn preview(args: PreviewArgs) -> Result<()> {
    let lines = subtitle_matcher::get_subtitle_preview(&args.subtitle, args.lines)
        .with_context(|| format!("Failed to preview {:?}", args.subtitle))?;
    for line in lines {
        println!("{}", line);
    }
    Ok(())
}

async fn list_streams(video: &Path, config: &Config) -> Result<()> {
    let tool = FfmpegTool::new(
        config.media.ffmpeg_path.clone(),
        config.media.ffprobe_path.clone(),
        config.media.timeout_secs,
    );
    let streams = tool
        .list_subtitle_streams(video)
        .await
        .with_context(|| format!("Failed to list subtitle streams of {:?}", video))?;
    if streams.is_empty() {
        warn!("No subtitle streams found in {:?}", video);
        return Ok(());
    }

    for stream in &streams {
        println!(
            "#{:<3} {:<18} {:<6} {}{}",
            stream.index,
            stream.codec_name,
            stream.language.as_deref().unwrap_or("und"),
            stream.title.as_deref().unwrap_or(""),
            if stream.is_bitmap() { " (bitmap)" } else { "" }
        );
    }
    Ok(())
}
