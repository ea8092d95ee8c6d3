//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use docmirror_core::pipeline::{MirrorConfig, ProgressReporter, run_mirror};
use docmirror_crawler::CancelToken;
use docmirror_shared::{
    CrawlConfig, MirrorSummary, RepairOptions, config_file_path, init_config, load_config,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use url::Url;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// docmirror — mirror documentation websites into Markdown trees.
#[derive(Parser)]
#[command(
    name = "docmirror",
    version,
    about = "Mirror a documentation website into a tree of clean Markdown files.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Mirror a documentation site into a local Markdown tree.
    Mirror {
        /// Root URL of the site to mirror.
        url: String,

        /// Output directory (defaults to the configured output_dir).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Maximum crawl depth (0 = unlimited).
        #[arg(short, long)]
        depth: Option<u32>,

        /// Delay between requests in milliseconds.
        #[arg(long)]
        delay: Option<u64>,

        /// URL or URL prefix to exclude (repeatable).
        #[arg(short, long = "exclude")]
        exclude: Vec<String>,

        /// Emit raw converter output, skipping content repairs.
        #[arg(long)]
        raw: bool,

        /// AI optimization level: minimal, standard, enhanced, token-optimized.
        #[arg(long)]
        ai_optimization: Option<String>,

        /// Keep consecutive blank lines instead of collapsing them.
        #[arg(long)]
        no_reduce_empty_lines: bool,

        /// Skip README/NAVIGATION page generation.
        #[arg(long)]
        no_readme: bool,

        /// Insert placeholder comments where code blocks appear to have
        /// lost their first line (heuristic).
        #[arg(long)]
        reconstruct_leading_lines: bool,

        /// Leave legacy [code] delimiters untouched.
        #[arg(long)]
        plain_code_blocks: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "docmirror=info",
        1 => "docmirror=debug",
        _ => "docmirror=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt().with_env_filter(env_filter).with_target(false).init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Mirror {
            url,
            output,
            depth,
            delay,
            exclude,
            raw,
            ai_optimization,
            no_reduce_empty_lines,
            no_readme,
            reconstruct_leading_lines,
            plain_code_blocks,
        } => {
            let flags = MirrorFlags {
                output,
                depth,
                delay,
                exclude,
                raw,
                ai_optimization,
                no_reduce_empty_lines,
                no_readme,
                reconstruct_leading_lines,
                plain_code_blocks,
            };
            cmd_mirror(&url, flags).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

/// Mirror flags bundled for merging against the config file.
struct MirrorFlags {
    output: Option<PathBuf>,
    depth: Option<u32>,
    delay: Option<u64>,
    exclude: Vec<String>,
    raw: bool,
    ai_optimization: Option<String>,
    no_reduce_empty_lines: bool,
    no_readme: bool,
    reconstruct_leading_lines: bool,
    plain_code_blocks: bool,
}

// ---------------------------------------------------------------------------
// mirror
// ---------------------------------------------------------------------------

async fn cmd_mirror(url: &str, flags: MirrorFlags) -> Result<()> {
    let config = load_config()?;

    let root_url = Url::parse(url).map_err(|e| eyre!("invalid URL '{url}': {e}"))?;

    // CLI flags override config file values.
    let mut crawl = CrawlConfig::from(&config);
    if let Some(depth) = flags.depth {
        crawl.max_depth = depth;
    }
    if let Some(delay) = flags.delay {
        crawl.delay_ms = delay;
    }
    crawl.exclude_urls.extend(flags.exclude);

    let mut repair = RepairOptions::from(&config.conversion);
    if flags.raw {
        repair.raw = true;
    }
    if let Some(level) = &flags.ai_optimization {
        repair.level = level
            .parse()
            .map_err(|e: docmirror_shared::DocMirrorError| eyre!(e))?;
    }
    if flags.no_reduce_empty_lines {
        repair.reduce_empty_lines = false;
    }
    if flags.reconstruct_leading_lines {
        repair.reconstruct_leading_lines = true;
    }
    if flags.plain_code_blocks {
        repair.force_fences = false;
    }

    let output_dir = flags
        .output
        .unwrap_or_else(|| PathBuf::from(&config.defaults.output_dir));

    let mirror_config = MirrorConfig {
        root_url,
        output_dir,
        crawl,
        repair,
        generate_readme: config.defaults.generate_readme && !flags.no_readme,
    };

    info!(url, out = %mirror_config.output_dir.display(), "starting mirror");

    // Ctrl-C requests a graceful stop between fetches.
    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let reporter = CliProgress::new();
    let start = std::time::Instant::now();
    let summary = run_mirror(&mirror_config, &cancel, &reporter).await?;

    let depth_display = if summary.crawl_depth == 0 {
        "unlimited".to_string()
    } else {
        summary.crawl_depth.to_string()
    };

    println!();
    println!("  Mirror complete!");
    println!("  Source:    {}", summary.root_url);
    println!("  Pages:     {}", summary.pages_fetched);
    println!("  Documents: {}", summary.documents_written);
    println!("  Depth:     {depth_display}");
    println!("  Output:    {}", mirror_config.output_dir.display());
    println!("  Time:      {:.1}s", start.elapsed().as_secs_f64());
    println!();

    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn page_converted(&self, path: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Converting [{current}/{total}] {path}"));
    }

    fn done(&self, _summary: &MirrorSummary) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Created config file: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config = load_config()?;
    let rendered = toml::to_string_pretty(&config)?;

    println!("# Config file: {}", config_file_path()?.display());
    println!("{rendered}");
    Ok(())
}
