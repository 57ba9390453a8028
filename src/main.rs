//! Tooncast - A terminal webtoon reader.
//!
//! # Usage
//!
//! ```bash
//! tooncast series/manifest.json
//! tooncast --chapter 3 --page 12 series/manifest.json
//! tooncast --watch --ahead 8 series/manifest.json
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use tooncast::app::App;
use tooncast::config::{
    ConfigFlags, clear_config_flags, global_config_path, load_config_flags, local_override_path,
    parse_flag_tokens, save_config_flags, state_path,
};
use tooncast::perf;

/// A terminal webtoon reader with page preloading
#[derive(Parser, Debug)]
#[command(name = "tooncast", version, about, long_about = None)]
struct Cli {
    /// Series manifest (JSON) listing chapters and page images
    #[arg(value_name = "MANIFEST")]
    manifest: PathBuf,

    /// Chapter to open first (one-based)
    #[arg(short, long, default_value_t = 1)]
    chapter: usize,

    /// Page to start on (one-based)
    #[arg(short, long)]
    page: Option<usize>,

    /// Watch the manifest for changes and reload
    #[arg(short, long)]
    watch: bool,

    /// Pages after the current one to preload
    #[arg(long, value_name = "N")]
    ahead: Option<usize>,

    /// Pages before the current one to preload
    #[arg(long, value_name = "N")]
    behind: Option<usize>,

    /// Maximum simultaneous page loads
    #[arg(long, value_name = "N")]
    max_concurrent: Option<usize>,

    /// Decoded pages kept before eviction
    #[arg(long, value_name = "N")]
    cache_capacity: Option<usize>,

    /// Enable performance logging
    #[arg(long)]
    perf: bool,

    /// Write detailed layout/loader debug events to a file
    #[arg(long, value_name = "PATH")]
    render_debug_log: Option<PathBuf>,

    /// Save current command-line flags as defaults
    #[arg(long)]
    save: bool,

    /// Clear saved defaults
    #[arg(long)]
    clear: bool,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let raw_args = std::env::args().collect::<Vec<_>>();
    let cli = Cli::parse();
    let global_path = global_config_path();
    let local_path = local_override_path();
    let cli_flags = parse_flag_tokens(&raw_args);

    if cli.clear {
        clear_config_flags(&global_path)?;
    }
    if cli.save {
        save_config_flags(&global_path, &cli_flags)?;
    }

    let file_flags = if cli.clear {
        ConfigFlags::default()
    } else {
        let global_flags = load_config_flags(&global_path)?;
        let local_flags = load_config_flags(&local_path)?;
        global_flags.union(&local_flags)
    };
    let effective = file_flags.union(&cli_flags);

    perf::set_enabled(effective.perf);
    let render_debug_log_path = effective
        .render_debug_log
        .clone()
        .or_else(|| std::env::var_os("TOONCAST_RENDER_DEBUG_LOG").map(PathBuf::from));
    if let Err(err) = perf::set_debug_log_path(render_debug_log_path.as_deref()) {
        tracing::warn!(
            path = %render_debug_log_path
                .as_ref()
                .map_or_else(|| "<unset>".to_string(), |p| p.display().to_string()),
            %err,
            "failed to initialize render debug log"
        );
    }

    if !cli.manifest.exists() {
        anyhow::bail!("Manifest not found: {}", cli.manifest.display());
    }

    let mut app = App::new(cli.manifest)
        .with_chapter(cli.chapter.saturating_sub(1))
        .with_page(cli.page)
        .with_watch(effective.watch)
        .with_preload_config(effective.preload_config())
        .with_state_path(Some(state_path()));

    app.run().context("Application error")
}
