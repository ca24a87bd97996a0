use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use lyric_bridge_catalog::{CatalogService, HttpCatalog, MetadataMatcher};
use lyric_bridge_core::time::{format_lrc_tag, format_time};
use lyric_bridge_core::{lrc, AppConfig, SourceKind};
use lyric_bridge_engine::{
    export_document, write_export, Monitor, MonitorConfig, MonitorExit, PipelineEvent,
};
use lyric_bridge_source::{build_log_source, LogSource};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "lyric-bridge",
    about = "Device now-playing log -> catalog match -> synced lyrics"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Follow the device log and print lyrics as they become active.
    Run {
        /// Read reports from stdin instead of the configured source.
        #[arg(long)]
        stdin: bool,
        /// Replay reports from a captured log file.
        #[arg(long, conflicts_with = "stdin")]
        file: Option<PathBuf>,
    },
    /// Look up the catalog match for a title.
    Search {
        title: String,
        #[arg(long, default_value = "")]
        artist: String,
    },
    /// Print the timed lyrics of a catalog song.
    Lyrics { song_id: u64 },
    /// Match a title and write its lyrics as an .lrc file.
    Export {
        title: String,
        #[arg(long, default_value = "")]
        artist: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    Doctor,
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Write a default config file.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cmd = cli.command.unwrap_or(Commands::Run {
        stdin: false,
        file: None,
    });
    let cfg_path = cli.config.unwrap_or_else(default_config_path);

    match cmd {
        Commands::Config {
            action: ConfigAction::Init { force },
        } => {
            init_config(&cfg_path, force)?;
            println!("Initialized config at {}", cfg_path.display());
            Ok(())
        }
        Commands::Run { stdin, file } => {
            let mut cfg = load_and_init_logging(&cfg_path)?;
            if stdin {
                cfg.source.kind = SourceKind::Stdin;
            } else if let Some(path) = file {
                cfg.source.kind = SourceKind::File;
                cfg.source.path = Some(path.display().to_string());
            }
            run(cfg).await
        }
        Commands::Search { title, artist } => {
            let cfg = load_and_init_logging(&cfg_path)?;
            search(&cfg, &title, &artist).await
        }
        Commands::Lyrics { song_id } => {
            let cfg = load_and_init_logging(&cfg_path)?;
            lyrics(&cfg, song_id).await
        }
        Commands::Export { title, artist, out } => {
            let cfg = load_and_init_logging(&cfg_path)?;
            export(&cfg, &title, &artist, out).await
        }
        Commands::Doctor => {
            let cfg = load_and_init_logging(&cfg_path)?;
            doctor(&cfg, &cfg_path).await
        }
    }
}

fn load_and_init_logging(path: &Path) -> Result<AppConfig> {
    let cfg = load_or_default(path)?;
    init_logging(&cfg.log_level);
    Ok(cfg)
}

async fn run(cfg: AppConfig) -> Result<()> {
    let catalog = Arc::new(HttpCatalog::new(&cfg.catalog).context("failed to build catalog client")?);
    let source = build_log_source(&cfg.source)
        .await
        .context("failed to open log source")?;
    let (monitor, handle) = Monitor::new(catalog, MonitorConfig::from_app_config(&cfg));

    info!(
        catalog = %cfg.catalog.base_url,
        source = source.name(),
        "lyric-bridge started"
    );

    let mut events = handle.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => print_event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event printer fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut monitor_task = tokio::spawn(monitor.run(source));
    let exit = tokio::select! {
        res = &mut monitor_task => res.context("monitor task failed")?,
        _ = tokio::signal::ctrl_c() => {
            info!("received ctrl-c; shutting down");
            handle.stop();
            monitor_task.await.context("monitor task failed")?
        }
    };
    let _ = printer.await;

    match exit {
        MonitorExit::SourceFailed(reason) => bail!("log source failed: {reason}"),
        MonitorExit::StreamEnded | MonitorExit::Stopped => Ok(()),
    }
}

fn print_event(event: &PipelineEvent) {
    match event {
        PipelineEvent::TrackChanged { key, state } => {
            println!("== {key} [{}]", format_time(state.position_ms));
        }
        PipelineEvent::MatchResolved { candidate, .. } => {
            println!(
                "   matched: {} - {} ({})",
                candidate.name,
                candidate.artist_names(),
                format_time(candidate.duration_ms)
            );
        }
        PipelineEvent::MatchFailed { error, .. } => println!("   {error}"),
        PipelineEvent::LyricsLoaded {
            lines,
            has_translation,
            ..
        } => {
            let suffix = if *has_translation { ", translated" } else { "" };
            println!("   {lines} lyric lines{suffix}");
        }
        PipelineEvent::ActiveLineChanged {
            line: Some(line), ..
        } => println!("{}", line.display_text()),
        PipelineEvent::Idle => println!("== idle"),
        PipelineEvent::ActiveLineChanged { line: None, .. }
        | PipelineEvent::PlaybackUpdated { .. }
        | PipelineEvent::Recovered(_) => {}
    }
}

async fn search(cfg: &AppConfig, title: &str, artist: &str) -> Result<()> {
    let catalog = Arc::new(HttpCatalog::new(&cfg.catalog)?);
    let matcher = MetadataMatcher::new(catalog);
    match matcher.search(title, artist).await? {
        Some(outcome) => {
            let c = &outcome.candidate;
            println!("keyword: {}", outcome.keyword);
            println!("rule: {:?}", outcome.rule);
            println!("id: {}", c.id);
            println!("song: {} - {}", c.name, c.artist_names());
            if let Some(album) = c.album_name() {
                println!("album: {album}");
            }
            println!("duration: {}", format_time(c.duration_ms));
        }
        None => println!("no match for '{title}'"),
    }
    Ok(())
}

async fn lyrics(cfg: &AppConfig, song_id: u64) -> Result<()> {
    let catalog = HttpCatalog::new(&cfg.catalog)?;
    let payload = catalog
        .lyric(song_id)
        .await
        .with_context(|| format!("failed to fetch lyrics for song {song_id}"))?;
    let doc = lrc::from_payload(&payload, cfg.matching.translation_tolerance_secs);
    if doc.is_empty() {
        println!("no timed lyrics for song {song_id}");
        return Ok(());
    }
    for line in doc.lines() {
        let text = line.display_text().replace('\n', " / ");
        println!("[{}] {}", format_lrc_tag(line.time_seconds), text);
    }
    Ok(())
}

async fn export(cfg: &AppConfig, title: &str, artist: &str, out: Option<PathBuf>) -> Result<()> {
    let catalog = Arc::new(HttpCatalog::new(&cfg.catalog)?);
    let matcher = MetadataMatcher::new(catalog.clone());
    let Some(outcome) = matcher.search(title, artist).await? else {
        bail!("no catalog match for '{title}'");
    };

    let payload = catalog
        .lyric(outcome.candidate.id)
        .await
        .with_context(|| format!("failed to fetch lyrics for song {}", outcome.candidate.id))?;
    let doc = lrc::from_payload(&payload, cfg.matching.translation_tolerance_secs);
    if doc.is_empty() {
        bail!("song {} has no timed lyrics", outcome.candidate.id);
    }

    let export = export_document(&outcome.candidate, &doc, cfg.export.include_translation);
    let dir = out
        .or_else(|| cfg.export.output_dir.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."));
    let path = write_export(&dir, &export)
        .await
        .with_context(|| format!("failed to write export into {}", dir.display()))?;
    println!("Exported {}", path.display());
    Ok(())
}

async fn doctor(cfg: &AppConfig, cfg_path: &Path) -> Result<()> {
    println!("== lyric-bridge doctor ==");
    println!(
        "Config: {} ({})",
        cfg_path.display(),
        if cfg_path.exists() { "found" } else { "defaults" }
    );

    let catalog = HttpCatalog::new(&cfg.catalog)?;
    match catalog.ping().await {
        Ok(()) => println!("Catalog {}: reachable", catalog.base_url()),
        Err(err) => println!("Catalog {}: not reachable ({err})", catalog.base_url()),
    }

    match cfg.source.kind {
        SourceKind::Command => {
            let program = cfg.source.command.first().map(String::as_str).unwrap_or("");
            println!("Source command: {}", cfg.source.command.join(" "));
            println!(
                "Source program '{program}': {}",
                if program_on_path(program) {
                    "found"
                } else {
                    "not found on PATH"
                }
            );
        }
        SourceKind::Stdin => println!("Source: stdin"),
        SourceKind::File => match cfg.source.path.as_deref() {
            Some(path) if Path::new(path).exists() => println!("Source file: {path}"),
            Some(path) => println!("Source file: {path} (missing)"),
            None => println!("Source file: <not configured>"),
        },
    }

    Ok(())
}

fn program_on_path(program: &str) -> bool {
    if program.is_empty() {
        return false;
    }
    if program.contains(std::path::MAIN_SEPARATOR) {
        return Path::new(program).exists();
    }
    let Some(paths) = std::env::var_os("PATH") else {
        return false;
    };
    std::env::split_paths(&paths).any(|dir| {
        let candidate = dir.join(program);
        candidate.exists() || candidate.with_extension("exe").exists()
    })
}

const CONFIG_PATH_ENV: &str = "LYRIC_BRIDGE_CONFIG";

fn default_config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }
    let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("lyric-bridge").join("config.toml")
}

/// Writes the default config. An existing file is kept unless `force` is set.
fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "config file {} already exists; pass --force to overwrite it",
            path.display()
        );
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    let toml = toml::to_string_pretty(&AppConfig::default())?;
    std::fs::write(path, toml)
        .with_context(|| format!("failed to write config file {}", path.display()))?;
    Ok(())
}

fn load_or_default(path: &Path) -> Result<AppConfig> {
    load_with_env(path, |key| std::env::var(key).ok())
}

fn load_with_env(path: &Path, env: impl Fn(&str) -> Option<String>) -> Result<AppConfig> {
    let mut cfg = if !path.exists() {
        AppConfig::default()
    } else {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&data).with_context(|| format!("failed to parse {}", path.display()))?
    };
    apply_env_overrides(&mut cfg, env);
    if cfg.source.kind == SourceKind::Command && cfg.source.command.is_empty() {
        bail!("source kind 'command' needs a non-empty `command` in {}", path.display());
    }
    Ok(cfg)
}

fn init_logging(log_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_new(log_level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // Logs go to stderr; stdout carries lyrics.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(true)
        .try_init();
}

fn apply_env_overrides(cfg: &mut AppConfig, env: impl Fn(&str) -> Option<String>) {
    if let Some(v) = env("LYRIC_BRIDGE_CATALOG_URL").filter(|v| !v.trim().is_empty()) {
        cfg.catalog.base_url = v.trim().to_string();
    }
    if let Some(v) = env("LYRIC_BRIDGE_LOG_LEVEL").filter(|v| !v.trim().is_empty()) {
        cfg.log_level = v;
    }
    if let Some(v) = env("LYRIC_BRIDGE_SOURCE_COMMAND") {
        let argv: Vec<String> = v.split_whitespace().map(str::to_string).collect();
        if !argv.is_empty() {
            cfg.source.kind = SourceKind::Command;
            cfg.source.command = argv;
        }
    }
}
