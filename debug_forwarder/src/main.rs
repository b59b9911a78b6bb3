use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use eyre::{Context, Result};
use log::info;

use debug_forwarder::script::{replay, ScriptedHost};
use debug_forwarder::{
    ConfigSource, LiveSettings, Notifier, Options, Overrides, Settings, SettingsFile,
};

/// Replay a debugger session script through the debug data forwarder.
#[derive(Debug, Parser)]
#[command(name = "debug-forwarder", version, about)]
struct Cli {
    /// JSON settings file with `debugDataForwarder.*` keys
    #[arg(long, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Collector URL, overrides the settings file
    #[arg(long, value_name = "URL")]
    server_url: Option<String>,

    /// Start with forwarding disabled
    #[arg(long)]
    disabled: bool,

    /// Listen on the collector's event stream while replaying
    #[arg(long)]
    stream: bool,

    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,

    /// Script to replay, `-` for stdin
    #[arg(value_name = "SCRIPT", default_value = "-")]
    script: String,
}

/// Delivery warnings go straight to the terminal.
struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn show_warning(&self, message: &str) {
        eprintln!("warning: {message}");
    }
}

fn setup_logging(verbose: bool) {
    let mut builder = env_logger::Builder::new();

    if std::env::var("RUST_LOG").is_ok() {
        builder.parse_default_env();
    } else if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    } else {
        builder.filter_level(log::LevelFilter::Info);
    }

    builder.init();
}

fn open_script(script: &str) -> Result<Box<dyn BufRead>> {
    if script == "-" {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file = File::open(script).with_context(|| format!("Failed to open script {script}"))?;
    Ok(Box::new(BufReader::new(file)))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    /*
     * The settings file seeds the live settings that `configure` steps
     * update; command-line flags are pinned on top of both.
     */
    let initial = match cli.settings {
        Some(ref path) => SettingsFile::new(path).settings(),
        None => Settings::default(),
    };
    let live = Arc::new(LiveSettings::new(initial));

    let mut config = Overrides::new(live.clone());
    config.server_url = cli.server_url.clone();
    config.enabled = cli.disabled.then_some(false);
    let config: Arc<dyn ConfigSource> = Arc::new(config);

    info!("Forwarding to {}", config.settings().server_url);

    let host = Arc::new(ScriptedHost::new(live));
    let reader = open_script(&cli.script)?;

    let forwarder = debug_forwarder::start(
        host.clone(),
        Options {
            notifier: Arc::new(StderrNotifier),
            listen_stream: cli.stream,
            ..Options::new(config)
        },
    )
    .context("Failed to start the forwarder")?;

    /*
     * A script can outrun the collector by far: wait for queue room rather
     * than drop events, and drain the queue completely before exiting.
     */
    let stats = replay(reader, &host, &mut |event| forwarder.notify_blocking(event))
        .context("Script replay failed")?;

    if !forwarder.shutdown() {
        log::error!("Relay worker panicked; some records may not have been sent");
    }

    println!(
        "{} steps, {} events, {} errors",
        stats.steps, stats.events, stats.errors
    );
    Ok(())
}
