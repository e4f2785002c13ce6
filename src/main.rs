//! mdpress - Markdown editor core with live preview and PDF export
//!
//! Entry point for the command-line front end. Handles CLI argument parsing,
//! logging initialization, and drives the headless application.

use anyhow::{bail, Context};
use mdpress::config::CONFIG_FILE_NAME;
use mdpress::file_handler::{self, DocumentWatcher, FileCandidate, WatchEvent};
use mdpress::markdown::{first_heading, standalone_page, PageOptions};
use mdpress::message::{ExportMessage, FileMessage, Message};
use mdpress::{App, Config, Services};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::{self, UnboundedReceiver};

/// Application name for logging
const APP_NAME: &str = "mdpress";

/// What to do with the document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Export,
    Preview,
    Watch,
    Init,
}

/// Parsed command line
#[derive(Debug)]
struct Flags {
    command: Command,
    file: Option<PathBuf>,
    output: Option<PathBuf>,
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    init_logging();

    // Parse command line arguments
    let flags = parse_args();

    log::info!("Starting {} {}", APP_NAME, env!("CARGO_PKG_VERSION"));

    let file = match (flags.command, &flags.file) {
        (Command::Init, _) => return init_config(flags.config.as_deref()),
        (_, Some(file)) => file.clone(),
        (_, None) => bail!("A file is required"),
    };

    let mut config = match &flags.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("Could not load configuration")?;

    if flags.command == Command::Export {
        if let Some(dir) = &flags.output {
            config.export.output_dir = Some(dir.clone());
        }
    }

    let services = Services::from_config(&config).context("Could not start the preview pipeline")?;
    let (mut app, mut rx) = App::new(config, services);

    open_document(&mut app, &mut rx, &file).await?;

    match flags.command {
        Command::Export => export(&mut app, &mut rx).await,
        Command::Preview => {
            app.run_until(&mut rx, |app| app.state().preview.images_settled()).await;
            announce(&mut app);
            publish(&app, flags.output.as_deref()).await
        }
        Command::Watch => watch(&mut app, &mut rx, &file, flags.output.as_deref()).await,
        Command::Init => Ok(()),
    }
}

/// Write the default configuration where it will be picked up
fn init_config(path: Option<&Path>) -> anyhow::Result<()> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => Config::config_dir()?.join(CONFIG_FILE_NAME),
    };
    if path.exists() {
        bail!("{} already exists", path.display());
    }

    Config::default()
        .save_to(&path)
        .with_context(|| format!("Could not write {}", path.display()))?;
    println!("{}", path.display());
    Ok(())
}

/// Initialize the logging system
fn init_logging() {
    // Set default log level if not specified
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info,mdpress=debug");
    }

    env_logger::Builder::from_default_env()
        .format_timestamp_millis()
        .init();
}

/// Load `file` into the app and render it
async fn open_document(
    app: &mut App,
    rx: &mut UnboundedReceiver<Message>,
    file: &Path,
) -> anyhow::Result<()> {
    app.update(FileMessage::Open(FileCandidate::from_path(file)).into());
    app.run_until(rx, |app| app.state().has_unannounced()).await;
    announce(app);

    if app.state().document_path.is_none() {
        bail!("Could not open {}", file.display());
    }
    Ok(())
}

async fn export(app: &mut App, rx: &mut UnboundedReceiver<Message>) -> anyhow::Result<()> {
    app.update(ExportMessage::Start.into());
    app.run_until(rx, |app| !app.state().is_exporting()).await;
    announce(app);

    match &app.state().last_export {
        Some(path) => {
            println!("{}", path.display());
            Ok(())
        }
        None => bail!("Export failed"),
    }
}

/// Re-render on every change to the file until interrupted
async fn watch(
    app: &mut App,
    rx: &mut UnboundedReceiver<Message>,
    file: &Path,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let (watch_tx, mut watch_rx) = mpsc::unbounded_channel();
    let _watcher = DocumentWatcher::new(file, watch_tx)
        .with_context(|| format!("Could not watch {}", file.display()))?;

    let mut published = None;
    loop {
        let current = preview_version(app);
        if published != Some(current) {
            if let Err(e) = publish(app, output).await {
                log::error!("{:#}", e);
            }
            published = Some(current);
        }

        tokio::select! {
            Some(event) = watch_rx.recv() => match event {
                WatchEvent::Modified(path) => app.update(FileMessage::Changed(path).into()),
                WatchEvent::Removed(path) => log::warn!("{} was removed", path.display()),
                WatchEvent::Error(e) => log::error!("Watcher error: {}", e),
            },
            Some(message) = rx.recv() => app.update(message),
            _ = tokio::signal::ctrl_c() => {
                log::info!("Stopping watch");
                return Ok(());
            }
        }
        announce(app);
    }
}

/// Render cycle plus number of settled images
fn preview_version(app: &App) -> (u64, usize) {
    let preview = &app.state().preview;
    let settled = preview
        .images()
        .iter()
        .filter(|slot| slot.state.is_settled())
        .count();
    (preview.cycle(), settled)
}

/// Write the preview as a standalone page, or print the fragment
async fn publish(app: &App, output: Option<&Path>) -> anyhow::Result<()> {
    let body = app.state().preview.display_html();
    let Some(path) = output else {
        println!("{}", body);
        return Ok(());
    };

    let options = PageOptions {
        title: first_heading(&app.state().editor.text()).unwrap_or_else(|| document_title(app)),
        avoid_break_selectors: app.config().export.avoid_break_selectors.clone(),
    };
    let page = standalone_page(&body, &options);
    file_handler::write_file_atomic(path, page.as_bytes())
        .await
        .with_context(|| format!("Could not write {}", path.display()))?;

    log::info!("Wrote preview to {}", path.display());
    Ok(())
}

fn document_title(app: &App) -> String {
    app.state()
        .document_path
        .as_deref()
        .and_then(Path::file_stem)
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| PageOptions::default().title)
}

/// Print notifications raised since the last call
fn announce(app: &mut App) {
    for notification in app.take_announcements() {
        eprintln!("[{}] {}", notification.severity.label(), notification.message);
    }
}

/// Parse command line arguments
fn parse_args() -> Flags {
    let args: Vec<String> = std::env::args().collect();
    let mut command = None;
    let mut file = None;
    let mut output = None;
    let mut config = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-v" | "--version" => {
                print_version();
                std::process::exit(0);
            }
            "-o" | "--output" => {
                output = Some(PathBuf::from(option_value(&args, i, "--output")));
                i += 1;
            }
            "-c" | "--config" => {
                config = Some(PathBuf::from(option_value(&args, i, "--config")));
                i += 1;
            }
            arg if arg.starts_with('-') => {
                eprintln!("Unknown option: {}", arg);
                eprintln!("Use --help for usage information");
                std::process::exit(1);
            }
            arg if command.is_none() => {
                command = Some(match arg {
                    "export" => Command::Export,
                    "preview" => Command::Preview,
                    "watch" => Command::Watch,
                    "init" => Command::Init,
                    other => {
                        eprintln!("Unknown command: {}", other);
                        eprintln!("Use --help for usage information");
                        std::process::exit(1);
                    }
                });
            }
            arg if file.is_none() => file = Some(PathBuf::from(arg)),
            arg => {
                eprintln!("Unexpected argument: {}", arg);
                std::process::exit(1);
            }
        }
        i += 1;
    }

    match (command, file) {
        (Some(command), file) if file.is_some() || command == Command::Init => Flags {
            command,
            file,
            output,
            config,
        },
        _ => {
            eprintln!("Error: a command and a file are required");
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    }
}

fn option_value<'a>(args: &'a [String], i: usize, name: &str) -> &'a str {
    match args.get(i + 1) {
        Some(value) => value,
        None => {
            eprintln!("Error: {} requires a path argument", name);
            std::process::exit(1);
        }
    }
}

/// Print help message
fn print_help() {
    println!(
        r#"mdpress - Markdown preview and PDF export

USAGE:
    mdpress [OPTIONS] <COMMAND> <FILE>
    mdpress [-c PATH] init

COMMANDS:
    export      Render FILE and save it as a PDF
    preview     Render FILE to HTML once
    watch       Render FILE to HTML again whenever it changes
    init        Write the default configuration file

OPTIONS:
    -o, --output PATH   export: directory for the PDF
                        preview/watch: HTML page to write (default: stdout)
    -c, --config PATH   Use this configuration file (init: where to write it)
    -h, --help          Show this help message
    -v, --version       Show version information

EXAMPLES:
    mdpress export notes.md                 Write <first-heading>-<date>.pdf next to notes.md
    mdpress export notes.md -o ~/Documents  Write the PDF to ~/Documents instead
    mdpress preview notes.md -o notes.html  Write a standalone HTML page
    mdpress watch notes.md -o notes.html    Keep notes.html up to date

ENVIRONMENT:
    RUST_LOG            Log filter (default: info,mdpress=debug)
"#
    );
}

/// Print version information
fn print_version() {
    println!("{} {}", APP_NAME, env!("CARGO_PKG_VERSION"));
}
