use clap::Parser;
use fmt_playground::{
    clipboard::{ClipboardError, ClipboardOutcome, CommandClipboard, COPY_FAILED_MESSAGE},
    config::PlaygroundConfig,
    engine::{EngineError, EngineState, ProcessEngine},
    formatter::RawOptions,
    presenter::MemoryPresenter,
    Error, Playground, PlaygroundError, PlaygroundEvent, PlaygroundHandle,
};
use std::{
    io::{self, Read, Write},
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Format a source file through an external formatter engine
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input file. Reads stdin when omitted
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Formatter executable, overrides the config file
    #[arg(short, long)]
    engine: Option<String>,

    /// Argument passed to the formatter executable (repeatable)
    #[arg(long = "engine-arg", allow_hyphen_values = true)]
    engine_args: Vec<String>,

    /// Argument of the readiness probe (repeatable). With --engine the probe
    /// runs with exactly these arguments
    #[arg(long = "probe-arg", allow_hyphen_values = true)]
    probe_args: Vec<String>,

    /// Write output to file instead of stdout
    #[arg(short, long, value_name = "FILE", conflicts_with = "in_place")]
    output: Option<PathBuf>,

    /// Modify the input file in place
    #[arg(short, long, requires = "input")]
    in_place: bool,

    /// Check if the input is already formatted (exit with 1 if not)
    #[arg(long, conflicts_with_all = ["output", "in_place", "copy"])]
    check: bool,

    /// Spaces per indent level
    #[arg(long)]
    indentation: Option<String>,

    /// Conditional layout: indented or hanging
    #[arg(long)]
    if_style: Option<String>,

    /// Tuple layout: spaced or compact
    #[arg(long)]
    tuple_style: Option<String>,

    /// Blank lines between top-level declarations
    #[arg(long)]
    newlines_between_decls: Option<String>,

    /// Copy the formatted output to the clipboard
    #[arg(long)]
    copy: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn read_input(path: Option<&Path>) -> Result<String, Error> {
    match path {
        Some(path) => std::fs::read_to_string(path).map_err(|e| {
            Error::internal(format!("Failed to read file {}: {}", path.display(), e))
        }),
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|e| Error::internal(format!("Failed to read from stdin: {}", e)))?;
            Ok(buffer)
        }
    }
}

async fn wait_for<T>(
    events: &mut broadcast::Receiver<PlaygroundEvent>,
    mut pick: impl FnMut(PlaygroundEvent) -> Option<T>,
) -> Result<T, Error> {
    loop {
        match events.recv().await {
            Ok(PlaygroundEvent::Stopped) => {
                return Err(Error::internal("Playground stopped unexpectedly"))
            }
            Ok(event) => {
                if let Some(value) = pick(event) {
                    return Ok(value);
                }
            }
            Err(broadcast::error::RecvError::Lagged(count)) => {
                warn!("Skipped {} playground events", count);
            }
            Err(broadcast::error::RecvError::Closed) => {
                return Err(Error::internal("Playground event channel closed"))
            }
        }
    }
}

async fn drive(
    handle: &PlaygroundHandle,
    events: &mut broadcast::Receiver<PlaygroundEvent>,
    copy: bool,
) -> Result<String, Error> {
    let state = wait_for(events, |event| match event {
        PlaygroundEvent::EngineSettled(state) => Some(state),
        _ => None,
    })
    .await?;
    if let EngineState::Failed { reason } = state {
        return Err(EngineError::Load { reason }.into());
    }

    handle.format().await?;
    let output = wait_for(events, |event| match event {
        PlaygroundEvent::Formatted(result) => Some(result),
        _ => None,
    })
    .await??;

    if copy {
        handle.copy().await?;
        let outcome = wait_for(events, |event| match event {
            PlaygroundEvent::Copied(outcome) => Some(outcome),
            _ => None,
        })
        .await?;
        match outcome {
            Some(ClipboardOutcome::Copied) => info!("Output copied to clipboard"),
            Some(ClipboardOutcome::Failed) => {
                return Err(ClipboardError::WriteFailed {
                    message: COPY_FAILED_MESSAGE.to_string(),
                }
                .into())
            }
            None => debug!("Nothing to copy"),
        }
    }
    Ok(output)
}

/// What the CLI did with the formatted text.
#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    Printed,
    Written(PathBuf),
    Checked { changed: bool },
}

fn write_file(path: &Path, content: &str) -> Result<(), Error> {
    std::fs::write(path, content)
        .map_err(|e| Error::internal(format!("Failed to write file {}: {}", path.display(), e)))
}

async fn run(cli: &Cli) -> Result<Outcome, Error> {
    let mut config = match &cli.config {
        Some(path) => PlaygroundConfig::from_file(path)?,
        None => PlaygroundConfig::default(),
    };
    if let Some(engine) = &cli.engine {
        config.engine.program = engine.clone();
    }
    if !cli.engine_args.is_empty() {
        config.engine.args = cli.engine_args.clone();
    }
    // 別のエンジンに --version が通じるとは限らない
    if cli.engine.is_some() || !cli.probe_args.is_empty() {
        config.engine.probe_args = cli.probe_args.clone();
    }
    // 一回だけ明示的にフォーマットする
    config.format_on_ready = false;
    config.format_on_option_change = false;

    info!("config loaded.");
    debug!("config: {:?}", config);

    let source = read_input(cli.input.as_deref())?;
    let formatted = format_source(cli, config, source.clone()).await?;

    if cli.check {
        return Ok(Outcome::Checked {
            changed: formatted != source,
        });
    }
    let target = if cli.in_place {
        cli.input.clone()
    } else {
        cli.output.clone()
    };
    match target {
        Some(path) => {
            write_file(&path, &formatted)?;
            info!("Formatted output written to {}", path.display());
            Ok(Outcome::Written(path))
        }
        None => {
            io::stdout()
                .write_all(formatted.as_bytes())
                .map_err(|e| Error::internal(format!("Failed to write to stdout: {}", e)))?;
            Ok(Outcome::Printed)
        }
    }
}

async fn format_source(
    cli: &Cli,
    config: PlaygroundConfig,
    source: String,
) -> Result<String, Error> {
    let options = RawOptions {
        indentation: cli.indentation.clone(),
        if_style: cli.if_style.clone(),
        tuple_style: cli.tuple_style.clone(),
        newlines_between_decls: cli.newlines_between_decls.clone(),
    };

    let presenter = MemoryPresenter::new();
    let playground = Playground::new(
        config.clone(),
        Arc::new(ProcessEngine::new(config.engine.clone())),
        Arc::new(CommandClipboard::new(config.clipboard.clone())),
        Arc::new(presenter.clone()),
    )
    .with_source(source)
    .with_options(options);

    let handle = playground.handle();
    let mut events = handle.subscribe();
    let task = tokio::spawn(playground.run());

    let outcome = drive(&handle, &mut events, cli.copy).await;

    if let Err(e) = handle.shutdown().await {
        debug!("Shutdown not delivered: {}", e);
    }
    task.await.map_err(|e| PlaygroundError::JoinFailed {
        message: e.to_string(),
    })??;

    outcome
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    match run(&cli).await {
        Ok(Outcome::Checked { changed: true }) => {
            eprintln!("File would be reformatted");
            std::process::exit(1);
        }
        Ok(outcome) => debug!("Done: {:?}", outcome),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
