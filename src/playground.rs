//! # Playground dispatcher
//!
//! Everything the user does reaches the playground as a [`Command`] sent
//! through a [`PlaygroundHandle`]. [`Playground::run`] takes commands off a
//! single queue and handles each one to completion before the next, so
//! handlers never race each other:
//!
//! ```text
//! ┌──────────┐  Command   ┌────────────┐   ┌──────────────────┐
//! │ Handle   │──────────▶│ Playground │──▶│ FormatOrchestrator│──▶ Presenter
//! └──────────┘            │  (queue)   │   └──────────────────┘
//!       ▲                 │            │──▶ ClipboardBridge ─────▶ Presenter
//!       │ PlaygroundEvent └────────────┘
//!       └──────────────────────┘
//! ```
//!
//! Engine initialization runs as its own task and reports back through the
//! same queue with [`Command::EngineSettled`]. Format requests that arrive
//! before that are answered with [`FormatError::NotReady`].
//!
//! [`FormatError::NotReady`]: crate::formatter::FormatError::NotReady

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio_stream::{wrappers::ReceiverStream, StreamExt};
use tracing::{debug, info, warn};

use crate::{
    clipboard::{ClipboardBackend, ClipboardBridge, ClipboardOutcome},
    config::PlaygroundConfig,
    engine::{EngineLifecycle, EngineState, FormattingEngine},
    error::PlaygroundError,
    formatter::{
        self,
        preview::{if_style_preview, tuple_style_preview},
        OptionField, PreviewKind, RawOptions,
    },
    orchestrator::{FormatOrchestrator, FormatResult},
    presenter::Presenter,
    InternalResult,
};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// A key press on the editor, with its modifiers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyChord {
    pub ctrl: bool,
    pub meta: bool,
    pub key: String,
}

impl KeyChord {
    pub fn new<S: Into<String>>(key: S) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    pub fn with_ctrl(self) -> Self {
        Self { ctrl: true, ..self }
    }

    pub fn with_meta(self) -> Self {
        Self { meta: true, ..self }
    }

    /// Ctrl+Enter or Meta+Enter
    pub fn triggers_format(&self) -> bool {
        (self.ctrl || self.meta) && self.key == "Enter"
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetSource(String),
    SetOption(OptionField, String),
    Format,
    Copy,
    Key(KeyChord),
    /// Sent by the initialization task once loading has finished
    EngineSettled(EngineState),
    Shutdown,
}

/// What happened while handling a command.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaygroundEvent {
    EngineSettled(EngineState),
    Formatted(FormatResult),
    /// `None` when there was nothing to copy
    Copied(Option<ClipboardOutcome>),
    OptionChanged(OptionField),
    Stopped,
}

#[derive(Clone)]
pub struct PlaygroundHandle {
    command_tx: mpsc::Sender<Command>,
    event_tx: broadcast::Sender<PlaygroundEvent>,
}

impl PlaygroundHandle {
    pub async fn send(&self, command: Command) -> Result<(), PlaygroundError> {
        self.command_tx
            .send(command)
            .await
            .map_err(|e| PlaygroundError::SendFailed {
                message: e.to_string(),
            })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlaygroundEvent> {
        self.event_tx.subscribe()
    }

    pub async fn set_source<S: Into<String>>(&self, source: S) -> Result<(), PlaygroundError> {
        self.send(Command::SetSource(source.into())).await
    }

    pub async fn set_option<S: Into<String>>(
        &self,
        field: OptionField,
        value: S,
    ) -> Result<(), PlaygroundError> {
        self.send(Command::SetOption(field, value.into())).await
    }

    pub async fn format(&self) -> Result<(), PlaygroundError> {
        self.send(Command::Format).await
    }

    pub async fn copy(&self) -> Result<(), PlaygroundError> {
        self.send(Command::Copy).await
    }

    pub async fn key(&self, chord: KeyChord) -> Result<(), PlaygroundError> {
        self.send(Command::Key(chord)).await
    }

    pub async fn shutdown(&self) -> Result<(), PlaygroundError> {
        self.send(Command::Shutdown).await
    }
}

pub struct Playground {
    config: PlaygroundConfig,
    lifecycle: Arc<EngineLifecycle>,
    orchestrator: FormatOrchestrator,
    clipboard: ClipboardBridge,
    presenter: Arc<dyn Presenter>,
    source: String,
    command_tx: mpsc::Sender<Command>,
    command_rx: mpsc::Receiver<Command>,
    event_tx: broadcast::Sender<PlaygroundEvent>,
}

impl Playground {
    pub fn new(
        config: PlaygroundConfig,
        engine: Arc<dyn FormattingEngine>,
        clipboard: Arc<dyn ClipboardBackend>,
        presenter: Arc<dyn Presenter>,
    ) -> Self {
        let lifecycle = Arc::new(EngineLifecycle::new(engine.clone(), presenter.clone()));
        let orchestrator = FormatOrchestrator::new(lifecycle.clone(), engine, presenter.clone());
        let clipboard = ClipboardBridge::new(clipboard, presenter.clone(), config.copy_ack_dwell);
        let (command_tx, command_rx) = mpsc::channel(config.event_buffer_size.max(1));
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            config,
            lifecycle,
            orchestrator,
            clipboard,
            presenter,
            source: String::new(),
            command_tx,
            command_rx,
            event_tx,
        }
    }

    pub fn with_source<S: Into<String>>(self, source: S) -> Self {
        Self {
            source: source.into(),
            ..self
        }
    }

    pub fn with_options(self, options: RawOptions) -> Self {
        Self {
            orchestrator: self.orchestrator.with_options(options),
            ..self
        }
    }

    pub fn handle(&self) -> PlaygroundHandle {
        PlaygroundHandle {
            command_tx: self.command_tx.clone(),
            event_tx: self.event_tx.clone(),
        }
    }

    /// Starts engine initialization and processes commands until
    /// [`Command::Shutdown`] or until every handle is gone.
    pub async fn run(self) -> InternalResult<()> {
        let Playground {
            config,
            lifecycle,
            orchestrator,
            clipboard,
            presenter,
            source,
            command_tx,
            command_rx,
            event_tx,
        } = self;

        let mut dispatcher = Dispatcher {
            config,
            orchestrator,
            clipboard,
            presenter,
            source,
            event_tx,
        };
        dispatcher.show_previews().await;

        // 初期化は別タスクで。完了はキュー経由で戻ってくる
        tokio::spawn(async move {
            let state = match lifecycle.initialize().await {
                Ok(state) => state,
                Err(e) => {
                    warn!("Engine initialization skipped: {}", e);
                    lifecycle.state().await
                }
            };
            if let Err(e) = command_tx.send(Command::EngineSettled(state)).await {
                debug!("Playground gone before engine settled: {}", e);
            }
        });

        let mut commands = ReceiverStream::new(command_rx);
        info!("Playground started");
        while let Some(command) = commands.next().await {
            debug!("Command received: {:?}", command);
            if command == Command::Shutdown {
                break;
            }
            dispatcher.handle(command).await;
        }

        dispatcher.publish(PlaygroundEvent::Stopped);
        info!("Playground stopped");
        Ok(())
    }
}

/// State owned by the running loop.
struct Dispatcher {
    config: PlaygroundConfig,
    orchestrator: FormatOrchestrator,
    clipboard: ClipboardBridge,
    presenter: Arc<dyn Presenter>,
    source: String,
    event_tx: broadcast::Sender<PlaygroundEvent>,
}

impl Dispatcher {
    async fn handle(&mut self, command: Command) {
        match command {
            Command::SetSource(source) => {
                self.source = source;
            }
            Command::SetOption(field, value) => {
                self.orchestrator.set_option(field, value).await;
                if matches!(field, OptionField::IfStyle | OptionField::TupleStyle) {
                    self.show_previews().await;
                }
                self.publish(PlaygroundEvent::OptionChanged(field));
                if self.config.format_on_option_change {
                    self.format().await;
                }
            }
            Command::Format => self.format().await,
            Command::Key(chord) => {
                if chord.triggers_format() {
                    self.format().await;
                }
            }
            Command::Copy => {
                let output = self.orchestrator.last_output().await;
                let outcome = self.clipboard.copy(&output).await;
                self.publish(PlaygroundEvent::Copied(outcome));
            }
            Command::EngineSettled(state) => {
                info!("Engine settled: {}", state);
                let ready = state == EngineState::Ready;
                self.publish(PlaygroundEvent::EngineSettled(state));
                if ready && self.config.format_on_ready {
                    self.format().await;
                }
            }
            Command::Shutdown => {}
        }
    }

    async fn format(&mut self) {
        let result = self.orchestrator.format(&self.source).await;
        self.publish(PlaygroundEvent::Formatted(result));
    }

    async fn show_previews(&self) {
        let config = formatter::build(&self.orchestrator.options().await);
        self.presenter
            .show_preview(PreviewKind::IfStyle, if_style_preview(config.if_style()));
        self.presenter.show_preview(
            PreviewKind::TupleStyle,
            tuple_style_preview(config.tuple_style()),
        );
    }

    fn publish(&self, event: PlaygroundEvent) {
        // 購読者がいない場合は捨てる
        let _ = self.event_tx.send(event);
    }
}
