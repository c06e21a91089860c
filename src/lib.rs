//! # fmt-playground: orchestration layer for an external code formatter
//!
//! The playground sits between an editor surface and a formatting engine that
//! lives outside this crate. It collects the user's formatting options, runs
//! the engine on the current source and shows either the formatted text or a
//! diagnostic.
//!
//! ## Components
//!
//! Leaf-first:
//!
//! - Config building ([`formatter`]): raw option strings become a typed
//!   [`formatter::FormatterConfig`]. Never fails; bad input falls back to
//!   defaults.
//! - Engine lifecycle ([`engine::lifecycle`]): the `Unloaded → Loading →
//!   Ready | Failed` state machine that gates every format call.
//! - Format orchestration ([`orchestrator`]): one engine call per request,
//!   its outcome normalized to [`orchestrator::FormatResult`] and routed to
//!   the presenter.
//! - Clipboard ([`clipboard`]): copies the last output, with a transient
//!   acknowledgment.
//! - Dispatch ([`playground`]): a single command queue that runs every
//!   handler to completion, in order.
//!
//! The engine, the presentation surface and the clipboard are reached only
//! through the [`engine::FormattingEngine`], [`presenter::Presenter`] and
//! [`clipboard::ClipboardBackend`] traits.
//!
//! ## Flow
//!
//! ```text
//! startup ──▶ EngineLifecycle::initialize ──▶ Ready
//!                                               │
//! Format ──▶ build(RawOptions) ──▶ engine.format(source, config)
//!                                               │
//!                          Ok(output) ──▶ Presenter::set_output
//!                          Err(error) ──▶ Presenter::show_error
//! ```

pub mod clipboard;
pub mod config;
pub mod engine;
pub mod error;
pub mod formatter;
pub mod orchestrator;
pub mod playground;
pub mod presenter;

// Re-exports
pub use error::*;
pub use playground::{Command, KeyChord, Playground, PlaygroundEvent, PlaygroundHandle};
