//! # Formatting engine boundary
//!
//! The engine itself lives outside this crate. The playground only knows its
//! call contract, [`FormattingEngine`]:
//!
//! - an asynchronous `initialize` that resolves once the engine is usable,
//! - a `format` call taking the source text and a [`FormatterConfig`].
//!
//! `format` can go wrong in two different ways. The engine may answer with an
//! [`EngineReply`] whose `success` flag is false; that is a diagnostic about
//! the input. Or the call itself may break, returning an [`EngineFault`] (or
//! panicking); that is a defect. The orchestrator keeps the two apart.
//!
//! Readiness is owned by [`lifecycle::EngineLifecycle`].

pub mod lifecycle;
pub mod process;

use async_trait::async_trait;
use thiserror::Error;

use crate::formatter::FormatterConfig;

pub use lifecycle::{EngineLifecycle, EngineState};
pub use process::ProcessEngine;

#[mockall::automock]
#[async_trait]
pub trait FormattingEngine: Send + Sync {
    /// Resolves once the engine can accept `format` calls.
    async fn initialize(&self) -> Result<(), EngineFault>;

    async fn format(
        &self,
        source: &str,
        config: &FormatterConfig,
    ) -> Result<EngineReply, EngineFault>;
}

/// Structured answer of the engine. `output` is valid when `success` is
/// set, `error` otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineReply {
    pub success: bool,
    pub output: String,
    pub error: String,
}

impl EngineReply {
    pub fn success<S: Into<String>>(output: S) -> Self {
        Self {
            success: true,
            output: output.into(),
            error: String::new(),
        }
    }

    pub fn failure<S: Into<String>>(error: S) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: error.into(),
        }
    }
}

/// Unexpected failure of an engine call, as opposed to a diagnostic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct EngineFault {
    pub message: String,
}

impl EngineFault {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Failed to load formatter: {reason}")]
    Load { reason: String },
    #[error("Illegal engine state transition: {from} -> {to}")]
    IllegalTransition { from: String, to: String },
}
