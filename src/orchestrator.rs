use std::{any::Any, panic::AssertUnwindSafe, sync::Arc};

use futures::FutureExt;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    engine::{EngineLifecycle, FormattingEngine},
    formatter::{self, error::NOT_READY_MESSAGE, FormatError, OptionField, RawOptions},
    presenter::Presenter,
};

/// `Ok` carries the formatted text, `Err` why there is none.
pub type FormatResult = Result<String, FormatError>;

/// Runs single format requests against the engine and routes the outcome to
/// the presenter.
pub struct FormatOrchestrator {
    lifecycle: Arc<EngineLifecycle>,
    engine: Arc<dyn FormattingEngine>,
    presenter: Arc<dyn Presenter>,
    options: RwLock<RawOptions>,
    last_output: RwLock<String>,
}

impl FormatOrchestrator {
    pub fn new(
        lifecycle: Arc<EngineLifecycle>,
        engine: Arc<dyn FormattingEngine>,
        presenter: Arc<dyn Presenter>,
    ) -> Self {
        Self {
            lifecycle,
            engine,
            presenter,
            options: RwLock::new(RawOptions::default()),
            last_output: RwLock::new(String::new()),
        }
    }

    pub fn with_options(self, options: RawOptions) -> Self {
        Self {
            options: RwLock::new(options),
            ..self
        }
    }

    pub async fn set_option(&self, field: OptionField, value: impl Into<String>) {
        self.options.write().await.set(field, value);
    }

    pub async fn options(&self) -> RawOptions {
        self.options.read().await.clone()
    }

    /// Output currently on display, empty after a failure.
    pub async fn last_output(&self) -> String {
        self.last_output.read().await.clone()
    }

    /// Formats `source` with a config built from the current options.
    ///
    /// Blank input clears the output without touching the engine, whatever
    /// the engine state. Otherwise the engine must be ready; if it is not,
    /// only the error channel is raised.
    pub async fn format(&self, source: &str) -> FormatResult {
        let request_id = Uuid::new_v4();

        if source.trim().is_empty() {
            debug!("[{}] Empty source, clearing output", request_id);
            self.presenter.hide_error();
            self.presenter.clear_output();
            self.last_output.write().await.clear();
            return Ok(String::new());
        }

        if !self.lifecycle.is_ready().await {
            debug!("[{}] Format requested before engine is ready", request_id);
            self.presenter.show_error(NOT_READY_MESSAGE);
            return Err(FormatError::NotReady);
        }

        let config = formatter::build(&*self.options.read().await);
        debug!(
            "[{}] Formatting {} bytes with {:?}",
            request_id,
            source.len(),
            config
        );

        let call = AssertUnwindSafe(self.engine.format(source, &config))
            .catch_unwind()
            .await;
        let result = match call {
            Ok(Ok(reply)) if reply.success => Ok(reply.output),
            Ok(Ok(reply)) => Err(FormatError::diagnostic(reply.error)),
            Ok(Err(fault)) => Err(FormatError::defect(fault.message)),
            Err(payload) => Err(FormatError::defect(panic_message(payload.as_ref()))),
        };

        match &result {
            Ok(output) => {
                debug!("[{}] Formatted into {} bytes", request_id, output.len());
                self.presenter.hide_error();
                self.presenter.set_output(output);
                *self.last_output.write().await = output.clone();
            }
            Err(e) => {
                warn!("[{}] Format failed: {:?}", request_id, e);
                self.presenter.clear_output();
                self.presenter.show_error(&e.to_string());
                self.last_output.write().await.clear();
            }
        }
        result
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineFault, EngineReply, MockFormattingEngine};
    use crate::formatter::{error::DEFECT_FALLBACK_MESSAGE, IfStyle, TupleStyle};
    use crate::presenter::MemoryPresenter;
    use pretty_assertions::assert_eq;

    async fn orchestrator(
        mut engine: MockFormattingEngine,
        ready: bool,
    ) -> (FormatOrchestrator, MemoryPresenter) {
        engine.expect_initialize().returning(|| Ok(()));
        let engine: Arc<dyn FormattingEngine> = Arc::new(engine);
        let presenter = MemoryPresenter::new();
        let lifecycle = Arc::new(EngineLifecycle::new(
            engine.clone(),
            Arc::new(presenter.clone()),
        ));
        if ready {
            lifecycle.initialize().await.unwrap();
        }
        let orchestrator =
            FormatOrchestrator::new(lifecycle, engine, Arc::new(presenter.clone()));
        (orchestrator, presenter)
    }

    fn engine_returning(reply: Result<EngineReply, EngineFault>) -> MockFormattingEngine {
        let mut engine = MockFormattingEngine::new();
        engine
            .expect_format()
            .times(1)
            .returning(move |_, _| reply.clone());
        engine
    }

    #[tokio::test]
    async fn test_not_ready_never_calls_engine() {
        let mut engine = MockFormattingEngine::new();
        engine.expect_format().never();
        let (orchestrator, presenter) = orchestrator(engine, false).await;

        let result = orchestrator.format("main = 1").await;
        assert_eq!(result, Err(FormatError::NotReady));
        assert_eq!(
            presenter.snapshot().error.as_deref(),
            Some("formatter is still loading")
        );
    }

    #[tokio::test]
    async fn test_blank_source_clears_output_in_any_state() {
        for ready in [false, true] {
            let mut engine = MockFormattingEngine::new();
            engine.expect_format().never();
            let (orchestrator, presenter) = orchestrator(engine, ready).await;
            presenter.set_output("stale");
            presenter.show_error("stale error");

            for source in ["", "   ", "\n\t "] {
                assert_eq!(orchestrator.format(source).await, Ok(String::new()));
                let snapshot = presenter.snapshot();
                assert_eq!(snapshot.output, "");
                assert_eq!(snapshot.error, None);
            }
        }
    }

    #[tokio::test]
    async fn test_success_sets_output() {
        let engine = engine_returning(Ok(EngineReply::success("X")));
        let (orchestrator, presenter) = orchestrator(engine, true).await;
        presenter.show_error("previous");

        assert_eq!(orchestrator.format("anything").await, Ok("X".to_string()));
        let snapshot = presenter.snapshot();
        assert_eq!(snapshot.output, "X");
        assert_eq!(snapshot.error, None);
        assert_eq!(orchestrator.last_output().await, "X");
    }

    #[tokio::test]
    async fn test_diagnostic_is_verbatim() {
        let engine = engine_returning(Ok(EngineReply::failure("bad token")));
        let (orchestrator, presenter) = orchestrator(engine, true).await;
        presenter.set_output("previous output");

        assert_eq!(
            orchestrator.format("main =").await,
            Err(FormatError::Diagnostic("bad token".to_string()))
        );
        let snapshot = presenter.snapshot();
        assert_eq!(snapshot.error.as_deref(), Some("bad token"));
        assert_eq!(snapshot.output, "");
        assert_eq!(orchestrator.last_output().await, "");
    }

    #[tokio::test]
    async fn test_fault_is_defect() {
        let engine = engine_returning(Err(EngineFault::new("boom")));
        let (orchestrator, presenter) = orchestrator(engine, true).await;

        let result = orchestrator.format("main = 1").await;
        assert_eq!(result, Err(FormatError::Defect("boom".to_string())));
        assert!(presenter.snapshot().error.unwrap().contains("boom"));
    }

    #[tokio::test]
    async fn test_blank_fault_uses_fallback() {
        let engine = engine_returning(Err(EngineFault::new("")));
        let (orchestrator, presenter) = orchestrator(engine, true).await;

        orchestrator.format("main = 1").await.unwrap_err();
        assert_eq!(
            presenter.snapshot().error.as_deref(),
            Some(DEFECT_FALLBACK_MESSAGE)
        );
    }

    struct PanickingEngine;

    #[async_trait::async_trait]
    impl FormattingEngine for PanickingEngine {
        async fn initialize(&self) -> Result<(), EngineFault> {
            Ok(())
        }

        async fn format(
            &self,
            _source: &str,
            _config: &crate::formatter::FormatterConfig,
        ) -> Result<EngineReply, EngineFault> {
            panic!("boom")
        }
    }

    #[tokio::test]
    async fn test_panic_is_defect() {
        let engine: Arc<dyn FormattingEngine> = Arc::new(PanickingEngine);
        let presenter = MemoryPresenter::new();
        let lifecycle = Arc::new(EngineLifecycle::new(
            engine.clone(),
            Arc::new(presenter.clone()),
        ));
        lifecycle.initialize().await.unwrap();
        let orchestrator =
            FormatOrchestrator::new(lifecycle, engine, Arc::new(presenter.clone()));
        presenter.set_output("previous output");

        let result = orchestrator.format("main = 1").await;
        assert!(matches!(result, Err(FormatError::Defect(ref m)) if m.contains("boom")));
        assert!(presenter.snapshot().error.unwrap().contains("boom"));
        assert_eq!(presenter.snapshot().output, "");
    }

    #[tokio::test]
    async fn test_config_comes_from_current_options() {
        let mut engine = MockFormattingEngine::new();
        engine
            .expect_format()
            .withf(|source, config| {
                source == "main = 1"
                    && config.indentation() == 4
                    && config.if_style() == IfStyle::Hanging
                    && config.tuple_style() == TupleStyle::Spaced
                    && config.newlines_between_decls() == 2
            })
            .times(1)
            .returning(|source, _| Ok(EngineReply::success(source)));
        let (orchestrator, _presenter) = orchestrator(engine, true).await;

        orchestrator.set_option(OptionField::Indentation, "4").await;
        orchestrator.set_option(OptionField::IfStyle, "hanging").await;
        orchestrator.set_option(OptionField::TupleStyle, "round").await;
        orchestrator
            .set_option(OptionField::NewlinesBetweenDecls, "lots")
            .await;

        assert_eq!(
            orchestrator.format("main = 1").await,
            Ok("main = 1".to_string())
        );
        assert_eq!(
            orchestrator.options().await.get(OptionField::TupleStyle),
            Some("round")
        );
    }

    #[tokio::test]
    async fn test_channels_stay_exclusive() {
        let mut engine = MockFormattingEngine::new();
        let mut seq = mockall::Sequence::new();
        engine
            .expect_format()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(EngineReply::success("ok")));
        engine
            .expect_format()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(EngineReply::failure("nope")));
        engine
            .expect_format()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(EngineReply::success("again")));
        let (orchestrator, presenter) = orchestrator(engine, true).await;

        for expected_output in ["ok", "", "again"] {
            let _ = orchestrator.format("src").await;
            let snapshot = presenter.snapshot();
            assert_eq!(snapshot.output, expected_output);
            // 出力とエラーが同時に出ることはない
            assert_eq!(snapshot.error.is_some(), expected_output.is_empty());
        }
    }
}
