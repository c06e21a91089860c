use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};
use tracing::{debug, error, info};

use super::{EngineError, FormattingEngine};
use crate::presenter::Presenter;

const STATE_CHANNEL_CAPACITY: usize = 16;

/// Load state of the formatting engine.
///
/// The only moves are `Unloaded -> Loading`, `Loading -> Ready` and
/// `Loading -> Failed`. `Ready` and `Failed` are terminal.
#[derive(Debug, Clone, PartialEq, Eq, Default, strum::Display)]
pub enum EngineState {
    #[default]
    Unloaded,
    Loading,
    Ready,
    Failed { reason: String },
}

impl EngineState {
    pub fn can_transition_to(&self, next: &EngineState) -> bool {
        matches!(
            (self, next),
            (EngineState::Unloaded, EngineState::Loading)
                | (EngineState::Loading, EngineState::Ready)
                | (EngineState::Loading, EngineState::Failed { .. })
        )
    }

    /// Returns the next state, or an error naming the rejected move.
    pub fn transition(&self, next: EngineState) -> Result<EngineState, EngineError> {
        if self.can_transition_to(&next) {
            Ok(next)
        } else {
            Err(EngineError::IllegalTransition {
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, EngineState::Ready | EngineState::Failed { .. })
    }
}

/// Owns [`EngineState`] for the whole process. Nothing else writes it.
pub struct EngineLifecycle {
    engine: Arc<dyn FormattingEngine>,
    presenter: Arc<dyn Presenter>,
    state: RwLock<EngineState>,
    state_tx: broadcast::Sender<EngineState>,
}

impl EngineLifecycle {
    pub fn new(engine: Arc<dyn FormattingEngine>, presenter: Arc<dyn Presenter>) -> Self {
        let (state_tx, _) = broadcast::channel(STATE_CHANNEL_CAPACITY);
        Self {
            engine,
            presenter,
            state: RwLock::new(EngineState::Unloaded),
            state_tx,
        }
    }

    pub async fn state(&self) -> EngineState {
        self.state.read().await.clone()
    }

    pub async fn is_ready(&self) -> bool {
        *self.state.read().await == EngineState::Ready
    }

    /// Every accepted transition is sent here, in order.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineState> {
        self.state_tx.subscribe()
    }

    /// Loads the engine. Meant to run once per process.
    ///
    /// A load failure is not an `Err`: it ends in [`EngineState::Failed`] and
    /// is reported through the presenter. `Err` means the lifecycle had
    /// already left `Unloaded`, in which case the engine is not touched.
    pub async fn initialize(&self) -> Result<EngineState, EngineError> {
        self.transition(EngineState::Loading).await?;
        self.presenter.set_format_enabled(false);
        self.presenter.set_loading(true);
        info!("Formatter engine loading");

        match self.engine.initialize().await {
            Ok(()) => {
                self.transition(EngineState::Ready).await?;
                self.presenter.set_loading(false);
                self.presenter.set_format_enabled(true);
                info!("Formatter engine ready");
            }
            Err(fault) => {
                let reason = fault.message;
                self.transition(EngineState::Failed {
                    reason: reason.clone(),
                })
                .await?;
                self.presenter.set_loading(false);
                let load_error = EngineError::Load { reason };
                error!("{}", load_error);
                self.presenter.show_error(&load_error.to_string());
            }
        }

        Ok(self.state().await)
    }

    async fn transition(&self, next: EngineState) -> Result<(), EngineError> {
        let mut state = self.state.write().await;
        let next = state.transition(next)?;
        debug!("Engine state: {} -> {}", *state, next);
        *state = next.clone();
        drop(state);
        // 購読者がいなくてもよい
        let _ = self.state_tx.send(next);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineFault, MockFormattingEngine};
    use crate::presenter::MemoryPresenter;

    fn lifecycle_with(engine: MockFormattingEngine) -> (EngineLifecycle, MemoryPresenter) {
        let presenter = MemoryPresenter::new();
        let lifecycle = EngineLifecycle::new(Arc::new(engine), Arc::new(presenter.clone()));
        (lifecycle, presenter)
    }

    #[test]
    fn test_transition_table() {
        let failed = EngineState::Failed {
            reason: "x".to_string(),
        };
        let all = [
            EngineState::Unloaded,
            EngineState::Loading,
            EngineState::Ready,
            failed.clone(),
        ];
        for from in &all {
            for to in &all {
                let allowed = matches!(
                    (from, to),
                    (EngineState::Unloaded, EngineState::Loading)
                        | (EngineState::Loading, EngineState::Ready)
                        | (EngineState::Loading, EngineState::Failed { .. })
                );
                assert_eq!(
                    from.transition(to.clone()).is_ok(),
                    allowed,
                    "{} -> {}",
                    from,
                    to
                );
            }
        }
        assert!(EngineState::Ready.is_terminal());
        assert!(failed.is_terminal());
        assert!(!EngineState::Loading.is_terminal());
    }

    #[test]
    fn test_illegal_transition_error() {
        let err = EngineState::Ready
            .transition(EngineState::Loading)
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::IllegalTransition {
                from: "Ready".to_string(),
                to: "Loading".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_initialize_success() {
        let mut engine = MockFormattingEngine::new();
        engine.expect_initialize().times(1).returning(|| Ok(()));
        let (lifecycle, presenter) = lifecycle_with(engine);
        let mut states = lifecycle.subscribe();

        assert_eq!(lifecycle.state().await, EngineState::Unloaded);
        assert!(!lifecycle.is_ready().await);

        let state = lifecycle.initialize().await.unwrap();
        assert_eq!(state, EngineState::Ready);
        assert!(lifecycle.is_ready().await);

        assert_eq!(states.recv().await.unwrap(), EngineState::Loading);
        assert_eq!(states.recv().await.unwrap(), EngineState::Ready);

        let snapshot = presenter.snapshot();
        assert!(!snapshot.loading);
        assert!(snapshot.format_enabled);
        assert_eq!(snapshot.error, None);
    }

    #[tokio::test]
    async fn test_initialize_failure() {
        let mut engine = MockFormattingEngine::new();
        engine
            .expect_initialize()
            .times(1)
            .returning(|| Err(EngineFault::new("module not found")));
        let (lifecycle, presenter) = lifecycle_with(engine);

        let state = lifecycle.initialize().await.unwrap();
        assert_eq!(
            state,
            EngineState::Failed {
                reason: "module not found".to_string()
            }
        );
        assert!(!lifecycle.is_ready().await);

        let snapshot = presenter.snapshot();
        assert!(!snapshot.loading);
        assert!(!snapshot.format_enabled);
        assert_eq!(
            snapshot.error.as_deref(),
            Some("Failed to load formatter: module not found")
        );
    }

    #[tokio::test]
    async fn test_initialize_runs_once() {
        let mut engine = MockFormattingEngine::new();
        engine.expect_initialize().times(1).returning(|| Ok(()));
        let (lifecycle, _presenter) = lifecycle_with(engine);

        lifecycle.initialize().await.unwrap();
        let err = lifecycle.initialize().await.unwrap_err();
        assert!(matches!(err, EngineError::IllegalTransition { .. }));
        assert_eq!(lifecycle.state().await, EngineState::Ready);
    }

    #[tokio::test]
    async fn test_loading_disables_formatting() {
        let mut presenter = crate::presenter::MockPresenter::new();
        let mut seq = mockall::Sequence::new();
        presenter
            .expect_set_format_enabled()
            .withf(|enabled| !*enabled)
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        presenter
            .expect_set_loading()
            .withf(|loading| *loading)
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        presenter
            .expect_set_loading()
            .withf(|loading| !*loading)
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        presenter
            .expect_set_format_enabled()
            .withf(|enabled| *enabled)
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());

        let mut engine = MockFormattingEngine::new();
        engine.expect_initialize().returning(|| Ok(()));
        let lifecycle = EngineLifecycle::new(Arc::new(engine), Arc::new(presenter));
        lifecycle.initialize().await.unwrap();
    }
}
