//! Copying the last output to the host clipboard.
//!
//! The platform write is behind [`ClipboardBackend`]. [`ClipboardBridge`]
//! adds the user-visible behavior: a "copied" acknowledgment that reverts by
//! itself after a dwell time, and an error message when the write fails.

pub mod command;

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::presenter::{CopyState, Presenter};

pub use command::CommandClipboard;

pub const COPY_FAILED_MESSAGE: &str = "Failed to copy to clipboard";

#[mockall::automock]
#[async_trait]
pub trait ClipboardBackend: Send + Sync {
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClipboardError {
    #[error("Clipboard unavailable: {message}")]
    Unavailable { message: String },
    #[error("Clipboard write failed: {message}")]
    WriteFailed { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum ClipboardOutcome {
    Copied,
    Failed,
}

pub struct ClipboardBridge {
    backend: Arc<dyn ClipboardBackend>,
    presenter: Arc<dyn Presenter>,
    dwell: Duration,
    // 最新のコピーだけが表示を戻せる
    generation: Arc<AtomicU64>,
}

impl ClipboardBridge {
    pub fn new(
        backend: Arc<dyn ClipboardBackend>,
        presenter: Arc<dyn Presenter>,
        dwell: Duration,
    ) -> Self {
        Self {
            backend,
            presenter,
            dwell,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Copies `text`. Empty text is a no-op and yields `None`.
    ///
    /// On success the presenter shows [`CopyState::Copied`] until the dwell
    /// time has passed since the most recent successful copy. On failure the
    /// copy state is left alone and the error channel is raised.
    pub async fn copy(&self, text: &str) -> Option<ClipboardOutcome> {
        if text.is_empty() {
            debug!("Nothing to copy");
            return None;
        }

        match self.backend.write_text(text).await {
            Ok(()) => {
                debug!("Copied {} bytes to clipboard", text.len());
                self.presenter.set_copy_state(CopyState::Copied);
                self.schedule_revert();
                Some(ClipboardOutcome::Copied)
            }
            Err(e) => {
                warn!("Clipboard write failed: {}", e);
                self.presenter.show_error(COPY_FAILED_MESSAGE);
                Some(ClipboardOutcome::Failed)
            }
        }
    }

    fn schedule_revert(&self) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let current = self.generation.clone();
        let presenter = self.presenter.clone();
        let dwell = self.dwell;
        tokio::spawn(async move {
            tokio::time::sleep(dwell).await;
            if current.load(Ordering::SeqCst) == generation {
                presenter.set_copy_state(CopyState::Neutral);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presenter::{MemoryPresenter, PresentationState};
    use tokio::time::sleep;

    const DWELL: Duration = Duration::from_millis(2000);

    fn bridge(backend: MockClipboardBackend) -> (ClipboardBridge, MemoryPresenter) {
        let presenter = MemoryPresenter::new();
        let bridge = ClipboardBridge::new(Arc::new(backend), Arc::new(presenter.clone()), DWELL);
        (bridge, presenter)
    }

    #[tokio::test]
    async fn test_empty_text_is_noop() {
        let mut backend = MockClipboardBackend::new();
        backend.expect_write_text().never();
        let (bridge, presenter) = bridge(backend);

        assert_eq!(bridge.copy("").await, None);
        assert_eq!(presenter.snapshot(), PresentationState::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_copied_reverts_after_dwell() {
        let mut backend = MockClipboardBackend::new();
        backend
            .expect_write_text()
            .withf(|text| text == "hello")
            .times(1)
            .returning(|_| Ok(()));
        let (bridge, presenter) = bridge(backend);

        assert_eq!(bridge.copy("hello").await, Some(ClipboardOutcome::Copied));
        assert_eq!(presenter.snapshot().copy_state, CopyState::Copied);

        sleep(Duration::from_millis(1999)).await;
        assert_eq!(presenter.snapshot().copy_state, CopyState::Copied);

        sleep(Duration::from_millis(2)).await;
        assert_eq!(presenter.snapshot().copy_state, CopyState::Neutral);
        assert_eq!(presenter.snapshot().error, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_copy_extends_acknowledgment() {
        let mut backend = MockClipboardBackend::new();
        backend.expect_write_text().times(2).returning(|_| Ok(()));
        let (bridge, presenter) = bridge(backend);

        bridge.copy("first").await;
        sleep(Duration::from_millis(1500)).await;
        bridge.copy("second").await;

        // 最初のタイマーは表示を戻さない
        sleep(Duration::from_millis(1000)).await;
        assert_eq!(presenter.snapshot().copy_state, CopyState::Copied);

        sleep(Duration::from_millis(1001)).await;
        assert_eq!(presenter.snapshot().copy_state, CopyState::Neutral);
    }

    #[tokio::test]
    async fn test_failure_shows_error_and_keeps_state() {
        let mut backend = MockClipboardBackend::new();
        backend.expect_write_text().times(1).returning(|_| {
            Err(ClipboardError::WriteFailed {
                message: "denied".to_string(),
            })
        });
        let (bridge, presenter) = bridge(backend);

        assert_eq!(bridge.copy("hello").await, Some(ClipboardOutcome::Failed));
        let snapshot = presenter.snapshot();
        assert_eq!(snapshot.error.as_deref(), Some(COPY_FAILED_MESSAGE));
        assert_eq!(snapshot.copy_state, CopyState::Neutral);
    }

    #[tokio::test]
    async fn test_failure_never_touches_copy_state() {
        let mut presenter = crate::presenter::MockPresenter::new();
        presenter.expect_set_copy_state().never();
        presenter
            .expect_show_error()
            .withf(|message| message == COPY_FAILED_MESSAGE)
            .times(1)
            .return_const(());

        let mut backend = MockClipboardBackend::new();
        backend.expect_write_text().returning(|_| {
            Err(ClipboardError::Unavailable {
                message: "no display".to_string(),
            })
        });
        let bridge = ClipboardBridge::new(Arc::new(backend), Arc::new(presenter), DWELL);
        bridge.copy("hello").await;
    }
}
