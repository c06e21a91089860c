use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use tracing::debug;

use crate::formatter::PreviewKind;

/// Acknowledgment shown on the copy trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display)]
pub enum CopyState {
    #[default]
    Neutral,
    Copied,
}

/// The user-facing surface the playground drives.
///
/// Output and error are two separate channels; callers keep at most one of
/// them active at a time.
#[mockall::automock]
pub trait Presenter: Send + Sync {
    fn set_output(&self, output: &str);
    fn clear_output(&self);
    fn show_error(&self, message: &str);
    fn hide_error(&self);
    fn set_loading(&self, loading: bool);
    fn set_format_enabled(&self, enabled: bool);
    fn set_copy_state(&self, state: CopyState);
    fn show_preview(&self, kind: PreviewKind, text: &str);
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PresentationState {
    pub output: String,
    pub error: Option<String>,
    pub loading: bool,
    pub format_enabled: bool,
    pub copy_state: CopyState,
    pub previews: HashMap<PreviewKind, String>,
}

/// Presenter that only records what it was told. Backs the CLI and tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryPresenter {
    state: Arc<Mutex<PresentationState>>,
}

impl MemoryPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> PresentationState {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, PresentationState> {
        // 記録だけなので poison されても中身はそのまま使う
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Presenter for MemoryPresenter {
    fn set_output(&self, output: &str) {
        self.lock().output = output.to_string();
    }

    fn clear_output(&self) {
        self.lock().output.clear();
    }

    fn show_error(&self, message: &str) {
        debug!("error shown: {}", message);
        self.lock().error = Some(message.to_string());
    }

    fn hide_error(&self) {
        self.lock().error = None;
    }

    fn set_loading(&self, loading: bool) {
        self.lock().loading = loading;
    }

    fn set_format_enabled(&self, enabled: bool) {
        self.lock().format_enabled = enabled;
    }

    fn set_copy_state(&self, state: CopyState) {
        self.lock().copy_state = state;
    }

    fn show_preview(&self, kind: PreviewKind, text: &str) {
        self.lock().previews.insert(kind, text.to_string());
    }
}
