use std::process::Stdio;

use async_trait::async_trait;
use tokio::{io::AsyncWriteExt, process::Command};

use super::{ClipboardBackend, ClipboardError};
use crate::config::ClipboardConfig;

/// Clipboard backed by a utility that takes the text on stdin
/// (`wl-copy`, `xclip -selection clipboard`, `pbcopy`, `clip`).
pub struct CommandClipboard {
    config: ClipboardConfig,
}

impl CommandClipboard {
    pub fn new(config: ClipboardConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ClipboardBackend for CommandClipboard {
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let mut child = Command::new(&self.config.program)
            .args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ClipboardError::Unavailable {
                message: format!("{}: {}", self.config.program, e),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .await
                .map_err(|e| ClipboardError::WriteFailed {
                    message: e.to_string(),
                })?;
            // stdin を閉じないと終わらないツールがある
            drop(stdin);
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ClipboardError::WriteFailed {
                message: e.to_string(),
            })?;
        if output.status.success() {
            Ok(())
        } else {
            Err(ClipboardError::WriteFailed {
                message: format!(
                    "{} exited with {}: {}",
                    self.config.program,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            })
        }
    }
}
