use std::process::Stdio;

use async_trait::async_trait;
use tokio::{io::AsyncWriteExt, process::Command};
use tracing::debug;

use super::{EngineFault, EngineReply, FormattingEngine};
use crate::{config::EngineConfig, formatter::FormatterConfig};

/// Environment variable carrying the JSON-encoded [`FormatterConfig`].
pub const CONFIG_ENV_VAR: &str = "FMT_PLAYGROUND_CONFIG";

/// Engine backed by an external formatter executable.
///
/// The source goes in on stdin and the config in [`CONFIG_ENV_VAR`]. Exit
/// status 0 means success with the formatted text on stdout; any other
/// status is a diagnostic read from stderr.
pub struct ProcessEngine {
    config: EngineConfig,
}

impl ProcessEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    fn command(&self, args: &[String]) -> Command {
        let mut command = Command::new(&self.config.program);
        command.args(args).kill_on_drop(true);
        command
    }
}

#[async_trait]
impl FormattingEngine for ProcessEngine {
    async fn initialize(&self) -> Result<(), EngineFault> {
        debug!(
            "Probing formatter: {} {:?}",
            self.config.program, self.config.probe_args
        );
        let output = self
            .command(&self.config.probe_args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| EngineFault::new(format!("{}: {}", self.config.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(EngineFault::new(if stderr.is_empty() {
                format!("{} exited with {}", self.config.program, output.status)
            } else {
                stderr
            }));
        }
        debug!(
            "Formatter probe ok: {}",
            String::from_utf8_lossy(&output.stdout).trim()
        );
        Ok(())
    }

    async fn format(
        &self,
        source: &str,
        config: &FormatterConfig,
    ) -> Result<EngineReply, EngineFault> {
        let config_json = serde_json::to_string(config)
            .map_err(|e| EngineFault::new(format!("Failed to encode config: {}", e)))?;

        let mut child = self
            .command(&self.config.args)
            .env(CONFIG_ENV_VAR, config_json)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| EngineFault::new(format!("{}: {}", self.config.program, e)))?;

        // stdout を読みながら書き込まないと大きな入力で詰まる
        let writer = child.stdin.take().map(|mut stdin| {
            let input = source.as_bytes().to_vec();
            tokio::spawn(async move { stdin.write_all(&input).await })
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| EngineFault::new(format!("Failed to run formatter: {}", e)))?;

        if let Some(writer) = writer {
            match writer.await {
                Ok(Ok(())) => {}
                // the engine may legitimately exit without reading everything
                Ok(Err(e)) => debug!("Formatter stdin closed early: {}", e),
                Err(e) => return Err(EngineFault::new(format!("Input writer failed: {}", e))),
            }
        }

        if output.status.success() {
            let formatted = String::from_utf8(output.stdout).map_err(|e| {
                EngineFault::new(format!("Formatter produced invalid UTF-8: {}", e))
            })?;
            Ok(EngineReply::success(formatted))
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            Ok(EngineReply::failure(if stderr.is_empty() {
                format!("formatter exited with {}", output.status)
            } else {
                stderr
            }))
        }
    }
}
