use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path, time::Duration};

use crate::{Error, InternalResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaygroundConfig {
    #[serde(default = "default_event_buffer_size")]
    pub event_buffer_size: usize,

    /// How long the "copied" acknowledgment stays up
    #[serde(default = "default_copy_ack_dwell", with = "duration_ms")]
    pub copy_ack_dwell: Duration,

    /// Format the current source once, right after the engine is ready
    #[serde(default = "default_true")]
    pub format_on_ready: bool,

    #[serde(default)]
    pub format_on_option_change: bool,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub clipboard: ClipboardConfig,
}

/// External formatter executable backing [`crate::engine::ProcessEngine`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    #[serde(default = "default_engine_program")]
    pub program: String,

    #[serde(default)]
    pub args: Vec<String>,

    /// Arguments of the readiness probe run by `initialize`
    #[serde(default = "default_probe_args")]
    pub probe_args: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            program: default_engine_program(),
            args: Vec::new(),
            probe_args: default_probe_args(),
        }
    }
}

/// Clipboard utility fed on stdin by [`crate::clipboard::CommandClipboard`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClipboardConfig {
    #[serde(default = "default_clipboard_program")]
    pub program: String,

    #[serde(default = "default_clipboard_args")]
    pub args: Vec<String>,
}

impl Default for ClipboardConfig {
    fn default() -> Self {
        Self {
            program: default_clipboard_program(),
            args: default_clipboard_args(),
        }
    }
}

impl Default for PlaygroundConfig {
    fn default() -> Self {
        Self {
            event_buffer_size: default_event_buffer_size(),
            copy_ack_dwell: default_copy_ack_dwell(),
            format_on_ready: default_true(),
            format_on_option_change: false,
            engine: EngineConfig::default(),
            clipboard: ClipboardConfig::default(),
        }
    }
}

impl PlaygroundConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> InternalResult<Self> {
        from_file(path)
    }

    pub fn from_str(s: &str) -> InternalResult<Self> {
        from_str(s)
    }
}

pub fn from_file<T: for<'de> Deserialize<'de>, P: AsRef<Path>>(path: P) -> InternalResult<T> {
    let file = File::open(path.as_ref()).map_err(|e| {
        Error::config(format!(
            "Failed to open config file {}: {}",
            path.as_ref().display(),
            e
        ))
    })?;
    let reader = BufReader::new(file);
    let config = serde_json::from_reader(reader)
        .map_err(|e| Error::config(format!("Failed to parse config file: {}", e)))?;
    Ok(config)
}

pub fn from_str<T: for<'de> Deserialize<'de>>(s: &str) -> InternalResult<T> {
    let config = serde_json::from_str(s)
        .map_err(|e| Error::config(format!("Failed to parse config: {}", e)))?;
    Ok(config)
}

// デフォルト値の定義
fn default_event_buffer_size() -> usize {
    100
}
fn default_copy_ack_dwell() -> Duration {
    Duration::from_millis(2000)
}
fn default_true() -> bool {
    true
}
fn default_engine_program() -> String {
    "fmt-engine".to_string()
}
fn default_probe_args() -> Vec<String> {
    vec!["--version".to_string()]
}

#[cfg(target_os = "macos")]
fn default_clipboard_program() -> String {
    "pbcopy".to_string()
}
#[cfg(target_os = "macos")]
fn default_clipboard_args() -> Vec<String> {
    Vec::new()
}

#[cfg(target_os = "windows")]
fn default_clipboard_program() -> String {
    "clip".to_string()
}
#[cfg(target_os = "windows")]
fn default_clipboard_args() -> Vec<String> {
    Vec::new()
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn default_clipboard_program() -> String {
    if std::env::var_os("WAYLAND_DISPLAY").is_some() {
        "wl-copy".to_string()
    } else {
        "xclip".to_string()
    }
}
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn default_clipboard_args() -> Vec<String> {
    if std::env::var_os("WAYLAND_DISPLAY").is_some() {
        Vec::new()
    } else {
        vec!["-selection".to_string(), "clipboard".to_string()]
    }
}

// Duration型のシリアライズ/デシリアライズヘルパー
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
