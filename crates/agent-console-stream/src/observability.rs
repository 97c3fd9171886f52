use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

const DEFAULT_LOG_FILE: &str = "agent-console.logs.jsonl";

static INIT: OnceCell<()> = OnceCell::new();

/// Where log lines go.
#[derive(Debug, PartialEq, Eq)]
enum LogSink {
    Disabled,
    Stderr,
    JsonFile { dir: PathBuf, file_name: String },
}

impl LogSink {
    fn resolve(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let enabled = lookup("AGENT_CONSOLE_OBSERVABILITY_ENABLED")
            .and_then(|value| parse_bool_env(&value))
            .unwrap_or(true);
        if !enabled {
            return Self::Disabled;
        }
        match lookup("AGENT_CONSOLE_JSON_LOG_PATH").filter(|p| !p.trim().is_empty()) {
            Some(raw) => {
                let path = PathBuf::from(raw.trim());
                let dir = path
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
                let file_name = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or(DEFAULT_LOG_FILE)
                    .to_string();
                Self::JsonFile { dir, file_name }
            }
            None => Self::Stderr,
        }
    }
}

fn parse_bool_env(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn env_filter(default_level: &str) -> EnvFilter {
    std::env::var("AGENT_CONSOLE_LOG_LEVEL")
        .ok()
        .and_then(|level| EnvFilter::try_new(level).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(default_level))
}

/// Installs the tracing subscriber once per process.
///
/// Reads `AGENT_CONSOLE_OBSERVABILITY_ENABLED` (default on),
/// `AGENT_CONSOLE_LOG_LEVEL`, then `RUST_LOG`, for the filter, and
/// `AGENT_CONSOLE_JSON_LOG_PATH` to write JSON lines to a file instead of
/// compact lines on stderr. Stdout stays free for console output.
pub fn init_observability(default_level: &str) {
    INIT.get_or_init(|| {
        let registry = tracing_subscriber::registry().with(env_filter(default_level));
        match LogSink::resolve(|key| std::env::var(key).ok()) {
            LogSink::Disabled => {}
            LogSink::Stderr => {
                let layer = tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr);
                let _ = registry.with(layer).try_init();
            }
            LogSink::JsonFile { dir, file_name } => {
                let _ = std::fs::create_dir_all(&dir);
                let layer = tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_writer(tracing_appender::rolling::never(dir, file_name));
                let _ = registry.with(layer).try_init();
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sink(vars: &[(&str, &str)]) -> LogSink {
        LogSink::resolve(|key| {
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        })
    }

    #[test]
    fn parse_bool_env_accepts_common_spellings() {
        assert_eq!(parse_bool_env(" YES "), Some(true));
        assert_eq!(parse_bool_env("off"), Some(false));
        assert_eq!(parse_bool_env("maybe"), None);
    }

    #[test]
    fn sink_defaults_to_stderr_and_honors_disable_flag() {
        assert_eq!(sink(&[]), LogSink::Stderr);
        assert_eq!(
            sink(&[("AGENT_CONSOLE_OBSERVABILITY_ENABLED", "maybe")]),
            LogSink::Stderr
        );
        assert_eq!(
            sink(&[
                ("AGENT_CONSOLE_OBSERVABILITY_ENABLED", "0"),
                ("AGENT_CONSOLE_JSON_LOG_PATH", "logs/run.jsonl"),
            ]),
            LogSink::Disabled
        );
    }

    #[test]
    fn json_path_splits_into_dir_and_file() {
        assert_eq!(
            sink(&[("AGENT_CONSOLE_JSON_LOG_PATH", "logs/run.jsonl")]),
            LogSink::JsonFile {
                dir: PathBuf::from("logs"),
                file_name: "run.jsonl".into(),
            }
        );
        assert_eq!(
            sink(&[("AGENT_CONSOLE_JSON_LOG_PATH", "run.jsonl")]),
            LogSink::JsonFile {
                dir: PathBuf::from("."),
                file_name: "run.jsonl".into(),
            }
        );
    }

    #[test]
    fn init_is_idempotent() {
        init_observability("warn");
        init_observability("debug");
        assert!(INIT.get().is_some());
    }
}
