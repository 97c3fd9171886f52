use std::time::Duration;

use agent_console_stream::{Attachment, ConfigError, HttpTransportConfig, Mode};
use clap::{Parser, ValueEnum};

/// Watch a backend agent build an application from one message.
#[derive(Debug, Parser)]
#[command(name = "agent-console", version)]
pub struct Args {
    /// What to build, in plain words.
    pub message: String,

    /// Backend base URL (falls back to AGENT_CONSOLE_BASE_URL).
    #[arg(long)]
    pub base_url: Option<String>,

    /// Bearer token (falls back to AGENT_CONSOLE_API_KEY).
    #[arg(long)]
    pub api_key: Option<String>,

    /// Path of the streaming chat endpoint.
    #[arg(long)]
    pub chat_path: Option<String>,

    /// Seconds allowed for connecting and between streamed chunks (falls
    /// back to AGENT_CONSOLE_IDLE_TIMEOUT_SECS).
    #[arg(long)]
    pub idle_timeout_secs: Option<u64>,

    #[arg(long, value_enum, default_value_t = ModeArg::Build)]
    pub mode: ModeArg,

    /// Attachment descriptor as NAME:TYPE, e.g. `mock.png:image/png`. Repeatable.
    #[arg(long = "attach", value_parser = parse_attachment)]
    pub attachments: Vec<Attachment>,

    /// Print the final session state as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Build,
    Plan,
}

impl From<ModeArg> for Mode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Build => Mode::Build,
            ModeArg::Plan => Mode::Plan,
        }
    }
}

fn parse_attachment(raw: &str) -> Result<Attachment, String> {
    match raw.split_once(':') {
        Some((name, kind)) if !name.trim().is_empty() && !kind.trim().is_empty() => {
            Ok(Attachment::new(name.trim(), kind.trim()))
        }
        _ => Err(format!("expected NAME:TYPE, got {raw:?}")),
    }
}

impl Args {
    /// Resolves transport settings: flags first, then `AGENT_CONSOLE_*`
    /// variables.
    pub fn transport_config(&self) -> Result<HttpTransportConfig, ConfigError> {
        self.transport_config_with(|key| std::env::var(key).ok())
    }

    fn transport_config_with(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<HttpTransportConfig, ConfigError> {
        let mut config = HttpTransportConfig::from_lookup(|key| match (key, &self.base_url) {
            ("AGENT_CONSOLE_BASE_URL", Some(url)) => Some(url.clone()),
            _ => env(key),
        })?;
        if let Some(key) = &self.api_key {
            config = config.api_key(key.clone());
        }
        if let Some(path) = &self.chat_path {
            config = config.chat_path(path.clone());
        }
        if let Some(secs) = self.idle_timeout_secs {
            config = config.idle_timeout(Duration::from_secs(secs));
        }
        Ok(config)
    }
}
