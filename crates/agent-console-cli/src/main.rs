//! `agent-console`: submit one message to a backend agent and watch it work.

mod args;
mod render;

use std::sync::Arc;

use agent_console_stream::observability::init_observability;
use agent_console_stream::prelude::*;
use clap::Parser as _;
use tracing::{info, warn};

use crate::args::Args;
use crate::render::Renderer;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Rejected(#[from] SubmitRejected),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("failed to encode session state: {0}")]
    Json(#[from] serde_json::Error),
    #[error("turn ended without completing")]
    TurnNotCompleted,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    init_observability("warn");

    let args = Args::parse();
    if let Err(err) = run(args).await {
        eprintln!("agent-console: {err}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), CliError> {
    let transport = HttpTransport::new(args.transport_config()?)?;
    info!(url = %transport.config().base_url, "using agent backend");

    let session = Session::new(Arc::new(transport));
    session.on_module_built(|module| println!("■ module built: {}", module.name));

    let mut updates = session.subscribe();
    let handle = session
        .submit_message(args.message.clone(), args.attachments.clone(), args.mode.into())
        .await?;
    let abort = handle.abort_handle();
    let mut finished = std::pin::pin!(handle.finish());
    let mut renderer = Renderer::default();
    let mut watching = true;
    let mut listening = true;

    let turn = loop {
        tokio::select! {
            turn = &mut finished => break turn?,
            changed = updates.changed(), if watching => {
                if changed.is_err() {
                    watching = false;
                    continue;
                }
                let snapshot = updates.borrow_and_update().clone();
                for line in renderer.diff(&snapshot) {
                    println!("{line}");
                }
            }
            signal = tokio::signal::ctrl_c(), if listening => {
                listening = false;
                match signal {
                    Ok(()) => {
                        eprintln!("cancelling…");
                        abort.abort();
                    }
                    Err(err) => warn!(error = %err, "failed to listen for ctrl-c"),
                }
            }
        }
    };

    let state = session.state();
    for line in renderer.diff(&state) {
        println!("{line}");
    }
    if args.json {
        println!("{}", serde_json::to_string_pretty(&state)?);
    } else {
        println!("\n{}", turn.assistant_text);
    }

    match turn.outcome {
        Some(outcome) if outcome.is_completed() => Ok(()),
        _ => Err(CliError::TurnNotCompleted),
    }
}
