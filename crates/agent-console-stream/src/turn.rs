use std::sync::Arc;

use futures::StreamExt as _;
use tokio::sync::{oneshot, watch};
use tracing::{Instrument as _, debug, info, info_span, warn};

use crate::decode::decode_frame;
use crate::errors::SessionError;
use crate::frame::frame_stream;
use crate::session::SessionShared;
use crate::state::{ConversationTurn, TurnId, TurnOutcome};
use crate::transport::AgentRequest;

/// Handle used to request cancellation of a running turn.
#[derive(Clone)]
pub struct AbortHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl AbortHandle {
    /// Requests cancellation.
    ///
    /// The turn stops reading at the next suspension point and finalizes
    /// with [`TurnOutcome::Cancelled`]. Aborting a finished turn does nothing.
    pub fn abort(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_aborted(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Handle for one in-flight turn, returned by `Session::submit_message`.
pub struct TurnHandle {
    turn_id: TurnId,
    abort_handle: AbortHandle,
    final_rx: oneshot::Receiver<ConversationTurn>,
}

impl TurnHandle {
    pub fn turn_id(&self) -> TurnId {
        self.turn_id
    }

    /// Returns a handle that can cancel this turn.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort_handle.clone()
    }

    /// Waits for the turn to finalize and returns its final snapshot.
    pub async fn finish(self) -> Result<ConversationTurn, SessionError> {
        self.final_rx.await.map_err(|_| SessionError::TurnTaskLost {
            turn_id: self.turn_id,
        })
    }
}

/// Starts the streaming half of a turn whose opening step already ran.
pub(crate) fn spawn_turn(
    shared: Arc<SessionShared>,
    turn_id: TurnId,
    request: AgentRequest,
) -> TurnHandle {
    let (abort_tx, abort_rx) = watch::channel(false);
    let (final_tx, final_rx) = oneshot::channel();
    let span = info_span!("turn", turn_id = %turn_id, session_id = %request.session_id);
    tokio::spawn(run_turn(shared, turn_id, request, abort_rx, final_tx).instrument(span));
    TurnHandle {
        turn_id,
        abort_handle: AbortHandle {
            tx: Arc::new(abort_tx),
        },
        final_rx,
    }
}

async fn run_turn(
    shared: Arc<SessionShared>,
    turn_id: TurnId,
    request: AgentRequest,
    mut abort_rx: watch::Receiver<bool>,
    final_tx: oneshot::Sender<ConversationTurn>,
) {
    let mut finalizer = TurnFinalizer::new(shared.clone(), turn_id);
    let outcome = stream_turn(&shared, turn_id, request, &mut abort_rx).await;
    if let Some(turn) = finalizer.finish(outcome) {
        let _ = final_tx.send(turn);
    }
}

async fn stream_turn(
    shared: &SessionShared,
    turn_id: TurnId,
    request: AgentRequest,
    abort_rx: &mut watch::Receiver<bool>,
) -> TurnOutcome {
    let opened = tokio::select! {
        biased;
        () = wait_for_abort(abort_rx) => return TurnOutcome::Cancelled,
        opened = shared.transport.open(request) => opened,
    };
    let chunks = match opened {
        Ok(chunks) => chunks,
        Err(err) => {
            warn!(error = %err, "agent stream failed to open");
            return TurnOutcome::Failed {
                message: err.to_string(),
            };
        }
    };

    shared.begin_streaming(turn_id);
    let mut frames = std::pin::pin!(frame_stream(chunks));
    let mut applied = 0_u64;
    loop {
        tokio::select! {
            biased;
            () = wait_for_abort(abort_rx) => return TurnOutcome::Cancelled,
            next = frames.next() => {
                match next {
                    Some(Ok(payload)) => {
                        if let Some(event) = decode_frame(&payload) {
                            shared.apply(turn_id, event);
                            applied = applied.saturating_add(1);
                        }
                    }
                    Some(Err(err)) => {
                        warn!(error = %err, applied, "agent stream read failed");
                        return TurnOutcome::Failed { message: err.to_string() };
                    }
                    None => {
                        debug!(applied, "agent stream ended");
                        return TurnOutcome::Completed;
                    }
                }
            }
        }
    }
}

async fn wait_for_abort(abort_rx: &mut watch::Receiver<bool>) {
    // a dropped handle can never abort, so park instead of resolving
    if abort_rx.wait_for(|aborted| *aborted).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Finalizes its turn exactly once: explicitly through [`Self::finish`], or
/// on drop with [`TurnOutcome::Interrupted`] if the task is torn down first.
struct TurnFinalizer {
    shared: Arc<SessionShared>,
    turn_id: TurnId,
    done: bool,
}

impl TurnFinalizer {
    fn new(shared: Arc<SessionShared>, turn_id: TurnId) -> Self {
        Self {
            shared,
            turn_id,
            done: false,
        }
    }

    fn finish(&mut self, outcome: TurnOutcome) -> Option<ConversationTurn> {
        self.done = true;
        info!(turn_id = %self.turn_id, outcome = ?outcome, "finalizing turn");
        self.shared.finalize(self.turn_id, outcome)
    }
}

impl Drop for TurnFinalizer {
    fn drop(&mut self) {
        if !self.done {
            warn!(turn_id = %self.turn_id, "turn task dropped before finalizing");
            self.shared.finalize(self.turn_id, TurnOutcome::Interrupted);
        }
    }
}
