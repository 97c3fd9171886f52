use std::sync::Arc;

use chrono::Utc;
use once_cell::sync::OnceCell;
use tokio::sync::watch;
use tracing::debug;

use crate::errors::SubmitRejected;
use crate::event::{BuiltModule, StreamEvent};
use crate::reduce::{self, Effect};
use crate::state::{ConversationTurn, SessionState, TurnId, TurnOutcome};
use crate::transport::{AgentRequest, AgentTransport, Attachment, Mode};
use crate::turn::{TurnHandle, spawn_turn};

type ModuleBuiltCallback = Box<dyn Fn(&BuiltModule) + Send + Sync>;

/// State shared between the facade and its turn tasks.
///
/// `state` is written only through the reducer functions, from the methods
/// below.
pub(crate) struct SessionShared {
    pub(crate) transport: Arc<dyn AgentTransport>,
    state: watch::Sender<SessionState>,
    module_built: OnceCell<ModuleBuiltCallback>,
}

impl SessionShared {
    pub(crate) fn begin_streaming(&self, turn_id: TurnId) {
        self.state
            .send_modify(|state| reduce::begin_streaming(state, turn_id));
    }

    pub(crate) fn apply(&self, turn_id: TurnId, event: StreamEvent) {
        let mut effects = Vec::new();
        self.state
            .send_modify(|state| effects = reduce::apply(state, turn_id, event));
        for effect in effects {
            match effect {
                Effect::ModuleBuilt(module) => self.notify_module_built(&module),
            }
        }
    }

    pub(crate) fn finalize(
        &self,
        turn_id: TurnId,
        outcome: TurnOutcome,
    ) -> Option<ConversationTurn> {
        self.state
            .send_if_modified(|state| reduce::begin_finalizing(state, turn_id));
        let mut finalized = None;
        self.state.send_if_modified(|state| {
            let changed = reduce::finalize_turn(state, turn_id, outcome, Utc::now());
            finalized = state.turn(turn_id).cloned();
            changed
        });
        finalized
    }

    fn notify_module_built(&self, module: &BuiltModule) {
        debug!(module = %module.name, "module built");
        if let Some(callback) = self.module_built.get() {
            callback(module);
        }
    }
}

/// Entry point for a console session.
///
/// A session owns its [`SessionState`], generates one session id that is
/// reused for every turn, and runs at most one turn at a time.
#[derive(Clone)]
pub struct Session {
    shared: Arc<SessionShared>,
}

impl Session {
    /// Creates a session that talks to the agent through `transport`.
    pub fn new(transport: Arc<dyn AgentTransport>) -> Self {
        let (state, _) = watch::channel(SessionState::new(uuid::Uuid::new_v4()));
        Self {
            shared: Arc::new(SessionShared {
                transport,
                state,
                module_built: OnceCell::new(),
            }),
        }
    }

    pub fn session_id(&self) -> uuid::Uuid {
        self.shared.state.borrow().session_id
    }

    /// Submits a user message and starts a turn.
    ///
    /// Rejected, without creating a turn, when `text` is blank or another
    /// turn is still running. Failures after the turn opens never surface
    /// here; they end up in the turn's final state.
    pub async fn submit_message(
        &self,
        text: impl Into<String>,
        attachments: Vec<Attachment>,
        mode: Mode,
    ) -> Result<TurnHandle, SubmitRejected> {
        let text = text.into();
        let message = text.trim();
        if message.is_empty() {
            return Err(SubmitRejected::EmptyMessage);
        }

        let turn_id = uuid::Uuid::new_v4();
        let turn = ConversationTurn::new(turn_id, message, attachments.clone(), Utc::now());
        let opened = self
            .shared
            .state
            .send_if_modified(|state| reduce::open_turn(state, turn));
        if !opened {
            debug!("submit rejected, turn already running");
            return Err(SubmitRejected::TurnInProgress);
        }

        let request = AgentRequest {
            message: message.to_string(),
            session_id: self.session_id(),
            mode,
            attachments,
        };
        debug!(turn_id = %turn_id, mode = ?mode, "turn opened");
        Ok(spawn_turn(self.shared.clone(), turn_id, request))
    }

    /// Returns a snapshot of the current session state.
    pub fn state(&self) -> SessionState {
        self.shared.state.borrow().clone()
    }

    /// Subscribes to state changes; the receiver is notified after every
    /// reduce step.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.shared.state.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.shared.state.borrow().is_running
    }

    /// Registers the module-built callback.
    ///
    /// Only the first registration is kept; later calls return `false`. The
    /// callback runs synchronously on the turn task for every completed
    /// module, across all turns.
    pub fn on_module_built(&self, callback: impl Fn(&BuiltModule) + Send + Sync + 'static) -> bool {
        self.shared.module_built.set(Box::new(callback)).is_ok()
    }

    /// Sets the display-only expanded flag of a turn.
    pub fn set_turn_expanded(&self, turn_id: TurnId, expanded: bool) -> bool {
        self.shared
            .state
            .send_if_modified(|state| reduce::set_expanded(state, turn_id, expanded))
    }
}
