//! Session Management
//!
//! Each session owns one dialogue state machine. The machine sits behind a
//! mutex so a session never runs two transitions at once; separate
//! sessions proceed independently.

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

use medbot_agent::{Capabilities, DialogueStateMachine, TransitionOutcome};
use medbot_config::{DialogueConfig, SessionConfig};
use medbot_core::{DialogueContext, DialogueState};

use crate::metrics::record_active_sessions;
use crate::ServerError;

/// Longest accepted client-supplied session id
const MAX_SESSION_ID_LEN: usize = 128;

/// Serializable view of a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub active: bool,
    pub state: DialogueState,
    /// Seconds since the session was created
    pub age_seconds: u64,
    #[serde(flatten)]
    pub context: DialogueContext,
}

/// Session state
pub struct Session {
    /// Session ID
    pub id: String,
    machine: Mutex<DialogueStateMachine>,
    /// Creation time
    pub created_at: Instant,
    /// Last activity
    pub last_activity: RwLock<Instant>,
    /// Is active
    pub active: RwLock<bool>,
}

impl Session {
    /// Create a new session in the Start state
    pub fn new(id: impl Into<String>, machine: DialogueStateMachine) -> Self {
        Self {
            id: id.into(),
            machine: Mutex::new(machine),
            created_at: Instant::now(),
            last_activity: RwLock::new(Instant::now()),
            active: RwLock::new(true),
        }
    }

    /// Run one user turn through the machine
    pub fn transition(&self, message: &str) -> TransitionOutcome {
        self.touch();
        let outcome = self.machine.lock().transition(message);
        tracing::debug!(
            session_id = %self.id,
            state = %outcome.state,
            hops = outcome.path.len(),
            "Processed turn"
        );
        outcome
    }

    /// Move the machine to End
    pub fn end(&self) -> TransitionOutcome {
        self.touch();
        self.machine.lock().end()
    }

    /// Current state of the machine
    pub fn state(&self) -> DialogueState {
        self.machine.lock().current_state()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let machine = self.machine.lock();
        SessionSnapshot {
            session_id: self.id.clone(),
            active: self.is_active(),
            state: machine.current_state(),
            age_seconds: self.created_at.elapsed().as_secs(),
            context: machine.context().clone(),
        }
    }

    /// Update last activity
    pub fn touch(&self) {
        *self.last_activity.write() = Instant::now();
    }

    /// Check if session is expired
    pub fn is_expired(&self, timeout: Duration) -> bool {
        self.last_activity.read().elapsed() > timeout
    }

    /// Close session
    pub fn close(&self) {
        *self.active.write() = false;
    }

    /// Is session active
    pub fn is_active(&self) -> bool {
        *self.active.read()
    }
}

/// Session manager
pub struct SessionManager {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    capabilities: Capabilities,
    dialogue: Arc<DialogueConfig>,
    max_sessions: usize,
    session_timeout: Duration,
    cleanup_interval: Duration,
}

impl SessionManager {
    /// Create a session manager sharing one set of collaborators
    pub fn new(
        config: &SessionConfig,
        capabilities: Capabilities,
        dialogue: Arc<DialogueConfig>,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            capabilities,
            dialogue,
            max_sessions: config.max_sessions,
            session_timeout: Duration::from_secs(config.timeout_seconds),
            cleanup_interval: Duration::from_secs(config.cleanup_interval_seconds),
        }
    }

    /// Start a background task that periodically removes expired sessions
    ///
    /// Send `true` on the returned channel to stop the task.
    pub fn start_cleanup_task(self: &Arc<Self>) -> watch::Sender<bool> {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let manager = Arc::clone(self);
        let interval = manager.cleanup_interval;

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(interval);
            interval_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        let before = manager.count();
                        manager.cleanup_expired();
                        let after = manager.count();
                        if before != after {
                            tracing::info!(
                                "Session cleanup: removed {} expired sessions ({} remaining)",
                                before - after,
                                after
                            );
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::info!("Session cleanup task shutting down");
                            break;
                        }
                    }
                }
            }
        });

        shutdown_tx
    }

    /// Create a new session with a generated id
    pub fn create(&self) -> Result<Arc<Session>, ServerError> {
        let id = uuid::Uuid::new_v4().to_string();
        let mut sessions = self.sessions.write();
        self.insert_locked(&mut sessions, id)
    }

    /// Get a session, creating it under the given id on first contact
    pub fn get_or_create(&self, id: &str) -> Result<Arc<Session>, ServerError> {
        if id.is_empty() || id.len() > MAX_SESSION_ID_LEN {
            return Err(ServerError::InvalidRequest(format!(
                "Session id must be 1-{} characters",
                MAX_SESSION_ID_LEN
            )));
        }

        if let Some(session) = self.get(id) {
            return Ok(session);
        }

        let mut sessions = self.sessions.write();
        // Another request may have created it between the two locks
        if let Some(session) = sessions.get(id) {
            return Ok(session.clone());
        }
        self.insert_locked(&mut sessions, id.to_string())
    }

    fn insert_locked(
        &self,
        sessions: &mut HashMap<String, Arc<Session>>,
        id: String,
    ) -> Result<Arc<Session>, ServerError> {
        if sessions.len() >= self.max_sessions {
            self.cleanup_expired_internal(sessions);

            if sessions.len() >= self.max_sessions {
                tracing::warn!(max_sessions = self.max_sessions, "Session capacity reached");
                return Err(ServerError::CapacityExceeded(self.max_sessions));
            }
        }

        let machine = DialogueStateMachine::new(self.capabilities.clone(), self.dialogue.clone())
            .map_err(|e| ServerError::Internal(e.to_string()))?;
        let session = Arc::new(Session::new(&id, machine));
        sessions.insert(id.clone(), session.clone());
        record_active_sessions(sessions.len());

        tracing::info!(session_id = %id, "Created session");

        Ok(session)
    }

    /// Get a session by ID
    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.read().get(id).cloned()
    }

    /// Remove a session, returning whether it existed
    pub fn remove(&self, id: &str) -> bool {
        let mut sessions = self.sessions.write();
        let removed = sessions.remove(id);
        record_active_sessions(sessions.len());
        match removed {
            Some(session) => {
                session.close();
                tracing::info!("Removed session: {}", id);
                true
            },
            None => false,
        }
    }

    /// Get active session count
    pub fn count(&self) -> usize {
        self.sessions.read().len()
    }

    /// Cleanup expired sessions
    pub fn cleanup_expired(&self) {
        let mut sessions = self.sessions.write();
        self.cleanup_expired_internal(&mut sessions);
    }

    fn cleanup_expired_internal(&self, sessions: &mut HashMap<String, Arc<Session>>) {
        let timeout = self.session_timeout;
        let expired: Vec<String> = sessions
            .iter()
            .filter(|(_, s)| s.is_expired(timeout))
            .map(|(id, _)| id.clone())
            .collect();

        for id in expired {
            if let Some(session) = sessions.remove(&id) {
                session.close();
                tracing::info!("Expired session: {}", id);
            }
        }
        record_active_sessions(sessions.len());
    }

    /// List all session IDs
    pub fn list(&self) -> Vec<String> {
        self.sessions.read().keys().cloned().collect()
    }
}
