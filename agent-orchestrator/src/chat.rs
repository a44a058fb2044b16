//! Chat session facade
//!
//! Ties the client, workflow runner, preferences, transcript, token ledger
//! and attachments together behind one `send`. Only one send may be in
//! flight at a time; a second concurrent send fails with
//! [`ClientError::Busy`] instead of queueing.

use crate::attachments::Attachments;
use crate::backend::{AgentBackend, ChatResponse, ClientError};
use crate::client::AgentClient;
use crate::preferences::Preferences;
use crate::storage::{KeyValueStore, StorageError};
use crate::transcript::{ChatMessage, Transcript};
use crate::usage::UsageLedger;
use crate::workflow::{WorkflowOutcome, WorkflowRunner, WorkflowType};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::warn;

/// Holds the in-flight flag for the duration of one send
pub struct SendGuard {
    flag: Arc<AtomicBool>,
}

impl SendGuard {
    /// Claim the flag, or `None` if a send is already running
    pub fn try_acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag: flag.clone() })
    }
}

impl Drop for SendGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Result of one send
#[derive(Debug)]
pub enum SendOutcome {
    Chat(ChatResponse),
    Workflow(Box<WorkflowOutcome>),
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StorageError> {
    mutex.lock().map_err(|_| StorageError::Poisoned)
}

/// Interactive chat session state
pub struct ChatSession {
    client: AgentClient,
    runner: WorkflowRunner,
    store: Arc<dyn KeyValueStore>,
    preferences: Mutex<Preferences>,
    transcript: Mutex<Transcript>,
    ledger: Mutex<UsageLedger>,
    attachments: Mutex<Attachments>,
    in_flight: Arc<AtomicBool>,
}

impl ChatSession {
    /// Open a session, loading preferences and the token ledger from `store`
    pub fn open(
        backend: Arc<dyn AgentBackend>,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<Self, StorageError> {
        let client = AgentClient::new(backend, store.clone());
        let preferences = Preferences::load(store.as_ref())?;
        let ledger = UsageLedger::load(store.clone())?;
        Ok(Self {
            runner: WorkflowRunner::new(client.clone()),
            client,
            store,
            preferences: Mutex::new(preferences),
            transcript: Mutex::new(Transcript::new()),
            ledger: Mutex::new(ledger),
            attachments: Mutex::new(Attachments::new()),
            in_flight: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn client(&self) -> &AgentClient {
        &self.client
    }

    /// True while a send is running
    pub fn is_sending(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn preferences(&self) -> Result<Preferences, StorageError> {
        Ok(lock(&self.preferences)?.clone())
    }

    /// Replace and persist the preferences
    pub fn set_preferences(&self, preferences: Preferences) -> Result<(), StorageError> {
        preferences.save(self.store.as_ref())?;
        *lock(&self.preferences)? = preferences;
        Ok(())
    }

    /// Snapshot of the transcript
    pub fn messages(&self) -> Result<Vec<ChatMessage>, StorageError> {
        Ok(lock(&self.transcript)?.messages().to_vec())
    }

    pub fn attachments(&self) -> Result<MutexGuard<'_, Attachments>, StorageError> {
        lock(&self.attachments)
    }

    pub fn ledger(&self) -> Result<MutexGuard<'_, UsageLedger>, StorageError> {
        lock(&self.ledger)
    }

    /// Send a message as a plain chat or, with `auto_workflow`, as a full
    /// workflow run
    pub async fn send(&self, message: &str) -> Result<SendOutcome, ClientError> {
        // Attachments are a local preview only and never go to the backend
        if message.trim().is_empty() {
            return Err(ClientError::EmptyMessage);
        }
        let _guard = SendGuard::try_acquire(&self.in_flight).ok_or(ClientError::Busy)?;

        let prefs = self.preferences()?;
        lock(&self.transcript)?.push_user(message);

        let outcome = if prefs.auto_workflow {
            let options = prefs.workflow_options(prefs.agent, WorkflowType::Code);
            let outcome = self.runner.run(message, &options).await;

            if let Some(response) = &outcome.code_result {
                self.record_usage(&prefs, response)?;
            }
            let text = outcome
                .response_text()
                .map(str::to_string)
                .unwrap_or_else(|| outcome.message.clone());
            lock(&self.transcript)?.push_assistant(&text, prefs.agent);

            SendOutcome::Workflow(Box::new(outcome))
        } else {
            let options = prefs.chat_options();
            let response = self
                .client
                .send_chat_message(message, prefs.agent, &options)
                .await?;

            self.record_usage(&prefs, &response)?;
            let mut transcript = lock(&self.transcript)?;
            transcript.push_assistant(response.text().unwrap_or_default(), prefs.agent);
            if let Some(session_id) = self.client.session().current()? {
                transcript.save(self.store.as_ref(), &session_id)?;
            }

            SendOutcome::Chat(response)
        };

        Ok(outcome)
    }

    /// Record the token usage a response reports under the preferred provider
    pub fn record_usage(
        &self,
        prefs: &Preferences,
        response: &ChatResponse,
    ) -> Result<(), StorageError> {
        lock(&self.ledger)?.record_response(&prefs.mcp_server, &prefs.model, response)?;
        Ok(())
    }

    /// Forget the session id and drop the transcript and attachments
    pub fn reset(&self) -> Result<(), ClientError> {
        if self.is_sending() {
            warn!("Resetting session while a send is in flight");
        }
        self.client.reset_session()?;
        lock(&self.transcript)?.clear();
        lock(&self.attachments)?.clear();
        Ok(())
    }
}
