//! Per-computation context, participant roster and the "begin" barrier
//!
//! A [`ComputationContext`] is created by the caller for one computation id, handed the
//! form, an engine handle and the configuration, and consumed by [`ComputationContext::run`].
//! Nothing is kept in a process-wide registry.
//!
//! Respondents [`Roster::join`] until the analyst fires the [`BeginHandle`]. Firing it
//! closes the roster and snapshots the participants; anyone joining afterwards is not
//! part of the computation.

use blake2::{Blake2b512, Digest};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info};

use crate::config::AggregationConfig;
use crate::engine::{PartyId, SecretEngine};
use crate::error::{AggregationError, ConfigError, SessionError};
use crate::form::Form;
use crate::orchestrator::Orchestrator;
use crate::result::AggregateResult;

/// Identifier of one computation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComputationId(String);

impl ComputationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derives an id from the form's JSON encoding and a nonce.
    ///
    /// BLAKE2b-512 over both, truncated to 16 bytes and hex encoded.
    pub fn derive(form: &Form, nonce: &[u8]) -> Result<Self, serde_json::Error> {
        let encoded = serde_json::to_vec(form)?;
        let mut hasher = Blake2b512::new();
        hasher.update(&encoded);
        hasher.update(nonce);
        let digest = hasher.finalize();
        Ok(Self(hex::encode(&digest[..16])))
    }

    /// Derives an id from the form and a fresh random nonce.
    pub fn random(form: &Form) -> Result<Self, serde_json::Error> {
        let mut nonce = [0u8; 16];
        rand::rng().fill_bytes(&mut nonce);
        Self::derive(form, &nonce)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComputationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Respondents counted when the begin signal fired, in join order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParticipantSnapshot {
    parties: Vec<PartyId>,
}

impl ParticipantSnapshot {
    pub fn new(parties: Vec<PartyId>) -> Self {
        Self { parties }
    }

    /// Snapshot of `count` respondents numbered from [`PartyId::FIRST_RESPONDENT`].
    pub fn from_count(count: usize) -> Self {
        let first = PartyId::FIRST_RESPONDENT;
        Self {
            parties: (first..first + count as u32)
                .map(PartyId::Respondent)
                .collect(),
        }
    }

    pub fn parties(&self) -> &[PartyId] {
        &self.parties
    }

    pub fn count(&self) -> usize {
        self.parties.len()
    }
}

#[derive(Debug)]
struct RosterState {
    next_id: u32,
    joined: Vec<PartyId>,
    closed: bool,
}

/// Respondents connected to a computation.
#[derive(Debug)]
pub struct Roster {
    state: Mutex<RosterState>,
}

impl Default for Roster {
    fn default() -> Self {
        Self {
            state: Mutex::new(RosterState {
                next_id: PartyId::FIRST_RESPONDENT,
                joined: Vec::new(),
                closed: false,
            }),
        }
    }
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a respondent and returns its party id.
    ///
    /// # Errors
    /// [`SessionError::RosterClosed`] once the computation has begun.
    pub async fn join(&self) -> Result<PartyId, SessionError> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(SessionError::RosterClosed);
        }
        let party = PartyId::Respondent(state.next_id);
        state.next_id += 1;
        state.joined.push(party);
        debug!("{} joined ({} connected)", party, state.joined.len());
        Ok(party)
    }

    /// Number of respondents connected so far.
    pub async fn len(&self) -> usize {
        self.state.lock().await.joined.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn close(&self) -> Result<ParticipantSnapshot, SessionError> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(SessionError::AlreadyStarted);
        }
        state.closed = true;
        Ok(ParticipantSnapshot::new(state.joined.clone()))
    }
}

/// Trigger held by the analyst; firing it starts the computation.
#[derive(Clone)]
pub struct BeginHandle {
    roster: Arc<Roster>,
    signal: Arc<watch::Sender<Option<ParticipantSnapshot>>>,
}

impl BeginHandle {
    /// Closes the roster, snapshots the participants and releases the computation.
    ///
    /// # Errors
    /// [`SessionError::AlreadyStarted`] if the signal was already sent.
    pub async fn begin(&self) -> Result<ParticipantSnapshot, SessionError> {
        let snapshot = self.roster.close().await?;
        info!("Begin signal received with {} participants", snapshot.count());
        self.signal.send_replace(Some(snapshot.clone()));
        Ok(snapshot)
    }
}

/// Everything one computation needs; dropped once results are returned.
pub struct ComputationContext<E: SecretEngine> {
    id: ComputationId,
    form: Arc<Form>,
    engine: Arc<E>,
    config: AggregationConfig,
    roster: Arc<Roster>,
    begin: BeginHandle,
    started: watch::Receiver<Option<ParticipantSnapshot>>,
}

impl<E: SecretEngine> ComputationContext<E> {
    /// # Errors
    /// Returns an error if `config` does not validate.
    pub fn new(
        id: ComputationId,
        form: Arc<Form>,
        engine: Arc<E>,
        config: AggregationConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let roster = Arc::new(Roster::new());
        let (signal, started) = watch::channel(None);
        let begin = BeginHandle {
            roster: roster.clone(),
            signal: Arc::new(signal),
        };
        Ok(Self {
            id,
            form,
            engine,
            config,
            roster,
            begin,
            started,
        })
    }

    pub fn id(&self) -> &ComputationId {
        &self.id
    }

    pub fn form(&self) -> &Arc<Form> {
        &self.form
    }

    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    pub fn roster(&self) -> Arc<Roster> {
        self.roster.clone()
    }

    pub fn begin_handle(&self) -> BeginHandle {
        self.begin.clone()
    }

    /// Waits for the begin signal, then aggregates every question of the form.
    ///
    /// # Errors
    /// [`SessionError::Abandoned`] if every [`BeginHandle`] is dropped without firing.
    pub async fn run(mut self) -> Result<Vec<AggregateResult>, AggregationError> {
        info!("Computation {} initialized; waiting for begin", self.id);
        // Only handles given out by `begin_handle` may keep the computation waiting.
        drop(self.begin);
        let snapshot = {
            let started = self
                .started
                .wait_for(Option::is_some)
                .await
                .map_err(|_| SessionError::Abandoned)?;
            (*started).clone().ok_or(SessionError::Abandoned)?
        };

        let mut orchestrator = Orchestrator::new(self.engine.as_ref(), &self.form, &self.config);
        let results = orchestrator.run(&snapshot).await?;
        info!("Computation {} finished", self.id);
        Ok(results)
    }
}
