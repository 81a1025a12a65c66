//! Protocol orchestrator
//!
//! Drives one computation question by question:
//!
//! ```text
//! AwaitingParticipants
//!   -> CollectingShares(i) -> Validating(i) -> Aggregating(i) -> Disclosing(i)
//!   -> next i, or Done
//! ```
//!
//! Questions are processed strictly in form order; question `i + 1` starts only after
//! question `i`'s disclosure decision. Within a question, respondents' contributions are
//! combined in roster order, which has no effect on the result.

use rayon::prelude::*;
use tracing::{debug, info};

use crate::aggregate::MaskedAccumulator;
use crate::config::AggregationConfig;
use crate::disclosure::disclose;
use crate::engine::{InputShape, PartyId, SecretEngine};
use crate::error::AggregationError;
use crate::form::Form;
use crate::result::AggregateResult;
use crate::session::ParticipantSnapshot;
use crate::validity::{flag_response, ValidityFlag};

/// Where the orchestrator is in the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingParticipants,
    CollectingShares { question: usize },
    Validating { question: usize },
    Aggregating { question: usize },
    Disclosing { question: usize },
    Done,
}

/// One respondent's secret-shared input: a row of handles per question.
type Submission<S> = (PartyId, Vec<Vec<S>>);

pub struct Orchestrator<'a, E: SecretEngine> {
    engine: &'a E,
    form: &'a Form,
    config: &'a AggregationConfig,
    phase: Phase,
}

impl<'a, E: SecretEngine> Orchestrator<'a, E> {
    pub fn new(engine: &'a E, form: &'a Form, config: &'a AggregationConfig) -> Self {
        Self {
            engine,
            form,
            config,
            phase: Phase::AwaitingParticipants,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn enter(&mut self, next: Phase) {
        debug!("Phase {:?} -> {:?}", self.phase, next);
        self.phase = next;
    }

    /// Runs the whole protocol for the respondents in `snapshot`.
    ///
    /// Returns one result per question, in form order.
    ///
    /// # Errors
    /// Engine failures, share-collection timeouts and malformed responses abort the run.
    /// An orchestrator runs once; later calls fail with [`AggregationError::AlreadyRun`].
    pub async fn run(
        &mut self,
        snapshot: &ParticipantSnapshot,
    ) -> Result<Vec<AggregateResult>, AggregationError> {
        if self.phase != Phase::AwaitingParticipants {
            return Err(AggregationError::AlreadyRun);
        }
        info!(
            "Performing computation with {} parties over {} questions",
            snapshot.count(),
            self.form.questions.len()
        );

        let shape = self.form.input_shape();
        let mut submissions = Vec::with_capacity(snapshot.count());
        for party in snapshot.parties() {
            let rows = self.collect(*party, &shape).await?;
            submissions.push((*party, rows));
        }

        let mut results = Vec::with_capacity(self.form.questions.len());
        for index in 0..self.form.questions.len() {
            results.push(self.aggregate_question(index, &submissions).await?);
        }

        self.enter(Phase::Done);
        Ok(results)
    }

    async fn collect(
        &self,
        party: PartyId,
        shape: &InputShape,
    ) -> Result<Vec<Vec<E::Secret>>, AggregationError> {
        let receive = self.engine.receive_input(party, shape);
        let rows = match self.config.share_timeout() {
            Some(limit) => tokio::time::timeout(limit, receive)
                .await
                .map_err(|_| AggregationError::Timeout { party })??,
            None => receive.await?,
        };

        if rows.len() != shape.rows() {
            return Err(AggregationError::MalformedResponse {
                question: rows.len().min(shape.rows()),
                party,
                expected: shape.rows(),
                found: rows.len(),
            });
        }
        Ok(rows)
    }

    async fn aggregate_question(
        &mut self,
        index: usize,
        submissions: &[Submission<E::Secret>],
    ) -> Result<AggregateResult, AggregationError> {
        let form = self.form;
        let engine = self.engine;
        let question = &form.questions[index];

        self.enter(Phase::CollectingShares { question: index });
        let mut responses: Vec<&[E::Secret]> = Vec::with_capacity(submissions.len());
        for (party, rows) in submissions {
            let response = rows[index].as_slice();
            if response.len() != question.width() {
                return Err(AggregationError::MalformedResponse {
                    question: index,
                    party: *party,
                    expected: question.width(),
                    found: response.len(),
                });
            }
            responses.push(response);
        }

        self.enter(Phase::Validating { question: index });
        let flags: Vec<ValidityFlag<E::Secret>> = responses
            .par_iter()
            .map(|response| flag_response(engine, question, response))
            .collect();

        self.enter(Phase::Aggregating { question: index });
        let mut accumulator = MaskedAccumulator::new(engine, question.width());
        for (response, flag) in responses.iter().zip(flags) {
            accumulator.fold(engine, response, flag);
        }

        self.enter(Phase::Disclosing { question: index });
        let outcome = disclose(engine, &accumulator, &self.config.revealers).await?;
        info!(
            "Question {} ({}): sufficient={}, valid responses={}",
            index,
            question.id(),
            outcome.sufficient,
            outcome.num_valid_responses
        );
        Ok(outcome.into_result(question))
    }
}
