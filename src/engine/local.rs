//! In-process reference engine
//!
//! [`LocalEngine`] keeps every holder's shares in one address space. It exists so the
//! aggregation protocol can be executed end to end in tests, benchmarks and the demo
//! binary; it offers no secrecy against the process hosting it.
//!
//! - Inputs are Shamir-shared among the holders (see [`super::sharing`]).
//! - Addition and constant operations are share-wise.
//! - Multiplication consumes a Beaver triple from the [`Dealer`]; the masked differences
//!   are reconstructed among holders, as they would be in a networked run.
//! - Comparisons are answered by the dealer acting as a trusted comparison oracle, which
//!   returns a fresh sharing of the 0/1 outcome.
//! - Every `open` is recorded in an audit log ([`LocalEngine::disclosures`]).

use ark_bls12_381::Fr;
use ark_std::rand::{rngs::StdRng, SeedableRng};
use async_trait::async_trait;
use rand::RngCore;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use tracing::{debug, trace};

use super::sharing::{decode, decode_saturating, encode, ShamirSharing};
use super::{InputShape, PartyId, SecretEngine};
use crate::config::AggregationConfig;
use crate::error::EngineError;
use crate::security::SensitiveScalar;

/// One secret-shared value: a share per holder, in holder order.
#[derive(Clone)]
pub struct LocalShare {
    shares: Vec<SensitiveScalar<Fr>>,
}

impl LocalShare {
    fn from_elements(elements: Vec<Fr>) -> Self {
        Self {
            shares: elements.into_iter().map(SensitiveScalar::new).collect(),
        }
    }

    fn elements(&self) -> Vec<Fr> {
        self.shares.iter().map(|s| *s.expose_secret()).collect()
    }

    fn map(&self, f: impl Fn(Fr) -> Fr) -> Self {
        Self::from_elements(self.shares.iter().map(|s| f(*s.expose_secret())).collect())
    }

    fn zip_with(&self, other: &Self, f: impl Fn(Fr, Fr) -> Fr) -> Self {
        Self::from_elements(
            self.shares
                .iter()
                .zip(&other.shares)
                .map(|(a, b)| f(*a.expose_secret(), *b.expose_secret()))
                .collect(),
        )
    }
}

impl std::fmt::Debug for LocalShare {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LocalShare(<{} shares redacted>)", self.shares.len())
    }
}

/// A value revealed through [`SecretEngine::open`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disclosure {
    pub revealers: Vec<PartyId>,
    pub value: i128,
}

/// Crypto provider: deals fresh sharings, Beaver triples and comparison outcomes.
struct Dealer {
    sharing: ShamirSharing,
    rng: StdRng,
}

impl Dealer {
    fn share(&mut self, value: Fr) -> LocalShare {
        LocalShare::from_elements(self.sharing.split(value, &mut self.rng))
    }

    /// Random sharing of a triple (a, b, c) with ab = c.
    fn beaver_triple(&mut self) -> (LocalShare, LocalShare, LocalShare) {
        use ark_std::UniformRand;
        let a = Fr::rand(&mut self.rng);
        let b = Fr::rand(&mut self.rng);
        (self.share(a), self.share(b), self.share(a * b))
    }

    fn compare(&mut self, secret: &LocalShare, predicate: impl Fn(i128) -> bool) -> LocalShare {
        let value = decode_saturating(self.sharing.reconstruct(&secret.elements()));
        let outcome = if predicate(value) { 1 } else { 0 };
        self.share(Fr::from(outcome as u64))
    }
}

#[derive(Default)]
struct Inbox {
    pending: HashMap<PartyId, Vec<Vec<LocalShare>>>,
    submitted: HashSet<PartyId>,
}

/// In-process [`SecretEngine`] over Shamir shares of the BLS12-381 scalar field.
pub struct LocalEngine {
    holders: Vec<PartyId>,
    sharing: ShamirSharing,
    dealer: Mutex<Dealer>,
    inbox: Mutex<Inbox>,
    arrivals: Notify,
    disclosures: Mutex<Vec<Disclosure>>,
}

impl LocalEngine {
    pub fn builder() -> LocalEngineBuilder {
        LocalEngineBuilder::default()
    }

    /// Engine with the default holders (analyst and coordinator) and OS entropy.
    pub fn new() -> Result<Self, EngineError> {
        Self::builder().build()
    }

    /// Every value opened so far, in order.
    pub fn disclosures(&self) -> Vec<Disclosure> {
        lock(&self.disclosures).clone()
    }

    fn dealer(&self) -> MutexGuard<'_, Dealer> {
        lock(&self.dealer)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl SecretEngine for LocalEngine {
    type Secret = LocalShare;

    fn constant(&self, value: i64) -> LocalShare {
        // A degree-zero sharing: every holder's share is the constant itself.
        LocalShare::from_elements(vec![encode(value); self.sharing.holders()])
    }

    fn add(&self, a: &LocalShare, b: &LocalShare) -> LocalShare {
        a.zip_with(b, |x, y| x + y)
    }

    fn add_constant(&self, a: &LocalShare, k: i64) -> LocalShare {
        let k = encode(k);
        a.map(|x| x + k)
    }

    fn mult(&self, x: &LocalShare, y: &LocalShare) -> LocalShare {
        let (a, b, c) = self.dealer().beaver_triple();
        let d = self.sharing.reconstruct(&x.zip_with(&a, |x, a| x - a).elements());
        let e = self.sharing.reconstruct(&y.zip_with(&b, |y, b| y - b).elements());

        // xy = c + d*b + e*a + d*e
        let db_plus_c = b.zip_with(&c, |b, c| c + d * b);
        let ea = a.map(|a| e * a);
        db_plus_c.zip_with(&ea, |l, r| l + r + d * e)
    }

    fn mult_constant(&self, a: &LocalShare, k: i64) -> LocalShare {
        let k = encode(k);
        a.map(|x| x * k)
    }

    fn compare_gte(&self, a: &LocalShare, k: i64) -> LocalShare {
        self.dealer().compare(a, |v| v >= i128::from(k))
    }

    fn compare_lte(&self, a: &LocalShare, k: i64) -> LocalShare {
        self.dealer().compare(a, |v| v <= i128::from(k))
    }

    fn compare_lt(&self, a: &LocalShare, k: i64) -> LocalShare {
        self.dealer().compare(a, |v| v < i128::from(k))
    }

    async fn submit_input(
        &self,
        sender: PartyId,
        inputs: &[Vec<i64>],
        shape: &InputShape,
    ) -> Result<(), EngineError> {
        if !sender.is_respondent() {
            return Err(EngineError::UnknownParty(sender));
        }
        shape.check(inputs)?;

        let rows: Vec<Vec<LocalShare>> = {
            let mut dealer = self.dealer();
            inputs
                .iter()
                .map(|row| row.iter().map(|v| dealer.share(encode(*v))).collect())
                .collect()
        };

        {
            let mut inbox = lock(&self.inbox);
            if !inbox.submitted.insert(sender) {
                return Err(EngineError::DuplicateSubmission(sender));
            }
            inbox.pending.insert(sender, rows);
        }
        trace!("Stored input from {}", sender);
        self.arrivals.notify_waiters();
        Ok(())
    }

    async fn receive_input(
        &self,
        sender: PartyId,
        shape: &InputShape,
    ) -> Result<Vec<Vec<LocalShare>>, EngineError> {
        if !sender.is_respondent() {
            return Err(EngineError::UnknownParty(sender));
        }

        loop {
            let notified = self.arrivals.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let rows = lock(&self.inbox).pending.remove(&sender);
            if let Some(rows) = rows {
                let found: Vec<usize> = rows.iter().map(Vec::len).collect();
                if found != shape.widths() {
                    return Err(EngineError::ShapeMismatch {
                        expected: shape.widths().to_vec(),
                        found,
                    });
                }
                return Ok(rows);
            }
            notified.await;
        }
    }

    async fn open(
        &self,
        secret: &LocalShare,
        revealers: &[PartyId],
    ) -> Result<i128, EngineError> {
        if revealers.is_empty() {
            return Err(EngineError::NoRevealers);
        }
        if let Some(party) = revealers.iter().find(|p| !self.holders.contains(p)) {
            return Err(EngineError::NotRevealer(*party));
        }

        // Stands in for the network round trip between holders.
        tokio::task::yield_now().await;

        let value = decode(self.sharing.reconstruct(&secret.elements()))?;
        debug!("Opened a value to {:?}", revealers);
        lock(&self.disclosures).push(Disclosure {
            revealers: revealers.to_vec(),
            value,
        });
        Ok(value)
    }
}

/// Builder for [`LocalEngine`].
#[derive(Debug, Clone)]
pub struct LocalEngineBuilder {
    holders: Vec<PartyId>,
    threshold: Option<usize>,
    seed: Option<u64>,
}

impl Default for LocalEngineBuilder {
    fn default() -> Self {
        Self {
            holders: vec![PartyId::Analyst, PartyId::Coordinator],
            threshold: None,
            seed: None,
        }
    }
}

impl LocalEngineBuilder {
    /// Builder mirroring the holders, threshold and seed of `config`.
    pub fn from_config(config: &AggregationConfig) -> Self {
        Self {
            holders: config.holders.clone(),
            threshold: Some(config.threshold()),
            seed: config.seed,
        }
    }

    pub fn holders(mut self, holders: Vec<PartyId>) -> Self {
        self.holders = holders;
        self
    }

    /// Shares needed to reconstruct; defaults to every holder.
    pub fn threshold(mut self, threshold: usize) -> Self {
        self.threshold = Some(threshold);
        self
    }

    /// Fixes the dealer's randomness, for reproducible runs.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn build(self) -> Result<LocalEngine, EngineError> {
        if self.holders.is_empty() {
            return Err(EngineError::InvalidConfig(
                "at least one holder is required".to_string(),
            ));
        }
        if let Some(party) = self.holders.iter().find(|p| p.is_respondent()) {
            return Err(EngineError::InvalidConfig(format!(
                "respondent {} cannot hold shares",
                party
            )));
        }
        let distinct: HashSet<&PartyId> = self.holders.iter().collect();
        if distinct.len() != self.holders.len() {
            return Err(EngineError::InvalidConfig(
                "holders must be distinct".to_string(),
            ));
        }

        let threshold = self.threshold.unwrap_or(self.holders.len());
        let sharing = ShamirSharing::new(self.holders.len(), threshold)?;

        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => {
                let mut seed = [0u8; 32];
                rand::rng().fill_bytes(&mut seed);
                StdRng::from_seed(seed)
            }
        };

        Ok(LocalEngine {
            holders: self.holders,
            dealer: Mutex::new(Dealer {
                sharing: sharing.clone(),
                rng,
            }),
            sharing,
            inbox: Mutex::new(Inbox::default()),
            arrivals: Notify::new(),
            disclosures: Mutex::new(Vec::new()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn engine() -> LocalEngine {
        LocalEngine::builder().seed(7).build().unwrap()
    }

    async fn shared(engine: &LocalEngine, party: u32, value: i64) -> LocalShare {
        let shape = InputShape::new(vec![1]);
        let sender = PartyId::Respondent(party);
        engine
            .submit_input(sender, &[vec![value]], &shape)
            .await
            .unwrap();
        let mut rows = engine.receive_input(sender, &shape).await.unwrap();
        rows.remove(0).remove(0)
    }

    #[tokio::test]
    async fn test_arithmetic() {
        let engine = engine();
        let revealers = [PartyId::Analyst];
        let a = shared(&engine, 2, 6).await;
        let b = shared(&engine, 3, -4).await;

        let sum = engine.add(&a, &b);
        assert_eq!(engine.open(&sum, &revealers).await.unwrap(), 2);

        let product = engine.mult(&a, &b);
        assert_eq!(engine.open(&product, &revealers).await.unwrap(), -24);

        let shifted = engine.add_constant(&a, 10);
        assert_eq!(engine.open(&shifted, &revealers).await.unwrap(), 16);

        let scaled = engine.mult_constant(&b, 3);
        assert_eq!(engine.open(&scaled, &revealers).await.unwrap(), -12);

        let one = engine.constant(1);
        let masked = engine.mult(&a, &one);
        assert_eq!(engine.open(&masked, &revealers).await.unwrap(), 6);
    }

    #[tokio::test]
    async fn test_comparisons() {
        let engine = engine();
        let revealers = [PartyId::Coordinator];
        let a = shared(&engine, 2, 5).await;

        let cases = [
            (engine.compare_gte(&a, 5), 1),
            (engine.compare_gte(&a, 6), 0),
            (engine.compare_lte(&a, 5), 1),
            (engine.compare_lte(&a, -1), 0),
            (engine.compare_lt(&a, 5), 0),
            (engine.compare_lt(&a, 2), 0),
            (engine.compare_lt(&a, 9), 1),
        ];
        for (flag, expected) in cases {
            assert_eq!(engine.open(&flag, &revealers).await.unwrap(), expected);
        }
    }

    #[tokio::test]
    async fn test_holder_rules_and_low_threshold() {
        let engine = LocalEngine::builder()
            .holders(vec![
                PartyId::Analyst,
                PartyId::Coordinator,
                PartyId::Respondent(0),
            ])
            .build();
        assert!(engine.is_err());

        let engine = LocalEngine::builder()
            .threshold(1)
            .seed(3)
            .build()
            .unwrap();
        let a = shared(&engine, 2, 11).await;
        let b = shared(&engine, 3, 3).await;
        let product = engine.mult(&a, &b);
        assert_eq!(engine.open(&product, &[PartyId::Analyst]).await.unwrap(), 33);
    }

    #[tokio::test]
    async fn test_submission_rules() {
        let engine = engine();
        let shape = InputShape::new(vec![1, 2]);
        let sender = PartyId::Respondent(2);

        let err = engine
            .submit_input(sender, &[vec![1], vec![1]], &shape)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::ShapeMismatch { .. }));

        engine
            .submit_input(sender, &[vec![1], vec![0, 1]], &shape)
            .await
            .unwrap();
        let err = engine
            .submit_input(sender, &[vec![1], vec![0, 1]], &shape)
            .await
            .unwrap_err();
        assert_eq!(err, EngineError::DuplicateSubmission(sender));

        let err = engine
            .submit_input(PartyId::Analyst, &[vec![1], vec![0, 1]], &shape)
            .await
            .unwrap_err();
        assert_eq!(err, EngineError::UnknownParty(PartyId::Analyst));
    }

    #[tokio::test]
    async fn test_receive_waits_for_submission() {
        let engine = Arc::new(engine());
        let shape = InputShape::new(vec![1]);
        let sender = PartyId::Respondent(5);

        let receiver = {
            let engine = engine.clone();
            let shape = shape.clone();
            tokio::spawn(async move { engine.receive_input(sender, &shape).await })
        };
        tokio::task::yield_now().await;

        engine
            .submit_input(sender, &[vec![9]], &shape)
            .await
            .unwrap();
        let rows = receiver.await.unwrap().unwrap();
        let value = engine.open(&rows[0][0], &[PartyId::Analyst]).await.unwrap();
        assert_eq!(value, 9);
    }

    #[tokio::test]
    async fn test_open_rules_and_audit_log() {
        let engine = engine();
        let a = shared(&engine, 2, 4).await;

        assert_eq!(engine.open(&a, &[]).await, Err(EngineError::NoRevealers));
        assert_eq!(
            engine.open(&a, &[PartyId::Respondent(2)]).await,
            Err(EngineError::NotRevealer(PartyId::Respondent(2)))
        );
        assert!(engine.disclosures().is_empty());

        let revealers = [PartyId::Analyst, PartyId::Coordinator];
        engine.open(&a, &revealers).await.unwrap();
        assert_eq!(
            engine.disclosures(),
            vec![Disclosure {
                revealers: revealers.to_vec(),
                value: 4,
            }]
        );
    }

    #[test]
    fn test_debug_is_redacted() {
        let engine = engine();
        let printed = format!("{:?}", engine.constant(1234));
        assert!(!printed.contains("1234"));
    }
}
