//! Secret-sharing arithmetic collaborator
//!
//! The aggregation protocol never touches plaintexts or shares directly. Everything it
//! does goes through [`SecretEngine`]: local homomorphic operations on opaque handles,
//! share collection from respondents, and `open`, the only operation that leaks
//! information.
//!
//! [`local::LocalEngine`] implements the trait in-process so the protocol can be run and
//! tested without a network of compute parties.

pub mod local;
pub mod sharing;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::EngineError;

pub use local::{Disclosure, LocalEngine, LocalEngineBuilder};

/// Identity of a party taking part in a computation.
///
/// The analyst and the coordinator hold shares and may reveal values; respondents only
/// contribute inputs. Respondents are numbered from 2 upward in join order.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum PartyId {
    Analyst,
    Coordinator,
    Respondent(u32),
}

impl PartyId {
    /// Id given to the first respondent that joins a computation.
    pub const FIRST_RESPONDENT: u32 = 2;

    pub fn is_respondent(&self) -> bool {
        matches!(self, PartyId::Respondent(_))
    }
}

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartyId::Analyst => write!(f, "analyst"),
            PartyId::Coordinator => write!(f, "coordinator"),
            PartyId::Respondent(id) => write!(f, "respondent-{}", id),
        }
    }
}

/// Width of each row of a respondent's input matrix, one row per question.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct InputShape(Vec<usize>);

impl InputShape {
    pub fn new(widths: Vec<usize>) -> Self {
        Self(widths)
    }

    pub fn widths(&self) -> &[usize] {
        &self.0
    }

    pub fn rows(&self) -> usize {
        self.0.len()
    }

    /// Checks a plaintext matrix against this shape.
    pub fn check(&self, inputs: &[Vec<i64>]) -> Result<(), EngineError> {
        let found: Vec<usize> = inputs.iter().map(Vec::len).collect();
        if found != self.0 {
            return Err(EngineError::ShapeMismatch {
                expected: self.0.clone(),
                found,
            });
        }
        Ok(())
    }
}

/// Capability to compute on secret-shared values without ever reading them.
///
/// Local operations are synchronous; input collection and `open` are network round
/// trips in a real deployment and are therefore `async`.
#[async_trait]
pub trait SecretEngine: Send + Sync {
    /// Opaque handle to a secret-shared value.
    type Secret: Clone + Send + Sync + fmt::Debug;

    /// Sharing of a public constant.
    fn constant(&self, value: i64) -> Self::Secret;

    fn add(&self, a: &Self::Secret, b: &Self::Secret) -> Self::Secret;

    fn add_constant(&self, a: &Self::Secret, k: i64) -> Self::Secret;

    fn mult(&self, a: &Self::Secret, b: &Self::Secret) -> Self::Secret;

    fn mult_constant(&self, a: &Self::Secret, k: i64) -> Self::Secret;

    /// Secret 0/1 flag for `a >= k`.
    fn compare_gte(&self, a: &Self::Secret, k: i64) -> Self::Secret;

    /// Secret 0/1 flag for `a <= k`.
    fn compare_lte(&self, a: &Self::Secret, k: i64) -> Self::Secret;

    /// Secret 0/1 flag for `a < k`.
    fn compare_lt(&self, a: &Self::Secret, k: i64) -> Self::Secret;

    /// Shares `inputs` on behalf of `sender` with every holder.
    async fn submit_input(
        &self,
        sender: PartyId,
        inputs: &[Vec<i64>],
        shape: &InputShape,
    ) -> Result<(), EngineError>;

    /// Waits for `sender`'s input and returns one row of handles per question.
    async fn receive_input(
        &self,
        sender: PartyId,
        shape: &InputShape,
    ) -> Result<Vec<Vec<Self::Secret>>, EngineError>;

    /// Reveals the value behind `secret` to `revealers`.
    ///
    /// Opened values are `i128`: sums over many respondents may leave the `i64` range
    /// their inputs live in.
    async fn open(
        &self,
        secret: &Self::Secret,
        revealers: &[PartyId],
    ) -> Result<i128, EngineError>;

    /// Reveals several values to the same parties, preserving order.
    async fn open_all(
        &self,
        secrets: &[Self::Secret],
        revealers: &[PartyId],
    ) -> Result<Vec<i128>, EngineError> {
        let mut values = Vec::with_capacity(secrets.len());
        for secret in secrets {
            values.push(self.open(secret, revealers).await?);
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_party_display() {
        assert_eq!(PartyId::Analyst.to_string(), "analyst");
        assert_eq!(PartyId::Respondent(7).to_string(), "respondent-7");
        assert!(PartyId::Respondent(2).is_respondent());
        assert!(!PartyId::Coordinator.is_respondent());
    }

    #[test]
    fn test_party_serde() {
        let parties = vec![PartyId::Analyst, PartyId::Coordinator, PartyId::Respondent(3)];
        let json = serde_json::to_string(&parties).unwrap();
        assert_eq!(json, r#"["analyst","coordinator",{"respondent":3}]"#);
        let back: Vec<PartyId> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, parties);
    }

    #[test]
    fn test_input_shape_check() {
        let shape = InputShape::new(vec![1, 3]);
        assert!(shape.check(&[vec![5], vec![0, 1, 0]]).is_ok());
        assert_eq!(
            shape.check(&[vec![5], vec![0, 1]]),
            Err(EngineError::ShapeMismatch {
                expected: vec![1, 3],
                found: vec![1, 2],
            })
        );
        assert!(shape.check(&[vec![5]]).is_err());
    }
}
