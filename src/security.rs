//! Memory hygiene for share material and respondent plaintext
//!
//! This module provides:
//! - [`SensitiveScalar`], a field element that is wiped on drop and never printed
//! - [`SensitiveInputs`], a respondent's plaintext answer matrix with the same guarantees

use ark_ff::Field;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Field element holding one holder's share of a secret.
///
/// # Security
/// - Overwritten with zero when dropped
/// - `Debug` output never contains the value
#[derive(Clone)]
pub struct SensitiveScalar<F: Field> {
    value: F,
}

impl<F: Field> SensitiveScalar<F> {
    pub fn new(value: F) -> Self {
        Self { value }
    }

    /// Get a reference to the inner value
    ///
    /// # Security Warning
    /// The caller must ensure this reference is not used to leak the value
    pub fn expose_secret(&self) -> &F {
        &self.value
    }
}

impl<F: Field> Zeroize for SensitiveScalar<F> {
    fn zeroize(&mut self) {
        self.value = F::zero();
    }
}

impl<F: Field> ZeroizeOnDrop for SensitiveScalar<F> {}

impl<F: Field> Drop for SensitiveScalar<F> {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl<F: Field> std::fmt::Debug for SensitiveScalar<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SensitiveScalar(<redacted>)")
    }
}

/// A respondent's answers before sharing: one row per question.
///
/// Wiped when dropped so plaintext answers do not outlive the sharing step.
pub struct SensitiveInputs {
    rows: Vec<Vec<i64>>,
}

impl SensitiveInputs {
    pub fn new(rows: Vec<Vec<i64>>) -> Self {
        Self { rows }
    }

    /// # Security Warning
    /// The returned rows are plaintext answers; only hand them to the sharing step.
    pub fn expose_secret(&self) -> &[Vec<i64>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Zeroize for SensitiveInputs {
    fn zeroize(&mut self) {
        self.rows.zeroize();
    }
}

impl ZeroizeOnDrop for SensitiveInputs {}

impl Drop for SensitiveInputs {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl std::fmt::Debug for SensitiveInputs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SensitiveInputs(<{} rows redacted>)", self.rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_bls12_381::Fr;
    use ark_std::{UniformRand, Zero};

    #[test]
    fn test_sensitive_scalar_zeroization() {
        let mut rng = ark_std::test_rng();
        let secret = Fr::rand(&mut rng);

        let mut sensitive = SensitiveScalar::new(secret);
        assert_eq!(sensitive.expose_secret(), &secret);

        sensitive.zeroize();
        assert_eq!(sensitive.expose_secret(), &Fr::zero());
    }

    #[test]
    fn test_debug_is_redacted() {
        let sensitive = SensitiveScalar::new(Fr::from(42u64));
        assert_eq!(format!("{:?}", sensitive), "SensitiveScalar(<redacted>)");

        let inputs = SensitiveInputs::new(vec![vec![42], vec![0, 1, 0]]);
        let printed = format!("{:?}", inputs);
        assert!(!printed.contains("42"));
        assert_eq!(printed, "SensitiveInputs(<2 rows redacted>)");
    }

    #[test]
    fn test_sensitive_inputs_zeroization() {
        let mut inputs = SensitiveInputs::new(vec![vec![7], vec![1, 0]]);
        assert_eq!(inputs.len(), 2);
        assert_eq!(inputs.expose_secret()[0], vec![7]);

        inputs.zeroize();
        assert!(inputs.is_empty());
    }
}
