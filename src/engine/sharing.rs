//! Shamir sharing over the BLS12-381 scalar field
//!
//! Holder `i` (0-indexed) receives the evaluation of a random polynomial of degree
//! `threshold - 1` at `x = i + 1`; the secret is the constant term. Reconstruction
//! interpolates at zero from the first `threshold` shares.

use ark_bls12_381::Fr;
use ark_ff::{Field, PrimeField};
use ark_poly::{univariate::DensePolynomial, DenseUVPolynomial, Polynomial};
use ark_std::{rand::Rng, One, UniformRand, Zero};

use crate::error::EngineError;

/// Embeds a signed plaintext in the field; negatives map to `p - |v|`.
pub fn encode(value: i64) -> Fr {
    if value >= 0 {
        Fr::from(value as u64)
    } else {
        -Fr::from(value.unsigned_abs())
    }
}

/// Inverse of [`encode`]: elements above `(p - 1) / 2` are read as negative.
///
/// Decoded values are `i128`, so sums of many `i64` plaintexts still fit.
///
/// # Errors
/// Returns [`EngineError::Overflow`] if the magnitude does not fit in an `i128`.
pub fn decode(element: Fr) -> Result<i128, EngineError> {
    let (negative, magnitude) = signed_magnitude(element);
    let limbs = magnitude.as_ref();
    if limbs[2..].iter().any(|limb| *limb != 0) {
        return Err(EngineError::Overflow);
    }
    let wide = (u128::from(limbs[1]) << 64) | u128::from(limbs[0]);
    let value = i128::try_from(wide).map_err(|_| EngineError::Overflow)?;
    Ok(if negative { -value } else { value })
}

/// Like [`decode`], but clamps out-of-range magnitudes to `i128::MIN`/`i128::MAX`.
pub fn decode_saturating(element: Fr) -> i128 {
    match decode(element) {
        Ok(value) => value,
        Err(_) if signed_magnitude(element).0 => i128::MIN,
        Err(_) => i128::MAX,
    }
}

fn signed_magnitude(element: Fr) -> (bool, <Fr as PrimeField>::BigInt) {
    let repr = element.into_bigint();
    if repr > Fr::MODULUS_MINUS_ONE_DIV_TWO {
        (true, (-element).into_bigint())
    } else {
        (false, repr)
    }
}

/// Shamir parameters shared by the dealer and the engine.
#[derive(Debug, Clone)]
pub struct ShamirSharing {
    holders: usize,
    threshold: usize,
    /// Lagrange coefficients at zero for the points `1..=threshold`.
    lagrange_at_zero: Vec<Fr>,
}

impl ShamirSharing {
    /// # Arguments
    /// * `holders` - Number of parties receiving a share
    /// * `threshold` - Number of shares needed to reconstruct (polynomial degree + 1)
    ///
    /// # Errors
    /// Returns an error unless `1 <= threshold <= holders`.
    pub fn new(holders: usize, threshold: usize) -> Result<Self, EngineError> {
        if threshold == 0 {
            return Err(EngineError::InvalidConfig(
                "threshold must be at least 1".to_string(),
            ));
        }
        if threshold > holders {
            return Err(EngineError::InvalidConfig(format!(
                "threshold ({}) must be <= number of holders ({})",
                threshold, holders
            )));
        }

        let points: Vec<Fr> = (1..=threshold as u64).map(Fr::from).collect();
        let mut lagrange_at_zero = Vec::with_capacity(threshold);
        for (j, x_j) in points.iter().enumerate() {
            let mut numerator = Fr::one();
            let mut denominator = Fr::one();
            for (m, x_m) in points.iter().enumerate() {
                if m != j {
                    numerator *= x_m;
                    denominator *= *x_m - x_j;
                }
            }
            let inverse = denominator.inverse().ok_or_else(|| {
                EngineError::InvalidConfig("degenerate evaluation points".to_string())
            })?;
            lagrange_at_zero.push(numerator * inverse);
        }

        Ok(Self {
            holders,
            threshold,
            lagrange_at_zero,
        })
    }

    pub fn holders(&self) -> usize {
        self.holders
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Splits `secret` into one share per holder.
    pub fn split<R: Rng>(&self, secret: Fr, rng: &mut R) -> Vec<Fr> {
        let mut coefficients = Vec::with_capacity(self.threshold);
        coefficients.push(secret);
        coefficients.extend((1..self.threshold).map(|_| Fr::rand(rng)));
        let polynomial = DensePolynomial::from_coefficients_vec(coefficients);

        (1..=self.holders as u64)
            .map(|x| polynomial.evaluate(&Fr::from(x)))
            .collect()
    }

    /// Reconstructs the secret from a full share vector.
    pub fn reconstruct(&self, shares: &[Fr]) -> Fr {
        debug_assert_eq!(shares.len(), self.holders);
        shares
            .iter()
            .zip(&self.lagrange_at_zero)
            .fold(Fr::zero(), |acc, (share, coefficient)| acc + *share * coefficient)
    }
}
