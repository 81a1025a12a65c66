//! Validity predicates evaluated under secret sharing
//!
//! For every (question, respondent) pair this module builds a secret 0/1 flag that is 1
//! iff the response satisfies the question's constraints. Nothing is opened here; the
//! flag is consumed by [`crate::aggregate`]. Logical AND of two flags is their product.

use crate::engine::SecretEngine;
use crate::form::{MultipleChoiceQuestion, NumericalQuestion, Question};

/// Secret flag, intended to be exactly 0 or 1, marking a response as well-formed.
#[derive(Debug, Clone)]
pub struct ValidityFlag<S>(S);

impl<S> ValidityFlag<S> {
    pub fn secret(&self) -> &S {
        &self.0
    }

    pub fn into_secret(self) -> S {
        self.0
    }
}

/// Flag for `lo <= value <= hi`, each bound optional.
///
/// With no bound at all the flag is the constant 1.
pub fn within_range<E: SecretEngine>(
    engine: &E,
    value: &E::Secret,
    lo: Option<i64>,
    hi: Option<i64>,
) -> E::Secret {
    match (lo, hi) {
        (None, None) => engine.constant(1),
        (Some(lo), None) => engine.compare_gte(value, lo),
        (None, Some(hi)) => engine.compare_lte(value, hi),
        (Some(lo), Some(hi)) => {
            let above = engine.compare_gte(value, lo);
            let below = engine.compare_lte(value, hi);
            engine.mult(&above, &below)
        }
    }
}

/// Flag for an option entry being 0 or 1, tested as `entry < 2`.
pub fn is_boolean<E: SecretEngine>(engine: &E, entry: &E::Secret) -> E::Secret {
    engine.compare_lt(entry, 2)
}

/// Homomorphic sum of a response vector; the constant 0 when empty.
pub fn secret_sum<E: SecretEngine>(engine: &E, entries: &[E::Secret]) -> E::Secret {
    match entries.split_first() {
        Some((first, rest)) => rest
            .iter()
            .fold(first.clone(), |acc, entry| engine.add(&acc, entry)),
        None => engine.constant(0),
    }
}

pub fn numerical_flag<E: SecretEngine>(
    engine: &E,
    question: &NumericalQuestion,
    value: &E::Secret,
) -> E::Secret {
    within_range(engine, value, question.effective_min(), question.max)
}

/// Exactly one option selected. Individual entries are not checked for booleanness.
pub fn single_choice_flag<E: SecretEngine>(engine: &E, entries: &[E::Secret]) -> E::Secret {
    let selected = secret_sum(engine, entries);
    within_range(engine, &selected, Some(1), Some(1))
}

/// Every entry is boolean and the number of selections is within the question's bounds.
pub fn multiple_choice_flag<E: SecretEngine>(
    engine: &E,
    question: &MultipleChoiceQuestion,
    entries: &[E::Secret],
) -> E::Secret {
    let (min, max) = question.selection_bounds();
    let selected = secret_sum(engine, entries);
    let count_ok = within_range(engine, &selected, Some(min as i64), Some(max as i64));

    entries.iter().fold(count_ok, |flag, entry| {
        let boolean = is_boolean(engine, entry);
        engine.mult(&flag, &boolean)
    })
}

/// Builds the validity flag of one response to `question`.
///
/// `response` must have [`Question::width`] entries; the orchestrator checks this before
/// calling.
pub fn flag_response<E: SecretEngine>(
    engine: &E,
    question: &Question,
    response: &[E::Secret],
) -> ValidityFlag<E::Secret> {
    debug_assert_eq!(response.len(), question.width());
    let flag = match question {
        Question::Numerical(q) => numerical_flag(engine, q, &response[0]),
        Question::SingleChoice(_) => single_choice_flag(engine, response),
        Question::MultipleChoice(q) => multiple_choice_flag(engine, q, response),
    };
    ValidityFlag(flag)
}
