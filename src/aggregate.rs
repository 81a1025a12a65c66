//! Masked aggregation of responses across respondents
//!
//! Each response component is multiplied by the respondent's validity flag before it is
//! added to the question's running sums, so an invalid response contributes exactly zero
//! without anyone learning which respondent was filtered. The flags themselves are summed
//! into a secret count of valid responses. Folding order does not affect the result.

use crate::engine::SecretEngine;
use crate::validity::ValidityFlag;

/// Secret per-question accumulator.
#[derive(Debug, Clone)]
pub struct MaskedAccumulator<S> {
    sums: Vec<S>,
    valid_count: S,
    contributions: usize,
}

impl<S: Clone> MaskedAccumulator<S> {
    /// Accumulator for a question whose responses have `width` components.
    pub fn new<E: SecretEngine<Secret = S>>(engine: &E, width: usize) -> Self {
        let zero = engine.constant(0);
        Self {
            sums: vec![zero.clone(); width],
            valid_count: zero,
            contributions: 0,
        }
    }

    /// Adds one respondent's masked response and flag.
    pub fn fold<E: SecretEngine<Secret = S>>(
        &mut self,
        engine: &E,
        response: &[S],
        flag: ValidityFlag<S>,
    ) {
        debug_assert_eq!(response.len(), self.sums.len());
        let flag = flag.into_secret();
        for (sum, component) in self.sums.iter_mut().zip(response) {
            let masked = engine.mult(component, &flag);
            *sum = engine.add(sum, &masked);
        }
        self.valid_count = engine.add(&self.valid_count, &flag);
        self.contributions += 1;
    }

    /// Masked sums, one per response component.
    pub fn sums(&self) -> &[S] {
        &self.sums
    }

    /// Secret number of responses whose flag was 1.
    pub fn valid_count(&self) -> &S {
        &self.valid_count
    }

    /// Number of responses folded in, valid or not. This is public information.
    pub fn contributions(&self) -> usize {
        self.contributions
    }

    pub fn width(&self) -> usize {
        self.sums.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{InputShape, LocalEngine, PartyId};
    use crate::form::{MultipleChoiceQuestion, Question};
    use crate::validity::flag_response;

    const REVEALERS: [PartyId; 2] = [PartyId::Analyst, PartyId::Coordinator];

    fn question() -> Question {
        Question::MultipleChoice(MultipleChoiceQuestion {
            id: "00000000".into(),
            question: "Select options".into(),
            required: true,
            options: vec!["a".into(), "b".into(), "c".into()],
            min_selections: None,
            max_selections: Some(2),
        })
    }

    async fn accumulate(rows: &[Vec<i64>], seed: u64) -> (Vec<i128>, i128) {
        let engine = LocalEngine::builder().seed(seed).build().unwrap();
        let question = question();
        let shape = InputShape::new(vec![question.width()]);
        let mut accumulator = MaskedAccumulator::new(&engine, question.width());

        for (party, row) in (2..).zip(rows) {
            let sender = PartyId::Respondent(party);
            engine
                .submit_input(sender, &[row.clone()], &shape)
                .await
                .unwrap();
            let response = engine
                .receive_input(sender, &shape)
                .await
                .unwrap()
                .remove(0);
            let flag = flag_response(&engine, &question, &response);
            accumulator.fold(&engine, &response, flag);
        }
        assert_eq!(accumulator.contributions(), rows.len());

        let sums = engine.open_all(accumulator.sums(), &REVEALERS).await.unwrap();
        let count = engine
            .open(accumulator.valid_count(), &REVEALERS)
            .await
            .unwrap();
        (sums, count)
    }

    #[tokio::test]
    async fn test_invalid_responses_are_masked() {
        let rows = vec![
            vec![1, 0, 1],
            vec![1, 1, 1], // too many selections
            vec![0, 1, 0],
            vec![5, 0, 0], // not boolean
            vec![0, 0, 0], // too few selections
        ];
        let (sums, count) = accumulate(&rows, 21).await;
        assert_eq!(count, 2);
        assert_eq!(sums, vec![1, 1, 1]);
    }

    #[tokio::test]
    async fn test_order_does_not_matter() {
        let rows = vec![vec![1, 0, 0], vec![0, 1, 1], vec![1, 1, 0], vec![1, 1, 1]];
        let mut reversed = rows.clone();
        reversed.reverse();

        let forward = accumulate(&rows, 22).await;
        let backward = accumulate(&reversed, 23).await;
        assert_eq!(forward, backward);
        assert_eq!(forward, (vec![2, 2, 1], 3));
    }

    #[test]
    fn test_empty_accumulator() {
        let engine = LocalEngine::builder().seed(24).build().unwrap();
        let accumulator = MaskedAccumulator::new(&engine, 4);
        assert_eq!(accumulator.width(), 4);
        assert_eq!(accumulator.contributions(), 0);
    }
}
