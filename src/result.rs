//! Per-question aggregate results
//!
//! These are the only values the protocol ever discloses. When a cohort is not
//! sufficient the aggregate is reported as zero and the underlying value is never opened.

use serde::{Deserialize, Serialize};

/// Result for one question, serialized as
/// `{type, sufficient, numValidResponses, sum|counts}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AggregateResult {
    Numerical(NumericalResult),
    SingleChoice(ChoiceResult),
    MultipleChoice(ChoiceResult),
}

impl AggregateResult {
    pub fn sufficient(&self) -> bool {
        match self {
            AggregateResult::Numerical(r) => r.sufficient,
            AggregateResult::SingleChoice(r) | AggregateResult::MultipleChoice(r) => r.sufficient,
        }
    }

    pub fn num_valid_responses(&self) -> u64 {
        match self {
            AggregateResult::Numerical(r) => r.num_valid_responses,
            AggregateResult::SingleChoice(r) | AggregateResult::MultipleChoice(r) => {
                r.num_valid_responses
            }
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NumericalResult {
    pub sufficient: bool,
    pub num_valid_responses: u64,
    pub sum: i128,
}

/// Per-option counts, shared by single and multiple choice questions.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceResult {
    pub sufficient: bool,
    pub num_valid_responses: u64,
    pub counts: Vec<i128>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_result_json_shape() {
        let results = vec![
            AggregateResult::Numerical(NumericalResult {
                sufficient: true,
                num_valid_responses: 3,
                sum: 13,
            }),
            AggregateResult::MultipleChoice(ChoiceResult {
                sufficient: false,
                num_valid_responses: 0,
                counts: vec![0, 0, 0],
            }),
        ];

        let value = serde_json::to_value(&results).unwrap();
        assert_eq!(
            value,
            json!([
                {"type": "numerical", "sufficient": true, "numValidResponses": 3, "sum": 13},
                {"type": "multiple_choice", "sufficient": false, "numValidResponses": 0, "counts": [0, 0, 0]}
            ])
        );

        let back: Vec<AggregateResult> = serde_json::from_value(value).unwrap();
        assert_eq!(back, results);
        assert!(back[0].sufficient());
        assert_eq!(back[1].num_valid_responses(), 0);
    }
}
