//! Minimum-cohort disclosure gate
//!
//! The count of valid responses is always opened. The masked sums are opened only when
//! at least [`MIN_SUFFICIENT_RESPONSES`] respondents passed validation; below that, a
//! participant who knows their own contribution could recover another respondent's answer
//! by elimination, so the sums stay secret and are reported as zero.

use tracing::{info, warn};

use crate::aggregate::MaskedAccumulator;
use crate::engine::{PartyId, SecretEngine};
use crate::error::EngineError;
use crate::form::Question;
use crate::result::{AggregateResult, ChoiceResult, NumericalResult};

/// Smallest number of valid responses for which an aggregate may be opened.
pub const MIN_SUFFICIENT_RESPONSES: u64 = 3;

/// What the gate decided for one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateOutcome {
    pub sufficient: bool,
    pub num_valid_responses: u64,
    /// Opened sums, or zeros when withheld. One entry per response component.
    pub values: Vec<i128>,
}

impl GateOutcome {
    fn withheld(num_valid_responses: u64, width: usize) -> Self {
        Self {
            sufficient: false,
            num_valid_responses,
            values: vec![0; width],
        }
    }

    /// Typed result for `question`.
    pub fn into_result(self, question: &Question) -> AggregateResult {
        let GateOutcome {
            sufficient,
            num_valid_responses,
            values,
        } = self;
        match question {
            Question::Numerical(_) => AggregateResult::Numerical(NumericalResult {
                sufficient,
                num_valid_responses,
                sum: values.first().copied().unwrap_or(0),
            }),
            Question::SingleChoice(_) => AggregateResult::SingleChoice(ChoiceResult {
                sufficient,
                num_valid_responses,
                counts: values,
            }),
            Question::MultipleChoice(_) => AggregateResult::MultipleChoice(ChoiceResult {
                sufficient,
                num_valid_responses,
                counts: values,
            }),
        }
    }
}

/// Opens the valid count and, if the cohort is large enough, the masked sums.
///
/// # Errors
/// Propagates engine failures from `open`. Small or empty cohorts are not errors.
pub async fn disclose<E: SecretEngine>(
    engine: &E,
    accumulator: &MaskedAccumulator<E::Secret>,
    revealers: &[PartyId],
) -> Result<GateOutcome, EngineError> {
    let width = accumulator.width();
    if accumulator.contributions() == 0 {
        return Ok(GateOutcome::withheld(0, width));
    }

    let opened = engine.open(accumulator.valid_count(), revealers).await?;
    let num_valid_responses = u64::try_from(opened).map_err(|_| EngineError::Overflow)?;

    if num_valid_responses == 0 {
        return Ok(GateOutcome::withheld(0, width));
    }
    if num_valid_responses < MIN_SUFFICIENT_RESPONSES {
        warn!(
            "Only {} valid responses (minimum {}); aggregate withheld",
            num_valid_responses, MIN_SUFFICIENT_RESPONSES
        );
        return Ok(GateOutcome::withheld(num_valid_responses, width));
    }

    let values = engine.open_all(accumulator.sums(), revealers).await?;
    info!("Aggregate over {} valid responses opened", num_valid_responses);
    Ok(GateOutcome {
        sufficient: true,
        num_valid_responses,
        values,
    })
}
