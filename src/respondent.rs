//! Respondent side: answer encoding and local checks before sharing
//!
//! The checks here only spare an honest respondent a wasted submission. The aggregation
//! protocol does not trust them and re-validates every response under secret sharing.

use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::engine::{PartyId, SecretEngine};
use crate::error::RespondentError;
use crate::form::{Form, MultipleChoiceQuestion, NumericalQuestion, Question, SingleChoiceQuestion};
use crate::security::SensitiveInputs;

/// One answer, as typed by a respondent.
///
/// Deserializes from a bare number or an array of 0/1 selections.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum Answer {
    Number(i64),
    Selection(Vec<i64>),
}

/// Answers keyed by question id.
pub type Answers = HashMap<String, Answer>;

/// Plaintext input matrix, one row per question in form order.
pub type InputMatrix = SensitiveInputs;

/// Packs `answers` into the matrix submitted for `form`.
///
/// Unanswered optional questions become all-zero rows. Answers to ids the form does not
/// contain are ignored.
///
/// # Errors
/// Returns the first local check that fails, in form order.
pub fn encode_answers(form: &Form, answers: &Answers) -> Result<InputMatrix, RespondentError> {
    let mut rows = Vec::with_capacity(form.questions.len());
    for question in &form.questions {
        let row = match answers.get(question.id()) {
            None if question.required() => {
                return Err(RespondentError::MissingAnswer(question.id().to_string()))
            }
            None => vec![0; question.width()],
            Some(answer) => encode_answer(question, answer)?,
        };
        rows.push(row);
    }
    Ok(SensitiveInputs::new(rows))
}

fn encode_answer(question: &Question, answer: &Answer) -> Result<Vec<i64>, RespondentError> {
    match (question, answer) {
        (Question::Numerical(q), Answer::Number(value)) => encode_number(q, *value),
        (Question::SingleChoice(q), Answer::Selection(entries)) => {
            encode_single_choice(q, entries)
        }
        (Question::MultipleChoice(q), Answer::Selection(entries)) => {
            encode_multiple_choice(q, entries)
        }
        _ => Err(RespondentError::WrongKind(question.id().to_string())),
    }
}

fn encode_number(question: &NumericalQuestion, value: i64) -> Result<Vec<i64>, RespondentError> {
    let below = question.min.is_some_and(|min| value < min);
    let above = question.max.is_some_and(|max| value > max);
    if below || above {
        return Err(RespondentError::OutOfRange {
            question: question.id.clone(),
            value,
        });
    }
    Ok(vec![value])
}

/// Checks length and 0/1 entries; returns the number of selected options.
fn check_selection(id: &str, options: usize, entries: &[i64]) -> Result<usize, RespondentError> {
    if entries.len() != options {
        return Err(RespondentError::WrongLength {
            question: id.to_string(),
            expected: options,
            found: entries.len(),
        });
    }
    if entries.iter().any(|e| *e != 0 && *e != 1) {
        return Err(RespondentError::NotBoolean(id.to_string()));
    }
    Ok(entries.iter().filter(|e| **e == 1).count())
}

fn encode_single_choice(
    question: &SingleChoiceQuestion,
    entries: &[i64],
) -> Result<Vec<i64>, RespondentError> {
    let selected = check_selection(&question.id, question.options.len(), entries)?;
    if selected == 0 && question.required {
        return Err(RespondentError::MissingAnswer(question.id.clone()));
    }
    if selected > 1 {
        return Err(RespondentError::SelectionCount {
            question: question.id.clone(),
            min: 1,
            max: 1,
            found: selected,
        });
    }
    Ok(entries.to_vec())
}

fn encode_multiple_choice(
    question: &MultipleChoiceQuestion,
    entries: &[i64],
) -> Result<Vec<i64>, RespondentError> {
    let selected = check_selection(&question.id, question.options.len(), entries)?;
    if selected == 0 && !question.required {
        return Ok(entries.to_vec());
    }
    let (min, max) = question.selection_bounds();
    if selected < min || selected > max {
        return Err(RespondentError::SelectionCount {
            question: question.id.clone(),
            min,
            max,
            found: selected,
        });
    }
    Ok(entries.to_vec())
}

/// Encodes `answers` and shares them with the holders on behalf of `sender`.
///
/// The plaintext matrix is wiped once the engine has taken its shares.
pub async fn submit<E: SecretEngine>(
    engine: &E,
    sender: PartyId,
    form: &Form,
    answers: &Answers,
) -> Result<(), RespondentError> {
    let inputs = encode_answers(form, answers)?;
    engine
        .submit_input(sender, inputs.expose_secret(), &form.input_shape())
        .await?;
    debug!("{} submitted answers to {} questions", sender, inputs.len());
    Ok(())
}

/// A random answer set that passes every check of `form`.
pub fn random_answers<R: Rng>(form: &Form, rng: &mut R) -> Answers {
    form.questions
        .iter()
        .map(|question| {
            let answer = match question {
                Question::Numerical(q) => {
                    let low = q.min.unwrap_or(0).min(q.max.unwrap_or(i64::MAX));
                    let high = q.max.unwrap_or(low.saturating_add(100)).max(low);
                    Answer::Number(rng.random_range(low..=high))
                }
                Question::SingleChoice(q) => {
                    let mut entries = vec![0; q.options.len()];
                    if !entries.is_empty() {
                        entries[rng.random_range(0..q.options.len())] = 1;
                    }
                    Answer::Selection(entries)
                }
                Question::MultipleChoice(q) => {
                    let (min, max) = q.selection_bounds();
                    let max = max.min(q.options.len());
                    let count = rng.random_range(min.min(max)..=max);
                    let mut entries = vec![0; q.options.len()];
                    for i in index::sample(rng, q.options.len(), count) {
                        entries[i] = 1;
                    }
                    Answer::Selection(entries)
                }
            };
            (question.id().to_string(), answer)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{InputShape, LocalEngine};
    use crate::error::EngineError;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn form() -> Form {
        let json = r#"{
            "title": "Team survey",
            "questions": [
                {"type": "numerical", "id": "age", "question": "Age?", "required": true, "min": 18, "max": 99},
                {"type": "single_choice", "id": "team", "question": "Team?", "required": true,
                 "options": ["red", "green", "blue"]},
                {"type": "multiple_choice", "id": "tools", "question": "Tools?", "required": false,
                 "options": ["vim", "emacs", "ide", "other"], "minSelections": 1, "maxSelections": 2}
            ]
        }"#;
        serde_json::from_str(json).unwrap()
    }

    fn answers(pairs: &[(&str, Answer)]) -> Answers {
        pairs
            .iter()
            .map(|(id, answer)| (id.to_string(), answer.clone()))
            .collect()
    }

    #[test]
    fn test_answers_from_json() {
        let parsed: Answers = serde_json::from_str(r#"{"age": 30, "team": [0, 1, 0]}"#).unwrap();
        assert_eq!(parsed["age"], Answer::Number(30));
        assert_eq!(parsed["team"], Answer::Selection(vec![0, 1, 0]));
    }

    #[test]
    fn test_encode_in_form_order() {
        let form = form();
        let encoded = encode_answers(
            &form,
            &answers(&[
                ("tools", Answer::Selection(vec![1, 0, 1, 0])),
                ("team", Answer::Selection(vec![0, 0, 1])),
                ("age", Answer::Number(42)),
            ]),
        )
        .unwrap();
        assert_eq!(
            encoded.expose_secret(),
            &[vec![42], vec![0, 0, 1], vec![1, 0, 1, 0]]
        );
        assert!(form.input_shape().check(encoded.expose_secret()).is_ok());
    }

    #[test]
    fn test_optional_question_encodes_as_zeros() {
        let encoded = encode_answers(
            &form(),
            &answers(&[
                ("age", Answer::Number(18)),
                ("team", Answer::Selection(vec![1, 0, 0])),
            ]),
        )
        .unwrap();
        assert_eq!(encoded.expose_secret()[2], vec![0, 0, 0, 0]);
    }

    #[test]
    fn test_local_checks() {
        let form = form();
        let base = || {
            answers(&[
                ("age", Answer::Number(30)),
                ("team", Answer::Selection(vec![1, 0, 0])),
            ])
        };
        let with = |id: &str, answer: Answer| {
            let mut a = base();
            a.insert(id.to_string(), answer);
            encode_answers(&form, &a).unwrap_err()
        };

        let mut missing = base();
        missing.remove("age");
        assert_eq!(
            encode_answers(&form, &missing).unwrap_err(),
            RespondentError::MissingAnswer("age".into())
        );
        assert_eq!(
            with("age", Answer::Number(120)),
            RespondentError::OutOfRange {
                question: "age".into(),
                value: 120
            }
        );
        assert_eq!(
            with("age", Answer::Selection(vec![1])),
            RespondentError::WrongKind("age".into())
        );
        assert_eq!(
            with("team", Answer::Selection(vec![1, 0])),
            RespondentError::WrongLength {
                question: "team".into(),
                expected: 3,
                found: 2
            }
        );
        assert_eq!(
            with("team", Answer::Selection(vec![0, 2, 0])),
            RespondentError::NotBoolean("team".into())
        );
        assert_eq!(
            with("team", Answer::Selection(vec![0, 0, 0])),
            RespondentError::MissingAnswer("team".into())
        );
        assert_eq!(
            with("team", Answer::Selection(vec![1, 1, 0])),
            RespondentError::SelectionCount {
                question: "team".into(),
                min: 1,
                max: 1,
                found: 2
            }
        );
        assert_eq!(
            with("tools", Answer::Selection(vec![1, 1, 1, 0])),
            RespondentError::SelectionCount {
                question: "tools".into(),
                min: 1,
                max: 2,
                found: 3
            }
        );
    }

    #[test]
    fn test_random_answers_pass_checks() {
        let form = form();
        let mut rng = StdRng::seed_from_u64(51);
        for _ in 0..50 {
            let answers = random_answers(&form, &mut rng);
            assert!(encode_answers(&form, &answers).is_ok());
        }
    }

    #[tokio::test]
    async fn test_submit_shares_once() {
        let form = form();
        let engine = LocalEngine::builder().seed(52).build().unwrap();
        let sender = PartyId::Respondent(2);
        let answers = answers(&[
            ("age", Answer::Number(30)),
            ("team", Answer::Selection(vec![0, 1, 0])),
        ]);

        submit(&engine, sender, &form, &answers).await.unwrap();
        assert_eq!(
            submit(&engine, sender, &form, &answers).await,
            Err(RespondentError::Engine(EngineError::DuplicateSubmission(
                sender
            )))
        );

        let rows = engine
            .receive_input(sender, &form.input_shape())
            .await
            .unwrap();
        let shape: Vec<usize> = rows.iter().map(Vec::len).collect();
        assert_eq!(InputShape::new(shape), form.input_shape());
        let opened = engine
            .open_all(&rows[1], &[PartyId::Analyst])
            .await
            .unwrap();
        assert_eq!(opened, vec![0, 1, 0]);
    }
}
