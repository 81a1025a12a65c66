//! Survey form model
//!
//! A [`Form`] is created once by the analyst and is read-only for the lifetime of a
//! computation. Uniqueness of question ids and `max_selections <= options.len()` are
//! checked before a form reaches this crate.

use serde::{Deserialize, Serialize};

use crate::engine::InputShape;

/// A survey form: a title and an ordered list of questions.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Form {
    pub title: String,
    pub questions: Vec<Question>,
}

impl Form {
    pub fn new(title: impl Into<String>, questions: Vec<Question>) -> Self {
        Self {
            title: title.into(),
            questions,
        }
    }

    /// Number of secret-shared entries each respondent submits per question, in form order.
    pub fn input_shape(&self) -> InputShape {
        InputShape::new(self.questions.iter().map(Question::width).collect())
    }

    /// Looks up a question by id.
    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id() == id)
    }
}

/// A question with its validity constraints.
///
/// Serialized with a `type` tag of `numerical`, `single_choice` or `multiple_choice`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Question {
    Numerical(NumericalQuestion),
    SingleChoice(SingleChoiceQuestion),
    MultipleChoice(MultipleChoiceQuestion),
}

impl Question {
    pub fn id(&self) -> &str {
        match self {
            Question::Numerical(q) => &q.id,
            Question::SingleChoice(q) => &q.id,
            Question::MultipleChoice(q) => &q.id,
        }
    }

    pub fn required(&self) -> bool {
        match self {
            Question::Numerical(q) => q.required,
            Question::SingleChoice(q) => q.required,
            Question::MultipleChoice(q) => q.required,
        }
    }

    /// Length of the response vector for this question.
    pub fn width(&self) -> usize {
        match self {
            Question::Numerical(_) => 1,
            Question::SingleChoice(q) => q.options.len(),
            Question::MultipleChoice(q) => q.options.len(),
        }
    }
}

/// Free numeric answer with optional inclusive bounds.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NumericalQuestion {
    pub id: String,
    pub question: String,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
}

impl NumericalQuestion {
    /// Lower bound enforced under secret sharing.
    ///
    /// A `min` of zero or below is not enforced.
    pub fn effective_min(&self) -> Option<i64> {
        self.min.filter(|min| *min > 0)
    }
}

/// Exactly one option must be selected.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SingleChoiceQuestion {
    pub id: String,
    pub question: String,
    #[serde(default)]
    pub required: bool,
    pub options: Vec<String>,
}

/// Any number of options within `[min_selections, max_selections]` may be selected.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MultipleChoiceQuestion {
    pub id: String,
    pub question: String,
    #[serde(default)]
    pub required: bool,
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_selections: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_selections: Option<usize>,
}

impl MultipleChoiceQuestion {
    /// Selection bounds with defaults applied: at least one, at most every option.
    pub fn selection_bounds(&self) -> (usize, usize) {
        (
            self.min_selections.unwrap_or(1),
            self.max_selections.unwrap_or(self.options.len()),
        )
    }
}
