use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw question payload as submitted by callers.
///
/// This is the loose shape coming off the wire; nothing here is trusted.
/// The classifier is the only conversion boundary into [`Question`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawQuestion {
    pub question_number: Option<u32>,
    pub question: Option<String>,
    pub points: Option<f64>,
    pub difficulty: Option<String>,
    pub topic: Option<String>,

    pub options: Vec<RawOption>,
    /// A single option label ("B") or a list of them.
    pub correct_answer: Option<Value>,
    pub answer_type: Option<String>,
    pub tolerance_min: Option<f64>,
    pub tolerance_max: Option<f64>,
    pub unit: Option<String>,

    pub starter_code: Option<String>,
    pub instructions: Option<String>,
    pub test_cases: Vec<RawTestCase>,
}

/// Options arrive either as bare strings or as labeled objects.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawOption {
    Text(String),
    Labeled {
        #[serde(default)]
        label: Option<String>,
        #[serde(default)]
        text: Option<String>,
    },
}

impl RawOption {
    pub fn text(&self) -> &str {
        match self {
            RawOption::Text(text) => text,
            RawOption::Labeled { text, .. } => text.as_deref().unwrap_or(""),
        }
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            RawOption::Text(_) => None,
            RawOption::Labeled { label, .. } => label.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawTestCase {
    pub input: Option<String>,
    #[serde(alias = "expected", alias = "output")]
    pub expected_output: Option<String>,
}

/// A classified question, always stored inside a question batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Question {
    #[serde(rename = "multipleChoice")]
    MultipleChoice(MultipleChoiceQuestion),
    #[serde(rename = "freeForm")]
    FreeForm(FreeFormQuestion),
}

impl Question {
    pub fn kind(&self) -> QuestionKind {
        match self {
            Question::MultipleChoice(_) => QuestionKind::MultipleChoice,
            Question::FreeForm(_) => QuestionKind::FreeForm,
        }
    }

    /// Ordinal position within the assessment.
    pub fn number(&self) -> u32 {
        match self {
            Question::MultipleChoice(q) => q.number,
            Question::FreeForm(q) => q.number,
        }
    }

    pub fn prompt(&self) -> &str {
        match self {
            Question::MultipleChoice(q) => &q.prompt,
            Question::FreeForm(q) => &q.prompt,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuestionKind {
    MultipleChoice,
    FreeForm,
}

impl QuestionKind {
    /// Token used inside batch sort keys, e.g. `MCQ_BATCH_2`.
    pub fn batch_token(&self) -> &'static str {
        match self {
            QuestionKind::MultipleChoice => "MCQ",
            QuestionKind::FreeForm => "CODING",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            QuestionKind::MultipleChoice => "multiple-choice",
            QuestionKind::FreeForm => "free-form",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultipleChoiceQuestion {
    pub number: u32,
    pub prompt: String,
    pub points: f64,
    pub difficulty: String,
    #[serde(default)]
    pub topic: Option<String>,
    pub options: Vec<AnswerOption>,
    /// Labels of the correct options; single answers become a one-element list.
    pub correct_answers: Vec<String>,
    /// Present when the question expects a numeric answer within a tolerance.
    #[serde(default)]
    pub numeric: Option<NumericAnswer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOption {
    pub label: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumericAnswer {
    pub min: f64,
    pub max: f64,
    #[serde(default)]
    pub unit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeFormQuestion {
    pub number: u32,
    pub prompt: String,
    pub points: f64,
    pub difficulty: String,
    pub starter_code: String,
    #[serde(default)]
    pub instructions: Option<String>,
    /// Each case carries the same implicit weight.
    pub test_cases: Vec<TestCase>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub input: String,
    pub expected_output: String,
}
