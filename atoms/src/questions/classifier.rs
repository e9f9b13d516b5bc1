use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::model::{
    AnswerOption, FreeFormQuestion, MultipleChoiceQuestion, NumericAnswer, Question, RawOption,
    RawQuestion, TestCase,
};

/// Result of classifying a raw question list.
#[derive(Debug, Clone, Default)]
pub struct Classification {
    pub questions: Vec<Question>,
    pub entities: EntitySummary,
    /// How many payloads matched no kind and were dropped.
    pub dropped: usize,
}

/// Which question kinds an assessment contains, plus the multiple-choice
/// topics observed. Stored on the header so list views need no batch reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EntitySummary {
    pub kinds: Vec<String>,
    pub topics: Vec<String>,
}

/// Classify a raw question list into the normalized union.
///
/// First match wins: usable answer options make a multiple-choice question,
/// otherwise non-blank starter code makes a free-form one. Payloads matching
/// neither are logged and dropped; they never reach a batch.
pub fn classify_questions(raw: &[RawQuestion]) -> Classification {
    let mut questions = Vec::with_capacity(raw.len());
    let mut kinds = BTreeSet::new();
    let mut topics = BTreeSet::new();
    let mut dropped = 0;

    for (position, payload) in raw.iter().enumerate() {
        let number = payload.question_number.unwrap_or(position as u32 + 1);
        match classify_one(payload, number) {
            Some(question) => {
                kinds.insert(question.kind().label().to_string());
                if let Question::MultipleChoice(q) = &question {
                    if let Some(topic) = q.topic.as_deref() {
                        topics.insert(topic.to_string());
                    }
                }
                questions.push(question);
            }
            None => {
                dropped += 1;
                warn!(
                    question = number,
                    "question has neither answer options nor starter code, dropping"
                );
            }
        }
    }

    Classification {
        questions,
        entities: EntitySummary {
            kinds: kinds.into_iter().collect(),
            topics: topics.into_iter().collect(),
        },
        dropped,
    }
}

fn classify_one(payload: &RawQuestion, number: u32) -> Option<Question> {
    let prompt = payload.question.clone().unwrap_or_default();
    let points = payload.points.unwrap_or(1.0);
    let difficulty = clean(&payload.difficulty).unwrap_or_else(|| "medium".to_string());

    if has_usable_options(&payload.options) {
        return Some(Question::MultipleChoice(MultipleChoiceQuestion {
            number,
            prompt,
            points,
            difficulty,
            topic: clean(&payload.topic),
            options: letter_options(&payload.options),
            correct_answers: normalize_correct_answers(payload.correct_answer.as_ref()),
            numeric: numeric_answer(payload),
        }));
    }

    let starter_code = payload.starter_code.clone().unwrap_or_default();
    if !starter_code.trim().is_empty() {
        return Some(Question::FreeForm(FreeFormQuestion {
            number,
            prompt,
            points,
            difficulty,
            starter_code,
            instructions: clean(&payload.instructions),
            test_cases: payload
                .test_cases
                .iter()
                .map(|case| TestCase {
                    input: case.input.clone().unwrap_or_default(),
                    expected_output: case.expected_output.clone().unwrap_or_default(),
                })
                .collect(),
        }));
    }

    None
}

fn has_usable_options(options: &[RawOption]) -> bool {
    options.iter().any(|option| !option.text().trim().is_empty())
}

fn letter_options(raw: &[RawOption]) -> Vec<AnswerOption> {
    raw.iter()
        .enumerate()
        .map(|(index, option)| AnswerOption {
            label: option
                .label()
                .map(str::trim)
                .filter(|label| !label.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| option_letter(index)),
            text: option.text().to_string(),
        })
        .collect()
}

/// A, B, ..., Z, AA, AB, ... for options beyond the alphabet.
fn option_letter(index: usize) -> String {
    let mut label = String::new();
    let mut n = index;
    loop {
        label.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    label
}

fn normalize_correct_answers(answer: Option<&Value>) -> Vec<String> {
    match answer {
        Some(Value::String(s)) => {
            let label = s.trim();
            if label.is_empty() {
                Vec::new()
            } else {
                vec![label.to_string()]
            }
        }
        Some(Value::Array(values)) => values.iter().filter_map(answer_label).collect(),
        Some(Value::Number(n)) => vec![n.to_string()],
        _ => Vec::new(),
    }
}

fn answer_label(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let label = s.trim();
            (!label.is_empty()).then(|| label.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn numeric_answer(payload: &RawQuestion) -> Option<NumericAnswer> {
    let is_numeric = payload
        .answer_type
        .as_deref()
        .is_some_and(|t| t.eq_ignore_ascii_case("numeric"));
    if !is_numeric {
        return None;
    }
    Some(NumericAnswer {
        min: payload.tolerance_min.unwrap_or(0.0),
        max: payload.tolerance_max.unwrap_or(0.0),
        unit: clean(&payload.unit),
    })
}

fn clean(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
