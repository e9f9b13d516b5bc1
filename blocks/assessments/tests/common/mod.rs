#![allow(dead_code)]

use assessments_block::AssessmentRepository;
use examdesk_atoms::assessments::model::{CreateAssessmentPayload, TargetPayload};
use examdesk_atoms::config::EngineConfig;
use examdesk_atoms::questions::model::{RawOption, RawQuestion, RawTestCase};
use examdesk_atoms::store::MemoryStore;
use examdesk_atoms::tenancy::TenantKey;

pub fn repository() -> (AssessmentRepository<MemoryStore>, MemoryStore, TenantKey) {
    let store = MemoryStore::new();
    let repository = AssessmentRepository::new(store.clone(), EngineConfig::new("examdesk-test"));
    (repository, store, TenantKey::from_domain("acme.edu"))
}

pub fn mcq_payload(prompt: &str, correct: &str) -> RawQuestion {
    RawQuestion {
        question: Some(prompt.to_string()),
        options: vec![
            RawOption::Text("red".to_string()),
            RawOption::Text("green".to_string()),
            RawOption::Text("blue".to_string()),
        ],
        correct_answer: Some(serde_json::Value::String(correct.to_string())),
        ..Default::default()
    }
}

pub fn coding_payload(prompt: &str) -> RawQuestion {
    RawQuestion {
        question: Some(prompt.to_string()),
        starter_code: Some("def solve(): pass".to_string()),
        test_cases: vec![RawTestCase {
            input: Some("1 2".to_string()),
            expected_output: Some("3".to_string()),
        }],
        ..Default::default()
    }
}

pub fn create_payload(
    title: &str,
    department: Option<&str>,
    questions: Vec<RawQuestion>,
) -> CreateAssessmentPayload {
    CreateAssessmentPayload {
        title: title.to_string(),
        target: TargetPayload {
            department: department.map(str::to_string),
            years: None,
        },
        questions,
        ..Default::default()
    }
}
