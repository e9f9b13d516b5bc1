mod common;

use std::sync::atomic::{AtomicU32, Ordering};

use assessments_block::{AssessmentRepository, DeleteOutcome};
use examdesk_atoms::assessments::model::UpdateAssessmentPayload;
use examdesk_atoms::config::EngineConfig;
use examdesk_atoms::error::EngineError;
use examdesk_atoms::questions::model::{Question, RawQuestion};
use examdesk_atoms::store::{Item, MemoryStore, Page, RecordStore, StoreError, StoreResult};

use common::{coding_payload, create_payload, mcq_payload, repository};

#[tokio::test]
async fn create_then_read_round_trips() {
    let (repository, _store, tenant) = repository();

    let created = repository
        .create_assessment(
            &tenant,
            create_payload(
                "Midterm",
                Some("Computer Science"),
                vec![
                    mcq_payload("Pick a color", "B"),
                    mcq_payload("Pick another", "A"),
                    coding_payload("Implement solve"),
                ],
            ),
            "dean@acme.edu",
        )
        .await
        .unwrap();

    assert_eq!(created.assessment.assessment_id, "ASSESS_CSE_001");
    assert_eq!(created.assessment.created_by, "dean@acme.edu");
    assert_eq!(created.assessment.configuration.total_questions, 3);
    assert_eq!(created.questions.len(), 3);

    let read = repository
        .get_assessment_with_questions(&tenant, "ASSESS_CSE_001")
        .await
        .unwrap();
    assert_eq!(read.assessment, created.assessment);
    assert_eq!(read.questions, created.questions);
    let numbers: Vec<u32> = read.questions.iter().map(Question::number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
}

#[tokio::test]
async fn reads_are_idempotent() {
    let (repository, _store, tenant) = repository();
    repository
        .create_assessment(
            &tenant,
            create_payload(
                "Quiz",
                Some("Physics"),
                vec![mcq_payload("Q1", "A"), coding_payload("Q2")],
            ),
            "prof@acme.edu",
        )
        .await
        .unwrap();

    let first = repository
        .get_assessment_with_questions(&tenant, "ASSESS_PHY_001")
        .await
        .unwrap();
    let second = repository
        .get_assessment_with_questions(&tenant, "ASSESS_PHY_001")
        .await
        .unwrap();
    assert_eq!(first.assessment, second.assessment);
    assert_eq!(first.questions, second.questions);
}

#[tokio::test]
async fn back_to_back_creates_get_distinct_ids() {
    let (repository, _store, tenant) = repository();

    for expected in ["ASSESS_CSE_001", "ASSESS_CSE_002"] {
        let created = repository
            .create_assessment(
                &tenant,
                create_payload("Quiz", Some("Computer Science"), vec![]),
                "dean@acme.edu",
            )
            .await
            .unwrap();
        assert_eq!(created.assessment.assessment_id, expected);
    }
}

#[tokio::test]
async fn unclassifiable_questions_do_not_fail_the_create() {
    let (repository, _store, tenant) = repository();

    let created = repository
        .create_assessment(
            &tenant,
            create_payload(
                "Quiz",
                Some("Computer Science"),
                vec![
                    mcq_payload("Q1", "A"),
                    RawQuestion {
                        question: Some("neither options nor code".to_string()),
                        ..Default::default()
                    },
                ],
            ),
            "dean@acme.edu",
        )
        .await
        .unwrap();

    assert_eq!(created.questions.len(), 1);
    let read = repository
        .get_assessment_questions(&tenant, "ASSESS_CSE_001")
        .await
        .unwrap();
    assert_eq!(read.len(), 1);
}

#[tokio::test]
async fn update_replaces_the_question_set() {
    let (repository, _store, tenant) = repository();
    repository
        .create_assessment(
            &tenant,
            create_payload(
                "Quiz",
                Some("Computer Science"),
                vec![
                    mcq_payload("Q1", "A"),
                    mcq_payload("Q2", "B"),
                    mcq_payload("Q3", "C"),
                ],
            ),
            "dean@acme.edu",
        )
        .await
        .unwrap();

    let updated = repository
        .update_assessment(
            &tenant,
            "ASSESS_CSE_001",
            UpdateAssessmentPayload {
                questions: Some(vec![coding_payload("Only one now")]),
                ..Default::default()
            },
            "prof@acme.edu",
        )
        .await
        .unwrap();

    assert_eq!(updated.questions.len(), 1);
    assert_eq!(
        updated.assessment.entities.kinds,
        vec!["free-form".to_string()]
    );
    assert_eq!(updated.assessment.updated_by.as_deref(), Some("prof@acme.edu"));

    let read = repository
        .get_assessment_questions(&tenant, "ASSESS_CSE_001")
        .await
        .unwrap();
    assert_eq!(read.len(), 1);
}

#[tokio::test]
async fn update_keeps_immutable_fields_and_untouched_ones() {
    let (repository, _store, tenant) = repository();
    let created = repository
        .create_assessment(
            &tenant,
            create_payload("Original title", Some("Physics"), vec![]),
            "dean@acme.edu",
        )
        .await
        .unwrap();

    let updated = repository
        .update_assessment(
            &tenant,
            "ASSESS_PHY_001",
            UpdateAssessmentPayload {
                description: Some("now with a description".to_string()),
                ..Default::default()
            },
            "prof@acme.edu",
        )
        .await
        .unwrap();

    assert_eq!(updated.assessment.assessment_id, "ASSESS_PHY_001");
    assert_eq!(updated.assessment.title, "Original title");
    assert_eq!(updated.assessment.created_at, created.assessment.created_at);
    assert_eq!(updated.assessment.created_by, "dean@acme.edu");
    assert_eq!(updated.assessment.description, "now with a description");
}

#[tokio::test]
async fn update_of_a_missing_assessment_is_not_found() {
    let (repository, _store, tenant) = repository();
    let result = repository
        .update_assessment(
            &tenant,
            "ASSESS_CSE_404",
            UpdateAssessmentPayload::default(),
            "dean@acme.edu",
        )
        .await;
    assert!(matches!(result, Err(EngineError::NotFound(_))));
}

#[tokio::test]
async fn delete_is_total() {
    let (repository, store, tenant) = repository();
    repository
        .create_assessment(
            &tenant,
            create_payload(
                "Quiz",
                Some("Computer Science"),
                vec![mcq_payload("Q1", "A"), coding_payload("Q2")],
            ),
            "dean@acme.edu",
        )
        .await
        .unwrap();

    let report = repository
        .delete_assessment(&tenant, "ASSESS_CSE_001")
        .await
        .unwrap();
    assert!(report.fully_deleted());
    assert_eq!(report.batches.len(), 2);
    assert!(store.is_empty());

    assert!(repository
        .get_assessment_by_id(&tenant, "ASSESS_CSE_001")
        .await
        .unwrap()
        .is_none());
    assert!(matches!(
        repository
            .get_assessment_questions(&tenant, "ASSESS_CSE_001")
            .await,
        Err(EngineError::NotFound(_))
    ));
}

#[tokio::test]
async fn failed_batch_deletes_are_reported_not_fatal() {
    let (repository, store, tenant) = repository();
    repository
        .create_assessment(
            &tenant,
            create_payload(
                "Quiz",
                Some("Computer Science"),
                vec![mcq_payload("Q1", "A"), coding_payload("Q2")],
            ),
            "dean@acme.edu",
        )
        .await
        .unwrap();

    let stuck = "ASSESSMENT#ASSESS_CSE_001#MCQ_BATCH_1";
    store.fail_next_delete(tenant.as_str(), stuck);

    let report = repository
        .delete_assessment(&tenant, "ASSESS_CSE_001")
        .await
        .unwrap();
    assert!(!report.fully_deleted());

    let failed: Vec<&str> = report
        .batches
        .iter()
        .filter(|b| matches!(b.outcome, DeleteOutcome::Failed(_)))
        .map(|b| b.sort_key.as_str())
        .collect();
    assert_eq!(failed, vec![stuck]);

    // The orphan is still findable under the assessment's prefix.
    assert_eq!(store.len(), 1);
    assert!(repository
        .get_assessment_by_id(&tenant, "ASSESS_CSE_001")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn delete_of_a_missing_assessment_is_not_found() {
    let (repository, _store, tenant) = repository();
    assert!(matches!(
        repository.delete_assessment(&tenant, "ASSESS_CSE_404").await,
        Err(EngineError::NotFound(_))
    ));
}

/// Store double that reports a key collision on the first `fail_times`
/// conditional puts, standing in for concurrent creators racing on the
/// same proposed id.
struct CollidingStore {
    inner: MemoryStore,
    fail_times: AtomicU32,
}

impl CollidingStore {
    fn new(fail_times: u32) -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_times: AtomicU32::new(fail_times),
        }
    }
}

#[async_trait::async_trait]
impl RecordStore for CollidingStore {
    async fn put(&self, item: Item) -> StoreResult<()> {
        self.inner.put(item).await
    }

    async fn put_new(&self, item: Item) -> StoreResult<()> {
        let remaining = self.fail_times.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_times.store(remaining - 1, Ordering::SeqCst);
            return Err(StoreError::ConditionFailed { op: "put_item" });
        }
        self.inner.put_new(item).await
    }

    async fn get(&self, pk: &str, sk: &str) -> StoreResult<Option<Item>> {
        self.inner.get(pk, sk).await
    }

    async fn query_prefix(&self, pk: &str, sk_prefix: &str) -> StoreResult<Vec<Item>> {
        self.inner.query_prefix(pk, sk_prefix).await
    }

    async fn query_page(
        &self,
        pk: &str,
        sk_prefix: &str,
        limit: i32,
        cursor: Option<&str>,
    ) -> StoreResult<Page> {
        self.inner.query_page(pk, sk_prefix, limit, cursor).await
    }

    async fn scan_page(&self, limit: i32, cursor: Option<&str>) -> StoreResult<Page> {
        self.inner.scan_page(limit, cursor).await
    }

    async fn update(&self, pk: &str, sk: &str, changes: Item) -> StoreResult<()> {
        self.inner.update(pk, sk, changes).await
    }

    async fn delete(&self, pk: &str, sk: &str) -> StoreResult<()> {
        self.inner.delete(pk, sk).await
    }
}

#[tokio::test]
async fn id_collisions_are_retried_with_the_next_number() {
    let tenant = examdesk_atoms::tenancy::TenantKey::from_domain("acme.edu");
    let repository = AssessmentRepository::new(
        CollidingStore::new(2),
        EngineConfig::new("examdesk-test"),
    );

    let created = repository
        .create_assessment(
            &tenant,
            create_payload("Quiz", Some("Computer Science"), vec![]),
            "dean@acme.edu",
        )
        .await
        .unwrap();

    // Two collisions on 001 and 002, so the create lands on 003.
    assert_eq!(created.assessment.assessment_id, "ASSESS_CSE_003");
}

#[tokio::test]
async fn exhausted_allocation_is_a_typed_error() {
    let tenant = examdesk_atoms::tenancy::TenantKey::from_domain("acme.edu");
    let mut config = EngineConfig::new("examdesk-test");
    config.id_retry_limit = 3;
    let repository = AssessmentRepository::new(CollidingStore::new(u32::MAX), config);

    let result = repository
        .create_assessment(
            &tenant,
            create_payload("Quiz", Some("Computer Science"), vec![]),
            "dean@acme.edu",
        )
        .await;

    assert!(matches!(
        result,
        Err(EngineError::AllocationExhausted { attempts: 3, .. })
    ));
}
