//! CRUD orchestration for assessments and their question batches.

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};

use examdesk_atoms::assessments::model::{
    batch_key_prefix, header_sort_key, Assessment, AssessmentWithQuestions, BatchRecord,
    CreateAssessmentPayload, UpdateAssessmentPayload, ALL_DEPARTMENTS, BATCH_MARKER,
    SORT_KEY_PREFIX,
};
use examdesk_atoms::config::EngineConfig;
use examdesk_atoms::error::{EngineError, EngineResult};
use examdesk_atoms::questions::classifier::{classify_questions, Classification};
use examdesk_atoms::questions::model::{Question, RawQuestion};
use examdesk_atoms::questions::partition::partition_questions;
use examdesk_atoms::store::{
    from_item, item_sort_key, to_item, DynamoStore, Item, RecordStore, StoreError,
};
use examdesk_atoms::tenancy::TenantKey;

use crate::allocator;
use crate::merge;

/// Assessment storage engine over a record store.
///
/// Owns the header record and keeps it consistent with its question
/// batches. All writes carry the caller's tenant partition key; nothing
/// here ever reads or writes across tenants.
pub struct AssessmentRepository<S: RecordStore> {
    store: S,
    config: EngineConfig,
}

/// Filters for list queries. Without a tenant the listing falls back to a
/// full-table scan.
#[derive(Debug, Clone, Default)]
pub struct ListFilters {
    pub tenant: Option<TenantKey>,
    pub department: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPage {
    pub items: Vec<Assessment>,
    pub next_cursor: Option<String>,
}

/// What happened to each batch while deleting an assessment.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteReport {
    pub assessment_id: String,
    pub batches: Vec<BatchDeleteOutcome>,
}

impl DeleteReport {
    pub fn fully_deleted(&self) -> bool {
        self.batches
            .iter()
            .all(|b| matches!(b.outcome, DeleteOutcome::Deleted))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDeleteOutcome {
    pub sort_key: String,
    pub outcome: DeleteOutcome,
}

#[derive(Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DeleteOutcome {
    Deleted,
    Failed(String),
}

impl AssessmentRepository<DynamoStore> {
    /// Production construction: a DynamoDB client from ambient AWS
    /// configuration, pointed at the configured table.
    pub async fn from_env(config: EngineConfig) -> Self {
        let store = DynamoStore::from_env(config.table_name.clone()).await;
        Self::new(store, config)
    }
}

impl<S: RecordStore> AssessmentRepository<S> {
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self { store, config }
    }

    /// Create an assessment with a freshly allocated id.
    ///
    /// The header is written first so a matching header exists for any
    /// batch a concurrent reader can see. Unclassifiable questions are
    /// dropped (and logged); they do not fail the create.
    pub async fn create_assessment(
        &self,
        tenant: &TenantKey,
        payload: CreateAssessmentPayload,
        caller: &str,
    ) -> EngineResult<AssessmentWithQuestions> {
        if payload.title.trim().is_empty() {
            return Err(EngineError::Validation(
                "assessment title must not be empty".to_string(),
            ));
        }

        let Classification {
            questions,
            entities,
            dropped,
        } = classify_questions(&payload.questions);
        if dropped > 0 {
            warn!(dropped, "create request contained unclassifiable questions");
        }
        let batches = partition_questions(&questions);

        let code = allocator::subject_code(payload.target.department.as_deref());
        let mut configuration = payload.configuration.apply_to(Default::default());
        if configuration.total_questions == 0 {
            configuration.total_questions = questions.len() as u32;
        }

        let mut assessment = Assessment {
            assessment_id: String::new(),
            title: payload.title.trim().to_string(),
            description: payload.description,
            difficulty: payload.difficulty,
            categories: payload.categories,
            configuration,
            scheduling: payload.scheduling,
            target: payload.target.apply_to(Default::default()),
            entities,
            status: payload.status.unwrap_or_else(|| "draft".to_string()),
            is_published: payload.is_published,
            created_by: caller.to_string(),
            created_at: Utc::now().to_rfc3339(),
            updated_by: None,
            updated_at: None,
        };

        // Optimistic allocation: propose max+1 for the scope, then let the
        // conditional header write catch concurrent creators and retry
        // with the next number.
        let mut sequence = allocator::next_sequence(&self.store, tenant, &code).await?;
        let mut attempts = 0;
        loop {
            attempts += 1;
            if attempts > self.config.id_retry_limit {
                return Err(EngineError::AllocationExhausted {
                    scope: format!("{}/{}", tenant, code),
                    attempts: self.config.id_retry_limit,
                });
            }

            assessment.assessment_id = allocator::format_assessment_id(&code, sequence);
            let item = to_item(&assessment, tenant.as_str(), &assessment.sort_key())?;
            match self.store.put_new(item).await {
                Ok(()) => break,
                Err(StoreError::ConditionFailed { .. }) => {
                    sequence += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        for batch in &batches {
            let record = BatchRecord::from_batch(
                &assessment.assessment_id,
                &assessment.target.department,
                batch,
            );
            let item = to_item(&record, tenant.as_str(), &record.sort_key())?;
            self.store.put(item).await?;
        }

        info!(
            assessment_id = %assessment.assessment_id,
            batches = batches.len(),
            "created assessment"
        );

        Ok(AssessmentWithQuestions {
            assessment,
            questions,
        })
    }

    /// Point lookup on the exact header key. Absent headers are a value,
    /// not an error.
    pub async fn get_assessment_by_id(
        &self,
        tenant: &TenantKey,
        assessment_id: &str,
    ) -> EngineResult<Option<Assessment>> {
        let item = self
            .store
            .get(tenant.as_str(), &header_sort_key(assessment_id))
            .await?;
        match item {
            Some(item) => Ok(Some(from_item(&item)?)),
            None => Ok(None),
        }
    }

    /// Header plus its merged question list. Fails fast when the header is
    /// missing; batches are never fetched for a nonexistent assessment.
    pub async fn get_assessment_with_questions(
        &self,
        tenant: &TenantKey,
        assessment_id: &str,
    ) -> EngineResult<AssessmentWithQuestions> {
        let assessment = self
            .get_assessment_by_id(tenant, assessment_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(assessment_id.to_string()))?;
        let questions = merge::load_assessment_questions(&self.store, tenant, assessment_id).await?;
        Ok(AssessmentWithQuestions {
            assessment,
            questions,
        })
    }

    /// Ordered question list of an existing assessment.
    pub async fn get_assessment_questions(
        &self,
        tenant: &TenantKey,
        assessment_id: &str,
    ) -> EngineResult<Vec<Question>> {
        if self
            .get_assessment_by_id(tenant, assessment_id)
            .await?
            .is_none()
        {
            return Err(EngineError::NotFound(assessment_id.to_string()));
        }
        merge::load_assessment_questions(&self.store, tenant, assessment_id).await
    }

    /// List headers, tenant-scoped when possible, scanning otherwise.
    ///
    /// Batch items are filtered out so only headers come back. The
    /// department filter is exact-match and never matches the
    /// "All Departments" sentinel, not even for itself.
    pub async fn list_assessments(
        &self,
        filters: &ListFilters,
        page_size: i32,
        cursor: Option<&str>,
    ) -> EngineResult<ListPage> {
        let limit = if page_size > 0 {
            page_size
        } else {
            self.config.default_page_size
        };

        let page = match &filters.tenant {
            Some(tenant) => {
                self.store
                    .query_page(tenant.as_str(), SORT_KEY_PREFIX, limit, cursor)
                    .await?
            }
            None => self.store.scan_page(limit, cursor).await?,
        };

        let mut items = Vec::new();
        for item in &page.items {
            let Some(sk) = item_sort_key(item) else {
                continue;
            };
            if !sk.starts_with(SORT_KEY_PREFIX) || sk.contains(BATCH_MARKER) {
                continue;
            }

            let assessment: Assessment = match from_item(item) {
                Ok(assessment) => assessment,
                Err(e) => {
                    warn!(sort_key = sk, error = %e, "skipping undecodable header");
                    continue;
                }
            };

            if let Some(status) = &filters.status {
                if assessment.status != *status {
                    continue;
                }
            }
            if let Some(department) = &filters.department {
                if assessment.target.department == ALL_DEPARTMENTS
                    || assessment.target.department != *department
                {
                    continue;
                }
            }

            items.push(assessment);
        }

        Ok(ListPage {
            items,
            next_cursor: page.next_cursor,
        })
    }

    /// Apply a partial update to an assessment.
    ///
    /// Id, keys, and creation audit fields are immutable. When the payload
    /// carries a question list, every existing batch is deleted before the
    /// new set is written; a concurrent reader can observe zero questions
    /// inside that window, since the store has no multi-item transaction
    /// to close it. The header's `entities` summary is refreshed in a
    /// follow-up write once the new batches are in place.
    pub async fn update_assessment(
        &self,
        tenant: &TenantKey,
        assessment_id: &str,
        payload: UpdateAssessmentPayload,
        caller: &str,
    ) -> EngineResult<AssessmentWithQuestions> {
        let current = self
            .get_assessment_by_id(tenant, assessment_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(assessment_id.to_string()))?;

        let mut changes = Item::new();
        if let Some(title) = &payload.title {
            if title.trim().is_empty() {
                return Err(EngineError::Validation(
                    "assessment title must not be empty".to_string(),
                ));
            }
            set_field(&mut changes, "title", &title.trim())?;
        }
        if let Some(description) = &payload.description {
            set_field(&mut changes, "description", description)?;
        }
        if let Some(difficulty) = &payload.difficulty {
            set_field(&mut changes, "difficulty", difficulty)?;
        }
        if let Some(categories) = &payload.categories {
            set_field(&mut changes, "categories", categories)?;
        }
        if let Some(configuration) = &payload.configuration {
            set_field(
                &mut changes,
                "configuration",
                &configuration.apply_to(current.configuration.clone()),
            )?;
        }
        if let Some(scheduling) = &payload.scheduling {
            set_field(&mut changes, "scheduling", scheduling)?;
        }
        let target = payload
            .target
            .as_ref()
            .map(|t| t.apply_to(current.target.clone()))
            .unwrap_or_else(|| current.target.clone());
        if payload.target.is_some() {
            set_field(&mut changes, "target", &target)?;
        }
        if let Some(status) = &payload.status {
            set_field(&mut changes, "status", status)?;
        }
        if let Some(is_published) = payload.is_published {
            set_field(&mut changes, "isPublished", &is_published)?;
        }
        set_field(&mut changes, "updatedBy", &caller)?;
        set_field(&mut changes, "updatedAt", &Utc::now().to_rfc3339())?;

        match self
            .store
            .update(tenant.as_str(), &header_sort_key(assessment_id), changes)
            .await
        {
            Ok(()) => {}
            Err(StoreError::ConditionFailed { .. }) => {
                return Err(EngineError::NotFound(assessment_id.to_string()))
            }
            Err(e) => return Err(e.into()),
        }

        if let Some(raw_questions) = &payload.questions {
            self.replace_question_batches(tenant, assessment_id, raw_questions, &target.department)
                .await?;
        }

        self.get_assessment_with_questions(tenant, assessment_id)
            .await
    }

    /// Delete the header, then every batch under its prefix.
    ///
    /// Batch deletes are best effort: a failed one is logged and recorded
    /// in the report, and the loop keeps going. A leftover batch stays
    /// findable under the assessment's sort-key prefix for a later sweep.
    pub async fn delete_assessment(
        &self,
        tenant: &TenantKey,
        assessment_id: &str,
    ) -> EngineResult<DeleteReport> {
        if self
            .get_assessment_by_id(tenant, assessment_id)
            .await?
            .is_none()
        {
            return Err(EngineError::NotFound(assessment_id.to_string()));
        }

        self.store
            .delete(tenant.as_str(), &header_sort_key(assessment_id))
            .await?;

        let batch_items = self
            .store
            .query_prefix(tenant.as_str(), &batch_key_prefix(assessment_id))
            .await?;

        let mut batches = Vec::new();
        for item in &batch_items {
            let Some(sk) = item_sort_key(item) else {
                continue;
            };
            let outcome = match self.store.delete(tenant.as_str(), sk).await {
                Ok(()) => DeleteOutcome::Deleted,
                Err(e) => {
                    error!(
                        assessment_id,
                        sort_key = sk,
                        error = %e,
                        "failed to delete question batch"
                    );
                    DeleteOutcome::Failed(e.to_string())
                }
            };
            batches.push(BatchDeleteOutcome {
                sort_key: sk.to_string(),
                outcome,
            });
        }

        info!(assessment_id, batches = batches.len(), "deleted assessment");
        Ok(DeleteReport {
            assessment_id: assessment_id.to_string(),
            batches,
        })
    }

    async fn replace_question_batches(
        &self,
        tenant: &TenantKey,
        assessment_id: &str,
        raw: &[RawQuestion],
        department: &str,
    ) -> EngineResult<()> {
        let Classification {
            questions,
            entities,
            dropped,
        } = classify_questions(raw);
        if dropped > 0 {
            warn!(
                assessment_id,
                dropped, "update contained unclassifiable questions"
            );
        }

        // Stale batches must never survive next to new ones, so the whole
        // prefix is cleared before anything is written.
        let existing = self
            .store
            .query_prefix(tenant.as_str(), &batch_key_prefix(assessment_id))
            .await?;
        for item in &existing {
            if let Some(sk) = item_sort_key(item) {
                self.store.delete(tenant.as_str(), sk).await?;
            }
        }

        for batch in &partition_questions(&questions) {
            let record = BatchRecord::from_batch(assessment_id, department, batch);
            let item = to_item(&record, tenant.as_str(), &record.sort_key())?;
            self.store.put(item).await?;
        }

        let mut summary = Item::new();
        set_field(&mut summary, "entities", &entities)?;
        self.store
            .update(tenant.as_str(), &header_sort_key(assessment_id), summary)
            .await?;
        Ok(())
    }
}

fn set_field<T: Serialize>(
    changes: &mut Item,
    field: &str,
    value: &T,
) -> Result<(), serde_json::Error> {
    changes.insert(field.to_string(), serde_json::to_value(value)?);
    Ok(())
}
