//! Read-side inverse of the question partitioner: fetch every batch of an
//! assessment and flatten it back into one ordered question list.

use tracing::warn;

use examdesk_atoms::assessments::model::{batch_key_prefix, BatchRecord};
use examdesk_atoms::error::EngineResult;
use examdesk_atoms::questions::model::Question;
use examdesk_atoms::store::{from_item, item_partition_key, RecordStore};
use examdesk_atoms::tenancy::TenantKey;

/// Load and flatten every question batch of one assessment, sorted by
/// question ordinal. An assessment with no batches yields an empty list.
pub async fn load_assessment_questions<S: RecordStore>(
    store: &S,
    tenant: &TenantKey,
    assessment_id: &str,
) -> EngineResult<Vec<Question>> {
    let prefix = batch_key_prefix(assessment_id);
    let items = store.query_prefix(tenant.as_str(), &prefix).await?;

    let mut questions = Vec::new();
    for item in &items {
        // A prefix match must never leak another tenant's questions, even
        // out of a misconfigured store.
        match item_partition_key(item) {
            Some(pk) if pk == tenant.as_str() => {}
            other => {
                warn!(
                    assessment_id,
                    partition = ?other,
                    "skipping question batch with foreign partition key"
                );
                continue;
            }
        }

        match from_item::<BatchRecord>(item) {
            Ok(batch) => questions.extend(batch.questions),
            Err(e) => {
                warn!(assessment_id, error = %e, "skipping undecodable question batch");
            }
        }
    }

    questions.sort_by_key(|q| q.number());
    Ok(questions)
}
