//! Human-readable assessment id allocation.
//!
//! Ids have the form `ASSESS_<CODE>_<NNN>`, scoped to one tenant and one
//! subject code. Allocation is optimistic: this module proposes the next
//! free number from what is currently stored, and the repository's
//! conditional header write catches concurrent creators.

use examdesk_atoms::assessments::model::SORT_KEY_PREFIX;
use examdesk_atoms::error::EngineResult;
use examdesk_atoms::store::{item_sort_key, RecordStore};
use examdesk_atoms::tenancy::TenantKey;

/// Department names with an established subject code. Anything else falls
/// back to the first three letters of the name.
const KNOWN_DEPARTMENTS: &[(&str, &str)] = &[
    ("computer science", "CSE"),
    ("computer science and engineering", "CSE"),
    ("information technology", "IT"),
    ("electronics", "ECE"),
    ("electronics and communication", "ECE"),
    ("electrical", "EEE"),
    ("electrical and electronics", "EEE"),
    ("mechanical", "MECH"),
    ("mechanical engineering", "MECH"),
    ("civil", "CIVIL"),
    ("civil engineering", "CIVIL"),
    ("mathematics", "MATH"),
    ("physics", "PHY"),
    ("chemistry", "CHEM"),
];

/// Subject code for a free-text department name. `GEN` when absent.
pub fn subject_code(department: Option<&str>) -> String {
    let department = department.map(str::trim).unwrap_or("");
    if department.is_empty() {
        return "GEN".to_string();
    }

    let normalized = department.to_lowercase();
    if let Some((_, code)) = KNOWN_DEPARTMENTS
        .iter()
        .find(|(name, _)| *name == normalized)
    {
        return (*code).to_string();
    }

    let letters: String = department
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .take(3)
        .collect::<String>()
        .to_uppercase();
    if letters.is_empty() {
        "GEN".to_string()
    } else {
        letters
    }
}

/// `ASSESS_<CODE>_<NNN>`, zero-padded to three digits.
pub fn format_assessment_id(code: &str, sequence: u32) -> String {
    format!("ASSESS_{}_{:03}", code, sequence)
}

/// Numeric suffix of an id in the given code's scope.
/// `ASSESS_CSE_007` with code `CSE` parses to 7; foreign ids parse to None.
pub fn sequence_from_id(assessment_id: &str, code: &str) -> Option<u32> {
    let suffix = assessment_id
        .strip_prefix("ASSESS_")?
        .strip_prefix(code)?
        .strip_prefix('_')?;
    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    suffix.parse().ok()
}

/// Propose the next unused sequence number for (tenant, code).
///
/// Queries every record in the scope, takes the highest numeric suffix and
/// proposes one past it, starting from 1 when the scope is empty. The
/// read is not transactional with the later header write; callers must
/// re-check at write time.
pub async fn next_sequence<S: RecordStore>(
    store: &S,
    tenant: &TenantKey,
    code: &str,
) -> EngineResult<u32> {
    let prefix = format!("{}ASSESS_{}_", SORT_KEY_PREFIX, code);
    let items = store.query_prefix(tenant.as_str(), &prefix).await?;

    let highest = items
        .iter()
        .filter_map(|item| item_sort_key(item))
        .filter_map(|sk| sequence_from_sort_key(sk, code))
        .max()
        .unwrap_or(0);
    Ok(highest + 1)
}

/// Sequence number out of a header or batch sort key.
fn sequence_from_sort_key(sk: &str, code: &str) -> Option<u32> {
    let rest = sk.strip_prefix(SORT_KEY_PREFIX)?;
    let assessment_id = rest.split('#').next().unwrap_or(rest);
    sequence_from_id(assessment_id, code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use examdesk_atoms::store::{to_item, MemoryStore};

    #[test]
    fn known_departments_map_to_their_codes() {
        assert_eq!(subject_code(Some("Computer Science")), "CSE");
        assert_eq!(subject_code(Some("ELECTRONICS")), "ECE");
        assert_eq!(subject_code(Some("Mathematics")), "MATH");
    }

    #[test]
    fn unknown_departments_fall_back_to_first_letters() {
        assert_eq!(subject_code(Some("Biotechnology")), "BIO");
        assert_eq!(subject_code(Some("Fine Arts")), "FIN");
    }

    #[test]
    fn missing_or_unusable_department_yields_gen() {
        assert_eq!(subject_code(None), "GEN");
        assert_eq!(subject_code(Some("   ")), "GEN");
        assert_eq!(subject_code(Some("123")), "GEN");
    }

    #[test]
    fn sequence_parsing_rejects_foreign_shapes() {
        assert_eq!(sequence_from_id("ASSESS_CSE_007", "CSE"), Some(7));
        assert_eq!(sequence_from_id("ASSESS_CSE_120", "CSE"), Some(120));
        assert_eq!(sequence_from_id("ASSESS_ECE_001", "CSE"), None);
        assert_eq!(sequence_from_id("ASSESS_CSE_", "CSE"), None);
        assert_eq!(sequence_from_id("ASSESS_CSE_x1", "CSE"), None);
        assert_eq!(sequence_from_id("QUIZ_CSE_001", "CSE"), None);
    }

    async fn seed_header(store: &MemoryStore, tenant: &TenantKey, sk: &str) {
        let item = to_item(&serde_json::json!({}), tenant.as_str(), sk).unwrap();
        store.put(item).await.unwrap();
    }

    #[tokio::test]
    async fn empty_scope_starts_at_one() {
        let store = MemoryStore::new();
        let tenant = TenantKey::from_domain("acme.edu");
        assert_eq!(next_sequence(&store, &tenant, "CSE").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn proposes_one_past_the_highest_existing_id() {
        let store = MemoryStore::new();
        let tenant = TenantKey::from_domain("acme.edu");
        seed_header(&store, &tenant, "ASSESSMENT#ASSESS_CSE_001").await;
        seed_header(&store, &tenant, "ASSESSMENT#ASSESS_CSE_004").await;
        // Batch items in the scope share the id and must not confuse the max.
        seed_header(&store, &tenant, "ASSESSMENT#ASSESS_CSE_004#MCQ_BATCH_1").await;

        assert_eq!(next_sequence(&store, &tenant, "CSE").await.unwrap(), 5);
    }

    #[tokio::test]
    async fn scopes_are_independent_per_code() {
        let store = MemoryStore::new();
        let tenant = TenantKey::from_domain("acme.edu");
        seed_header(&store, &tenant, "ASSESSMENT#ASSESS_CSE_009").await;

        assert_eq!(next_sequence(&store, &tenant, "ECE").await.unwrap(), 1);
    }
}
