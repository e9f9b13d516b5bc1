use serde::{Deserialize, Serialize};

use crate::questions::classifier::EntitySummary;
use crate::questions::model::{Question, RawQuestion};
use crate::questions::partition::QuestionBatch;

/// Sort-key prefix shared by headers and their batches.
pub const SORT_KEY_PREFIX: &str = "ASSESSMENT#";
/// Substring distinguishing batch sort keys from header sort keys.
pub const BATCH_MARKER: &str = "_BATCH_";
/// Sentinel department meaning "no department restriction".
pub const ALL_DEPARTMENTS: &str = "All Departments";

/// `ASSESSMENT#<id>`
pub fn header_sort_key(assessment_id: &str) -> String {
    format!("{}{}", SORT_KEY_PREFIX, assessment_id)
}

/// `ASSESSMENT#<id>#` matches every batch of one assessment and nothing else.
pub fn batch_key_prefix(assessment_id: &str) -> String {
    format!("{}{}#", SORT_KEY_PREFIX, assessment_id)
}

/// One assessment's metadata record, excluding its questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub assessment_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub difficulty: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub configuration: AssessmentConfiguration,
    #[serde(default)]
    pub scheduling: Schedule,
    #[serde(default)]
    pub target: TargetAudience,
    #[serde(default)]
    pub entities: EntitySummary,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_by: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Assessment {
    pub fn sort_key(&self) -> String {
        header_sort_key(&self.assessment_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssessmentConfiguration {
    pub duration_minutes: u32,
    pub max_attempts: u32,
    pub passing_score: f64,
    pub randomize_questions: bool,
    /// Declared by the caller; defaults to the classified count on create.
    pub total_questions: u32,
}

impl Default for AssessmentConfiguration {
    fn default() -> Self {
        Self {
            duration_minutes: 60,
            max_attempts: 1,
            passing_score: 50.0,
            randomize_questions: false,
            total_questions: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Schedule {
    pub start_at: Option<String>,
    pub end_at: Option<String>,
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TargetAudience {
    pub department: String,
    pub years: Vec<u32>,
}

impl Default for TargetAudience {
    fn default() -> Self {
        Self {
            department: ALL_DEPARTMENTS.to_string(),
            years: Vec::new(),
        }
    }
}

/// Header merged with its full, ordered question list.
#[derive(Debug, Clone, Serialize)]
pub struct AssessmentWithQuestions {
    #[serde(flatten)]
    pub assessment: Assessment,
    pub questions: Vec<Question>,
}

/// One stored group of up to 50 questions of a single kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRecord {
    pub assessment_id: String,
    /// e.g. `MCQ_BATCH_2`
    pub entity_type: String,
    /// Copy of the owning header's target department.
    #[serde(default)]
    pub department: String,
    pub questions: Vec<Question>,
}

impl BatchRecord {
    pub fn from_batch(assessment_id: &str, department: &str, batch: &QuestionBatch) -> Self {
        Self {
            assessment_id: assessment_id.to_string(),
            entity_type: batch.tag(),
            department: department.to_string(),
            questions: batch.questions.clone(),
        }
    }

    /// `ASSESSMENT#<id>#<KIND>_BATCH_<n>`
    pub fn sort_key(&self) -> String {
        format!("{}{}", batch_key_prefix(&self.assessment_id), self.entity_type)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateAssessmentPayload {
    pub title: String,
    pub description: String,
    pub difficulty: String,
    pub categories: Vec<String>,
    pub configuration: ConfigurationPayload,
    pub scheduling: Schedule,
    pub target: TargetPayload,
    pub status: Option<String>,
    pub is_published: bool,
    pub questions: Vec<RawQuestion>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateAssessmentPayload {
    pub title: Option<String>,
    pub description: Option<String>,
    pub difficulty: Option<String>,
    pub categories: Option<Vec<String>>,
    pub configuration: Option<ConfigurationPayload>,
    pub scheduling: Option<Schedule>,
    pub target: Option<TargetPayload>,
    pub status: Option<String>,
    pub is_published: Option<bool>,
    /// Full replacement for the stored question set when present.
    pub questions: Option<Vec<RawQuestion>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigurationPayload {
    pub duration_minutes: Option<u32>,
    pub max_attempts: Option<u32>,
    pub passing_score: Option<f64>,
    pub randomize_questions: Option<bool>,
    pub total_questions: Option<u32>,
}

impl ConfigurationPayload {
    /// Resolve against current values, keeping anything not supplied.
    pub fn apply_to(&self, mut current: AssessmentConfiguration) -> AssessmentConfiguration {
        if let Some(v) = self.duration_minutes {
            current.duration_minutes = v;
        }
        if let Some(v) = self.max_attempts {
            current.max_attempts = v;
        }
        if let Some(v) = self.passing_score {
            current.passing_score = v;
        }
        if let Some(v) = self.randomize_questions {
            current.randomize_questions = v;
        }
        if let Some(v) = self.total_questions {
            current.total_questions = v;
        }
        current
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TargetPayload {
    pub department: Option<String>,
    pub years: Option<Vec<u32>>,
}

impl TargetPayload {
    pub fn apply_to(&self, mut current: TargetAudience) -> TargetAudience {
        if let Some(department) = &self.department {
            current.department = department.clone();
        }
        if let Some(years) = &self.years {
            current.years = years.clone();
        }
        current
    }
}
