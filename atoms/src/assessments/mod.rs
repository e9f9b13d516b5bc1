pub mod model;

pub use model::{
    Assessment, AssessmentWithQuestions, BatchRecord, CreateAssessmentPayload,
    UpdateAssessmentPayload,
};
