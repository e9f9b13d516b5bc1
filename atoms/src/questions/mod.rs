pub mod classifier;
pub mod model;
pub mod partition;

pub use classifier::{classify_questions, Classification, EntitySummary};
pub use model::{Question, QuestionKind, RawQuestion};
pub use partition::{partition_questions, QuestionBatch, QUESTIONS_PER_BATCH};
