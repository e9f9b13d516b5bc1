use super::model::{Question, QuestionKind};

/// Upper bound on questions per stored batch. A conservative proxy for the
/// store's per-item payload ceiling at realistic question sizes.
pub const QUESTIONS_PER_BATCH: usize = 50;

/// Up to [`QUESTIONS_PER_BATCH`] questions of one kind, destined for a
/// single stored item.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionBatch {
    pub kind: QuestionKind,
    /// 1-based, numbered independently per kind.
    pub index: u32,
    pub questions: Vec<Question>,
}

impl QuestionBatch {
    /// Tag stored on the batch record and used in its sort key,
    /// e.g. `MCQ_BATCH_2`.
    pub fn tag(&self) -> String {
        format!("{}_BATCH_{}", self.kind.batch_token(), self.index)
    }
}

/// Split a classified question list into per-kind batches, preserving the
/// original relative order within each kind.
pub fn partition_questions(questions: &[Question]) -> Vec<QuestionBatch> {
    let mut batches = Vec::new();
    for kind in [QuestionKind::MultipleChoice, QuestionKind::FreeForm] {
        let of_kind: Vec<Question> = questions
            .iter()
            .filter(|q| q.kind() == kind)
            .cloned()
            .collect();
        for (index, chunk) in of_kind.chunks(QUESTIONS_PER_BATCH).enumerate() {
            batches.push(QuestionBatch {
                kind,
                index: index as u32 + 1,
                questions: chunk.to_vec(),
            });
        }
    }
    batches
}
