//! Assessment storage engine: identifier allocation, question batching,
//! and batch-consistent CRUD over the record store.

pub mod allocator;
pub mod merge;
pub mod repository;

pub use repository::{
    AssessmentRepository, BatchDeleteOutcome, DeleteOutcome, DeleteReport, ListFilters, ListPage,
};
