//! Student, subject catalog and audit snapshot storage shared by ingestion and issuance.

pub mod domain;
pub mod memory;
pub mod repository;

pub use domain::{
    ArrearSnapshot, AttendanceSnapshot, ExamRecord, ExamRecordId, NewStudent, NewSubject,
    Student, StudentId, Subject, SubjectId, WipeSummary,
};
pub use memory::InMemoryRegistry;
pub use repository::{RegistryRepository, RepositoryError, StudentInsert};
