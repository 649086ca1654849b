use super::domain::{
    ArrearSnapshot, AttendanceSnapshot, ExamRecord, NewStudent, NewSubject, Student, StudentId,
    Subject, SubjectId, WipeSummary,
};

/// Outcome of a roster insert under the registration-number-or-email uniqueness rule.
#[derive(Debug, Clone, PartialEq)]
pub enum StudentInsert {
    Inserted(Student),
    Duplicate,
}

/// Shared backing store consumed by ingestion and issuance.
///
/// Every method is one transactional unit: multi-write effects (current-state
/// update plus audit snapshot) either both land or neither does.
pub trait RegistryRepository: Send + Sync {
    /// Insert unless a student already holds the registration number or email.
    fn insert_student_if_unique(&self, student: NewStudent)
        -> Result<StudentInsert, RepositoryError>;

    /// Replace the matching student's arrear codes and append the snapshot.
    /// Returns whether a student matched.
    fn record_arrears(&self, snapshot: ArrearSnapshot) -> Result<bool, RepositoryError>;

    /// Overwrite the matching student's attendance and fees flag and append the snapshot.
    /// Returns whether a student matched.
    fn record_attendance(&self, snapshot: AttendanceSnapshot) -> Result<bool, RepositoryError>;

    /// Insert unless the subject code is already cataloged. Returns whether it was inserted.
    fn insert_subject_if_absent(&self, subject: NewSubject) -> Result<bool, RepositoryError>;

    fn student(&self, id: &StudentId) -> Result<Option<Student>, RepositoryError>;
    fn student_by_registration(
        &self,
        registration_number: &str,
    ) -> Result<Option<Student>, RepositoryError>;

    /// Catalog subjects for a semester/department pair, in catalog order.
    fn subjects_for(
        &self,
        semester: Option<&str>,
        department: Option<&str>,
    ) -> Result<Vec<Subject>, RepositoryError>;
    fn subjects_by_ids(&self, ids: &[SubjectId]) -> Result<Vec<Subject>, RepositoryError>;
    /// Exact code matches, each subject once, ordered by the first position of its code in `codes`.
    fn subjects_by_codes(&self, codes: &[String]) -> Result<Vec<Subject>, RepositoryError>;

    fn arrear_snapshots(
        &self,
        registration_number: &str,
    ) -> Result<Vec<ArrearSnapshot>, RepositoryError>;
    fn attendance_snapshots(
        &self,
        registration_number: &str,
    ) -> Result<Vec<AttendanceSnapshot>, RepositoryError>;

    fn exam_record_for(&self, student_id: &StudentId)
        -> Result<Option<ExamRecord>, RepositoryError>;
    /// Atomic insert-if-absent. Returns whichever record is stored for the student afterwards.
    fn insert_exam_record_if_absent(
        &self,
        record: ExamRecord,
    ) -> Result<ExamRecord, RepositoryError>;

    /// Remove every student, snapshot, subject and exam record.
    fn wipe(&self) -> Result<WipeSummary, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
