use std::sync::Arc;

use tracing::info;

use super::IssuanceError;
use crate::workflows::registry::{ExamRecord, RegistryRepository, StudentId};

/// Get-or-create of a student's exam record.
pub struct ExamRecordMaterializer<R: ?Sized> {
    repository: Arc<R>,
}

impl<R> ExamRecordMaterializer<R>
where
    R: RegistryRepository + ?Sized,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Return the student's exam record, creating it from the catalog subjects for
    /// their semester and department on first use. Creation goes through an atomic
    /// insert-if-absent, so concurrent first requests converge on one record.
    pub fn materialize(&self, student_id: &StudentId) -> Result<ExamRecord, IssuanceError> {
        if let Some(existing) = self.repository.exam_record_for(student_id)? {
            return Ok(existing);
        }

        let student = self
            .repository
            .student(student_id)?
            .ok_or(IssuanceError::StudentNotFound(*student_id))?;

        let subjects = self
            .repository
            .subjects_for(student.semester.as_deref(), student.department.as_deref())?;
        if subjects.is_empty() {
            return Err(IssuanceError::NoSubjects(*student_id));
        }

        let candidate = ExamRecord::new(
            *student_id,
            subjects.into_iter().map(|subject| subject.id).collect(),
        );
        let stored = self.repository.insert_exam_record_if_absent(candidate)?;
        info!(%student_id, subjects = stored.subjects.len(), "exam record materialized");
        Ok(stored)
    }
}
