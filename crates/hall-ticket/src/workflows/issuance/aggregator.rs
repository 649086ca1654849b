use std::sync::Arc;

use serde::Serialize;

use super::IssuanceError;
use crate::workflows::registry::{ExamRecord, RegistryRepository, Subject};

/// Shown for subjects whose exam has no configured schedule.
pub const UNSCHEDULED: &str = "Not Scheduled";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SubjectKind {
    Regular,
    Arrear,
}

impl SubjectKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Regular => "Regular",
            Self::Arrear => "Arrear",
        }
    }
}

/// One line of the hall ticket's subject table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedSubject {
    pub name: String,
    pub code: String,
    pub exam_schedule: String,
    #[serde(rename = "type")]
    pub kind: SubjectKind,
}

impl AggregatedSubject {
    fn from_subject(subject: Subject, kind: SubjectKind) -> Self {
        Self {
            name: subject.name.unwrap_or_default(),
            code: subject.code,
            exam_schedule: subject
                .exam_schedule
                .filter(|schedule| !schedule.trim().is_empty())
                .unwrap_or_else(|| UNSCHEDULED.to_string()),
            kind,
        }
    }
}

/// Merges regular subjects from the exam record with catalog matches for arrear codes.
pub struct SubjectAggregator<R: ?Sized> {
    repository: Arc<R>,
}

impl<R> SubjectAggregator<R>
where
    R: RegistryRepository + ?Sized,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Regular subjects first, then arrears, each group in its own order. A code
    /// present in both groups appears twice.
    pub fn aggregate(
        &self,
        record: &ExamRecord,
        arrear_codes: &[String],
    ) -> Result<Vec<AggregatedSubject>, IssuanceError> {
        let regular = self.repository.subjects_by_ids(&record.subjects)?;
        let arrears = if arrear_codes.is_empty() {
            Vec::new()
        } else {
            self.repository.subjects_by_codes(arrear_codes)?
        };

        if regular.is_empty() && arrears.is_empty() {
            return Err(IssuanceError::NoSubjects(record.student_id));
        }

        Ok(regular
            .into_iter()
            .map(|subject| AggregatedSubject::from_subject(subject, SubjectKind::Regular))
            .chain(
                arrears
                    .into_iter()
                    .map(|subject| AggregatedSubject::from_subject(subject, SubjectKind::Arrear)),
            )
            .collect())
    }
}
