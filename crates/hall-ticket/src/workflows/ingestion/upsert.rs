use chrono::Utc;
use serde::Serialize;
use tracing::debug;

use super::records::{ArrearRow, AttendanceRow, StudentRow, SubjectRow, UploadBatch};
use crate::workflows::registry::{
    ArrearSnapshot, AttendanceSnapshot, NewStudent, NewSubject, RegistryRepository,
    RepositoryError, StudentInsert,
};

/// Per-batch counters. Serialized without a tag so each kind keeps its own shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum UploadSummary {
    Students { inserted: usize, skipped: usize },
    Arrears { inserted: usize },
    Subjects { inserted: usize, skipped: usize },
    Attendance { inserted: usize, updated: usize },
}

/// Apply every row of `batch`, strictly in order, with the strategy for its kind.
pub fn apply_batch<R>(repository: &R, batch: UploadBatch) -> Result<UploadSummary, RepositoryError>
where
    R: RegistryRepository + ?Sized,
{
    match batch {
        UploadBatch::Students(rows) => upsert_students(repository, rows),
        UploadBatch::Arrears(rows) => record_arrears(repository, rows),
        UploadBatch::Subjects(rows) => upsert_subjects(repository, rows),
        UploadBatch::Attendance(rows) => record_attendance(repository, rows),
    }
}

fn upsert_students<R>(repository: &R, rows: Vec<StudentRow>) -> Result<UploadSummary, RepositoryError>
where
    R: RegistryRepository + ?Sized,
{
    let (mut inserted, mut skipped) = (0, 0);
    for row in rows {
        let registration_number = row.registration_number.clone();
        let candidate = NewStudent {
            registration_number: row.registration_number,
            name: row.name,
            email: row.email,
            department: row.department,
            semester: row.semester,
        };
        match repository.insert_student_if_unique(candidate)? {
            StudentInsert::Inserted(_) => inserted += 1,
            StudentInsert::Duplicate => {
                debug!(%registration_number, "student already registered");
                skipped += 1;
            }
        }
    }
    Ok(UploadSummary::Students { inserted, skipped })
}

fn record_arrears<R>(repository: &R, rows: Vec<ArrearRow>) -> Result<UploadSummary, RepositoryError>
where
    R: RegistryRepository + ?Sized,
{
    let mut inserted = 0;
    for row in rows {
        let snapshot = ArrearSnapshot {
            registration_number: row.registration_number,
            name: row.name,
            department: row.department,
            semester: row.semester,
            arrears: row.codes,
            recorded_at: Utc::now(),
        };
        let registration_number = snapshot.registration_number.clone();
        if !repository.record_arrears(snapshot)? {
            debug!(%registration_number, "arrear row matched no student");
        }
        inserted += 1;
    }
    Ok(UploadSummary::Arrears { inserted })
}

fn upsert_subjects<R>(repository: &R, rows: Vec<SubjectRow>) -> Result<UploadSummary, RepositoryError>
where
    R: RegistryRepository + ?Sized,
{
    let (mut inserted, mut skipped) = (0, 0);
    for row in rows {
        let candidate = NewSubject {
            code: row.code,
            name: row.name,
            department: row.department,
            semester: row.semester,
            exam_schedule: row.exam_schedule,
            cost: row.cost,
        };
        if repository.insert_subject_if_absent(candidate)? {
            inserted += 1;
        } else {
            skipped += 1;
        }
    }
    Ok(UploadSummary::Subjects { inserted, skipped })
}

fn record_attendance<R>(
    repository: &R,
    rows: Vec<AttendanceRow>,
) -> Result<UploadSummary, RepositoryError>
where
    R: RegistryRepository + ?Sized,
{
    let (mut inserted, mut updated) = (0, 0);
    for row in rows {
        let snapshot = AttendanceSnapshot {
            registration_number: row.registration_number,
            name: row.name,
            department: row.department,
            semester: row.semester,
            email: row.email,
            percentage: row.percentage,
            fees_paid: row.fees_paid,
            recorded_at: Utc::now(),
        };
        if repository.record_attendance(snapshot)? {
            updated += 1;
        }
        inserted += 1;
    }
    Ok(UploadSummary::Attendance { inserted, updated })
}
