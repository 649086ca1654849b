use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use super::normalizer::{normalize_row, NormalizedRow};
use super::parser::{read_table, SourceFormat};
use super::records::{UploadBatch, UploadKind};
use super::upsert::{apply_batch, UploadSummary};
use super::IngestionError;
use crate::workflows::registry::{RegistryRepository, WipeSummary};
use crate::workflows::transient::{empty_directory, TransientFile};

/// Routes uploaded batches to the strategy for their kind.
pub struct IngestionService<R> {
    repository: Arc<R>,
    upload_dir: PathBuf,
}

impl<R> IngestionService<R>
where
    R: RegistryRepository + 'static,
{
    pub fn new(repository: Arc<R>, upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            repository,
            upload_dir: upload_dir.into(),
        }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    /// Validate, stage, parse and apply one uploaded file. The staged copy is
    /// removed whether or not processing succeeds. Parsing and row application
    /// run on the blocking pool.
    pub async fn ingest_upload(
        &self,
        file_name: &str,
        upload_type: &str,
        bytes: &[u8],
    ) -> Result<UploadSummary, IngestionError> {
        let format = SourceFormat::from_file_name(file_name)?;
        let kind: UploadKind = upload_type.parse()?;

        let staged_path = self
            .upload_dir
            .join(format!("{}.{}", Uuid::new_v4(), format.extension()));
        let staged = TransientFile::write(staged_path, bytes).await?;

        info!(file = %file_name, upload_kind = %kind, "processing upload");
        let repository = self.repository.clone();
        let path = staged.path().to_path_buf();
        tokio::task::spawn_blocking(move || {
            apply_file(repository.as_ref(), &path, format, kind)
        })
        .await?
    }

    /// Parse and apply a file already on disk. The file is left in place.
    pub fn ingest_path(
        &self,
        path: &Path,
        format: SourceFormat,
        kind: UploadKind,
    ) -> Result<UploadSummary, IngestionError> {
        apply_file(self.repository.as_ref(), path, format, kind)
    }

    pub fn ingest_rows(
        &self,
        kind: UploadKind,
        rows: &[NormalizedRow],
    ) -> Result<UploadSummary, IngestionError> {
        apply_rows(self.repository.as_ref(), kind, rows)
    }

    /// Clear the upload directory and every stored collection.
    pub async fn wipe(&self) -> Result<WipeSummary, IngestionError> {
        let cleared = empty_directory(&self.upload_dir).await?;
        let summary = self.repository.wipe()?;
        info!(cleared_files = cleared, ?summary, "registry wiped");
        Ok(summary)
    }
}

fn apply_file<R>(
    repository: &R,
    path: &Path,
    format: SourceFormat,
    kind: UploadKind,
) -> Result<UploadSummary, IngestionError>
where
    R: RegistryRepository + ?Sized,
{
    let rows: Vec<NormalizedRow> = read_table(path, format)?
        .into_iter()
        .map(normalize_row)
        .collect();
    apply_rows(repository, kind, &rows)
}

fn apply_rows<R>(
    repository: &R,
    kind: UploadKind,
    rows: &[NormalizedRow],
) -> Result<UploadSummary, IngestionError>
where
    R: RegistryRepository + ?Sized,
{
    let batch = UploadBatch::from_rows(kind, rows);
    let dropped = rows.len() - batch.len();
    if dropped > 0 {
        warn!(upload_kind = %kind, dropped, "rows missing required fields were ignored");
    }

    let summary = apply_batch(repository, batch)?;
    info!(upload_kind = %kind, rows = rows.len(), ?summary, "upload applied");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::registry::{
        ArrearSnapshot, AttendanceSnapshot, ExamRecord, InMemoryRegistry, NewStudent,
        NewSubject, RepositoryError, Student, StudentId, StudentInsert, Subject, SubjectId,
    };
    use std::sync::Mutex;
    use std::thread::{self, ThreadId};

    /// Delegates to the in-memory registry and remembers which threads inserted students.
    #[derive(Default)]
    struct ThreadTrackingRegistry {
        inner: InMemoryRegistry,
        insert_threads: Mutex<Vec<ThreadId>>,
    }

    impl RegistryRepository for ThreadTrackingRegistry {
        fn insert_student_if_unique(
            &self,
            student: NewStudent,
        ) -> Result<StudentInsert, RepositoryError> {
            self.insert_threads
                .lock()
                .expect("thread log")
                .push(thread::current().id());
            self.inner.insert_student_if_unique(student)
        }
        fn record_arrears(&self, snapshot: ArrearSnapshot) -> Result<bool, RepositoryError> {
            self.inner.record_arrears(snapshot)
        }
        fn record_attendance(&self, snapshot: AttendanceSnapshot) -> Result<bool, RepositoryError> {
            self.inner.record_attendance(snapshot)
        }
        fn insert_subject_if_absent(&self, subject: NewSubject) -> Result<bool, RepositoryError> {
            self.inner.insert_subject_if_absent(subject)
        }
        fn student(&self, id: &StudentId) -> Result<Option<Student>, RepositoryError> {
            self.inner.student(id)
        }
        fn student_by_registration(
            &self,
            registration_number: &str,
        ) -> Result<Option<Student>, RepositoryError> {
            self.inner.student_by_registration(registration_number)
        }
        fn subjects_for(
            &self,
            semester: Option<&str>,
            department: Option<&str>,
        ) -> Result<Vec<Subject>, RepositoryError> {
            self.inner.subjects_for(semester, department)
        }
        fn subjects_by_ids(&self, ids: &[SubjectId]) -> Result<Vec<Subject>, RepositoryError> {
            self.inner.subjects_by_ids(ids)
        }
        fn subjects_by_codes(&self, codes: &[String]) -> Result<Vec<Subject>, RepositoryError> {
            self.inner.subjects_by_codes(codes)
        }
        fn arrear_snapshots(
            &self,
            registration_number: &str,
        ) -> Result<Vec<ArrearSnapshot>, RepositoryError> {
            self.inner.arrear_snapshots(registration_number)
        }
        fn attendance_snapshots(
            &self,
            registration_number: &str,
        ) -> Result<Vec<AttendanceSnapshot>, RepositoryError> {
            self.inner.attendance_snapshots(registration_number)
        }
        fn exam_record_for(
            &self,
            student_id: &StudentId,
        ) -> Result<Option<ExamRecord>, RepositoryError> {
            self.inner.exam_record_for(student_id)
        }
        fn insert_exam_record_if_absent(
            &self,
            record: ExamRecord,
        ) -> Result<ExamRecord, RepositoryError> {
            self.inner.insert_exam_record_if_absent(record)
        }
        fn wipe(&self) -> Result<WipeSummary, RepositoryError> {
            self.inner.wipe()
        }
    }

    fn service(dir: &Path) -> IngestionService<InMemoryRegistry> {
        IngestionService::new(Arc::new(InMemoryRegistry::default()), dir)
    }

    fn staged_files(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
    }

    #[tokio::test]
    async fn csv_upload_is_applied_and_removed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = service(dir.path());

        let summary = service
            .ingest_upload(
                "roster.csv",
                "student_list",
                b"Reg No,Name,Email,Dep,Sem\nR1,Asha,asha@x.edu,CSE,5\nR2,Ravi,ravi@x.edu,CSE,5\n",
            )
            .await
            .expect("upload applies");

        assert_eq!(summary, UploadSummary::Students { inserted: 2, skipped: 0 });
        assert_eq!(staged_files(dir.path()), 0);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn uploaded_rows_are_applied_off_the_runtime_thread() {
        let dir = tempfile::tempdir().expect("tempdir");
        let registry = Arc::new(ThreadTrackingRegistry::default());
        let service = IngestionService::new(registry.clone(), dir.path());

        service
            .ingest_upload("roster.csv", "student_list", b"Reg No,Name\nR1,Asha\nR2,Ravi\n")
            .await
            .expect("upload applies");

        let threads = registry.insert_threads.lock().expect("thread log").clone();
        assert_eq!(threads.len(), 2);
        assert!(threads.iter().all(|id| *id != thread::current().id()));
        assert_eq!(staged_files(dir.path()), 0);
    }

    #[tokio::test]
    async fn unsupported_extension_writes_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = service(dir.path());

        let error = service
            .ingest_upload("roster.txt", "student_list", b"Reg No,Name\nR1,Asha\n")
            .await
            .expect_err("rejected");

        assert!(error.is_validation());
        assert_eq!(staged_files(dir.path()), 0);
        assert!(service
            .repository()
            .student_by_registration("R1")
            .expect("lookup")
            .is_none());
    }

    #[tokio::test]
    async fn unknown_upload_type_is_rejected_before_processing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = service(dir.path());

        let error = service
            .ingest_upload("roster.csv", "timetable", b"Reg No,Name\nR1,Asha\n")
            .await
            .expect_err("rejected");

        assert!(matches!(error, IngestionError::UnknownUploadKind(_)));
        assert_eq!(staged_files(dir.path()), 0);
    }

    #[tokio::test]
    async fn malformed_workbook_still_removes_staged_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = service(dir.path());

        let error = service
            .ingest_upload("roster.xlsx", "student_list", b"definitely not a zip archive")
            .await
            .expect_err("unreadable workbook");

        assert!(matches!(error, IngestionError::Table(_)));
        assert!(!error.is_validation());
        assert_eq!(staged_files(dir.path()), 0);
    }

    #[tokio::test]
    async fn wipe_clears_uploads_and_collections() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = service(dir.path());
        service
            .ingest_upload(
                "subjects.csv",
                "subjectname",
                b"Subject Code,Subject Name,Dept,Sem\nCS501,Compilers,CSE,5\n",
            )
            .await
            .expect("subjects");
        std::fs::write(dir.path().join("leftover.csv"), "x").expect("leftover");

        let summary = service.wipe().await.expect("wipe");
        assert_eq!(summary.subjects, 1);
        assert_eq!(staged_files(dir.path()), 0);
    }
}
