use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;

use super::domain::{
    ArrearSnapshot, AttendanceSnapshot, ExamRecord, NewStudent, NewSubject, Student, StudentId,
    Subject, SubjectId, WipeSummary,
};
use super::repository::{RegistryRepository, RepositoryError, StudentInsert};

#[derive(Debug, Default)]
struct Collections {
    students: Vec<Student>,
    subjects: Vec<Subject>,
    arrears: Vec<ArrearSnapshot>,
    attendance: Vec<AttendanceSnapshot>,
    exam_records: HashMap<StudentId, ExamRecord>,
}

/// Process-local registry. A single mutex guards every collection, so each
/// trait method executes as one critical section.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    inner: Mutex<Collections>,
}

impl InMemoryRegistry {
    fn lock(&self) -> Result<MutexGuard<'_, Collections>, RepositoryError> {
        self.inner
            .lock()
            .map_err(|_| RepositoryError::Unavailable("registry mutex poisoned".to_string()))
    }
}

impl RegistryRepository for InMemoryRegistry {
    fn insert_student_if_unique(
        &self,
        student: NewStudent,
    ) -> Result<StudentInsert, RepositoryError> {
        let mut guard = self.lock()?;
        let duplicate = guard.students.iter().any(|existing| {
            existing.registration_number == student.registration_number
                || matches!(
                    (&existing.email, &student.email),
                    (Some(current), Some(candidate)) if current == candidate
                )
        });
        if duplicate {
            return Ok(StudentInsert::Duplicate);
        }

        let stored = student.into_student(Utc::now());
        guard.students.push(stored.clone());
        Ok(StudentInsert::Inserted(stored))
    }

    fn record_arrears(&self, snapshot: ArrearSnapshot) -> Result<bool, RepositoryError> {
        let mut guard = self.lock()?;
        let mut matched = false;
        for student in guard
            .students
            .iter_mut()
            .filter(|student| student.registration_number == snapshot.registration_number)
        {
            student.arrears = snapshot.arrears.clone();
            matched = true;
        }
        guard.arrears.push(snapshot);
        Ok(matched)
    }

    fn record_attendance(&self, snapshot: AttendanceSnapshot) -> Result<bool, RepositoryError> {
        let mut guard = self.lock()?;
        let mut matched = false;
        for student in guard
            .students
            .iter_mut()
            .filter(|student| student.registration_number == snapshot.registration_number)
        {
            if let Some(percentage) = snapshot.percentage {
                student.attendance = percentage;
            }
            student.fees_paid = snapshot.fees_paid;
            matched = true;
        }
        guard.attendance.push(snapshot);
        Ok(matched)
    }

    fn insert_subject_if_absent(&self, subject: NewSubject) -> Result<bool, RepositoryError> {
        let mut guard = self.lock()?;
        if guard.subjects.iter().any(|existing| existing.code == subject.code) {
            return Ok(false);
        }
        guard.subjects.push(subject.into_subject(Utc::now()));
        Ok(true)
    }

    fn student(&self, id: &StudentId) -> Result<Option<Student>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard.students.iter().find(|student| &student.id == id).cloned())
    }

    fn student_by_registration(
        &self,
        registration_number: &str,
    ) -> Result<Option<Student>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard
            .students
            .iter()
            .find(|student| student.registration_number == registration_number)
            .cloned())
    }

    fn subjects_for(
        &self,
        semester: Option<&str>,
        department: Option<&str>,
    ) -> Result<Vec<Subject>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard
            .subjects
            .iter()
            .filter(|subject| {
                subject.semester.as_deref() == semester
                    && subject.department.as_deref() == department
            })
            .cloned()
            .collect())
    }

    fn subjects_by_ids(&self, ids: &[SubjectId]) -> Result<Vec<Subject>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard
            .subjects
            .iter()
            .filter(|subject| ids.contains(&subject.id))
            .cloned()
            .collect())
    }

    fn subjects_by_codes(&self, codes: &[String]) -> Result<Vec<Subject>, RepositoryError> {
        let guard = self.lock()?;
        let mut matched: Vec<Subject> = Vec::new();
        for code in codes {
            if matched.iter().any(|subject| &subject.code == code) {
                continue;
            }
            if let Some(subject) = guard.subjects.iter().find(|subject| &subject.code == code) {
                matched.push(subject.clone());
            }
        }
        Ok(matched)
    }

    fn arrear_snapshots(
        &self,
        registration_number: &str,
    ) -> Result<Vec<ArrearSnapshot>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard
            .arrears
            .iter()
            .filter(|snapshot| snapshot.registration_number == registration_number)
            .cloned()
            .collect())
    }

    fn attendance_snapshots(
        &self,
        registration_number: &str,
    ) -> Result<Vec<AttendanceSnapshot>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard
            .attendance
            .iter()
            .filter(|snapshot| snapshot.registration_number == registration_number)
            .cloned()
            .collect())
    }

    fn exam_record_for(
        &self,
        student_id: &StudentId,
    ) -> Result<Option<ExamRecord>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard.exam_records.get(student_id).cloned())
    }

    fn insert_exam_record_if_absent(
        &self,
        record: ExamRecord,
    ) -> Result<ExamRecord, RepositoryError> {
        let mut guard = self.lock()?;
        let stored = guard
            .exam_records
            .entry(record.student_id)
            .or_insert(record);
        Ok(stored.clone())
    }

    fn wipe(&self) -> Result<WipeSummary, RepositoryError> {
        let mut guard = self.lock()?;
        let summary = WipeSummary {
            students: guard.students.len(),
            arrears: guard.arrears.len(),
            subjects: guard.subjects.len(),
            attendance: guard.attendance.len(),
            exam_records: guard.exam_records.len(),
        };
        *guard = Collections::default();
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_student(registration_number: &str, email: Option<&str>) -> NewStudent {
        NewStudent {
            registration_number: registration_number.to_string(),
            name: "Student".to_string(),
            email: email.map(str::to_string),
            department: Some("CSE".to_string()),
            semester: Some("5".to_string()),
        }
    }

    #[test]
    fn repeated_codes_match_each_subject_once() {
        let registry = InMemoryRegistry::default();
        for code in ["MA201", "PH101"] {
            registry
                .insert_subject_if_absent(NewSubject {
                    code: code.to_string(),
                    name: None,
                    department: Some("CSE".to_string()),
                    semester: Some("2".to_string()),
                    exam_schedule: None,
                    cost: None,
                })
                .expect("subject");
        }

        let codes: Vec<String> = ["PH101", "MA201", "PH101", "XX999"]
            .iter()
            .map(|code| code.to_string())
            .collect();
        let subjects = registry.subjects_by_codes(&codes).expect("lookup");

        let matched: Vec<&str> = subjects.iter().map(|subject| subject.code.as_str()).collect();
        assert_eq!(matched, vec!["PH101", "MA201"]);
    }

    #[test]
    fn duplicate_email_blocks_insert() {
        let registry = InMemoryRegistry::default();
        registry
            .insert_student_if_unique(new_student("R1", Some("a@x.edu")))
            .expect("insert");
        let outcome = registry
            .insert_student_if_unique(new_student("R2", Some("a@x.edu")))
            .expect("insert");
        assert_eq!(outcome, StudentInsert::Duplicate);
    }

    #[test]
    fn missing_emails_do_not_collide() {
        let registry = InMemoryRegistry::default();
        registry
            .insert_student_if_unique(new_student("R1", None))
            .expect("insert");
        let outcome = registry
            .insert_student_if_unique(new_student("R2", None))
            .expect("insert");
        assert!(matches!(outcome, StudentInsert::Inserted(_)));
    }

    #[test]
    fn exam_record_insert_keeps_first_writer() {
        let registry = InMemoryRegistry::default();
        let student_id = StudentId::generate();
        let first = registry
            .insert_exam_record_if_absent(ExamRecord::new(student_id, vec![SubjectId::generate()]))
            .expect("insert");
        let second = registry
            .insert_exam_record_if_absent(ExamRecord::new(student_id, Vec::new()))
            .expect("insert");
        assert_eq!(first, second);
    }

    #[test]
    fn wipe_reports_counts_and_clears() {
        let registry = InMemoryRegistry::default();
        registry
            .insert_student_if_unique(new_student("R1", None))
            .expect("insert");
        registry
            .record_arrears(ArrearSnapshot {
                registration_number: "R1".to_string(),
                name: None,
                department: None,
                semester: None,
                arrears: vec!["CS101".to_string()],
                recorded_at: Utc::now(),
            })
            .expect("arrears");

        let summary = registry.wipe().expect("wipe");
        assert_eq!(summary.students, 1);
        assert_eq!(summary.arrears, 1);
        assert!(registry
            .student_by_registration("R1")
            .expect("lookup")
            .is_none());
        assert_eq!(registry.wipe().expect("wipe"), WipeSummary::default());
    }
}
