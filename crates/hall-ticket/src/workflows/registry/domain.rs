use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! uuid_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(value.trim()).map(Self)
            }
        }
    };
}

uuid_id!(StudentId);
uuid_id!(SubjectId);
uuid_id!(ExamRecordId);

/// Current-state record for one student, keyed by registration number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: StudentId,
    pub registration_number: String,
    pub name: String,
    pub email: Option<String>,
    pub department: Option<String>,
    pub semester: Option<String>,
    pub attendance: f64,
    pub fees_paid: bool,
    /// Replaced wholesale by every arrear upload.
    pub arrears: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied by a roster row; the remaining attributes take their defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct NewStudent {
    pub registration_number: String,
    pub name: String,
    pub email: Option<String>,
    pub department: Option<String>,
    pub semester: Option<String>,
}

impl NewStudent {
    pub fn into_student(self, created_at: DateTime<Utc>) -> Student {
        Student {
            id: StudentId::generate(),
            registration_number: self.registration_number,
            name: self.name,
            email: self.email,
            department: self.department,
            semester: self.semester,
            attendance: 0.0,
            fees_paid: false,
            arrears: Vec::new(),
            created_at,
        }
    }
}

/// Catalog entry. The subject code is the dedup key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: SubjectId,
    pub code: String,
    pub name: Option<String>,
    pub department: Option<String>,
    pub semester: Option<String>,
    pub exam_schedule: Option<String>,
    pub cost: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSubject {
    pub code: String,
    pub name: Option<String>,
    pub department: Option<String>,
    pub semester: Option<String>,
    pub exam_schedule: Option<String>,
    pub cost: Option<String>,
}

impl NewSubject {
    pub fn into_subject(self, created_at: DateTime<Utc>) -> Subject {
        Subject {
            id: SubjectId::generate(),
            code: self.code,
            name: self.name,
            department: self.department,
            semester: self.semester,
            exam_schedule: self.exam_schedule,
            cost: self.cost,
            created_at,
        }
    }
}

/// Append-only audit row written for every arrear upload row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrearSnapshot {
    pub registration_number: String,
    pub name: Option<String>,
    pub department: Option<String>,
    pub semester: Option<String>,
    pub arrears: Vec<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Append-only audit row written for every attendance upload row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSnapshot {
    pub registration_number: String,
    pub name: Option<String>,
    pub department: Option<String>,
    pub semester: Option<String>,
    pub email: Option<String>,
    /// Blank percentages leave the student's current attendance untouched.
    pub percentage: Option<f64>,
    pub fees_paid: bool,
    pub recorded_at: DateTime<Utc>,
}

/// Materialized association between a student and the subjects they sit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamRecord {
    pub id: ExamRecordId,
    pub student_id: StudentId,
    pub subjects: Vec<SubjectId>,
}

impl ExamRecord {
    pub fn new(student_id: StudentId, subjects: Vec<SubjectId>) -> Self {
        Self {
            id: ExamRecordId::generate(),
            student_id,
            subjects,
        }
    }
}

/// Per-collection counts removed by a bulk wipe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WipeSummary {
    pub students: usize,
    pub arrears: usize,
    pub subjects: usize,
    pub attendance: usize,
    pub exam_records: usize,
}
