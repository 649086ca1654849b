use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::normalizer::NormalizedRow;
use super::IngestionError;

const REGISTRATION: &str = "reg no";
const NAME: &str = "name";
const EMAIL: &str = "email";
const SEMESTER: &str = "sem";
const STUDENT_DEPARTMENT: &[&str] = &["dep", "department"];
const SUBJECT_DEPARTMENT: &[&str] = &["dept", "department"];
const ARREAR_CODES: &str = "arrear sub";
const SUBJECT_CODE: &str = "subject code";
const SUBJECT_NAME: &str = "subject name";
const EXAM_SCHEDULE: &str = "exam schedule";
const COST: &str = "cost";
const FEES_STATUS: &str = "fees status";
const PERCENTAGE: &str = "percentage";

/// Closed set of bulk upload types accepted by the ingestion endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadKind {
    StudentList,
    ArrearList,
    Attendance,
    #[serde(rename = "subjectname")]
    SubjectName,
}

impl UploadKind {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::StudentList,
            Self::ArrearList,
            Self::Attendance,
            Self::SubjectName,
        ]
    }

    pub const fn tag(self) -> &'static str {
        match self {
            Self::StudentList => "student_list",
            Self::ArrearList => "arrear_list",
            Self::Attendance => "attendance",
            Self::SubjectName => "subjectname",
        }
    }
}

impl fmt::Display for UploadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for UploadKind {
    type Err = IngestionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ordered()
            .into_iter()
            .find(|kind| kind.tag() == normalized)
            .ok_or_else(|| IngestionError::UnknownUploadKind(value.trim().to_string()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudentRow {
    pub registration_number: String,
    pub name: String,
    pub email: Option<String>,
    pub department: Option<String>,
    pub semester: Option<String>,
}

impl StudentRow {
    /// `None` when the registration number or name is blank.
    pub fn from_row(row: &NormalizedRow) -> Option<Self> {
        Some(Self {
            registration_number: row.text(REGISTRATION)?,
            name: row.text(NAME)?,
            email: row.text(EMAIL),
            department: row.text_any(STUDENT_DEPARTMENT),
            semester: row.text(SEMESTER),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrearRow {
    pub registration_number: String,
    pub name: Option<String>,
    pub department: Option<String>,
    pub semester: Option<String>,
    pub codes: Vec<String>,
}

impl ArrearRow {
    pub fn from_row(row: &NormalizedRow) -> Self {
        Self {
            registration_number: row.text(REGISTRATION).unwrap_or_default(),
            name: row.text(NAME),
            department: row.text_any(STUDENT_DEPARTMENT),
            semester: row.text(SEMESTER),
            codes: parse_arrear_codes(row.text(ARREAR_CODES).as_deref().unwrap_or_default()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubjectRow {
    pub code: String,
    pub name: Option<String>,
    pub department: Option<String>,
    pub semester: Option<String>,
    pub exam_schedule: Option<String>,
    pub cost: Option<String>,
}

impl SubjectRow {
    /// `None` when the subject code is blank.
    pub fn from_row(row: &NormalizedRow) -> Option<Self> {
        Some(Self {
            code: row.text(SUBJECT_CODE)?,
            name: row.text(SUBJECT_NAME),
            department: row.text_any(SUBJECT_DEPARTMENT),
            semester: row.text(SEMESTER),
            exam_schedule: row.text(EXAM_SCHEDULE),
            cost: row.text(COST),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceRow {
    pub registration_number: String,
    pub name: Option<String>,
    pub department: Option<String>,
    pub semester: Option<String>,
    pub email: Option<String>,
    pub percentage: Option<f64>,
    pub fees_paid: bool,
}

impl AttendanceRow {
    pub fn from_row(row: &NormalizedRow) -> Self {
        Self {
            registration_number: row.text(REGISTRATION).unwrap_or_default(),
            name: row.text(NAME),
            department: row.text_any(STUDENT_DEPARTMENT),
            semester: row.text(SEMESTER),
            email: row.text(EMAIL),
            percentage: row.number(PERCENTAGE),
            fees_paid: row
                .text(FEES_STATUS)
                .is_some_and(|status| status.eq_ignore_ascii_case("paid")),
        }
    }
}

/// Validated rows for one upload, one variant per upload kind.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadBatch {
    Students(Vec<StudentRow>),
    Arrears(Vec<ArrearRow>),
    Subjects(Vec<SubjectRow>),
    Attendance(Vec<AttendanceRow>),
}

impl UploadBatch {
    /// Shape normalized rows for `kind`. Rows missing a required field are dropped here.
    pub fn from_rows(kind: UploadKind, rows: &[NormalizedRow]) -> Self {
        match kind {
            UploadKind::StudentList => {
                Self::Students(rows.iter().filter_map(StudentRow::from_row).collect())
            }
            UploadKind::ArrearList => Self::Arrears(rows.iter().map(ArrearRow::from_row).collect()),
            UploadKind::SubjectName => {
                Self::Subjects(rows.iter().filter_map(SubjectRow::from_row).collect())
            }
            UploadKind::Attendance => {
                Self::Attendance(rows.iter().map(AttendanceRow::from_row).collect())
            }
        }
    }

    pub fn kind(&self) -> UploadKind {
        match self {
            Self::Students(_) => UploadKind::StudentList,
            Self::Arrears(_) => UploadKind::ArrearList,
            Self::Subjects(_) => UploadKind::SubjectName,
            Self::Attendance(_) => UploadKind::Attendance,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Students(rows) => rows.len(),
            Self::Arrears(rows) => rows.len(),
            Self::Subjects(rows) => rows.len(),
            Self::Attendance(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Comma-separated arrear codes, trimmed, blanks dropped, order kept.
pub fn parse_arrear_codes(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(str::to_string)
        .collect()
}
