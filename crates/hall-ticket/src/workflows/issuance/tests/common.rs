use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use chrono::Utc;
use serde_json::Value;

use crate::workflows::issuance::{
    ArtifactRenderer, DeliveryError, HallTicketService, Mailer, OutboundMessage,
};
use crate::workflows::registry::{
    ArrearSnapshot, AttendanceSnapshot, InMemoryRegistry, NewStudent, NewSubject,
    RegistryRepository, StudentId, StudentInsert,
};

#[derive(Default)]
pub(super) struct RecordingMailer {
    sent: Mutex<Vec<OutboundMessage>>,
    /// Files present in the staging directory while each message was being sent.
    staged_during_send: Mutex<Vec<usize>>,
    staging_dir: Option<PathBuf>,
}

impl RecordingMailer {
    pub(super) fn watching(staging_dir: &Path) -> Self {
        Self {
            staging_dir: Some(staging_dir.to_path_buf()),
            ..Self::default()
        }
    }

    pub(super) fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().expect("mailer mutex").clone()
    }

    pub(super) fn staged_during_send(&self) -> Vec<usize> {
        self.staged_during_send.lock().expect("mailer mutex").clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: OutboundMessage) -> Result<(), DeliveryError> {
        if let Some(dir) = &self.staging_dir {
            self.staged_during_send
                .lock()
                .expect("mailer mutex")
                .push(staged_files(dir));
        }
        self.sent.lock().expect("mailer mutex").push(message);
        Ok(())
    }
}

pub(super) struct RejectingMailer;

#[async_trait]
impl Mailer for RejectingMailer {
    async fn send(&self, _message: OutboundMessage) -> Result<(), DeliveryError> {
        Err(DeliveryError::Transport("550 mailbox unavailable".to_string()))
    }
}

fn subject(code: &str, semester: &str, schedule: Option<&str>) -> NewSubject {
    NewSubject {
        code: code.to_string(),
        name: Some(format!("Subject {code}")),
        department: Some("CSE".to_string()),
        semester: Some(semester.to_string()),
        exam_schedule: schedule.map(str::to_string),
        cost: None,
    }
}

/// Three fifth-semester CSE subjects, one older subject owed as an arrear,
/// 80% attendance with fees paid.
pub(super) fn seeded_registry(email: Option<&str>) -> (Arc<InMemoryRegistry>, StudentId) {
    let registry = Arc::new(InMemoryRegistry::default());
    for entry in [
        subject("CS501", "5", Some("2025-11-20 FN")),
        subject("CS502", "5", Some("2025-11-22 FN")),
        subject("CS503", "5", None),
        subject("MA201", "2", Some("2025-11-25 AN")),
    ] {
        registry.insert_subject_if_absent(entry).expect("subject");
    }

    let StudentInsert::Inserted(student) = registry
        .insert_student_if_unique(NewStudent {
            registration_number: "21CS001".to_string(),
            name: "Asha".to_string(),
            email: email.map(str::to_string),
            department: Some("CSE".to_string()),
            semester: Some("5".to_string()),
        })
        .expect("insert")
    else {
        panic!("student should be new");
    };

    registry
        .record_arrears(ArrearSnapshot {
            registration_number: "21CS001".to_string(),
            name: Some("Asha".to_string()),
            department: Some("CSE".to_string()),
            semester: Some("5".to_string()),
            arrears: vec!["MA201".to_string()],
            recorded_at: Utc::now(),
        })
        .expect("arrears");
    registry
        .record_attendance(AttendanceSnapshot {
            registration_number: "21CS001".to_string(),
            name: Some("Asha".to_string()),
            department: Some("CSE".to_string()),
            semester: Some("5".to_string()),
            email: email.map(str::to_string),
            percentage: Some(80.0),
            fees_paid: true,
            recorded_at: Utc::now(),
        })
        .expect("attendance");

    (registry, student.id)
}

pub(super) fn build_service<M: Mailer + 'static>(
    registry: Arc<InMemoryRegistry>,
    mailer: Arc<M>,
    staging_dir: &Path,
) -> Arc<HallTicketService<InMemoryRegistry, M>> {
    Arc::new(HallTicketService::new(
        registry,
        mailer,
        ArtifactRenderer::default(),
        staging_dir,
    ))
}

pub(super) fn staged_files(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("json body")
}
