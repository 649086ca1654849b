use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use super::aggregator::SubjectAggregator;
use super::delivery::{DeliveryDispatcher, DeliveryError, Mailer};
use super::materializer::ExamRecordMaterializer;
use super::render::{ArtifactRenderer, HallTicket, RenderedArtifact};
use super::IssuanceError;
use crate::workflows::registry::{RegistryRepository, Student, StudentId, Subject};

/// Outcome of a delivered hall ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueReceipt {
    pub student_id: StudentId,
    pub subject_count: usize,
    pub page_count: usize,
}

/// Raw catalog matches for a student, before exam record materialization.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectOverview {
    pub regular_subjects: Vec<Subject>,
    pub arrear_subjects: Vec<Subject>,
}

/// Materialize, aggregate, render and deliver a hall ticket.
pub struct HallTicketService<R, M: ?Sized> {
    repository: Arc<R>,
    materializer: ExamRecordMaterializer<R>,
    aggregator: SubjectAggregator<R>,
    renderer: ArtifactRenderer,
    dispatcher: DeliveryDispatcher<M>,
}

impl<R, M> HallTicketService<R, M>
where
    R: RegistryRepository + 'static,
    M: Mailer + ?Sized + 'static,
{
    pub fn new(
        repository: Arc<R>,
        mailer: Arc<M>,
        renderer: ArtifactRenderer,
        staging_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            materializer: ExamRecordMaterializer::new(repository.clone()),
            aggregator: SubjectAggregator::new(repository.clone()),
            dispatcher: DeliveryDispatcher::new(mailer, staging_dir),
            renderer,
            repository,
        }
    }

    pub async fn issue(&self, student_id: &StudentId) -> Result<IssueReceipt, IssuanceError> {
        let student = self.load_student(student_id)?;
        if student.email.is_none() {
            return Err(DeliveryError::MissingRecipient(student.id).into());
        }

        let ticket = self.prepare(&student)?;
        let artifact = self.renderer.render(&ticket)?;
        self.dispatcher.dispatch(&student, &artifact).await?;

        info!(
            %student_id,
            registration_number = %student.registration_number,
            subjects = ticket.subjects.len(),
            "hall ticket issued"
        );
        Ok(IssueReceipt {
            student_id: student.id,
            subject_count: ticket.subjects.len(),
            page_count: artifact.page_count,
        })
    }

    /// Render without delivering, for operators checking a ticket locally.
    pub fn preview(
        &self,
        registration_number: &str,
    ) -> Result<(HallTicket, RenderedArtifact), IssuanceError> {
        let student = self
            .repository
            .student_by_registration(registration_number)?
            .ok_or_else(|| IssuanceError::UnknownRegistration(registration_number.to_string()))?;
        let ticket = self.prepare(&student)?;
        let artifact = self.renderer.render(&ticket)?;
        Ok((ticket, artifact))
    }

    /// Catalog subjects for the student's semester and department alongside
    /// catalog matches for their arrear codes.
    pub fn subject_overview(&self, student_id: &StudentId) -> Result<SubjectOverview, IssuanceError> {
        let student = self.load_student(student_id)?;
        let regular_subjects = self
            .repository
            .subjects_for(student.semester.as_deref(), student.department.as_deref())?;
        let arrear_subjects = if student.arrears.is_empty() {
            Vec::new()
        } else {
            self.repository.subjects_by_codes(&student.arrears)?
        };

        Ok(SubjectOverview {
            regular_subjects,
            arrear_subjects,
        })
    }

    fn load_student(&self, student_id: &StudentId) -> Result<Student, IssuanceError> {
        self.repository
            .student(student_id)?
            .ok_or(IssuanceError::StudentNotFound(*student_id))
    }

    fn prepare(&self, student: &Student) -> Result<HallTicket, IssuanceError> {
        let record = self.materializer.materialize(&student.id)?;
        let subjects = self.aggregator.aggregate(&record, &student.arrears)?;
        Ok(HallTicket::new(student, subjects))
    }
}
