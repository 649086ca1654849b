//! Hall ticket issuance: exam record materialization, subject aggregation, PDF
//! rendering and email delivery.

pub mod aggregator;
pub mod delivery;
pub mod materializer;
pub mod render;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use aggregator::{AggregatedSubject, SubjectAggregator, SubjectKind, UNSCHEDULED};
pub use delivery::{
    DeliveryDispatcher, DeliveryError, MailAttachment, Mailer, OutboundMessage, SmtpMailer,
};
pub use materializer::ExamRecordMaterializer;
pub use render::{ArtifactRenderer, HallTicket, RenderError, RenderedArtifact};
pub use router::issuance_router;
pub use service::{HallTicketService, IssueReceipt, SubjectOverview};

use crate::workflows::registry::{RepositoryError, StudentId};

#[derive(Debug, thiserror::Error)]
pub enum IssuanceError {
    #[error("student {0} not found")]
    StudentNotFound(StudentId),
    #[error("no student registered as '{0}'")]
    UnknownRegistration(String),
    #[error("no subjects found for student {0}")]
    NoSubjects(StudentId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

impl IssuanceError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::StudentNotFound(_) | Self::UnknownRegistration(_) | Self::NoSubjects(_)
        )
    }
}
