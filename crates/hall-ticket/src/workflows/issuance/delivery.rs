use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use lettre::address::AddressError;
use lettre::message::header::{ContentType, ContentTypeErr};
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, info};
use uuid::Uuid;

use super::render::RenderedArtifact;
use crate::config::MailConfig;
use crate::workflows::registry::{Student, StudentId};
use crate::workflows::transient::TransientFile;

pub const MESSAGE_SUBJECT: &str = "Your Hall Ticket";

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("student {0} has no email address on file")]
    MissingRecipient(StudentId),
    #[error("failed to stage hall ticket: {0}")]
    Staging(#[from] std::io::Error),
    #[error("invalid mailbox '{address}': {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: AddressError,
    },
    #[error("invalid attachment content type: {0}")]
    ContentType(#[from] ContentTypeErr),
    #[error("failed to build message: {0}")]
    Build(#[from] lettre::error::Error),
    #[error("mail transport failed: {0}")]
    Transport(String),
}

#[derive(Clone, PartialEq, Eq)]
pub struct MailAttachment {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for MailAttachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailAttachment")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub attachment: MailAttachment,
}

/// Outbound mail seam. Constructed once at startup and shared by reference.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: OutboundMessage) -> Result<(), DeliveryError>;
}

/// `lettre` async SMTP transport.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn from_config(config: &MailConfig) -> Result<Self, DeliveryError> {
        let from = parse_mailbox(&config.from_address)?;
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            .map_err(|err| DeliveryError::Transport(err.to_string()))?;
        if let Some(port) = config.smtp_port {
            builder = builder.port(port);
        }
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: OutboundMessage) -> Result<(), DeliveryError> {
        let content_type = ContentType::parse(&message.attachment.content_type)?;
        let attachment = Attachment::new(message.attachment.file_name)
            .body(message.attachment.bytes, content_type);

        let email = Message::builder()
            .from(self.from.clone())
            .to(parse_mailbox(&message.to)?)
            .subject(message.subject)
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(message.body))
                    .singlepart(attachment),
            )?;

        self.transport
            .send(email)
            .await
            .map_err(|err| DeliveryError::Transport(err.to_string()))?;
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, DeliveryError> {
    address
        .parse()
        .map_err(|source| DeliveryError::InvalidAddress {
            address: address.to_string(),
            source,
        })
}

/// Stages a rendered hall ticket, mails it and removes the staged copy.
pub struct DeliveryDispatcher<M: ?Sized> {
    mailer: Arc<M>,
    staging_dir: PathBuf,
}

impl<M> DeliveryDispatcher<M>
where
    M: Mailer + ?Sized,
{
    pub fn new(mailer: Arc<M>, staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            mailer,
            staging_dir: staging_dir.into(),
        }
    }

    /// Per-request staging location. Overlapping requests for one student never
    /// share a file.
    pub fn staging_path(&self, student_id: &StudentId) -> PathBuf {
        self.staging_dir
            .join(format!("hall_ticket_{student_id}_{}.pdf", Uuid::new_v4()))
    }

    /// The message is only sent after the staged file is fully synced. The staged
    /// file is dropped, and therefore removed, whatever the send outcome.
    pub async fn dispatch(
        &self,
        student: &Student,
        artifact: &RenderedArtifact,
    ) -> Result<(), DeliveryError> {
        let recipient = student
            .email
            .clone()
            .ok_or(DeliveryError::MissingRecipient(student.id))?;

        let staged = TransientFile::write(self.staging_path(&student.id), &artifact.bytes).await?;
        debug!(path = %staged.path().display(), "hall ticket staged");

        let message = OutboundMessage {
            to: recipient,
            subject: MESSAGE_SUBJECT.to_string(),
            body: message_body(&student.name),
            attachment: MailAttachment {
                file_name: artifact_file_name(&student.id),
                content_type: mime::APPLICATION_PDF.to_string(),
                bytes: artifact.bytes.clone(),
            },
        };

        self.mailer.send(message).await?;
        info!(student_id = %student.id, "hall ticket delivered");
        Ok(())
    }
}

pub fn artifact_file_name(student_id: &StudentId) -> String {
    format!("hall_ticket_{student_id}.pdf")
}

pub fn message_body(name: &str) -> String {
    format!(
        "Hello {name},\n\nYour hall ticket is ready. Please find the attached PDF.\n\nGood luck!\nExam Department"
    )
}
