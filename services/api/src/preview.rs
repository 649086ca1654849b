use crate::infra::OfflineMailer;
use clap::Args;
use hall_ticket::config::AppConfig;
use hall_ticket::error::AppError;
use hall_ticket::workflows::ingestion::{IngestionError, IngestionService, SourceFormat, UploadKind};
use hall_ticket::workflows::issuance::{ArtifactRenderer, HallTicketService};
use hall_ticket::workflows::registry::InMemoryRegistry;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct PreviewArgs {
    /// Registration number of the student whose ticket is rendered
    #[arg(long)]
    pub(crate) registration_number: String,
    /// Student roster (.xlsx, .xls or .csv)
    #[arg(long)]
    pub(crate) students: PathBuf,
    /// Subject catalog (.xlsx, .xls or .csv)
    #[arg(long)]
    pub(crate) subjects: PathBuf,
    /// Optional arrear list
    #[arg(long)]
    pub(crate) arrears: Option<PathBuf>,
    /// Optional attendance and fees sheet
    #[arg(long)]
    pub(crate) attendance: Option<PathBuf>,
    /// Header image; defaults to HEADER_IMAGE_PATH
    #[arg(long)]
    pub(crate) header_image: Option<PathBuf>,
    /// Destination for the rendered PDF
    #[arg(long, default_value = "hall_ticket_preview.pdf")]
    pub(crate) output: PathBuf,
}

pub(crate) fn run_preview(args: PreviewArgs) -> Result<(), AppError> {
    let header_image = match args.header_image.clone() {
        Some(path) => path,
        None => AppConfig::load()?.storage.header_image,
    };
    let summary = render_preview(&args, Some(header_image))?;

    println!("Hall ticket preview");
    println!("  Student: {} ({})", summary.name, args.registration_number);
    println!("  Subjects: {}", summary.subjects);
    println!("  Pages: {}", summary.pages);
    println!("  Written to: {}", args.output.display());
    Ok(())
}

#[derive(Debug)]
pub(crate) struct PreviewSummary {
    pub(crate) name: String,
    pub(crate) subjects: usize,
    pub(crate) pages: usize,
}

pub(crate) fn render_preview(
    args: &PreviewArgs,
    header_image: Option<PathBuf>,
) -> Result<PreviewSummary, AppError> {
    let registry = Arc::new(InMemoryRegistry::default());
    let staging_dir = std::env::temp_dir();
    let ingestion = IngestionService::new(registry.clone(), staging_dir.clone());

    let sources = [
        (Some(&args.students), UploadKind::StudentList),
        (Some(&args.subjects), UploadKind::SubjectName),
        (args.arrears.as_ref(), UploadKind::ArrearList),
        (args.attendance.as_ref(), UploadKind::Attendance),
    ];
    for (path, kind) in sources {
        if let Some(path) = path {
            ingestion.ingest_path(path, source_format(path)?, kind)?;
        }
    }

    let service = HallTicketService::new(
        registry,
        Arc::new(OfflineMailer),
        ArtifactRenderer::new(header_image),
        staging_dir,
    );
    let (ticket, artifact) = service.preview(&args.registration_number)?;
    std::fs::write(&args.output, &artifact.bytes)?;

    Ok(PreviewSummary {
        name: ticket.name,
        subjects: ticket.subjects.len(),
        pages: artifact.page_count,
    })
}

fn source_format(path: &Path) -> Result<SourceFormat, IngestionError> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    SourceFormat::from_file_name(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, contents).expect("fixture written");
        path
    }

    fn args(dir: &Path, registration_number: &str) -> PreviewArgs {
        PreviewArgs {
            registration_number: registration_number.to_string(),
            students: write(
                dir,
                "students.csv",
                "Reg No,Name,Email,Dep,Sem\n21CS001,Asha,asha@x.edu,CSE,5\n",
            ),
            subjects: write(
                dir,
                "subjects.csv",
                "Subject Code,Subject Name,Dept,Sem,Exam Schedule\n\
CS501,Compilers,CSE,5,2025-11-20 FN\n\
CS502,Networks,CSE,5,\n\
MA201,Discrete Mathematics,CSE,2,2025-11-25 AN\n",
            ),
            arrears: Some(write(
                dir,
                "arrears.csv",
                "Reg No,Name,Arrear Sub\n21CS001,Asha,MA201\n",
            )),
            attendance: Some(write(
                dir,
                "attendance.csv",
                "Reg No,Name,Percentage,Fees Status\n21CS001,Asha,80,Paid\n",
            )),
            header_image: None,
            output: dir.join("preview.pdf"),
        }
    }

    #[test]
    fn renders_pdf_from_local_sheets() {
        let dir = tempfile::tempdir().expect("tempdir");
        let args = args(dir.path(), "21CS001");

        let summary = render_preview(&args, None).expect("preview renders");

        assert_eq!(summary.name, "Asha");
        assert_eq!(summary.subjects, 3);
        assert_eq!(summary.pages, 1);
        let bytes = std::fs::read(&args.output).expect("pdf written");
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn unknown_registration_number_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let args = args(dir.path(), "21CS999");

        let error = render_preview(&args, None).expect_err("no such student");

        assert_eq!(error.status(), axum::http::StatusCode::NOT_FOUND);
        assert!(!args.output.exists());
    }

    #[test]
    fn unsupported_source_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut args = args(dir.path(), "21CS001");
        args.students = write(dir.path(), "students.txt", "Reg No,Name\n21CS001,Asha\n");

        let error = render_preview(&args, None).expect_err("txt rejected");
        assert_eq!(error.status(), axum::http::StatusCode::BAD_REQUEST);
    }
}
