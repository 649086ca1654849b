mod cli;
mod infra;
mod preview;
mod routes;
mod server;

use hall_ticket::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
