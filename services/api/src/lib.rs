mod cli;
mod infra;
mod routes;
mod server;

use khoroolol::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
