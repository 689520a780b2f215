mod cli;
mod demo;
mod feed;
mod infra;
mod routes;
mod server;

use idea_board::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
