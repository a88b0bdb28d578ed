mod cli;
mod demo;
mod infra;

use ad_wizard::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
