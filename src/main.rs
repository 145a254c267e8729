use reauth::app;
use reauth::error::AppError;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    app::run().await
}
