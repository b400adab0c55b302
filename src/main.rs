#[tokio::main]
async fn main() {
    if let Err(e) = pharmasafe::run().await {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}
