//! Binary entrypoint for the taskrank tool

#[tokio::main]
async fn main() {
    if let Err(e) = taskrank::cli::run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
