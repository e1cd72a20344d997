//! DocNum Worker Service Entry Point
//!
//! Initializes configuration, storage, services, and starts the HTTP server.

use docnum_worker::run;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    run().await
}
