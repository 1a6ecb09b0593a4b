//! Upload example
//!
//! ```text
//! QRPOS_PORT=/dev/ttyUSB0 cargo run --example upload_image -- qr.jpg 1
//! ```

use anyhow::Context;
use qrpos::{Terminal, TerminalConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let port = std::env::var("QRPOS_PORT").unwrap_or_else(|_| "/dev/ttyUSB0".to_string());

    let mut args = std::env::args().skip(1);
    let path = args.next().context("usage: upload_image <image> [slot]")?;
    let slot: u32 = match args.next() {
        Some(slot) => slot.parse().context("slot must be a number")?,
        None => 1,
    };

    let mut terminal = Terminal::new(TerminalConfig::new(port));
    terminal.connect().await?;

    if let Some(free) = terminal.free_size().await {
        println!("Free memory: {} KB", free);
    }

    let options = terminal
        .upload_options()
        .on_progress(|done, total| println!("Chunk {}/{}", done, total));

    let result = terminal.upload_with(&path, slot, options).await;
    terminal.disconnect().await;

    let report = result?;
    println!("Stored {}", report);

    Ok(())
}

