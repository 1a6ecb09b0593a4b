//! Payment flow example
//!
//! Shows a QR code, holds it while the customer pays, then resumes the
//! slideshow.

use std::time::Duration;

use qrpos::{Screen, ScreenKind, Terminal, TerminalConfig};
use tokio::time::sleep;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let port = std::env::var("QRPOS_PORT").unwrap_or_else(|_| "/dev/ttyUSB0".to_string());
    let qr = std::env::var("QRPOS_QR").unwrap_or_else(|_| "payment_qr.jpg".to_string());

    let mut terminal = Terminal::new(TerminalConfig::new(port));
    terminal.connect().await?;

    terminal.show_screen(Screen::total(["Subtotal 140.00", "Tax 10.00", "Total 150.00"])).await?;
    sleep(Duration::from_secs(3)).await;

    println!("Presenting payment QR...");
    terminal.present_payment_qr(&qr, 1).await?;

    // Wait for the customer to pay
    sleep(Duration::from_secs(30)).await;

    terminal
        .show_screen(Screen::outcome(ScreenKind::Success, "REF-0001", "ORDER-42", "2024-06-01"))
        .await?;
    sleep(Duration::from_secs(5)).await;

    println!("Resuming rotation...");
    terminal.resume_rotation().await?;

    terminal.disconnect().await;
    Ok(())
}
