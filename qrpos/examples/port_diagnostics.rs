//! Port diagnostics example
//!
//! Lists serial ports and probes each one for a working baud rate.

use qrpos::{PROBE_BAUD_RATES, list_ports, probe_port};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> qrpos::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let ports = list_ports()?;
    if ports.is_empty() {
        println!("No serial ports found");
        return Ok(());
    }

    for port in &ports {
        println!("{}", port);

        match probe_port(&port.device, &PROBE_BAUD_RATES).await {
            Some(baud) => println!("  opens at {} baud", baud),
            None => println!("  could not be opened"),
        }
    }

    Ok(())
}
