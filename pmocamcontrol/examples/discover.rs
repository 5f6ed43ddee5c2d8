use std::time::Duration;

use anyhow::{Context, Result};
use pmocamcontrol::{ProbeOptions, discover_interface};

fn main() -> Result<()> {
    // Un tout petit logging optionnel
    tracing_subscriber::fmt::init();

    let interface = std::env::args()
        .nth(1)
        .context("usage: discover <interface> (ex: eth0, en0)")?;

    tracing::info!("Probing {} for ONVIF devices...", interface);
    let opts = ProbeOptions {
        window: Duration::from_secs(1),
        ..ProbeOptions::default()
    };
    let devices = discover_interface(&interface, &opts)?;

    println!("=====================");
    println!("Devices detected : {}", devices.len());
    for device in &devices {
        println!("- {}", device.xaddr());
        let mut services: Vec<_> = device.services().into_iter().collect();
        services.sort();
        for (name, url) in services {
            println!("    {} -> {}", name, url);
        }
        println!(
            "    info: {}",
            serde_json::to_string(&device.device_info())?
        );
    }
    println!("=====================");

    Ok(())
}
