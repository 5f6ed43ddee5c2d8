use anyhow::{Context, Result};
use xmltree::Element;

use pmocamcontrol::{Device, DeviceParams};

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let xaddr = args
        .next()
        .context("usage: device_service <host[:port]> [username] [password]")?;
    let username = args.next().unwrap_or_default();
    let password = args.next().unwrap_or_default();

    let device = Device::new(DeviceParams {
        xaddr,
        username,
        password,
        transport: None,
    });

    // Synchronise l'horloge et apprend la table des services
    device
        .inspect()
        .context("capability exchange failed")?;
    println!("clock drift: {}s", device.clock_drift().num_seconds());

    let mut services: Vec<_> = device.services().into_iter().collect();
    services.sort();
    for (name, url) in services {
        println!("{} -> {}", name, url);
    }

    // Une opération non signée...
    let payload = device
        .create_request(Element::new("tds:GetSystemDateAndTime"))
        .unauthenticated()
        .fetch()?;
    println!("{}", payload);

    // ...et une opération signée si des identifiants ont été fournis
    let info = device.get_device_information()?;
    println!("{}", serde_json::to_string_pretty(&info)?);

    Ok(())
}
