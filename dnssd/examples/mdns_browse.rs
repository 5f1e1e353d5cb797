//! mDNS Browse Example
//!
//! Browses the local network for DNS-SD services and prints what answered.
//!
//! # Usage
//!
//! List every service type on the link:
//! ```
//! cargo run --package dnssd --example mdns_browse
//! ```
//!
//! Find Chromecasts and printers, as JSON:
//! ```
//! cargo run --package dnssd --example mdns_browse -- \
//!     --service _googlecast._tcp --service _ipp._tcp --json
//! ```

use std::io::Write;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use dnssd::{Client, MdnsConfig, Query, SERVICE_TYPE_ENUMERATION};
use tokio::sync::watch;

#[derive(Parser, Debug)]
#[command(name = "mDNS Browse")]
#[command(version = "0.1.0")]
#[command(about = "Browse the local network for DNS-SD services", long_about = None)]
struct Args {
    /// Service type to browse for, repeatable
    #[arg(short, long = "service", default_values_t = [SERVICE_TYPE_ENUMERATION.to_owned()])]
    services: Vec<String>,

    /// Domain appended to service types
    #[arg(long, default_value = "local")]
    domain: String,

    /// Seconds to collect responses
    #[arg(long, default_value_t = 3)]
    timeout: u64,

    /// UDP port to listen and send on
    #[arg(long, default_value_t = dnssd::MDNS_PORT)]
    port: u16,

    /// Only use IPv4 interfaces
    #[arg(long)]
    no_ipv6: bool,

    /// Print services as JSON
    #[arg(long)]
    json: bool,

    /// More logging (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = match args.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format(|buf, record| {
            writeln!(
                buf,
                "{}:{} [{}] {} - {}",
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.level(),
                chrono::Local::now().format("%H:%M:%S.%6f"),
                record.args()
            )
        })
        .init();

    let (stop_tx, mut stop_rx) = watch::channel(false);
    ctrlc::set_handler(move || {
        let _ = stop_tx.send(true);
    })?;

    let config = MdnsConfig::default()
        .with_domain(args.domain.clone())
        .with_multicast_port(args.port)
        .with_query_timeout(Duration::from_secs(args.timeout))
        .with_enable_ipv6(!args.no_ipv6);
    let client = Client::new(config);
    client.start().await?;

    for iface in client.interfaces().await {
        log::info!("listening on {iface}");
    }

    let query = Query::new(args.services.clone()).with_domain(args.domain.clone());
    let cancel = async move {
        let _ = stop_rx.changed().await;
    };
    let result = client.query_until(query, cancel).await;

    // Stop before reporting, so an interrupted run still releases the sockets.
    client.stop().await?;
    let services = result?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&services)?);
    } else if services.is_empty() {
        println!("no services found");
    } else {
        for service in &services {
            println!("{service}");
        }
    }

    Ok(())
}
