//! netrecon CLI: a thin pass-through over `netrecon_scanner::scan`.

use clap::Parser;
use netrecon_cli::{summary, Args};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if !args.passive && !args.external {
        if let Err(e) = netrecon_net::check_privileges() {
            warn!(%e, "ICMP/ARP probes will be skipped");
        }
    }

    let options = args.to_scan_options();
    let mut hosts = args.build_hosts()?;

    netrecon_scanner::scan(&mut hosts, &options).await?;

    summary::print_summary(&hosts);

    Ok(())
}
