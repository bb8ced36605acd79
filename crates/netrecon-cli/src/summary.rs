//! Human-readable, colored scan summary (component 4.M).

use colored::Colorize;
use netrecon_core::{Host, ScanReason, Severity};

/// One line per alive service (address, port, protocol, reason, banner
/// snippet, CPEs, worst CVE severity), plus one line per host's OS guess.
pub fn print_summary(hosts: &[Host]) {
    for host in hosts {
        let host_line = format!("{} [{}]", host.address, if host.alive { "up" } else { "down" });
        println!("{}", if host.alive { host_line.green().bold() } else { host_line.red() });

        if host.op_sys != netrecon_core::OpSys::Unidentified {
            let os_line = match host.os_ver {
                Some(v) => format!("  OS: {} {v}", host.op_sys),
                None => format!("  OS: {}", host.op_sys),
            };
            println!("{}", os_line.cyan());
        }

        for service in &host.services {
            if !service.alive {
                continue;
            }
            print_service_line(service);
        }
    }
}

fn print_service_line(service: &netrecon_core::Service) {
    let snippet: String = service.banner_str().chars().take(60).collect();
    let reason = reason_label(service.reason);
    let mut line = format!(
        "  {:>5}/{:<5} {:<16} {}",
        service.port, service.protocol, reason, snippet
    );
    if !service.cpe.is_empty() {
        line.push_str(&format!("  cpe={}", service.cpe.join(",")));
    }
    if let Some(worst) = worst_severity(service) {
        line.push_str(&format!("  severity={worst:?}"));
    }
    println!("{line}");
}

fn reason_label(reason: ScanReason) -> &'static str {
    match reason {
        ScanReason::ReplyReceived => "open",
        ScanReason::PortUnreachable | ScanReason::IcmpUnreachable => "closed",
        ScanReason::TimedOut => "filtered",
        ScanReason::HostUnreachable => "unreachable",
        ScanReason::ScanFailed => "failed",
        ScanReason::NotScanned | ScanReason::InProgress => "unknown",
    }
}

fn worst_severity(service: &netrecon_core::Service) -> Option<Severity> {
    service.cve.iter().map(|r| r.severity).max()
}

#[cfg(test)]
mod tests {
    use super::*;
    use netrecon_core::{CveRecord, Protocol, Service};

    #[test]
    fn worst_severity_picks_the_highest() {
        let mut service = Service::new("10.0.0.1", Protocol::Tcp, 80);
        service.cve = vec![
            CveRecord { cve: "2020-1".into(), severity: Severity::Low, cvss: None },
            CveRecord { cve: "2020-2".into(), severity: Severity::Critical, cvss: None },
        ];
        assert_eq!(worst_severity(&service), Some(Severity::Critical));
    }

    #[test]
    fn reason_label_covers_every_variant() {
        for reason in [
            ScanReason::NotScanned,
            ScanReason::InProgress,
            ScanReason::ReplyReceived,
            ScanReason::TimedOut,
            ScanReason::IcmpUnreachable,
            ScanReason::PortUnreachable,
            ScanReason::HostUnreachable,
            ScanReason::ScanFailed,
        ] {
            assert!(!reason_label(reason).is_empty());
        }
    }
}
