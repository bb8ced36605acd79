//! OS identifiers (component 4.H): per-distribution heuristics that read a
//! host's service banners and set `op_sys`/`os_ver`, plus a popularity-order
//! dispatcher.

use netrecon_core::{Host, OpSys};

/// Sets `host.op_sys`/`host.os_ver` and returns `true` on success, leaving
/// the host untouched on failure.
pub trait OsIdentifier {
    fn scan(&self, host: &mut Host) -> bool;
}

/// Find the first banner across all of a host's services matching `needle`.
fn any_banner_containing<'a>(host: &'a Host, needle: &str) -> Option<std::borrow::Cow<'a, str>> {
    host.services
        .iter()
        .map(|s| s.banner_str())
        .find(|b| b.contains(needle))
}

/// Debian SSH/release codename -> major version.
const DEBIAN_CODENAMES: &[(&str, f64)] = &[
    ("squeeze", 6.0),
    ("wheezy", 7.0),
    ("jessie", 8.0),
    ("stretch", 9.0),
    ("buster", 10.0),
    ("bullseye", 11.0),
    ("bookworm", 12.0),
];

/// Ubuntu SSH package version -> release number.
const UBUNTU_SSH_VERSIONS: &[(&str, f64)] = &[
    ("6.6.1p1", 14.04),
    ("7.2p2", 16.04),
    ("7.6p1", 18.04),
    ("8.2p1", 20.04),
    ("8.9p1", 22.04),
];

/// (OpenSSH version, distro release-name marker) -> OS version, used by the
/// version-based strategy when no tag or release name is present directly.
const ENTERPRISE_LINUX_SSH_VERSIONS: &[(&str, f64)] = &[("5.3", 6.0)];
const DEBIAN_SSH_VERSIONS: &[(&str, f64)] = &[("6.0p1", 7.0)];
const FEDORA_SSH_VERSIONS: &[(&str, f64)] = &[("7.1p1", 24.0)];

fn ssh_version_token(banner: &str) -> Option<&str> {
    banner.strip_prefix("SSH-2.0-OpenSSH_").map(|rest| {
        rest.split(|c: char| c.is_whitespace())
            .next()
            .unwrap_or(rest)
    })
}

pub struct UbuntuIdentifier;

impl OsIdentifier for UbuntuIdentifier {
    fn scan(&self, host: &mut Host) -> bool {
        let Some(ssh) = any_banner_containing(host, "SSH-2.0-OpenSSH_") else {
            return false;
        };
        let ssh = ssh.into_owned();

        // Tag-based: "OpenSSH_6.6.1p1 Ubuntu-2ubuntu2.4" / "...Debian-2ubuntu2.4"
        if let Some(tag_pos) = ssh.find("ubuntu") {
            let _ = tag_pos;
            if let Some(version) = ssh_version_token(&ssh) {
                if let Some((_, release)) = UBUNTU_SSH_VERSIONS.iter().find(|(v, _)| *v == version) {
                    host.op_sys = OpSys::Ubuntu;
                    host.os_ver = Some(*release);
                    return true;
                }
            }
        }

        // Release-name-based: "Apache (Ubuntu)" anywhere in any banner.
        if any_banner_containing(host, "Apache (Ubuntu)").is_some() {
            host.op_sys = OpSys::Ubuntu;
            if let Some(version) = ssh_version_token(&ssh) {
                if let Some((_, release)) = UBUNTU_SSH_VERSIONS.iter().find(|(v, _)| *v == version) {
                    host.os_ver = Some(*release);
                }
            }
            return true;
        }

        false
    }
}

/// Parse the major version out of a Debian package tag like `"5+deb8u1"`,
/// returning the digits right after `"deb"` when followed by `'u'`.
fn debian_tag_version(banner: &str) -> Option<f64> {
    let idx = banner.find("deb")?;
    let rest = &banner[idx + 3..];
    let digit_len = rest.chars().take_while(char::is_ascii_digit).count();
    if digit_len == 0 || !rest[digit_len..].starts_with('u') {
        return None;
    }
    rest[..digit_len].parse().ok()
}

pub struct DebianIdentifier;

impl OsIdentifier for DebianIdentifier {
    fn scan(&self, host: &mut Host) -> bool {
        // Tag-based: "...Debian-5+deb8u1" -> major version from the "deb<N>u" tag.
        if let Some(ssh) = any_banner_containing(host, "Debian-") {
            if let Some(version) = debian_tag_version(&ssh) {
                host.op_sys = OpSys::Debian;
                host.os_ver = Some(version);
                return true;
            }
        }

        // Release-name-based: "...Debian-6+squeeze" -> codename lookup.
        if let Some(ssh) = any_banner_containing(host, "Debian-") {
            if let Some((_, version)) = DEBIAN_CODENAMES.iter().find(|(name, _)| ssh.contains(name)) {
                host.op_sys = OpSys::Debian;
                host.os_ver = Some(*version);
                return true;
            }
        }

        // Version-based: an "Apache (Debian)" marker anywhere, OS version
        // looked up from a separate SSH banner's OpenSSH package version.
        if any_banner_containing(host, "Apache (Debian)").is_some() {
            host.op_sys = OpSys::Debian;
            if let Some(ssh) = any_banner_containing(host, "SSH-2.0-OpenSSH_") {
                if let Some(version) = ssh_version_token(&ssh) {
                    if let Some((_, release)) = DEBIAN_SSH_VERSIONS.iter().find(|(v, _)| *v == version) {
                        host.os_ver = Some(*release);
                    }
                }
            }
            return true;
        }

        false
    }
}

/// Parse the major version out of a RHEL package tag like `"-RHEL7-..."`.
fn rhel_tag_version(banner: &str) -> Option<f64> {
    let idx = banner.find("RHEL")?;
    let rest = &banner[idx + 4..];
    let digit_len = rest.chars().take_while(char::is_ascii_digit).count();
    if digit_len == 0 {
        return None;
    }
    rest[..digit_len].parse().ok()
}

pub struct EnterpriseLinuxIdentifier;

impl OsIdentifier for EnterpriseLinuxIdentifier {
    fn scan(&self, host: &mut Host) -> bool {
        if let Some(banner) = any_banner_containing(host, "RHEL").map(|b| b.into_owned()) {
            host.op_sys = OpSys::EnterpriseLinux;
            if let Some(version) = rhel_tag_version(&banner) {
                host.os_ver = Some(version);
            }
            return true;
        }

        let release_marker = ["Apache (CentOS)", "Apache (Red Hat)", "Apache (Scientific)"]
            .iter()
            .find_map(|m| any_banner_containing(host, m));
        if release_marker.is_some() {
            host.op_sys = OpSys::EnterpriseLinux;
            if let Some(ssh) = any_banner_containing(host, "SSH-2.0-OpenSSH_") {
                if let Some(version) = ssh_version_token(&ssh) {
                    if let Some((_, release)) =
                        ENTERPRISE_LINUX_SSH_VERSIONS.iter().find(|(v, _)| *v == version)
                    {
                        host.os_ver = Some(*release);
                    }
                }
            }
            return true;
        }

        false
    }
}

pub struct FedoraIdentifier;

impl OsIdentifier for FedoraIdentifier {
    fn scan(&self, host: &mut Host) -> bool {
        if any_banner_containing(host, "Apache (Fedora)").is_none() {
            return false;
        }
        host.op_sys = OpSys::Fedora;
        if let Some(ssh) = any_banner_containing(host, "SSH-2.0-OpenSSH_") {
            if let Some(version) = ssh_version_token(&ssh) {
                if let Some((_, release)) = FEDORA_SSH_VERSIONS.iter().find(|(v, _)| *v == version) {
                    host.os_ver = Some(*release);
                }
            }
        }
        true
    }
}

pub struct FreeBsdIdentifier;

impl OsIdentifier for FreeBsdIdentifier {
    fn scan(&self, host: &mut Host) -> bool {
        if any_banner_containing(host, "FreeBSD").is_none() {
            return false;
        }
        host.op_sys = OpSys::FreeBsd;
        true
    }
}

/// Runs identifiers in popularity order (Ubuntu, Debian, EnterpriseLinux,
/// Fedora, FreeBSD) and stops at the first success.
pub struct AutoIdentifier;

impl OsIdentifier for AutoIdentifier {
    fn scan(&self, host: &mut Host) -> bool {
        let identifiers: Vec<Box<dyn OsIdentifier>> = vec![
            Box::new(UbuntuIdentifier),
            Box::new(DebianIdentifier),
            Box::new(EnterpriseLinuxIdentifier),
            Box::new(FedoraIdentifier),
            Box::new(FreeBsdIdentifier),
        ];
        identifiers.into_iter().any(|id| id.scan(host))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netrecon_core::{Protocol, ScanReason};

    fn host_with_banner(banner: &str) -> Host {
        let mut host = Host::new("10.0.0.1", &[(Protocol::Tcp, 22)]);
        host.services[0].set_outcome(ScanReason::ReplyReceived, banner.as_bytes().to_vec());
        host
    }

    #[test]
    fn ubuntu_identifier_reads_tag_based_ssh_banner() {
        let mut host = host_with_banner("SSH-2.0-OpenSSH_6.6.1p1 Debian-2ubuntu2.4\r\n");
        assert!(UbuntuIdentifier.scan(&mut host));
        assert_eq!(host.op_sys, OpSys::Ubuntu);
        assert_eq!(host.os_ver, Some(14.04));
    }

    #[test]
    fn auto_identifier_stops_at_first_success() {
        let mut host = host_with_banner("SSH-2.0-OpenSSH_6.6.1p1 Debian-2ubuntu2.4\r\n");
        assert!(AutoIdentifier.scan(&mut host));
        assert_eq!(host.op_sys, OpSys::Ubuntu);
    }

    #[test]
    fn identifier_declines_on_unrelated_banner() {
        let mut host = host_with_banner("220 mx ESMTP Exim 4.86\r\n");
        assert!(!UbuntuIdentifier.scan(&mut host));
        assert!(!DebianIdentifier.scan(&mut host));
        assert_eq!(host.op_sys, OpSys::Unidentified);
    }

    #[test]
    fn debian_identifier_reads_codename() {
        let mut host = host_with_banner("SSH-2.0-OpenSSH_5.5p1 Debian-6+squeeze\r\n");
        assert!(DebianIdentifier.scan(&mut host));
        assert_eq!(host.op_sys, OpSys::Debian);
        assert_eq!(host.os_ver, Some(6.0));
    }

    #[test]
    fn debian_identifier_reads_deb_tag() {
        let mut host = host_with_banner("SSH-2.0-OpenSSH_6.7p1 Debian-5+deb8u1\r\n");
        assert!(DebianIdentifier.scan(&mut host));
        assert_eq!(host.op_sys, OpSys::Debian);
        assert_eq!(host.os_ver, Some(8.0));
    }

    #[test]
    fn debian_identifier_reads_apache_marker_with_separate_ssh_banner() {
        let mut host = Host::new("10.0.0.1", &[(Protocol::Tcp, 22), (Protocol::Tcp, 80)]);
        host.services[0].set_outcome(
            ScanReason::ReplyReceived,
            b"SSH-2.0-OpenSSH_6.0p1\r\n".to_vec(),
        );
        host.services[1].set_outcome(
            ScanReason::ReplyReceived,
            b"HTTP/1.1 200 OK\r\nServer: Apache (Debian)\r\n\r\n".to_vec(),
        );
        assert!(DebianIdentifier.scan(&mut host));
        assert_eq!(host.op_sys, OpSys::Debian);
        assert_eq!(host.os_ver, Some(7.0));
    }

    #[test]
    fn enterprise_linux_identifier_reads_rhel_tag() {
        let mut host = host_with_banner("SSH-2.0-OpenSSH_6.6.1p1-RHEL7-6.6.1p1-22\r\n");
        assert!(EnterpriseLinuxIdentifier.scan(&mut host));
        assert_eq!(host.op_sys, OpSys::EnterpriseLinux);
        assert_eq!(host.os_ver, Some(7.0));
    }

    #[test]
    fn enterprise_linux_identifier_reads_centos_marker_with_separate_ssh_banner() {
        let mut host = Host::new("10.0.0.1", &[(Protocol::Tcp, 22), (Protocol::Tcp, 80)]);
        host.services[0].set_outcome(
            ScanReason::ReplyReceived,
            b"SSH-2.0-OpenSSH_5.3\r\n".to_vec(),
        );
        host.services[1].set_outcome(
            ScanReason::ReplyReceived,
            b"HTTP/1.1 200 OK\r\nServer: Apache (CentOS)\r\n\r\n".to_vec(),
        );
        assert!(EnterpriseLinuxIdentifier.scan(&mut host));
        assert_eq!(host.op_sys, OpSys::EnterpriseLinux);
        assert_eq!(host.os_ver, Some(6.0));
    }
}
