//! Raw-socket privilege detection.
//!
//! ARP and ICMP probing need a raw socket; without the capability for one the
//! scan plan downgrades those probe kinds rather than failing outright.

use netrecon_core::{Error, Result};

/// True if the current process can open a raw socket.
///
/// - **Unix**: root (effective UID 0).
/// - **Other platforms**: conservatively `false` — callers should downgrade.
pub fn has_raw_socket_capability() -> Result<bool> {
    #[cfg(unix)]
    {
        Ok(unsafe { libc::geteuid() } == 0)
    }

    #[cfg(not(unix))]
    {
        Ok(false)
    }
}

/// Error out if raw-socket access is unavailable, with a platform-specific hint.
pub fn check_privileges() -> Result<()> {
    if !has_raw_socket_capability()? {
        #[cfg(target_os = "linux")]
        let msg = "insufficient privileges for raw socket access; run as root or grant \
                   CAP_NET_RAW with: sudo setcap cap_net_raw+eip /path/to/netrecon";

        #[cfg(not(target_os = "linux"))]
        let msg = "insufficient privileges for raw socket access; run as root";

        return Err(Error::Privilege(msg.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_raw_socket_capability_does_not_panic() {
        assert!(has_raw_socket_capability().is_ok());
    }

    #[test]
    fn check_privileges_matches_capability() {
        let has_cap = has_raw_socket_capability().unwrap();
        let result = check_privileges();
        assert_eq!(result.is_ok(), has_cap);
    }
}
