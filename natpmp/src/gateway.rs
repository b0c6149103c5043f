//! Discovery of the default gateway.
//!
//! This is a best effort: the address found may or may not be the one that should be
//! contacted. Callers that know their gateway should always pass it explicitly.

use std::{net::Ipv4Addr, sync::LazyLock};

use regex::Regex;
use tokio::process::Command;
use tracing::debug;

use crate::error::NetworkError;

#[cfg(target_os = "linux")]
const PROC_NET_ROUTE_PATH: &str = "/proc/net/route";
/// The max number of lines to read from /proc/net/route looking for a default route.
#[cfg(target_os = "linux")]
const MAX_PROC_NET_ROUTE_READ: usize = 1000;

/// Matches the default route in the output of `netstat -rn` on POSIX systems.
static NETSTAT_DEFAULT_ROUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^(?:default|0\.0\.0\.0|::/0)\s+([\w\.:]+)\s+.*UG")
        .expect("hardcoded regex is valid")
});

/// Finds the address of the default gateway.
///
/// On Linux the routing table is read from `/proc/net/route`. Everywhere else, or if that
/// fails, the output of `netstat -rn` is inspected.
pub async fn discover_gateway() -> Result<Ipv4Addr, NetworkError> {
    #[cfg(target_os = "linux")]
    match tokio::fs::read_to_string(PROC_NET_ROUTE_PATH).await {
        Ok(table) => {
            if let Some(gateway) = parse_proc_net_route(&table) {
                debug!(%gateway, "gateway found in {PROC_NET_ROUTE_PATH}");
                return Ok(gateway);
            }
        }
        Err(e) => debug!("failed to read {PROC_NET_ROUTE_PATH}: {e}"),
    }

    let output = Command::new("netstat")
        .arg("-rn")
        .output()
        .await
        .map_err(|e| {
            debug!("failed to run netstat: {e}");
            NetworkError::GatewayNotFound
        })?;
    if output.stdout.is_empty() {
        return Err(NetworkError::GatewayNotFound);
    }
    let gateway =
        parse_netstat(&String::from_utf8_lossy(&output.stdout)).ok_or(NetworkError::GatewayNotFound)?;
    debug!(%gateway, "gateway found with netstat");
    Ok(gateway)
}

/// Parses 10.0.0.1 out of:
///
/// ```norun
/// $ cat /proc/net/route
/// Iface   Destination     Gateway         Flags   RefCnt  Use     Metric  Mask            MTU     Window  IRTT
/// ens18   00000000        0100000A        0003    0       0       0       00000000        0       0       0
/// ens18   0000000A        00000000        0001    0       0       0       0000FFFF        0       0       0
/// ```
#[cfg(target_os = "linux")]
fn parse_proc_net_route(table: &str) -> Option<Ipv4Addr> {
    const UP_GATEWAY: u16 = libc::RTF_UP | libc::RTF_GATEWAY;

    // skip the header line
    for line in table.lines().skip(1).take(MAX_PROC_NET_ROUTE_READ) {
        let mut fields = line.split_ascii_whitespace().skip(1);
        let (Some(destination_hex), Some(gateway_hex), Some(flags_hex)) =
            (fields.next(), fields.next(), fields.next())
        else {
            continue;
        };

        let mut destination_bytes = [0u8; 4];
        let mut gateway_bytes = [0u8; 4];
        let mut flags_bytes = [0u8; 2];
        if hex::decode_to_slice(destination_hex, &mut destination_bytes).is_err()
            || hex::decode_to_slice(gateway_hex, &mut gateway_bytes).is_err()
            || hex::decode_to_slice(flags_hex, &mut flags_bytes).is_err()
        {
            continue;
        }

        let flags = u16::from_be_bytes(flags_bytes);
        if flags & UP_GATEWAY != UP_GATEWAY || destination_bytes != [0; 4] {
            continue;
        }

        // addresses are written in host byte order
        let gateway = Ipv4Addr::from(u32::from_le_bytes(gateway_bytes));
        if !gateway.is_unspecified() {
            return Some(gateway);
        }
    }
    None
}

/// Finds the IPv4 default gateway in the output of `netstat -rn`.
fn parse_netstat(output: &str) -> Option<Ipv4Addr> {
    NETSTAT_DEFAULT_ROUTE
        .captures_iter(output)
        .find_map(|captures| captures[1].parse().ok())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[cfg(target_os = "linux")]
    #[test]
    fn test_parse_proc_net_route() {
        let table = "\
Iface\tDestination\tGateway \tFlags\tRefCnt\tUse\tMetric\tMask\t\tMTU\tWindow\tIRTT
ens18\t0000000A\t00000000\t0001\t0\t0\t0\t0000FFFF\t0\t0\t0
ens18\t00000000\t0100000A\t0003\t0\t0\t0\t00000000\t0\t0\t0
";
        assert_eq!(parse_proc_net_route(table), Some(Ipv4Addr::new(10, 0, 0, 1)));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_parse_proc_net_route_without_default() {
        let table = "\
Iface\tDestination\tGateway \tFlags\tRefCnt\tUse\tMetric\tMask\t\tMTU\tWindow\tIRTT
ens18\t0000000A\t00000000\t0001\t0\t0\t0\t0000FFFF\t0\t0\t0
docker0\t000011AC\t0101A8C0\t0001\t0\t0\t0\t0000FFFF\t0\t0\t0
garbage line
";
        assert_eq!(parse_proc_net_route(table), None);
        assert_eq!(parse_proc_net_route(""), None);
    }

    #[test]
    fn test_parse_netstat_macos() {
        let output = "\
Routing tables

Internet:
Destination        Gateway            Flags        Netif Expire
default            192.168.1.1        UGScg          en0
127                127.0.0.1          UCS            lo0
192.168.1          link#6             UCS            en0      !
";
        assert_eq!(parse_netstat(output), Some(Ipv4Addr::new(192, 168, 1, 1)));
    }

    #[test]
    fn test_parse_netstat_linux() {
        let output = "\
Kernel IP routing table
Destination     Gateway         Genmask         Flags   MSS Window  irtt Iface
0.0.0.0         10.0.1.1        0.0.0.0         UG        0 0          0 wlan0
10.0.1.0        0.0.0.0         255.255.255.0   U         0 0          0 wlan0
";
        assert_eq!(parse_netstat(output), Some(Ipv4Addr::new(10, 0, 1, 1)));
    }

    #[test]
    fn test_parse_netstat_skips_ipv6() {
        let output = "\
::/0                           fe80::1%en0                     UGcg           en0
default            172.16.0.254       UGSc           en1
";
        assert_eq!(parse_netstat(output), Some(Ipv4Addr::new(172, 16, 0, 254)));
        assert_eq!(parse_netstat("no routes here"), None);
    }
}
