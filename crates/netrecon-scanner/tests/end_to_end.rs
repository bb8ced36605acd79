//! End-to-end scenarios from spec.md §8, driven purely through the crate's
//! public API (no live network, no subprocess) — literal inputs/outputs
//! recovered from `examples/original_source/Test.cpp`.

use netrecon_core::{CpeDictionary, CpeEntry, CveCatalog, CveRecord, Host, OpSys, Protocol, RegexCatalog, ScanReason, Severity};
use netrecon_scanner::host_scanner::NmapScanner;
use netrecon_scanner::matcher::{AutoMatcher, Matcher};
use netrecon_scanner::scanner_factory::{ServiceScanner, ServiceScannerFactory};
use netrecon_scanner::tokenizer::{HttpTokenizer, ThreeDigitTokenizer, Tokenizer};
use netrecon_scanner::vuln_lookup;
use netrecon_scanner::{AutoIdentifier, OsIdentifier};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[test]
fn scenario_1_http_tokenizer() {
    let banner = "HTTP/1.1 200 OK\r\nServer: nginx/1.4.6 (Ubuntu)\r\n\r\n";
    let tokens = HttpTokenizer.tokenize(banner);
    assert_eq!(tokens, vec!["nginx/1.4.6", "Ubuntu"]);
}

#[test]
fn scenario_2_three_digit_tokenizer() {
    let banner = "220-mx ESMTP Exim 4.86 #2 Tue, 01 Mar 2016 00:00:00 +0000\r\n220 and/or bulk e-mail.\r\n";
    let greetings = ThreeDigitTokenizer.tokenize(banner);
    assert_eq!(greetings.first().map(String::as_str), Some("ESMTP Exim 4.86 #2"));
}

#[test]
fn scenario_3_auto_matcher() {
    let regex_catalog = RegexCatalog { entries: Vec::new() };
    let dictionary = CpeDictionary {
        entries: vec![
            CpeEntry {
                part: 'a',
                vendor: "apache".to_string(),
                product: "apache".to_string(),
                version: Some("31.33.7".to_string()),
                title: None,
                prev_versions: Vec::new(),
            },
            CpeEntry {
                part: 'a',
                vendor: "php".to_string(),
                product: "php".to_string(),
                version: Some("5.2.4".to_string()),
                title: None,
                prev_versions: Vec::new(),
            },
        ],
    };

    let banner = "HTTP/1.1 200 OK\r\nServer: Apache/31.33.7 PHP/5.2.4-2ubuntu5.2.5\r\n\r\n";
    let tokens = HttpTokenizer.tokenize(banner);
    assert_eq!(tokens, vec!["Apache/31.33.7", "PHP/5.2.4-2ubuntu5.2.5"]);

    let matcher = AutoMatcher::new(&regex_catalog.entries, &dictionary);
    let mut cpes = matcher.scan(banner);
    cpes.sort();
    assert_eq!(
        cpes,
        vec!["a:apache:apache:31.33.7".to_string(), "a:php:php:5.2.4".to_string()]
    );
}

#[test]
fn scenario_4_regex_matcher() {
    let entries = vec![netrecon_core::RegexFingerprint::new(
        r"SSH-2\.0-OpenSSH_([\d.]+)",
        "a:openbsd:openssh:$1",
    )
    .unwrap()];
    let dictionary = CpeDictionary { entries: Vec::new() };
    let matcher = AutoMatcher::new(&entries, &dictionary);

    let cpes = matcher.scan("SSH-2.0-OpenSSH_13.37\r\n");
    assert_eq!(cpes, vec!["a:openbsd:openssh:13.37".to_string()]);
}

#[test]
fn scenario_5_vulnerability_lookup() {
    let mut by_prefix: HashMap<String, Vec<CveRecord>> = HashMap::new();
    by_prefix.insert(
        "apache:http_server".to_string(),
        vec![
            CveRecord { cve: "2012-2687".to_string(), severity: Severity::High, cvss: None },
            CveRecord { cve: "2014-0231".to_string(), severity: Severity::Medium, cvss: None },
        ],
    );
    by_prefix.insert(
        "php:php".to_string(),
        vec![
            CveRecord { cve: "2013-6712".to_string(), severity: Severity::Critical, cvss: None },
            CveRecord { cve: "2015-6836".to_string(), severity: Severity::High, cvss: None },
        ],
    );
    let catalog = CveCatalog::from_map(by_prefix);

    let cpes = vec![
        "a:apache:http_server:2.2.22".to_string(),
        "a:php:php:5.5.5".to_string(),
    ];
    let found = vuln_lookup::lookup(&catalog, &cpes);

    let apache_cves: Vec<&str> = found["a:apache:http_server:2.2.22"]
        .iter()
        .map(|r| r.cve.as_str())
        .collect();
    assert!(apache_cves.contains(&"2012-2687"));
    assert!(apache_cves.contains(&"2014-0231"));

    let php_cves: Vec<&str> = found["a:php:php:5.5.5"].iter().map(|r| r.cve.as_str()).collect();
    assert!(php_cves.contains(&"2013-6712"));
    assert!(php_cves.contains(&"2015-6836"));
}

#[test]
fn scenario_6_os_identifier() {
    let mut host = Host::new("10.0.0.1", &[(Protocol::Tcp, 22)]);
    host.services[0].set_outcome(
        ScanReason::ReplyReceived,
        b"SSH-2.0-OpenSSH_6.6.1p1 Debian-2ubuntu2.4\r\n".to_vec(),
    );

    assert!(AutoIdentifier.scan(&mut host));
    assert_eq!(host.op_sys, OpSys::Ubuntu);
    assert_eq!(host.os_ver, Some(14.04));
}

#[test]
fn scenario_7_factory_dispatch() {
    let factory = ServiceScannerFactory {
        tcp_timeout: Duration::from_millis(100),
        udp_timeout: Duration::from_millis(100),
        icmp_timeout: Duration::from_millis(100),
        payloads: Arc::new(netrecon_core::loader::PayloadCatalog::default()),
        skip_banner_grab: true,
        banner_timeout: Duration::from_millis(100),
    };

    assert!(matches!(factory.get(Protocol::Tcp), ServiceScanner::Tcp(_)));
    assert!(matches!(factory.get(Protocol::IcmpV6), ServiceScanner::Icmp(_)));
}

#[test]
fn scenario_8_nmap_xml_ingest() {
    const SAMPLE_XML: &str = r#"<?xml version="1.0"?>
<nmaprun>
  <host>
    <address addr="178.62.249.168" addrtype="ipv4"/>
    <ports>
      <port protocol="tcp" portid="25">
        <state state="open"/>
        <script id="banner" output="220 mail.example.com ESMTP Postfix"/>
      </port>
    </ports>
  </host>
</nmaprun>"#;

    let hosts = NmapScanner::process(SAMPLE_XML).unwrap();
    assert_eq!(hosts.len(), 1);
    assert_eq!(hosts[0].address, "178.62.249.168");
    assert_eq!(hosts[0].services.len(), 1);

    let service = &hosts[0].services[0];
    assert_eq!(service.port, 25);
    assert!(service.alive);
    assert_eq!(service.reason, ScanReason::ReplyReceived);
    assert!(!service.banner.is_empty());
}
