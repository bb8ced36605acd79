//! Banner matchers (component 4.F): turn tokens/banners into canonical CPE
//! strings (`part:vendor:product[:version]`).

use crate::tokenizer::{AutoTokenizer, Tokenizer};
use netrecon_core::{CpeDictionary, CpeEntry, RegexFingerprint};
use std::collections::HashMap;

pub trait Matcher {
    fn scan(&self, banner: &str) -> Vec<String>;
}

/// Linear scan of the regex fingerprint catalogue; at most one CPE emitted
/// per distinct (vendor, product) pair across the whole catalogue.
pub struct ServiceRegexMatcher<'a> {
    entries: &'a [RegexFingerprint],
}

impl<'a> ServiceRegexMatcher<'a> {
    pub fn new(entries: &'a [RegexFingerprint]) -> Self {
        Self { entries }
    }
}

impl Matcher for ServiceRegexMatcher<'_> {
    fn scan(&self, banner: &str) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for fingerprint in self.entries {
            let Some(caps) = fingerprint.pattern.captures(banner) else {
                continue;
            };
            let mut cpe = fingerprint.cpe_template.clone();
            for (i, group) in caps.iter().enumerate().skip(1) {
                if let Some(m) = group {
                    cpe = cpe.replace(&format!("${i}"), m.as_str());
                }
            }
            let key = cpe.rsplit_once(':').map(|(prefix, _)| prefix.to_string());
            let dedup_key = key.unwrap_or_else(|| cpe.clone());
            if seen.insert(dedup_key) {
                out.push(cpe);
            }
        }
        out
    }
}

/// Tokenises with [`AutoTokenizer`], then resolves each `product[/version]`
/// token against the CPE dictionary's inverted product-name index.
pub struct CpeDictionaryMatcher<'a> {
    by_product: HashMap<String, Vec<&'a CpeEntry>>,
}

/// Known product-name aliases the dictionary doesn't spell out explicitly.
const ALIASES: &[(&str, &str)] = &[("openssh", "openssh"), ("nginx", "nginx")];

impl<'a> CpeDictionaryMatcher<'a> {
    pub fn new(dictionary: &'a CpeDictionary) -> Self {
        let mut by_product: HashMap<String, Vec<&CpeEntry>> = HashMap::new();
        for entry in &dictionary.entries {
            by_product
                .entry(entry.product.to_lowercase())
                .or_default()
                .push(entry);
        }
        Self { by_product }
    }

    fn normalize(token: &str) -> (String, Option<String>) {
        let token = token.trim_matches(|c: char| c.is_ascii_punctuation() && c != '/' && c != '.');
        match token.split_once('/') {
            Some((prod, ver)) => (prod.to_lowercase(), Some(ver.to_string())),
            None => (token.to_lowercase(), None),
        }
    }

    fn lookup(&self, product: &str) -> Option<&Vec<&'a CpeEntry>> {
        let canonical = ALIASES
            .iter()
            .find(|(alias, _)| *alias == product)
            .map(|(_, canon)| *canon)
            .unwrap_or(product);
        self.by_product.get(canonical)
    }
}

impl Matcher for CpeDictionaryMatcher<'_> {
    fn scan(&self, banner: &str) -> Vec<String> {
        let tokens = AutoTokenizer.tokenize(banner);
        let mut out = Vec::new();

        for token in &tokens {
            let (product, version) = Self::normalize(token);
            let Some(entries) = self.lookup(&product) else {
                continue;
            };

            for entry in entries {
                let cpe = match &version {
                    Some(v) if entry.matches_version(v) => {
                        format!(
                            "{}:{}:{}:{}",
                            entry.part, entry.vendor, entry.product, v
                        )
                    }
                    _ => entry.to_cpe_string(),
                };
                if !out.contains(&cpe) {
                    out.push(cpe);
                }
            }
        }

        out.sort();
        out.dedup();
        out
    }
}

/// Unions [`ServiceRegexMatcher`] and [`CpeDictionaryMatcher`] output.
pub struct AutoMatcher<'a> {
    regex: ServiceRegexMatcher<'a>,
    dictionary: CpeDictionaryMatcher<'a>,
}

impl<'a> AutoMatcher<'a> {
    pub fn new(regex_entries: &'a [RegexFingerprint], dictionary: &'a CpeDictionary) -> Self {
        Self {
            regex: ServiceRegexMatcher::new(regex_entries),
            dictionary: CpeDictionaryMatcher::new(dictionary),
        }
    }
}

impl Matcher for AutoMatcher<'_> {
    fn scan(&self, banner: &str) -> Vec<String> {
        let mut out = self.regex.scan(banner);
        out.extend(self.dictionary.scan(banner));
        out.sort();
        out.dedup();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fingerprint(pattern: &str, template: &str) -> RegexFingerprint {
        RegexFingerprint::new(pattern, template).unwrap()
    }

    #[test]
    fn regex_matcher_substitutes_capture_groups() {
        let entries = vec![fingerprint(
            r"SSH-2\.0-OpenSSH_([\d.]+)",
            "a:openbsd:openssh:$1",
        )];
        let matcher = ServiceRegexMatcher::new(&entries);
        let out = matcher.scan("SSH-2.0-OpenSSH_13.37\r\n");
        assert_eq!(out, vec!["a:openbsd:openssh:13.37"]);
    }

    #[test]
    fn regex_matcher_dedups_by_vendor_product() {
        let entries = vec![
            fingerprint(r"nginx/([\d.]+)", "a:nginx:nginx:$1"),
            fingerprint(r"nginx", "a:nginx:nginx:unknown"),
        ];
        let matcher = ServiceRegexMatcher::new(&entries);
        let out = matcher.scan("Server: nginx/1.4.6");
        assert_eq!(out.len(), 1);
    }

    fn cpe(product: &str, version: &str, prev: &[&str]) -> CpeEntry {
        CpeEntry {
            part: 'a',
            vendor: product.to_string(),
            product: product.to_string(),
            version: Some(version.to_string()),
            title: None,
            prev_versions: prev.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn dictionary_matcher_resolves_apache_and_php_and_dedups_sorted() {
        let dict = CpeDictionary {
            entries: vec![
                CpeEntry {
                    part: 'a',
                    vendor: "apache".into(),
                    product: "http_server".into(),
                    version: Some("31.33.7".into()),
                    title: None,
                    prev_versions: vec![],
                },
                cpe("php", "5.2.4", &[]),
            ],
        };
        let mut index = std::collections::HashMap::new();
        index.insert("http_server".to_string(), vec![&dict.entries[0]]);
        let matcher = CpeDictionaryMatcher {
            by_product: {
                let mut m: HashMap<String, Vec<&CpeEntry>> = HashMap::new();
                m.insert("http_server".into(), vec![&dict.entries[0]]);
                m.insert("php".into(), vec![&dict.entries[1]]);
                // apache banners name the product "Apache" for http_server
                m.insert("apache".into(), vec![&dict.entries[0]]);
                m
            },
        };
        let banner = "HTTP/1.1 200 OK\r\nServer: Apache/31.33.7 PHP/5.2.4-2ubuntu5.2.5\r\n\r\n";
        let out = matcher.scan(banner);
        assert_eq!(out, vec!["a:apache:http_server:31.33.7", "a:php:php:5.2.4"]);
    }

    #[test]
    fn dictionary_matcher_falls_back_to_versionless_cpe_on_version_mismatch() {
        let entry = cpe("ios", "12.2se", &["12.2"]);
        let dict = CpeDictionary {
            entries: vec![entry],
        };
        let matcher = CpeDictionaryMatcher::new(&dict);
        let out = matcher.scan("ios/99.0");
        assert_eq!(out, vec!["a:ios:ios:12.2se"]);
    }
}
