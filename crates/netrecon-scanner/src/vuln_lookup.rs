//! Vulnerability lookup (component 4.G): map CPEs to CVE records using the
//! prefix-inverted catalogue, with loose dotted-version comparison.

use netrecon_core::{CveCatalog, CveRecord};
use std::collections::HashMap;

/// Look up CVEs for each of `cpes`, returning a map keyed by the input CPE string.
pub fn lookup<'a>(catalog: &'a CveCatalog, cpes: &[String]) -> HashMap<String, Vec<&'a CveRecord>> {
    let mut out = HashMap::new();
    for cpe in cpes {
        let records = lookup_one(catalog, cpe);
        out.insert(cpe.clone(), records);
    }
    out
}

fn lookup_one<'a>(catalog: &'a CveCatalog, cpe: &str) -> Vec<&'a CveRecord> {
    // Drop the leading `a`/`o`/`h` part letter; catalog prefixes are
    // `vendor:product[:version]`.
    let mut fields = cpe.splitn(2, ':');
    fields.next();
    let Some(vendor_product_version) = fields.next() else {
        return Vec::new();
    };
    let (vendor_product, version) = match vendor_product_version.splitn(3, ':').collect::<Vec<_>>()[..] {
        [vendor, product, version] => (format!("{vendor}:{product}"), Some(version)),
        [vendor, product] => (format!("{vendor}:{product}"), None),
        _ => return Vec::new(),
    };

    let mut matches = Vec::new();
    for catalog_prefix in catalog.prefixes() {
        let (catalog_base, catalog_version) = match catalog_prefix.splitn(3, ':').collect::<Vec<_>>()[..] {
            [vendor, product, version] => (format!("{vendor}:{product}"), Some(version)),
            [vendor, product] => (format!("{vendor}:{product}"), None),
            _ => continue,
        };
        if catalog_base != vendor_product {
            continue;
        }
        let version_matches = match (version, catalog_version) {
            (Some(v), Some(cv)) => version_compare(v, cv) == std::cmp::Ordering::Equal,
            _ => true,
        };
        if version_matches {
            matches.extend(catalog.entries_for_prefix(catalog_prefix));
        }
    }
    matches
}

/// Loose dotted-version comparison: numeric components left-to-right, absent
/// components treated as 0, non-numeric suffixes (`-2ubuntu5.17`, `5.2se`)
/// compared only up to their last parseable numeric component.
pub fn version_compare(a: &str, b: &str) -> std::cmp::Ordering {
    let a_parts = numeric_components(a);
    let b_parts = numeric_components(b);
    let len = a_parts.len().max(b_parts.len());
    for i in 0..len {
        let a_val = a_parts.get(i).copied().unwrap_or(0);
        let b_val = b_parts.get(i).copied().unwrap_or(0);
        match a_val.cmp(&b_val) {
            std::cmp::Ordering::Equal => continue,
            other => return other,
        }
    }
    std::cmp::Ordering::Equal
}

/// Keep only the leading dotted-digit run (`"5.2.4-2ubuntu5.17"` -> `"5.2.4"`,
/// `"12.2se"` -> `"12.2"`) and split that on dots.
fn numeric_components(version: &str) -> Vec<u64> {
    let cutoff = version
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(version.len());
    version[..cutoff]
        .split('.')
        .filter(|s| !s.is_empty())
        .map_while(|s| s.parse::<u64>().ok())
        .collect()
}
