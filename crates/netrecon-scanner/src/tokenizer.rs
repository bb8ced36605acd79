//! Banner tokenizers (component 4.E): turn a raw banner into short
//! `product` / `product/version` tokens that the matchers downstream
//! (component F) key their regex and dictionary lookups on.

/// A tokenizer declares whether it can handle a banner and, if so, emits an
/// ordered sequence of tokens from it.
pub trait Tokenizer {
    fn can_tokenize(&self, banner: &str) -> bool;
    fn tokenize(&self, banner: &str) -> Vec<String>;
}

/// Matches `HTTP/...` responses and tokenizes the header block up to the
/// first blank line.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpTokenizer;

impl HttpTokenizer {
    fn header_block(banner: &str) -> &str {
        match banner.find("\r\n\r\n").or_else(|| banner.find("\n\n")) {
            Some(idx) => &banner[..idx],
            None => banner,
        }
    }

    fn tokenize_value(value: &str, out: &mut Vec<String>) {
        for comment in split_parenthesised(value) {
            match comment {
                Segment::Plain(text) => Self::tokenize_plain(text, out),
                Segment::Parenthesised(inner) => {
                    for word in inner.split(|c: char| c.is_whitespace() || c == '/') {
                        let word = word.trim_matches(|c: char| ",;()".contains(c));
                        if !word.is_empty() {
                            out.push(word.to_string());
                        }
                    }
                }
            }
        }
    }

    fn tokenize_plain(text: &str, out: &mut Vec<String>) {
        for raw in text.split([',', ';']) {
            for atom in raw.split_whitespace() {
                let atom = atom.trim_matches(|c: char| ",;()".contains(c));
                if !atom.is_empty() {
                    out.push(atom.to_string());
                }
            }
        }
    }
}

enum Segment<'a> {
    Plain(&'a str),
    Parenthesised(&'a str),
}

/// Split `"Apache (Ubuntu) PHP/5.2"` into alternating plain/parenthesised runs.
fn split_parenthesised(value: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut rest = value;
    while let Some(open) = rest.find('(') {
        if open > 0 {
            segments.push(Segment::Plain(&rest[..open]));
        }
        let after_open = &rest[open + 1..];
        match after_open.find(')') {
            Some(close) => {
                segments.push(Segment::Parenthesised(&after_open[..close]));
                rest = &after_open[close + 1..];
            }
            None => {
                segments.push(Segment::Plain(after_open));
                rest = "";
                break;
            }
        }
    }
    if !rest.is_empty() {
        segments.push(Segment::Plain(rest));
    }
    segments
}

impl Tokenizer for HttpTokenizer {
    fn can_tokenize(&self, banner: &str) -> bool {
        banner.starts_with("HTTP/")
    }

    fn tokenize(&self, banner: &str) -> Vec<String> {
        let mut out = Vec::new();
        for line in Self::header_block(banner).lines().skip(1) {
            let Some((name, value)) = line.split_once(':') else {
                continue;
            };
            let name = name.trim();
            let value = value.trim();
            if value.is_empty() {
                continue;
            }

            if name.eq_ignore_ascii_case("Server") || name.eq_ignore_ascii_case("X-Powered-By") {
                let normalized = value.replace("Servlet 2.5;", "Servlet/2.5;");
                Self::tokenize_value(&normalized, &mut out);
            } else if let Some(suffix) = name.strip_prefix("X-") {
                let suffix = suffix.strip_suffix("-Version").unwrap_or(suffix);
                out.push(format!("{suffix}/{value}"));
            }
        }
        out
    }
}

/// Matches banners whose first three bytes are a digit response code
/// (`220`, `250`, ...) followed by a space or hyphen, as used by SMTP/FTP/etc.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreeDigitTokenizer;

impl ThreeDigitTokenizer {
    fn is_code_line(line: &str) -> Option<(&str, char, &str)> {
        let bytes = line.as_bytes();
        if bytes.len() < 4 || !bytes[..3].iter().all(u8::is_ascii_digit) {
            return None;
        }
        let sep = bytes[3] as char;
        if sep != ' ' && sep != '-' {
            return None;
        }
        Some((&line[..3], sep, line[4..].trim()))
    }

    /// Known product markers that make a 220 line worth treating as a greeting.
    const GREETING_MARKERS: [&'static str; 4] = ["ESMTP", "SMTP", "FTP", "Microsoft"];

    /// Strip the leading hostname/IP-literal token, then cut the remainder
    /// off right before whichever comes first: a parenthesised comment, a
    /// weekday/date timestamp, or a "ready"/"Ready" trailer, e.g.
    /// `"mx ESMTP Exim 4.86 #2 Tue, 01 Mar..."` -> `"ESMTP Exim 4.86 #2"`,
    /// `"xxx Microsoft ESMTP MAIL Service ready at Tue, ..."` ->
    /// `"Microsoft ESMTP MAIL Service"`.
    fn extract_greeting(rest: &str) -> String {
        let without_host = match rest.split_once(char::is_whitespace) {
            Some((_, tail)) => tail,
            None => "",
        };
        truncate_at_marker(without_host).trim().to_string()
    }
}

/// Cut a greeting tail off right before the earliest of a parenthesised
/// comment, a weekday timestamp, or a "ready" trailer, if any are present.
fn truncate_at_marker(text: &str) -> &str {
    const WEEKDAYS: &[&str] = &["Mon,", "Tue,", "Wed,", "Thu,", "Fri,", "Sat,", "Sun,"];

    let mut cut = text.find('(');
    for day in WEEKDAYS {
        if let Some(pos) = text.find(day) {
            cut = Some(cut.map_or(pos, |c| c.min(pos)));
        }
    }
    if let Some(pos) = text.to_ascii_lowercase().find("ready") {
        cut = Some(cut.map_or(pos, |c| c.min(pos)));
    }

    match cut {
        Some(pos) => text[..pos].trim_end(),
        None => text,
    }
}

impl Tokenizer for ThreeDigitTokenizer {
    fn can_tokenize(&self, banner: &str) -> bool {
        ThreeDigitTokenizer::is_code_line(banner.lines().next().unwrap_or("")).is_some()
    }

    fn tokenize(&self, banner: &str) -> Vec<String> {
        let mut greetings = Vec::new();
        for line in banner.lines() {
            let Some((code, _sep, rest)) = Self::is_code_line(line) else {
                continue;
            };
            // Only 220 (service ready) lines carry a greeting, and only
            // when they actually name a known product marker — plenty of
            // 220/250 continuation lines are just protocol chatter.
            if code != "220" || !Self::GREETING_MARKERS.iter().any(|m| rest.contains(m)) {
                continue;
            }
            let greeting = Self::extract_greeting(rest);
            if !greeting.is_empty() {
                greetings.push(greeting);
            }
        }
        greetings
    }
}

/// Tries [`HttpTokenizer`], then [`ThreeDigitTokenizer`]; falls back to a
/// single-token passthrough. Never fails, per the error-handling contract.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoTokenizer;

impl Tokenizer for AutoTokenizer {
    fn can_tokenize(&self, _banner: &str) -> bool {
        true
    }

    fn tokenize(&self, banner: &str) -> Vec<String> {
        if banner.is_empty() {
            return Vec::new();
        }
        let http = HttpTokenizer;
        if http.can_tokenize(banner) {
            return http.tokenize(banner);
        }
        let three_digit = ThreeDigitTokenizer;
        if three_digit.can_tokenize(banner) {
            return three_digit.tokenize(banner);
        }
        vec![banner.trim().to_string()]
    }
}
