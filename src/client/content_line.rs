//! Content-line handling shared by vCard (RFC 6350) and iCalendar (RFC 5545).

/// Maximum octets per physical line before folding
const FOLD_AT: usize = 75;

/// One logical `NAME;PARAMS:VALUE` line; value kept in its escaped form
#[derive(Debug, Clone, PartialEq)]
pub struct ContentLine {
    pub name: String,
    /// Raw parameter section including the leading `;`, or empty
    pub params: String,
    pub value: String,
}

impl ContentLine {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into().to_ascii_uppercase(),
            params: String::new(),
            value: value.into(),
        }
    }

    /// Build a line from an unescaped text value
    pub fn text(name: impl Into<String>, value: &str) -> Self {
        Self::new(name, escape_text(value))
    }

    pub fn with_params(mut self, params: &str) -> Self {
        self.params = if params.is_empty() || params.starts_with(';') {
            params.to_string()
        } else {
            format!(";{params}")
        };
        self
    }

    /// Parse an unfolded line; returns None for lines without a `:`
    pub fn parse(line: &str) -> Option<Self> {
        let mut in_quotes = false;
        let mut colon = None;
        for (idx, ch) in line.char_indices() {
            match ch {
                '"' => in_quotes = !in_quotes,
                ':' if !in_quotes => {
                    colon = Some(idx);
                    break;
                }
                _ => {}
            }
        }
        let colon = colon?;
        let (head, value) = (&line[..colon], &line[colon + 1..]);
        let (name, params) = match head.find(';') {
            Some(semi) => (&head[..semi], &head[semi..]),
            None => (head, ""),
        };
        if name.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_ascii_uppercase(),
            params: params.to_string(),
            value: value.to_string(),
        })
    }

    pub fn has_param(&self, param: &str) -> bool {
        self.params
            .split(';')
            .any(|p| p.eq_ignore_ascii_case(param))
    }

    pub fn unescaped(&self) -> String {
        unescape_text(&self.value)
    }

    pub fn render(&self) -> String {
        format!("{}{}:{}", self.name, self.params, self.value)
    }
}

/// Split a document into logical lines, joining folded continuations
pub fn unfold(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for raw in text.split('\n') {
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        if let Some(rest) = raw.strip_prefix([' ', '\t']) {
            if let Some(last) = lines.last_mut() {
                last.push_str(rest);
                continue;
            }
        }
        if !raw.is_empty() {
            lines.push(raw.to_string());
        }
    }
    lines
}

/// Parse every content line in a document
pub fn parse_all(text: &str) -> Vec<ContentLine> {
    unfold(text)
        .iter()
        .filter_map(|l| ContentLine::parse(l))
        .collect()
}

/// Render lines as a CRLF-terminated document, folding long lines
pub fn render_all<'a>(lines: impl IntoIterator<Item = &'a ContentLine>) -> String {
    let mut out = String::new();
    for line in lines {
        out.push_str(&fold(&line.render()));
        out.push_str("\r\n");
    }
    out
}

fn fold(line: &str) -> String {
    if line.len() <= FOLD_AT {
        return line.to_string();
    }
    let mut out = String::with_capacity(line.len() + line.len() / FOLD_AT * 3);
    let mut width = 0;
    for ch in line.chars() {
        // continuation lines start with a space, which counts toward the limit
        if width + ch.len_utf8() > FOLD_AT {
            out.push_str("\r\n ");
            width = 1;
        }
        out.push(ch);
        width += ch.len_utf8();
    }
    out
}

pub fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            _ => out.push(ch),
        }
    }
    out
}

pub fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// True for property names made only of letters, digits and dashes
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_params_and_quoted_colon() {
        let line = ContentLine::parse("DTSTART;TZID=\"Europe/Berlin:x\":20250115T140000").unwrap();
        assert_eq!(line.name, "DTSTART");
        assert_eq!(line.params, ";TZID=\"Europe/Berlin:x\"");
        assert_eq!(line.value, "20250115T140000");
    }

    #[test]
    fn test_parse_lowercase_name_and_value_with_colon() {
        let line = ContentLine::parse("url:https://example.com").unwrap();
        assert_eq!(line.name, "URL");
        assert_eq!(line.value, "https://example.com");
        assert!(ContentLine::parse("no colon here").is_none());
    }

    #[test]
    fn test_unfold_joins_continuations() {
        let lines = unfold("NOTE:first\r\n  half\r\n\t and more\r\nFN:Jane\r\n");
        assert_eq!(lines, vec!["NOTE:first half and more", "FN:Jane"]);
    }

    #[test]
    fn test_escape_round_trip_special_characters() {
        let raw = "a;b,c\\d\nnext";
        let escaped = escape_text(raw);
        assert_eq!(escaped, "a\\;b\\,c\\\\d\\nnext");
        assert_eq!(unescape_text(&escaped), raw);
    }

    #[test]
    fn test_long_lines_are_folded_on_char_boundaries() {
        let line = ContentLine::text("NOTE", &"ü".repeat(100));
        let rendered = render_all([&line]);
        for physical in rendered.split("\r\n").filter(|l| !l.is_empty()) {
            assert!(physical.len() <= FOLD_AT, "{} octets", physical.len());
        }
        let back = parse_all(&rendered);
        assert_eq!(back[0].unescaped(), "ü".repeat(100));
    }

    #[test]
    fn test_has_param() {
        let line = ContentLine::parse("DTSTART;VALUE=DATE:20250101").unwrap();
        assert!(line.has_param("value=date"));
        assert!(!line.has_param("TZID=UTC"));
    }

    #[test]
    fn test_valid_names() {
        assert!(is_valid_name("X-SOCIALPROFILE"));
        assert!(!is_valid_name("BAD NAME"));
        assert!(!is_valid_name(""));
    }
}
