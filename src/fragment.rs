//! Deep-link state carried in a URL fragment:
//! `#doc=<id>&page=<n>&mode=<single|double|scroll>`.

use crate::zoom::DisplayMode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewFragment {
    pub document_id: String,
    pub page: u32,
    pub mode: DisplayMode,
}

impl ViewFragment {
    pub fn new(document_id: impl Into<String>, page: u32, mode: DisplayMode) -> Self {
        Self {
            document_id: document_id.into(),
            page: page.max(1),
            mode,
        }
    }

    pub fn encode(&self) -> String {
        format!(
            "#doc={}&page={}&mode={}",
            escape(&self.document_id),
            self.page,
            self.mode
        )
    }

    /// Parse a fragment with or without its leading `#`. Unknown keys are
    /// ignored; a missing or bad page means 1 and a missing or unknown mode
    /// means single. `None` without a document id.
    pub fn parse(fragment: &str) -> Option<Self> {
        let body = fragment.strip_prefix('#').unwrap_or(fragment);
        let mut document_id = None;
        let mut page = 1;
        let mut mode = DisplayMode::Single;

        for pair in body.split('&') {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            match key {
                "doc" => document_id = unescape(value).filter(|id| !id.is_empty()),
                "page" => page = value.parse::<u32>().ok().filter(|p| *p >= 1).unwrap_or(1),
                "mode" => mode = DisplayMode::parse(value).unwrap_or_default(),
                _ => {}
            }
        }

        Some(Self {
            document_id: document_id?,
            page,
            mode,
        })
    }
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

fn unescape(value: &str) -> Option<String> {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = value.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}
