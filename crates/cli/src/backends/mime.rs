//! Just enough RFC 5322 / MIME decoding to read replies: unfolded headers,
//! encoded-word subjects, and the first `text/plain` part of a message.

use anyhow::{bail, Result};
use base64::{engine::general_purpose, Engine as _};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMessage {
    pub from: String,
    pub subject: String,
    pub body: String,
}

struct Part<'a> {
    headers: Vec<(String, String)>,
    body: &'a str,
}

impl<'a> Part<'a> {
    fn parse(raw: &'a str) -> Self {
        let (head, body) = if let Some(body) = raw.strip_prefix('\n') {
            ("", body)
        } else {
            match raw.find("\n\n") {
                Some(idx) => (&raw[..idx], &raw[idx + 2..]),
                None => (raw, ""),
            }
        };
        Self {
            headers: unfold_headers(head),
            body,
        }
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn content_type(&self) -> String {
        self.header("Content-Type")
            .and_then(|v| v.split(';').next())
            .map(|v| v.trim().to_ascii_lowercase())
            .unwrap_or_else(|| "text/plain".to_string())
    }

    fn boundary(&self) -> Option<String> {
        let value = self.header("Content-Type")?;
        value.split(';').skip(1).find_map(|param| {
            let (key, val) = param.split_once('=')?;
            key.trim()
                .eq_ignore_ascii_case("boundary")
                .then(|| val.trim().trim_matches('"').to_string())
        })
    }

    fn decoded_body(&self) -> String {
        let encoding = self
            .header("Content-Transfer-Encoding")
            .map(|v| v.trim().to_ascii_lowercase())
            .unwrap_or_default();
        match encoding.as_str() {
            "base64" => {
                let compact: String = self.body.split_whitespace().collect();
                match general_purpose::STANDARD.decode(compact) {
                    Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                    Err(_) => self.body.to_string(),
                }
            }
            "quoted-printable" => decode_quoted_printable(self.body),
            _ => self.body.to_string(),
        }
    }

    /// First `text/plain` leaf, searching nested multiparts depth first.
    fn plain_text(&self) -> Option<String> {
        let content_type = self.content_type();
        if content_type.starts_with("multipart/") {
            let boundary = self.boundary()?;
            return split_parts(self.body, &boundary)
                .into_iter()
                .find_map(|raw| Part::parse(raw).plain_text());
        }
        (content_type == "text/plain").then(|| self.decoded_body())
    }
}

/// Parses a raw message. Fails when no plain-text body can be found.
pub fn parse_message(raw: &[u8]) -> Result<ParsedMessage> {
    let text = String::from_utf8_lossy(raw).replace("\r\n", "\n");
    let message = Part::parse(&text);

    let Some(body) = message.plain_text() else {
        bail!("no text/plain part in message");
    };

    Ok(ParsedMessage {
        from: message.header("From").unwrap_or_default().to_string(),
        subject: decode_encoded_words(message.header("Subject").unwrap_or_default()),
        body,
    })
}

fn unfold_headers(head: &str) -> Vec<(String, String)> {
    let mut headers: Vec<(String, String)> = Vec::new();
    for line in head.lines() {
        if line.starts_with([' ', '\t']) {
            if let Some((_, value)) = headers.last_mut() {
                value.push(' ');
                value.push_str(line.trim());
            }
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }
    }
    headers
}

fn split_parts<'a>(body: &'a str, boundary: &str) -> Vec<&'a str> {
    let delimiter = format!("--{}", boundary);
    body.split(delimiter.as_str())
        .skip(1)
        .take_while(|chunk| !chunk.starts_with("--"))
        .map(|chunk| chunk.strip_prefix('\n').unwrap_or(chunk))
        .collect()
}

/// Decodes `=?charset?B?...?=` and `=?charset?Q?...?=` words; everything
/// else is passed through. Non UTF-8 charsets are decoded lossily.
pub fn decode_encoded_words(value: &str) -> String {
    let mut out = String::new();
    let mut rest = value;
    let mut last_was_word = false;

    while let Some(start) = rest.find("=?") {
        let Some((decoded, consumed)) = decode_word(&rest[start..]) else {
            out.push_str(&rest[..start + 2]);
            rest = &rest[start + 2..];
            last_was_word = false;
            continue;
        };
        let between = &rest[..start];
        // whitespace between two adjacent encoded words is dropped
        if !(last_was_word && between.trim().is_empty()) {
            out.push_str(between);
        }
        out.push_str(&decoded);
        rest = &rest[start + consumed..];
        last_was_word = true;
    }
    out.push_str(rest);
    out
}

fn decode_word(word: &str) -> Option<(String, usize)> {
    let inner = word.strip_prefix("=?")?;
    let mut fields = inner.splitn(3, '?');
    let _charset = fields.next()?;
    let encoding = fields.next()?;
    let tail = fields.next()?;
    let end = tail.find("?=")?;
    let payload = &tail[..end];
    let consumed = word.len() - tail.len() + end + 2;

    let bytes = match encoding {
        "B" | "b" => general_purpose::STANDARD.decode(payload).ok()?,
        "Q" | "q" => decode_q(payload),
        _ => return None,
    };
    Some((String::from_utf8_lossy(&bytes).into_owned(), consumed))
}

fn decode_q(payload: &str) -> Vec<u8> {
    let bytes = payload.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'=' {
            if let (Some(&hi), Some(&lo)) = (bytes.get(i + 1), bytes.get(i + 2)) {
                if let Some(b) = hex_pair(hi, lo) {
                    out.push(b);
                    i += 3;
                    continue;
                }
            }
        }
        out.push(if bytes[i] == b'_' { b' ' } else { bytes[i] });
        i += 1;
    }
    out
}

pub fn decode_quoted_printable(body: &str) -> String {
    let bytes = body.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'=' {
            // soft line break
            if bytes.get(i + 1) == Some(&b'\n') {
                i += 2;
                continue;
            }
            if let (Some(&hi), Some(&lo)) = (bytes.get(i + 1), bytes.get(i + 2)) {
                if let Some(b) = hex_pair(hi, lo) {
                    out.push(b);
                    i += 3;
                    continue;
                }
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_pair(hi: u8, lo: u8) -> Option<u8> {
    let hi = (hi as char).to_digit(16)?;
    let lo = (lo as char).to_digit(16)?;
    Some((hi * 16 + lo) as u8)
}
