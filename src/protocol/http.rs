//! HTTP/1.x request parser using httparse for zero-copy parsing.
//!
//! Only the request line and header block of a single TCP segment are
//! decoded. The segment may end in the middle of the headers; whatever
//! complete header lines are present are still reported.

use httparse::{Request, Status, EMPTY_HEADER};
use smallvec::SmallVec;

use super::{HttpHeader, HttpRequestLayer, Layer, ParseContext, ParseResult, Protocol};
use crate::error::ProtocolError;

/// Maximum number of headers to parse per request.
pub const MAX_HEADERS: usize = 64;

/// Request methods accepted at the start of a payload.
const HTTP_METHODS: [&[u8]; 9] = [
    b"GET", b"HEAD", b"POST", b"PUT", b"DELETE", b"CONNECT", b"OPTIONS", b"TRACE", b"PATCH",
];

/// HTTP request parser.
#[derive(Debug, Clone, Copy)]
pub struct HttpProtocol;

impl Protocol for HttpProtocol {
    fn name(&self) -> &'static str {
        "http"
    }

    fn display_name(&self) -> &'static str {
        "HTTP"
    }

    fn can_parse(&self, context: &ParseContext) -> Option<u32> {
        // Content decides; TLS is tried first on the same payload
        match context.hint("transport") {
            Some(6) => Some(50),
            _ => None,
        }
    }

    fn parse<'a>(&self, data: &'a [u8], _context: &ParseContext) -> ParseResult<'a> {
        if !starts_with_method(data) {
            return ParseResult::error(
                ProtocolError::InvalidField {
                    protocol: "http",
                    field: "method",
                    reason: "payload does not start with a request method".to_string(),
                },
                data,
            );
        }

        let mut headers = [EMPTY_HEADER; MAX_HEADERS];
        let mut req = Request::new(&mut headers);

        let layer = match req.parse(data) {
            Ok(Status::Complete(_)) => HttpRequestLayer {
                method: req.method.unwrap_or_default(),
                path: req.path.unwrap_or_default(),
                version: req.version,
                headers: req
                    .headers
                    .iter()
                    .filter(|h| !h.name.is_empty())
                    .filter_map(|h| {
                        Some(HttpHeader {
                            name: h.name,
                            value: std::str::from_utf8(h.value).ok()?,
                        })
                    })
                    .collect(),
                complete: true,
            },
            // Cut short, or a line httparse refuses: keep the well-formed lines
            Ok(Status::Partial) | Err(_) => match parse_partial_request(data) {
                Some(layer) => layer,
                None => {
                    return ParseResult::error(
                        ProtocolError::InvalidField {
                            protocol: "http",
                            field: "request_line",
                            reason: "malformed request line".to_string(),
                        },
                        data,
                    )
                }
            },
        };

        // The request consumes the rest of the segment
        ParseResult::success(
            Layer::HttpRequest(layer),
            data.len(),
            &data[data.len()..],
            SmallVec::new(),
        )
    }
}

/// Check for a known method followed by a space.
fn starts_with_method(data: &[u8]) -> bool {
    HTTP_METHODS
        .iter()
        .any(|method| data.starts_with(method) && data.get(method.len()) == Some(&b' '))
}

/// Line-by-line fallback for a header block that is cut short or that
/// httparse rejects.
///
/// Only lines terminated by CRLF are used and malformed header lines are
/// skipped. Returns `None` when the request line itself is malformed.
fn parse_partial_request(data: &[u8]) -> Option<HttpRequestLayer<'_>> {
    let mut lines = CompleteLines { data };

    let (method, path, version) = match lines.next() {
        Some(request_line) => parse_request_line(request_line)?,
        None => {
            // Not even the request line is complete
            let text = std::str::from_utf8(data).ok()?;
            let mut parts = text.splitn(3, ' ');
            let method = parts.next()?;
            let path = parts.next().unwrap_or_default();
            (method, path, None)
        }
    };

    let mut headers = Vec::new();
    let mut complete = false;
    for line in lines {
        if line.is_empty() {
            complete = true;
            break;
        }
        if headers.len() >= MAX_HEADERS {
            break;
        }
        let Some(colon) = line.iter().position(|&b| b == b':') else {
            continue;
        };
        let (Ok(name), Ok(value)) = (
            std::str::from_utf8(&line[..colon]),
            std::str::from_utf8(&line[colon + 1..]),
        ) else {
            continue;
        };
        if name.is_empty() || name.contains(|c: char| c == ' ' || c == '\t') {
            continue;
        }
        headers.push(HttpHeader {
            name,
            value: value.trim_matches(|c: char| c == ' ' || c == '\t'),
        });
    }

    Some(HttpRequestLayer {
        method,
        path,
        version,
        headers,
        complete,
    })
}

/// Split "METHOD SP PATH SP HTTP/1.x", any single-digit minor version.
fn parse_request_line(line: &[u8]) -> Option<(&str, &str, Option<u8>)> {
    let text = std::str::from_utf8(line).ok()?;
    let mut parts = text.split(' ');

    let method = parts.next()?;
    let path = parts.next()?;
    let version = match parts.next()?.strip_prefix("HTTP/1.")?.as_bytes() {
        [minor] if minor.is_ascii_digit() => minor - b'0',
        _ => return None,
    };
    if parts.next().is_some() {
        return None;
    }

    Some((method, path, Some(version)))
}

/// Iterator over CRLF-terminated lines, without the terminator.
struct CompleteLines<'a> {
    data: &'a [u8],
}

impl<'a> Iterator for CompleteLines<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        let end = self.data.windows(2).position(|w| w == b"\r\n")?;
        let line = &self.data[..end];
        self.data = &self.data[end + 2..];
        Some(line)
    }
}
