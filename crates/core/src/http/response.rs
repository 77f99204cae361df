//! Immutable response snapshots.

use bytes::Bytes;
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// How much of a response the application may inspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseKind {
    /// Same-origin response.
    Basic,
    /// Cross-origin response with CORS access.
    Cors,
    /// Cross-origin `no-cors` response: stored and replayed but not inspected.
    Opaque,
    /// Generated locally as an offline fallback.
    Synthetic,
}

impl ResponseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Cors => "cors",
            Self::Opaque => "opaque",
            Self::Synthetic => "synthetic",
        }
    }
}

impl fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(Self::Basic),
            "cors" => Ok(Self::Cors),
            "opaque" => Ok(Self::Opaque),
            "synthetic" => Ok(Self::Synthetic),
            other => Err(Error::CorruptEntry(format!("unknown response kind: {other}"))),
        }
    }
}

/// A response captured in full at the time it was received.
///
/// The body is reference-counted, so cloning a snapshot before handing it to
/// the store leaves the caller's copy untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseSnapshot {
    /// The URL that was requested.
    pub url: String,
    pub status: u16,
    pub status_text: String,
    pub kind: ResponseKind,
    /// Header name/value pairs in received order.
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl ResponseSnapshot {
    /// A locally generated `text/html` page.
    pub fn synthetic_html(url: impl Into<String>, html: &'static str) -> Self {
        Self {
            url: url.into(),
            status: 200,
            status_text: "OK".into(),
            kind: ResponseKind::Synthetic,
            headers: vec![("Content-Type".into(), "text/html".into())],
            body: Bytes::from_static(html.as_bytes()),
        }
    }

    /// 2xx status.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether the response may be written to the cache: a normal success or an
    /// opaque cross-origin response.
    pub fn is_cacheable(&self) -> bool {
        self.is_ok() || self.kind == ResponseKind::Opaque
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }
}
