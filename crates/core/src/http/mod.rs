//! Request and response model shared by the worker and network clients.
//!
//! ### Request identity
//! - Absolute form: the canonical URL, query included, fragment removed
//! - Path form: the URL path alone, no query
//! - Store key: SHA-256 over method and absolute form
//!
//! Identity is computed once per request by [`RequestKey::of`]; the classifier
//! and the store both read from the same key.

pub mod response;
pub mod url;

use bytes::Bytes;
use std::fmt;
use std::str::FromStr;

pub use response::{ResponseKind, ResponseSnapshot};
pub use self::url::{UrlError, canonicalize, same_origin};

use crate::Error;
use crate::cache::hash::compute_cache_key;

/// HTTP request method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Method {
    #[default]
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "HEAD" => Ok(Self::Head),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            "OPTIONS" => Ok(Self::Options),
            other => Err(Error::InvalidInput(format!("unsupported method: {other}"))),
        }
    }
}

/// Request mode, as set by whoever issued the request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RequestMode {
    /// Top-level document navigation.
    Navigate,
    SameOrigin,
    #[default]
    NoCors,
    Cors,
}

impl RequestMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Navigate => "navigate",
            Self::SameOrigin => "same-origin",
            Self::NoCors => "no-cors",
            Self::Cors => "cors",
        }
    }
}

impl fmt::Display for RequestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "navigate" => Ok(Self::Navigate),
            "same-origin" => Ok(Self::SameOrigin),
            "no-cors" => Ok(Self::NoCors),
            "cors" => Ok(Self::Cors),
            other => Err(Error::InvalidInput(format!("unsupported request mode: {other}"))),
        }
    }
}

/// An outgoing resource request as seen by the interception layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequest {
    pub url: ::url::Url,
    pub method: Method,
    pub mode: RequestMode,
    pub body: Bytes,
}

impl ResourceRequest {
    /// A sub-resource GET (`no-cors`, the default for scripts, images and styles).
    pub fn get(url: ::url::Url) -> Self {
        Self { url, method: Method::Get, mode: RequestMode::NoCors, body: Bytes::new() }
    }

    /// A top-level navigation GET.
    pub fn navigate(url: ::url::Url) -> Self {
        Self { mode: RequestMode::Navigate, ..Self::get(url) }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }
}

/// Canonical identity of a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    method: Method,
    absolute: String,
    path: String,
    cache_key: String,
}

impl RequestKey {
    pub fn of(request: &ResourceRequest) -> Self {
        let mut url = request.url.clone();
        url.set_fragment(None);
        let absolute = url.as_str().to_string();
        let path = url.path().to_string();
        let cache_key = compute_cache_key(request.method.as_str(), &absolute);
        Self { method: request.method, absolute, path, cache_key }
    }

    /// Only GET responses are stored or served from the store.
    pub fn is_storable(&self) -> bool {
        self.method == Method::Get
    }

    /// Full URL, query included.
    pub fn absolute(&self) -> &str {
        &self.absolute
    }

    /// URL path without query.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Key under which the response is stored.
    pub fn cache_key(&self) -> &str {
        &self.cache_key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> ::url::Url {
        ::url::Url::parse(s).unwrap()
    }

    #[test]
    fn test_request_key_forms() {
        let request = ResourceRequest::get(url("https://app.example.com/index.html?v=3"));
        let key = RequestKey::of(&request);
        assert_eq!(key.absolute(), "https://app.example.com/index.html?v=3");
        assert_eq!(key.path(), "/index.html");
        assert_eq!(key.cache_key().len(), 64);
    }

    #[test]
    fn test_request_key_depends_on_method() {
        let get = ResourceRequest::get(url("https://app.example.com/api"));
        let post = get.clone().with_method(Method::Post);
        assert_ne!(RequestKey::of(&get).cache_key(), RequestKey::of(&post).cache_key());
    }

    #[test]
    fn test_request_key_ignores_fragment() {
        let plain = RequestKey::of(&ResourceRequest::navigate(url("https://app.example.com/?tab=1")));
        let anchored = RequestKey::of(&ResourceRequest::navigate(url("https://app.example.com/?tab=1#settings")));
        assert_eq!(anchored.absolute(), "https://app.example.com/?tab=1");
        assert_eq!(anchored.path(), "/");
        assert_eq!(anchored, plain);
    }

    #[test]
    fn test_only_get_is_storable() {
        let get = ResourceRequest::get(url("https://app.example.com/api"));
        assert!(RequestKey::of(&get).is_storable());
        assert!(!RequestKey::of(&get.clone().with_method(Method::Post)).is_storable());
        assert!(!RequestKey::of(&get.with_method(Method::Head)).is_storable());
    }

    #[test]
    fn test_request_key_ignores_mode() {
        let sub = ResourceRequest::get(url("https://app.example.com/"));
        let nav = ResourceRequest::navigate(url("https://app.example.com/"));
        assert_eq!(RequestKey::of(&sub), RequestKey::of(&nav));
    }

    #[test]
    fn test_method_parse() {
        assert_eq!("get".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("DELETE".parse::<Method>().unwrap(), Method::Delete);
        assert!(matches!("TRACE".parse::<Method>(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("navigate".parse::<RequestMode>().unwrap(), RequestMode::Navigate);
        assert_eq!("no-cors".parse::<RequestMode>().unwrap(), RequestMode::NoCors);
        assert!("websocket".parse::<RequestMode>().is_err());
    }

    #[test]
    fn test_navigation() {
        assert!(ResourceRequest::navigate(url("https://app.example.com/")).is_navigation());
        assert!(!ResourceRequest::get(url("https://app.example.com/")).is_navigation());
    }
}
