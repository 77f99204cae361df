//! Static precache manifest and request classification.
//!
//! Entries come in two forms: absolute URLs for cross-origin resources and
//! root-relative paths for the application's own files. A request is a
//! precached asset when its absolute form equals an absolute entry or its
//! path form equals a path entry. Matching is plain string equality.

use std::collections::HashSet;
use url::Url;

use tether_core::http::{canonicalize, same_origin};
use tether_core::{Error, RequestKey, RequestMode, ResourceRequest};

/// One manifest entry, canonicalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestEntry {
    /// Absolute http(s) URL, re-serialized by the URL parser.
    Absolute(Url),
    /// Root-relative path, kept verbatim, with the URL it resolves to.
    Path { path: String, resolved: Url },
}

impl ManifestEntry {
    pub fn url(&self) -> &Url {
        match self {
            Self::Absolute(url) => url,
            Self::Path { resolved, .. } => resolved,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
    absolute: HashSet<String>,
    paths: HashSet<String>,
    origin: Option<Url>,
}

impl Manifest {
    /// Canonicalize manifest entries against the application origin.
    ///
    /// Duplicate entries are dropped with a warning.
    pub fn parse<S: AsRef<str>>(entries: &[S], origin: &Url) -> Result<Self, Error> {
        let mut manifest = Self { origin: Some(origin.clone()), ..Self::default() };

        for raw in entries {
            let raw = raw.as_ref().trim();
            if raw.starts_with("//") {
                return Err(Error::InvalidInput(format!(
                    "manifest entry '{raw}' is protocol-relative; give the scheme explicitly"
                )));
            }
            let resolved =
                canonicalize(raw, origin).map_err(|e| Error::InvalidUrl(format!("manifest entry '{raw}': {e}")))?;

            let entry = if raw.starts_with('/') {
                ManifestEntry::Path { path: raw.to_string(), resolved }
            } else if raw.starts_with("http://") || raw.starts_with("https://") {
                ManifestEntry::Absolute(resolved)
            } else {
                return Err(Error::InvalidInput(format!(
                    "manifest entry '{raw}' must be an absolute http(s) URL or start with '/'"
                )));
            };

            let fresh = match &entry {
                ManifestEntry::Absolute(url) => manifest.absolute.insert(url.as_str().to_string()),
                ManifestEntry::Path { path, .. } => manifest.paths.insert(path.clone()),
            };
            if !fresh {
                tracing::warn!(entry = raw, "duplicate manifest entry ignored");
                continue;
            }
            manifest.entries.push(entry);
        }

        Ok(manifest)
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the request designates a precached asset.
    pub fn is_precached(&self, key: &RequestKey) -> bool {
        self.absolute.contains(key.absolute()) || self.paths.contains(key.path())
    }

    /// The GET requests that populate a generation, in manifest order.
    ///
    /// Same-origin entries are fetched in `same-origin` mode, the rest in `cors` mode.
    pub fn requests(&self) -> Vec<ResourceRequest> {
        self.entries
            .iter()
            .map(|entry| {
                let url = entry.url().clone();
                let mode = match &self.origin {
                    Some(origin) if same_origin(&url, origin) => RequestMode::SameOrigin,
                    _ => RequestMode::Cors,
                };
                ResourceRequest::get(url).with_mode(mode)
            })
            .collect()
    }
}
