//! Submission response types recognized by the registry.

use std::fmt;

/// MIME type of an HTML search results page.
pub const URLTYPE_SEARCH_HTML: &str = "text/html";

/// MIME type of an OpenSearch JSON suggestion list.
pub const URLTYPE_SUGGEST_JSON: &str = "application/x-suggestions+json";

/// The two submission response types the registry understands.
///
/// Hosts may track further URL types internally; anything outside this
/// closed set is reported as unsupported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseType {
    /// A regular HTML search results page.
    SearchHtml,
    /// An OpenSearch JSON suggestion endpoint.
    SuggestJson,
}

impl ResponseType {
    /// Parse a MIME string into a recognized response type.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            URLTYPE_SEARCH_HTML => Some(Self::SearchHtml),
            URLTYPE_SUGGEST_JSON => Some(Self::SuggestJson),
            _ => None,
        }
    }

    /// The MIME string for this response type.
    pub fn as_mime(self) -> &'static str {
        match self {
            Self::SearchHtml => URLTYPE_SEARCH_HTML,
            Self::SuggestJson => URLTYPE_SUGGEST_JSON,
        }
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_mime())
    }
}
