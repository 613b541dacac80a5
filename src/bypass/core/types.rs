//! Data shapes exchanged between strategies, the normalizer and callers.

use serde::{Deserialize, Serialize};

/// One recovered download location.
///
/// Identity is the URL alone; `kind` is the human-facing label ("Direct",
/// "Pixeldrain", "HubDrive"...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateLink {
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub file_size: Option<String>,
}

impl CandidateLink {
    pub fn new(kind: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            url: url.into(),
            file_name: None,
            file_size: None,
        }
    }

    pub fn with_file(mut self, file_name: Option<String>, file_size: Option<String>) -> Self {
        self.file_name = file_name;
        self.file_size = file_size;
        self
    }
}

/// Strategy-native result before normalization.
///
/// The variant a family produces is fixed: single-link hosts return
/// [`RawOutcome::Single`], list scrapers [`RawOutcome::Links`], PhotoLinx
/// [`RawOutcome::Download`] and GDFlix [`RawOutcome::Catalogue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawOutcome {
    Single(Option<String>),
    Links(Vec<String>),
    Download {
        file_name: Option<String>,
        url: Option<String>,
    },
    Catalogue {
        file_name: Option<String>,
        file_size: Option<String>,
        links: Vec<CandidateLink>,
    },
}
