//! Identity of the configured paper-metadata providers.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::api;

/// One external metadata catalog.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    /// CORE aggregator of open access research.
    Core,
    /// arXiv preprint server.
    Arxiv,
    /// Semantic Scholar Graph API.
    SemanticScholar,
}

impl SourceId {
    /// Every provider, in default merge order.
    pub const ALL: [Self; 3] = [Self::Core, Self::Arxiv, Self::SemanticScholar];

    /// Human-readable provider name used in status lines.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Core => "CORE",
            Self::Arxiv => "arXiv",
            Self::SemanticScholar => "Semantic Scholar",
        }
    }

    /// Timeout used when the configuration does not override it.
    #[must_use]
    pub const fn default_timeout(self) -> Duration {
        match self {
            Self::Core => api::CORE_TIMEOUT,
            Self::Arxiv => api::ARXIV_TIMEOUT,
            Self::SemanticScholar => api::SEMANTIC_SCHOLAR_TIMEOUT,
        }
    }

    /// Parse a comma-separated list such as `core,arxiv`.
    ///
    /// Duplicates are dropped, first occurrence wins.
    pub fn parse_list(list: &str) -> Result<Vec<Self>, UnknownSource> {
        let mut ids = Vec::new();
        for part in list.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let id: Self = part.parse()?;
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        Ok(ids)
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Unrecognized provider name.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown source '{0}' (expected core, arxiv or semantic-scholar)")]
pub struct UnknownSource(pub String);

impl FromStr for SourceId {
    type Err = UnknownSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "core" => Ok(Self::Core),
            "arxiv" => Ok(Self::Arxiv),
            "semantic-scholar" | "semantic_scholar" | "s2" => Ok(Self::SemanticScholar),
            other => Err(UnknownSource(other.to_string())),
        }
    }
}
