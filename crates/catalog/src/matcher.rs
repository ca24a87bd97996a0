//! Picks the catalog candidate that best matches a device track.
//!
//! Selection walks [`MatchRule::ORDER`]; the first rule with any hit wins and
//! within a rule the service ranking decides.

use crate::{CatalogError, CatalogService};
use lyric_bridge_core::{clean_title, CatalogCandidate};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRule {
    /// Name and one artist equal, ignoring case.
    ExactBoth,
    /// Name equal, artist contained in the other either way.
    ExactNamePartialArtist,
    ExactName,
    /// Name contains the title or the title contains the name.
    Substring,
    /// First candidate in service order.
    Fallback,
}

impl MatchRule {
    pub const ORDER: [MatchRule; 5] = [
        MatchRule::ExactBoth,
        MatchRule::ExactNamePartialArtist,
        MatchRule::ExactName,
        MatchRule::Substring,
        MatchRule::Fallback,
    ];

    fn accepts(self, candidate: &CatalogCandidate, title: &str, artist: &str) -> bool {
        let exact_name = candidate.name.to_lowercase() == title.to_lowercase();
        match self {
            MatchRule::ExactBoth => {
                exact_name
                    && candidate
                        .artists
                        .iter()
                        .any(|a| a.name.to_lowercase() == artist.to_lowercase())
            }
            MatchRule::ExactNamePartialArtist => {
                exact_name
                    && candidate
                        .artists
                        .iter()
                        .any(|a| artist.contains(a.name.as_str()) || a.name.contains(artist))
            }
            MatchRule::ExactName => exact_name,
            MatchRule::Substring => {
                candidate.name.contains(title) || title.contains(candidate.name.as_str())
            }
            MatchRule::Fallback => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOutcome {
    pub keyword: String,
    pub candidate: CatalogCandidate,
    pub rule: MatchRule,
}

/// Search keyword for a device title: text before the first `(`, trimmed.
/// `None` when nothing is left to search for.
pub fn build_keyword(title: &str) -> Option<String> {
    let cleaned = clean_title(title);
    (!cleaned.is_empty()).then(|| cleaned.to_string())
}

/// Applies the rules to `candidates` for an already cleaned title.
pub fn select<'a>(
    candidates: &'a [CatalogCandidate],
    title: &str,
    artist: &str,
) -> Option<(MatchRule, &'a CatalogCandidate)> {
    let artist = artist.trim();
    MatchRule::ORDER.iter().find_map(|rule| {
        candidates
            .iter()
            .find(|c| rule.accepts(c, title, artist))
            .map(|c| (*rule, c))
    })
}

pub struct MetadataMatcher<C: ?Sized> {
    catalog: Arc<C>,
}

impl<C: ?Sized> Clone for MetadataMatcher<C> {
    fn clone(&self) -> Self {
        Self {
            catalog: Arc::clone(&self.catalog),
        }
    }
}

impl<C: CatalogService + ?Sized> MetadataMatcher<C> {
    pub fn new(catalog: Arc<C>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Arc<C> {
        &self.catalog
    }

    /// `Ok(None)` means nothing to search for or no candidates came back.
    /// Errors are transport or service failures. Never mutates shared state.
    pub async fn search(
        &self,
        title: &str,
        artist: &str,
    ) -> Result<Option<MatchOutcome>, CatalogError> {
        let Some(keyword) = build_keyword(title) else {
            debug!(title = %title, "empty search keyword; skipping catalog search");
            return Ok(None);
        };

        info!(keyword = %keyword, artist = %artist, "searching catalog");
        let candidates = self.catalog.search(&keyword).await?;
        if candidates.is_empty() {
            info!(keyword = %keyword, "catalog returned no candidates");
            return Ok(None);
        }

        for (i, c) in candidates.iter().take(3).enumerate() {
            debug!(rank = i + 1, id = c.id, name = %c.name, artists = %c.artist_names(), "candidate");
        }

        Ok(select(&candidates, &keyword, artist).map(|(rule, c)| {
            info!(
                ?rule,
                id = c.id,
                name = %c.name,
                artists = %c.artist_names(),
                "selected catalog match"
            );
            MatchOutcome {
                keyword: keyword.clone(),
                candidate: c.clone(),
                rule,
            }
        }))
    }
}
