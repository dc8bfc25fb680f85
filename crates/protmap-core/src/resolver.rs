//! Raw search input -> canonical [`SearchKey`] and the view route it navigates to.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::form_urlencoded;

pub const HOME_PATH: &str = "/";
pub const DOWNLOADS_PATH: &str = "/downloads";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("Please enter a search term.")]
    EmptyQuery,
    #[error("unknown route: {0}")]
    UnknownRoute(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Protein,
    Pathway,
    Drug,
}

impl EntityKind {
    pub const fn all() -> [Self; 3] {
        [Self::Protein, Self::Pathway, Self::Drug]
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Protein => "protein",
            Self::Pathway => "pathway",
            Self::Drug => "drug",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "protein" | "gene" => Some(Self::Protein),
            "pathway" | "tf" | "network" => Some(Self::Pathway),
            "drug" => Some(Self::Drug),
            _ => None,
        }
    }

    /// Drug names keep their case; everything else is looked up upper-cased.
    pub const fn normalizes_case(self) -> bool {
        !matches!(self, Self::Drug)
    }

    /// Only pathway names have a candidate list for autocomplete.
    pub const fn has_candidates(self) -> bool {
        matches!(self, Self::Pathway)
    }

    const fn route_path(self) -> &'static str {
        match self {
            Self::Protein => "/search",
            Self::Pathway => "/pathway",
            Self::Drug => "/drug",
        }
    }

    const fn route_param(self) -> &'static str {
        match self {
            Self::Protein => "gene",
            Self::Pathway => "pathway",
            Self::Drug => "drug",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical lookup key. Fields are private so every key has gone through [`resolve`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SearchKey {
    kind: EntityKind,
    value: String,
}

impl SearchKey {
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    #[must_use]
    pub fn route(&self) -> ViewRoute {
        ViewRoute::Entity(self.clone())
    }
}

impl fmt::Display for SearchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.value)
    }
}

pub fn resolve(raw: &str, kind: EntityKind) -> Result<SearchKey, ResolveError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ResolveError::EmptyQuery);
    }
    let value = if kind.normalizes_case() {
        trimmed.to_uppercase()
    } else {
        trimmed.to_string()
    };
    Ok(SearchKey { kind, value })
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewRoute {
    Home,
    Entity(SearchKey),
    Downloads,
}

impl ViewRoute {
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::Home => HOME_PATH.to_string(),
            Self::Downloads => DOWNLOADS_PATH.to_string(),
            Self::Entity(key) => {
                let encoded: String =
                    form_urlencoded::byte_serialize(key.value().as_bytes()).collect();
                format!(
                    "{}?{}={encoded}",
                    key.kind().route_path(),
                    key.kind().route_param()
                )
            }
        }
    }

    /// Inverse of [`ViewRoute::path`]. The query value is normalized again, so a
    /// hand-typed `/search?gene=ada2` lands on the same key as a resolved search.
    pub fn parse(raw: &str) -> Result<Self, ResolveError> {
        let trimmed = raw.trim();
        let (path, query) = trimmed.split_once('?').unwrap_or((trimmed, ""));
        let path = path.trim_end_matches('/');
        if path.is_empty() {
            return Ok(Self::Home);
        }
        if path == DOWNLOADS_PATH {
            return Ok(Self::Downloads);
        }

        let Some(kind) = EntityKind::all()
            .into_iter()
            .find(|kind| kind.route_path() == path)
        else {
            return Err(ResolveError::UnknownRoute(trimmed.to_string()));
        };

        let value = form_urlencoded::parse(query.as_bytes())
            .find(|(name, _)| name == kind.route_param())
            .map(|(_, value)| value.into_owned())
            .unwrap_or_default();
        resolve(&value, kind).map(Self::Entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protein_and_pathway_inputs_are_trimmed_and_upper_cased() {
        let protein = resolve("  ada2 ", EntityKind::Protein).expect("protein key");
        assert_eq!(protein.value(), "ADA2");
        assert_eq!(protein.kind(), EntityKind::Protein);

        let pathway = resolve("gtrd_tp53", EntityKind::Pathway).expect("pathway key");
        assert_eq!(pathway.value(), "GTRD_TP53");
    }

    #[test]
    fn drug_input_keeps_its_case() {
        let drug = resolve(" Imatinib ", EntityKind::Drug).expect("drug key");
        assert_eq!(drug.value(), "Imatinib");
    }

    #[test]
    fn blank_input_is_an_empty_query() {
        assert_eq!(
            resolve("   ", EntityKind::Protein),
            Err(ResolveError::EmptyQuery)
        );
        assert_eq!(resolve("", EntityKind::Drug), Err(ResolveError::EmptyQuery));
    }

    #[test]
    fn keys_compare_on_normalized_value() {
        let a = resolve("brca1", EntityKind::Protein).expect("key");
        let b = resolve("BRCA1 ", EntityKind::Protein).expect("key");
        let c = resolve("BRCA1", EntityKind::Pathway).expect("key");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn routes_are_deterministic_per_kind() {
        let protein = resolve("ada2", EntityKind::Protein).expect("key");
        assert_eq!(protein.route().path(), "/search?gene=ADA2");

        let pathway = resolve("foo bar", EntityKind::Pathway).expect("key");
        assert_eq!(pathway.route().path(), "/pathway?pathway=FOO+BAR");

        let drug = resolve("Aspirin", EntityKind::Drug).expect("key");
        assert_eq!(drug.route().path(), "/drug?drug=Aspirin");
    }

    #[test]
    fn route_parse_inverts_path() {
        for key in [
            resolve("ADAM10", EntityKind::Protein).expect("key"),
            resolve("foo bar/baz", EntityKind::Pathway).expect("key"),
            resolve("Ibuprofen", EntityKind::Drug).expect("key"),
        ] {
            let route = key.route();
            assert_eq!(ViewRoute::parse(&route.path()), Ok(route));
        }
        assert_eq!(ViewRoute::parse("/"), Ok(ViewRoute::Home));
        assert_eq!(ViewRoute::parse("/downloads/"), Ok(ViewRoute::Downloads));
    }

    #[test]
    fn route_parse_normalizes_and_rejects() {
        let route = ViewRoute::parse("/search?gene=ada2").expect("route");
        assert_eq!(
            route,
            ViewRoute::Entity(resolve("ADA2", EntityKind::Protein).expect("key"))
        );
        assert_eq!(
            ViewRoute::parse("/search?gene="),
            Err(ResolveError::EmptyQuery)
        );
        assert!(matches!(
            ViewRoute::parse("/about"),
            Err(ResolveError::UnknownRoute(_))
        ));
    }

    #[test]
    fn entity_kind_parse_accepts_aliases() {
        assert_eq!(EntityKind::parse("Gene"), Some(EntityKind::Protein));
        assert_eq!(EntityKind::parse("tf"), Some(EntityKind::Pathway));
        assert_eq!(EntityKind::parse("drug"), Some(EntityKind::Drug));
        assert_eq!(EntityKind::parse("compound"), None);
    }
}
