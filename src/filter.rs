use crate::site::SiteRecord;
use std::collections::BTreeSet;
use std::fmt;

/// A categorical filter dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Facet {
    Region,
    Type,
    Status,
    Program,
}

impl Facet {
    pub const ALL: [Facet; 4] = [Facet::Region, Facet::Type, Facet::Status, Facet::Program];

    /// The record's value for this facet, if any.
    pub fn value_of(self, site: &SiteRecord) -> Option<&str> {
        let field = match self {
            Facet::Region => &site.region,
            Facet::Type => &site.category,
            Facet::Status => &site.status,
            Facet::Program => &site.program,
        };
        field.as_deref()
    }

    pub fn key(self) -> &'static str {
        match self {
            Facet::Region => "region",
            Facet::Type => "type",
            Facet::Status => "status",
            Facet::Program => "program",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Facet::Region => "Region",
            Facet::Type => "Type",
            Facet::Status => "Status",
            Facet::Program => "Program",
        }
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Current facet selections and search text. Empty selection = no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    regions: BTreeSet<String>,
    types: BTreeSet<String>,
    statuses: BTreeSet<String>,
    programs: BTreeSet<String>,
    /// Trimmed, lowercased search text
    search: String,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selection(&self, facet: Facet) -> &BTreeSet<String> {
        match facet {
            Facet::Region => &self.regions,
            Facet::Type => &self.types,
            Facet::Status => &self.statuses,
            Facet::Program => &self.programs,
        }
    }

    fn selection_mut(&mut self, facet: Facet) -> &mut BTreeSet<String> {
        match facet {
            Facet::Region => &mut self.regions,
            Facet::Type => &mut self.types,
            Facet::Status => &mut self.statuses,
            Facet::Program => &mut self.programs,
        }
    }

    pub fn select(&mut self, facet: Facet, value: &str) {
        self.selection_mut(facet).insert(value.to_string());
    }

    pub fn deselect(&mut self, facet: Facet, value: &str) {
        self.selection_mut(facet).remove(value);
    }

    pub fn is_selected(&self, facet: Facet, value: &str) -> bool {
        self.selection(facet).contains(value)
    }

    pub fn set_search(&mut self, text: &str) {
        self.search = text.trim().to_lowercase();
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    /// Drop every selection and the search text.
    pub fn clear(&mut self) {
        Facet::ALL.iter().for_each(|&f| self.selection_mut(f).clear());
        self.search.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.search.is_empty() && Facet::ALL.iter().all(|&f| self.selection(f).is_empty())
    }
}

/// Lowercased concatenation of the fields searched by free text.
pub fn search_haystack(site: &SiteRecord) -> String {
    let fields = [
        Some(site.name.as_str()),
        site.city.as_deref(),
        site.country.as_deref(),
        site.category.as_deref(),
        site.description.as_deref(),
        site.focus.as_deref(),
        site.role.as_deref(),
        site.partners.as_deref(),
    ];
    fields
        .iter()
        .map(|f| f.unwrap_or(""))
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Does `site` satisfy every facet selection and the search text?
pub fn passes(site: &SiteRecord, state: &FilterState) -> bool {
    let facets_match = Facet::ALL.iter().all(|&facet| {
        let selected = state.selection(facet);
        selected.is_empty() || facet.value_of(site).is_some_and(|v| selected.contains(v))
    });

    facets_match && (state.search.is_empty() || search_haystack(site).contains(&state.search))
}

/// Indices of records that pass the filter and can be placed on the map.
pub fn visible_set(sites: &[SiteRecord], state: &FilterState) -> Vec<usize> {
    sites
        .iter()
        .enumerate()
        .filter(|(_, site)| site.lon_lat().is_some() && passes(site, state))
        .map(|(idx, _)| idx)
        .collect()
}
