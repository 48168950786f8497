//! Turns site records into what the map draws: an icon class, popup content
//! and tooltip text.

use crate::site::{non_empty, SiteRecord};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

/// Marker style classes. Unknown categories render as [`IconClass::DEFAULT`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IconClass {
    Lab,
    Field,
    Water,
    Data,
    Hub,
}

const CATEGORY_CLASSES: [(&str, IconClass); 5] = [
    ("Laboratory & Testing", IconClass::Lab),
    ("Field Research", IconClass::Field),
    ("Ecological & Water", IconClass::Water),
    ("Data & Modelling", IconClass::Data),
    ("Coordination & Training", IconClass::Hub),
];

impl IconClass {
    pub const DEFAULT: IconClass = IconClass::Field;

    pub fn for_category(category: Option<&str>) -> Self {
        category
            .and_then(|c| CATEGORY_CLASSES.iter().find(|(name, _)| *name == c))
            .map_or(Self::DEFAULT, |&(_, class)| class)
    }

    pub fn class_name(self) -> &'static str {
        match self {
            IconClass::Lab => "lab",
            IconClass::Field => "field",
            IconClass::Water => "water",
            IconClass::Data => "data",
            IconClass::Hub => "hub",
        }
    }

    /// Glyph drawn on the map for a single marker
    pub fn glyph(self) -> char {
        match self {
            IconClass::Lab => '◆',
            IconClass::Field => '●',
            IconClass::Water => '◉',
            IconClass::Data => '■',
            IconClass::Hub => '★',
        }
    }
}

/// Structured popup block. Optional parts are `None`/empty when their source
/// field is missing; no placeholders are produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Popup {
    pub title: String,
    /// "city, country · type · status"
    pub summary: String,
    pub needs_verification: bool,
    pub image: Option<String>,
    pub description: String,
    pub meta: Vec<MetaLine>,
    pub link: Option<String>,
}

impl Popup {
    /// Number of rows the popup occupies before wrapping.
    pub fn line_count(&self) -> usize {
        2 + usize::from(self.needs_verification)
            + usize::from(self.image.is_some())
            + usize::from(!self.description.is_empty())
            + self.meta.len()
            + usize::from(self.link.is_some())
    }
}

/// A labelled metadata row in a popup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaLine {
    /// Empty for the started/updated line, which carries its own labels
    pub label: &'static str,
    pub text: String,
}

/// Everything needed to draw one site on the map.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    /// Index of the site in the dataset
    pub site: usize,
    pub lon: f64,
    pub lat: f64,
    pub icon: IconClass,
    pub popup: Popup,
    pub tooltip: String,
}

/// Build the marker for `sites[index]`. Returns `None` without coordinates.
pub fn present(index: usize, site: &SiteRecord) -> Option<Marker> {
    let (lon, lat) = site.lon_lat()?;
    Some(Marker {
        site: index,
        lon,
        lat,
        icon: IconClass::for_category(site.category.as_deref()),
        popup: popup_for(site),
        tooltip: tooltip_for(site),
    })
}

/// "proposed", "planned" and "under assessment" statuses still need checking.
pub fn needs_verification(status: Option<&str>) -> bool {
    status.is_some_and(|s| {
        let s = s.to_lowercase();
        ["proposed", "planned", "under assessment"]
            .iter()
            .any(|p| s.contains(p))
    })
}

pub fn tooltip_for(site: &SiteRecord) -> String {
    match non_empty(&site.country) {
        Some(country) => format!("{} – {}", site.name, country),
        None => site.name.clone(),
    }
}

/// External link, or the local detail route keyed by id.
pub fn detail_link(site: &SiteRecord) -> Option<String> {
    non_empty(&site.link).map(str::to_string).or_else(|| {
        non_empty(&site.id)
            .map(|id| format!("project.html?id={}", utf8_percent_encode(id, NON_ALPHANUMERIC)))
    })
}

pub fn popup_for(site: &SiteRecord) -> Popup {
    let location = match non_empty(&site.city) {
        Some(city) => format!("{}, {}", city, site.country.as_deref().unwrap_or("")),
        None => site.country.clone().unwrap_or_default(),
    };
    let summary = format!(
        "{} · {} · {}",
        location,
        site.category.as_deref().unwrap_or(""),
        site.status.as_deref().unwrap_or("")
    );

    let mut meta = Vec::new();
    let mut push = |label: &'static str, field: &Option<String>| {
        if let Some(text) = non_empty(field) {
            meta.push(MetaLine {
                label,
                text: text.to_string(),
            });
        }
    };
    push("Role", &site.role);
    push("Partners", &site.partners);
    push("Program", &site.program);

    let years = [
        non_empty(&site.year_started).map(|y| format!("Started: {y}")),
        non_empty(&site.last_updated).map(|u| format!("Updated: {u}")),
    ];
    let years: Vec<String> = years.into_iter().flatten().collect();
    if !years.is_empty() {
        meta.push(MetaLine {
            label: "",
            text: years.join(" · "),
        });
    }

    if let Some(contact) = non_empty(&site.contact) {
        meta.push(MetaLine {
            label: "Local Contact",
            text: contact.to_string(),
        });
    }

    Popup {
        title: site.name.clone(),
        summary,
        needs_verification: needs_verification(site.status.as_deref()),
        image: site.first_image().map(str::to_string),
        description: site.summary_text().unwrap_or("").to_string(),
        meta,
        link: detail_link(site),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn base() -> SiteRecord {
        SiteRecord {
            name: "Delta Station".into(),
            lat: Some(-18.0),
            lng: Some(23.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_icon_lookup_and_fallback() {
        assert_eq!(IconClass::for_category(Some("Laboratory & Testing")), IconClass::Lab);
        assert_eq!(IconClass::for_category(Some("Coordination & Training")), IconClass::Hub);
        assert_eq!(IconClass::for_category(Some("Brand New Category")), IconClass::DEFAULT);
        assert_eq!(IconClass::for_category(Some("laboratory & testing")), IconClass::DEFAULT);
        assert_eq!(IconClass::for_category(None).class_name(), "field");
    }

    #[test]
    fn test_verification_badge() {
        let mut site = base();
        site.status = Some("Proposed".into());
        assert!(popup_for(&site).needs_verification);

        site.status = Some("Under Assessment (2024)".into());
        assert!(popup_for(&site).needs_verification);

        site.status = Some("Active".into());
        assert!(!popup_for(&site).needs_verification);

        site.status = None;
        assert!(!popup_for(&site).needs_verification);
    }

    #[test]
    fn test_only_first_image() {
        let mut site = base();
        site.images = vec!["one.jpg".into(), "two.jpg".into()];
        assert_eq!(popup_for(&site).image.as_deref(), Some("one.jpg"));

        site.images.clear();
        assert_eq!(popup_for(&site).image, None);
    }

    #[test]
    fn test_summary_line() {
        let mut site = base();
        site.city = Some("Maun".into());
        site.country = Some("Botswana".into());
        site.category = Some("Field Research".into());
        site.status = Some("Active".into());
        assert_eq!(popup_for(&site).summary, "Maun, Botswana · Field Research · Active");

        site.city = None;
        assert_eq!(popup_for(&site).summary, "Botswana · Field Research · Active");
    }

    #[test]
    fn test_optional_meta_lines() {
        let site = base();
        assert!(popup_for(&site).meta.is_empty());

        let mut site = base();
        site.role = Some("Lead".into());
        site.partners = Some(String::new());
        site.last_updated = Some("2024".into());
        site.contact = Some("Dr. Moyo".into());
        let meta = popup_for(&site).meta;
        assert_eq!(
            meta,
            vec![
                MetaLine { label: "Role", text: "Lead".into() },
                MetaLine { label: "", text: "Updated: 2024".into() },
                MetaLine { label: "Local Contact", text: "Dr. Moyo".into() },
            ]
        );
    }

    #[test]
    fn test_years_joined() {
        let mut site = base();
        site.year_started = Some("2019".into());
        site.last_updated = Some("2024-03".into());
        let meta = popup_for(&site).meta;
        assert_eq!(meta[0].text, "Started: 2019 · Updated: 2024-03");
    }

    #[test]
    fn test_detail_link() {
        let mut site = base();
        assert_eq!(detail_link(&site), None);

        site.id = Some("okavango 1".into());
        assert_eq!(detail_link(&site).as_deref(), Some("project.html?id=okavango%201"));

        site.link = Some("https://example.org/delta".into());
        assert_eq!(detail_link(&site).as_deref(), Some("https://example.org/delta"));
    }

    #[test]
    fn test_line_count_skips_absent_parts() {
        let mut site = base();
        assert_eq!(popup_for(&site).line_count(), 2);
        site.status = Some("Planned".into());
        site.focus = Some("Wetland survey".into());
        site.id = Some("d1".into());
        assert_eq!(popup_for(&site).line_count(), 5);
    }

    #[test]
    fn test_tooltip() {
        let mut site = base();
        assert_eq!(tooltip_for(&site), "Delta Station");
        site.country = Some("Botswana".into());
        assert_eq!(tooltip_for(&site), "Delta Station – Botswana");
    }

    #[test]
    fn test_present_requires_coordinates() {
        let mut site = base();
        assert!(present(0, &site).is_some());
        site.lat = None;
        assert!(present(0, &site).is_none());
    }
}
