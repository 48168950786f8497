use serde::de::{Deserializer, IgnoredAny};
use serde::Deserialize;

/// One project site from the dataset.
///
/// Every field may be missing or of the wrong JSON type. Such fields decode as
/// absent (`None`, an empty `name`, no `images`) so one odd record never fails
/// the whole dataset; consumers decide how absence is shown.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SiteRecord {
    #[serde(default, deserialize_with = "lenient_text")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_name")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_number")]
    pub lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub lng: Option<f64>,
    /// Category, e.g. "Field Research"
    #[serde(default, rename = "type", deserialize_with = "lenient_text")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub region: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub program: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub city: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub country: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub focus: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub role: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub partners: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub contact: Option<String>,
    #[serde(default, deserialize_with = "lenient_images")]
    pub images: Vec<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub link: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub year_started: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub last_updated: Option<String>,
}

impl SiteRecord {
    /// Longitude/latitude pair, only when both are finite numbers.
    pub fn lon_lat(&self) -> Option<(f64, f64)> {
        match (self.lng, self.lat) {
            (Some(lon), Some(lat)) if lon.is_finite() && lat.is_finite() => Some((lon, lat)),
            _ => None,
        }
    }

    /// First image reference: `images[0]`, falling back to the single `image` field.
    pub fn first_image(&self) -> Option<&str> {
        self.images
            .first()
            .map(String::as_str)
            .or(self.image.as_deref())
            .filter(|s| !s.is_empty())
    }

    /// Focus text, falling back to the description.
    pub fn summary_text(&self) -> Option<&str> {
        non_empty(&self.focus).or_else(|| non_empty(&self.description))
    }

    /// Label used in logs for records that cannot be shown.
    pub fn label(&self) -> &str {
        if !self.name.is_empty() {
            &self.name
        } else {
            self.id.as_deref().unwrap_or("<unnamed>")
        }
    }
}

/// Borrow an optional field only when it holds non-empty text.
pub fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Number(f64),
    Text(String),
    Other(IgnoredAny),
}

/// Accept only JSON numbers; strings, booleans, null and containers become `None`.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::Number(n) => Some(n),
        Scalar::Text(_) | Scalar::Other(_) => None,
    })
}

/// Accept strings and numbers (years, numeric ids) as text.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::Text(s) if !s.is_empty() => Some(s),
        Scalar::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => Some(format!("{}", n as i64)),
        Scalar::Number(n) => Some(n.to_string()),
        Scalar::Text(_) | Scalar::Other(_) => None,
    })
}

/// Like `lenient_text`, but absence becomes an empty name.
fn lenient_name<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_text(deserializer)?.unwrap_or_default())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ImageList {
    List(Vec<Scalar>),
    Other(IgnoredAny),
}

/// Keep the string entries of an array; anything else is an empty list.
fn lenient_images<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match ImageList::deserialize(deserializer)? {
        ImageList::List(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Scalar::Text(s) if !s.is_empty() => Some(s),
                _ => None,
            })
            .collect(),
        ImageList::Other(_) => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(json: &str) -> SiteRecord {
        let mut bytes = json.as_bytes().to_vec();
        simd_json::serde::from_slice(&mut bytes).unwrap()
    }

    #[test]
    fn test_full_record() {
        let site = parse(
            r#"{"id": 7, "name": "Lake Station", "lat": -1.5, "lng": 30,
                "type": "Ecological & Water", "status": "Active",
                "images": ["a.jpg", "b.jpg"], "year_started": 2019}"#,
        );
        assert_eq!(site.id.as_deref(), Some("7"));
        assert_eq!(site.lon_lat(), Some((30.0, -1.5)));
        assert_eq!(site.category.as_deref(), Some("Ecological & Water"));
        assert_eq!(site.first_image(), Some("a.jpg"));
        assert_eq!(site.year_started.as_deref(), Some("2019"));
    }

    #[test]
    fn test_string_coordinates_are_absent() {
        let site = parse(r#"{"name": "X", "lat": "12.5", "lng": 3}"#);
        assert_eq!(site.lat, None);
        assert_eq!(site.lon_lat(), None);
    }

    #[test]
    fn test_null_and_missing_fields() {
        let site = parse(r#"{"name": "X", "lat": null, "city": null}"#);
        assert_eq!(site.lat, None);
        assert_eq!(site.lng, None);
        assert_eq!(site.city, None);
        assert!(site.images.is_empty());
        assert_eq!(site.first_image(), None);
    }

    #[test]
    fn test_single_image_fallback() {
        let site = parse(r#"{"name": "X", "image": "only.png"}"#);
        assert_eq!(site.first_image(), Some("only.png"));
    }

    #[test]
    fn test_summary_prefers_focus() {
        let site = SiteRecord {
            focus: Some("Soil sampling".into()),
            description: Some("Long text".into()),
            ..Default::default()
        };
        assert_eq!(site.summary_text(), Some("Soil sampling"));

        let site = SiteRecord {
            focus: Some(String::new()),
            description: Some("Long text".into()),
            ..Default::default()
        };
        assert_eq!(site.summary_text(), Some("Long text"));
    }

    #[test]
    fn test_null_name_decodes_as_empty() {
        let site = parse(r#"{"name": null, "lat": 1, "lng": 2}"#);
        assert_eq!(site.name, "");
        assert_eq!(site.lon_lat(), Some((2.0, 1.0)));

        let site = parse(r#"{"name": 42}"#);
        assert_eq!(site.name, "42");
    }

    #[test]
    fn test_images_of_wrong_shape() {
        let site = parse(r#"{"name": "X", "images": null, "image": "b.png"}"#);
        assert!(site.images.is_empty());
        assert_eq!(site.first_image(), Some("b.png"));

        let site = parse(r#"{"name": "X", "images": "x.jpg"}"#);
        assert!(site.images.is_empty());
        assert_eq!(site.first_image(), None);

        let site = parse(r#"{"name": "X", "images": [3, "", "c.jpg", {"src": "d"}]}"#);
        assert_eq!(site.images, vec!["c.jpg".to_string()]);
    }

    #[test]
    fn test_numeric_and_odd_text_fields() {
        let site = parse(
            r#"{"name": "X", "program": 2024, "region": true, "city": ["Nairobi"],
                "type": {"label": "Lab"}, "link": ""}"#,
        );
        assert_eq!(site.program.as_deref(), Some("2024"));
        assert_eq!(site.region, None);
        assert_eq!(site.city, None);
        assert_eq!(site.category, None);
        assert_eq!(site.link, None);
    }
}
