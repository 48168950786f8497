use crate::error::LoadError;
use crate::site::SiteRecord;
use std::fmt;
use std::fs;
use std::path::PathBuf;

/// Where the dataset comes from, decided once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    File(PathBuf),
    Url(String),
}

impl DataSource {
    /// `http://` and `https://` locations are fetched, anything else is a path.
    pub fn parse(location: &str) -> Self {
        let lower = location.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            DataSource::Url(location.to_string())
        } else {
            DataSource::File(PathBuf::from(location))
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::File(path) => write!(f, "{}", path.display()),
            DataSource::Url(url) => f.write_str(url),
        }
    }
}

/// Fetch and decode the dataset. A non-success status, IO error or malformed
/// JSON are all load failures.
pub fn load_sites(source: &DataSource) -> Result<Vec<SiteRecord>, LoadError> {
    let bytes = match source {
        DataSource::File(path) => fs::read(path).map_err(|source| LoadError::Io {
            path: path.clone(),
            source,
        })?,
        DataSource::Url(url) => fetch(url)?,
    };
    let sites = parse_sites(bytes)?;
    tracing::info!(source = %source, count = sites.len(), "loaded site dataset");
    Ok(sites)
}

fn fetch(url: &str) -> Result<Vec<u8>, LoadError> {
    let http_err = |e: ureq::Error| LoadError::Http {
        url: url.to_string(),
        source: Box::new(e),
    };

    // Non-2xx statuses surface as ureq::Error::StatusCode
    let response = ureq::get(url).call().map_err(http_err)?;
    response.into_body().read_to_vec().map_err(http_err)
}

/// Decode a JSON array of site records.
pub fn parse_sites(mut bytes: Vec<u8>) -> Result<Vec<SiteRecord>, LoadError> {
    Ok(simd_json::serde::from_slice(&mut bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_source_detection() {
        assert_eq!(
            DataSource::parse("https://example.org/p.json"),
            DataSource::Url("https://example.org/p.json".into())
        );
        assert_eq!(
            DataSource::parse("data/projects.json"),
            DataSource::File(PathBuf::from("data/projects.json"))
        );
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"name": "A", "lat": 1, "lng": 2}}, {{"name": "B"}}]"#
        )
        .unwrap();

        let sites = load_sites(&DataSource::File(file.path().to_path_buf())).unwrap();
        assert_eq!(sites.len(), 2);
        assert_eq!(sites[0].lon_lat(), Some((2.0, 1.0)));
        assert_eq!(sites[1].lon_lat(), None);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_sites(&DataSource::File(dir.path().join("nope.json"))).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let err = parse_sites(b"[{\"name\": ".to_vec()).unwrap_err();
        assert!(matches!(err, LoadError::Parse(_)));
    }

    #[test]
    fn test_object_instead_of_array_is_parse_error() {
        let err = parse_sites(br#"{"name": "A"}"#.to_vec()).unwrap_err();
        assert!(matches!(err, LoadError::Parse(_)));
    }

    #[test]
    fn test_odd_record_does_not_fail_dataset() {
        let sites = parse_sites(
            br#"[{"name": "A", "lat": 1, "lng": 2},
                 {"name": null, "images": "x.jpg", "program": 2024, "lat": 3, "lng": 4}]"#
                .to_vec(),
        )
        .unwrap();
        assert_eq!(sites.len(), 2);
        assert_eq!(sites[1].name, "");
        assert!(sites[1].images.is_empty());
        assert_eq!(sites[1].program.as_deref(), Some("2024"));
        assert_eq!(sites[1].lon_lat(), Some((4.0, 3.0)));
    }
}
