//! City → country lookup loaded from a GeoNames `cities*.txt` dump.
//!
//! Each line is tab-separated; column 2 (index 1) is the city name and
//! column 9 (index 8) the ISO-3166 alpha-2 country code. Names are indexed
//! lowercased.

use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::CoreError;

const NAME_COL: usize = 1;
const COUNTRY_COL: usize = 8;

#[derive(Debug, Default, Clone)]
pub struct Gazetteer {
    cities: HashMap<String, BTreeSet<String>>,
}

impl Gazetteer {
    /// An empty gazetteer; every lookup misses.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load from a GeoNames file. A leading `~/` is expanded to the home
    /// directory.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let path = expand_home(path);
        let file = File::open(&path).map_err(|source| CoreError::Gazetteer {
            path: path.clone(),
            source,
        })?;
        let gazetteer = Self::from_reader(BufReader::new(file))
            .map_err(|source| CoreError::Gazetteer {
                path: path.clone(),
                source,
            })?;
        tracing::info!(
            path = %path.display(),
            cities = gazetteer.len(),
            "loaded gazetteer"
        );
        Ok(gazetteer)
    }

    /// Parse GeoNames rows. Lines with fewer than nine columns, a blank
    /// country or blank names are skipped. Invalid UTF-8 is replaced rather
    /// than rejected.
    pub fn from_reader(mut reader: impl BufRead) -> std::io::Result<Self> {
        let mut cities: HashMap<String, BTreeSet<String>> = HashMap::new();
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            let line = String::from_utf8_lossy(&buf);
            let cols: Vec<&str> = line
                .trim_end_matches(|c| c == '\n' || c == '\r')
                .split('\t')
                .collect();
            if cols.len() <= COUNTRY_COL {
                continue;
            }
            let name = cols[NAME_COL].trim();
            let country = cols[COUNTRY_COL].trim();
            if name.is_empty() || country.is_empty() {
                continue;
            }
            cities
                .entry(name.to_lowercase())
                .or_default()
                .insert(country.to_string());
        }
        Ok(Self { cities })
    }

    /// Number of distinct indexed names.
    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    /// All country codes known for `city` (case-insensitive).
    pub fn countries(&self, city: &str) -> Option<&BTreeSet<String>> {
        self.cities.get(&city.trim().to_lowercase())
    }

    /// The country code for `city` when it is unambiguous.
    pub fn unique_country(&self, city: &str) -> Option<&str> {
        let countries = self.countries(city)?;
        if countries.len() == 1 {
            countries.iter().next().map(String::as_str)
        } else {
            None
        }
    }

    #[cfg(test)]
    pub(crate) fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        let mut cities: HashMap<String, BTreeSet<String>> = HashMap::new();
        for (city, country) in pairs {
            cities
                .entry(city.to_lowercase())
                .or_default()
                .insert((*country).to_string());
        }
        Self { cities }
    }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn row(name: &str, ascii: &str, country: &str) -> String {
        format!("1\t{name}\t{ascii}\talt\t0.0\t0.0\tP\tPPL\t{country}\t\t\t\t\t\t100\n")
    }

    #[test]
    fn parses_rows_case_insensitively() {
        let data = format!(
            "{}{}",
            row("Zurich", "Zurich", "CH"),
            row("Crete", "Crete", "US")
        );
        let g = Gazetteer::from_reader(Cursor::new(data)).unwrap();
        assert_eq!(g.len(), 2);
        assert_eq!(g.unique_country("zurich"), Some("CH"));
        assert_eq!(g.unique_country(" ZURICH "), Some("CH"));
        assert_eq!(g.unique_country("Crete"), Some("US"));
        assert_eq!(g.unique_country("Athens"), None);
    }

    #[test]
    fn ambiguous_city_has_no_unique_country() {
        let data = format!(
            "{}{}",
            row("Paris", "Paris", "FR"),
            row("Paris", "Paris", "US")
        );
        let g = Gazetteer::from_reader(Cursor::new(data)).unwrap();
        assert_eq!(g.countries("Paris").map(|c| c.len()), Some(2));
        assert_eq!(g.unique_country("Paris"), None);
    }

    #[test]
    fn skips_short_and_countryless_rows() {
        let data = format!("1\tNowhere\tNowhere\n{}", row("Lyon", "Lyon", ""));
        let g = Gazetteer::from_reader(Cursor::new(data)).unwrap();
        assert!(g.is_empty());
    }

    #[test]
    fn tolerates_invalid_utf8() {
        let mut data = row("Lyon", "Lyon", "FR").into_bytes();
        data.extend_from_slice(b"2\tBad\xff\tBad\ta\t0\t0\tP\tPPL\tXX\n");
        let g = Gazetteer::from_reader(Cursor::new(data)).unwrap();
        assert_eq!(g.unique_country("Lyon"), Some("FR"));
        assert_eq!(g.unique_country("Bad\u{fffd}"), Some("XX"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = Gazetteer::load(Path::new("/nonexistent/cities5000.txt")).unwrap_err();
        assert!(matches!(err, CoreError::Gazetteer { .. }));
    }

    #[test]
    fn expands_home_prefix() {
        let p = expand_home(Path::new("/abs/path.txt"));
        assert_eq!(p, PathBuf::from("/abs/path.txt"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home(Path::new("~/geo/c.txt")), home.join("geo/c.txt"));
        }
    }
}
