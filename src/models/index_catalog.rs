use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexOption {
    pub name: String,
    pub ticker: String,
}

/// Fixed set of indices the dashboard offers, in display order.
#[derive(Debug, Clone)]
pub struct IndexCatalog {
    options: Vec<IndexOption>,
}

impl Default for IndexCatalog {
    fn default() -> Self {
        Self::new(vec![
            ("Nasdaq Index", "^NDX"),
            ("Nifty Index", "^NSEI"),
            ("Nasdaq Technology Index", "^NDXT"),
            ("Nifty Technology Index", "^CNXIT"),
        ])
    }
}

impl IndexCatalog {
    pub fn new(entries: Vec<(&str, &str)>) -> Self {
        Self {
            options: entries
                .into_iter()
                .map(|(name, ticker)| IndexOption {
                    name: name.to_string(),
                    ticker: ticker.to_string(),
                })
                .collect(),
        }
    }

    pub fn options(&self) -> &[IndexOption] {
        &self.options
    }

    pub fn names(&self) -> Vec<&str> {
        self.options.iter().map(|o| o.name.as_str()).collect()
    }

    /// Look up by display name (case-insensitive), ticker, or 1-based position.
    pub fn find(&self, query: &str) -> Option<&IndexOption> {
        let query = query.trim();
        if let Ok(position) = query.parse::<usize>() {
            return position.checked_sub(1).and_then(|i| self.options.get(i));
        }
        self.options.iter().find(|o| {
            o.name.eq_ignore_ascii_case(query) || o.ticker.eq_ignore_ascii_case(query)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_maps_names_to_symbols() {
        let catalog = IndexCatalog::default();
        assert_eq!(catalog.options().len(), 4);
        assert_eq!(catalog.find("Nifty Index").unwrap().ticker, "^NSEI");
        assert_eq!(catalog.find("nasdaq technology index").unwrap().ticker, "^NDXT");
        assert_eq!(catalog.find("^cnxit").unwrap().name, "Nifty Technology Index");
    }

    #[test]
    fn test_find_by_position() {
        let catalog = IndexCatalog::default();
        assert_eq!(catalog.find("1").unwrap().ticker, "^NDX");
        assert_eq!(catalog.find("4").unwrap().ticker, "^CNXIT");
        assert!(catalog.find("0").is_none());
        assert!(catalog.find("5").is_none());
    }

    #[test]
    fn test_unknown_index_is_none() {
        assert!(IndexCatalog::default().find("Dow Jones").is_none());
    }
}
