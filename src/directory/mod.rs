//! Recipient directory.
//!
//! Static lookup from an external business identifier (the lead platform's
//! ECP id) to a messaging destination. Records are loaded once from
//! configuration and never mutated afterwards.
//!
//! The Luiss partner group is not part of the directory: its
//! destination is a constant used directly by the dispatcher.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Destination of the dedicated Luiss lead webhook. Never looked up.
pub const LUISS_DESTINATION: &str = "120363298744307174@g.us";

/// Display name used when logging Luiss deliveries
pub const LUISS_NAME: &str = "Luiss";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("Recipient not found: {0}")]
    NotFound(String),

    #[error("Duplicate recipient id: {0}")]
    DuplicateId(String),

    #[error("Invalid recipient {id}: {reason}")]
    InvalidRecord { id: String, reason: String },
}

/// A configured notification destination (individual or group)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientRecord {
    /// Business-system identifier
    #[serde(alias = "external_id")]
    pub id: String,
    /// Human-readable name, used in logs
    #[serde(alias = "display_name")]
    pub name: String,
    /// Opaque transport address, e.g. `1203...@g.us`
    #[serde(alias = "destination_address")]
    pub destination: String,
}

/// Immutable recipient lookup table
#[derive(Debug, Default)]
pub struct RecipientDirectory {
    records: HashMap<String, RecipientRecord>,
}

impl RecipientDirectory {
    /// Build the directory, rejecting duplicate or incomplete records.
    pub fn new(records: Vec<RecipientRecord>) -> Result<Self, DirectoryError> {
        let mut map = HashMap::with_capacity(records.len());

        for record in records {
            if record.id.is_empty() {
                return Err(DirectoryError::InvalidRecord {
                    id: record.name.clone(),
                    reason: "empty id".to_string(),
                });
            }
            if record.destination.is_empty() {
                return Err(DirectoryError::InvalidRecord {
                    id: record.id.clone(),
                    reason: "empty destination".to_string(),
                });
            }
            if map.contains_key(&record.id) {
                return Err(DirectoryError::DuplicateId(record.id));
            }
            map.insert(record.id.clone(), record);
        }

        Ok(Self { records: map })
    }

    /// Exact, case-sensitive lookup by external id
    pub fn resolve(&self, external_id: &str) -> Result<&RecipientRecord, DirectoryError> {
        self.records
            .get(external_id)
            .ok_or_else(|| DirectoryError::NotFound(external_id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, destination: &str) -> RecipientRecord {
        RecipientRecord {
            id: id.to_string(),
            name: format!("name-{}", id),
            destination: destination.to_string(),
        }
    }

    #[test]
    fn test_resolve_exact_match() {
        let dir = RecipientDirectory::new(vec![
            record("64c8d506f67b84dfe65a2d8f", "111@g.us"),
            record("68f8ae7dccb51d3308fea01a", "222@g.us"),
        ])
        .unwrap();

        let found = dir.resolve("68f8ae7dccb51d3308fea01a").unwrap();
        assert_eq!(found.destination, "222@g.us");
        assert_eq!(dir.len(), 2);
    }

    #[test]
    fn test_resolve_is_case_sensitive() {
        let dir = RecipientDirectory::new(vec![record("abcDEF", "1@g.us")]).unwrap();

        assert!(dir.resolve("abcDEF").is_ok());
        assert_eq!(
            dir.resolve("abcdef"),
            Err(DirectoryError::NotFound("abcdef".to_string()))
        );
    }

    #[test]
    fn test_unknown_id_not_found() {
        let dir = RecipientDirectory::default();
        assert!(dir.is_empty());
        assert!(matches!(dir.resolve("missing"), Err(DirectoryError::NotFound(_))));
    }

    #[test]
    fn test_rejects_duplicates() {
        let result = RecipientDirectory::new(vec![record("a", "1@g.us"), record("a", "2@g.us")]);
        assert_eq!(result.unwrap_err(), DirectoryError::DuplicateId("a".to_string()));
    }

    #[test]
    fn test_rejects_empty_destination() {
        let result = RecipientDirectory::new(vec![record("a", "")]);
        assert!(matches!(result, Err(DirectoryError::InvalidRecord { .. })));
    }

    #[test]
    fn test_luiss_is_not_a_directory_entry() {
        let dir = RecipientDirectory::new(vec![record("x", "1@g.us")]).unwrap();
        assert!(dir.resolve(LUISS_NAME).is_err());
        assert!(LUISS_DESTINATION.ends_with("@g.us"));
    }
}
