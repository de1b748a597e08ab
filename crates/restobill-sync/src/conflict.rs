//! # Conflict Resolution
//!
//! Picks the surviving copy when a record was changed both locally (while
//! offline) and on the server.
//!
//! ## Resolution Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Conflict Resolution Strategy                         │
//! │                                                                         │
//! │  1. Higher version wins                                                │
//! │        local v5  vs  remote v7   ──► remote                            │
//! │                                                                         │
//! │  2. Same version: later updated_at wins                                │
//! │        v5 @ 12:01  vs  v5 @ 12:03 ──► the 12:03 copy                   │
//! │                                                                         │
//! │  3. Complete tie: the server copy wins                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A record that carries optimistic-concurrency metadata.
pub trait Versioned {
    fn version(&self) -> i64;
    fn updated_at(&self) -> DateTime<Utc>;
}

/// Which copy survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    KeepLocal,
    TakeRemote,
}

/// Decides between a local and a remote copy of the same record.
pub fn resolve<T: Versioned>(local: &T, remote: &T) -> Resolution {
    let ordering = local
        .version()
        .cmp(&remote.version())
        .then_with(|| local.updated_at().cmp(&remote.updated_at()));

    match ordering {
        Ordering::Greater => Resolution::KeepLocal,
        Ordering::Less | Ordering::Equal => Resolution::TakeRemote,
    }
}

/// Returns the surviving copy.
pub fn merge<T: Versioned>(local: T, remote: T) -> T {
    match resolve(&local, &remote) {
        Resolution::KeepLocal => local,
        Resolution::TakeRemote => remote,
    }
}

/// Generic versioned JSON document (orders, tables, menu items).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionedRecord {
    pub id: String,
    pub version: i64,
    pub updated_at: DateTime<Utc>,
    pub data: serde_json::Value,
}

impl Versioned for VersionedRecord {
    fn version(&self) -> i64 {
        self.version
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn record(version: i64, minutes: i64, status: &str) -> VersionedRecord {
        let base = DateTime::parse_from_rfc3339("2024-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        VersionedRecord {
            id: "table-7".to_string(),
            version,
            updated_at: base + Duration::minutes(minutes),
            data: json!({ "status": status }),
        }
    }

    #[test]
    fn test_higher_version_wins() {
        assert_eq!(resolve(&record(5, 9, "a"), &record(7, 0, "b")), Resolution::TakeRemote);
        assert_eq!(resolve(&record(8, 0, "a"), &record(7, 9, "b")), Resolution::KeepLocal);
    }

    #[test]
    fn test_same_version_later_update_wins() {
        assert_eq!(resolve(&record(5, 3, "a"), &record(5, 1, "b")), Resolution::KeepLocal);
        assert_eq!(resolve(&record(5, 1, "a"), &record(5, 3, "b")), Resolution::TakeRemote);
    }

    #[test]
    fn test_full_tie_keeps_server_copy() {
        let merged = merge(record(5, 2, "local"), record(5, 2, "remote"));
        assert_eq!(merged.data["status"], "remote");
    }
}
