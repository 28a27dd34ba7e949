//! CSV-file backing for the registrant table, one file per community.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::domain::{CommunityId, RegistrantType, RegistrationRecord};
use super::repository::{RegistrationStore, StoreError};

#[derive(Debug, Serialize, Deserialize)]
struct RegistrationRow {
    #[serde(rename = "Timestamp")]
    timestamp: String,
    #[serde(rename = "Community")]
    community: String,
    #[serde(rename = "First Name")]
    first_name: String,
    #[serde(rename = "Last Name")]
    last_name: String,
    #[serde(rename = "Email")]
    email: String,
    #[serde(rename = "Type")]
    registrant_type: String,
    #[serde(rename = "Session")]
    session_label: String,
    #[serde(rename = "Sunday Date", default)]
    sunday_date: String,
}

impl From<&RegistrationRecord> for RegistrationRow {
    fn from(record: &RegistrationRecord) -> Self {
        Self {
            timestamp: record
                .timestamp
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            community: record.community.0.clone(),
            first_name: record.first_name.clone(),
            last_name: record.last_name.clone(),
            email: record.email.clone(),
            registrant_type: record.registrant_type.label().to_string(),
            session_label: record.session_label.clone(),
            sunday_date: record
                .sunday_date
                .map(|date| date.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
        }
    }
}

impl RegistrationRow {
    fn into_record(self, row: usize) -> Result<RegistrationRecord, StoreError> {
        let malformed = |reason: String| StoreError::Malformed { row, reason };

        let timestamp = DateTime::parse_from_rfc3339(self.timestamp.trim())
            .map_err(|err| malformed(format!("timestamp '{}': {err}", self.timestamp)))?
            .with_timezone(&Utc);

        let registrant_type = match self.registrant_type.trim().to_ascii_lowercase().as_str() {
            "member" => RegistrantType::Member,
            "guest" => RegistrantType::Guest,
            other => return Err(malformed(format!("unknown registrant type '{other}'"))),
        };

        let sunday_date = match self.sunday_date.trim() {
            "" => None,
            raw => Some(
                NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .map_err(|err| malformed(format!("sunday date '{raw}': {err}")))?,
            ),
        };

        Ok(RegistrationRecord {
            timestamp,
            community: CommunityId::new(&self.community),
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            registrant_type,
            session_label: self.session_label,
            sunday_date,
        })
    }
}

/// Registrant table kept as `<root>/<community>.csv` with a header row.
#[derive(Debug)]
pub struct CsvRegistrationStore {
    root: PathBuf,
    writer: Mutex<()>,
}

impl CsvRegistrationStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|err| {
            StoreError::Unavailable(format!("cannot create {}: {err}", root.display()))
        })?;
        Ok(Self {
            root,
            writer: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, community: &CommunityId) -> PathBuf {
        self.root.join(format!("{}.csv", community.as_str()))
    }
}

impl RegistrationStore for CsvRegistrationStore {
    fn append(
        &self,
        community: &CommunityId,
        records: &[RegistrationRecord],
    ) -> Result<(), StoreError> {
        let _writer = self
            .writer
            .lock()
            .map_err(|_| StoreError::Unavailable("csv writer lock poisoned".to_string()))?;

        let path = self.path_for(community);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|err| StoreError::Unavailable(format!("{}: {err}", path.display())))?;
        let needs_header = file
            .metadata()
            .map(|meta| meta.len() == 0)
            .map_err(|err| StoreError::Unavailable(format!("{}: {err}", path.display())))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);

        let expected = records.len();
        for (appended, record) in records.iter().enumerate() {
            let written = writer
                .serialize(RegistrationRow::from(record))
                .map_err(|err| err.to_string())
                .and_then(|()| writer.flush().map_err(|err| err.to_string()));

            if let Err(reason) = written {
                return Err(if appended == 0 {
                    StoreError::Unavailable(reason)
                } else {
                    StoreError::PartialAppend {
                        appended,
                        expected,
                        reason,
                    }
                });
            }
        }

        debug!(community = %community, rows = expected, path = %path.display(), "appended registrations");
        Ok(())
    }

    fn read_all(&self, community: &CommunityId) -> Result<Vec<RegistrationRecord>, StoreError> {
        let _writer = self
            .writer
            .lock()
            .map_err(|_| StoreError::Unavailable("csv writer lock poisoned".to_string()))?;

        let path = self.path_for(community);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&path)
            .map_err(|err| StoreError::Unavailable(format!("{}: {err}", path.display())))?;

        reader
            .deserialize::<RegistrationRow>()
            .enumerate()
            .map(|(index, row)| {
                // Data rows start on line 2, after the header.
                let line = index + 2;
                row.map_err(|err| StoreError::Malformed {
                    row: line,
                    reason: err.to_string(),
                })
                .and_then(|row| row.into_record(line))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(first_name: &str, sunday_date: Option<NaiveDate>) -> RegistrationRecord {
        RegistrationRecord {
            timestamp: Utc
                .with_ymd_and_hms(2024, 2, 29, 18, 45, 0)
                .single()
                .expect("valid instant"),
            community: CommunityId::new("main"),
            first_name: first_name.to_string(),
            last_name: "Smith".to_string(),
            email: "smith@example.com".to_string(),
            registrant_type: RegistrantType::Guest,
            session_label: "Sunday Service".to_string(),
            sunday_date,
        }
    }

    #[test]
    fn appends_across_calls_with_a_single_header() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = CsvRegistrationStore::open(dir.path()).expect("store opens");
        let community = CommunityId::new("main");
        let sunday = NaiveDate::from_ymd_opt(2024, 3, 3);

        store
            .append(&community, &[record("Alice", sunday)])
            .expect("first append");
        store
            .append(&community, &[record("Bob", sunday), record("Cara", sunday)])
            .expect("second append");

        let contents = fs::read_to_string(store.path_for(&community)).expect("file readable");
        assert_eq!(contents.matches("Timestamp").count(), 1);

        let records = store.read_all(&community).expect("records load");
        let names: Vec<&str> = records.iter().map(|r| r.first_name.as_str()).collect();
        assert_eq!(names, vec!["Alice", "Bob", "Cara"]);
        assert_eq!(records[0], record("Alice", sunday));
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = CsvRegistrationStore::open(dir.path()).expect("store opens");
        let records = store
            .read_all(&CommunityId::new("youth"))
            .expect("empty table");
        assert!(records.is_empty());
    }

    #[test]
    fn empty_sunday_cell_reads_as_none() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = CsvRegistrationStore::open(dir.path()).expect("store opens");
        let community = CommunityId::new("main");
        store
            .append(&community, &[record("Dana", None)])
            .expect("append");

        let records = store.read_all(&community).expect("records load");
        assert_eq!(records[0].sunday_date, None);
    }

    #[test]
    fn malformed_rows_report_their_line() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = CsvRegistrationStore::open(dir.path()).expect("store opens");
        let community = CommunityId::new("main");
        fs::write(
            store.path_for(&community),
            "Timestamp,Community,First Name,Last Name,Email,Type,Session,Sunday Date\n\
             2024-02-29T18:45:00.000Z,main,Eve,Jones,eve@example.com,Visitor,Sunday Service,2024-03-03\n",
        )
        .expect("seed file");

        match store.read_all(&community) {
            Err(StoreError::Malformed { row, reason }) => {
                assert_eq!(row, 2);
                assert!(reason.contains("visitor"));
            }
            other => panic!("expected malformed row, got {other:?}"),
        }
    }
}
