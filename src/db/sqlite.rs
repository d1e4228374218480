//! SQLite access to the photometer readings database
//!
//! Readings are fetched in pages with keyset pagination on
//! `(date_id, time_id, tess_id)`, so memory stays bounded by the page size
//! however long a device history is.

use std::path::Path;
use std::vec;

use rusqlite::types::Value;
use rusqlite::{named_params, Connection, OpenFlags, Row};

use crate::error::{PurgeError, PurgeResult};
use crate::reading::Reading;
use crate::source::{ReadingIter, ReadingSource};

/// Default number of readings fetched per query
pub const DEFAULT_PAGE_SIZE: usize = 500;

const DEVICES_SQL: &str = "SELECT DISTINCT name FROM tess_t ORDER BY name ASC";

const READINGS_PAGE_SQL: &str = "
    SELECT r.date_id, r.time_id, r.tess_id, r.sequence_number, r.frequency, r.magnitude
    FROM tess_readings_t AS r
    JOIN tess_t AS i USING (tess_id)
    WHERE i.name = :name
      AND (r.date_id, r.time_id, r.tess_id) > (:date_id, :time_id, :tess_id)
    ORDER BY r.date_id ASC, r.time_id ASC, r.tess_id ASC
    LIMIT :limit";

/// Read-only handle on the TESS database
pub struct SqliteSource {
    conn: Connection,
    page_size: usize,
}

impl SqliteSource {
    /// Open an existing database file read-only
    pub fn open<P: AsRef<Path>>(path: P, page_size: usize) -> PurgeResult<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(PurgeError::InvalidConfig(format!(
                "no SQLite database file found at {}",
                path.display()
            )));
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Self::from_connection(conn, page_size)
    }

    /// Wrap an already open connection
    pub fn from_connection(conn: Connection, page_size: usize) -> PurgeResult<Self> {
        if page_size == 0 {
            return Err(PurgeError::InvalidConfig(
                "page size must be at least 1".to_string(),
            ));
        }
        Ok(Self { conn, page_size })
    }

    /// Get reference to underlying connection
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn fetch_page(&self, device: &str, after: (i64, i64, i64)) -> PurgeResult<Vec<Reading>> {
        let mut stmt = self.conn.prepare_cached(READINGS_PAGE_SQL)?;
        let mut rows = stmt.query(named_params! {
            ":name": device,
            ":date_id": after.0,
            ":time_id": after.1,
            ":tess_id": after.2,
            ":limit": self.page_size as i64,
        })?;

        let mut page = Vec::with_capacity(self.page_size);
        while let Some(row) = rows.next()? {
            page.push(reading_from_row(device, row)?);
        }
        Ok(page)
    }
}

impl ReadingSource for SqliteSource {
    fn devices(&self) -> PurgeResult<Vec<String>> {
        let mut stmt = self.conn.prepare(DEVICES_SQL)?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    fn readings<'a>(&'a self, device: &str) -> PurgeResult<ReadingIter<'a>> {
        Ok(Box::new(PagedReadings {
            source: self,
            device: device.to_string(),
            page: Vec::new().into_iter(),
            after: (i64::MIN, i64::MIN, i64::MIN),
            exhausted: false,
        }))
    }
}

/// Lazily pages through one device stream
struct PagedReadings<'a> {
    source: &'a SqliteSource,
    device: String,
    page: vec::IntoIter<Reading>,
    after: (i64, i64, i64),
    exhausted: bool,
}

impl Iterator for PagedReadings<'_> {
    type Item = PurgeResult<Reading>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(reading) = self.page.next() {
            return Some(Ok(reading));
        }
        if self.exhausted {
            return None;
        }

        match self.source.fetch_page(&self.device, self.after) {
            Ok(page) => {
                if page.len() < self.source.page_size {
                    self.exhausted = true;
                }
                if let Some(last) = page.last() {
                    self.after = (last.date_id, last.time_id, last.device_id);
                }
                self.page = page.into_iter();
                self.page.next().map(Ok)
            }
            Err(e) => {
                self.exhausted = true;
                Some(Err(e))
            }
        }
    }
}

fn reading_from_row(device: &str, row: &Row<'_>) -> PurgeResult<Reading> {
    let date = row.get::<_, Value>(0)?;
    let time = row.get::<_, Value>(1)?;
    let id = row.get::<_, Value>(2)?;

    // Unparseable key parts are reported as 0.
    let date_id = integer(&date).unwrap_or(0);
    let time_id = integer(&time).unwrap_or(0);
    let malformed = |reason: String| PurgeError::MalformedReading {
        device: device.to_string(),
        date_id,
        time_id,
        reason,
    };

    for (column, value) in [("date_id", &date), ("time_id", &time), ("tess_id", &id)] {
        if integer(value).is_none() {
            return Err(malformed(format!("{column} {value:?} is not an integer")));
        }
    }
    let device_id = integer(&id).unwrap_or_default();

    let sequence_number = integer(&row.get::<_, Value>(3)?).ok_or_else(|| {
        malformed("sequence number is not an integer".to_string())
    })?;
    let frequency = numeric(row.get::<_, Value>(4)?)
        .ok_or_else(|| malformed("frequency is not numeric".to_string()))?;
    let magnitude = match row.get::<_, Value>(5)? {
        Value::Null => None,
        other => Some(
            numeric(other).ok_or_else(|| malformed("magnitude is not numeric".to_string()))?,
        ),
    };

    Ok(Reading {
        date_id,
        time_id,
        device_id,
        sequence_number,
        frequency,
        magnitude,
    })
}

fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Integer(n) => Some(*n),
        _ => None,
    }
}

fn numeric(value: Value) -> Option<f64> {
    match value {
        Value::Integer(n) => Some(n as f64),
        Value::Real(f) => Some(f),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn database(page_size: usize) -> SqliteSource {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE tess_t (tess_id INTEGER PRIMARY KEY, name TEXT NOT NULL);
             CREATE TABLE tess_readings_t (
                 date_id INTEGER, time_id INTEGER, tess_id INTEGER,
                 sequence_number INTEGER, frequency REAL, magnitude REAL,
                 PRIMARY KEY (date_id, time_id, tess_id));
             INSERT INTO tess_t VALUES (1, 'stars1'), (2, 'stars2'), (3, 'stars1');",
        )
        .unwrap();
        SqliteSource::from_connection(conn, page_size).unwrap()
    }

    fn insert(db: &SqliteSource, date_id: i64, time_id: i64, tess_id: i64, seq: i64, freq: &str) {
        db.connection()
            .execute(
                &format!(
                    "INSERT INTO tess_readings_t VALUES ({date_id}, {time_id}, {tess_id}, {seq}, {freq}, NULL)"
                ),
                [],
            )
            .unwrap();
    }

    #[test]
    fn test_devices_are_distinct_and_sorted() {
        let db = database(10);
        assert_eq!(db.devices().unwrap(), vec!["stars1", "stars2"]);
    }

    #[test]
    fn test_readings_are_ordered_across_pages() {
        let db = database(2);
        insert(&db, 20190102, 10, 1, 4, "1.0");
        insert(&db, 20190101, 30, 1, 3, "1.0");
        insert(&db, 20190101, 10, 1, 1, "0");
        insert(&db, 20190101, 20, 1, 2, "2.5");
        insert(&db, 20190101, 20, 2, 9, "2.5");

        let seqs: Vec<i64> = db
            .readings("stars1")
            .unwrap()
            .map(|r| r.unwrap().sequence_number)
            .collect();
        assert_eq!(seqs, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_renamed_photometer_shares_one_stream() {
        let db = database(1);
        insert(&db, 20190101, 10, 1, 1, "1.0");
        insert(&db, 20190101, 10, 3, 1, "1.0");
        insert(&db, 20190101, 20, 3, 2, "1.0");

        let ids: Vec<i64> = db
            .readings("stars1")
            .unwrap()
            .map(|r| r.unwrap().device_id)
            .collect();
        assert_eq!(ids, vec![1, 3, 3]);
    }

    #[test]
    fn test_exact_page_multiple_terminates() {
        let db = database(2);
        insert(&db, 20190101, 10, 2, 1, "1.0");
        insert(&db, 20190101, 20, 2, 2, "1.0");
        assert_eq!(db.readings("stars2").unwrap().count(), 2);
    }

    #[test]
    fn test_text_frequency_is_malformed() {
        let db = database(10);
        insert(&db, 20190101, 10, 2, 1, "'n/a'");
        let err = db.readings("stars2").unwrap().next().unwrap().unwrap_err();
        assert!(matches!(err, PurgeError::MalformedReading { .. }));
    }

    #[test]
    fn test_text_key_is_malformed() {
        let db = database(10);
        insert(&db, 20190101, 10, 2, 1, "1.0");
        db.connection()
            .execute("UPDATE tess_readings_t SET time_id = 'bad' WHERE tess_id = 2", [])
            .unwrap();
        let err = db.readings("stars2").unwrap().next().unwrap().unwrap_err();
        assert!(err.is_per_device());
        assert!(err.to_string().contains("time_id"));
    }

    #[test]
    fn test_text_sequence_number_is_malformed() {
        let db = database(10);
        insert(&db, 20190101, 10, 2, 1, "1.0");
        db.connection()
            .execute("UPDATE tess_readings_t SET sequence_number = 'x' WHERE tess_id = 2", [])
            .unwrap();
        let err = db.readings("stars2").unwrap().next().unwrap().unwrap_err();
        assert!(matches!(err, PurgeError::MalformedReading { .. }));
    }

    #[test]
    fn test_integer_frequency_is_accepted() {
        let db = database(10);
        insert(&db, 20190101, 10, 2, 1, "0");
        let reading = db.readings("stars2").unwrap().next().unwrap().unwrap();
        assert_eq!(reading.frequency, 0.0);
        assert_eq!(reading.magnitude, None);
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(SqliteSource::from_connection(conn, 0).is_err());
    }

    #[test]
    fn test_open_missing_file_is_config_error() {
        let err = SqliteSource::open("/nonexistent/tess.db", 10).err().unwrap();
        assert!(matches!(err, PurgeError::InvalidConfig(_)));
    }
}
