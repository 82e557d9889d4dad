//! Display views: clinical records with their patient and doctor resolved
//! from the directory.

use crate::access::Owned;
use crate::db::directory;
use crate::error::Result;
use crate::models::UserSummary;
use crate::Clinic;
use rusqlite::Connection;
use serde::Serialize;
use std::collections::HashMap;

/// A record together with summaries of the people it belongs to. Parties
/// that are no longer in the directory are shown as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detailed<T> {
    #[serde(flatten)]
    pub record: T,
    pub patient: Option<UserSummary>,
    pub doctor: Option<UserSummary>,
}

/// Per-request lookup cache, so a listing touches each user once.
struct Parties<'c> {
    conn: &'c Connection,
    seen: HashMap<i64, Option<UserSummary>>,
}

impl<'c> Parties<'c> {
    fn new(conn: &'c Connection) -> Self {
        Self {
            conn,
            seen: HashMap::new(),
        }
    }

    fn summary(&mut self, user_id: i64) -> Result<Option<UserSummary>> {
        if let Some(cached) = self.seen.get(&user_id) {
            return Ok(cached.clone());
        }
        let summary =
            directory::find_user(self.conn, user_id)?.map(|user| UserSummary::from(&user));
        self.seen.insert(user_id, summary.clone());
        Ok(summary)
    }

    fn detail<T: Owned>(&mut self, record: T) -> Result<Detailed<T>> {
        let owners = record.ownership();
        Ok(Detailed {
            patient: self.summary(owners.patient_id)?,
            doctor: self.summary(owners.doctor_id)?,
            record,
        })
    }
}

impl Clinic {
    /// Attaches patient and doctor summaries to one record.
    pub fn detailed<T: Owned>(&self, record: T) -> Result<Detailed<T>> {
        let conn = self.database().connect()?;
        Parties::new(&conn).detail(record)
    }

    /// Attaches patient and doctor summaries to every record, keeping order.
    pub fn detailed_all<T: Owned>(&self, records: Vec<T>) -> Result<Vec<Detailed<T>>> {
        let conn = self.database().connect()?;
        let mut parties = Parties::new(&conn);
        records
            .into_iter()
            .map(|record| parties.detail(record))
            .collect()
    }
}
