//! Explicit per-session state for the presentation layer.
//!
//! The original workstation kept the selected history entry in global mutable
//! state next to a process-lifetime database connection. Here the selection
//! lives in a value the caller owns and passes into each operation, and store
//! handles are opened with scoped lifetimes per operation instead.

use rusqlite::Connection;

use crate::db::{self, AnalysisRecord, DatabaseError};

/// Which history entry the user is currently viewing, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    selected: Option<i64>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a history entry for viewing.
    pub fn select(&mut self, record_id: i64) {
        self.selected = Some(record_id);
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<i64> {
        self.selected
    }

    /// Fetch the selected record. Relationship extraction is the caller's
    /// concern — it is recomputed from the summary on every view.
    pub fn selected_record(
        &self,
        conn: &Connection,
    ) -> Result<Option<AnalysisRecord>, DatabaseError> {
        match self.selected {
            Some(id) => db::get_record(conn, id),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;

    #[test]
    fn new_session_has_no_selection() {
        let session = SessionContext::new();
        assert_eq!(session.selected(), None);

        let conn = open_memory_database().unwrap();
        assert!(session.selected_record(&conn).unwrap().is_none());
    }

    #[test]
    fn select_then_fetch() {
        let conn = open_memory_database().unwrap();
        let id = db::insert_record(&conn, "tale.txt", "summary", "05-01 12:00").unwrap();

        let mut session = SessionContext::new();
        session.select(id);

        let record = session.selected_record(&conn).unwrap().unwrap();
        assert_eq!(record.id, id);
        assert_eq!(record.filename, "tale.txt");
    }

    #[test]
    fn selection_of_cleared_record_resolves_to_none() {
        let conn = open_memory_database().unwrap();
        let id = db::insert_record(&conn, "tale.txt", "summary", "05-01 12:00").unwrap();

        let mut session = SessionContext::new();
        session.select(id);
        db::delete_all_records(&conn).unwrap();

        // Stale selection is not an error — the record is simply gone
        assert!(session.selected_record(&conn).unwrap().is_none());
    }

    #[test]
    fn clear_selection_resets() {
        let mut session = SessionContext::new();
        session.select(7);
        assert_eq!(session.selected(), Some(7));
        session.clear_selection();
        assert_eq!(session.selected(), None);
    }
}
