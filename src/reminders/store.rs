//! SQLite-backed follow-up store and patient directory.
//!
//! Holds one connection behind a mutex so the store can be shared with
//! batch worker threads. Soft-deleted rows (`is_deleted = 1`) are filtered
//! out of every read and of the reminder-state write.

use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::traits::{PatientDirectory, ReminderStore};
use crate::db::{format_timestamp, parse_timestamp, DatabaseError};
use crate::models::{
    AppointmentStatus, FollowUp, FollowUpId, PatientContact, PatientId, ReminderState,
};

const FOLLOW_UP_COLUMNS: &str = "id, patient_id, scheduled_at, reason, status, reminder_sent,
     reminder_sent_at, reminder_status, reminder_error, provider_message_id";

pub struct SqliteReminderStore {
    conn: Mutex<Connection>,
}

impl SqliteReminderStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)
    }

    /// Raw connection access for tests that need to edit rows directly.
    #[cfg(test)]
    pub(crate) fn connection(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap()
    }

    /// Register a patient. Patient records are owned by the clinic backend;
    /// this exists for seeding and tests.
    pub fn insert_patient(
        &self,
        first_name: &str,
        last_name: &str,
        phone: &str,
    ) -> Result<PatientId, DatabaseError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO patients (first_name, last_name, phone) VALUES (?1, ?2, ?3)",
            params![first_name, last_name, phone],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Create a follow-up in its initial reminder state and return its id.
    pub fn insert_follow_up(
        &self,
        patient_id: PatientId,
        scheduled_at: NaiveDateTime,
        reason: Option<&str>,
        status: AppointmentStatus,
    ) -> Result<FollowUpId, DatabaseError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO follow_ups (patient_id, scheduled_at, reason, status)
             VALUES (?1, ?2, ?3, ?4)",
            params![patient_id, format_timestamp(&scheduled_at), reason, status.as_str()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Soft-delete a follow-up. Returns false if it was already gone.
    pub fn delete_follow_up(&self, id: FollowUpId) -> Result<bool, DatabaseError> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE follow_ups SET is_deleted = 1 WHERE id = ?1 AND is_deleted = 0",
            params![id],
        )?;
        Ok(changed > 0)
    }

    fn query_follow_ups(
        conn: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<FollowUp>, DatabaseError> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, FollowUpRow::from_row)?;

        let mut follow_ups = Vec::new();
        for row in rows {
            follow_ups.push(follow_up_from_row(row?)?);
        }
        Ok(follow_ups)
    }
}

impl ReminderStore for SqliteReminderStore {
    fn find_due_between(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<FollowUp>, DatabaseError> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {FOLLOW_UP_COLUMNS} FROM follow_ups
             WHERE is_deleted = 0 AND scheduled_at BETWEEN ?1 AND ?2
             ORDER BY scheduled_at ASC, id ASC"
        );
        Self::query_follow_ups(
            &conn,
            &sql,
            params![format_timestamp(&start), format_timestamp(&end)],
        )
    }

    fn find_by_status(&self, status: AppointmentStatus) -> Result<Vec<FollowUp>, DatabaseError> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {FOLLOW_UP_COLUMNS} FROM follow_ups
             WHERE is_deleted = 0 AND status = ?1
             ORDER BY scheduled_at ASC, id ASC"
        );
        Self::query_follow_ups(&conn, &sql, params![status.as_str()])
    }

    fn find_by_id(&self, id: FollowUpId) -> Result<Option<FollowUp>, DatabaseError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                &format!(
                    "SELECT {FOLLOW_UP_COLUMNS} FROM follow_ups WHERE id = ?1 AND is_deleted = 0"
                ),
                params![id],
                FollowUpRow::from_row,
            )
            .optional()?;

        row.map(follow_up_from_row).transpose()
    }

    fn save(&self, follow_up: &FollowUp) -> Result<(), DatabaseError> {
        let conn = self.lock()?;
        let reminder = &follow_up.reminder;
        conn.execute(
            "INSERT INTO follow_ups
             (id, patient_id, scheduled_at, reason, status, reminder_sent, reminder_sent_at,
              reminder_status, reminder_error, provider_message_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(id) DO UPDATE SET
                patient_id = excluded.patient_id,
                scheduled_at = excluded.scheduled_at,
                reason = excluded.reason,
                status = excluded.status,
                reminder_sent = excluded.reminder_sent,
                reminder_sent_at = excluded.reminder_sent_at,
                reminder_status = excluded.reminder_status,
                reminder_error = excluded.reminder_error,
                provider_message_id = excluded.provider_message_id",
            params![
                follow_up.id,
                follow_up.patient_id,
                format_timestamp(&follow_up.scheduled_at),
                follow_up.reason,
                follow_up.appointment_status.as_str(),
                reminder.reminder_sent,
                reminder.reminder_sent_at.as_ref().map(format_timestamp),
                reminder.reminder_status.as_str(),
                reminder.reminder_error,
                reminder.provider_message_id,
            ],
        )?;
        Ok(())
    }

    fn update_reminder_state(
        &self,
        id: FollowUpId,
        state: &ReminderState,
    ) -> Result<bool, DatabaseError> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE follow_ups
             SET reminder_sent = ?1, reminder_sent_at = ?2, reminder_status = ?3,
                 reminder_error = ?4, provider_message_id = ?5
             WHERE id = ?6 AND is_deleted = 0",
            params![
                state.reminder_sent,
                state.reminder_sent_at.as_ref().map(format_timestamp),
                state.reminder_status.as_str(),
                state.reminder_error,
                state.provider_message_id,
                id,
            ],
        )?;
        Ok(changed > 0)
    }
}

impl PatientDirectory for SqliteReminderStore {
    fn patient_contact(&self, patient_id: PatientId) -> Result<Option<PatientContact>, DatabaseError> {
        let conn = self.lock()?;
        let contact = conn
            .query_row(
                "SELECT first_name, last_name, phone FROM patients
                 WHERE id = ?1 AND is_deleted = 0",
                params![patient_id],
                |row| {
                    let first: String = row.get(0)?;
                    let last: String = row.get(1)?;
                    let phone: String = row.get(2)?;
                    Ok(PatientContact::from_names(patient_id, &first, &last, &phone))
                },
            )
            .optional()?;
        Ok(contact)
    }
}

struct FollowUpRow {
    id: FollowUpId,
    patient_id: PatientId,
    scheduled_at: String,
    reason: Option<String>,
    status: String,
    reminder_sent: bool,
    reminder_sent_at: Option<String>,
    reminder_status: String,
    reminder_error: Option<String>,
    provider_message_id: Option<String>,
}

impl FollowUpRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            patient_id: row.get(1)?,
            scheduled_at: row.get(2)?,
            reason: row.get(3)?,
            status: row.get(4)?,
            reminder_sent: row.get(5)?,
            reminder_sent_at: row.get(6)?,
            reminder_status: row.get(7)?,
            reminder_error: row.get(8)?,
            provider_message_id: row.get(9)?,
        })
    }
}

fn follow_up_from_row(row: FollowUpRow) -> Result<FollowUp, DatabaseError> {
    Ok(FollowUp {
        id: row.id,
        patient_id: row.patient_id,
        scheduled_at: parse_timestamp("scheduled_at", &row.scheduled_at)?,
        reason: row.reason,
        appointment_status: row.status.parse()?,
        reminder: ReminderState {
            reminder_sent: row.reminder_sent,
            reminder_status: row.reminder_status.parse()?,
            reminder_sent_at: row
                .reminder_sent_at
                .as_deref()
                .map(|ts| parse_timestamp("reminder_sent_at", ts))
                .transpose()?,
            reminder_error: row.reminder_error,
            provider_message_id: row.provider_message_id,
        },
    })
}
