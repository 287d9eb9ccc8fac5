//! libSQL backend — async `Database` trait implementation.
//!
//! Plain reads and single-statement writes share one connection. Inbound
//! response recording opens its own connection per call and runs inside a
//! `BEGIN IMMEDIATE` transaction, so SQLite serializes concurrent writers
//! while the busy timeout keeps them waiting instead of failing.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use libsql::{Connection, Database as LibSqlDatabase, TransactionBehavior, params};
use tracing::{debug, info, warn};

use crate::error::DatabaseError;
use crate::league::{
    Category, DashboardCounts, DeliveryStatus, Event, Invitation, Language, NewEvent,
    NewOutboundMessage, NewPlayer, OutboundMessage, Player, ResponseLog, ResponseStats,
    ResponseStatus,
};
use crate::store::migrations;
use crate::store::traits::Database;
use crate::templates::MessageKind;

const BUSY_TIMEOUT_MS: u32 = 5000;

/// libSQL database backend over a local file.
pub struct LibSqlBackend {
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        pragma(&conn, "PRAGMA journal_mode = WAL").await?;
        configure(&conn).await?;

        let backend = Self {
            db: Arc::new(db),
            conn,
        };
        backend.run_migrations().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Get the shared connection.
    fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open a dedicated connection for a transaction.
    async fn connect(&self) -> Result<Connection, DatabaseError> {
        let conn = self
            .db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        configure(&conn).await?;
        Ok(conn)
    }

    /// Make every response log insert abort, so `record_response` fails mid-transaction.
    #[cfg(test)]
    pub(crate) async fn fail_response_log_inserts(&self) {
        self.conn
            .execute_batch(
                "CREATE TRIGGER fail_response_log BEFORE INSERT ON response_logs
                 BEGIN SELECT RAISE(ABORT, 'forced failure'); END;",
            )
            .await
            .unwrap();
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Run a PRAGMA, draining whatever rows it reports.
async fn pragma(conn: &Connection, sql: &str) -> Result<(), DatabaseError> {
    let mut rows = conn
        .query(sql, ())
        .await
        .map_err(|e| DatabaseError::Pool(format!("{sql}: {e}")))?;
    while rows
        .next()
        .await
        .map_err(|e| DatabaseError::Pool(format!("{sql}: {e}")))?
        .is_some()
    {}
    Ok(())
}

/// Per-connection settings: enforce foreign keys and wait on locks.
async fn configure(conn: &Connection) -> Result<(), DatabaseError> {
    pragma(conn, "PRAGMA foreign_keys = ON").await?;
    pragma(conn, &format!("PRAGMA busy_timeout = {BUSY_TIMEOUT_MS}")).await
}

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

fn parse_optional_datetime(s: Option<String>) -> Option<DateTime<Utc>> {
    s.filter(|s| !s.is_empty()).map(|s| parse_datetime(&s))
}

const DATE_FORMAT: &str = "%Y-%m-%d";

fn parse_date(column: &str, s: &str) -> Result<NaiveDate, DatabaseError> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .map_err(|e| DatabaseError::Query(format!("{column} parse: {e}")))
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Convert `Option<&str>` to libsql Value.
fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

/// Convert `Option<i64>` to libsql Value.
fn opt_int(n: Option<i64>) -> libsql::Value {
    match n {
        Some(n) => libsql::Value::Integer(n),
        None => libsql::Value::Null,
    }
}

fn text_col(row: &libsql::Row, idx: i32, name: &str) -> Result<String, DatabaseError> {
    row.get::<String>(idx)
        .map_err(|e| DatabaseError::Query(format!("{name}: {e}")))
}

fn int_col(row: &libsql::Row, idx: i32, name: &str) -> Result<i64, DatabaseError> {
    row.get::<i64>(idx)
        .map_err(|e| DatabaseError::Query(format!("{name}: {e}")))
}

fn parse_enum<T: std::str::FromStr<Err = String>>(
    column: &str,
    value: &str,
) -> Result<T, DatabaseError> {
    value
        .parse()
        .map_err(|e| DatabaseError::Query(format!("{column}: {e}")))
}

/// Read every row, mapping each with `map`.
async fn collect_rows<T>(
    mut rows: libsql::Rows,
    op: &str,
    map: fn(&libsql::Row) -> Result<T, DatabaseError>,
) -> Result<Vec<T>, DatabaseError> {
    let mut items = Vec::new();
    while let Some(row) = rows
        .next()
        .await
        .map_err(|e| DatabaseError::Query(format!("{op} row: {e}")))?
    {
        items.push(map(&row)?);
    }
    Ok(items)
}

/// Read the first row, if any.
async fn first_row<T>(
    mut rows: libsql::Rows,
    op: &str,
    map: fn(&libsql::Row) -> Result<T, DatabaseError>,
) -> Result<Option<T>, DatabaseError> {
    match rows.next().await {
        Ok(Some(row)) => Ok(Some(map(&row)?)),
        Ok(None) => Ok(None),
        Err(e) => Err(DatabaseError::Query(format!("{op} row: {e}"))),
    }
}

const PLAYER_COLUMNS: &str = "id, first_name, last_name, phone_number, email, skill_level, city, country, preferred_language, created_at";

const JOINED_PLAYER_COLUMNS: &str = "p.id, p.first_name, p.last_name, p.phone_number, p.email, p.skill_level, p.city, p.country, p.preferred_language, p.created_at";

const EVENT_COLUMNS: &str = "id, name, start_date, end_date, location, description, created_at";

const INVITATION_COLUMNS: &str =
    "id, event_id, player_id, response_status, response_date, notes, created_at";

const RESPONSE_LOG_COLUMNS: &str =
    "id, player_id, event_id, response_text, response_type, received_at, processed";

const OUTBOUND_COLUMNS: &str = "id, player_id, event_id, content, direction, status, message_type, external_id, created_at, sent_at";

/// Map a libsql Row to a Player. Column order matches PLAYER_COLUMNS.
fn row_to_player(row: &libsql::Row) -> Result<Player, DatabaseError> {
    let language: String = row.get(8).unwrap_or_default();
    let created: String = text_col(row, 9, "players.created_at")?;
    Ok(Player {
        id: int_col(row, 0, "players.id")?,
        first_name: text_col(row, 1, "players.first_name")?,
        last_name: text_col(row, 2, "players.last_name")?,
        phone_number: text_col(row, 3, "players.phone_number")?,
        email: row.get(4).ok(),
        skill_level: row.get(5).ok(),
        city: row.get(6).ok(),
        country: row.get(7).ok(),
        preferred_language: Language::from_code_or_default(&language),
        created_at: parse_datetime(&created),
    })
}

fn row_to_event(row: &libsql::Row) -> Result<Event, DatabaseError> {
    let start: String = text_col(row, 2, "events.start_date")?;
    let end: Option<String> = row.get(3).ok();
    let created: String = text_col(row, 6, "events.created_at")?;
    Ok(Event {
        id: int_col(row, 0, "events.id")?,
        name: text_col(row, 1, "events.name")?,
        start_date: parse_date("events.start_date", &start)?,
        end_date: end
            .filter(|s| !s.is_empty())
            .map(|s| parse_date("events.end_date", &s))
            .transpose()?,
        location: text_col(row, 4, "events.location")?,
        description: row.get(5).ok(),
        created_at: parse_datetime(&created),
    })
}

fn row_to_invitation(row: &libsql::Row) -> Result<Invitation, DatabaseError> {
    let status: String = text_col(row, 3, "invitations.response_status")?;
    let created: String = text_col(row, 6, "invitations.created_at")?;
    Ok(Invitation {
        id: int_col(row, 0, "invitations.id")?,
        event_id: int_col(row, 1, "invitations.event_id")?,
        player_id: int_col(row, 2, "invitations.player_id")?,
        response_status: parse_enum("invitations.response_status", &status)?,
        response_date: parse_optional_datetime(row.get(4).ok()),
        notes: row.get(5).ok(),
        created_at: parse_datetime(&created),
    })
}

fn row_to_response_log(row: &libsql::Row) -> Result<ResponseLog, DatabaseError> {
    let response_type: String = text_col(row, 4, "response_logs.response_type")?;
    let received: String = text_col(row, 5, "response_logs.received_at")?;
    let processed: i64 = row.get(6).unwrap_or(0);
    Ok(ResponseLog {
        id: int_col(row, 0, "response_logs.id")?,
        player_id: row.get(1).ok(),
        event_id: row.get(2).ok(),
        response_text: text_col(row, 3, "response_logs.response_text")?,
        response_type: parse_enum("response_logs.response_type", &response_type)?,
        received_at: parse_datetime(&received),
        processed: processed != 0,
    })
}

fn row_to_outbound(row: &libsql::Row) -> Result<OutboundMessage, DatabaseError> {
    let status: String = text_col(row, 5, "outbound_messages.status")?;
    let kind: String = text_col(row, 6, "outbound_messages.message_type")?;
    let created: String = text_col(row, 8, "outbound_messages.created_at")?;
    let sent: String = text_col(row, 9, "outbound_messages.sent_at")?;
    Ok(OutboundMessage {
        id: int_col(row, 0, "outbound_messages.id")?,
        player_id: row.get(1).ok(),
        event_id: row.get(2).ok(),
        content: text_col(row, 3, "outbound_messages.content")?,
        direction: text_col(row, 4, "outbound_messages.direction")?,
        status: parse_enum::<DeliveryStatus>("outbound_messages.status", &status)?,
        kind: parse_enum::<MessageKind>("outbound_messages.message_type", &kind)?,
        external_id: row.get(7).ok(),
        created_at: parse_datetime(&created),
        sent_at: parse_datetime(&sent),
    })
}

/// Body of `record_response`, run inside the caller's transaction.
async fn apply_response_in_tx(
    conn: &Connection,
    player_id: i64,
    category: Category,
    raw_text: &str,
) -> Result<Option<Invitation>, DatabaseError> {
    let rows = conn
        .query(
            &format!(
                "SELECT {INVITATION_COLUMNS} FROM invitations WHERE player_id = ?1 ORDER BY id DESC LIMIT 1"
            ),
            params![player_id],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("record_response select: {e}")))?;
    let Some(mut invitation) = first_row(rows, "record_response select", row_to_invitation).await?
    else {
        return Ok(None);
    };

    let now = Utc::now();
    let status = ResponseStatus::from(category);
    conn.execute(
        "UPDATE invitations SET response_status = ?1, response_date = ?2 WHERE id = ?3",
        params![status.as_str(), now.to_rfc3339(), invitation.id],
    )
    .await
    .map_err(|e| DatabaseError::from_write("record_response update", e))?;

    conn.execute(
        "INSERT INTO response_logs (player_id, event_id, response_text, response_type, received_at, processed) VALUES (?1, ?2, ?3, ?4, ?5, 1)",
        params![
            player_id,
            invitation.event_id,
            raw_text,
            category.as_str(),
            now.to_rfc3339(),
        ],
    )
    .await
    .map_err(|e| DatabaseError::from_write("record_response log", e))?;

    invitation.response_status = status;
    invitation.response_date = Some(now);
    Ok(Some(invitation))
}

// ── Trait implementation ────────────────────────────────────────────

#[async_trait]
impl Database for LibSqlBackend {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    // ── Players ─────────────────────────────────────────────────────

    async fn create_player(&self, player: &NewPlayer) -> Result<Player, DatabaseError> {
        let rows = self
            .conn()
            .query(
                &format!(
                    "INSERT INTO players (first_name, last_name, phone_number, email, skill_level, city, country, preferred_language, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                     RETURNING {PLAYER_COLUMNS}"
                ),
                params![
                    player.first_name.as_str(),
                    player.last_name.as_str(),
                    player.phone_number.as_str(),
                    opt_text(player.email.as_deref()),
                    opt_text(player.skill_level.as_deref()),
                    opt_text(player.city.as_deref()),
                    opt_text(player.country.as_deref()),
                    player.preferred_language.code(),
                    Utc::now().to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::from_write("create_player", e))?;

        let created = first_row(rows, "create_player", row_to_player)
            .await?
            .ok_or_else(|| DatabaseError::Query("create_player: no row returned".into()))?;
        debug!(player_id = created.id, "Player created");
        Ok(created)
    }

    async fn get_player(&self, id: i64) -> Result<Option<Player>, DatabaseError> {
        let rows = self
            .conn()
            .query(
                &format!("SELECT {PLAYER_COLUMNS} FROM players WHERE id = ?1"),
                params![id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_player: {e}")))?;
        first_row(rows, "get_player", row_to_player).await
    }

    async fn get_player_by_phone(
        &self,
        phone_number: &str,
    ) -> Result<Option<Player>, DatabaseError> {
        let rows = self
            .conn()
            .query(
                &format!("SELECT {PLAYER_COLUMNS} FROM players WHERE phone_number = ?1"),
                params![phone_number],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_player_by_phone: {e}")))?;
        first_row(rows, "get_player_by_phone", row_to_player).await
    }

    async fn list_players(&self) -> Result<Vec<Player>, DatabaseError> {
        let rows = self
            .conn()
            .query(
                &format!("SELECT {PLAYER_COLUMNS} FROM players ORDER BY last_name, first_name, id"),
                (),
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_players: {e}")))?;
        collect_rows(rows, "list_players", row_to_player).await
    }

    async fn recent_players(&self, limit: usize) -> Result<Vec<Player>, DatabaseError> {
        let rows = self
            .conn()
            .query(
                &format!("SELECT {PLAYER_COLUMNS} FROM players ORDER BY id DESC LIMIT ?1"),
                params![limit as i64],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("recent_players: {e}")))?;
        collect_rows(rows, "recent_players", row_to_player).await
    }

    async fn update_player(
        &self,
        id: i64,
        player: &NewPlayer,
    ) -> Result<Option<Player>, DatabaseError> {
        let rows = self
            .conn()
            .query(
                &format!(
                    "UPDATE players SET first_name = ?1, last_name = ?2, phone_number = ?3, email = ?4,
                     skill_level = ?5, city = ?6, country = ?7, preferred_language = ?8
                     WHERE id = ?9
                     RETURNING {PLAYER_COLUMNS}"
                ),
                params![
                    player.first_name.as_str(),
                    player.last_name.as_str(),
                    player.phone_number.as_str(),
                    opt_text(player.email.as_deref()),
                    opt_text(player.skill_level.as_deref()),
                    opt_text(player.city.as_deref()),
                    opt_text(player.country.as_deref()),
                    player.preferred_language.code(),
                    id,
                ],
            )
            .await
            .map_err(|e| DatabaseError::from_write("update_player", e))?;
        first_row(rows, "update_player", row_to_player).await
    }

    async fn delete_player(&self, id: i64) -> Result<bool, DatabaseError> {
        let count = self
            .conn()
            .execute("DELETE FROM players WHERE id = ?1", params![id])
            .await
            .map_err(|e| DatabaseError::from_write("delete_player", e))?;
        debug!(player_id = id, deleted = count > 0, "Player delete");
        Ok(count > 0)
    }

    // ── Events ──────────────────────────────────────────────────────

    async fn create_event(&self, event: &NewEvent) -> Result<Event, DatabaseError> {
        let rows = self
            .conn()
            .query(
                &format!(
                    "INSERT INTO events (name, start_date, end_date, location, description, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     RETURNING {EVENT_COLUMNS}"
                ),
                params![
                    event.name.as_str(),
                    format_date(event.start_date),
                    event.end_date.map(format_date),
                    event.location.as_str(),
                    opt_text(event.description.as_deref()),
                    Utc::now().to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::from_write("create_event", e))?;

        let created = first_row(rows, "create_event", row_to_event)
            .await?
            .ok_or_else(|| DatabaseError::Query("create_event: no row returned".into()))?;
        debug!(event_id = created.id, "Event created");
        Ok(created)
    }

    async fn get_event(&self, id: i64) -> Result<Option<Event>, DatabaseError> {
        let rows = self
            .conn()
            .query(
                &format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1"),
                params![id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_event: {e}")))?;
        first_row(rows, "get_event", row_to_event).await
    }

    async fn list_events(&self) -> Result<Vec<Event>, DatabaseError> {
        let rows = self
            .conn()
            .query(
                &format!("SELECT {EVENT_COLUMNS} FROM events ORDER BY start_date DESC, id DESC"),
                (),
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_events: {e}")))?;
        collect_rows(rows, "list_events", row_to_event).await
    }

    async fn upcoming_events(
        &self,
        from: NaiveDate,
        limit: usize,
    ) -> Result<Vec<Event>, DatabaseError> {
        let rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {EVENT_COLUMNS} FROM events WHERE start_date >= ?1 ORDER BY start_date ASC, id ASC LIMIT ?2"
                ),
                params![format_date(from), limit as i64],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("upcoming_events: {e}")))?;
        collect_rows(rows, "upcoming_events", row_to_event).await
    }

    async fn update_event(
        &self,
        id: i64,
        event: &NewEvent,
    ) -> Result<Option<Event>, DatabaseError> {
        let rows = self
            .conn()
            .query(
                &format!(
                    "UPDATE events SET name = ?1, start_date = ?2, end_date = ?3, location = ?4, description = ?5
                     WHERE id = ?6
                     RETURNING {EVENT_COLUMNS}"
                ),
                params![
                    event.name.as_str(),
                    format_date(event.start_date),
                    event.end_date.map(format_date),
                    event.location.as_str(),
                    opt_text(event.description.as_deref()),
                    id,
                ],
            )
            .await
            .map_err(|e| DatabaseError::from_write("update_event", e))?;
        first_row(rows, "update_event", row_to_event).await
    }

    async fn delete_event(&self, id: i64) -> Result<bool, DatabaseError> {
        let count = self
            .conn()
            .execute("DELETE FROM events WHERE id = ?1", params![id])
            .await
            .map_err(|e| DatabaseError::from_write("delete_event", e))?;
        debug!(event_id = id, deleted = count > 0, "Event delete");
        Ok(count > 0)
    }

    // ── Invitations ─────────────────────────────────────────────────

    async fn invite_player(
        &self,
        event_id: i64,
        player_id: i64,
    ) -> Result<Option<Invitation>, DatabaseError> {
        let rows = self
            .conn()
            .query(
                &format!(
                    "INSERT INTO invitations (event_id, player_id, response_status, created_at)
                     VALUES (?1, ?2, 'pending', ?3)
                     ON CONFLICT (event_id, player_id) DO NOTHING
                     RETURNING {INVITATION_COLUMNS}"
                ),
                params![event_id, player_id, Utc::now().to_rfc3339()],
            )
            .await
            .map_err(|e| DatabaseError::from_write("invite_player", e))?;
        let invitation = first_row(rows, "invite_player", row_to_invitation).await?;
        debug!(event_id, player_id, created = invitation.is_some(), "Invite player");
        Ok(invitation)
    }

    async fn remove_invitation(
        &self,
        event_id: i64,
        player_id: i64,
    ) -> Result<bool, DatabaseError> {
        let count = self
            .conn()
            .execute(
                "DELETE FROM invitations WHERE event_id = ?1 AND player_id = ?2",
                params![event_id, player_id],
            )
            .await
            .map_err(|e| DatabaseError::from_write("remove_invitation", e))?;
        Ok(count > 0)
    }

    async fn get_invitation(&self, id: i64) -> Result<Option<Invitation>, DatabaseError> {
        let rows = self
            .conn()
            .query(
                &format!("SELECT {INVITATION_COLUMNS} FROM invitations WHERE id = ?1"),
                params![id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_invitation: {e}")))?;
        first_row(rows, "get_invitation", row_to_invitation).await
    }

    async fn latest_invitation_for_player(
        &self,
        player_id: i64,
    ) -> Result<Option<Invitation>, DatabaseError> {
        let rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {INVITATION_COLUMNS} FROM invitations WHERE player_id = ?1 ORDER BY id DESC LIMIT 1"
                ),
                params![player_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("latest_invitation_for_player: {e}")))?;
        first_row(rows, "latest_invitation_for_player", row_to_invitation).await
    }

    async fn list_invitations_for_player(
        &self,
        player_id: i64,
    ) -> Result<Vec<Invitation>, DatabaseError> {
        let rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {INVITATION_COLUMNS} FROM invitations WHERE player_id = ?1 ORDER BY id ASC"
                ),
                params![player_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_invitations_for_player: {e}")))?;
        collect_rows(rows, "list_invitations_for_player", row_to_invitation).await
    }

    async fn list_invitations_for_event(
        &self,
        event_id: i64,
    ) -> Result<Vec<Invitation>, DatabaseError> {
        let rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {INVITATION_COLUMNS} FROM invitations WHERE event_id = ?1 ORDER BY id ASC"
                ),
                params![event_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_invitations_for_event: {e}")))?;
        collect_rows(rows, "list_invitations_for_event", row_to_invitation).await
    }

    async fn update_invitation(
        &self,
        id: i64,
        status: ResponseStatus,
        notes: Option<&str>,
    ) -> Result<Option<Invitation>, DatabaseError> {
        // Back to pending means no response on record.
        let response_date = match status {
            ResponseStatus::Pending => libsql::Value::Null,
            _ => libsql::Value::Text(Utc::now().to_rfc3339()),
        };
        let rows = self
            .conn()
            .query(
                &format!(
                    "UPDATE invitations SET response_status = ?1, response_date = ?2,
                         notes = COALESCE(?3, notes)
                     WHERE id = ?4
                     RETURNING {INVITATION_COLUMNS}"
                ),
                params![status.as_str(), response_date, opt_text(notes), id],
            )
            .await
            .map_err(|e| DatabaseError::from_write("update_invitation", e))?;
        first_row(rows, "update_invitation", row_to_invitation).await
    }

    async fn invited_players(&self, event_id: i64) -> Result<Vec<Player>, DatabaseError> {
        let rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {JOINED_PLAYER_COLUMNS} FROM invitations i
                     JOIN players p ON p.id = i.player_id
                     WHERE i.event_id = ?1 ORDER BY i.id ASC"
                ),
                params![event_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("invited_players: {e}")))?;
        collect_rows(rows, "invited_players", row_to_player).await
    }

    async fn players_by_response(
        &self,
        event_id: i64,
        status: ResponseStatus,
    ) -> Result<Vec<Player>, DatabaseError> {
        let rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {JOINED_PLAYER_COLUMNS} FROM invitations i
                     JOIN players p ON p.id = i.player_id
                     WHERE i.event_id = ?1 AND i.response_status = ?2 ORDER BY i.id ASC"
                ),
                params![event_id, status.as_str()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("players_by_response: {e}")))?;
        collect_rows(rows, "players_by_response", row_to_player).await
    }

    async fn event_response_stats(&self, event_id: i64) -> Result<ResponseStats, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT response_status, COUNT(*) FROM invitations WHERE event_id = ?1 GROUP BY response_status",
                params![event_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("event_response_stats: {e}")))?;

        let mut stats = ResponseStats::default();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("event_response_stats row: {e}")))?
        {
            let status: String = text_col(&row, 0, "invitations.response_status")?;
            let count: i64 = int_col(&row, 1, "count")?;
            stats.add(
                parse_enum("invitations.response_status", &status)?,
                count as u64,
            );
        }
        Ok(stats)
    }

    // ── Inbound responses ───────────────────────────────────────────

    async fn record_response(
        &self,
        player_id: i64,
        category: Category,
        raw_text: &str,
    ) -> Result<Option<Invitation>, DatabaseError> {
        let conn = self.connect().await?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .await
            .map_err(|e| DatabaseError::Query(format!("record_response begin: {e}")))?;

        match apply_response_in_tx(&tx, player_id, category, raw_text).await {
            Ok(invitation) => {
                tx.commit()
                    .await
                    .map_err(|e| DatabaseError::Query(format!("record_response commit: {e}")))?;
                if let Some(ref inv) = invitation {
                    debug!(
                        player_id,
                        invitation_id = inv.id,
                        event_id = inv.event_id,
                        %category,
                        "Response recorded"
                    );
                }
                Ok(invitation)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(player_id, error = %rollback_err, "record_response rollback failed");
                }
                Err(e)
            }
        }
    }

    async fn list_response_logs(&self, limit: usize) -> Result<Vec<ResponseLog>, DatabaseError> {
        let rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {RESPONSE_LOG_COLUMNS} FROM response_logs ORDER BY id DESC LIMIT ?1"
                ),
                params![limit as i64],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_response_logs: {e}")))?;
        collect_rows(rows, "list_response_logs", row_to_response_log).await
    }

    // ── Outbound messages ───────────────────────────────────────────

    async fn record_outbound(
        &self,
        message: &NewOutboundMessage,
    ) -> Result<OutboundMessage, DatabaseError> {
        let now = Utc::now().to_rfc3339();
        let rows = self
            .conn()
            .query(
                &format!(
                    "INSERT INTO outbound_messages (player_id, event_id, content, direction, status, message_type, external_id, created_at, sent_at)
                     VALUES (?1, ?2, ?3, 'outbound', ?4, ?5, ?6, ?7, ?7)
                     RETURNING {OUTBOUND_COLUMNS}"
                ),
                params![
                    opt_int(message.player_id),
                    opt_int(message.event_id),
                    message.content.as_str(),
                    message.status.as_str(),
                    message.kind.as_str(),
                    opt_text(message.external_id.as_deref()),
                    now,
                ],
            )
            .await
            .map_err(|e| DatabaseError::from_write("record_outbound", e))?;
        first_row(rows, "record_outbound", row_to_outbound)
            .await?
            .ok_or_else(|| DatabaseError::Query("record_outbound: no row returned".into()))
    }

    async fn list_outbound_messages(
        &self,
        limit: usize,
    ) -> Result<Vec<OutboundMessage>, DatabaseError> {
        let rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {OUTBOUND_COLUMNS} FROM outbound_messages ORDER BY sent_at DESC, id DESC LIMIT ?1"
                ),
                params![limit as i64],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_outbound_messages: {e}")))?;
        collect_rows(rows, "list_outbound_messages", row_to_outbound).await
    }

    // ── Dashboard ───────────────────────────────────────────────────

    async fn dashboard_counts(&self) -> Result<DashboardCounts, DatabaseError> {
        let rows = self
            .conn()
            .query(
                "SELECT (SELECT COUNT(*) FROM players), (SELECT COUNT(*) FROM events), (SELECT COUNT(*) FROM outbound_messages)",
                (),
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("dashboard_counts: {e}")))?;

        let counts = first_row(rows, "dashboard_counts", |row| {
            Ok(DashboardCounts {
                players: int_col(row, 0, "players")? as u64,
                events: int_col(row, 1, "events")? as u64,
                messages: int_col(row, 2, "messages")? as u64,
            })
        })
        .await?;
        Ok(counts.unwrap_or_default())
    }
}
