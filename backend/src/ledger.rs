use std::sync::{Arc, Mutex, MutexGuard};
use shared::{
    models::{Leaderboard, Member},
    rank_members,
    table::{cell, column_position, locate_row, ColumnMissing, Table},
    validation::{apply_points_delta, validate_nickname, ValidationError},
};
use thiserror::Error;
use tracing::{info, instrument, warn};
use crate::store::{RowStore, StoreError};

#[derive(Debug, Clone)]
pub struct MemberSchema {
    pub table: String,
    pub nickname_column: String,
    pub points_column: String,
}

impl Default for MemberSchema {
    fn default() -> Self {
        Self {
            table: "members".into(),
            nickname_column: "nickname".into(),
            points_column: "points".into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("Member not found: {0}")]
    MemberNotFound(String),
    #[error("Malformed points value '{value}' for member {nickname}")]
    MalformedPoints { nickname: String, value: String },
    #[error(transparent)]
    Schema(#[from] ColumnMissing),
    #[error(transparent)]
    Store(#[from] StoreError),
}

struct Columns {
    nickname: usize,
    points: usize,
}

/// Nickname → points ledger persisted in the membership table.
///
/// Writes re-resolve their target row from a fresh read while holding the ledger's write
/// lock, so two requests in this process never interleave a lookup and a write. Edits made
/// directly in the backing sheet between that read and the write are not detected.
pub struct MemberLedger {
    store: Arc<dyn RowStore>,
    schema: MemberSchema,
    write_lock: Mutex<()>,
}

impl MemberLedger {
    pub fn new(store: Arc<dyn RowStore>, schema: MemberSchema) -> Self {
        Self { store, schema, write_lock: Mutex::new(()) }
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>, LedgerError> {
        self.write_lock.lock().map_err(|_| LedgerError::Store(StoreError::LockFailed))
    }

    fn columns(&self, header: &[String]) -> Result<Columns, ColumnMissing> {
        Ok(Columns {
            nickname: column_position(header, &self.schema.nickname_column)?,
            points: column_position(header, &self.schema.points_column)?,
        })
    }

    /// All members in store order. Rows with a blank nickname are ignored.
    pub fn list(&self) -> Result<Vec<Member>, LedgerError> {
        let table = self.store.read_all(&self.schema.table)?;
        let columns = self.columns(table.header())?;

        table
            .rows()
            .filter(|row| !cell(row, columns.nickname).trim().is_empty())
            .map(|row| {
                let nickname = cell(row, columns.nickname).trim().to_string();
                let points = parse_points(&nickname, cell(row, columns.points))?;
                Ok(Member { nickname, points })
            })
            .collect()
    }

    pub fn list_ranked(&self) -> Result<Leaderboard, LedgerError> {
        Ok(rank_members(self.list()?))
    }

    #[instrument(skip(self))]
    pub fn register(&self, nickname: &str) -> Result<Member, LedgerError> {
        let nickname = validate_nickname(nickname)?;
        let _guard = self.lock()?;

        let header = self.store.header(&self.schema.table)?;
        let columns = self.columns(&header)?;
        let existing = self.store.column_values(&self.schema.table, columns.nickname)?;
        if locate_row(&existing, &nickname).is_some() {
            return Err(ValidationError::DuplicateNickname(nickname).into());
        }

        let mut row = vec![String::new(); header.len()];
        row[columns.nickname - 1] = nickname.clone();
        row[columns.points - 1] = "0".into();
        self.store.append_row(&self.schema.table, &row)?;

        info!("➕ Registered member {}", nickname);
        Ok(Member { nickname, points: 0 })
    }

    /// Adds `delta` to a member's points. A result below zero is rejected without writing.
    #[instrument(skip(self))]
    pub fn apply_delta(&self, nickname: &str, delta: i64) -> Result<Member, LedgerError> {
        let nickname = nickname.trim();
        // Blank key cells are not members, so a blank nickname never resolves to a row.
        if nickname.is_empty() {
            return Err(LedgerError::MemberNotFound(nickname.to_string()));
        }
        let _guard = self.lock()?;

        let table = self.store.read_all(&self.schema.table)?;
        let columns = self.columns(table.header())?;
        let (position, row) = table
            .rows()
            .enumerate()
            .find(|(_, row)| cell(row, columns.nickname).trim() == nickname)
            .ok_or_else(|| LedgerError::MemberNotFound(nickname.to_string()))?;

        let current = parse_points(nickname, cell(row, columns.points))?;
        let points = apply_points_delta(current, delta).map_err(|e| {
            warn!("Rejected points change for {}: {}", nickname, e);
            e
        })?;

        self.store.write_cell(&self.schema.table, Table::sheet_row(position), columns.points, &points.to_string())?;
        info!("✏️ Points for {} changed {} → {}", nickname, current, points);

        Ok(Member { nickname: nickname.to_string(), points })
    }
}

fn parse_points(nickname: &str, raw: &str) -> Result<i64, LedgerError> {
    raw.trim().parse().map_err(|_| LedgerError::MalformedPoints {
        nickname: nickname.to_string(),
        value: raw.to_string(),
    })
}
