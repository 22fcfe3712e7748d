use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use rand::Rng;
use shared::{
    draw,
    models::{CommitReport, RaffleDraw, RaffleEntrant},
    table::{cell, column_position, locate_row, ColumnMissing},
    validation::{validate_entrant, ValidationError},
};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use crate::store::{RowStore, StoreError};

#[derive(Debug, Clone)]
pub struct RaffleSchema {
    pub table: String,
    pub name_column: String,
    pub email_column: String,
    pub status_column: String,
    /// Status cell value marking a confirmed winner.
    pub won_value: String,
}

impl Default for RaffleSchema {
    fn default() -> Self {
        Self {
            table: "raffle".into(),
            name_column: "name".into(),
            email_column: "email".into(),
            status_column: "won".into(),
            won_value: "TRUE".into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RaffleError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error(transparent)]
    Schema(#[from] ColumnMissing),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Commit stopped after marking {committed:?}: {source}")]
    PartialCommit { committed: Vec<String>, source: StoreError },
}

impl From<draw::DrawError> for RaffleError {
    fn from(e: draw::DrawError) -> Self {
        RaffleError::Invalid(e.into())
    }
}

struct Columns {
    name: usize,
    email: usize,
    status: usize,
}

/// Raffle entrants keyed by email, with a one-way `won` status.
pub struct RaffleEngine {
    store: Arc<dyn RowStore>,
    schema: RaffleSchema,
    write_lock: Mutex<()>,
}

impl RaffleEngine {
    pub fn new(store: Arc<dyn RowStore>, schema: RaffleSchema) -> Self {
        Self { store, schema, write_lock: Mutex::new(()) }
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>, RaffleError> {
        self.write_lock.lock().map_err(|_| RaffleError::Store(StoreError::LockFailed))
    }

    fn columns(&self, header: &[String]) -> Result<Columns, ColumnMissing> {
        Ok(Columns {
            name: column_position(header, &self.schema.name_column)?,
            email: column_position(header, &self.schema.email_column)?,
            status: column_position(header, &self.schema.status_column)?,
        })
    }

    #[instrument(skip(self, email))]
    pub fn register(&self, name: &str, email: &str) -> Result<RaffleEntrant, RaffleError> {
        let (name, email) = validate_entrant(name, email)?;
        let _guard = self.lock()?;

        let header = self.store.header(&self.schema.table)?;
        let columns = self.columns(&header)?;
        let existing = self.store.column_values(&self.schema.table, columns.email)?;
        if locate_row(&existing, &email).is_some() {
            return Err(ValidationError::DuplicateEmail(email).into());
        }

        let mut row = vec![String::new(); header.len()];
        row[columns.name - 1] = name.clone();
        row[columns.email - 1] = email.clone();
        self.store.append_row(&self.schema.table, &row)?;

        info!("🎟️ Registered raffle entrant {}", name);
        Ok(RaffleEntrant { name, email, won: false })
    }

    /// All entrants in store order. Rows with a blank email are ignored.
    pub fn entrants(&self) -> Result<Vec<RaffleEntrant>, RaffleError> {
        let table = self.store.read_all(&self.schema.table)?;
        let columns = self.columns(table.header())?;

        Ok(table
            .rows()
            .filter(|row| !cell(row, columns.email).trim().is_empty())
            .map(|row| RaffleEntrant {
                name: cell(row, columns.name).trim().to_string(),
                email: cell(row, columns.email).trim().to_string(),
                won: cell(row, columns.status).trim() == self.schema.won_value,
            })
            .collect())
    }

    pub fn eligible_pool(&self) -> Result<Vec<RaffleEntrant>, RaffleError> {
        Ok(self.entrants()?.into_iter().filter(|e| !e.won).collect())
    }

    /// Draws `count` winners from the current eligible pool. Nothing is written.
    pub fn draw<R: Rng + ?Sized>(&self, count: i64, rng: &mut R) -> Result<RaffleDraw, RaffleError> {
        let pool = self.eligible_pool()?;
        let winners = draw::draw(&pool, count, rng)?;
        let result = RaffleDraw {
            id: Uuid::new_v4(),
            drawn_at: OffsetDateTime::now_utc(),
            winners,
        };
        info!("🎲 Draw {} picked {} of {} eligible entrants", result.id, result.winners.len(), pool.len());
        Ok(result)
    }

    /// Marks each winner, located by email in a fresh read, with the won value.
    ///
    /// A missing status column aborts before any write. Winners whose email is no longer in
    /// the table are skipped and reported; the rest are still committed. A store failure after
    /// some winners were marked returns `PartialCommit` listing those winners.
    #[instrument(skip(self, winners), fields(winners = winners.len()))]
    pub fn commit(&self, winners: &[String]) -> Result<CommitReport, RaffleError> {
        let _guard = self.lock()?;

        let header = self.store.header(&self.schema.table)?;
        let status_column = column_position(&header, &self.schema.status_column)?;
        let email_column = column_position(&header, &self.schema.email_column)?;
        let emails = self.store.column_values(&self.schema.table, email_column)?;

        let mut report = CommitReport::default();
        let mut seen = HashSet::new();
        for email in winners.iter().map(|w| w.trim()) {
            if !seen.insert(email) {
                continue;
            }
            match locate_row(&emails, email) {
                Some(row) => {
                    if let Err(source) = self.store.write_cell(&self.schema.table, row, status_column, &self.schema.won_value) {
                        warn!("Commit stopped after {} winners: {}", report.committed.len(), source);
                        return Err(if report.committed.is_empty() {
                            RaffleError::Store(source)
                        } else {
                            RaffleError::PartialCommit { committed: report.committed, source }
                        });
                    }
                    report.committed.push(email.to_string());
                }
                None => {
                    warn!("Winner {} no longer registered, skipping", email);
                    report.skipped.push(email.to_string());
                }
            }
        }

        info!("🏆 Committed {} winners ({} skipped)", report.committed.len(), report.skipped.len());
        Ok(report)
    }
}
