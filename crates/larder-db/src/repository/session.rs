//! # Cash Session Repository
//!
//! Closing a bar session compares the cash counted in the till with the
//! revenue implied by stock movements.
//!
//! ## Close Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Session Close                                        │
//! │                                                                         │
//! │  CloseSessionInput::validate()        (no I/O)                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  per line: DrinkFacts                                                   │
//! │     ├── drink + current price          (NotFound)                      │
//! │     ├── previous closing count         → default opening               │
//! │     └── deliveries in the period       → default delivered             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  resolve_line() + reconcile()         (pure)                           │
//! │       │                                                                 │
//! │       ▼  BEGIN                                                          │
//! │  cashier find-or-create, session row, lines                            │
//! │       ▼  COMMIT                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use larder_core::reconcile::{reconcile, resolve_line, CloseSessionInput, DrinkFacts};
use larder_core::report::ReportPeriod;
use larder_core::{CashSession, Quantity, SessionLine};
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use super::bar::{find_or_create_cashier, DeliveryRepository, DrinkRepository};
use crate::error::{DbError, DbResult};

const SELECT_SESSION: &str = r#"
    SELECT cs.id, cs.cashier_id, c.name AS cashier_name, cs.period_start, cs.closing_date,
           cs.declared_actual, cs.expected, cs.variance, cs.created_at
    FROM cash_sessions cs
    JOIN cashiers c ON c.id = cs.cashier_id
"#;

const SELECT_LINES: &str = r#"
    SELECT sl.session_id, sl.drink_id, d.name AS drink_name, sl.opening, sl.delivered,
           sl.closing, sl.price_snapshot
    FROM session_lines sl
    JOIN drinks d ON d.id = sl.drink_id
"#;

#[derive(FromRow)]
struct LineRow {
    session_id: String,
    #[sqlx(flatten)]
    line: SessionLine,
}

/// Repository for bar cash sessions.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: SqlitePool,
}

impl SessionRepository {
    /// Creates a new SessionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SessionRepository { pool }
    }

    /// Closes a session: resolves defaults, reconciles, persists.
    ///
    /// Omitted opening counts default to the drink's closing count in the
    /// latest session that closed before `period_start` (0 if none). Omitted
    /// delivered counts default to the deliveries dated inside the period.
    ///
    /// ## Errors
    /// * `Validation` - bad range, negative amount or count, missing closing,
    ///   drink listed twice, no lines
    /// * `NotFound` - a line names an unknown drink
    pub async fn close(&self, input: &CloseSessionInput) -> DbResult<CashSession> {
        let cashier_name = input.validate()?;

        debug!(
            cashier = %cashier_name,
            start = %input.period_start,
            end = %input.period_end,
            lines = input.lines.len(),
            "Closing cash session"
        );

        let drinks = DrinkRepository::new(self.pool.clone());
        let deliveries = DeliveryRepository::new(self.pool.clone());

        let mut lines = Vec::with_capacity(input.lines.len());
        for line in &input.lines {
            let drink = drinks.get(&line.drink_id).await?;
            let facts = DrinkFacts {
                previous_closing: self.previous_closing(&drink.id, input.period_start).await?,
                delivered_in_period: deliveries
                    .total_for(&drink.id, input.period_start, input.period_end)
                    .await?,
                drink_id: drink.id,
                drink_name: drink.name,
                unit_price: drink.unit_price,
            };
            lines.push(resolve_line(line, &facts)?);
        }

        let outcome = reconcile(lines, input.declared_actual);

        let mut tx = self.pool.begin().await?;

        let cashier = find_or_create_cashier(&mut *tx, &cashier_name).await?;

        let session = CashSession {
            id: Uuid::new_v4().to_string(),
            cashier_id: cashier.id,
            cashier_name: cashier.name,
            period_start: input.period_start,
            closing_date: input.period_end,
            declared_actual: outcome.declared_actual,
            expected: outcome.expected,
            variance: outcome.variance,
            created_at: Utc::now(),
            lines: outcome.lines,
        };

        sqlx::query(
            r#"
            INSERT INTO cash_sessions (
                id, cashier_id, period_start, closing_date,
                declared_actual, expected, variance, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&session.id)
        .bind(&session.cashier_id)
        .bind(session.period_start)
        .bind(session.closing_date)
        .bind(session.declared_actual)
        .bind(session.expected)
        .bind(session.variance)
        .bind(session.created_at)
        .execute(&mut *tx)
        .await?;

        for (position, line) in session.lines.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO session_lines (
                    session_id, drink_id, position, opening, delivered, closing, price_snapshot
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(&session.id)
            .bind(&line.drink_id)
            .bind(position as i64)
            .bind(line.opening)
            .bind(line.delivered)
            .bind(line.closing)
            .bind(line.price_snapshot)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await.map_err(DbError::commit_failed)?;

        info!(
            id = %session.id,
            cashier = %session.cashier_name,
            expected = %session.expected,
            declared = %session.declared_actual,
            variance = %session.variance,
            "Cash session closed"
        );
        Ok(session)
    }

    /// The drink's closing count in the latest session closed before `before`.
    async fn previous_closing(&self, drink_id: &str, before: NaiveDate) -> DbResult<Option<Quantity>> {
        let closing = sqlx::query_scalar::<_, Quantity>(
            r#"
            SELECT sl.closing
            FROM session_lines sl
            JOIN cash_sessions cs ON cs.id = sl.session_id
            WHERE sl.drink_id = ?1 AND cs.closing_date < ?2
            ORDER BY cs.closing_date DESC, cs.created_at DESC
            LIMIT 1
            "#,
        )
        .bind(drink_id)
        .bind(before)
        .fetch_optional(&self.pool)
        .await?;

        Ok(closing)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<CashSession>> {
        let session = sqlx::query_as::<_, CashSession>(&format!("{SELECT_SESSION} WHERE cs.id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(mut session) = session else {
            return Ok(None);
        };

        let rows = sqlx::query_as::<_, LineRow>(&format!(
            "{SELECT_LINES} WHERE sl.session_id = ?1 ORDER BY sl.position"
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        session.lines = rows.into_iter().map(|row| row.line).collect();
        Ok(Some(session))
    }

    /// Gets a session with its lines, `NotFound` if it does not exist.
    pub async fn get(&self, id: &str) -> DbResult<CashSession> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("CashSession", id))
    }

    /// Sessions newest first, with their lines.
    ///
    /// With a period, only sessions whose closing date falls inside it.
    pub async fn list(&self, period: Option<&ReportPeriod>) -> DbResult<Vec<CashSession>> {
        let order = "ORDER BY cs.closing_date DESC, cs.created_at DESC";

        let mut sessions = match period {
            Some(period) => {
                sqlx::query_as::<_, CashSession>(&format!(
                    "{SELECT_SESSION} WHERE cs.closing_date >= ?1 AND cs.closing_date <= ?2 {order}"
                ))
                .bind(period.start)
                .bind(period.end)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, CashSession>(&format!("{SELECT_SESSION} {order}"))
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        let rows = sqlx::query_as::<_, LineRow>(&format!(
            "{SELECT_LINES} ORDER BY sl.session_id, sl.position"
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut by_session: HashMap<String, Vec<SessionLine>> = HashMap::new();
        for row in rows {
            by_session.entry(row.session_id).or_default().push(row.line);
        }

        for session in &mut sessions {
            session.lines = by_session.remove(&session.id).unwrap_or_default();
        }

        Ok(sessions)
    }

    /// Deletes a session and its lines.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting cash session");

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM session_lines WHERE session_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM cash_sessions WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("CashSession", id));
        }

        tx.commit().await.map_err(DbError::commit_failed)?;

        info!(id = %id, "Cash session deleted");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::repository::test_support::{drink, setup};
    use larder_core::reconcile::SessionLineInput;
    use larder_core::Money;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, d).unwrap()
    }

    fn units(n: i64) -> Option<Quantity> {
        Some(Quantity::from_units(n))
    }

    fn input(start: u32, end: u32, declared: i64, lines: Vec<SessionLineInput>) -> CloseSessionInput {
        CloseSessionInput {
            cashier_name: "Archange".to_string(),
            period_start: day(start),
            period_end: day(end),
            declared_actual: Money::from_minor(declared),
            lines,
        }
    }

    fn counts(
        drink_id: &str,
        opening: Option<Quantity>,
        delivered: Option<Quantity>,
        closing: Option<Quantity>,
    ) -> SessionLineInput {
        SessionLineInput {
            drink_id: drink_id.to_string(),
            opening,
            delivered,
            closing,
        }
    }

    #[tokio::test]
    async fn test_soda_session_is_500_short() {
        let db = setup().await;
        let soda = drink(&db, "Soda", 500).await;

        let session = db
            .sessions()
            .close(&input(1, 1, 12_000, vec![counts(&soda.id, units(10), units(20), units(5))]))
            .await
            .unwrap();

        assert_eq!(session.expected, Money::from_minor(12_500));
        assert_eq!(session.variance, Money::from_minor(-500));
        assert_eq!(session.lines[0].implied_sold(), Quantity::from_units(25));

        let stored = db.sessions().get(&session.id).await.unwrap();
        assert_eq!(stored, session);
    }

    #[tokio::test]
    async fn test_price_snapshot_survives_price_change() {
        let db = setup().await;
        let soda = drink(&db, "Soda", 500).await;
        let session = db
            .sessions()
            .close(&input(1, 1, 12_000, vec![counts(&soda.id, units(10), units(20), units(5))]))
            .await
            .unwrap();

        db.drinks()
            .update(&soda.id, "Soda", Money::from_minor(800))
            .await
            .unwrap();

        let stored = db.sessions().get(&session.id).await.unwrap();
        assert_eq!(stored.lines[0].price_snapshot, Money::from_minor(500));
        assert_eq!(stored.expected, Money::from_minor(12_500));
    }

    #[tokio::test]
    async fn test_defaults_come_from_history_and_deliveries() {
        let db = setup().await;
        let soda = drink(&db, "Soda", 500).await;

        db.sessions()
            .close(&input(1, 3, 0, vec![counts(&soda.id, units(10), units(0), units(7))]))
            .await
            .unwrap();
        db.deliveries()
            .record(&soda.id, Quantity::from_units(12), day(5), None)
            .await
            .unwrap();
        db.deliveries()
            .record(&soda.id, Quantity::from_units(6), day(9), None)
            .await
            .unwrap();

        let session = db
            .sessions()
            .close(&input(4, 7, 3_000, vec![counts(&soda.id, None, None, units(13))]))
            .await
            .unwrap();

        let line = &session.lines[0];
        assert_eq!(line.opening, Quantity::from_units(7));
        assert_eq!(line.delivered, Quantity::from_units(12));
        assert_eq!(session.expected, Money::from_minor(3_000));
        assert!(session.variance.is_zero());
    }

    #[tokio::test]
    async fn test_first_session_opens_at_zero() {
        let db = setup().await;
        let soda = drink(&db, "Soda", 500).await;

        let session = db
            .sessions()
            .close(&input(1, 1, 0, vec![counts(&soda.id, None, None, units(0))]))
            .await
            .unwrap();
        assert_eq!(session.lines[0].opening, Quantity::zero());
        assert_eq!(session.expected, Money::zero());
    }

    #[tokio::test]
    async fn test_rejected_close_writes_nothing() {
        let db = setup().await;
        let soda = drink(&db, "Soda", 500).await;

        let err = db
            .sessions()
            .close(&input(
                1,
                1,
                0,
                vec![counts(&soda.id, units(1), None, units(1)), counts("missing", None, None, units(1))],
            ))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = db
            .sessions()
            .close(&input(1, 1, 0, vec![counts(&soda.id, units(1), None, None)]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = db
            .sessions()
            .close(&input(5, 1, 0, vec![counts(&soda.id, units(1), None, units(1))]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        assert!(db.sessions().list(None).await.unwrap().is_empty());
        assert!(db.cashiers().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let db = setup().await;
        let soda = drink(&db, "Soda", 500).await;
        let beer = drink(&db, "Bière", 1_000).await;

        let first = db
            .sessions()
            .close(&input(1, 1, 500, vec![counts(&soda.id, units(2), None, units(1))]))
            .await
            .unwrap();
        let second = db
            .sessions()
            .close(&input(
                2,
                2,
                1_000,
                vec![counts(&beer.id, units(3), None, units(2)), counts(&soda.id, None, None, units(1))],
            ))
            .await
            .unwrap();

        let all = db.sessions().list(None).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, second.id);
        assert_eq!(all[0].lines.len(), 2);
        assert_eq!(all[0].lines[0].drink_name, "Bière");

        let day_one = ReportPeriod::day(day(1));
        let listed = db.sessions().list(Some(&day_one)).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, first.id);

        db.sessions().delete(&first.id).await.unwrap();
        assert!(db.sessions().get_by_id(&first.id).await.unwrap().is_none());
        assert_eq!(
            db.sessions().delete(&first.id).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );

        // the second session still references soda
        let err = db.drinks().delete(&soda.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
