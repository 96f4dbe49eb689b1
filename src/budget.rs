use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use rusqlite::Connection;

use crate::error::{KakeiboError, Result};
use crate::parser;

// ---------------------------------------------------------------------------
// Month window
// ---------------------------------------------------------------------------

fn month_start_utc(year: i32, month: u32) -> Result<String> {
    let date = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| KakeiboError::Other(format!("Invalid month: {year}-{month:02}")))?;
    let local = parser::jst()
        .from_local_datetime(&date.and_time(NaiveTime::MIN))
        .single()
        .ok_or_else(|| KakeiboError::Other(format!("Invalid month: {year}-{month:02}")))?;
    Ok(local
        .with_timezone(&Utc)
        .format("%Y-%m-%dT%H:%M:%SZ")
        .to_string())
}

/// Half-open UTC window `[start, end)` covering the given JST calendar
/// month. The calendar month is JST because that is the civil time the
/// vendor's timestamps were recorded in.
pub fn month_window(year: i32, month: u32) -> Result<(String, String)> {
    let start = month_start_utc(year, month)?;
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    Ok((start, month_start_utc(next_year, next_month)?))
}

// ---------------------------------------------------------------------------
// Spending
// ---------------------------------------------------------------------------

/// Spending for one category in one month: the sum of withdrawal amounts
/// (absent treated as 0) over non-excluded transactions in the month window.
/// Deposits never count. This is the single definition of "spending in a
/// month" shared by the per-category view and the whole-ledger summary.
pub fn category_spending(conn: &Connection, category_id: i64, year: i32, month: u32) -> Result<i64> {
    let (start, end) = month_window(year, month)?;
    let total: i64 = conn.query_row(
        "SELECT COALESCE(SUM(withdrawal_amount), 0) FROM transactions \
         WHERE category_id = ?1 AND is_excluded = 0 \
         AND transaction_date >= ?2 AND transaction_date < ?3",
        rusqlite::params![category_id, start, end],
        |row| row.get(0),
    )?;
    Ok(total)
}

// ---------------------------------------------------------------------------
// Monthly budget summary
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq)]
pub struct BudgetSummary {
    pub total_budget: i64,
    pub total_spending: i64,
    pub progress_percentage: f64,
    pub remaining_budget: i64,
}

/// Whole-ledger budget progress over exactly the budgeted categories (budget
/// set and positive). Unbudgeted categories contribute nothing even when
/// they have spending.
pub fn monthly_budget_summary(conn: &Connection, year: i32, month: u32) -> Result<BudgetSummary> {
    let mut stmt = conn.prepare(
        "SELECT id, monthly_budget FROM categories \
         WHERE monthly_budget IS NOT NULL AND monthly_budget > 0",
    )?;
    let budgeted: Vec<(i64, i64)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut total_budget = 0i64;
    let mut total_spending = 0i64;
    for (id, budget) in &budgeted {
        total_budget += budget;
        total_spending += category_spending(conn, *id, year, month)?;
    }

    let progress_percentage = if total_budget > 0 {
        total_spending as f64 / total_budget as f64 * 100.0
    } else {
        0.0
    };

    Ok(BudgetSummary {
        total_budget,
        total_spending,
        progress_percentage,
        remaining_budget: total_budget - total_spending,
    })
}

// ---------------------------------------------------------------------------
// Per-category budget rows (report listing)
// ---------------------------------------------------------------------------

pub struct CategoryBudgetRow {
    pub id: i64,
    pub name: String,
    pub budget: Option<i64>,
    pub spending: i64,
    pub pct: Option<i64>,
}

/// One row per category with that month's spending, for the budget report.
/// Categories without a budget still show spending; `pct` is only defined
/// for positive budgets.
pub fn category_budget_rows(conn: &Connection, year: i32, month: u32) -> Result<Vec<CategoryBudgetRow>> {
    let mut stmt =
        conn.prepare("SELECT id, name, monthly_budget FROM categories ORDER BY name ASC")?;
    let categories: Vec<(i64, String, Option<i64>)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut rows = Vec::new();
    for (id, name, budget) in categories {
        let spending = category_spending(conn, id, year, month)?;
        let pct = match budget {
            Some(b) if b > 0 => Some((spending as f64 / b as f64 * 100.0).round() as i64),
            _ => None,
        };
        rows.push(CategoryBudgetRow {
            id,
            name,
            budget,
            spending,
            pct,
        });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db};

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    fn add_category(conn: &Connection, name: &str, budget: Option<i64>) -> i64 {
        conn.execute(
            "INSERT INTO categories (name, monthly_budget) VALUES (?1, ?2)",
            rusqlite::params![name, budget],
        )
        .unwrap();
        conn.last_insert_rowid()
    }

    fn add_txn(
        conn: &Connection,
        number: &str,
        date_utc: &str,
        withdrawal: Option<i64>,
        category_id: Option<i64>,
        excluded: bool,
    ) {
        conn.execute(
            "INSERT INTO transactions (transaction_number, transaction_date, withdrawal_amount, \
             transaction_type, merchant, category_id, is_excluded) \
             VALUES (?1, ?2, ?3, '支払い', 'Shop', ?4, ?5)",
            rusqlite::params![number, date_utc, withdrawal, category_id, excluded],
        )
        .unwrap();
    }

    #[test]
    fn test_month_window_is_jst() {
        let (start, end) = month_window(2025, 10).unwrap();
        assert_eq!(start, "2025-09-30T15:00:00Z");
        assert_eq!(end, "2025-10-31T15:00:00Z");
    }

    #[test]
    fn test_month_window_december_rolls_over() {
        let (start, end) = month_window(2025, 12).unwrap();
        assert_eq!(start, "2025-11-30T15:00:00Z");
        assert_eq!(end, "2025-12-31T15:00:00Z");
    }

    #[test]
    fn test_month_window_rejects_invalid_month() {
        assert!(month_window(2025, 13).is_err());
        assert!(month_window(2025, 0).is_err());
    }

    #[test]
    fn test_category_spending_sums_withdrawals() {
        let (_dir, conn) = test_db();
        let food = add_category(&conn, "Food", Some(50000));
        add_txn(&conn, "T001", "2025-10-19T04:06:26Z", Some(1200), Some(food), false);
        add_txn(&conn, "T002", "2025-10-20T01:00:00Z", Some(800), Some(food), false);
        assert_eq!(category_spending(&conn, food, 2025, 10).unwrap(), 2000);
    }

    #[test]
    fn test_category_spending_ignores_excluded() {
        let (_dir, conn) = test_db();
        let food = add_category(&conn, "Food", Some(50000));
        add_txn(&conn, "T001", "2025-10-19T04:06:26Z", Some(99999), Some(food), true);
        assert_eq!(category_spending(&conn, food, 2025, 10).unwrap(), 0);
    }

    #[test]
    fn test_category_spending_ignores_other_months_and_categories() {
        let (_dir, conn) = test_db();
        let food = add_category(&conn, "Food", Some(50000));
        let hobby = add_category(&conn, "Hobby", None);
        add_txn(&conn, "T001", "2025-09-15T04:00:00Z", Some(500), Some(food), false);
        add_txn(&conn, "T002", "2025-10-19T04:06:26Z", Some(1200), Some(food), false);
        add_txn(&conn, "T003", "2025-10-19T05:00:00Z", Some(700), Some(hobby), false);
        add_txn(&conn, "T004", "2025-10-19T06:00:00Z", Some(300), None, false);
        assert_eq!(category_spending(&conn, food, 2025, 10).unwrap(), 1200);
    }

    #[test]
    fn test_early_morning_jst_counts_toward_jst_month() {
        let (_dir, conn) = test_db();
        let food = add_category(&conn, "Food", Some(50000));
        // 2025-10-01 00:30 JST, stored as the previous UTC day
        add_txn(&conn, "T001", "2025-09-30T15:30:00Z", Some(1000), Some(food), false);
        assert_eq!(category_spending(&conn, food, 2025, 10).unwrap(), 1000);
        assert_eq!(category_spending(&conn, food, 2025, 9).unwrap(), 0);
    }

    #[test]
    fn test_absent_withdrawal_counts_as_zero() {
        let (_dir, conn) = test_db();
        let food = add_category(&conn, "Food", Some(50000));
        add_txn(&conn, "T001", "2025-10-19T04:06:26Z", None, Some(food), false);
        add_txn(&conn, "T002", "2025-10-20T04:06:26Z", Some(100), Some(food), false);
        assert_eq!(category_spending(&conn, food, 2025, 10).unwrap(), 100);
    }

    #[test]
    fn test_summary_with_no_budgeted_categories_is_zero() {
        let (_dir, conn) = test_db();
        add_category(&conn, "Unbudgeted", None);
        let summary = monthly_budget_summary(&conn, 2025, 10).unwrap();
        assert_eq!(summary.total_budget, 0);
        assert_eq!(summary.total_spending, 0);
        assert_eq!(summary.progress_percentage, 0.0);
        assert_eq!(summary.remaining_budget, 0);
    }

    #[test]
    fn test_summary_overspend() {
        let (_dir, conn) = test_db();
        let food = add_category(&conn, "Food", Some(50000));
        add_txn(&conn, "T001", "2025-10-05T03:00:00Z", Some(60000), Some(food), false);
        let summary = monthly_budget_summary(&conn, 2025, 10).unwrap();
        assert_eq!(summary.total_budget, 50000);
        assert_eq!(summary.total_spending, 60000);
        assert_eq!(summary.progress_percentage, 120.0);
        assert_eq!(summary.remaining_budget, -10000);
    }

    #[test]
    fn test_summary_skips_unbudgeted_spending() {
        let (_dir, conn) = test_db();
        let food = add_category(&conn, "Food", Some(30000));
        let hobby = add_category(&conn, "Hobby", None);
        let zero = add_category(&conn, "Zero Budget", Some(0));
        add_txn(&conn, "T001", "2025-10-05T03:00:00Z", Some(10000), Some(food), false);
        add_txn(&conn, "T002", "2025-10-06T03:00:00Z", Some(5000), Some(hobby), false);
        add_txn(&conn, "T003", "2025-10-07T03:00:00Z", Some(2000), Some(zero), false);
        let summary = monthly_budget_summary(&conn, 2025, 10).unwrap();
        assert_eq!(summary.total_budget, 30000);
        assert_eq!(summary.total_spending, 10000);
        assert_eq!(summary.remaining_budget, 20000);
    }

    #[test]
    fn test_category_budget_rows() {
        let (_dir, conn) = test_db();
        let food = add_category(&conn, "Food", Some(50000));
        add_category(&conn, "Hobby", None);
        add_txn(&conn, "T001", "2025-10-05T03:00:00Z", Some(25000), Some(food), false);
        let rows = category_budget_rows(&conn, 2025, 10).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "Food");
        assert_eq!(rows[0].budget, Some(50000));
        assert_eq!(rows[0].spending, 25000);
        assert_eq!(rows[0].pct, Some(50));
        assert_eq!(rows[1].name, "Hobby");
        assert!(rows[1].budget.is_none());
        assert!(rows[1].pct.is_none());
    }
}
