use chrono::DateTime;
use comfy_table::{Cell, Table};
use rusqlite::Connection;

use crate::budget::month_window;
use crate::cli::parse_month_opt;
use crate::db::get_connection;
use crate::error::{KakeiboError, Result};
use crate::fmt::yen;
use crate::parser;
use crate::settings::db_path;

#[derive(Debug)]
pub struct TransactionRow {
    pub id: i64,
    pub transaction_date: String,
    pub merchant: String,
    pub transaction_type: String,
    pub withdrawal_amount: Option<i64>,
    pub deposit_amount: Option<i64>,
    pub category: Option<String>,
    pub is_excluded: bool,
}

/// Render a stored UTC timestamp back in JST for display.
fn display_date(utc: &str) -> String {
    match DateTime::parse_from_rfc3339(utc) {
        Ok(dt) => dt
            .with_timezone(&parser::jst())
            .format("%Y-%m-%d %H:%M")
            .to_string(),
        Err(_) => utc.to_string(),
    }
}

pub fn list(month: &Option<String>, limit: Option<usize>) -> Result<()> {
    let conn = get_connection(&db_path())?;
    let (year, month_num) = parse_month_opt(month);
    let rows = list_transactions(&conn, year, month_num, limit)?;

    let mut table = Table::new();
    table.set_header(vec![
        "ID", "Date (JST)", "Merchant", "Type", "Out", "In", "Category", "Excluded",
    ]);
    for row in &rows {
        table.add_row(vec![
            Cell::new(row.id),
            Cell::new(display_date(&row.transaction_date)),
            Cell::new(&row.merchant),
            Cell::new(&row.transaction_type),
            Cell::new(row.withdrawal_amount.map(yen).unwrap_or_default()),
            Cell::new(row.deposit_amount.map(yen).unwrap_or_default()),
            Cell::new(row.category.clone().unwrap_or_default()),
            Cell::new(if row.is_excluded { "yes" } else { "" }),
        ]);
    }
    println!("Transactions ({})\n{table}", rows.len());
    Ok(())
}

pub fn assign(id: i64, category: Option<&str>, clear: bool) -> Result<()> {
    let conn = get_connection(&db_path())?;
    match (category, clear) {
        (Some(name), false) => {
            assign_category(&conn, id, Some(name))?;
            println!("Assigned transaction {id} to category: {name}");
        }
        (None, true) => {
            assign_category(&conn, id, None)?;
            println!("Cleared category for transaction {id}");
        }
        _ => {
            return Err(KakeiboError::Other(
                "Specify either --category NAME or --clear".into(),
            ));
        }
    }
    Ok(())
}

pub fn exclude(id: i64) -> Result<()> {
    let conn = get_connection(&db_path())?;
    let now_excluded = toggle_exclude(&conn, id)?;
    if now_excluded {
        println!("Transaction {id} is now excluded from spending totals");
    } else {
        println!("Transaction {id} is included in spending totals again");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Data-layer functions
// ---------------------------------------------------------------------------

pub fn list_transactions(
    conn: &Connection,
    year: Option<i32>,
    month: Option<u32>,
    limit: Option<usize>,
) -> Result<Vec<TransactionRow>> {
    let mut clause = String::from("1=1");
    let mut params: Vec<String> = Vec::new();
    if let (Some(y), Some(m)) = (year, month) {
        let (start, end) = month_window(y, m)?;
        params.push(start);
        params.push(end);
        clause = "t.transaction_date >= ?1 AND t.transaction_date < ?2".to_string();
    }

    let limit_clause = match limit {
        Some(n) => format!(" LIMIT {n}"),
        None => String::new(),
    };

    let sql = format!(
        "SELECT t.id, t.transaction_date, t.merchant, t.transaction_type, \
         t.withdrawal_amount, t.deposit_amount, c.name, t.is_excluded \
         FROM transactions t LEFT JOIN categories c ON t.category_id = c.id \
         WHERE {clause} ORDER BY t.transaction_date DESC, t.id DESC{limit_clause}"
    );
    let mut stmt = conn.prepare(&sql)?;
    let param_values: Vec<&dyn rusqlite::types::ToSql> = params
        .iter()
        .map(|p| p as &dyn rusqlite::types::ToSql)
        .collect();
    let rows = stmt
        .query_map(param_values.as_slice(), |row| {
            Ok(TransactionRow {
                id: row.get(0)?,
                transaction_date: row.get(1)?,
                merchant: row.get(2)?,
                transaction_type: row.get(3)?,
                withdrawal_amount: row.get(4)?,
                deposit_amount: row.get(5)?,
                category: row.get(6)?,
                is_excluded: row.get(7)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Assign or clear a transaction's category. The category is resolved by
/// name so the CLI can take human-readable input.
pub fn assign_category(conn: &Connection, id: i64, category_name: Option<&str>) -> Result<()> {
    let category_id = match category_name {
        Some(name) => Some(super::categories::find_category_by_name(conn, name)?.id),
        None => None,
    };
    let updated = conn.execute(
        "UPDATE transactions SET category_id = ?1 WHERE id = ?2",
        rusqlite::params![category_id, id],
    )?;
    if updated == 0 {
        return Err(KakeiboError::Other(format!(
            "Transaction not found: id {id}"
        )));
    }
    Ok(())
}

/// Flip the exclusion flag: read the current value, persist the negation.
/// Returns the new state. Excluded transactions stay in listings and keep
/// their category; only the spending aggregates skip them.
pub fn toggle_exclude(conn: &Connection, id: i64) -> Result<bool> {
    let current: bool = conn
        .query_row(
            "SELECT is_excluded FROM transactions WHERE id = ?1",
            [id],
            |row| row.get(0),
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                KakeiboError::Other(format!("Transaction not found: id {id}"))
            }
            other => KakeiboError::Db(other),
        })?;
    let new_state = !current;
    conn.execute(
        "UPDATE transactions SET is_excluded = ?1 WHERE id = ?2",
        rusqlite::params![new_state, id],
    )?;
    Ok(new_state)
}
