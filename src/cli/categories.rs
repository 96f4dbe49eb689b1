use comfy_table::{Cell, Table};
use rusqlite::Connection;

use crate::db::get_connection;
use crate::error::{KakeiboError, Result};
use crate::fmt::yen;
use crate::models::Category;
use crate::settings::db_path;

pub fn add(name: &str, budget: Option<i64>) -> Result<()> {
    let conn = get_connection(&db_path())?;
    add_category(&conn, name, budget)?;
    println!("Added category: {name}");
    Ok(())
}

pub fn list() -> Result<()> {
    let conn = get_connection(&db_path())?;
    let categories = list_categories(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Monthly Budget"]);
    for cat in categories {
        table.add_row(vec![
            Cell::new(cat.id),
            Cell::new(cat.name),
            Cell::new(cat.monthly_budget.map(yen).unwrap_or_default()),
        ]);
    }
    println!("Categories\n{table}");
    Ok(())
}

pub fn set_budget(id: i64, budget: Option<i64>) -> Result<()> {
    let conn = get_connection(&db_path())?;
    set_category_budget(&conn, id, budget)?;
    match budget {
        Some(b) => println!("Set budget for category {id}: {}", yen(b)),
        None => println!("Cleared budget for category {id}"),
    }
    Ok(())
}

pub fn rename(id: i64, new_name: &str) -> Result<()> {
    let conn = get_connection(&db_path())?;
    rename_category(&conn, id, new_name)?;
    println!("Renamed category {id} to: {new_name}");
    Ok(())
}

pub fn delete(id: i64) -> Result<()> {
    let conn = get_connection(&db_path())?;
    delete_category(&conn, id)?;
    println!("Deleted category {id} (its transactions are now uncategorized)");
    Ok(())
}

// ---------------------------------------------------------------------------
// Data-layer functions
// ---------------------------------------------------------------------------

pub fn list_categories(conn: &Connection) -> Result<Vec<Category>> {
    let mut stmt =
        conn.prepare("SELECT id, name, monthly_budget FROM categories ORDER BY name ASC")?;
    let categories = stmt
        .query_map([], |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
                monthly_budget: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(categories)
}

pub fn find_category_by_name(conn: &Connection, name: &str) -> Result<Category> {
    conn.query_row(
        "SELECT id, name, monthly_budget FROM categories WHERE name = ?1",
        [name],
        |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
                monthly_budget: row.get(2)?,
            })
        },
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => KakeiboError::UnknownCategory(name.to_string()),
        other => KakeiboError::Db(other),
    })
}

fn validate_budget(budget: Option<i64>) -> Result<()> {
    if let Some(b) = budget {
        if b < 0 {
            return Err(KakeiboError::Other(format!(
                "Budget must be non-negative, got {b}"
            )));
        }
    }
    Ok(())
}

pub fn add_category(conn: &Connection, name: &str, budget: Option<i64>) -> Result<i64> {
    if name.trim().is_empty() {
        return Err(KakeiboError::Other("Name is required".into()));
    }
    validate_budget(budget)?;
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM categories WHERE name = ?1)",
        [name],
        |row| row.get(0),
    )?;
    if exists {
        return Err(KakeiboError::Other(format!(
            "Category name already exists: {name}"
        )));
    }
    conn.execute(
        "INSERT INTO categories (name, monthly_budget) VALUES (?1, ?2)",
        rusqlite::params![name, budget],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn set_category_budget(conn: &Connection, id: i64, budget: Option<i64>) -> Result<()> {
    validate_budget(budget)?;
    let updated = conn.execute(
        "UPDATE categories SET monthly_budget = ?1 WHERE id = ?2",
        rusqlite::params![budget, id],
    )?;
    if updated == 0 {
        return Err(KakeiboError::Other(format!("Category not found: id {id}")));
    }
    Ok(())
}

pub fn rename_category(conn: &Connection, id: i64, new_name: &str) -> Result<()> {
    if new_name.trim().is_empty() {
        return Err(KakeiboError::Other("Name is required".into()));
    }
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM categories WHERE name = ?1 AND id != ?2)",
        rusqlite::params![new_name, id],
        |row| row.get(0),
    )?;
    if exists {
        return Err(KakeiboError::Other(format!(
            "Category name already exists: {new_name}"
        )));
    }
    let updated = conn.execute(
        "UPDATE categories SET name = ?1 WHERE id = ?2",
        rusqlite::params![new_name, id],
    )?;
    if updated == 0 {
        return Err(KakeiboError::Other(format!("Category not found: id {id}")));
    }
    Ok(())
}

/// Deleting a category never deletes its transactions; the schema's
/// ON DELETE SET NULL leaves them uncategorized.
pub fn delete_category(conn: &Connection, id: i64) -> Result<()> {
    let deleted = conn.execute("DELETE FROM categories WHERE id = ?1", [id])?;
    if deleted == 0 {
        return Err(KakeiboError::Other(format!("Category not found: id {id}")));
    }
    Ok(())
}
