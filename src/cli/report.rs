use chrono::{Datelike, Utc};
use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::budget::{category_budget_rows, category_spending, monthly_budget_summary};
use crate::cli::parse_month_opt;
use crate::db::get_connection;
use crate::error::Result;
use crate::fmt::yen;
use crate::parser;
use crate::settings::db_path;

/// Default to the current JST month when no `--month` is given.
fn resolve_month(month: &Option<String>) -> (i32, u32) {
    match parse_month_opt(month) {
        (Some(y), Some(m)) => (y, m),
        _ => {
            let now = Utc::now().with_timezone(&parser::jst());
            (now.year(), now.month())
        }
    }
}

pub fn budget(month: &Option<String>) -> Result<()> {
    let conn = get_connection(&db_path())?;
    let (year, month_num) = resolve_month(month);

    let summary = monthly_budget_summary(&conn, year, month_num)?;
    println!("Budget report for {year}-{month_num:02}\n");
    println!("  Total budget:   {}", yen(summary.total_budget));
    println!("  Total spending: {}", yen(summary.total_spending));
    let remaining = yen(summary.remaining_budget);
    if summary.remaining_budget < 0 {
        println!(
            "  Remaining:      {} ({:.1}% of budget)",
            remaining.red().bold(),
            summary.progress_percentage
        );
    } else {
        println!(
            "  Remaining:      {} ({:.1}% of budget)",
            remaining.green(),
            summary.progress_percentage
        );
    }

    let rows = category_budget_rows(&conn, year, month_num)?;
    let mut table = Table::new();
    table.set_header(vec!["Category", "Budget", "Spending", "Used"]);
    for row in rows {
        // Hide categories with neither a budget nor any activity this month
        if row.budget.is_none() && row.spending == 0 {
            continue;
        }
        table.add_row(vec![
            Cell::new(&row.name),
            Cell::new(row.budget.map(yen).unwrap_or_default()),
            Cell::new(yen(row.spending)),
            Cell::new(row.pct.map(|p| format!("{p}%")).unwrap_or_default()),
        ]);
    }
    println!("\n{table}");
    Ok(())
}

pub fn spending(category_name: &str, month: &Option<String>) -> Result<()> {
    let conn = get_connection(&db_path())?;
    let (year, month_num) = resolve_month(month);

    let category = super::categories::find_category_by_name(&conn, category_name)?;
    let total = category_spending(&conn, category.id, year, month_num)?;

    println!(
        "{category_name} spending for {year}-{month_num:02}: {}",
        yen(total)
    );
    if let Some(budget) = category.monthly_budget {
        let remaining = budget - total;
        if remaining < 0 {
            println!(
                "Budget {} exceeded by {}",
                yen(budget),
                yen(-remaining).red().bold()
            );
        } else {
            println!("Budget {}, {} remaining", yen(budget), yen(remaining).green());
        }
    }
    Ok(())
}
