pub mod categories;
pub mod import;
pub mod init;
pub mod report;
pub mod transactions;

use clap::{Parser, Subcommand};

pub(crate) fn parse_month_opt(month: &Option<String>) -> (Option<i32>, Option<u32>) {
    if let Some(m) = month {
        let parts: Vec<&str> = m.split('-').collect();
        if parts.len() == 2 {
            let year = parts[0].parse().ok();
            let month = parts[1].parse().ok();
            return (year, month);
        }
    }
    (None, None)
}

#[derive(Parser)]
#[command(name = "kakeibo", about = "Household ledger: PayPay CSV imports and category budgets.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set up kakeibo: choose a data directory and initialize the database.
    Init {
        /// Path for kakeibo data (default: ~/Documents/kakeibo)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Import a PayPay CSV export.
    Import {
        /// Path to the CSV file to import
        file: String,
    },
    /// Manage spending categories and their monthly budgets.
    Categories {
        #[command(subcommand)]
        command: CategoriesCommands,
    },
    /// Inspect and edit imported transactions.
    Tx {
        #[command(subcommand)]
        command: TxCommands,
    },
    /// Generate budget reports.
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },
}

#[derive(Subcommand)]
pub enum CategoriesCommands {
    /// Add a new category.
    Add {
        /// Category name, e.g. '食費'
        name: String,
        /// Monthly budget in yen
        #[arg(long)]
        budget: Option<i64>,
    },
    /// List all categories with their budgets.
    List,
    /// Set or clear a category's monthly budget.
    SetBudget {
        /// Category ID (shown in `kakeibo categories list`)
        id: i64,
        /// Monthly budget in yen; omit to clear the budget
        #[arg(long)]
        budget: Option<i64>,
    },
    /// Rename a category.
    Rename {
        /// Category ID
        id: i64,
        /// New name
        new_name: String,
    },
    /// Delete a category. Its transactions become uncategorized.
    Delete {
        /// Category ID
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum TxCommands {
    /// List transactions, newest first.
    List {
        /// Month filter: YYYY-MM
        #[arg(long)]
        month: Option<String>,
        /// Maximum rows to show
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Assign a transaction to a category (or clear the assignment).
    Assign {
        /// Transaction ID (shown in `kakeibo tx list`)
        id: i64,
        /// Category name to assign
        #[arg(long, conflicts_with = "clear")]
        category: Option<String>,
        /// Remove the current category assignment
        #[arg(long)]
        clear: bool,
    },
    /// Toggle whether a transaction is excluded from spending totals.
    Exclude {
        /// Transaction ID
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum ReportCommands {
    /// Monthly budget summary with per-category progress.
    Budget {
        /// Month: YYYY-MM (default: current month)
        #[arg(long)]
        month: Option<String>,
    },
    /// Spending for one category in a month.
    Spending {
        /// Category name
        category: String,
        /// Month: YYYY-MM (default: current month)
        #[arg(long)]
        month: Option<String>,
    },
}
