mod budget;
mod cli;
mod db;
mod error;
mod fmt;
mod importer;
mod models;
mod parser;
mod settings;

use clap::Parser;

use cli::{CategoriesCommands, Cli, Commands, ReportCommands, TxCommands};
use error::Result;

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Import { file } => cli::import::run(&file),
        Commands::Categories { command } => match command {
            CategoriesCommands::Add { name, budget } => cli::categories::add(&name, budget),
            CategoriesCommands::List => cli::categories::list(),
            CategoriesCommands::SetBudget { id, budget } => cli::categories::set_budget(id, budget),
            CategoriesCommands::Rename { id, new_name } => cli::categories::rename(id, &new_name),
            CategoriesCommands::Delete { id } => cli::categories::delete(id),
        },
        Commands::Tx { command } => match command {
            TxCommands::List { month, limit } => cli::transactions::list(&month, limit),
            TxCommands::Assign {
                id,
                category,
                clear,
            } => cli::transactions::assign(id, category.as_deref(), clear),
            TxCommands::Exclude { id } => cli::transactions::exclude(id),
        },
        Commands::Report { command } => match command {
            ReportCommands::Budget { month } => cli::report::budget(&month),
            ReportCommands::Spending { category, month } => {
                cli::report::spending(&category, &month)
            }
        },
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
