use std::path::Path;

use crate::db::get_connection;
use crate::error::Result;
use crate::importer::import_csv;
use crate::settings::db_path;

pub fn run(file: &str) -> Result<()> {
    let path = Path::new(file);
    let csv_text = std::fs::read_to_string(path)?;
    let conn = get_connection(&db_path())?;

    let filename = path.file_name().and_then(|n| n.to_str()).unwrap_or(file);
    let report = import_csv(&conn, &csv_text, filename)?;

    println!("{} transactions imported", report.imported);
    Ok(())
}
