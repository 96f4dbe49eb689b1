use rusqlite::Connection;
use sha2::{Digest, Sha256};

use crate::error::{KakeiboError, Result};
use crate::models::NewTransaction;
use crate::parser;

/// Upper bound on rows per persistence call. Chunk boundaries carry no
/// semantic meaning; chunk order is input order so re-imports are
/// deterministic.
const CHUNK_SIZE: usize = 100;

pub struct ImportReport {
    pub imported: usize,
}

fn compute_checksum(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Insert-or-update one parsed row, keyed on the vendor's transaction
/// number. Only parsed columns are overwritten on conflict: category
/// assignment and the exclusion flag belong to the stored row and survive
/// re-import.
fn upsert_transaction(conn: &Connection, rec: &NewTransaction) -> Result<()> {
    conn.execute(
        "INSERT INTO transactions (
            transaction_number, transaction_date, withdrawal_amount, deposit_amount,
            foreign_withdrawal_amount, conversion_rate, currency, country,
            transaction_type, merchant, payment_method, payment_plan, user_name
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        ON CONFLICT(transaction_number) DO UPDATE SET
            transaction_date = excluded.transaction_date,
            withdrawal_amount = excluded.withdrawal_amount,
            deposit_amount = excluded.deposit_amount,
            foreign_withdrawal_amount = excluded.foreign_withdrawal_amount,
            conversion_rate = excluded.conversion_rate,
            currency = excluded.currency,
            country = excluded.country,
            transaction_type = excluded.transaction_type,
            merchant = excluded.merchant,
            payment_method = excluded.payment_method,
            payment_plan = excluded.payment_plan,
            user_name = excluded.user_name",
        rusqlite::params![
            rec.transaction_number,
            rec.transaction_date,
            rec.withdrawal_amount,
            rec.deposit_amount,
            rec.foreign_withdrawal_amount,
            rec.conversion_rate,
            rec.currency,
            rec.country,
            rec.transaction_type,
            rec.merchant,
            rec.payment_method,
            rec.payment_plan,
            rec.user_name,
        ],
    )?;
    Ok(())
}

/// Persist parsed rows in input order, one SQLite transaction per chunk.
/// Chunk N+1 does not start until chunk N committed. A failing chunk stops
/// the import; earlier chunks stay committed, so a partial import is an
/// observable outcome of a mid-batch failure.
pub fn import_records(conn: &Connection, records: &[NewTransaction]) -> Result<usize> {
    let mut written = 0usize;
    for chunk in records.chunks(CHUNK_SIZE) {
        let step: Result<()> = (|| {
            let tx = conn.unchecked_transaction()?;
            for rec in chunk {
                upsert_transaction(&tx, rec)?;
            }
            tx.commit()?;
            Ok(())
        })();
        step.map_err(|e| KakeiboError::Other(format!("Failed to insert transactions: {e}")))?;
        written += chunk.len();
    }
    Ok(written)
}

fn record_import(conn: &Connection, filename: &str, records: &[NewTransaction], checksum: &str) -> Result<()> {
    let dates: Vec<&str> = records.iter().map(|r| r.transaction_date.as_str()).collect();
    let min_date = dates.iter().min().copied();
    let max_date = dates.iter().max().copied();
    conn.execute(
        "INSERT INTO imports (filename, record_count, date_range_start, date_range_end, checksum) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![filename, records.len() as i64, min_date, max_date, checksum],
    )?;
    Ok(())
}

/// Whole-file entry point: the entire file must parse before anything is
/// written. A structural CSV error therefore aborts with no writes. Each
/// successful run leaves an audit row in `imports`; duplicate checksums do
/// not block a re-import because the upsert already makes it idempotent.
pub fn import_csv(conn: &Connection, csv_text: &str, filename: &str) -> Result<ImportReport> {
    let records = parser::parse_csv(csv_text)?;
    let imported = import_records(conn, &records)?;
    record_import(conn, filename, &records, &compute_checksum(csv_text))?;
    Ok(ImportReport { imported })
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

    fn sample_record(number: &str, withdrawal: Option<i64>) -> NewTransaction {
        NewTransaction {
            transaction_number: number.to_string(),
            transaction_date: "2025-10-19T04:06:26Z".to_string(),
            withdrawal_amount: withdrawal,
            deposit_amount: None,
            foreign_withdrawal_amount: None,
            conversion_rate: None,
            currency: None,
            country: None,
            transaction_type: "支払い".to_string(),
            merchant: "Coffee Shop".to_string(),
            payment_method: None,
            payment_plan: None,
            user_name: None,
        }
    }

    fn count_transactions(conn: &Connection) -> i64 {
        conn.query_row("SELECT count(*) FROM transactions", [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn test_import_records_inserts_rows() {
        let (_dir, conn) = test_db();
        let records = vec![sample_record("T001", Some(1200)), sample_record("T002", Some(500))];
        let written = import_records(&conn, &records).unwrap();
        assert_eq!(written, 2);
        assert_eq!(count_transactions(&conn), 2);
    }

    #[test]
    fn test_reimport_is_idempotent() {
        let (_dir, conn) = test_db();
        let records = vec![sample_record("T001", Some(1200)), sample_record("T002", Some(500))];
        import_records(&conn, &records).unwrap();
        let written = import_records(&conn, &records).unwrap();
        assert_eq!(written, 2, "re-import reports the same row count");
        assert_eq!(count_transactions(&conn), 2, "no duplicates on re-import");
    }

    #[test]
    fn test_reimport_updates_changed_row_in_place() {
        let (_dir, conn) = test_db();
        import_records(&conn, &[sample_record("T001", Some(1200))]).unwrap();
        import_records(&conn, &[sample_record("T001", Some(9999))]).unwrap();
        assert_eq!(count_transactions(&conn), 1);
        let amount: i64 = conn
            .query_row(
                "SELECT withdrawal_amount FROM transactions WHERE transaction_number = 'T001'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(amount, 9999);
    }

    #[test]
    fn test_reimport_preserves_category_and_exclusion() {
        let (_dir, conn) = test_db();
        import_records(&conn, &[sample_record("T001", Some(1200))]).unwrap();
        conn.execute("INSERT INTO categories (name) VALUES ('Food')", [])
            .unwrap();
        let cat_id = conn.last_insert_rowid();
        conn.execute(
            "UPDATE transactions SET category_id = ?1, is_excluded = 1 WHERE transaction_number = 'T001'",
            [cat_id],
        )
        .unwrap();

        import_records(&conn, &[sample_record("T001", Some(2400))]).unwrap();

        let (category_id, is_excluded, amount): (Option<i64>, bool, i64) = conn
            .query_row(
                "SELECT category_id, is_excluded, withdrawal_amount FROM transactions \
                 WHERE transaction_number = 'T001'",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .unwrap();
        assert_eq!(category_id, Some(cat_id));
        assert!(is_excluded);
        assert_eq!(amount, 2400);
    }

    #[test]
    fn test_import_spans_multiple_chunks() {
        let (_dir, conn) = test_db();
        let records: Vec<NewTransaction> = (0..250)
            .map(|i| sample_record(&format!("T{i:04}"), Some(100)))
            .collect();
        let written = import_records(&conn, &records).unwrap();
        assert_eq!(written, 250);
        assert_eq!(count_transactions(&conn), 250);
    }

    #[test]
    fn test_import_csv_records_audit_row() {
        let (_dir, conn) = test_db();
        let text = "取引日,出金金額（円）,入金金額（円）,海外出金金額,通貨,変換レート（円）,利用国,取引内容,取引先,取引方法,支払い区分,利用者,取引番号\n\
                    2025/10/19 13:06:26,\"1,200\",-,-,-,-,-,支払い,Coffee Shop,-,-,-,T001\n\
                    2025/10/20 09:00:00,800,-,-,-,-,-,支払い,Bakery,-,-,-,T002\n";
        let report = import_csv(&conn, text, "statement.csv").unwrap();
        assert_eq!(report.imported, 2);

        let (filename, record_count, start, end, checksum): (String, i64, String, String, String) =
            conn.query_row(
                "SELECT filename, record_count, date_range_start, date_range_end, checksum \
                 FROM imports",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?)),
            )
            .unwrap();
        assert_eq!(filename, "statement.csv");
        assert_eq!(record_count, 2);
        assert_eq!(start, "2025-10-19T04:06:26Z");
        assert_eq!(end, "2025-10-20T00:00:00Z");
        assert_eq!(checksum.len(), 64);
    }

    #[test]
    fn test_import_csv_structural_error_writes_nothing() {
        let (_dir, conn) = test_db();
        let text = "取引日,出金金額（円）,入金金額（円）,海外出金金額,通貨,変換レート（円）,利用国,取引内容,取引先,取引方法,支払い区分,利用者,取引番号\n\
                    2025/10/19 13:06:26,\"1,200,-,-,-,-,-,支払い,Broken Quote,-,-,-,T001\n";
        assert!(import_csv(&conn, text, "bad.csv").is_err());
        assert_eq!(count_transactions(&conn), 0);
        let imports: i64 = conn
            .query_row("SELECT count(*) FROM imports", [], |r| r.get(0))
            .unwrap();
        assert_eq!(imports, 0);
    }
}
