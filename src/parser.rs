use chrono::{FixedOffset, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;

use crate::error::{KakeiboError, Result};
use crate::models::NewTransaction;

/// PayPay exports carry no timezone; timestamps are the vendor's local civil
/// time, which for PayPay is JST (UTC+9). Stored dates are UTC.
const JST_OFFSET_SECS: i32 = 9 * 3600;

pub(crate) fn jst() -> FixedOffset {
    FixedOffset::east_opt(JST_OFFSET_SECS).expect("valid JST offset")
}

/// One raw row of a PayPay CSV export, keyed by the vendor's fixed Japanese
/// header labels. Every field arrives as a string; `"-"` is the vendor's
/// placeholder for "no value".
#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(rename = "取引日")]
    transaction_date: String,
    #[serde(rename = "出金金額（円）")]
    withdrawal_amount: String,
    #[serde(rename = "入金金額（円）")]
    deposit_amount: String,
    #[serde(rename = "海外出金金額")]
    foreign_withdrawal_amount: String,
    #[serde(rename = "通貨")]
    currency: String,
    #[serde(rename = "変換レート（円）")]
    conversion_rate: String,
    #[serde(rename = "利用国")]
    country: String,
    #[serde(rename = "取引内容")]
    transaction_type: String,
    #[serde(rename = "取引先")]
    merchant: String,
    #[serde(rename = "取引方法")]
    payment_method: String,
    #[serde(rename = "支払い区分")]
    payment_plan: String,
    #[serde(rename = "利用者")]
    user_name: String,
    #[serde(rename = "取引番号")]
    transaction_number: String,
}

/// Strip thousands separators and parse as integer yen. Placeholders and
/// malformed values degrade to None rather than failing the row.
pub fn parse_amount(raw: &str) -> Option<i64> {
    let s = raw.trim();
    if s.is_empty() || s == "-" {
        return None;
    }
    s.replace(',', "").parse().ok()
}

/// Same placeholder handling as `parse_amount`, but the fractional part is
/// kept (conversion rates, foreign amounts).
pub fn parse_rate(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() || s == "-" {
        return None;
    }
    s.replace(',', "").parse().ok()
}

/// The single seam for the vendor's "placeholder means null" convention,
/// applied uniformly to every optional string field.
pub fn normalize_optional(raw: &str) -> Option<String> {
    let s = raw.trim();
    if s.is_empty() || s == "-" {
        None
    } else {
        Some(s.to_string())
    }
}

/// Parse `YYYY/MM/DD HH:MM:SS` as JST and render the instant in UTC.
pub fn parse_datetime(raw: &str) -> Result<String> {
    let naive = NaiveDateTime::parse_from_str(raw.trim(), "%Y/%m/%d %H:%M:%S")
        .map_err(|e| KakeiboError::Other(format!("Unrecognized transaction date '{raw}': {e}")))?;
    let local = jst()
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| KakeiboError::Other(format!("Ambiguous transaction date '{raw}'")))?;
    Ok(local
        .with_timezone(&Utc)
        .format("%Y-%m-%dT%H:%M:%SZ")
        .to_string())
}

fn convert_row(raw: &RawRecord) -> Result<NewTransaction> {
    Ok(NewTransaction {
        transaction_number: raw.transaction_number.trim().to_string(),
        transaction_date: parse_datetime(&raw.transaction_date)?,
        withdrawal_amount: parse_amount(&raw.withdrawal_amount),
        deposit_amount: parse_amount(&raw.deposit_amount),
        foreign_withdrawal_amount: parse_rate(&raw.foreign_withdrawal_amount),
        conversion_rate: parse_rate(&raw.conversion_rate),
        currency: normalize_optional(&raw.currency),
        country: normalize_optional(&raw.country),
        transaction_type: raw.transaction_type.trim().to_string(),
        merchant: raw.merchant.trim().to_string(),
        payment_method: normalize_optional(&raw.payment_method),
        payment_plan: normalize_optional(&raw.payment_plan),
        user_name: normalize_optional(&raw.user_name),
    })
}

/// Parse a whole PayPay CSV export. A structural CSV error fails the file;
/// rows missing the transaction number or date are dropped silently because
/// the unique key and chronology depend on them.
pub fn parse_csv(csv_text: &str) -> Result<Vec<NewTransaction>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(csv_text.as_bytes());

    let mut records = Vec::new();
    for result in rdr.deserialize() {
        let raw: RawRecord = result?;
        if raw.transaction_number.trim().is_empty() || raw.transaction_date.trim().is_empty() {
            continue;
        }
        records.push(convert_row(&raw)?);
    }
    Ok(records)
}
