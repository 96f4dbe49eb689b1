#[derive(Debug, Clone)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub monthly_budget: Option<i64>,
}

/// Intermediate representation from the CSV parser before DB insert.
/// Carries no id, no category, and no exclusion flag; those belong to the
/// stored row and survive re-import untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub transaction_number: String,
    pub transaction_date: String,
    pub withdrawal_amount: Option<i64>,
    pub deposit_amount: Option<i64>,
    pub foreign_withdrawal_amount: Option<f64>,
    pub conversion_rate: Option<f64>,
    pub currency: Option<String>,
    pub country: Option<String>,
    pub transaction_type: String,
    pub merchant: String,
    pub payment_method: Option<String>,
    pub payment_plan: Option<String>,
    pub user_name: Option<String>,
}
