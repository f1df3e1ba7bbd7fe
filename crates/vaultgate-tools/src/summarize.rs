//! Assistant-safe digests of sensitive upstream payloads.
//!
//! Each function only reads the fields it prints. Output never includes
//! account or routing numbers, national identifiers, contact details or
//! full owner names.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use vaultgate_types::DisclosureLevel;

fn decode<T: DeserializeOwned + Default>(raw: &Value) -> T {
    T::deserialize(raw).unwrap_or_default()
}

/// A field of the wrong type reads as absent.
fn lenient<'de, D, T>(de: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(de)?;
    Ok(value.and_then(|v| T::deserialize(v).ok()))
}

/// Records decode one by one. A malformed record reads as an empty one
/// and is still counted.
fn records<'de, D, T>(de: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    match Option::<Value>::deserialize(de)? {
        Some(Value::Array(items)) => Ok(Some(
            items
                .into_iter()
                .map(|v| T::deserialize(v).unwrap_or_default())
                .collect(),
        )),
        _ => Ok(None),
    }
}

fn money(amount: Option<f64>) -> String {
    match amount {
        Some(v) => format!("${:.2}", v),
        None => "N/A".to_string(),
    }
}

fn percent(rate: Option<f64>) -> String {
    match rate {
        Some(v) => format!("{v}%"),
        None => "N/A".to_string(),
    }
}

fn count<T>(items: &Option<Vec<T>>) -> usize {
    items.as_ref().map_or(0, Vec::len)
}

// ──────────────────── Accounts / auth / balance ────────────────────

#[derive(Debug, Default, Deserialize)]
struct Balances {
    #[serde(default, deserialize_with = "lenient")]
    current: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    available: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    iso_currency_code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Owner {
    #[serde(default, deserialize_with = "records")]
    names: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct Account {
    #[serde(default, deserialize_with = "lenient")]
    name: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "lenient")]
    kind: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    subtype: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    mask: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    balances: Option<Balances>,
    #[serde(default, deserialize_with = "records")]
    owners: Option<Vec<Owner>>,
}

impl Account {
    fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unknown")
    }

    fn mask(&self) -> &str {
        self.mask.as_deref().unwrap_or("????")
    }
}

#[derive(Debug, Default, Deserialize)]
struct AccountsResponse {
    #[serde(default, deserialize_with = "records")]
    accounts: Option<Vec<Account>>,
}

#[derive(Debug, Default, Deserialize)]
struct AuthNumbers {
    #[serde(default, deserialize_with = "records")]
    ach: Option<Vec<Value>>,
}

#[derive(Debug, Default, Deserialize)]
struct AuthResponse {
    #[serde(default, deserialize_with = "records")]
    accounts: Option<Vec<Value>>,
    #[serde(default, deserialize_with = "lenient")]
    numbers: Option<AuthNumbers>,
}

pub fn accounts(raw: &Value, _level: DisclosureLevel) -> String {
    let data: AccountsResponse = decode(raw);
    let accounts = data.accounts.unwrap_or_default();
    let lines: Vec<String> = accounts
        .iter()
        .map(|a| {
            let kind = a
                .subtype
                .as_deref()
                .or(a.kind.as_deref())
                .unwrap_or("unknown");
            format!("- {} ({}, ****{})", a.name(), kind, a.mask())
        })
        .collect();
    format!("Retrieved {} account(s):\n{}", accounts.len(), lines.join("\n"))
}

pub fn auth(raw: &Value, _level: DisclosureLevel) -> String {
    let data: AuthResponse = decode(raw);
    let ach = data.numbers.as_ref().map_or(0, |n| count(&n.ach));
    format!(
        "Retrieved auth data for {} account(s) ({} ACH routing numbers). Account details redacted.",
        count(&data.accounts),
        ach
    )
}

pub fn balance(raw: &Value, _level: DisclosureLevel) -> String {
    let data: AccountsResponse = decode(raw);
    let accounts = data.accounts.unwrap_or_default();
    let lines: Vec<String> = accounts
        .iter()
        .map(|a| {
            let balances = a.balances.as_ref();
            let iso = balances
                .and_then(|b| b.iso_currency_code.as_deref())
                .unwrap_or("USD");
            let current = match balances.and_then(|b| b.current) {
                Some(v) => format!("current={v:.2} {iso}"),
                None => "current=N/A".to_string(),
            };
            let available = match balances.and_then(|b| b.available) {
                Some(v) => format!("available={v:.2} {iso}"),
                None => "available=N/A".to_string(),
            };
            format!("- {} (****{}): {}, {}", a.name(), a.mask(), current, available)
        })
        .collect();
    format!(
        "Real-time balances for {} account(s):\n{}",
        accounts.len(),
        lines.join("\n")
    )
}

// ──────────────────── Identity ────────────────────

pub fn identity(raw: &Value, level: DisclosureLevel) -> String {
    let data: AccountsResponse = decode(raw);
    let accounts = data.accounts.unwrap_or_default();

    // Distinct owner names in first-seen order
    let mut owners: Vec<&str> = Vec::new();
    for name in accounts
        .iter()
        .flat_map(|a| a.owners.iter().flatten())
        .flat_map(|o| o.names.iter().flatten())
    {
        if !name.is_empty() && !owners.contains(&name.as_str()) {
            owners.push(name.as_str());
        }
    }

    match level {
        DisclosureLevel::Detailed => {
            let first_names: Vec<&str> = owners
                .iter()
                .map(|n| n.split(' ').next().unwrap_or_default())
                .collect();
            let list = if first_names.is_empty() {
                "none".to_string()
            } else {
                first_names.join(", ")
            };
            format!(
                "Retrieved identity info for {} account(s). First names: {}. Addresses, SSNs, phones, and emails are redacted.",
                accounts.len(),
                list
            )
        }
        DisclosureLevel::Summary => format!(
            "Retrieved identity info for {} account(s) with {} owner(s). Personal details redacted.",
            accounts.len(),
            owners.len()
        ),
    }
}

// ──────────────────── Transactions ────────────────────

#[derive(Debug, Default, Deserialize)]
struct FinanceCategory {
    #[serde(default, deserialize_with = "lenient")]
    primary: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Transaction {
    #[serde(default, deserialize_with = "lenient")]
    merchant_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    date: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    personal_finance_category: Option<FinanceCategory>,
}

#[derive(Debug, Default, Deserialize)]
struct TransactionsSyncResponse {
    #[serde(default, deserialize_with = "records")]
    added: Option<Vec<Transaction>>,
    #[serde(default, deserialize_with = "records")]
    modified: Option<Vec<Value>>,
    #[serde(default, deserialize_with = "records")]
    removed: Option<Vec<Value>>,
    #[serde(default, deserialize_with = "lenient")]
    has_more: Option<bool>,
}

pub fn transactions_sync(raw: &Value, level: DisclosureLevel) -> String {
    let data: TransactionsSyncResponse = decode(raw);
    let added = data.added.unwrap_or_default();
    let more = if data.has_more.unwrap_or(false) {
        "More pages available."
    } else {
        "No more pages."
    };
    let head = format!(
        "Transaction sync: {} added, {} modified, {} removed. {}",
        added.len(),
        count(&data.modified),
        count(&data.removed),
        more
    );

    if level == DisclosureLevel::Summary || added.is_empty() {
        return head;
    }

    let lines: Vec<String> = added
        .iter()
        .map(|t| {
            let merchant = t
                .merchant_name
                .as_deref()
                .or(t.name.as_deref())
                .unwrap_or("Unknown");
            let category = t
                .personal_finance_category
                .as_ref()
                .and_then(|c| c.primary.as_deref())
                .unwrap_or("uncategorized");
            format!(
                "- {} | {} | {} | {}",
                t.date.as_deref().unwrap_or("N/A"),
                merchant,
                money(t.amount.map(f64::abs)),
                category
            )
        })
        .collect();
    format!("{head}\n{}", lines.join("\n"))
}

// ──────────────────── Investments ────────────────────

#[derive(Debug, Default, Deserialize)]
struct Holding {
    #[serde(default, deserialize_with = "lenient")]
    security_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    quantity: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    institution_value: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct Security {
    #[serde(default, deserialize_with = "lenient")]
    security_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    ticker_symbol: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct HoldingsResponse {
    #[serde(default, deserialize_with = "records")]
    holdings: Option<Vec<Holding>>,
    #[serde(default, deserialize_with = "records")]
    accounts: Option<Vec<Value>>,
    #[serde(default, deserialize_with = "records")]
    securities: Option<Vec<Security>>,
}

pub fn investments_holdings(raw: &Value, level: DisclosureLevel) -> String {
    let data: HoldingsResponse = decode(raw);
    let holdings = data.holdings.unwrap_or_default();
    let securities = data.securities.unwrap_or_default();
    let accounts = count(&data.accounts);

    if level == DisclosureLevel::Summary || holdings.is_empty() {
        return format!(
            "Retrieved {} investment holding(s) across {} account(s) covering {} securities.",
            holdings.len(),
            accounts,
            securities.len()
        );
    }

    let lines: Vec<String> = holdings
        .iter()
        .map(|h| {
            let security = securities
                .iter()
                .find(|s| s.security_id.is_some() && s.security_id == h.security_id);
            let ticker = security
                .and_then(|s| s.ticker_symbol.as_deref().or(s.name.as_deref()))
                .unwrap_or("Unknown");
            let quantity = match h.quantity {
                Some(q) => q.to_string(),
                None => "N/A".to_string(),
            };
            format!(
                "- {}: {} shares, value {}",
                ticker,
                quantity,
                money(h.institution_value)
            )
        })
        .collect();
    format!(
        "Retrieved {} investment holding(s) across {} account(s):\n{}",
        holdings.len(),
        accounts,
        lines.join("\n")
    )
}

#[derive(Debug, Default, Deserialize)]
struct InvestmentTransaction {
    #[serde(default, deserialize_with = "lenient")]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    date: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "lenient")]
    kind: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    subtype: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct InvestmentTransactionsResponse {
    #[serde(default, deserialize_with = "records")]
    investment_transactions: Option<Vec<InvestmentTransaction>>,
    #[serde(default, deserialize_with = "records")]
    accounts: Option<Vec<Value>>,
    #[serde(default, deserialize_with = "lenient")]
    total_investment_transactions: Option<u64>,
}

pub fn investments_transactions(raw: &Value, level: DisclosureLevel) -> String {
    let data: InvestmentTransactionsResponse = decode(raw);
    let txns = data.investment_transactions.unwrap_or_default();
    let accounts = count(&data.accounts);
    let total = data
        .total_investment_transactions
        .unwrap_or(txns.len() as u64);

    if level == DisclosureLevel::Summary || txns.is_empty() {
        return format!(
            "Retrieved {} investment transaction(s) across {} account(s) ({} total available).",
            txns.len(),
            accounts,
            total
        );
    }

    let lines: Vec<String> = txns
        .iter()
        .map(|t| {
            let kind = t
                .subtype
                .as_deref()
                .or(t.kind.as_deref())
                .unwrap_or("unknown");
            format!(
                "- {} | {} | {} | {}",
                t.date.as_deref().unwrap_or("N/A"),
                t.name.as_deref().unwrap_or("Unknown"),
                money(t.amount.map(f64::abs)),
                kind
            )
        })
        .collect();
    format!(
        "Retrieved {} investment transaction(s) across {} account(s) ({} total available):\n{}",
        txns.len(),
        accounts,
        total,
        lines.join("\n")
    )
}

// ──────────────────── Liabilities ────────────────────

#[derive(Debug, Default, Deserialize)]
struct Apr {
    #[serde(default, deserialize_with = "lenient")]
    apr_percentage: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct CreditLiability {
    #[serde(default, deserialize_with = "lenient")]
    last_statement_balance: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    minimum_payment_amount: Option<f64>,
    #[serde(default, deserialize_with = "records")]
    aprs: Option<Vec<Apr>>,
}

#[derive(Debug, Default, Deserialize)]
struct StudentLiability {
    #[serde(default, deserialize_with = "lenient")]
    last_payment_amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    interest_rate_percentage: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    loan_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct MortgageLiability {
    #[serde(default, deserialize_with = "lenient")]
    last_payment_amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    interest_rate_percentage: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    loan_type_description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Liabilities {
    #[serde(default, deserialize_with = "records")]
    credit: Option<Vec<CreditLiability>>,
    #[serde(default, deserialize_with = "records")]
    student: Option<Vec<StudentLiability>>,
    #[serde(default, deserialize_with = "records")]
    mortgage: Option<Vec<MortgageLiability>>,
}

#[derive(Debug, Default, Deserialize)]
struct LiabilitiesResponse {
    #[serde(default, deserialize_with = "lenient")]
    liabilities: Option<Liabilities>,
}

pub fn liabilities(raw: &Value, level: DisclosureLevel) -> String {
    let data: LiabilitiesResponse = decode(raw);
    let l = data.liabilities.unwrap_or_default();

    let mut parts = Vec::new();
    if let Some(c) = &l.credit {
        parts.push(format!("{} credit card(s)", c.len()));
    }
    if let Some(s) = &l.student {
        parts.push(format!("{} student loan(s)", s.len()));
    }
    if let Some(m) = &l.mortgage {
        parts.push(format!("{} mortgage(s)", m.len()));
    }
    if parts.is_empty() {
        return "Retrieved liabilities: none found.".to_string();
    }
    let head = format!("Retrieved liabilities: {}.", parts.join(", "));

    if level == DisclosureLevel::Summary {
        return head;
    }

    let mut lines = Vec::new();
    for c in l.credit.iter().flatten() {
        let apr = c
            .aprs
            .as_ref()
            .and_then(|a| a.first())
            .and_then(|a| a.apr_percentage);
        lines.push(format!(
            "- Credit: balance {}, min payment {}, APR {}",
            money(c.last_statement_balance),
            money(c.minimum_payment_amount),
            percent(apr)
        ));
    }
    for s in l.student.iter().flatten() {
        lines.push(format!(
            "- {}: rate {}, last payment {}",
            s.loan_name.as_deref().unwrap_or("Student loan"),
            percent(s.interest_rate_percentage),
            money(s.last_payment_amount)
        ));
    }
    for m in l.mortgage.iter().flatten() {
        lines.push(format!(
            "- {}: rate {}, last payment {}",
            m.loan_type_description.as_deref().unwrap_or("Mortgage"),
            percent(m.interest_rate_percentage),
            money(m.last_payment_amount)
        ));
    }
    format!("{head}\n{}", lines.join("\n"))
}
