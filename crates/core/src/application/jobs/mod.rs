// Job Behaviours - command-specific preparation and response processing

pub mod get_balance;
pub mod get_transactions;
pub mod sepa_transfer;

pub use get_balance::GetBalance;
pub use get_transactions::GetTransactions;
pub use sepa_transfer::SepaTransfer;

use serde_json::Value;

/// Amount in minor units from a number or a numeric string
fn minor_units(v: Option<&Value>) -> Option<i64> {
    match v? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn text(v: Option<&Value>) -> Option<String> {
    v.and_then(Value::as_str).map(str::to_string)
}
