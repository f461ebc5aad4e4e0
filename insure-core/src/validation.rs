//! Field validation for policy creation and update bodies
//!
//! Bodies are checked as raw JSON so that every failing rule can be
//! reported at once, before anything is deserialized into typed requests.

use crate::dates::parse_iso8601;
use crate::models::{NewPolicy, PolicyStatus, PolicyUpdate};
use serde_json::{Map, Value};
use std::fmt;

const MIN_CUSTOMER_NAME_CHARS: usize = 2;
const MAX_CUSTOMER_NAME_CHARS: usize = 100;

/// Accumulated field-level failures, one message per failing rule
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<String>);

impl ValidationErrors {
    fn push(&mut self, message: impl Into<String>) {
        self.0.push(message.into());
    }

    /// Whether nothing failed
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The individual messages, in field then rule order
    pub fn messages(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(", "))
    }
}

impl std::error::Error for ValidationErrors {}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Presence {
    Required,
    Optional,
}

/// Validate a creation body
pub fn validate_create(body: &Value) -> Result<NewPolicy, ValidationErrors> {
    let fields = as_object(body)?;
    let mut errors = ValidationErrors::default();

    let product_id = product_id_field(fields, Presence::Required, &mut errors);
    let customer_name = customer_name_field(fields, Presence::Required, &mut errors);
    let start_date = date_field(fields, "startDate", "Start date", Presence::Required, &mut errors);
    let end_date = date_field(fields, "endDate", "End date", Presence::Required, &mut errors);
    let premium = premium_field(fields, Presence::Required, &mut errors);
    let status = status_field(fields, &mut errors);

    match (product_id, customer_name, start_date, end_date, premium) {
        (Some(product_id), Some(customer_name), Some(start_date), Some(end_date), Some(premium))
            if errors.is_empty() =>
        {
            Ok(NewPolicy {
                product_id,
                customer_name,
                start_date,
                end_date,
                premium,
                status,
            })
        }
        _ => Err(errors),
    }
}

/// Validate a partial update body
pub fn validate_update(body: &Value) -> Result<PolicyUpdate, ValidationErrors> {
    let fields = as_object(body)?;
    let mut errors = ValidationErrors::default();

    let update = PolicyUpdate {
        product_id: product_id_field(fields, Presence::Optional, &mut errors),
        customer_name: customer_name_field(fields, Presence::Optional, &mut errors),
        start_date: date_field(fields, "startDate", "Start date", Presence::Optional, &mut errors),
        end_date: date_field(fields, "endDate", "End date", Presence::Optional, &mut errors),
        premium: premium_field(fields, Presence::Optional, &mut errors),
        status: status_field(fields, &mut errors),
    };

    if errors.is_empty() {
        Ok(update)
    } else {
        Err(errors)
    }
}

fn as_object(body: &Value) -> Result<&Map<String, Value>, ValidationErrors> {
    body.as_object().ok_or_else(|| {
        let mut errors = ValidationErrors::default();
        errors.push("Request body must be a JSON object");
        errors
    })
}

/// A field counts as absent when missing or null
fn present<'a>(fields: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    fields.get(name).filter(|v| !v.is_null())
}

/// The string form a rule sees: absent is empty and scalars stringify
fn text_of(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Numeric coercion used by the premium bound: blank strings read as zero
/// and anything unreadable as NaN
fn coerce_number(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) if s.trim().is_empty() => 0.0,
        Some(Value::String(s)) => s.trim().parse().unwrap_or(f64::NAN),
        Some(Value::Bool(b)) => f64::from(u8::from(*b)),
        _ => f64::NAN,
    }
}

/// Optional sign, optional integer part and dot, then at least one digit
fn is_numeric_text(s: &str) -> bool {
    let unsigned = s.strip_prefix(|c: char| c == '+' || c == '-').unwrap_or(s);
    let (whole, fraction) = unsigned.split_once('.').unwrap_or(("", unsigned));
    !fraction.is_empty()
        && fraction.bytes().all(|b| b.is_ascii_digit())
        && whole.bytes().all(|b| b.is_ascii_digit())
}

/// Record `message` unless `passed`, returning `passed`
fn rule(errors: &mut ValidationErrors, passed: bool, message: impl Into<String>) -> bool {
    if !passed {
        errors.push(message);
    }
    passed
}

/// Look up a field; `None` when it is optional and absent, which skips
/// every rule
fn field<'a>(
    fields: &'a Map<String, Value>,
    name: &str,
    presence: Presence,
) -> Option<Option<&'a Value>> {
    match (present(fields, name), presence) {
        (None, Presence::Optional) => None,
        (value, _) => Some(value),
    }
}

fn product_id_field(
    fields: &Map<String, Value>,
    presence: Presence,
    errors: &mut ValidationErrors,
) -> Option<String> {
    let value = field(fields, "productId", presence)?;

    let mut ok = true;
    if presence == Presence::Required {
        ok &= rule(errors, !text_of(value).is_empty(), "Product ID is required");
    }
    ok &= rule(errors, matches!(value, Some(Value::String(_))), "Product ID must be a string");

    ok.then(|| text_of(value))
}

fn customer_name_field(
    fields: &Map<String, Value>,
    presence: Presence,
    errors: &mut ValidationErrors,
) -> Option<String> {
    let value = field(fields, "customerName", presence)?;
    let text = text_of(value);

    let mut ok = true;
    if presence == Presence::Required {
        ok &= rule(errors, !text.is_empty(), "Customer name is required");
    }
    ok &= rule(
        errors,
        matches!(value, Some(Value::String(_))),
        "Customer name must be a string",
    );
    ok &= rule(
        errors,
        (MIN_CUSTOMER_NAME_CHARS..=MAX_CUSTOMER_NAME_CHARS).contains(&text.chars().count()),
        format!(
            "Customer name must be between {} and {} characters",
            MIN_CUSTOMER_NAME_CHARS, MAX_CUSTOMER_NAME_CHARS
        ),
    );

    ok.then_some(text)
}

fn date_field(
    fields: &Map<String, Value>,
    name: &str,
    label: &str,
    presence: Presence,
    errors: &mut ValidationErrors,
) -> Option<String> {
    let value = field(fields, name, presence)?;
    let text = text_of(value);

    let mut ok = true;
    if presence == Presence::Required {
        ok &= rule(errors, !text.is_empty(), format!("{} is required", label));
    }
    ok &= rule(
        errors,
        parse_iso8601(&text).is_some(),
        format!("{} must be a valid ISO 8601 date", label),
    );

    ok.then_some(text)
}

fn premium_field(
    fields: &Map<String, Value>,
    presence: Presence,
    errors: &mut ValidationErrors,
) -> Option<f64> {
    let value = field(fields, "premium", presence)?;
    let amount = coerce_number(value);

    let mut ok = true;
    if presence == Presence::Required {
        ok &= rule(errors, !text_of(value).is_empty(), "Premium is required");
    }
    let numeric = match value {
        Some(Value::Number(_)) => amount.is_finite(),
        _ => is_numeric_text(&text_of(value)),
    };
    ok &= rule(errors, numeric, "Premium must be a number");
    // unreadable values only fail the numeric rule
    ok &= rule(errors, amount > 0.0 || amount.is_nan(), "Premium must be greater than 0");

    ok.then_some(amount)
}

fn status_field(fields: &Map<String, Value>, errors: &mut ValidationErrors) -> Option<PolicyStatus> {
    let value = present(fields, "status")?;
    match value.as_str().and_then(PolicyStatus::parse) {
        Some(status) => Some(status),
        None => {
            let allowed: Vec<_> = PolicyStatus::ALL.iter().map(|s| s.as_str()).collect();
            errors.push(format!("Status must be one of: {}", allowed.join(", ")));
            None
        }
    }
}
