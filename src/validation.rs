use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::CycleInput;

pub const CYCLE_LENGTH_RANGE: (i64, i64) = (21, 45);
pub const PERIOD_DURATION_RANGE: (i64, i64) = (2, 10);
pub const AGE_RANGE: (i64, i64) = (10, 60);
/// How far back a last period date may lie.
pub const MAX_HISTORY_MONTHS: u32 = 24;

/// Raw calculation request as received from a caller. Nothing here is trusted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalculationRequest {
    pub cycle_length: Option<i64>,
    pub period_duration: Option<i64>,
    pub last_period_date: Option<String>,
    pub age: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

/// Every field that failed, in request order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("invalid request: {}", join_messages(.errors))]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

fn join_messages(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.message)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    pub fn messages_for(&self, field: &str) -> Vec<&'static str> {
        self.errors
            .iter()
            .filter(|e| e.field == field)
            .map(|e| e.message)
            .collect()
    }
}

struct RangeMessages {
    required: &'static str,
    too_small: &'static str,
    too_large: &'static str,
}

const CYCLE_LENGTH_MESSAGES: RangeMessages = RangeMessages {
    required: "Cycle length is required",
    too_small: "Cycle length must be at least 21 days",
    too_large: "Cycle length cannot exceed 45 days",
};

const PERIOD_DURATION_MESSAGES: RangeMessages = RangeMessages {
    required: "Period duration is required",
    too_small: "Period duration must be at least 2 days",
    too_large: "Period duration cannot exceed 10 days",
};

const AGE_MESSAGES: RangeMessages = RangeMessages {
    required: "Age is required",
    too_small: "Age must be at least 10 years",
    too_large: "Age cannot exceed 60 years",
};

fn check_range(
    field: &'static str,
    value: Option<i64>,
    (min, max): (i64, i64),
    messages: &RangeMessages,
    errors: &mut Vec<FieldError>,
) -> Option<u32> {
    let message = match value {
        None => messages.required,
        Some(v) if v < min => messages.too_small,
        Some(v) if v > max => messages.too_large,
        Some(v) => return u32::try_from(v).ok(),
    };
    errors.push(FieldError { field, message });
    None
}

fn check_last_period_date(
    value: Option<&str>,
    today: NaiveDate,
    errors: &mut Vec<FieldError>,
) -> Option<NaiveDate> {
    let field = "last_period_date";
    let message = match value.map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d")) {
        None => "Last period date is required",
        Some(Err(_)) => "Last period date must be in Y-m-d format",
        Some(Ok(date)) if date > today => "Last period date cannot be in the future",
        Some(Ok(date)) => {
            let oldest = today.checked_sub_months(Months::new(MAX_HISTORY_MONTHS));
            if oldest.is_some_and(|oldest| date <= oldest) {
                "Last period date cannot be older than 2 years"
            } else {
                return Some(date);
            }
        }
    };
    errors.push(FieldError { field, message });
    None
}

/// Check a request against the accepted ranges as of `today`.
pub fn validate(
    request: &CalculationRequest,
    today: NaiveDate,
) -> Result<CycleInput, ValidationErrors> {
    let mut errors = Vec::new();

    let cycle_length = check_range(
        "cycle_length",
        request.cycle_length,
        CYCLE_LENGTH_RANGE,
        &CYCLE_LENGTH_MESSAGES,
        &mut errors,
    );
    let period_duration = check_range(
        "period_duration",
        request.period_duration,
        PERIOD_DURATION_RANGE,
        &PERIOD_DURATION_MESSAGES,
        &mut errors,
    );
    let last_period_date =
        check_last_period_date(request.last_period_date.as_deref(), today, &mut errors);
    let age = check_range("age", request.age, AGE_RANGE, &AGE_MESSAGES, &mut errors);

    match (cycle_length, period_duration, last_period_date, age) {
        (Some(cycle_length), Some(period_duration), Some(last_period_date), Some(age))
            if errors.is_empty() =>
        {
            Ok(CycleInput {
                cycle_length,
                period_duration,
                last_period_date,
                age,
            })
        }
        _ => Err(ValidationErrors { errors }),
    }
}
