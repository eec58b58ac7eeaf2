//! Field rules shared by several steps.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use crate::flow::state::age_on;
use crate::flow::FlowState;

use super::{ErrorCode, FieldErrors, FormInput};

pub const NAME_MAX_LEN: usize = 100;
pub const ADDRESS_MAX_LEN: usize = 100;
pub const EMAIL_MAX_LEN: usize = 64;
pub const MAX_AGE: i32 = 150;

static CANADIAN_POSTAL_CODE: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"^([ABCEGHJ-NPRSTVXY]\d[ABCEGHJ-NPRSTV-Z])\s?(\d[ABCEGHJ-NPRSTV-Z]\d)$").ok()
});
static US_ZIP_CODE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^\d{5}(-\d{4})?$").ok());
static PHONE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^\+?[0-9 ().-]+$").ok());
static EMAIL: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s.]+$").ok());

fn is_match(pattern: &Option<Regex>, value: &str) -> bool {
    pattern.as_ref().is_some_and(|re| re.is_match(value))
}

/// Strip the separators people type into a SIN
pub fn normalize_sin(raw: &str) -> String {
    raw.chars().filter(|c| !matches!(c, ' ' | '-')).collect()
}

/// Nine digits passing the Luhn checksum
pub fn is_valid_sin(raw: &str) -> bool {
    let sin = normalize_sin(raw);
    if sin.len() != 9 || !sin.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }

    let sum: u32 = sin
        .chars()
        .filter_map(|c| c.to_digit(10))
        .enumerate()
        .map(|(i, d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}

/// Whose SIN is being validated; that entity's stored SIN is not a conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinOwner {
    Applicant,
    Partner,
    Child(Uuid),
}

/// SIN not already used by any other person in the flow
pub fn is_sin_unique(state: &FlowState, raw: &str, owner: SinOwner) -> bool {
    let candidate = normalize_sin(raw);

    let applicant = state
        .applicant_information
        .as_ref()
        .filter(|_| owner != SinOwner::Applicant)
        .map(|info| info.social_insurance_number.as_str());
    let partner = state
        .partner_information
        .as_ref()
        .filter(|_| owner != SinOwner::Partner)
        .map(|info| info.social_insurance_number.as_str());
    let children = state
        .children
        .iter()
        .filter(|child| owner != SinOwner::Child(child.id))
        .filter_map(|child| child.information.as_ref())
        .filter_map(|info| info.social_insurance_number.as_deref());

    !applicant
        .into_iter()
        .chain(partner)
        .chain(children)
        .any(|existing| normalize_sin(existing) == candidate)
}

/// Required, well-formed, unique SIN; returned normalized
pub fn social_insurance_number(
    form: &FormInput,
    errors: &mut FieldErrors,
    field: &str,
    state: &FlowState,
    owner: SinOwner,
) -> Option<String> {
    let Some(raw) = form.text(field) else {
        errors.add(field, ErrorCode::Required);
        return None;
    };
    if !is_valid_sin(raw) {
        errors.add(field, ErrorCode::InvalidSin);
        return None;
    }
    if !is_sin_unique(state, raw, owner) {
        errors.add(field, ErrorCode::SinNotUnique);
        return None;
    }
    Some(normalize_sin(raw))
}

fn date_part(form: &FormInput, errors: &mut FieldErrors, field: &str) -> Option<u32> {
    let Some(raw) = form.text(field) else {
        errors.add(field, ErrorCode::Required);
        return None;
    };
    match raw.parse::<u32>() {
        Ok(value) if value > 0 => Some(value),
        _ => {
            errors.add(field, ErrorCode::NotANumber);
            None
        }
    }
}

/// Date of birth from `{prefix}Year`, `{prefix}Month` and `{prefix}Day`.
///
/// Each part is checked on its own field first. Only when all three parse
/// does the composite check run, reporting on `prefix` itself.
pub fn date_of_birth(
    form: &FormInput,
    errors: &mut FieldErrors,
    prefix: &str,
    today: NaiveDate,
) -> Option<NaiveDate> {
    let year = date_part(form, errors, &format!("{prefix}Year"));
    let month = date_part(form, errors, &format!("{prefix}Month"));
    let day = date_part(form, errors, &format!("{prefix}Day"));
    let (year, month, day) = (year?, month?, day?);

    let Some(date) = i32::try_from(year)
        .ok()
        .and_then(|year| NaiveDate::from_ymd_opt(year, month, day))
    else {
        errors.add(prefix, ErrorCode::InvalidDate);
        return None;
    };

    if date > today {
        errors.add(prefix, ErrorCode::DateInFuture);
        return None;
    }
    if age_on(date, today) > MAX_AGE {
        errors.add(prefix, ErrorCode::TooOld);
        return None;
    }
    Some(date)
}

/// Postal code normalized for the country, or `None` if malformed.
///
/// Canadian codes become `A1A 1A1`; US ZIP codes are kept as typed; other
/// countries are not checked.
pub fn normalize_postal_code(country_id: &str, raw: &str) -> Option<String> {
    let value = raw.trim().to_ascii_uppercase();
    match country_id {
        "CAN" => Lazy::force(&CANADIAN_POSTAL_CODE).as_ref().and_then(|re| {
            re.captures(&value)
                .map(|caps| format!("{} {}", &caps[1], &caps[2]))
        }),
        "USA" => is_match(&US_ZIP_CODE, &value).then_some(value),
        _ => Some(value),
    }
}

/// Whether a country requires a postal code and a province/state
pub fn is_north_american(country_id: &str) -> bool {
    matches!(country_id, "CAN" | "USA")
}

/// Phone number with 10 to 15 digits
pub fn is_valid_phone(raw: &str) -> bool {
    let digits = raw.chars().filter(char::is_ascii_digit).count();
    is_match(&PHONE, raw) && (10..=15).contains(&digits)
}

pub fn is_valid_email(raw: &str) -> bool {
    raw.len() <= EMAIL_MAX_LEN && is_match(&EMAIL, raw)
}
