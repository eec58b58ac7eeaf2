//! Address validation for Canadian mailing addresses.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::flow::state::Address;

/// Verdict of the validation service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressValidationResult {
    Correct,
    /// The service knows a better form of the address
    Corrected(Address),
    NotCorrect,
}

#[derive(Error, Debug)]
pub enum AddressValidationError {
    #[error("address validation request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("address validation service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("address validation service returned unknown verdict '{0}'")]
    UnknownVerdict(String),
}

#[async_trait]
pub trait AddressValidator: Send + Sync {
    async fn validate(
        &self,
        address: &Address,
    ) -> Result<AddressValidationResult, AddressValidationError>;
}

/// Accepts every address as entered
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAddressValidator;

#[async_trait]
impl AddressValidator for NoopAddressValidator {
    async fn validate(
        &self,
        _address: &Address,
    ) -> Result<AddressValidationResult, AddressValidationError> {
        Ok(AddressValidationResult::Correct)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidationRequest<'a> {
    address_line: &'a str,
    city: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    province_code: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    postal_code: Option<&'a str>,
    country_code: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidationResponse {
    status: String,
    #[serde(default)]
    suggestion: Option<SuggestedAddress>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SuggestedAddress {
    address_line: String,
    city: String,
    #[serde(default)]
    province_code: Option<String>,
    #[serde(default)]
    postal_code: Option<String>,
}

/// Calls a JSON address validation endpoint.
///
/// Request: `{addressLine, city, provinceCode, postalCode, countryCode}`.
/// Response: `{status: "correct" | "corrected" | "not-correct", suggestion}`.
pub struct HttpAddressValidator {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpAddressValidator {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, AddressValidationError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("benefits-flow/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl AddressValidator for HttpAddressValidator {
    async fn validate(
        &self,
        address: &Address,
    ) -> Result<AddressValidationResult, AddressValidationError> {
        let request = ValidationRequest {
            address_line: &address.address,
            city: &address.city,
            province_code: address.province_id.as_deref(),
            postal_code: address.postal_code.as_deref(),
            country_code: &address.country_id,
        };

        let response = self.client.post(&self.endpoint).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AddressValidationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let verdict: ValidationResponse = response.json().await?;
        tracing::debug!(status = %verdict.status, "Address validation verdict");

        match (verdict.status.as_str(), verdict.suggestion) {
            ("correct", _) => Ok(AddressValidationResult::Correct),
            ("corrected", Some(suggestion)) => Ok(AddressValidationResult::Corrected(Address {
                address: suggestion.address_line,
                apartment: address.apartment.clone(),
                city: suggestion.city,
                province_id: suggestion.province_code.or_else(|| address.province_id.clone()),
                postal_code: suggestion.postal_code.or_else(|| address.postal_code.clone()),
                country_id: address.country_id.clone(),
            })),
            ("corrected", None) => {
                tracing::warn!("Corrected verdict without a suggestion; treating as not correct");
                Ok(AddressValidationResult::NotCorrect)
            }
            ("not-correct", _) => Ok(AddressValidationResult::NotCorrect),
            (other, _) => Err(AddressValidationError::UnknownVerdict(other.to_string())),
        }
    }
}

/// Which address the user kept after seeing the dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressConfirmation {
    Entered,
    Suggested,
}

impl AddressConfirmation {
    pub const FIELD: &'static str = "addressConfirmation";

    pub fn from_slug(slug: &str) -> Option<Self> {
        match slug {
            "entered" => Some(AddressConfirmation::Entered),
            "suggested" => Some(AddressConfirmation::Suggested),
            _ => None,
        }
    }
}

/// Dialog shown before an address the service disagreed with is saved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressDialog {
    pub entered: Address,
    /// `None` when the service could not match the address at all
    pub suggested: Option<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressDecision {
    Save(Address),
    Confirm(AddressDialog),
}

/// Decide whether an address can be saved now.
///
/// Without an explicit confirmation, anything but a `Correct` verdict asks
/// the user first.
pub fn resolve_address(
    entered: Address,
    result: AddressValidationResult,
    confirmation: Option<AddressConfirmation>,
) -> AddressDecision {
    match (result, confirmation) {
        (AddressValidationResult::Correct, _) => AddressDecision::Save(entered),
        (AddressValidationResult::Corrected(suggested), Some(AddressConfirmation::Suggested)) => {
            AddressDecision::Save(suggested)
        }
        (_, Some(_)) => AddressDecision::Save(entered),
        (AddressValidationResult::Corrected(suggested), None) => {
            AddressDecision::Confirm(AddressDialog {
                entered,
                suggested: Some(suggested),
            })
        }
        (AddressValidationResult::NotCorrect, None) => AddressDecision::Confirm(AddressDialog {
            entered,
            suggested: None,
        }),
    }
}
