//! Data Transfer Objects for the REST API.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};

use crate::flow::children::SingleChildState;
use crate::flow::{FlowKind, FlowVariant};
use crate::locale::Locale;
use crate::services::lookup::display_name;
use crate::services::{AddressDialog, Country, Province, SocialProgram};

// =============================================================================
// Health DTOs
// =============================================================================

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Service status with live session info
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    pub status: String,
    pub version: String,
    pub session_count: usize,
    pub enabled_flows: Vec<String>,
    pub address_validation: bool,
}

// =============================================================================
// Flow catalog DTOs
// =============================================================================

/// One flow kind and its variants
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FlowResponse {
    pub kind: String,
    pub enabled: bool,
    pub variants: Vec<VariantResponse>,
}

/// One (kind, applicant type) parametrization of the wizard
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VariantResponse {
    pub name: String,
    pub applicant: String,
    pub entry_step: String,
    /// Variant-level steps in linear order
    pub steps: Vec<String>,
    /// Fields needed before review, in the order they are asked
    pub requirements: Vec<String>,
}

impl From<&FlowVariant> for VariantResponse {
    fn from(variant: &FlowVariant) -> Self {
        Self {
            name: variant.name(),
            applicant: variant.slug().to_string(),
            entry_step: variant.entry_step().slug().to_string(),
            steps: variant
                .steps
                .iter()
                .map(|step| step.slug().to_string())
                .collect(),
            requirements: variant
                .requirements
                .iter()
                .map(|requirement| requirement.field.key().to_string())
                .collect(),
        }
    }
}

impl FlowResponse {
    pub fn new(kind: FlowKind, enabled: bool) -> Self {
        Self {
            kind: kind.slug().to_string(),
            enabled,
            variants: FlowVariant::all(kind)
                .iter()
                .map(VariantResponse::from)
                .collect(),
        }
    }
}

// =============================================================================
// Step DTOs
// =============================================================================

/// Everything a page needs to render one wizard step
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StepView {
    pub flow_id: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    pub step: String,
    pub locale: String,
    pub edit_mode: bool,
    /// Must be echoed back as `_csrf` on every form post
    pub csrf_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub back_url: Option<String>,
    /// Stored flow state (camelCase JSON)
    #[schema(value_type = Object)]
    pub state: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub child: Option<ChildView>,
    /// Present when an address needs the user's confirmation before saving
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_dialog: Option<AddressDialogView>,
}

/// One child as seen from its own sub-flow
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ChildView {
    pub id: String,
    /// 1-based position among the flow's children
    pub child_number: usize,
    pub is_new: bool,
    pub edit_mode: bool,
    #[schema(value_type = Object)]
    pub state: Value,
}

impl ChildView {
    pub fn new(child: &SingleChildState) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: child.id().to_string(),
            child_number: child.child_number,
            is_new: child.is_new,
            edit_mode: child.edit_mode,
            state: serde_json::to_value(&child.child)?,
        })
    }
}

/// Entered address next to the validation service's suggestion
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AddressDialogView {
    #[schema(value_type = Object)]
    pub entered: Value,
    /// Absent when the service could not match the address at all
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub suggested: Option<Value>,
}

impl AddressDialogView {
    pub fn new(dialog: &AddressDialog) -> Result<Self, serde_json::Error> {
        Ok(Self {
            entered: serde_json::to_value(&dialog.entered)?,
            suggested: dialog
                .suggested
                .as_ref()
                .map(serde_json::to_value)
                .transpose()?,
        })
    }
}

// =============================================================================
// Reference data DTOs
// =============================================================================

/// Language selection for reference lists
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LocaleQuery {
    /// `en` (default) or `fr`
    pub lang: Option<String>,
}

impl LocaleQuery {
    pub fn locale(&self) -> Locale {
        self.lang
            .as_deref()
            .and_then(Locale::from_slug)
            .unwrap_or_default()
    }
}

/// One entry of a select list
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OptionResponse {
    pub id: String,
    pub name: String,
}

impl OptionResponse {
    pub fn country(country: &Country, locale: Locale) -> Self {
        Self {
            id: country.id.clone(),
            name: display_name(locale, &country.name_en, &country.name_fr).to_string(),
        }
    }

    pub fn province(province: &Province, locale: Locale) -> Self {
        Self {
            id: province.id.clone(),
            name: display_name(locale, &province.name_en, &province.name_fr).to_string(),
        }
    }

    pub fn program(program: &SocialProgram, locale: Locale) -> Self {
        Self {
            id: program.id.clone(),
            name: display_name(locale, &program.name_en, &program.name_fr).to_string(),
        }
    }
}
