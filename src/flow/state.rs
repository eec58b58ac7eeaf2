//! Persisted wizard state.
//!
//! One [`FlowState`] lives in the session per in-progress application. Every
//! topic field starts out `None` and is filled by exactly one step. The
//! serialized form is camelCase JSON, which is what the session stores.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::error::FlowError;
use super::id::FlowId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowState {
    pub id: FlowId,
    #[serde(default)]
    pub edit_mode: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terms_and_conditions: Option<TermsAndConditions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_of_application: Option<TypeOfApplication>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applicant_information: Option<ApplicantInformation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marital_status: Option<MaritalStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partner_information: Option<PartnerInformation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_information: Option<ContactInformation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mailing_address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub communication_preferences: Option<CommunicationPreferences>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dental_insurance: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dental_benefits: Option<DentalBenefits>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ChildState>,
    /// Terminal marker: once set the flow is sealed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission_info: Option<SubmissionInfo>,
}

impl FlowState {
    /// A state holding nothing but its id
    pub fn new(id: FlowId) -> Self {
        Self {
            id,
            edit_mode: false,
            terms_and_conditions: None,
            type_of_application: None,
            applicant_information: None,
            marital_status: None,
            partner_information: None,
            contact_information: None,
            mailing_address: None,
            home_address: None,
            communication_preferences: None,
            dental_insurance: None,
            dental_benefits: None,
            children: Vec::new(),
            submission_info: None,
        }
    }

    pub fn is_submitted(&self) -> bool {
        self.submission_info.is_some()
    }

    /// Whether the current marital status calls for partner details
    pub fn requires_partner(&self) -> bool {
        self.marital_status
            .is_some_and(|status| status.requires_partner())
    }

    pub fn child(&self, id: Uuid) -> Option<&ChildState> {
        self.children.iter().find(|c| c.id == id)
    }

    /// Applicant is in the children age band and needs a parent or guardian
    pub fn applicant_is_minor(&self, today: NaiveDate) -> bool {
        self.applicant_information.as_ref().is_some_and(|info| {
            AgeCategory::from_date_of_birth(info.date_of_birth, today) == AgeCategory::Children
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermsAndConditions {
    pub acknowledge_terms: bool,
    pub acknowledge_privacy: bool,
    pub share_data: bool,
}

/// Who the application is for; doubles as the flow-type discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TypeOfApplication {
    Adult,
    AdultChild,
    Child,
    /// Someone applying on another person's behalf; handled outside the wizard
    Delegate,
}

impl TypeOfApplication {
    pub fn slug(&self) -> &'static str {
        match self {
            TypeOfApplication::Adult => "adult",
            TypeOfApplication::AdultChild => "adult-child",
            TypeOfApplication::Child => "child",
            TypeOfApplication::Delegate => "delegate",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        match slug {
            "adult" => Some(TypeOfApplication::Adult),
            "adult-child" => Some(TypeOfApplication::AdultChild),
            "child" => Some(TypeOfApplication::Child),
            "delegate" => Some(TypeOfApplication::Delegate),
            _ => None,
        }
    }

    /// Whether the applicant applies for their own coverage
    pub fn covers_applicant(&self) -> bool {
        matches!(
            self,
            TypeOfApplication::Adult | TypeOfApplication::AdultChild
        )
    }

    /// Whether dependents are part of the application
    pub fn covers_children(&self) -> bool {
        matches!(
            self,
            TypeOfApplication::AdultChild | TypeOfApplication::Child
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicantInformation {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    /// Nine digits, separators stripped
    pub social_insurance_number: String,
    /// Existing client number (renewals only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_number: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MaritalStatus {
    Single,
    Married,
    CommonLaw,
    Divorced,
    Widowed,
    Separated,
}

impl MaritalStatus {
    pub fn all() -> &'static [MaritalStatus] {
        &[
            MaritalStatus::Single,
            MaritalStatus::Married,
            MaritalStatus::CommonLaw,
            MaritalStatus::Divorced,
            MaritalStatus::Widowed,
            MaritalStatus::Separated,
        ]
    }

    pub fn slug(&self) -> &'static str {
        match self {
            MaritalStatus::Single => "single",
            MaritalStatus::Married => "married",
            MaritalStatus::CommonLaw => "common-law",
            MaritalStatus::Divorced => "divorced",
            MaritalStatus::Widowed => "widowed",
            MaritalStatus::Separated => "separated",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::all().iter().copied().find(|s| s.slug() == slug)
    }

    pub fn requires_partner(&self) -> bool {
        matches!(self, MaritalStatus::Married | MaritalStatus::CommonLaw)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerInformation {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub social_insurance_number: String,
    pub consent: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInformation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number_alt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apartment: Option<String>,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub province_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    pub country_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreferredLanguage {
    En,
    Fr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreferredMethod {
    Email,
    Mail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunicationPreferences {
    pub preferred_language: PreferredLanguage,
    pub preferred_method: PreferredMethod,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DentalBenefits {
    pub has_federal_benefits: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub federal_social_program: Option<String>,
    pub has_provincial_territorial_benefits: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provincial_territorial_social_program: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionInfo {
    pub confirmation_code: String,
    pub submitted_on: DateTime<Utc>,
}

/// One dependent within a flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildState {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub information: Option<ChildInformation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dental_insurance: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dental_benefits: Option<DentalBenefits>,
}

impl ChildState {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            information: None,
            dental_insurance: None,
            dental_benefits: None,
        }
    }
}

impl Default for ChildState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildInformation {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    /// Whether the applicant is this child's parent or legal guardian
    pub is_parent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub social_insurance_number: Option<String>,
}

/// Benefit age bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgeCategory {
    Children,
    Youth,
    Adults,
    Seniors,
}

impl AgeCategory {
    pub fn from_age(age: i32) -> Self {
        if age < 16 {
            AgeCategory::Children
        } else if age < 18 {
            AgeCategory::Youth
        } else if age < 65 {
            AgeCategory::Adults
        } else {
            AgeCategory::Seniors
        }
    }

    pub fn from_date_of_birth(date_of_birth: NaiveDate, today: NaiveDate) -> Self {
        Self::from_age(age_on(date_of_birth, today))
    }
}

/// Completed years between `date_of_birth` and `today`
pub fn age_on(date_of_birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - date_of_birth.year();
    if (today.month(), today.day()) < (date_of_birth.month(), date_of_birth.day()) {
        age -= 1;
    }
    age
}

/// Names of the top-level keys a step can write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateField {
    EditMode,
    TermsAndConditions,
    TypeOfApplication,
    ApplicantInformation,
    MaritalStatus,
    PartnerInformation,
    ContactInformation,
    MailingAddress,
    HomeAddress,
    CommunicationPreferences,
    DentalInsurance,
    DentalBenefits,
    Children,
    SubmissionInfo,
}

impl StateField {
    /// JSON key in the stored record
    pub fn key(&self) -> &'static str {
        match self {
            StateField::EditMode => "editMode",
            StateField::TermsAndConditions => "termsAndConditions",
            StateField::TypeOfApplication => "typeOfApplication",
            StateField::ApplicantInformation => "applicantInformation",
            StateField::MaritalStatus => "maritalStatus",
            StateField::PartnerInformation => "partnerInformation",
            StateField::ContactInformation => "contactInformation",
            StateField::MailingAddress => "mailingAddress",
            StateField::HomeAddress => "homeAddress",
            StateField::CommunicationPreferences => "communicationPreferences",
            StateField::DentalInsurance => "dentalInsurance",
            StateField::DentalBenefits => "dentalBenefits",
            StateField::Children => "children",
            StateField::SubmissionInfo => "submissionInfo",
        }
    }

    /// Whether the field has been filled in on `state`
    pub fn is_set(&self, state: &FlowState) -> bool {
        match self {
            StateField::EditMode => true,
            StateField::TermsAndConditions => state.terms_and_conditions.is_some(),
            StateField::TypeOfApplication => state.type_of_application.is_some(),
            StateField::ApplicantInformation => state.applicant_information.is_some(),
            StateField::MaritalStatus => state.marital_status.is_some(),
            StateField::PartnerInformation => state.partner_information.is_some(),
            StateField::ContactInformation => state.contact_information.is_some(),
            StateField::MailingAddress => state.mailing_address.is_some(),
            StateField::HomeAddress => state.home_address.is_some(),
            StateField::CommunicationPreferences => state.communication_preferences.is_some(),
            StateField::DentalInsurance => state.dental_insurance.is_some(),
            StateField::DentalBenefits => state.dental_benefits.is_some(),
            StateField::Children => !state.children.is_empty(),
            StateField::SubmissionInfo => state.submission_info.is_some(),
        }
    }
}

/// Shallow update applied over a stored [`FlowState`].
///
/// Each entry replaces the whole top-level key. A cleared entry removes the
/// key, leaving the field `None` after the merge. The `id` key can never be
/// part of a patch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatePatch {
    entries: Map<String, Value>,
}

impl StatePatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `field` to `value`
    pub fn set<T: Serialize>(mut self, field: StateField, value: T) -> Result<Self, FlowError> {
        let value = serde_json::to_value(value).map_err(FlowError::Encode)?;
        self.entries.insert(field.key().to_string(), value);
        Ok(self)
    }

    /// Reset `field` to unset
    pub fn clear(mut self, field: StateField) -> Self {
        self.entries.insert(field.key().to_string(), Value::Null);
        self
    }

    pub fn edit_mode(mut self, edit_mode: bool) -> Self {
        self.entries
            .insert(StateField::EditMode.key().to_string(), Value::Bool(edit_mode));
        self
    }

    pub fn children(self, children: &[ChildState]) -> Result<Self, FlowError> {
        self.set(StateField::Children, children)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys touched by this patch
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Merge entries into a serialized state object
    pub(crate) fn apply_to(&self, target: &mut Map<String, Value>) {
        for (key, value) in &self.entries {
            if key == "id" {
                continue;
            }
            if value.is_null() {
                target.remove(key);
            } else {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}
