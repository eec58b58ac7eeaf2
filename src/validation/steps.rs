//! One validator per step.
//!
//! Structural checks run first and record every problem they find. Cross-field
//! and cross-entity checks only run on values that passed, so each control
//! gets the most specific error available.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::flow::children;
use crate::flow::state::{
    Address, ApplicantInformation, ChildInformation, CommunicationPreferences,
    ContactInformation, DentalBenefits, MaritalStatus, PartnerInformation, PreferredLanguage,
    PreferredMethod, TermsAndConditions, TypeOfApplication,
};
use crate::flow::{FlowKind, FlowState};
use crate::services::ReferenceData;

use super::rules::{self, SinOwner, ADDRESS_MAX_LEN, NAME_MAX_LEN};
use super::{ErrorCode, FieldErrors, FormInput};

const CLIENT_NUMBER_LEN: usize = 11;

/// Read-only context some validators need beyond the submitted form
pub struct StepContext<'a> {
    pub state: &'a FlowState,
    pub kind: FlowKind,
    pub today: NaiveDate,
    pub reference: &'a dyn ReferenceData,
}

pub fn terms_and_conditions(form: &FormInput) -> Result<TermsAndConditions, FieldErrors> {
    let mut errors = FieldErrors::new();
    for field in ["acknowledgeTerms", "acknowledgePrivacy", "shareData"] {
        if !form.checkbox(field) {
            errors.add(field, ErrorCode::Required);
        }
    }
    errors.into_result(TermsAndConditions {
        acknowledge_terms: true,
        acknowledge_privacy: true,
        share_data: true,
    })
}

pub fn type_of_application(form: &FormInput) -> Result<TypeOfApplication, FieldErrors> {
    let mut errors = FieldErrors::new();
    let value = form.choice(&mut errors, "typeOfApplication", TypeOfApplication::from_slug);
    errors.finish(value)
}

fn client_number(form: &FormInput, errors: &mut FieldErrors) -> Option<String> {
    let Some(raw) = form.text("clientNumber") else {
        errors.add("clientNumber", ErrorCode::Required);
        return None;
    };
    let digits: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.len() != CLIENT_NUMBER_LEN || !digits.chars().all(|c| c.is_ascii_digit()) {
        errors.add("clientNumber", ErrorCode::Invalid);
        return None;
    }
    Some(digits)
}

/// Renewals also identify the applicant by their existing client number
pub fn applicant_information(
    ctx: &StepContext<'_>,
    form: &FormInput,
) -> Result<ApplicantInformation, FieldErrors> {
    let mut errors = FieldErrors::new();

    let first_name = form.required_text(&mut errors, "firstName", NAME_MAX_LEN);
    let last_name = form.required_text(&mut errors, "lastName", NAME_MAX_LEN);
    let date_of_birth = rules::date_of_birth(form, &mut errors, "dateOfBirth", ctx.today);
    let sin = rules::social_insurance_number(
        form,
        &mut errors,
        "socialInsuranceNumber",
        ctx.state,
        SinOwner::Applicant,
    );
    let client_number = if ctx.kind.is_renewal() {
        client_number(form, &mut errors)
    } else {
        None
    };

    let value = match (first_name, last_name, date_of_birth, sin) {
        (Some(first_name), Some(last_name), Some(date_of_birth), Some(social_insurance_number)) => {
            Some(ApplicantInformation {
                first_name,
                last_name,
                date_of_birth,
                social_insurance_number,
                client_number,
            })
        }
        _ => None,
    };
    errors.finish(value)
}

pub fn marital_status(form: &FormInput) -> Result<MaritalStatus, FieldErrors> {
    let mut errors = FieldErrors::new();
    let value = form.choice(&mut errors, "maritalStatus", MaritalStatus::from_slug);
    errors.finish(value)
}

pub fn partner_information(
    ctx: &StepContext<'_>,
    form: &FormInput,
) -> Result<PartnerInformation, FieldErrors> {
    let mut errors = FieldErrors::new();

    let first_name = form.required_text(&mut errors, "firstName", NAME_MAX_LEN);
    let last_name = form.required_text(&mut errors, "lastName", NAME_MAX_LEN);
    let date_of_birth = rules::date_of_birth(form, &mut errors, "dateOfBirth", ctx.today);
    let sin = rules::social_insurance_number(
        form,
        &mut errors,
        "socialInsuranceNumber",
        ctx.state,
        SinOwner::Partner,
    );
    if !form.checkbox("consent") {
        errors.add("consent", ErrorCode::Required);
    }

    let value = match (first_name, last_name, date_of_birth, sin) {
        (Some(first_name), Some(last_name), Some(date_of_birth), Some(social_insurance_number)) => {
            Some(PartnerInformation {
                first_name,
                last_name,
                date_of_birth,
                social_insurance_number,
                consent: true,
            })
        }
        _ => None,
    };
    errors.finish(value)
}

fn optional_phone(form: &FormInput, errors: &mut FieldErrors, field: &str) -> Option<String> {
    let raw = form.text(field)?;
    if !rules::is_valid_phone(raw) {
        errors.add(field, ErrorCode::InvalidPhone);
        return None;
    }
    Some(raw.to_string())
}

pub fn contact_information(form: &FormInput) -> Result<ContactInformation, FieldErrors> {
    let mut errors = FieldErrors::new();

    let phone_number = optional_phone(form, &mut errors, "phoneNumber");
    let phone_number_alt = optional_phone(form, &mut errors, "phoneNumberAlt");

    let email = form.text("email").map(str::to_ascii_lowercase);
    if let Some(email) = &email {
        if !rules::is_valid_email(email) {
            errors.add("email", ErrorCode::InvalidEmail);
        } else if form.text("confirmEmail").map(str::to_ascii_lowercase).as_ref() != Some(email) {
            errors.add("confirmEmail", ErrorCode::EmailMismatch);
        }
    }

    errors.into_result(ContactInformation {
        phone_number,
        phone_number_alt,
        email,
    })
}

/// Address fields shared by the mailing and home address steps
pub fn address(ctx: &StepContext<'_>, form: &FormInput) -> Result<Address, FieldErrors> {
    let mut errors = FieldErrors::new();

    let street = form.required_text(&mut errors, "address", ADDRESS_MAX_LEN);
    let apartment = form.optional_text(&mut errors, "apartment", ADDRESS_MAX_LEN);
    let city = form.required_text(&mut errors, "city", ADDRESS_MAX_LEN);

    let country_id = form.choice(&mut errors, "countryId", |id| {
        ctx.reference.country_by_id(id).map(|country| country.id)
    });

    let mut province_id = None;
    let mut postal_code = None;
    if let Some(country_id) = &country_id {
        let provinces = ctx.reference.provinces_of(country_id);
        if !provinces.is_empty() {
            province_id = form.choice(&mut errors, "provinceId", |id| {
                provinces
                    .iter()
                    .find(|p| p.id == id)
                    .map(|p| p.id.clone())
            });
        }

        match form.text("postalCode") {
            None if rules::is_north_american(country_id) => {
                errors.add("postalCode", ErrorCode::Required);
            }
            None => {}
            Some(raw) => match rules::normalize_postal_code(country_id, raw) {
                Some(normalized) => postal_code = Some(normalized),
                None => errors.add("postalCode", ErrorCode::InvalidPostalCode),
            },
        }
    }

    let value = match (street, city, country_id) {
        (Some(address), Some(city), Some(country_id)) => Some(Address {
            address,
            apartment,
            city,
            province_id,
            postal_code,
            country_id,
        }),
        _ => None,
    };
    errors.finish(value)
}

/// Home address, or a copy of the mailing address when `sameAsMailing`
pub fn home_address(ctx: &StepContext<'_>, form: &FormInput) -> Result<Address, FieldErrors> {
    if !form.checkbox("sameAsMailing") {
        return address(ctx, form);
    }

    let mut errors = FieldErrors::new();
    let mailing = ctx.state.mailing_address.clone();
    if mailing.is_none() {
        errors.add("sameAsMailing", ErrorCode::Invalid);
    }
    errors.finish(mailing)
}

pub fn communication_preferences(
    ctx: &StepContext<'_>,
    form: &FormInput,
) -> Result<CommunicationPreferences, FieldErrors> {
    let mut errors = FieldErrors::new();

    let preferred_language = form.choice(&mut errors, "preferredLanguage", |v| match v {
        "en" => Some(PreferredLanguage::En),
        "fr" => Some(PreferredLanguage::Fr),
        _ => None,
    });
    let preferred_method = form.choice(&mut errors, "preferredMethod", |v| match v {
        "email" => Some(PreferredMethod::Email),
        "mail" => Some(PreferredMethod::Mail),
        _ => None,
    });

    let has_email = ctx
        .state
        .contact_information
        .as_ref()
        .is_some_and(|contact| contact.email.is_some());
    if preferred_method == Some(PreferredMethod::Email) && !has_email {
        errors.add("preferredMethod", ErrorCode::EmailRequired);
    }

    let value = match (preferred_language, preferred_method) {
        (Some(preferred_language), Some(preferred_method)) => Some(CommunicationPreferences {
            preferred_language,
            preferred_method,
        }),
        _ => None,
    };
    errors.finish(value)
}

/// Also used by the per-child dental insurance step
pub fn dental_insurance(form: &FormInput) -> Result<bool, FieldErrors> {
    let mut errors = FieldErrors::new();
    let value = form.yes_no(&mut errors, "dentalInsurance");
    errors.finish(value)
}

/// Federal and provincial/territorial benefits.
///
/// A program is only required when its flag is yes. When the flag is no,
/// any program submitted alongside it is dropped rather than rejected.
pub fn dental_benefits(
    ctx: &StepContext<'_>,
    form: &FormInput,
) -> Result<DentalBenefits, FieldErrors> {
    let mut errors = FieldErrors::new();

    let has_federal = form.yes_no(&mut errors, "hasFederalBenefits");
    let has_provincial = form.yes_no(&mut errors, "hasProvincialTerritorialBenefits");

    let federal_social_program = if has_federal == Some(true) {
        form.choice(&mut errors, "federalSocialProgram", |id| {
            ctx.reference.federal_program_by_id(id).map(|p| p.id)
        })
    } else {
        None
    };

    let (province, provincial_program) = if has_provincial == Some(true) {
        let province = form.choice(&mut errors, "province", |id| {
            ctx.reference
                .province_by_id(id)
                .filter(|p| p.country_id == "CAN")
                .map(|p| p.id)
        });
        let program = province.as_deref().and_then(|province| {
            form.choice(&mut errors, "provincialTerritorialSocialProgram", |id| {
                ctx.reference
                    .provincial_program_by_id(province, id)
                    .map(|p| p.id)
            })
        });
        (province, program)
    } else {
        (None, None)
    };

    let value = match (has_federal, has_provincial) {
        (Some(has_federal_benefits), Some(has_provincial_territorial_benefits)) => {
            Some(DentalBenefits {
                has_federal_benefits,
                federal_social_program,
                has_provincial_territorial_benefits,
                province,
                provincial_territorial_social_program: provincial_program,
            })
        }
        _ => None,
    };
    errors.finish(value)
}

/// Information about one child; the child's own stored SIN is not a clash
pub fn child_information(
    ctx: &StepContext<'_>,
    child_id: Uuid,
    form: &FormInput,
) -> Result<ChildInformation, FieldErrors> {
    let mut errors = FieldErrors::new();

    let first_name = form.required_text(&mut errors, "firstName", NAME_MAX_LEN);
    let last_name = form.required_text(&mut errors, "lastName", NAME_MAX_LEN);
    let date_of_birth = rules::date_of_birth(form, &mut errors, "dateOfBirth", ctx.today);
    let is_parent = form.yes_no(&mut errors, "isParent");

    let social_insurance_number = match form.yes_no(&mut errors, "hasSocialInsuranceNumber") {
        Some(true) => rules::social_insurance_number(
            form,
            &mut errors,
            "socialInsuranceNumber",
            ctx.state,
            SinOwner::Child(child_id),
        ),
        _ => None,
    };

    let value = match (first_name, last_name, date_of_birth, is_parent) {
        (Some(first_name), Some(last_name), Some(date_of_birth), Some(is_parent)) => {
            Some(ChildInformation {
                first_name,
                last_name,
                date_of_birth,
                is_parent,
                social_insurance_number,
            })
        }
        _ => None,
    };
    errors.finish(value)
}

/// Leaving the children index needs at least one child, each fully answered
pub fn children_complete(ctx: &StepContext<'_>) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    if ctx.state.children.is_empty() {
        errors.add("children", ErrorCode::ChildrenRequired);
    }
    for (index, child) in ctx.state.children.iter().enumerate() {
        if children::first_incomplete_step(child, ctx.today).is_some() {
            errors.add(format!("children.{}", index + 1), ErrorCode::ChildIncomplete);
        }
    }
    errors.into_result(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::state::ChildState;
    use crate::flow::FlowId;
    use crate::services::StaticReferenceData;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn ctx<'a>(state: &'a FlowState, kind: FlowKind) -> StepContext<'a> {
        StepContext {
            state,
            kind,
            today: today(),
            reference: &StaticReferenceData,
        }
    }

    fn person() -> FormInput {
        FormInput::new()
            .with("firstName", "Jane")
            .with("lastName", "Doe")
            .with("dateOfBirthYear", "1980")
            .with("dateOfBirthMonth", "5")
            .with("dateOfBirthDay", "1")
            .with("socialInsuranceNumber", "046 454 286")
    }

    fn ontario_address() -> FormInput {
        FormInput::new()
            .with("address", "123 Main St")
            .with("city", "Ottawa")
            .with("provinceId", "ON")
            .with("postalCode", "k1a0b1")
            .with("countryId", "CAN")
    }

    #[test]
    fn test_terms_require_every_acknowledgement() {
        let errors = terms_and_conditions(&FormInput::new().with("acknowledgeTerms", "yes"))
            .unwrap_err();
        assert!(!errors.has("acknowledgeTerms"));
        assert!(errors.has("acknowledgePrivacy"));
        assert!(errors.has("shareData"));
    }

    #[test]
    fn test_type_of_application_parses_slug() {
        let form = FormInput::new().with("typeOfApplication", "adult-child");
        assert_eq!(type_of_application(&form).unwrap(), TypeOfApplication::AdultChild);

        let form = FormInput::new().with("typeOfApplication", "spouse");
        let errors = type_of_application(&form).unwrap_err();
        assert_eq!(errors.get("typeOfApplication"), &[ErrorCode::Invalid]);
    }

    #[test]
    fn test_applicant_information_valid() {
        let state = FlowState::new(FlowId::new());
        let info = applicant_information(&ctx(&state, FlowKind::Apply), &person()).unwrap();
        assert_eq!(info.social_insurance_number, "046454286");
        assert_eq!(info.date_of_birth, NaiveDate::from_ymd_opt(1980, 5, 1).unwrap());
        assert_eq!(info.client_number, None);
    }

    #[test]
    fn test_renewal_requires_client_number() {
        let state = FlowState::new(FlowId::new());
        let errors =
            applicant_information(&ctx(&state, FlowKind::Renew), &person()).unwrap_err();
        assert_eq!(errors.get("clientNumber"), &[ErrorCode::Required]);

        let form = person().with("clientNumber", "1234 5678 901");
        let info = applicant_information(&ctx(&state, FlowKind::ProtectedRenew), &form).unwrap();
        assert_eq!(info.client_number.as_deref(), Some("12345678901"));
    }

    #[test]
    fn test_partner_cannot_reuse_applicant_sin() {
        let mut state = FlowState::new(FlowId::new());
        let applicant = applicant_information(&ctx(&state, FlowKind::Apply), &person()).unwrap();
        state.applicant_information = Some(applicant);

        let form = person().with("consent", "yes");
        let errors = partner_information(&ctx(&state, FlowKind::Apply), &form).unwrap_err();
        assert_eq!(errors.get("socialInsuranceNumber"), &[ErrorCode::SinNotUnique]);

        let form = form.with("socialInsuranceNumber", "123456782");
        assert!(partner_information(&ctx(&state, FlowKind::Apply), &form).is_ok());
    }

    #[test]
    fn test_contact_email_must_be_confirmed() {
        let form = FormInput::new()
            .with("phoneNumber", "613-555-0100")
            .with("email", "Jane@Example.ca")
            .with("confirmEmail", "jane@example.com");
        let errors = contact_information(&form).unwrap_err();
        assert_eq!(errors.get("confirmEmail"), &[ErrorCode::EmailMismatch]);

        let form = form.with("confirmEmail", "JANE@example.ca");
        let contact = contact_information(&form).unwrap();
        assert_eq!(contact.email.as_deref(), Some("jane@example.ca"));
        assert_eq!(contact.phone_number_alt, None);
    }

    #[test]
    fn test_address_normalizes_canadian_postal_code() {
        let state = FlowState::new(FlowId::new());
        let address = address(&ctx(&state, FlowKind::Apply), &ontario_address()).unwrap();
        assert_eq!(address.postal_code.as_deref(), Some("K1A 0B1"));
        assert_eq!(address.province_id.as_deref(), Some("ON"));
    }

    #[test]
    fn test_address_membership_checks() {
        let state = FlowState::new(FlowId::new());
        let form = ontario_address().with("provinceId", "US-NY");
        let errors = address(&ctx(&state, FlowKind::Apply), &form).unwrap_err();
        assert_eq!(errors.get("provinceId"), &[ErrorCode::Invalid]);

        let form = ontario_address().with("countryId", "ATL");
        let errors = address(&ctx(&state, FlowKind::Apply), &form).unwrap_err();
        assert_eq!(errors.get("countryId"), &[ErrorCode::Invalid]);
    }

    #[test]
    fn test_foreign_address_needs_no_province() {
        let state = FlowState::new(FlowId::new());
        let form = FormInput::new()
            .with("address", "1 Rue de Rivoli")
            .with("city", "Paris")
            .with("countryId", "FRA");
        let address = address(&ctx(&state, FlowKind::Apply), &form).unwrap();
        assert_eq!(address.province_id, None);
        assert_eq!(address.postal_code, None);
    }

    #[test]
    fn test_home_address_copies_mailing() {
        let mut state = FlowState::new(FlowId::new());
        let form = FormInput::new().with("sameAsMailing", "yes");
        let errors = home_address(&ctx(&state, FlowKind::Apply), &form).unwrap_err();
        assert!(errors.has("sameAsMailing"));

        let mailing = address(&ctx(&state, FlowKind::Apply), &ontario_address()).unwrap();
        state.mailing_address = Some(mailing.clone());
        assert_eq!(home_address(&ctx(&state, FlowKind::Apply), &form).unwrap(), mailing);
    }

    #[test]
    fn test_email_preference_needs_email_address() {
        let mut state = FlowState::new(FlowId::new());
        let form = FormInput::new()
            .with("preferredLanguage", "fr")
            .with("preferredMethod", "email");
        let errors = communication_preferences(&ctx(&state, FlowKind::Apply), &form).unwrap_err();
        assert_eq!(errors.get("preferredMethod"), &[ErrorCode::EmailRequired]);

        state.contact_information = Some(ContactInformation {
            email: Some("jane@example.ca".to_string()),
            ..ContactInformation::default()
        });
        let prefs = communication_preferences(&ctx(&state, FlowKind::Apply), &form).unwrap();
        assert_eq!(prefs.preferred_language, PreferredLanguage::Fr);
    }

    #[test]
    fn test_dental_benefits_requires_program_when_yes() {
        let state = FlowState::new(FlowId::new());
        let form = FormInput::new()
            .with("hasFederalBenefits", "yes")
            .with("hasProvincialTerritorialBenefits", "yes")
            .with("province", "ON");
        let errors = dental_benefits(&ctx(&state, FlowKind::Apply), &form).unwrap_err();
        assert_eq!(errors.get("federalSocialProgram"), &[ErrorCode::Required]);
        assert_eq!(
            errors.get("provincialTerritorialSocialProgram"),
            &[ErrorCode::Required]
        );

        let form = form
            .with("federalSocialProgram", "NIHB")
            .with("provincialTerritorialSocialProgram", "QC-RAMQ");
        let errors = dental_benefits(&ctx(&state, FlowKind::Apply), &form).unwrap_err();
        assert_eq!(
            errors.get("provincialTerritorialSocialProgram"),
            &[ErrorCode::Invalid]
        );
    }

    #[test]
    fn test_dental_benefits_drops_program_when_no() {
        let state = FlowState::new(FlowId::new());
        let form = FormInput::new()
            .with("hasFederalBenefits", "no")
            .with("federalSocialProgram", "NIHB")
            .with("hasProvincialTerritorialBenefits", "no")
            .with("province", "ON")
            .with("provincialTerritorialSocialProgram", "ON-HSO");
        let benefits = dental_benefits(&ctx(&state, FlowKind::Apply), &form).unwrap();
        assert_eq!(benefits, DentalBenefits::default());
    }

    #[test]
    fn test_child_sin_unique_against_siblings_but_not_self() {
        let mut state = FlowState::new(FlowId::new());
        let mut first = ChildState::new();
        let form = person()
            .with("isParent", "yes")
            .with("hasSocialInsuranceNumber", "yes")
            .with("socialInsuranceNumber", "800000002")
            .with("dateOfBirthYear", "2015");
        first.information =
            Some(child_information(&ctx(&state, FlowKind::Apply), first.id, &form).unwrap());
        let second = ChildState::new();
        state.children = vec![first.clone(), second.clone()];

        assert!(child_information(&ctx(&state, FlowKind::Apply), first.id, &form).is_ok());
        let errors =
            child_information(&ctx(&state, FlowKind::Apply), second.id, &form).unwrap_err();
        assert_eq!(errors.get("socialInsuranceNumber"), &[ErrorCode::SinNotUnique]);
    }

    #[test]
    fn test_child_without_sin() {
        let state = FlowState::new(FlowId::new());
        let form = person()
            .with("isParent", "no")
            .with("hasSocialInsuranceNumber", "no");
        let info = child_information(&ctx(&state, FlowKind::Apply), Uuid::new_v4(), &form).unwrap();
        assert!(!info.is_parent);
        assert_eq!(info.social_insurance_number, None);
    }

    #[test]
    fn test_children_complete() {
        let mut state = FlowState::new(FlowId::new());
        let errors = children_complete(&ctx(&state, FlowKind::Apply)).unwrap_err();
        assert_eq!(errors.get("children"), &[ErrorCode::ChildrenRequired]);

        state.children = vec![ChildState::new()];
        let errors = children_complete(&ctx(&state, FlowKind::Apply)).unwrap_err();
        assert_eq!(errors.get("children.1"), &[ErrorCode::ChildIncomplete]);
    }
}
