//! Wizard step endpoints: start, flow-level steps and variant steps.

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Extension, Form, Json,
};

use crate::flow::navigation;
use crate::flow::state::Address;
use crate::flow::{Access, FlowVariant, RouteTarget, StateField, StatePatch, Step, StepScope};
use crate::locale::Locale;
use crate::rest::context::{proceed_or_redirect, FlowContext};
use crate::rest::dto::{AddressDialogView, StepView};
use crate::rest::error::{ApiError, ErrorResponse};
use crate::rest::session::Session;
use crate::rest::state::ApiState;
use crate::services::{resolve_address, AddressConfirmation, AddressDecision};
use crate::validation::steps::{self, StepContext};
use crate::validation::{FormAction, FormInput};

/// Addresses in this country go through the validation service
const CANADA: &str = "CAN";

/// Back link target, or out of the wizard from its first page
fn back(ctx: &FlowContext, id: &str, target: Option<RouteTarget>) -> Response {
    match target {
        Some(target) => ctx.go(id, &target),
        None => ctx.leave(),
    }
}

/// Start a new flow
#[utoipa::path(
    get,
    path = "/{lang}/{kind}/start",
    tag = "Wizard",
    params(
        ("lang" = String, Path, description = "Locale (`en` or `fr`)"),
        ("kind" = String, Path, description = "Flow kind (`apply`, `renew`, `protected-renew`)")
    ),
    responses(
        (status = 303, description = "Redirect to the first step of the new flow"),
        (status = 404, description = "Unknown or disabled flow kind", body = ErrorResponse)
    )
)]
pub async fn start(
    State(api): State<ApiState>,
    Extension(locale): Extension<Locale>,
    Extension(session): Extension<Session>,
    Path(kind): Path<String>,
) -> Result<Response, ApiError> {
    let ctx = FlowContext::new(api, locale, &kind, session)?;
    let (state, first) = ctx.service().start()?;
    Ok(ctx.go(&state.id.to_string(), &first))
}

/// Show a flow-level step (terms, type of application, delegate exit)
#[utoipa::path(
    get,
    path = "/{lang}/{kind}/{id}/{step}",
    tag = "Wizard",
    params(
        ("lang" = String, Path, description = "Locale (`en` or `fr`)"),
        ("kind" = String, Path, description = "Flow kind"),
        ("id" = String, Path, description = "Flow id (UUID)"),
        ("step" = String, Path, description = "Flow-level step")
    ),
    responses(
        (status = 200, description = "Step view", body = StepView),
        (status = 303, description = "Redirect to the fallback page or the expected step"),
        (status = 404, description = "Unknown flow kind or step", body = ErrorResponse)
    )
)]
pub async fn show_flow_step(
    State(api): State<ApiState>,
    Extension(locale): Extension<Locale>,
    Extension(session): Extension<Session>,
    Path((kind, id, step)): Path<(String, String, String)>,
) -> Result<Response, ApiError> {
    let ctx = FlowContext::new(api, locale, &kind, session)?;
    let step = ctx.step(None, StepScope::Flow, &step)?;

    let state = proceed_or_redirect!(
        ctx,
        &id,
        ctx.service().enter(&id, None, step, Access::Read)?
    );

    let back = navigation::previous(None, step, &state);
    Ok(Json(ctx.view(&id, &state, None, step, back)?).into_response())
}

/// Submit a flow-level step
#[utoipa::path(
    post,
    path = "/{lang}/{kind}/{id}/{step}",
    tag = "Wizard",
    params(
        ("lang" = String, Path, description = "Locale (`en` or `fr`)"),
        ("kind" = String, Path, description = "Flow kind"),
        ("id" = String, Path, description = "Flow id (UUID)"),
        ("step" = String, Path, description = "Flow-level step")
    ),
    responses(
        (status = 303, description = "Saved; redirect to the next step"),
        (status = 400, description = "Field validation failed", body = ErrorResponse),
        (status = 403, description = "CSRF token missing or wrong", body = ErrorResponse),
        (status = 404, description = "Unknown flow kind or step", body = ErrorResponse)
    )
)]
pub async fn submit_flow_step(
    State(api): State<ApiState>,
    Extension(locale): Extension<Locale>,
    Extension(session): Extension<Session>,
    Path((kind, id, step)): Path<(String, String, String)>,
    Form(form): Form<FormInput>,
) -> Result<Response, ApiError> {
    let ctx = FlowContext::new(api, locale, &kind, session)?;
    ctx.verify_csrf(&form)?;
    let step = ctx.step(None, StepScope::Flow, &step)?;
    if step.is_exit_page() {
        return Err(ApiError::BadRequest(format!(
            "Step '{}' does not take a form",
            step.slug()
        )));
    }

    let service = ctx.service();
    let state = proceed_or_redirect!(ctx, &id, service.enter(&id, None, step, Access::Write)?);

    match form.action() {
        FormAction::Back => return Ok(back(&ctx, &id, navigation::previous(None, step, &state))),
        FormAction::Cancel => {
            if let Some(variant) = state
                .type_of_application
                .and_then(|applicant| FlowVariant::new(ctx.kind, applicant))
            {
                let target = proceed_or_redirect!(ctx, &id, service.cancel(&id, &variant, step)?);
                return Ok(ctx.go(&id, &target));
            }
        }
        FormAction::Continue => {}
    }

    let patch = match step {
        Step::TermsAndConditions => StatePatch::new().set(
            StateField::TermsAndConditions,
            steps::terms_and_conditions(&form)?,
        )?,
        Step::TypeOfApplication => StatePatch::new().set(
            StateField::TypeOfApplication,
            steps::type_of_application(&form)?,
        )?,
        _ => {
            return Err(ApiError::BadRequest(format!(
                "Step '{}' does not take a form",
                step.slug()
            )))
        }
    };

    let target = proceed_or_redirect!(ctx, &id, service.commit(&id, None, step, &state, patch)?);
    Ok(ctx.go(&id, &target))
}

/// Show a step of one variant; the review step also enters edit mode
#[utoipa::path(
    get,
    path = "/{lang}/{kind}/{id}/{variant}/{step}",
    tag = "Wizard",
    params(
        ("lang" = String, Path, description = "Locale (`en` or `fr`)"),
        ("kind" = String, Path, description = "Flow kind"),
        ("id" = String, Path, description = "Flow id (UUID)"),
        ("variant" = String, Path, description = "Applicant type (`adult`, `adult-child`, `child`)"),
        ("step" = String, Path, description = "Variant step")
    ),
    responses(
        (status = 200, description = "Step view", body = StepView),
        (status = 303, description = "Redirect to the fallback page or the expected step"),
        (status = 404, description = "Unknown flow kind, variant or step", body = ErrorResponse)
    )
)]
pub async fn show_step(
    State(api): State<ApiState>,
    Extension(locale): Extension<Locale>,
    Extension(session): Extension<Session>,
    Path((kind, id, variant, step)): Path<(String, String, String, String)>,
) -> Result<Response, ApiError> {
    let ctx = FlowContext::new(api, locale, &kind, session)?;
    let variant = ctx.variant(&variant)?;
    let step = ctx.step(Some(&variant), StepScope::Variant, &step)?;
    let service = ctx.service();

    let state = if step == Step::Review {
        proceed_or_redirect!(ctx, &id, service.review(&id, &variant)?)
    } else {
        proceed_or_redirect!(
            ctx,
            &id,
            service.enter(&id, Some(&variant), step, Access::Read)?
        )
    };

    let back = navigation::previous(Some(&variant), step, &state);
    Ok(Json(ctx.view(&id, &state, Some(&variant), step, back)?).into_response())
}

/// Submit a step of one variant.
///
/// Posting the review step submits the application; posting the confirmation
/// step clears the flow and leaves the wizard.
#[utoipa::path(
    post,
    path = "/{lang}/{kind}/{id}/{variant}/{step}",
    tag = "Wizard",
    params(
        ("lang" = String, Path, description = "Locale (`en` or `fr`)"),
        ("kind" = String, Path, description = "Flow kind"),
        ("id" = String, Path, description = "Flow id (UUID)"),
        ("variant" = String, Path, description = "Applicant type"),
        ("step" = String, Path, description = "Variant step")
    ),
    responses(
        (status = 200, description = "Address needs confirmation", body = StepView),
        (status = 303, description = "Saved; redirect to the next step"),
        (status = 400, description = "Field validation failed", body = ErrorResponse),
        (status = 403, description = "CSRF token missing or wrong", body = ErrorResponse),
        (status = 404, description = "Unknown flow kind, variant or step", body = ErrorResponse)
    )
)]
pub async fn submit_step(
    State(api): State<ApiState>,
    Extension(locale): Extension<Locale>,
    Extension(session): Extension<Session>,
    Path((kind, id, variant, step)): Path<(String, String, String, String)>,
    Form(form): Form<FormInput>,
) -> Result<Response, ApiError> {
    let ctx = FlowContext::new(api, locale, &kind, session)?;
    ctx.verify_csrf(&form)?;
    let variant = ctx.variant(&variant)?;
    let step = ctx.step(Some(&variant), StepScope::Variant, &step)?;
    let service = ctx.service();

    match step {
        Step::Review => {
            let target = proceed_or_redirect!(ctx, &id, service.submit(&id, &variant)?);
            return Ok(ctx.go(&id, &target));
        }
        Step::Confirmation => {
            let exit = proceed_or_redirect!(ctx, &id, service.exit(&id, &variant)?);
            return Ok(ctx.redirect(&id, &exit));
        }
        _ if step.is_exit_page() => {
            return Err(ApiError::BadRequest(format!(
                "Step '{}' does not take a form",
                step.slug()
            )));
        }
        _ => {}
    }

    let state = proceed_or_redirect!(
        ctx,
        &id,
        service.enter(&id, Some(&variant), step, Access::Write)?
    );

    match form.action() {
        FormAction::Back => {
            let previous = navigation::previous(Some(&variant), step, &state);
            return Ok(back(&ctx, &id, previous));
        }
        FormAction::Cancel => {
            let target = proceed_or_redirect!(ctx, &id, service.cancel(&id, &variant, step)?);
            return Ok(ctx.go(&id, &target));
        }
        FormAction::Continue => {}
    }

    let step_ctx = ctx.step_context(&state);
    let patch = if step == Step::MailingAddress {
        let entered = steps::address(&step_ctx, &form)?;
        match confirm_address(&ctx, entered, &form).await? {
            AddressDecision::Save(address) => {
                StatePatch::new().set(StateField::MailingAddress, address)?
            }
            AddressDecision::Confirm(dialog) => {
                let previous = navigation::previous(Some(&variant), step, &state);
                let mut view = ctx.view(&id, &state, Some(&variant), step, previous)?;
                view.address_dialog = Some(AddressDialogView::new(&dialog)?);
                return Ok(Json(view).into_response());
            }
        }
    } else {
        variant_patch(&step_ctx, step, &form)?
    };

    let target = proceed_or_redirect!(
        ctx,
        &id,
        service.commit(&id, Some(&variant), step, &state, patch)?
    );
    Ok(ctx.go(&id, &target))
}

/// Run the validation service on a Canadian address unless already confirmed
async fn confirm_address(
    ctx: &FlowContext,
    entered: Address,
    form: &FormInput,
) -> Result<AddressDecision, ApiError> {
    if entered.country_id != CANADA {
        return Ok(AddressDecision::Save(entered));
    }

    let confirmation = form
        .text(AddressConfirmation::FIELD)
        .and_then(AddressConfirmation::from_slug);
    let result = ctx.api.address_validator.validate(&entered).await?;
    Ok(resolve_address(entered, result, confirmation))
}

/// Validate a variant step's form into the patch it saves
fn variant_patch(
    ctx: &StepContext<'_>,
    step: Step,
    form: &FormInput,
) -> Result<StatePatch, ApiError> {
    let patch = StatePatch::new();
    let patch = match step {
        Step::ApplicantInformation => patch.set(
            StateField::ApplicantInformation,
            steps::applicant_information(ctx, form)?,
        )?,
        Step::MaritalStatus => {
            let status = steps::marital_status(form)?;
            let patch = patch.set(StateField::MaritalStatus, status)?;
            // partner details only exist alongside a status that needs them
            if status.requires_partner() {
                patch
            } else {
                patch.clear(StateField::PartnerInformation)
            }
        }
        Step::PartnerInformation => patch.set(
            StateField::PartnerInformation,
            steps::partner_information(ctx, form)?,
        )?,
        Step::ContactInformation => patch.set(
            StateField::ContactInformation,
            steps::contact_information(form)?,
        )?,
        Step::MailingAddress => {
            patch.set(StateField::MailingAddress, steps::address(ctx, form)?)?
        }
        Step::HomeAddress => {
            patch.set(StateField::HomeAddress, steps::home_address(ctx, form)?)?
        }
        Step::CommunicationPreferences => patch.set(
            StateField::CommunicationPreferences,
            steps::communication_preferences(ctx, form)?,
        )?,
        Step::DentalInsurance => {
            patch.set(StateField::DentalInsurance, steps::dental_insurance(form)?)?
        }
        Step::DentalBenefits => patch.set(
            StateField::DentalBenefits,
            steps::dental_benefits(ctx, form)?,
        )?,
        Step::Children => {
            steps::children_complete(ctx)?;
            patch
        }
        _ => {
            return Err(ApiError::BadRequest(format!(
                "Step '{}' does not take a form",
                step.slug()
            )))
        }
    };
    Ok(patch)
}
