//! Per-child sub-flow endpoints.

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Extension, Form, Json,
};

use crate::flow::children::SingleChildState;
use crate::flow::navigation;
use crate::flow::state::ChildState;
use crate::flow::{Access, FlowVariant, Step, StepScope};
use crate::locale::Locale;
use crate::rest::context::{proceed_or_redirect, FlowContext};
use crate::rest::dto::{ChildView, StepView};
use crate::rest::error::{ApiError, ErrorResponse};
use crate::rest::session::Session;
use crate::rest::state::ApiState;
use crate::validation::steps::{self, StepContext};
use crate::validation::{FormAction, FormInput};

fn child_variant(ctx: &FlowContext, slug: &str) -> Result<FlowVariant, ApiError> {
    let variant = ctx.variant(slug)?;
    if !variant.supports_children() {
        return Err(ApiError::NotFound(format!(
            "Variant '{}' has no children",
            variant.name()
        )));
    }
    Ok(variant)
}

/// Add a blank child and open its information step
#[utoipa::path(
    post,
    path = "/{lang}/{kind}/{id}/{variant}/children/add",
    tag = "Children",
    params(
        ("lang" = String, Path, description = "Locale (`en` or `fr`)"),
        ("kind" = String, Path, description = "Flow kind"),
        ("id" = String, Path, description = "Flow id (UUID)"),
        ("variant" = String, Path, description = "Applicant type (`adult-child` or `child`)")
    ),
    responses(
        (status = 303, description = "Redirect to the new child's information step"),
        (status = 403, description = "CSRF token missing or wrong", body = ErrorResponse),
        (status = 404, description = "Unknown flow kind or variant", body = ErrorResponse)
    )
)]
pub async fn add(
    State(api): State<ApiState>,
    Extension(locale): Extension<Locale>,
    Extension(session): Extension<Session>,
    Path((kind, id, variant)): Path<(String, String, String)>,
    Form(form): Form<FormInput>,
) -> Result<Response, ApiError> {
    let ctx = FlowContext::new(api, locale, &kind, session)?;
    ctx.verify_csrf(&form)?;
    let variant = child_variant(&ctx, &variant)?;

    let target = proceed_or_redirect!(ctx, &id, ctx.service().add_child(&id, &variant)?);
    Ok(ctx.go(&id, &target))
}

/// Remove a child from the children index
#[utoipa::path(
    post,
    path = "/{lang}/{kind}/{id}/{variant}/children/{child_id}/remove",
    tag = "Children",
    params(
        ("lang" = String, Path, description = "Locale (`en` or `fr`)"),
        ("kind" = String, Path, description = "Flow kind"),
        ("id" = String, Path, description = "Flow id (UUID)"),
        ("variant" = String, Path, description = "Applicant type"),
        ("child_id" = String, Path, description = "Child id (UUID)")
    ),
    responses(
        (status = 303, description = "Redirect to the children index, or review in edit mode"),
        (status = 403, description = "CSRF token missing or wrong", body = ErrorResponse),
        (status = 404, description = "Unknown flow kind or variant", body = ErrorResponse)
    )
)]
pub async fn remove(
    State(api): State<ApiState>,
    Extension(locale): Extension<Locale>,
    Extension(session): Extension<Session>,
    Path((kind, id, variant, child_id)): Path<(String, String, String, String)>,
    Form(form): Form<FormInput>,
) -> Result<Response, ApiError> {
    let ctx = FlowContext::new(api, locale, &kind, session)?;
    ctx.verify_csrf(&form)?;
    let variant = child_variant(&ctx, &variant)?;

    let target = proceed_or_redirect!(
        ctx,
        &id,
        ctx.service()
            .remove_child(&id, &variant, &child_id, Step::Children)?
    );
    Ok(ctx.go(&id, &target))
}

/// Show a step of one child's sub-flow
#[utoipa::path(
    get,
    path = "/{lang}/{kind}/{id}/{variant}/children/{child_id}/{step}",
    tag = "Children",
    params(
        ("lang" = String, Path, description = "Locale (`en` or `fr`)"),
        ("kind" = String, Path, description = "Flow kind"),
        ("id" = String, Path, description = "Flow id (UUID)"),
        ("variant" = String, Path, description = "Applicant type"),
        ("child_id" = String, Path, description = "Child id (UUID)"),
        ("step" = String, Path, description = "Child step")
    ),
    responses(
        (status = 200, description = "Step view with the child", body = StepView),
        (status = 303, description = "Redirect to the fallback page, children index or expected step"),
        (status = 404, description = "Unknown flow kind, variant or step", body = ErrorResponse)
    )
)]
pub async fn show_step(
    State(api): State<ApiState>,
    Extension(locale): Extension<Locale>,
    Extension(session): Extension<Session>,
    Path((kind, id, variant, child_id, step)): Path<(String, String, String, String, String)>,
) -> Result<Response, ApiError> {
    let ctx = FlowContext::new(api, locale, &kind, session)?;
    let variant = child_variant(&ctx, &variant)?;
    let step = ctx.step(Some(&variant), StepScope::Child, &step)?;

    let (state, child) = proceed_or_redirect!(
        ctx,
        &id,
        ctx.service()
            .enter_child(&id, &variant, &child_id, step, Access::Read)?
    );

    let back = navigation::previous_in_child(&variant, step, &child);
    let mut view = ctx.view(&id, &state, Some(&variant), step, Some(back))?;
    view.edit_mode = child.edit_mode;
    view.child = Some(ChildView::new(&child)?);
    Ok(Json(view).into_response())
}

/// Submit a step of one child's sub-flow.
///
/// Posting the cannot-apply step removes the child.
#[utoipa::path(
    post,
    path = "/{lang}/{kind}/{id}/{variant}/children/{child_id}/{step}",
    tag = "Children",
    params(
        ("lang" = String, Path, description = "Locale (`en` or `fr`)"),
        ("kind" = String, Path, description = "Flow kind"),
        ("id" = String, Path, description = "Flow id (UUID)"),
        ("variant" = String, Path, description = "Applicant type"),
        ("child_id" = String, Path, description = "Child id (UUID)"),
        ("step" = String, Path, description = "Child step")
    ),
    responses(
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
    Path((kind, id, variant, child_id, step)): Path<(String, String, String, String, String)>,
    Form(form): Form<FormInput>,
) -> Result<Response, ApiError> {
    let ctx = FlowContext::new(api, locale, &kind, session)?;
    ctx.verify_csrf(&form)?;
    let variant = child_variant(&ctx, &variant)?;
    let step = ctx.step(Some(&variant), StepScope::Child, &step)?;
    let service = ctx.service();

    if step == Step::ChildCannotApply {
        let target = proceed_or_redirect!(
            ctx,
            &id,
            service.remove_child(&id, &variant, &child_id, step)?
        );
        return Ok(ctx.go(&id, &target));
    }

    let (state, child) = proceed_or_redirect!(
        ctx,
        &id,
        service.enter_child(&id, &variant, &child_id, step, Access::Write)?
    );

    match form.action() {
        FormAction::Back => {
            let previous = navigation::previous_in_child(&variant, step, &child);
            return Ok(ctx.go(&id, &previous));
        }
        FormAction::Cancel => {
            let target = proceed_or_redirect!(ctx, &id, service.cancel(&id, &variant, step)?);
            return Ok(ctx.go(&id, &target));
        }
        FormAction::Continue => {}
    }

    let update = child_update(&ctx.step_context(&state), step, &child, &form)?;
    let target = proceed_or_redirect!(
        ctx,
        &id,
        service.commit_child(&id, &variant, step, &state, &child, |_| update)?
    );
    Ok(ctx.go(&id, &target))
}

/// Validate a child step's form into the child's new state
fn child_update(
    ctx: &StepContext<'_>,
    step: Step,
    child: &SingleChildState,
    form: &FormInput,
) -> Result<ChildState, ApiError> {
    let mut updated = child.child.clone();
    match step {
        Step::ChildInformation => {
            updated.information = Some(steps::child_information(ctx, child.id(), form)?);
        }
        Step::ChildDentalInsurance => {
            child.information()?;
            updated.dental_insurance = Some(steps::dental_insurance(form)?);
        }
        Step::ChildDentalBenefits => {
            child.information()?;
            updated.dental_benefits = Some(steps::dental_benefits(ctx, form)?);
        }
        _ => {
            return Err(ApiError::BadRequest(format!(
                "Step '{}' does not take a form",
                step.slug()
            )))
        }
    }
    Ok(updated)
}
