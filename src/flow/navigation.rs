//! Where a step goes after a successful save, and where "back" leads.

use chrono::NaiveDate;

use super::children::{self, SingleChildState};
use super::outcome::RouteTarget;
use super::state::{ChildInformation, FlowState};
use super::variant::{FlowKind, FlowVariant, Step};

/// Next stop after saving a flow-level step.
///
/// Choosing a type picks the variant every later route belongs to. Delegates
/// leave through their own exit page.
pub fn next_after_flow_step(kind: FlowKind, step: Step, state: &FlowState) -> RouteTarget {
    match step {
        Step::TermsAndConditions => RouteTarget::flow(Step::TypeOfApplication),
        _ => match state
            .type_of_application
            .and_then(|applicant| FlowVariant::new(kind, applicant))
        {
            Some(variant) if state.edit_mode => RouteTarget::variant(variant.applicant, Step::Review),
            Some(variant) => RouteTarget::variant(variant.applicant, variant.entry_step()),
            None => RouteTarget::flow(Step::ApplicationDelegate),
        },
    }
}

/// Next stop after saving a variant-level step.
///
/// `state` is the state after the save, so edit mode and the marital status
/// reflect what was just written.
pub fn next_after_save(
    variant: &FlowVariant,
    step: Step,
    state: &FlowState,
    today: NaiveDate,
) -> RouteTarget {
    let to = |step| RouteTarget::variant(variant.applicant, step);

    if step == Step::ApplicantInformation
        && variant.applicant.covers_applicant()
        && state.applicant_is_minor(today)
    {
        return to(Step::ParentOrGuardian);
    }

    if step == Step::Review {
        return to(Step::Confirmation);
    }

    if state.edit_mode {
        if step == Step::MaritalStatus
            && state.requires_partner()
            && state.partner_information.is_none()
        {
            return to(Step::PartnerInformation);
        }
        return to(Step::Review);
    }

    to(variant.next_linear(step, state).unwrap_or(Step::Review))
}

/// Next stop after saving a step of one child's sub-flow.
///
/// `child` is the child as it was before the save: a child added from the
/// review page walks its whole sub-flow even though the parent is in edit
/// mode.
pub fn next_after_child_save(
    variant: &FlowVariant,
    step: Step,
    child: &SingleChildState,
    information: Option<&ChildInformation>,
    today: NaiveDate,
) -> RouteTarget {
    let in_child = |step| RouteTarget::child(variant.applicant, step, child.id());
    let back_to = if child.edit_mode { Step::Review } else { Step::Children };

    match step {
        Step::ChildInformation => match information {
            Some(info) if !children::is_eligible(info, today) => in_child(Step::ChildCannotApply),
            _ if child.edit_mode => RouteTarget::variant(variant.applicant, Step::Review),
            _ => in_child(Step::ChildDentalInsurance),
        },
        Step::ChildDentalInsurance if !child.edit_mode => in_child(Step::ChildDentalBenefits),
        _ => RouteTarget::variant(variant.applicant, back_to),
    }
}

/// Back link for a step; `None` for the first page of the flow
pub fn previous(variant: Option<&FlowVariant>, step: Step, state: &FlowState) -> Option<RouteTarget> {
    match step {
        Step::TermsAndConditions => None,
        Step::TypeOfApplication => Some(RouteTarget::flow(Step::TermsAndConditions)),
        Step::ApplicationDelegate => Some(RouteTarget::flow(Step::TypeOfApplication)),
        _ => {
            let variant = variant?;
            let to = |step| RouteTarget::variant(variant.applicant, step);
            match step {
                Step::ParentOrGuardian => Some(to(Step::ApplicantInformation)),
                Step::Confirmation => None,
                _ => Some(
                    variant
                        .previous_linear(step, state)
                        .map(to)
                        .unwrap_or_else(|| RouteTarget::flow(Step::TypeOfApplication)),
                ),
            }
        }
    }
}

/// Back link inside a child's sub-flow
pub fn previous_in_child(variant: &FlowVariant, step: Step, child: &SingleChildState) -> RouteTarget {
    let in_child = |step| RouteTarget::child(variant.applicant, step, child.id());
    match step {
        Step::ChildDentalInsurance | Step::ChildCannotApply => in_child(Step::ChildInformation),
        Step::ChildDentalBenefits => in_child(Step::ChildDentalInsurance),
        _ => RouteTarget::variant(variant.applicant, Step::Children),
    }
}
