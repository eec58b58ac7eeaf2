//! Dependent children nested in a flow.
//!
//! Mutations never touch the collection in place: each one returns a new
//! `Vec` built by filtering or mapping over the old one, so structural
//! changes (add/remove) and content changes (information, benefits) compose
//! as successive whole-collection replacements.

use chrono::NaiveDate;
use uuid::Uuid;

use super::outcome::{FlowOutcome, Redirect, RedirectReason, RouteTarget};
use super::state::{AgeCategory, ChildInformation, ChildState, FlowState, TypeOfApplication};
use super::variant::Step;

/// Append a fresh child; returns the new collection and the child's id
pub fn add_child(children: &[ChildState]) -> (Vec<ChildState>, Uuid) {
    let child = ChildState::new();
    let id = child.id;
    let mut next = children.to_vec();
    next.push(child);
    (next, id)
}

/// Drop a child by id; unknown ids leave the collection unchanged
pub fn remove_child(children: &[ChildState], id: Uuid) -> Vec<ChildState> {
    children.iter().filter(|c| c.id != id).cloned().collect()
}

/// Replace the child with `id` by `f(child)`, leaving the others untouched
pub fn update_child(
    children: &[ChildState],
    id: Uuid,
    f: impl FnOnce(&ChildState) -> ChildState,
) -> Vec<ChildState> {
    let mut f = Some(f);
    children
        .iter()
        .map(|child| {
            if child.id == id {
                if let Some(update) = f.take() {
                    return update(child);
                }
            }
            child.clone()
        })
        .collect()
}

/// One child as seen by its own sub-flow
#[derive(Debug, Clone, PartialEq)]
pub struct SingleChildState {
    pub child: ChildState,
    /// 1-based position in the collection
    pub child_number: usize,
    /// No information entered yet
    pub is_new: bool,
    /// Parent's edit mode, except a new child is never mid-edit
    pub edit_mode: bool,
}

impl SingleChildState {
    pub fn id(&self) -> Uuid {
        self.child.id
    }

    /// Information for steps that come after the information step
    pub fn information(&self) -> Result<&ChildInformation, super::FlowError> {
        self.child.information.as_ref().ok_or_else(|| {
            super::FlowError::invariant(format!(
                "expected information to be defined for child {}",
                self.child.id
            ))
        })
    }
}

/// Look up a child from a route parameter.
///
/// Unknown or malformed ids redirect to the children index of the variant.
pub fn get_single_child_state(
    state: &FlowState,
    applicant: TypeOfApplication,
    raw_child_id: &str,
) -> FlowOutcome<SingleChildState> {
    let found = Uuid::try_parse(raw_child_id).ok().and_then(|id| {
        state
            .children
            .iter()
            .position(|c| c.id == id)
            .map(|index| (index, &state.children[index]))
    });

    let Some((index, child)) = found else {
        tracing::warn!(
            flow_id = %state.id,
            child_id = %raw_child_id,
            "Unknown child; redirecting to children index"
        );
        return FlowOutcome::Redirect(Redirect::to_step(
            RouteTarget::variant(applicant, Step::Children),
            RedirectReason::UnknownChild,
        ));
    };

    let is_new = child.information.is_none();
    FlowOutcome::Proceed(SingleChildState {
        child: child.clone(),
        child_number: index + 1,
        is_new,
        edit_mode: state.edit_mode && !is_new,
    })
}

/// Whether a child may be covered by this application.
///
/// The applicant must be the child's parent or guardian, and the child must
/// not be an adult or senior.
pub fn is_eligible(information: &ChildInformation, today: NaiveDate) -> bool {
    let category = AgeCategory::from_date_of_birth(information.date_of_birth, today);
    information.is_parent && matches!(category, AgeCategory::Children | AgeCategory::Youth)
}

/// Whether `step` comes after the information step and the child has none yet
pub fn needs_information(child: &ChildState, step: Step) -> bool {
    child.information.is_none()
        && matches!(step, Step::ChildDentalInsurance | Step::ChildDentalBenefits)
}

/// First step of this child's sub-flow that still needs an answer
pub fn first_incomplete_step(child: &ChildState, today: NaiveDate) -> Option<Step> {
    let Some(information) = &child.information else {
        return Some(Step::ChildInformation);
    };
    if !is_eligible(information, today) {
        return Some(Step::ChildCannotApply);
    }
    if child.dental_insurance.is_none() {
        return Some(Step::ChildDentalInsurance);
    }
    if child.dental_benefits.is_none() {
        return Some(Step::ChildDentalBenefits);
    }
    None
}
