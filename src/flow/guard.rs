//! Step ordering and terminal-state sealing.

use chrono::NaiveDate;

use super::children;
use super::outcome::{FlowOutcome, Redirect, RedirectReason, RouteTarget};
use super::state::{FlowState, StateField};
use super::variant::{FlowVariant, Step, StepScope};

/// Decides whether a step may be shown or submitted for a given state.
///
/// Independent of any step's own field validation. Checks, in order: the
/// flow-type discriminator, the terminal marker, and for the review step the
/// ordered prerequisite list.
pub struct FlowGuard<'a> {
    variant: Option<&'a FlowVariant>,
    today: NaiveDate,
}

impl<'a> FlowGuard<'a> {
    /// `variant` is `None` for flow-level steps reached before a type is chosen
    pub fn new(variant: Option<&'a FlowVariant>, today: NaiveDate) -> Self {
        Self { variant, today }
    }

    pub fn check(&self, state: &FlowState, step: Step) -> FlowOutcome<()> {
        match self.evaluate(state, step) {
            None => FlowOutcome::Proceed(()),
            Some(redirect) => {
                tracing::warn!(
                    flow_id = %state.id,
                    from = step.slug(),
                    to = %redirect.to,
                    reason = ?redirect.reason,
                    "Flow guard redirect"
                );
                FlowOutcome::Redirect(redirect)
            }
        }
    }

    fn evaluate(&self, state: &FlowState, step: Step) -> Option<Redirect> {
        if let Some(variant) = self.variant {
            if step.scope() != StepScope::Flow && !variant.supports_type(state.type_of_application)
            {
                return Some(Redirect::to_step(
                    RouteTarget::flow(Step::TypeOfApplication),
                    RedirectReason::UnsupportedType,
                ));
            }
        }

        if state.is_submitted() && step != Step::Confirmation {
            let target = match state.type_of_application {
                Some(applicant) => RouteTarget::variant(applicant, Step::Confirmation),
                None => RouteTarget::flow(Step::TypeOfApplication),
            };
            return Some(Redirect::to_step(target, RedirectReason::Submitted));
        }

        if !state.is_submitted() && step == Step::Confirmation {
            return Some(Redirect::to_step(
                RouteTarget::flow(Step::TermsAndConditions),
                RedirectReason::NotSubmitted,
            ));
        }

        if step == Step::Review {
            if let Some(target) = self.first_missing(state) {
                return Some(Redirect::to_step(
                    target,
                    RedirectReason::MissingPrerequisite,
                ));
            }
        }

        None
    }

    /// Owning step of the first required field still unset
    pub fn first_missing(&self, state: &FlowState) -> Option<RouteTarget> {
        let variant = self.variant?;

        for requirement in &variant.requirements {
            if !(requirement.when)(state) {
                continue;
            }

            if requirement.field == StateField::Children {
                if let Some(target) = self.first_incomplete_child(variant, state) {
                    return Some(target);
                }
                continue;
            }

            if !requirement.field.is_set(state) {
                return Some(match requirement.step.scope() {
                    StepScope::Flow => RouteTarget::flow(requirement.step),
                    _ => RouteTarget::variant(variant.applicant, requirement.step),
                });
            }

            // A minor cannot apply for themselves, whatever else is filled in
            if requirement.field == StateField::ApplicantInformation
                && variant.applicant.covers_applicant()
                && state.applicant_is_minor(self.today)
            {
                return Some(RouteTarget::variant(
                    variant.applicant,
                    Step::ParentOrGuardian,
                ));
            }
        }

        None
    }

    fn first_incomplete_child(&self, variant: &FlowVariant, state: &FlowState) -> Option<RouteTarget> {
        if state.children.is_empty() {
            return Some(RouteTarget::variant(variant.applicant, Step::Children));
        }

        state.children.iter().find_map(|child| {
            children::first_incomplete_step(child, self.today)
                .map(|step| RouteTarget::child(variant.applicant, step, child.id))
        })
    }
}
