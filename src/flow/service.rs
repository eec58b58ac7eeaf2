//! Per-request flow operations: load, guard, persist, navigate.

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::proceed;

use super::children::{self, SingleChildState};
use super::error::FlowError;
use super::guard::FlowGuard;
use super::manager::FlowStateManager;
use super::navigation;
use super::outcome::{FlowOutcome, Redirect, RedirectReason, RouteTarget};
use super::state::{ChildState, FlowState, StateField, StatePatch, SubmissionInfo};
use super::variant::{FlowKind, FlowVariant, Step, StepScope};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

/// The operations a step handler performs, composed from the manager, the
/// guard and the navigation rules.
///
/// `today` drives every age-dependent decision so one request sees a single
/// consistent date.
pub struct FlowService<'a> {
    manager: FlowStateManager<'a>,
    today: NaiveDate,
}

impl<'a> FlowService<'a> {
    pub fn new(manager: FlowStateManager<'a>, today: NaiveDate) -> Self {
        Self { manager, today }
    }

    pub fn manager(&self) -> &FlowStateManager<'a> {
        &self.manager
    }

    pub fn kind(&self) -> FlowKind {
        self.manager.kind()
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Start a fresh flow; returns its state and the first step
    pub fn start(&self) -> Result<(FlowState, RouteTarget), FlowError> {
        let state = self.manager.start(None, &StatePatch::new())?;
        Ok((state, RouteTarget::flow(Step::TermsAndConditions)))
    }

    /// Load the flow and check that `step` may be shown or submitted.
    ///
    /// A write that gets redirected leaves edit mode, so an abandoned review
    /// edit does not trap the user on the review page.
    pub fn enter(
        &self,
        raw_id: &str,
        variant: Option<&FlowVariant>,
        step: Step,
        access: Access,
    ) -> Result<FlowOutcome<FlowState>, FlowError> {
        let state = proceed!(self.manager.load(raw_id)?);

        match FlowGuard::new(variant, self.today).check(&state, step) {
            FlowOutcome::Proceed(()) => Ok(FlowOutcome::Proceed(state)),
            FlowOutcome::Redirect(redirect) => {
                if access == Access::Write {
                    self.guard_write(raw_id, &state)?;
                }
                Ok(FlowOutcome::Redirect(redirect))
            }
        }
    }

    fn guard_write(&self, raw_id: &str, state: &FlowState) -> Result<(), FlowError> {
        if state.edit_mode {
            let _ = self
                .manager
                .save(raw_id, &StatePatch::new().edit_mode(false))?;
        }
        Ok(())
    }

    /// [`enter`](Self::enter) for a step of one child's sub-flow.
    ///
    /// The dental steps need the child's information, so a child without it
    /// is sent back to its information step.
    pub fn enter_child(
        &self,
        raw_id: &str,
        variant: &FlowVariant,
        raw_child_id: &str,
        step: Step,
        access: Access,
    ) -> Result<FlowOutcome<(FlowState, SingleChildState)>, FlowError> {
        let state = proceed!(self.enter(raw_id, Some(variant), step, access)?);
        let child = proceed!(children::get_single_child_state(
            &state,
            variant.applicant,
            raw_child_id
        ));

        if children::needs_information(&child.child, step) {
            tracing::warn!(
                flow_id = %state.id,
                child_id = %child.id(),
                from = step.slug(),
                "Child step reached before its information; redirecting"
            );
            if access == Access::Write {
                self.guard_write(raw_id, &state)?;
            }
            return Ok(FlowOutcome::Redirect(Redirect::to_step(
                RouteTarget::child(variant.applicant, Step::ChildInformation, child.id()),
                RedirectReason::MissingPrerequisite,
            )));
        }

        Ok(FlowOutcome::Proceed((state, child)))
    }

    /// Persist a validated step patch and pick the next stop.
    ///
    /// The patch carries the edit mode the step was entered with, so the
    /// navigation decision reads the post-save value.
    pub fn commit(
        &self,
        raw_id: &str,
        variant: Option<&FlowVariant>,
        step: Step,
        state: &FlowState,
        patch: StatePatch,
    ) -> Result<FlowOutcome<RouteTarget>, FlowError> {
        let patch = patch.edit_mode(state.edit_mode);
        let saved = proceed!(self.manager.save(raw_id, &patch)?);

        let next = match (variant, step.scope()) {
            (Some(variant), StepScope::Variant) => {
                navigation::next_after_save(variant, step, &saved, self.today)
            }
            _ => navigation::next_after_flow_step(self.kind(), step, &saved),
        };
        Ok(FlowOutcome::Proceed(next))
    }

    /// Replace one child with `update(child)` and pick the next stop
    pub fn commit_child(
        &self,
        raw_id: &str,
        variant: &FlowVariant,
        step: Step,
        state: &FlowState,
        child: &SingleChildState,
        update: impl FnOnce(&ChildState) -> ChildState,
    ) -> Result<FlowOutcome<RouteTarget>, FlowError> {
        let updated = children::update_child(&state.children, child.id(), update);
        let information = updated
            .iter()
            .find(|c| c.id == child.id())
            .and_then(|c| c.information.clone());

        proceed!(self
            .manager
            .save(raw_id, &StatePatch::new().children(&updated)?)?);

        Ok(FlowOutcome::Proceed(navigation::next_after_child_save(
            variant,
            step,
            child,
            information.as_ref(),
            self.today,
        )))
    }

    /// Append a blank child and open its information step
    pub fn add_child(
        &self,
        raw_id: &str,
        variant: &FlowVariant,
    ) -> Result<FlowOutcome<RouteTarget>, FlowError> {
        let state = proceed!(self.enter(raw_id, Some(variant), Step::Children, Access::Write)?);
        let (updated, id) = children::add_child(&state.children);

        proceed!(self
            .manager
            .save(raw_id, &StatePatch::new().children(&updated)?)?);

        tracing::info!(flow_id = %state.id, child_id = %id, "Child added");
        Ok(FlowOutcome::Proceed(RouteTarget::child(
            variant.applicant,
            Step::ChildInformation,
            id,
        )))
    }

    /// Drop a child; `step` is the page the removal was requested from
    pub fn remove_child(
        &self,
        raw_id: &str,
        variant: &FlowVariant,
        raw_child_id: &str,
        step: Step,
    ) -> Result<FlowOutcome<RouteTarget>, FlowError> {
        let (state, child) =
            proceed!(self.enter_child(raw_id, variant, raw_child_id, step, Access::Write)?);
        let updated = children::remove_child(&state.children, child.id());

        proceed!(self
            .manager
            .save(raw_id, &StatePatch::new().children(&updated)?)?);

        tracing::info!(flow_id = %state.id, child_id = %child.id(), "Child removed");
        let back = if state.edit_mode { Step::Review } else { Step::Children };
        Ok(FlowOutcome::Proceed(RouteTarget::variant(variant.applicant, back)))
    }

    /// Leave a step without saving and return to review
    pub fn cancel(
        &self,
        raw_id: &str,
        variant: &FlowVariant,
        step: Step,
    ) -> Result<FlowOutcome<RouteTarget>, FlowError> {
        proceed!(self.enter(raw_id, Some(variant), step, Access::Write)?);
        proceed!(self
            .manager
            .save(raw_id, &StatePatch::new().edit_mode(false))?);
        Ok(FlowOutcome::Proceed(RouteTarget::variant(
            variant.applicant,
            Step::Review,
        )))
    }

    /// Show the review page, switching the flow into edit mode
    pub fn review(
        &self,
        raw_id: &str,
        variant: &FlowVariant,
    ) -> Result<FlowOutcome<FlowState>, FlowError> {
        let state = proceed!(self.enter(raw_id, Some(variant), Step::Review, Access::Read)?);
        if state.edit_mode {
            return Ok(FlowOutcome::Proceed(state));
        }
        self.manager
            .save(raw_id, &StatePatch::new().edit_mode(true))
    }

    /// Seal the flow with a confirmation code
    pub fn submit(
        &self,
        raw_id: &str,
        variant: &FlowVariant,
    ) -> Result<FlowOutcome<RouteTarget>, FlowError> {
        proceed!(self.enter(raw_id, Some(variant), Step::Review, Access::Write)?);

        let submission = SubmissionInfo {
            confirmation_code: confirmation_code(),
            submitted_on: Utc::now(),
        };
        let patch = StatePatch::new()
            .set(StateField::SubmissionInfo, &submission)?
            .edit_mode(false);
        let saved = proceed!(self.manager.save(raw_id, &patch)?);

        tracing::info!(
            flow_id = %saved.id,
            variant = %variant.name(),
            confirmation_code = %submission.confirmation_code,
            "Flow submitted"
        );
        Ok(FlowOutcome::Proceed(RouteTarget::variant(
            variant.applicant,
            Step::Confirmation,
        )))
    }

    /// Clear the sealed flow and leave the wizard
    pub fn exit(
        &self,
        raw_id: &str,
        variant: &FlowVariant,
    ) -> Result<FlowOutcome<Redirect>, FlowError> {
        proceed!(self.enter(raw_id, Some(variant), Step::Confirmation, Access::Write)?);
        proceed!(self.manager.clear(raw_id)?);
        Ok(FlowOutcome::Proceed(Redirect::external(
            self.manager.fallback_url(),
            RedirectReason::Navigation,
        )))
    }
}

fn confirmation_code() -> String {
    Uuid::new_v4().simple().to_string()[..12].to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::state::{
        Address, ApplicantInformation, CommunicationPreferences, ContactInformation,
        DentalBenefits, MaritalStatus, PreferredLanguage, PreferredMethod, TermsAndConditions,
        TypeOfApplication,
    };
    use crate::session::{InMemorySession, SessionStore};

    const FALLBACK: &str = "https://example.gc.ca/dental";

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn service(store: &InMemorySession) -> FlowService<'_> {
        FlowService::new(FlowStateManager::new(store, FlowKind::Apply, FALLBACK), today())
    }

    fn adult() -> FlowVariant {
        FlowVariant::new(FlowKind::Apply, TypeOfApplication::Adult).unwrap()
    }

    fn started(service: &FlowService<'_>, applicant: TypeOfApplication) -> String {
        let (state, _) = service.start().unwrap();
        let id = state.id.to_string();
        let patch = StatePatch::new()
            .set(
                StateField::TermsAndConditions,
                TermsAndConditions {
                    acknowledge_terms: true,
                    acknowledge_privacy: true,
                    share_data: true,
                },
            )
            .unwrap()
            .set(StateField::TypeOfApplication, applicant)
            .unwrap();
        let _ = service.manager().save(&id, &patch).unwrap();
        id
    }

    #[test]
    fn test_start_points_at_terms() {
        let store = InMemorySession::new("s");
        let (state, first) = service(&store).start().unwrap();
        assert_eq!(first, RouteTarget::flow(Step::TermsAndConditions));
        assert!(store.has(&format!("apply-flow-{}", state.id)));
    }

    #[test]
    fn test_commit_moves_linearly() {
        let store = InMemorySession::new("s");
        let service = service(&store);
        let id = started(&service, TypeOfApplication::Adult);
        let variant = adult();

        let state = service
            .enter(&id, Some(&variant), Step::MaritalStatus, Access::Write)
            .unwrap()
            .into_value()
            .unwrap();
        let patch = StatePatch::new()
            .set(StateField::MaritalStatus, MaritalStatus::Single)
            .unwrap();
        let next = service
            .commit(&id, Some(&variant), Step::MaritalStatus, &state, patch)
            .unwrap();
        assert_eq!(
            next,
            FlowOutcome::Proceed(RouteTarget::variant(
                TypeOfApplication::Adult,
                Step::ContactInformation
            ))
        );
    }

    #[test]
    fn test_redirected_write_leaves_edit_mode() {
        let store = InMemorySession::new("s");
        let service = service(&store);
        let id = started(&service, TypeOfApplication::Adult);
        let _ = service
            .manager()
            .save(&id, &StatePatch::new().edit_mode(true))
            .unwrap();

        let child_variant = FlowVariant::new(FlowKind::Apply, TypeOfApplication::Child).unwrap();
        let outcome = service
            .enter(&id, Some(&child_variant), Step::MaritalStatus, Access::Write)
            .unwrap();
        assert!(outcome.is_redirect());

        let state = service.manager().load(&id).unwrap().into_value().unwrap();
        assert!(!state.edit_mode);
    }

    #[test]
    fn test_redirected_read_keeps_edit_mode() {
        let store = InMemorySession::new("s");
        let service = service(&store);
        let id = started(&service, TypeOfApplication::Adult);
        let _ = service
            .manager()
            .save(&id, &StatePatch::new().edit_mode(true))
            .unwrap();

        let outcome = service
            .enter(&id, Some(&adult()), Step::Confirmation, Access::Read)
            .unwrap();
        assert!(outcome.is_redirect());
        let state = service.manager().load(&id).unwrap().into_value().unwrap();
        assert!(state.edit_mode);
    }

    #[test]
    fn test_cancel_clears_edit_mode() {
        let store = InMemorySession::new("s");
        let service = service(&store);
        let id = started(&service, TypeOfApplication::Adult);
        let _ = service
            .manager()
            .save(&id, &StatePatch::new().edit_mode(true))
            .unwrap();

        let next = service.cancel(&id, &adult(), Step::MaritalStatus).unwrap();
        assert_eq!(
            next,
            FlowOutcome::Proceed(RouteTarget::variant(TypeOfApplication::Adult, Step::Review))
        );
        let state = service.manager().load(&id).unwrap().into_value().unwrap();
        assert!(!state.edit_mode);
    }

    #[test]
    fn test_child_add_and_remove() {
        let store = InMemorySession::new("s");
        let service = service(&store);
        let id = started(&service, TypeOfApplication::Child);
        let variant = FlowVariant::new(FlowKind::Apply, TypeOfApplication::Child).unwrap();

        let target = service.add_child(&id, &variant).unwrap().into_value().unwrap();
        let child_id = target.child_id.unwrap();
        assert_eq!(target.step, Step::ChildInformation);

        let state = service.manager().load(&id).unwrap().into_value().unwrap();
        assert_eq!(state.children.len(), 1);

        let back = service
            .remove_child(&id, &variant, &child_id.to_string(), Step::ChildInformation)
            .unwrap()
            .into_value()
            .unwrap();
        assert_eq!(back, RouteTarget::variant(TypeOfApplication::Child, Step::Children));
        let state = service.manager().load(&id).unwrap().into_value().unwrap();
        assert!(state.children.is_empty());
    }

    #[test]
    fn test_submit_requires_prerequisites() {
        let store = InMemorySession::new("s");
        let service = service(&store);
        let id = started(&service, TypeOfApplication::Adult);

        let outcome = service.submit(&id, &adult()).unwrap();
        assert_eq!(
            outcome.redirect().unwrap().reason,
            RedirectReason::MissingPrerequisite
        );
        let state = service.manager().load(&id).unwrap().into_value().unwrap();
        assert!(!state.is_submitted());
    }

    fn applicant(born: NaiveDate) -> ApplicantInformation {
        ApplicantInformation {
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            date_of_birth: born,
            social_insurance_number: "046454286".to_string(),
            client_number: None,
        }
    }

    #[test]
    fn test_review_after_partial_saves_redirects_to_first_gap() {
        let store = InMemorySession::new("s");
        let service = service(&store);
        let seed = StatePatch::new()
            .set(
                StateField::TermsAndConditions,
                TermsAndConditions {
                    acknowledge_terms: true,
                    acknowledge_privacy: true,
                    share_data: true,
                },
            )
            .unwrap()
            .set(StateField::TypeOfApplication, TypeOfApplication::Adult)
            .unwrap()
            .set(
                StateField::ApplicantInformation,
                applicant(NaiveDate::from_ymd_opt(1980, 5, 1).unwrap()),
            )
            .unwrap();
        let id = "11111111-1111-1111-1111-111111111111";
        let state = service.manager().start(Some(id), &seed).unwrap();
        assert_eq!(state.id.to_string(), id);

        let marital = StatePatch::new()
            .set(StateField::MaritalStatus, MaritalStatus::Single)
            .unwrap();
        assert!(!service.manager().save(id, &marital).unwrap().is_redirect());
        let insurance = StatePatch::new()
            .set(StateField::DentalInsurance, true)
            .unwrap();
        assert!(!service.manager().save(id, &insurance).unwrap().is_redirect());

        let outcome = service.review(id, &adult()).unwrap();
        let redirect = outcome.redirect().expect("review should redirect");
        assert_eq!(redirect.reason, RedirectReason::MissingPrerequisite);
        assert_eq!(
            redirect.target(),
            Some(&RouteTarget::variant(
                TypeOfApplication::Adult,
                Step::ContactInformation
            ))
        );
        let state = service.manager().load(id).unwrap().into_value().unwrap();
        assert!(!state.edit_mode);
    }

    #[test]
    fn test_submit_refused_for_minor_applicant() {
        let store = InMemorySession::new("s");
        let service = service(&store);
        let id = started(&service, TypeOfApplication::Adult);
        let address = Address {
            address: "123 Main St".to_string(),
            apartment: None,
            city: "Ottawa".to_string(),
            province_id: Some("ON".to_string()),
            postal_code: Some("K1A 0B1".to_string()),
            country_id: "CAN".to_string(),
        };
        let patch = StatePatch::new()
            .set(
                StateField::ApplicantInformation,
                applicant(NaiveDate::from_ymd_opt(2016, 1, 1).unwrap()),
            )
            .unwrap()
            .set(StateField::MaritalStatus, MaritalStatus::Single)
            .unwrap()
            .set(StateField::ContactInformation, ContactInformation::default())
            .unwrap()
            .set(StateField::MailingAddress, &address)
            .unwrap()
            .set(StateField::HomeAddress, &address)
            .unwrap()
            .set(
                StateField::CommunicationPreferences,
                CommunicationPreferences {
                    preferred_language: PreferredLanguage::En,
                    preferred_method: PreferredMethod::Mail,
                },
            )
            .unwrap()
            .set(StateField::DentalInsurance, false)
            .unwrap()
            .set(StateField::DentalBenefits, DentalBenefits::default())
            .unwrap();
        let _ = service.manager().save(&id, &patch).unwrap();

        let outcome = service.submit(&id, &adult()).unwrap();
        assert_eq!(
            outcome.redirect().unwrap().target(),
            Some(&RouteTarget::variant(
                TypeOfApplication::Adult,
                Step::ParentOrGuardian
            ))
        );
        let state = service.manager().load(&id).unwrap().into_value().unwrap();
        assert!(!state.is_submitted());
    }

    #[test]
    fn test_child_dental_steps_need_information_first() {
        let store = InMemorySession::new("s");
        let service = service(&store);
        let id = started(&service, TypeOfApplication::Child);
        let variant = FlowVariant::new(FlowKind::Apply, TypeOfApplication::Child).unwrap();
        let child_id = service
            .add_child(&id, &variant)
            .unwrap()
            .into_value()
            .unwrap()
            .child_id
            .unwrap();
        let expected = RouteTarget::child(TypeOfApplication::Child, Step::ChildInformation, child_id);

        for (step, access) in [
            (Step::ChildDentalInsurance, Access::Read),
            (Step::ChildDentalInsurance, Access::Write),
            (Step::ChildDentalBenefits, Access::Write),
        ] {
            let outcome = service
                .enter_child(&id, &variant, &child_id.to_string(), step, access)
                .unwrap();
            assert_eq!(outcome.redirect().unwrap().target(), Some(&expected));
        }

        let outcome = service
            .enter_child(
                &id,
                &variant,
                &child_id.to_string(),
                Step::ChildInformation,
                Access::Read,
            )
            .unwrap();
        assert!(!outcome.is_redirect());
    }

    #[test]
    fn test_confirmation_code_shape() {
        let code = confirmation_code();
        assert_eq!(code.len(), 12);
        assert!(code.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }
}
