//! Per-request wiring between the HTTP layer and the flow service.

use std::sync::Arc;

use axum::response::{IntoResponse, Response};

use crate::flow::{
    Destination, FlowKind, FlowService, FlowState, FlowStateManager, FlowVariant, Redirect,
    RouteTarget, Step, StepScope,
};
use crate::locale::Locale;
use crate::session::InMemorySession;
use crate::validation::steps::StepContext;
use crate::validation::FormInput;

use super::dto::StepView;
use super::error::ApiError;
use super::session::{self, Session};
use super::state::ApiState;

/// Return early with an HTTP redirect unless the outcome proceeds
macro_rules! proceed_or_redirect {
    ($ctx:expr, $id:expr, $outcome:expr) => {
        match $outcome {
            $crate::flow::FlowOutcome::Proceed(value) => value,
            $crate::flow::FlowOutcome::Redirect(redirect) => {
                return Ok($ctx.redirect($id, &redirect));
            }
        }
    };
}

pub(crate) use proceed_or_redirect;

/// One wizard request: which flow, in which language, for which session
pub struct FlowContext {
    pub api: ApiState,
    pub locale: Locale,
    pub kind: FlowKind,
    session: Arc<InMemorySession>,
}

impl FlowContext {
    /// Resolve the `kind` path segment; unknown or disabled kinds are 404
    pub fn new(
        api: ApiState,
        locale: Locale,
        kind_slug: &str,
        session: Session,
    ) -> Result<Self, ApiError> {
        let kind = FlowKind::from_slug(kind_slug)
            .filter(|kind| api.config.is_enabled(*kind))
            .ok_or_else(|| ApiError::NotFound(format!("Flow '{}' not found", kind_slug)))?;

        Ok(Self {
            api,
            locale,
            kind,
            session: session.0,
        })
    }

    pub fn variant(&self, slug: &str) -> Result<FlowVariant, ApiError> {
        FlowVariant::from_slug(self.kind, slug).ok_or_else(|| {
            ApiError::NotFound(format!(
                "Variant '{}' not found in '{}'",
                slug,
                self.kind.slug()
            ))
        })
    }

    /// Resolve a step segment within `scope`, restricted to `variant`'s steps
    pub fn step(
        &self,
        variant: Option<&FlowVariant>,
        scope: StepScope,
        slug: &str,
    ) -> Result<Step, ApiError> {
        Step::parse(scope, slug)
            .filter(|step| variant.map_or(true, |v| v.contains(*step)))
            .ok_or_else(|| ApiError::NotFound(format!("Step '{}' not found", slug)))
    }

    pub fn service(&self) -> FlowService<'_> {
        let manager = FlowStateManager::new(
            self.session.as_ref(),
            self.kind,
            self.api.config.fallback_url(self.locale),
        );
        FlowService::new(manager, self.api.today())
    }

    pub fn step_context<'a>(&'a self, state: &'a FlowState) -> StepContext<'a> {
        StepContext {
            state,
            kind: self.kind,
            today: self.api.today(),
            reference: self.api.reference.as_ref(),
        }
    }

    /// `/{lang}/{kind}/{id}/{target}`
    pub fn step_url(&self, id: &str, target: &RouteTarget) -> String {
        format!(
            "/{}/{}/{}/{}",
            self.locale.slug(),
            self.kind.slug(),
            id,
            target
        )
    }

    pub fn url(&self, id: &str, destination: &Destination) -> String {
        match destination {
            Destination::Step(target) => self.step_url(id, target),
            Destination::External(url) => url.clone(),
        }
    }

    /// 303 to wherever the flow sent us
    pub fn redirect(&self, id: &str, redirect: &Redirect) -> Response {
        self.see_other(&self.url(id, &redirect.to))
    }

    /// 303 to a step of this flow
    pub fn go(&self, id: &str, target: &RouteTarget) -> Response {
        self.see_other(&self.step_url(id, target))
    }

    /// 303 out of the wizard to the locale's fallback page
    pub fn leave(&self) -> Response {
        self.see_other(self.api.config.fallback_url(self.locale))
    }

    fn see_other(&self, url: &str) -> Response {
        axum::response::Redirect::to(url).into_response()
    }

    pub fn verify_csrf(&self, form: &FormInput) -> Result<(), ApiError> {
        session::verify_csrf(self.session.as_ref(), form.csrf())?;
        Ok(())
    }

    /// Step view with the session's CSRF token and the stored state
    pub fn view(
        &self,
        id: &str,
        state: &FlowState,
        variant: Option<&FlowVariant>,
        step: Step,
        back: Option<RouteTarget>,
    ) -> Result<StepView, ApiError> {
        Ok(StepView {
            flow_id: id.to_string(),
            kind: self.kind.slug().to_string(),
            variant: variant.map(|v| v.slug().to_string()),
            step: step.slug().to_string(),
            locale: self.locale.slug().to_string(),
            edit_mode: state.edit_mode,
            csrf_token: session::csrf_token(self.session.as_ref()),
            back_url: back.map(|target| self.step_url(id, &target)),
            state: serde_json::to_value(state)?,
            child: None,
            address_dialog: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::flow::state::TypeOfApplication;
    use crate::flow::RedirectReason;
    use uuid::Uuid;

    fn context(config: Config, kind: &str) -> Result<FlowContext, ApiError> {
        let api = ApiState::new(config).unwrap();
        let session = Session(Arc::new(InMemorySession::new("s1")));
        FlowContext::new(api, Locale::Fr, kind, session)
    }

    #[test]
    fn test_disabled_kind_is_not_found() {
        let mut config = Config::default();
        config.flows.enabled = vec!["apply".to_string()];

        assert!(context(config.clone(), "apply").is_ok());
        assert!(matches!(
            context(config, "renew"),
            Err(ApiError::NotFound(_))
        ));
    }

    #[test]
    fn test_step_urls_carry_locale_kind_and_id() {
        let ctx = context(Config::default(), "protected-renew").unwrap();
        let child = Uuid::nil();
        let target = RouteTarget::child(TypeOfApplication::Child, Step::ChildInformation, child);

        assert_eq!(
            ctx.step_url("abc", &target),
            format!("/fr/protected-renew/abc/child/children/{}/information", child)
        );
        let external = Redirect::external("https://example.com", RedirectReason::FlowNotFound);
        assert_eq!(ctx.url("abc", &external.to), "https://example.com");
    }

    #[test]
    fn test_step_restricted_to_variant() {
        let ctx = context(Config::default(), "apply").unwrap();
        let adult = ctx.variant("adult").unwrap();

        assert_eq!(
            ctx.step(Some(&adult), StepScope::Variant, "marital-status").unwrap(),
            Step::MaritalStatus
        );
        assert!(ctx.step(Some(&adult), StepScope::Variant, "children").is_err());
        assert!(ctx.variant("delegate").is_err());
    }
}
