//! Redirect-or-value results.
//!
//! Every recoverable flow condition (bad id, unsupported type, sealed flow,
//! missing prerequisite) is expressed as a [`FlowOutcome::Redirect`] value
//! instead of an error. The HTTP adapter turns redirects into responses; the
//! core never needs a request harness to be tested.

use std::fmt;

use uuid::Uuid;

use super::state::TypeOfApplication;
use super::variant::Step;

/// A step address, resolved into a URL by the HTTP layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteTarget {
    /// Variant the step belongs to; `None` for flow-level steps
    pub applicant: Option<TypeOfApplication>,
    pub step: Step,
    pub child_id: Option<Uuid>,
}

impl RouteTarget {
    pub fn flow(step: Step) -> Self {
        Self {
            applicant: None,
            step,
            child_id: None,
        }
    }

    pub fn variant(applicant: TypeOfApplication, step: Step) -> Self {
        Self {
            applicant: Some(applicant),
            step,
            child_id: None,
        }
    }

    pub fn child(applicant: TypeOfApplication, step: Step, child_id: Uuid) -> Self {
        Self {
            applicant: Some(applicant),
            step,
            child_id: Some(child_id),
        }
    }
}

impl fmt::Display for RouteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(applicant) = self.applicant {
            write!(f, "{}/", applicant.slug())?;
        }
        if let Some(child_id) = self.child_id {
            write!(f, "children/{}/", child_id)?;
        }
        f.write_str(self.step.slug())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Step(RouteTarget),
    /// Configured URL outside the wizard
    External(String),
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Step(target) => target.fmt(f),
            Destination::External(url) => f.write_str(url),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectReason {
    InvalidFlowId,
    FlowNotFound,
    UnsupportedType,
    Submitted,
    NotSubmitted,
    MissingPrerequisite,
    UnknownChild,
    /// Ordinary post-save navigation
    Navigation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub to: Destination,
    pub reason: RedirectReason,
}

impl Redirect {
    pub fn to_step(target: RouteTarget, reason: RedirectReason) -> Self {
        Self {
            to: Destination::Step(target),
            reason,
        }
    }

    pub fn external(url: impl Into<String>, reason: RedirectReason) -> Self {
        Self {
            to: Destination::External(url.into()),
            reason,
        }
    }

    /// Target step, `None` for external redirects
    pub fn target(&self) -> Option<&RouteTarget> {
        match &self.to {
            Destination::Step(target) => Some(target),
            Destination::External(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub enum FlowOutcome<T> {
    Proceed(T),
    Redirect(Redirect),
}

impl<T> FlowOutcome<T> {
    pub fn is_redirect(&self) -> bool {
        matches!(self, FlowOutcome::Redirect(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FlowOutcome<U> {
        match self {
            FlowOutcome::Proceed(value) => FlowOutcome::Proceed(f(value)),
            FlowOutcome::Redirect(redirect) => FlowOutcome::Redirect(redirect),
        }
    }

    pub fn redirect(&self) -> Option<&Redirect> {
        match self {
            FlowOutcome::Proceed(_) => None,
            FlowOutcome::Redirect(redirect) => Some(redirect),
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            FlowOutcome::Proceed(value) => Some(value),
            FlowOutcome::Redirect(_) => None,
        }
    }
}

impl<T> From<Redirect> for FlowOutcome<T> {
    fn from(redirect: Redirect) -> Self {
        FlowOutcome::Redirect(redirect)
    }
}

impl<T, E> From<Redirect> for Result<FlowOutcome<T>, E> {
    fn from(redirect: Redirect) -> Self {
        Ok(FlowOutcome::Redirect(redirect))
    }
}

/// Unwrap a [`FlowOutcome`], returning early with the redirect otherwise.
///
/// Works in functions returning `FlowOutcome<_>` or
/// `Result<FlowOutcome<_>, _>`.
#[macro_export]
macro_rules! proceed {
    ($outcome:expr) => {
        match $outcome {
            $crate::flow::FlowOutcome::Proceed(value) => value,
            $crate::flow::FlowOutcome::Redirect(redirect) => {
                return ::core::convert::From::from(redirect);
            }
        }
    };
}
