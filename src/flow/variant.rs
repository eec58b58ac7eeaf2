//! Flow configuration.
//!
//! Apply, renew and protected renew each come in adult, adult-child and child
//! variants. They all share one state machine; a [`FlowVariant`] value
//! carries what differs between them: the ordered steps, the required fields
//! in order, and the discriminator values the variant accepts.

use serde::Serialize;

use super::state::{FlowState, StateField, TypeOfApplication};

/// Application family, each with its own session namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlowKind {
    Apply,
    Renew,
    ProtectedRenew,
}

impl FlowKind {
    pub fn all() -> &'static [FlowKind] {
        &[FlowKind::Apply, FlowKind::Renew, FlowKind::ProtectedRenew]
    }

    /// Path segment (`/en/apply/...`)
    pub fn slug(&self) -> &'static str {
        match self {
            FlowKind::Apply => "apply",
            FlowKind::Renew => "renew",
            FlowKind::ProtectedRenew => "protected-renew",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::all().iter().copied().find(|k| k.slug() == slug)
    }

    /// Session key prefix
    pub fn purpose(&self) -> &'static str {
        match self {
            FlowKind::Apply => "apply-flow",
            FlowKind::Renew => "renew-flow",
            FlowKind::ProtectedRenew => "protected-renew-flow",
        }
    }

    pub fn is_renewal(&self) -> bool {
        matches!(self, FlowKind::Renew | FlowKind::ProtectedRenew)
    }
}

/// Where a step's route lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepScope {
    /// `/{kind}/{id}/{step}`, shared by all variants
    Flow,
    /// `/{kind}/{id}/{variant}/{step}`
    Variant,
    /// `/{kind}/{id}/{variant}/children/{child}/{step}`
    Child,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    TermsAndConditions,
    TypeOfApplication,
    ApplicationDelegate,
    ApplicantInformation,
    ParentOrGuardian,
    MaritalStatus,
    PartnerInformation,
    ContactInformation,
    MailingAddress,
    HomeAddress,
    CommunicationPreferences,
    DentalInsurance,
    DentalBenefits,
    Children,
    ChildInformation,
    ChildDentalInsurance,
    ChildDentalBenefits,
    ChildCannotApply,
    Review,
    Confirmation,
}

const ALL_STEPS: &[Step] = &[
    Step::TermsAndConditions,
    Step::TypeOfApplication,
    Step::ApplicationDelegate,
    Step::ApplicantInformation,
    Step::ParentOrGuardian,
    Step::MaritalStatus,
    Step::PartnerInformation,
    Step::ContactInformation,
    Step::MailingAddress,
    Step::HomeAddress,
    Step::CommunicationPreferences,
    Step::DentalInsurance,
    Step::DentalBenefits,
    Step::Children,
    Step::ChildInformation,
    Step::ChildDentalInsurance,
    Step::ChildDentalBenefits,
    Step::ChildCannotApply,
    Step::Review,
    Step::Confirmation,
];

impl Step {
    pub fn slug(&self) -> &'static str {
        match self {
            Step::TermsAndConditions => "terms-and-conditions",
            Step::TypeOfApplication => "type-application",
            Step::ApplicationDelegate => "application-delegate",
            Step::ApplicantInformation => "applicant-information",
            Step::ParentOrGuardian => "parent-or-guardian",
            Step::MaritalStatus => "marital-status",
            Step::PartnerInformation => "partner-information",
            Step::ContactInformation => "contact-information",
            Step::MailingAddress => "mailing-address",
            Step::HomeAddress => "home-address",
            Step::CommunicationPreferences => "communication-preferences",
            Step::DentalInsurance | Step::ChildDentalInsurance => "dental-insurance",
            Step::DentalBenefits | Step::ChildDentalBenefits => "dental-benefits",
            Step::Children => "children",
            Step::ChildInformation => "information",
            Step::ChildCannotApply => "cannot-apply-child",
            Step::Review => "review-information",
            Step::Confirmation => "confirmation",
        }
    }

    pub fn scope(&self) -> StepScope {
        match self {
            Step::TermsAndConditions | Step::TypeOfApplication | Step::ApplicationDelegate => {
                StepScope::Flow
            }
            Step::ChildInformation
            | Step::ChildDentalInsurance
            | Step::ChildDentalBenefits
            | Step::ChildCannotApply => StepScope::Child,
            _ => StepScope::Variant,
        }
    }

    /// Resolve a path segment within a scope; slugs repeat across scopes
    pub fn parse(scope: StepScope, slug: &str) -> Option<Self> {
        ALL_STEPS
            .iter()
            .copied()
            .find(|s| s.scope() == scope && s.slug() == slug)
    }

    /// State field written by this step
    pub fn owned_field(&self) -> Option<StateField> {
        match self {
            Step::TermsAndConditions => Some(StateField::TermsAndConditions),
            Step::TypeOfApplication => Some(StateField::TypeOfApplication),
            Step::ApplicantInformation => Some(StateField::ApplicantInformation),
            Step::MaritalStatus => Some(StateField::MaritalStatus),
            Step::PartnerInformation => Some(StateField::PartnerInformation),
            Step::ContactInformation => Some(StateField::ContactInformation),
            Step::MailingAddress => Some(StateField::MailingAddress),
            Step::HomeAddress => Some(StateField::HomeAddress),
            Step::CommunicationPreferences => Some(StateField::CommunicationPreferences),
            Step::DentalInsurance => Some(StateField::DentalInsurance),
            Step::DentalBenefits => Some(StateField::DentalBenefits),
            Step::Children
            | Step::ChildInformation
            | Step::ChildDentalInsurance
            | Step::ChildDentalBenefits => Some(StateField::Children),
            Step::Review => Some(StateField::SubmissionInfo),
            Step::ApplicationDelegate
            | Step::ParentOrGuardian
            | Step::ChildCannotApply
            | Step::Confirmation => None,
        }
    }

    /// Informational pages with nothing to submit
    pub fn is_exit_page(&self) -> bool {
        matches!(self, Step::ApplicationDelegate | Step::ParentOrGuardian)
    }
}

/// One entry of the ordered prerequisite list
#[derive(Debug, Clone, Copy)]
pub struct Requirement {
    pub field: StateField,
    pub step: Step,
    /// Whether the field is needed given the rest of the state
    pub when: fn(&FlowState) -> bool,
}

fn always(_: &FlowState) -> bool {
    true
}

fn when_partnered(state: &FlowState) -> bool {
    state.requires_partner()
}

/// Parametrization of the generic flow for one (kind, applicant type) pair
#[derive(Debug, Clone)]
pub struct FlowVariant {
    pub kind: FlowKind,
    pub applicant: TypeOfApplication,
    /// Discriminator values accepted by this variant's routes
    pub supported_types: Vec<TypeOfApplication>,
    /// Variant-level steps in linear order, ending with review and confirmation
    pub steps: Vec<Step>,
    /// Fields that must be present before review, in the order they are asked
    pub requirements: Vec<Requirement>,
}

/// Steps every flow starts with, before a variant is known
pub const FLOW_PREAMBLE: &[Step] = &[Step::TermsAndConditions, Step::TypeOfApplication];

impl FlowVariant {
    /// Build the variant for an applicant type; `None` for delegates, who
    /// leave the wizard
    pub fn new(kind: FlowKind, applicant: TypeOfApplication) -> Option<Self> {
        if applicant == TypeOfApplication::Delegate {
            return None;
        }

        let mut steps = Vec::new();
        if applicant == TypeOfApplication::Child {
            steps.push(Step::Children);
        }
        steps.extend([
            Step::ApplicantInformation,
            Step::MaritalStatus,
            Step::PartnerInformation,
            Step::ContactInformation,
            Step::MailingAddress,
            Step::HomeAddress,
        ]);
        if kind == FlowKind::Apply {
            steps.push(Step::CommunicationPreferences);
        }
        if applicant.covers_applicant() {
            steps.extend([Step::DentalInsurance, Step::DentalBenefits]);
        }
        if applicant == TypeOfApplication::AdultChild {
            steps.push(Step::Children);
        }
        steps.extend([Step::Review, Step::Confirmation]);

        let requirements = FLOW_PREAMBLE
            .iter()
            .chain(steps.iter())
            .filter(|step| !matches!(step, Step::Review | Step::Confirmation))
            .filter_map(|step| {
                step.owned_field().map(|field| Requirement {
                    field,
                    step: *step,
                    when: if *step == Step::PartnerInformation {
                        when_partnered
                    } else {
                        always
                    },
                })
            })
            .collect();

        Some(Self {
            kind,
            applicant,
            supported_types: vec![applicant],
            steps,
            requirements,
        })
    }

    /// Variant addressed by a route segment
    pub fn from_slug(kind: FlowKind, slug: &str) -> Option<Self> {
        TypeOfApplication::from_slug(slug).and_then(|applicant| Self::new(kind, applicant))
    }

    /// All variants of a kind
    pub fn all(kind: FlowKind) -> Vec<Self> {
        [
            TypeOfApplication::Adult,
            TypeOfApplication::AdultChild,
            TypeOfApplication::Child,
        ]
        .into_iter()
        .filter_map(|applicant| Self::new(kind, applicant))
        .collect()
    }

    /// Every variant of every kind
    pub fn catalog() -> Vec<Self> {
        FlowKind::all()
            .iter()
            .flat_map(|kind| Self::all(*kind))
            .collect()
    }

    pub fn slug(&self) -> &'static str {
        self.applicant.slug()
    }

    /// Display name, e.g. `renew-adult-child`
    pub fn name(&self) -> String {
        format!("{}-{}", self.kind.slug(), self.applicant.slug())
    }

    pub fn supports_type(&self, value: Option<TypeOfApplication>) -> bool {
        value.is_some_and(|t| self.supported_types.contains(&t))
    }

    pub fn supports_children(&self) -> bool {
        self.steps.contains(&Step::Children)
    }

    /// Whether a step can be routed to within this variant
    pub fn contains(&self, step: Step) -> bool {
        match step.scope() {
            StepScope::Flow => true,
            StepScope::Child => self.supports_children(),
            StepScope::Variant => {
                self.steps.contains(&step)
                    || (step == Step::ParentOrGuardian && self.applicant.covers_applicant())
            }
        }
    }

    /// Whether `step` is part of the linear path for `state`
    pub fn applies(&self, step: Step, state: &FlowState) -> bool {
        match step {
            Step::PartnerInformation => state.requires_partner(),
            _ => true,
        }
    }

    /// Next applicable step after `step` in linear order
    pub fn next_linear(&self, step: Step, state: &FlowState) -> Option<Step> {
        let position = self.steps.iter().position(|s| *s == step)?;
        self.steps[position + 1..]
            .iter()
            .copied()
            .find(|s| self.applies(*s, state))
    }

    /// Previous applicable step before `step` in linear order
    pub fn previous_linear(&self, step: Step, state: &FlowState) -> Option<Step> {
        let position = self.steps.iter().position(|s| *s == step)?;
        self.steps[..position]
            .iter()
            .rev()
            .copied()
            .find(|s| self.applies(*s, state))
    }

    /// First variant-level step
    pub fn entry_step(&self) -> Step {
        self.steps.first().copied().unwrap_or(Step::Review)
    }
}
