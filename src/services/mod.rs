//! Collaborators the flow consults but does not own.

pub mod address;
pub mod lookup;

pub use address::{
    resolve_address, AddressConfirmation, AddressDecision, AddressDialog, AddressValidationError,
    AddressValidationResult, AddressValidator, HttpAddressValidator, NoopAddressValidator,
};
pub use lookup::{Country, Province, ReferenceData, SocialProgram, StaticReferenceData};
