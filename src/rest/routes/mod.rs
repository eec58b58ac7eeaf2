//! Route handlers for the REST API.

pub mod children;
pub mod flows;
pub mod health;
pub mod reference;
pub mod steps;
