//! Benefits Flow - session-backed apply and renew wizard
//!
//! The [`flow`] module holds the state machine, [`validation`] turns form
//! posts into typed state, and [`rest`] exposes both over HTTP.

pub mod config;
pub mod flow;
pub mod locale;
pub mod logging;
pub mod rest;
pub mod services;
pub mod session;
pub mod validation;
