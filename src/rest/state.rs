//! API state management for the REST server.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};

use crate::config::Config;
use crate::services::{
    AddressValidator, HttpAddressValidator, NoopAddressValidator, ReferenceData,
    StaticReferenceData,
};
use crate::session::SessionRegistry;

/// Source of "today" for age and date-of-birth rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clock {
    System,
    Fixed(NaiveDate),
}

impl Clock {
    pub fn today(&self) -> NaiveDate {
        match self {
            Clock::System => Local::now().date_naive(),
            Clock::Fixed(date) => *date,
        }
    }
}

/// Shared state for the REST API
#[derive(Clone)]
pub struct ApiState {
    pub config: Arc<Config>,
    /// Live browser sessions
    pub sessions: SessionRegistry,
    pub reference: Arc<dyn ReferenceData>,
    pub address_validator: Arc<dyn AddressValidator>,
    pub clock: Clock,
}

impl ApiState {
    /// Create API state from config.
    ///
    /// Address validation uses the HTTP validator when enabled and accepts
    /// every address otherwise.
    pub fn new(config: Config) -> Result<Self> {
        let validation = &config.address_validation;
        let address_validator: Arc<dyn AddressValidator> = if validation.enabled {
            let Some(endpoint) = validation.endpoint.as_deref() else {
                bail!("address_validation.enabled requires address_validation.endpoint");
            };
            let validator = HttpAddressValidator::new(
                endpoint,
                Duration::from_secs(validation.timeout_secs),
            )
            .context("Failed to build address validation client")?;
            tracing::info!(endpoint = %endpoint, "Address validation enabled");
            Arc::new(validator)
        } else {
            Arc::new(NoopAddressValidator)
        };

        let sessions = SessionRegistry::with_ttl(Duration::from_secs(config.session.ttl_secs));

        Ok(Self {
            config: Arc::new(config),
            sessions,
            reference: Arc::new(StaticReferenceData),
            address_validator,
            clock: Clock::System,
        })
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_address_validator(mut self, validator: Arc<dyn AddressValidator>) -> Self {
        self.address_validator = validator;
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }
}
