//! Assertion conditions and subject confirmation checks.
//!
//! Everything here is a pure function of its inputs and may be re-run with a
//! different [`ValidationContext`].

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::error::RejectionReason;
use crate::types::{Assertion, Conditions, SubjectConfirmationData};

/// Default allowed clock skew, in seconds.
pub const DEFAULT_CLOCK_SKEW_SECS: u32 = 180;

/// What an assertion is checked against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationContext {
    now: DateTime<Utc>,
    clock_skew: Duration,
    expected_audiences: BTreeSet<String>,
    expected_recipient: String,
    expected_in_response_to: Option<String>,
}

impl ValidationContext {
    /// Creates a context for `now` and the local assertion consumer URL,
    /// with the default clock skew and no expected audience.
    #[must_use]
    pub fn new(now: DateTime<Utc>, expected_recipient: impl Into<String>) -> Self {
        Self {
            now,
            clock_skew: Duration::seconds(i64::from(DEFAULT_CLOCK_SKEW_SECS)),
            expected_audiences: BTreeSet::new(),
            expected_recipient: expected_recipient.into(),
            expected_in_response_to: None,
        }
    }

    /// Sets the allowed clock skew.
    #[must_use]
    pub fn with_clock_skew(mut self, skew: Duration) -> Self {
        self.clock_skew = skew;
        self
    }

    /// Adds an acceptable audience.
    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.expected_audiences.insert(audience.into());
        self
    }

    /// Sets the ID of the request the message must answer.
    #[must_use]
    pub fn with_in_response_to(mut self, request_id: impl Into<String>) -> Self {
        self.expected_in_response_to = Some(request_id.into());
        self
    }

    /// Returns the evaluation time.
    pub const fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Returns the allowed clock skew.
    pub const fn clock_skew(&self) -> Duration {
        self.clock_skew
    }

    /// Returns the acceptable audiences.
    pub const fn expected_audiences(&self) -> &BTreeSet<String> {
        &self.expected_audiences
    }

    /// Returns the expected recipient URL.
    pub fn expected_recipient(&self) -> &str {
        &self.expected_recipient
    }

    /// Returns the expected request ID.
    pub fn expected_in_response_to(&self) -> Option<&str> {
        self.expected_in_response_to.as_deref()
    }

    fn is_expired(&self, not_on_or_after: DateTime<Utc>) -> bool {
        self.now - self.clock_skew >= not_on_or_after
    }
}

/// Evaluates conditions and subject confirmation data.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConditionsValidator;

impl ConditionsValidator {
    /// Checks `conditions` and, if given, one subject confirmation.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule, checked in this order: not before,
    /// not on or after, audience, recipient, confirmation expiry,
    /// correlation.
    pub fn validate(
        conditions: &Conditions,
        confirmation: Option<&SubjectConfirmationData>,
        context: &ValidationContext,
    ) -> Result<(), RejectionReason> {
        if let Some(not_before) = conditions.not_before {
            if context.now + context.clock_skew < not_before {
                return Err(RejectionReason::NotYetValid);
            }
        }

        if let Some(not_on_or_after) = conditions.not_on_or_after {
            if context.is_expired(not_on_or_after) {
                return Err(RejectionReason::Expired);
            }
        }

        if !conditions.audience_restrictions.is_empty() {
            let satisfied = conditions.audience_restrictions.iter().any(|restriction| {
                restriction
                    .audiences
                    .iter()
                    .all(|audience| context.expected_audiences.contains(audience))
            });
            if !satisfied {
                return Err(RejectionReason::AudienceMismatch);
            }
        }

        let Some(data) = confirmation else {
            return Ok(());
        };

        if let Some(recipient) = &data.recipient {
            if *recipient != context.expected_recipient {
                return Err(RejectionReason::RecipientMismatch);
            }
        }

        if let Some(not_on_or_after) = data.not_on_or_after {
            if context.is_expired(not_on_or_after) {
                return Err(RejectionReason::Expired);
            }
        }

        if let (Some(actual), Some(expected)) =
            (&data.in_response_to, &context.expected_in_response_to)
        {
            if actual != expected {
                return Err(RejectionReason::CorrelationMismatch);
            }
        }

        Ok(())
    }

    /// Checks an assertion's conditions against each bearer confirmation.
    ///
    /// Passes if any bearer confirmation passes. Without bearer
    /// confirmations only the conditions are checked.
    ///
    /// # Errors
    ///
    /// Returns the first failure when no confirmation passes.
    pub fn validate_assertion(
        assertion: &Assertion,
        context: &ValidationContext,
    ) -> Result<(), RejectionReason> {
        let conditions = assertion.conditions.clone().unwrap_or_default();
        let confirmations = assertion.bearer_confirmations();

        if confirmations.is_empty() {
            return Self::validate(&conditions, None, context);
        }

        let mut outcome = Ok(());
        for data in &confirmations {
            match Self::validate(&conditions, Some(data), context) {
                Ok(()) => return Ok(()),
                Err(reason) => {
                    debug!("Bearer confirmation rejected: {}", reason.as_str());
                    if outcome.is_ok() {
                        outcome = Err(reason);
                    }
                }
            }
        }
        outcome
    }
}
