//! SAML 2.0 types and data structures.
//!
//! The claim types the trust core reads out of verified XML.

mod assertion;
mod constants;
mod response;

pub use assertion::*;
pub use constants::*;
pub use response::*;

use chrono::{DateTime, Utc};

use crate::error::{SamlError, SamlResult};
use crate::xml::XmlElement;

pub(crate) fn required_attribute<'a>(element: &'a XmlElement, name: &str) -> SamlResult<&'a str> {
    element.attribute(name).ok_or_else(|| {
        SamlError::MissingElement(format!("{}@{name}", element.qualified_name()))
    })
}

/// Reads an optional `xs:dateTime` attribute.
pub(crate) fn parse_instant(element: &XmlElement, name: &str) -> SamlResult<Option<DateTime<Utc>>> {
    element
        .attribute(name)
        .map(|value| {
            DateTime::parse_from_rfc3339(value.trim())
                .map(|instant| instant.with_timezone(&Utc))
                .map_err(|e| {
                    SamlError::InvalidElement(format!(
                        "{}@{name} is not a valid timestamp: {e}",
                        element.qualified_name()
                    ))
                })
        })
        .transpose()
}
