// Copyright (C) 2020-2026  The Blockhouse Technology Limited (TBTL).
//
// This program is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// This program is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public
// License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Extraction of verified claims into plain typed attributes for the API
//! response.

use serde::Serialize;

use crate::{
    error::DocumentError,
    models::document::{Claims, ElementIdentifier},
    Result,
};

/// The typed value of a single extracted attribute.
///
/// Serializes untagged, so an integer renders as a JSON number, a boolean as
/// a JSON boolean, and so on.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ElementValue {
    /// An integer attribute, e.g. an age.
    Integer(i64),
    /// A textual attribute, e.g. a name.
    Text(String),
    /// A boolean attribute, e.g. an age-over flag.
    Boolean(bool),
    /// A floating-point attribute.
    Double(f64),
}

/// A single verified attribute, ready for the API response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Element {
    /// The namespace the attribute belongs to.
    pub namespace: String,
    /// The attribute's identifier within the namespace.
    pub identifier: String,
    /// The attribute's typed value.
    pub value: ElementValue,
}

/// Converts a verified claim set into typed [`Element`]s, preserving the
/// claim set's order.
///
/// Each value is decoded by trying, in order: integer, text, boolean,
/// double. A value of any other CBOR type fails the whole extraction with
/// [`DocumentError::UnsupportedValueType`] rather than being skipped, so a
/// partially extracted document is never returned.
pub fn extract_elements(claims: Claims) -> Result<Vec<Element>> {
    let mut elements = Vec::new();

    for (name_space, items) in claims.0 {
        for (identifier, value) in items {
            let value = decode_value(value.as_value(), &identifier)?;

            elements.push(Element {
                namespace: name_space.as_str().to_owned(),
                identifier: identifier.as_str().to_owned(),
                value,
            });
        }
    }

    Ok(elements)
}

fn decode_value(
    value: &ciborium::Value,
    identifier: &ElementIdentifier,
) -> Result<ElementValue> {
    if let ciborium::Value::Integer(integer) = value {
        if let Ok(integer) = i64::try_from(*integer) {
            return Ok(ElementValue::Integer(integer));
        }
    }

    if let Some(text) = value.as_text() {
        return Ok(ElementValue::Text(text.to_owned()));
    }

    if let Some(boolean) = value.as_bool() {
        return Ok(ElementValue::Boolean(boolean));
    }

    if let Some(double) = value.as_float() {
        return Ok(ElementValue::Double(double));
    }

    Err(bherror::Error::root(DocumentError::UnsupportedValueType(
        identifier.clone(),
    )))
}
