//! Build documents as returned by the `/oapi/v1` builds endpoints.
//!
//! Documents are kept as generic [`Value`] trees so a write-back carries
//! every field the server sent, including ones this crate knows nothing about.

use serde_json::{Map, Value};

use crate::error::CancellerError;
use crate::phase::{classify, PhaseClass};

/// Label OpenShift puts on builds started from a build config.
pub const BUILD_CONFIG_LABEL: &str = "openshift.io/build-config.name";

/// Pre-3.x spelling of [`BUILD_CONFIG_LABEL`].
pub const LEGACY_BUILD_CONFIG_LABEL: &str = "buildconfig";

/// A build as seen in a namespace listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Build {
    /// Build name, unique within the namespace; empty if the item had none.
    pub name: String,
    /// Namespace the build lives in.
    pub namespace: String,
    /// Lifecycle phase; empty if the server reported none.
    pub phase: String,
    /// Full item as received.
    pub document: Value,
}

impl Build {
    /// Decode one item of a build list.
    ///
    /// A missing name is not an error here: terminal builds are never
    /// addressed, so only the sweep rejects an unnamed active build.
    pub fn from_document(document: Value, namespace: &str) -> Self {
        let name = document
            .pointer("/metadata/name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let phase = document
            .pointer("/status/phase")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Self {
            name,
            namespace: namespace.to_string(),
            phase,
            document,
        }
    }

    /// Classification of the listed phase.
    pub fn class(&self) -> PhaseClass {
        classify(&self.phase)
    }

    /// Name of the build config that started this build, if labelled.
    pub fn build_config(&self) -> Option<&str> {
        let labels = self.document.pointer("/metadata/labels")?;
        labels
            .get(BUILD_CONFIG_LABEL)
            .or_else(|| labels.get(LEGACY_BUILD_CONFIG_LABEL))
            .and_then(Value::as_str)
    }
}

/// Decode a build list body into builds, in server order.
///
/// A missing or null `items` is an empty namespace.
pub fn decode_build_list(body: &str, namespace: &str) -> Result<Vec<Build>, CancellerError> {
    let mut list: Value = serde_json::from_str(body)?;

    let items = match list.get_mut("items").map(Value::take) {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(CancellerError::MissingField("items is not an array".into())),
    };

    Ok(items
        .into_iter()
        .map(|item| Build::from_document(item, namespace))
        .collect())
}

/// Set `status.cancelled = true`, leaving every other field untouched.
///
/// A document without `status` gets an empty one first.
pub fn mark_cancelled(document: &mut Value) -> Result<(), CancellerError> {
    let root = document
        .as_object_mut()
        .ok_or_else(|| CancellerError::MissingField("build document is not an object".into()))?;

    let status = root
        .entry("status")
        .or_insert_with(|| Value::Object(Map::new()));
    if status.is_null() {
        *status = Value::Object(Map::new());
    }

    let status = status
        .as_object_mut()
        .ok_or_else(|| CancellerError::MissingField("status is not an object".into()))?;
    status.insert("cancelled".to_string(), Value::Bool(true));
    Ok(())
}
