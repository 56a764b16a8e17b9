//! Client request envelope.
//!
//! A tool never performs side effects itself. It describes what the client
//! application should do as a [`RequestEnvelope`] and hands back the
//! serialized form. The wire shape is consumed by the client as-is:
//!
//! ```json
//! {"request_type": "info_request", "info_request_type": "find_tasks",
//!  "args": {"task_name": "Review PR"}, "show_only": false}
//! ```
//!
//! The subtype key name depends on the kind, and `show_only` only ever appears
//! on info requests.

use crate::{
    ActionRequestType, EnvelopeError, InfoRequestType, RequestKind, UiActionType,
};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;

/// A single argument value sent to the client.
///
/// The client already consumes string lists and integers for some keys, so
/// values are not restricted to strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    Flag(bool),
    Integer(i64),
    Text(String),
    List(Vec<String>),
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for ArgValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl From<i64> for ArgValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<Vec<String>> for ArgValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

/// Argument map of an envelope. Keys serialize in sorted order.
pub type RequestArgs = BTreeMap<String, Option<ArgValue>>;

/// A client-bound request.
///
/// One variant per kind, each carrying that kind's subtype enum, so a subtype
/// that does not belong to its kind cannot be represented.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "WireEnvelope")]
pub enum RequestEnvelope {
    Action {
        request_type: ActionRequestType,
        args: Option<RequestArgs>,
    },
    Info {
        request_type: InfoRequestType,
        args: Option<RequestArgs>,
        /// `true`: present the result to the user and stop.
        /// `false`: the result comes back to the assistant, which may act on it.
        show_only: bool,
    },
    UiAction {
        request_type: UiActionType,
        args: Option<RequestArgs>,
    },
}

impl RequestEnvelope {
    /// Build an envelope from a kind and a subtype wire string.
    ///
    /// # Arguments
    /// * `kind` - Request kind
    /// * `subtype` - Wire string of the subtype, must belong to `kind`
    /// * `args` - Free-form argument map (`None` serializes as `null`)
    /// * `show_only` - Only accepted for info requests; defaults to `false`
    ///
    /// # Returns
    /// * `Err(EnvelopeError::InvalidSubtype)` - subtype is not a member of `kind`
    /// * `Err(EnvelopeError::ShowOnlyNotAllowed)` - `show_only` given for a non-info kind
    pub fn build(
        kind: RequestKind,
        subtype: &str,
        args: Option<RequestArgs>,
        show_only: Option<bool>,
    ) -> Result<Self, EnvelopeError> {
        let invalid = || EnvelopeError::InvalidSubtype {
            kind,
            subtype: subtype.to_string(),
        };

        if kind != RequestKind::Info && show_only.is_some() {
            return Err(EnvelopeError::ShowOnlyNotAllowed { kind });
        }

        match kind {
            RequestKind::Action => Ok(Self::Action {
                request_type: ActionRequestType::from_wire_str(subtype).map_err(|_| invalid())?,
                args,
            }),
            RequestKind::Info => Ok(Self::Info {
                request_type: InfoRequestType::from_wire_str(subtype).map_err(|_| invalid())?,
                args,
                show_only: show_only.unwrap_or(false),
            }),
            RequestKind::UiAction => Ok(Self::UiAction {
                request_type: UiActionType::from_wire_str(subtype).map_err(|_| invalid())?,
                args,
            }),
        }
    }

    /// Shorthand for an action envelope.
    pub fn action(request_type: ActionRequestType, args: Option<RequestArgs>) -> Self {
        Self::Action { request_type, args }
    }

    /// Shorthand for an info envelope.
    pub fn info(request_type: InfoRequestType, args: Option<RequestArgs>, show_only: bool) -> Self {
        Self::Info {
            request_type,
            args,
            show_only,
        }
    }

    /// Shorthand for a UI action envelope.
    pub fn ui_action(request_type: UiActionType, args: Option<RequestArgs>) -> Self {
        Self::UiAction { request_type, args }
    }

    pub fn kind(&self) -> RequestKind {
        match self {
            Self::Action { .. } => RequestKind::Action,
            Self::Info { .. } => RequestKind::Info,
            Self::UiAction { .. } => RequestKind::UiAction,
        }
    }

    /// Wire string of the subtype.
    pub fn subtype(&self) -> &'static str {
        match self {
            Self::Action { request_type, .. } => request_type.as_wire_str(),
            Self::Info { request_type, .. } => request_type.as_wire_str(),
            Self::UiAction { request_type, .. } => request_type.as_wire_str(),
        }
    }

    pub fn args(&self) -> Option<&RequestArgs> {
        match self {
            Self::Action { args, .. } | Self::Info { args, .. } | Self::UiAction { args, .. } => {
                args.as_ref()
            }
        }
    }

    /// `Some` for info requests only.
    pub fn show_only(&self) -> Option<bool> {
        match self {
            Self::Info { show_only, .. } => Some(*show_only),
            _ => None,
        }
    }

    /// Serialize to the client wire format.
    ///
    /// Output is deterministic: top-level keys are written in a fixed order
    /// and argument keys are sorted.
    pub fn to_wire_string(&self) -> Result<String, EnvelopeError> {
        serde_json::to_string(self).map_err(|e| EnvelopeError::Malformed {
            reason: e.to_string(),
        })
    }

    /// Parse an envelope previously produced by [`Self::to_wire_string`].
    pub fn from_wire_str(s: &str) -> Result<Self, EnvelopeError> {
        serde_json::from_str(s).map_err(|e| EnvelopeError::Malformed {
            reason: e.to_string(),
        })
    }
}

impl Serialize for RequestEnvelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let kind = self.kind();
        let len = if self.show_only().is_some() { 4 } else { 3 };
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("request_type", kind.as_wire_str())?;
        map.serialize_entry(kind.subtype_key(), self.subtype())?;
        map.serialize_entry("args", &self.args())?;
        if let Some(show_only) = self.show_only() {
            map.serialize_entry("show_only", &show_only)?;
        }
        map.end()
    }
}

/// Loose wire form accepted before the kind/subtype pairing is checked.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireEnvelope {
    request_type: String,
    #[serde(default)]
    action_request_type: Option<String>,
    #[serde(default)]
    info_request_type: Option<String>,
    #[serde(default)]
    ui_action_request_type: Option<String>,
    #[serde(default)]
    args: Option<RequestArgs>,
    #[serde(default)]
    show_only: Option<bool>,
}

impl TryFrom<WireEnvelope> for RequestEnvelope {
    type Error = EnvelopeError;

    fn try_from(wire: WireEnvelope) -> Result<Self, Self::Error> {
        let kind = RequestKind::from_wire_str(&wire.request_type).map_err(|_| {
            EnvelopeError::UnknownRequestType {
                request_type: wire.request_type.clone(),
            }
        })?;

        let (own, others) = match kind {
            RequestKind::Action => (
                wire.action_request_type,
                [&wire.info_request_type, &wire.ui_action_request_type],
            ),
            RequestKind::Info => (
                wire.info_request_type,
                [&wire.action_request_type, &wire.ui_action_request_type],
            ),
            RequestKind::UiAction => (
                wire.ui_action_request_type,
                [&wire.action_request_type, &wire.info_request_type],
            ),
        };

        if others.iter().any(|field| field.is_some()) {
            return Err(EnvelopeError::Malformed {
                reason: format!("subtype field of another kind present on {}", kind),
            });
        }

        let subtype = own.ok_or_else(|| EnvelopeError::MissingSubtype {
            kind,
            field: kind.subtype_key().to_string(),
        })?;

        Self::build(kind, &subtype, wire.args, wire.show_only)
    }
}

// =============================================================================
// TESTS
// =============================================================================


// =============================================================================
// PROPERTY-BASED TESTS
// =============================================================================
