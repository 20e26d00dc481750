//! Connection graph data model (wire format: snake_case JSON).

use crate::config::GraphRules;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Prefix of client-generated ids for optimistic records. Server ids never use it.
pub const TEMP_ID_PREFIX: &str = "temp-";

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Stable identity of a rendered service node.
    NodeId
);
string_id!(ProjectId);
string_id!(
    /// Server-assigned id, or a `temp-` id for a record that only exists optimistically.
    ConnectionId
);

impl ConnectionId {
    pub fn temporary() -> Self {
        Self(format!("{TEMP_ID_PREFIX}{}", uuid::Uuid::new_v4()))
    }

    pub fn is_temporary(&self) -> bool {
        self.0.starts_with(TEMP_ID_PREFIX)
    }
}

/// Closed string enums. Unknown wire values decode to the neutral fallback instead of failing,
/// so a newer server never breaks rendering.
macro_rules! closed_enum {
    (
        $(#[$meta:meta])*
        $name:ident, fallback = $fallback:ident {
            $($(#[$vmeta:meta])* $variant:ident => ($wire:literal, $label:literal)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }

            /// Human-readable label used by badges and editor options.
            pub fn display_label(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }

            pub fn from_wire_lenient(raw: &str) -> Self {
                raw.parse().unwrap_or_else(|_| {
                    tracing::warn!(
                        kind = stringify!($name),
                        value = raw,
                        fallback = $name::$fallback.as_str(),
                        "unknown enum value from remote; using fallback"
                    );
                    $name::$fallback
                })
            }
        }

        impl FromStr for $name {
            type Err = ();

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s {
                    $($wire => Ok($name::$variant),)+
                    _ => Err(()),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                Ok($name::from_wire_lenient(&raw))
            }
        }
    };
}

closed_enum!(
    ConnectionType, fallback = Uses {
        Uses => ("uses", "Uses"),
        Integrates => ("integrates", "Integrates"),
        DataTransfer => ("data_transfer", "Data transfer"),
        ApiCall => ("api_call", "API call"),
        AuthProvider => ("auth_provider", "Auth provider"),
        Webhook => ("webhook", "Webhook"),
        Sdk => ("sdk", "SDK"),
    }
);

closed_enum!(
    /// Missing on the wire means `Active`; unknown values mean `Inactive`.
    #[derive(Default)]
    ConnectionStatus, fallback = Inactive {
        #[default]
        Active => ("active", "Active"),
        Inactive => ("inactive", "Inactive"),
        Error => ("error", "Error"),
        Pending => ("pending", "Pending"),
    }
);

closed_enum!(
    ConnectionEnvironment, fallback = All {
        Development => ("development", "Development"),
        Staging => ("staging", "Staging"),
        Production => ("production", "Production"),
        All => ("all", "All"),
    }
);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub id: ConnectionId,
    pub project_id: ProjectId,
    #[serde(rename = "source_service_id")]
    pub source: NodeId,
    #[serde(rename = "target_service_id")]
    pub target: NodeId,
    pub connection_type: ConnectionType,
    #[serde(default)]
    pub connection_status: ConnectionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<ConnectionEnvironment>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub last_verified_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default)]
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Connection {
    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }

    pub fn is_temporary(&self) -> bool {
        self.id.is_temporary()
    }

    /// Badge text: the explicit label, or the type's display label.
    pub fn display_label(&self) -> &str {
        match self.label.as_deref() {
            Some(label) if !label.trim().is_empty() => label,
            _ => self.connection_type.display_label(),
        }
    }

    pub fn links(&self, source: &NodeId, target: &NodeId) -> bool {
        &self.source == source && &self.target == target
    }
}

/// Create payload: a connection minus id and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewConnection {
    pub project_id: ProjectId,
    #[serde(rename = "source_service_id")]
    pub source: NodeId,
    #[serde(rename = "target_service_id")]
    pub target: NodeId,
    pub connection_type: ConnectionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_status: Option<ConnectionStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl NewConnection {
    pub fn new(
        project_id: impl Into<ProjectId>,
        source: impl Into<NodeId>,
        target: impl Into<NodeId>,
        connection_type: ConnectionType,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            source: source.into(),
            target: target.into(),
            connection_type,
            connection_status: None,
            label: None,
            description: None,
        }
    }

    pub fn with_status(mut self, status: ConnectionStatus) -> Self {
        self.connection_status = Some(status);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn validate(&self, rules: &GraphRules) -> Result<()> {
        if self.source == self.target {
            return Err(Error::SelfLoop {
                node: self.source.clone(),
            });
        }
        check_len("label", self.label.as_deref(), rules.label_max_len)?;
        check_len(
            "description",
            self.description.as_deref(),
            rules.description_max_len,
        )?;
        Ok(())
    }

    /// Synthesizes the local stand-in shown until the server confirms the create.
    pub fn to_optimistic(&self, now: DateTime<Utc>) -> Connection {
        Connection {
            id: ConnectionId::temporary(),
            project_id: self.project_id.clone(),
            source: self.source.clone(),
            target: self.target.clone(),
            connection_type: self.connection_type,
            connection_status: self.connection_status.unwrap_or_default(),
            environment: None,
            label: non_empty(self.label.as_deref()),
            description: non_empty(self.description.as_deref()),
            last_verified_at: None,
            metadata: Map::new(),
            created_by: String::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Update for a nullable field: leave it alone, clear it, or set it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldUpdate<T> {
    #[default]
    Keep,
    Clear,
    Set(T),
}

impl<T> FieldUpdate<T> {
    pub fn is_keep(&self) -> bool {
        matches!(self, Self::Keep)
    }

    pub fn from_option(value: Option<T>) -> Self {
        match value {
            Some(v) => Self::Set(v),
            None => Self::Clear,
        }
    }

    fn apply(&self, slot: &mut Option<T>)
    where
        T: Clone,
    {
        match self {
            Self::Keep => {}
            Self::Clear => *slot = None,
            Self::Set(v) => *slot = Some(v.clone()),
        }
    }
}

impl<T: Serialize> Serialize for FieldUpdate<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            // Skipped by `skip_serializing_if`; `null` is the safe encoding if it ever gets here.
            Self::Keep | Self::Clear => serializer.serialize_none(),
            Self::Set(v) => serializer.serialize_some(v),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for FieldUpdate<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        // Missing keys are handled by `#[serde(default)]` (Keep); present keys are null or a value.
        Option::<T>::deserialize(deserializer).map(Self::from_option)
    }
}

/// Partial update payload (`PATCH`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConnectionPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_type: Option<ConnectionType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_status: Option<ConnectionStatus>,
    #[serde(default, skip_serializing_if = "FieldUpdate::is_keep")]
    pub label: FieldUpdate<String>,
    #[serde(default, skip_serializing_if = "FieldUpdate::is_keep")]
    pub description: FieldUpdate<String>,
}

impl ConnectionPatch {
    pub fn is_empty(&self) -> bool {
        self.connection_type.is_none()
            && self.connection_status.is_none()
            && self.label.is_keep()
            && self.description.is_keep()
    }

    pub fn validate(&self, rules: &GraphRules) -> Result<()> {
        if let FieldUpdate::Set(label) = &self.label {
            check_len("label", Some(label), rules.label_max_len)?;
        }
        if let FieldUpdate::Set(description) = &self.description {
            check_len("description", Some(description), rules.description_max_len)?;
        }
        Ok(())
    }

    pub fn apply_to(&self, connection: &mut Connection, now: DateTime<Utc>) {
        if let Some(t) = self.connection_type {
            connection.connection_type = t;
        }
        if let Some(s) = self.connection_status {
            connection.connection_status = s;
        }
        self.label.apply(&mut connection.label);
        self.description.apply(&mut connection.description);
        connection.updated_at = now;
    }
}

/// A proposed connection from the external dependency-detection collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoConnectSuggestion {
    #[serde(rename = "source_service_id")]
    pub source: NodeId,
    #[serde(rename = "target_service_id")]
    pub target: NodeId,
    pub connection_type: ConnectionType,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub dependency_type: String,
}

fn check_len(field: &'static str, value: Option<&str>, max: usize) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    let len = value.chars().count();
    if len > max {
        return Err(Error::FieldTooLong { field, max, len });
    }
    Ok(())
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|s| !s.is_empty()).map(|s| s.to_string())
}
