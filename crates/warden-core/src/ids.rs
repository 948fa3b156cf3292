//! Opaque, typed identifiers used throughout the workflow runtime.
//!
//! Each kind wraps a UUID so that a `RunId` and a `StepId` are never
//! interchangeable at compile time, even though both are rendered the same
//! way on the wire (a 36-character canonical UUID string).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! id_kind {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// The empty sentinel value, used before an aggregate has been
            /// assigned a real identity (e.g. a `StepRun` template slot).
            #[must_use]
            pub const fn nil() -> Self {
                Self(Uuid::nil())
            }

            /// True if this is the empty sentinel.
            #[must_use]
            pub fn is_nil(&self) -> bool {
                self.0.is_nil()
            }

            /// Access the underlying UUID.
            #[must_use]
            pub fn uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::nil()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

id_kind!(WorkflowId, "Identifier for a `WorkflowDefinition`.");
id_kind!(RunId, "Identifier for a `WorkflowRun`.");
id_kind!(StepId, "Identifier for a `StepRun`.");
id_kind!(AgentId, "Identifier for an agent configuration.");
id_kind!(PolicyBundleId, "Identifier for a `PolicyBundle`.");
id_kind!(ApprovalId, "Identifier for an `Approval`.");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_ids_are_unique() {
        assert_ne!(RunId::new(), RunId::new());
    }

    #[test]
    fn nil_is_the_default_and_is_nil() {
        assert_eq!(RunId::default(), RunId::nil());
        assert!(RunId::nil().is_nil());
        assert!(!RunId::new().is_nil());
    }

    #[test]
    fn display_is_36_char_canonical_uuid() {
        let id = StepId::new();
        let rendered = id.to_string();
        assert_eq!(rendered.len(), 36);
        assert_eq!(rendered.matches('-').count(), 4);
    }

    #[test]
    fn round_trips_through_display_and_from_str() {
        let id = AgentId::new();
        let parsed: AgentId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn distinct_kinds_do_not_mix_at_the_type_level() {
        // This is a compile-time guarantee; the test documents intent.
        let run = RunId::new();
        let step = StepId::new();
        assert_ne!(run.uuid(), step.uuid());
    }

    #[test]
    fn serializes_as_a_plain_string() {
        let id = WorkflowId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
        let back: WorkflowId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
