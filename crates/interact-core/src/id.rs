//! Identity types for the interactive protocol
//!
//! Scene, group, control and participant ids are server-assigned strings.
//! They are unique within their own namespace for the lifetime of a session.
//! Packet ids are session-local and strictly increasing.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $debug:literal) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            #[inline]
            pub fn new(id: impl Into<String>) -> Self {
                $name(id.into())
            }

            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            #[inline]
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($debug, "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Scene identity - a named layout of controls
    SceneId,
    "Scene"
);

string_id!(
    /// Group identity - a set of participants sharing one scene
    GroupId,
    "Group"
);

string_id!(
    /// Control identity - unique across every scene of a session
    ControlId,
    "Control"
);

string_id!(
    /// Participant identity - the service's per-connection session id
    ParticipantId,
    "Participant"
);

string_id!(
    /// Transaction identity - a spendable input awaiting capture
    TransactionId,
    "Transaction"
);

/// Name of the scene and group every session starts with
pub const DEFAULT_ID: &str = "default";

impl SceneId {
    /// The scene groups fall back to when none is given
    pub fn default_scene() -> Self {
        SceneId::from(DEFAULT_ID)
    }
}

impl GroupId {
    /// The group every participant joins first
    pub fn default_group() -> Self {
        GroupId::from(DEFAULT_ID)
    }
}

/// Packet identity - correlates a method with its reply
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PacketId(pub u32);

impl PacketId {
    pub const ZERO: PacketId = PacketId(0);

    #[inline]
    pub fn new(id: u32) -> Self {
        PacketId(id)
    }

    #[inline]
    pub fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for PacketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Packet({})", self.0)
    }
}

impl fmt::Display for PacketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_string_id_lookup_by_str() {
        let mut map = HashMap::new();
        map.insert(ControlId::from("giveHealth"), 1);
        assert_eq!(map.get("giveHealth"), Some(&1));
        assert_eq!(map.get("other"), None);
    }

    #[test]
    fn test_id_formatting() {
        let scene = SceneId::new("lobby");
        assert_eq!(format!("{scene}"), "lobby");
        assert_eq!(format!("{scene:?}"), "Scene(lobby)");
        assert_eq!(format!("{:?}", PacketId::new(7)), "Packet(7)");
    }

    #[test]
    fn test_defaults() {
        assert_eq!(SceneId::default_scene().as_str(), "default");
        assert_eq!(GroupId::default_group().as_str(), "default");
    }

    #[test]
    fn test_serde_transparent() {
        let id = ParticipantId::from("abc-123");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"abc-123\"");
        let back: ParticipantId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
