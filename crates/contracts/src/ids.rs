//! RoomId / MemberId - Cheap-to-clone identifiers
//!
//! Both use Arc<str> internally so routing tables can clone them freely.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

/// Maximum room id length, in characters.
pub const MAX_ROOM_ID_CHARS: usize = 32;

/// Generate an `Arc<str>` backed identifier with string-like ergonomics.
macro_rules! define_arc_id {
    ($name:ident) => {
        #[derive(Clone, Default)]
        pub struct $name(Arc<str>);

        impl $name {
            /// Get the underlying string slice.
            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Deref for $name {
            type Target = str;

            #[inline]
            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            #[inline]
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $name {
            #[inline]
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:?})", stringify!($name), self.0)
            }
        }

        impl PartialEq for $name {
            #[inline]
            fn eq(&self, other: &Self) -> bool {
                // Fast path: same Arc pointer
                Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
            }
        }

        impl Eq for $name {}

        impl PartialEq<str> for $name {
            #[inline]
            fn eq(&self, other: &str) -> bool {
                self.0.as_ref() == other
            }
        }

        impl PartialEq<&str> for $name {
            #[inline]
            fn eq(&self, other: &&str) -> bool {
                self.0.as_ref() == *other
            }
        }

        // Same as str hash so maps can be queried with &str
        impl Hash for $name {
            #[inline]
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.0.hash(state)
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                serializer.serialize_str(&self.0)
            }
        }
    };
}

define_arc_id!(RoomId);
define_arc_id!(MemberId);

impl RoomId {
    /// Parse a user-supplied room id.
    ///
    /// Surrounding whitespace is trimmed. Returns `None` when the result is
    /// empty or longer than [`MAX_ROOM_ID_CHARS`].
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let len = trimmed.chars().count();
        if len == 0 || len > MAX_ROOM_ID_CHARS {
            return None;
        }
        Some(Self(Arc::from(trimmed)))
    }
}

impl<'de> Deserialize<'de> for RoomId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        RoomId::parse(&s).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "room id must be 1..={MAX_ROOM_ID_CHARS} characters after trimming"
            ))
        })
    }
}

impl MemberId {
    /// Create a member id from any string.
    #[inline]
    pub fn new(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl From<&str> for MemberId {
    #[inline]
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for MemberId {
    #[inline]
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_room_id_trims() {
        let id = RoomId::parse("  lobby ").unwrap();
        assert_eq!(id, "lobby");
    }

    #[test]
    fn test_room_id_rejects_empty_and_long() {
        assert!(RoomId::parse("").is_none());
        assert!(RoomId::parse("   ").is_none());
        assert!(RoomId::parse(&"x".repeat(33)).is_none());
        assert!(RoomId::parse(&"x".repeat(32)).is_some());
    }

    #[test]
    fn test_room_id_counts_chars_not_bytes() {
        // 32 two-byte characters fit
        assert!(RoomId::parse(&"é".repeat(32)).is_some());
    }

    #[test]
    fn test_clone_is_cheap() {
        let id1: MemberId = "c_1".into();
        let id2 = id1.clone();
        assert_eq!(id1.as_str().as_ptr(), id2.as_str().as_ptr());
    }

    #[test]
    fn test_hashmap_key_lookup_by_str() {
        let mut map: HashMap<RoomId, i32> = HashMap::new();
        map.insert(RoomId::parse("r1").unwrap(), 1);
        assert_eq!(map.get("r1"), Some(&1));
    }

    #[test]
    fn test_room_id_serde() {
        let id = RoomId::parse("r1").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"r1\"");

        let parsed: RoomId = serde_json::from_str("\" r1 \"").unwrap();
        assert_eq!(parsed, id);
        assert!(serde_json::from_str::<RoomId>("\"\"").is_err());
    }
}
