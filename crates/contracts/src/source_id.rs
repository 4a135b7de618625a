//! SourceId - camera / capture-device identifier
//!
//! Every track update names the camera it came from. The id is cloned into
//! each `TrackKey` and every report, so it is backed by `Arc<str>`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

/// Capture source identifier with O(1) clone.
///
/// # Examples
/// ```
/// use contracts::SourceId;
///
/// let cam: SourceId = "ward-3-cam-1".into();
/// let copy = cam.clone();
/// assert_eq!(cam, copy);
/// assert_eq!(cam.as_str(), "ward-3-cam-1");
/// ```
#[derive(Clone)]
pub struct SourceId(Arc<str>);

impl SourceId {
    #[inline]
    pub fn new(s: &str) -> Self {
        Self(Arc::from(s))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SourceId {
    /// Matches the name the camera gateway uses when a payload omits its id.
    fn default() -> Self {
        Self::new("unknown_camera")
    }
}

impl Deref for SourceId {
    type Target = str;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for SourceId {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for SourceId {
    #[inline]
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SourceId {
    #[inline]
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl From<String> for SourceId {
    #[inline]
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SourceId({:?})", self.0)
    }
}

impl PartialEq for SourceId {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for SourceId {}

impl PartialEq<str> for SourceId {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        self.0.as_ref() == other
    }
}

impl PartialEq<&str> for SourceId {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        self.0.as_ref() == *other
    }
}

// Must agree with `str`'s hash so `Borrow<str>` lookups work.
impl Hash for SourceId {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state)
    }
}

impl Serialize for SourceId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SourceId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_clone_shares_storage() {
        let a: SourceId = "cam-a".into();
        let b = a.clone();
        assert_eq!(a.as_str().as_ptr(), b.as_str().as_ptr());
    }

    #[test]
    fn test_lookup_by_str() {
        let mut map: HashMap<SourceId, usize> = HashMap::new();
        map.insert("cam-a".into(), 1);
        map.insert("cam-b".into(), 2);
        assert_eq!(map.get("cam-b"), Some(&2));
    }

    #[test]
    fn test_default_name() {
        assert_eq!(SourceId::default(), "unknown_camera");
    }

    #[test]
    fn test_serde_as_plain_string() {
        let id: SourceId = "cam-a".into();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"cam-a\"");
        let back: SourceId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
