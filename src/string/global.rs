//! GlobalString - process-wide interned strings behind 32-bit ids.
//!
//! The registry is a lazily-initialised singleton holding the id → string
//! array and the string → id map behind one reader-writer lock. Ids are
//! handed out sequentially and never re-used or re-indexed, so a
//! [`GlobalString`] stays valid for the process lifetime and equality is
//! a single integer comparison. Id 0 is reserved for the empty string.
//!
//! Interning takes the write lock; lookup-only paths
//! ([`GlobalString::create_if_exists`], [`GlobalString::exists`]) take a
//! read lock and can run concurrently.
//!
//! # Example
//!
//! ```
//! use keel::string::{GlobalString, Utf8String};
//!
//! let a = GlobalString::create(Utf8String::from("alpha"));
//! let b = GlobalString::create(Utf8String::from("alpha"));
//!
//! assert_eq!(a, b);
//! assert_eq!(a.to_utf8(), "alpha");
//! ```

use std::fmt;
use std::sync::LazyLock;

use super::convert::ToUtf8;
use super::Utf8String;
use crate::array::Array;
use crate::map::HashMap;
use crate::sync::RwLock;

/// id → string and string → id, maintained together
///
/// The array only ever grows; entry `i` is the string for id `i`.
struct Registry {
    by_id: Array<Utf8String>,
    ids: HashMap<Utf8String, u32>,
}

static REGISTRY: LazyLock<RwLock<Registry>> = LazyLock::new(|| {
    let mut by_id = Array::new();
    let mut ids = HashMap::new();
    by_id.push(Utf8String::new());
    ids.insert(Utf8String::new(), EMPTY_ID);
    RwLock::new(Registry { by_id, ids })
});

/// Fixed hasher state for [`GlobalString::hash_value`]
static ID_HASHER: LazyLock<ahash::RandomState> = LazyLock::new(ahash::RandomState::new);

/// Reserved id of the empty string
pub const EMPTY_ID: u32 = 0;

/// A 4-byte handle to a process-wide interned string
///
/// Comparison and hashing work on the id alone. Construction can be
/// slow (it synchronises on the registry lock), so interning once and
/// storing the handle is the intended pattern.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GlobalString {
    id: u32,
}

impl GlobalString {
    /// The empty string handle, id 0
    #[inline]
    pub const fn empty() -> Self {
        Self { id: EMPTY_ID }
    }

    /// Intern `string`, creating a new id only when absent
    ///
    /// Takes the write lock. When the entry might already exist and a
    /// miss is acceptable, prefer [`GlobalString::create_if_exists`],
    /// which only reads.
    pub fn create(string: Utf8String) -> Self {
        let mut registry = REGISTRY.write();
        if let Some(&id) = registry.ids.get(&string) {
            return Self { id };
        }

        let id = registry.by_id.len() as u32;
        registry.by_id.push(string.clone());
        registry.ids.insert(string, id);
        log::trace!("interned global string id {id}");
        Self { id }
    }

    /// Handle for `string` if it is already interned, id 0 otherwise
    ///
    /// Takes only the read lock. A result equal to
    /// [`GlobalString::empty`] is ambiguous between "absent" and "the
    /// empty string"; disambiguate with [`GlobalString::exists`].
    pub fn create_if_exists(string: &Utf8String) -> Self {
        let registry = REGISTRY.read();
        match registry.ids.get(string) {
            Some(&id) => Self { id },
            None => Self::empty(),
        }
    }

    /// Whether `string` is interned
    pub fn exists(string: &Utf8String) -> bool {
        REGISTRY.read().ids.contains_key(string)
    }

    /// Whether `id` names a registered string
    pub fn is_id_valid(id: u32) -> bool {
        (id as usize) < REGISTRY.read().by_id.len()
    }

    /// Rebuild a handle from a raw id
    ///
    /// The caller is responsible for the id having come from a handle in
    /// this process; check with [`GlobalString::is_id_valid`] when in
    /// doubt. Resolving an unregistered id panics.
    #[inline]
    pub fn from_id(id: u32) -> Self {
        Self { id }
    }

    /// The raw interned id
    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Copy out the interned string
    ///
    /// Takes the read lock.
    ///
    /// # Panics
    ///
    /// Panics when the handle holds an id that was never registered
    /// (only possible via [`GlobalString::from_id`]).
    pub fn to_utf8(&self) -> Utf8String {
        let registry = REGISTRY.read();
        registry
            .by_id
            .get(self.id as usize)
            .unwrap_or_else(|| panic!("unregistered global string id {}", self.id))
            .clone()
    }

    /// Hash of the handle, derived from the id alone
    pub fn hash_value(&self) -> u64 {
        ID_HASHER.hash_one(self.id)
    }
}

impl Default for GlobalString {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<&str> for GlobalString {
    fn from(text: &str) -> Self {
        Self::create(Utf8String::from(text))
    }
}

impl ToUtf8 for GlobalString {
    fn to_utf8(&self) -> Utf8String {
        GlobalString::to_utf8(self)
    }
}

impl fmt::Display for GlobalString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_utf8().as_str())
    }
}

impl fmt::Debug for GlobalString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GlobalString({}, {:?})", self.id, self.to_utf8().as_str())
    }
}

static_assertions::const_assert_eq!(std::mem::size_of::<GlobalString>(), 4);
static_assertions::assert_impl_all!(GlobalString: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_empty_is_id_zero() {
        assert_eq!(GlobalString::empty().id(), 0);
        assert_eq!(GlobalString::default(), GlobalString::empty());
        assert_eq!(GlobalString::empty().to_utf8(), "");
        assert!(GlobalString::is_id_valid(0));
    }

    #[test]
    fn test_create_same_string_same_id() {
        let a = GlobalString::create(Utf8String::from("alpha"));
        let b = GlobalString::create(Utf8String::from("alpha"));
        assert_eq!(a, b);
        assert_eq!(a.id(), b.id());
        assert_eq!(a.to_utf8(), "alpha");
        assert_eq!(b.to_utf8(), "alpha");
    }

    #[test]
    fn test_create_distinct_strings_distinct_ids() {
        let a = GlobalString::create(Utf8String::from("left"));
        let b = GlobalString::create(Utf8String::from("right"));
        assert_ne!(a, b);
        assert_eq!(a.to_utf8(), "left");
        assert_eq!(b.to_utf8(), "right");
    }

    #[test]
    fn test_create_if_exists() {
        let missing = Utf8String::from("never interned via create");
        assert_eq!(GlobalString::create_if_exists(&missing), GlobalString::empty());
        assert!(!GlobalString::exists(&missing));

        let interned = GlobalString::create(Utf8String::from("definitely interned"));
        let found = GlobalString::create_if_exists(&Utf8String::from("definitely interned"));
        assert_eq!(found, interned);
        assert!(GlobalString::exists(&Utf8String::from("definitely interned")));
    }

    #[test]
    fn test_from_id_round_trip() {
        let original = GlobalString::create(Utf8String::from("round trip"));
        let rebuilt = GlobalString::from_id(original.id());
        assert_eq!(rebuilt, original);
        assert_eq!(rebuilt.to_utf8(), "round trip");
        assert!(GlobalString::is_id_valid(original.id()));
    }

    #[test]
    fn test_invalid_id() {
        assert!(!GlobalString::is_id_valid(u32::MAX));
    }

    #[test]
    fn test_hash_value_is_stable() {
        let a = GlobalString::create(Utf8String::from("hashed"));
        let b = GlobalString::create(Utf8String::from("hashed"));
        assert_eq!(a.hash_value(), b.hash_value());
    }

    #[test]
    fn test_display() {
        let s = GlobalString::create(Utf8String::from("shown"));
        assert_eq!(format!("{s}"), "shown");
    }

    #[test]
    fn test_usable_as_map_key() {
        let mut map = HashMap::new();
        let key = GlobalString::create(Utf8String::from("map key"));
        map.insert(key, 42);
        assert_eq!(map.get(&GlobalString::create(Utf8String::from("map key"))), Some(&42));
    }

    #[test]
    fn test_concurrent_create_same_string() {
        let handles: Vec<_> = (0..16)
            .map(|_| {
                thread::spawn(|| GlobalString::create(Utf8String::from("concurrent entry")))
            })
            .collect();

        let ids: Vec<GlobalString> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for id in &ids[1..] {
            assert_eq!(ids[0], *id);
        }
    }

    #[test]
    fn test_concurrent_create_distinct_strings() {
        let handles: Vec<_> = (0..16)
            .map(|i| {
                thread::spawn(move || {
                    let s = GlobalString::create(Utf8String::from(
                        format!("distinct entry {i}").as_str(),
                    ));
                    (i, s)
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for (i, (_, a)) in results.iter().enumerate() {
            for (_, b) in results.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
        for (i, s) in &results {
            assert_eq!(s.to_utf8(), format!("distinct entry {i}").as_str());
        }
    }
}
