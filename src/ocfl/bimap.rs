use std::collections::hash_map::{IntoIter, Iter};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fmt::Formatter;
use std::hash::Hash;
use std::marker::PhantomData;
use std::rc::Rc;

use serde::de::{DeserializeOwned, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ocfl::digest::HexDigest;
use crate::ocfl::error::{OcflError, Result};

/// A bidirectional map from a digest to the set of paths that contain that digest's content,
/// and from any one of those paths back to its digest. An digest may have many paths, but a
/// path may only ever have one digest -- this is the content-addressed "digest map" that backs
/// both an inventory's `manifest` and each version's `state`.
pub type DigestMap<P> = PathBiMap<P>;

#[derive(Debug, Clone)]
pub struct PathBiMap<P>
where
    P: Eq + Hash + DeserializeOwned + Serialize,
{
    id_to_paths: HashMap<Rc<HexDigest>, HashSet<Rc<P>>>,
    path_to_id: HashMap<Rc<P>, Rc<HexDigest>>,
}

impl<P> PathBiMap<P>
where
    P: Eq + Hash + DeserializeOwned + Serialize + Clone + fmt::Display,
{
    pub fn new() -> Self {
        Self {
            id_to_paths: HashMap::new(),
            path_to_id: HashMap::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            id_to_paths: HashMap::with_capacity(capacity),
            path_to_id: HashMap::with_capacity(capacity),
        }
    }

    /// Inserts a new digest to path mapping. If the path already has a mapping, the existing
    /// mapping is removed first.
    pub fn insert(&mut self, id: HexDigest, path: P) {
        let id_ref = Rc::new(id);
        let path_ref = Rc::new(path);

        self.insert_rc(id_ref, path_ref);
    }

    /// Same as `insert`, but accepts `Rc` values
    pub fn insert_rc(&mut self, id_ref: Rc<HexDigest>, path_ref: Rc<P>) {
        if self.path_to_id.contains_key(&path_ref) {
            self.remove_path(&path_ref);
        }

        let entry = self.id_to_paths.entry(id_ref);
        let id_ref = entry.key().clone();

        entry.or_insert_with(HashSet::new).insert(path_ref.clone());

        self.path_to_id.insert(path_ref, id_ref);
    }

    /// Inserts all of the path mappings for a digest. Used during deserialization.
    fn insert_multiple(&mut self, id: HexDigest, paths: Vec<P>) {
        if paths.is_empty() {
            return;
        }

        let id_ref = Rc::new(id);

        let set = self
            .id_to_paths
            .entry(id_ref.clone())
            .or_insert_with(HashSet::new);

        for path in paths {
            let path_ref = Rc::new(path);
            set.insert(path_ref.clone());
            self.path_to_id.insert(path_ref, id_ref.clone());
        }
    }

    /// Gets all of the paths associated with a digest
    pub fn get_paths(&self, id: &HexDigest) -> Option<&HashSet<Rc<P>>> {
        self.id_to_paths.get(id)
    }

    /// Gets the digest associated with a path
    pub fn get_id(&self, path: &P) -> Option<&Rc<HexDigest>> {
        self.path_to_id.get(path)
    }

    pub fn get_id_rc(&self, id: &HexDigest) -> Option<&Rc<HexDigest>> {
        self.id_to_paths.get_key_value(id).map(|(id, _)| id)
    }

    pub fn get_path_rc(&self, path: &P) -> Option<&Rc<P>> {
        self.path_to_id.get_key_value(path).map(|(path, _)| path)
    }

    /// True if a mapping exists for the path
    pub fn contains_path(&self, path: &P) -> bool {
        self.path_to_id.contains_key(path)
    }

    /// True if a mapping exists for the digest
    pub fn contains_id(&self, id: &HexDigest) -> bool {
        self.id_to_paths.contains_key(id)
    }

    pub fn is_empty(&self) -> bool {
        self.id_to_paths.is_empty()
    }

    /// Removes a path mapping
    pub fn remove_path(&mut self, path: &P) -> Option<(Rc<P>, Rc<HexDigest>)> {
        if let Some((path, id)) = self.path_to_id.remove_entry(path) {
            let mut remove = false;
            if let Some(paths) = self.id_to_paths.get_mut(&id) {
                paths.remove(path.as_ref());
                remove = paths.is_empty();
            }
            if remove {
                self.id_to_paths.remove(&id);
            }
            Some((path, id))
        } else {
            None
        }
    }

    /// Renames a path in place, keeping its digest. Fails if `new_path` is already mapped to a
    /// different digest.
    pub fn rename(&mut self, old_path: &P, new_path: P) -> Result<()> {
        if let Some(existing) = self.get_id(&new_path) {
            if let Some(old_id) = self.get_id(old_path) {
                if existing.as_ref() != old_id.as_ref() {
                    return Err(OcflError::IllegalArgument(format!(
                        "Cannot rename {} to {}: destination is already mapped to a different digest",
                        old_path, new_path
                    )));
                }
            }
        }

        if let Some((_, id)) = self.remove_path(old_path) {
            self.insert_rc(id, Rc::new(new_path));
        }

        Ok(())
    }

    /// Merges another map into this one. A path present in both maps must carry the same digest
    /// in both, otherwise this is a conflict and an error is returned; this map is left unmodified
    /// on error.
    pub fn merge(&mut self, other: &Self) -> Result<()> {
        for (path, id) in other.path_to_id.iter() {
            if let Some(existing) = self.path_to_id.get(path.as_ref()) {
                if existing.as_ref() != id.as_ref() {
                    return Err(OcflError::IllegalArgument(format!(
                        "Cannot merge digest maps: {} maps to two different digests",
                        path
                    )));
                }
            }
        }

        for (path, id) in other.path_to_id.iter() {
            self.insert_rc(id.clone(), path.clone());
        }

        Ok(())
    }

    /// Returns an iterator that iterates over references to all path-id pairs
    pub fn iter(&self) -> Iter<Rc<P>, Rc<HexDigest>> {
        self.path_to_id.iter()
    }

    /// Returns an iterator that iterates over id-paths pairs
    pub fn iter_id_paths(&self) -> Iter<Rc<HexDigest>, HashSet<Rc<P>>> {
        self.id_to_paths.iter()
    }

    /// Returns the number of path-id pairs in the map
    pub fn len(&self) -> usize {
        self.path_to_id.len()
    }

    /// Gets the digest associated with a path. Alias of `get_id` using the vocabulary of
    /// the digest-map operations.
    pub fn digest_of(&self, path: &P) -> Option<&Rc<HexDigest>> {
        self.get_id(path)
    }

    /// Gets all of the paths associated with a digest. Alias of `get_paths`.
    pub fn paths_of(&self, id: &HexDigest) -> Option<&HashSet<Rc<P>>> {
        self.get_paths(id)
    }

    /// Builds a map from an iterator of `(digest, path)` pairs, rejecting it if the same path
    /// appears twice with two different digests -- unlike `insert`, which silently moves the
    /// path to its new digest, this is used for decoding untrusted input where such a conflict
    /// is a structural error rather than an edit.
    pub fn from_pairs<I: IntoIterator<Item = (HexDigest, P)>>(pairs: I) -> Result<Self> {
        let mut map = Self::new();

        for (id, path) in pairs {
            let path_rc = Rc::new(path);

            if let Some(existing) = map.path_to_id.get(&path_rc) {
                if existing.as_ref() != &id {
                    return Err(OcflError::IllegalArgument(format!(
                        "Path {} is mapped to two different digests",
                        path_rc
                    )));
                }
                continue;
            }

            map.insert_rc(Rc::new(id), path_rc);
        }

        Ok(map)
    }

    /// Returns a copy of this map with lowercase-hex digests. Path order is otherwise
    /// unaffected; canonical path ordering is applied at serialization time.
    pub fn normalize(&self) -> Self {
        let mut normalized = Self::with_capacity(self.len());

        for (path, id) in self.path_to_id.iter() {
            let lowered = HexDigest::from(id.as_ref().to_string().to_ascii_lowercase());
            normalized.insert_rc(Rc::new(lowered), path.clone());
        }

        normalized
    }
}

impl<P> PartialEq for PathBiMap<P>
where
    P: Eq + Hash + DeserializeOwned + Serialize,
{
    /// Two maps are equal iff every path maps to the same digest in both -- this compares by
    /// content, ignoring insertion order and ignoring digest hex casing (`HexDigest`'s own
    /// `PartialEq` is already case-insensitive).
    fn eq(&self, other: &Self) -> bool {
        self.path_to_id == other.path_to_id
    }
}

impl<P> Eq for PathBiMap<P> where P: Eq + Hash + DeserializeOwned + Serialize {}

impl<P> Default for PathBiMap<P>
where
    P: Eq + Hash + DeserializeOwned + Serialize + Clone + fmt::Display,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<P> IntoIterator for PathBiMap<P>
where
    P: Eq + Hash + DeserializeOwned + Serialize,
{
    type Item = (Rc<P>, Rc<HexDigest>);
    type IntoIter = IntoIter<Rc<P>, Rc<HexDigest>>;

    fn into_iter(self) -> Self::IntoIter {
        self.path_to_id.into_iter()
    }
}

impl<'a, P> IntoIterator for &'a PathBiMap<P>
where
    P: Eq + Hash + DeserializeOwned + Serialize,
{
    type Item = (&'a Rc<P>, &'a Rc<HexDigest>);
    type IntoIter = Iter<'a, Rc<P>, Rc<HexDigest>>;

    fn into_iter(self) -> Self::IntoIter {
        self.path_to_id.iter()
    }
}

struct PathBiMapVisitor<P>
where
    P: Eq + Hash + DeserializeOwned + Serialize,
{
    brand: PhantomData<P>,
}

impl<'a, P> Visitor<'a> for PathBiMapVisitor<P>
where
    P: Eq + Hash + DeserializeOwned + Serialize,
{
    type Value = PathBiMap<P>;

    fn expecting(&self, formatter: &mut Formatter) -> fmt::Result {
        formatter.write_str("a map of digests to paths")
    }

    fn visit_map<M: MapAccess<'a>>(self, mut access: M) -> Result<Self::Value, M::Error> {
        let mut map = PathBiMap {
            id_to_paths: HashMap::with_capacity(access.size_hint().unwrap_or(0)),
            path_to_id: HashMap::with_capacity(access.size_hint().unwrap_or(0)),
        };

        while let Some((key, value)) = access.next_entry()? {
            map.insert_multiple(key, value);
        }

        Ok(map)
    }
}

impl<'a, P> Deserialize<'a> for PathBiMap<P>
where
    P: Eq + Hash + DeserializeOwned + Serialize,
{
    fn deserialize<D: Deserializer<'a>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(PathBiMapVisitor {
            brand: Default::default(),
        })
    }
}

impl<P> Serialize for PathBiMap<P>
where
    P: Eq + Hash + DeserializeOwned + Serialize + Ord,
{
    /// Serializes with digests in lowercase-hex sorted order and, within each digest, paths in
    /// sorted order -- so that encoding the same logical content always produces the same bytes.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut entries: Vec<(String, Vec<&Rc<P>>)> = self
            .id_to_paths
            .iter()
            .map(|(id, paths)| {
                let mut paths: Vec<&Rc<P>> = paths.iter().collect();
                paths.sort_unstable();
                (id.as_ref().to_string().to_ascii_lowercase(), paths)
            })
            .collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(&b.0));

        serializer.collect_map(entries)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::convert::TryInto;
    use std::hash::Hash;
    use std::rc::Rc;

    use crate::ocfl::bimap::PathBiMap;
    use crate::ocfl::digest::HexDigest;
    use crate::ocfl::LogicalPath;

    #[test]
    fn insert_retrieve_remove() {
        let mut map = PathBiMap::new();
        map.insert("abcd".into(), path("foo/bar"));
        map.insert("efgh".into(), path("foo/baz"));
        map.insert("abcd".into(), path("2"));

        assert_eq!(
            &set(vec![path_rc("foo/bar"), path_rc("2")]),
            map.get_paths(&"abcd".into()).unwrap()
        );

        assert_eq!(
            &set(vec![path_rc("foo/baz")]),
            map.get_paths(&"efgh".into()).unwrap()
        );

        assert_eq!(&hex_rc("abcd"), map.get_id(&path("2")).unwrap());
        assert_eq!(None, map.get_id(&path("bogus")));

        map.remove_path(&path("foo/baz"));
        assert!(!map.contains_id(&"efgh".into()));
    }

    #[test]
    fn rename_keeps_digest() {
        let mut map = PathBiMap::new();
        map.insert("abcd".into(), path("a.txt"));

        map.rename(&path("a.txt"), path("b.txt")).unwrap();

        assert!(!map.contains_path(&path("a.txt")));
        assert_eq!(&hex_rc("abcd"), map.get_id(&path("b.txt")).unwrap());
    }

    #[test]
    fn rename_conflict_is_rejected() {
        let mut map = PathBiMap::new();
        map.insert("abcd".into(), path("a.txt"));
        map.insert("efgh".into(), path("b.txt"));

        assert!(map.rename(&path("a.txt"), path("b.txt")).is_err());
    }

    #[test]
    fn merge_disjoint_maps() {
        let mut left = PathBiMap::new();
        left.insert("abcd".into(), path("a.txt"));

        let mut right = PathBiMap::new();
        right.insert("efgh".into(), path("b.txt"));

        left.merge(&right).unwrap();

        assert!(left.contains_path(&path("a.txt")));
        assert!(left.contains_path(&path("b.txt")));
    }

    #[test]
    fn merge_conflicting_path_is_rejected() {
        let mut left = PathBiMap::new();
        left.insert("abcd".into(), path("a.txt"));

        let mut right = PathBiMap::new();
        right.insert("efgh".into(), path("a.txt"));

        assert!(left.merge(&right).is_err());
        // left is unmodified
        assert_eq!(&hex_rc("abcd"), left.get_id(&path("a.txt")).unwrap());
    }

    #[test]
    fn serialize() {
        let mut map = PathBiMap::new();
        map.insert("abcd".into(), path("foo/bar"));
        map.insert("efgh".into(), path("foo/baz"));
        map.insert("abcd".into(), path("2"));

        let json = serde_json::to_string(&map).unwrap();
        let value: PathBiMap<LogicalPath> = serde_json::from_str(&json).unwrap();

        assert_eq!(map.path_to_id, value.path_to_id);
        assert_eq!(map.id_to_paths, value.id_to_paths);
    }

    #[test]
    fn serialize_empty() {
        let map: PathBiMap<LogicalPath> = PathBiMap::new();

        let json = serde_json::to_string(&map).unwrap();
        assert_eq!("{}", json);

        let value: PathBiMap<LogicalPath> = serde_json::from_str(&json).unwrap();
        assert_eq!(map.path_to_id, value.path_to_id);
    }

    fn set<T: Eq + Hash>(vec: Vec<T>) -> HashSet<T> {
        vec.into_iter().collect()
    }

    fn path(p: &str) -> LogicalPath {
        p.try_into().unwrap()
    }

    fn path_rc(p: &str) -> Rc<LogicalPath> {
        Rc::new(path(p))
    }

    fn hex_rc(d: &str) -> Rc<HexDigest> {
        Rc::new(HexDigest::from(d))
    }
}
