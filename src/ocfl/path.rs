use core::fmt;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::convert::{TryFrom, TryInto};
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::str::{FromStr, Split};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::Visitor;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum_macros::{Display as EnumDisplay, EnumString};
use VersionRef::Head;

use crate::ocfl::consts::*;
use crate::ocfl::error::{OcflError, Result};
use crate::ocfl::VersionRef::Number;

static VERSION_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r#"^v\d+$"#).unwrap());

/// Represents an [OCFL object version](https://ocfl.io/1.1/spec/#version-directories).
#[derive(Deserialize, Serialize, Debug, Copy, Clone)]
#[serde(try_from = "&str")]
#[serde(into = "String")]
pub struct VersionNum {
    pub number: u32,
    pub width: u32,
}

/// Represents either a specific version number or whatever the current head version is
#[derive(Debug, Copy, Clone)]
pub enum VersionRef {
    Number(VersionNum),
    Head,
}

/// The OCFL spec version an object or storage root declares conformance to.
#[derive(Deserialize, Serialize, Debug, Copy, Clone, Eq, PartialEq, EnumString, EnumDisplay)]
pub enum SpecVersion {
    #[strum(serialize = "1.0")]
    Ocfl1_0,
    #[strum(serialize = "1.1")]
    Ocfl1_1,
}

pub trait InventoryPath {
    /// Returns an iterable containing each segment of the path split on the `/` separator
    fn parts(&self) -> Split<char>;

    /// Returns the parent path of this path.
    fn parent(&self) -> Self;

    /// Returns the part of the logical path that's after the final `/` or the entire path if
    /// there is no `/`
    fn filename(&self) -> &str;

    /// Creates a new path by joining this path with another
    fn resolve(&self, other: &Self) -> Self;

    /// Returns true if the path ends with the given suffix
    fn ends_with(&self, suffix: &str) -> bool;

    /// Returns true if the path starts with the given prefix
    fn starts_with(&self, prefix: &str) -> bool;

    /// Returns a reference to the path represented as a `Path`
    fn as_path(&self) -> &Path;

    /// Returns a reference to the path represented as a `str`
    fn as_str(&self) -> &str;

    /// Returns true if the path is empty
    fn is_empty(&self) -> bool;
}

#[derive(Deserialize, Serialize, Debug, Eq, Ord, PartialOrd, PartialEq, Hash, Clone)]
struct InventoryPathInner(String);

/// Represents the logical path to a file in an object version's state.
#[derive(Deserialize, Serialize, Debug, Eq, Ord, PartialOrd, PartialEq, Hash, Clone)]
#[serde(transparent)]
pub struct LogicalPath {
    inner: InventoryPathInner,
}

/// Represents a path within a version's content directory. Relative the object root, and always
/// prefixed by a version number segment (`v1/content/...`).
#[derive(Debug, Eq, Ord, PartialOrd, PartialEq, Hash, Clone)]
pub struct ContentPath {
    inner: InventoryPathInner,
    pub version: VersionNum,
}

impl VersionNum {
    /// Creates a new VersionNum with width 0 (unpadded)
    pub fn new(number: u32) -> Self {
        Self { number, width: 0 }
    }

    /// Creates a new VersionNum with an explicit zero-padding width
    pub fn with_width(number: u32, width: u32) -> Self {
        Self { number, width }
    }

    /// Returns the previous version, or an error if there is none (version 1 has no predecessor).
    pub fn previous(&self) -> Result<VersionNum> {
        if self.number < 2 {
            return Err(OcflError::IllegalState(
                "Versions cannot be less than 1".to_string(),
            ));
        }

        Ok(Self {
            number: self.number - 1,
            width: self.width,
        })
    }

    /// Returns the next version, or `OcflError::PaddingExhausted` if incrementing would not fit
    /// in this version's zero-padding width. Unpadded (width 0) versions have no limit.
    pub fn next(&self) -> Result<VersionNum> {
        let max = match self.width {
            0 => u32::MAX,
            w => 10u32.saturating_pow(w - 1).saturating_sub(1),
        };

        if self.number + 1 > max {
            return Err(OcflError::PaddingExhausted { width: self.width });
        }

        Ok(Self {
            number: self.number + 1,
            width: self.width,
        })
    }

    /// The full, contiguous lineage `V(1, P)..=V(head, P)` for this version's padding width.
    pub fn lineage_to(&self) -> Vec<VersionNum> {
        (1..=self.number)
            .map(|n| Self::with_width(n, self.width))
            .collect()
    }
}

impl TryFrom<&str> for VersionNum {
    type Error = OcflError;

    /// Parses a string in the format of `v1` or `v0002` into a `VersionNum`.
    fn try_from(version: &str) -> Result<Self, Self::Error> {
        if !VERSION_REGEX.is_match(version) {
            return Err(OcflError::IllegalArgument(format!(
                "Invalid version {}",
                version
            )));
        }

        match version[1..].parse::<u32>() {
            Ok(num) => {
                if num < 1 {
                    return Err(OcflError::IllegalArgument(format!(
                        "Invalid version {}",
                        version
                    )));
                }

                let width = match version.starts_with("v0") {
                    true => version.len() - 1,
                    false => 0,
                };

                Ok(Self {
                    number: num,
                    width: width as u32,
                })
            }
            Err(_) => Err(OcflError::IllegalArgument(format!(
                "Invalid version {}",
                version
            ))),
        }
    }
}

impl TryFrom<u32> for VersionNum {
    type Error = OcflError;

    fn try_from(version: u32) -> Result<Self, Self::Error> {
        if version < 1 {
            return Err(OcflError::IllegalArgument(format!(
                "Invalid version number {}",
                version
            )));
        }

        Ok(Self {
            number: version,
            width: 0,
        })
    }
}

impl FromStr for VersionNum {
    type Err = OcflError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match VersionNum::try_from(s) {
            Ok(v) => Ok(v),
            Err(_) => match u32::from_str(s) {
                Ok(parsed) => VersionNum::try_from(parsed),
                Err(_) => Err(OcflError::IllegalArgument(format!(
                    "Invalid version number {}",
                    s
                ))),
            },
        }
    }
}

impl fmt::Display for VersionNum {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "v{:0width$}", self.number, width = self.width as usize)
    }
}

impl From<VersionNum> for String {
    fn from(version_num: VersionNum) -> Self {
        format!("{}", version_num)
    }
}

impl PartialEq for VersionNum {
    fn eq(&self, other: &Self) -> bool {
        self.number == other.number
    }
}

impl Eq for VersionNum {}

impl Hash for VersionNum {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.number.hash(state)
    }
}

impl PartialOrd for VersionNum {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VersionNum {
    fn cmp(&self, other: &Self) -> Ordering {
        self.number.cmp(&other.number)
    }
}

impl VersionRef {
    pub fn resolve(&self, head_num: VersionNum) -> VersionNum {
        match self {
            Number(num) => *num,
            Head => head_num,
        }
    }
}

impl From<VersionNum> for VersionRef {
    fn from(num: VersionNum) -> Self {
        Self::Number(num)
    }
}

impl From<Option<VersionNum>> for VersionRef {
    fn from(num: Option<VersionNum>) -> Self {
        num.map_or(Head, Number)
    }
}

impl SpecVersion {
    /// The inventory `type` URI for this spec version
    pub fn inventory_type(&self) -> &'static str {
        match self {
            SpecVersion::Ocfl1_0 => INVENTORY_TYPE_1_0,
            SpecVersion::Ocfl1_1 => INVENTORY_TYPE_1_1,
        }
    }

    /// Resolves a spec version from an inventory's `type` field
    pub fn try_from_inventory_type(type_declaration: &str) -> Result<Self> {
        match type_declaration {
            INVENTORY_TYPE_1_0 => Ok(SpecVersion::Ocfl1_0),
            INVENTORY_TYPE_1_1 => Ok(SpecVersion::Ocfl1_1),
            other => Err(OcflError::UnsupportedSpec(other.to_string())),
        }
    }

    /// The name of the object-root Namaste declaration file for this spec version
    pub fn object_namaste_filename(&self) -> &'static str {
        match self {
            SpecVersion::Ocfl1_0 => OBJECT_NAMASTE_1_0,
            SpecVersion::Ocfl1_1 => OBJECT_NAMASTE_1_1,
        }
    }

    /// The contents of the object-root Namaste declaration file for this spec version
    pub fn object_namaste_content(&self) -> &'static str {
        match self {
            SpecVersion::Ocfl1_0 => OBJECT_NAMASTE_CONTENT_1_0,
            SpecVersion::Ocfl1_1 => OBJECT_NAMASTE_CONTENT_1_1,
        }
    }

    /// The name of the storage-root Namaste declaration file for this spec version
    pub fn root_namaste_filename(&self) -> &'static str {
        match self {
            SpecVersion::Ocfl1_0 => ROOT_NAMASTE_1_0,
            SpecVersion::Ocfl1_1 => ROOT_NAMASTE_1_1,
        }
    }

    /// The contents of the storage-root Namaste declaration file for this spec version
    pub fn root_namaste_content(&self) -> &'static str {
        match self {
            SpecVersion::Ocfl1_0 => ROOT_NAMASTE_CONTENT_1_0,
            SpecVersion::Ocfl1_1 => ROOT_NAMASTE_CONTENT_1_1,
        }
    }
}

impl PartialOrd for SpecVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SpecVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        fn rank(v: &SpecVersion) -> u8 {
            match v {
                SpecVersion::Ocfl1_0 => 0,
                SpecVersion::Ocfl1_1 => 1,
            }
        }
        rank(self).cmp(&rank(other))
    }
}

impl InventoryPath for InventoryPathInner {
    fn parts(&self) -> Split<char> {
        self.0.split('/')
    }

    fn parent(&self) -> Self {
        match self.0.rfind('/') {
            Some(last_slash) => Self(self.0.as_str()[0..last_slash].into()),
            None => Self("".to_string()),
        }
    }

    fn filename(&self) -> &str {
        match self.0.rfind('/') {
            Some(last_slash) => &self.0.as_str()[last_slash + 1..],
            None => self.0.as_str(),
        }
    }

    fn resolve(&self, other: &Self) -> Self {
        if self.0.is_empty() {
            other.clone()
        } else {
            Self(format!("{}/{}", self.0, other.0))
        }
    }

    fn ends_with(&self, suffix: &str) -> bool {
        self.0.ends_with(suffix)
    }

    fn starts_with(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }

    fn as_path(&self) -> &Path {
        self.as_ref()
    }

    fn as_str(&self) -> &str {
        self.as_ref()
    }

    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl InventoryPath for LogicalPath {
    fn parts(&self) -> Split<char> {
        self.inner.parts()
    }

    fn parent(&self) -> Self {
        Self {
            inner: self.inner.parent(),
        }
    }

    fn filename(&self) -> &str {
        self.inner.filename()
    }

    fn resolve(&self, other: &Self) -> Self {
        Self {
            inner: self.inner.resolve(&other.inner),
        }
    }

    fn ends_with(&self, suffix: &str) -> bool {
        self.inner.ends_with(suffix)
    }

    fn starts_with(&self, prefix: &str) -> bool {
        self.inner.starts_with(prefix)
    }

    fn as_path(&self) -> &Path {
        self.as_ref()
    }

    fn as_str(&self) -> &str {
        self.as_ref()
    }

    fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl InventoryPath for ContentPath {
    fn parts(&self) -> Split<char> {
        self.inner.parts()
    }

    fn parent(&self) -> Self {
        Self {
            inner: self.inner.parent(),
            version: self.version,
        }
    }

    fn filename(&self) -> &str {
        self.inner.filename()
    }

    fn resolve(&self, other: &Self) -> Self {
        Self {
            inner: self.inner.resolve(&other.inner),
            version: self.version,
        }
    }

    fn ends_with(&self, suffix: &str) -> bool {
        self.inner.ends_with(suffix)
    }

    fn starts_with(&self, prefix: &str) -> bool {
        self.inner.starts_with(prefix)
    }

    fn as_path(&self) -> &Path {
        self.as_ref()
    }

    fn as_str(&self) -> &str {
        self.as_ref()
    }

    fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl TryFrom<&str> for InventoryPathInner {
    type Error = OcflError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let trimmed = value.trim_start_matches('/').trim_end_matches('/');

        if !trimmed.is_empty() {
            let has_illegal_part = trimmed
                .split('/')
                .any(|part| part == "." || part == ".." || part.is_empty());

            if has_illegal_part {
                return Err(OcflError::IllegalArgument(format!(
                    "Paths may not contain '.', '..', or '' parts. Found: {} ",
                    value
                )));
            }
        }

        Ok(Self(trimmed.to_string()))
    }
}

impl TryFrom<&str> for LogicalPath {
    type Error = OcflError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Ok(Self {
            inner: InventoryPathInner::try_from(value)?,
        })
    }
}

impl TryFrom<&str> for ContentPath {
    type Error = OcflError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let inner = InventoryPathInner::try_from(value)?;

        let version = match value.find('/') {
            Some(index) => value[0..index].try_into()?,
            None => {
                return Err(OcflError::IllegalArgument(format!(
                    "Content paths must begin with a valid version number. Found: {} ",
                    value
                )));
            }
        };

        Ok(Self { inner, version })
    }
}

impl TryFrom<String> for InventoryPathInner {
    type Error = OcflError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.as_str().try_into()
    }
}

impl TryFrom<String> for LogicalPath {
    type Error = OcflError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Ok(Self {
            inner: InventoryPathInner::try_from(value)?,
        })
    }
}

impl TryFrom<String> for ContentPath {
    type Error = OcflError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl TryFrom<&String> for LogicalPath {
    type Error = OcflError;

    fn try_from(value: &String) -> Result<Self, Self::Error> {
        Ok(Self {
            inner: InventoryPathInner::try_from(value.as_str())?,
        })
    }
}

impl TryFrom<Cow<'_, str>> for LogicalPath {
    type Error = OcflError;

    fn try_from(value: Cow<'_, str>) -> Result<Self, Self::Error> {
        Ok(Self {
            inner: InventoryPathInner::try_from(value.as_ref())?,
        })
    }
}

impl From<InventoryPathInner> for String {
    fn from(path: InventoryPathInner) -> Self {
        path.0
    }
}

impl From<LogicalPath> for String {
    fn from(path: LogicalPath) -> Self {
        path.inner.0
    }
}

impl From<ContentPath> for String {
    fn from(path: ContentPath) -> Self {
        path.inner.0
    }
}

impl AsRef<str> for InventoryPathInner {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for LogicalPath {
    fn as_ref(&self) -> &str {
        self.inner.as_ref()
    }
}

impl AsRef<str> for ContentPath {
    fn as_ref(&self) -> &str {
        self.inner.as_ref()
    }
}

impl AsRef<Path> for InventoryPathInner {
    fn as_ref(&self) -> &Path {
        self.0.as_ref()
    }
}

impl AsRef<Path> for LogicalPath {
    fn as_ref(&self) -> &Path {
        self.inner.as_ref()
    }
}

impl AsRef<Path> for ContentPath {
    fn as_ref(&self) -> &Path {
        self.inner.as_ref()
    }
}

impl Display for InventoryPathInner {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for LogicalPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.inner.fmt(f)
    }
}

impl Display for ContentPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.inner.fmt(f)
    }
}

impl Serialize for ContentPath {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ContentPath {
    fn deserialize<D>(deserializer: D) -> Result<ContentPath, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_str(ContentPathVisitor)
    }
}

struct ContentPathVisitor;

impl<'de> Visitor<'de> for ContentPathVisitor {
    type Value = ContentPath;

    fn expecting(&self, formatter: &mut Formatter) -> std::fmt::Result {
        formatter.write_str("a path string that is a valid OCFL content path")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        v.try_into()
            .map_err(|e: OcflError| E::custom(e.to_string()))
    }
}
