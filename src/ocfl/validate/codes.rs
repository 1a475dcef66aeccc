//! The validation code taxonomy: every `E*`/`W*` identifier the validator can emit, and which
//! spec version(s) it applies to. Kept as a plain data table rather than parsed from an external
//! resource -- there are two versions (1.0, 1.1) and the set of codes barely differs between
//! them, so a build-time CSV would be more machinery than the data warrants.

use strum_macros::Display as EnumDisplay;

use crate::ocfl::SpecVersion;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, EnumDisplay)]
#[allow(clippy::upper_case_acronyms)]
pub enum ErrorCode {
    E001,
    E003,
    E004,
    E007,
    E008,
    E012,
    E015,
    E019,
    E023,
    E033,
    E036,
    E037,
    E038,
    E040,
    E041,
    E049,
    E058,
    E060,
    E061,
    E063,
    E064,
    E066,
    E067,
    E072,
    E073,
    E083,
    E084,
    E088,
    E092,
    E093,
    E095,
    E102,
    E103,
    E111,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, EnumDisplay)]
#[allow(clippy::upper_case_acronyms)]
pub enum WarnCode {
    W001,
    W002,
    W004,
    W005,
    W007,
    W008,
    W009,
    W010,
    W011,
    W013,
}

impl ErrorCode {
    /// A short human-readable description of what this code means, independent of spec version.
    pub fn description(&self) -> &'static str {
        use ErrorCode::*;
        match self {
            E001 => "Unexpected file or directory in object root",
            E003 => "Object root does not contain a NAMASTE declaration",
            E004 => "NAMASTE declaration content does not match its filename",
            E007 => "NAMASTE declaration content is invalid",
            E008 => "Object root NAMASTE declares an unsupported spec version",
            E012 => "contentDirectory must not contain a forward slash",
            E015 => "Unexpected file in a version directory",
            E019 => "Version inventory 'contentDirectory' does not match the root",
            E023 => "A manifest-referenced file is missing from the version that introduced it",
            E033 => "Inventory could not be parsed as JSON",
            E036 => "Inventory is missing a required key",
            E037 => "Version inventory 'id' does not match the root",
            E038 => "Inventory 'type' field is not a supported spec URI",
            E040 => "Version inventory 'head' does not match its own version directory",
            E041 => "Manifest references a path outside an allowed content directory",
            E049 => "contentDirectory must not equal '.' or '..'",
            E058 => "Inventory sidecar file does not exist",
            E060 => "Sidecar digest does not match the recomputed inventory digest",
            E061 => "Sidecar file is malformed",
            E063 => "inventory.json does not exist",
            E064 => "Head version inventory digest does not match the root inventory digest",
            E066 => "Version inventory state/manifest is not consistent with the root inventory",
            E067 => "extensions directory contains a non-directory entry",
            E072 => "Storage root NAMASTE declaration is missing or invalid",
            E073 => "ocfl_layout.json is malformed",
            E083 => "Inventory 'id' does not match the expected object identifier",
            E084 => "A non-object directory beneath the storage root does not resolve to an object root",
            E088 => "A directory beneath the storage root is neither an object root nor empty",
            E092 => "Manifest-registered file content does not match its declared digest",
            E093 => "Fixity-registered file content does not match its declared digest",
            E095 => "Multiple content paths map to the same logical path in a version state",
            E102 => "Inventory JSON contains an unrecognized field",
            E103 => "Version inventory spec version is lower than an earlier version's",
            E111 => "Digest recorded for a path changed between two inventories",
        }
    }

    /// True if this code is defined for the given spec version. Every code in the table applies
    /// to both 1.0 and 1.1 except E103 and E111, which describe an invariant (monotonic spec
    /// version, stable path digests across inventories) that only has meaning once more than one
    /// spec version can appear in a single object's history -- i.e. from 1.1 onward.
    pub fn applies_to(&self, spec: SpecVersion) -> bool {
        match self {
            ErrorCode::E103 | ErrorCode::E111 => spec >= SpecVersion::Ocfl1_1,
            _ => true,
        }
    }
}

impl WarnCode {
    pub fn description(&self) -> &'static str {
        use WarnCode::*;
        match self {
            W001 => "Recommend using zero-padded version numbers consistently",
            W002 => "Unexpected directory in a version directory",
            W004 => "Recommend sha512 over sha256 as the digest algorithm",
            W005 => "Inventory 'id' should be a URI",
            W007 => "Inventory version is missing a recommended key",
            W008 => "contentDirectory should not equal the default when explicitly set to it",
            W009 => "Recommend providing a user address",
            W010 => "Version directory is missing its own inventory.json",
            W011 => "Version inventory user/message/created differs from the root inventory",
            W013 => "Unknown extension directory beneath extensions/",
        }
    }
}
