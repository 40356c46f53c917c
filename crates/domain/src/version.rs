//! Versionable entities - add-on components and products with a dotted
//! `release.sp.patch` version string.
//!
//! One segment of the dotted version may hold a wildcard literal:
//! `NEXT` resolves to the next free value of that segment, `MAX` to the
//! highest existing one. The actual catalog query lives in `adk-infra`;
//! this module owns parsing, padding and increment semantics.

use crate::errors::{AdkError, Result};

/// Wildcard literal resolving a segment to its next free value.
pub const WILDCARD_NEXT: &str = "NEXT";
/// Wildcard literal resolving a segment to the highest existing value.
pub const WILDCARD_MAX: &str = "MAX";

const TECH_LEVEL_WIDTH: usize = 4;

/// The three segments of a dotted version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionSegment {
    Release,
    SpLevel,
    PatchLevel,
}

impl VersionSegment {
    /// Catalog attribute the segment is sorted by during resolution.
    pub fn order_by(self) -> &'static str {
        match self {
            VersionSegment::Release => "TechRelease",
            VersionSegment::SpLevel => "TechSpLevel",
            VersionSegment::PatchLevel => "TechPatchLevel",
        }
    }
}

/// Which wildcard kind occupies a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WildcardKind {
    Next,
    Max,
}

/// A pending wildcard: the segment it sits in and its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wildcard {
    pub segment: VersionSegment,
    pub kind: WildcardKind,
}

/// Technical version levels of one catalog entry, as returned by AAKaaS.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedLevels {
    pub tech_release: String,
    pub tech_sp_level: String,
    pub tech_patch_level: String,
}

/// A named entity with a dotted `release.sp.patch` version.
///
/// `tech_sp_level` and `tech_patch_level` are zero-padded to four digits;
/// `tech_release` is unpadded. At most one of the three may hold a
/// wildcard literal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Versionable {
    pub name: String,
    pub version: String,
    pub tech_release: String,
    pub tech_sp_level: String,
    pub tech_patch_level: String,
}

impl Versionable {
    /// Parse a dotted version string for the named entity.
    ///
    /// Rejects empty names and version strings that do not consist of
    /// exactly three dot-separated segments.
    pub fn new(name: &str, dotted: &str) -> Result<Self> {
        if name.is_empty() {
            return Err(AdkError::Config(
                "Versionable entity must have a name".to_string(),
            ));
        }
        let segments: Vec<&str> = dotted.split('.').collect();
        if segments.len() != 3 {
            return Err(AdkError::Config(format!(
                "Version '{dotted}' must consist of three segments 'release.sp.patch'"
            )));
        }

        let wildcards = segments.iter().filter(|segment| is_wildcard(segment)).count();
        if wildcards > 1 {
            return Err(AdkError::Config(format!(
                "Version '{dotted}' may contain at most one wildcard segment"
            )));
        }

        let versionable = Self {
            name: name.to_string(),
            version: dotted.to_string(),
            tech_release: check_segment(segments[0], dotted)?.to_string(),
            tech_sp_level: pad_level(check_segment(segments[1], dotted)?),
            tech_patch_level: pad_level(check_segment(segments[2], dotted)?),
        };
        Ok(versionable)
    }

    /// The pending wildcard, if any segment holds one.
    pub fn wildcard(&self) -> Option<Wildcard> {
        for (segment, value) in [
            (VersionSegment::Release, &self.tech_release),
            (VersionSegment::SpLevel, &self.tech_sp_level),
            (VersionSegment::PatchLevel, &self.tech_patch_level),
        ] {
            let kind = match value.as_str() {
                WILDCARD_NEXT => WildcardKind::Next,
                WILDCARD_MAX => WildcardKind::Max,
                _ => continue,
            };
            return Some(Wildcard { segment, kind });
        }
        None
    }

    /// Replace the pending wildcard with its resolved value.
    ///
    /// `hit` is the single catalog entry found for the query (or `None`
    /// for an empty result set). `NEXT` increments the found value by one
    /// (baseline zero without a hit); `MAX` adopts the found value as-is
    /// (baseline zero without a hit). Lower segments are reset to zero.
    pub fn apply_wildcard(&mut self, hit: Option<&ResolvedLevels>) -> Result<()> {
        let Some(wildcard) = self.wildcard() else {
            return Ok(());
        };

        match wildcard.segment {
            VersionSegment::Release => {
                let found = match hit {
                    Some(levels) => parse_level(&levels.tech_release)?,
                    None => 0,
                };
                self.tech_release = next_value(found, wildcard.kind).to_string();
                self.tech_sp_level = pad_number(0);
                self.tech_patch_level = pad_number(0);
            }
            VersionSegment::SpLevel => {
                let found = match hit {
                    Some(levels) => parse_level(&levels.tech_sp_level)?,
                    None => 0,
                };
                self.tech_sp_level = pad_number(next_value(found, wildcard.kind));
                self.tech_patch_level = pad_number(0);
            }
            VersionSegment::PatchLevel => {
                let found = match hit {
                    Some(levels) => parse_level(&levels.tech_patch_level)?,
                    None => 0,
                };
                self.tech_patch_level = pad_number(next_value(found, wildcard.kind));
            }
        }

        self.version = format!(
            "{}.{}.{}",
            parse_level(&self.tech_release)?,
            parse_level(&self.tech_sp_level)?,
            parse_level(&self.tech_patch_level)?,
        );
        Ok(())
    }
}

fn is_wildcard(segment: &str) -> bool {
    segment == WILDCARD_NEXT || segment == WILDCARD_MAX
}

fn check_segment<'a>(segment: &'a str, dotted: &str) -> Result<&'a str> {
    if is_wildcard(segment) || segment.parse::<u32>().is_ok() {
        Ok(segment)
    } else {
        Err(AdkError::Config(format!(
            "Version segment '{segment}' in '{dotted}' is neither numeric nor a wildcard"
        )))
    }
}

fn pad_level(segment: &str) -> String {
    if is_wildcard(segment) {
        return segment.to_string();
    }
    format!("{segment:0>TECH_LEVEL_WIDTH$}")
}

fn pad_number(value: u32) -> String {
    format!("{value:0TECH_LEVEL_WIDTH$}")
}

fn parse_level(value: &str) -> Result<u32> {
    value.parse::<u32>().map_err(|_| {
        AdkError::Parse(format!("Technical version level '{value}' is not numeric"))
    })
}

fn next_value(found: u32, kind: WildcardKind) -> u32 {
    match kind {
        WildcardKind::Next => found + 1,
        WildcardKind::Max => found,
    }
}
