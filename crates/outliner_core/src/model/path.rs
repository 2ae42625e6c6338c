//! Occurrence addressing inside the note graph.
//!
//! # Responsibility
//! - Name one occurrence of a child inside its parent (`Segment`).
//! - Name one occurrence of a note relative to an anchor (`Path`).
//! - Own the canonical text forms used for fold state and persisted sessions.
//!
//! # Invariants
//! - Segment text is `<id>:<iteration>` with 1-10 iteration digits.
//! - Path text is segments joined by `/`; the empty string is the anchor.
//! - `parse(format(x)) == x` for every well-formed value.

use crate::model::note::NoteId;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

static SEGMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^/]+):([0-9]{1,10})$").expect("valid segment regex"));

/// Errors for malformed address text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// Text does not match `<id>:<iteration>`.
    MalformedSegment(String),
    /// At least one `/`-separated part is not a valid segment.
    MalformedPath(String),
}

impl Display for PathError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedSegment(text) => write!(f, "malformed segment: `{text}`"),
            Self::MalformedPath(text) => write!(f, "malformed path: `{text}`"),
        }
    }
}

impl Error for PathError {}

const MAX_ITERATION_EXCLUSIVE: u64 = 10_000_000_000;

fn is_addressable_id(id: &str) -> bool {
    !id.is_empty() && !id.contains('/')
}

/// One occurrence of `id` among the children of some parent.
///
/// `iteration` counts earlier occurrences of the same id in that parent's
/// child list, starting at zero.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Segment {
    pub id: NoteId,
    pub iteration: usize,
}

impl Segment {
    /// Builds a segment from parts.
    ///
    /// `id` must be non-empty and free of `/`, and `iteration` must fit in
    /// ten decimal digits; otherwise the canonical text does not parse back.
    pub fn new(id: NoteId, iteration: usize) -> Self {
        debug_assert!(
            is_addressable_id(id.as_str()),
            "segment id must be non-empty and contain no `/`"
        );
        debug_assert!(
            (iteration as u64) < MAX_ITERATION_EXCLUSIVE,
            "segment iteration exceeds ten digits"
        );
        Self { id, iteration }
    }

    /// Parses canonical `<id>:<iteration>` text.
    pub fn parse(text: &str) -> Result<Self, PathError> {
        let caps = SEGMENT_RE
            .captures(text)
            .ok_or_else(|| PathError::MalformedSegment(text.to_string()))?;
        let iteration = caps[2]
            .parse::<usize>()
            .map_err(|_| PathError::MalformedSegment(text.to_string()))?;
        Ok(Self {
            id: NoteId::from_raw(&caps[1]),
            iteration,
        })
    }

    /// Canonical text form, inverse of [`Segment::parse`].
    pub fn format(&self) -> String {
        self.to_string()
    }

    /// Derives the segment of every entry in `children`, in list order.
    ///
    /// The result is only valid for this exact child list; any edit to the
    /// list can shift iterations.
    pub fn enumerate(children: &[NoteId]) -> Vec<Segment> {
        let mut seen: HashMap<&NoteId, usize> = HashMap::new();
        children
            .iter()
            .map(|id| {
                let counter = seen.entry(id).or_default();
                let segment = Segment::new(id.clone(), *counter);
                *counter += 1;
                segment
            })
            .collect()
    }
}

impl Display for Segment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.id, self.iteration)
    }
}

impl FromStr for Segment {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Either half of a [`Path::concat`] argument list.
#[derive(Debug, Clone)]
pub enum PathPart {
    Segment(Segment),
    Path(Path),
}

impl From<Segment> for PathPart {
    fn from(value: Segment) -> Self {
        Self::Segment(value)
    }
}

impl From<Path> for PathPart {
    fn from(value: Path) -> Self {
        Self::Path(value)
    }
}

/// Root-to-target sequence of segments, relative to an anchor note.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path {
    segments: Vec<Segment>,
}

impl Path {
    /// The empty path, addressing the anchor itself.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Parses canonical `/`-joined segment text; `""` is the empty path.
    pub fn parse(text: &str) -> Result<Self, PathError> {
        if text.is_empty() {
            return Ok(Self::root());
        }
        let segments = text
            .split('/')
            .map(Segment::parse)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| PathError::MalformedPath(text.to_string()))?;
        Ok(Self { segments })
    }

    /// Canonical text form, inverse of [`Path::parse`].
    pub fn format(&self) -> String {
        self.to_string()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// Returns a new path with `parts` appended in order.
    pub fn concat<I, P>(&self, parts: I) -> Path
    where
        I: IntoIterator<Item = P>,
        P: Into<PathPart>,
    {
        let mut segments = self.segments.clone();
        for part in parts {
            match part.into() {
                PathPart::Segment(segment) => segments.push(segment),
                PathPart::Path(path) => segments.extend(path.segments),
            }
        }
        Path { segments }
    }

    /// Shorthand for appending a single segment.
    pub fn child(&self, segment: Segment) -> Path {
        self.concat([segment])
    }

    /// Path without its last segment, or `None` for the empty path.
    pub fn parent(&self) -> Option<Path> {
        if self.segments.is_empty() {
            return None;
        }
        Some(self.prefix(self.segments.len() - 1))
    }

    /// This path followed by every proper prefix, longest first.
    pub fn ancestors(&self) -> Vec<Path> {
        (0..=self.segments.len())
            .rev()
            .map(|len| self.prefix(len))
            .collect()
    }

    /// True iff `other` cut to this path's length formats identically.
    pub fn is_prefix_of(&self, other: &Path) -> bool {
        if other.segments.len() < self.segments.len() {
            return false;
        }
        other.prefix(self.segments.len()).format() == self.format()
    }

    /// The first `len` segments (the whole path if `len` exceeds it).
    pub fn prefix(&self, len: usize) -> Path {
        Path {
            segments: self.segments[..len.min(self.segments.len())].to_vec(),
        }
    }
}

impl Display for Path {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (index, segment) in self.segments.iter().enumerate() {
            if index > 0 {
                f.write_str("/")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Path {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.format().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Path {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Path::parse(&text).map_err(serde::de::Error::custom)
    }
}

impl Serialize for Segment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.format().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Segment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Segment::parse(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::{Path, PathError, PathPart, Segment};
    use crate::model::note::NoteId;
    use proptest::prelude::*;

    fn seg(id: &str, iteration: usize) -> Segment {
        Segment::new(NoteId::from_raw(id), iteration)
    }

    #[test]
    fn segment_parse_and_format_are_inverse() {
        let segment = Segment::parse("nABC:12").expect("segment should parse");
        assert_eq!(segment, seg("nABC", 12));
        assert_eq!(segment.format(), "nABC:12");
        assert_eq!(Segment::parse(&seg("x", 0).format()).unwrap(), seg("x", 0));
    }

    #[test]
    fn segment_id_may_contain_colons() {
        let segment = Segment::parse("a:b:3").expect("greedy id should parse");
        assert_eq!(segment, seg("a:b", 3));
        assert_eq!(segment.format(), "a:b:3");
    }

    #[test]
    fn segment_parse_rejects_malformed_text() {
        for text in ["", "abc", "abc:", ":1", "a/b:1", "a:-1", "a:1x", "a:12345678901"] {
            assert_eq!(
                Segment::parse(text),
                Err(PathError::MalformedSegment(text.to_string())),
                "{text} should be rejected"
            );
        }
    }

    #[test]
    fn path_parse_handles_empty_and_nested_text() {
        assert!(Path::parse("").unwrap().is_empty());
        let path = Path::parse("a:0/b:1/a:2").unwrap();
        assert_eq!(path.segments(), &[seg("a", 0), seg("b", 1), seg("a", 2)]);
        assert_eq!(path.format(), "a:0/b:1/a:2");
    }

    #[test]
    fn path_parse_reports_whole_text_on_bad_segment() {
        let err = Path::parse("a:0//b:1").unwrap_err();
        assert_eq!(err, PathError::MalformedPath("a:0//b:1".to_string()));
    }

    #[test]
    fn concat_accepts_segments_and_paths_without_mutating() {
        let base = Path::parse("a:0").unwrap();
        let tail = Path::parse("c:0/d:1").unwrap();
        let joined = base.concat([PathPart::from(seg("b", 0)), PathPart::from(tail.clone())]);
        assert_eq!(joined.format(), "a:0/b:0/c:0/d:1");
        assert_eq!(base.format(), "a:0");
        assert_eq!(tail.format(), "c:0/d:1");
    }

    #[test]
    fn parent_of_empty_path_is_none() {
        assert_eq!(Path::root().parent(), None);
        let path = Path::parse("a:0/b:0").unwrap();
        assert_eq!(path.parent().unwrap().format(), "a:0");
    }

    #[test]
    fn ancestors_are_ordered_longest_first() {
        let path = Path::parse("a:0/b:1/c:0").unwrap();
        let ancestors = path.ancestors();
        assert_eq!(ancestors.len(), path.len() + 1);
        assert_eq!(ancestors.first(), Some(&path));
        assert_eq!(ancestors.last(), Some(&Path::root()));
        for pair in ancestors.windows(2) {
            assert_eq!(pair[0].len(), pair[1].len() + 1);
        }
    }

    #[test]
    fn prefix_check_distinguishes_iterations() {
        let prefix = Path::parse("a:0/b:0").unwrap();
        assert!(prefix.is_prefix_of(&Path::parse("a:0/b:0").unwrap()));
        assert!(prefix.is_prefix_of(&Path::parse("a:0/b:0/c:3").unwrap()));
        assert!(!prefix.is_prefix_of(&Path::parse("a:0/b:1/c:3").unwrap()));
        assert!(!prefix.is_prefix_of(&Path::parse("a:0").unwrap()));
        assert!(Path::root().is_prefix_of(&prefix));
    }

    #[test]
    fn enumerate_counts_duplicates_per_id() {
        let children = ["a", "b", "a", "a", "b"]
            .into_iter()
            .map(NoteId::from_raw)
            .collect::<Vec<_>>();
        let segments = Segment::enumerate(&children);
        let formatted = segments.iter().map(Segment::format).collect::<Vec<_>>();
        assert_eq!(formatted, ["a:0", "b:0", "a:1", "a:2", "b:1"]);
    }

    #[test]
    fn path_serializes_as_canonical_string() {
        let path = Path::parse("a:0/b:2").unwrap();
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "\"a:0/b:2\"");
        let back: Path = serde_json::from_str(&json).unwrap();
        assert_eq!(back, path);
        assert!(serde_json::from_str::<Path>("\"a:x\"").is_err());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "contain no `/`")]
    fn segment_new_rejects_ids_with_slashes_in_debug_builds() {
        let _ = seg("a/b", 0);
    }

    fn id_strategy() -> impl Strategy<Value = NoteId> {
        proptest::string::string_regex("[^/]{1,12}")
            .unwrap_or_else(|e| panic!("regex failed: {e}"))
            .prop_map(NoteId::from_raw)
    }

    fn segment_strategy() -> impl Strategy<Value = Segment> {
        (id_strategy(), 0usize..10_000_000)
            .prop_map(|(id, iteration)| Segment::new(id, iteration))
    }

    fn path_strategy() -> impl Strategy<Value = Path> {
        prop::collection::vec(segment_strategy(), 0..6).prop_map(Path::from_segments)
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]

        #[test]
        fn segment_text_round_trips(segment in segment_strategy()) {
            let text = segment.format();
            prop_assert_eq!(Segment::parse(&text), Ok(segment));
        }

        #[test]
        fn canonical_segment_text_round_trips(
            text in proptest::string::string_regex("[^/]{1,12}:(0|[1-9][0-9]{0,9})")
                .unwrap_or_else(|e| panic!("regex failed: {e}"))
        ) {
            let segment = Segment::parse(&text);
            prop_assert!(segment.is_ok(), "{} should parse", text);
            prop_assert_eq!(segment.map(|it| it.format()), Ok(text));
        }

        #[test]
        fn path_text_round_trips(path in path_strategy()) {
            let text = path.format();
            prop_assert_eq!(Path::parse(&text), Ok(path.clone()));
            prop_assert_eq!(Path::parse(&text).map(|it| it.format()), Ok(text));
        }

        #[test]
        fn ancestors_walk_parents_down_to_root(path in path_strategy()) {
            let ancestors = path.ancestors();
            prop_assert_eq!(ancestors.len(), path.len() + 1);
            prop_assert_eq!(ancestors.first(), Some(&path));
            prop_assert_eq!(ancestors.last(), Some(&Path::root()));
            for pair in ancestors.windows(2) {
                let parent = pair[0].parent();
                prop_assert_eq!(parent.as_ref(), Some(&pair[1]));
            }
        }

        #[test]
        fn prefix_check_matches_segment_prefix(a in path_strategy(), b in path_strategy()) {
            let expected = b.len() >= a.len() && b.segments()[..a.len()] == *a.segments();
            prop_assert_eq!(a.is_prefix_of(&b), expected);
            for ancestor in b.ancestors() {
                prop_assert!(ancestor.is_prefix_of(&b));
            }
        }
    }
}
