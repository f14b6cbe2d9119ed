//! Audacity label-track ingestion.
//!
//! A label is a named time interval from the marker track of an Audacity
//! project. Times arrive in seconds and are truncated to integer
//! centiseconds, the tick unit used everywhere else in the compiler.

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::Deserialize;

use crate::error::CompileError;

/// A named time interval, `[start, end)` in centiseconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub title: String,
    pub start: i64,
    pub end: i64,
}

impl Label {
    /// The label's own span in ticks.
    pub fn span(&self) -> i64 {
        self.end - self.start
    }

    /// The `:`-delimited title tokens, trimmed.
    pub fn tokens(&self) -> Vec<String> {
        self.title.split(':').map(|t| t.trim().to_string()).collect()
    }
}

/// Parse a `c<id>[,<id>...]` club-scope token, e.g. `c1` or `C 2,3`.
/// Returns the club ids as written, or `None` if the token is not a club
/// specification.
pub fn parse_club_spec(token: &str) -> Option<Vec<String>> {
    let rest = token.strip_prefix(['c', 'C'])?.trim_start();
    let ids: Vec<String> = rest.split(',').map(str::to_string).collect();
    let all_numeric = ids
        .iter()
        .all(|id| !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()));
    if all_numeric {
        Some(ids)
    } else {
        None
    }
}

/// Build the name → label map used by expression resolution. Duplicate
/// titles are fatal: an expression reference would be ambiguous.
pub fn build_map(labels: Vec<Label>) -> Result<HashMap<String, Label>, CompileError> {
    let mut map = HashMap::new();
    for label in labels {
        if map.contains_key(&label.title) {
            return Err(CompileError::redefinition(
                format!("Label {} defined more than once", label.title),
                None,
            ));
        }
        map.insert(label.title.clone(), label);
    }
    Ok(map)
}

// ── XML reading ─────────────────────────────────────────────────────

/// Failure while ingesting the label file, before any compilation starts.
#[derive(Debug)]
pub enum LabelError {
    Io(std::io::Error),
    Xml(quick_xml::DeError),
}

impl fmt::Display for LabelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelError::Io(e) => write!(f, "{e}"),
            LabelError::Xml(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for LabelError {}

impl From<std::io::Error> for LabelError {
    fn from(e: std::io::Error) -> Self {
        LabelError::Io(e)
    }
}

impl From<quick_xml::DeError> for LabelError {
    fn from(e: quick_xml::DeError) -> Self {
        LabelError::Xml(e)
    }
}

#[derive(Debug, Deserialize)]
struct AudacityProject {
    #[serde(rename = "labeltrack", default)]
    label_tracks: Vec<LabelTrack>,
}

#[derive(Debug, Deserialize)]
struct LabelTrack {
    #[serde(rename = "label", default)]
    labels: Vec<XmlLabel>,
}

#[derive(Debug, Deserialize)]
struct XmlLabel {
    #[serde(rename = "@title")]
    title: String,
    #[serde(rename = "@t")]
    start: f64,
    #[serde(rename = "@t1")]
    end: f64,
}

/// Read every label from an Audacity project file, in document order.
pub fn read_labels(path: &Path) -> Result<Vec<Label>, LabelError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let project: AudacityProject = quick_xml::de::from_reader(reader)?;
    Ok(collect_labels(project))
}

/// Parse labels from in-memory XML. Split out for tests.
#[cfg(test)]
fn parse_labels(xml: &str) -> Result<Vec<Label>, LabelError> {
    let project: AudacityProject = quick_xml::de::from_str(xml)?;
    Ok(collect_labels(project))
}

#[allow(clippy::cast_possible_truncation)] // centisecond counts fit i64 for any real show
fn collect_labels(project: AudacityProject) -> Vec<Label> {
    project
        .label_tracks
        .into_iter()
        .flat_map(|track| track.labels)
        .map(|l| Label {
            title: l.title,
            start: (l.start * 100.0) as i64,
            end: (l.end * 100.0) as i64,
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::indexing_slicing)]
mod tests {
    use super::*;

    const PROJECT: &str = r#"<?xml version="1.0"?>
<project>
  <labeltrack name="markers">
    <label t="0.500000" t1="1.999990" title="intro"/>
    <label t="2.0" t1="3.25" title="c1,2:red"/>
  </labeltrack>
</project>"#;

    #[test]
    fn reads_labels_in_centiseconds() {
        let labels = parse_labels(PROJECT).unwrap();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels[0].title, "intro");
        assert_eq!(labels[0].start, 50);
        // 1.99999 * 100 truncates, never rounds up
        assert_eq!(labels[0].end, 199);
        assert_eq!(labels[1].start, 200);
        assert_eq!(labels[1].end, 325);
    }

    #[test]
    fn tokens_split_and_trim() {
        let label = Label {
            title: "c1 , 2 : ramp : red".into(),
            start: 0,
            end: 10,
        };
        assert_eq!(label.tokens(), vec!["c1 , 2", "ramp", "red"]);
    }

    #[test]
    fn club_spec_accepts_id_lists() {
        assert_eq!(parse_club_spec("c1"), Some(vec!["1".to_string()]));
        assert_eq!(
            parse_club_spec("C 2,3"),
            Some(vec!["2".to_string(), "3".to_string()])
        );
        assert_eq!(parse_club_spec("chorus"), None);
        assert_eq!(parse_club_spec("c"), None);
        assert_eq!(parse_club_spec("c1,"), None);
        assert_eq!(parse_club_spec("red"), None);
    }

    #[test]
    fn duplicate_titles_are_rejected() {
        let dup = vec![
            Label { title: "verse".into(), start: 0, end: 10 },
            Label { title: "verse".into(), start: 20, end: 30 },
        ];
        let err = build_map(dup).unwrap_err();
        assert_eq!(err.message, "Label verse defined more than once");
        assert_eq!(err.line, None);
    }

    #[test]
    fn span_is_end_minus_start() {
        let label = Label { title: "x".into(), start: 150, end: 400 };
        assert_eq!(label.span(), 250);
    }
}
