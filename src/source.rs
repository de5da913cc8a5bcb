//! Supervisor candidates and where they came from.
//!
//! The shortlist, the connections list and academician search each return a
//! differently shaped record. They are tagged at fetch time and resolved once into
//! a [`SupervisorCandidate`].

use crate::api::normalize;
use crate::model::PartyRef;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

#[derive(Debug, Clone, Deserialize)]
pub struct ShortlistEntry {
    #[serde(default, alias = "supervisor", deserialize_with = "normalize::party_opt")]
    pub academician: Option<PartyRef>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionEntry {
    #[serde(
        default,
        alias = "connected_user",
        alias = "user",
        deserialize_with = "normalize::party_opt"
    )]
    pub academician: Option<PartyRef>,
    #[serde(default)]
    pub connected_at: Option<String>,
}

/// Search results are the academician record itself.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "Value")]
pub struct SearchHit {
    pub academician: Option<PartyRef>,
    pub research_areas: Vec<String>,
}

impl From<Value> for SearchHit {
    fn from(v: Value) -> Self {
        let research_areas = v
            .get("research_areas")
            .and_then(Value::as_array)
            .map(|areas| {
                areas
                    .iter()
                    .filter_map(|a| a.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        Self {
            academician: normalize::party(&v),
            research_areas,
        }
    }
}

#[derive(Debug, Clone)]
pub enum CandidateSource {
    Shortlist(ShortlistEntry),
    Connection(ConnectionEntry),
    Search(SearchHit),
}

/// Declaration order is merge priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Shortlist,
    Connection,
    Search,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupervisorCandidate {
    pub academician: PartyRef,
    pub source: SourceKind,
    pub note: Option<String>,
}

impl CandidateSource {
    pub fn kind(&self) -> SourceKind {
        match self {
            CandidateSource::Shortlist(_) => SourceKind::Shortlist,
            CandidateSource::Connection(_) => SourceKind::Connection,
            CandidateSource::Search(_) => SourceKind::Search,
        }
    }

    /// Entries without a usable academician are dropped.
    pub fn resolve(self) -> Option<SupervisorCandidate> {
        let source = self.kind();
        let (academician, note) = match self {
            CandidateSource::Shortlist(e) => (e.academician, e.note),
            CandidateSource::Connection(e) => (
                e.academician,
                e.connected_at.map(|at| format!("Connected since {at}")),
            ),
            CandidateSource::Search(hit) => {
                let note = (!hit.research_areas.is_empty()).then(|| hit.research_areas.join(", "));
                (hit.academician, note)
            }
        };
        Some(SupervisorCandidate {
            academician: academician?,
            source,
            note,
        })
    }
}

/// Resolve and merge candidates from every source.
///
/// When the same academician appears in several sources the shortlist entry wins,
/// then connections, then search. Order within a source is preserved.
pub fn merge(sources: impl IntoIterator<Item = CandidateSource>) -> Vec<SupervisorCandidate> {
    let mut resolved: Vec<SupervisorCandidate> =
        sources.into_iter().filter_map(CandidateSource::resolve).collect();
    resolved.sort_by_key(|c| c.source);

    let mut seen = HashSet::new();
    resolved.retain(|c| match c.academician.id {
        Some(id) => seen.insert(id),
        None => true,
    });
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse<T: serde::de::DeserializeOwned>(v: Value) -> T {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn each_shape_resolves_to_the_same_candidate_type() {
        let shortlist = CandidateSource::Shortlist(parse(json!({
            "academician": { "academician_id": 1, "full_name": "Dr. A" },
            "note": "Strong in NLP"
        })));
        let connection = CandidateSource::Connection(parse(json!({
            "connected_user": {
                "user": { "name": "Dr. B", "academician": { "academician_id": 2 } }
            },
            "connected_at": "2024-02-01"
        })));
        let search = CandidateSource::Search(parse(json!({
            "academician_id": 3, "full_name": "Dr. C", "research_areas": ["Robotics", "Control"]
        })));

        let a = shortlist.resolve().unwrap();
        assert_eq!((a.academician.id, a.source), (Some(1), SourceKind::Shortlist));
        assert_eq!(a.note.as_deref(), Some("Strong in NLP"));

        let b = connection.resolve().unwrap();
        assert_eq!(b.academician.name.as_deref(), Some("Dr. B"));
        assert_eq!(b.note.as_deref(), Some("Connected since 2024-02-01"));

        let c = search.resolve().unwrap();
        assert_eq!(c.note.as_deref(), Some("Robotics, Control"));
    }

    #[test]
    fn entries_without_academician_are_dropped() {
        let empty = CandidateSource::Shortlist(parse(json!({ "note": "orphan" })));
        assert!(empty.resolve().is_none());
    }

    #[test]
    fn merge_prefers_shortlist_then_connection() {
        let merged = merge(vec![
            CandidateSource::Search(parse(json!({ "academician_id": 1, "full_name": "Dr. A" }))),
            CandidateSource::Search(parse(json!({ "academician_id": 4, "full_name": "Dr. D" }))),
            CandidateSource::Connection(parse(json!({
                "academician": { "academician_id": 1, "name": "Dr. A" }
            }))),
            CandidateSource::Shortlist(parse(json!({
                "academician": { "academician_id": 1, "full_name": "Dr. A" }
            }))),
            CandidateSource::Connection(parse(json!({
                "academician": { "academician_id": 2, "name": "Dr. B" }
            }))),
        ]);
        let got: Vec<(Option<u64>, SourceKind)> =
            merged.iter().map(|c| (c.academician.id, c.source)).collect();
        assert_eq!(
            got,
            vec![
                (Some(1), SourceKind::Shortlist),
                (Some(2), SourceKind::Connection),
                (Some(4), SourceKind::Search),
            ]
        );
    }
}
