//! Local full-text scoring over the loaded aggregation-point set.
//!
//! Runs synchronously on every keystroke; the corpus is whatever the
//! spatial cache already holds, so there is no network round-trip here.

use crate::model::Cto;

/// Display cap applied after sorting.
pub const CTO_RESULT_LIMIT: usize = 80;

/// Match quality ladder, best first. Derived `Ord` follows declaration
/// order, so sorting ascending puts the best rank on top.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum CtoRank {
    ExactUuid,
    UuidPrefix,
    UuidSubstring,
    NamePrefix,
    NameSubstring,
}

#[derive(Clone, Debug)]
pub struct CtoHit {
    pub cto: Cto,
    pub rank: CtoRank,
}

fn rank_cto(cto: &Cto, query: &str) -> Option<CtoRank> {
    let uuid = cto.uuid.to_lowercase();
    let name = cto.name.to_lowercase();
    if uuid == query {
        Some(CtoRank::ExactUuid)
    } else if uuid.starts_with(query) {
        Some(CtoRank::UuidPrefix)
    } else if uuid.contains(query) {
        Some(CtoRank::UuidSubstring)
    } else if name.starts_with(query) {
        Some(CtoRank::NamePrefix)
    } else if name.contains(query) {
        Some(CtoRank::NameSubstring)
    } else {
        None
    }
}

/// Scores the corpus against `query`. Non-matches are excluded entirely;
/// ties break by name, ascending, case-insensitive; results are capped at
/// [`CTO_RESULT_LIMIT`] after sorting.
pub fn search_ctos<'a>(corpus: impl Iterator<Item = &'a Cto>, query: &str) -> Vec<CtoHit> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Vec::new();
    }
    let mut hits: Vec<CtoHit> = corpus
        .filter_map(|cto| {
            rank_cto(cto, &query).map(|rank| CtoHit {
                cto: cto.clone(),
                rank,
            })
        })
        .collect();
    hits.sort_by(|a, b| {
        a.rank
            .cmp(&b.rank)
            .then_with(|| a.cto.name.to_lowercase().cmp(&b.cto.name.to_lowercase()))
    });
    hits.truncate(CTO_RESULT_LIMIT);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LatLon;

    fn cto(uuid: &str, name: &str) -> Cto {
        Cto {
            uuid: uuid.into(),
            name: name.into(),
            position: LatLon::new(0.0, 0.0),
        }
    }

    #[test]
    fn uuid_matches_outrank_name_matches() {
        let corpus = vec![cto("abc-1", "Node A"), cto("xyz-2", "abc strip")];
        let hits = search_ctos(corpus.iter(), "abc");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].cto.uuid, "abc-1");
        assert_eq!(hits[0].rank, CtoRank::UuidPrefix);
        assert_eq!(hits[1].rank, CtoRank::NameSubstring);
    }

    #[test]
    fn full_ladder_orders_as_specified() {
        let corpus = vec![
            cto("zz-abc", "E"),    // uuid substring
            cto("abc", "D"),       // exact uuid
            cto("abc-99", "C"),    // uuid prefix
            cto("q-1", "abc B"),   // name prefix
            cto("q-2", "the abc"), // name substring
        ];
        let hits = search_ctos(corpus.iter(), "abc");
        let ranks: Vec<CtoRank> = hits.iter().map(|h| h.rank).collect();
        assert_eq!(
            ranks,
            vec![
                CtoRank::ExactUuid,
                CtoRank::UuidPrefix,
                CtoRank::UuidSubstring,
                CtoRank::NamePrefix,
                CtoRank::NameSubstring,
            ]
        );
    }

    #[test]
    fn ties_break_by_name_case_insensitively() {
        let corpus = vec![
            cto("abc-2", "zeta"),
            cto("abc-3", "Alpha"),
            cto("abc-1", "beta"),
        ];
        let hits = search_ctos(corpus.iter(), "abc");
        let names: Vec<&str> = hits.iter().map(|h| h.cto.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "beta", "zeta"]);
    }

    #[test]
    fn non_matches_are_excluded_and_results_capped() {
        let mut corpus: Vec<Cto> = (0..200)
            .map(|i| cto(&format!("abc-{i:03}"), &format!("CTO {i:03}")))
            .collect();
        corpus.push(cto("zzz", "unrelated"));
        let hits = search_ctos(corpus.iter(), "abc");
        assert_eq!(hits.len(), CTO_RESULT_LIMIT);
        assert!(hits.iter().all(|h| h.cto.uuid.starts_with("abc")));
    }

    #[test]
    fn blank_query_matches_nothing() {
        let corpus = vec![cto("abc", "A")];
        assert!(search_ctos(corpus.iter(), "   ").is_empty());
    }
}
