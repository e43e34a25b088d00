use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::info;

use crate::error::{AppError, Result};
use crate::identity::registry::IdentityRegistry;
use crate::types::PlayerId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeMember {
    pub id: PlayerId,
    pub name: String,
}

/// A proposed group of ids that likely belong to one person. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeCandidate {
    pub target_name: String,
    pub members: Vec<MergeMember>,
}

/// Levenshtein distance over Unicode scalars, two-row.
fn levenshtein(a: &[char], b: &[char]) -> usize {
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// `1 - distance / longer length`, in [0, 1]. Identical names score 1.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein(&a, &b) as f64 / longest as f64
}

struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut node = x;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }
}

/// Cluster current display names whose pairwise similarity reaches `threshold`.
///
/// Clustering is transitive (union-find). Every component with at least two display
/// names becomes one candidate holding every id shown under those names. The target
/// name is the most common original handle in the group, ties broken by the
/// lexicographically smallest. Read-only: applying a candidate is a separate alias call.
pub fn scan(registry: &IdentityRegistry, threshold: f64) -> Result<Vec<MergeCandidate>> {
    if !(threshold > 0.0 && threshold <= 1.0) {
        return Err(AppError::InvalidThreshold(threshold));
    }

    let identities = registry.list();
    let mut by_name: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (idx, identity) in identities.iter().enumerate() {
        by_name.entry(identity.display_name()).or_default().push(idx);
    }
    let names: Vec<&str> = by_name.keys().copied().collect();

    let mut uf = UnionFind::new(names.len());
    for i in 0..names.len() {
        for j in (i + 1)..names.len() {
            if similarity(names[i], names[j]) >= threshold {
                uf.union(i, j);
            }
        }
    }

    let mut components: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for i in 0..names.len() {
        components.entry(uf.find(i)).or_default().push(i);
    }

    let mut candidates: Vec<MergeCandidate> = components
        .into_values()
        .filter(|group| group.len() >= 2)
        .map(|group| {
            let mut members: Vec<MergeMember> = group
                .iter()
                .flat_map(|&n| by_name[names[n]].iter())
                .map(|&idx| MergeMember {
                    id: identities[idx].id.clone(),
                    name: identities[idx].display_name().to_string(),
                })
                .collect();
            members.sort_by(|a, b| a.id.cmp(&b.id));

            let mut counts: HashMap<&str, usize> = HashMap::new();
            for &n in &group {
                for &idx in &by_name[names[n]] {
                    let handle = identities[idx].original_handle.as_str();
                    *counts.entry(handle).or_default() += 1;
                }
            }
            let target_name = counts
                .into_iter()
                .max_by(|(na, ca), (nb, cb)| ca.cmp(cb).then_with(|| nb.cmp(na)))
                .map(|(name, _)| name.to_string())
                .unwrap_or_default();

            MergeCandidate {
                target_name,
                members,
            }
        })
        .collect();
    candidates.sort_by(|a, b| a.target_name.cmp(&b.target_name));

    info!(
        players = identities.len(),
        names = names.len(),
        candidates = candidates.len(),
        threshold,
        "merge scan complete"
    );
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(handles: &[&str]) -> IdentityRegistry {
        let r = IdentityRegistry::new();
        for h in handles {
            r.resolve(h);
        }
        r
    }

    #[test]
    fn similarity_is_normalized_edit_distance() {
        assert_eq!(similarity("abc", "abc"), 1.0);
        assert_eq!(similarity("abc", "xyz"), 0.0);
        assert_eq!(similarity("Bob_2341", "Bob2341"), 0.875);
        assert_eq!(similarity("", ""), 1.0);
        assert_eq!(similarity("é", "e"), 0.0);
    }

    #[test]
    fn near_duplicate_handles_merge_above_threshold_only() {
        let r = registry(&["Bob_2341", "Bob2341", "Zed"]);
        let found = scan(&r, 0.8).unwrap();
        assert_eq!(found.len(), 1);
        let names: Vec<&str> = found[0].members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"Bob_2341") && names.contains(&"Bob2341"));
        assert_eq!(found[0].target_name, "Bob2341");

        assert!(scan(&r, 0.95).unwrap().is_empty());
    }

    #[test]
    fn clustering_is_transitive() {
        // a~b and b~c clear 0.75, a~c alone does not.
        let r = registry(&["abcd", "abce", "abfe"]);
        assert!(similarity("abcd", "abfe") < 0.75);
        let found = scan(&r, 0.75).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].members.len(), 3);
        assert_eq!(found[0].target_name, "abcd");
    }

    #[test]
    fn threshold_one_without_duplicates_is_empty() {
        let r = registry(&["Alice", "alice", "Alice1", "Bob"]);
        assert!(scan(&r, 1.0).unwrap().is_empty());
    }

    #[test]
    fn tiny_threshold_yields_one_component() {
        let r = registry(&["Alice_7", "Bob_7", "Carla_7", "Dmitri_7", "Zed_7"]);
        let found = scan(&r, 0.01).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].members.len(), 5);
        assert_eq!(found[0].target_name, "Alice_7");
    }

    #[test]
    fn shared_alias_pulls_in_every_member() {
        let r = registry(&["Bob_2341", "Bob2341", "Bobb2341"]);
        let a = r.resolve("Bob_2341").id;
        let b = r.resolve("Bob2341").id;
        r.set_alias(&a, "Bob2341").unwrap();
        r.set_alias(&b, "Bob2341").unwrap();

        let found = scan(&r, 0.8).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].members.len(), 3);
        assert_eq!(found[0].target_name, "Bob2341");
    }

    #[test]
    fn ids_sharing_a_display_name_are_not_proposed_again() {
        let r = registry(&["x1", "x2"]);
        let ids: Vec<String> = r.list().into_iter().map(|p| p.id).collect();
        for id in &ids {
            r.set_alias(id, "Same").unwrap();
        }
        assert!(scan(&r, 1.0).unwrap().is_empty());
        assert!(scan(&r, 0.01).unwrap().is_empty());
    }

    #[test]
    fn scan_is_read_only_and_validates_threshold() {
        let r = registry(&["Bob_2341", "Bob2341"]);
        let before = r.list();
        scan(&r, 0.8).unwrap();
        assert_eq!(r.list(), before);

        assert!(matches!(scan(&r, 0.0), Err(AppError::InvalidThreshold(_))));
        assert!(matches!(scan(&r, 1.5), Err(AppError::InvalidThreshold(_))));
    }
}
