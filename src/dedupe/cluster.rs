//! First-pass canon discovery: partition the full tag set into clusters at
//! a similarity threshold.
//!
//! Pairs scoring above the threshold become edges of an undirected graph;
//! connected components are the clusters. Each cluster's shortest (then
//! lexicographically first) member becomes the canonical name, so canon is
//! always drawn from the input set.

use petgraph::graph::UnGraph;
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;

use super::similarity::PairModel;

/// One discovered cluster: a canonical name plus the members mapping to it
/// with the model's pairwise confidence against the canon.
#[derive(Debug, Clone, PartialEq)]
pub struct TagCluster {
    pub canonical: String,
    /// Non-canonical members with their confidence scores.
    pub members: Vec<(String, f64)>,
}

/// Cluster the tag set with the given model and membership threshold.
pub fn cluster_tags(model: &PairModel, tags: &[String], threshold: f64) -> Vec<TagCluster> {
    let mut graph: UnGraph<usize, f64> = UnGraph::new_undirected();
    let nodes: Vec<_> = (0..tags.len()).map(|idx| graph.add_node(idx)).collect();
    for i in 0..tags.len() {
        for j in (i + 1)..tags.len() {
            let score = model.score(&tags[i], &tags[j]);
            if score > threshold {
                graph.add_edge(nodes[i], nodes[j], score);
            }
        }
    }

    let mut components = UnionFind::new(graph.node_count());
    for edge in graph.edge_references() {
        components.union(edge.source().index(), edge.target().index());
    }

    let mut groups: Vec<Vec<usize>> = vec![Vec::new(); tags.len()];
    for idx in 0..tags.len() {
        groups[components.find(idx)].push(idx);
    }

    let mut clusters = Vec::new();
    for group in groups.into_iter().filter(|group| !group.is_empty()) {
        let canonical_idx = group
            .iter()
            .copied()
            .min_by(|&a, &b| {
                tags[a]
                    .len()
                    .cmp(&tags[b].len())
                    .then_with(|| tags[a].cmp(&tags[b]))
            })
            .expect("non-empty group");
        let canonical = tags[canonical_idx].clone();
        let members = group
            .into_iter()
            .filter(|&idx| idx != canonical_idx)
            .map(|idx| {
                let confidence = model.score(&tags[idx], &canonical);
                (tags[idx].clone(), confidence)
            })
            .collect();
        clusters.push(TagCluster { canonical, members });
    }
    clusters.sort_by(|a, b| a.canonical.cmp(&b.canonical));
    clusters
}
