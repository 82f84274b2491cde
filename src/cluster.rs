//! Partition a batch of texts into groups from their similarity matrix.
//!
//! Vector-mode matrices go through average-linkage agglomerative clustering.
//! Keyword-mode matrices use a greedy single pass: each unassigned item seeds a
//! cluster and pulls in every later unassigned item similar enough to the seed.
//! The greedy pass is order dependent (the earlier item always becomes the seed).

use crate::similarity::{SimilarityMatrix, SimilarityMode};

/// Slack for distances computed as `1 - similarity`
const DISTANCE_EPSILON: f32 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterParams {
    /// Agglomerative merging stops once this many clusters remain
    pub target_clusters: usize,
    pub min_cluster_size: usize,
    /// Minimum similarity for two items (or two clusters, by average linkage) to be grouped
    pub similarity_threshold: f32,
}

/// A group of item indices from one clustering call
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    /// Ascending indices into the similarity matrix
    pub members: Vec<usize>,
    /// Mean pairwise similarity among members
    pub cohesion: f32,
}

impl Cluster {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Enough clusters that the `top_n` largest are still meaningful after small
/// ones are discarded: `max(2, min(3 * top_n, n / 2))`.
pub fn target_cluster_count(top_n: usize, n: usize) -> usize {
    (3 * top_n).min(n / 2).max(2)
}

/// Cluster, drop groups below `min_cluster_size`, and rank by size.
///
/// Ties in size keep the order of each cluster's first member.
pub fn cluster(matrix: &SimilarityMatrix, params: &ClusterParams) -> Vec<Cluster> {
    let groups = match matrix.mode() {
        SimilarityMode::Vector => agglomerative_average(
            matrix,
            params.target_clusters,
            1.0 - params.similarity_threshold,
        ),
        SimilarityMode::Jaccard => greedy_threshold(matrix, params.similarity_threshold),
    };

    let mut clusters: Vec<Cluster> = groups
        .into_iter()
        .filter(|members| members.len() >= params.min_cluster_size)
        .map(|members| Cluster {
            cohesion: matrix.cohesion(&members),
            members,
        })
        .collect();

    clusters.sort_by(|a, b| b.len().cmp(&a.len()));

    tracing::debug!(
        "Clustering produced {} groups of size >= {}: {:?}",
        clusters.len(),
        params.min_cluster_size,
        clusters.iter().map(Cluster::len).collect::<Vec<_>>()
    );

    clusters
}

/// Average-linkage agglomerative clustering on `d = 1 - sim`.
///
/// Merges the closest pair of clusters until `target` clusters remain or the
/// closest pair is farther apart than `max_distance`. Equal distances merge the
/// pair with the lowest indices first. Returns groups ordered by first member.
pub fn agglomerative_average(
    matrix: &SimilarityMatrix,
    target: usize,
    max_distance: f32,
) -> Vec<Vec<usize>> {
    let n = matrix.len();
    let mut distance = vec![0.0f32; n * n];
    for i in 0..n {
        for j in 0..n {
            if i != j {
                distance[i * n + j] = 1.0 - matrix.get(i, j);
            }
        }
    }

    let mut groups: Vec<Option<Vec<usize>>> = (0..n).map(|i| Some(vec![i])).collect();
    let mut active = n;

    while active > target.max(1) {
        let mut closest: Option<(usize, usize, f32)> = None;
        for a in 0..n {
            if groups[a].is_none() {
                continue;
            }
            for b in (a + 1)..n {
                if groups[b].is_none() {
                    continue;
                }
                let d = distance[a * n + b];
                if closest.map_or(true, |(_, _, best)| d < best) {
                    closest = Some((a, b, d));
                }
            }
        }

        let Some((a, b, d)) = closest else { break };
        if d > max_distance + DISTANCE_EPSILON {
            break;
        }

        let size_a = groups[a].as_ref().map_or(0, Vec::len) as f32;
        let Some(absorbed) = groups[b].take() else { break };
        let size_b = absorbed.len() as f32;

        // Lance-Williams update for average linkage
        for c in 0..n {
            if c == a || c == b || groups[c].is_none() {
                continue;
            }
            let merged =
                (size_a * distance[a * n + c] + size_b * distance[b * n + c]) / (size_a + size_b);
            distance[a * n + c] = merged;
            distance[c * n + a] = merged;
        }

        if let Some(members) = groups[a].as_mut() {
            members.extend(absorbed);
        }
        active -= 1;
    }

    let mut result: Vec<Vec<usize>> = groups
        .into_iter()
        .flatten()
        .map(|mut members| {
            members.sort_unstable();
            members
        })
        .collect();
    result.sort_by_key(|members| members[0]);
    result
}

/// Greedy single-pass grouping around seeds.
pub fn greedy_threshold(matrix: &SimilarityMatrix, threshold: f32) -> Vec<Vec<usize>> {
    let n = matrix.len();
    let mut assigned = vec![false; n];
    let mut groups = Vec::new();

    for i in 0..n {
        if assigned[i] {
            continue;
        }
        assigned[i] = true;
        let mut members = vec![i];

        for j in (i + 1)..n {
            if !assigned[j] && matrix.get(i, j) >= threshold {
                assigned[j] = true;
                members.push(j);
            }
        }

        groups.push(members);
    }

    groups
}
