//! Greedy per-class merging of duplicate detections.
//!
//! Chips overlap, so one object near a chip boundary is usually reported
//! by every chip that sees it. Within each class, detections are visited
//! from highest to lowest score; each unresolved detection becomes a seed
//! and absorbs every unresolved detection of the same class whose box
//! overlaps it with IOU at or above the threshold. The merged detection
//! keeps the seed's box and score.

use super::GlobalDetection;
use crate::geometry::{BoundingBox, GeometryError};
use rayon::prelude::*;
use rstar::{AABB, RTree, RTreeObject};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// A group of detections merged into one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedDetection {
    /// Class identifier.
    pub class_id: u32,
    /// Highest score in the group.
    pub score: f32,
    /// Box of the highest-scoring detection.
    pub bbox: BoundingBox,
    /// Id of the detection whose box was kept.
    pub seed: usize,
    /// Chip the seed came from.
    pub chip: usize,
    /// Ids of every detection in the group, ascending.
    pub members: Vec<usize>,
}

impl MergedDetection {
    /// Number of detections in the group.
    pub fn merged_count(&self) -> usize {
        self.members.len()
    }

    /// View as a single detection identified by its seed.
    pub fn as_global(&self) -> GlobalDetection {
        GlobalDetection {
            id: self.seed,
            chip: self.chip,
            bbox: self.bbox,
            class_id: self.class_id,
            score: self.score,
        }
    }
}

/// A detection left out of merging because its box is malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedDetection {
    /// Detection id.
    pub id: usize,
    /// What was wrong with it.
    pub error: GeometryError,
}

/// Result of [`merge_detections`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeOutcome {
    /// Merged detections, ascending by class, then descending by score.
    pub detections: Vec<MergedDetection>,
    /// Number of detections absorbed into another.
    pub merges: usize,
    /// Detections dropped for malformed geometry.
    pub skipped: Vec<SkippedDetection>,
}

struct Candidate {
    index: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for Candidate {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

fn envelope_of(bbox: &BoundingBox) -> AABB<[f64; 2]> {
    let (lo, hi) = bbox.corners();
    AABB::from_corners(lo, hi)
}

/// Merge duplicate detections.
///
/// Two detections of the same class merge when their boxes share positive
/// area and their IOU is at least `min(merge_thresh, 1)`. A threshold of
/// zero merges any overlap; a threshold of one or more merges only
/// identical boxes. Classes are processed in parallel on the current rayon
/// pool; the result does not depend on thread count.
pub fn merge_detections(detections: &[GlobalDetection], merge_thresh: f64) -> MergeOutcome {
    let thresh = merge_thresh.clamp(0.0, 1.0);

    let mut skipped = Vec::new();
    let mut by_class: BTreeMap<u32, Vec<&GlobalDetection>> = BTreeMap::new();
    for detection in detections {
        match detection.bbox.validate() {
            Ok(()) => by_class.entry(detection.class_id).or_default().push(detection),
            Err(error) => {
                warn!(
                    "Skipping detection {} from chip {}: {}",
                    detection.id, detection.chip, error
                );
                skipped.push(SkippedDetection {
                    id: detection.id,
                    error,
                });
            }
        }
    }

    let classes: Vec<Vec<&GlobalDetection>> = by_class.into_values().collect();
    let detections: Vec<MergedDetection> = classes
        .into_par_iter()
        .map(|class| merge_class(class, thresh))
        .flatten()
        .collect();

    let merges = detections.iter().map(|d| d.members.len() - 1).sum();
    debug!(
        "Merged to {} detections ({} absorbed, {} skipped)",
        detections.len(),
        merges,
        skipped.len()
    );

    MergeOutcome {
        detections,
        merges,
        skipped,
    }
}

/// Greedy merge of one class. Every input box is valid.
fn merge_class(mut arena: Vec<&GlobalDetection>, thresh: f64) -> Vec<MergedDetection> {
    arena.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.id.cmp(&b.id)));

    let tree = RTree::bulk_load(
        arena
            .iter()
            .enumerate()
            .map(|(index, d)| Candidate {
                index,
                envelope: envelope_of(&d.bbox),
            })
            .collect(),
    );

    let mut resolved = vec![false; arena.len()];
    let mut merged = Vec::new();

    for seed_index in 0..arena.len() {
        if resolved[seed_index] {
            continue;
        }
        resolved[seed_index] = true;
        let seed = arena[seed_index];

        let mut members = vec![seed.id];
        for neighbour in tree.locate_in_envelope_intersecting(&envelope_of(&seed.bbox)) {
            let index = neighbour.index;
            if resolved[index] {
                continue;
            }
            let candidate = arena[index];
            if seed.bbox.intersection_area(&candidate.bbox) > 0.0
                && seed.bbox.iou(&candidate.bbox) >= thresh
            {
                resolved[index] = true;
                members.push(candidate.id);
            }
        }
        members.sort_unstable();

        merged.push(MergedDetection {
            class_id: seed.class_id,
            score: seed.score,
            bbox: seed.bbox,
            seed: seed.id,
            chip: seed.chip,
            members,
        });
    }

    merged
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    fn det(id: usize, class_id: u32, score: f32, bbox: [f64; 4]) -> GlobalDetection {
        GlobalDetection {
            id,
            chip: id,
            bbox: BoundingBox::new(bbox[0], bbox[1], bbox[2], bbox[3]),
            class_id,
            score,
        }
    }

    /// Duplicates of one object, as produced by overlapping chips.
    fn cluster() -> Vec<GlobalDetection> {
        vec![
            det(0, 1, 0.70, [100.0, 100.0, 140.0, 140.0]),
            det(1, 1, 0.95, [102.0, 101.0, 141.0, 139.0]),
            det(2, 1, 0.60, [110.0, 110.0, 150.0, 150.0]),
            det(3, 1, 0.80, [125.0, 125.0, 165.0, 165.0]),
            det(4, 1, 0.50, [500.0, 500.0, 520.0, 520.0]),
        ]
    }

    #[test]
    fn test_keeps_highest_score_geometry() {
        let outcome = merge_detections(&cluster()[..2], 0.5);
        assert_eq!(outcome.detections.len(), 1);
        let merged = &outcome.detections[0];
        assert_eq!(merged.seed, 1);
        assert_eq!(merged.score, 0.95);
        assert_eq!(merged.bbox, BoundingBox::new(102.0, 101.0, 141.0, 139.0));
        assert_eq!(merged.members, vec![0, 1]);
        assert_eq!(outcome.merges, 1);
    }

    #[test]
    fn test_classes_never_merge() {
        let detections = vec![
            det(0, 2, 0.9, [0.0, 0.0, 10.0, 10.0]),
            det(1, 1, 0.8, [0.0, 0.0, 10.0, 10.0]),
        ];
        let outcome = merge_detections(&detections, 0.0);
        assert_eq!(outcome.detections.len(), 2);
        assert_eq!(outcome.detections[0].class_id, 1);
        assert_eq!(outcome.detections[1].class_id, 2);
    }

    #[test]
    fn test_merge_is_idempotent() {
        for thresh in [0.0, 0.05, 0.3, 0.7, 1.0] {
            let first = merge_detections(&cluster(), thresh);
            let again: Vec<GlobalDetection> =
                first.detections.iter().map(MergedDetection::as_global).collect();
            let second = merge_detections(&again, thresh);
            assert_eq!(second.merges, 0, "thresh {thresh}");
            let boxes = |o: &MergeOutcome| o.detections.iter().map(|d| d.bbox).collect::<Vec<_>>();
            assert_eq!(boxes(&first), boxes(&second), "thresh {thresh}");
        }
    }

    #[test]
    fn test_duplicate_cluster_count_shrinks_as_threshold_drops() {
        let thresholds = [1.0, 0.8, 0.5, 0.3, 0.1, 0.05, 0.0];
        let counts: Vec<usize> = thresholds
            .iter()
            .map(|&t| merge_detections(&cluster(), t).detections.len())
            .collect();
        assert!(counts.windows(2).all(|w| w[1] <= w[0]), "{counts:?}");
        assert_eq!(counts[0], 5);
        assert_eq!(*counts.last().unwrap(), 2);
    }

    #[test]
    fn test_lower_threshold_can_yield_more_detections() {
        // A strip between two halves of a larger box: the strip outscores
        // the box and only absorbs it at a low threshold.
        let detections = vec![
            det(0, 1, 0.9, [4.0, 0.0, 6.0, 10.0]),
            det(1, 1, 0.8, [0.0, 0.0, 10.0, 10.0]),
            det(2, 1, 0.7, [0.0, 0.0, 4.0, 10.0]),
            det(3, 1, 0.6, [6.0, 0.0, 10.0, 10.0]),
        ];

        let high = merge_detections(&detections, 0.3);
        assert_eq!(high.detections.len(), 2);
        assert_eq!(high.merges, 2);
        let members: Vec<_> = high.detections.iter().map(|d| d.members.clone()).collect();
        assert!(members.contains(&vec![0]));
        assert!(members.contains(&vec![1, 2, 3]));

        let low = merge_detections(&detections, 0.1);
        assert_eq!(low.detections.len(), 3);
        assert_eq!(low.merges, 1);
        let members: Vec<_> = low.detections.iter().map(|d| d.members.clone()).collect();
        assert!(members.contains(&vec![0, 1]));
    }

    #[test]
    fn test_zero_threshold_requires_positive_overlap() {
        let detections = vec![
            det(0, 1, 0.9, [0.0, 0.0, 10.0, 10.0]),
            det(1, 1, 0.8, [10.0, 0.0, 20.0, 10.0]),
            det(2, 1, 0.7, [9.0, 9.0, 30.0, 30.0]),
        ];
        let outcome = merge_detections(&detections, 0.0);
        assert_eq!(outcome.detections.len(), 2);
        assert_eq!(outcome.detections[0].members, vec![0, 2]);
        assert_eq!(outcome.detections[1].members, vec![1]);
    }

    #[test]
    fn test_threshold_above_one_merges_only_identical() {
        let detections = vec![
            det(0, 1, 0.9, [0.0, 0.0, 10.0, 10.0]),
            det(1, 1, 0.8, [0.0, 0.0, 10.0, 10.0]),
            det(2, 1, 0.7, [0.0, 0.0, 10.0, 10.5]),
        ];
        let outcome = merge_detections(&detections, 1.5);
        assert_eq!(outcome.detections.len(), 2);
        assert_eq!(outcome.detections[0].members, vec![0, 1]);
    }

    #[test]
    fn test_equal_scores_break_ties_by_id() {
        let detections = vec![
            det(7, 1, 0.5, [0.0, 0.0, 10.0, 10.0]),
            det(3, 1, 0.5, [1.0, 1.0, 11.0, 11.0]),
        ];
        let outcome = merge_detections(&detections, 0.1);
        assert_eq!(outcome.detections[0].seed, 3);
    }

    #[test]
    fn test_malformed_boxes_are_skipped() {
        let detections = vec![
            det(0, 1, 0.9, [0.0, 0.0, 10.0, 10.0]),
            det(1, 1, 0.8, [f64::NAN, 0.0, 10.0, 10.0]),
            det(2, 1, 0.7, [5.0, 5.0, 5.0, 9.0]),
        ];
        let outcome = merge_detections(&detections, 0.5);
        assert_eq!(outcome.detections.len(), 1);
        assert_eq!(
            outcome.skipped,
            vec![
                SkippedDetection {
                    id: 1,
                    error: GeometryError::NonFinite
                },
                SkippedDetection {
                    id: 2,
                    error: GeometryError::Degenerate
                },
            ]
        );
    }

    #[test]
    fn test_result_independent_of_thread_count() {
        let mut detections = cluster();
        for i in 0..40u32 {
            let offset = f64::from(i) * 7.0;
            let score = 0.5 + f32::from(u16::try_from(i).unwrap()) / 100.0;
            let bbox = [offset, offset, offset + 20.0, offset + 20.0];
            detections.push(det(10 + i as usize, i % 3, score, bbox));
        }
        let single = rayon::ThreadPoolBuilder::new().num_threads(1).build().unwrap();
        let many = rayon::ThreadPoolBuilder::new().num_threads(4).build().unwrap();
        let a = single.install(|| merge_detections(&detections, 0.2));
        let b = many.install(|| merge_detections(&detections, 0.2));
        assert_eq!(a, b);
    }
}
