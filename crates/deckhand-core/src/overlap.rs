//! Same-slide pairwise overlap annotation.

use std::collections::BTreeMap;

use crate::extract::ShapeRecord;
use crate::geometry::overlaps;

/// Fill `overlaps_with` for every record.
///
/// Each unordered pair of distinct records on the same slide is tested once
/// and both sides are updated, so the relation is symmetric. Records on
/// different slides are never compared. Existing `overlaps_with` contents
/// are replaced. Quadratic per slide; slides hold tens of shapes.
pub fn annotate_overlaps(records: &mut [ShapeRecord]) {
    let mut by_slide: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (i, record) in records.iter_mut().enumerate() {
        record.overlaps_with.clear();
        by_slide.entry(record.slide_index).or_default().push(i);
    }

    for members in by_slide.values() {
        for (n, &i) in members.iter().enumerate() {
            for &j in &members[n + 1..] {
                if overlaps(&records[i], &records[j]) {
                    let id_j = records[j].id.clone();
                    let id_i = records[i].id.clone();
                    records[i].overlaps_with.push(id_j);
                    records[j].overlaps_with.push(id_i);
                }
            }
        }
    }
}
