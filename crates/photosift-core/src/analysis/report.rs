//! Human-readable duplicate report assembly.

use crate::duplicate::GroupingOutcome;
use crate::types::DuplicateReport;

/// Build the duplicate section of the results document.
pub fn build_duplicate_report(grouping: &GroupingOutcome, total_images: usize) -> DuplicateReport {
    let duplicate_images: usize = grouping.groups.iter().map(|g| g.count - 1).sum();

    let recommendations = if duplicate_images > 0 {
        vec![
            format!(
                "Found {duplicate_images} duplicate images out of {total_images} total images."
            ),
            format!(
                "Consider keeping only the primary image from each duplicate group to save \
                 {duplicate_images} images."
            ),
        ]
    } else {
        vec!["No duplicates found. All images appear to be unique.".to_string()]
    };

    DuplicateReport {
        summary: grouping.summary.clone(),
        groups: grouping.groups.clone(),
        recommendations,
    }
}
