//! Deterministic work-package partitioner.
//!
//! The same post-filter sequence set is partitioned independently per
//! enabled model, because batch sizing and worker pools are model-specific.
//! Partitioning is pure: same input and configuration → same packages, which
//! is what makes re-runs reproducible.

use fantasia_core::types::{ModelId, SequenceRecord, WorkPackage};

/// Split `records` into packages of at most `package_size` for `model_id`.
///
/// Ordering within a package is stable input order; `package_id` is the
/// zero-based chunk index. Concatenating all packages in id order
/// reproduces the input exactly (lossless partition).
#[must_use]
pub fn partition_for_model(
    records: &[SequenceRecord],
    model_id: ModelId,
    package_size: usize,
) -> Vec<WorkPackage> {
    debug_assert!(package_size > 0, "validated by RunConfig");
    records
        .chunks(package_size.max(1))
        .enumerate()
        .map(|(index, chunk)| WorkPackage::new(index as u64, model_id, chunk.to_vec()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(n: usize) -> Vec<SequenceRecord> {
        (0..n)
            .map(|i| SequenceRecord::new(format!("Q{i}"), "MKTAYIAK").unwrap())
            .collect()
    }

    #[test]
    fn partition_is_lossless() {
        let input = records(23);
        let packages = partition_for_model(&input, ModelId::ProtT5, 5);
        assert_eq!(packages.len(), 5);

        let rebuilt: Vec<SequenceRecord> = packages
            .iter()
            .flat_map(|p| p.records.iter().cloned())
            .collect();
        assert_eq!(rebuilt, input);
    }

    #[test]
    fn package_sizes_are_bounded() {
        let packages = partition_for_model(&records(23), ModelId::ProtT5, 5);
        assert!(packages.iter().all(|p| p.len() <= 5));
        assert_eq!(packages.last().unwrap().len(), 3);
    }

    #[test]
    fn package_ids_are_sequential() {
        let packages = partition_for_model(&records(12), ModelId::Esm2, 4);
        let ids: Vec<u64> = packages.iter().map(|p| p.package_id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert!(packages.iter().all(|p| p.model_id == ModelId::Esm2));
    }

    #[test]
    fn empty_input_yields_no_packages() {
        assert!(partition_for_model(&[], ModelId::ProtT5, 5).is_empty());
    }

    #[test]
    fn partition_is_deterministic() {
        let input = records(17);
        let a = partition_for_model(&input, ModelId::ProtT5, 4);
        let b = partition_for_model(&input, ModelId::ProtT5, 4);
        assert_eq!(a, b);
    }
}
