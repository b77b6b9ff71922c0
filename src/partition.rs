use crate::config::{
    validate_test_fraction, SplitConfig, IMAGES_DIR, MASKS_DIR, TEST_DIR, TRAIN_DIR,
};
use crate::error::{Result, TilerError};
use crate::io::list_files;
use log::{debug, info};
use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    Train,
    Test,
}

impl Partition {
    pub fn dir_name(self) -> &'static str {
        match self {
            Partition::Train => TRAIN_DIR,
            Partition::Test => TEST_DIR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub file_name: String,
    pub partition: Partition,
}

/// Destination directories under a dataset root.
#[derive(Debug, Clone)]
pub struct PartitionLayout {
    root: PathBuf,
    class_subdir: Option<String>,
}

impl PartitionLayout {
    pub fn new(root: &Path, class_subdir: Option<&str>) -> Self {
        Self {
            root: root.to_path_buf(),
            class_subdir: class_subdir.map(str::to_string),
        }
    }

    fn nested(&self, partition: Partition, kind: &str) -> PathBuf {
        let dir = self.root.join(partition.dir_name()).join(kind);
        match &self.class_subdir {
            Some(sub) => dir.join(sub),
            None => dir,
        }
    }

    pub fn images_dir(&self, partition: Partition) -> PathBuf {
        self.nested(partition, IMAGES_DIR)
    }

    pub fn masks_dir(&self, partition: Partition) -> PathBuf {
        self.nested(partition, MASKS_DIR)
    }

    pub fn partition_dir(&self, partition: Partition) -> PathBuf {
        self.root.join(partition.dir_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionSummary {
    pub train: usize,
    pub test: usize,
    pub train_dir: PathBuf,
    pub test_dir: PathBuf,
}

impl PartitionSummary {
    pub fn log_summary(&self) {
        info!(
            "Train-test split complete: {} pairs in train set, {} pairs in test set",
            self.train, self.test
        );
        info!("Train directory: {}", self.train_dir.display());
        info!("Test directory: {}", self.test_dir.display());
    }
}

/// Train/test labels for a flat tile population, computed before any file moves.
#[derive(Debug, Clone)]
pub struct PartitionPlan {
    images_dir: PathBuf,
    masks_dir: PathBuf,
    assignments: Vec<Assignment>,
}

/// Number of files that go to the test set: floor(test_fraction × total).
pub fn test_cut(total: usize, test_fraction: f64) -> usize {
    ((test_fraction * total as f64).floor() as usize).min(total)
}

impl PartitionPlan {
    /// Assign the first `floor(test_fraction × N)` filenames (sorted) to Test and the
    /// rest to Train. Every image must have a same-named mask and vice versa.
    pub fn compute(images_dir: &Path, masks_dir: &Path, test_fraction: f64) -> Result<Self> {
        validate_test_fraction(test_fraction)?;

        let images = list_files(images_dir)?;
        let masks = list_files(masks_dir)?;

        let image_set: BTreeSet<&str> = images.iter().map(String::as_str).collect();
        let mask_set: BTreeSet<&str> = masks.iter().map(String::as_str).collect();

        if let Some(orphan) = image_set.difference(&mask_set).next() {
            return Err(TilerError::MissingPairedFile {
                path: masks_dir.join(orphan),
                relocated: 0,
            });
        }
        if let Some(orphan) = mask_set.difference(&image_set).next() {
            return Err(TilerError::MissingPairedFile {
                path: images_dir.join(orphan),
                relocated: 0,
            });
        }

        let cut = test_cut(images.len(), test_fraction);
        let assignments = images
            .into_iter()
            .enumerate()
            .map(|(n, file_name)| Assignment {
                file_name,
                partition: if n < cut {
                    Partition::Test
                } else {
                    Partition::Train
                },
            })
            .collect();

        Ok(Self {
            images_dir: images_dir.to_path_buf(),
            masks_dir: masks_dir.to_path_buf(),
            assignments,
        })
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    pub fn count(&self, partition: Partition) -> usize {
        self.assignments
            .iter()
            .filter(|a| a.partition == partition)
            .count()
    }

    /// Move every pair into `layout`. Destinations are created up front and checked so
    /// no existing file is overwritten; a failure part-way is reported with the number
    /// of pairs already moved and is not rolled back.
    pub fn execute(&self, layout: &PartitionLayout) -> Result<PartitionSummary> {
        for partition in [Partition::Train, Partition::Test] {
            for dir in [layout.images_dir(partition), layout.masks_dir(partition)] {
                if !dir.exists() {
                    info!("Creating {}", dir.display());
                }
                fs::create_dir_all(&dir).map_err(|source| TilerError::Relocate {
                    from: self.images_dir.clone(),
                    to: dir.clone(),
                    relocated: 0,
                    source,
                })?;
            }
        }

        for a in &self.assignments {
            for dest in [
                layout.images_dir(a.partition).join(&a.file_name),
                layout.masks_dir(a.partition).join(&a.file_name),
            ] {
                if dest.exists() {
                    return Err(TilerError::DestinationExists(dest));
                }
            }
        }

        for (relocated, a) in self.assignments.iter().enumerate() {
            let moves = [
                (
                    self.images_dir.join(&a.file_name),
                    layout.images_dir(a.partition).join(&a.file_name),
                ),
                (
                    self.masks_dir.join(&a.file_name),
                    layout.masks_dir(a.partition).join(&a.file_name),
                ),
            ];
            for (from, to) in moves {
                fs::rename(&from, &to).map_err(|source| {
                    if source.kind() == ErrorKind::NotFound {
                        TilerError::MissingPairedFile {
                            path: from.clone(),
                            relocated,
                        }
                    } else {
                        TilerError::Relocate {
                            from: from.clone(),
                            to: to.clone(),
                            relocated,
                            source,
                        }
                    }
                })?;
            }
            debug!("{} → {}", a.file_name, a.partition.dir_name());
        }

        for dir in [&self.images_dir, &self.masks_dir] {
            if let Err(e) = fs::remove_dir(dir) {
                debug!("Leaving {} in place: {}", dir.display(), e);
            }
        }

        Ok(PartitionSummary {
            train: self.count(Partition::Train),
            test: self.count(Partition::Test),
            train_dir: layout.partition_dir(Partition::Train),
            test_dir: layout.partition_dir(Partition::Test),
        })
    }
}

/// Split `<root>/Images` and `<root>/Masks` into `<root>/Train` and `<root>/Test`.
pub fn split_dataset(root: &Path, config: &SplitConfig) -> Result<PartitionSummary> {
    let plan = PartitionPlan::compute(
        &root.join(IMAGES_DIR),
        &root.join(MASKS_DIR),
        config.test_fraction,
    )?;
    info!(
        "Partition plan: {} tile pairs, {} test, {} train (test fraction {})",
        plan.assignments().len(),
        plan.count(Partition::Test),
        plan.count(Partition::Train),
        config.test_fraction
    );

    let layout = PartitionLayout::new(root, config.class_subdir.as_deref());
    plan.execute(&layout)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn populate(root: &Path, names: &[&str]) {
        for kind in [IMAGES_DIR, MASKS_DIR] {
            let dir = root.join(kind);
            fs::create_dir_all(&dir).unwrap();
            for name in names {
                fs::write(dir.join(name), kind.as_bytes()).unwrap();
            }
        }
    }

    #[test]
    fn test_cut_is_floor() {
        assert_eq!(test_cut(4, 0.3), 1);
        assert_eq!(test_cut(10, 0.3), 3);
        assert_eq!(test_cut(3, 0.3), 0);
        assert_eq!(test_cut(0, 0.3), 0);
        assert_eq!(test_cut(7, 0.0), 0);
    }

    #[test]
    fn test_plan_uses_sorted_order() {
        let dir = tempfile::tempdir().unwrap();
        populate(dir.path(), &["3_b.tif", "1_a.tif", "2_a.tif", "1_b.tif"]);

        let plan =
            PartitionPlan::compute(&dir.path().join(IMAGES_DIR), &dir.path().join(MASKS_DIR), 0.5)
                .unwrap();
        let labels: Vec<_> = plan
            .assignments()
            .iter()
            .map(|a| (a.file_name.as_str(), a.partition))
            .collect();
        assert_eq!(
            labels,
            vec![
                ("1_a.tif", Partition::Test),
                ("1_b.tif", Partition::Test),
                ("2_a.tif", Partition::Train),
                ("3_b.tif", Partition::Train),
            ]
        );
    }

    #[test]
    fn test_plan_rejects_orphans_before_moving() {
        let dir = tempfile::tempdir().unwrap();
        populate(dir.path(), &["1_a.tif", "2_a.tif"]);
        fs::remove_file(dir.path().join(MASKS_DIR).join("2_a.tif")).unwrap();

        let err = split_dataset(dir.path(), &SplitConfig::default()).unwrap_err();
        match err {
            TilerError::MissingPairedFile { path, relocated } => {
                assert_eq!(path, dir.path().join(MASKS_DIR).join("2_a.tif"));
                assert_eq!(relocated, 0);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // Nothing moved
        assert!(dir.path().join(IMAGES_DIR).join("1_a.tif").exists());
        assert!(!dir.path().join(TRAIN_DIR).exists());
    }

    #[test]
    fn test_plan_rejects_mask_without_image() {
        let dir = tempfile::tempdir().unwrap();
        populate(dir.path(), &["1_a.tif"]);
        fs::write(dir.path().join(MASKS_DIR).join("9_z.tif"), b"").unwrap();

        let err = split_dataset(dir.path(), &SplitConfig::default()).unwrap_err();
        assert!(matches!(err, TilerError::MissingPairedFile { .. }));
    }

    #[test]
    fn test_split_moves_pairs_together() {
        let dir = tempfile::tempdir().unwrap();
        let names: Vec<String> = (1..=10).map(|i| format!("{i}_scene.tif")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        populate(dir.path(), &refs);

        let summary = split_dataset(dir.path(), &SplitConfig::default()).unwrap();
        assert_eq!(summary.test, 3);
        assert_eq!(summary.train, 7);

        let layout = PartitionLayout::new(dir.path(), None);
        let test_images = list_files(&layout.images_dir(Partition::Test)).unwrap();
        let test_masks = list_files(&layout.masks_dir(Partition::Test)).unwrap();
        let train_images = list_files(&layout.images_dir(Partition::Train)).unwrap();
        let train_masks = list_files(&layout.masks_dir(Partition::Train)).unwrap();

        assert_eq!(test_images, test_masks);
        assert_eq!(train_images, train_masks);
        assert!(test_images.iter().all(|n| !train_images.contains(n)));

        let mut all: Vec<String> = test_images.into_iter().chain(train_images).collect();
        all.sort();
        let mut expected = names.clone();
        expected.sort();
        assert_eq!(all, expected);

        // Moved, not copied
        assert!(!dir.path().join(IMAGES_DIR).exists());
        assert!(!dir.path().join(MASKS_DIR).exists());
        let moved = fs::read(layout.masks_dir(Partition::Train).join("9_scene.tif")).unwrap();
        assert_eq!(moved, MASKS_DIR.as_bytes());
    }

    #[test]
    fn test_split_with_class_subdir() {
        let dir = tempfile::tempdir().unwrap();
        populate(dir.path(), &["1_a.tif", "2_a.tif", "3_a.tif", "4_a.tif"]);

        let config = SplitConfig::new(0.3, Some("samples".to_string())).unwrap();
        split_dataset(dir.path(), &config).unwrap();

        assert!(dir.path().join("Test/Images/samples/1_a.tif").exists());
        assert!(dir.path().join("Test/Masks/samples/1_a.tif").exists());
        assert!(dir.path().join("Train/Images/samples/4_a.tif").exists());
    }

    #[test]
    fn test_existing_destination_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        populate(dir.path(), &["1_a.tif", "2_a.tif"]);
        let layout = PartitionLayout::new(dir.path(), None);
        fs::create_dir_all(layout.images_dir(Partition::Train)).unwrap();
        fs::write(layout.images_dir(Partition::Train).join("2_a.tif"), b"old").unwrap();

        let plan = PartitionPlan::compute(
            &dir.path().join(IMAGES_DIR),
            &dir.path().join(MASKS_DIR),
            0.0,
        )
        .unwrap();
        let err = plan.execute(&layout).unwrap_err();
        assert!(matches!(err, TilerError::DestinationExists(_)));
        assert!(dir.path().join(IMAGES_DIR).join("1_a.tif").exists());
    }

    #[test]
    fn test_missing_file_during_moves_reports_progress() {
        let dir = tempfile::tempdir().unwrap();
        populate(dir.path(), &["1_a.tif", "2_a.tif"]);
        let plan = PartitionPlan::compute(
            &dir.path().join(IMAGES_DIR),
            &dir.path().join(MASKS_DIR),
            0.5,
        )
        .unwrap();
        fs::remove_file(dir.path().join(MASKS_DIR).join("2_a.tif")).unwrap();

        let err = plan.execute(&PartitionLayout::new(dir.path(), None)).unwrap_err();
        match err {
            TilerError::MissingPairedFile { path, relocated } => {
                assert_eq!(path, dir.path().join(MASKS_DIR).join("2_a.tif"));
                assert_eq!(relocated, 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // Not rolled back
        assert!(dir.path().join("Test/Images/1_a.tif").exists());
        assert!(dir.path().join("Test/Masks/1_a.tif").exists());
        assert!(dir.path().join("Train/Images/2_a.tif").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_move_reports_relocated_pairs() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        populate(dir.path(), &["1_a.tif", "2_a.tif"]);
        let layout = PartitionLayout::new(dir.path(), None);
        let locked = layout.masks_dir(Partition::Train);
        fs::create_dir_all(&locked).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();

        // Permission bits do not bind root
        let write_check = locked.join(".write_check");
        if fs::write(&write_check, b"").is_ok() {
            fs::remove_file(&write_check).unwrap();
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let plan = PartitionPlan::compute(
            &dir.path().join(IMAGES_DIR),
            &dir.path().join(MASKS_DIR),
            0.5,
        )
        .unwrap();
        let err = plan.execute(&layout).unwrap_err();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        match err {
            TilerError::Relocate {
                from,
                to,
                relocated,
                ..
            } => {
                assert_eq!(from, dir.path().join(MASKS_DIR).join("2_a.tif"));
                assert_eq!(to, locked.join("2_a.tif"));
                assert_eq!(relocated, 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_tile_fails_before_moving() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        populate(dir.path(), &["1_a.tif"]);
        let raw = OsStr::from_bytes(b"2_\xff.tif");
        fs::write(dir.path().join(IMAGES_DIR).join(raw), b"").unwrap();
        fs::write(dir.path().join(MASKS_DIR).join(raw), b"").unwrap();

        let err = split_dataset(dir.path(), &SplitConfig::default()).unwrap_err();
        assert!(matches!(err, TilerError::NonUtf8FileName(_)));
        assert!(dir.path().join(IMAGES_DIR).join("1_a.tif").exists());
        assert!(!dir.path().join(TRAIN_DIR).exists());
    }

    #[test]
    fn test_unlistable_directory_is_run_level() {
        let dir = tempfile::tempdir().unwrap();
        let err = split_dataset(dir.path(), &SplitConfig::default()).unwrap_err();
        assert!(matches!(err, TilerError::ListDir { .. }));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_invalid_ratio() {
        let dir = tempfile::tempdir().unwrap();
        populate(dir.path(), &["1_a.tif"]);
        let err = PartitionPlan::compute(
            &dir.path().join(IMAGES_DIR),
            &dir.path().join(MASKS_DIR),
            1.0,
        )
        .unwrap_err();
        assert!(matches!(err, TilerError::InvalidRatio(_)));
    }
}
