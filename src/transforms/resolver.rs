use std::collections::{HashMap, HashSet};

use glam::DMat4;
use id_arena::Arena;
use itertools::iproduct;

use crate::config::{FailurePolicy, ResolverOptions};
use crate::container::{join_path, normalize_path, Container, Value};
use crate::error::{ConversionError, Result};
use crate::transforms::frame::{ChainLink, FrameMap, ResolvedFrame};
use crate::transforms::record::{RecordId, TransformRecord, CHAIN_END};
use crate::units::UnitNormalizer;

const DEPENDS_ON: &str = "depends_on";

/// A group carrying a `depends_on` dataset, before its chain is followed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameLink {
    /// Group path relative to the root group.
    pub name: String,
    /// Container path of the group holding the `depends_on` dataset.
    pub group: String,
    /// First record of the chain, `None` for frames sitting at the origin.
    pub start: Option<String>,
}

/// Follows `depends_on` chains through a container and composes them into
/// per-frame matrices.
///
/// Records are read once and shared between every chain passing through
/// them, so common ancestors such as a goniometer base are only composed
/// once.
pub struct TransformResolver<'a> {
    container: &'a dyn Container,
    units: &'a dyn UnitNormalizer,
    options: ResolverOptions,
    records: Arena<TransformRecord>,
    by_path: HashMap<String, RecordId>,
}

impl<'a> TransformResolver<'a> {
    pub fn new(
        container: &'a dyn Container,
        units: &'a dyn UnitNormalizer,
        options: ResolverOptions,
    ) -> Self {
        Self {
            container,
            units,
            options,
            records: Arena::new(),
            by_path: HashMap::new(),
        }
    }

    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    /// Every frame in the container, in path order.
    pub fn frame_links(&self) -> Vec<FrameLink> {
        let root = normalize_path(&self.options.root);
        let root_prefix = format!("{root}/");
        let process = join_path(root, "process");

        self.container
            .iter_paths()
            .filter_map(|path| {
                let group = path.strip_suffix(DEPENDS_ON)?.strip_suffix('/')?;

                let in_process =
                    group == process || group.starts_with(&format!("{process}/"));
                if in_process && !self.options.include_process {
                    log::trace!("Ignoring process frame {group}");
                    return None;
                }

                let Some(target) = self.container.get_dataset(path).and_then(Value::as_text)
                else {
                    log::debug!("{path} does not hold a text value, not a frame");
                    return None;
                };

                let start = match target {
                    CHAIN_END => None,
                    absolute if absolute.starts_with('/') => {
                        Some(normalize_path(absolute).to_string())
                    }
                    relative => Some(join_path(group, relative)),
                };

                Some(FrameLink {
                    name: group.strip_prefix(&root_prefix).unwrap_or(group).to_string(),
                    group: group.to_string(),
                    start,
                })
            })
            .collect()
    }

    pub fn resolve_link(&mut self, link: &FrameLink) -> Result<ResolvedFrame> {
        let frame = match &link.start {
            None => ResolvedFrame::Single(DMat4::IDENTITY),
            Some(start) => {
                let referrer = format!("/{}/{DEPENDS_ON}", link.group);
                let leaf = self.load_chain(start, &referrer)?;

                if self.options.store_intermediate {
                    ResolvedFrame::Chain(
                        self.chain(leaf)
                            .into_iter()
                            .map(|id| ChainLink {
                                path: self.records[id].path.clone(),
                                matrices: self.cumulative(id).to_vec(),
                            })
                            .collect(),
                    )
                } else {
                    ResolvedFrame::from_matrices(self.cumulative(leaf).to_vec())
                }
            }
        };

        log::debug!(
            "Resolved frame `{}` ({} matrices)",
            link.name,
            frame.matrices().len()
        );

        let convention = self.options.convention;
        Ok(frame.map_matrices(|matrix| convention.correct(matrix)))
    }

    /// Resolves every frame. Failures abort or skip the frame depending on
    /// the configured policy.
    pub fn resolve_all(&mut self) -> Result<FrameMap> {
        let mut frames = FrameMap::new();

        for link in self.frame_links() {
            match self.resolve_link(&link) {
                Ok(frame) => {
                    frames.insert(link.name, frame);
                }
                Err(error) => match self.options.failure_policy {
                    FailurePolicy::Abort => return Err(error),
                    FailurePolicy::Skip => {
                        log::warn!("Skipping frame `{}`: {}", link.name, error)
                    }
                },
            }
        }

        log::info!(
            "Resolved {} frames from {} transformation records",
            frames.len(),
            self.records.len()
        );

        Ok(frames)
    }

    pub fn record(&self, path: &str) -> Option<&TransformRecord> {
        self.by_path
            .get(normalize_path(path))
            .map(|&id| &self.records[id])
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Reads every record from `start` up to the first one already known or
    /// the end of the chain, and returns the id of `start`.
    ///
    /// Nothing is committed to the arena unless the whole chain could be read.
    fn load_chain(&mut self, start: &str, referrer: &str) -> Result<RecordId> {
        let mut pending = Vec::new();
        let mut seen = HashSet::new();
        let mut path = normalize_path(start).to_string();
        let mut referrer = referrer.to_string();

        let anchor = loop {
            if let Some(&id) = self.by_path.get(&path) {
                break Some(id);
            }

            if !seen.insert(path.clone()) {
                return Err(ConversionError::CyclicDependency {
                    path: format!("/{path}"),
                });
            }

            if !self.container.contains(&path) {
                return Err(ConversionError::UnresolvedReference {
                    path: referrer,
                    target: format!("/{path}"),
                });
            }

            let record = TransformRecord::read(
                self.container,
                &path,
                self.units,
                self.options.convention.handedness,
            )?;
            log::trace!("Read {:?} record {}", record.kind, record.path);

            let parent = record.parent_path();
            referrer = record.path.clone();
            pending.push(record);

            match parent {
                Some(parent) => path = parent,
                None => break None,
            }
        };

        let mut parent_id = anchor;
        for mut record in pending.into_iter().rev() {
            record.parent_id = parent_id;

            let key = normalize_path(&record.path).to_string();
            let id = self.records.alloc(record);
            self.by_path.insert(key, id);
            parent_id = Some(id);
        }

        parent_id.ok_or_else(|| ConversionError::UnresolvedReference {
            path: referrer,
            target: start.to_string(),
        })
    }

    /// Cumulative matrices of a record, computed on first use.
    ///
    /// Families combine as an outer product with the parent's samples varying
    /// slowest, so a single sample on either side broadcasts.
    fn cumulative(&self, id: RecordId) -> &[DMat4] {
        let record = &self.records[id];

        record.cumulative.get_or_init(|| match record.parent_id {
            None => record.local.clone(),
            Some(parent) => {
                let convention = self.options.convention;
                iproduct!(self.cumulative(parent), &record.local)
                    .map(|(parent, local)| convention.compose(*parent, *local))
                    .collect()
            }
        })
    }

    /// Record ids from the root of the chain down to `leaf`.
    fn chain(&self, leaf: RecordId) -> Vec<RecordId> {
        let mut chain: Vec<RecordId> =
            std::iter::successors(Some(leaf), |&id| self.records[id].parent_id).collect();
        chain.reverse();
        chain
    }
}

/// Resolves every frame of `container` in one go.
pub fn resolve_frames(
    container: &dyn Container,
    units: &dyn UnitNormalizer,
    options: &ResolverOptions,
) -> Result<FrameMap> {
    TransformResolver::new(container, units, options.clone()).resolve_all()
}

#[cfg(test)]
mod test {
    use glam::DVec3;

    use super::*;
    use crate::config::{AxisCorrection, Composition, Convention};
    use crate::container::MemoryContainer;
    use crate::units::SiUnits;

    const MANIPULATOR: &str = "entry/instrument/manipulator/transformations";

    fn add_record(
        container: &mut MemoryContainer,
        path: &str,
        value: impl Into<Value>,
        kind: &str,
        unit: &str,
        axis: [f64; 3],
        depends_on: &str,
    ) {
        container
            .set_dataset(path, value)
            .set_attribute(path, "depends_on", depends_on)
            .set_attribute(path, "vector", axis)
            .set_attribute(path, "transformation_type", kind)
            .set_attribute(path, "units", unit);
    }

    fn manipulator() -> MemoryContainer {
        let mut container = MemoryContainer::new();
        add_record(
            &mut container,
            &format!("{MANIPULATOR}/rot_x"),
            -90.0,
            "rotation",
            "deg",
            [1.0, 0.0, 0.0],
            ".",
        );
        add_record(
            &mut container,
            &format!("{MANIPULATOR}/rot_z"),
            -25.0,
            "rotation",
            "deg",
            [0.0, 0.0, 1.0],
            "rot_x",
        );
        add_record(
            &mut container,
            &format!("{MANIPULATOR}/trans_z"),
            -0.32,
            "translation",
            "m",
            [0.0, 0.0, 1.0],
            "rot_z",
        );
        container.set_dataset(
            "entry/instrument/manipulator/depends_on",
            "/entry/instrument/manipulator/transformations/trans_z",
        );
        container
    }

    fn expected_manipulator() -> DMat4 {
        DMat4::from_rotation_x((-90.0f64).to_radians())
            * DMat4::from_rotation_z((-25.0f64).to_radians())
            * DMat4::from_translation(DVec3::new(0.0, 0.0, -0.32))
    }

    fn resolve(container: &MemoryContainer, options: ResolverOptions) -> Result<FrameMap> {
        resolve_frames(container, &SiUnits, &options)
    }

    #[test]
    fn chain_composes_parent_first() {
        let frames = resolve(&manipulator(), ResolverOptions::default()).unwrap();

        let frame = &frames["instrument/manipulator"];
        assert!(frame.primary().abs_diff_eq(expected_manipulator(), 1e-12));
    }

    #[test]
    fn local_first_reverses_the_product() {
        let options = ResolverOptions {
            convention: Convention {
                composition: Composition::LocalFirst,
                ..Default::default()
            },
            ..Default::default()
        };
        let frames = resolve(&manipulator(), options).unwrap();

        let expected = DMat4::from_translation(DVec3::new(0.0, 0.0, -0.32))
            * DMat4::from_rotation_z((-25.0f64).to_radians())
            * DMat4::from_rotation_x((-90.0f64).to_radians());
        assert!(frames["instrument/manipulator"]
            .primary()
            .abs_diff_eq(expected, 1e-12));
    }

    #[test]
    fn intermediate_chain_is_stored_root_first() {
        let options = ResolverOptions {
            store_intermediate: true,
            ..Default::default()
        };
        let frames = resolve(&manipulator(), options).unwrap();

        let chain = frames["instrument/manipulator"].chain().unwrap();
        let paths: Vec<&str> = chain.iter().map(|link| link.path.as_str()).collect();

        assert_eq!(
            paths,
            [
                format!("/{MANIPULATOR}/rot_x"),
                format!("/{MANIPULATOR}/rot_z"),
                format!("/{MANIPULATOR}/trans_z"),
            ]
        );
        assert!(chain[0].matrices[0]
            .abs_diff_eq(DMat4::from_rotation_x((-90.0f64).to_radians()), 1e-12));
        assert!(chain[2].matrices[0].abs_diff_eq(expected_manipulator(), 1e-12));
    }

    #[test]
    fn shared_ancestors_are_read_once() {
        let mut container = manipulator();
        add_record(
            &mut container,
            "entry/sample/transformations/trans_x",
            1.0,
            "translation",
            "mm",
            [1.0, 0.0, 0.0],
            "/entry/instrument/manipulator/transformations/trans_z",
        );
        container.set_dataset("entry/sample/depends_on", "transformations/trans_x");

        let mut resolver =
            TransformResolver::new(&container, &SiUnits, ResolverOptions::default());
        let frames = resolver.resolve_all().unwrap();

        assert_eq!(resolver.record_count(), 4);
        let expected = expected_manipulator() * DMat4::from_translation(DVec3::new(1e-3, 0.0, 0.0));
        assert!(frames["sample"].primary().abs_diff_eq(expected, 1e-12));
    }

    #[test]
    fn families_combine_as_outer_product() {
        let mut container = MemoryContainer::new();
        let group = "entry/stage/transformations";
        add_record(
            &mut container,
            &format!("{group}/x"),
            vec![0.0, 1.0],
            "translation",
            "m",
            [1.0, 0.0, 0.0],
            ".",
        );
        add_record(
            &mut container,
            &format!("{group}/y"),
            vec![0.0, 10.0, 20.0],
            "translation",
            "m",
            [0.0, 1.0, 0.0],
            "x",
        );
        container.set_dataset("entry/stage/depends_on", format!("/{group}/y").as_str());

        let frames = resolve(&container, ResolverOptions::default()).unwrap();
        let origins: Vec<DVec3> = frames["stage"]
            .matrices()
            .iter()
            .map(|matrix| matrix.transform_point3(DVec3::ZERO))
            .collect();

        assert_eq!(
            origins,
            [
                DVec3::new(0.0, 0.0, 0.0),
                DVec3::new(0.0, 10.0, 0.0),
                DVec3::new(0.0, 20.0, 0.0),
                DVec3::new(1.0, 0.0, 0.0),
                DVec3::new(1.0, 10.0, 0.0),
                DVec3::new(1.0, 20.0, 0.0),
            ]
        );
    }

    #[test]
    fn process_frames_are_opt_in() {
        let mut container = manipulator();
        container.set_dataset("entry/process/depends_on", ".");

        let frames = resolve(&container, ResolverOptions::default()).unwrap();
        assert!(!frames.contains_key("process"));

        let options = ResolverOptions {
            include_process: true,
            ..Default::default()
        };
        let frames = resolve(&container, options).unwrap();
        assert_eq!(frames["process"], ResolvedFrame::Single(DMat4::IDENTITY));
    }

    #[test]
    fn cycles_are_detected() {
        let mut container = MemoryContainer::new();
        let group = "entry/loop/transformations";
        add_record(&mut container, &format!("{group}/a"), 1.0, "translation", "m", [1.0, 0.0, 0.0], "b");
        add_record(&mut container, &format!("{group}/b"), 1.0, "translation", "m", [1.0, 0.0, 0.0], "a");
        container.set_dataset("entry/loop/depends_on", "transformations/a");

        let error = resolve(&container, ResolverOptions::default()).unwrap_err();
        assert!(matches!(error, ConversionError::CyclicDependency { .. }), "{error}");
    }

    #[test]
    fn dangling_references_name_the_referrer() {
        let mut container = MemoryContainer::new();
        add_record(
            &mut container,
            "entry/detector/transformations/rot",
            1.0,
            "rotation",
            "deg",
            [0.0, 0.0, 1.0],
            "missing",
        );
        container.set_dataset("entry/detector/depends_on", "transformations/rot");

        match resolve(&container, ResolverOptions::default()) {
            Err(ConversionError::UnresolvedReference { path, target }) => {
                assert_eq!(path, "/entry/detector/transformations/rot");
                assert_eq!(target, "/entry/detector/transformations/missing");
            }
            other => panic!("expected an unresolved reference, got {other:?}"),
        }
    }

    #[test]
    fn skip_policy_keeps_the_good_frames() {
        let mut container = manipulator();
        container.set_dataset("entry/broken/depends_on", "/entry/nowhere");

        assert!(resolve(&container, ResolverOptions::default()).is_err());

        let options = ResolverOptions {
            failure_policy: FailurePolicy::Skip,
            ..Default::default()
        };
        let frames = resolve(&container, options).unwrap();

        assert_eq!(frames.keys().collect::<Vec<_>>(), ["instrument/manipulator"]);
    }

    #[test]
    fn blender_correction_is_applied_last() {
        let options = ResolverOptions {
            convention: Convention {
                correction: AxisCorrection::Blender,
                ..Default::default()
            },
            ..Default::default()
        };
        let frames = resolve(&manipulator(), options).unwrap();

        let expected = DMat4::from_rotation_x((-90.0f64).to_radians()) * expected_manipulator();
        assert!(frames["instrument/manipulator"]
            .primary()
            .abs_diff_eq(expected, 1e-12));
    }

    #[test]
    fn frame_links_resolve_relative_targets() {
        let mut container = manipulator();
        container.set_dataset("entry/sample/depends_on", "transformations/trans_x");

        let resolver = TransformResolver::new(&container, &SiUnits, ResolverOptions::default());
        let links = resolver.frame_links();

        assert_eq!(links.len(), 2);
        assert_eq!(links[1].name, "sample");
        assert_eq!(
            links[1].start.as_deref(),
            Some("entry/sample/transformations/trans_x")
        );
    }
}
