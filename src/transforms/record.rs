use std::cell::OnceCell;

use glam::{DMat4, DVec3};
use id_arena::Id;

use crate::config::Handedness;
use crate::container::{join_path, normalize_path, parent_path, Container, Value};
use crate::error::{ConversionError, Result};
use crate::math::affine::affine;
use crate::math::TransformKind;
use crate::units::UnitNormalizer;

pub type RecordId = Id<TransformRecord>;

/// Marks the end of a dependency chain.
pub const CHAIN_END: &str = ".";

const REQUIRED_ATTRIBUTES: [&str; 4] = ["depends_on", "vector", "transformation_type", "units"];

// Spelled both ways in the wild.
const OFFSET_UNIT_ATTRIBUTES: [&str; 2] = ["offset_units", "offset_unit"];

/// One rotation or translation step read from the container.
#[derive(Debug)]
pub struct TransformRecord {
    /// Absolute path, always starting with `/`.
    pub path: String,
    pub depends_on: String,
    pub kind: TransformKind,
    pub axis: DVec3,
    /// Field samples in SI units.
    pub samples: Vec<f64>,
    /// Offset in metres.
    pub offset: DVec3,
    /// One local matrix per sample.
    pub local: Vec<DMat4>,
    pub parent_id: Option<RecordId>,
    pub(crate) cumulative: OnceCell<Vec<DMat4>>,
}

fn text_attribute<'a>(container: &'a dyn Container, path: &str, name: &str) -> Result<&'a str> {
    container
        .get_attribute(path, name)
        .ok_or_else(|| ConversionError::missing_attribute(name, path))?
        .as_text()
        .ok_or_else(|| ConversionError::invalid_attribute(name, path, "expected a text value"))
}

fn vector_attribute(value: &Value, name: &str, path: &str) -> Result<DVec3> {
    value.as_vec3().ok_or_else(|| {
        ConversionError::invalid_attribute(
            name,
            path,
            format!("expected 3 components, found {}", value.describe_shape()),
        )
    })
}

impl TransformRecord {
    pub fn read(
        container: &dyn Container,
        path: &str,
        units: &dyn UnitNormalizer,
        handedness: Handedness,
    ) -> Result<Self> {
        let path = format!("/{}", normalize_path(path));

        for attribute in REQUIRED_ATTRIBUTES {
            if container.get_attribute(&path, attribute).is_none() {
                return Err(ConversionError::missing_attribute(attribute, &path));
            }
        }

        let offset = match container.get_attribute(&path, "offset") {
            None => DVec3::ZERO,
            Some(offset) => {
                let unit_attribute = OFFSET_UNIT_ATTRIBUTES
                    .into_iter()
                    .find(|name| container.get_attribute(&path, name).is_some())
                    .ok_or_else(|| ConversionError::MissingUnit { path: path.clone() })?;
                let unit = text_attribute(container, &path, unit_attribute)?;

                vector_attribute(offset, "offset", &path)? * units.scale_to_si(unit)?
            }
        };

        let depends_on = text_attribute(container, &path, "depends_on")?.to_string();
        let unit = text_attribute(container, &path, "units")?;

        let transformation_type = text_attribute(container, &path, "transformation_type")?;
        let kind = TransformKind::parse(transformation_type).ok_or_else(|| {
            ConversionError::UnknownTransformKind {
                kind: transformation_type.to_string(),
                path: path.clone(),
            }
        })?;

        let axis = container
            .get_attribute(&path, "vector")
            .ok_or_else(|| ConversionError::missing_attribute("vector", &path))
            .and_then(|vector| vector_attribute(vector, "vector", &path))?;

        let field = container
            .get_dataset(&path)
            .ok_or_else(|| ConversionError::MissingField { path: path.clone() })?;
        let raw_samples = match field {
            Value::Scalar(value) => vec![*value],
            Value::Array(values) if !values.is_empty() => values.clone(),
            other => {
                return Err(ConversionError::UnsupportedFieldShape {
                    path: path.clone(),
                    shape: other.describe_shape(),
                })
            }
        };

        let samples = raw_samples
            .into_iter()
            .map(|sample| units.to_si(sample, unit))
            .collect::<Result<Vec<f64>>>()?;

        let local = samples
            .iter()
            .map(|&magnitude| {
                affine(kind, axis, magnitude, offset, handedness).ok_or_else(|| {
                    ConversionError::invalid_attribute("vector", &path, "rotation axis has zero length")
                })
            })
            .collect::<Result<Vec<DMat4>>>()?;

        Ok(Self {
            path,
            depends_on,
            kind,
            axis,
            samples,
            offset,
            local,
            parent_id: None,
            cumulative: OnceCell::new(),
        })
    }

    pub fn is_root(&self) -> bool {
        self.depends_on == CHAIN_END
    }

    /// Container path of the record this one depends on, `None` for roots.
    pub fn parent_path(&self) -> Option<String> {
        resolve_reference(&self.path, &self.depends_on)
    }
}

/// Resolves a `depends_on` reference made by the record at `current`.
///
/// References containing a `/` are absolute, anything else names a sibling
/// in the same group.
pub fn resolve_reference(current: &str, reference: &str) -> Option<String> {
    if reference == CHAIN_END {
        return None;
    }

    if reference.contains('/') {
        return Some(normalize_path(reference).to_string());
    }

    Some(join_path(parent_path(current), reference))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::container::MemoryContainer;
    use crate::units::SiUnits;

    const PATH: &str = "entry/sample/transformations/trans_x";

    fn container() -> MemoryContainer {
        let mut container = MemoryContainer::new();
        container
            .set_dataset(PATH, 2.65)
            .set_attribute(PATH, "depends_on", ".")
            .set_attribute(PATH, "vector", [1.0, 0.0, 0.0])
            .set_attribute(PATH, "transformation_type", "translation")
            .set_attribute(PATH, "units", "mm");
        container
    }

    fn read(container: &MemoryContainer) -> Result<TransformRecord> {
        TransformRecord::read(container, PATH, &SiUnits, Handedness::Right)
    }

    #[test]
    fn reads_and_normalizes_a_record() {
        let record = read(&container()).unwrap();

        assert_eq!(record.path, format!("/{PATH}"));
        assert!(record.is_root());
        assert_eq!(record.kind, TransformKind::Translation);
        assert!((record.samples[0] - 2.65e-3).abs() < 1e-15);
        assert!(record.local[0]
            .transform_point3(DVec3::ZERO)
            .abs_diff_eq(DVec3::new(2.65e-3, 0.0, 0.0), 1e-15));
    }

    #[test]
    fn every_required_attribute_is_checked() {
        for attribute in REQUIRED_ATTRIBUTES {
            let mut container = container();
            container.remove_attribute(PATH, attribute);

            match read(&container) {
                Err(ConversionError::MissingAttribute { attribute: missing, path }) => {
                    assert_eq!(missing, attribute);
                    assert_eq!(path, format!("/{PATH}"));
                }
                other => panic!("expected a missing `{attribute}`, got {other:?}"),
            }
        }
    }

    #[test]
    fn offset_without_unit_is_rejected() {
        let mut container = container();
        container.set_attribute(PATH, "offset", [0.0, 0.0, 1.0]);

        assert!(matches!(read(&container), Err(ConversionError::MissingUnit { .. })));
    }

    #[test]
    fn offset_is_converted_with_its_own_unit() {
        let mut container = container();
        container
            .set_attribute(PATH, "offset", [0.0, 0.0, 10.0])
            .set_attribute(PATH, "offset_units", "cm");

        let record = read(&container).unwrap();
        assert!(record.offset.abs_diff_eq(DVec3::new(0.0, 0.0, 0.1), 1e-15));
    }

    #[test]
    fn two_dimensional_fields_are_unsupported() {
        let mut container = container();
        container.set_dataset(PATH, Value::Grid(vec![vec![1.0, 2.0], vec![3.0, 4.0]]));

        assert!(matches!(
            read(&container),
            Err(ConversionError::UnsupportedFieldShape { .. })
        ));
    }

    #[test]
    fn unknown_transformation_type_is_rejected() {
        let mut container = container();
        container.set_attribute(PATH, "transformation_type", "shear");

        assert!(matches!(
            read(&container),
            Err(ConversionError::UnknownTransformKind { kind, .. }) if kind == "shear"
        ));
    }

    #[test]
    fn array_fields_produce_one_matrix_per_sample() {
        let mut container = container();
        container.set_dataset(PATH, vec![1.0, 2.0, 3.0]);

        let record = read(&container).unwrap();
        assert_eq!(record.local.len(), 3);
    }

    #[test]
    fn references_resolve_absolute_or_sibling() {
        let current = "/entry/sample/transformations/rot_z";

        assert_eq!(resolve_reference(current, "."), None);
        assert_eq!(
            resolve_reference(current, "trans_x").as_deref(),
            Some("entry/sample/transformations/trans_x")
        );
        assert_eq!(
            resolve_reference(current, "/entry/instrument/manipulator/transformations/rot_x")
                .as_deref(),
            Some("entry/instrument/manipulator/transformations/rot_x")
        );
    }
}
