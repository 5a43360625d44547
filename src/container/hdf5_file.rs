use std::cell::OnceCell;
use std::collections::BTreeMap;
use std::path::Path;

use hdf5::types::{FixedAscii, FixedUnicode, TypeDescriptor, VarLenAscii, VarLenUnicode};

use crate::container::{join_path, normalize_path, Container, Value};
use crate::error::Result;

// Deep enough for any NeXus layout, shallow enough to stop on linked cycles.
const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    Group,
    Dataset,
}

#[derive(Debug)]
struct LazyEntry {
    kind: EntryKind,
    value: OnceCell<Option<Value>>,
    attrs: OnceCell<BTreeMap<String, Value>>,
}

impl LazyEntry {
    fn new(kind: EntryKind) -> Self {
        Self {
            kind,
            value: OnceCell::new(),
            attrs: OnceCell::new(),
        }
    }
}

/// Container backed by an HDF5 file.
///
/// The path index is built on open. Values and attributes are read the first
/// time they are asked for and kept afterwards. Values the resolver has no
/// use for (compound types, references, arrays above two dimensions) read as
/// absent.
pub struct Hdf5Container {
    file: hdf5::File,
    entries: BTreeMap<String, LazyEntry>,
}

impl Hdf5Container {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = hdf5::File::open(path.as_ref())?;

        let mut entries = BTreeMap::new();
        collect_members(&file, "", 0, &mut entries)?;
        log::debug!(
            "Indexed {} members of {}",
            entries.len(),
            path.as_ref().display()
        );

        Ok(Self { file, entries })
    }

    fn read_dataset(&self, path: &str) -> Option<Value> {
        let value = self
            .file
            .dataset(path)
            .and_then(|dataset| read_value(&dataset));

        match value {
            Ok(value) => value,
            Err(error) => {
                log::warn!("Could not read dataset /{path}: {error}");
                None
            }
        }
    }

    fn read_attributes(&self, path: &str, kind: EntryKind) -> BTreeMap<String, Value> {
        let attrs = match kind {
            EntryKind::Group if path.is_empty() => read_attributes(&self.file),
            EntryKind::Group => self.file.group(path).and_then(|group| read_attributes(&group)),
            EntryKind::Dataset => self
                .file
                .dataset(path)
                .and_then(|dataset| read_attributes(&dataset)),
        };

        attrs.unwrap_or_else(|error| {
            log::warn!("Could not read attributes of /{path}: {error}");
            BTreeMap::new()
        })
    }
}

impl Container for Hdf5Container {
    fn get_attribute(&self, path: &str, name: &str) -> Option<&Value> {
        let (path, entry) = self.entries.get_key_value(normalize_path(path))?;
        entry
            .attrs
            .get_or_init(|| self.read_attributes(path, entry.kind))
            .get(name)
    }

    fn get_dataset(&self, path: &str) -> Option<&Value> {
        let (path, entry) = self.entries.get_key_value(normalize_path(path))?;
        if entry.kind != EntryKind::Dataset {
            return None;
        }

        entry
            .value
            .get_or_init(|| self.read_dataset(path))
            .as_ref()
    }

    fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(normalize_path(path))
    }

    fn iter_paths(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        Box::new(self.entries.keys().map(String::as_str))
    }
}

fn collect_members(
    group: &hdf5::Group,
    prefix: &str,
    depth: usize,
    entries: &mut BTreeMap<String, LazyEntry>,
) -> Result<()> {
    if depth > MAX_DEPTH {
        log::warn!("Not descending below /{prefix}, nested more than {MAX_DEPTH} levels");
        return Ok(());
    }

    for name in group.member_names()? {
        let path = join_path(prefix, &name);

        match group.group(&name) {
            Ok(child) => {
                entries.insert(path.clone(), LazyEntry::new(EntryKind::Group));
                collect_members(&child, &path, depth + 1, entries)?;
            }
            Err(_) => {
                entries.insert(path, LazyEntry::new(EntryKind::Dataset));
            }
        }
    }

    Ok(())
}

fn read_attributes(location: &hdf5::Location) -> hdf5::Result<BTreeMap<String, Value>> {
    let mut attrs = BTreeMap::new();

    for name in location.attr_names()? {
        let attr = location.attr(&name)?;
        match read_value(&attr)? {
            Some(value) => {
                attrs.insert(name, value);
            }
            None => log::debug!("Skipping attribute `{name}` of unsupported type"),
        }
    }

    Ok(attrs)
}

fn read_value(container: &hdf5::Container) -> hdf5::Result<Option<Value>> {
    let descriptor = container.dtype()?.to_descriptor()?;

    let value = match descriptor {
        TypeDescriptor::VarLenUnicode
        | TypeDescriptor::VarLenAscii
        | TypeDescriptor::FixedAscii(_)
        | TypeDescriptor::FixedUnicode(_) => read_text(container, &descriptor)?.map(Value::Text),
        TypeDescriptor::Integer(_) | TypeDescriptor::Unsigned(_) | TypeDescriptor::Float(_) => {
            let values = container.read_raw::<f64>()?;
            match container.shape().as_slice() {
                [] => values.first().copied().map(Value::Scalar),
                [_] => Some(Value::Array(values)),
                [_, columns] => Some(Value::Grid(
                    values
                        .chunks((*columns).max(1))
                        .map(<[f64]>::to_vec)
                        .collect(),
                )),
                _ => None,
            }
        }
        _ => None,
    };

    Ok(value)
}

/// Text is either a scalar string or a one element string array.
fn read_text(
    container: &hdf5::Container,
    descriptor: &TypeDescriptor,
) -> hdf5::Result<Option<String>> {
    if container.size() != 1 {
        return Ok(None);
    }

    let text = match descriptor {
        TypeDescriptor::VarLenUnicode => container
            .read_raw::<VarLenUnicode>()?
            .first()
            .map(|text| text.as_str().to_string()),
        TypeDescriptor::VarLenAscii => container
            .read_raw::<VarLenAscii>()?
            .first()
            .map(|text| text.as_str().to_string()),
        TypeDescriptor::FixedUnicode(_) => container
            .read_raw::<FixedUnicode<1024>>()?
            .first()
            .map(|text| text.as_str().to_string()),
        _ => container
            .read_raw::<FixedAscii<1024>>()?
            .first()
            .map(|text| text.as_str().to_string()),
    };

    Ok(text.map(|text| text.trim_end_matches('\0').to_string()))
}
