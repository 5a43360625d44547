use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Deserialize;

use crate::container::{normalize_path, parent_path, Container, Value};
use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub attrs: BTreeMap<String, Value>,
}

/// Container held fully in memory.
///
/// Paths are kept sorted, so iteration visits groups in the same lexicographic
/// order an HDF5 visitor would. The JSON form maps each path to its
/// optional `value` and its `attrs`:
///
/// ```json
/// {
///   "entry/sample/depends_on": { "value": "transformations/rot_z" },
///   "entry/sample/transformations/rot_z": {
///     "value": 90.0,
///     "attrs": { "depends_on": ".", "vector": [0, 0, 1],
///                "transformation_type": "rotation", "units": "deg" }
///   }
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryContainer {
    entries: BTreeMap<String, Entry>,
}

impl MemoryContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let described: BTreeMap<String, Entry> = serde_json::from_reader(reader)?;

        let mut container = Self::new();
        for (path, entry) in described {
            *container.entry_mut(&path) = entry;
        }

        Ok(container)
    }

    /// Returns the entry at `path`, creating it and any missing parent groups.
    pub fn entry_mut(&mut self, path: &str) -> &mut Entry {
        let path = normalize_path(path);

        let mut parent = parent_path(path);
        while !parent.is_empty() {
            self.entries.entry(parent.to_string()).or_default();
            parent = parent_path(parent);
        }

        self.entries.entry(path.to_string()).or_default()
    }

    pub fn set_dataset(&mut self, path: &str, value: impl Into<Value>) -> &mut Self {
        self.entry_mut(path).value = Some(value.into());
        self
    }

    pub fn set_attribute(&mut self, path: &str, name: &str, value: impl Into<Value>) -> &mut Self {
        self.entry_mut(path)
            .attrs
            .insert(name.to_string(), value.into());
        self
    }

    pub fn remove_attribute(&mut self, path: &str, name: &str) -> Option<Value> {
        self.entries
            .get_mut(normalize_path(path))
            .and_then(|entry| entry.attrs.remove(name))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Container for MemoryContainer {
    fn get_attribute(&self, path: &str, name: &str) -> Option<&Value> {
        self.entries
            .get(normalize_path(path))
            .and_then(|entry| entry.attrs.get(name))
    }

    fn get_dataset(&self, path: &str) -> Option<&Value> {
        self.entries
            .get(normalize_path(path))
            .and_then(|entry| entry.value.as_ref())
    }

    fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(normalize_path(path))
    }

    fn iter_paths(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        Box::new(self.entries.keys().map(String::as_str))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parents_are_created_implicitly() {
        let mut container = MemoryContainer::new();
        container.set_dataset("/entry/sample/depends_on", ".");

        let paths: Vec<&str> = container.iter_paths().collect();
        assert_eq!(paths, ["entry", "entry/sample", "entry/sample/depends_on"]);
        assert!(container.get_dataset("entry/sample").is_none());
        assert_eq!(
            container
                .get_dataset("/entry/sample/depends_on")
                .and_then(Value::as_text),
            Some(".")
        );
    }

    #[test]
    fn loads_json_description() {
        let json = r#"{
            "entry/sample/transformations/rot_z": {
                "value": 90,
                "attrs": { "depends_on": ".", "vector": [0, 0, 1], "units": "deg" }
            }
        }"#;

        let container = MemoryContainer::from_reader(json.as_bytes()).unwrap();

        assert_eq!(container.len(), 4);
        assert_eq!(
            container.get_dataset("entry/sample/transformations/rot_z"),
            Some(&Value::Scalar(90.0))
        );
        assert_eq!(
            container
                .get_attribute("entry/sample/transformations/rot_z", "units")
                .and_then(Value::as_text),
            Some("deg")
        );
    }

    #[test]
    fn attributes_can_be_removed() {
        let mut container = MemoryContainer::new();
        container.set_attribute("entry/x", "units", "mm");

        assert_eq!(container.remove_attribute("entry/x", "units"), Some(Value::from("mm")));
        assert!(container.get_attribute("entry/x", "units").is_none());
    }
}
