use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

use gltf::json;
use gltf::json::validation::{Checked::Valid, USize64};

use crate::error::{ConversionError, Result};
use crate::geometry::{IndexWidth, PrimitiveMode};
use crate::packer::buffer::{pack_geometries, BufferEntry, ByteRange, PackedBuffer};
use crate::scene_graph::{GeometryId, NodeId, Scene};

const GENERATOR: &str = concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"));

fn component_type(width: IndexWidth) -> json::accessor::ComponentType {
    match width {
        IndexWidth::U8 => json::accessor::ComponentType::U8,
        IndexWidth::U16 => json::accessor::ComponentType::U16,
        IndexWidth::U32 => json::accessor::ComponentType::U32,
    }
}

fn primitive_mode(mode: PrimitiveMode) -> json::mesh::Mode {
    match mode {
        PrimitiveMode::Triangles => json::mesh::Mode::Triangles,
        PrimitiveMode::Lines => json::mesh::Mode::Lines,
    }
}

fn buffer_view(
    root: &mut json::Root,
    buffer: json::Index<json::Buffer>,
    range: ByteRange,
    target: json::buffer::Target,
) -> json::Index<json::buffer::View> {
    root.push(json::buffer::View {
        buffer,
        byte_length: USize64::from(range.length),
        byte_offset: Some(USize64::from(range.offset)),
        byte_stride: None,
        extensions: Default::default(),
        extras: Default::default(),
        name: None,
        target: Some(Valid(target)),
    })
}

/// Adds the two accessors of one buffer entry and returns (indices, positions).
fn accessors(
    root: &mut json::Root,
    buffer: json::Index<json::Buffer>,
    entry: &BufferEntry,
) -> (json::Index<json::Accessor>, json::Index<json::Accessor>) {
    let index_view = buffer_view(
        root,
        buffer,
        entry.indices,
        json::buffer::Target::ElementArrayBuffer,
    );
    let indices = root.push(json::Accessor {
        buffer_view: Some(index_view),
        byte_offset: None,
        count: USize64::from(entry.index_count),
        component_type: Valid(json::accessor::GenericComponentType(component_type(
            entry.index_width,
        ))),
        extensions: Default::default(),
        extras: Default::default(),
        type_: Valid(json::accessor::Type::Scalar),
        min: Some(json::Value::from(vec![entry.index_min])),
        max: Some(json::Value::from(vec![entry.index_max])),
        name: None,
        normalized: false,
        sparse: None,
    });

    let vertex_view = buffer_view(
        root,
        buffer,
        entry.vertices,
        json::buffer::Target::ArrayBuffer,
    );
    let positions = root.push(json::Accessor {
        buffer_view: Some(vertex_view),
        byte_offset: None,
        count: USize64::from(entry.vertex_count),
        component_type: Valid(json::accessor::GenericComponentType(
            json::accessor::ComponentType::F32,
        )),
        extensions: Default::default(),
        extras: Default::default(),
        type_: Valid(json::accessor::Type::Vec3),
        min: Some(json::Value::from(entry.bounds.min.to_array().to_vec())),
        max: Some(json::Value::from(entry.bounds.max.to_array().to_vec())),
        name: None,
        normalized: false,
        sparse: None,
    });

    (indices, positions)
}

/// Children are pushed before their parent, so every node only refers to
/// nodes that already exist.
fn push_node(
    root: &mut json::Root,
    scene: &Scene,
    meshes: &HashMap<GeometryId, json::Index<json::Mesh>>,
    node_id: NodeId,
) -> Option<json::Index<json::Node>> {
    let node = scene.get_node(node_id)?;

    let children: Vec<json::Index<json::Node>> = node
        .child_ids
        .iter()
        .filter_map(|&child_id| push_node(root, scene, meshes, child_id))
        .collect();

    Some(root.push(json::Node {
        mesh: node
            .geometry_id
            .and_then(|geometry_id| meshes.get(&geometry_id).copied()),
        matrix: node.matrix.map(|matrix| matrix.to_cols_array()),
        children: (!children.is_empty()).then_some(children),
        name: Some(node.name.clone()),
        ..Default::default()
    }))
}

/// Builds the glTF document for `scene` around an already packed buffer.
///
/// Geometry `i` of the scene owns buffer entry `i`; `uri` is set for
/// `.gltf` output where the buffer lives in a separate file.
pub fn document(scene: &Scene, packed: &PackedBuffer, uri: Option<String>) -> Result<json::Root> {
    let geometry_count = scene.geometries().count();
    if geometry_count != packed.entries.len() {
        return Err(ConversionError::geometry_mismatch(format!(
            "{} geometries but {} buffer entries",
            geometry_count,
            packed.entries.len()
        )));
    }

    let mut root = json::Root::default();
    root.asset.generator = Some(GENERATOR.to_string());

    let buffer = root.push(json::Buffer {
        byte_length: USize64::from(packed.len()),
        extensions: Default::default(),
        extras: Default::default(),
        name: None,
        uri,
    });

    let mut meshes = HashMap::new();
    for ((geometry_id, geometry), entry) in scene.geometries().zip(&packed.entries) {
        let (indices, positions) = accessors(&mut root, buffer, entry);

        let primitive = json::mesh::Primitive {
            attributes: BTreeMap::from([(Valid(json::mesh::Semantic::Positions), positions)]),
            extensions: Default::default(),
            extras: Default::default(),
            indices: Some(indices),
            material: None,
            mode: Valid(primitive_mode(geometry.mode)),
            targets: None,
        };

        let mesh = root.push(json::Mesh {
            extensions: Default::default(),
            extras: Default::default(),
            name: Some(geometry.name.clone()),
            primitives: vec![primitive],
            weights: None,
        });
        meshes.insert(geometry_id, mesh);
    }

    let nodes: Vec<json::Index<json::Node>> = scene
        .roots()
        .filter_map(|root_id| push_node(&mut root, scene, &meshes, root_id))
        .collect();

    let default_scene = root.push(json::Scene {
        extensions: Default::default(),
        extras: Default::default(),
        name: None,
        nodes,
    });
    root.scene = Some(default_scene);

    Ok(root)
}

fn pad_to_four(mut bytes: Vec<u8>, fill: u8) -> Vec<u8> {
    let padded_len = bytes.len().next_multiple_of(4);
    bytes.resize(padded_len, fill);
    bytes
}

/// Serializes the document and its buffer into a single `.glb` container.
pub fn glb_bytes(root: &json::Root, buffer: Vec<u8>) -> Result<Vec<u8>> {
    // glTF expects JSON chunks padded with spaces and binary chunks with zeroes.
    let json = pad_to_four(serde_json::to_vec(root)?, b' ');
    let bin = pad_to_four(buffer, 0);

    // header, two chunk headers, both chunks
    let length = 12 + 8 + json.len() + 8 + bin.len();
    let length = u32::try_from(length).map_err(|_| {
        ConversionError::Serialization(format!("{length} bytes do not fit into a GLB file"))
    })?;

    let glb = gltf::binary::Glb {
        header: gltf::binary::Header {
            magic: *b"glTF",
            version: 2,
            length,
        },
        json: Cow::Owned(json),
        bin: Some(Cow::Owned(bin)),
    };

    glb.to_vec()
        .map_err(|error| ConversionError::Serialization(error.to_string()))
}

/// Packs the geometries of `scene` and builds the document referencing them.
pub fn pack(scene: &Scene, uri: Option<String>) -> Result<(json::Root, PackedBuffer)> {
    let packed = pack_geometries(scene.geometries().map(|(_, geometry)| geometry))?;
    let root = document(scene, &packed, uri)?;

    log::debug!(
        "Packed {} geometries into a {} byte buffer",
        packed.entries.len(),
        packed.len()
    );

    Ok((root, packed))
}
