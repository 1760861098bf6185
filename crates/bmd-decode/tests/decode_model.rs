mod common;

use bmd_decode::{
    DecodeError, DecodeOptions, DrawMatrix, HierarchyNode, MatrixSlot, Primitive, Tag,
    TextureData, TextureFormat, Topology, VertexAttribute, Warning, decode, decode_with,
};
use common::*;
use proptest::prelude::*;

#[test]
fn minimal_model_builds_one_strip() {
    let model = decode(&minimal_file()).unwrap();

    assert_eq!(
        model.hierarchy().nodes,
        vec![
            HierarchyNode::Joint(0),
            HierarchyNode::Open,
            HierarchyNode::Batch(0),
            HierarchyNode::Close,
        ]
    );
    assert_eq!(model.joints().len(), 1);
    assert_eq!(model.joints()[0].name, "root");
    assert!(model.warnings().is_empty());
    assert!(model.vertex_arrays().is_none());

    let [batch] = model.batches() else {
        panic!("expected one batch, got {}", model.batches().len());
    };
    assert_eq!(batch.vertex_count, 4);
    assert_eq!(batch.stride, 3);
    let primitives: Vec<_> = batch.primitives().copied().collect();
    assert_eq!(
        primitives,
        vec![Primitive {
            topology: Topology::TriangleStrip,
            start: 0,
            count: 4,
        }]
    );
    for (i, expected) in QUAD.iter().enumerate() {
        assert_eq!(batch.vertex(i).unwrap(), expected.as_slice());
    }
}

#[test]
fn retained_vertex_arrays_stay_on_the_model() {
    let options = DecodeOptions {
        retain_vertex_arrays: true,
        ..DecodeOptions::default()
    };
    let model = decode_with(&minimal_file(), &options).unwrap();
    let arrays = model.vertex_arrays().unwrap();
    let positions = arrays.get(VertexAttribute::Position).unwrap();
    assert_eq!(positions.len(), 4);
    assert_eq!(positions.item(3).unwrap(), &[1.0, 1.0, 0.0]);
}

#[test]
fn chunk_size_past_end_fails_without_model() {
    let mut chunks = minimal_chunks();
    chunks[1][4..8].copy_from_slice(&0x0010_0000u32.to_be_bytes());
    let err = decode(&file(&chunks)).unwrap_err();
    assert!(matches!(err, DecodeError::OutOfBounds { .. }), "{err}");
}

#[test]
fn unknown_chunk_is_skipped_with_warning() {
    let mut chunks = minimal_chunks();
    chunks.insert(1, raw_chunk(b"ZZZ9", &[0xaa; 8]));
    let inf1_len = chunks[0].len();
    let model = decode(&file(&chunks)).unwrap();

    assert_eq!(
        model.warnings(),
        &[Warning::UnknownChunkTag {
            tag: Tag(*b"ZZZ9"),
            offset: 0x20 + inf1_len,
        }]
    );
    assert_eq!(model.batches().len(), 1);
}

#[test]
fn duplicate_chunk_is_structural() {
    let mut chunks = minimal_chunks();
    chunks.push(jnt1(&[("again", [0.0; 3])]));
    let err = decode(&file(&chunks)).unwrap_err();
    assert_eq!(err.chunk_tag(), Some(Tag(*b"JNT1")));
    assert!(matches!(err.root(), DecodeError::StructuralMismatch { .. }));
}

#[test]
fn dangling_hierarchy_reference_is_structural() {
    let mut chunks = minimal_chunks();
    chunks[0] = inf1(&[joint(0), OPEN, batch(1), CLOSE], 4);
    let err = decode(&file(&chunks)).unwrap_err();
    assert!(
        matches!(err, DecodeError::StructuralMismatch { context: "INF1", .. }),
        "{err}"
    );
}

#[test]
fn material_reference_without_mat3_is_structural() {
    let mut chunks = minimal_chunks();
    chunks[0] = inf1(&[joint(0), OPEN, material(0), batch(0), CLOSE], 4);
    let err = decode(&file(&chunks)).unwrap_err();
    assert!(matches!(err, DecodeError::StructuralMismatch { .. }), "{err}");
}

#[test]
fn geometry_before_vertex_arrays_is_structural() {
    let mut chunks = minimal_chunks();
    chunks.swap(1, 2);
    let err = decode(&file(&chunks)).unwrap_err();
    assert_eq!(err.chunk_tag(), Some(Tag(*b"SHP1")));
    assert!(matches!(err.root(), DecodeError::StructuralMismatch { .. }));
}

#[test]
fn missing_hierarchy_is_structural() {
    let mut chunks = minimal_chunks();
    chunks.remove(0);
    let err = decode(&file(&chunks)).unwrap_err();
    assert!(matches!(err, DecodeError::StructuralMismatch { .. }), "{err}");
}

#[test]
fn vertex_index_past_array_is_structural() {
    let mut chunks = minimal_chunks();
    chunks[2] = shp1(&[(STRIP, &[0, 1, 2, 4])]);
    let err = decode(&file(&chunks)).unwrap_err();
    assert_eq!(err.chunk_tag(), Some(Tag(*b"SHP1")));
    assert!(matches!(err.root(), DecodeError::StructuralMismatch { .. }));
}

#[test]
fn primitives_are_laid_out_back_to_back() {
    let mut chunks = minimal_chunks();
    chunks[2] = shp1(&[(STRIP, &[0, 1, 2]), (0x90, &[3, 2, 1])]);
    let model = decode(&file(&chunks)).unwrap();
    let batch = &model.batches()[0];
    let ranges: Vec<_> = batch
        .primitives()
        .map(|p| (p.topology, p.start, p.count))
        .collect();
    assert_eq!(
        ranges,
        vec![(Topology::TriangleStrip, 0, 3), (Topology::Triangles, 3, 3)]
    );
    assert_eq!(batch.vertex(3).unwrap(), QUAD[3].as_slice());
}

#[test]
fn skinned_model_resolves_every_chunk() {
    let model = decode(&full_file()).unwrap();
    assert!(model.warnings().is_empty(), "{:?}", model.warnings());

    let names: Vec<_> = model.joints().iter().map(|j| j.name.as_str()).collect();
    assert_eq!(names, ["root", "arm"]);
    assert_eq!(model.envelopes().len(), 1);
    assert_eq!(model.envelopes()[0].joint_indices, [0, 1]);
    assert_eq!(
        model.draw_matrices(),
        &[
            DrawMatrix::Rigid { joint: 0 },
            DrawMatrix::Weighted { envelope: 0 }
        ]
    );

    let [batch] = model.batches() else {
        panic!("expected one batch, got {}", model.batches().len());
    };
    assert_eq!(
        batch.packets[0].matrix_slots,
        [
            MatrixSlot::Rigid { joint: 0 },
            MatrixSlot::Weighted {
                envelope: 0,
                joint: 1
            },
        ]
    );
    // Matrix slot, then position.
    assert_eq!(batch.stride, 4);
    assert_eq!(batch.vertex(1).unwrap(), [1.0, 1.0, 0.0, 0.0].as_slice());
    assert_eq!(batch.vertex(2).unwrap(), [0.0, 0.0, 1.0, 0.0].as_slice());

    // Reference 0 is remapped to the second record.
    assert_eq!(model.materials().name(0), Some("skin"));
    assert_eq!(model.material(0).unwrap().flag, 4);
    assert_eq!(model.material(1).unwrap().flag, 1);
    assert!(model.material(2).is_none());

    let [texture] = model.textures() else {
        panic!("expected one texture, got {}", model.textures().len());
    };
    assert_eq!(texture.name, "checker");
    assert_eq!(texture.format, TextureFormat::I8);
    assert!(matches!(texture.data, TextureData::Decoded { .. }));
    let [level] = texture.levels() else {
        panic!("expected one level");
    };
    assert_eq!((level.width, level.height), (8, 4));
    assert_eq!(level.pixels, (0..32).collect::<Vec<u8>>());
}

#[test]
fn weighted_slot_past_joints_is_structural() {
    let mut chunks = full_chunks();
    chunks[2] = evp1(&[&[(0, 0.25), (7, 0.75)]]);
    let err = decode(&file(&chunks)).unwrap_err();
    assert!(matches!(err.root(), DecodeError::StructuralMismatch { .. }), "{err}");
}

proptest! {
    #[test]
    fn corrupted_files_never_panic(
        edits in prop::collection::vec((any::<prop::sample::Index>(), any::<u8>()), 1..8),
    ) {
        let mut bytes = minimal_file();
        for (index, value) in edits {
            let i = index.index(bytes.len());
            bytes[i] = value;
        }
        let _ = decode(&bytes);
    }

    #[test]
    fn truncated_files_fail_cleanly(cut in 0usize..256) {
        let bytes = minimal_file();
        let cut = cut.min(bytes.len() - 1);
        prop_assert!(decode(&bytes[..cut]).is_err());
    }
}
