//! Synthetic BMD files for integration tests.

#![allow(dead_code)]

/// Big-endian byte buffer builder.
#[derive(Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn position(&self) -> usize {
        self.buf.len()
    }

    pub fn bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn u8(&mut self, v: u8) -> &mut Self {
        self.buf.push(v);
        self
    }

    pub fn u16(&mut self, v: u16) -> &mut Self {
        self.bytes(&v.to_be_bytes())
    }

    pub fn u32(&mut self, v: u32) -> &mut Self {
        self.bytes(&v.to_be_bytes())
    }

    pub fn f32(&mut self, v: f32) -> &mut Self {
        self.bytes(&v.to_be_bytes())
    }

    pub fn pad_to(&mut self, pos: usize) -> &mut Self {
        if self.buf.len() < pos {
            self.buf.resize(pos, 0);
        }
        self
    }

    pub fn patch_u32(&mut self, pos: usize, v: u32) {
        self.buf[pos..pos + 4].copy_from_slice(&v.to_be_bytes());
    }

    /// Patch the size field of a chunk started at offset 0 and return it.
    pub fn finish_chunk(mut self) -> Vec<u8> {
        let size = self.buf.len() as u32;
        self.patch_u32(4, size);
        self.buf
    }
}

/// Hierarchy instruction codes.
pub const OPEN: (u16, u16) = (0x01, 0);
pub const CLOSE: (u16, u16) = (0x02, 0);

pub fn joint(index: u16) -> (u16, u16) {
    (0x10, index)
}

pub fn material(index: u16) -> (u16, u16) {
    (0x11, index)
}

pub fn batch(index: u16) -> (u16, u16) {
    (0x12, index)
}

/// Wrap chunks in a file header.
pub fn file(chunks: &[Vec<u8>]) -> Vec<u8> {
    let mut w = Writer::default();
    w.bytes(b"J3D2bmd3").u32(0).u32(chunks.len() as u32);
    w.pad_to(0x20);
    for chunk in chunks {
        w.bytes(chunk);
    }
    let size = w.position() as u32;
    w.patch_u32(8, size);
    w.buf
}

pub fn inf1(nodes: &[(u16, u16)], vertex_count: u32) -> Vec<u8> {
    let mut w = Writer::default();
    w.bytes(b"INF1").u32(0).u16(0).u16(0xffff);
    w.u32(1).u32(vertex_count).u32(0x18);
    for &(kind, index) in nodes {
        w.u16(kind).u16(index);
    }
    w.u16(0).u16(0);
    w.finish_chunk()
}

/// VTX1 with a single f32 position array.
pub fn vtx1(positions: &[[f32; 3]]) -> Vec<u8> {
    let mut w = Writer::default();
    w.bytes(b"VTX1").u32(0).u32(0x40);
    w.pad_to(0x40);
    // Position, xyz, f32.
    w.u32(0x09).u32(1).u32(4).u8(0).bytes(&[0; 3]);
    w.u32(0xff);
    let end = w.position() + 12;
    w.pad_to(end);
    let data = w.position() as u32;
    w.patch_u32(0x0c, data);
    for p in positions {
        for &v in p {
            w.f32(v);
        }
    }
    w.finish_chunk()
}

/// Attribute and index type ids.
pub const MATRIX_DIRECT: (u32, u32) = (0x00, 1);
pub const POSITION_INDEX16: (u32, u32) = (0x09, 3);

/// SHP1 with one batch of 16-bit position indices and no matrix palette.
/// Each inner slice of `primitives` is `(opcode, indices)`.
pub fn shp1(primitives: &[(u8, &[u16])]) -> Vec<u8> {
    let mut list = Writer::default();
    for &(opcode, indices) in primitives {
        list.u8(opcode).u16(indices.len() as u16);
        for &i in indices {
            list.u16(i);
        }
    }
    shp1_batch(&[POSITION_INDEX16], &[], &list.buf)
}

/// SHP1 with one single-packet batch using `attributes`, the packet
/// matrix palette `slots` and a raw display list.
pub fn shp1_batch(attributes: &[(u32, u32)], slots: &[u16], display_list: &[u8]) -> Vec<u8> {
    let mut w = Writer::default();
    w.bytes(b"SHP1").u32(0).u16(1).u16(0xffff);
    w.pad_to(0x2c);

    w.patch_u32(0x0c, 0x2c);
    // Single matrix, one packet, attributes at 0, first matrix data 0,
    // first packet location 0.
    w.u8(0).u8(0xff).u16(1);
    w.u16(0).u16(0).u16(0).u16(0xffff);
    w.f32(1.0);
    for v in [-1.0, -1.0, -1.0, 1.0, 1.0, 1.0] {
        w.f32(v);
    }

    let table = w.position() as u32;
    w.patch_u32(0x18, table);
    for &(attribute, index_type) in attributes {
        w.u32(attribute).u32(index_type);
    }
    w.u32(0xff).u32(0);

    let matrix_table = w.position() as u32;
    w.patch_u32(0x1c, matrix_table);
    for &slot in slots {
        w.u16(slot);
    }

    let matrix_data = w.position() as u32;
    w.patch_u32(0x24, matrix_data);
    w.u16(0).u16(slots.len() as u16).u32(0);

    let list_size = display_list.len().next_multiple_of(0x20);
    let packet_locations = w.position() as u32;
    w.patch_u32(0x28, packet_locations);
    w.u32(list_size as u32).u32(0);

    let data = w.position();
    w.patch_u32(0x20, data as u32);
    w.bytes(display_list);
    w.pad_to(data + list_size);
    w.finish_chunk()
}

/// EVP1 whose influence `k`, counted across all envelopes, carries a bind
/// matrix translating by `(k, 0, 0)`.
pub fn evp1(envelopes: &[&[(u16, f32)]]) -> Vec<u8> {
    let mut w = Writer::default();
    w.bytes(b"EVP1").u32(0).u16(envelopes.len() as u16).u16(0xffff);
    w.u32(0).u32(0).u32(0).u32(0);

    let counts = w.position() as u32;
    w.patch_u32(0x0c, counts);
    for e in envelopes {
        w.u8(e.len() as u8);
    }
    let indices = w.position() as u32;
    w.patch_u32(0x10, indices);
    for e in envelopes {
        for &(joint, _) in *e {
            w.u16(joint);
        }
    }
    let weights = w.position() as u32;
    w.patch_u32(0x14, weights);
    for e in envelopes {
        for &(_, weight) in *e {
            w.f32(weight);
        }
    }
    let matrices = w.position() as u32;
    w.patch_u32(0x18, matrices);
    let influences: usize = envelopes.iter().map(|e| e.len()).sum();
    for k in 0..influences {
        for v in [1.0, 0.0, 0.0, k as f32, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
            w.f32(v);
        }
    }
    w.finish_chunk()
}

/// DRW1 from `(weighted, index)` entries.
pub fn drw1(entries: &[(bool, u16)]) -> Vec<u8> {
    let mut w = Writer::default();
    w.bytes(b"DRW1").u32(0).u16(entries.len() as u16).u16(0xffff);
    w.u32(0).u32(0);
    let flags = w.position() as u32;
    w.patch_u32(0x0c, flags);
    for &(weighted, _) in entries {
        w.u8(u8::from(weighted));
    }
    let data = w.position().next_multiple_of(2);
    w.pad_to(data);
    w.patch_u32(0x10, data as u32);
    for &(_, index) in entries {
        w.u16(index);
    }
    w.finish_chunk()
}

/// A 0x14C-byte material record with every pool index unset.
pub fn material_record(flag: u8) -> Vec<u8> {
    let mut r = vec![0xffu8; 0x14c];
    r[0] = flag;
    // Konst selectors are values rather than indices.
    r[156..188].fill(0);
    r
}

/// Name table with the hash left zero.
fn string_table(w: &mut Writer, names: &[&str]) {
    let table = w.position();
    w.u16(names.len() as u16).u16(0xffff);
    let mut offset = 4 + 4 * names.len();
    for name in names {
        w.u16(0).u16(offset as u16);
        offset += name.len() + 1;
    }
    for name in names {
        w.bytes(name.as_bytes()).u8(0);
    }
    debug_assert_eq!(w.position() - table, offset);
}

/// MAT3 holding only records, the remap table and names.
pub fn mat3(remap: &[u16], names: &[&str], records: &[Vec<u8>]) -> Vec<u8> {
    let mut w = Writer::default();
    w.bytes(b"MAT3").u32(0).u16(remap.len() as u16).u16(0xffff);
    let table = w.position();
    w.pad_to(table + 30 * 4);

    let place = |w: &mut Writer, slot: usize| {
        let at = w.position().next_multiple_of(4);
        w.pad_to(at);
        w.patch_u32(table + slot * 4, at as u32);
    };
    place(&mut w, 0);
    for r in records {
        w.bytes(r);
    }
    place(&mut w, 1);
    for &index in remap {
        w.u16(index);
    }
    place(&mut w, 2);
    string_table(&mut w, names);
    w.finish_chunk()
}

/// TEX1 with one I8 texture whose texels hold their index within the
/// 8x4 tile.
pub fn tex1_i8(name: &str, width: u16, height: u16) -> Vec<u8> {
    let mut w = Writer::default();
    w.bytes(b"TEX1").u32(0).u16(1).u16(0xffff);
    w.u32(0x20).u32(0).pad_to(0x20);

    let header = w.position();
    w.u8(0x1).u8(0).u16(width).u16(height);
    w.u8(0).u8(0).u8(0).u8(0).u16(0).u32(0);
    w.u8(0).u8(0).u8(0).u8(0).u8(1).u8(1);
    w.u8(0).u8(0).u8(1).u8(0).u16(0);
    // Pixel data follows the 0x20-byte header.
    w.u32(0x20);
    debug_assert_eq!(w.position() - header, 0x20);
    let tiles = usize::from(width).div_ceil(8) * usize::from(height).div_ceil(4);
    for _ in 0..tiles {
        for i in 0..32u8 {
            w.u8(i);
        }
    }

    let names = w.position() as u32;
    w.patch_u32(0x10, names);
    string_table(&mut w, &[name]);
    w.finish_chunk()
}

/// JNT1 with identity-scale joints at the given translations.
pub fn jnt1(joints: &[(&str, [f32; 3])]) -> Vec<u8> {
    let mut w = Writer::default();
    w.bytes(b"JNT1").u32(0).u16(joints.len() as u16).u16(0xffff);
    w.u32(0x18).u32(0).u32(0).pad_to(0x18);
    for &(_, translation) in joints {
        w.u16(0).u8(0).u8(0xff);
        w.f32(1.0).f32(1.0).f32(1.0);
        w.u16(0).u16(0).u16(0).u16(0xffff);
        for v in translation {
            w.f32(v);
        }
        w.f32(1.0);
        for v in [-1.0, -1.0, -1.0, 1.0, 1.0, 1.0] {
            w.f32(v);
        }
    }

    let names = w.position();
    w.patch_u32(0x14, names as u32);
    let joint_names: Vec<_> = joints.iter().map(|&(name, _)| name).collect();
    string_table(&mut w, &joint_names);
    w.finish_chunk()
}

/// A chunk with an arbitrary tag and body.
pub fn raw_chunk(tag: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut w = Writer::default();
    w.bytes(tag).u32(0).bytes(body);
    w.finish_chunk()
}

pub const QUAD: [[f32; 3]; 4] = [
    [0.0, 0.0, 0.0],
    [1.0, 0.0, 0.0],
    [0.0, 1.0, 0.0],
    [1.0, 1.0, 0.0],
];

/// Triangle strip opcode.
pub const STRIP: u8 = 0x98;

/// One joint drawing one quad strip.
pub fn minimal_chunks() -> Vec<Vec<u8>> {
    vec![
        inf1(&[joint(0), OPEN, batch(0), CLOSE], 4),
        vtx1(&QUAD),
        shp1(&[(STRIP, &[0, 1, 2, 3])]),
        jnt1(&[("root", [0.0, 0.0, 0.0])]),
    ]
}

pub fn minimal_file() -> Vec<u8> {
    file(&minimal_chunks())
}

/// All eight known chunks: two joints, one skinned envelope, a packet
/// palette with a rigid and a weighted slot, two physical materials behind
/// a remap table, and an 8x4 I8 texture.
pub fn full_chunks() -> Vec<Vec<u8>> {
    let mut list = Writer::default();
    // Triangle strip, (matrix slot * 3, position) per vertex.
    list.u8(STRIP).u16(4);
    for (slot, position) in [(0u8, 0u16), (1, 1), (0, 2), (1, 3)] {
        list.u8(slot * 3).u16(position);
    }

    vec![
        inf1(&[joint(0), OPEN, joint(1), material(0), batch(0), CLOSE], 4),
        vtx1(&QUAD),
        evp1(&[&[(0, 0.25), (1, 0.75)]]),
        drw1(&[(false, 0), (true, 0)]),
        jnt1(&[("root", [0.0, 0.0, 0.0]), ("arm", [1.0, 0.0, 0.0])]),
        shp1_batch(&[MATRIX_DIRECT, POSITION_INDEX16], &[0, 1], &list.buf),
        mat3(&[1, 0], &["skin", "cloth"], &[material_record(1), material_record(4)]),
        tex1_i8("checker", 8, 4),
    ]
}

pub fn full_file() -> Vec<u8> {
    file(&full_chunks())
}
