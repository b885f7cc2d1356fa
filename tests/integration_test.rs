use assetlib::codec::{compress, CompressionMode};
use assetlib::{
    load_binary_file, pack_environment, pack_mesh, pack_texture, read_environment_info,
    read_mesh_info, read_texture_info, save_binary_file, unpack_environment, unpack_mesh,
    unpack_texture, AssetError, AssetFile, AssetType, ColorSpace, EnvironmentInfo, MeshInfo,
    PNTV32Vertex, TextureInfo, IENV_VERSION, ITEX_VERSION, MESH_VERSION,
};
use tempfile::NamedTempFile;

fn checkerboard(width: u32, height: u32) -> Vec<u8> {
    let mut px = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            let on = ((x / 8) + (y / 8)) % 2 == 0;
            px.extend_from_slice(if on { &[0xFF, 0xFF, 0xFF, 0xFF] } else { &[0x20, 0x20, 0x20, 0xFF] });
        }
    }
    px
}

/// Splitmix64 bytes: not compressible by LZ4.
fn noise(len: usize, seed: u64) -> Vec<u8> {
    let mut state = seed;
    let mut out = Vec::with_capacity(len);
    while out.len() < len {
        state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^= z >> 31;
        out.extend_from_slice(&z.to_le_bytes());
    }
    out.truncate(len);
    out
}

#[test]
fn test_texture_file_roundtrip() {
    let temp_file = NamedTempFile::new().unwrap();
    let pixels = checkerboard(64, 32);
    let info = TextureInfo::rgba8(64, 32, ColorSpace::SRGB);

    save_binary_file(temp_file.path(), &pack_texture(&info, &pixels).unwrap()).unwrap();

    let file = load_binary_file(temp_file.path()).unwrap();
    assert_eq!(file.asset_type().unwrap(), AssetType::Texture);
    assert_eq!(file.version, ITEX_VERSION);

    let read = read_texture_info(&file).unwrap();
    assert_eq!(read.compression, CompressionMode::Lz4);
    assert_eq!(read.color_space, ColorSpace::SRGB);
    assert_eq!(&read.extents[..2], &[64, 32]);

    let mut out = vec![0u8; read.byte_size as usize];
    unpack_texture(&read, &file, &mut out).unwrap();
    assert_eq!(out, pixels);
}

#[test]
fn test_texture_raw_roundtrip() {
    let pixels = noise(16 * 16 * 4, 7);
    let info = TextureInfo { compression: CompressionMode::None, ..TextureInfo::rgba8(16, 16, ColorSpace::RGB) };
    let file = AssetFile::from_bytes(&pack_texture(&info, &pixels).unwrap().to_bytes().unwrap()).unwrap();

    let read = read_texture_info(&file).unwrap();
    let mut out = vec![0u8; pixels.len()];
    unpack_texture(&read, &file, &mut out).unwrap();
    assert_eq!(out, pixels);
}

#[test]
fn test_incompressible_texture_is_stored_raw() {
    let pixels = noise(32 * 32 * 4, 42);
    let ratio = compress(&pixels).unwrap().len() as f64 / pixels.len() as f64;
    assert!(ratio > 0.8, "fixture must be incompressible, ratio {ratio}");

    let info = TextureInfo::rgba8(32, 32, ColorSpace::RGB);
    assert_eq!(info.compression, CompressionMode::Lz4);
    let file = pack_texture(&info, &pixels).unwrap();

    let json: serde_json::Value = serde_json::from_str(&file.metadata).unwrap();
    assert_eq!(json["compression_mode"], "None");
    assert_eq!(file.payload, pixels);

    let read = read_texture_info(&file).unwrap();
    assert_eq!(read.compression, CompressionMode::None);
    let mut out = vec![0u8; pixels.len()];
    unpack_texture(&read, &file, &mut out).unwrap();
    assert_eq!(out, pixels);
}

fn quad_grid(count: u32) -> Vec<PNTV32Vertex> {
    (0..count)
        .map(|i| PNTV32Vertex {
            position: [i as f32 * 0.5, (i % 3) as f32, -(i as f32)],
            normal:   [0.0, 1.0, 0.0],
            tangent:  [1.0, 0.0, 0.0],
            uv:       [(i % 2) as f32, (i / 2 % 2) as f32],
        })
        .collect()
}

#[test]
fn test_mesh_roundtrip_both_modes() {
    let vertices = quad_grid(100);
    let indices: Vec<u32> = (0..300).map(|i| (i * 13) % 100).collect();

    for mode in [CompressionMode::Lz4, CompressionMode::None] {
        let temp_file = NamedTempFile::new().unwrap();
        let info = MeshInfo {
            compression:  mode,
            vertex_count: 100,
            index_count:  300,
            index_bits:   32,
            ..MeshInfo::default()
        };
        let packed = pack_mesh(&info, bytemuck::cast_slice(&vertices), bytemuck::cast_slice(&indices)).unwrap();
        save_binary_file(temp_file.path(), &packed).unwrap();

        let file = load_binary_file(temp_file.path()).unwrap();
        assert_eq!(file.version, MESH_VERSION);
        let read = read_mesh_info(&file).unwrap();
        assert_eq!(read.compression, mode);

        // The split offset equals the stored vertex segment length.
        let vertex_segment_len = match mode {
            CompressionMode::Lz4  => compress(bytemuck::cast_slice(&vertices)).unwrap().len(),
            CompressionMode::None => 100 * 44,
        };
        assert_eq!(read.index_binary_offset as usize, vertex_segment_len);

        let mut out_v = vec![PNTV32Vertex::default(); 100];
        let mut out_i = vec![0u32; 300];
        unpack_mesh(&read, &file, bytemuck::cast_slice_mut(&mut out_v), bytemuck::cast_slice_mut(&mut out_i)).unwrap();
        assert_eq!(out_v, vertices);
        assert_eq!(out_i, indices);
    }
}

#[test]
fn test_mesh_zero_indices_is_rejected() {
    let vertices = quad_grid(3);
    let info = MeshInfo { vertex_count: 3, index_count: 0, ..MeshInfo::default() };
    let result = pack_mesh(&info, bytemuck::cast_slice(&vertices), &[]);
    assert!(matches!(result, Err(AssetError::Validation(_))));
}

#[test]
fn test_environment_roundtrip() {
    let hdr: Vec<u8> = (0..8192u32).map(|i| (i / 128) as u8).collect();
    let irradiance: Vec<u8> = (0..1536u32).map(|i| (i % 3) as u8 * 40).collect();
    let specular: Vec<u8> = (0..6144u32).map(|i| (i / 16 % 256) as u8).collect();
    let info = EnvironmentInfo {
        hdr_extents:      [64, 32],
        hdr_bytes:        hdr.len() as u32,
        irradiance_size:  16,
        irradiance_bytes: irradiance.len() as u32,
        specular_size:    32,
        specular_bytes:   specular.len() as u32,
        ..EnvironmentInfo::default()
    };

    let temp_file = NamedTempFile::new().unwrap();
    save_binary_file(temp_file.path(), &pack_environment(&info, &hdr, &irradiance, &specular).unwrap()).unwrap();
    let file = load_binary_file(temp_file.path()).unwrap();
    assert_eq!(file.version, IENV_VERSION);

    let read = read_environment_info(&file).unwrap();
    let hdr_len = compress(&hdr).unwrap().len();
    let irradiance_len = compress(&irradiance).unwrap().len();
    assert_eq!(read.irradiance_offset as usize, hdr_len);
    assert_eq!(read.specular_offset as usize, hdr_len + irradiance_len);

    let mut out_hdr = vec![0u8; hdr.len()];
    let mut out_irr = vec![0u8; irradiance.len()];
    let mut out_spec = vec![0u8; specular.len()];
    unpack_environment(&read, &file, &mut out_hdr, &mut out_irr, &mut out_spec).unwrap();
    assert_eq!(out_hdr, hdr);
    assert_eq!(out_irr, irradiance);
    assert_eq!(out_spec, specular);
}

#[test]
fn test_codecs_reject_foreign_containers() {
    let info = TextureInfo::rgba8(4, 4, ColorSpace::RGB);
    let texture = pack_texture(&info, &checkerboard(4, 4)).unwrap();

    assert!(matches!(read_mesh_info(&texture), Err(AssetError::VersionMismatch { .. })));
    assert!(matches!(read_environment_info(&texture), Err(AssetError::VersionMismatch { .. })));

    let mut future = texture.clone();
    future.version = assetlib::pack_version(2, 0, 0);
    assert!(matches!(read_texture_info(&future), Err(AssetError::VersionMismatch { .. })));

    let mut unknown = texture;
    unknown.type_tag = *b"SNDX";
    assert!(matches!(unknown.asset_type(), Err(AssetError::VersionMismatch { .. })));
    assert!(matches!(read_texture_info(&unknown), Err(AssetError::VersionMismatch { .. })));
}

#[test]
fn test_truncated_file_is_rejected() {
    let temp_file = NamedTempFile::new().unwrap();
    std::fs::write(temp_file.path(), b"ITEX\x00").unwrap();
    assert!(matches!(
        load_binary_file(temp_file.path()),
        Err(AssetError::TruncatedInput { needed: 16, available: 5, .. })
    ));
}

#[test]
fn test_implausible_sizes_are_rejected_before_allocation() {
    let temp_file = NamedTempFile::new().unwrap();
    let texture = AssetFile::new(
        AssetType::Texture,
        r#"{"format":"RGBA8","compression_mode":"LZ4","extents":{"x":1,"y":1},"byte_size":"100000000000000","mip_levels":1}"#.into(),
        vec![0xDE, 0xAD, 0xBE, 0xEF],
    );
    save_binary_file(temp_file.path(), &texture).unwrap();

    let file = load_binary_file(temp_file.path()).unwrap();
    let info = read_texture_info(&file).unwrap();
    assert_eq!(info.byte_size, 100_000_000_000_000);
    assert!(matches!(info.check_plausible(&file), Err(AssetError::CorruptPayload(_))));

    let mesh = AssetFile::new(
        AssetType::Mesh,
        r#"{"compression_mode":"LZ4","vertex_count":"4000000000","index_count":"4000000000","index_bits":32,"index_binary_offset":2}"#.into(),
        vec![0; 4],
    );
    let info = read_mesh_info(&mesh).unwrap();
    assert!(matches!(info.check_plausible(&mesh), Err(AssetError::CorruptPayload(_))));
}
