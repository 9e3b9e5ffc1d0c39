//! End-to-end tests over real files on disk

use std::fs;
use std::io::Cursor;

use pretty_assertions::assert_eq;

use nebula_nbl::{
    FrameData, NblReader, NblWriter, TextureEntry, WriterOptions, migrate_file, validate_file,
};

/// A drifting swarm with a rolling spawn/despawn window, so delta frames
/// exercise both implicit despawn and zero-baseline spawn paths. All
/// attribute values stay inside the delta ranges (colors ≤ 127 per
/// channel), so spawns never force an overflow keyframe and the keyframe
/// cadence is driven purely by the interval.
fn swarm_frame(t: u32) -> FrameData {
    let mut frame = FrameData::empty();
    let first = t / 4;
    for i in first..first + 32 {
        let phase = (i + t) as f32 * 0.1;
        frame.push(
            [
                phase.sin() * 3.0,
                t as f32 * 0.02 + i as f32 * 0.05,
                phase.cos() * 3.0,
            ],
            [120, (i * 7 % 128) as u8, (t * 3 % 128) as u8, 100],
            100 + (t % 50) as u16,
            (i % 2) as u8,
            (t % 16) as u8,
            i as i32,
        );
    }
    frame
}

#[test]
fn disk_round_trip_preserves_animation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("swarm.nbl");
    let textures = [
        TextureEntry::new("nebula:flame.png"),
        TextureEntry {
            path: "nebula:smoke_sheet.png".to_string(),
            rows: 4,
            cols: 4,
        },
    ];

    let total = 120u32;
    let mut writer = NblWriter::create(
        &path,
        20,
        total,
        &textures,
        WriterOptions {
            keyframe_interval: 30,
            ..WriterOptions::default()
        },
    )
    .unwrap();
    for t in 0..total {
        writer.write_frame(&swarm_frame(t)).unwrap();
    }
    writer.finish().unwrap();

    let mut reader = NblReader::open(&path).unwrap();
    assert_eq!(reader.header().target_fps, 20);
    assert_eq!(reader.total_frames(), total);
    assert_eq!(reader.textures(), &textures);
    assert_eq!(reader.keyframes(), &[0, 30, 60, 90]);

    let mut cursor = reader.cursor();
    for t in 0..total {
        let expected = swarm_frame(t);
        let decoded = cursor.seek(t).unwrap();

        assert_eq!(decoded.particle_ids, expected.particle_ids, "frame {t}");
        assert_eq!(decoded.colors, expected.colors, "frame {t}");
        assert_eq!(decoded.sizes, expected.sizes, "frame {t}");
        assert_eq!(decoded.tex_ids, expected.tex_ids, "frame {t}");
        assert_eq!(decoded.seq_indices, expected.seq_indices, "frame {t}");
        for (d, e) in decoded.positions.iter().zip(&expected.positions) {
            for axis in 0..3 {
                // Per-step quantization error is at most half a
                // millimeter; it does not accumulate across a 30-frame
                // delta chain beyond the per-frame bound times the chain.
                assert!(
                    (d[axis] - e[axis]).abs() <= 0.0005 * 30.0,
                    "frame {t}: {d:?} vs {e:?}"
                );
            }
        }
    }
}

#[test]
fn bounding_box_covers_all_positions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bbox.nbl");

    let mut writer = NblWriter::create(&path, 20, 40, &[], WriterOptions::default()).unwrap();
    for t in 0..40 {
        writer.write_frame(&swarm_frame(t)).unwrap();
    }
    writer.finish().unwrap();

    let mut reader = NblReader::open(&path).unwrap();
    let (bbox_min, bbox_max) = (reader.header().bbox_min, reader.header().bbox_max);

    let mut cursor = reader.cursor();
    for t in 0..40 {
        let frame = cursor.seek(t).unwrap();
        for pos in &frame.positions {
            for axis in 0..3 {
                // Quantized decode can stray slightly outside the exact
                // source bounds.
                assert!(pos[axis] >= bbox_min[axis] - 0.02);
                assert!(pos[axis] <= bbox_max[axis] + 0.02);
            }
        }
    }
}

#[test]
fn freshly_written_file_validates_clean() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clean.nbl");

    let mut writer = NblWriter::create(
        &path,
        20,
        60,
        &[TextureEntry::new("nebula:glow.png")],
        WriterOptions::default(),
    )
    .unwrap();
    for t in 0..60 {
        writer.write_frame(&swarm_frame(t)).unwrap();
    }
    writer.finish().unwrap();

    let report = validate_file(&path).unwrap();
    assert!(report.is_valid(), "{:?}", report.issues);
    assert_eq!(report.frames_checked, 60);
}

#[test]
fn truncated_session_produces_a_valid_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("truncated.nbl");

    // Plan 500 frames, deliver 73.
    let mut writer = NblWriter::create(&path, 20, 500, &[], WriterOptions::default()).unwrap();
    for t in 0..73 {
        writer.write_frame(&swarm_frame(t)).unwrap();
    }
    writer.finish().unwrap();

    let report = validate_file(&path).unwrap();
    assert!(report.is_valid(), "{:?}", report.issues);
    assert_eq!(report.frames_checked, 73);

    let mut reader = NblReader::open(&path).unwrap();
    assert_eq!(reader.total_frames(), 73);
    assert_eq!(reader.keyframes(), &[0, 60]);
    let last = reader.cursor().seek(72).unwrap().clone();
    assert_eq!(last.particle_ids, swarm_frame(72).particle_ids);
}

#[test]
fn out_of_bounds_index_entry_is_flagged() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("oob.nbl");

    let mut writer = NblWriter::create(&path, 20, 10, &[], WriterOptions::default()).unwrap();
    for t in 0..10 {
        writer.write_frame(&swarm_frame(t)).unwrap();
    }
    writer.finish().unwrap();

    // Point frame 5's index entry far past the end of the file. The
    // fixture has no texture table, so the index starts right after the
    // header.
    let mut bytes = fs::read(&path).unwrap();
    let entry_pos = 48 + 5 * 12;
    bytes[entry_pos..entry_pos + 8].copy_from_slice(&(1u64 << 40).to_le_bytes());
    fs::write(&path, bytes).unwrap();

    let report = validate_file(&path).unwrap();
    assert!(!report.is_valid());
    assert_eq!(report.frames_checked, 9);
}

#[test]
fn legacy_file_migrates_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let v1_path = dir.path().join("modern.nbl");
    let v0_path = dir.path().join("legacy.nbl");
    let migrated_path = dir.path().join("migrated.nbl");

    // Produce a v1 file, then rewrite it as a v0 layout by dropping the
    // keyframe table and shifting offsets back.
    let mut writer = NblWriter::create(
        &v1_path,
        20,
        30,
        &[],
        WriterOptions {
            keyframe_interval: 10,
            ..WriterOptions::default()
        },
    )
    .unwrap();
    for t in 0..30 {
        writer.write_frame(&swarm_frame(t)).unwrap();
    }
    writer.finish().unwrap();

    downgrade_to_v0(&v1_path, &v0_path);

    let summary = migrate_file(&v0_path, &migrated_path).unwrap();
    assert_eq!(summary.total_frames, 30);
    assert_eq!(summary.keyframes_found, 3);

    let report = validate_file(&migrated_path).unwrap();
    assert!(report.is_valid(), "{:?}", report.issues);

    // Migrated playback matches the original v1 file frame for frame.
    let mut original = NblReader::open(&v1_path).unwrap();
    let mut migrated = NblReader::open(&migrated_path).unwrap();
    assert_eq!(migrated.keyframes(), original.keyframes());
    let mut a = original.cursor();
    let mut b = migrated.cursor();
    for t in 0..30 {
        assert_eq!(a.seek(t).unwrap(), b.seek(t).unwrap(), "frame {t}");
    }
}

/// Rewrites a v1 file into the legacy v0 layout: version field zeroed,
/// keyframe table removed, chunk offsets shifted back by its size.
fn downgrade_to_v0(src: &std::path::Path, dst: &std::path::Path) {
    let bytes = fs::read(src).unwrap();
    let reader = NblReader::new(Cursor::new(bytes.clone())).unwrap();
    let total = reader.total_frames() as usize;
    let table_size = 4 + 4 * reader.keyframes().len();
    let index_pos = 48usize; // no textures in this fixture
    let table_pos = index_pos + total * 12;

    let mut out = Vec::with_capacity(bytes.len() - table_size);
    out.extend_from_slice(&bytes[..table_pos]);
    out.extend_from_slice(&bytes[table_pos + table_size..]);

    // version = 0
    out[8] = 0;
    out[9] = 0;
    // shift each index entry's offset back
    for i in 0..total {
        let pos = index_pos + i * 12;
        let mut offset = u64::from_le_bytes(out[pos..pos + 8].try_into().unwrap());
        offset -= table_size as u64;
        out[pos..pos + 8].copy_from_slice(&offset.to_le_bytes());
    }

    fs::write(dst, out).unwrap();
}
