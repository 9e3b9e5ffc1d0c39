//! Full bake pipeline: scatter a mesh, bake attributes, stream frames into
//! an NBL container, and read the animation back.

use std::collections::HashMap;

use glam::{Vec2, Vec3};

use nebula_nbl::{NblReader, NblWriter, TextureEntry, WriterOptions};
use nebula_sampler::{
    FrameInput, ImageData, MeshScatterSource, MeshTopology, ParticleSource, SurfaceDistribution,
    TextureSource, bake_colors, bake_tex_ids,
};

struct SolidRed;

impl TextureSource for SolidRed {
    fn image(&self, material: u32) -> Option<ImageData<'_>> {
        const PIXELS: [u8; 4] = [255, 0, 0, 255];
        (material == 0).then_some(ImageData {
            pixels: &PIXELS,
            width: 1,
            height: 1,
        })
    }
}

fn quad_topology() -> MeshTopology {
    MeshTopology::new(
        vec![Vec3::ZERO, Vec3::X, Vec3::X + Vec3::Y, Vec3::Y],
        vec![[0, 1, 2], [0, 2, 3]],
        vec![0, 0],
        Some(vec![
            [Vec2::ZERO, Vec2::X, Vec2::ONE],
            [Vec2::ZERO, Vec2::ONE, Vec2::Y],
        ]),
    )
    .unwrap()
}

#[test]
fn scattered_swarm_survives_container_round_trip() {
    let topology = quad_topology();
    let mut distribution = SurfaceDistribution::precompute(&topology, 10.0, 99).unwrap();
    // Unit quad, density 10 -> floor(1.0 * 10 * 10) = 100 particles.
    assert_eq!(distribution.len(), 100);

    bake_colors(&mut distribution, &SolidRed);
    bake_tex_ids(&mut distribution, &HashMap::from([(0u32, 1u8)]));

    let mut source = ParticleSource::MeshScatter(MeshScatterSource {
        distribution,
        default_size: 150,
    });
    source.prepare().unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("baked.nbl");
    let textures = [
        TextureEntry::new("nebula:fallback.png"),
        TextureEntry::new("nebula:surface.png"),
    ];
    let total = 50u32;

    let mut writer =
        NblWriter::create(&path, 20, total, &textures, WriterOptions::default()).unwrap();
    for t in 0..total {
        // The quad sways along Z over time.
        let wave = (t as f32 * 0.1).sin() * 0.5;
        let vertices: Vec<Vec3> = quad_topology()
            .positions
            .iter()
            .map(|&p| p + Vec3::Z * wave * p.x)
            .collect();
        let frame = source.frame_data(&FrameInput::Vertices(&vertices)).unwrap();
        writer.write_frame(&frame).unwrap();
    }
    writer.finish().unwrap();

    let mut reader = NblReader::open(&path).unwrap();
    assert_eq!(reader.total_frames(), total);

    let mut cursor = reader.cursor();
    let first = cursor.seek(0).unwrap().clone();
    assert_eq!(first.len(), 100);
    assert!(first.colors.iter().all(|&c| c == [255, 0, 0, 255]));
    assert!(first.tex_ids.iter().all(|&t| t == 1));
    assert!(first.sizes.iter().all(|&s| s == 150));

    // Ids stay stable across the whole animation.
    let last = cursor.seek(total - 1).unwrap();
    assert_eq!(last.particle_ids, first.particle_ids);
}
