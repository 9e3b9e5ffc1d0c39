//! Static attribute baking
//!
//! Scattered particles inherit their color from the texture of the material
//! under them, sampled once at their interpolated UV, and their texture id
//! from a caller-supplied material-to-texture mapping. Baking runs once at
//! setup time; the results are frozen into the distribution so frame
//! evaluation never touches image data.

use std::collections::HashMap;

use crate::sampler::SurfaceDistribution;

/// A borrowed RGBA8 image, row-major, no padding
#[derive(Debug, Clone, Copy)]
pub struct ImageData<'a> {
    /// Pixel data, `width * height * 4` bytes
    pub pixels: &'a [u8],
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

/// Resolves material indices to their base-color images.
///
/// Returning `None` for a material paints its particles opaque white.
pub trait TextureSource {
    /// The image to sample for a given material index, if any
    fn image(&self, material: u32) -> Option<ImageData<'_>>;
}

const WHITE: [u8; 4] = [255, 255, 255, 255];

/// Samples each particle's static color from its material's texture.
///
/// Nearest-neighbor lookup: UVs wrap into `[0, 1)` and the resulting texel
/// coordinate is clamped to the image bounds. Each distinct material is
/// resolved through the source exactly once.
pub fn bake_colors(dist: &mut SurfaceDistribution, source: &dyn TextureSource) {
    let mut images: HashMap<u32, Option<ImageData<'_>>> = HashMap::new();

    for i in 0..dist.len() {
        let material = dist.material_indices[i];
        let image = *images
            .entry(material)
            .or_insert_with(|| source.image(material));

        dist.static_colors[i] = match image {
            Some(image) => sample_nearest(&image, dist.static_uvs[i].x, dist.static_uvs[i].y),
            None => WHITE,
        };
    }
}

/// Assigns each particle the texture table id mapped to its material.
/// Particles of unmapped materials keep texture id 0.
pub fn bake_tex_ids(dist: &mut SurfaceDistribution, material_to_texture: &HashMap<u32, u8>) {
    for i in 0..dist.len() {
        if let Some(&tex) = material_to_texture.get(&dist.material_indices[i]) {
            dist.static_tex_ids[i] = tex;
        }
    }
}

fn sample_nearest(image: &ImageData<'_>, u: f32, v: f32) -> [u8; 4] {
    if image.width == 0 || image.height == 0 {
        return WHITE;
    }

    let u = u.rem_euclid(1.0);
    let v = v.rem_euclid(1.0);
    let x = ((u * image.width as f32) as u32).min(image.width - 1);
    let y = ((v * image.height as f32) as u32).min(image.height - 1);

    let offset = ((y * image.width + x) * 4) as usize;
    match image.pixels.get(offset..offset + 4) {
        Some(texel) => [texel[0], texel[1], texel[2], texel[3]],
        // Undersized pixel buffer; treat like a missing image.
        None => WHITE,
    }
}
