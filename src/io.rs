// ============================================================================
// Export: PNG grids, animated GIF sweeps and .lsd latent-sample files
// ============================================================================

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::error::{IganError, Result};
use crate::latent::LatentSamples;
use crate::log_info;
use crate::visualize::{Animation, Frame};

/// Magic string stored at the head of every .lsd file.
const LSD_MAGIC_V1: &str = "IGLSD001";

/// On-disk layout of a latent-sample file.
#[derive(Serialize, Deserialize)]
struct SampleFileV1 {
    magic: String,
    samples: LatentSamples,
}

/// Save a latent dictionary as a bincode .lsd file.
pub fn save_samples(samples: &LatentSamples, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let record = SampleFileV1 {
        magic: LSD_MAGIC_V1.to_string(),
        samples: samples.clone(),
    };
    bincode::serialize_into(writer, &record)?;
    log_info!("wrote {} latent level(s) to {}", samples.len(), path.display());
    Ok(())
}

/// Load a .lsd file written by [`save_samples`].
pub fn load_samples(path: &Path) -> Result<LatentSamples> {
    // bincode writes a String as an 8-byte length prefix followed by UTF-8 data,
    // so a valid file starts with the prefix for the 8-byte magic.
    let raw = std::fs::read(path)?;
    let magic_len = (LSD_MAGIC_V1.len() as u64).to_le_bytes();
    if raw.len() < 16 || raw[..8] != magic_len || &raw[8..16] != LSD_MAGIC_V1.as_bytes() {
        return Err(IganError::Serialize(format!(
            "{} is not a latent-sample file",
            path.display()
        )));
    }
    let record: SampleFileV1 = bincode::deserialize(&raw)?;
    record
        .samples
        .check_shape()
        .map_err(|e| IganError::Serialize(format!("{}: {}", path.display(), e)))?;
    Ok(record.samples)
}

/// Write each frame to `dir/<name>.png`. Returns the written paths.
pub fn save_frames(frames: &[Frame], dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::with_capacity(frames.len());
    for frame in frames {
        let path = dir.join(format!("{}.png", frame.name));
        frame.image.save(&path)?;
        written.push(path);
    }
    log_info!("saved {} frame(s) to {}", written.len(), dir.display());
    Ok(written)
}

/// Write an animation to `dir/<name>.gif`, spreading the frames over `duration_secs`.
pub fn save_animation(animation: &Animation, dir: &Path, duration_secs: f32) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.gif", animation.name));
    let fps = animation.frames.len() as f32 / duration_secs.max(f32::EPSILON);
    encode_animated_gif(&animation.frames, fps, &path)?;
    Ok(path)
}

/// Encode frames as a looping GIF with a per-frame NeuQuant palette.
pub fn encode_animated_gif(frames: &[RgbImage], fps: f32, path: &Path) -> Result<()> {
    let Some(first) = frames.first() else {
        return Err(IganError::Encode("no frames to encode".into()));
    };
    if first.width() > u16::MAX as u32 || first.height() > u16::MAX as u32 {
        return Err(IganError::Encode(
            "image dimensions exceed GIF maximum (65535x65535)".into(),
        ));
    }
    if frames.iter().any(|f| f.dimensions() != first.dimensions()) {
        return Err(IganError::Encode("all GIF frames must share one size".into()));
    }

    let (w, h) = (first.width() as u16, first.height() as u16);
    let delay_cs = ((100.0 / fps.max(0.01)).round() as u16).max(1);
    let file = File::create(path)?;

    let (global_palette, _) = quantize_rgb(first, 256);
    let mut encoder = gif::Encoder::new(BufWriter::new(file), w, h, &global_palette)
        .map_err(|e| IganError::Encode(format!("GIF encoder init error: {}", e)))?;
    encoder
        .set_repeat(gif::Repeat::Infinite)
        .map_err(|e| IganError::Encode(format!("GIF set repeat error: {}", e)))?;

    for frame_img in frames {
        let (local_palette, local_indexed) = quantize_rgb(frame_img, 256);
        let frame = gif::Frame {
            width: w,
            height: h,
            delay: delay_cs,
            palette: Some(local_palette),
            buffer: std::borrow::Cow::Owned(local_indexed),
            ..Default::default()
        };
        encoder
            .write_frame(&frame)
            .map_err(|e| IganError::Encode(format!("GIF frame write error: {}", e)))?;
    }
    Ok(())
}

/// Quantize to indexed color. Returns (flat RGB palette, indices).
fn quantize_rgb(image: &RgbImage, max_colors: usize) -> (Vec<u8>, Vec<u8>) {
    let pixels: Vec<u8> = image
        .pixels()
        .flat_map(|p| [p[0], p[1], p[2], 255])
        .collect();
    let nq = color_quant::NeuQuant::new(10, max_colors, &pixels);

    let mut palette = Vec::with_capacity(max_colors * 3);
    for i in 0..max_colors {
        match nq.lookup(i) {
            Some(color) => palette.extend_from_slice(&color[..3]),
            None => palette.extend_from_slice(&[0, 0, 0]),
        }
    }
    let indices = image
        .pixels()
        .map(|p| nq.index_of(&[p[0], p[1], p[2], 255]) as u8)
        .collect();
    (palette, indices)
}
