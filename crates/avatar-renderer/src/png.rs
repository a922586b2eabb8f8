//! Streaming PNG encoding for RGBA image data.
//!
//! Output goes straight to a [`ByteSink`], one PNG chunk per call: the
//! signature, `IHDR`, optional `PLTE`/`tRNS`, `IDAT` chunks of at most
//! [`IDAT_CHUNK_SIZE`] bytes, then `IEND`. The compressed stream is never
//! held in one buffer.
//!
//! Supports two encoding modes:
//! - **Indexed PNG (color type 3)**: used when the image has ≤256 unique
//!   colors. A flat avatar with anti-aliased edges usually qualifies.
//! - **RGBA PNG (color type 6)**: fallback for images with >256 colors.
//!
//! Use [`encode_png_auto`] for automatic mode selection.

use std::collections::{HashMap, HashSet};
use std::io::{self, Write};

use flate2::write::ZlibEncoder;
use flate2::Compression;
use rayon::prelude::*;

use crate::chain::ByteSink;
use crate::error::{RenderError, WriteFailure};

/// The eight-byte PNG file signature.
pub const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Maximum payload of a single `IDAT` chunk.
pub const IDAT_CHUNK_SIZE: usize = 8192;

/// Maximum colors for indexed PNG (PNG8)
const MAX_PALETTE_SIZE: usize = 256;

/// Minimum pixels to benefit from parallel palette extraction
const PARALLEL_THRESHOLD: usize = 4096; // 64x64 or larger

/// Which PNG color type was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Indexed,
    Rgba,
}

/// Summary of one encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PngStats {
    pub mode: ColorMode,
    /// Total bytes passed to the sink.
    pub bytes_written: u64,
    /// Number of sink calls.
    pub chunks: usize,
}

type Palette = Vec<(u8, u8, u8, u8)>;

/// Encode straight (non-premultiplied) RGBA pixels, choosing indexed mode
/// when the image has few enough colors.
///
/// # Arguments
/// - `pixels`: RGBA pixel data (4 bytes per pixel)
/// - `width`, `height`: image dimensions in pixels
/// - `sink`: receives the encoded stream
pub fn encode_png_auto(
    pixels: &[u8],
    width: usize,
    height: usize,
    sink: &mut dyn ByteSink,
) -> Result<PngStats, RenderError> {
    let palette_result = if width * height >= PARALLEL_THRESHOLD {
        extract_palette_parallel(pixels, width)
    } else {
        extract_palette_sequential(pixels)
    };

    match palette_result {
        Some((palette, indices)) => encode_png_indexed(width, height, &palette, &indices, sink),
        None => encode_png_rgba(pixels, width, height, sink),
    }
}

/// Pack RGBA bytes into a u32 for faster hashing and comparison
#[inline(always)]
fn pack_color(r: u8, g: u8, b: u8, a: u8) -> u32 {
    (r as u32) | ((g as u32) << 8) | ((b as u32) << 16) | ((a as u32) << 24)
}

#[inline(always)]
fn unpack_color(packed: u32) -> (u8, u8, u8, u8) {
    (
        packed as u8,
        (packed >> 8) as u8,
        (packed >> 16) as u8,
        (packed >> 24) as u8,
    )
}

/// Palette in first-appearance order, plus one index per pixel.
fn extract_palette_sequential(pixels: &[u8]) -> Option<(Palette, Vec<u8>)> {
    let mut color_to_index: HashMap<u32, u8> = HashMap::with_capacity(MAX_PALETTE_SIZE);
    let mut palette: Palette = Vec::with_capacity(MAX_PALETTE_SIZE);
    let mut indices: Vec<u8> = Vec::with_capacity(pixels.len() / 4);

    for px in pixels.chunks_exact(4) {
        let packed = pack_color(px[0], px[1], px[2], px[3]);
        let index = match color_to_index.get(&packed) {
            Some(&idx) => idx,
            None => {
                if palette.len() >= MAX_PALETTE_SIZE {
                    return None;
                }
                let idx = palette.len() as u8;
                palette.push((px[0], px[1], px[2], px[3]));
                color_to_index.insert(packed, idx);
                idx
            }
        };
        indices.push(index);
    }

    Some((palette, indices))
}

/// Parallel palette extraction for larger images.
///
/// Rows are scanned in parallel for unique colors; the palette is sorted so
/// the output does not depend on thread scheduling; rows are then mapped to
/// indices in parallel.
fn extract_palette_parallel(pixels: &[u8], width: usize) -> Option<(Palette, Vec<u8>)> {
    let row_bytes = width * 4;

    let unique: HashSet<u32> = pixels
        .par_chunks(row_bytes)
        .fold(HashSet::new, |mut local: HashSet<u32>, row| {
            // Once over the limit the result is discarded anyway
            if local.len() <= MAX_PALETTE_SIZE {
                for px in row.chunks_exact(4) {
                    local.insert(pack_color(px[0], px[1], px[2], px[3]));
                }
            }
            local
        })
        .reduce(HashSet::new, |mut a, b| {
            a.extend(b);
            a
        });

    if unique.len() > MAX_PALETTE_SIZE {
        return None;
    }

    let mut sorted: Vec<u32> = unique.into_iter().collect();
    sorted.sort_unstable();
    let color_to_index: HashMap<u32, u8> = sorted
        .iter()
        .enumerate()
        .map(|(i, &packed)| (packed, i as u8))
        .collect();
    let palette: Palette = sorted.iter().map(|&packed| unpack_color(packed)).collect();

    let mut indices = vec![0u8; pixels.len() / 4];
    indices
        .par_chunks_mut(width)
        .zip(pixels.par_chunks(row_bytes))
        .for_each(|(idx_row, px_row)| {
            for (idx, px) in idx_row.iter_mut().zip(px_row.chunks_exact(4)) {
                let packed = pack_color(px[0], px[1], px[2], px[3]);
                *idx = color_to_index.get(&packed).copied().unwrap_or(0);
            }
        });

    Some((palette, indices))
}

/// Sink wrapper that counts bytes and calls.
struct CountingSink<'a> {
    inner: &'a mut dyn ByteSink,
    bytes: u64,
    calls: usize,
}

impl ByteSink for CountingSink<'_> {
    fn ingest(&mut self, chunk: &[u8]) -> Result<(), WriteFailure> {
        self.inner.ingest(chunk)?;
        self.bytes += chunk.len() as u64;
        self.calls += 1;
        Ok(())
    }
}

/// Frames PNG chunks (length, type, data, CRC) and hands each to the sink.
struct ChunkWriter<'a> {
    sink: CountingSink<'a>,
    frame: Vec<u8>,
}

impl<'a> ChunkWriter<'a> {
    fn new(sink: &'a mut dyn ByteSink) -> Result<Self, WriteFailure> {
        let mut sink = CountingSink {
            inner: sink,
            bytes: 0,
            calls: 0,
        };
        sink.ingest(&PNG_SIGNATURE)?;
        Ok(Self {
            sink,
            frame: Vec::with_capacity(IDAT_CHUNK_SIZE + 12),
        })
    }

    fn write_chunk(&mut self, chunk_type: &[u8; 4], data: &[u8]) -> Result<(), WriteFailure> {
        let mut crc = crc32fast::Hasher::new();
        crc.update(chunk_type);
        crc.update(data);

        self.frame.clear();
        self.frame.extend_from_slice(&(data.len() as u32).to_be_bytes());
        self.frame.extend_from_slice(chunk_type);
        self.frame.extend_from_slice(data);
        self.frame.extend_from_slice(&crc.finalize().to_be_bytes());
        self.sink.ingest(&self.frame)
    }

    fn write_ihdr(&mut self, width: usize, height: usize, color_type: u8) -> Result<(), WriteFailure> {
        let mut ihdr = [0u8; 13];
        ihdr[0..4].copy_from_slice(&(width as u32).to_be_bytes());
        ihdr[4..8].copy_from_slice(&(height as u32).to_be_bytes());
        ihdr[8] = 8; // bit depth
        ihdr[9] = color_type;
        // compression, filter and interlace methods stay 0
        self.write_chunk(b"IHDR", &ihdr)
    }

    fn finish(mut self, mode: ColorMode) -> Result<PngStats, WriteFailure> {
        self.write_chunk(b"IEND", &[])?;
        Ok(PngStats {
            mode,
            bytes_written: self.sink.bytes,
            chunks: self.sink.calls,
        })
    }
}

/// `io::Write` adapter that cuts the zlib stream into `IDAT` chunks.
///
/// A sink failure is kept in `failure` so it can be told apart from a
/// compression error after `flate2` has wrapped it in an `io::Error`.
struct IdatWriter<'w, 'a> {
    chunks: &'w mut ChunkWriter<'a>,
    pending: Vec<u8>,
    failure: Option<WriteFailure>,
}

impl<'w, 'a> IdatWriter<'w, 'a> {
    fn new(chunks: &'w mut ChunkWriter<'a>) -> Self {
        Self {
            chunks,
            pending: Vec::with_capacity(IDAT_CHUNK_SIZE),
            failure: None,
        }
    }

    fn emit(&mut self, len: usize) -> io::Result<()> {
        let result = self.chunks.write_chunk(b"IDAT", &self.pending[..len]);
        if let Err(failure) = result {
            self.failure = Some(failure);
            return Err(io::Error::new(io::ErrorKind::Other, "output sink rejected IDAT chunk"));
        }
        self.pending.drain(..len);
        Ok(())
    }

    /// Emit whatever is left as a final, possibly short, `IDAT` chunk.
    fn finish(&mut self) -> io::Result<()> {
        if !self.pending.is_empty() {
            self.emit(self.pending.len())?;
        }
        Ok(())
    }
}

impl Write for IdatWriter<'_, '_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        while self.pending.len() >= IDAT_CHUNK_SIZE {
            self.emit(IDAT_CHUNK_SIZE)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Compress scanlines (filter type 0 + `bytes_per_row` bytes each) into
/// `IDAT` chunks.
fn write_image_data(
    chunks: &mut ChunkWriter<'_>,
    data: &[u8],
    bytes_per_row: usize,
) -> Result<(), RenderError> {
    let mut idat = IdatWriter::new(chunks);
    let result = (|| -> io::Result<()> {
        let mut encoder = ZlibEncoder::new(&mut idat, Compression::fast());
        let mut scanline = Vec::with_capacity(bytes_per_row + 1);
        for row in data.chunks_exact(bytes_per_row) {
            scanline.clear();
            scanline.push(0); // filter type: none
            scanline.extend_from_slice(row);
            encoder.write_all(&scanline)?;
        }
        encoder.finish()?;
        Ok(())
    })();

    let result = result.and_then(|()| idat.finish());
    result.map_err(|e| match idat.failure.take() {
        Some(failure) => RenderError::Write(failure),
        None => RenderError::Compression(e),
    })
}

/// Encode an indexed PNG (color type 3) from a palette and one index byte
/// per pixel.
pub fn encode_png_indexed(
    width: usize,
    height: usize,
    palette: &[(u8, u8, u8, u8)],
    indices: &[u8],
    sink: &mut dyn ByteSink,
) -> Result<PngStats, RenderError> {
    let mut chunks = ChunkWriter::new(sink)?;
    chunks.write_ihdr(width, height, 3)?;

    let plte: Vec<u8> = palette.iter().flat_map(|&(r, g, b, _)| [r, g, b]).collect();
    chunks.write_chunk(b"PLTE", &plte)?;

    // tRNS only if any entry is not fully opaque
    if palette.iter().any(|&(_, _, _, a)| a < 255) {
        let trns: Vec<u8> = palette.iter().map(|&(_, _, _, a)| a).collect();
        chunks.write_chunk(b"tRNS", &trns)?;
    }

    write_image_data(&mut chunks, &indices[..width * height], width)?;
    Ok(chunks.finish(ColorMode::Indexed)?)
}

/// Encode an RGBA PNG (color type 6).
pub fn encode_png_rgba(
    pixels: &[u8],
    width: usize,
    height: usize,
    sink: &mut dyn ByteSink,
) -> Result<PngStats, RenderError> {
    let mut chunks = ChunkWriter::new(sink)?;
    chunks.write_ihdr(width, height, 6)?;
    write_image_data(&mut chunks, &pixels[..width * height * 4], width * 4)?;
    Ok(chunks.finish(ColorMode::Rgba)?)
}

/// Encode into a single `Vec`. Convenient for tests and benchmarks.
pub fn create_png_auto(pixels: &[u8], width: usize, height: usize) -> Result<Vec<u8>, RenderError> {
    let mut png = Vec::new();
    encode_png_auto(pixels, width, height, &mut png)?;
    Ok(png)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_palette_simple() {
        // 4 pixels: red, green, blue, red (3 unique colors)
        let pixels = [
            255, 0, 0, 255, // red
            0, 255, 0, 255, // green
            0, 0, 255, 255, // blue
            255, 0, 0, 255, // red again
        ];

        let (palette, indices) = extract_palette_sequential(&pixels).unwrap();
        assert_eq!(palette.len(), 3);
        assert_eq!(indices.len(), 4);
        assert_eq!(indices[0], indices[3]);
    }

    #[test]
    fn test_parallel_palette_matches_pixels() {
        // 128x128 with ~50 colors, above PARALLEL_THRESHOLD
        let mut pixels = Vec::with_capacity(128 * 128 * 4);
        for y in 0..128usize {
            for x in 0..128usize {
                let c = ((x / 8) + (y / 8)) % 50;
                pixels.extend_from_slice(&[(c * 5) as u8, (100 + c * 3) as u8, (200 - c * 2) as u8, 255]);
            }
        }

        let (palette, indices) = extract_palette_parallel(&pixels, 128).unwrap();
        assert!(palette.len() <= 50);
        assert_eq!(indices.len(), 128 * 128);
        for (i, px) in pixels.chunks_exact(4).enumerate() {
            assert_eq!(palette[indices[i] as usize], (px[0], px[1], px[2], px[3]));
        }
    }

    #[test]
    fn test_too_many_colors_falls_back_to_rgba() {
        let mut pixels = Vec::with_capacity(300 * 4);
        for i in 0..300u32 {
            pixels.extend_from_slice(&[(i % 256) as u8, (i / 256) as u8, 7, 255]);
        }
        assert!(extract_palette_sequential(&pixels).is_none());

        let mut out = Vec::new();
        let stats = encode_png_auto(&pixels, 300, 1, &mut out).unwrap();
        assert_eq!(stats.mode, ColorMode::Rgba);
    }

    #[test]
    fn test_stream_layout() {
        let pixels = [10u8, 20, 30, 255].repeat(4);
        let mut out = Vec::new();
        let stats = encode_png_auto(&pixels, 2, 2, &mut out).unwrap();

        assert_eq!(stats.mode, ColorMode::Indexed);
        assert_eq!(stats.bytes_written, out.len() as u64);
        assert_eq!(&out[..8], &PNG_SIGNATURE);
        assert_eq!(&out[12..16], b"IHDR");
        assert_eq!(&out[out.len() - 8..out.len() - 4], b"IEND");
        // signature, IHDR, PLTE, IDAT, IEND
        assert_eq!(stats.chunks, 5);
    }

    #[test]
    fn test_large_image_splits_idat() {
        // Noise does not compress, so the stream exceeds one IDAT chunk
        let mut state = 0x1234_5678u32;
        let mut pixels = Vec::with_capacity(128 * 128 * 4);
        for _ in 0..128 * 128 {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            let [r, g, b, _] = state.to_le_bytes();
            pixels.extend_from_slice(&[r, g, b, 255]);
        }

        let mut out = Vec::new();
        let stats = encode_png_rgba(&pixels, 128, 128, &mut out).unwrap();
        assert!(stats.chunks > 4);

        let idat_count = out.windows(4).filter(|w| *w == b"IDAT").count();
        assert!(idat_count >= 2);
    }

    #[test]
    fn test_sink_failure_is_reported_as_write_failure() {
        struct FailAfter(usize);
        impl ByteSink for FailAfter {
            fn ingest(&mut self, _chunk: &[u8]) -> Result<(), WriteFailure> {
                if self.0 == 0 {
                    return Err(WriteFailure::Allocation { requested: 1 });
                }
                self.0 -= 1;
                Ok(())
            }
        }

        let pixels = [0u8, 0, 0, 255].repeat(16);
        // Fails on the IDAT chunk (signature, IHDR, PLTE succeed)
        let err = encode_png_auto(&pixels, 4, 4, &mut FailAfter(3)).unwrap_err();
        assert!(err.is_write_failure());
    }
}
