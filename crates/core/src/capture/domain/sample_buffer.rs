use std::time::Duration;

use crate::shared::frame::Frame;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    Gray8,
    Rgb8,
    Rgba8,
    Bgra8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Gray8 => 1,
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 | PixelFormat::Bgra8 => 4,
        }
    }
}

/// Raw pixels as delivered by a capture source; rows may be padded.
#[derive(Clone, Debug)]
pub struct PixelBuffer {
    pub format: PixelFormat,
    pub width: u32,
    pub height: u32,
    /// Bytes per row, including padding.
    pub stride: usize,
    pub data: Vec<u8>,
}

impl PixelBuffer {
    /// Tightly packed buffer (`stride == width * bytes_per_pixel`).
    pub fn packed(format: PixelFormat, width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            format,
            width,
            height,
            stride: width as usize * format.bytes_per_pixel(),
            data,
        }
    }

    /// Converts to an RGB [`Frame`], dropping row padding and alpha.
    ///
    /// Returns `None` when the buffer cannot back an image: zero dimensions,
    /// a stride shorter than one row, sizes that overflow, or too little data
    /// for `stride * (height - 1)` plus one unpadded last row.
    pub fn to_frame(&self, timestamp: Duration) -> Option<Frame> {
        if self.width == 0 || self.height == 0 {
            return None;
        }
        let bpp = self.format.bytes_per_pixel();
        let row_bytes = (self.width as usize).checked_mul(bpp)?;
        if self.stride < row_bytes {
            return None;
        }
        let required = self
            .stride
            .checked_mul(self.height as usize - 1)?
            .checked_add(row_bytes)?;
        if self.data.len() < required {
            return None;
        }
        let rgb_len = (self.width as usize)
            .checked_mul(self.height as usize)?
            .checked_mul(3)?;

        let mut rgb = Vec::with_capacity(rgb_len);
        for row in 0..self.height as usize {
            let start = row * self.stride;
            let line = self.data.get(start..start + row_bytes)?;
            for px in line.chunks_exact(bpp) {
                match self.format {
                    PixelFormat::Gray8 => rgb.extend_from_slice(&[px[0], px[0], px[0]]),
                    PixelFormat::Rgb8 | PixelFormat::Rgba8 => rgb.extend_from_slice(&px[..3]),
                    PixelFormat::Bgra8 => rgb.extend_from_slice(&[px[2], px[1], px[0]]),
                }
            }
        }
        Some(Frame::new(rgb, self.width, self.height, 3, timestamp))
    }
}

/// One captured sample. The pixel buffer is absent when the source could not
/// provide decodable pixels.
#[derive(Clone, Debug, Default)]
pub struct SampleBuffer {
    pixel_buffer: Option<PixelBuffer>,
}

impl SampleBuffer {
    pub fn new(pixel_buffer: PixelBuffer) -> Self {
        Self {
            pixel_buffer: Some(pixel_buffer),
        }
    }

    pub fn empty() -> Self {
        Self { pixel_buffer: None }
    }

    pub fn pixel_buffer(&self) -> Option<&PixelBuffer> {
        self.pixel_buffer.as_ref()
    }
}
