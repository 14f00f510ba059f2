use std::time::Duration;

use ndarray::ArrayView3;

use crate::shared::region::NormalizedRect;

/// A still image handed to the detectors: contiguous bytes in row-major order.
///
/// Produced once per accepted sample by the gatekeeper and discarded after
/// analysis. The timestamp is the capture time the sample arrived with.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    timestamp: Duration,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, timestamp: Duration) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            timestamp,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn timestamp(&self) -> Duration {
        self.timestamp
    }

    /// True when the frame has no backing raster to analyze.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.data.is_empty()
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Pixel rectangle `(x, y, width, height)` covered by a normalized rect,
    /// clamped to the frame bounds.
    pub fn pixel_bounds(&self, rect: &NormalizedRect) -> (u32, u32, u32, u32) {
        let w = self.width as f64;
        let h = self.height as f64;
        let x0 = (rect.x * w).floor().clamp(0.0, w) as u32;
        let y0 = (rect.y * h).floor().clamp(0.0, h) as u32;
        let x1 = ((rect.x + rect.width) * w).ceil().clamp(0.0, w) as u32;
        let y1 = ((rect.y + rect.height) * h).ceil().clamp(0.0, h) as u32;
        (x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0))
    }

    /// Copies the region under `rect` into a new frame with the same timestamp.
    ///
    /// A rect that falls outside the frame yields an empty frame.
    pub fn crop(&self, rect: &NormalizedRect) -> Frame {
        let (x, y, w, h) = self.pixel_bounds(rect);
        let channels = self.channels as usize;
        let row_len = self.width as usize * channels;
        let mut data = Vec::with_capacity(w as usize * h as usize * channels);
        for row in y as usize..(y + h) as usize {
            let start = row * row_len + x as usize * channels;
            data.extend_from_slice(&self.data[start..start + w as usize * channels]);
        }
        Frame::new(data, w, h, self.channels, self.timestamp)
    }

    /// BT.601 luma plane, row-major, one byte per pixel.
    pub fn luma(&self) -> Vec<u8> {
        let arr = self.as_ndarray();
        let mut out = Vec::with_capacity(self.width as usize * self.height as usize);
        for row in arr.outer_iter() {
            for px in row.outer_iter() {
                let value = if self.channels >= 3 {
                    let r = px[0] as u32;
                    let g = px[1] as u32;
                    let b = px[2] as u32;
                    ((77 * r + 150 * g + 29 * b) >> 8) as u8
                } else {
                    px[0]
                };
                out.push(value);
            }
        }
        out
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}
