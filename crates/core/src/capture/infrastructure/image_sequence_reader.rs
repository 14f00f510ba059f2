use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::capture::domain::frame_source::{FrameSource, SourceMetadata};
use crate::capture::domain::sample_buffer::{PixelBuffer, PixelFormat, SampleBuffer};
use crate::error::AnalysisError;
use crate::shared::constants::IMAGE_EXTENSIONS;

pub const DEFAULT_FPS: f64 = 30.0;

/// Replays a single image or a directory of images as a capture stream.
///
/// Files are ordered by name and stamped `index / fps`. A file that fails to
/// decode is delivered as an empty sample, the same way a capture source
/// reports a frame without pixels.
pub struct ImageSequenceReader {
    fps: f64,
    paths: Vec<PathBuf>,
}

impl ImageSequenceReader {
    pub fn new(fps: f64) -> Self {
        Self {
            fps,
            paths: Vec::new(),
        }
    }

    fn load(path: &Path) -> SampleBuffer {
        match image::open(path) {
            Ok(img) => {
                let rgba = img.to_rgba8();
                let (w, h) = rgba.dimensions();
                SampleBuffer::new(PixelBuffer::packed(
                    PixelFormat::Rgba8,
                    w,
                    h,
                    rgba.into_raw(),
                ))
            }
            Err(e) => {
                log::debug!("Could not decode {}: {e}", path.display());
                SampleBuffer::empty()
            }
        }
    }
}

impl Default for ImageSequenceReader {
    fn default() -> Self {
        Self::new(DEFAULT_FPS)
    }
}

pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

impl FrameSource for ImageSequenceReader {
    fn open(&mut self, path: &Path) -> Result<SourceMetadata, AnalysisError> {
        if !(self.fps.is_finite() && self.fps > 0.0) {
            return Err(AnalysisError::InvalidConfig(format!(
                "fps must be positive and finite, got {}",
                self.fps
            )));
        }

        self.paths = if path.is_dir() {
            let mut paths: Vec<PathBuf> = fs::read_dir(path)
                .map_err(|e| AnalysisError::io(path, e))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && is_image(p))
                .collect();
            paths.sort();
            paths
        } else if path.is_file() {
            vec![path.to_path_buf()]
        } else {
            return Err(AnalysisError::io(
                path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "no such file or directory"),
            ));
        };

        Ok(SourceMetadata {
            total_samples: self.paths.len(),
            fps: self.fps,
        })
    }

    fn samples(&mut self) -> Box<dyn Iterator<Item = (SampleBuffer, Duration)> + '_> {
        let fps = self.fps;
        Box::new(self.paths.iter().enumerate().map(move |(i, path)| {
            let timestamp = Duration::from_secs_f64(i as f64 / fps);
            (Self::load(path), timestamp)
        }))
    }

    fn close(&mut self) {
        self.paths.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn write_test_image(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
        let path = dir.join(name);
        let mut img = image::RgbImage::new(width, height);
        for pixel in img.pixels_mut() {
            *pixel = image::Rgb([50, 100, 200]);
        }
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn test_single_image_yields_one_sample() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_image(dir.path(), "a.png", 8, 6);
        let mut reader = ImageSequenceReader::default();
        let meta = reader.open(&path).unwrap();
        assert_eq!(meta.total_samples, 1);

        let samples: Vec<_> = reader.samples().collect();
        assert_eq!(samples.len(), 1);
        let (sample, ts) = &samples[0];
        assert_eq!(*ts, Duration::ZERO);
        let pb = sample.pixel_buffer().unwrap();
        assert_eq!((pb.width, pb.height), (8, 6));
        assert_eq!(pb.format, PixelFormat::Rgba8);
        assert_eq!(&pb.data[0..4], &[50, 100, 200, 255]);
    }

    #[test]
    fn test_directory_is_sorted_and_timestamped() {
        let dir = tempfile::tempdir().unwrap();
        write_test_image(dir.path(), "b.png", 4, 4);
        write_test_image(dir.path(), "a.png", 2, 2);
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut reader = ImageSequenceReader::new(10.0);
        let meta = reader.open(dir.path()).unwrap();
        assert_eq!(meta.total_samples, 2);

        let samples: Vec<_> = reader.samples().collect();
        assert_eq!(samples[0].0.pixel_buffer().unwrap().width, 2);
        assert_eq!(samples[1].0.pixel_buffer().unwrap().width, 4);
        assert_eq!(samples[1].1, Duration::from_millis(100));
    }

    #[test]
    fn test_undecodable_file_becomes_empty_sample() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        fs::write(&path, b"not a png").unwrap();

        let mut reader = ImageSequenceReader::default();
        reader.open(&path).unwrap();
        let samples: Vec<_> = reader.samples().collect();
        assert!(samples[0].0.pixel_buffer().is_none());
    }

    #[test]
    fn test_missing_path_errors() {
        let mut reader = ImageSequenceReader::default();
        assert!(reader.open(Path::new("/nonexistent/frames")).is_err());
    }

    #[rstest]
    #[case::zero(0.0)]
    #[case::negative(-5.0)]
    #[case::nan(f64::NAN)]
    #[case::infinite(f64::INFINITY)]
    fn test_invalid_fps_errors(#[case] fps: f64) {
        let dir = tempfile::tempdir().unwrap();
        let mut reader = ImageSequenceReader::new(fps);
        assert!(matches!(
            reader.open(dir.path()),
            Err(AnalysisError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_close_clears_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_image(dir.path(), "a.png", 2, 2);
        let mut reader = ImageSequenceReader::default();
        reader.open(&path).unwrap();
        reader.close();
        assert_eq!(reader.samples().count(), 0);
    }
}
