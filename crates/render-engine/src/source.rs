//! Frame sources: decoders for single segments and the capture-handle cache.

use std::collections::HashMap;
use std::io::{BufReader, ErrorKind, Read};
use std::path::PathBuf;
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::Arc;

use image::RgbImage;
use laprender_common::error::{LaprenderError, LaprenderResult};
use laprender_video::{Segment, Video};

/// Decoder over one segment file, addressed by segment-local frame.
pub trait FrameReader: Send {
    /// Position the reader so the next [`read`](Self::read) yields `frame`.
    fn seek(&mut self, frame: i64) -> LaprenderResult<()>;

    /// Decode the next frame. `None` at end of stream.
    fn read(&mut self) -> LaprenderResult<Option<RgbImage>>;
}

/// Opens readers positioned at the first frame of a segment.
pub trait FrameReaderFactory: Send + Sync {
    fn open(&self, segment: &Segment, width: u32, height: u32) -> LaprenderResult<Box<dyn FrameReader>>;
}

/// Reader streaming raw `rgb24` frames out of an `ffmpeg` child process.
///
/// Seeking restarts the process at the frame's timestamp.
pub struct FfmpegFrameReader {
    path: PathBuf,
    fps: f64,
    width: u32,
    height: u32,
    child: Option<Child>,
    stdout: Option<BufReader<ChildStdout>>,
}

impl FfmpegFrameReader {
    pub fn open(segment: &Segment, width: u32, height: u32) -> LaprenderResult<Self> {
        if !segment.path.exists() {
            return Err(LaprenderError::FileNotFound {
                path: segment.path.clone(),
            });
        }
        let mut reader = Self {
            path: segment.path.clone(),
            fps: segment.fps,
            width,
            height,
            child: None,
            stdout: None,
        };
        reader.spawn(0)?;
        Ok(reader)
    }

    fn spawn(&mut self, frame: i64) -> LaprenderResult<()> {
        self.stop();
        let start_secs = if self.fps > 0.0 {
            frame.max(0) as f64 / self.fps
        } else {
            0.0
        };
        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-nostdin", "-ss"])
            .arg(format!("{start_secs:.6}"))
            .arg("-i")
            .arg(&self.path)
            .args(["-an", "-f", "rawvideo", "-pix_fmt", "rgb24", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| LaprenderError::render(format!("Failed to start ffmpeg decoder: {e}")))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| LaprenderError::render("Failed to capture ffmpeg decoder stdout"))?;
        tracing::trace!(path = %self.path.display(), frame, "Decoder started");
        self.stdout = Some(BufReader::with_capacity(self.frame_bytes(), stdout));
        self.child = Some(child);
        Ok(())
    }

    fn stop(&mut self) {
        self.stdout = None;
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }

    fn frame_bytes(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

impl FrameReader for FfmpegFrameReader {
    fn seek(&mut self, frame: i64) -> LaprenderResult<()> {
        self.spawn(frame)
    }

    fn read(&mut self) -> LaprenderResult<Option<RgbImage>> {
        let mut buf = vec![0u8; self.frame_bytes()];
        let Some(stdout) = self.stdout.as_mut() else {
            return Ok(None);
        };
        match stdout.read_exact(&mut buf) {
            Ok(()) => Ok(RgbImage::from_raw(self.width, self.height, buf)),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                self.stop();
                Ok(None)
            }
            Err(e) => Err(LaprenderError::video(format!(
                "Failed reading frames from {}: {e}",
                self.path.display()
            ))),
        }
    }
}

impl Drop for FfmpegFrameReader {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Factory for [`FfmpegFrameReader`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct FfmpegReaderFactory;

impl FrameReaderFactory for FfmpegReaderFactory {
    fn open(&self, segment: &Segment, width: u32, height: u32) -> LaprenderResult<Box<dyn FrameReader>> {
        Ok(Box::new(FfmpegFrameReader::open(segment, width, height)?))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CaptureKey {
    video: String,
    segment: usize,
    slot: usize,
}

struct CaptureHandle {
    reader: Box<dyn FrameReader>,
    /// Segment-local frame the next read returns.
    next_frame: i64,
}

/// Open segment readers keyed by `(video, segment, slot)`.
///
/// Each handle remembers where it is, so reading the frame right after the
/// previous one never seeks. A cache belongs to one render and is not
/// shared between concurrent renders.
pub struct CaptureCache {
    factory: Arc<dyn FrameReaderFactory>,
    handles: HashMap<CaptureKey, CaptureHandle>,
    seeks: u64,
}

impl CaptureCache {
    pub fn new(factory: Arc<dyn FrameReaderFactory>) -> Self {
        Self {
            factory,
            handles: HashMap::new(),
            seeks: 0,
        }
    }

    /// Read virtual frame `frame` of `video` through handle `slot`.
    ///
    /// `None` when the frame is outside the video or the decoder ran dry.
    pub fn read_frame(&mut self, video: &Video, frame: i64, slot: usize) -> LaprenderResult<Option<RgbImage>> {
        let Some((segment_index, local)) = video.segment_local_frame(frame) else {
            return Ok(None);
        };
        let Some(segment) = video.segment(segment_index) else {
            return Ok(None);
        };
        let key = CaptureKey {
            video: video.primary_filename(),
            segment: segment_index,
            slot,
        };

        let handle = match self.handles.entry(key) {
            std::collections::hash_map::Entry::Occupied(entry) => entry.into_mut(),
            std::collections::hash_map::Entry::Vacant(entry) => {
                let reader = self.factory.open(segment, video.width(), video.height())?;
                tracing::debug!(path = %segment.path.display(), slot, "Opened capture handle");
                entry.insert(CaptureHandle {
                    reader,
                    next_frame: 0,
                })
            }
        };

        if handle.next_frame != local {
            handle.reader.seek(local)?;
            self.seeks += 1;
        }
        let image = handle.reader.read()?;
        handle.next_frame = if image.is_some() { local + 1 } else { -1 };
        Ok(image)
    }

    /// Seeks issued so far.
    pub fn seeks(&self) -> u64 {
        self.seeks
    }

    /// Number of open handles.
    pub fn open_handles(&self) -> usize {
        self.handles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use laprender_video::ProbeInfo;
    use std::sync::Mutex;

    /// Reader producing 4x2 frames whose first pixel encodes the frame number.
    struct CountingReader {
        position: i64,
        frames: i64,
    }

    impl FrameReader for CountingReader {
        fn seek(&mut self, frame: i64) -> LaprenderResult<()> {
            self.position = frame;
            Ok(())
        }

        fn read(&mut self) -> LaprenderResult<Option<RgbImage>> {
            if self.position >= self.frames {
                return Ok(None);
            }
            let value = (self.position % 256) as u8;
            self.position += 1;
            Ok(Some(RgbImage::from_pixel(4, 2, image::Rgb([value, 0, 0]))))
        }
    }

    #[derive(Default)]
    struct CountingFactory {
        opened: Mutex<Vec<PathBuf>>,
    }

    impl FrameReaderFactory for CountingFactory {
        fn open(&self, segment: &Segment, _w: u32, _h: u32) -> LaprenderResult<Box<dyn FrameReader>> {
            self.opened.lock().unwrap().push(segment.path.clone());
            Ok(Box::new(CountingReader {
                position: 0,
                frames: segment.frame_count as i64,
            }))
        }
    }

    fn two_segment_video() -> Video {
        let t0 = NaiveDate::from_ymd_opt(2016, 1, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let probe = |name: &str, frames: u64, start: i64| ProbeInfo {
            path: PathBuf::from(name),
            fps: 30.0,
            frame_count: frames,
            width: 4,
            height: 2,
            duration_secs: frames as f64 / 30.0,
            creation_time: t0 + chrono::Duration::seconds(start),
            has_audio: false,
        };
        Video::from_probes(vec![probe("GOPR0001.MP4", 100, 0), probe("GP010001.MP4", 50, 4)]).unwrap()
    }

    #[test]
    fn test_sequential_reads_do_not_seek() {
        let factory = Arc::new(CountingFactory::default());
        let mut cache = CaptureCache::new(factory.clone());
        let video = two_segment_video();

        for frame in 0..10 {
            let image = cache.read_frame(&video, frame, 0).unwrap().unwrap();
            assert_eq!(image.get_pixel(0, 0)[0], frame as u8);
        }
        assert_eq!(cache.seeks(), 0);

        cache.read_frame(&video, 50, 0).unwrap();
        cache.read_frame(&video, 51, 0).unwrap();
        assert_eq!(cache.seeks(), 1);
    }

    #[test]
    fn test_handles_per_segment_and_slot() {
        let factory = Arc::new(CountingFactory::default());
        let mut cache = CaptureCache::new(factory.clone());
        let video = two_segment_video();

        let image = cache.read_frame(&video, 100, 0).unwrap().unwrap();
        assert_eq!(image.get_pixel(0, 0)[0], 0);
        cache.read_frame(&video, 99, 0).unwrap();
        cache.read_frame(&video, 99, 1).unwrap();
        assert_eq!(cache.open_handles(), 3);
        assert_eq!(factory.opened.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_out_of_range_frames_are_none() {
        let mut cache = CaptureCache::new(Arc::new(CountingFactory::default()));
        let video = two_segment_video();
        assert!(cache.read_frame(&video, 150, 0).unwrap().is_none());
        assert!(cache.read_frame(&video, -1, 0).unwrap().is_none());
        assert_eq!(cache.open_handles(), 0);
    }

    #[test]
    fn test_stopped_decoder_reads_nothing() {
        let mut reader = FfmpegFrameReader {
            path: PathBuf::from("GOPR0001.MP4"),
            fps: 30.0,
            width: 4,
            height: 2,
            child: None,
            stdout: None,
        };
        assert!(reader.read().unwrap().is_none());
        assert!(reader.read().unwrap().is_none());
    }

    #[test]
    fn test_missing_file_is_not_opened() {
        let video = two_segment_video();
        let segment = video.segment(0).unwrap();
        match FfmpegFrameReader::open(segment, 4, 2) {
            Err(LaprenderError::FileNotFound { path }) => assert_eq!(path, segment.path),
            other => panic!("expected FileNotFound, got {:?}", other.map(|_| ())),
        }
    }
}
