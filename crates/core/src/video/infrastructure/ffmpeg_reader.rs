use std::path::Path;

use ffmpeg_next::format::context::Input;
use ffmpeg_next::format::Pixel;
use ffmpeg_next::software::scaling;
use ffmpeg_next::util::frame::video::Video as AvFrame;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::{FrameResult, VideoReader};

/// Decodes the best video stream of any container ffmpeg understands into
/// RGB24 [`Frame`]s, lazily and in presentation order.
///
/// Display-matrix rotation is not applied; frames come out as stored.
pub struct FfmpegReader {
    input: Option<Input>,
    stream_index: usize,
}

// Safety: the reader is moved between threads but never shared; the raw
// ffmpeg pointers it owns are only touched through `&mut self`.
unsafe impl Send for FfmpegReader {}

impl FfmpegReader {
    pub fn new() -> Self {
        Self {
            input: None,
            stream_index: 0,
        }
    }
}

impl Default for FfmpegReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Frames per second from a stream rate, 0.0 when unknown.
fn rate_to_fps(rate: ffmpeg_next::Rational) -> f64 {
    if rate.numerator() > 0 && rate.denominator() > 0 {
        rate.numerator() as f64 / rate.denominator() as f64
    } else {
        0.0
    }
}

fn open_decoder(
    input: &Input,
    stream_index: usize,
) -> Result<ffmpeg_next::decoder::Video, Box<dyn std::error::Error>> {
    let stream = input
        .stream(stream_index)
        .ok_or("Video stream index out of range")?;
    let context = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
    Ok(context.decoder().video()?)
}

impl VideoReader for FfmpegReader {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;
        let input = ffmpeg_next::format::input(path)?;

        let (stream_index, fps, total_frames) = {
            let stream = input
                .streams()
                .best(ffmpeg_next::media::Type::Video)
                .ok_or("No video stream found")?;
            // Containers disagree on which rate field they fill in
            let fps = match rate_to_fps(stream.avg_frame_rate()) {
                fps if fps > 0.0 => fps,
                _ => rate_to_fps(stream.rate()),
            };
            (stream.index(), fps, stream.frames().max(0) as usize)
        };
        let decoder = open_decoder(&input, stream_index)?;

        let metadata = VideoMetadata {
            width: decoder.width(),
            height: decoder.height(),
            fps,
            total_frames,
            codec: decoder
                .codec()
                .map(|c| c.name().to_string())
                .unwrap_or_default(),
            source_path: Some(path.to_path_buf()),
        };
        log::debug!(
            "Opened {}: {} {}x{} @ {:.3} fps, {} frames",
            path.display(),
            metadata.codec,
            metadata.width,
            metadata.height,
            metadata.fps,
            metadata.total_frames
        );

        self.stream_index = stream_index;
        self.input = Some(input);
        Ok(metadata)
    }

    fn frames(&mut self) -> Box<dyn Iterator<Item = FrameResult> + '_> {
        let stream_index = self.stream_index;
        let Some(input) = self.input.as_mut() else {
            return Box::new(std::iter::once(Err("FfmpegReader: not opened".into())));
        };
        match FrameDecoder::new(input, stream_index) {
            Ok(decoder) => Box::new(decoder),
            Err(e) => Box::new(std::iter::once(Err(e))),
        }
    }

    fn close(&mut self) {
        self.input = None;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DecodeState {
    /// Feeding packets from the container.
    Reading,
    /// Container exhausted; pulling frames still buffered in the codec.
    Draining,
    Finished,
}

/// Pull-based decode loop: one packet in, zero or more frames out.
struct FrameDecoder<'a> {
    input: &'a mut Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: scaling::Context,
    stream_index: usize,
    next_index: usize,
    state: DecodeState,
}

impl<'a> FrameDecoder<'a> {
    fn new(input: &'a mut Input, stream_index: usize) -> Result<Self, Box<dyn std::error::Error>> {
        let decoder = open_decoder(input, stream_index)?;
        let scaler = scaling::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            scaling::Flags::BILINEAR,
        )?;
        Ok(Self {
            input,
            decoder,
            scaler,
            stream_index,
            next_index: 0,
            state: DecodeState::Reading,
        })
    }

    /// One decoded frame converted to RGB, if the codec has one ready.
    fn pull(&mut self) -> Option<FrameResult> {
        let mut decoded = AvFrame::empty();
        self.decoder.receive_frame(&mut decoded).ok()?;

        let mut rgb = AvFrame::empty();
        if let Err(e) = self.scaler.run(&decoded, &mut rgb) {
            self.state = DecodeState::Finished;
            return Some(Err(e.into()));
        }
        let frame = Frame::new(
            packed_rgb(&rgb),
            rgb.width(),
            rgb.height(),
            3,
            self.next_index,
        );
        self.next_index += 1;
        Some(Ok(frame))
    }

    /// Sends the next packet of our stream; `false` once the container is exhausted.
    fn feed(&mut self) -> bool {
        for (stream, packet) in self.input.packets() {
            if stream.index() != self.stream_index {
                continue;
            }
            // Corrupt packets are skipped; the decoder resyncs on the next keyframe
            match self.decoder.send_packet(&packet) {
                Ok(()) => return true,
                Err(e) => log::debug!("Skipping undecodable packet: {e}"),
            }
        }
        false
    }
}

impl Iterator for FrameDecoder<'_> {
    type Item = FrameResult;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.state {
                DecodeState::Finished => return None,
                DecodeState::Draining => {
                    let frame = self.pull();
                    if frame.is_none() {
                        self.state = DecodeState::Finished;
                    }
                    return frame;
                }
                DecodeState::Reading => {
                    if let Some(frame) = self.pull() {
                        return Some(frame);
                    }
                    if !self.feed() {
                        if let Err(e) = self.decoder.send_eof() {
                            log::debug!("Decoder rejected EOF: {e}");
                        }
                        self.state = DecodeState::Draining;
                    }
                }
            }
        }
    }
}

/// Copies plane 0 into a tightly packed buffer, dropping per-row stride padding.
fn packed_rgb(rgb: &AvFrame) -> Vec<u8> {
    let row_bytes = rgb.width() as usize * 3;
    let stride = rgb.stride(0);
    rgb.data(0)
        .chunks(stride)
        .take(rgb.height() as usize)
        .flat_map(|row| &row[..row_bytes])
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ffmpeg_next::{codec, encoder, Packet, Rational};
    use tempfile::TempDir;

    /// Writes an MPEG-4 clip of flat grey frames whose brightness steps per frame.
    fn write_clip(path: &Path, frames: usize, width: u32, height: u32, fps: i32) {
        ffmpeg_next::init().unwrap();
        let mut octx = ffmpeg_next::format::output(path).unwrap();
        let needs_global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let mpeg4 = encoder::find(codec::Id::MPEG4).unwrap();
        let mut stream = octx.add_stream(Some(mpeg4)).unwrap();
        let mut enc = codec::context::Context::new_with_codec(mpeg4)
            .encoder()
            .video()
            .unwrap();
        enc.set_width(width);
        enc.set_height(height);
        enc.set_format(Pixel::YUV420P);
        enc.set_time_base(Rational(1, fps));
        enc.set_frame_rate(Some(Rational(fps, 1)));
        if needs_global_header {
            enc.set_flags(codec::Flags::GLOBAL_HEADER);
        }
        let mut enc = enc.open_with(ffmpeg_next::Dictionary::new()).unwrap();
        stream.set_parameters(&enc);
        octx.write_header().unwrap();
        let out_tb = octx.stream(0).unwrap().time_base();

        let mut to_yuv = scaling::Context::get(
            Pixel::RGB24,
            width,
            height,
            Pixel::YUV420P,
            width,
            height,
            scaling::Flags::BILINEAR,
        )
        .unwrap();

        let drain = |enc: &mut encoder::Video, octx: &mut ffmpeg_next::format::context::Output| {
            let mut packet = Packet::empty();
            while enc.receive_packet(&mut packet).is_ok() {
                packet.set_stream(0);
                packet.rescale_ts(Rational(1, fps), out_tb);
                packet.write_interleaved(octx).unwrap();
            }
        };

        for i in 0..frames {
            let mut rgb = AvFrame::new(Pixel::RGB24, width, height);
            let level = (i * 40 % 256) as u8;
            rgb.data_mut(0).fill(level);
            let mut yuv = AvFrame::empty();
            to_yuv.run(&rgb, &mut yuv).unwrap();
            yuv.set_pts(Some(i as i64));
            enc.send_frame(&yuv).unwrap();
            drain(&mut enc, &mut octx);
        }
        enc.send_eof().unwrap();
        drain(&mut enc, &mut octx);
        octx.write_trailer().unwrap();
    }

    fn clip(frames: usize, fps: i32) -> (TempDir, std::path::PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("clip.mp4");
        write_clip(&path, frames, 160, 120, fps);
        (dir, path)
    }

    #[test]
    fn test_open_reports_geometry_and_source() {
        let (_dir, path) = clip(5, 30);
        let mut reader = FfmpegReader::new();
        let meta = reader.open(&path).unwrap();
        assert_eq!((meta.width, meta.height), (160, 120));
        assert!(meta.has_known_fps());
        assert_eq!(meta.source_path, Some(path));
    }

    #[test]
    fn test_decodes_every_frame_in_order() {
        let (_dir, path) = clip(5, 30);
        let mut reader = FfmpegReader::new();
        reader.open(&path).unwrap();

        let frames: Vec<Frame> = reader.frames().map(|f| f.unwrap()).collect();
        assert_eq!(frames.len(), 5);
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(frame.index(), i);
            assert_eq!(frame.channels(), 3);
            assert_eq!(frame.data().len(), 160 * 120 * 3);
        }
    }

    #[test]
    fn test_timestamps_follow_frame_rate() {
        let (_dir, path) = clip(3, 25);
        let mut reader = FfmpegReader::new();
        let meta = reader.open(&path).unwrap();
        assert!((meta.fps - 25.0).abs() < 0.01);
        assert!((meta.timestamp_of(2) - 0.08).abs() < 1e-3);
    }

    #[test]
    fn test_missing_file_fails_to_open() {
        let mut reader = FfmpegReader::new();
        assert!(reader.open(Path::new("/nonexistent/clip.mp4")).is_err());
    }

    #[test]
    fn test_frames_before_open_or_after_close_is_an_error() {
        let mut reader = FfmpegReader::new();
        assert!(reader.frames().next().unwrap().is_err());

        let (_dir, path) = clip(1, 30);
        reader.open(&path).unwrap();
        reader.close();
        reader.close();
        assert!(reader.frames().next().unwrap().is_err());
    }

    #[test]
    fn test_rate_to_fps() {
        assert_eq!(rate_to_fps(Rational(30000, 1001)), 30000.0 / 1001.0);
        assert_eq!(rate_to_fps(Rational(0, 1)), 0.0);
        assert_eq!(rate_to_fps(Rational(30, 0)), 0.0);
    }
}
