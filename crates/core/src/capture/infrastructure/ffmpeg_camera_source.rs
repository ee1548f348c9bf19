use ffmpeg_next::format::context::{Context as FormatContext, Input};
use ffmpeg_next::software::scaling;
use ffmpeg_next::util::frame::video::Video;

use crate::capture::domain::frame_source::{FrameSource, OpenError, ReadError, SourceInfo};
use crate::shared::frame::Frame;

/// libavdevice demuxer for Video4Linux2 cameras.
const V4L2_FORMAT: &str = "video4linux2";

/// Captures frames from a camera (or any ffmpeg-readable input) via
/// ffmpeg-next, converting each decoded frame to RGB24.
///
/// `/dev/video*` paths are opened through the v4l2 input device; anything
/// else is handed to ffmpeg's regular demuxers, so a video file can stand in
/// for a camera and reports end of stream when it is exhausted.
pub struct FfmpegCameraSource {
    device: String,
    input_ctx: Option<Input>,
    decoder: Option<ffmpeg_next::decoder::Video>,
    scaler: Option<scaling::Context>,
    video_stream_index: usize,
    width: u32,
    height: u32,
    frame_index: usize,
    flushing: bool,
}

// Safety: the source is opened on one thread, then moved into the
// acquisition thread and used only there. The raw pointers inside ffmpeg
// types are never shared.
unsafe impl Send for FfmpegCameraSource {}

impl FfmpegCameraSource {
    /// `device` is a path, a URL, or a bare camera index (`"0"` → `/dev/video0`).
    pub fn new(device: &str) -> Self {
        Self {
            device: resolve_device(device),
            input_ctx: None,
            decoder: None,
            scaler: None,
            video_stream_index: 0,
            width: 0,
            height: 0,
            frame_index: 0,
            flushing: false,
        }
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    fn open_input(&self) -> Result<Input, ffmpeg_next::Error> {
        if self.device.starts_with("/dev/video") {
            let v4l2 = ffmpeg_next::device::input::video().find(|f| f.name() == V4L2_FORMAT);
            if let Some(format) = v4l2 {
                let options = ffmpeg_next::Dictionary::new();
                return match ffmpeg_next::format::open_with(&self.device, &format, options)? {
                    FormatContext::Input(input) => Ok(input),
                    FormatContext::Output(_) => Err(ffmpeg_next::Error::InvalidData),
                };
            }
            log::debug!("{V4L2_FORMAT} input device unavailable, probing {}", self.device);
        }
        ffmpeg_next::format::input(&self.device)
    }
}

/// Maps a bare camera index to its device node; other inputs pass through.
pub fn resolve_device(device: &str) -> String {
    match device.trim().parse::<u32>() {
        Ok(index) => format!("/dev/video{index}"),
        Err(_) => device.to_string(),
    }
}

impl FrameSource for FfmpegCameraSource {
    fn open(&mut self) -> Result<SourceInfo, OpenError> {
        let fail = |reason: String| OpenError {
            device: self.device.clone(),
            reason,
        };

        ffmpeg_next::init().map_err(|e| fail(e.to_string()))?;
        ffmpeg_next::device::register_all();

        let ictx = self.open_input().map_err(|e| fail(e.to_string()))?;
        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or_else(|| fail("no video stream found".to_string()))?;

        let video_stream_index = stream.index();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
            .map_err(|e| fail(e.to_string()))?;
        let decoder = codec_ctx
            .decoder()
            .video()
            .map_err(|e| fail(e.to_string()))?;

        let width = decoder.width();
        let height = decoder.height();
        if width == 0 || height == 0 {
            return Err(fail("device reported an empty frame size".to_string()));
        }

        let rate = stream.avg_frame_rate();
        let fps = if rate.denominator() != 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            0.0
        };

        let scaler = scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            scaling::Flags::BILINEAR,
        )
        .map_err(|e| fail(e.to_string()))?;

        let info = SourceInfo {
            device: self.device.clone(),
            width,
            height,
            fps,
        };

        self.video_stream_index = video_stream_index;
        self.width = width;
        self.height = height;
        self.frame_index = 0;
        self.flushing = false;
        self.decoder = Some(decoder);
        self.scaler = Some(scaler);
        self.input_ctx = Some(ictx);

        log::info!(
            "Opened {} ({}x{} @ {:.1} fps)",
            info.device,
            info.width,
            info.height,
            info.fps
        );
        Ok(info)
    }

    fn read_next(&mut self) -> Result<Frame, ReadError> {
        let (Some(ictx), Some(decoder), Some(scaler)) = (
            self.input_ctx.as_mut(),
            self.decoder.as_mut(),
            self.scaler.as_mut(),
        ) else {
            return Err(ReadError::Failed(format!("{} is not open", self.device)));
        };

        loop {
            if let Some(frame) =
                receive_frame(decoder, scaler, self.width, self.height, self.frame_index)?
            {
                self.frame_index += 1;
                return Ok(frame);
            }

            if self.flushing {
                return Err(ReadError::EndOfStream);
            }

            match ictx.packets().next() {
                Some((stream, packet)) => {
                    if stream.index() != self.video_stream_index {
                        continue;
                    }
                    if let Err(e) = decoder.send_packet(&packet) {
                        log::debug!("Dropping undecodable packet: {e}");
                    }
                }
                None => {
                    let _ = decoder.send_eof();
                    self.flushing = true;
                }
            }
        }
    }

    fn release(&mut self) {
        if self.input_ctx.take().is_some() {
            log::info!("Released {}", self.device);
        }
        self.scaler = None;
        self.decoder = None;
    }
}

fn receive_frame(
    decoder: &mut ffmpeg_next::decoder::Video,
    scaler: &mut scaling::Context,
    width: u32,
    height: u32,
    index: usize,
) -> Result<Option<Frame>, ReadError> {
    let mut decoded = Video::empty();
    if decoder.receive_frame(&mut decoded).is_err() {
        return Ok(None);
    }

    let mut rgb_frame = Video::empty();
    scaler
        .run(&decoded, &mut rgb_frame)
        .map_err(|e| ReadError::Failed(e.to_string()))?;

    let pixels = extract_rgb_pixels(&rgb_frame, width, height);
    Ok(Some(Frame::new(pixels, width, height, 3, index)))
}

/// Copies RGB24 rows out of a (possibly padded) ffmpeg frame.
fn extract_rgb_pixels(rgb_frame: &Video, width: u32, height: u32) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let row_bytes = width as usize * 3;

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        pixels.extend_from_slice(&data[start..start + row_bytes]);
    }
    pixels
}
