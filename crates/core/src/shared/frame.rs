use ndarray::ArrayView3;

use crate::shared::region::Region;

/// A single captured frame: contiguous RGB bytes in row-major order.
///
/// `index` is the sequence number assigned by the source that produced it.
/// Cloning copies the pixel buffer, so a clone handed to the consumer is
/// independent of the copy held by the frame buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
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
            index,
        }
    }

    /// A frame of the given size with every pixel set to `rgb`.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3], index: usize) -> Self {
        let data = rgb
            .iter()
            .copied()
            .cycle()
            .take((width as usize) * (height as usize) * 3)
            .collect();
        Self::new(data, width, height, 3, index)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
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

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Copies the part of `region` that lies inside the frame.
    ///
    /// Returns `None` when the region does not overlap the frame at all.
    pub fn crop(&self, region: &Region) -> Option<Frame> {
        let clamped = region.clamp_to(self.width, self.height)?;
        let channels = self.channels as usize;
        let fw = self.width as usize;
        let (rx, ry) = (clamped.x as usize, clamped.y as usize);
        let (rw, rh) = (clamped.width as usize, clamped.height as usize);

        let mut data = Vec::with_capacity(rw * rh * channels);
        for row in 0..rh {
            let start = ((ry + row) * fw + rx) * channels;
            data.extend_from_slice(&self.data[start..start + rw * channels]);
        }
        Some(Frame::new(
            data,
            rw as u32,
            rh as u32,
            self.channels,
            self.index,
        ))
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}
