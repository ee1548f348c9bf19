//! PNG encoding of face crops for blob storage.

use std::io::Cursor;

use crate::identity::domain::identity_store::StoreError;
use crate::shared::frame::Frame;

pub fn encode_png(frame: &Frame) -> Result<Vec<u8>, StoreError> {
    let img = image::RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
        .ok_or_else(|| StoreError::Codec("frame data does not match its dimensions".into()))?;

    let mut bytes = Cursor::new(Vec::new());
    img.write_to(&mut bytes, image::ImageFormat::Png)
        .map_err(|e| StoreError::Codec(e.to_string()))?;
    Ok(bytes.into_inner())
}

pub fn decode_png(bytes: &[u8]) -> Result<Frame, StoreError> {
    let img = image::load_from_memory_with_format(bytes, image::ImageFormat::Png)
        .map_err(|e| StoreError::Codec(e.to_string()))?
        .to_rgb8();
    let (width, height) = img.dimensions();
    Ok(Frame::new(img.into_raw(), width, height, 3, 0))
}
