pub mod frame_buffer;
pub mod frame_source;
