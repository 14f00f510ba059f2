pub mod frame_source;
pub mod sample_buffer;
