pub mod bounding_box;
pub mod constants;
pub mod frame;
pub mod frame_error;
pub mod model_resolver;
pub mod pixel_format;
pub mod rotation;
