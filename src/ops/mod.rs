pub mod colorspace;
pub mod stroke;
pub mod transform;
