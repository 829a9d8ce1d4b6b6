pub mod errors;
pub mod subscription;
