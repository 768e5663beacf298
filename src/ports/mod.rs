pub mod browser;
pub mod youtube;
