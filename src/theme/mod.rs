pub mod applier;
pub mod browsers;
pub mod colors;
pub mod css;
pub mod surface;
