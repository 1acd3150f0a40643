pub mod geometry;
pub mod joint;
pub mod link;
pub mod material;
pub mod visual;
