pub mod config;
pub mod easing;
pub mod error;
pub mod feed;
pub mod geometry;
pub mod handles;
pub mod item;
pub mod region;
pub mod source;
pub mod sources {
    pub mod folder;
}
pub mod surface;
pub mod tracker;
pub mod tasks {
    pub mod supply;
    pub mod wall;
}
