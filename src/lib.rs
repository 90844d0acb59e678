//! allbot - GroupMe bot that mentions everyone in a group, minus a blacklist

pub mod domain;
pub mod application;
pub mod infrastructure;
