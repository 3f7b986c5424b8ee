//! Config infrastructure module

mod xdg;

pub use xdg::{XdgConfigStore, CONFIG_PATH_ENV};
