
pub mod logging;
pub mod error;
pub mod raster;
pub mod scale;
pub mod mrc;
pub mod star;
pub mod coords;
pub mod ctf;
pub mod config;
pub mod extract;
pub mod records;
pub mod output;
pub mod preview;
pub mod job;
