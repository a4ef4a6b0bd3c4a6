pub mod preview;
pub mod sink;
