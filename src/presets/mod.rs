//! Ready-made section setups.

pub mod nice;

pub use nice::{configure_nice, configure_python, nice_section, python_section, NiceParams};
