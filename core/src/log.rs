//! This is a helper module which reexports all logging macros from the `log`
//! crate. This means that you can simply say:
//!
//! ```
//! use crate::log::*;
//! ```
//!
//! to import all logging macros. `core` never installs a logger itself —
//! that is left to the host, exactly like the `Peripherals` it also has to
//! provide.

pub use log::{log, trace, debug, info, warn, error};
