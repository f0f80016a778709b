//! Commands exposed to the chat frontend.
//!
//! Each command takes the shared state it needs by reference and reports
//! failures as display strings, ready to show in an alert or status line.

pub mod compression;

pub use compression::{
    compression_preview, confirm_compression, open_compression_dialog, set_compression_level,
    CompressionDialogInfo, CompressionReport,
};
