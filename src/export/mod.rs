//! Firmware header export.
//!
//! Renders a [`FoldedModel`](crate::folding::FoldedModel) as a C header that
//! the device includes verbatim:
//!
//! ```c
//! #define LOGI_NUM_CLASSES  4
//! #define LOGI_NUM_FEATURES 18
//! const float LOGI_W[4][18] = { ... };
//! const float LOGI_B[4] = { ... };
//! ```

pub mod header;

pub use header::{render_header, write_header, ExportStage, HeaderSpec};
