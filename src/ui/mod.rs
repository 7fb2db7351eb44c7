//! Terminal output for the archivist CLI
//!
//! Spinners and colors in an interactive terminal, plain bracketed lines in
//! CI or when output is piped.
//!
//! # Example
//!
//! ```rust,ignore
//! use archivist::ui::{self, UiContext, TaskSpinner};
//!
//! let ctx = UiContext::detect();
//!
//! let mut spinner = TaskSpinner::new(&ctx);
//! spinner.start("Opening archive...");
//! // ... wait for the loader ...
//! spinner.stop("Archive ready");
//!
//! ui::key_value(&ctx, "Type", "application/zip");
//! ```

mod context;
mod output;
mod progress;

pub use context::UiContext;
pub use output::{intro, key_value, step_info, step_ok_detail, step_warn_hint};
pub use progress::TaskSpinner;
