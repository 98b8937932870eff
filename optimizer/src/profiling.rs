//! Profiling support via Tracy.
//!
//! Enabled with the `profiling` Cargo feature:
//!
//! ```bash
//! cargo run --bin split_demo --features profiling
//! ```
//!
//! Welding and splitting are instrumented with spans so a large import can be
//! inspected per mesh in Tracy. When the feature is disabled (the default) all
//! macros compile to no-ops.
//!
//! ```ignore
//! use redlilium_optimizer::profiling::{profile_function, profile_scope};
//!
//! fn weld_everything() {
//!     profile_function!();
//!     {
//!         profile_scope!("weld_pass");
//!         // ...
//!     }
//! }
//! ```

#[cfg(feature = "profiling")]
pub use tracy_client::{self, Client, plot as tracy_plot, span};

/// Create a profiling span that lasts until the end of the enclosing scope.
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! profile_scope {
    ($name:expr) => {
        let _profile_span = $crate::profiling::span!($name);
    };
}

/// Create a profiling span (no-op when profiling disabled).
#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! profile_scope {
    ($name:expr) => {};
}

/// Create a profiling span for the entire function.
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! profile_function {
    () => {
        let _profile_span = $crate::profiling::span!();
    };
}

/// Create a profiling span for function (no-op when profiling disabled).
#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! profile_function {
    () => {};
}

/// Plot a value over time in Tracy.
///
/// ```ignore
/// profile_plot!("welded_vertices", class_count);
/// ```
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! profile_plot {
    ($name:expr, $value:expr) => {
        $crate::profiling::tracy_plot!($name, $value as f64)
    };
}

/// Plot a value (no-op when profiling disabled).
#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! profile_plot {
    ($name:expr, $value:expr) => {
        let _ = $value;
    };
}

/// Send a message to Tracy's message log.
#[macro_export]
#[cfg(feature = "profiling")]
macro_rules! profile_message {
    ($msg:expr) => {
        if let Some(client) = $crate::profiling::Client::running() {
            client.message($msg, 0);
        }
    };
}

/// Send a message (no-op when profiling disabled).
#[macro_export]
#[cfg(not(feature = "profiling"))]
macro_rules! profile_message {
    ($msg:expr) => {};
}

// Re-export macros at module level
pub use profile_function;
pub use profile_message;
pub use profile_plot;
pub use profile_scope;
