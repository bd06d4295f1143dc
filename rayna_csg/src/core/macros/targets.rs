//! String definitions for the log targets used with the [`tracing`] crate,
//! e.g. `warn!(target: SHAPE, ...)`
//!
//! Each target is prefixed with the crate name, so filters like `rayna_csg::solver=trace` work

/// Generates a `pub const` for each target, plus an `ALL` slice containing every target
#[macro_export]
macro_rules! tracing_targets {
    {$( $name:ident $(=$val:expr)? ),* $(,)?} => {
        $( $crate::tracing_targets!(@value $name $(=$val)? ); )*

        /// Every log target defined for this crate
        pub const ALL: &[&str] = &[$($name),*];
    };

    (@value $name:ident = $val:expr) => {pub const $name: &'static str = concat!(env!("CARGO_PKG_NAME"), "::", $val);};
    (@value $name:ident)             => {$crate::tracing_targets!(@value $name = stringify!($name));};
}
