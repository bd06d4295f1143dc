//! Identifiers for things in the object graph
//!
//! Ids are plain integers, so they are cheap to copy into every [Intersection](crate::shared::intersect::Intersection)
//! and compare.

#[rustfmt::skip] // rustfmt issue #5974
macro_rules! generate_id_token {
    ($(#[$attr:meta])* $token_type:ident) => {
        $(#[$attr])*
        #[derive(
            Debug,
            Copy, Clone,
            Ord, PartialOrd, Eq, PartialEq, Hash,
            valuable::Valuable,
            serde::Serialize, serde::Deserialize,
        )]
        pub struct $token_type(pub $crate::core::types::IdToken);

        impl $token_type {
            /// Generates a new id, unique for this type within the process
            pub fn next() -> Self {
                static NEXT: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(0);
                Self(NEXT.fetch_add(1, std::sync::atomic::Ordering::Relaxed))
            }
        }

        impl std::fmt::Display for $token_type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(
                    f,
                    "{id:>0width$X}",
                    id = self.0,
                    width = $crate::core::types::IdToken::BITS as usize / 4
                )
            }
        }
    };
}

generate_id_token! {
    /// Identifies a single [Object](super::Object). Every object (and every copy of one) gets a fresh id
    ObjectId
}

generate_id_token! {
    /// An opaque reference to a surface description (texture, material, ...) owned by the renderer
    ///
    /// The engine never looks inside; it only reports which one applies to a hit
    SurfaceId
}
