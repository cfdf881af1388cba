/// Compatibility layer for rayon/sequential execution.
///
/// With the `parallel` feature enabled this re-exports rayon's parallel
/// iterators. Without it (single-threaded or WASM targets), a sequential
/// stand-in provides the same method names, so the per-pixel loops in the
/// pipeline compile unchanged either way.
#[cfg(feature = "parallel")]
pub use rayon::prelude::*;

#[cfg(not(feature = "parallel"))]
mod sequential {
    /// Sequential stand-in for `rayon::prelude::IntoParallelIterator`.
    ///
    /// `into_par_iter()` simply calls `into_iter()`, so the rest of the
    /// chain (`.flat_map()`, `.collect()`, ...) resolves to the standard
    /// `Iterator` methods.
    pub trait IntoParallelIterator {
        type Iter;
        type Item;
        fn into_par_iter(self) -> Self::Iter;
    }

    impl<I: IntoIterator> IntoParallelIterator for I {
        type Iter = I::IntoIter;
        type Item = I::Item;
        fn into_par_iter(self) -> Self::Iter {
            self.into_iter()
        }
    }
}

#[cfg(not(feature = "parallel"))]
pub use sequential::*;
