#![doc = env!("CARGO_PKG_DESCRIPTION")]

#[doc(inline)]
pub use spatio_grid as grid;

#[doc(inline)]
pub use spatio_filter as filter;
