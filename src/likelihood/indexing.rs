//! Multipole and bin index conventions.
//!
//! The ACTPol data products are 1-based: window column `k` belongs to
//! multipole `ℓ = k + 1` and window row `r` belongs to bin number `b = r + 1`.
//! Every conversion from a physical multipole or bin number to an array
//! offset in this crate goes through the functions below.
//!
//! - Window matrices carry a prepended zero column at index 0 (`ℓ = 1`), which
//!   never enters the convolution.
//! - Input spectra start at `ℓ = 2`, i.e. array index 1 of the working
//!   spectrum.

/// First multipole present in the input spectra.
pub const ELL_MIN: usize = 2;

/// Array offset of multipole `ell` in a working spectrum or window row.
///
/// `ell` must be `>= 1`; offsets are `ell - 1`.
#[inline]
pub fn ell_to_index(ell: usize) -> usize {
    debug_assert!(ell >= 1, "multipoles start at 1");
    ell - 1
}

/// Multipole stored at array offset `index`; inverse of [`ell_to_index`].
#[inline]
pub fn index_to_ell(index: usize) -> usize {
    index + 1
}

/// Array offset of a 1-based bin number (window row).
#[inline]
pub fn bin_to_index(bin: usize) -> usize {
    debug_assert!(bin >= 1, "bin numbers start at 1");
    bin - 1
}
