//! Multiprecision modular arithmetic over chained limb blocks.
//!
//! A [`Big`] is a fixed size block of reduced radix digits, a [`DoubleWidth`] holds a product
//! of two blocks and [`FfValue`] chains any number of blocks into a finite field value with
//! Karatsuba multiplication, Montgomery reduction, exponentiation and a Miller-Rabin test.

// Must come first, it provides macros to the other modules.
mod test_helpers;

mod big_impl;
mod dbig_impl;
mod exp_impl;
mod ff_impl;
pub mod hexstr;
mod invmod_impl;
mod karatsuba_impl;
mod limb;
mod montgomery_impl;
mod prime_impl;
mod unnormalized;

pub use limb::{LimbChoice, LimbType};

pub use unnormalized::{Normalize, Unnormalized};

pub use big_impl::{Big, BASEBITS, BIGBITS, BMASK, DNLEN, MODBYTES, NLEN};

pub use dbig_impl::{DoubleWidth, DoubleWidthError};

pub use ff_impl::{FfError, FfValue};

pub use prime_impl::is_probable_prime;
