//! Definitions and arithmetic primitives related to [LimbType], the machine word the limb block
//! digits are stored in.
use core::arch::asm;
use core::convert;
use core::ops;
#[cfg(feature = "zeroize")]
use zeroize::Zeroize;

/// The machine word used for storing the digits of a limb block.
///
/// # Notes
///
/// The following arithmetic on a [`LimbType`] is assumed to be constant-time:
/// - Binary operations: `not`, `or`, `and`, `xor`.
/// - Wrapping addition and subtraction of two [`LimbType`] words.
/// - Multiplication of two [`LimbType`] words where the result also fits
///   a [`LimbType`].
/// - Arithmetic and logical shifts by a public amount.
///
/// Digits only ever occupy the lower [`BASEBITS`](crate::BASEBITS) of a [`LimbType`], the
/// remaining high bits provide the headroom for deferred carries and the sign of unnormalized
/// intermediates.
#[cfg(not(target_arch = "x86_64"))]
pub type LimbType = u32;
#[cfg(target_arch = "x86_64")]
pub type LimbType = u64;

/// The signed counterpart of [`LimbType`], used for propagating negative carries.
#[cfg(not(target_arch = "x86_64"))]
pub type SignedLimbType = i32;
#[cfg(target_arch = "x86_64")]
pub type SignedLimbType = i64;

/// The bit width of a [`LimbType`].
pub const LIMB_BITS: u32 = LimbType::BITS;

/// The bit width of half a [`LimbType`], i.e. a "halfword".
const HALF_LIMB_BITS: u32 = LIMB_BITS / 2;
/// The mask covering a "halfword".
const HALF_LIMB_MASK: LimbType = ct_lsb_mask_l(HALF_LIMB_BITS);

#[cfg(all(feature = "enable_arch_math_asm", target_arch = "x86_64"))]
mod x86_64_math;

// core::hint::black_box() is inefficient: it writes and reads from memory.
#[inline(always)]
pub fn black_box_l(v: LimbType) -> LimbType {
    let result: LimbType;
    unsafe {
        asm!("/* {v} */", v = inout(reg) v => result, options(pure, nomem, nostack));
    }
    result
}

/// A constant-time boolean, represented as an all-zeroes or all-ones mask.
///
/// Conditional moves and swaps on limb block digits are driven by a [`LimbChoice`] instead of a
/// `bool` so that no conditional branch gets emitted on the selector.
#[derive(Clone, Copy, Debug)]
pub struct LimbChoice {
    mask: LimbType,
}

impl LimbChoice {
    pub const fn new(cond: LimbType) -> Self {
        debug_assert!(cond == 0 || cond == 1);
        Self {
            mask: (0 as LimbType).wrapping_sub(cond),
        }
    }

    pub fn unwrap(&self) -> LimbType {
        black_box_l(self.mask & 1)
    }

    pub const fn select(&self, v0: LimbType, v1: LimbType) -> LimbType {
        v0 ^ (self.mask & (v0 ^ v1))
    }

    pub fn select_usize(&self, v0: usize, v1: usize) -> usize {
        let cond = self.unwrap() as usize;
        let mask = (0 as usize).wrapping_sub(cond);
        v0 ^ (mask & (v0 ^ v1))
    }

    /// Exchange `v0` and `v1` if the choice is set, leave them otherwise.
    pub fn swap(&self, v0: &mut LimbType, v1: &mut LimbType) {
        let t = self.mask & (*v0 ^ *v1);
        *v0 ^= t;
        *v1 ^= t;
    }
}

impl convert::From<LimbType> for LimbChoice {
    fn from(value: LimbType) -> Self {
        Self::new(value)
    }
}

impl ops::Not for LimbChoice {
    type Output = Self;

    fn not(self) -> Self::Output {
        Self { mask: !self.mask }
    }
}

impl ops::BitAnd for LimbChoice {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self {
            mask: self.mask & rhs.mask,
        }
    }
}

impl ops::BitAndAssign for LimbChoice {
    fn bitand_assign(&mut self, rhs: Self) {
        self.mask &= rhs.mask
    }
}

impl ops::BitOr for LimbChoice {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self {
            mask: self.mask | rhs.mask,
        }
    }
}

impl ops::BitOrAssign for LimbChoice {
    fn bitor_assign(&mut self, rhs: Self) {
        self.mask |= rhs.mask
    }
}

/// Prerequisite trait for the [`zeroize::DefaultIsZeroes`] marker trait.
#[cfg(feature = "zeroize")]
impl Default for LimbChoice {
    fn default() -> Self {
        Self::from(0)
    }
}

/// Marker trait enabling a generic [`zeroize::Zeroize`] trait implementation.
#[cfg(feature = "zeroize")]
impl zeroize::DefaultIsZeroes for LimbChoice {}

#[test]
fn test_limb_choice_swap() {
    let (mut a, mut b): (LimbType, LimbType) = (0x1234, !0);
    LimbChoice::from(0).swap(&mut a, &mut b);
    assert_eq!((a, b), (0x1234, !0));
    LimbChoice::from(1).swap(&mut a, &mut b);
    assert_eq!((a, b), (!0, 0x1234));
    assert_eq!(LimbChoice::from(1).select(3, 5), 5);
    assert_eq!(LimbChoice::from(0).select(3, 5), 3);
    assert_eq!((!LimbChoice::from(0) & LimbChoice::from(1)).unwrap(), 1);
    assert_eq!(LimbChoice::from(1).select_usize(7, 9), 9);
}

#[allow(unused)]
pub fn generic_ct_is_nonzero_l(v: LimbType) -> LimbType {
    // This trick is from subtle::*::ct_eq():
    // if v is non-zero, then v or -v or both have the high bit set.
    black_box_l((v | v.wrapping_neg()) >> (LIMB_BITS - 1))
}

#[cfg(not(all(feature = "enable_arch_math_asm", target_arch = "x86_64")))]
pub use self::generic_ct_is_nonzero_l as ct_is_nonzero_l;

#[cfg(all(feature = "enable_arch_math_asm", target_arch = "x86_64"))]
pub use x86_64_math::ct_is_nonzero_l;

#[allow(unused)]
pub fn generic_ct_is_zero_l(v: LimbType) -> LimbType {
    (1 as LimbType) ^ ct_is_nonzero_l(v)
}

#[cfg(not(all(feature = "enable_arch_math_asm", target_arch = "x86_64")))]
pub use self::generic_ct_is_zero_l as ct_is_zero_l;

#[cfg(all(feature = "enable_arch_math_asm", target_arch = "x86_64"))]
pub use x86_64_math::ct_is_zero_l;

pub fn ct_eq_l_l(v0: LimbType, v1: LimbType) -> LimbChoice {
    LimbChoice::from(ct_is_zero_l(v0 ^ v1))
}

pub fn ct_neq_l_l(v0: LimbType, v1: LimbType) -> LimbChoice {
    !ct_eq_l_l(v0, v1)
}

pub fn ct_lt_l_l(v0: LimbType, v1: LimbType) -> LimbChoice {
    let (borrow, _) = ct_sub_l_l(v0, v1);
    LimbChoice::from(borrow)
}

pub fn ct_gt_l_l(v0: LimbType, v1: LimbType) -> LimbChoice {
    ct_lt_l_l(v1, v0)
}

#[test]
fn test_ct_cmp_l_l() {
    assert_eq!(ct_eq_l_l(0, 0).unwrap(), 1);
    assert_eq!(ct_eq_l_l(!0, !0).unwrap(), 1);
    assert_eq!(ct_eq_l_l(1, 0).unwrap(), 0);
    assert_eq!(ct_neq_l_l(1, 0).unwrap(), 1);
    assert_eq!(ct_lt_l_l(0, 1).unwrap(), 1);
    assert_eq!(ct_lt_l_l(1, 1).unwrap(), 0);
    assert_eq!(ct_lt_l_l(!0, 1).unwrap(), 0);
    assert_eq!(ct_gt_l_l(!0, 1).unwrap(), 1);
    assert_eq!(ct_gt_l_l(1, 1).unwrap(), 0);
}

pub const fn ct_lsb_mask_l(nbits: u32) -> LimbType {
    debug_assert!(nbits <= LIMB_BITS);
    // The standard way for generating a mask with nbits of the lower bits set is (1 << nbits) -
    // 1. However, for nbits == LIMB_BITS, the right shift would be undefined behaviour. Split nbits
    // into nbits_lo < LIMB_BITS and a nbits_hi == (nbits == LIMB_BITS) components and generate
    // masks for each individually.
    let nbits_lo = nbits % LIMB_BITS;
    let nbits_hi = nbits / LIMB_BITS;
    debug_assert!(nbits_hi <= 1);
    debug_assert!(nbits_hi == 0 || nbits_lo == 0);

    let mask_for_lo = (1 << nbits_lo) - 1;
    let mask_for_hi = (0 as LimbType).wrapping_sub(nbits_hi as LimbType);
    mask_for_lo | mask_for_hi
}

#[test]
fn test_ct_lsb_mask_l() {
    for i in 0..LIMB_BITS {
        let mask = ct_lsb_mask_l(i);
        assert_eq!(mask, (1 << i) - 1);
    }
    assert_eq!(ct_lsb_mask_l(LIMB_BITS), !0);
}

/// Arithmetic right shift of a limb, interpreted in two's complement.
///
/// Used for propagating the (possibly negative) carry out of an unnormalized digit.
///
/// Runs in constant time for a public `rshift`.
pub fn ct_sar_l(v: LimbType, rshift: u32) -> LimbType {
    debug_assert!(rshift < LIMB_BITS);
    black_box_l(((v as SignedLimbType) >> rshift) as LimbType)
}

#[test]
fn test_ct_sar_l() {
    assert_eq!(ct_sar_l(ct_lsb_mask_l(LIMB_BITS - 1), 0), ct_lsb_mask_l(LIMB_BITS - 1));
    assert_eq!(ct_sar_l(ct_lsb_mask_l(LIMB_BITS - 1), LIMB_BITS - 2), 1);
    assert_eq!(ct_sar_l(ct_lsb_mask_l(LIMB_BITS - 1), LIMB_BITS - 1), 0);
    assert_eq!(ct_sar_l(!0 ^ 1, 0), !0 ^ 1);
    assert_eq!(ct_sar_l(!0 ^ 1, LIMB_BITS - 2), !0);
    assert_eq!(ct_sar_l(!0 ^ 1, LIMB_BITS - 1), !0);
    // -2^8 >> 4 == -2^4
    assert_eq!(ct_sar_l((0 as LimbType).wrapping_sub(256), 4), (0 as LimbType).wrapping_sub(16));
}

/// Split a limb into upper and lower half limbs.
///
/// Returns a pair of upper and lower half limb, in this order.
///
/// Runs in constant time.
fn ct_l_to_hls(v: LimbType) -> (LimbType, LimbType) {
    (black_box_l(v >> HALF_LIMB_BITS), black_box_l(v & HALF_LIMB_MASK))
}

/// Add two limbs.
///
/// Returns a pair of carry and the [`LimbType::BITS`] lower bits of the sum.
///
/// Runs in constant time.
///
/// # Arguments:
///
/// * `v0` - first operand
/// * `v1` - second operand
///
#[allow(unused)]
pub fn generic_ct_add_l_l(v0: LimbType, v1: LimbType) -> (LimbType, LimbType) {
    // Don't rely on overflowing_add() for determining the carry -- that would almost certainly
    // branch and not be constant-time.
    let v0 = black_box_l(v0);
    let v1 = black_box_l(v1);
    let r = v0.wrapping_add(v1);
    let carry = black_box_l((((v0 | v1) & !r) | (v0 & v1)) >> (LIMB_BITS - 1));
    (carry, r)
}

#[cfg(not(all(feature = "enable_arch_math_asm", target_arch = "x86_64")))]
pub use self::generic_ct_add_l_l as ct_add_l_l;

#[cfg(all(feature = "enable_arch_math_asm", target_arch = "x86_64"))]
pub use x86_64_math::ct_add_l_l;

#[test]
fn test_ct_add_l_l() {
    assert_eq!(ct_add_l_l(0, 0), (0, 0));
    assert_eq!(ct_add_l_l(1, 0), (0, 1));
    assert_eq!(ct_add_l_l(!0 - 1, 1), (0, !0));
    assert_eq!(ct_add_l_l(!0, 1), (1, 0));
    assert_eq!(ct_add_l_l(1 << (LIMB_BITS - 1), 1 << (LIMB_BITS - 1)), (1, 0));
    assert_eq!(ct_add_l_l(!0, 1 << (LIMB_BITS - 1)), (1, ct_lsb_mask_l(LIMB_BITS - 1)));
    assert_eq!(ct_add_l_l(!0, !0), (1, !0 - 1));
}

/// Subtract two limbs.
///
/// Returns a pair of borrow and the [`LimbType::BITS`] lower bits of the difference.
///
/// Runs in constant time.
///
/// # Arguments:
///
/// * `v0` - first operand
/// * `v1` - second operand
///
#[allow(unused)]
pub fn generic_ct_sub_l_l(v0: LimbType, v1: LimbType) -> (LimbType, LimbType) {
    // Don't rely on overflowing_sub() for determining the borrow -- that would almost certainly
    // branch and not be constant-time.
    let v0 = black_box_l(v0);
    let v1 = black_box_l(v1);
    let r = v0.wrapping_sub(v1);
    let borrow = black_box_l((((r | v1) & !v0) | (v1 & r)) >> (LIMB_BITS - 1));
    (borrow, r)
}

#[cfg(not(all(feature = "enable_arch_math_asm", target_arch = "x86_64")))]
pub use self::generic_ct_sub_l_l as ct_sub_l_l;

#[cfg(all(feature = "enable_arch_math_asm", target_arch = "x86_64"))]
pub use x86_64_math::ct_sub_l_l;

#[test]
fn test_ct_sub_l_l() {
    assert_eq!(ct_sub_l_l(0, 0), (0, 0));
    assert_eq!(ct_sub_l_l(1, 0), (0, 1));
    assert_eq!(ct_sub_l_l(0, 1), (1, !0));
    assert_eq!(ct_sub_l_l(1 << (LIMB_BITS - 1), 1 << (LIMB_BITS - 1)), (0, 0));
    assert_eq!(ct_sub_l_l(0, 1 << (LIMB_BITS - 1)), (1, 1 << (LIMB_BITS - 1)));
    assert_eq!(ct_sub_l_l(1 << (LIMB_BITS - 1), (1 << (LIMB_BITS - 1)) + 1), (1, !0));
}

/// A pair of [`LimbType`]s interpreted as a double precision integer.
///
/// Used for the result of digit multiplications in the limb block schoolbook and Montgomery
/// kernels.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "zeroize", derive(Zeroize))]
pub struct DoubleLimb {
    v: [LimbType; 2],
}

impl DoubleLimb {
    pub fn new(h: LimbType, l: LimbType) -> Self {
        Self { v: [l, h] }
    }

    pub fn high(&self) -> LimbType {
        self.v[1]
    }

    pub fn low(&self) -> LimbType {
        self.v[0]
    }

    /// Split off the lower `nbits` as a digit, return the rest shifted down as the carry.
    ///
    /// Returns a pair of carry and digit, in this order. The carry must fit a [`LimbType`].
    ///
    /// # Arguments
    ///
    /// * `nbits` - the digit width, must be non-zero and less than [`LIMB_BITS`].
    pub fn split_digit(&self, nbits: u32) -> (LimbType, LimbType) {
        debug_assert!(nbits > 0 && nbits < LIMB_BITS);
        debug_assert_eq!(self.high() >> nbits, 0);
        let digit = self.low() & ct_lsb_mask_l(nbits);
        let carry = self.high() << (LIMB_BITS - nbits) | self.low() >> nbits;
        (carry, digit)
    }
}

#[test]
fn test_double_limb_split_digit() {
    let d = DoubleLimb::new(0x5, !0);
    let (carry, digit) = d.split_digit(LIMB_BITS - 4);
    assert_eq!(digit, ct_lsb_mask_l(LIMB_BITS - 4));
    assert_eq!(carry, 0x5 << 4 | 0xf);

    let (carry, digit) = DoubleLimb::new(0, 0x1234).split_digit(8);
    assert_eq!((carry, digit), (0x12, 0x34));
}

/// Mutiply two limbs in constant time.
///
/// Returns the result a double precision [`DoubleLimb`].
///
/// Runs in constant time.
///
/// # Arguments:
///
/// * `v0` - first operand
/// * `v1` - second operand
///
#[allow(unused)]
pub fn generic_ct_mul_l_l(v0: LimbType, v1: LimbType) -> DoubleLimb {
    let (v0h, v0l) = ct_l_to_hls(v0);
    let (v1h, v1l) = ct_l_to_hls(v1);

    let prod_v0l_v1l = v0l * v1l;
    let prod_v0l_v1h = v0l * v1h;
    let prod_v0h_v1l = v0h * v1l;
    let prod_v0h_v1h = v0h * v1h;

    let mut result_low: LimbType = prod_v0l_v1l;
    let mut result_high: LimbType = prod_v0h_v1h;

    let (prod_v0l_v1h_h, prod_v0l_v1h_l) = ct_l_to_hls(prod_v0l_v1h);
    let (prod_v0h_v1l_h, prod_v0h_v1l_l) = ct_l_to_hls(prod_v0h_v1l);

    let (result_low_carry, result_low_sum) =
        ct_add_l_l(result_low, prod_v0l_v1h_l << HALF_LIMB_BITS);
    result_low = result_low_sum;
    result_high += result_low_carry;
    result_high += prod_v0l_v1h_h;

    let (result_low_carry, result_low_sum) =
        ct_add_l_l(result_low, prod_v0h_v1l_l << HALF_LIMB_BITS);
    result_low = result_low_sum;
    result_high += result_low_carry;
    result_high += prod_v0h_v1l_h;

    DoubleLimb::new(result_high, result_low)
}

#[cfg(not(all(feature = "enable_arch_math_asm", target_arch = "x86_64")))]
pub use self::generic_ct_mul_l_l as ct_mul_l_l;

#[cfg(all(feature = "enable_arch_math_asm", target_arch = "x86_64"))]
pub use x86_64_math::ct_mul_l_l;

#[test]
fn test_ct_mul_l_l() {
    let p = ct_mul_l_l(0, 0);
    assert_eq!(p.low(), 0);
    assert_eq!(p.high(), 0);

    let p = ct_mul_l_l(2, 2);
    assert_eq!(p.low(), 4);
    assert_eq!(p.high(), 0);

    let p = ct_mul_l_l(1 << (LIMB_BITS - 1), 2);
    assert_eq!(p.low(), 0);
    assert_eq!(p.high(), 1);

    let p = ct_mul_l_l(2, 1 << (LIMB_BITS - 1));
    assert_eq!(p.low(), 0);
    assert_eq!(p.high(), 1);

    let p = ct_mul_l_l(1 << (LIMB_BITS - 1), 1 << (LIMB_BITS - 1));
    assert_eq!(p.low(), 0);
    assert_eq!(p.high(), 1 << (LIMB_BITS - 2));

    let p = ct_mul_l_l(!0, !0);
    assert_eq!(p.low(), 1);
    assert_eq!(p.high(), !1);
}

#[test]
fn test_generic_ct_mul_l_l() {
    const MERSENNE_PRIME_13: LimbType = 8191 as LimbType;
    const MERSENNE_PRIME_17: LimbType = 131071 as LimbType;
    for i in 0..256 as LimbType {
        let v0 = MERSENNE_PRIME_13.wrapping_mul(i.wrapping_mul(0x10001)) | 1 << (LIMB_BITS - 1);
        let v1 = MERSENNE_PRIME_17.wrapping_mul(i.wrapping_add(3));
        assert_eq!(generic_ct_mul_l_l(v0, v1), ct_mul_l_l(v0, v1));
    }
}

/// Multiply two limbs and add two more, all in constant time.
///
/// Returns the high and low words of `op0 + op10 * op11 + carry`, in this order. The sum always
/// fits a [`DoubleLimb`].
pub fn ct_mul_add_l_l_l_c(
    op0: LimbType,
    op10: LimbType,
    op11: LimbType,
    carry: LimbType,
) -> (LimbType, LimbType) {
    let prod = ct_mul_l_l(op10, op11);
    // Basic property of the multiplication.
    debug_assert!(prod.high() < !1 || prod.high() == !1 && prod.low() == 1);
    let (carry0, result) = ct_add_l_l(op0, carry);
    let (carry1, result) = ct_add_l_l(result, prod.low());
    // The new carry does not overflow: if carry0 != 0,
    // then the result after after the first addition is
    // <= !1, because that addition did wrap around.
    // If in addition prod.high() == !1, then prod.low() <= 1
    // and the second addition would not overflow.
    debug_assert!(prod.high() < !1 || carry0 + carry1 <= 1);
    let carry = prod.high() + carry0 + carry1;
    (carry, result)
}

#[test]
fn test_ct_mul_add_l_l_l_c() {
    assert_eq!(ct_mul_add_l_l_l_c(!0, !0, !0, !0), (!0, !0));
    assert_eq!(ct_mul_add_l_l_l_c(1, 2, 3, 4), (0, 11));
    assert_eq!(ct_mul_add_l_l_l_c(!0, 1, 1, 0), (1, 0));
}

pub fn ct_inv_mod_l(v: LimbType) -> LimbType {
    // Apply Hensel's lifting lemma for v * x - 1 to lift the trivial root
    // (i.e. inverse of v) mod 2^1 to a root mod 2^LIMB_BITS. Successive steps
    // double the bits, i.e. if r is a root mod 2^k, one step makes it a root mod 2^2*k.
    debug_assert_eq!(v & 1, 1);
    let mut k = 1;
    let mut r: LimbType = 1;
    while k < LIMB_BITS {
        r = (r << 1).wrapping_sub(v.wrapping_mul(r).wrapping_mul(r));
        k *= 2;
    }

    r
}

#[test]
fn test_ct_inv_mod_l() {
    for j in 0..LIMB_BITS {
        let v = ((1 as LimbType) << j) | 1;
        assert_eq!(v.wrapping_mul(ct_inv_mod_l(v)), 1);
    }

    for j in 1..LIMB_BITS {
        let v = ((1 as LimbType) << j).wrapping_sub(1);
        assert_eq!(v.wrapping_mul(ct_inv_mod_l(v)), 1);
    }

    let v: LimbType = !0;
    assert_eq!(v.wrapping_mul(ct_inv_mod_l(v)), 1);
}

// Position of MSB + 1, if any, zero otherwise.
pub fn ct_find_last_set_bit_l(mut v: LimbType) -> usize {
    let mut bits = LIMB_BITS as LimbType;
    assert!(bits != 0);
    assert!(bits & (bits - 1) == 0); // Is a power of two.
    let mut count: usize = 0;
    let mut lsb_mask = !0;
    while bits > 1 {
        bits /= 2;
        lsb_mask >>= bits;
        let v_l = v & lsb_mask;
        let v_h = v >> bits;
        let upper = ct_neq_l_l(v_h, 0);
        count += upper.select(0, bits) as usize;
        v = upper.select(v_l, v_h);
    }
    debug_assert!(v <= 1);
    count += v as usize;
    count
}

#[test]
fn test_ct_find_last_set_bit_l() {
    assert_eq!(ct_find_last_set_bit_l(0), 0);

    for i in 0..LIMB_BITS as usize {
        let v = 1 << i;
        assert_eq!(ct_find_last_set_bit_l(v), i + 1);
        assert_eq!(ct_find_last_set_bit_l(v - 1), i);
    }
}
