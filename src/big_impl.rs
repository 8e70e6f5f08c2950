//! The limb block: a fixed number of reduced radix digits.
//!
//! A [`Big`] stores [`NLEN`] digits of [`BASEBITS`] bits each, least significant first, in
//! [`LimbType`] words. Nominally a block represents an integer of [`BIGBITS`] bits, the
//! remaining capacity of the top digit is the "excess" region: finite field values chain blocks
//! at a [`BIGBITS`] stride and park carries there until the next normalization.
//!
//! Digits are interpreted in two's complement. After [`Big::norm()`] all but the top digit are
//! within `[0, 2^BASEBITS)`, the top digit carries whatever remains, including the sign.

use core::cmp::Ordering;
use core::fmt;

use rand_core::RngCore;
#[cfg(feature = "zeroize")]
use zeroize::Zeroize;

use super::dbig_impl::DoubleWidth;
use super::hexstr;
use super::limb::{
    ct_eq_l_l, ct_find_last_set_bit_l, ct_gt_l_l, ct_inv_mod_l, ct_is_zero_l, ct_lsb_mask_l,
    ct_lt_l_l, ct_mul_add_l_l_l_c, ct_sar_l, DoubleLimb, LimbChoice, LimbType, LIMB_BITS,
};
use super::unnormalized::{Normalize, Unnormalized};

/// Bits per digit.
#[cfg(target_arch = "x86_64")]
pub const BASEBITS: u32 = 56;
/// Digits per block.
#[cfg(target_arch = "x86_64")]
pub const NLEN: usize = 5;
/// Bits per digit.
#[cfg(not(target_arch = "x86_64"))]
pub const BASEBITS: u32 = 28;
/// Digits per block.
#[cfg(not(target_arch = "x86_64"))]
pub const NLEN: usize = 10;

/// Size of a block's byte representation.
pub const MODBYTES: usize = 32;
/// Nominal bit width of a block.
pub const BIGBITS: usize = 8 * MODBYTES;
/// Digits of a [`DoubleWidth`].
pub const DNLEN: usize = 2 * NLEN;
pub const BMASK: LimbType = ct_lsb_mask_l(BASEBITS);

// Nominal bits held by the top digit.
pub(crate) const P_TBITS: u32 = (BIGBITS % BASEBITS as usize) as u32;
// Excess region of the top digit.
pub(crate) const P_OMASK: LimbType = !ct_lsb_mask_l(P_TBITS);
// Headroom above BIGBITS, as a power of two.
pub(crate) const P_FEXCESS: LimbType = 1 << (NLEN * BASEBITS as usize - BIGBITS);

const _: () = assert!(BIGBITS / BASEBITS as usize == NLEN - 1);
const _: () = assert!(P_TBITS > 0);
const _: () = assert!(BASEBITS + 2 < LIMB_BITS);

const SIGN_BIT: LimbType = 1 << (LIMB_BITS - 1);

/// Multiply two digits and accumulate, returning the carry and the new digit.
///
/// The digit is `(r + a * b + c) mod 2^BASEBITS`, the carry the rest shifted down.
fn ct_muladd_digit(a: LimbType, b: LimbType, c: LimbType, r: LimbType) -> (LimbType, LimbType) {
    let (h, l) = ct_mul_add_l_l_l_c(r, a, b, c);
    DoubleLimb::new(h, l).split_digit(BASEBITS)
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "zeroize", derive(Zeroize))]
pub struct Big {
    w: [LimbType; NLEN],
}

impl Big {
    pub const fn zero() -> Self {
        Self { w: [0; NLEN] }
    }

    pub const fn one() -> Self {
        let mut w = [0; NLEN];
        w[0] = 1;
        Self { w }
    }

    /// Construct a block from a single machine word.
    pub const fn from_limb(v: LimbType) -> Self {
        let mut w = [0; NLEN];
        w[0] = v & BMASK;
        w[1] = v >> BASEBITS;
        Self { w }
    }

    pub(crate) fn from_digits(w: [LimbType; NLEN]) -> Self {
        Self { w }
    }

    pub(crate) fn digits(&self) -> &[LimbType; NLEN] {
        &self.w
    }

    pub fn digit(&self, i: usize) -> LimbType {
        self.w[i]
    }

    pub fn set_digit(&mut self, i: usize, v: LimbType) {
        self.w[i] = v;
    }

    pub fn ct_is_zero(&self) -> LimbChoice {
        let acc = self.w.iter().fold(0, |acc, d| acc | d);
        LimbChoice::from(ct_is_zero_l(acc))
    }

    pub fn is_zero(&self) -> bool {
        self.ct_is_zero().unwrap() != 0
    }

    pub fn is_one(&self) -> bool {
        let upper = self.w[1..].iter().fold(0, |acc, d| acc | d);
        let one = ct_eq_l_l(self.w[0], 1) & LimbChoice::from(ct_is_zero_l(upper));
        one.unwrap() != 0
    }

    /// The sign of a normalized value, `1` for negative.
    pub fn sign(&self) -> LimbType {
        self.w[NLEN - 1] >> (LIMB_BITS - 1)
    }

    /// The part of the top digit above [`BIGBITS`].
    pub(crate) fn excess(&self) -> LimbType {
        (self.w[NLEN - 1] & P_OMASK) >> P_TBITS
    }

    /// Propagate carries.
    ///
    /// All but the top digit end up in `[0, 2^BASEBITS)`. Returns the part of the top digit
    /// at and above [`BIGBITS`], arithmetically shifted down, i.e. the carry into a next block in
    /// a chain.
    pub fn norm(&mut self) -> LimbType {
        norm_digits(&mut self.w);
        ct_sar_l(self.w[NLEN - 1], P_TBITS)
    }

    /// Reduce a normalized value modulo `2^BIGBITS`.
    pub fn truncate(&mut self) {
        self.w[NLEN - 1] &= !P_OMASK;
    }

    /// Clear bits from the top digit, used to strip a carry returned by [`norm()`](Self::norm).
    pub fn xor_top(&mut self, v: LimbType) {
        self.w[NLEN - 1] ^= v;
    }

    /// Absorb the carry out of the preceding block in a chain.
    pub fn inc_top(&mut self, c: LimbType) {
        self.w[0] = self.w[0].wrapping_add(c);
    }

    pub(crate) fn add_digits(&mut self, b: &Big) {
        for (a, b) in self.w.iter_mut().zip(b.w.iter()) {
            *a = a.wrapping_add(*b);
        }
    }

    pub(crate) fn sub_digits(&mut self, b: &Big) {
        for (a, b) in self.w.iter_mut().zip(b.w.iter()) {
            *a = a.wrapping_sub(*b);
        }
    }

    // self = b - self
    pub(crate) fn rsub_digits(&mut self, b: &Big) {
        for (a, b) in self.w.iter_mut().zip(b.w.iter()) {
            *a = b.wrapping_sub(*a);
        }
    }

    pub fn add(mut self, b: &Big) -> Unnormalized<Big> {
        self.add_digits(b);
        Unnormalized::new(self)
    }

    pub fn sub(mut self, b: &Big) -> Unnormalized<Big> {
        self.sub_digits(b);
        Unnormalized::new(self)
    }

    /// Compute `b - self`, without normalization.
    pub fn rsub(mut self, b: &Big) -> Unnormalized<Big> {
        self.rsub_digits(b);
        Unnormalized::new(self)
    }

    /// Add a small integer to the least significant digit, without normalization.
    pub fn inc(&mut self, m: LimbType) {
        self.w[0] = self.w[0].wrapping_add(m);
    }

    /// Subtract a small integer from the least significant digit, without normalization.
    pub fn dec(&mut self, m: LimbType) {
        self.w[0] = self.w[0].wrapping_sub(m);
    }

    /// Shift a normalized, non-negative value left by `k < BASEBITS` bits.
    ///
    /// The top digit keeps all bits shifted into it. Returns the part of the top digit at and
    /// above [`BIGBITS`].
    pub fn fshl(&mut self, k: u32) -> LimbType {
        debug_assert!(k > 0 && k < BASEBITS);
        self.w[NLEN - 1] = (self.w[NLEN - 1] << k) | (self.w[NLEN - 2] >> (BASEBITS - k));
        for i in (1..NLEN - 1).rev() {
            self.w[i] = ((self.w[i] << k) & BMASK) | (self.w[i - 1] >> (BASEBITS - k));
        }
        self.w[0] = (self.w[0] << k) & BMASK;
        self.w[NLEN - 1] >> P_TBITS
    }

    /// Shift a normalized value right by `k < BASEBITS` bits, returning the bits shifted out.
    pub fn fshr(&mut self, k: u32) -> LimbType {
        debug_assert!(k > 0 && k < BASEBITS);
        let r = self.w[0] & ct_lsb_mask_l(k);
        for i in 0..NLEN - 1 {
            self.w[i] = (self.w[i] >> k) | ((self.w[i + 1] << (BASEBITS - k)) & BMASK);
        }
        self.w[NLEN - 1] = ct_sar_l(self.w[NLEN - 1], k);
        r
    }

    /// Shift a normalized, non-negative value left by `k` bits, `k < NLEN * BASEBITS`.
    ///
    /// Bits moved past the top digit's word are lost.
    pub fn shl(&mut self, k: usize) {
        shl_digits(&mut self.w, k);
    }

    /// Shift a normalized value right by `k` bits, `k < NLEN * BASEBITS`.
    pub fn shr(&mut self, k: usize) {
        shr_digits(&mut self.w, k);
    }

    pub fn bit(&self, i: usize) -> LimbType {
        (self.w[i / BASEBITS as usize] >> (i % BASEBITS as usize)) & 1
    }

    pub fn parity(&self) -> LimbType {
        self.w[0] & 1
    }

    pub fn last_bits(&self, m: u32) -> LimbType {
        debug_assert!(m <= BASEBITS);
        self.w[0] & ct_lsb_mask_l(m)
    }

    /// Bit length of a normalized, non-negative value, zero for zero.
    ///
    /// Runs in constant time.
    pub fn nbits(&self) -> usize {
        nbits_digits(&self.w)
    }

    /// Constant-time comparison of normalized values.
    ///
    /// Returns a pair of "less than" and "greater than" choices, in this order.
    pub(crate) fn ct_lt_gt(a: &Big, b: &Big) -> (LimbChoice, LimbChoice) {
        ct_lt_gt_digits(&a.w, &b.w)
    }

    /// Compare two normalized values.
    pub fn comp(a: &Big, b: &Big) -> Ordering {
        let (lt, gt) = Self::ct_lt_gt(a, b);
        ordering_from_choices(lt, gt)
    }

    /// Take `b` if `c` is set, keep `self` otherwise.
    pub fn cmove(&mut self, b: &Big, c: LimbChoice) {
        cmove_digits(&mut self.w, &b.w, c);
    }

    pub fn cswap(&mut self, b: &mut Big, c: LimbChoice) {
        for (a, b) in self.w.iter_mut().zip(b.w.iter_mut()) {
            c.swap(a, b);
        }
    }

    /// Full product of two blocks.
    ///
    /// Both operands must be normalized and non-negative, with a top digit within
    /// `[0, 2^BASEBITS)`. The result is normalized.
    pub fn mul(a: &Big, b: &Big) -> DoubleWidth {
        debug_assert!(a.digits_in_range() && b.digits_in_range());
        let mut c = [0 as LimbType; DNLEN];
        for i in 0..NLEN {
            let mut carry = 0;
            for j in 0..NLEN {
                (carry, c[i + j]) = ct_muladd_digit(a.w[i], b.w[j], carry, c[i + j]);
            }
            c[i + NLEN] = carry;
        }
        DoubleWidth::from_digits(c)
    }

    pub fn sqr(a: &Big) -> DoubleWidth {
        Self::mul(a, a)
    }

    /// The product of two blocks modulo `2^BIGBITS`.
    pub fn smul(a: &Big, b: &Big) -> Big {
        debug_assert!(a.digits_in_range() && b.digits_in_range());
        let mut c = Big::zero();
        for i in 0..NLEN {
            let mut carry = 0;
            for j in 0..NLEN - i {
                (carry, c.w[i + j]) = ct_muladd_digit(a.w[i], b.w[j], carry, c.w[i + j]);
            }
        }
        c.truncate();
        c
    }

    /// Single block Montgomery reduction.
    ///
    /// Computes `d * 2^-(NLEN * BASEBITS) mod md`, where `mc` is `-md^-1 mod 2^BASEBITS`. The
    /// result is fully reduced for `d < md * 2^(NLEN * BASEBITS)`.
    ///
    /// Runs in constant time.
    pub fn monty(md: &Big, mc: LimbType, d: &DoubleWidth) -> Big {
        let mut w = *d.digits();
        for i in 0..NLEN {
            trace_access!("monty", i);
            let m = mc.wrapping_mul(w[i]) & BMASK;
            let mut carry = 0;
            for j in 0..NLEN {
                (carry, w[i + j]) = ct_muladd_digit(m, md.w[j], carry, w[i + j]);
            }
            w[NLEN + i] = w[NLEN + i].wrapping_add(carry);
        }

        let mut r = Big::zero();
        r.w.copy_from_slice(&w[NLEN..]);
        r.norm();

        let mut t = r;
        t.sub_digits(md);
        t.norm();
        trace_access!("monty_cmove", NLEN);
        r.cmove(&t, !LimbChoice::from(t.sign()));
        r
    }

    /// Invert an odd value modulo `2^BIGBITS`.
    ///
    /// Lifts the single digit inverse, each step doubling the number of correct low bits.
    pub fn invmod2m(&mut self) {
        debug_assert_eq!(self.parity(), 1);
        let mut a = *self;
        a.truncate();
        let mut u = Big::from_limb(ct_inv_mod_l(a.w[0]) & BMASK);
        let two = Big::from_limb(2);
        let mut k = BASEBITS as usize;
        while k < BIGBITS {
            // u <- u * (2 - a * u)
            let mut t = Big::smul(&a, &u);
            t.rsub_digits(&two);
            t.norm();
            t.truncate();
            u = Big::smul(&u, &t);
            k *= 2;
        }
        *self = u;
    }

    /// Serialize the low [`BIGBITS`] bits, big endian.
    pub fn to_bytes(&self, b: &mut [u8; MODBYTES]) {
        let mut c = *self;
        c.norm();
        for byte in b.iter_mut().rev() {
            *byte = (c.w[0] & 0xff) as u8;
            c.fshr(8);
        }
    }

    pub fn from_bytes(b: &[u8; MODBYTES]) -> Big {
        let mut m = Big::zero();
        for byte in b.iter() {
            m.fshl(8);
            m.w[0] += *byte as LimbType;
        }
        m
    }

    /// Draw [`BIGBITS`] uniformly random bits.
    pub fn random<R: RngCore + ?Sized>(rng: &mut R) -> Big {
        let mut b = [0u8; MODBYTES];
        rng.fill_bytes(&mut b);
        let r = Big::from_bytes(&b);
        #[cfg(feature = "zeroize")]
        b.zeroize();
        r
    }

    fn digits_in_range(&self) -> bool {
        self.w.iter().all(|d| *d >> BASEBITS == 0)
    }
}

impl Normalize for Big {
    fn normalize_in_place(&mut self) {
        self.norm();
    }
}

impl Unnormalized<Big> {
    pub fn add(mut self, b: &Big) -> Self {
        self.get_mut().add_digits(b);
        self
    }

    pub fn sub(mut self, b: &Big) -> Self {
        self.get_mut().sub_digits(b);
        self
    }
}

impl fmt::Display for Big {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut b = [0u8; MODBYTES];
        self.to_bytes(&mut b);
        let s = hexstr::bytes_to_hexstr(&b).map_err(|_| fmt::Error)?;
        f.write_str(&s)
    }
}

// Digit slice kernels shared between Big and DoubleWidth. The last digit of a slice is its top
// digit: it absorbs carries and carries the sign.

pub(crate) fn norm_digits(w: &mut [LimbType]) {
    let top = w.len() - 1;
    let mut carry: LimbType = 0;
    for d in w[..top].iter_mut() {
        let v = d.wrapping_add(carry);
        *d = v & BMASK;
        carry = ct_sar_l(v, BASEBITS);
    }
    w[top] = w[top].wrapping_add(carry);
}

// Left shift of a normalized, non-negative value by k < w.len() * BASEBITS bits.
pub(crate) fn shl_digits(w: &mut [LimbType], k: usize) {
    let len = w.len();
    let n = (k % BASEBITS as usize) as u32;
    let m = k / BASEBITS as usize;
    debug_assert!(m < len);
    // For n == 0, the right shifts by BASEBITS yield zero on normalized digits.
    let mut top = w[len - 1 - m] << n;
    if len >= m + 2 {
        top |= w[len - m - 2] >> (BASEBITS - n);
    }
    for i in (m + 1..len - 1).rev() {
        w[i] = ((w[i - m] << n) & BMASK) | (w[i - m - 1] >> (BASEBITS - n));
    }
    w[len - 1] = top;
    if m < len - 1 {
        w[m] = (w[0] << n) & BMASK;
    }
    w[..m].fill(0);
}

// Arithmetic right shift of a normalized value by k < w.len() * BASEBITS bits.
pub(crate) fn shr_digits(w: &mut [LimbType], k: usize) {
    let len = w.len();
    let n = (k % BASEBITS as usize) as u32;
    let m = k / BASEBITS as usize;
    debug_assert!(m < len);
    for i in 0..len - m - 1 {
        w[i] = (w[m + i] >> n) | ((w[m + i + 1] << (BASEBITS - n)) & BMASK);
    }
    let top = w[len - 1];
    w[len - m - 1] = ct_sar_l(top, n);
    w[len - m..].fill(ct_sar_l(top, LIMB_BITS - 1));
}

// Constant-time bit length of a normalized, non-negative value.
pub(crate) fn nbits_digits(w: &[LimbType]) -> usize {
    let mut r = 0;
    for (i, d) in w.iter().enumerate() {
        let nz = !LimbChoice::from(ct_is_zero_l(*d));
        r = nz.select_usize(r, i * BASEBITS as usize + ct_find_last_set_bit_l(*d));
    }
    r
}

// Constant-time comparison of normalized values, returns the "less than" and "greater than"
// choices.
pub(crate) fn ct_lt_gt_digits(a: &[LimbType], b: &[LimbType]) -> (LimbChoice, LimbChoice) {
    debug_assert_eq!(a.len(), b.len());
    let top = a.len() - 1;
    let mut lt = LimbChoice::from(0);
    let mut gt = LimbChoice::from(0);
    for i in (0..a.len()).rev() {
        // Flip the top digit's sign bit for an unsigned comparison.
        let (av, bv) = if i == top {
            (a[i] ^ SIGN_BIT, b[i] ^ SIGN_BIT)
        } else {
            (a[i], b[i])
        };
        let undecided = !(lt | gt);
        lt |= undecided & ct_lt_l_l(av, bv);
        gt |= undecided & ct_gt_l_l(av, bv);
    }
    (lt, gt)
}

pub(crate) fn cmove_digits(a: &mut [LimbType], b: &[LimbType], c: LimbChoice) {
    for (a, b) in a.iter_mut().zip(b.iter()) {
        *a = c.select(*a, *b);
    }
}

pub(crate) fn ordering_from_choices(lt: LimbChoice, gt: LimbChoice) -> Ordering {
    match (lt.unwrap(), gt.unwrap()) {
        (1, _) => Ordering::Less,
        (_, 1) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
fn test_big(seed: LimbType) -> Big {
    const MERSENNE_PRIME_13: LimbType = 8191 as LimbType;
    const MERSENNE_PRIME_17: LimbType = 131071 as LimbType;
    let mut w = [0; NLEN];
    let mut v = seed;
    for d in w.iter_mut() {
        v = v.wrapping_mul(MERSENNE_PRIME_17).wrapping_add(MERSENNE_PRIME_13);
        *d = v & BMASK;
    }
    w[NLEN - 1] &= ct_lsb_mask_l(P_TBITS);
    Big::from_digits(w)
}

#[test]
fn test_big_norm() {
    let mut a = Big::zero();
    a.set_digit(0, BMASK + 3);
    a.set_digit(1, BMASK);
    let carry = a.norm();
    assert_eq!(carry, 0);
    assert_eq!(a.digit(0), 2);
    assert_eq!(a.digit(1), 0);
    assert_eq!(a.digit(2), 1);

    // -1 normalizes to all ones digits and a negative top.
    let mut a = Big::zero().sub(&Big::one()).normalize();
    assert_eq!(a.digit(0), BMASK);
    assert_eq!(a.sign(), 1);
    assert_eq!(a.norm(), !0);

    // Overflow into the excess region is reported as carry.
    let mut a = Big::zero();
    a.set_digit(NLEN - 1, 5 << P_TBITS | 1);
    assert_eq!(a.norm(), 5);
    a.xor_top(5 << P_TBITS);
    assert_eq!(a.digit(NLEN - 1), 1);
}

#[test]
fn test_big_is_zero_one() {
    assert!(Big::zero().is_zero());
    assert!(Big::one().is_one());
    assert!(!Big::zero().is_one());
    assert!(!Big::from_limb(3).is_one());
    assert!(!Big::one().is_zero());

    let mut a = Big::one();
    a.set_digit(NLEN - 1, 1);
    assert!(!a.is_one());
    // 2^BASEBITS + 1 shares the lowest digit with one after normalization.
    let mut a = Big::zero();
    a.set_digit(0, BMASK + 2);
    a.norm();
    assert_eq!(a.digit(0), 1);
    assert!(!a.is_one());
}

#[test]
fn test_big_bytes() {
    let mut bytes = [0u8; MODBYTES];
    for (i, b) in bytes.iter_mut().enumerate() {
        *b = (i as u8).wrapping_mul(37).wrapping_add(11);
    }
    let a = Big::from_bytes(&bytes);
    let mut out = [0u8; MODBYTES];
    a.to_bytes(&mut out);
    assert_eq!(bytes, out);
    assert_eq!(a.nbits(), BIGBITS - 4);
    assert_eq!(a.excess(), 0);

    let one = Big::one();
    one.to_bytes(&mut out);
    assert_eq!(out[MODBYTES - 1], 1);
    assert!(out[..MODBYTES - 1].iter().all(|b| *b == 0));
}

#[test]
fn test_big_shifts() {
    for seed in 0..16 {
        let a = test_big(seed);
        let reference = super::test_helpers::reference::big_to_biguint(&a);

        let mut b = a;
        let excess = b.fshl(1);
        assert_eq!(excess, a.bit(BIGBITS - 1));
        let mut c = b;
        c.truncate();
        assert_eq!(
            super::test_helpers::reference::big_to_biguint(&c),
            (reference.clone() << 1u32) % (num_bigint::BigUint::from(1u32) << BIGBITS)
        );

        let shifted_out = b.fshr(1);
        assert_eq!(shifted_out, 0);
        assert_eq!(b, a);

        let mut b = a;
        let shifted_out = b.fshr(3);
        assert_eq!(shifted_out, a.last_bits(3));
        assert_eq!(super::test_helpers::reference::big_to_biguint(&b), &reference >> 3u32);

        let mut b = a;
        b.shr(BASEBITS as usize + 5);
        assert_eq!(
            super::test_helpers::reference::big_to_biguint(&b),
            &reference >> (BASEBITS + 5)
        );
        b.shl(BASEBITS as usize + 5);
        b.truncate();
        assert_eq!(
            super::test_helpers::reference::big_to_biguint(&b),
            (&reference >> (BASEBITS + 5)) << (BASEBITS + 5)
        );
        let mut b = a;
        b.shl(2 * BASEBITS as usize);
        b.truncate();
        assert_eq!(
            super::test_helpers::reference::big_to_biguint(&b),
            (&reference << (2 * BASEBITS)) % (num_bigint::BigUint::from(1u32) << BIGBITS)
        );
    }
}

#[test]
fn test_big_comp() {
    let a = Big::from_limb(1000);
    let b = Big::from_limb(1001);
    assert_eq!(Big::comp(&a, &b), Ordering::Less);
    assert_eq!(Big::comp(&b, &a), Ordering::Greater);
    assert_eq!(Big::comp(&a, &a), Ordering::Equal);

    let neg = Big::zero().sub(&Big::one()).normalize();
    assert_eq!(Big::comp(&neg, &Big::zero()), Ordering::Less);
    assert_eq!(Big::comp(&test_big(3), &neg), Ordering::Greater);

    let mut high = Big::zero();
    high.set_digit(NLEN - 1, 1 << P_TBITS);
    assert_eq!(Big::comp(&high, &test_big(7)), Ordering::Greater);
}

#[test]
fn test_big_cmove_cswap() {
    let a0 = test_big(1);
    let b0 = test_big(2);
    let mut a = a0;
    let mut b = b0;
    a.cswap(&mut b, LimbChoice::from(0));
    assert_eq!((a, b), (a0, b0));
    a.cswap(&mut b, LimbChoice::from(1));
    assert_eq!((a, b), (b0, a0));
    a.cmove(&a0, LimbChoice::from(0));
    assert_eq!(a, b0);
    a.cmove(&a0, LimbChoice::from(1));
    assert_eq!(a, a0);
}

#[test]
fn test_big_mul() {
    use super::test_helpers::reference::big_to_biguint;
    use num_bigint::BigUint;

    for i in 0..32 {
        let a = test_big(i);
        let b = test_big(i.wrapping_mul(17) + 5);
        let expected = big_to_biguint(&a) * big_to_biguint(&b);

        let mut d = Big::mul(&a, &b);
        let hi = d.split_at(BIGBITS);
        let lo = d.lower();
        let product = (big_to_biguint(&hi) << BIGBITS) + big_to_biguint(&lo);
        assert_eq!(product, expected);

        let low = Big::smul(&a, &b);
        assert_eq!(big_to_biguint(&low), &expected % (BigUint::from(1u32) << BIGBITS));
    }
}

#[test]
fn test_big_monty() {
    use super::test_helpers::reference::{big_from_biguint, big_to_biguint};
    use num_bigint::BigUint;

    let md = test_big(42);
    let mut md = md;
    md.set_digit(0, md.digit(0) | 1);
    let md_ref = big_to_biguint(&md);
    let r = BigUint::from(1u32) << (NLEN * BASEBITS as usize);
    let mc = (0 as LimbType).wrapping_sub(ct_inv_mod_l(md.digit(0))) & BMASK;

    for i in 0..16 {
        let a = big_from_biguint(&(big_to_biguint(&test_big(i)) % &md_ref));
        let b = big_from_biguint(&(big_to_biguint(&test_big(i + 100)) % &md_ref));
        let d = Big::mul(&a, &b);
        let result = Big::monty(&md, mc, &d);
        let expected = (big_to_biguint(&a) * big_to_biguint(&b)
            * r.modinv(&md_ref).unwrap())
            % &md_ref;
        assert_eq!(big_to_biguint(&result), expected);
    }
}

#[test]
fn test_big_invmod2m() {
    use super::test_helpers::reference::big_to_biguint;
    use num_bigint::BigUint;

    let m = BigUint::from(1u32) << BIGBITS;
    for i in 0..16 {
        let mut a = test_big(i);
        a.set_digit(0, a.digit(0) | 1);
        let mut u = a;
        u.invmod2m();
        assert_eq!(
            (big_to_biguint(&a) * big_to_biguint(&u)) % &m,
            BigUint::from(1u32)
        );
    }
}

#[test]
fn test_big_display() {
    extern crate alloc;
    use alloc::format;

    let a = Big::from_limb(0xabcdef);
    let s = format!("{}", a);
    assert_eq!(s.len(), 2 * MODBYTES);
    assert!(s.ends_with("abcdef"));
    assert!(s[..2 * MODBYTES - 6].chars().all(|c| c == '0'));
}
