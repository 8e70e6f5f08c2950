//! Double width values, for products of two limb blocks and their reduction.

use core::cmp::Ordering;
use core::fmt;

#[cfg(feature = "zeroize")]
use zeroize::Zeroize;

use super::big_impl::{
    cmove_digits, ct_lt_gt_digits, nbits_digits, norm_digits, ordering_from_choices, shl_digits,
    shr_digits, Big, BASEBITS, BMASK, DNLEN, NLEN,
};
use super::limb::{ct_sar_l, LimbChoice, LimbType, LIMB_BITS};
use super::unnormalized::{Normalize, Unnormalized};

#[derive(Clone, Copy, PartialEq, Eq, Debug, thiserror::Error)]
pub enum DoubleWidthError {
    #[error("zero modulus")]
    ZeroModulus,
    #[error("quotient exceeds a limb block")]
    QuotientOverflow,
}

/// Bit capacity of a [`DoubleWidth`], not counting the top digit's headroom.
const DBIGBITS: usize = DNLEN * BASEBITS as usize;

const _: () = assert!(BASEBITS % 4 == 0);

/// A value of [`DNLEN`] digits in the same radix as [`Big`].
///
/// The top digit is never range checked and absorbs whatever carry reaches it.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "zeroize", derive(Zeroize))]
pub struct DoubleWidth {
    w: [LimbType; DNLEN],
}

impl DoubleWidth {
    pub const fn zero() -> Self {
        Self { w: [0; DNLEN] }
    }

    pub(crate) fn from_digits(w: [LimbType; DNLEN]) -> Self {
        Self { w }
    }

    pub(crate) fn digits(&self) -> &[LimbType; DNLEN] {
        &self.w
    }

    /// Widen a block.
    ///
    /// The block's top digit gets split at the digit boundary, any excess above [`BASEBITS`]
    /// moves up into the next digit.
    pub fn from_big(b: &Big) -> Self {
        let mut w = [0; DNLEN];
        w[..NLEN].copy_from_slice(b.digits());
        let top = w[NLEN - 1];
        w[NLEN - 1] = top & BMASK;
        w[NLEN] = ct_sar_l(top, BASEBITS);
        // Sign extend.
        w[NLEN + 1..].fill(ct_sar_l(top, LIMB_BITS - 1));
        Self { w }
    }

    /// The lower [`NLEN`] digits, as a block.
    pub fn lower(&self) -> Big {
        let mut w = [0; NLEN];
        w.copy_from_slice(&self.w[..NLEN]);
        Big::from_digits(w)
    }

    /// Propagate carries across all digits but the last.
    pub fn norm(&mut self) {
        norm_digits(&mut self.w);
    }

    pub fn nbits(&self) -> usize {
        let mut t = *self;
        t.norm();
        nbits_digits(&t.w)
    }

    /// Compare two normalized values.
    pub fn comp(a: &DoubleWidth, b: &DoubleWidth) -> Ordering {
        let (lt, gt) = ct_lt_gt_digits(&a.w, &b.w);
        ordering_from_choices(lt, gt)
    }

    pub fn cmove(&mut self, b: &DoubleWidth, c: LimbChoice) {
        cmove_digits(&mut self.w, &b.w, c);
    }

    /// Shift a normalized, non-negative value left by `k` bits, `k < DNLEN * BASEBITS`.
    pub fn shl(&mut self, k: usize) {
        shl_digits(&mut self.w, k);
    }

    /// Shift a normalized value right by `k` bits, `k < DNLEN * BASEBITS`.
    pub fn shr(&mut self, k: usize) {
        shr_digits(&mut self.w, k);
    }

    pub(crate) fn add_digits(&mut self, b: &DoubleWidth) {
        for (a, b) in self.w.iter_mut().zip(b.w.iter()) {
            *a = a.wrapping_add(*b);
        }
    }

    pub(crate) fn sub_digits(&mut self, b: &DoubleWidth) {
        for (a, b) in self.w.iter_mut().zip(b.w.iter()) {
            *a = a.wrapping_sub(*b);
        }
    }

    pub fn add(mut self, b: &DoubleWidth) -> Unnormalized<DoubleWidth> {
        self.add_digits(b);
        Unnormalized::new(self)
    }

    pub fn sub(mut self, b: &DoubleWidth) -> Unnormalized<DoubleWidth> {
        self.sub_digits(b);
        Unnormalized::new(self)
    }

    /// Remove and return all bits at and above position `n`.
    ///
    /// The value must be normalized and non-negative, `n` must be within
    /// `[(NLEN - 1) * BASEBITS, NLEN * BASEBITS)` and the part above `n` must fit a block's
    /// digits, with the top one taking any excess. The remaining lower part stays in place.
    pub fn split_at(&mut self, n: usize) -> Big {
        let word = n / BASEBITS as usize;
        let bits = (n % BASEBITS as usize) as u32;
        debug_assert!(word + 1 >= NLEN && word < NLEN);

        let mut t = [0; NLEN];
        for (i, d) in t.iter_mut().enumerate() {
            let j = word + i;
            let lo = self.w[j] >> bits;
            let hi = if j + 1 < DNLEN {
                self.w[j + 1] << (BASEBITS - bits)
            } else {
                0
            };
            // The result's top digit takes everything that is left.
            *d = if i + 1 < NLEN { lo | (hi & BMASK) } else { lo | hi };
        }
        self.w[word] &= BMASK >> (BASEBITS - bits);
        self.w[word + 1..].fill(0);
        Big::from_digits(t)
    }

    // Prepare the trial-subtract scan: normalize the modulus and align its top bit with the top
    // of the double width capacity. Returns the aligned modulus and the shift distance.
    fn align_modulus(m: &Big) -> Result<(DoubleWidth, usize), DoubleWidthError> {
        let mut m = *m;
        m.norm();
        if m.is_zero() {
            return Err(DoubleWidthError::ZeroModulus);
        }
        let k = DBIGBITS - m.nbits();
        let mut ms = DoubleWidth::from_big(&m);
        ms.shl(k);
        Ok((ms, k))
    }

    /// Reduce modulo a single block.
    ///
    /// The value must be non-negative and below `2^(DNLEN * BASEBITS)`. The number of trial
    /// subtraction rounds only depends on the modulus' bit length, never on the value.
    pub fn reduce_modulo(&self, m: &Big) -> Result<Big, DoubleWidthError> {
        let (mut ms, k) = Self::align_modulus(m)?;
        let mut x = *self;
        x.norm();

        for _ in 0..=k {
            let mut t = x;
            t.sub_digits(&ms);
            t.norm();
            x.cmove(&t, !LimbChoice::from(t.sign()));
            ms.shr(1);
        }
        Ok(x.lower())
    }

    /// Divide by a single block, returning the quotient.
    ///
    /// Same preconditions and scan as [`reduce_modulo()`](Self::reduce_modulo).
    pub fn divide_by(&self, m: &Big) -> Result<Big, DoubleWidthError> {
        let (mut ms, k) = Self::align_modulus(m)?;
        let mut x = *self;
        x.norm();
        let mut e = DoubleWidth::from_big(&Big::one());
        e.shl(k);
        let mut q = DoubleWidth::zero();

        for _ in 0..=k {
            let mut t = x;
            t.sub_digits(&ms);
            t.norm();
            let commit = !LimbChoice::from(t.sign());
            x.cmove(&t, commit);
            let mut r = q;
            r.add_digits(&e);
            r.norm();
            q.cmove(&r, commit);
            ms.shr(1);
            e.shr(1);
        }

        if q.nbits() > NLEN * BASEBITS as usize {
            return Err(DoubleWidthError::QuotientOverflow);
        }
        Ok(q.lower())
    }

    fn sign(&self) -> LimbType {
        self.w[DNLEN - 1] >> (LIMB_BITS - 1)
    }
}

impl Normalize for DoubleWidth {
    fn normalize_in_place(&mut self) {
        self.norm();
    }
}

impl Unnormalized<DoubleWidth> {
    pub fn add(mut self, b: &DoubleWidth) -> Self {
        self.get_mut().add_digits(b);
        self
    }

    pub fn sub(mut self, b: &DoubleWidth) -> Self {
        self.get_mut().sub_digits(b);
        self
    }
}

impl fmt::Display for DoubleWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut t = *self;
        t.norm();
        // BASEBITS is a multiple of four, each digit maps to whole nibbles.
        for d in t.w.iter().rev() {
            write!(f, "{:0width$x}", d, width = BASEBITS as usize / 4)?;
        }
        Ok(())
    }
}

#[cfg(test)]
fn test_dbig(seed: LimbType) -> DoubleWidth {
    const MERSENNE_PRIME_13: LimbType = 8191 as LimbType;
    const MERSENNE_PRIME_17: LimbType = 131071 as LimbType;
    let mut w = [0; DNLEN];
    let mut v = seed;
    for d in w.iter_mut() {
        v = v.wrapping_mul(MERSENNE_PRIME_17).wrapping_add(MERSENNE_PRIME_13);
        *d = v & BMASK;
    }
    DoubleWidth::from_digits(w)
}

#[cfg(test)]
fn dbig_to_biguint(v: &DoubleWidth) -> num_bigint::BigUint {
    use num_bigint::BigUint;
    let mut t = *v;
    t.norm();
    let mut r = BigUint::from(0u32);
    for d in t.w.iter().rev() {
        r = (r << BASEBITS) + BigUint::from(*d);
    }
    r
}

#[test]
fn test_dbig_norm_nbits() {
    let mut a = DoubleWidth::zero();
    assert_eq!(a.nbits(), 0);
    a.w[0] = BMASK + 1;
    assert_eq!(a.nbits(), BASEBITS as usize + 1);
    a.norm();
    assert_eq!(a.w[0], 0);
    assert_eq!(a.w[1], 1);

    // The top digit absorbs the final carry without a range check.
    let mut a = DoubleWidth::zero();
    a.w[DNLEN - 2] = BMASK + 1;
    a.norm();
    assert_eq!(a.w[DNLEN - 2], 0);
    assert_eq!(a.w[DNLEN - 1], 1);

    let a = DoubleWidth::zero().sub(&DoubleWidth::from_big(&Big::one())).normalize();
    assert_eq!(a.sign(), 1);
}

#[test]
fn test_dbig_comp() {
    let a = test_dbig(1);
    let b = test_dbig(2);
    let expected = dbig_to_biguint(&a).cmp(&dbig_to_biguint(&b));
    assert_eq!(DoubleWidth::comp(&a, &b), expected);
    assert_eq!(DoubleWidth::comp(&b, &a), expected.reverse());
    assert_eq!(DoubleWidth::comp(&a, &a), Ordering::Equal);

    let neg = DoubleWidth::zero().sub(&a).normalize();
    assert_eq!(DoubleWidth::comp(&neg, &DoubleWidth::zero()), Ordering::Less);
}

#[test]
fn test_dbig_from_big() {
    use super::big_impl::P_TBITS;
    use super::test_helpers::reference::big_to_biguint;

    let mut b = Big::zero();
    b.set_digit(0, 7);
    b.set_digit(NLEN - 1, (3 << BASEBITS) | 5);
    let d = DoubleWidth::from_big(&b);
    assert_eq!(d.w[NLEN - 1], 5);
    assert_eq!(d.w[NLEN], 3);

    let mut b = Big::from_limb(0x1234);
    b.set_digit(NLEN - 1, 1 << (P_TBITS - 1));
    let d = DoubleWidth::from_big(&b);
    assert_eq!(dbig_to_biguint(&d), big_to_biguint(&b));
    assert_eq!(d.lower(), b);
}

#[test]
fn test_dbig_shifts() {
    for seed in 0..8 {
        let a = test_dbig(seed);
        let reference = dbig_to_biguint(&a);
        for k in [1, 3, BASEBITS as usize, BASEBITS as usize + 7, 3 * BASEBITS as usize - 1] {
            let mut b = a;
            b.shr(k);
            assert_eq!(dbig_to_biguint(&b), &reference >> k);
            b.shl(k);
            assert_eq!(dbig_to_biguint(&b), (&reference >> k) << k);
        }
    }
}

#[test]
fn test_dbig_split_at() {
    use super::big_impl::BIGBITS;
    use super::test_helpers::reference::big_to_biguint;
    use num_bigint::BigUint;

    for seed in 0..8 {
        let mut a = test_dbig(seed);
        // The part above the split must fit a block.
        a.w[DNLEN - 1] &= 0x7f;
        let reference = dbig_to_biguint(&a);
        let mut lo = a;
        let hi = lo.split_at(BIGBITS);
        // The upper part may exceed BIGBITS, compare digit-wise.
        let hi_ref = &reference >> BIGBITS;
        let mut hi_val = BigUint::from(0u32);
        for i in (0..NLEN).rev() {
            hi_val = (hi_val << BASEBITS) + BigUint::from(hi.digit(i));
        }
        assert_eq!(hi_val, hi_ref);
        assert_eq!(
            big_to_biguint(&lo.lower()),
            &reference % (BigUint::from(1u32) << BIGBITS)
        );
        assert_eq!(dbig_to_biguint(&lo), &reference % (BigUint::from(1u32) << BIGBITS));
    }
}

#[test]
fn test_dbig_reduce_modulo_divide_by() {
    use super::test_helpers::reference::{big_from_biguint, big_to_biguint};
    use num_bigint::BigUint;

    let m = big_from_biguint(&BigUint::from(1000000007u64));
    let a = big_from_biguint(&BigUint::from(999999999999u64));
    let d = Big::mul(&a, &a);
    let r = d.reduce_modulo(&m).unwrap();
    assert_eq!(big_to_biguint(&r), BigUint::from(49014001u64));
    assert_eq!(
        big_to_biguint(&r),
        BigUint::from(999999999999u64) * BigUint::from(999999999999u64)
            % BigUint::from(1000000007u64)
    );

    let q = d.divide_by(&m).unwrap();
    assert_eq!(
        big_to_biguint(&q),
        BigUint::from(999999999998000000000001u128) / BigUint::from(1000000007u64)
    );

    // Large moduli, with random dividends below modulus * 2^(NLEN * BASEBITS).
    for seed in 0..8 {
        let mut a = test_dbig(seed);
        let mut m = test_dbig(seed + 100).lower();
        m.set_digit(NLEN - 1, m.digit(NLEN - 1) & ((1 << (BASEBITS - 1)) - 1));
        // Moduli reach into the excess region, compare without truncating to BIGBITS.
        let m_ref = dbig_to_biguint(&DoubleWidth::from_big(&m));
        a.split_at(NLEN * BASEBITS as usize - 1);
        let x_ref = dbig_to_biguint(&a);
        let r = a.reduce_modulo(&m).unwrap();
        assert_eq!(dbig_to_biguint(&DoubleWidth::from_big(&r)), &x_ref % &m_ref);
        let q = a.divide_by(&m).unwrap();
        assert_eq!(dbig_to_biguint(&DoubleWidth::from_big(&q)), &x_ref / &m_ref);
    }

    assert_eq!(d.reduce_modulo(&Big::zero()), Err(DoubleWidthError::ZeroModulus));
    assert_eq!(d.divide_by(&Big::zero()), Err(DoubleWidthError::ZeroModulus));
    assert_eq!(
        test_dbig(3).divide_by(&Big::one()),
        Err(DoubleWidthError::QuotientOverflow)
    );
}

#[test]
fn test_dbig_display() {
    extern crate alloc;
    use alloc::format;

    let d = DoubleWidth::from_big(&Big::from_limb(0xfe));
    let s = format!("{}", d);
    assert!(s.ends_with("fe"));
    assert!(s[..s.len() - 2].chars().all(|c| c == '0'));
}
