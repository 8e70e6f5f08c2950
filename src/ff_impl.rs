//! Finite field values: integers spanning a chain of limb blocks.
//!
//! An [`FfValue`] holds its blocks least significant first, each block contributing
//! [`BIGBITS`] nominal bits. Carries between blocks are deferred: a block's normalization
//! reports what spilled over its [`BIGBITS`] bits and the chain normalization [`rnorm()`] clears
//! that from the block's excess region and forwards it into the next block's lowest digit.
//!
//! Most operations expect normalized operands, i.e. every block normalized with an empty excess
//! region, except for the most significant block, which may carry some excess.

extern crate alloc;

use alloc::string::{String, ToString as _};
use alloc::vec;
use alloc::vec::Vec;
use core::cmp::Ordering;
use core::fmt::{self, Write as _};

use rand_core::RngCore;
#[cfg(feature = "zeroize")]
use zeroize::Zeroize;

use super::big_impl::{ordering_from_choices, Big, BIGBITS, MODBYTES, P_TBITS};
use super::dbig_impl::DoubleWidthError;
use super::hexstr::{self, BytesFromHexStrError};
use super::limb::{LimbChoice, LimbType};
use super::unnormalized::{Normalize, Unnormalized};

#[derive(Clone, Copy, PartialEq, Eq, Debug, thiserror::Error)]
pub enum FfError {
    #[error("operand block counts differ")]
    LengthMismatch,
    #[error("block count is not a power of two")]
    InvalidLength,
    #[error("modulus is even")]
    EvenModulus,
    #[error("zero modulus")]
    ZeroModulus,
    #[error("byte buffer length does not match the block count")]
    InvalidByteLength,
    #[error("value is not invertible")]
    NotInvertible,
    #[error(transparent)]
    HexStr(#[from] BytesFromHexStrError),
    #[error(transparent)]
    DoubleWidth(#[from] DoubleWidthError),
}

#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "zeroize", derive(Zeroize))]
pub struct FfValue {
    pub(crate) v: Vec<Big>,
}

/// Chain normalization.
///
/// Normalizes each block and moves the carry out of its excess region into the next block. The
/// carry out of the last block stays in its excess region, unless `truncate` is set, in which
/// case it gets dropped and the result is reduced modulo `2^(v.len() * BIGBITS)`.
pub(crate) fn rnorm(v: &mut [Big], truncate: bool) {
    let n = v.len();
    for i in 0..n - 1 {
        let carry = v[i].norm();
        v[i].xor_top(carry << P_TBITS);
        v[i + 1].inc_top(carry);
    }
    let carry = v[n - 1].norm();
    if truncate {
        v[n - 1].xor_top(carry << P_TBITS);
    }
}

pub(crate) fn blocks_add(a: &mut [Big], b: &[Big]) {
    debug_assert_eq!(a.len(), b.len());
    for (a, b) in a.iter_mut().zip(b.iter()) {
        a.add_digits(b);
    }
}

pub(crate) fn blocks_sub(a: &mut [Big], b: &[Big]) {
    debug_assert_eq!(a.len(), b.len());
    for (a, b) in a.iter_mut().zip(b.iter()) {
        a.sub_digits(b);
    }
}

pub(crate) fn blocks_rsub(a: &mut [Big], b: &[Big]) {
    debug_assert_eq!(a.len(), b.len());
    for (a, b) in a.iter_mut().zip(b.iter()) {
        a.rsub_digits(b);
    }
}

// Shift left by one bit. All blocks but the last must have an empty excess region.
pub(crate) fn blocks_shl1(v: &mut [Big]) {
    let n = v.len();
    let mut delay_carry = 0;
    for b in v[..n - 1].iter_mut() {
        let carry = b.fshl(1);
        b.inc(delay_carry);
        b.xor_top(carry << P_TBITS);
        delay_carry = carry;
    }
    v[n - 1].fshl(1);
    v[n - 1].inc(delay_carry);
}

// Shift right by one bit. All blocks but the last must have an empty excess region.
pub(crate) fn blocks_shr1(v: &mut [Big]) {
    let n = v.len();
    for i in 0..n - 1 {
        v[i].fshr(1);
        let carry = v[i + 1].parity();
        v[i].xor_top(carry << (P_TBITS - 1));
    }
    v[n - 1].fshr(1);
}

pub(crate) fn blocks_shlw(v: &mut [Big], k: usize) {
    let k = k.min(v.len());
    v.copy_within(..v.len() - k, k);
    v[..k].fill(Big::zero());
}

pub(crate) fn blocks_shrw(v: &mut [Big], k: usize) {
    let n = v.len();
    let k = k.min(n);
    v.copy_within(k.., 0);
    v[n - k..].fill(Big::zero());
}

pub(crate) fn blocks_cmove(a: &mut [Big], b: &[Big], c: LimbChoice) {
    for (i, (a, b)) in a.iter_mut().zip(b.iter()).enumerate() {
        trace_access!("cmove", i);
        a.cmove(b, c);
    }
}

pub(crate) fn blocks_cswap(a: &mut [Big], b: &mut [Big], c: LimbChoice) {
    for (i, (a, b)) in a.iter_mut().zip(b.iter_mut()).enumerate() {
        trace_access!("cswap", i);
        a.cswap(b, c);
    }
}

// Constant-time bit length of a normalized, non-negative chain.
pub(crate) fn blocks_nbits(v: &[Big]) -> usize {
    let mut r = 0;
    for (i, b) in v.iter().enumerate() {
        let nz = !b.ct_is_zero();
        r = nz.select_usize(r, i * BIGBITS + b.nbits());
    }
    r
}

// Constant-time comparison of normalized chains, returns "less than" and "greater than".
pub(crate) fn blocks_ct_lt_gt(a: &[Big], b: &[Big]) -> (LimbChoice, LimbChoice) {
    debug_assert_eq!(a.len(), b.len());
    let mut lt = LimbChoice::from(0);
    let mut gt = LimbChoice::from(0);
    for (a, b) in a.iter().zip(b.iter()).rev() {
        let (l, g) = Big::ct_lt_gt(a, b);
        let undecided = !(lt | gt);
        lt |= undecided & l;
        gt |= undecided & g;
    }
    (lt, gt)
}

// Sign of a chain normalized without truncation.
pub(crate) fn blocks_sign(v: &[Big]) -> LimbType {
    v[v.len() - 1].sign()
}

impl FfValue {
    /// Construct a zero value of `n` blocks.
    ///
    /// Panics if `n` is zero.
    pub fn new(n: usize) -> Self {
        assert!(n > 0);
        Self {
            v: vec![Big::zero(); n],
        }
    }

    pub fn from_limb(n: usize, m: LimbType) -> Self {
        let mut r = Self::new(n);
        r.set(m);
        r
    }

    pub fn one(n: usize) -> Self {
        Self::from_limb(n, 1)
    }

    /// Construct a value from its blocks, least significant first.
    ///
    /// Panics if `blocks` is empty.
    pub fn from_blocks(blocks: Vec<Big>) -> Self {
        assert!(!blocks.is_empty());
        Self { v: blocks }
    }

    pub fn blocks(&self) -> &[Big] {
        &self.v
    }

    /// The number of blocks.
    pub fn len(&self) -> usize {
        self.v.len()
    }

    pub fn set(&mut self, m: LimbType) {
        self.v.fill(Big::zero());
        self.v[0] = Big::from_limb(m);
    }

    pub fn set_zero(&mut self) {
        self.v.fill(Big::zero());
    }

    pub fn set_one(&mut self) {
        self.set(1);
    }

    pub fn is_zero(&self) -> bool {
        let mut acc = LimbChoice::from(1);
        for b in self.v.iter() {
            acc &= b.ct_is_zero();
        }
        acc.unwrap() != 0
    }

    pub fn is_one(&self) -> bool {
        self.v[0].is_one() && self.v[1..].iter().all(|b| b.is_zero())
    }

    /// Normalize the block chain, keeping the final carry in the top block.
    pub fn norm(&mut self) {
        rnorm(&mut self.v, false);
    }

    /// A double length copy shifted up by [`len()`](Self::len) blocks.
    pub fn to_double_shifted(&self) -> FfValue {
        let mut v = vec![Big::zero(); self.v.len()];
        v.extend_from_slice(&self.v);
        Self { v }
    }

    /// A zero extended double length copy.
    pub fn to_double(&self) -> FfValue {
        let mut v = self.v.clone();
        v.resize(2 * self.v.len(), Big::zero());
        Self { v }
    }

    /// The upper half of an even length value.
    pub fn upper_half(&self) -> FfValue {
        debug_assert_eq!(self.v.len() % 2, 0);
        Self {
            v: self.v[self.v.len() / 2..].to_vec(),
        }
    }

    /// The lower half of an even length value.
    pub fn lower_half(&self) -> FfValue {
        debug_assert_eq!(self.v.len() % 2, 0);
        Self {
            v: self.v[..self.v.len() / 2].to_vec(),
        }
    }

    pub(crate) fn check_len(&self, b: &FfValue) -> Result<(), FfError> {
        if self.v.len() != b.v.len() {
            return Err(FfError::LengthMismatch);
        }
        Ok(())
    }

    pub fn add(mut self, b: &FfValue) -> Result<Unnormalized<FfValue>, FfError> {
        self.check_len(b)?;
        blocks_add(&mut self.v, &b.v);
        Ok(Unnormalized::new(self))
    }

    pub fn sub(mut self, b: &FfValue) -> Result<Unnormalized<FfValue>, FfError> {
        self.check_len(b)?;
        blocks_sub(&mut self.v, &b.v);
        Ok(Unnormalized::new(self))
    }

    /// Compute `b - self`.
    pub fn rsub(mut self, b: &FfValue) -> Result<Unnormalized<FfValue>, FfError> {
        self.check_len(b)?;
        blocks_rsub(&mut self.v, &b.v);
        Ok(Unnormalized::new(self))
    }

    pub fn inc(&mut self, m: LimbType) {
        self.v[0].inc(m);
        self.norm();
    }

    pub fn dec(&mut self, m: LimbType) {
        self.v[0].dec(m);
        self.norm();
    }

    /// Shift left by one bit.
    pub fn shl(&mut self) {
        blocks_shl1(&mut self.v);
    }

    /// Shift right by one bit.
    pub fn shr(&mut self) {
        blocks_shr1(&mut self.v);
    }

    /// Shift left by `k` whole blocks, dropping what moves past the top.
    pub fn shlw(&mut self, k: usize) {
        blocks_shlw(&mut self.v, k);
    }

    /// Shift right by `k` whole blocks.
    pub fn shrw(&mut self, k: usize) {
        blocks_shrw(&mut self.v, k);
    }

    /// Reduce modulo `2^(k * BIGBITS)` by clearing all blocks from index `k` on.
    pub fn mod2m(&mut self, k: usize) {
        let k = k.min(self.v.len());
        self.v[k..].fill(Big::zero());
    }

    /// Compare two normalized values, in constant time.
    pub fn compare(&self, b: &FfValue) -> Result<Ordering, FfError> {
        self.check_len(b)?;
        let (lt, gt) = blocks_ct_lt_gt(&self.v, &b.v);
        Ok(ordering_from_choices(lt, gt))
    }

    pub fn parity(&self) -> LimbType {
        self.v[0].parity()
    }

    pub fn last_bits(&self, m: u32) -> LimbType {
        self.v[0].last_bits(m)
    }

    /// Bit length of a normalized value, zero for zero.
    pub fn bit_length(&self) -> usize {
        blocks_nbits(&self.v)
    }

    pub fn bit(&self, i: usize) -> LimbType {
        self.v[i / BIGBITS].bit(i % BIGBITS)
    }

    /// Serialize to `len() * MODBYTES` big endian bytes, most significant block first.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; self.v.len() * MODBYTES];
        for (chunk, b) in bytes.chunks_exact_mut(MODBYTES).rev().zip(self.v.iter()) {
            let mut buf = [0u8; MODBYTES];
            b.to_bytes(&mut buf);
            chunk.copy_from_slice(&buf);
        }
        bytes
    }

    pub fn from_bytes(n: usize, bytes: &[u8]) -> Result<FfValue, FfError> {
        if n == 0 || bytes.len() != n * MODBYTES {
            return Err(FfError::InvalidByteLength);
        }
        let mut r = Self::new(n);
        for (b, chunk) in r.v.iter_mut().zip(bytes.chunks_exact(MODBYTES).rev()) {
            let chunk = <&[u8; MODBYTES]>::try_from(chunk).map_err(|_| FfError::InvalidByteLength)?;
            *b = Big::from_bytes(chunk);
        }
        Ok(r)
    }

    /// Hexadecimal representation, most significant nibble first and without leading zeros.
    ///
    /// Zero renders as `"0"`.
    pub fn to_hex(&self) -> String {
        self.to_string()
    }

    pub fn from_hex(n: usize, s: &str) -> Result<FfValue, FfError> {
        let mut bytes = vec![0u8; n * MODBYTES];
        hexstr::be_bytes_from_hexstr_to(s, &mut bytes)?;
        Self::from_bytes(n, &bytes)
    }

    /// Draw a random `n` block value with its top bit set.
    pub fn random<R: RngCore + ?Sized>(n: usize, rng: &mut R) -> FfValue {
        let mut r = Self::new(n);
        for b in r.v.iter_mut() {
            *b = Big::random(rng);
        }
        while r.v[n - 1].nbits() < BIGBITS {
            r.v[n - 1] = Big::random(rng);
        }
        r
    }

    /// Draw a random value in `[0, p)`.
    ///
    /// Reduces twice as many random bits as `p` has, which keeps the bias negligible.
    pub fn random_num<R: RngCore + ?Sized>(p: &FfValue, rng: &mut R) -> Result<FfValue, FfError> {
        let mut d = Self::new(2 * p.len());
        for b in d.v.iter_mut() {
            *b = Big::random(rng);
        }
        d.dmod(p)
    }
}

impl Normalize for FfValue {
    fn normalize_in_place(&mut self) {
        self.norm();
    }
}

impl Unnormalized<FfValue> {
    pub fn add(mut self, b: &FfValue) -> Result<Self, FfError> {
        let a = self.get_mut();
        a.check_len(b)?;
        blocks_add(&mut a.v, &b.v);
        Ok(self)
    }

    pub fn sub(mut self, b: &FfValue) -> Result<Self, FfError> {
        let a = self.get_mut();
        a.check_len(b)?;
        blocks_sub(&mut a.v, &b.v);
        Ok(self)
    }
}

impl fmt::Display for FfValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.to_bytes();
        let total = 2 * bytes.len();
        // Any excess in the top block is beyond the byte representation.
        let nibbles = ((self.bit_length() + 3) / 4).min(total);
        if nibbles == 0 {
            return f.write_char('0');
        }
        for j in total - nibbles..total {
            let b = bytes[j / 2];
            let nibble = if j % 2 == 0 { b >> 4 } else { b & 0xf };
            f.write_char(hexstr::nibble_to_hexchar(nibble))?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn test_ff(n: usize, seed: u64) -> FfValue {
    use rand::{RngCore as _, SeedableRng as _};
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let mut r = FfValue::new(n);
    for b in r.v.iter_mut() {
        let mut buf = [0u8; MODBYTES];
        rng.fill_bytes(&mut buf);
        *b = Big::from_bytes(&buf);
    }
    r
}

#[test]
fn test_ff_rnorm() {
    use super::big_impl::{BMASK, NLEN};
    use super::test_helpers::reference::ff_to_biguint;
    use num_bigint::BigUint;

    // A carry out of the lower block's BIGBITS moves into the next block.
    let mut a = FfValue::new(2);
    a.v[0].set_digit(NLEN - 1, (3 << P_TBITS) | 1);
    a.v[0].set_digit(0, BMASK + 2);
    a.norm();
    assert_eq!(a.v[0].digit(0), 1);
    assert_eq!(a.v[0].digit(1), 1);
    assert_eq!(a.v[0].digit(NLEN - 1), 1);
    assert_eq!(a.v[1].digit(0), 3);

    // The final carry stays in place unless truncating.
    let mut a = FfValue::new(2);
    a.v[1].set_digit(NLEN - 1, 1 << P_TBITS);
    let mut b = a.clone();
    a.norm();
    assert_eq!(a.v[1].digit(NLEN - 1), 1 << P_TBITS);
    rnorm(&mut b.v, true);
    assert!(b.is_zero());

    // Negative intermediate values wrap around when truncating.
    let mut a = FfValue::new(2);
    a.v[0].dec(1);
    rnorm(&mut a.v, true);
    assert_eq!(
        ff_to_biguint(&a),
        (BigUint::from(1u32) << (2 * BIGBITS)) - BigUint::from(1u32)
    );
}

#[test]
fn test_ff_add_sub() {
    use super::test_helpers::reference::ff_to_biguint;
    use num_bigint::BigUint;

    for n in [1, 2, 3, 4] {
        let mut a = test_ff(n, 1);
        let b = test_ff(n, 2);
        a.v[n - 1].truncate();
        let low = a.v[n - 1].digit(0);
        a.v[n - 1].set_digit(0, low | 1);
        let (a_ref, b_ref) = (ff_to_biguint(&a), ff_to_biguint(&b));

        let s = a.clone().add(&b).unwrap().normalize();
        // The sum's top carry lives in the top block's excess, beyond the bytes.
        let m = BigUint::from(1u32) << (n * BIGBITS);
        assert_eq!(ff_to_biguint(&s), (&a_ref + &b_ref) % &m);

        let (big, small) = if a_ref >= b_ref { (&a, &b) } else { (&b, &a) };
        let d = big.clone().sub(small).unwrap().normalize();
        assert_eq!(ff_to_biguint(&d), ff_to_biguint(big) - ff_to_biguint(small));
        let d2 = small.clone().rsub(big).unwrap().normalize();
        assert_eq!(d, d2);

        let chained = big.clone().add(&b).unwrap().sub(&b).unwrap().sub(small).unwrap().normalize();
        assert_eq!(chained, d);
    }

    assert_eq!(
        FfValue::new(1).add(&FfValue::new(2)).err(),
        Some(FfError::LengthMismatch)
    );
}

#[test]
fn test_ff_shifts() {
    use super::test_helpers::reference::ff_to_biguint;
    use num_bigint::BigUint;

    for n in [1, 2, 4] {
        let mut a = test_ff(n, 3);
        a.v[n - 1].truncate();
        a.v[n - 1].set_digit(super::big_impl::NLEN - 1, 0);
        let a_ref = ff_to_biguint(&a);

        let mut b = a.clone();
        b.shl();
        assert_eq!(ff_to_biguint(&b), &a_ref << 1u32);
        b.shr();
        assert_eq!(b, a);

        let mut b = a.clone();
        b.shr();
        assert_eq!(ff_to_biguint(&b), &a_ref >> 1u32);

        let mut b = a.clone();
        b.shlw(1);
        let m = BigUint::from(1u32) << (n * BIGBITS);
        assert_eq!(ff_to_biguint(&b), (&a_ref << BIGBITS) % &m);
        b.shrw(1);
        let mut c = a.clone();
        c.mod2m(n - 1);
        assert_eq!(b, c);
    }

    let a = test_ff(2, 4);
    assert_eq!(a.to_double_shifted().upper_half(), a);
    assert_eq!(a.to_double().lower_half(), a);
    assert!(a.to_double().upper_half().is_zero());
}

#[test]
fn test_ff_compare_bits() {
    let a = FfValue::from_limb(2, 5);
    let mut b = FfValue::from_limb(2, 5);
    assert_eq!(a.compare(&b).unwrap(), Ordering::Equal);
    b.v[1] = Big::one();
    assert_eq!(a.compare(&b).unwrap(), Ordering::Less);
    assert_eq!(b.compare(&a).unwrap(), Ordering::Greater);
    assert_eq!(a.compare(&FfValue::new(1)), Err(FfError::LengthMismatch));

    assert_eq!(a.parity(), 1);
    assert_eq!(a.last_bits(3), 5);
    assert_eq!(a.bit_length(), 3);
    assert_eq!(b.bit_length(), BIGBITS + 1);
    assert_eq!(b.bit(BIGBITS), 1);
    assert_eq!(b.bit(BIGBITS - 1), 0);
    assert_eq!(FfValue::new(3).bit_length(), 0);

    let mut c = FfValue::new(2);
    c.inc(7);
    c.dec(8);
    // -1 normalizes to a negative top block.
    assert_eq!(blocks_sign(&c.v), 1);
    c.inc(1);
    assert!(c.is_zero());
}

#[test]
fn test_ff_bytes_hex() {
    let a = test_ff(3, 5);
    let bytes = a.to_bytes();
    assert_eq!(bytes.len(), 3 * MODBYTES);
    assert_eq!(FfValue::from_bytes(3, &bytes).unwrap(), a);
    assert_eq!(FfValue::from_bytes(2, &bytes), Err(FfError::InvalidByteLength));

    let hex = a.to_hex();
    assert_eq!(FfValue::from_hex(3, &hex).unwrap(), a);
    assert_eq!(hex.len(), (a.bit_length() + 3) / 4);

    assert_eq!(FfValue::new(2).to_hex(), "0");
    assert_eq!(FfValue::from_limb(2, 0x1a2).to_hex(), "1a2");
    assert_eq!(FfValue::from_hex(2, "1A2").unwrap(), FfValue::from_limb(2, 0x1a2));
    assert_eq!(
        FfValue::from_hex(1, "z"),
        Err(FfError::HexStr(BytesFromHexStrError::InvalidHexChar))
    );
    let long = "f".repeat(2 * MODBYTES + 1);
    assert_eq!(
        FfValue::from_hex(1, &long),
        Err(FfError::HexStr(BytesFromHexStrError::InvalidHexStrLen))
    );
}

#[test]
fn test_ff_random() {
    use rand::SeedableRng as _;
    let mut rng = rand::rngs::StdRng::seed_from_u64(7);

    let r = FfValue::random(2, &mut rng);
    assert_eq!(r.bit_length(), 2 * BIGBITS);

    let p = FfValue::from_limb(2, 1000003);
    for _ in 0..8 {
        let x = FfValue::random_num(&p, &mut rng).unwrap();
        assert_eq!(x.compare(&p).unwrap(), Ordering::Less);
    }
}
