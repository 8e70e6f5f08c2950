//! Modular reduction and Montgomery arithmetic on finite field values.
//!
//! Single block moduli take a fast path through [`Big::monty()`] with the Montgomery radix
//! `2^(NLEN * BASEBITS)`. Longer moduli of `n` blocks use the radix `2^(n * BIGBITS)` and the
//! Karatsuba based reduction [`FfValue::reduce()`]. The two never get mixed: the block count of
//! the modulus determines the radix for [`FfValue::nres()`] and [`FfValue::redc()`] alike.

extern crate alloc;

use alloc::vec;
use alloc::vec::Vec;

use super::big_impl::{Big, BASEBITS, BIGBITS, BMASK, NLEN, P_FEXCESS};
use super::dbig_impl::DoubleWidth;
use super::ff_impl::{
    blocks_add, blocks_cmove, blocks_nbits, blocks_shl1, blocks_shlw, blocks_shr1, blocks_sign,
    blocks_sub, rnorm, FfError, FfValue,
};
use super::karatsuba_impl::{check_pow2_len, karmul_lower, karmul_upper};
use super::limb::{LimbChoice, LimbType};

/// Subtract `m` from `x` unless the result would be negative.
///
/// Runs in constant time.
pub(crate) fn blocks_cond_sub(x: &mut [Big], m: &[Big], scratch: &mut [Big]) {
    trace_access!("cond_sub", x.len());
    scratch.copy_from_slice(x);
    blocks_sub(scratch, m);
    rnorm(scratch, false);
    let negative = LimbChoice::from(blocks_sign(scratch));
    blocks_cmove(x, scratch, !negative);
}

/// Reduce a normalized, non-negative `x` modulo a non-zero `m` of the same length.
///
/// Aligns the modulus' top bit with the top of `x`'s capacity and trial subtracts it on the way
/// down. The number of rounds only depends on the bit length of `m`, and each round is constant
/// time.
fn blocks_scan_mod(x: &mut [Big], m: &[Big]) {
    let len = x.len();
    debug_assert_eq!(m.len(), len);
    // The top block extends into its excess region, but stays clear of the sign bit.
    let width = (len - 1) * BIGBITS + NLEN * BASEBITS as usize;
    let nbits = blocks_nbits(m);
    let k = width - nbits;

    // Whole block moves must keep the modulus' top block inside the chain, the top block's
    // excess region only gets reached bitwise.
    let words = (k / BIGBITS).min(len.saturating_sub((nbits + BIGBITS - 1) / BIGBITS));
    let mut ms = m.to_vec();
    blocks_shlw(&mut ms, words);
    for _ in 0..k - words * BIGBITS {
        blocks_shl1(&mut ms);
    }

    let mut scratch = vec![Big::zero(); len];
    for _ in 0..=k {
        blocks_cond_sub(x, &ms, &mut scratch);
        blocks_shr1(&mut ms);
    }
}

// -m^-1 mod 2^BASEBITS, from m^-1 mod 2^(n * BIGBITS).
fn monty_constant(nd: &FfValue) -> LimbType {
    (0 as LimbType).wrapping_sub(nd.v[0].digit(0)) & BMASK
}

// Whether the product of two values with the given top blocks could exceed the headroom.
fn pexceed(a: &Big, b: &Big) -> bool {
    let ea = a.excess() as u128 + 1;
    let eb = b.excess() as u128 + 1;
    ea * eb > P_FEXCESS as u128
}

fn sexceed(a: &Big) -> bool {
    pexceed(a, a)
}

fn normalized_modulus(p: &FfValue) -> Result<Vec<Big>, FfError> {
    let mut m = p.v.clone();
    rnorm(&mut m, false);
    if blocks_nbits(&m) == 0 {
        return Err(FfError::ZeroModulus);
    }
    Ok(m)
}

impl FfValue {
    /// Reduce modulo `p` in place.
    ///
    /// `self` must be non-negative and have the same length as `p`.
    pub fn modulo(&mut self, p: &FfValue) -> Result<(), FfError> {
        self.check_len(p)?;
        let m = normalized_modulus(p)?;
        self.norm();
        blocks_scan_mod(&mut self.v, &m);
        Ok(())
    }

    /// Reduce a double length value modulo `p`, returning a value of `p`'s length.
    ///
    /// Correct for any non-negative double length input.
    pub fn dmod(&self, p: &FfValue) -> Result<FfValue, FfError> {
        let n = p.len();
        if self.len() != 2 * n {
            return Err(FfError::LengthMismatch);
        }
        let mut m = normalized_modulus(p)?;
        m.resize(2 * n, Big::zero());
        rnorm(&mut m, false);
        let mut x = self.clone();
        x.norm();
        blocks_scan_mod(&mut x.v, &m);
        x.v.truncate(n);
        Ok(x)
    }

    /// Montgomery reduction of a double length value.
    ///
    /// Computes `self / R mod p` for the Montgomery radix `R` associated with `p`'s length,
    /// where `nd` is `p^-1 mod 2^(n * BIGBITS)` as obtained from [`invmod2m()`](Self::invmod2m).
    /// The result is fully reduced if `self < p * R`.
    ///
    /// Runs in constant time.
    pub fn reduce(&self, p: &FfValue, nd: &FfValue) -> Result<FfValue, FfError> {
        let n = p.len();
        if self.len() != 2 * n || nd.len() != n {
            return Err(FfError::LengthMismatch);
        }

        if n == 1 {
            let mut d = DoubleWidth::from_big(&self.v[1]);
            d.shl(BIGBITS);
            let d = d.add(&DoubleWidth::from_big(&self.v[0])).normalize();
            let r = Big::monty(&p.v[0], monty_constant(nd), &d);
            return Ok(FfValue::from_blocks(vec![r]));
        }

        check_pow2_len(n)?;
        let mut t = vec![Big::zero(); 2 * n];
        let mut m = vec![Big::zero(); n];
        let mut z = self.v.clone();
        rnorm(&mut z, false);
        let mut r = z[n..].to_vec();
        // m = self * p^-1 mod R, so that p * m matches self on the lower half.
        karmul_lower(&mut m, &z[..n], &nd.v, &mut t);
        karmul_upper(&mut z, &p.v, &m, &mut t);

        blocks_add(&mut r, &p.v);
        blocks_sub(&mut r, &z[n..]);
        rnorm(&mut r, false);
        blocks_cond_sub(&mut r, &p.v, &mut t[..n]);
        Ok(FfValue { v: r })
    }

    /// Convert into Montgomery form.
    pub fn nres(&mut self, p: &FfValue) -> Result<(), FfError> {
        self.check_len(p)?;
        if self.len() == 1 {
            let mut d = DoubleWidth::from_big(&self.v[0]);
            d.shl(NLEN * BASEBITS as usize);
            self.v[0] = d.reduce_modulo(&p.v[0])?;
        } else {
            *self = self.to_double_shifted().dmod(p)?;
        }
        Ok(())
    }

    /// Convert back from Montgomery form, the result is fully reduced.
    pub fn redc(&mut self, p: &FfValue, nd: &FfValue) -> Result<(), FfError> {
        self.check_len(p)?;
        if self.len() == 1 {
            let d = DoubleWidth::from_big(&self.v[0]);
            self.v[0] = Big::monty(&p.v[0], monty_constant(nd), &d);
        } else {
            self.modulo(p)?;
            *self = self.to_double().reduce(p, nd)?;
        }
        Ok(())
    }

    /// Montgomery multiplication `self = self * y / R mod p`.
    pub fn modmul(&mut self, y: &FfValue, p: &FfValue, nd: &FfValue) -> Result<(), FfError> {
        self.check_len(y)?;
        self.check_len(p)?;
        let n = self.len();
        trace_access!("modmul", n);
        if pexceed(&self.v[n - 1], &y.v[n - 1]) {
            trace_access!("pexceed", n - 1);
            self.modulo(p)?;
        }
        if n == 1 {
            let d = Big::mul(&self.v[0], &y.v[0]);
            self.v[0] = Big::monty(&p.v[0], monty_constant(nd), &d);
        } else {
            *self = self.mul(y)?.reduce(p, nd)?;
        }
        Ok(())
    }

    /// Montgomery squaring `self = self^2 / R mod p`.
    pub fn modsqr(&mut self, p: &FfValue, nd: &FfValue) -> Result<(), FfError> {
        self.check_len(p)?;
        let n = self.len();
        trace_access!("modsqr", n);
        if sexceed(&self.v[n - 1]) {
            trace_access!("sexceed", n - 1);
            self.modulo(p)?;
        }
        if n == 1 {
            let d = Big::sqr(&self.v[0]);
            self.v[0] = Big::monty(&p.v[0], monty_constant(nd), &d);
        } else {
            *self = self.sqr()?.reduce(p, nd)?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn test_modulus(n: usize, seed: u64) -> FfValue {
    use super::ff_impl::test_ff;
    let mut p = test_ff(n, seed);
    // Odd, with the two topmost bits clear.
    let mut top = p.v[n - 1];
    top.shr(2);
    p.v[n - 1] = top;
    let low = p.v[0].digit(0);
    p.v[0].set_digit(0, low | 1);
    p
}

#[cfg(test)]
fn montgomery_radix(n: usize) -> num_bigint::BigUint {
    use num_bigint::BigUint;
    if n == 1 {
        BigUint::from(1u32) << (NLEN * BASEBITS as usize)
    } else {
        BigUint::from(1u32) << (n * BIGBITS)
    }
}

#[test]
fn test_modulo() {
    use super::ff_impl::test_ff;
    use super::test_helpers::reference::ff_to_biguint;

    for n in [1, 2, 3, 4] {
        let p = test_modulus(n, 10);
        let p_ref = ff_to_biguint(&p);
        for seed in 0..4 {
            let mut x = test_ff(n, seed);
            let x_ref = ff_to_biguint(&x);
            x.modulo(&p).unwrap();
            assert_eq!(ff_to_biguint(&x), &x_ref % &p_ref);
        }

        let small = FfValue::from_limb(n, 1000003);
        let mut x = test_ff(n, 5);
        let x_ref = ff_to_biguint(&x);
        x.modulo(&small).unwrap();
        assert_eq!(ff_to_biguint(&x), &x_ref % num_bigint::BigUint::from(1000003u32));
    }

    let mut x = FfValue::from_limb(2, 5);
    assert_eq!(x.modulo(&FfValue::new(2)), Err(FfError::ZeroModulus));
    assert_eq!(x.modulo(&FfValue::new(1)), Err(FfError::LengthMismatch));
}

#[test]
fn test_modulus_bit_lengths() {
    use super::ff_impl::test_ff;
    use super::test_helpers::reference::{ff_from_biguint, ff_to_biguint};
    use num_bigint::BigUint;

    // Short moduli and moduli just past a block boundary take the longest alignment shifts.
    for n in [1, 2, 3, 4] {
        for bits in [2, 5, 20, 24, 25, 60, 200, 256, 257, 280, 300, 521, 540, 768, 1000] {
            if bits > n * BIGBITS {
                continue;
            }
            let top = BigUint::from(1u32) << (bits - 1);
            let low = ff_to_biguint(&test_ff(n, bits as u64)) % &top;
            let p_ref = (top + low) | BigUint::from(1u32);
            assert_eq!(p_ref.bits(), bits as u64);
            let p = ff_from_biguint(n, &p_ref);

            let mut x = test_ff(n, 7);
            let x_ref = ff_to_biguint(&x);
            x.modulo(&p).unwrap();
            assert_eq!(ff_to_biguint(&x), &x_ref % &p_ref, "n={} bits={}", n, bits);

            let d = test_ff(2 * n, 8);
            let r = d.dmod(&p).unwrap();
            assert_eq!(ff_to_biguint(&r), ff_to_biguint(&d) % &p_ref, "n={} bits={}", n, bits);
        }
    }
}

#[test]
fn test_dmod() {
    use super::ff_impl::test_ff;
    use super::test_helpers::reference::ff_to_biguint;

    for n in [1, 2, 4] {
        let p = test_modulus(n, 20);
        let p_ref = ff_to_biguint(&p);
        for seed in 0..4 {
            // Full width inputs, beyond p * 2^(n * BIGBITS).
            let x = test_ff(2 * n, seed);
            let r = x.dmod(&p).unwrap();
            assert_eq!(r.len(), n);
            assert_eq!(ff_to_biguint(&r), ff_to_biguint(&x) % &p_ref);
        }
    }

    assert_eq!(
        FfValue::new(3).dmod(&FfValue::one(2)),
        Err(FfError::LengthMismatch)
    );
}

#[test]
fn test_nres_redc() {
    use super::test_helpers::reference::ff_to_biguint;

    for n in [1, 2, 4] {
        let p = test_modulus(n, 30);
        let p_ref = ff_to_biguint(&p);
        let mut nd = p.clone();
        nd.invmod2m().unwrap();
        let r = montgomery_radix(n);

        for seed in 0..4 {
            let mut a = super::ff_impl::test_ff(n, seed);
            a.modulo(&p).unwrap();
            let a_ref = ff_to_biguint(&a);

            let mut am = a.clone();
            am.nres(&p).unwrap();
            assert_eq!(ff_to_biguint(&am), &a_ref * &r % &p_ref);
            am.redc(&p, &nd).unwrap();
            assert_eq!(am, a);
        }
    }
}

#[test]
fn test_single_block_agreement() {
    use super::test_helpers::reference::ff_to_biguint;

    // The single block fast path and the Karatsuba path agree on the plain values.
    let p1 = test_modulus(1, 40);
    let mut p2 = FfValue::new(2);
    p2.v[0] = p1.v[0];
    for (p, n) in [(&p1, 1), (&p2, 2)] {
        let mut nd = p.clone();
        nd.invmod2m().unwrap();
        let mut a = FfValue::from_limb(n, 123456789);
        let b = FfValue::from_limb(n, 987654321);
        let mut bm = b.clone();
        bm.nres(p).unwrap();
        a.nres(p).unwrap();
        a.modmul(&bm, p, &nd).unwrap();
        a.redc(p, &nd).unwrap();
        assert_eq!(
            ff_to_biguint(&a),
            num_bigint::BigUint::from(123456789u64 * 987654321u64) % ff_to_biguint(p)
        );
    }
}

#[test]
fn test_modmul_modsqr() {
    use super::ff_impl::test_ff;
    use super::test_helpers::reference::ff_to_biguint;

    for n in [1, 2, 4] {
        let p = test_modulus(n, 50);
        let p_ref = ff_to_biguint(&p);
        let mut nd = p.clone();
        nd.invmod2m().unwrap();

        for seed in 0..4 {
            let mut a = test_ff(n, seed);
            a.modulo(&p).unwrap();
            let mut b = test_ff(n, seed + 10);
            b.modulo(&p).unwrap();
            let expected = ff_to_biguint(&a) * ff_to_biguint(&b) % &p_ref;
            let expected_sqr = ff_to_biguint(&a) * ff_to_biguint(&a) % &p_ref;

            let mut am = a.clone();
            am.nres(&p).unwrap();
            let mut bm = b.clone();
            bm.nres(&p).unwrap();

            let mut sq = am.clone();
            sq.modsqr(&p, &nd).unwrap();
            am.modmul(&bm, &p, &nd).unwrap();
            // Montgomery results stay fully reduced.
            assert_eq!(am.compare(&p).unwrap(), core::cmp::Ordering::Less);
            am.redc(&p, &nd).unwrap();
            assert_eq!(ff_to_biguint(&am), expected);
            sq.redc(&p, &nd).unwrap();
            assert_eq!(ff_to_biguint(&sq), expected_sqr);
        }
    }
}

#[test]
fn test_reduce() {
    use super::ff_impl::test_ff;
    use super::test_helpers::reference::ff_to_biguint;

    let n = 2;
    let p = test_modulus(n, 60);
    let p_ref = ff_to_biguint(&p);
    let mut nd = p.clone();
    nd.invmod2m().unwrap();
    let r = montgomery_radix(n);
    let r_inv = r.modinv(&p_ref).unwrap();

    for seed in 0..4 {
        let mut a = test_ff(n, seed);
        a.modulo(&p).unwrap();
        let mut b = test_ff(n, seed + 1);
        b.modulo(&p).unwrap();
        let t = a.mul(&b).unwrap();
        let red = t.reduce(&p, &nd).unwrap();
        assert_eq!(ff_to_biguint(&red), ff_to_biguint(&t) * &r_inv % &p_ref);
    }
}

#[cfg(test)]
mod proptests {
    use super::super::ff_impl::FfValue;
    use super::super::test_helpers::reference::{ff_from_biguint, ff_to_biguint};
    use num_bigint::BigUint;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn test_modulo_add_identity(
            a in proptest::collection::vec(any::<u8>(), 64),
            b in proptest::collection::vec(any::<u8>(), 64),
            p in proptest::collection::vec(any::<u8>(), 40),
        ) {
            let p = BigUint::from_bytes_be(&p) | BigUint::from(1u32);
            let a = BigUint::from_bytes_be(&a);
            let b = BigUint::from_bytes_be(&b);
            let pf = ff_from_biguint(4, &p);

            // (a + b) mod p
            let sum = ff_from_biguint(4, &a).add(&ff_from_biguint(4, &b)).unwrap().normalize();
            let mut lhs = sum;
            lhs.modulo(&pf).unwrap();

            // ((a mod p) + (b mod p)) mod p
            let mut am = ff_from_biguint(4, &a);
            am.modulo(&pf).unwrap();
            let mut bm = ff_from_biguint(4, &b);
            bm.modulo(&pf).unwrap();
            let mut rhs: FfValue = am.add(&bm).unwrap().normalize();
            rhs.modulo(&pf).unwrap();

            prop_assert_eq!(&lhs, &rhs);
            prop_assert_eq!(ff_to_biguint(&lhs), (a + b) % p);
        }
    }
}
