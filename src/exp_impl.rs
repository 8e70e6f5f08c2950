//! Modular exponentiation.
//!
//! All variants convert into Montgomery form once, work on fully reduced Montgomery
//! representatives and convert back at the end. The inverse of the modulus needed for the
//! Montgomery reduction gets recomputed on every call.
//!
//! Only the ladders [`FfValue::skpow()`] and [`FfValue::skpow_big()`] are safe to use with
//! secret exponents. The others branch on the exponent bits.

use super::big_impl::{Big, BIGBITS, MODBYTES};
use super::ff_impl::{blocks_cswap, FfError, FfValue};
use super::limb::LimbChoice;

// The Montgomery representative of one and the inverse of p modulo its radix.
fn setup(p: &FfValue) -> Result<(FfValue, FfValue), FfError> {
    let mut nd = p.clone();
    nd.invmod2m()?;
    let mut one = FfValue::one(p.len());
    one.nres(p)?;
    Ok((one, nd))
}

impl FfValue {
    /// Replace `self` with `self^e mod p`, in constant time.
    ///
    /// A Montgomery ladder over all `len() * BIGBITS` bits of `e`, which must have the same
    /// length as `p`. Every bit costs exactly one multiplication and one squaring, the bit only
    /// ever steers a conditional swap.
    #[tracing::instrument("FfValue::skpow", skip_all, level = "debug")]
    pub fn skpow(&mut self, e: &FfValue, p: &FfValue) -> Result<(), FfError> {
        self.check_len(p)?;
        e.check_len(p)?;
        let n = p.len();
        let mut e = e.clone();
        e.norm();

        let (mut r0, nd) = setup(p)?;
        let mut r1 = self.clone();
        r1.nres(p)?;

        for i in (0..8 * MODBYTES * n).rev() {
            let b = LimbChoice::from(e.bit(i));
            blocks_cswap(&mut r0.v, &mut r1.v, b);
            r1.modmul(&r0, p, &nd)?;
            r0.modsqr(p, &nd)?;
            blocks_cswap(&mut r0.v, &mut r1.v, b);
        }

        r0.redc(p, &nd)?;
        *self = r0;
        Ok(())
    }

    /// Like [`skpow()`](Self::skpow), for a single block exponent.
    #[tracing::instrument("FfValue::skpow_big", skip_all, level = "debug")]
    pub fn skpow_big(&mut self, e: &Big, p: &FfValue) -> Result<(), FfError> {
        self.check_len(p)?;
        let mut e = *e;
        e.norm();

        let (mut r0, nd) = setup(p)?;
        let mut r1 = self.clone();
        r1.nres(p)?;

        for i in (0..8 * MODBYTES).rev() {
            let b = LimbChoice::from(e.bit(i));
            blocks_cswap(&mut r0.v, &mut r1.v, b);
            r1.modmul(&r0, p, &nd)?;
            r0.modsqr(p, &nd)?;
            blocks_cswap(&mut r0.v, &mut r1.v, b);
        }

        r0.redc(p, &nd)?;
        *self = r0;
        Ok(())
    }

    /// Replace `self` with `self^e mod p` for a small, public `e`.
    ///
    /// Right to left square and multiply, not constant time.
    #[tracing::instrument("FfValue::power", skip_all, level = "debug")]
    pub fn power(&mut self, e: u32, p: &FfValue) -> Result<(), FfError> {
        self.check_len(p)?;
        let (mut r, nd) = setup(p)?;
        let mut w = self.clone();
        w.nres(p)?;

        if e == 2 {
            w.modsqr(p, &nd)?;
            r = w;
        } else {
            let mut e = e;
            loop {
                if e & 1 == 1 {
                    r.modmul(&w, p, &nd)?;
                }
                e >>= 1;
                if e == 0 {
                    break;
                }
                w.modsqr(p, &nd)?;
            }
        }

        r.redc(p, &nd)?;
        *self = r;
        Ok(())
    }

    /// Replace `self` with `self^e mod p` for a public `e` of any length.
    ///
    /// Left to right square and multiply, not constant time.
    #[tracing::instrument("FfValue::pow", skip_all, level = "debug")]
    pub fn pow(&mut self, e: &FfValue, p: &FfValue) -> Result<(), FfError> {
        self.check_len(p)?;
        let mut e = e.clone();
        e.norm();

        let (mut r, nd) = setup(p)?;
        let mut w = self.clone();
        w.nres(p)?;

        for i in (0..e.bit_length()).rev() {
            r.modsqr(p, &nd)?;
            if e.bit(i) == 1 {
                r.modmul(&w, p, &nd)?;
            }
        }

        r.redc(p, &nd)?;
        *self = r;
        Ok(())
    }

    /// Replace `self` with `self^e * y^f mod p`.
    ///
    /// Scans both exponents at once, multiplying by one of the four precomputed products
    /// `1, x, y, x * y` per bit pair. Not constant time.
    #[tracing::instrument("FfValue::pow2", skip_all, level = "debug")]
    pub fn pow2(&mut self, e: &Big, y: &FfValue, f: &Big, p: &FfValue) -> Result<(), FfError> {
        self.check_len(p)?;
        y.check_len(p)?;
        let mut e = *e;
        e.norm();
        let mut f = *f;
        f.norm();

        let (one, nd) = setup(p)?;
        let mut xn = self.clone();
        xn.nres(p)?;
        let mut yn = y.clone();
        yn.nres(p)?;
        let mut xy = xn.clone();
        xy.modmul(&yn, p, &nd)?;
        let table = [one.clone(), xn, yn, xy];

        let mut r = one;
        for i in (0..BIGBITS).rev() {
            r.modsqr(p, &nd)?;
            let idx = e.bit(i) + 2 * f.bit(i);
            r.modmul(&table[idx as usize], p, &nd)?;
        }

        r.redc(p, &nd)?;
        *self = r;
        Ok(())
    }
}

#[cfg(test)]
fn test_base(p: &FfValue, seed: u64) -> FfValue {
    let mut x = super::ff_impl::test_ff(p.len(), seed);
    x.modulo(p).unwrap();
    x
}

#[test]
fn test_skpow_pow() {
    use super::montgomery_impl::test_modulus;
    use super::test_helpers::reference::ff_to_biguint;

    for n in [1, 2, 4] {
        let p = test_modulus(n, 70);
        let p_ref = ff_to_biguint(&p);
        for seed in 0..2 {
            let x = test_base(&p, seed);
            let e = super::ff_impl::test_ff(n, seed + 100);
            let expected = ff_to_biguint(&x).modpow(&ff_to_biguint(&e), &p_ref);

            let mut a = x.clone();
            a.skpow(&e, &p).unwrap();
            assert_eq!(ff_to_biguint(&a), expected);

            let mut b = x.clone();
            b.pow(&e, &p).unwrap();
            assert_eq!(a, b);
        }
    }
}

#[test]
fn test_small_exponents() {
    use super::montgomery_impl::test_modulus;
    use super::test_helpers::reference::ff_to_biguint;
    use num_bigint::BigUint;

    for n in [1, 2] {
        let p = test_modulus(n, 80);
        let p_ref = ff_to_biguint(&p);
        let x = test_base(&p, 3);
        for e in [0u32, 1, 2, 3, 17, 65537] {
            let expected = ff_to_biguint(&x).modpow(&BigUint::from(e), &p_ref);

            let mut a = x.clone();
            a.power(e, &p).unwrap();
            assert_eq!(ff_to_biguint(&a), expected);

            let ef = FfValue::from_limb(n, e as super::limb::LimbType);
            let mut b = x.clone();
            b.pow(&ef, &p).unwrap();
            assert_eq!(a, b);

            let mut c = x.clone();
            c.skpow(&ef, &p).unwrap();
            assert_eq!(a, c);

            let mut d = x.clone();
            d.skpow_big(&Big::from_limb(e as super::limb::LimbType), &p).unwrap();
            assert_eq!(a, d);
        }
    }
}

#[test]
fn test_power_chained_squares() {
    use super::test_helpers::reference::{ff_to_biguint, mersenne};
    use num_bigint::BigUint;

    // 2^127 - 1 exceeds 123456789^4.
    let p = mersenne(1, 127);
    let mut a = FfValue::from_limb(1, 123456789);
    a.power(2, &p).unwrap();
    a.power(2, &p).unwrap();
    assert_eq!(ff_to_biguint(&a), BigUint::from(123456789u64).pow(4));
}

#[test]
fn test_skpow_big() {
    use super::montgomery_impl::test_modulus;
    use super::test_helpers::reference::{big_to_biguint, ff_to_biguint};

    for n in [1, 2] {
        let p = test_modulus(n, 90);
        let p_ref = ff_to_biguint(&p);
        let x = test_base(&p, 4);
        let e = super::ff_impl::test_ff(1, 5).v[0];

        let mut a = x.clone();
        a.skpow_big(&e, &p).unwrap();
        assert_eq!(
            ff_to_biguint(&a),
            ff_to_biguint(&x).modpow(&big_to_biguint(&e), &p_ref)
        );
    }
}

#[test]
fn test_pow2() {
    use super::montgomery_impl::test_modulus;
    use super::test_helpers::reference::{big_to_biguint, ff_to_biguint};

    for n in [1, 2] {
        let p = test_modulus(n, 100);
        let p_ref = ff_to_biguint(&p);
        let x = test_base(&p, 6);
        let y = test_base(&p, 7);
        let e = super::ff_impl::test_ff(1, 8).v[0];
        let f = super::ff_impl::test_ff(1, 9).v[0];

        let mut a = x.clone();
        a.pow2(&e, &y, &f, &p).unwrap();
        let expected = ff_to_biguint(&x).modpow(&big_to_biguint(&e), &p_ref)
            * ff_to_biguint(&y).modpow(&big_to_biguint(&f), &p_ref)
            % &p_ref;
        assert_eq!(ff_to_biguint(&a), expected);
    }
}

#[test]
fn test_exp_errors() {
    let p = FfValue::from_limb(2, 1000003);
    let mut x = FfValue::from_limb(2, 5);
    assert_eq!(x.skpow(&FfValue::new(1), &p), Err(FfError::LengthMismatch));
    assert_eq!(
        x.power(3, &FfValue::from_limb(2, 1000004)),
        Err(FfError::EvenModulus)
    );
    let p3 = FfValue::from_limb(3, 1000003);
    let mut x3 = FfValue::from_limb(3, 5);
    assert_eq!(x3.pow(&FfValue::one(3), &p3), Err(FfError::InvalidLength));
}

#[test]
fn test_skpow_access_pattern() {
    use super::montgomery_impl::test_modulus;
    use super::test_helpers::access_trace;

    for n in [1, 2] {
        let p = test_modulus(n, 110);
        let x = test_base(&p, 11);
        let e0 = super::ff_impl::test_ff(n, 12);
        // Same bit length as e0, different low bits.
        let mut e1 = e0.clone();
        let low = e1.v[0].digit(0);
        e1.v[0].set_digit(0, low ^ 0x5a);
        assert_ne!(e0, e1);
        assert_eq!(e0.bit_length(), e1.bit_length());

        let (r0, trace0) = access_trace::capture(|| {
            let mut a = x.clone();
            a.skpow(&e0, &p).map(|_| a)
        });
        let (r1, trace1) = access_trace::capture(|| {
            let mut a = x.clone();
            a.skpow(&e1, &p).map(|_| a)
        });
        assert!(r0.is_ok() && r1.is_ok());
        assert_ne!(r0, r1);
        assert_eq!(trace0, trace1);

        // The reductions' final selections are part of the trace.
        let has_site = |site: &str| trace0.iter().any(|(s, _)| *s == site);
        if n == 1 {
            assert!(has_site("monty") && has_site("monty_cmove"));
        } else {
            assert!(has_site("cond_sub") && has_site("cmove"));
        }
        assert!(!has_site("pexceed") && !has_site("sexceed"));
    }
}
