//! Modular inversion of finite field values.

use core::cmp::Ordering;

use super::ff_impl::{FfError, FfValue};
use super::karatsuba_impl::check_pow2_len;

impl FfValue {
    /// Invert an odd value modulo `2^(len() * BIGBITS)`.
    ///
    /// Starts from the inverse of the lowest block and doubles the number of correct blocks in
    /// each step (Arazi-Qi): with `u` correct modulo `B^i`, `a * u = 1 + b * B^i` and
    /// `u - u * b * B^i` is correct modulo `B^(2i)`. The length must be a power of two.
    ///
    /// Runs in constant time.
    pub fn invmod2m(&mut self) -> Result<(), FfError> {
        if self.parity() == 0 {
            return Err(FfError::EvenModulus);
        }
        let n = self.len();
        check_pow2_len(n)?;
        self.norm();

        let mut u = FfValue::new(n);
        u.v[0] = self.v[0];
        u.v[0].invmod2m();

        let mut i = 1;
        while i < n {
            // Carry of the low half product: (a mod B^i) * u = 1 + c * B^i.
            let mut b = self.clone();
            b.mod2m(i);
            let mut t = u.mul(&b)?;
            t.shrw(i);
            let b = t.lower_half();

            // Plus the high half's contribution.
            let mut c = self.clone();
            c.shrw(i);
            c.mod2m(i);
            c.lmul(&u)?;
            c.mod2m(i);

            let mut b = b.add(&c)?.normalize();
            b.lmul(&u)?;
            b.mod2m(i);

            let mut bi = FfValue::new(n);
            bi.v[i] = super::big_impl::Big::one();
            let mut b = b.rsub(&bi)?.normalize();
            // b == 0 would leave B^i behind.
            b.mod2m(i);
            b.shlw(i);
            u = u.add(&b)?.normalize();
            i *= 2;
        }

        *self = u;
        Ok(())
    }

    /// Invert modulo an odd `p`, by the binary extended Euclidean algorithm.
    ///
    /// Not constant time, the control flow depends on both values. Fails with
    /// [`FfError::NotInvertible`] if `self` and `p` are not coprime.
    pub fn invmodp(&mut self, p: &FfValue) -> Result<(), FfError> {
        self.check_len(p)?;
        if p.parity() == 0 {
            return Err(FfError::EvenModulus);
        }
        let n = self.len();
        let mut p = p.clone();
        p.norm();

        let mut u = self.clone();
        u.modulo(&p)?;
        let mut v = p.clone();
        let mut x1 = FfValue::one(n);
        let mut x2 = FfValue::new(n);

        if u.is_zero() {
            return Err(FfError::NotInvertible);
        }

        while !u.is_one() && !v.is_one() {
            halve_while_even(&mut u, &mut x1, &p)?;
            halve_while_even(&mut v, &mut x2, &p)?;

            if u.compare(&v)? != Ordering::Less {
                u = u.sub(&v)?.normalize();
                x1 = sub_mod(x1, &x2, &p)?;
                if u.is_zero() {
                    return Err(FfError::NotInvertible);
                }
            } else {
                v = v.sub(&u)?.normalize();
                x2 = sub_mod(x2, &x1, &p)?;
                if v.is_zero() {
                    return Err(FfError::NotInvertible);
                }
            }
        }

        *self = if u.is_one() { x1 } else { x2 };
        Ok(())
    }
}

// Strip factors of two from a non-zero u, halving its cofactor x modulo p alongside.
fn halve_while_even(u: &mut FfValue, x: &mut FfValue, p: &FfValue) -> Result<(), FfError> {
    while u.parity() == 0 {
        u.shr();
        if x.parity() != 0 {
            *x = x.clone().add(p)?.normalize();
        }
        x.shr();
    }
    Ok(())
}

// (a - b) mod p, for a, b in [0, p).
fn sub_mod(a: FfValue, b: &FfValue, p: &FfValue) -> Result<FfValue, FfError> {
    if a.compare(b)? != Ordering::Less {
        Ok(a.sub(b)?.normalize())
    } else {
        Ok(a.add(p)?.sub(b)?.normalize())
    }
}

#[test]
fn test_invmod2m() {
    use super::big_impl::BIGBITS;
    use super::ff_impl::test_ff;
    use super::test_helpers::reference::{ff_to_biguint, mersenne};
    use num_bigint::BigUint;

    for n in [1, 2, 4, 8] {
        let r = BigUint::from(1u32) << (n * BIGBITS);
        for seed in 0..4 {
            let mut a = test_ff(n, seed);
            let low = a.v[0].digit(0);
            a.v[0].set_digit(0, low | 1);
            let mut u = a.clone();
            u.invmod2m().unwrap();
            assert_eq!(ff_to_biguint(&a) * ff_to_biguint(&u) % &r, BigUint::from(1u32));

            let mut one = a.clone();
            one.lmul(&u).unwrap();
            assert!(one.is_one());
        }

        // The correction term vanishes in every step.
        let mut one = FfValue::one(n);
        one.invmod2m().unwrap();
        assert!(one.is_one());

        let mut m1 = mersenne(n, (n * BIGBITS) as u32);
        m1.invmod2m().unwrap();
        assert_eq!(m1, mersenne(n, (n * BIGBITS) as u32));
    }

    assert_eq!(FfValue::from_limb(2, 6).invmod2m(), Err(FfError::EvenModulus));
    assert_eq!(FfValue::from_limb(3, 7).invmod2m(), Err(FfError::InvalidLength));
}

#[test]
fn test_invmodp() {
    use super::ff_impl::test_ff;
    use super::test_helpers::reference::{ff_to_biguint, mersenne};
    use num_bigint::BigUint;

    for (n, e) in [(1, 127), (1, 89), (3, 521)] {
        let p = mersenne(n, e);
        let p_ref = ff_to_biguint(&p);
        for seed in 0..4 {
            let a = test_ff(n, seed);
            let mut r = a.clone();
            r.invmodp(&p).unwrap();
            assert_eq!(r.compare(&p).unwrap(), Ordering::Less);
            assert_eq!(
                ff_to_biguint(&a) * ff_to_biguint(&r) % &p_ref,
                BigUint::from(1u32)
            );
        }

        let mut one = FfValue::one(n);
        one.invmodp(&p).unwrap();
        assert!(one.is_one());

        let mut zero = FfValue::new(n);
        assert_eq!(zero.invmodp(&p), Err(FfError::NotInvertible));
        // p itself reduces to zero.
        let mut pp = p.clone();
        assert_eq!(pp.invmodp(&p), Err(FfError::NotInvertible));
    }

    let p = FfValue::from_limb(1, 15);
    assert_eq!(FfValue::from_limb(1, 5).invmodp(&p), Err(FfError::NotInvertible));
    assert_eq!(FfValue::from_limb(1, 3).invmodp(&p), Err(FfError::NotInvertible));
    let mut a = FfValue::from_limb(1, 7);
    a.invmodp(&p).unwrap();
    assert_eq!(a, FfValue::from_limb(1, 13));

    assert_eq!(
        FfValue::from_limb(1, 3).invmodp(&FfValue::from_limb(1, 16)),
        Err(FfError::EvenModulus)
    );
    assert_eq!(
        FfValue::from_limb(2, 3).invmodp(&FfValue::from_limb(1, 17)),
        Err(FfError::LengthMismatch)
    );
}

#[test]
fn test_invmod_unnormalized_input() {
    use super::big_impl::BMASK;
    use super::test_helpers::reference::ff_to_biguint;
    use num_bigint::BigUint;

    // Pending carries out of the lowest digit never change its lowest bit.
    let mut a = FfValue::new(2);
    a.v[0].set_digit(0, BMASK + 2);
    let mut u = a.clone();
    u.invmod2m().unwrap();
    let mut an = a.clone();
    an.norm();
    let r = BigUint::from(1u32) << (2 * super::big_impl::BIGBITS);
    assert_eq!(ff_to_biguint(&an) * ff_to_biguint(&u) % &r, BigUint::from(1u32));

    let mut e = FfValue::new(2);
    e.v[0].set_digit(0, BMASK + 1);
    assert_eq!(e.invmod2m(), Err(FfError::EvenModulus));
    assert_eq!(FfValue::from_limb(2, 3).invmodp(&e), Err(FfError::EvenModulus));

    let mut p = FfValue::new(2);
    p.v[0].set_digit(0, BMASK + 2);
    let mut x = FfValue::from_limb(2, 3);
    x.invmodp(&p).unwrap();
    let p_ref = BigUint::from(BMASK) + 2u32;
    assert_eq!(ff_to_biguint(&x) * 3u32 % &p_ref, BigUint::from(1u32));
}
