// SPDX-License-Identifier: Apache-2.0
// Copyright 2023 SUSE LLC
// Author: Nicolai Stange <nstange@suse.de>

use core::cmp::Ordering;

use rand_core::RngCore;

use super::ff_impl::{blocks_ct_lt_gt, blocks_sub, rnorm, FfError, FfValue};
use super::limb::LimbType;

// Product of first 7 primes > 2, i.e. from 3 to 19 (inclusive).
// Filters ~66% of odd prime candidates.
const SMALL_ODD_PRIME_PRODUCT: LimbType = 4849845;

const SMALL_ODD_PRIMES: [LimbType; 7] = [3, 5, 7, 11, 13, 17, 19];

const MILLER_RABIN_ROUNDS: usize = 10;

fn igcd(mut x: LimbType, mut y: LimbType) -> LimbType {
    while y != 0 {
        let r = x % y;
        x = y;
        y = r;
    }
    x
}

impl FfValue {
    /// Whether `self` has a common factor with the odd, non-zero `s`, which must fit a digit.
    ///
    /// Removes multiples of `s` by subtraction and strips factors of two, which leaves the
    /// common factors with `s` intact, until the remainder is below `s`. Not constant time.
    pub fn cfactor(&self, s: LimbType) -> bool {
        debug_assert_eq!(s & 1, 1);
        let mut x = self.clone();
        x.norm();
        let y = FfValue::from_limb(x.len(), s);

        while !x.is_zero() && x.parity() == 0 {
            x.shr();
        }
        loop {
            let (lt, _) = blocks_ct_lt_gt(&x.v, &y.v);
            if lt.unwrap() != 0 {
                break;
            }
            blocks_sub(&mut x.v, &y.v);
            rnorm(&mut x.v, false);
            while !x.is_zero() && x.parity() == 0 {
                x.shr();
            }
        }

        igcd(s, x.v[0].digit(0)) > 1
    }
}

/// Miller-Rabin test of `p` against ten random bases.
///
/// Small factors get sieved out upfront. A `true` result is wrong for a composite `p` with
/// probability below `4^-10`. Not constant time.
///
/// Multi-block candidates must have a power of two block count, otherwise the Montgomery
/// arithmetic fails with [`FfError::InvalidLength`].
#[tracing::instrument("FfValue::is_probable_prime", skip_all, level = "debug")]
pub fn is_probable_prime<R: RngCore + ?Sized>(p: &FfValue, rng: &mut R) -> Result<bool, FfError> {
    let n = p.len();
    let mut p = p.clone();
    p.norm();

    if p.is_zero() || p.is_one() {
        return Ok(false);
    }
    if p.parity() == 0 {
        return Ok(p.compare(&FfValue::from_limb(n, 2))? == Ordering::Equal);
    }
    if p.compare(&FfValue::from_limb(n, 19))? != Ordering::Greater {
        return Ok(SMALL_ODD_PRIMES.contains(&p.v[0].digit(0)));
    }
    if p.cfactor(SMALL_ODD_PRIME_PRODUCT) {
        tracing::debug!("candidate has a small factor");
        return Ok(false);
    }

    // p - 1 = d * 2^s, d odd.
    let mut pm1 = p.clone();
    pm1.dec(1);
    let mut d = pm1.clone();
    let mut s = 0;
    while d.parity() == 0 {
        d.shr();
        s += 1;
    }

    let mut pm3 = pm1.clone();
    pm3.dec(2);

    for round in 0..MILLER_RABIN_ROUNDS {
        // Witness from [2, p - 2].
        let mut x = FfValue::random_num(&pm3, rng)?;
        x.inc(2);
        x.pow(&d, &p)?;
        if x.is_one() || x.compare(&pm1)? == Ordering::Equal {
            continue;
        }

        let mut witnessed = true;
        for _ in 1..s {
            x.power(2, &p)?;
            if x.is_one() {
                break;
            }
            if x.compare(&pm1)? == Ordering::Equal {
                witnessed = false;
                break;
            }
        }
        if witnessed {
            tracing::debug!(round, "found a Miller-Rabin witness");
            return Ok(false);
        }
    }

    Ok(true)
}

impl FfValue {
    /// See [`is_probable_prime()`].
    pub fn is_probable_prime<R: RngCore + ?Sized>(&self, rng: &mut R) -> Result<bool, FfError> {
        is_probable_prime(self, rng)
    }
}

#[cfg(test)]
fn test_rng() -> rand::rngs::StdRng {
    use rand::SeedableRng as _;
    rand::rngs::StdRng::seed_from_u64(0x5eed)
}

#[test]
fn test_igcd() {
    assert_eq!(igcd(12, 18), 6);
    assert_eq!(igcd(17, 5), 1);
    assert_eq!(igcd(7, 0), 7);
    assert_eq!(igcd(0, 7), 7);
}

#[test]
fn test_cfactor() {
    use super::test_helpers::reference::{ff_from_biguint, mersenne};
    use num_bigint::BigUint;

    assert!(FfValue::from_limb(1, 21).cfactor(15));
    assert!(!FfValue::from_limb(1, 22).cfactor(15));
    assert!(FfValue::from_limb(2, 15).cfactor(15));
    assert!(FfValue::new(2).cfactor(15));
    assert!(!FfValue::from_limb(2, 1).cfactor(15));
    assert!(!FfValue::from_limb(2, 1 << 20).cfactor(15));

    for n in [1, 2, 4] {
        let m = mersenne(n, 127);
        assert!(!m.cfactor(SMALL_ODD_PRIME_PRODUCT));
        for q in SMALL_ODD_PRIMES {
            let v = ff_from_biguint(n, &(((BigUint::from(1u32) << 127) - 1u32) * q));
            assert!(v.cfactor(SMALL_ODD_PRIME_PRODUCT));
        }
        // 23 and 29 are coprime to the product.
        assert!(!FfValue::from_limb(n, 23 * 29 * 64).cfactor(SMALL_ODD_PRIME_PRODUCT));
    }
}

#[test]
fn test_is_probable_prime_small() {
    extern crate alloc;
    use alloc::vec;

    const MAX: usize = 1024;
    let mut is_prime = vec![true; MAX];
    is_prime[0] = false;
    is_prime[1] = false;
    for i in 2..MAX {
        if is_prime[i] {
            for j in (2 * i..MAX).step_by(i) {
                is_prime[j] = false;
            }
        }
    }

    let mut rng = test_rng();
    for (v, expected) in is_prime.iter().enumerate() {
        let p = FfValue::from_limb(1, v as LimbType);
        assert_eq!(is_probable_prime(&p, &mut rng).unwrap(), *expected, "{}", v);
    }
}

#[test]
fn test_is_probable_prime_small_multi_block() {
    let mut rng = test_rng();
    for n in [2, 4] {
        for v in [23, 41, 1000003] {
            assert!(is_probable_prime(&FfValue::from_limb(n, v), &mut rng).unwrap(), "{}", v);
        }
        for v in [25, 1000001] {
            assert!(!is_probable_prime(&FfValue::from_limb(n, v), &mut rng).unwrap(), "{}", v);
        }
    }
}

#[test]
fn test_is_probable_prime_composites() {
    use super::test_helpers::reference::{ff_from_biguint, mersenne};
    use num_bigint::BigUint;

    let mut rng = test_rng();
    // Carmichael numbers and the strong pseudoprime to base two 2047.
    for c in [561, 1105, 1729, 2465, 2821, 6601, 8911, 252601, 2047] {
        let p = FfValue::from_limb(1, c);
        assert!(!is_probable_prime(&p, &mut rng).unwrap(), "{}", c);
    }

    assert!(!is_probable_prime(&mersenne(1, 67), &mut rng).unwrap());
    let m89 = (BigUint::from(1u32) << 89u32) - 1u32;
    let m127 = (BigUint::from(1u32) << 127u32) - 1u32;
    let p = ff_from_biguint(1, &(m89 * m127));
    assert!(!p.is_probable_prime(&mut rng).unwrap());
    let p = ff_from_biguint(2, &((BigUint::from(1u32) << 300u32) + 1u32));
    assert!(!p.is_probable_prime(&mut rng).unwrap());
}

#[test]
fn test_is_probable_prime_mersenne() {
    use super::test_helpers::reference::mersenne;

    let mut rng = test_rng();
    for e in [61, 89, 107, 127] {
        assert!(is_probable_prime(&mersenne(1, e), &mut rng).unwrap(), "M{}", e);
    }
    for e in [521, 607] {
        assert!(is_probable_prime(&mersenne(4, e), &mut rng).unwrap(), "M{}", e);
    }
    assert_eq!(
        is_probable_prime(&mersenne(3, 521), &mut rng),
        Err(FfError::InvalidLength)
    );
}
