//! Karatsuba multiplication of finite field values.
//!
//! The kernels operate on block slices. All intermediate terms live in views into the caller's
//! destination and a single scratch buffer of twice the operand length: a kernel for `n` blocks
//! uses the first `n` scratch blocks for its own cross term and hands the rest down to the
//! recursion. The only allocations happen in the [`FfValue`] entry points.

extern crate alloc;

use alloc::vec;

use super::big_impl::{Big, BIGBITS};
use super::ff_impl::{blocks_add, blocks_sub, rnorm, FfError, FfValue};

pub(crate) fn check_pow2_len(n: usize) -> Result<(), FfError> {
    if !n.is_power_of_two() {
        return Err(FfError::InvalidLength);
    }
    Ok(())
}

/// Full product `v = x * y`.
///
/// `x` and `y` have the same power of two length `n`, `v` has `2n` blocks and `t` at least
/// `2n` blocks of scratch.
pub(crate) fn karmul(v: &mut [Big], x: &[Big], y: &[Big], t: &mut [Big]) {
    let n = x.len();
    debug_assert_eq!(y.len(), n);
    debug_assert_eq!(v.len(), 2 * n);
    debug_assert!(t.len() >= 2 * n);
    trace_access!("karmul", n);

    if n == 1 {
        let mut d = Big::mul(&x[0], &y[0]);
        v[1] = d.split_at(BIGBITS);
        v[0] = d.lower();
        return;
    }

    let nd2 = n / 2;
    let (tl, th) = t.split_at_mut(n);
    {
        let (vl, vh) = v.split_at_mut(n);
        // Stage the half sums in the destination's lower half.
        vl[..nd2].copy_from_slice(&x[..nd2]);
        blocks_add(&mut vl[..nd2], &x[nd2..]);
        rnorm(&mut vl[..nd2], false);
        vl[nd2..].copy_from_slice(&y[..nd2]);
        blocks_add(&mut vl[nd2..], &y[nd2..]);
        rnorm(&mut vl[nd2..], false);

        // (x0 + x1) * (y0 + y1)
        let (sx, sy) = vl.split_at(nd2);
        karmul(tl, sx, sy, th);
        karmul(vl, &x[..nd2], &y[..nd2], th);
        karmul(vh, &x[nd2..], &y[nd2..], th);

        // Cross term.
        blocks_sub(tl, vl);
        blocks_sub(tl, vh);
    }
    blocks_add(&mut v[nd2..nd2 + n], tl);
    rnorm(v, false);
}

/// Square `v = x * x`, same layout as [`karmul()`].
pub(crate) fn karsqr(v: &mut [Big], x: &[Big], t: &mut [Big]) {
    let n = x.len();
    debug_assert_eq!(v.len(), 2 * n);
    debug_assert!(t.len() >= 2 * n);
    trace_access!("karsqr", n);

    if n == 1 {
        let mut d = Big::sqr(&x[0]);
        v[1] = d.split_at(BIGBITS);
        v[0] = d.lower();
        return;
    }

    let nd2 = n / 2;
    let (tl, th) = t.split_at_mut(n);
    {
        let (vl, vh) = v.split_at_mut(n);
        karsqr(vl, &x[..nd2], th);
        karsqr(vh, &x[nd2..], th);
    }
    karmul(tl, &x[..nd2], &x[nd2..], th);
    // Twice the cross term.
    blocks_add(&mut v[nd2..nd2 + n], tl);
    blocks_add(&mut v[nd2..nd2 + n], tl);
    rnorm(v, false);
}

/// Lower half `v = x * y mod 2^(n * BIGBITS)`, with `v` of `n` blocks.
pub(crate) fn karmul_lower(v: &mut [Big], x: &[Big], y: &[Big], t: &mut [Big]) {
    let n = x.len();
    debug_assert_eq!(y.len(), n);
    debug_assert_eq!(v.len(), n);
    debug_assert!(t.len() >= 2 * n);
    trace_access!("karmul_lower", n);

    if n == 1 {
        v[0] = Big::smul(&x[0], &y[0]);
        return;
    }

    let nd2 = n / 2;
    let (tl, th) = t.split_at_mut(n);
    karmul(v, &x[..nd2], &y[..nd2], th);
    karmul_lower(&mut tl[..nd2], &x[nd2..], &y[..nd2], th);
    blocks_add(&mut v[nd2..], &tl[..nd2]);
    karmul_lower(&mut tl[..nd2], &x[..nd2], &y[nd2..], th);
    blocks_add(&mut v[nd2..], &tl[..nd2]);
    rnorm(&mut v[nd2..], true);
}

/// Complete the full product `z = x * y`, given its lower `n` blocks in `z[..n]`.
///
/// Only the upper half costs a multiplication, the lower half's cross term gets recovered from
/// what is already known.
pub(crate) fn karmul_upper(z: &mut [Big], x: &[Big], y: &[Big], t: &mut [Big]) {
    let n = x.len();
    debug_assert_eq!(y.len(), n);
    debug_assert_eq!(z.len(), 2 * n);
    debug_assert!(t.len() >= 2 * n);
    debug_assert!(n >= 2);
    trace_access!("karmul_upper", n);

    let nd2 = n / 2;
    let (tl, th) = t.split_at_mut(n);
    {
        let (zl, zh) = z.split_at_mut(n);
        zh[..nd2].copy_from_slice(&x[..nd2]);
        blocks_add(&mut zh[..nd2], &x[nd2..]);
        rnorm(&mut zh[..nd2], false);
        zh[nd2..].copy_from_slice(&y[..nd2]);
        blocks_add(&mut zh[nd2..], &y[nd2..]);
        rnorm(&mut zh[nd2..], false);

        // t = (x0 + x1) * (y0 + y1), then z[n..] = x1 * y1.
        let (sx, sy) = zh.split_at(nd2);
        karmul(tl, sx, sy, th);
        karmul(zh, &x[nd2..], &y[nd2..], th);

        // t = x0 * y0 + cross term.
        blocks_sub(tl, zh);

        // The known lower half minus t's low blocks leaves the upper part of x0 * y0 in
        // z[nd2..n], which turns z[..n] into x0 * y0.
        let (z0, z1) = zl.split_at_mut(nd2);
        blocks_add(z1, z0);
        blocks_sub(z1, &tl[..nd2]);
        rnorm(zl, true);

        // t = cross term.
        blocks_sub(tl, zl);
    }
    blocks_add(&mut z[nd2..nd2 + n], tl);
    rnorm(&mut z[nd2..], false);
}

impl FfValue {
    /// The full product, of twice the operands' length.
    pub fn mul(&self, y: &FfValue) -> Result<FfValue, FfError> {
        let n = self.len();
        if y.len() != n {
            return Err(FfError::LengthMismatch);
        }
        check_pow2_len(n)?;
        let mut r = FfValue::new(2 * n);
        let mut t = vec![Big::zero(); 2 * n];
        karmul(&mut r.v, &self.v, &y.v, &mut t);
        Ok(r)
    }

    pub fn sqr(&self) -> Result<FfValue, FfError> {
        let n = self.len();
        check_pow2_len(n)?;
        let mut r = FfValue::new(2 * n);
        let mut t = vec![Big::zero(); 2 * n];
        karsqr(&mut r.v, &self.v, &mut t);
        Ok(r)
    }

    /// Replace `self` with the lower half of `self * y`.
    pub fn lmul(&mut self, y: &FfValue) -> Result<(), FfError> {
        let n = self.len();
        if y.len() != n {
            return Err(FfError::LengthMismatch);
        }
        check_pow2_len(n)?;
        let x = self.v.clone();
        let mut t = vec![Big::zero(); 2 * n];
        karmul_lower(&mut self.v, &x, &y.v, &mut t);
        Ok(())
    }
}

#[cfg(test)]
fn test_operands(n: usize, seed: u64) -> (FfValue, FfValue) {
    use super::ff_impl::test_ff;
    (test_ff(n, seed), test_ff(n, seed + 1000))
}

#[test]
fn test_karmul() {
    use super::test_helpers::reference::ff_to_biguint;

    for n in [1, 2, 4, 8] {
        for seed in 0..4 {
            let (x, y) = test_operands(n, seed);
            let z = x.mul(&y).unwrap();
            assert_eq!(z.len(), 2 * n);
            assert_eq!(ff_to_biguint(&z), ff_to_biguint(&x) * ff_to_biguint(&y));
        }
    }
}

#[test]
fn test_karsqr() {
    use super::test_helpers::reference::ff_to_biguint;

    for n in [1, 2, 4, 8] {
        for seed in 0..4 {
            let (x, _) = test_operands(n, seed);
            let z = x.sqr().unwrap();
            let x_ref = ff_to_biguint(&x);
            assert_eq!(ff_to_biguint(&z), &x_ref * &x_ref);
            assert_eq!(z, x.mul(&x).unwrap());
        }
    }
}

#[test]
fn test_karmul_halves() {
    for n in [1, 2, 4, 8] {
        for seed in 0..4 {
            let (x, y) = test_operands(n, seed);
            let z = x.mul(&y).unwrap();

            let mut lo = x.clone();
            lo.lmul(&y).unwrap();
            assert_eq!(lo, z.lower_half());

            if n >= 2 {
                let mut w = z.lower_half().to_double();
                let mut t = vec![Big::zero(); 2 * n];
                karmul_upper(&mut w.v, &x.v, &y.v, &mut t);
                assert_eq!(w.upper_half(), z.upper_half());
                assert_eq!(w, z);
            }
        }
    }
}

#[test]
fn test_karmul_invalid_len() {
    let x = FfValue::new(3);
    assert_eq!(x.mul(&x), Err(FfError::InvalidLength));
    assert_eq!(x.sqr(), Err(FfError::InvalidLength));
    assert_eq!(
        FfValue::new(2).mul(&FfValue::new(4)),
        Err(FfError::LengthMismatch)
    );
}
