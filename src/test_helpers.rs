// SPDX-License-Identifier: Apache-2.0
// Copyright 2023 SUSE LLC
// Author: Nicolai Stange <nstange@suse.de>

#![macro_use]

/// Record an access site together with the block offset it touches.
///
/// Expands to nothing outside of test builds. In tests, the records are collected by
/// [`access_trace::capture()`] and compared across runs with different secret inputs.
macro_rules! trace_access {
    ($site:expr, $offset:expr) => {
        #[cfg(test)]
        $crate::test_helpers::access_trace::record($site, $offset);
        #[cfg(not(test))]
        let _ = ($site, $offset);
    };
}

#[cfg(test)]
pub mod access_trace {
    extern crate alloc;
    extern crate std;

    use alloc::vec::Vec;
    use std::cell::RefCell;

    pub type Trace = Vec<(&'static str, usize)>;

    std::thread_local! {
        static TRACE: RefCell<Option<Trace>> = const { RefCell::new(None) };
    }

    pub fn record(site: &'static str, offset: usize) {
        TRACE.with(|t| {
            if let Some(trace) = t.borrow_mut().as_mut() {
                trace.push((site, offset));
            }
        });
    }

    pub fn capture<R, F: FnOnce() -> R>(f: F) -> (R, Trace) {
        TRACE.with(|t| *t.borrow_mut() = Some(Vec::new()));
        let result = f();
        let trace = TRACE.with(|t| t.borrow_mut().take()).unwrap_or_default();
        (result, trace)
    }
}

#[cfg(test)]
pub mod reference {
    extern crate alloc;

    use crate::big_impl::{Big, MODBYTES};
    use crate::ff_impl::FfValue;
    use alloc::vec;
    use num_bigint::BigUint;

    pub fn big_to_biguint(v: &Big) -> BigUint {
        let mut bytes = [0u8; MODBYTES];
        v.to_bytes(&mut bytes);
        BigUint::from_bytes_be(&bytes)
    }

    pub fn big_from_biguint(v: &BigUint) -> Big {
        let bytes = v.to_bytes_be();
        assert!(bytes.len() <= MODBYTES);
        let mut buf = [0u8; MODBYTES];
        buf[MODBYTES - bytes.len()..].copy_from_slice(&bytes);
        Big::from_bytes(&buf)
    }

    pub fn ff_to_biguint(v: &FfValue) -> BigUint {
        BigUint::from_bytes_be(&v.to_bytes())
    }

    pub fn ff_from_biguint(n: usize, v: &BigUint) -> FfValue {
        let bytes = v.to_bytes_be();
        assert!(bytes.len() <= n * MODBYTES);
        let mut buf = vec![0u8; n * MODBYTES];
        let len = buf.len();
        buf[len - bytes.len()..].copy_from_slice(&bytes);
        FfValue::from_bytes(n, &buf).unwrap()
    }

    /// The Mersenne number `2^e - 1` as an `n` block value.
    pub fn mersenne(n: usize, e: u32) -> FfValue {
        ff_from_biguint(n, &((BigUint::from(1u32) << e) - 1u32))
    }
}
