// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Process-wide pseudorandom source for the test patterns.

use std::sync::Mutex;
use std::sync::OnceLock;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

static RNG: OnceLock<Mutex<StdRng>> = OnceLock::new();

fn global_rng() -> &'static Mutex<StdRng> {
    RNG.get_or_init(|| {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        Mutex::new(StdRng::seed_from_u64(seed))
    })
}

/// Runs `f` with exclusive access to the process-wide generator, seeding it on first use.
pub fn with_rng<T>(f: impl FnOnce(&mut StdRng) -> T) -> T {
    let mut rng = global_rng()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    f(&mut rng)
}

/// Uniform integer in `[begin, end)` drawn from `rng`, or `begin` if the range is empty.
pub fn random_range<R: Rng + ?Sized>(rng: &mut R, begin: u32, end: u32) -> u32 {
    if end <= begin {
        begin
    } else {
        rng.gen_range(begin..end)
    }
}

/// Uniform integer in `[begin, end)` drawn from the process-wide generator.
pub fn gen_random_int_range(begin: u32, end: u32) -> u32 {
    with_rng(|rng| random_range(rng, begin, end))
}
