//! Fuzz the relation loader
//!
//! The loader consumes untrusted bytes: header validation, length checks
//! and record decoding should reject malformed input with an error, never
//! panic or overcommit memory.

#![no_main]

use libfuzzer_sys::fuzz_target;

use zodd::{persist, Context};

fuzz_target!(|data: &[u8]| {
    let ctx = Context::sequential();

    let mut bytes = data;
    let _ = persist::load_with_limit::<(u32, u64), _>(&ctx, &mut bytes, 1 << 16);

    let mut bytes = data;
    let _ = persist::load_with_limit::<(bool, [i16; 3], u8), _>(&ctx, &mut bytes, 1 << 16);
});
