//! Environment overrides loaded from .env files
//!
//! Every variable is optional; an unset or unparsable value leaves the
//! corresponding setting untouched.

use std::env;

use once_cell::sync::Lazy;

// Automatically load .env when the module is first used
static DOTENV_INIT: Lazy<()> = Lazy::new(|| {
    let _ = dotenv::dotenv();
});

#[inline]
fn ensure_loaded() {
    let _ = &*DOTENV_INIT;
}

pub const STRICT: &str = "CPM_STRICT";
pub const ITERS_LIMIT: &str = "CPM_ITERS_LIMIT";
pub const FOLD_CONSTANT_ROWS: &str = "CPM_FOLD_CONSTANT_ROWS";
pub const CLEAR_FREED_STACK_SLOTS: &str = "CPM_CLEAR_FREED_STACK_SLOTS";

/// Accepts `1/0`, `true/false`, `yes/no`, `on/off`
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn flag(key: &str) -> Option<bool> {
    ensure_loaded();
    env::var(key).ok().as_deref().and_then(parse_flag)
}

/// Raise errors instead of falling back to literal iteration
pub fn strict() -> Option<bool> {
    flag(STRICT)
}

/// Minimum iteration count worth accelerating
pub fn iters_limit() -> Option<u64> {
    ensure_loaded();
    env::var(ITERS_LIMIT).ok().and_then(|v| v.trim().parse().ok())
}

pub fn fold_constant_rows() -> Option<bool> {
    flag(FOLD_CONSTANT_ROWS)
}

pub fn clear_freed_stack_slots() -> Option<bool> {
    flag(CLEAR_FREED_STACK_SLOTS)
}
