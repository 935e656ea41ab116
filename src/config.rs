//! Codec limits, loaded once per process.
//!
//! The wire schema itself is compiled in. The only tunables are the bounds
//! applied to untrusted input: overall program size and `Spawn` nesting
//! depth. Both can be overridden through the environment:
//!
//! - `XCVM_MAX_PROGRAM_LEN`: maximum encoded program size in bytes
//! - `XCVM_MAX_SPAWN_DEPTH`: maximum number of nested `Spawn` programs

use std::sync::OnceLock;

/// Default maximum encoded program size (1 MiB).
pub const DEFAULT_MAX_PROGRAM_LEN: usize = 1 << 20;

/// Default maximum `Spawn` nesting depth.
pub const DEFAULT_MAX_SPAWN_DEPTH: usize = 64;

pub const MAX_PROGRAM_LEN_ENV: &str = "XCVM_MAX_PROGRAM_LEN";
pub const MAX_SPAWN_DEPTH_ENV: &str = "XCVM_MAX_SPAWN_DEPTH";

/// Bounds applied when decoding untrusted programs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecLimits {
    /// Largest accepted envelope, in bytes.
    pub max_program_len: usize,
    /// Deepest accepted `Spawn` nesting. A program without spawns has depth 0.
    pub max_spawn_depth: usize,
}

impl Default for CodecLimits {
    fn default() -> Self {
        Self {
            max_program_len: DEFAULT_MAX_PROGRAM_LEN,
            max_spawn_depth: DEFAULT_MAX_SPAWN_DEPTH,
        }
    }
}

impl CodecLimits {
    /// Builds limits from the environment, falling back to the defaults
    /// for unset or unparsable values.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds limits from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let read = |key: &str, fallback: usize| {
            lookup(key)
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(fallback)
        };
        Self {
            max_program_len: read(MAX_PROGRAM_LEN_ENV, defaults.max_program_len),
            max_spawn_depth: read(MAX_SPAWN_DEPTH_ENV, defaults.max_spawn_depth),
        }
    }

    /// Process-wide limits, read from the environment on first use.
    pub fn global() -> &'static CodecLimits {
        static LIMITS: OnceLock<CodecLimits> = OnceLock::new();
        LIMITS.get_or_init(CodecLimits::from_env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn lookup_overrides_defaults() {
        let env: HashMap<&str, &str> = HashMap::from([(MAX_SPAWN_DEPTH_ENV, "3")]);
        let limits = CodecLimits::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(limits.max_spawn_depth, 3);
        assert_eq!(limits.max_program_len, DEFAULT_MAX_PROGRAM_LEN);
    }

    #[test]
    fn unparsable_values_fall_back() {
        let limits = CodecLimits::from_lookup(|_| Some("lots".to_string()));
        assert_eq!(limits, CodecLimits::default());
    }

    #[test]
    fn global_is_stable() {
        assert!(std::ptr::eq(CodecLimits::global(), CodecLimits::global()));
    }
}
