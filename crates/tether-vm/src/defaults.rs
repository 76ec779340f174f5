//! Default constants for state configuration.

/// Default maximum nesting of native calls (metamethods and finalizers included).
pub const DEFAULT_MAX_CALL_DEPTH: usize = 200;

/// Default maximum number of `__index`/`__newindex` table hops before the
/// access is treated as a loop.
pub const DEFAULT_MAX_INDEX_CHAIN: usize = 100;

/// Default maximum number of values on the value stack during a call.
pub const DEFAULT_STACK_LIMIT: usize = 8_000;
