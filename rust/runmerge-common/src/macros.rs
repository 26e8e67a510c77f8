/// Unwraps a `Result` inside a function returning `Option<Result<T, E>>`.
///
/// `Ok(t)` yields `t`; `Err(e)` returns `Some(Err(e))` from the enclosing function.
/// Intended for `Iterator::next()` implementations over fallible decoders, such as
/// lexicon and posting readers, where each step may fail with an I/O or format error.
#[macro_export]
macro_rules! try_or_ret_some_err {
    ($expr:expr) => {
        match $expr {
            Ok(value) => value,
            Err(err) => {
                return Some(Err(err.into()));
            }
        }
    };
}

/// Returns an `InvariantViolation` error from the enclosing function unless the
/// condition holds. Unlike `debug_assert!`, the check is never compiled out.
#[macro_export]
macro_rules! ensure_invariant {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return Err($crate::error::Error::invariant(format!($($arg)+)).into());
        }
    };
}
