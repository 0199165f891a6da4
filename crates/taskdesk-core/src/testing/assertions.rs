//! Assertion macros for `Result`-returning operations.

/// Assert that a result is Ok.
///
/// ```ignore
/// assert_ok!(CreateTask::execute(&ctx, input).await);
/// assert_ok!(result, "creating {}", title);
/// ```
#[macro_export]
macro_rules! assert_ok {
    ($expr:expr) => {
        match &$expr {
            Ok(_) => (),
            Err(e) => panic!("assertion failed: expected Ok, got Err({:?})", e),
        }
    };
    ($expr:expr, $($arg:tt)+) => {
        match &$expr {
            Ok(_) => (),
            Err(e) => panic!("assertion failed: {}: expected Ok, got Err({:?})", format_args!($($arg)+), e),
        }
    };
}

/// Assert that a result is Err.
#[macro_export]
macro_rules! assert_err {
    ($expr:expr) => {
        match &$expr {
            Err(_) => (),
            Ok(v) => panic!("assertion failed: expected Err, got Ok({:?})", v),
        }
    };
}

/// Assert that an error matches a specific variant.
///
/// ```ignore
/// assert_err_variant!(result, DeskError::NotFound(_));
/// ```
#[macro_export]
macro_rules! assert_err_variant {
    ($expr:expr, $variant:pat) => {
        match &$expr {
            Err($variant) => (),
            Err(e) => panic!(
                "assertion failed: expected {}, got {:?}",
                stringify!($variant),
                e
            ),
            Ok(_) => panic!(
                "assertion failed: expected Err({}), got Ok",
                stringify!($variant)
            ),
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::error::{DeskError, Result};

    #[test]
    fn test_assert_ok_passes() {
        let r: Result<u8> = Ok(1);
        assert_ok!(r);
        assert_ok!(r, "value {}", 1);
    }

    #[test]
    #[should_panic(expected = "expected Ok")]
    fn test_assert_ok_panics_on_err() {
        let r: Result<u8> = Err(DeskError::Internal("boom".into()));
        assert_ok!(r);
    }

    #[test]
    fn test_assert_err_variant() {
        let r: Result<u8> = Err(DeskError::Conflict("dup".into()));
        assert_err!(r);
        assert_err_variant!(r, DeskError::Conflict(_));
    }

    #[test]
    #[should_panic(expected = "expected DeskError::NotFound(_)")]
    fn test_assert_err_variant_wrong_variant() {
        let r: Result<u8> = Err(DeskError::Conflict("dup".into()));
        assert_err_variant!(r, DeskError::NotFound(_));
    }
}
