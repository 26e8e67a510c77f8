pub type Result<T> = std::result::Result<T, crate::error::Error>;

#[macro_export]
macro_rules! verify_arg {
    ($name:expr, $expr:expr) => {{
        let result = $expr;
        $crate::result::verify_arg(result, stringify!($name), stringify!($expr))?;
    }};
}

#[macro_export]
macro_rules! verify_data {
    ($name:expr, $expr:expr) => {{
        let result = $expr;
        $crate::result::verify_data(result, stringify!($name), stringify!($expr))?;
    }};
}

#[inline]
pub fn verify_arg(predicate: bool, name: &str, condition: &str) -> Result<()> {
    if predicate {
        Ok(())
    } else {
        invalid_arg(name, condition)
    }
}

#[inline]
pub fn verify_data(predicate: bool, name: &str, condition: &str) -> Result<()> {
    if predicate {
        Ok(())
    } else {
        invalid_format(name, condition)
    }
}

#[cold]
pub fn invalid_arg(name: &str, condition: &str) -> Result<()> {
    Err(crate::error::ErrorKind::InvalidArgument {
        name: name.to_string(),
        message: condition.to_string(),
    }
    .into())
}

#[cold]
pub fn invalid_format(name: &str, condition: &str) -> Result<()> {
    Err(crate::error::ErrorKind::InvalidFormat {
        element: name.to_string(),
        message: condition.to_string(),
    }
    .into())
}

#[cfg(test)]
mod tests {
    use crate::error::ErrorKind;

    fn check_run_count(run_count: usize) -> crate::Result<()> {
        verify_arg!(run_count, run_count > 0);
        Ok(())
    }

    fn check_magic(magic: u32) -> crate::Result<()> {
        verify_data!(magic, magic == 0x4e52_4d52);
        Ok(())
    }

    #[test]
    fn test_verify_macros() {
        assert!(check_run_count(2).is_ok());
        let err = check_run_count(0).unwrap_err();
        match err.kind() {
            ErrorKind::InvalidArgument { name, message } => {
                assert_eq!(name, "run_count");
                assert_eq!(message, "run_count > 0");
            }
            other => panic!("unexpected kind {other:?}"),
        }

        assert!(check_magic(0x4e52_4d52).is_ok());
        assert!(matches!(
            check_magic(7).unwrap_err().kind(),
            ErrorKind::InvalidFormat { .. }
        ));
    }
}
