// Legacy swallow-and-default error policy
// For callers that expect `false`, `None`, `0` or an empty list instead of an error

use log::error;

use super::database::StorageResult;

pub trait SwallowExt<T> {
    /// Log the error under `operation` and return `T::default()` in its place
    fn or_default_logged(self, operation: &str) -> T;
}

impl<T: Default> SwallowExt<T> for StorageResult<T> {
    fn or_default_logged(self, operation: &str) -> T {
        match self {
            Ok(value) => value,
            Err(e) => {
                error!("{} failed ({:?}): {}", operation, e.kind(), e);
                T::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::database::StorageError;

    #[test]
    fn test_ok_passes_through() {
        let value: StorageResult<Vec<i64>> = Ok(vec![1, 2]);
        assert_eq!(value.or_default_logged("list"), vec![1, 2]);
    }

    #[test]
    fn test_error_becomes_default() {
        let failed: StorageResult<bool> = Err(StorageError::Connectivity("gone".into()));
        assert!(!failed.or_default_logged("add"));

        let missing: StorageResult<Option<String>> = Err(StorageError::invalid("bad id"));
        assert_eq!(missing.or_default_logged("find"), None);
    }
}
