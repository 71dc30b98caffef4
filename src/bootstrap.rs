//! Startup prerequisites.
//!
//! The persistent-storage subsystem must come up before the Bluetooth
//! stack. Storage itself lives outside this crate; the [`Storage`] trait
//! is the seam, and [`init_storage`] applies the one recovery step the
//! bootstrap allows: erase and retry once on a recoverable failure.

use tracing::warn;

use crate::error::{Error, Result, StorageError};

/// Persistent-storage backend seam.
pub trait Storage {
    /// Initialize the storage partition.
    fn init(&mut self) -> std::result::Result<(), StorageError>;

    /// Erase the storage partition.
    fn erase(&mut self) -> std::result::Result<(), StorageError>;
}

/// Bring up persistent storage, erasing and retrying once if the first
/// attempt fails with a recoverable error.
///
/// Any failure past the single retry is fatal to startup.
pub fn init_storage<S: Storage>(storage: &mut S) -> Result<()> {
    match storage.init() {
        Ok(()) => Ok(()),
        Err(e) if e.is_recoverable() => {
            warn!("storage init failed ({e}), erasing and retrying");
            storage.erase().map_err(Error::Storage)?;
            storage.init().map_err(Error::Storage)
        }
        Err(e) => Err(Error::Storage(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scripted storage backend: pops one result per call.
    struct ScriptedStorage {
        init_results: Vec<std::result::Result<(), StorageError>>,
        erase_results: Vec<std::result::Result<(), StorageError>>,
        erase_calls: usize,
    }

    impl ScriptedStorage {
        fn new(
            init_results: Vec<std::result::Result<(), StorageError>>,
            erase_results: Vec<std::result::Result<(), StorageError>>,
        ) -> Self {
            Self {
                init_results,
                erase_results,
                erase_calls: 0,
            }
        }
    }

    impl Storage for ScriptedStorage {
        fn init(&mut self) -> std::result::Result<(), StorageError> {
            self.init_results.remove(0)
        }

        fn erase(&mut self) -> std::result::Result<(), StorageError> {
            self.erase_calls += 1;
            self.erase_results.remove(0)
        }
    }

    #[test]
    fn test_clean_init() {
        let mut storage = ScriptedStorage::new(vec![Ok(())], vec![]);
        assert!(init_storage(&mut storage).is_ok());
        assert_eq!(storage.erase_calls, 0);
    }

    #[test]
    fn test_erase_and_retry_on_no_free_pages() {
        let mut storage =
            ScriptedStorage::new(vec![Err(StorageError::NoFreePages), Ok(())], vec![Ok(())]);
        assert!(init_storage(&mut storage).is_ok());
        assert_eq!(storage.erase_calls, 1);
    }

    #[test]
    fn test_erase_and_retry_on_new_version() {
        let mut storage = ScriptedStorage::new(
            vec![Err(StorageError::NewVersionFound), Ok(())],
            vec![Ok(())],
        );
        assert!(init_storage(&mut storage).is_ok());
        assert_eq!(storage.erase_calls, 1);
    }

    #[test]
    fn test_second_failure_is_fatal() {
        let mut storage = ScriptedStorage::new(
            vec![
                Err(StorageError::NoFreePages),
                Err(StorageError::Failed { code: -3 }),
            ],
            vec![Ok(())],
        );
        let err = init_storage(&mut storage).unwrap_err();
        assert!(matches!(
            err,
            Error::Storage(StorageError::Failed { code: -3 })
        ));
    }

    #[test]
    fn test_unrecoverable_failure_skips_erase() {
        let mut storage =
            ScriptedStorage::new(vec![Err(StorageError::Failed { code: -1 })], vec![]);
        assert!(init_storage(&mut storage).is_err());
        assert_eq!(storage.erase_calls, 0);
    }
}
