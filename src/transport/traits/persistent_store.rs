//! Non-volatile key/value store holding the configuration record
//! (NVS partition, EEPROM page, flash sector map...).

/// Persisted byte store.
pub trait PersistentStore {
    type Error: core::fmt::Debug;

    /// Copy the blob stored under `key` into `buf` and return its full length,
    /// which may differ from `buf.len()`. `None` when the key is absent.
    fn get_bytes(&self, key: &str, buf: &mut [u8]) -> Option<usize>;

    /// Store `bytes` under `key`, replacing any previous value.
    fn set_bytes(&mut self, key: &str, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Delete `key`. Removing an absent key is not an error.
    fn remove(&mut self, key: &str) -> Result<(), Self::Error>;
}
