//! Character stream carrying configuration uploads and their replies
//! (typically the device's serial console).
use core::future::Future;

/// Bidirectional byte stream.
pub trait ByteStream {
    type Error: core::fmt::Debug;

    /// Wait for incoming bytes and copy them into `buf`. Returns the number of
    /// bytes written; `0` means the stream is closed.
    fn read<'a>(
        &'a mut self,
        buf: &'a mut [u8],
    ) -> impl Future<Output = Result<usize, Self::Error>> + 'a;

    /// Write every byte of `bytes`.
    fn write_all<'a>(
        &'a mut self,
        bytes: &'a [u8],
    ) -> impl Future<Output = Result<(), Self::Error>> + 'a;
}
