//! Fallible allocation helpers. Buffers sized from caller input report
//! [`ErrorKind::OutOfMemory`] instead of aborting the process.

use crate::error::ErrorKind;

fn out_of_memory(len: usize) -> ErrorKind {
    ErrorKind::OutOfMemory { requested: len as u64 }
}

/// A zero-filled buffer of `len` bytes.
pub(crate) fn try_zeroed(len: usize) -> Result<Vec<u8>, ErrorKind> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).map_err(|_| out_of_memory(len))?;
    buf.resize(len, 0);
    Ok(buf)
}

/// An owned copy of `bytes`.
pub(crate) fn try_copy(bytes: &[u8]) -> Result<Vec<u8>, ErrorKind> {
    let mut out = Vec::new();
    out.try_reserve_exact(bytes.len())
        .map_err(|_| out_of_memory(bytes.len()))?;
    out.extend_from_slice(bytes);
    Ok(out)
}

/// Ensure `buf` holds at least `len` bytes.
pub(crate) fn grow(buf: &mut Vec<u8>, len: usize) -> Result<(), ErrorKind> {
    if buf.len() < len {
        buf.try_reserve_exact(len - buf.len())
            .map_err(|_| out_of_memory(len))?;
        buf.resize(len, 0);
    }
    Ok(())
}
