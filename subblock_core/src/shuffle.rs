//! Byte shuffling.
//!
//! A buffer of `N * item_size` bytes is viewed as `N` items. Shuffling groups
//! byte `p` of every item together:
//!
//! ```text
//! out[p * N + i] = in[i * item_size + p]
//! ```
//!
//! For arrays of 16/32/64-bit numbers with locality, the high-order byte
//! planes become long runs of similar values, which compress much better.
//! The transform is applied to the whole buffer, never per subblock.

use crate::buffer::{try_copy, try_zeroed};
use crate::error::ErrorKind;

/// Whether a buffer of `len` bytes can be shuffled with `item_size`.
pub fn is_shufflable(len: usize, item_size: usize) -> bool {
    item_size > 1 && len > 0 && len % item_size == 0
}

/// Shuffle `data`. Returns an unchanged copy when the buffer is not
/// shufflable with `item_size`.
pub fn shuffle(data: &[u8], item_size: usize) -> Result<Vec<u8>, ErrorKind> {
    if !is_shufflable(data.len(), item_size) {
        return try_copy(data);
    }
    let items = data.len() / item_size;
    let mut out = try_zeroed(data.len())?;
    for (p, plane) in out.chunks_exact_mut(items).enumerate() {
        for (dst, item) in plane.iter_mut().zip(data.chunks_exact(item_size)) {
            *dst = item[p];
        }
    }
    Ok(out)
}

/// Reverse [`shuffle`]. Returns an unchanged copy when the buffer is not
/// shufflable with `item_size`.
pub fn unshuffle(data: &[u8], item_size: usize) -> Result<Vec<u8>, ErrorKind> {
    let mut out = try_copy(data)?;
    unshuffle_in_place(&mut out, item_size)?;
    Ok(out)
}

/// Reverse [`shuffle`] in place. Returns `false`, leaving `data` untouched,
/// when the buffer is not shufflable with `item_size`.
pub fn unshuffle_in_place(data: &mut [u8], item_size: usize) -> Result<bool, ErrorKind> {
    if !is_shufflable(data.len(), item_size) {
        return Ok(false);
    }
    let items = data.len() / item_size;
    let shuffled = try_copy(data)?;
    for (p, plane) in shuffled.chunks_exact(items).enumerate() {
        for (src, item) in plane.iter().zip(data.chunks_exact_mut(item_size)) {
            item[p] = *src;
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_byte_planes() {
        let data = [1u8, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12];
        assert_eq!(shuffle(&data, 4).unwrap(), vec![1, 5, 9, 2, 6, 10, 3, 7, 11, 4, 8, 12]);
        assert_eq!(shuffle(&data, 3).unwrap(), vec![1, 4, 7, 10, 2, 5, 8, 11, 3, 6, 9, 12]);
    }

    #[test]
    fn unshuffle_inverts() {
        let data: Vec<u8> = (0..=255).cycle().take(4096).collect();
        for item_size in [2, 4, 8, 16] {
            let s = shuffle(&data, item_size).unwrap();
            assert_ne!(s, data);
            assert_eq!(unshuffle(&s, item_size).unwrap(), data);

            let mut in_place = s.clone();
            assert!(unshuffle_in_place(&mut in_place, item_size).unwrap());
            assert_eq!(in_place, data);
        }
    }

    #[test]
    fn noop_when_not_applicable() {
        let data = vec![9u8, 8, 7, 6, 5];
        assert_eq!(shuffle(&data, 1).unwrap(), data);
        assert_eq!(shuffle(&data, 2).unwrap(), data);
        assert_eq!(shuffle(&[], 4).unwrap(), Vec::<u8>::new());

        let mut d = data.clone();
        assert!(!unshuffle_in_place(&mut d, 4).unwrap());
        assert!(!unshuffle_in_place(&mut d, 0).unwrap());
        assert_eq!(d, data);
    }

    #[test]
    fn f32_exponent_bytes_end_up_together() {
        let values: Vec<f32> = (0..64).map(|i| 1.0 + i as f32 / 1024.0).collect();
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        let s = shuffle(&bytes, 4).unwrap();
        // little-endian: plane 3 holds the sign/exponent byte of every value
        assert!(s[3 * 64..].iter().all(|&b| b == 0x3f));
    }
}
