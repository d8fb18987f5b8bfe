//! Iterative erasure decoding over block-sized symbols.

use crate::code::LdpcCode;
use crate::error::FecError;

/// Unpadded length of systematic block `index` for a file of `file_len`
/// bytes split into `block_size`-byte blocks.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn systematic_len(block_size: usize, file_len: u64, index: u16) -> usize {
    let start = u64::from(index) * block_size as u64;
    file_len.saturating_sub(start).min(block_size as u64) as usize
}

/// XOR a (0xFF-padded) systematic block into `accum`.
fn xor_padded(accum: &mut [u8], block: &[u8]) {
    for (a, b) in accum.iter_mut().zip(block) {
        *a ^= b;
    }
    for a in &mut accum[block.len()..] {
        *a ^= 0xFF;
    }
}

/// Recover the missing systematic blocks from the received parity blocks.
///
/// `systematic` holds the K systematic payloads by index (the terminal one
/// may be shorter than `block_size`); `parity` holds the N-K parity
/// payloads by parity index. Recovered blocks are written into
/// `systematic` in place, truncated to their unpadded length. Returns the
/// number of blocks recovered.
///
/// Peeling: repeatedly find a parity equation with exactly one unknown
/// systematic column, solve it, and substitute. Substitution is performed
/// block-wise over byte buffers, never bit-wise.
///
/// # Errors
/// Returns `Insufficient` when no equation with a single unknown remains
/// while blocks are still missing (the caller keeps the assembly open),
/// and `BlockLength` if a parity payload does not match the symbol size.
pub fn decode(
    code: &LdpcCode,
    block_size: usize,
    file_len: u64,
    systematic: &mut [Option<Vec<u8>>],
    parity: &[Option<Vec<u8>>],
) -> Result<usize, FecError> {
    debug_assert_eq!(systematic.len(), usize::from(code.k));
    debug_assert_eq!(parity.len(), usize::from(code.parity_rows()));

    let mut missing = systematic.iter().filter(|b| b.is_none()).count();
    if missing == 0 {
        return Ok(0);
    }

    for (row, block) in parity.iter().enumerate() {
        if let Some(block) = block {
            if block.len() != block_size {
                return Err(FecError::BlockLength {
                    index: code.k + row as u16,
                    expected: block_size,
                    got: block.len(),
                });
            }
        }
    }

    let matrix = code.parity_matrix();
    let mut recovered = 0usize;

    loop {
        let mut progress = false;
        for (row, block) in parity.iter().enumerate() {
            let Some(block) = block else { continue };
            let columns = &matrix[row];
            let mut unknown = None;
            let mut unknown_count = 0usize;
            for &col in columns {
                if systematic[usize::from(col)].is_none() {
                    unknown = Some(col);
                    unknown_count += 1;
                    if unknown_count > 1 {
                        break;
                    }
                }
            }
            if unknown_count != 1 {
                continue;
            }
            let Some(target) = unknown else { continue };

            let mut accum = block.clone();
            for &col in columns {
                if col == target {
                    continue;
                }
                let Some(known) = systematic[usize::from(col)].as_ref() else {
                    continue;
                };
                xor_padded(&mut accum, known);
            }
            accum.truncate(systematic_len(block_size, file_len, target));
            systematic[usize::from(target)] = Some(accum);
            recovered += 1;
            missing -= 1;
            progress = true;
            if missing == 0 {
                return Ok(recovered);
            }
        }
        if !progress {
            return Err(FecError::Insufficient { missing });
        }
    }
}
