//! LDPC code selection and parity-check matrix construction.

use crate::error::FecError;
use crate::pmms::Pmms;

/// An LDPC code instance, fully determined by the announced parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LdpcCode {
    /// Systematic block count K.
    pub k: u16,
    /// Total coded block count N.
    pub n: u16,
    /// Column weight: ones per systematic column.
    pub n1: u8,
    /// PRNG seed for the matrix construction.
    pub seed: u32,
}

impl LdpcCode {
    /// Validate and construct a code.
    ///
    /// # Errors
    /// Returns `InvalidCode` when the parameters cannot produce a
    /// terminating matrix construction: `k == 0`, `n <= k`, a column
    /// weight outside `1..=n-k`, or a degenerate seed.
    pub fn new(k: u16, n: u16, n1: u8, seed: u32) -> Result<Self, FecError> {
        if k == 0 {
            return Err(FecError::InvalidCode { reason: "k" });
        }
        if n <= k {
            return Err(FecError::InvalidCode { reason: "n" });
        }
        if n1 == 0 || u16::from(n1) > n - k {
            return Err(FecError::InvalidCode { reason: "n1" });
        }
        if seed % 0x7FFF_FFFF == 0 {
            return Err(FecError::InvalidCode { reason: "seed" });
        }
        Ok(Self { k, n, n1, seed })
    }

    /// Number of parity equations.
    #[must_use]
    pub const fn parity_rows(&self) -> u16 {
        self.n - self.k
    }

    /// Build the left side of the parity-check matrix: one row per parity
    /// block, listing the systematic columns XORed into it, in insertion
    /// order.
    ///
    /// Placement draws slots from a pool that starts with the rows evenly
    /// repeated, guaranteeing a homogeneous distribution of ones; a repair
    /// pass afterwards brings every row up to degree two where possible.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn parity_matrix(&self) -> Vec<Vec<u16>> {
        let k = usize::from(self.k);
        let rows = usize::from(self.parity_rows());
        let n1 = usize::from(self.n1);
        let slots = k * n1;

        let mut prng = Pmms::new(self.seed);
        let mut p_tbl: Vec<usize> = (0..slots).map(|p| p % rows).collect();
        let mut matrix: Vec<Vec<u16>> = vec![Vec::new(); rows];
        let mut t = 0usize;

        for col in 0..self.k {
            for _ in 0..n1 {
                // Scan for an unused pool slot whose row can still take
                // this column.
                let mut i = t;
                while i < slots && matrix[p_tbl[i]].contains(&col) {
                    i += 1;
                }
                if i >= slots {
                    // Pool exhausted for this column; place directly.
                    loop {
                        let row = (prng.next_raw() % rows as u64) as usize;
                        if !matrix[row].contains(&col) {
                            matrix[row].push(col);
                            break;
                        }
                    }
                } else {
                    loop {
                        let p = (prng.next_raw() % (slots - t) as u64) as usize + t;
                        if !matrix[p_tbl[p]].contains(&col) {
                            matrix[p_tbl[p]].push(col);
                            p_tbl[p] = p_tbl[t];
                            t += 1;
                            break;
                        }
                    }
                }
            }
        }

        // Rows of degree below two cannot participate in decoding.
        for row in 0..rows {
            let degree = matrix[row].len();
            if degree == 0 {
                let col = (prng.next_raw() % k as u64) as u16;
                matrix[row].push(col);
            }
            if degree <= 1 && matrix[row].len() < k {
                loop {
                    let col = (prng.next_raw() % k as u64) as u16;
                    if !matrix[row].contains(&col) {
                        matrix[row].push(col);
                        break;
                    }
                }
            }
        }

        matrix
    }
}
