//! De Bruijn covering sequences
//!
//! `B(k, n)` is a cyclic sequence of length kⁿ over a k-symbol alphabet in
//! which every length-n word occurs exactly once as a (cyclic) window. It is
//! the shortest symbol stream that exercises every n-symbol address of a
//! fixed-length code, which is what makes it useful for exhaustive probing.
//!
//! The construction is the Fredricksen-Kessler-Maiorana "prefer smallest"
//! algorithm: concatenate, in lexicographic order, every Lyndon word whose
//! length divides n. Candidate symbols are tried in ascending order at each
//! branch, so the result is the lexicographically least de Bruijn sequence
//! (`B(2, 3)` over `"01"` is `00010111`).

use std::fmt;

use tracing::debug;

use crate::error::{OokError, Result};

/// Longest sequence the generator will build
pub const MAX_SEQUENCE_LEN: usize = 1 << 30;

/// A generated de Bruijn sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoveringSequence<T> {
    symbols: Vec<T>,
    order: usize,
}

impl<T> CoveringSequence<T> {
    /// Symbols of the cyclic sequence
    pub fn as_slice(&self) -> &[T] {
        &self.symbols
    }

    /// Take ownership of the symbols
    pub fn into_inner(self) -> Vec<T> {
        self.symbols
    }

    /// Sequence length (kⁿ)
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Never true for a generated sequence
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Word length n
    pub fn order(&self) -> usize {
        self.order
    }

    /// Consecutive non-overlapping `width`-symbol codes
    ///
    /// A trailing chunk shorter than `width` is dropped. With `width == n`
    /// this yields kⁿ⁻¹ codes, not every word; use [`windows`](Self::windows)
    /// or [`exhaustive_codes`] for full coverage.
    pub fn codes(&self, width: usize) -> std::slice::ChunksExact<'_, T> {
        self.symbols.chunks_exact(width.max(1))
    }
}

impl<T: Clone> CoveringSequence<T> {
    /// Every cyclic n-window, starting at each position in turn
    pub fn windows(&self) -> impl Iterator<Item = Vec<T>> + '_ {
        let len = self.symbols.len();
        (0..len).map(move |start| {
            (0..self.order)
                .map(|i| self.symbols[(start + i) % len].clone())
                .collect()
        })
    }

    /// The sequence followed by its first n-1 symbols
    ///
    /// Every word then appears as an ordinary, non-wrapping window.
    pub fn linear(&self) -> Vec<T> {
        let mut out = self.symbols.clone();
        out.extend(
            self.symbols
                .iter()
                .cycle()
                .take(self.order.saturating_sub(1))
                .cloned(),
        );
        out
    }
}

impl<T: fmt::Display> fmt::Display for CoveringSequence<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for s in &self.symbols {
            write!(f, "{s}")?;
        }
        Ok(())
    }
}

/// Index-level FKM recursion over a work array
struct Fkm {
    k: usize,
    n: usize,
    a: Vec<usize>,
    out: Vec<usize>,
}

impl Fkm {
    fn db(&mut self, t: usize, p: usize) {
        if t > self.n {
            if self.n % p == 0 {
                self.out.extend_from_slice(&self.a[1..=p]);
            }
        } else {
            let base = self.a[t - p];
            self.a[t] = base;
            self.db(t + 1, p);
            for j in base + 1..self.k {
                self.a[t] = j;
                self.db(t + 1, t);
            }
        }
    }
}

fn check_preconditions(k: usize, n: usize) -> Result<usize> {
    if k < 1 {
        return Err(OokError::InvalidParameter("alphabet must not be empty".into()));
    }
    if n < 1 {
        return Err(OokError::InvalidParameter("word length must be at least 1".into()));
    }
    if k == 1 {
        return Ok(1);
    }
    u32::try_from(n)
        .ok()
        .and_then(|n| k.checked_pow(n))
        .filter(|&len| len <= MAX_SEQUENCE_LEN)
        .ok_or_else(|| {
            OokError::InvalidParameter(format!(
                "B({k}, {n}) exceeds {MAX_SEQUENCE_LEN} symbols"
            ))
        })
}

/// Symbol indices of the lexicographically least `B(k, n)`
pub fn de_bruijn_indices(k: usize, n: usize) -> Result<Vec<usize>> {
    let len = check_preconditions(k, n)?;
    // B(1, n) is the lone symbol; the recursion would go n levels deep
    if k == 1 {
        return Ok(vec![0]);
    }

    let mut fkm = Fkm {
        k,
        n,
        a: vec![0; n + 1],
        out: Vec::with_capacity(len),
    };
    fkm.db(1, 1);

    debug!(k, n, len = fkm.out.len(), "built de Bruijn sequence");
    Ok(fkm.out)
}

/// De Bruijn sequence over `alphabet` with word length `n`
///
/// Alphabet symbols must be distinct; their order defines which symbol
/// counts as "smallest".
pub fn de_bruijn<T: Clone + PartialEq>(alphabet: &[T], n: usize) -> Result<CoveringSequence<T>> {
    for (i, s) in alphabet.iter().enumerate() {
        if alphabet[..i].contains(s) {
            return Err(OokError::InvalidParameter(format!(
                "alphabet symbol at index {i} is a duplicate"
            )));
        }
    }

    let indices = de_bruijn_indices(alphabet.len(), n)?;
    Ok(CoveringSequence {
        symbols: indices.into_iter().map(|i| alphabet[i].clone()).collect(),
        order: n,
    })
}

/// De Bruijn sequence over the characters of `alphabet`
pub fn de_bruijn_str(alphabet: &str, n: usize) -> Result<String> {
    let chars: Vec<char> = alphabet.chars().collect();
    Ok(de_bruijn(&chars, n)?.into_inner().into_iter().collect())
}

/// All kⁿ distinct n-symbol codes, in de Bruijn window order
///
/// Transmitting them back to back costs kⁿ·n symbols; transmitting
/// [`CoveringSequence::linear`] instead covers the same words in kⁿ+n-1
/// symbols when the receiver decodes a sliding window.
pub fn exhaustive_codes<T: Clone + PartialEq>(alphabet: &[T], n: usize) -> Result<Vec<Vec<T>>> {
    Ok(de_bruijn(alphabet, n)?.windows().collect())
}
