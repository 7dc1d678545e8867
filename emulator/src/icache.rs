//! Direct-mapped instruction cache
//!
//! Sits between fetch and decode and memoizes instruction words by address. Each address
//! maps to exactly one line, `(addr >> 2) mod line_count`, and the full address is the
//! tag. A miss overwrites whatever the line held; code is read-only for the whole run, so
//! nothing is ever written back and lines never go stale.

use serde::Serialize;

use crate::{EmuError, InstructionSource, MemoryError};

/// One cache slot
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheLine {
    pub tag: u64,
    pub valid: bool,
    pub word: u32,
}

/// Hit and miss counters of the instruction cache
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }

    /// Fraction of lookups served from the cache, 0.0 when nothing was looked up
    pub fn hit_rate(&self) -> f64 {
        match self.lookups() {
            0 => 0.0,
            lookups => self.hits as f64 / lookups as f64,
        }
    }
}

#[derive(Debug, Clone)]
pub struct InstructionCache {
    lines: Vec<CacheLine>,
    /// `line_count - 1`, line_count being a power of two
    index_mask: u64,
    stats: CacheStats,
}

impl InstructionCache {
    /// Create a cache with `line_count` lines, all invalid
    pub fn new(line_count: usize) -> Result<Self, EmuError> {
        if !line_count.is_power_of_two() {
            return Err(EmuError::InvalidConfig(format!(
                "cache line count {line_count} is not a power of two"
            )));
        }
        Ok(Self {
            lines: vec![CacheLine::default(); line_count],
            index_mask: line_count as u64 - 1,
            stats: CacheStats::default(),
        })
    }

    /// Reset the cache to its start-of-run state
    pub fn init(&mut self) {
        self.invalidate_all();
        self.stats = CacheStats::default();
    }

    /// Invalidate every line, keeping the statistics
    pub fn invalidate_all(&mut self) {
        self.lines.iter_mut().for_each(|line| line.valid = false);
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Line an address maps to
    #[inline]
    pub fn index_of(&self, addr: u64) -> usize {
        ((addr >> 2) & self.index_mask) as usize
    }

    /// Return the instruction word at `addr`, reading it from `source` on a miss
    pub fn lookup<S>(&mut self, addr: u64, source: &S) -> Result<u32, MemoryError>
    where
        S: InstructionSource + ?Sized,
    {
        let index = self.index_of(addr);
        let line = &mut self.lines[index];

        if line.valid && line.tag == addr {
            self.stats.hits += 1;
            return Ok(line.word);
        }

        let word = source.fetch_word(addr)?;
        *line = CacheLine { tag: addr, valid: true, word };
        self.stats.misses += 1;
        Ok(word)
    }
}
