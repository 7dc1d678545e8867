//! Execution statistics
//!
//! Counters are bumped by the executor as instructions retire and are only meant to be
//! read once the run is over, through the copy returned by `Machine::counters`.

use rvemu_riscv::Format;
use serde::Serialize;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnalysisCounters {
    /// Executed instructions of every kind
    pub instructions: u64,
    /// R-type, R-type-64 and I-type arithmetic instructions
    pub arithmetic: u64,
    pub loads: u64,
    pub stores: u64,
    /// jal and jalr
    pub jumps: u64,
    pub branches_taken: u64,
    pub branches_not_taken: u64,
}

impl AnalysisCounters {
    /// Conditional branches executed, taken or not
    pub fn branches(&self) -> u64 {
        self.branches_taken + self.branches_not_taken
    }

    /// Count one retired instruction of the given format
    ///
    /// Branches are not counted here since their counter depends on the outcome.
    pub(crate) fn on_format(&mut self, format: Format) {
        match format {
            Format::R | Format::R64 | Format::IArith => self.arithmetic += 1,
            Format::ILoad => self.loads += 1,
            Format::S => self.stores += 1,
            Format::IJalr | Format::J => self.jumps += 1,
            Format::B => {}
        }
    }

    pub(crate) fn on_branch(&mut self, taken: bool) {
        if taken {
            self.branches_taken += 1;
        } else {
            self.branches_not_taken += 1;
        }
    }

    /// Returns a human-readable table of all counters
    pub fn report(&self) -> String {
        let total = self.instructions;
        let branches = self.branches();

        let mut output = String::from("=== Analysis\n");
        output += &format!("Instructions Executed  = {total}\n");
        output += &line("R-type + I-type        ", self.arithmetic, total);
        output += &line("Loads                  ", self.loads, total);
        output += &line("Stores                 ", self.stores, total);
        output += &line("Jumps/JAL/JALR         ", self.jumps, total);
        output += &line("Conditional branches   ", branches, total);
        output += &line("  Branches taken       ", self.branches_taken, branches);
        output += &line("  Branches not taken   ", self.branches_not_taken, branches);
        output
    }
}

fn line(label: &str, count: u64, total: u64) -> String {
    format!("{label}= {count} ({:.2}%)\n", percent(count, total))
}

fn percent(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}
