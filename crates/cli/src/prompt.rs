// SPDX-License-Identifier: MIT

//! Terminal-backed implementations of the confirmation gates the
//! orchestrator and the `--restore` flow need from an operator. Kept
//! separate from `holdfast_daemon` so the core crates never touch a
//! real terminal, matching the formatting-facade boundary the design
//! notes call for.

use holdfast_daemon::OperatorPrompt;
use std::io::Write;

/// Reads yes/no and numeric-choice answers from stdin, echoing the
/// question to stderr so it interleaves correctly with the shell's
/// stdout-based child output.
pub struct StdinPrompt;

impl StdinPrompt {
    /// Asks the operator to pick one of `count` zero-indexed items.
    /// Returns `None` on EOF, a blank line, or an out-of-range/unparsable
    /// answer rather than guessing.
    pub fn ask_index(&self, question: &str, count: usize) -> Option<usize> {
        eprint!("{question} (0-{}): ", count.saturating_sub(1));
        let _ = std::io::stderr().flush();
        let mut answer = String::new();
        if std::io::stdin().read_line(&mut answer).is_err() {
            return None;
        }
        let idx: usize = answer.trim().parse().ok()?;
        if idx < count {
            Some(idx)
        } else {
            None
        }
    }
}

impl OperatorPrompt for StdinPrompt {
    /// Any answer other than a leading `y`/`Y` is treated as "no" —
    /// declining by default is the safe outcome for every confirmation
    /// gate this type backs.
    fn confirm(&self, question: &str) -> bool {
        eprint!("{question} [y/N] ");
        let _ = std::io::stderr().flush();
        let mut answer = String::new();
        if std::io::stdin().read_line(&mut answer).is_err() {
            return false;
        }
        answer.trim().eq_ignore_ascii_case("y")
    }
}
