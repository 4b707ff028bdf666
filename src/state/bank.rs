//! Epoch-scoped bank accounting.
//!
//! The bank is recomputed from scratch on every reveal or hide. A slot only
//! contributes when it is revealed *and* its reveal is stamped with the
//! current epoch, so answers that were on the board when the bank was last
//! paid out (or frozen) can never be claimed twice. The `revealed` flag is a
//! display property; the epoch stamp is the accounting property.

use crate::state::game::{Answer, Round};

/// Whether `answer` counts toward the bank of `epoch`.
pub fn counts_in(answer: &Answer, epoch: u64) -> bool {
    answer.revealed && answer.revealed_epoch == Some(epoch)
}

/// Bank value for `round` in `epoch`: multiplier times the points of every counting slot.
pub fn recompute(round: Option<&Round>, epoch: u64) -> u64 {
    let Some(round) = round else {
        return 0;
    };

    let raw: u64 = round
        .answers
        .iter()
        .filter(|answer| counts_in(answer, epoch))
        .map(|answer| u64::from(answer.points))
        .sum();

    raw * u64::from(round.multiplier)
}
