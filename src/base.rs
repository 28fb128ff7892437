// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Core identifier and denomination types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Index;

/// Face values the machine recognises, largest first.
///
/// Every cash ledger and every change breakdown is aligned 1:1 with this list.
pub const DENOMINATIONS: [i64; 5] = [100, 20, 10, 5, 1];

/// Number of slots in a [`DenominationCount`].
pub const DENOMINATION_SLOTS: usize = DENOMINATIONS.len();

/// Stable identifier of a stock item, assigned on creation starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ItemId(pub u32);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Number of notes/coins held per denomination, aligned with [`DENOMINATIONS`].
///
/// Slots are signed so the same type carries at-rest balances and pending
/// deltas. Ledgers refuse to commit a state with any negative slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DenominationCount([i64; DENOMINATION_SLOTS]);

impl DenominationCount {
    pub const ZERO: Self = Self([0; DENOMINATION_SLOTS]);

    pub const fn new(counts: [i64; DENOMINATION_SLOTS]) -> Self {
        Self(counts)
    }

    /// Count holding `units` of a single denomination and nothing else.
    ///
    /// Returns `None` if `denomination` is not in [`DENOMINATIONS`].
    pub fn single(denomination: i64, units: i64) -> Option<Self> {
        let slot = DENOMINATIONS.iter().position(|&d| d == denomination)?;
        let mut counts = [0; DENOMINATION_SLOTS];
        counts[slot] = units;
        Some(Self(counts))
    }

    pub fn counts(&self) -> [i64; DENOMINATION_SLOTS] {
        self.0
    }

    /// Pairs of `(denomination, count)`, largest denomination first.
    pub fn iter(&self) -> impl Iterator<Item = (i64, i64)> + '_ {
        DENOMINATIONS.iter().copied().zip(self.0.iter().copied())
    }

    /// Σ `count * denomination`, or `None` if it does not fit in an `i64`.
    pub fn checked_value(&self) -> Option<i64> {
        self.iter().try_fold(0i64, |total, (denomination, count)| {
            total.checked_add(denomination.checked_mul(count)?)
        })
    }

    /// Σ `count * denomination`, saturating at the `i64` bounds.
    ///
    /// Exact for every ledger state and payment the machine accepts, since
    /// those are admitted through [`checked_value`](Self::checked_value).
    pub fn value(&self) -> i64 {
        self.iter().fold(0i64, |total, (denomination, count)| {
            total.saturating_add(denomination.saturating_mul(count))
        })
    }

    /// Total number of notes and coins, saturating.
    pub fn pieces(&self) -> i64 {
        self.0.iter().fold(0i64, |total, &count| total.saturating_add(count))
    }

    pub fn min_count(&self) -> i64 {
        self.0.iter().copied().min().unwrap_or(0)
    }

    pub fn max_count(&self) -> i64 {
        self.0.iter().copied().max().unwrap_or(0)
    }

    pub fn is_non_negative(&self) -> bool {
        self.0.iter().all(|&count| count >= 0)
    }

    /// True when every slot of `self` holds at least as many units as `other`.
    pub fn covers(&self, other: &DenominationCount) -> bool {
        self.0.iter().zip(other.0.iter()).all(|(have, want)| have >= want)
    }

    /// Element-wise sum, `None` if any slot overflows.
    pub fn checked_add(&self, other: &DenominationCount) -> Option<DenominationCount> {
        self.zip_with(other, i64::checked_add)
    }

    /// Element-wise difference, `None` if any slot overflows.
    pub fn checked_sub(&self, other: &DenominationCount) -> Option<DenominationCount> {
        self.zip_with(other, i64::checked_sub)
    }

    fn zip_with(
        &self,
        other: &DenominationCount,
        op: impl Fn(i64, i64) -> Option<i64>,
    ) -> Option<DenominationCount> {
        let mut counts = [0; DENOMINATION_SLOTS];
        for (slot, (a, b)) in counts.iter_mut().zip(self.0.iter().zip(other.0.iter())) {
            *slot = op(*a, *b)?;
        }
        Some(DenominationCount(counts))
    }
}

impl Index<usize> for DenominationCount {
    type Output = i64;

    fn index(&self, slot: usize) -> &i64 {
        &self.0[slot]
    }
}


impl fmt::Display for DenominationCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (denomination, count) in self.iter() {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "{denomination}:{count}")?;
            first = false;
        }
        Ok(())
    }
}
