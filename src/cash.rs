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

//! Cash ledgers.
//!
//! A machine holds two ledgers with identical behaviour: the change box that
//! pays out change and the collection box that accumulates payments. Every
//! mutation is all-or-nothing: a delta that would leave any slot negative is
//! rejected and the ledger keeps its previous counts.
//!
//! # Example
//!
//! ```
//! use vending_machine_rs::{CashBox, CashLedger, DenominationCount};
//!
//! let mut change_box = CashLedger::new(CashBox::Change);
//! change_box.credit(&DenominationCount::new([0, 0, 5, 5, 5])).unwrap();
//! assert_eq!(change_box.total_value(), 80);
//! ```

use crate::VendingError;
use crate::base::DenominationCount;
use std::fmt;

/// Identity of a cash ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CashBox {
    Change,
    Collection,
}

impl fmt::Display for CashBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CashBox::Change => f.write_str("change box"),
            CashBox::Collection => f.write_str("collection box"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CashLedger {
    which: CashBox,
    counts: DenominationCount,
}

impl CashLedger {
    /// Creates an empty ledger.
    pub fn new(which: CashBox) -> Self {
        Self {
            which,
            counts: DenominationCount::ZERO,
        }
    }

    /// Restores a ledger from stored counts.
    ///
    /// # Errors
    ///
    /// [`VendingError::NegativeBalance`] if any stored count is negative.
    pub fn with_counts(which: CashBox, counts: DenominationCount) -> Result<Self, VendingError> {
        if !counts.is_non_negative() {
            return Err(VendingError::NegativeBalance);
        }
        if counts.checked_value().is_none() {
            return Err(overflow(which));
        }
        Ok(Self { which, counts })
    }

    pub fn which(&self) -> CashBox {
        self.which
    }

    pub fn counts(&self) -> DenominationCount {
        self.counts
    }

    pub fn total_value(&self) -> i64 {
        self.counts.value()
    }

    pub fn min_count(&self) -> i64 {
        self.counts.min_count()
    }

    pub fn max_count(&self) -> i64 {
        self.counts.max_count()
    }

    /// Counts this ledger would hold after crediting `delta`.
    ///
    /// # Errors
    ///
    /// - [`VendingError::NegativeBalance`] - a slot would drop below zero.
    /// - [`VendingError::InvalidArgument`] - a count or the total value would overflow.
    pub fn credited(&self, delta: &DenominationCount) -> Result<DenominationCount, VendingError> {
        self.validated(self.counts.checked_add(delta))
    }

    pub fn debited(&self, delta: &DenominationCount) -> Result<DenominationCount, VendingError> {
        self.validated(self.counts.checked_sub(delta))
    }

    fn validated(&self, next: Option<DenominationCount>) -> Result<DenominationCount, VendingError> {
        let next = next.ok_or_else(|| overflow(self.which))?;
        if !next.is_non_negative() {
            return Err(VendingError::NegativeBalance);
        }
        if next.checked_value().is_none() {
            return Err(overflow(self.which));
        }
        Ok(next)
    }

    /// Adds `delta` element-wise. Entries may be negative as long as every
    /// resulting slot stays at or above zero.
    pub fn credit(&mut self, delta: &DenominationCount) -> Result<(), VendingError> {
        let next = self.credited(delta)?;
        self.apply(next);
        Ok(())
    }

    pub fn debit(&mut self, delta: &DenominationCount) -> Result<(), VendingError> {
        let next = self.debited(delta)?;
        self.apply(next);
        Ok(())
    }

    pub fn reset(&mut self) {
        self.apply(DenominationCount::ZERO);
    }

    /// Replaces the counts with a state previously validated by
    /// [`credited`](Self::credited) or [`debited`](Self::debited).
    pub(crate) fn apply(&mut self, counts: DenominationCount) {
        debug_assert!(
            counts.is_non_negative(),
            "Invariant violated: {} went negative: {}",
            self.which,
            counts
        );
        self.counts = counts;
    }
}

fn overflow(which: CashBox) -> VendingError {
    VendingError::InvalidArgument(format!("{which} counts would overflow"))
}
