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

//! Greedy change-making.
//!
//! The denominations `100, 20, 10, 5, 1` form a canonical coin system, so the
//! greedy breakdown is always exact and uses the fewest notes and coins. The
//! breakdown is computed from value alone: a change box can pass the value
//! check and still lack the units of one specific denomination, which callers
//! must check with [`DenominationCount::covers`] before debiting.

use crate::VendingError;
use crate::base::{DENOMINATION_SLOTS, DENOMINATIONS, DenominationCount};
use tracing::debug;

/// Splits `amount` into denominations, largest first.
pub fn greedy_breakdown(amount: i64) -> DenominationCount {
    let mut remaining = amount;
    let mut counts = [0; DENOMINATION_SLOTS];
    for (slot, denomination) in DENOMINATIONS.iter().enumerate() {
        counts[slot] = remaining / denomination;
        remaining %= denomination;
    }
    debug_assert_eq!(remaining, 0);
    DenominationCount::new(counts)
}

/// Computes the change owed for `tendered` against `price`.
///
/// # Errors
///
/// - [`VendingError::InsufficientPayment`] - `tendered < price`.
/// - [`VendingError::InvalidArgument`] - `tendered - price` overflows.
/// - [`VendingError::Infeasible`] - `availability` holds no more value than
///   the change owed.
pub fn make_change(
    price: i64,
    tendered: i64,
    availability: &DenominationCount,
) -> Result<DenominationCount, VendingError> {
    let change_due = tendered.checked_sub(price).ok_or_else(|| {
        VendingError::InvalidArgument(format!("change for {tendered} against {price} overflows"))
    })?;
    if change_due < 0 {
        return Err(VendingError::InsufficientPayment { paid: tendered, price });
    }

    let available = availability.value();
    if available <= change_due {
        debug!(change_due, available, "change box cannot cover change");
        return Err(VendingError::Infeasible { change_due });
    }

    let change = greedy_breakdown(change_due);
    debug!(change_due, %change, "computed change");
    Ok(change)
}
