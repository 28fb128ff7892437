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

//! Error types for vending machine operations.

use crate::base::ItemId;
use crate::store::StoreError;
use thiserror::Error;

/// Vending machine operation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VendingError {
    /// Negative amount, negative price, empty name or similar malformed input
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Item ID is outside the catalogue
    #[error("item {0} not found")]
    ItemNotFound(ItemId),

    /// Item has no remaining stock
    #[error("item {0} is out of stock")]
    OutOfStock(ItemId),

    /// The change box cannot dispense the change owed
    #[error("cannot dispense change of {change_due}")]
    Infeasible { change_due: i64 },

    /// A cash ledger slot would drop below zero
    #[error("cash ledger balance would go negative")]
    NegativeBalance,

    /// Payment tendered does not yet cover the price
    #[error("payment of {paid} does not cover price {price}")]
    InsufficientPayment { paid: i64, price: i64 },

    /// Readiness gate refused a new purchase
    #[error("machine is not ready to serve purchases")]
    NotReady,

    /// Purchase step called out of order
    #[error("purchase step not allowed in state {0}")]
    InvalidState(&'static str),

    /// Ledger store read or write failed
    #[error("ledger store failure: {0}")]
    Store(String),
}

impl From<StoreError> for VendingError {
    fn from(error: StoreError) -> Self {
        VendingError::Store(error.to_string())
    }
}
