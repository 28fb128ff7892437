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

//! Purchase sessions.
//!
//! One customer interaction moves through these states:
//!
//! ```text
//!  Idle ──select──► ItemSelected ──tender──► PaymentCollecting ──compute_change──► ChangeComputed ──commit──► Committed
//!   │                                         │  ▲                                  │
//!   │                                         └──┘ tender                           │
//!   └─select (sold out)──► Aborted ◄──── change infeasible / cancel ◄──────────────┘
//! ```
//!
//! Nothing touches the ledgers before `commit`; an aborted purchase hands the
//! tendered cash back through [`PurchaseState::Aborted::refund`].

use crate::base::{DenominationCount, ItemId};
use crate::change::make_change;
use crate::machine::VendingMachine;
use crate::stock::Item;
use crate::store::LedgerStore;
use crate::VendingError;
use tracing::warn;

/// Outcome of a committed purchase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub item_id: ItemId,
    pub item_name: String,
    pub price: i64,
    /// Cash tendered, as inserted.
    pub payment: DenominationCount,
    /// Cash dispensed from the change box.
    pub change: DenominationCount,
}

impl Receipt {
    pub fn paid(&self) -> i64 {
        self.payment.value()
    }

    pub fn change_value(&self) -> i64 {
        self.change.value()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    /// The customer walked away.
    Cancelled,
    Rejected(VendingError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurchaseState {
    Idle,
    ItemSelected {
        item_id: ItemId,
        price: i64,
    },
    PaymentCollecting {
        item_id: ItemId,
        price: i64,
        tendered: DenominationCount,
    },
    ChangeComputed {
        item_id: ItemId,
        price: i64,
        tendered: DenominationCount,
        change: DenominationCount,
    },
    Committed(Receipt),
    Aborted {
        reason: AbortReason,
        refund: DenominationCount,
    },
}

impl PurchaseState {
    pub fn name(&self) -> &'static str {
        match self {
            PurchaseState::Idle => "Idle",
            PurchaseState::ItemSelected { .. } => "ItemSelected",
            PurchaseState::PaymentCollecting { .. } => "PaymentCollecting",
            PurchaseState::ChangeComputed { .. } => "ChangeComputed",
            PurchaseState::Committed(_) => "Committed",
            PurchaseState::Aborted { .. } => "Aborted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PurchaseState::Committed(_) | PurchaseState::Aborted { .. })
    }

    fn tendered(&self) -> DenominationCount {
        match self {
            PurchaseState::PaymentCollecting { tendered, .. }
            | PurchaseState::ChangeComputed { tendered, .. } => *tendered,
            _ => DenominationCount::ZERO,
        }
    }
}

/// Running total of a payment against the item price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentProgress {
    pub paid: i64,
    pub price: i64,
}

impl PaymentProgress {
    pub fn is_sufficient(&self) -> bool {
        self.paid >= self.price
    }

    pub fn remaining(&self) -> i64 {
        (self.price - self.paid).max(0)
    }
}

/// A single purchase attempt against a [`VendingMachine`].
#[derive(Debug)]
pub struct Purchase<'a, S> {
    machine: &'a VendingMachine<S>,
    state: PurchaseState,
}

impl<'a, S: LedgerStore> Purchase<'a, S> {
    pub(crate) fn new(machine: &'a VendingMachine<S>) -> Self {
        Self {
            machine,
            state: PurchaseState::Idle,
        }
    }

    pub fn state(&self) -> &PurchaseState {
        &self.state
    }

    /// Chooses the item to buy.
    ///
    /// An unknown id leaves the purchase idle so the customer can choose
    /// again; a sold-out item aborts it.
    pub fn select(&mut self, id: ItemId) -> Result<Item, VendingError> {
        if self.state != PurchaseState::Idle {
            return Err(VendingError::InvalidState(self.state.name()));
        }
        let item = self.machine.find_item(id)?;
        let price = match item.price.amount() {
            Some(price) if !item.is_out_of_stock() => price,
            _ => return Err(self.abort(VendingError::OutOfStock(id))),
        };
        self.state = PurchaseState::ItemSelected { item_id: id, price };
        Ok(item)
    }

    /// Adds inserted notes and coins to the payment.
    pub fn tender(&mut self, notes: &DenominationCount) -> Result<PaymentProgress, VendingError> {
        if !notes.is_non_negative() {
            return Err(VendingError::InvalidArgument(format!(
                "tendered counts must not be negative, got {notes}"
            )));
        }
        let (item_id, price, tendered) = match self.state {
            PurchaseState::ItemSelected { item_id, price } => (item_id, price, Some(*notes)),
            PurchaseState::PaymentCollecting {
                item_id,
                price,
                tendered,
            } => (item_id, price, tendered.checked_add(notes)),
            _ => return Err(VendingError::InvalidState(self.state.name())),
        };
        let (tendered, paid) = tendered
            .and_then(|tendered| Some((tendered, tendered.checked_value()?)))
            .ok_or_else(|| {
                VendingError::InvalidArgument(format!("payment of {notes} is too large to accept"))
            })?;
        self.state = PurchaseState::PaymentCollecting {
            item_id,
            price,
            tendered,
        };
        Ok(PaymentProgress { paid, price })
    }

    /// Works out the change against a snapshot of the change box.
    ///
    /// Aborts the purchase when the change box cannot pay it out, either
    /// because its total value is too small or because it lacks units of a
    /// denomination the breakdown needs.
    pub fn compute_change(&mut self) -> Result<DenominationCount, VendingError> {
        let PurchaseState::PaymentCollecting {
            item_id,
            price,
            tendered,
        } = self.state
        else {
            return Err(VendingError::InvalidState(self.state.name()));
        };
        let paid = tendered.value();
        if paid < price {
            return Err(VendingError::InsufficientPayment { paid, price });
        }

        let available = self.machine.change_box();
        let change = match make_change(price, paid, &available) {
            Ok(change) => change,
            Err(e) => return Err(self.abort(e)),
        };
        if !available.covers(&change) {
            return Err(self.abort(VendingError::Infeasible {
                change_due: paid - price,
            }));
        }

        self.state = PurchaseState::ChangeComputed {
            item_id,
            price,
            tendered,
            change,
        };
        Ok(change)
    }

    /// Applies the purchase to all three ledgers at once.
    pub fn commit(&mut self) -> Result<Receipt, VendingError> {
        let PurchaseState::ChangeComputed {
            item_id,
            price,
            tendered,
            change,
        } = self.state
        else {
            return Err(VendingError::InvalidState(self.state.name()));
        };
        match self.machine.commit_purchase(item_id, price, &tendered, &change) {
            Ok(receipt) => {
                self.state = PurchaseState::Committed(receipt.clone());
                Ok(receipt)
            }
            Err(e) => Err(self.abort(e)),
        }
    }

    /// [`compute_change`](Self::compute_change) followed by [`commit`](Self::commit).
    pub fn checkout(&mut self) -> Result<Receipt, VendingError> {
        self.compute_change()?;
        self.commit()
    }

    /// Abandons the purchase and returns the cash tendered so far.
    pub fn cancel(&mut self) -> DenominationCount {
        if self.state.is_terminal() {
            return DenominationCount::ZERO;
        }
        let refund = self.state.tendered();
        self.state = PurchaseState::Aborted {
            reason: AbortReason::Cancelled,
            refund,
        };
        refund
    }

    fn abort(&mut self, error: VendingError) -> VendingError {
        let refund = self.state.tendered();
        warn!(state = self.state.name(), error = %error, refund = %refund, "purchase aborted");
        self.state = PurchaseState::Aborted {
            reason: AbortReason::Rejected(error.clone()),
            refund,
        };
        error
    }
}
