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

//! # Vending Machine
//!
//! This library provides the accounting engine of a self-service vending
//! machine: an inventory of priced items, a change box used to pay out
//! change, and an operator-only collection box that accumulates payments.
//!
//! ## Core Components
//!
//! - [`VendingMachine`]: Owns the ledgers, gates readiness, runs admin operations
//! - [`Purchase`]: One customer interaction, from item selection to commit or abort
//! - [`StockLedger`]: Items with price and remaining amount
//! - [`CashLedger`]: Per-denomination counts for the change and collection boxes
//! - [`make_change`]: Greedy change computation over [`DENOMINATIONS`]
//! - [`LedgerStore`]: Persistence collaborator, with [`MemoryStore`] and [`CsvStore`]
//! - [`VendingError`]: Error types for rejected and aborted operations
//!
//! ## Example
//!
//! ```
//! use vending_machine_rs::{DenominationCount, ItemId, MachineConfig, MemoryStore, VendingMachine};
//!
//! let machine = VendingMachine::open(MemoryStore::new(), MachineConfig::default()).unwrap();
//! machine.restock("cola", 15, 3).unwrap();
//! machine.refill_change_box(&DenominationCount::new([1, 1, 5, 5, 5])).unwrap();
//!
//! // Pay for a 15 item with one 20 note
//! let mut purchase = machine.begin_purchase().unwrap();
//! purchase.select(ItemId(1)).unwrap();
//! purchase.tender(&DenominationCount::single(20, 1).unwrap()).unwrap();
//! let receipt = purchase.checkout().unwrap();
//!
//! assert_eq!(receipt.change, DenominationCount::new([0, 0, 0, 1, 0]));
//! assert_eq!(machine.find_item(ItemId(1)).unwrap().amount, 2);
//! ```
//!
//! ## Consistency
//!
//! All ledgers live behind a single lock inside [`VendingMachine`]. A purchase
//! validates the stock decrement, the change box debit and the collection box
//! credit before applying any of them, so a failed purchase leaves every
//! ledger exactly as it was.

mod base;
pub mod cash;
mod change;
mod config;
pub mod error;
mod machine;
pub mod purchase;
pub mod stock;
pub mod store;

pub use base::{DENOMINATION_SLOTS, DENOMINATIONS, DenominationCount, ItemId};
pub use cash::{CashBox, CashLedger};
pub use change::{greedy_breakdown, make_change};
pub use config::MachineConfig;
pub use error::VendingError;
pub use machine::VendingMachine;
pub use purchase::{AbortReason, PaymentProgress, Purchase, PurchaseState, Receipt};
pub use stock::{Item, Price, StockLedger, StockRatio};
pub use store::{CsvStore, LedgerStore, MemoryStore, StoreError};
