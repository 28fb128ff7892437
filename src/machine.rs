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

//! Vending machine.
//!
//! [`VendingMachine`] owns the stock ledger, the change box and the
//! collection box, together with the store they are persisted in. All three
//! ledgers sit behind one lock, so a purchase commit and an admin operation
//! can never observe each other half-applied.
//!
//! # Example
//!
//! ```
//! use vending_machine_rs::{DenominationCount, MachineConfig, MemoryStore, VendingMachine};
//!
//! let machine = VendingMachine::open(MemoryStore::new(), MachineConfig::default()).unwrap();
//! machine.restock("cola", 15, 3).unwrap();
//! machine.refill_change_box(&DenominationCount::new([1, 5, 5, 5, 5])).unwrap();
//!
//! let twenty = DenominationCount::single(20, 1).unwrap();
//! let receipt = machine.purchase(vending_machine_rs::ItemId(1), &twenty).unwrap();
//! assert_eq!(receipt.change, DenominationCount::single(5, 1).unwrap());
//! ```

use crate::base::{DenominationCount, ItemId};
use crate::cash::{CashBox, CashLedger};
use crate::config::MachineConfig;
use crate::purchase::{Purchase, Receipt};
use crate::stock::{Item, StockLedger, StockRatio};
use crate::store::LedgerStore;
use crate::VendingError;
use parking_lot::Mutex;
use tracing::{debug, error, info};

#[derive(Debug)]
struct MachineState<S> {
    store: S,
    stock: StockLedger,
    change_box: CashLedger,
    collection_box: CashLedger,
}

impl<S: LedgerStore> MachineState<S> {
    fn load(mut store: S) -> Result<Self, VendingError> {
        let mut items = Vec::new();
        for id in 1..=store.item_count()? as u32 {
            let item = store
                .get_item(ItemId(id))?
                .ok_or_else(|| VendingError::Store(format!("stock row {id} is missing")))?;
            items.push(item);
        }
        let stock = StockLedger::from_items(items)?;

        let change_box = Self::load_cash(&mut store, CashBox::Change)?;
        let collection_box = Self::load_cash(&mut store, CashBox::Collection)?;

        Ok(Self {
            store,
            stock,
            change_box,
            collection_box,
        })
    }

    /// Reads a cash record, creating it at zero on first startup.
    fn load_cash(store: &mut S, which: CashBox) -> Result<CashLedger, VendingError> {
        match store.get_cash_record(which)? {
            Some(counts) => CashLedger::with_counts(which, counts),
            None => {
                info!(%which, "initialising empty cash record");
                store.put_cash_record(which, &DenominationCount::ZERO)?;
                Ok(CashLedger::new(which))
            }
        }
    }

    fn refresh_out_of_stock_markers(&mut self) -> Result<StockRatio, VendingError> {
        for item in self.stock.refresh_out_of_stock_markers() {
            self.store.put_item(&item)?;
        }
        Ok(self.stock.fraction_out_of_stock())
    }
}

/// Accounting core of a vending machine.
#[derive(Debug)]
pub struct VendingMachine<S> {
    config: MachineConfig,
    inner: Mutex<MachineState<S>>,
}

impl<S: LedgerStore> VendingMachine<S> {
    /// Loads all ledgers from `store`.
    ///
    /// Missing cash records are created with every count at zero.
    pub fn open(store: S, config: MachineConfig) -> Result<Self, VendingError> {
        let state = MachineState::load(store)?;
        info!(
            items = state.stock.len(),
            change_box = %state.change_box.counts(),
            collection_box = %state.collection_box.counts(),
            "vending machine opened"
        );
        Ok(Self {
            config,
            inner: Mutex::new(state),
        })
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    /// Releases the underlying store.
    pub fn into_store(self) -> S {
        self.inner.into_inner().store
    }

    /// All items in ascending id order.
    pub fn items(&self) -> Vec<Item> {
        self.inner.lock().stock.list_items().to_vec()
    }

    pub fn find_item(&self, id: ItemId) -> Result<Item, VendingError> {
        self.inner.lock().stock.find_item(id).cloned()
    }

    pub fn change_box(&self) -> DenominationCount {
        self.inner.lock().change_box.counts()
    }

    pub fn collection_box(&self) -> DenominationCount {
        self.inner.lock().collection_box.counts()
    }

    /// Share of sold-out items, after refreshing their out-of-stock markers.
    pub fn fraction_out_of_stock(&self) -> Result<StockRatio, VendingError> {
        self.inner.lock().refresh_out_of_stock_markers()
    }

    /// Decides whether the machine may start a new purchase.
    ///
    /// Not ready when at least half the catalogue is sold out, when any
    /// change box denomination is empty, or when any collection box
    /// denomination has reached
    /// [`max_collection_per_denomination`](MachineConfig::max_collection_per_denomination).
    pub fn is_ready(&self) -> Result<bool, VendingError> {
        let mut state = self.inner.lock();
        let ratio = state.refresh_out_of_stock_markers()?;
        let stock_depleted = ratio.at_least_half();
        let change_empty = state.change_box.min_count() == 0;
        let collection_full =
            state.collection_box.max_count() >= i64::from(self.config.max_collection_per_denomination);

        let ready = !(stock_depleted || change_empty || collection_full);
        debug!(
            ready,
            out_of_stock = ratio.out_of_stock,
            items = ratio.total,
            change_empty,
            collection_full,
            "evaluated readiness"
        );
        Ok(ready)
    }

    /// Starts a purchase session.
    ///
    /// # Errors
    ///
    /// [`VendingError::NotReady`] if the readiness gate refuses service.
    pub fn begin_purchase(&self) -> Result<Purchase<'_, S>, VendingError> {
        if !self.is_ready()? {
            return Err(VendingError::NotReady);
        }
        Ok(Purchase::new(self))
    }

    /// Runs a whole purchase: select `id`, tender `payment`, commit.
    pub fn purchase(&self, id: ItemId, payment: &DenominationCount) -> Result<Receipt, VendingError> {
        let mut purchase = self.begin_purchase()?;
        purchase.select(id)?;
        purchase.tender(payment)?;
        purchase.checkout()
    }

    /// Applies a purchase as one unit: stock decrement, change box debit and
    /// collection box credit are all validated before any of them is applied.
    ///
    /// # Errors
    ///
    /// - [`VendingError::ItemNotFound`] / [`VendingError::OutOfStock`] - the item can no longer be sold.
    /// - [`VendingError::InvalidState`] - the price changed since selection.
    /// - [`VendingError::NegativeBalance`] - `change` exceeds the change box.
    /// - [`VendingError::Store`] - persisting failed; in-memory ledgers are unchanged.
    pub(crate) fn commit_purchase(
        &self,
        id: ItemId,
        price: i64,
        payment: &DenominationCount,
        change: &DenominationCount,
    ) -> Result<Receipt, VendingError> {
        let mut guard = self.inner.lock();
        let state = &mut *guard;

        let current = state.stock.find_item(id)?.clone();
        if current.price.amount() != Some(price) {
            if current.is_out_of_stock() {
                return Err(VendingError::OutOfStock(id));
            }
            return Err(VendingError::InvalidState("price changed since selection"));
        }
        let item = current.purchased()?;
        let change_box = state.change_box.debited(change).inspect_err(|_| {
            error!(item = %id, %change, "change box debit would go negative");
        })?;
        let collection_box = state.collection_box.credited(payment)?;

        let persisted = state
            .store
            .put_item(&item)
            .and_then(|_| state.store.put_cash_record(CashBox::Change, &change_box))
            .and_then(|_| state.store.put_cash_record(CashBox::Collection, &collection_box));
        if let Err(e) = persisted {
            error!(item = %id, error = %e, "failed to persist purchase, restoring stored ledgers");
            restore_records(
                &mut state.store,
                &current,
                &state.change_box.counts(),
                &state.collection_box.counts(),
            );
            return Err(e.into());
        }

        let receipt = Receipt {
            item_id: id,
            item_name: item.name.clone(),
            price,
            payment: *payment,
            change: *change,
        };
        state.stock.replace(item);
        state.change_box.apply(change_box);
        state.collection_box.apply(collection_box);

        info!(
            item = %id,
            price,
            paid = payment.value(),
            change = %receipt.change,
            "purchase committed"
        );
        Ok(receipt)
    }

    /// Adds `amount` units of `name` at `price`, creating the item if unseen.
    pub fn restock(&self, name: &str, price: i64, amount: i64) -> Result<Item, VendingError> {
        let mut state = self.inner.lock();
        let item = state.stock.restocked(name, price, amount)?;
        state.store.put_item(&item)?;
        state.stock.replace(item.clone());
        info!(item = %item.id, name = %item.name, price, amount = item.amount, "restocked");
        Ok(item)
    }

    /// Credits the change box. Refills never remove cash.
    ///
    /// Returns the new change box counts.
    pub fn refill_change_box(&self, counts: &DenominationCount) -> Result<DenominationCount, VendingError> {
        if !counts.is_non_negative() {
            return Err(VendingError::InvalidArgument(format!(
                "refill counts must not be negative, got {counts}"
            )));
        }
        let mut state = self.inner.lock();
        let next = state.change_box.credited(counts)?;
        state.store.put_cash_record(CashBox::Change, &next)?;
        state.change_box.apply(next);
        info!(added = %counts, change_box = %next, "refilled change box");
        Ok(next)
    }

    /// Empties the collection box and returns the value collected.
    pub fn empty_collection_box(&self) -> Result<i64, VendingError> {
        let mut state = self.inner.lock();
        let total = state.collection_box.total_value();
        state
            .store
            .put_cash_record(CashBox::Collection, &DenominationCount::ZERO)?;
        state.collection_box.reset();
        info!(total, "emptied collection box");
        Ok(total)
    }
}

/// Writes back the pre-commit records after a partially persisted purchase.
///
/// Every record is attempted even if an earlier one fails.
fn restore_records<S: LedgerStore>(
    store: &mut S,
    item: &Item,
    change_box: &DenominationCount,
    collection_box: &DenominationCount,
) {
    let results = [
        store.put_item(item),
        store.put_cash_record(CashBox::Change, change_box),
        store.put_cash_record(CashBox::Collection, collection_box),
    ];
    for e in results.into_iter().filter_map(Result::err) {
        error!(item = %item.id, error = %e, "failed to restore stored ledger record");
    }
}
