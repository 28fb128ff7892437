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

//! Property-based tests for the vending machine ledgers.

use proptest::prelude::*;
use vending_machine_rs::{
    DENOMINATIONS, DenominationCount, ItemId, MachineConfig, MemoryStore, Price, StockLedger,
    VendingError, VendingMachine, make_change,
};

// === Strategies ===

fn arb_counts(max: i64) -> impl Strategy<Value = DenominationCount> {
    prop::array::uniform5(0..=max).prop_map(DenominationCount::new)
}

/// Change box with every slot stocked, so the readiness gate passes.
fn arb_ready_change_box() -> impl Strategy<Value = DenominationCount> {
    prop::array::uniform5(1i64..=20).prop_map(DenominationCount::new)
}

/// Fewest notes/coins that add up to `amount`, by dynamic programming.
fn min_pieces(amount: i64) -> i64 {
    let amount = amount as usize;
    let mut best = vec![i64::MAX; amount + 1];
    best[0] = 0;
    for value in 1..=amount {
        for denomination in DENOMINATIONS {
            let denomination = denomination as usize;
            if denomination <= value && best[value - denomination] != i64::MAX {
                best[value] = best[value].min(best[value - denomination] + 1);
            }
        }
    }
    best[amount]
}

fn machine_with(change_box: &DenominationCount, price: i64, amount: i64) -> VendingMachine<MemoryStore> {
    let machine = VendingMachine::open(MemoryStore::new(), MachineConfig::default()).unwrap();
    machine.restock("item", price, amount).unwrap();
    machine.refill_change_box(change_box).unwrap();
    machine
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Restocking one name accumulates amounts and keeps the last price.
    #[test]
    fn restock_is_cumulative_with_last_price(
        restocks in prop::collection::vec((0i64..500, 0i64..50), 1..10),
    ) {
        let mut stock = StockLedger::new();
        for (price, amount) in &restocks {
            stock.restock("cola", *price, *amount).unwrap();
        }

        let total: i64 = restocks.iter().map(|(_, amount)| amount).sum();
        let (last_price, _) = restocks[restocks.len() - 1];
        let item = stock.find_item(ItemId(1)).unwrap();

        prop_assert_eq!(stock.len(), 1);
        prop_assert_eq!(item.amount, total);
        if total > 0 {
            prop_assert_eq!(item.price, Price::Amount(last_price));
        } else {
            prop_assert_eq!(item.price, Price::OutOfStock);
        }
    }

    /// A sold-out item reads as out of stock until restocked, however often
    /// the markers are refreshed.
    #[test]
    fn sold_out_marker_is_sticky(amount in 1i64..10, refreshes in 0usize..5) {
        let mut stock = StockLedger::new();
        stock.restock("cola", 15, amount).unwrap();
        for _ in 0..amount {
            stock.decrement_on_purchase(ItemId(1)).unwrap();
        }
        for _ in 0..refreshes {
            stock.refresh_out_of_stock_markers();
            prop_assert_eq!(stock.find_item(ItemId(1)).unwrap().price, Price::OutOfStock);
        }
        prop_assert_eq!(
            stock.decrement_on_purchase(ItemId(1)).map(|item| item.amount),
            Err(VendingError::OutOfStock(ItemId(1)))
        );

        let item = stock.restock("cola", 20, 1).unwrap();
        prop_assert_eq!(item.price, Price::Amount(20));
    }

    /// Below the change box value, greedy change is exact and minimal.
    #[test]
    fn change_is_exact_and_minimal(availability in arb_counts(10), seed in any::<u32>()) {
        let total = availability.value();
        prop_assume!(total > 0);
        let change_due = i64::from(seed) % total;

        let change = make_change(0, change_due, &availability).unwrap();

        prop_assert_eq!(change.value(), change_due);
        prop_assert!(change.is_non_negative());
        prop_assert_eq!(change.pieces(), min_pieces(change_due));
    }

    /// At or above the change box value, change is always infeasible.
    #[test]
    fn change_infeasible_at_or_above_box_value(availability in arb_counts(10), extra in 0i64..500) {
        let change_due = availability.value() + extra;
        prop_assert_eq!(
            make_change(0, change_due, &availability),
            Err(VendingError::Infeasible { change_due })
        );
    }

    /// A purchase either moves exactly item, change and payment, or nothing.
    #[test]
    fn purchase_commits_exactly_or_not_at_all(
        change_box in arb_ready_change_box(),
        price in 1i64..150,
        payment in arb_counts(3),
    ) {
        let machine = machine_with(&change_box, price, 5);

        let result = machine.purchase(ItemId(1), &payment);
        match result {
            Ok(receipt) => {
                prop_assert_eq!(receipt.change.value(), payment.value() - price);
                prop_assert_eq!(machine.find_item(ItemId(1)).unwrap().amount, 4);
                prop_assert_eq!(machine.change_box().checked_add(&receipt.change), Some(change_box));
                prop_assert_eq!(machine.collection_box(), payment);
            }
            Err(_) => {
                prop_assert_eq!(machine.find_item(ItemId(1)).unwrap().amount, 5);
                prop_assert_eq!(machine.change_box(), change_box);
                prop_assert_eq!(machine.collection_box(), DenominationCount::ZERO);
            }
        }
        prop_assert!(machine.change_box().is_non_negative());
    }

    /// Half the catalogue sold out closes the machine whatever the cash state.
    #[test]
    fn half_sold_out_is_never_ready(
        change_box in arb_ready_change_box(),
        stocked in 0usize..5,
        sold_out in 1usize..5,
    ) {
        prop_assume!(2 * sold_out >= stocked + sold_out);
        let machine = VendingMachine::open(MemoryStore::new(), MachineConfig::default()).unwrap();
        machine.refill_change_box(&change_box).unwrap();
        for i in 0..stocked {
            machine.restock(&format!("stocked-{i}"), 10, 3).unwrap();
        }
        for i in 0..sold_out {
            machine.restock(&format!("empty-{i}"), 10, 0).unwrap();
        }
        prop_assert!(!machine.is_ready().unwrap());
    }

    /// Any empty change box slot closes the machine whatever the stock state.
    #[test]
    fn empty_change_slot_is_never_ready(
        change_box in arb_ready_change_box(),
        empty_slot in 0usize..5,
        items in 1usize..5,
    ) {
        let mut counts = change_box.counts();
        counts[empty_slot] = 0;
        let machine = VendingMachine::open(MemoryStore::new(), MachineConfig::default()).unwrap();
        machine.refill_change_box(&DenominationCount::new(counts)).unwrap();
        for i in 0..items {
            machine.restock(&format!("item-{i}"), 10, 3).unwrap();
        }
        prop_assert!(!machine.is_ready().unwrap());
    }
}
