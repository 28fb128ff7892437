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

//! Deadlock detection tests using parking_lot's built-in deadlock detector.
//!
//! These tests drive one machine from many threads at once: customers buying,
//! an operator restocking, refilling and collecting, and readers taking
//! snapshots. Afterwards every unit of cash and stock must be accounted for.

use parking_lot::deadlock;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::thread;
use std::time::Duration;
use vending_machine_rs::{DenominationCount, ItemId, MachineConfig, MemoryStore, VendingMachine};

// === Deadlock Detection Infrastructure ===

/// Starts a background thread that checks for deadlocks.
/// Returns a handle to stop the detector.
fn start_deadlock_detector() -> Arc<AtomicBool> {
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = running.clone();

    thread::spawn(move || {
        while running_clone.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(100));
            let deadlocks = deadlock::check_deadlock();
            if !deadlocks.is_empty() {
                eprintln!("\n=== DEADLOCK DETECTED ===");
                for (i, threads) in deadlocks.iter().enumerate() {
                    eprintln!("\nDeadlock #{}", i + 1);
                    for t in threads {
                        eprintln!("Thread ID: {:?}", t.thread_id());
                        eprintln!("Backtrace:\n{:#?}", t.backtrace());
                    }
                }
                panic!("Deadlock detected! See output above for details.");
            }
        }
    });

    running
}

/// Stops the deadlock detector.
fn stop_deadlock_detector(running: Arc<AtomicBool>) {
    running.store(false, Ordering::SeqCst);
    thread::sleep(Duration::from_millis(150)); // Let detector thread exit
}

/// Running totals of everything that entered or left the machine.
#[derive(Default)]
struct Totals {
    refilled: AtomicI64,
    paid: AtomicI64,
    change_given: AtomicI64,
    collected: AtomicI64,
    restocked: AtomicI64,
    sold: AtomicI64,
}

const INITIAL_CHANGE: DenominationCount = DenominationCount::new([2, 5, 10, 10, 10]);
const INITIAL_STOCK: i64 = 20;

fn stocked_machine() -> Arc<VendingMachine<MemoryStore>> {
    let machine = VendingMachine::open(MemoryStore::new(), MachineConfig::default()).unwrap();
    machine.restock("cola", 15, INITIAL_STOCK).unwrap();
    machine.restock("water", 7, INITIAL_STOCK).unwrap();
    machine.refill_change_box(&INITIAL_CHANGE).unwrap();
    Arc::new(machine)
}

fn assert_conserved(machine: &VendingMachine<MemoryStore>, totals: &Totals) {
    let refilled = totals.refilled.load(Ordering::SeqCst);
    let paid = totals.paid.load(Ordering::SeqCst);
    let change_given = totals.change_given.load(Ordering::SeqCst);
    let collected = totals.collected.load(Ordering::SeqCst);
    let restocked = totals.restocked.load(Ordering::SeqCst);
    let sold = totals.sold.load(Ordering::SeqCst);

    assert_eq!(
        machine.change_box().value(),
        INITIAL_CHANGE.value() + refilled - change_given
    );
    assert_eq!(machine.collection_box().value() + collected, paid);

    let remaining: i64 = machine.items().iter().map(|item| item.amount).sum();
    assert_eq!(remaining, 2 * INITIAL_STOCK + restocked - sold);
    assert!(machine.change_box().is_non_negative());
}

// === Tests ===

/// Many customers buying from the same machine.
#[test]
fn no_deadlock_concurrent_purchases() {
    let detector = start_deadlock_detector();
    let machine = stocked_machine();
    let totals = Arc::new(Totals::default());

    const NUM_THREADS: usize = 16;
    const OPS_PER_THREAD: usize = 20;

    let mut handles = Vec::with_capacity(NUM_THREADS);

    for t in 0..NUM_THREADS {
        let machine = machine.clone();
        let totals = totals.clone();

        let handle = thread::spawn(move || {
            for i in 0..OPS_PER_THREAD {
                let item = ItemId(((t + i) % 2) as u32 + 1);
                let payment = DenominationCount::single(20, 1).unwrap();
                if let Ok(receipt) = machine.purchase(item, &payment) {
                    totals.paid.fetch_add(receipt.paid(), Ordering::SeqCst);
                    totals.change_given.fetch_add(receipt.change_value(), Ordering::SeqCst);
                    totals.sold.fetch_add(1, Ordering::SeqCst);
                }
            }
        });

        handles.push(handle);
    }

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    stop_deadlock_detector(detector);

    assert_conserved(&machine, &totals);
    assert!(totals.sold.load(Ordering::SeqCst) > 0);
}

/// Customers and an operator working the machine at the same time.
#[test]
fn no_deadlock_purchases_during_admin_operations() {
    let detector = start_deadlock_detector();
    let machine = stocked_machine();
    let totals = Arc::new(Totals::default());

    const NUM_CUSTOMERS: usize = 8;
    const OPS_PER_THREAD: usize = 50;

    let mut handles = Vec::new();

    for t in 0..NUM_CUSTOMERS {
        let machine = machine.clone();
        let totals = totals.clone();
        handles.push(thread::spawn(move || {
            for i in 0..OPS_PER_THREAD {
                let item = ItemId(((t + i) % 2) as u32 + 1);
                let payment = if i % 2 == 0 {
                    DenominationCount::single(20, 1).unwrap()
                } else {
                    DenominationCount::new([0, 0, 1, 1, 2])
                };
                if let Ok(receipt) = machine.purchase(item, &payment) {
                    totals.paid.fetch_add(receipt.paid(), Ordering::SeqCst);
                    totals.change_given.fetch_add(receipt.change_value(), Ordering::SeqCst);
                    totals.sold.fetch_add(1, Ordering::SeqCst);
                }
            }
        }));
    }

    {
        let machine = machine.clone();
        let totals = totals.clone();
        handles.push(thread::spawn(move || {
            let refill = DenominationCount::new([0, 1, 1, 2, 5]);
            for i in 0..OPS_PER_THREAD {
                if i % 3 == 0 {
                    machine.refill_change_box(&refill).unwrap();
                    totals.refilled.fetch_add(refill.value(), Ordering::SeqCst);
                } else if i % 3 == 1 {
                    let collected = machine.empty_collection_box().unwrap();
                    totals.collected.fetch_add(collected, Ordering::SeqCst);
                } else {
                    let name = if i % 2 == 0 { "cola" } else { "water" };
                    let price = if name == "cola" { 15 } else { 7 };
                    machine.restock(name, price, 2).unwrap();
                    totals.restocked.fetch_add(2, Ordering::SeqCst);
                }
            }
        }));
    }

    {
        let machine = machine.clone();
        handles.push(thread::spawn(move || {
            for _ in 0..OPS_PER_THREAD {
                let _ = machine.is_ready();
                let _ = machine.items();
                let _ = machine.change_box();
                let _ = machine.collection_box();
            }
        }));
    }

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    stop_deadlock_detector(detector);

    assert_conserved(&machine, &totals);
}
