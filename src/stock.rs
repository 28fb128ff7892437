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

//! Stock ledger.
//!
//! Items are created lazily by the first restock of a name and are never
//! removed. An item whose amount drops to zero reads as out of stock until
//! it is restocked:
//!
//! ```text
//!  restock(new name) ──► Priced ──purchase (amount > 1)──► Priced
//!                          │
//!                          └──purchase (amount == 1)──► OutOfStock ──restock──► Priced
//! ```

use crate::VendingError;
use crate::base::ItemId;
use std::fmt;
use std::str::FromStr;

/// Item price, or the sentinel shown once an item has sold out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Price {
    Amount(i64),
    OutOfStock,
}

impl Price {
    pub const OUT_OF_STOCK_LABEL: &'static str = "OUT OF STOCK";

    /// Returns the numeric price, `None` for the out-of-stock sentinel.
    pub fn amount(&self) -> Option<i64> {
        match self {
            Price::Amount(amount) => Some(*amount),
            Price::OutOfStock => None,
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Price::Amount(amount) => write!(f, "{amount}"),
            Price::OutOfStock => f.write_str(Self::OUT_OF_STOCK_LABEL),
        }
    }
}

impl FromStr for Price {
    type Err = VendingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == Self::OUT_OF_STOCK_LABEL {
            return Ok(Price::OutOfStock);
        }
        match s.parse::<i64>() {
            Ok(amount) if amount >= 0 => Ok(Price::Amount(amount)),
            _ => Err(VendingError::InvalidArgument(format!("invalid price '{s}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub price: Price,
    pub amount: i64,
}

impl Item {
    pub fn is_out_of_stock(&self) -> bool {
        self.amount <= 0
    }

    /// Copy of this item with one unit sold.
    pub(crate) fn purchased(&self) -> Result<Item, VendingError> {
        if self.is_out_of_stock() {
            return Err(VendingError::OutOfStock(self.id));
        }
        let mut item = self.clone();
        item.amount -= 1;
        item.mark_if_sold_out();
        Ok(item)
    }

    /// Forces the sentinel price on an empty item. Returns true if it changed.
    fn mark_if_sold_out(&mut self) -> bool {
        if self.amount <= 0 && self.price != Price::OutOfStock {
            self.price = Price::OutOfStock;
            self.amount = 0;
            return true;
        }
        false
    }
}

/// Share of catalogue items that are sold out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockRatio {
    pub out_of_stock: usize,
    pub total: usize,
}

impl StockRatio {
    /// The ratio as a fraction in `[0, 1]`; an empty catalogue reads as 0.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.out_of_stock as f64 / self.total as f64
    }

    /// `fraction() >= 0.5`, evaluated without floating point.
    pub fn at_least_half(&self) -> bool {
        self.total > 0 && 2 * self.out_of_stock >= self.total
    }
}

/// Inventory of items, indexed so that `items[i].id == i + 1`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockLedger {
    items: Vec<Item>,
}

impl StockLedger {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Builds a ledger from loaded rows, which must carry ids `1..=n` in order.
    pub fn from_items(items: Vec<Item>) -> Result<Self, VendingError> {
        for (index, item) in items.iter().enumerate() {
            if item.id.0 as usize != index + 1 {
                return Err(VendingError::InvalidArgument(format!(
                    "stock rows out of sequence: expected id {}, found {}",
                    index + 1,
                    item.id
                )));
            }
            if item.amount < 0 {
                return Err(VendingError::InvalidArgument(format!(
                    "item {} has negative amount {}",
                    item.id, item.amount
                )));
            }
        }
        Ok(Self { items })
    }

    /// All items in ascending id order.
    pub fn list_items(&self) -> &[Item] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn find_item(&self, id: ItemId) -> Result<&Item, VendingError> {
        (id.0 as usize)
            .checked_sub(1)
            .and_then(|index| self.items.get(index))
            .ok_or(VendingError::ItemNotFound(id))
    }

    /// Previews a restock without applying it.
    ///
    /// An existing name gets its price overwritten and its amount increased;
    /// an unseen name becomes a new item with the next id.
    pub(crate) fn restocked(&self, name: &str, price: i64, amount: i64) -> Result<Item, VendingError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(VendingError::InvalidArgument("item name must not be empty".into()));
        }
        if price < 0 {
            return Err(VendingError::InvalidArgument(format!(
                "price must not be negative, got {price}"
            )));
        }
        if amount < 0 {
            return Err(VendingError::InvalidArgument(format!(
                "amount must not be negative, got {amount}"
            )));
        }

        let mut item = match self.items.iter().find(|item| item.name == name) {
            Some(existing) => Item {
                price: Price::Amount(price),
                amount: existing.amount.checked_add(amount).ok_or_else(|| {
                    VendingError::InvalidArgument(format!(
                        "restocking {amount} more of '{name}' would overflow its amount"
                    ))
                })?,
                ..existing.clone()
            },
            None => Item {
                id: ItemId(self.items.len() as u32 + 1),
                name: name.to_string(),
                price: Price::Amount(price),
                amount,
            },
        };
        item.mark_if_sold_out();
        Ok(item)
    }

    pub fn restock(&mut self, name: &str, price: i64, amount: i64) -> Result<&Item, VendingError> {
        let item = self.restocked(name, price, amount)?;
        let id = item.id;
        self.replace(item);
        self.find_item(id)
    }

    pub fn decrement_on_purchase(&mut self, id: ItemId) -> Result<&Item, VendingError> {
        let item = self.find_item(id)?.purchased()?;
        self.replace(item);
        self.find_item(id)
    }

    /// Forces the sentinel price on every empty item.
    ///
    /// Returns the items that changed so callers can persist them.
    pub fn refresh_out_of_stock_markers(&mut self) -> Vec<Item> {
        self.items
            .iter_mut()
            .filter_map(|item| item.mark_if_sold_out().then(|| item.clone()))
            .collect()
    }

    pub fn fraction_out_of_stock(&self) -> StockRatio {
        StockRatio {
            out_of_stock: self.items.iter().filter(|item| item.is_out_of_stock()).count(),
            total: self.items.len(),
        }
    }

    /// Inserts a new item or overwrites the one with the same id.
    pub(crate) fn replace(&mut self, item: Item) {
        let index = item.id.0 as usize - 1;
        debug_assert!(item.amount >= 0, "Invariant violated: negative stock for {}", item.id);
        if index == self.items.len() {
            self.items.push(item);
        } else {
            self.items[index] = item;
        }
    }
}
