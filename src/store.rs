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

//! Ledger store.
//!
//! The machine keeps its stock rows and both cash records in a [`LedgerStore`]
//! and writes through to it on every committed mutation. [`MemoryStore`]
//! backs isolated instances in tests; [`CsvStore`] keeps one CSV file per
//! ledger in a directory so state survives a process restart.

use crate::base::{DenominationCount, ItemId};
use crate::cash::CashBox;
use crate::stock::{Item, Price};
use csv::{ReaderBuilder, Trim, Writer};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Ledger store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// A stored record cannot be interpreted
    #[error("corrupt ledger record: {0}")]
    Corrupt(String),
}

/// Record-level access to the stock ledger and the two cash records.
///
/// Reads reflect the most recent write made through the same store.
pub trait LedgerStore {
    fn item_count(&self) -> Result<usize, StoreError>;

    fn get_item(&self, id: ItemId) -> Result<Option<Item>, StoreError>;

    /// Inserts or overwrites the row with `item.id`. A new row must take the
    /// next id in sequence.
    fn put_item(&mut self, item: &Item) -> Result<(), StoreError>;

    fn get_cash_record(&self, which: CashBox) -> Result<Option<DenominationCount>, StoreError>;

    fn put_cash_record(&mut self, which: CashBox, counts: &DenominationCount) -> Result<(), StoreError>;
}

/// In-process store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    items: Vec<Item>,
    change_box: Option<DenominationCount>,
    collection_box: Option<DenominationCount>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn cash_slot(&mut self, which: CashBox) -> &mut Option<DenominationCount> {
        match which {
            CashBox::Change => &mut self.change_box,
            CashBox::Collection => &mut self.collection_box,
        }
    }
}

impl LedgerStore for MemoryStore {
    fn item_count(&self) -> Result<usize, StoreError> {
        Ok(self.items.len())
    }

    fn get_item(&self, id: ItemId) -> Result<Option<Item>, StoreError> {
        Ok((id.0 as usize)
            .checked_sub(1)
            .and_then(|index| self.items.get(index))
            .cloned())
    }

    fn put_item(&mut self, item: &Item) -> Result<(), StoreError> {
        let index = (item.id.0 as usize)
            .checked_sub(1)
            .ok_or_else(|| StoreError::Corrupt(format!("item id {} is not positive", item.id)))?;
        match index.cmp(&self.items.len()) {
            std::cmp::Ordering::Less => self.items[index] = item.clone(),
            std::cmp::Ordering::Equal => self.items.push(item.clone()),
            std::cmp::Ordering::Greater => {
                return Err(StoreError::Corrupt(format!(
                    "item id {} skips past {} stored rows",
                    item.id,
                    self.items.len()
                )));
            }
        }
        Ok(())
    }

    fn get_cash_record(&self, which: CashBox) -> Result<Option<DenominationCount>, StoreError> {
        Ok(match which {
            CashBox::Change => self.change_box,
            CashBox::Collection => self.collection_box,
        })
    }

    fn put_cash_record(&mut self, which: CashBox, counts: &DenominationCount) -> Result<(), StoreError> {
        *self.cash_slot(which) = Some(*counts);
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StockRow {
    id: ItemId,
    name: String,
    price: String,
    amount: i64,
}

impl StockRow {
    fn into_item(self) -> Result<Item, StoreError> {
        let price = self
            .price
            .parse::<Price>()
            .map_err(|e| StoreError::Corrupt(format!("item {}: {e}", self.id)))?;
        Ok(Item {
            id: self.id,
            name: self.name,
            price,
            amount: self.amount,
        })
    }
}

impl From<&Item> for StockRow {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id,
            name: item.name.clone(),
            price: item.price.to_string(),
            amount: item.amount,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CashRow {
    thb_100: i64,
    thb_20: i64,
    thb_10: i64,
    thb_5: i64,
    thb_1: i64,
}

impl From<CashRow> for DenominationCount {
    fn from(row: CashRow) -> Self {
        DenominationCount::new([row.thb_100, row.thb_20, row.thb_10, row.thb_5, row.thb_1])
    }
}

impl From<&DenominationCount> for CashRow {
    fn from(counts: &DenominationCount) -> Self {
        let [thb_100, thb_20, thb_10, thb_5, thb_1] = counts.counts();
        Self {
            thb_100,
            thb_20,
            thb_10,
            thb_5,
            thb_1,
        }
    }
}

/// Directory of CSV files, one per ledger.
///
/// Files are read once on open and rewritten whole on every put.
#[derive(Debug)]
pub struct CsvStore {
    dir: PathBuf,
    cache: MemoryStore,
}

impl CsvStore {
    pub const STOCK_FILE: &'static str = "stock.csv";
    pub const CHANGE_BOX_FILE: &'static str = "change_box.csv";
    pub const COLLECTION_BOX_FILE: &'static str = "collection_box.csv";

    /// Opens the store in `dir`, creating the directory if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let mut cache = MemoryStore::new();
        for item in read_rows::<StockRow>(&dir.join(Self::STOCK_FILE))? {
            cache.put_item(&item.into_item()?)?;
        }
        for which in [CashBox::Change, CashBox::Collection] {
            let mut rows = read_rows::<CashRow>(&dir.join(Self::cash_file(which)))?;
            if rows.len() > 1 {
                return Err(StoreError::Corrupt(format!(
                    "{which} holds {} rows, expected one",
                    rows.len()
                )));
            }
            if let Some(row) = rows.pop() {
                cache.put_cash_record(which, &row.into())?;
            }
        }

        debug!(dir = %dir.display(), items = cache.items.len(), "opened csv ledger store");
        Ok(Self { dir, cache })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn cash_file(which: CashBox) -> &'static str {
        match which {
            CashBox::Change => Self::CHANGE_BOX_FILE,
            CashBox::Collection => Self::COLLECTION_BOX_FILE,
        }
    }
}

impl LedgerStore for CsvStore {
    fn item_count(&self) -> Result<usize, StoreError> {
        self.cache.item_count()
    }

    fn get_item(&self, id: ItemId) -> Result<Option<Item>, StoreError> {
        self.cache.get_item(id)
    }

    fn put_item(&mut self, item: &Item) -> Result<(), StoreError> {
        let mut next = self.cache.clone();
        next.put_item(item)?;
        write_rows(
            &self.dir.join(Self::STOCK_FILE),
            next.items.iter().map(StockRow::from),
        )?;
        self.cache = next;
        Ok(())
    }

    fn get_cash_record(&self, which: CashBox) -> Result<Option<DenominationCount>, StoreError> {
        self.cache.get_cash_record(which)
    }

    fn put_cash_record(&mut self, which: CashBox, counts: &DenominationCount) -> Result<(), StoreError> {
        write_rows(
            &self.dir.join(Self::cash_file(which)),
            std::iter::once(CashRow::from(counts)),
        )?;
        self.cache.put_cash_record(which, counts)
    }
}

fn read_rows<T>(path: &Path) -> Result<Vec<T>, StoreError>
where
    T: for<'de> Deserialize<'de>,
{
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .has_headers(true)
        .from_path(path)?;
    let rows = rdr.deserialize::<T>().collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Writes to a sibling temp file and renames it over `path`.
fn write_rows<T, I>(path: &Path, rows: I) -> Result<(), StoreError>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let tmp = path.with_extension("csv.tmp");
    let mut wtr = Writer::from_path(&tmp)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    drop(wtr);
    fs::rename(&tmp, path)?;
    Ok(())
}
