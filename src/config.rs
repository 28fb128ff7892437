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

//! Machine configuration.

/// Tunable limits of a vending machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachineConfig {
    /// Collection box cap per denomination. Reaching it in any slot takes the
    /// machine out of service until an operator empties the box.
    pub max_collection_per_denomination: u32,
}

impl MachineConfig {
    pub const DEFAULT_MAX_COLLECTION: u32 = 100;

    pub fn with_max_collection(max_collection_per_denomination: u32) -> Self {
        Self {
            max_collection_per_denomination,
        }
    }
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self::with_max_collection(Self::DEFAULT_MAX_COLLECTION)
    }
}
