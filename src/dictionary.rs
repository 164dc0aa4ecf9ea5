/**
 * itemcf
 * Copyright (C) 2018 Sebastian Schelter
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program. If not, see <http://www.gnu.org/licenses/>.
 */

use fnv::FnvHashMap;

/// Maps string identifiers to consecutive integer ids and back. Ids are handed out in order of
/// first appearance, which gives us a fixed iteration order over users and items.
#[derive(Debug, Default)]
pub struct Dictionary {
    indexes: FnvHashMap<String, u32>,
    names: Vec<String>,
}

impl Dictionary {

    pub fn with_capacity(capacity: usize) -> Self {
        Dictionary {
            indexes: FnvHashMap::with_capacity_and_hasher(capacity, Default::default()),
            names: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn get_or_insert(&mut self, name: &str) -> u32 {
        if let Some(index) = self.indexes.get(name) {
            return *index;
        }

        let index = self.names.len() as u32;
        self.indexes.insert(name.to_string(), index);
        self.names.push(name.to_string());

        index
    }

    pub fn index_of(&self, name: &str) -> Option<u32> {
        self.indexes.get(name).cloned()
    }

    pub fn name_of(&self, index: u32) -> &str {
        &self.names[index as usize]
    }
}
