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

/// Explicit ratings live in [1,10], zero marks an implicit interaction.
pub type Rating = u8;

pub const MAX_RATING: Rating = 10;
pub const IMPLICIT_RATING: Rating = 0;

pub type SparseVector = FnvHashMap<u32, Rating>;
pub type SparseMatrix = Vec<SparseVector>;

pub fn new_sparse_vector(capacity: usize) -> SparseVector {
    FnvHashMap::with_capacity_and_hasher(capacity, Default::default())
}

/// A single observed rating. Identifiers are lower-cased on construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatingRecord {
    pub user: String,
    pub item: String,
    pub rating: Rating,
}

impl RatingRecord {

    pub fn new(user: &str, item: &str, rating: Rating) -> Self {
        RatingRecord {
            user: user.to_lowercase(),
            item: item.to_lowercase(),
            rating,
        }
    }

    pub fn is_implicit(&self) -> bool {
        self.rating == IMPLICIT_RATING
    }
}

/// Order-independent key for an unordered pair of distinct items, `first < second` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemPair {
    first: u32,
    second: u32,
}

impl ItemPair {

    pub fn new(item_a: u32, item_b: u32) -> Self {
        debug_assert_ne!(item_a, item_b, "an item is not paired with itself");

        if item_a < item_b {
            ItemPair { first: item_a, second: item_b }
        } else {
            ItemPair { first: item_b, second: item_a }
        }
    }

    pub fn first(&self) -> u32 {
        self.first
    }

    pub fn second(&self) -> u32 {
        self.second
    }
}


#[cfg(test)]
mod tests {

    use crate::types::{ItemPair, RatingRecord};

    #[test]
    fn pair_key_is_symmetric() {
        assert_eq!(ItemPair::new(3, 17), ItemPair::new(17, 3));

        let pair = ItemPair::new(17, 3);
        assert_eq!(pair.first(), 3);
        assert_eq!(pair.second(), 17);
    }

    #[test]
    fn record_identifiers_are_lower_cased() {
        let record = RatingRecord::new("User_A", "034545104X", 7);

        assert_eq!(record.user, "user_a");
        assert_eq!(record.item, "034545104x");
        assert!(!record.is_implicit());
        assert!(RatingRecord::new("u", "i", 0).is_implicit());
    }
}
