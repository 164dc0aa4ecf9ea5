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

use std::time::Instant;

use fnv::FnvHashSet;
use tracing::{info, warn};

use crate::dictionary::Dictionary;
use crate::error::{Error, Result};
use crate::types::{self, Rating, RatingRecord, SparseMatrix, SparseVector};
use crate::utils;

/// What to do when a training set contains more than one rating for the same (user, item) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Duplicates {
    /// Last write wins, duplicates are counted and logged.
    Overwrite,
    /// Abort index construction with `Error::DuplicateRating`.
    Reject,
}

impl Default for Duplicates {
    fn default() -> Self {
        Duplicates::Overwrite
    }
}

/// Sparse two-way lookup of the ratings in one training set. Rows of `ratings_by_item` hold the
/// raters of an item, rows of `ratings_by_user` the items rated by a user, both keyed by the
/// integer ids of the dictionaries. Lookups by name expect lower-cased identifiers, as produced
/// by `RatingRecord::new`.
#[derive(Debug)]
pub struct RatingIndex {
    users: Dictionary,
    items: Dictionary,
    ratings_by_item: SparseMatrix,
    ratings_by_user: SparseMatrix,
    num_ratings: usize,
}

impl RatingIndex {

    pub fn build<'a, I>(records: I) -> Result<Self>
        where I: IntoIterator<Item=&'a RatingRecord> {

        RatingIndex::build_with(records, Duplicates::default())
    }

    pub fn build_with<'a, I>(records: I, duplicates: Duplicates) -> Result<Self>
        where I: IntoIterator<Item=&'a RatingRecord> {

        let start = Instant::now();

        let mut users = Dictionary::with_capacity(100);
        let mut items = Dictionary::with_capacity(100);
        let mut ratings_by_item: SparseMatrix = Vec::new();
        let mut ratings_by_user: SparseMatrix = Vec::new();
        let mut num_ratings = 0;
        let mut num_duplicates = 0;

        for record in records {

            let user = users.get_or_insert(&record.user);
            if user as usize == ratings_by_user.len() {
                ratings_by_user.push(types::new_sparse_vector(10));
            }

            let item = items.get_or_insert(&record.item);
            if item as usize == ratings_by_item.len() {
                ratings_by_item.push(types::new_sparse_vector(10));
            }

            let previous = ratings_by_item[item as usize].insert(user, record.rating);
            ratings_by_user[user as usize].insert(item, record.rating);

            if previous.is_some() {
                if duplicates == Duplicates::Reject {
                    return Err(Error::DuplicateRating {
                        user: record.user.clone(),
                        item: record.item.clone(),
                    });
                }
                num_duplicates += 1;
            } else {
                num_ratings += 1;
            }
        }

        if num_ratings == 0 {
            return Err(Error::EmptyInput("rating index"));
        }

        if num_duplicates > 0 {
            warn!("overwrote {} duplicate (user, item) ratings", num_duplicates);
        }

        info!(
            "rating index: {} ratings by {} users on {} items ({}ms)",
            num_ratings,
            users.len(),
            items.len(),
            utils::to_millis(start.elapsed()),
        );

        Ok(RatingIndex { users, items, ratings_by_item, ratings_by_user, num_ratings })
    }

    pub fn num_users(&self) -> usize {
        self.users.len()
    }

    pub fn num_items(&self) -> usize {
        self.items.len()
    }

    pub fn num_ratings(&self) -> usize {
        self.num_ratings
    }

    pub fn user_index(&self, user: &str) -> Option<u32> {
        self.users.index_of(user)
    }

    pub fn item_index(&self, item: &str) -> Option<u32> {
        self.items.index_of(item)
    }

    pub fn user_name(&self, user: u32) -> &str {
        self.users.name_of(user)
    }

    pub fn item_name(&self, item: u32) -> &str {
        self.items.name_of(item)
    }

    /// Ratings of an item, keyed by user id.
    pub fn item_ratings(&self, item: u32) -> &SparseVector {
        &self.ratings_by_item[item as usize]
    }

    /// Ratings of a user, keyed by item id.
    pub fn user_ratings(&self, user: u32) -> &SparseVector {
        &self.ratings_by_user[user as usize]
    }

    /// Users who rated `item`, empty if the item is unseen.
    pub fn raters_of(&self, item: &str) -> FnvHashSet<&str> {
        match self.item_index(item) {
            Some(item) => self.item_ratings(item).keys()
                .map(|user| self.user_name(*user))
                .collect(),
            None => FnvHashSet::default(),
        }
    }

    /// Items rated by `user`, empty if the user is unseen.
    pub fn items_of(&self, user: &str) -> FnvHashSet<&str> {
        match self.user_index(user) {
            Some(user) => self.user_ratings(user).keys()
                .map(|item| self.item_name(*item))
                .collect(),
            None => FnvHashSet::default(),
        }
    }

    pub fn rating_of(&self, item: &str, user: &str) -> Option<Rating> {
        let item = self.item_index(item)?;
        let user = self.user_index(user)?;

        self.item_ratings(item).get(&user).cloned()
    }
}
