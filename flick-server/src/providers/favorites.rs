//! In-memory favorites store
//!
//! Process-wide shared set of favorite movies keyed by `imdbID`. The
//! worker is the only writer; reads come from the worker and from the
//! recommendations path. Adds are idempotent: a second add of the same
//! id is a no-op, which also makes concurrent same-id adds safe.

use std::sync::RwLock;

use flick_common::model::Movie;
use tracing::warn;

use crate::error::{Error, Result};

/// Shared favorites set
#[derive(Default)]
pub struct FavoritesStore {
    favorites: RwLock<Vec<Movie>>,
}

impl FavoritesStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a movie, ignoring duplicates by id.
    ///
    /// Rejects records missing required fields; a rejected add is a
    /// failure event upstream, not a silent drop.
    pub fn add(&self, movie: Movie) -> Result<()> {
        let missing = movie.missing_fields();
        if !missing.is_empty() {
            warn!(fields = ?missing, "rejecting favorite with missing fields");
            return Err(Error::InvalidMovie(format!(
                "missing required fields: {}",
                missing.join(", ")
            )));
        }

        let mut favorites = self.favorites.write().unwrap_or_else(|e| e.into_inner());
        if favorites.iter().any(|fav| fav.imdb_id == movie.imdb_id) {
            return Ok(());
        }
        favorites.push(movie);
        Ok(())
    }

    /// Remove a movie by id; absent ids are a no-op
    pub fn remove(&self, imdb_id: &str) {
        let mut favorites = self.favorites.write().unwrap_or_else(|e| e.into_inner());
        favorites.retain(|fav| fav.imdb_id != imdb_id);
    }

    /// Snapshot of the current favorites, in insertion order
    pub fn all(&self) -> Vec<Movie> {
        self.favorites
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.favorites
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
