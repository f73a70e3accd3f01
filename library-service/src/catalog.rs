use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Book {
    pub id: u64,
    pub title: String,
    pub pages: u32,
    pub about: String,
}

#[derive(Debug, Clone)]
pub struct NewBook {
    pub title: String,
    pub pages: u32,
    pub about: String,
}

#[derive(Default)]
struct Shelf {
    books: BTreeMap<u64, Book>,
    next_id: u64,
}

/// In-memory book catalog ordered by id.
#[derive(Default)]
pub struct BookCatalog {
    inner: RwLock<Shelf>,
}

impl BookCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, book: NewBook) -> Book {
        let mut shelf = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        shelf.next_id += 1;
        let stored = Book {
            id: shelf.next_id,
            title: book.title,
            pages: book.pages,
            about: book.about,
        };
        shelf.books.insert(stored.id, stored.clone());
        stored
    }

    pub fn get(&self, id: u64) -> Option<Book> {
        let shelf = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        shelf.books.get(&id).cloned()
    }

    pub fn remove(&self, id: u64) -> Option<Book> {
        let mut shelf = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        shelf.books.remove(&id)
    }

    pub fn len(&self) -> usize {
        let shelf = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        shelf.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// One-based page of books in id order.
    pub fn page(&self, page: usize, per_page: usize) -> Vec<Book> {
        let shelf = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let skip = page.saturating_sub(1).saturating_mul(per_page);
        shelf.books.values().skip(skip).take(per_page).cloned().collect()
    }
}
