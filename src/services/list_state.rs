use crate::domain::asset::{Asset, AssetId};
use crate::domain::project::{Project, ProjectId};

pub const PAGE_SIZE: usize = 20;

/// Text fields a free-text query is matched against.
pub trait Searchable {
    fn search_fields(&self) -> Vec<&str>;
}

pub trait Identified {
    type Id: PartialEq + Copy;

    fn id(&self) -> Self::Id;
}

impl Searchable for Project {
    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str()]
    }
}

impl Identified for Project {
    type Id = ProjectId;

    fn id(&self) -> ProjectId {
        self.id
    }
}

impl Searchable for Asset {
    fn search_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.original_filename.as_str()];
        if let Some(project) = &self.project {
            fields.push(project.name.as_str());
            fields.push(project.website_url.as_str());
        }
        fields
    }
}

impl Identified for Asset {
    type Id = AssetId;

    fn id(&self) -> AssetId {
        self.id
    }
}

/// 1-based bounds of the visible page within the filtered view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub start: usize,
    pub end: usize,
    pub total: usize,
}

/// A collection, a query and a page. Replacing the collection or changing the
/// query resets the page to 1; the page is always within `1..=total_pages()`.
#[derive(Debug, Clone)]
pub struct ListState<T> {
    items: Vec<T>,
    query: String,
    page: usize,
}

impl<T> Default for ListState<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            query: String::new(),
            page: 1,
        }
    }
}

impl<T: Searchable> ListState<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: Vec<T>) -> Self {
        Self {
            items,
            ..Self::default()
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn set_items(&mut self, items: Vec<T>) {
        self.items = items;
        self.page = 1;
    }

    pub fn set_query(&mut self, text: &str) {
        self.query = text.to_string();
        self.page = 1;
    }

    /// Items whose designated fields contain the trimmed query, ignoring case.
    /// An empty query matches everything. Order is preserved.
    pub fn filtered(&self) -> Vec<&T> {
        let needle = self.query.trim().to_lowercase();
        if needle.is_empty() {
            return self.items.iter().collect();
        }
        self.items
            .iter()
            .filter(|item| {
                item.search_fields()
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
            })
            .collect()
    }

    pub fn filtered_count(&self) -> usize {
        self.filtered().len()
    }

    pub fn total_pages(&self) -> usize {
        self.filtered_count().div_ceil(PAGE_SIZE).max(1)
    }

    /// Moves to page `n`, clamped into range. Returns the page actually selected.
    pub fn set_page(&mut self, n: usize) -> usize {
        self.page = n.clamp(1, self.total_pages());
        self.page
    }

    pub fn next_page(&mut self) -> usize {
        self.set_page(self.page + 1)
    }

    pub fn previous_page(&mut self) -> usize {
        self.set_page(self.page.saturating_sub(1))
    }

    pub fn has_next_page(&self) -> bool {
        self.page < self.total_pages()
    }

    pub fn has_previous_page(&self) -> bool {
        self.page > 1
    }

    pub fn visible_slice(&self) -> Vec<&T> {
        let filtered = self.filtered();
        let start = ((self.page - 1) * PAGE_SIZE).min(filtered.len());
        let end = (start + PAGE_SIZE).min(filtered.len());
        filtered[start..end].to_vec()
    }

    pub fn page_range(&self) -> PageRange {
        let total = self.filtered_count();
        let end = (self.page * PAGE_SIZE).min(total);
        let start = if total == 0 {
            0
        } else {
            (self.page - 1) * PAGE_SIZE + 1
        };
        PageRange { start, end, total }
    }
}

impl<T: Searchable + Identified> ListState<T> {
    pub fn get(&self, id: T::Id) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    /// Drops the item with `id`. Removing an absent id changes nothing.
    pub fn remove(&mut self, id: T::Id) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id() != id);
        let removed = self.items.len() != before;
        if removed {
            self.page = 1;
        }
        removed
    }

    /// Swaps in a record returned by a successful remote write.
    pub fn replace(&mut self, item: T) -> bool {
        match self.items.iter_mut().find(|existing| existing.id() == item.id()) {
            Some(existing) => {
                *existing = item;
                self.page = 1;
                true
            }
            None => false,
        }
    }
}
