//! Gallery pagination
//!
//! Pages are 1-based, four items per page, and the page bound is the integer
//! quotient of the server's item count - trailing items that do not fill a
//! page are not reachable, matching the server's layout.

use vista_core::ITEMS_PER_PAGE;

/// 1-based page cursor over the server's item list
#[derive(Clone, Copy, Debug)]
pub struct Pager {
    current: u32,
    total_items: u32,
    items_per_page: u32,
}

impl Default for Pager {
    fn default() -> Self {
        // One page's worth of items until the first count query lands.
        Pager::new(ITEMS_PER_PAGE)
    }
}

impl Pager {
    pub fn new(total_items: u32) -> Self {
        Pager {
            current: 1,
            total_items,
            items_per_page: ITEMS_PER_PAGE,
        }
    }

    pub fn current_page(&self) -> u32 {
        self.current
    }

    pub fn total_items(&self) -> u32 {
        self.total_items
    }

    /// Last reachable page (integer division; remainder items un-paged)
    pub fn max_page(&self) -> u32 {
        self.total_items / self.items_per_page
    }

    /// Apply a fresh count from the server, clamping the cursor to the new
    /// bound.
    pub fn set_total(&mut self, total_items: u32) {
        self.total_items = total_items;
        let bound = self.max_page().max(1);
        if self.current > bound {
            self.current = bound;
        }
    }

    /// Jump to `page`; false when out of bounds.
    pub fn go_to(&mut self, page: u32) -> bool {
        if page < 1 || page > self.max_page() {
            return false;
        }
        self.current = page;
        true
    }

    /// Advance one page; the new page number, or `None` at the bound.
    pub fn next(&mut self) -> Option<u32> {
        if self.current >= self.max_page() {
            return None;
        }
        self.current += 1;
        Some(self.current)
    }

    /// Back one page; the new page number, or `None` at page 1.
    pub fn prev(&mut self) -> Option<u32> {
        if self.current <= 1 {
            return None;
        }
        self.current -= 1;
        Some(self.current)
    }

    /// Server index of the item in `slot` on the current page.
    ///
    /// The server's items are 1-based.
    pub fn slot_index(&self, slot: u32) -> u32 {
        (self.current - 1) * self.items_per_page + 1 + slot
    }

    /// Server indices of every slot on the current page
    pub fn page_indices(&self) -> Vec<u32> {
        (0..self.items_per_page).map(|s| self.slot_index(s)).collect()
    }
}
