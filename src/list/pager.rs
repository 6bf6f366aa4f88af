/// Current page plus the last total count reported by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    page: u32,
    page_size: u32,
    total_count: u64,
}

/// Number of pages needed for `total_count` items. Zero items means zero pages.
pub fn total_pages(total_count: u64, page_size: u32) -> u32 {
    let pages = total_count.div_ceil(u64::from(page_size.max(1)));
    u32::try_from(pages).unwrap_or(u32::MAX)
}

impl Pager {
    pub fn new(page_size: u32) -> Self {
        Pager {
            page: 1,
            page_size: page_size.max(1),
            total_count: 0,
        }
    }

    /// A pager positioned on `page` before any count is known. The first
    /// fetch validates the position.
    pub fn starting_at(page_size: u32, page: u32) -> Self {
        Pager {
            page: page.max(1),
            ..Pager::new(page_size)
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    pub fn total_pages(&self) -> u32 {
        total_pages(self.total_count, self.page_size)
    }

    /// Highest page that may be requested. Page 1 is always reachable.
    fn last_page(&self) -> u32 {
        self.total_pages().max(1)
    }

    /// Moves to page `n`. Returns false, leaving the state untouched, when `n`
    /// is out of range or already current.
    pub fn go_to_page(&mut self, n: u32) -> bool {
        if n < 1 || n > self.last_page() || n == self.page {
            return false;
        }
        self.page = n;
        true
    }

    pub fn next_page(&mut self) -> bool {
        self.go_to_page(self.page.saturating_add(1))
    }

    pub fn previous_page(&mut self) -> bool {
        self.go_to_page(self.page.saturating_sub(1))
    }

    /// Back to page 1. Returns true if the page changed.
    pub fn reset(&mut self) -> bool {
        let changed = self.page != 1;
        self.page = 1;
        changed
    }

    /// Steps back one page without consulting the total count
    pub(crate) fn step_back(&mut self) -> bool {
        if self.page > 1 {
            self.page -= 1;
            true
        } else {
            false
        }
    }

    /// Records a total count without touching the page
    pub(crate) fn set_total(&mut self, total_count: u64) {
        self.total_count = total_count;
    }

    /// Records a fresh total count. If the current page no longer exists the
    /// pager clamps to page 1 and returns true so the caller re-fetches.
    pub fn update_total(&mut self, total_count: u64) -> bool {
        self.total_count = total_count;
        if self.page > 1 && self.page > self.total_pages() {
            self.page = 1;
            return true;
        }
        false
    }
}
