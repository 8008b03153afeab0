//! Client-side pagination over the in-memory merged list.
//!
//! Pages are 1-indexed. Page `p` covers `[(p - 1) * size, (p - 1) * size + size)`
//! clipped to the list length; pages past the end (and page 0) are empty.
//! The current page is never clamped to `total_pages`.

use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::ops::Range;

/// Default number of todos per page.
pub const DEFAULT_PAGE_SIZE: NonZeroUsize = match NonZeroUsize::new(10) {
    Some(size) => size,
    None => NonZeroUsize::MIN,
};

/// Number of pages needed for `count` items: `ceil(count / page_size)`.
#[must_use]
pub const fn total_pages(count: usize, page_size: NonZeroUsize) -> usize {
    count.div_ceil(page_size.get())
}

/// Index range of page `page` within a list of `len` items.
#[must_use]
pub fn page_range(page: usize, page_size: NonZeroUsize, len: usize) -> Range<usize> {
    let Some(index) = page.checked_sub(1) else {
        return 0..0;
    };
    let start = index.saturating_mul(page_size.get()).min(len);
    let end = start.saturating_add(page_size.get()).min(len);
    start..end
}

/// Clones the items on page `page`.
#[must_use]
pub fn slice_page<T: Clone>(items: &[T], page: usize, page_size: NonZeroUsize) -> Vec<T> {
    items[page_range(page, page_size, items.len())].to_vec()
}

/// Pagination bookkeeping for the displayed list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Page last requested (1-indexed, unclamped)
    pub current_page: usize,
    /// `ceil(total_count / page_size)`
    pub total_pages: usize,
    /// Items per page
    pub page_size: NonZeroUsize,
    /// Number of records in the merged list
    pub total_count: usize,
}

impl Pagination {
    /// Creates pagination for an empty list.
    #[must_use]
    pub const fn new(page_size: NonZeroUsize) -> Self {
        Self {
            current_page: 1,
            total_pages: 1,
            page_size,
            total_count: 0,
        }
    }

    /// Replaces the total count and recomputes the page count.
    pub const fn set_total(&mut self, total_count: usize) {
        self.total_count = total_count;
        self.total_pages = total_pages(total_count, self.page_size);
    }

    /// Records one added item.
    pub const fn increment(&mut self) {
        self.set_total(self.total_count.saturating_add(1));
    }

    /// Records one removed item.
    pub const fn decrement(&mut self) {
        self.set_total(self.total_count.saturating_sub(1));
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn size(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap_or(NonZeroUsize::MIN)
    }

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(total_pages(0, size(10)), 0);
        assert_eq!(total_pages(3, size(10)), 1);
        assert_eq!(total_pages(10, size(10)), 1);
        assert_eq!(total_pages(11, size(10)), 2);
        assert_eq!(total_pages(7, size(4)), 2);
    }

    #[test]
    fn slice_page_is_one_indexed() {
        let items: Vec<u32> = (0..7).collect();
        assert_eq!(slice_page(&items, 1, size(4)), vec![0, 1, 2, 3]);
        assert_eq!(slice_page(&items, 2, size(4)), vec![4, 5, 6]);
        assert!(slice_page(&items, 3, size(4)).is_empty());
    }

    #[test]
    fn page_zero_is_empty() {
        let items = [1, 2, 3];
        assert!(slice_page(&items, 0, size(2)).is_empty());
    }

    #[test]
    fn huge_page_does_not_overflow() {
        let items = [1, 2, 3];
        assert!(slice_page(&items, usize::MAX, size(usize::MAX)).is_empty());
    }

    #[test]
    fn counters_recompute_pages() {
        let mut pagination = Pagination::new(size(2));
        assert_eq!(pagination.total_pages, 1);

        pagination.set_total(3);
        assert_eq!(pagination.total_pages, 2);

        pagination.increment();
        assert_eq!((pagination.total_count, pagination.total_pages), (4, 2));

        pagination.increment();
        assert_eq!((pagination.total_count, pagination.total_pages), (5, 3));

        pagination.decrement();
        pagination.decrement();
        assert_eq!((pagination.total_count, pagination.total_pages), (3, 2));
    }

    #[test]
    fn decrement_saturates_at_zero() {
        let mut pagination = Pagination::default();
        pagination.decrement();
        assert_eq!(pagination.total_count, 0);
        assert_eq!(pagination.total_pages, 0);
    }

    proptest! {
        #[test]
        fn slice_matches_reference_arithmetic(
            len in 0usize..300,
            page in 1usize..40,
            page_size in 1usize..50,
        ) {
            let items: Vec<usize> = (0..len).collect();
            let slice = slice_page(&items, page, size(page_size));

            let start = (page - 1) * page_size;
            let expected: Vec<usize> = items.iter().copied().skip(start).take(page_size).collect();
            prop_assert_eq!(slice, expected);

            let pages = total_pages(len, size(page_size));
            prop_assert_eq!(pages, (len + page_size - 1) / page_size);
        }
    }
}
