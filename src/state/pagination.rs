//! Participant list pagination.

/// Participants shown per page.
pub const PAGE_SIZE: usize = 10;

/// One page of a participant listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<'a, T> {
    /// Zero-based page index after clamping.
    pub index: usize,
    /// Total number of pages (0 when the list is empty).
    pub count: usize,
    pub total: usize,
    pub items: &'a [T],
    pub has_prev: bool,
    pub has_next: bool,
}

/// Slice out page `requested`, clamped into the valid range.
pub fn paginate<T>(items: &[T], requested: i64) -> Page<'_, T> {
    let total = items.len();
    let count = total.div_ceil(PAGE_SIZE);
    let last = count.saturating_sub(1);
    let index = usize::try_from(requested.max(0)).unwrap_or(usize::MAX).min(last);

    let start = (index * PAGE_SIZE).min(total);
    let end = (start + PAGE_SIZE).min(total);

    Page {
        index,
        count,
        total,
        items: &items[start..end],
        has_prev: index > 0,
        has_next: index + 1 < count,
    }
}
