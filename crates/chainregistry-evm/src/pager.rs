//! Splits a historical block range into fixed-size pages.

use chainregistry_core::error::ListenerError;

/// An inclusive `[start, end]` block interval fetched as one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub start: u64,
    pub end: u64,
}

impl Page {
    /// Number of blocks in the page.
    pub fn width(&self) -> u64 {
        self.end - self.start + 1
    }
}

/// Ascending, contiguous pages covering `[start, end]`.
///
/// Every page is at most `size` blocks wide; the last one may be narrower.
/// A page whose nominal end does not fit in a `u64` yields
/// [`ListenerError::PageOverflow`] and ends the sequence.
pub fn pages(start: u64, end: u64, size: u64) -> Result<Pages, ListenerError> {
    if size == 0 {
        return Err(ListenerError::Config("page size must be at least 1".into()));
    }
    Ok(Pages {
        next: (start <= end).then_some(start),
        end,
        size,
    })
}

/// Iterator returned by [`pages`].
#[derive(Debug, Clone)]
pub struct Pages {
    next: Option<u64>,
    end: u64,
    size: u64,
}

impl Iterator for Pages {
    type Item = Result<Page, ListenerError>;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.next.take()?;
        let Some(nominal_end) = start.checked_add(self.size - 1) else {
            return Some(Err(ListenerError::PageOverflow { start }));
        };
        let end = nominal_end.min(self.end);
        if end < self.end {
            self.next = Some(end + 1);
        }
        Some(Ok(Page { start, end }))
    }
}
