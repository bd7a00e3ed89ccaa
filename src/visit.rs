//! Range visitation: presence callbacks with coalesced absent spans.

/// Receiver for [`VastBitmap::for_all_in_range`](crate::VastBitmap::for_all_in_range).
///
/// Offsets are relative to the start of the visited range. Present values
/// are reported one by one; absent indices arrive as maximal half-open
/// spans, coalesced even across internal container boundaries.
pub trait RangeVisitor {
    /// A present value at `offset` from the range start.
    fn present(&mut self, offset: u64, value: u64);

    /// A maximal absent span covering offsets `[from, to)`.
    fn absent(&mut self, from: u64, to: u64);
}

/// Threads present values through to a visitor while tracking the gap since
/// the last one, so absent spans come out coalesced no matter how the
/// values are distributed over containers.
pub(crate) struct GapTracker<'a, V: ?Sized> {
    origin: u64,
    next: u64,
    visitor: &'a mut V,
}

impl<'a, V: RangeVisitor + ?Sized> GapTracker<'a, V> {
    pub(crate) fn new(origin: u64, visitor: &'a mut V) -> Self {
        Self {
            origin,
            next: origin,
            visitor,
        }
    }

    /// Reports a present value at absolute position `at`, emitting the
    /// absent span since the previous one first.
    pub(crate) fn value(&mut self, at: u64) {
        debug_assert!(at >= self.next);
        if at > self.next {
            self.visitor.absent(self.next - self.origin, at - self.origin);
        }
        self.visitor.present(at - self.origin, at);
        self.next = at + 1;
    }

    /// Closes the range at absolute position `end` (exclusive).
    pub(crate) fn finish(&mut self, end: u64) {
        if end > self.next {
            self.visitor.absent(self.next - self.origin, end - self.origin);
        }
    }
}
