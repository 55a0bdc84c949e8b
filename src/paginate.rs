#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    pub maybe_limit: Option<u64>,
    pub maybe_offset: Option<u64>,
}

impl Paginator {
    pub fn limit(&mut self, limit: u64) {
        self.maybe_limit = Some(limit);
    }

    pub fn offset(&mut self, offset: u64) {
        self.maybe_offset = Some(offset);
    }

    /// One based page of `per_page` rows. The offset saturates at `u64::MAX`.
    pub fn paginate(&mut self, page: u64, per_page: u64) {
        let page = page.max(1);
        self.maybe_limit = Some(per_page);
        self.maybe_offset = Some((page - 1).saturating_mul(per_page));
    }

    /// Takes the other limit and offset only where this one has none.
    pub fn fill(&mut self, other: &Paginator) {
        if self.maybe_limit.is_none() {
            self.maybe_limit = other.maybe_limit;
        }
        if self.maybe_offset.is_none() {
            self.maybe_offset = other.maybe_offset;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.maybe_limit.is_none() && self.maybe_offset.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paginate() {
        let mut paginator = Paginator::default();
        paginator.paginate(3, 20);
        assert_eq!(Some(20), paginator.maybe_limit);
        assert_eq!(Some(40), paginator.maybe_offset);
        paginator.paginate(0, 20);
        assert_eq!(Some(0), paginator.maybe_offset);
    }

    #[test]
    fn test_paginate_far_pages_saturate() {
        let mut paginator = Paginator::default();
        paginator.paginate(u64::MAX, 2);
        assert_eq!(Some(2), paginator.maybe_limit);
        assert_eq!(Some(u64::MAX), paginator.maybe_offset);

        paginator.paginate(u64::MAX, 0);
        assert_eq!(Some(0), paginator.maybe_offset);
    }

    #[test]
    fn test_fill_keeps_existing() {
        let mut paginator = Paginator::default();
        paginator.limit(5);
        let mut other = Paginator::default();
        other.limit(50);
        other.offset(10);
        paginator.fill(&other);
        assert_eq!(Some(5), paginator.maybe_limit);
        assert_eq!(Some(10), paginator.maybe_offset);
    }
}
