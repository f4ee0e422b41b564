pub const PAGE_SIZE: u32 = 10;
const WINDOW: u32 = 5;

/// Page cursor over a server-reported total. Pages are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    current: u32,
    total_items: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Pagination {
            current: 1,
            total_items: 0,
        }
    }
}

impl Pagination {
    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn total_items(&self) -> u64 {
        self.total_items
    }

    pub fn set_total(&mut self, total_items: u64) {
        self.total_items = total_items;
    }

    pub fn total_pages(&self) -> u32 {
        self.total_items.div_ceil(u64::from(PAGE_SIZE)) as u32
    }

    pub fn skip(&self) -> u32 {
        (self.current - 1) * PAGE_SIZE
    }

    /// Out-of-range pages are ignored. Returns whether the page changed.
    pub fn go_to(&mut self, page: u32) -> bool {
        if page < 1 || page > self.total_pages() || page == self.current {
            return false;
        }
        self.current = page;
        true
    }

    pub fn has_previous(&self) -> bool {
        self.current > 1
    }

    pub fn has_next(&self) -> bool {
        self.current < self.total_pages()
    }

    pub fn reset(&mut self) {
        self.current = 1;
    }

    /// At most five page numbers around the current page, clamped to the valid range.
    pub fn window(&self) -> Vec<u32> {
        let total = self.total_pages();
        if total <= WINDOW {
            return (1..=total).collect();
        }
        let start = if self.current <= 3 {
            1
        } else if self.current >= total - 2 {
            total - WINDOW + 1
        } else {
            self.current - 2
        };
        (start..start + WINDOW).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_total(total: u64) -> Pagination {
        let mut p = Pagination::default();
        p.set_total(total);
        p
    }

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(with_total(0).total_pages(), 0);
        assert_eq!(with_total(10).total_pages(), 1);
        assert_eq!(with_total(11).total_pages(), 2);
        assert_eq!(with_total(25).total_pages(), 3);
    }

    #[test]
    fn out_of_range_navigation_is_ignored() {
        let mut p = with_total(25);
        assert!(!p.go_to(0));
        assert!(!p.go_to(4));
        assert_eq!(p.current(), 1);
        assert!(p.go_to(3));
        assert_eq!(p.skip(), 20);
        assert!(!p.has_next());
        assert!(p.has_previous());
    }

    #[test]
    fn window_clamps_at_edges() {
        let mut p = with_total(200);
        assert_eq!(p.window(), vec![1, 2, 3, 4, 5]);
        p.go_to(10);
        assert_eq!(p.window(), vec![8, 9, 10, 11, 12]);
        p.go_to(19);
        assert_eq!(p.window(), vec![16, 17, 18, 19, 20]);
        assert_eq!(with_total(25).window(), vec![1, 2, 3]);
    }

    #[test]
    fn window_never_leaves_valid_range() {
        for total in 0..120u64 {
            let mut p = with_total(total);
            for page in 1..=p.total_pages() {
                p.go_to(page);
                let window = p.window();
                assert!(window.len() <= 5);
                assert!(window.iter().all(|n| *n >= 1 && *n <= p.total_pages()));
                assert!(window.contains(&p.current()));
            }
        }
    }
}
