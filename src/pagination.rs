use serde::Serialize;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;

/// One page of a larger, ordered result set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    pub page: u32,
    pub limit: u32,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u32 {
        if self.limit == 0 || self.total_count == 0 {
            return 1;
        }
        self.total_count.div_ceil(u64::from(self.limit)) as u32
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }
}

/// Clamps a requested page/limit pair: pages start at 1, a zero limit means the default.
pub fn normalize(page: u32, limit: u32) -> (u32, u32) {
    let page = page.max(DEFAULT_PAGE);
    let limit = if limit == 0 { DEFAULT_LIMIT } else { limit };
    (page, limit)
}

pub fn offset(page: u32, limit: u32) -> u64 {
    u64::from(page.saturating_sub(1)) * u64::from(limit)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLink {
    Number(u32),
    Gap,
}

/// Compact pager: first page, a window around `current`, last page, with gaps between.
pub fn page_numbers(current: u32, total_pages: u32) -> Vec<PageLink> {
    let mut links = vec![PageLink::Number(1)];

    if total_pages > 2 {
        let start = current
            .saturating_sub(1)
            .min(total_pages - 3)
            .max(2);
        let end = (current + 1).max(3).min(total_pages - 1);

        if start > 2 {
            links.push(PageLink::Gap);
        }
        links.extend((start..=end).map(PageLink::Number));
        if end < total_pages - 1 {
            links.push(PageLink::Gap);
        }
    }

    if total_pages > 1 {
        links.push(PageLink::Number(total_pages));
    }

    links
}

#[cfg(test)]
mod tests {
    use super::*;
    use PageLink::{Gap, Number};

    #[test]
    fn test_total_pages() {
        let page = Page::<()> {
            items: vec![],
            total_count: 21,
            page: 1,
            limit: 10,
        };
        assert_eq!(page.total_pages(), 3);
        assert!(page.has_next());
        assert!(!page.has_prev());
    }

    #[test]
    fn test_total_pages_empty() {
        let page = Page::<()> {
            items: vec![],
            total_count: 0,
            page: 1,
            limit: 10,
        };
        assert_eq!(page.total_pages(), 1);
        assert!(!page.has_next());
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(0, 0), (1, 10));
        assert_eq!(normalize(3, 25), (3, 25));
        assert_eq!(offset(3, 25), 50);
        assert_eq!(offset(1, 10), 0);
    }

    #[test]
    fn test_page_numbers_small() {
        assert_eq!(page_numbers(1, 1), vec![Number(1)]);
        assert_eq!(page_numbers(1, 2), vec![Number(1), Number(2)]);
        assert_eq!(page_numbers(2, 3), vec![Number(1), Number(2), Number(3)]);
    }

    #[test]
    fn test_page_numbers_with_gaps() {
        assert_eq!(
            page_numbers(5, 10),
            vec![Number(1), Gap, Number(4), Number(5), Number(6), Gap, Number(10)]
        );
        assert_eq!(
            page_numbers(1, 10),
            vec![Number(1), Number(2), Number(3), Gap, Number(10)]
        );
        assert_eq!(
            page_numbers(10, 10),
            vec![Number(1), Gap, Number(7), Number(8), Number(9), Number(10)]
        );
    }
}
