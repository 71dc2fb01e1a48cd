//! Pagination for table listings (20 rows per page)

/// Rows per listing page
pub const PAGE_SIZE: i64 = 20;

/// Page window of a listing, serialized next to the rows
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Pagination {
    /// Current page (1-indexed, clamped)
    pub page: i64,
    pub page_size: i64,
    pub total_rows: i64,
    pub total_pages: i64,
    /// Row offset for LIMIT/OFFSET
    #[serde(skip)]
    pub offset: i64,
}

/// Clamp the requested page into `[1, total_pages]` and derive the offset
///
/// # Examples
/// ```
/// use livith_dash::pagination::calculate_pagination;
///
/// // 45 rows = 3 pages (20 + 20 + 5)
/// let p = calculate_pagination(45, 2);
/// assert_eq!(p.page, 2);
/// assert_eq!(p.total_pages, 3);
/// assert_eq!(p.offset, 20);
///
/// // Out-of-range pages are clamped
/// let p = calculate_pagination(45, 99);
/// assert_eq!(p.page, 3);
/// assert_eq!(p.offset, 40);
/// ```
pub fn calculate_pagination(total_rows: i64, requested_page: i64) -> Pagination {
    let total_pages = (total_rows + PAGE_SIZE - 1) / PAGE_SIZE;
    let page = requested_page.clamp(1, total_pages.max(1));

    Pagination {
        page,
        page_size: PAGE_SIZE,
        total_rows,
        total_pages,
        offset: (page - 1) * PAGE_SIZE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_normal() {
        let p = calculate_pagination(50, 2);
        assert_eq!(p.page, 2);
        assert_eq!(p.total_pages, 3);
        assert_eq!(p.offset, 20);
    }

    #[test]
    fn test_pagination_out_of_bounds_high() {
        let p = calculate_pagination(30, 99);
        assert_eq!(p.page, 2);
        assert_eq!(p.total_pages, 2);
        assert_eq!(p.offset, 20);
    }

    #[test]
    fn test_pagination_out_of_bounds_low() {
        let p = calculate_pagination(30, -3);
        assert_eq!(p.page, 1);
        assert_eq!(p.offset, 0);
    }

    #[test]
    fn test_pagination_empty() {
        let p = calculate_pagination(0, 1);
        assert_eq!(p.page, 1);
        assert_eq!(p.total_pages, 0);
        assert_eq!(p.offset, 0);
    }

    #[test]
    fn test_pagination_exact_page_boundary() {
        let p = calculate_pagination(40, 2);
        assert_eq!(p.page, 2);
        assert_eq!(p.total_pages, 2);
        assert_eq!(p.offset, 20);
    }
}
