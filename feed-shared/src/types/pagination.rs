use serde::{Deserialize, Serialize};

pub const MAX_PER_PAGE: u64 = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

fn default_page() -> u64 { 1 }
fn default_per_page() -> u64 { 20 }

impl PaginationParams {
    pub fn offset(&self) -> u64 {
        (self.page.max(1) - 1) * self.limit()
    }

    pub fn limit(&self) -> u64 {
        self.per_page.clamp(1, MAX_PER_PAGE)
    }
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self { page: 1, per_page: 20 }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Paginated<T: Serialize> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

impl<T: Serialize> Paginated<T> {
    pub fn new(items: Vec<T>, total: u64, params: &PaginationParams) -> Self {
        let per_page = params.limit();
        let total_pages = if total == 0 { 0 } else { total.div_ceil(per_page) };
        Self {
            items,
            total,
            page: params.page.max(1),
            per_page,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_uses_clamped_limit() {
        let params = PaginationParams { page: 3, per_page: 500 };
        assert_eq!(params.limit(), 100);
        assert_eq!(params.offset(), 200);
    }

    #[test]
    fn page_zero_is_first_page() {
        let params = PaginationParams { page: 0, per_page: 10 };
        assert_eq!(params.offset(), 0);
        let page: Paginated<u8> = Paginated::new(vec![], 0, &params);
        assert_eq!(page.page, 1);
        assert_eq!(page.total_pages, 0);
    }

    #[test]
    fn total_pages_rounds_up() {
        let params = PaginationParams { page: 1, per_page: 20 };
        let page = Paginated::new(vec![1, 2, 3], 41, &params);
        assert_eq!(page.total_pages, 3);
    }
}
