//! 分页相关的数据结构

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct PaginationParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: Some(1),
            page_size: Some(20),
        }
    }
}

impl PaginationParams {
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self {
            page: page.map(|p| p as i64),
            page_size: per_page.map(|p| p as i64),
        }
    }

    pub fn get_page_size(&self) -> i64 {
        self.page_size.unwrap_or(20).clamp(1, 500)
    }

    /// 总页数（至少 1 页）
    pub fn total_pages(&self, total: i64) -> i64 {
        let page_size = self.get_page_size();
        ((total + page_size - 1) / page_size).max(1)
    }

    /// 页码夹在 [1, total_pages]
    pub fn clamped_page(&self, total: i64) -> i64 {
        self.page.unwrap_or(1).clamp(1, self.total_pages(total))
    }

    pub fn get_offset(&self, total: i64) -> i64 {
        (self.clamped_page(total) - 1) * self.get_page_size()
    }

    pub fn get_limit(&self) -> i64 {
        self.get_page_size()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, page: i64, page_size: i64, total: i64) -> Self {
        let total_pages = ((total + page_size - 1) / page_size).max(1);
        Self {
            data,
            page,
            page_size,
            total,
            total_pages,
        }
    }

    /// 在内存中切片
    pub fn slice(items: Vec<T>, params: &PaginationParams) -> Self {
        let total = items.len() as i64;
        let page = params.clamped_page(total);
        let offset = params.get_offset(total) as usize;
        let limit = params.get_limit() as usize;
        let data = items.into_iter().skip(offset).take(limit).collect();
        Self::new(data, page, params.get_page_size(), total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_params() {
        let params = PaginationParams::new(Some(2), Some(10));
        assert_eq!(params.clamped_page(25), 2);
        assert_eq!(params.get_page_size(), 10);
        assert_eq!(params.get_offset(25), 10);
        assert_eq!(params.get_limit(), 10);
    }

    #[test]
    fn test_page_clamped_to_last_page() {
        let params = PaginationParams::new(Some(9), Some(10));
        assert_eq!(params.clamped_page(25), 3);
        assert_eq!(params.get_offset(25), 20);

        let params = PaginationParams::new(Some(0), Some(10));
        assert_eq!(params.clamped_page(25), 1);
    }

    #[test]
    fn test_slice_empty_has_one_page() {
        let page = PaginatedResponse::<u32>::slice(vec![], &PaginationParams::new(Some(4), Some(10)));
        assert_eq!(page.page, 1);
        assert_eq!(page.total_pages, 1);
        assert!(page.data.is_empty());
    }

    #[test]
    fn test_slice_returns_requested_window() {
        let page = PaginatedResponse::slice((1..=25).collect::<Vec<u32>>(), &PaginationParams::new(Some(3), Some(10)));
        assert_eq!(page.data, vec![21, 22, 23, 24, 25]);
        assert_eq!(page.total, 25);
        assert_eq!(page.total_pages, 3);
    }
}
