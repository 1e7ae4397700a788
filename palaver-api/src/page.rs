use crate::{CommentNode, Post};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Pagination query parameters as sent by clients. Out-of-range values
/// are clamped, not rejected, and an unknown sort key means newest-first.
#[derive(Clone, Debug, Default, serde::Deserialize, serde::Serialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub sort: Option<String>,
}

impl PageQuery {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> u32 {
        self.limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> u64 {
        (self.page() as u64 - 1) * self.limit() as u64
    }

    pub fn sort(&self) -> CommentSort {
        CommentSort::from_key(self.sort.as_deref())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub enum CommentSort {
    Newest,
    MostLiked,
    MostDisliked,
}

impl CommentSort {
    pub fn from_key(key: Option<&str>) -> CommentSort {
        match key {
            Some("mostLiked") => CommentSort::MostLiked,
            Some("mostDisliked") => CommentSort::MostDisliked,
            _ => CommentSort::Newest,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Pagination {
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    #[serde(rename = "totalPages")]
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(total: u64, page: u32, limit: u32) -> Pagination {
        Pagination {
            total,
            page,
            limit,
            total_pages: (total + limit as u64 - 1) / limit as u64,
        }
    }
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct PostPage {
    pub post: Post,
    pub comments: Vec<CommentNode>,
    pub pagination: Pagination,
}

#[derive(Clone, Debug, serde::Deserialize, serde::Serialize)]
pub struct PostList {
    pub posts: Vec<Post>,
    pub pagination: Pagination,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_and_limit_are_clamped() {
        let q = PageQuery {
            page: Some(0),
            limit: Some(0),
            sort: None,
        };
        assert_eq!(q.page(), 1);
        assert_eq!(q.limit(), 1);

        let q = PageQuery {
            page: None,
            limit: Some(1000),
            sort: None,
        };
        assert_eq!(q.page(), 1);
        assert_eq!(q.limit(), MAX_PAGE_SIZE);

        assert_eq!(PageQuery::default().limit(), DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn offset_follows_page_and_limit() {
        let q = PageQuery {
            page: Some(3),
            limit: Some(10),
            sort: None,
        };
        assert_eq!(q.offset(), 20);
    }

    #[test]
    fn unknown_sort_key_falls_back_to_newest() {
        assert_eq!(CommentSort::from_key(None), CommentSort::Newest);
        assert_eq!(CommentSort::from_key(Some("bogus")), CommentSort::Newest);
        assert_eq!(
            CommentSort::from_key(Some("mostLiked")),
            CommentSort::MostLiked
        );
        assert_eq!(
            CommentSort::from_key(Some("mostDisliked")),
            CommentSort::MostDisliked
        );
    }

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(Pagination::new(25, 1, 10).total_pages, 3);
        assert_eq!(Pagination::new(30, 1, 10).total_pages, 3);
        assert_eq!(Pagination::new(0, 1, 10).total_pages, 0);
        assert_eq!(Pagination::new(1, 1, 10).total_pages, 1);
    }
}
