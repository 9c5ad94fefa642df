use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

const HEADER_PAGE: &str = "x-page";
const HEADER_PER_PAGE: &str = "x-per-page";
const HEADER_TOTAL_PAGES: &str = "x-total-pages";
const HEADER_TOTAL: &str = "x-total";
const HEADER_LINK: &str = "link";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaginationError {
    #[error("missing pagination header {0}")]
    MissingHeader(&'static str),
    #[error("invalid pagination header {name}: {value}")]
    InvalidHeader { name: &'static str, value: String },
    #[error("malformed link header segment: {0}")]
    MalformedLink(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct PageInfo {
    pub page: u64,
    pub per_page: u64,
    pub page_count: u64,
    pub total_count: u64,
}

impl PageInfo {
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, PaginationError> {
        Ok(Self {
            page: numeric_header(headers, HEADER_PAGE)?,
            per_page: numeric_header(headers, HEADER_PER_PAGE)?,
            page_count: numeric_header(headers, HEADER_TOTAL_PAGES)?,
            total_count: numeric_header(headers, HEADER_TOTAL)?,
        })
    }

    pub fn expected_page_count(&self) -> u64 {
        self.total_count.div_ceil(self.per_page.max(1)).max(1)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct PageLinks {
    pub first: Option<Url>,
    pub last: Option<Url>,
    pub prev: Option<Url>,
    pub next: Option<Url>,
}

impl PageLinks {
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, PaginationError> {
        let value = headers
            .get(HEADER_LINK)
            .ok_or(PaginationError::MissingHeader(HEADER_LINK))?;
        let text = value.to_str().map_err(|_| PaginationError::InvalidHeader {
            name: HEADER_LINK,
            value: format!("{value:?}"),
        })?;
        Self::parse(text)
    }

    pub fn parse(header: &str) -> Result<Self, PaginationError> {
        let mut links = Self::default();
        for segment in header.split(',') {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let mut target = None;
            let mut rel = None;
            for part in segment.split(';') {
                let part = part.trim();
                if let Some(inner) = part.strip_prefix('<').and_then(|p| p.strip_suffix('>')) {
                    target = Some(inner);
                } else if let Some(value) = part.strip_prefix("rel=") {
                    rel = Some(value.trim_matches('"'));
                }
            }
            let (Some(target), Some(rel)) = (target, rel) else {
                return Err(PaginationError::MalformedLink(segment.to_string()));
            };
            let url = Url::parse(target)
                .map_err(|_| PaginationError::MalformedLink(segment.to_string()))?;
            match rel {
                "first" => links.first = Some(url),
                "last" => links.last = Some(url),
                "prev" => links.prev = Some(url),
                "next" => links.next = Some(url),
                _ => {}
            }
        }
        Ok(links)
    }
}

fn numeric_header(headers: &HeaderMap, name: &'static str) -> Result<u64, PaginationError> {
    let value = headers
        .get(name)
        .ok_or(PaginationError::MissingHeader(name))?;
    let text = value.to_str().map_err(|_| PaginationError::InvalidHeader {
        name,
        value: format!("{value:?}"),
    })?;
    text.trim().parse().map_err(|_| PaginationError::InvalidHeader {
        name,
        value: text.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn counting_headers(page: u64, per_page: u64, pages: u64, total: u64) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-page", HeaderValue::from_str(&page.to_string()).unwrap());
        headers.insert(
            "x-per-page",
            HeaderValue::from_str(&per_page.to_string()).unwrap(),
        );
        headers.insert(
            "x-total-pages",
            HeaderValue::from_str(&pages.to_string()).unwrap(),
        );
        headers.insert("x-total", HeaderValue::from_str(&total.to_string()).unwrap());
        headers
    }

    #[test]
    fn parses_counting_headers() {
        let info = PageInfo::from_headers(&counting_headers(25, 20, 25, 500)).unwrap();
        assert_eq!(info.page, 25);
        assert_eq!(info.per_page, 20);
        assert_eq!(info.page_count, 25);
        assert_eq!(info.total_count, 500);
    }

    #[test]
    fn missing_counting_header_is_reported_by_name() {
        let mut headers = counting_headers(1, 20, 1, 2);
        headers.remove("x-total-pages");
        let err = PageInfo::from_headers(&headers).unwrap_err();
        assert_eq!(err, PaginationError::MissingHeader("x-total-pages"));
    }

    #[test]
    fn non_numeric_counting_header_is_invalid() {
        let mut headers = counting_headers(1, 20, 1, 2);
        headers.insert("x-page", HeaderValue::from_static("many"));
        let err = PageInfo::from_headers(&headers).unwrap_err();
        assert_eq!(
            err,
            PaginationError::InvalidHeader {
                name: "x-page",
                value: "many".to_string(),
            }
        );
    }

    #[test]
    fn page_count_rounds_up() {
        let info = PageInfo {
            page: 1,
            per_page: 20,
            page_count: 3,
            total_count: 41,
        };
        assert_eq!(info.expected_page_count(), 3);
        let exact = PageInfo {
            total_count: 500,
            ..info
        };
        assert_eq!(exact.expected_page_count(), 25);
        let empty = PageInfo {
            total_count: 0,
            ..info
        };
        assert_eq!(empty.expected_page_count(), 1);
    }

    #[test]
    fn parses_full_link_header() {
        let links = PageLinks::parse(
            "<https://gitlab.com/api/v4/tree?page=1>; rel=\"first\", \
             <https://gitlab.com/api/v4/tree?page=25>; rel=\"last\", \
             <https://gitlab.com/api/v4/tree?page=24>; rel=\"prev\", \
             <https://gitlab.com/api/v4/tree?page=26>; rel=\"next\"",
        )
        .unwrap();
        assert_eq!(
            links.first.as_ref().map(Url::as_str),
            Some("https://gitlab.com/api/v4/tree?page=1")
        );
        assert_eq!(
            links.last.as_ref().map(Url::as_str),
            Some("https://gitlab.com/api/v4/tree?page=25")
        );
        assert_eq!(
            links.prev.as_ref().map(Url::as_str),
            Some("https://gitlab.com/api/v4/tree?page=24")
        );
        assert_eq!(
            links.next.as_ref().map(Url::as_str),
            Some("https://gitlab.com/api/v4/tree?page=26")
        );
    }

    #[test]
    fn omitted_relations_stay_unset() {
        let links = PageLinks::parse(
            "<https://gitlab.com/t?page=1>; rel=\"first\", <https://gitlab.com/t?page=1>; rel=\"last\"",
        )
        .unwrap();
        assert!(links.first.is_some());
        assert!(links.last.is_some());
        assert!(links.prev.is_none());
        assert!(links.next.is_none());
    }

    #[test]
    fn unknown_relations_are_ignored() {
        let links =
            PageLinks::parse("<https://gitlab.com/t?page=2>; rel=\"preload\"").unwrap();
        assert_eq!(links, PageLinks::default());
    }

    #[test]
    fn segment_without_target_is_malformed() {
        let err = PageLinks::parse("rel=\"first\"").unwrap_err();
        assert_eq!(err, PaginationError::MalformedLink("rel=\"first\"".to_string()));
    }

    #[test]
    fn segment_with_unparsable_url_is_malformed() {
        let err = PageLinks::parse("<not a url>; rel=\"first\"").unwrap_err();
        assert!(matches!(err, PaginationError::MalformedLink(_)));
    }
}
