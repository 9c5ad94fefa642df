use std::collections::BTreeSet;
use std::fmt;

use gitcms_core::{PageInfo, PageLinks};
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CursorAction {
    First,
    Prev,
    Next,
    Last,
}

impl fmt::Display for CursorAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CursorAction::First => "first",
            CursorAction::Prev => "prev",
            CursorAction::Next => "next",
            CursorAction::Last => "last",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CursorMeta {
    pub folder: String,
    pub per_page: u64,
    pub current_page: u64,
    pub page_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Cursor {
    actions: BTreeSet<CursorAction>,
    pub meta: CursorMeta,
    links: PageLinks,
}

impl Cursor {
    // The tree API counts pages oldest-first while entries are shown
    // newest-first, so every relation flips when it enters the cursor.
    pub(crate) fn from_listing(folder: &str, info: &PageInfo, links: &PageLinks) -> Self {
        let links = PageLinks {
            first: links.last.clone(),
            last: links.first.clone(),
            prev: links.next.clone(),
            next: links.prev.clone(),
        };
        let mut actions = BTreeSet::new();
        if links.first.is_some() {
            actions.insert(CursorAction::First);
        }
        if links.last.is_some() {
            actions.insert(CursorAction::Last);
        }
        if links.prev.is_some() {
            actions.insert(CursorAction::Prev);
        }
        if links.next.is_some() {
            actions.insert(CursorAction::Next);
        }
        let page_count = info.page_count.max(1);
        let current_page = page_count.saturating_sub(info.page).saturating_add(1);
        Self {
            actions,
            meta: CursorMeta {
                folder: folder.to_string(),
                per_page: info.per_page,
                current_page,
                page_count,
            },
            links,
        }
    }

    pub(crate) fn unpaginated() -> Self {
        Self {
            actions: BTreeSet::new(),
            meta: CursorMeta {
                folder: String::new(),
                per_page: 0,
                current_page: 1,
                page_count: 1,
            },
            links: PageLinks::default(),
        }
    }

    pub fn actions(&self) -> &BTreeSet<CursorAction> {
        &self.actions
    }

    pub fn has_action(&self, action: CursorAction) -> bool {
        self.actions.contains(&action)
    }

    pub fn action_url(&self, action: CursorAction) -> Option<&Url> {
        match action {
            CursorAction::First => self.links.first.as_ref(),
            CursorAction::Last => self.links.last.as_ref(),
            CursorAction::Prev => self.links.prev.as_ref(),
            CursorAction::Next => self.links.next.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_url(page: u64) -> Url {
        Url::parse(&format!(
            "https://gitlab.example/api/v4/projects/1/repository/tree?page={page}"
        ))
        .unwrap()
    }

    fn remote_links(prev: Option<u64>, next: Option<u64>, last: u64) -> PageLinks {
        PageLinks {
            first: Some(page_url(1)),
            last: Some(page_url(last)),
            prev: prev.map(page_url),
            next: next.map(page_url),
        }
    }

    #[test]
    fn last_remote_page_becomes_display_front() {
        let info = PageInfo {
            page: 25,
            per_page: 20,
            page_count: 25,
            total_count: 500,
        };
        let cursor = Cursor::from_listing("content", &info, &remote_links(Some(24), None, 25));

        assert_eq!(cursor.meta.current_page, 1);
        assert_eq!(cursor.meta.page_count, 25);
        assert!(cursor.has_action(CursorAction::Next));
        assert!(!cursor.has_action(CursorAction::Prev));
        assert_eq!(cursor.action_url(CursorAction::Next), Some(&page_url(24)));
        assert_eq!(cursor.action_url(CursorAction::First), Some(&page_url(25)));
        assert_eq!(cursor.action_url(CursorAction::Last), Some(&page_url(1)));
    }

    #[test]
    fn first_remote_page_becomes_display_back() {
        let info = PageInfo {
            page: 1,
            per_page: 20,
            page_count: 25,
            total_count: 500,
        };
        let cursor = Cursor::from_listing("content", &info, &remote_links(None, Some(2), 25));

        assert_eq!(cursor.meta.current_page, 25);
        assert!(cursor.has_action(CursorAction::Prev));
        assert!(!cursor.has_action(CursorAction::Next));
        assert_eq!(cursor.action_url(CursorAction::Prev), Some(&page_url(2)));
    }

    #[test]
    fn middle_page_navigates_both_ways() {
        let info = PageInfo {
            page: 24,
            per_page: 20,
            page_count: 25,
            total_count: 500,
        };
        let cursor =
            Cursor::from_listing("content", &info, &remote_links(Some(23), Some(25), 25));

        assert_eq!(cursor.meta.current_page, 2);
        assert_eq!(cursor.action_url(CursorAction::Prev), Some(&page_url(25)));
        assert_eq!(cursor.action_url(CursorAction::Next), Some(&page_url(23)));
    }

    #[test]
    fn single_page_listing_has_no_neighbours() {
        let info = PageInfo {
            page: 1,
            per_page: 20,
            page_count: 1,
            total_count: 2,
        };
        let cursor = Cursor::from_listing("content", &info, &remote_links(None, None, 1));

        assert_eq!(cursor.meta.current_page, 1);
        assert_eq!(cursor.meta.page_count, 1);
        assert!(!cursor.has_action(CursorAction::Prev));
        assert!(!cursor.has_action(CursorAction::Next));
    }

    #[test]
    fn unpaginated_cursor_offers_no_actions() {
        let cursor = Cursor::unpaginated();
        assert!(cursor.actions().is_empty());
        assert!(cursor.action_url(CursorAction::Next).is_none());
    }

    #[test]
    fn survives_serde_round_trip() {
        let info = PageInfo {
            page: 24,
            per_page: 20,
            page_count: 25,
            total_count: 500,
        };
        let cursor =
            Cursor::from_listing("content", &info, &remote_links(Some(23), Some(25), 25));
        let encoded = serde_json::to_string(&cursor).unwrap();
        let decoded: Cursor = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, cursor);
    }
}
