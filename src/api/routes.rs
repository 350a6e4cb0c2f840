use axum::http::Method;
use once_cell::sync::Lazy;

use crate::database::models::journal::{JOURNAL_PARTIAL_VIEW, JOURNAL_VIEW, NEW_JOURNAL_VIEW};
use crate::schema::SchemaView;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPolicy {
    Public,
    Authenticated,
}

/// One row of the route table: who may call it and what body it takes
#[derive(Debug, Clone)]
pub struct RouteSpec {
    pub method: Method,
    pub path: &'static str,
    pub policy: AccessPolicy,
    pub body: Option<SchemaView>,
}

impl RouteSpec {
    fn new(method: Method, path: &'static str, policy: AccessPolicy, body: Option<SchemaView>) -> Self {
        Self { method, path, policy, body }
    }
}

pub const JOURNAL_COLLECTION: &str = "/journal";
pub const JOURNAL_COUNT: &str = "/journal/count";
pub const JOURNAL_ITEM: &str = "/journal/:id";

pub static ROUTES: Lazy<Vec<RouteSpec>> = Lazy::new(|| {
    use AccessPolicy::*;
    vec![
        RouteSpec::new(Method::POST, JOURNAL_COLLECTION, Public, Some(NEW_JOURNAL_VIEW)),
        RouteSpec::new(Method::GET, JOURNAL_COUNT, Public, None),
        RouteSpec::new(Method::GET, JOURNAL_COLLECTION, Public, None),
        RouteSpec::new(Method::PATCH, JOURNAL_COLLECTION, Public, Some(JOURNAL_PARTIAL_VIEW)),
        RouteSpec::new(Method::GET, JOURNAL_ITEM, Public, None),
        RouteSpec::new(Method::PATCH, JOURNAL_ITEM, Authenticated, Some(JOURNAL_PARTIAL_VIEW)),
        RouteSpec::new(Method::PUT, JOURNAL_ITEM, Authenticated, Some(JOURNAL_VIEW)),
        RouteSpec::new(Method::DELETE, JOURNAL_ITEM, Public, None),
    ]
});

/// Find the table entry for a matched route pattern
pub fn lookup(method: &Method, path: &str) -> Option<&'static RouteSpec> {
    ROUTES.iter().find(|r| r.method == *method && r.path == path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_item_updates_require_authentication() {
        let protected: Vec<(&Method, &str)> = ROUTES
            .iter()
            .filter(|r| r.policy == AccessPolicy::Authenticated)
            .map(|r| (&r.method, r.path))
            .collect();
        assert_eq!(protected, vec![(&Method::PATCH, JOURNAL_ITEM), (&Method::PUT, JOURNAL_ITEM)]);
    }

    #[test]
    fn bodies_bind_the_expected_views() {
        let view = |m: Method, p: &str| lookup(&m, p).and_then(|r| r.body).map(|v| v.title);
        assert_eq!(view(Method::POST, JOURNAL_COLLECTION), Some("NewJournal"));
        assert_eq!(view(Method::PATCH, JOURNAL_COLLECTION), Some("JournalPartial"));
        assert_eq!(view(Method::PATCH, JOURNAL_ITEM), Some("JournalPartial"));
        assert_eq!(view(Method::PUT, JOURNAL_ITEM), Some("Journal"));
        assert_eq!(view(Method::DELETE, JOURNAL_ITEM), None);
        assert!(lookup(&Method::PUT, JOURNAL_COLLECTION).is_none());
    }
}
