//! Catalog state management
//!
//! Holds the agent list fetched from the backend and derives everything the
//! browse and detail views render: category counts, the ownership-filtered
//! view, and the client-side sort order. Fetching is delegated to an
//! [`AgentApi`] collaborator; this module owns no persistence.
//!
//! Known simplification, kept deliberately: nothing fences overlapping
//! fetches, so a slow early response can overwrite a later fast one. The
//! last response to arrive wins.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use ahub_protocol::Agent;

use crate::agents::AgentApi;
use crate::auth::Viewer;

/// Client-side sort key for the catalog view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SortKey {
    /// Locale-aware name, ascending
    Name,
    /// Download count, descending
    Downloads,
    /// Creation date, descending
    #[default]
    Date,
}

/// Derive category occurrence counts from a full agent list.
///
/// Categories with zero occurrences are absent from the map, never present
/// with value 0. Runs in O(n); input order does not matter.
pub fn aggregate_category_counts(agents: &[Agent]) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for agent in agents {
        *counts.entry(agent.category.clone()).or_insert(0) += 1;
    }
    counts
}

/// Parse an agent's `created_at` leniently.
///
/// Accepts RFC 3339, a naive datetime, or a bare date. Anything else maps to
/// the Unix epoch so broken rows sort after every valid one in the
/// descending date order.
pub fn parse_created_at(raw: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return naive.and_utc();
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return naive.and_utc();
        }
    }
    DateTime::UNIX_EPOCH
}

/// Collation key for name ordering: NFD-normalized with combining marks
/// stripped, lowercased. Gives case- and accent-insensitive ordering without
/// a host-locale collator.
fn collation_key(name: &str) -> String {
    name.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

fn compare_names(a: &str, b: &str) -> std::cmp::Ordering {
    // Raw tie-break keeps the order total, so the sort is idempotent even
    // for names that collate equal ("Alpha" vs "alpha").
    collation_key(a).cmp(&collation_key(b)).then_with(|| a.cmp(b))
}

/// Sort the in-memory list in place. All three keys use a stable sort;
/// `downloads` and `date` ties retain their relative input order.
pub fn sort_agents(agents: &mut [Agent], key: SortKey) {
    match key {
        SortKey::Name => agents.sort_by(|a, b| compare_names(&a.name, &b.name)),
        SortKey::Downloads => agents.sort_by(|a, b| b.download_count.cmp(&a.download_count)),
        SortKey::Date => agents.sort_by(|a, b| {
            parse_created_at(&b.created_at).cmp(&parse_created_at(&a.created_at))
        }),
    }
}

/// Ownership filter: restrict to the viewer's own records.
///
/// Inert for unauthenticated viewers, returning the input unchanged.
pub fn filter_mine(agents: &[Agent], viewer: Viewer) -> Vec<Agent> {
    match viewer.user_id {
        Some(user_id) => agents
            .iter()
            .filter(|a| a.user_id == Some(user_id))
            .cloned()
            .collect(),
        None => agents.to_vec(),
    }
}

/// Catalog state manager
///
/// Orchestrates fetch → aggregate → filter/sort. One instance per view; a
/// new view starts from scratch.
#[derive(Debug)]
pub struct CatalogState<A> {
    api: A,
    viewer: Viewer,
    agents: Vec<Agent>,
    category_counts: HashMap<String, usize>,
    active_category: Option<String>,
    active_search: Option<String>,
    sort_key: SortKey,
    mine_only: bool,
    loading: bool,
    page_error: Option<String>,
}

impl<A: AgentApi> CatalogState<A> {
    pub fn new(api: A, viewer: Viewer) -> Self {
        Self {
            api,
            viewer,
            agents: Vec::new(),
            category_counts: HashMap::new(),
            active_category: None,
            active_search: None,
            sort_key: SortKey::default(),
            mine_only: false,
            loading: false,
            page_error: None,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Load the full or category-filtered catalog.
    ///
    /// Category counts are recomputed only on an unfiltered load; a filtered
    /// load keeps the previous mapping (stale counts between full refreshes
    /// are accepted).
    pub async fn load_all(&mut self, category: Option<String>) {
        self.active_search = None;
        self.active_category = category.clone();

        self.loading = true;
        let result = self.api.fetch_agents(category.as_deref()).await;
        self.loading = false;

        match result {
            Ok(page) => {
                self.agents = page.agents;
                if category.is_none() {
                    self.category_counts = aggregate_category_counts(&self.agents);
                }
                self.page_error = None;
            }
            Err(e) => {
                // Stale-but-visible beats blank: keep the old list.
                self.page_error = Some(e.to_string());
            }
        }
    }

    /// Free-text search. A non-empty term supersedes the category filter for
    /// this fetch; an empty term reverts to the last category filter.
    pub async fn search(&mut self, term: &str) {
        let term = term.trim();
        if term.is_empty() {
            let category = self.active_category.clone();
            self.load_all(category).await;
            return;
        }

        self.active_search = Some(term.to_string());

        self.loading = true;
        let result = self.api.search_agents(term).await;
        self.loading = false;

        match result {
            Ok(page) => {
                self.agents = page.agents;
                self.page_error = None;
            }
            Err(e) => {
                self.page_error = Some(e.to_string());
            }
        }
    }

    /// Re-run the last fetch to reconcile optimistic state with the backend.
    pub async fn refresh_after_mutation(&mut self) {
        match self.active_search.clone() {
            Some(term) => self.search(&term).await,
            None => {
                let category = self.active_category.clone();
                self.load_all(category).await;
            }
        }
    }

    /// The final ordered sequence to render: ownership filter, then the
    /// client-side sort.
    pub fn visible(&self) -> Vec<Agent> {
        let mut agents = if self.mine_only {
            filter_mine(&self.agents, self.viewer)
        } else {
            self.agents.clone()
        };
        sort_agents(&mut agents, self.sort_key);
        agents
    }

    /// Optimistic bump after a successful download acknowledgment. The next
    /// authoritative fetch overwrites it.
    pub fn note_download_success(&mut self, agent_id: i64) {
        if let Some(agent) = self.agents.iter_mut().find(|a| a.id == agent_id) {
            agent.download_count += 1;
        }
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn category_counts(&self) -> &HashMap<String, usize> {
        &self.category_counts
    }

    /// Count for one category; absent categories read as zero.
    pub fn count_for(&self, category: &str) -> usize {
        self.category_counts.get(category).copied().unwrap_or(0)
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn page_error(&self) -> Option<&str> {
        self.page_error.as_deref()
    }

    pub fn dismiss_page_error(&mut self) {
        self.page_error = None;
    }

    pub fn set_sort_key(&mut self, key: SortKey) {
        self.sort_key = key;
    }

    /// Enable the "my agents" filter. The toggle is unreachable in the UI
    /// while unauthenticated, but the filter itself is also inert then.
    pub fn set_mine_only(&mut self, mine_only: bool) {
        self.mine_only = mine_only;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::mocks::MockAgentApi;
    use crate::tests::utils::test_helpers::*;

    mod unit {
        use super::*;

        #[test]
        fn test_aggregate_counts_exact() {
            let agents = vec![
                make_agent(1, "a", "tools", 0, "2024-01-01"),
                make_agent(2, "b", "tools", 0, "2024-01-01"),
                make_agent(3, "c", "research", 0, "2024-01-01"),
            ];
            let counts = aggregate_category_counts(&agents);
            assert_eq!(counts.len(), 2);
            assert_eq!(counts["tools"], 2);
            assert_eq!(counts["research"], 1);
        }

        #[test]
        fn test_aggregate_counts_empty_input() {
            assert!(aggregate_category_counts(&[]).is_empty());
        }

        #[test]
        fn test_aggregate_counts_order_independent() {
            let a = vec![
                make_agent(1, "a", "x", 0, "2024-01-01"),
                make_agent(2, "b", "y", 0, "2024-01-01"),
            ];
            let b: Vec<_> = a.iter().rev().cloned().collect();
            assert_eq!(aggregate_category_counts(&a), aggregate_category_counts(&b));
        }

        #[test]
        fn test_name_sort_locale_scenario() {
            // "alpha" before "Bravo" despite lowercase-after-uppercase in
            // raw byte order.
            let mut agents = vec![
                make_agent(1, "Bravo", "x", 5, "2024-01-02"),
                make_agent(2, "alpha", "x", 5, "2024-01-01"),
            ];
            sort_agents(&mut agents, SortKey::Name);
            let names: Vec<_> = agents.iter().map(|a| a.name.as_str()).collect();
            assert_eq!(names, vec!["alpha", "Bravo"]);
        }

        #[test]
        fn test_name_sort_accent_insensitive() {
            let mut agents = vec![
                make_agent(1, "Órbita", "x", 0, "2024-01-01"),
                make_agent(2, "omega", "x", 0, "2024-01-01"),
                make_agent(3, "Oz", "x", 0, "2024-01-01"),
            ];
            sort_agents(&mut agents, SortKey::Name);
            let names: Vec<_> = agents.iter().map(|a| a.name.as_str()).collect();
            // "ó" collates as "o": omega < orbita < oz
            assert_eq!(names, vec!["omega", "Órbita", "Oz"]);
        }

        #[test]
        fn test_downloads_sort_stable() {
            let mut agents = vec![
                make_agent(1, "first", "x", 5, "2024-01-02"),
                make_agent(2, "second", "x", 5, "2024-01-01"),
                make_agent(3, "third", "x", 9, "2024-01-03"),
            ];
            sort_agents(&mut agents, SortKey::Downloads);
            let ids: Vec<_> = agents.iter().map(|a| a.id).collect();
            // 9 first; the two 5s keep their input order.
            assert_eq!(ids, vec![3, 1, 2]);
        }

        #[test]
        fn test_date_sort_descending_and_stable() {
            let mut agents = vec![
                make_agent(1, "a", "x", 0, "2024-03-01"),
                make_agent(2, "b", "x", 0, "2024-05-01"),
                make_agent(3, "c", "x", 0, "2024-03-01"),
            ];
            sort_agents(&mut agents, SortKey::Date);
            let ids: Vec<_> = agents.iter().map(|a| a.id).collect();
            assert_eq!(ids, vec![2, 1, 3]);
        }

        #[test]
        fn test_invalid_date_sorts_last() {
            let mut agents = vec![
                make_agent(1, "broken", "x", 0, "not-a-date"),
                make_agent(2, "old", "x", 0, "1999-12-31"),
                make_agent(3, "new", "x", 0, "2024-06-01T12:00:00Z"),
            ];
            sort_agents(&mut agents, SortKey::Date);
            let ids: Vec<_> = agents.iter().map(|a| a.id).collect();
            assert_eq!(ids, vec![3, 2, 1]);
        }

        #[test]
        fn test_parse_created_at_variants() {
            assert_ne!(
                parse_created_at("2024-06-01T12:00:00Z"),
                DateTime::UNIX_EPOCH
            );
            assert_ne!(
                parse_created_at("2024-06-01T12:00:00.123"),
                DateTime::UNIX_EPOCH
            );
            assert_ne!(parse_created_at("2024-06-01"), DateTime::UNIX_EPOCH);
            assert_eq!(parse_created_at(""), DateTime::UNIX_EPOCH);
            assert_eq!(parse_created_at("yesterday"), DateTime::UNIX_EPOCH);
        }

        #[test]
        fn test_empty_list_sorts_without_error() {
            let mut agents: Vec<Agent> = Vec::new();
            sort_agents(&mut agents, SortKey::Name);
            sort_agents(&mut agents, SortKey::Date);
            assert!(agents.is_empty());
        }

        #[test]
        fn test_ownership_filter_unauthenticated_is_inert() {
            let agents = vec![
                make_owned_agent(1, "a", Some(7)),
                make_owned_agent(2, "b", Some(8)),
                make_owned_agent(3, "c", None),
            ];
            let filtered = filter_mine(&agents, Viewer::anonymous());
            assert_eq!(filtered, agents);
        }

        #[test]
        fn test_ownership_filter_authenticated() {
            let agents = vec![
                make_owned_agent(1, "a", Some(7)),
                make_owned_agent(2, "b", Some(8)),
                make_owned_agent(3, "c", None),
            ];
            let filtered = filter_mine(&agents, Viewer::authenticated(7));
            let ids: Vec<_> = filtered.iter().map(|a| a.id).collect();
            assert_eq!(ids, vec![1]);
        }

        #[tokio::test]
        async fn test_load_all_recomputes_counts_only_unfiltered() {
            let api = MockAgentApi::new();
            api.set_page(
                MockAgentApi::ALL,
                vec![
                    make_agent(1, "a", "tools", 0, "2024-01-01"),
                    make_agent(2, "b", "research", 0, "2024-01-01"),
                ],
            );
            api.set_page("cat:tools", vec![make_agent(1, "a", "tools", 0, "2024-01-01")]);

            let mut catalog = CatalogState::new(api, Viewer::anonymous());
            catalog.load_all(None).await;
            assert_eq!(catalog.count_for("tools"), 1);
            assert_eq!(catalog.count_for("research"), 1);

            // Filtered load keeps the stale mapping.
            catalog.load_all(Some("tools".to_string())).await;
            assert_eq!(catalog.agents().len(), 1);
            assert_eq!(catalog.count_for("research"), 1);
        }

        #[tokio::test]
        async fn test_counts_replaced_wholesale() {
            let api = MockAgentApi::new();
            api.set_page(MockAgentApi::ALL, vec![make_agent(1, "a", "tools", 0, "2024-01-01")]);

            let mut catalog = CatalogState::new(api, Viewer::anonymous());
            catalog.load_all(None).await;
            assert_eq!(catalog.count_for("tools"), 1);

            catalog
                .api()
                .set_page(MockAgentApi::ALL, vec![make_agent(2, "b", "research", 0, "2024-01-01")]);
            catalog.load_all(None).await;
            // Old category gone entirely, not merged at zero.
            assert_eq!(catalog.count_for("tools"), 0);
            assert!(!catalog.category_counts().contains_key("tools"));
            assert_eq!(catalog.count_for("research"), 1);
        }

        #[tokio::test]
        async fn test_search_supersedes_category_and_reverts() {
            let api = MockAgentApi::new();
            api.set_page("cat:tools", vec![make_agent(1, "a", "tools", 0, "2024-01-01")]);
            api.set_page("search:mail", vec![make_agent(9, "mailer", "comms", 0, "2024-01-01")]);

            let mut catalog = CatalogState::new(api, Viewer::anonymous());
            catalog.load_all(Some("tools".to_string())).await;
            catalog.search("mail").await;
            assert_eq!(catalog.agents()[0].id, 9);

            // Clearing the term re-fetches with the last category filter.
            catalog.search("").await;
            assert_eq!(catalog.agents()[0].id, 1);
            let calls = catalog.api().calls();
            assert_eq!(calls, vec!["cat:tools", "search:mail", "cat:tools"]);
        }

        #[tokio::test]
        async fn test_fetch_failure_keeps_stale_list() {
            let api = MockAgentApi::new();
            api.set_page(MockAgentApi::ALL, vec![make_agent(1, "a", "tools", 0, "2024-01-01")]);

            let mut catalog = CatalogState::new(api, Viewer::anonymous());
            catalog.load_all(None).await;
            assert_eq!(catalog.agents().len(), 1);

            catalog.api().fail_next_fetch("backend down");
            catalog.load_all(None).await;

            assert_eq!(catalog.agents().len(), 1);
            assert!(catalog.page_error().is_some());
            assert!(!catalog.is_loading());

            catalog.dismiss_page_error();
            assert!(catalog.page_error().is_none());
        }

        #[tokio::test]
        async fn test_optimistic_bump_then_reconcile() {
            let api = MockAgentApi::new();
            api.set_page(MockAgentApi::ALL, vec![make_agent(42, "a", "tools", 10, "2024-01-01")]);

            let mut catalog = CatalogState::new(api, Viewer::anonymous());
            catalog.load_all(None).await;

            catalog.note_download_success(42);
            assert_eq!(catalog.agents()[0].download_count, 11);

            // Another client downloaded concurrently; the authoritative
            // value wins on refresh.
            catalog
                .api()
                .set_page(MockAgentApi::ALL, vec![make_agent(42, "a", "tools", 13, "2024-01-01")]);
            catalog.refresh_after_mutation().await;
            assert_eq!(catalog.agents()[0].download_count, 13);
        }

        #[tokio::test]
        async fn test_refresh_repeats_search_mode() {
            let api = MockAgentApi::new();
            api.set_page("search:mail", vec![make_agent(9, "mailer", "comms", 0, "2024-01-01")]);

            let mut catalog = CatalogState::new(api, Viewer::anonymous());
            catalog.search("mail").await;
            catalog.refresh_after_mutation().await;
            assert_eq!(catalog.api().calls(), vec!["search:mail", "search:mail"]);
        }

        #[tokio::test]
        async fn test_visible_applies_filter_then_sort() {
            let api = MockAgentApi::new();
            api.set_page(
                MockAgentApi::ALL,
                vec![
                    make_owned_agent(1, "zeta", Some(7)),
                    make_owned_agent(2, "alpha", Some(7)),
                    make_owned_agent(3, "midway", Some(8)),
                ],
            );

            let mut catalog = CatalogState::new(api, Viewer::authenticated(7));
            catalog.load_all(None).await;
            catalog.set_mine_only(true);
            catalog.set_sort_key(SortKey::Name);

            let names: Vec<_> = catalog.visible().iter().map(|a| a.name.clone()).collect();
            assert_eq!(names, vec!["alpha", "zeta"]);
        }
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn arb_agent() -> impl Strategy<Value = Agent> {
            (
                0i64..1000,
                "[a-zA-Z][a-zA-Z ]{0,12}",
                prop::sample::select(vec!["tools", "research", "comms", "ops"]),
                0u64..100,
                prop::option::of(0i64..5),
            )
                .prop_map(|(id, name, category, downloads, user_id)| {
                    let mut agent = make_agent(id, &name, category, downloads, "2024-01-01");
                    agent.user_id = user_id;
                    agent
                })
        }

        proptest! {
            #[test]
            fn prop_counts_sum_to_len(agents in prop::collection::vec(arb_agent(), 0..50)) {
                let counts = aggregate_category_counts(&agents);
                let total: usize = counts.values().sum();
                prop_assert_eq!(total, agents.len());
                prop_assert!(counts.values().all(|&c| c >= 1));
            }

            #[test]
            fn prop_counts_cover_exactly_present_categories(
                agents in prop::collection::vec(arb_agent(), 0..50)
            ) {
                let counts = aggregate_category_counts(&agents);
                for agent in &agents {
                    prop_assert!(counts.contains_key(&agent.category));
                }
                for category in counts.keys() {
                    prop_assert!(agents.iter().any(|a| &a.category == category));
                }
            }

            #[test]
            fn prop_name_sort_idempotent(mut agents in prop::collection::vec(arb_agent(), 0..30)) {
                sort_agents(&mut agents, SortKey::Name);
                let once = agents.clone();
                sort_agents(&mut agents, SortKey::Name);
                prop_assert_eq!(once, agents);
            }

            #[test]
            fn prop_downloads_sort_stable(agents in prop::collection::vec(arb_agent(), 0..30)) {
                // Tag each record with its input position so ties are checkable.
                let tagged: Vec<Agent> = agents
                    .into_iter()
                    .enumerate()
                    .map(|(i, mut a)| {
                        a.description = i.to_string();
                        a
                    })
                    .collect();
                let mut sorted = tagged.clone();
                sort_agents(&mut sorted, SortKey::Downloads);
                for pair in sorted.windows(2) {
                    prop_assert!(pair[0].download_count >= pair[1].download_count);
                    if pair[0].download_count == pair[1].download_count {
                        let pos_a: usize = pair[0].description.parse().unwrap();
                        let pos_b: usize = pair[1].description.parse().unwrap();
                        prop_assert!(pos_a < pos_b);
                    }
                }
            }

            #[test]
            fn prop_unauthenticated_filter_is_identity(
                agents in prop::collection::vec(arb_agent(), 0..30)
            ) {
                let filtered = filter_mine(&agents, Viewer::anonymous());
                prop_assert_eq!(filtered, agents);
            }
        }
    }
}
