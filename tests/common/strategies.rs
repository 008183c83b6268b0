use proptest::prelude::*;

/// Pages a query's cursor returns: (page count, hits per page)
#[derive(Debug, Clone, Copy)]
pub struct QueryScript {
    pub pages: usize,
    pub page_len: usize,
}

/// Scripts for one to four queries named `q0`, `q1`, ...
pub fn query_scripts_strategy() -> impl Strategy<Value = Vec<QueryScript>> {
    prop::collection::vec(
        (0usize..6, 1usize..16).prop_map(|(pages, page_len)| QueryScript { pages, page_len }),
        1..5,
    )
}

pub fn scroll_size_strategy() -> impl Strategy<Value = usize> {
    1usize..12
}

pub fn result_cap_strategy() -> impl Strategy<Value = usize> {
    prop_oneof![0usize..40, 40usize..200, Just(60_000)]
}

/// Results a runner persists for `scripts`, scrolling with `page_size` and
/// stopping once the running total can no longer take a full page under `cap`.
pub fn expected_processed(scripts: &[QueryScript], page_size: usize, cap: usize) -> usize {
    let limit = cap.saturating_sub(page_size);
    let mut total = 0;
    for script in scripts {
        let mut remaining = script.pages;
        while remaining > 0 && total < limit {
            total += script.page_len.min(page_size);
            remaining -= 1;
        }
    }
    total
}
