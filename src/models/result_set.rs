//! Result set - all items plus the working reference table
//!
//! Holds the authoritative item list, selection helpers and the derived
//! counts/views that drive progress reporting and listings.

use serde::Serialize;

use crate::models::company::CompanyData;
use crate::models::item::{ItemStatus, SearchItem};
use crate::models::table::ReferenceTable;
use crate::services::row_matcher::MatchIndex;

/// Summary attached to items whose data came from the table
pub const EXISTING_DATA_SUMMARY: &str = "Dữ liệu đã có sẵn trong file.";

/// Default listing page size
pub const ITEMS_PER_PAGE: usize = 100;

/// Listing filter
#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    /// Hide success/skipped items
    pub hide_completed: bool,
    /// Case-insensitive substring on the input name
    pub term: Option<String>,
}

impl ItemFilter {
    pub fn matches(&self, item: &SearchItem) -> bool {
        if self.hide_completed && item.status.is_done() {
            return false;
        }
        match self.term.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => item
                .input_name
                .to_lowercase()
                .contains(&term.to_lowercase()),
            _ => true,
        }
    }
}

/// One page of a filtered listing
#[derive(Debug, Clone, Serialize)]
pub struct PageView<'a> {
    pub items: Vec<&'a SearchItem>,
    /// 1-based
    pub page: usize,
    pub total_pages: usize,
    /// 1-based position of the first item shown (0 when empty)
    pub start: usize,
    pub end: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    items: Vec<SearchItem>,
    table: Option<ReferenceTable>,
}

impl ResultSet {
    /// Build the queue from input names
    ///
    /// A name whose first matching table row already has domain and tax code
    /// becomes a skipped, unselected item carrying that data. Everything
    /// else starts pending and selected.
    pub fn load_items(names: &[String], table: Option<ReferenceTable>) -> Self {
        let batch_stamp = chrono::Utc::now().timestamp_millis();
        let index = table.as_ref().map(MatchIndex::build);

        let items = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let id = format!("row-{}-{}", batch_stamp, i);
                let existing = match (&table, &index) {
                    (Some(table), Some(index)) => index
                        .get(name)
                        .filter(|&row| table.is_row_complete(row))
                        .map(|row| {
                            CompanyData::new(name.as_str(), table.domain_at(row), table.tax_code_at(row))
                                .with_summary(EXISTING_DATA_SUMMARY)
                        }),
                    _ => None,
                };
                match existing {
                    Some(data) => SearchItem::skipped(id, name.as_str(), data),
                    None => SearchItem::pending(id, name.as_str()),
                }
            })
            .collect();

        Self { items, table }
    }

    pub fn items(&self) -> &[SearchItem] {
        &self.items
    }

    pub fn item(&self, index: usize) -> Option<&SearchItem> {
        self.items.get(index)
    }

    pub fn item_mut(&mut self, index: usize) -> Option<&mut SearchItem> {
        self.items.get_mut(index)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    pub fn find(&self, id: &str) -> Option<&SearchItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut SearchItem> {
        self.items.iter_mut().find(|item| item.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The loaded table, if it has any rows
    pub fn table(&self) -> Option<&ReferenceTable> {
        self.table.as_ref().filter(|t| !t.is_empty())
    }

    pub fn table_mut(&mut self) -> Option<&mut ReferenceTable> {
        self.table.as_mut().filter(|t| !t.is_empty())
    }

    // ========== Selection ==========

    /// Flip selection; done items are left alone
    pub fn toggle_select(&mut self, id: &str) -> bool {
        match self.find_mut(id) {
            Some(item) if !item.status.is_done() => {
                item.selected = !item.selected;
                true
            }
            _ => false,
        }
    }

    pub fn select_all(&mut self, selected: bool) {
        for item in self.items.iter_mut().filter(|i| !i.status.is_done()) {
            item.selected = selected;
        }
    }

    /// Inclusive range in either direction; indices past the end are clamped
    pub fn select_range(&mut self, start_index: usize, end_index: usize, selected: bool) {
        if self.items.is_empty() {
            return;
        }
        let start = start_index.min(end_index);
        let end = start_index.max(end_index).min(self.items.len() - 1);
        if start > end {
            return;
        }
        for item in self.items[start..=end]
            .iter_mut()
            .filter(|i| !i.status.is_done())
        {
            item.selected = selected;
        }
    }

    // ========== Derived counts ==========

    /// Selected and still to do; items in flight are not counted
    pub fn selected_count(&self) -> usize {
        self.items.iter().filter(|i| i.is_runnable()).count()
    }

    /// Finished by a lookup (success or error)
    pub fn processed_count(&self) -> usize {
        self.items
            .iter()
            .filter(|i| {
                !matches!(
                    i.status,
                    ItemStatus::Pending | ItemStatus::Loading | ItemStatus::Skipped
                )
            })
            .count()
    }

    /// Run denominator: every item with the selected flag set
    pub fn queue_total(&self) -> usize {
        self.items.iter().filter(|i| i.selected).count()
    }

    pub fn progress_percent(&self) -> u32 {
        let total = self.queue_total();
        if total == 0 {
            return 0;
        }
        ((self.processed_count() as f64 / total as f64) * 100.0).round() as u32
    }

    pub fn count_status(&self, status: ItemStatus) -> usize {
        self.items.iter().filter(|i| i.status == status).count()
    }

    /// Success or skipped
    pub fn completed_count(&self) -> usize {
        self.items.iter().filter(|i| i.status.is_done()).count()
    }

    pub fn error_count(&self) -> usize {
        self.count_status(ItemStatus::Error)
    }

    // ========== Views ==========

    pub fn visible<'a>(&'a self, filter: &ItemFilter) -> Vec<&'a SearchItem> {
        self.items.iter().filter(|i| filter.matches(i)).collect()
    }

    /// Page `page` (1-based, clamped) of the filtered list
    pub fn page<'a>(&'a self, filter: &ItemFilter, page: usize, per_page: usize) -> PageView<'a> {
        let per_page = per_page.max(1);
        let visible = self.visible(filter);
        let total = visible.len();
        let total_pages = (total + per_page - 1) / per_page;
        let page = page.clamp(1, total_pages.max(1));
        let offset = (page - 1) * per_page;
        let items: Vec<&SearchItem> = visible.into_iter().skip(offset).take(per_page).collect();
        let start = if items.is_empty() { 0 } else { offset + 1 };
        let end = offset + items.len();

        PageView {
            items,
            page,
            total_pages,
            start,
            end,
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn row(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn sample_table() -> ReferenceTable {
        ReferenceTable::new(vec![
            row(&["STT", "", "", "Tên công ty", "Domain", "MST"]),
            row(&["1", "", "", "Acme", "@acme.com", "123"]),
            row(&["2", "", "", "Beta", "@beta.vn", ""]),
        ])
    }

    #[test]
    fn test_load_items_skips_complete_rows() {
        let set = ResultSet::load_items(&names(&["acme ", "Beta", "Gamma"]), Some(sample_table()));

        let acme = set.item(0).unwrap();
        assert_eq!(acme.status, ItemStatus::Skipped);
        assert!(!acme.selected);
        let data = acme.data.as_ref().unwrap();
        assert_eq!(data.domain, "@acme.com");
        assert_eq!(data.tax_code, "123");
        assert_eq!(data.summary, EXISTING_DATA_SUMMARY);

        assert_eq!(set.item(1).unwrap().status, ItemStatus::Pending);
        assert!(set.item(2).unwrap().selected);
        assert_eq!(set.selected_count(), 2);
    }

    #[test]
    fn test_ids_are_unique() {
        let set = ResultSet::load_items(&names(&["a", "b", "c"]), None);
        let mut ids: Vec<&str> = set.items().iter().map(|i| i.id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn test_toggle_and_select_all_leave_done_items() {
        let mut set = ResultSet::load_items(&names(&["Acme", "Beta"]), Some(sample_table()));
        let acme_id = set.item(0).unwrap().id.clone();
        let beta_id = set.item(1).unwrap().id.clone();

        assert!(!set.toggle_select(&acme_id));
        assert!(!set.item(0).unwrap().selected);

        assert!(set.toggle_select(&beta_id));
        assert!(!set.item(1).unwrap().selected);

        set.select_all(true);
        assert!(!set.item(0).unwrap().selected);
        assert!(set.item(1).unwrap().selected);
    }

    #[test]
    fn test_select_range_normalizes_direction() {
        let mut set = ResultSet::load_items(&names(&["a", "b", "c", "d", "e"]), None);
        set.select_all(false);
        set.select_range(3, 1, true);
        let selected: Vec<bool> = set.items().iter().map(|i| i.selected).collect();
        assert_eq!(selected, vec![false, true, true, true, false]);

        set.select_range(2, 99, false);
        let selected: Vec<bool> = set.items().iter().map(|i| i.selected).collect();
        assert_eq!(selected, vec![false, true, false, false, false]);
    }

    #[test]
    fn test_progress_counts() {
        let mut set = ResultSet::load_items(&names(&["a", "b", "c", "d"]), None);
        assert_eq!(set.progress_percent(), 0);

        set.item_mut(0).unwrap().mark_success(CompanyData::new("a", "@a.vn", "1"), None);
        set.item_mut(1).unwrap().mark_error("boom");
        set.item_mut(2).unwrap().mark_loading();

        assert_eq!(set.processed_count(), 2);
        assert_eq!(set.queue_total(), 4);
        assert_eq!(set.selected_count(), 2);
        assert_eq!(set.progress_percent(), 50);
        assert_eq!(set.completed_count(), 1);
        assert_eq!(set.error_count(), 1);
    }

    #[test]
    fn test_progress_zero_guard() {
        let mut set = ResultSet::load_items(&names(&["a"]), None);
        set.select_all(false);
        assert_eq!(set.queue_total(), 0);
        assert_eq!(set.progress_percent(), 0);
    }

    #[test]
    fn test_filter_and_pagination() {
        let list: Vec<String> = (1..=250).map(|i| format!("Công ty {}", i)).collect();
        let mut set = ResultSet::load_items(&list, None);
        set.item_mut(0)
            .unwrap()
            .mark_success(CompanyData::new("Công ty 1", "@a.vn", "1"), None);

        let all = ItemFilter::default();
        let page = set.page(&all, 3, ITEMS_PER_PAGE);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.items.len(), 50);
        assert_eq!((page.start, page.end, page.total), (201, 250, 250));

        let pending = ItemFilter {
            hide_completed: true,
            term: None,
        };
        assert_eq!(set.visible(&pending).len(), 249);

        let search = ItemFilter {
            hide_completed: false,
            term: Some("CÔNG TY 2".to_string()),
        };
        // "Công ty 2", "Công ty 20".."29", "Công ty 200".."250"
        assert_eq!(set.visible(&search).len(), 1 + 10 + 51);

        let beyond = set.page(&all, 99, ITEMS_PER_PAGE);
        assert_eq!(beyond.page, 3);
    }

    #[test]
    fn test_empty_page() {
        let set = ResultSet::load_items(&[], None);
        let page = set.page(&ItemFilter::default(), 1, ITEMS_PER_PAGE);
        assert_eq!((page.page, page.total_pages, page.start, page.end), (1, 0, 0, 0));
    }
}
