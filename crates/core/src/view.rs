//! Search, sort and pagination over the held task collection.
//!
//! [`compute_view`] is a pure function of the collection and a [`ViewState`]; the
//! page number is kept in range by the `ViewState` setters, never by the
//! computation itself.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use clap::ValueEnum;

use crate::model::Task;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortField {
    #[default]
    Title,
    Priority,
    DueDate,
}

impl SortField {
    pub const ALL: [SortField; 3] = [SortField::Title, SortField::Priority, SortField::DueDate];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Title => "title",
            SortField::Priority => "priority",
            SortField::DueDate => "due-date",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortField::Title => "Title",
            SortField::Priority => "Priority",
            SortField::DueDate => "Due Date",
        }
    }

    pub fn next(self) -> Self {
        match self {
            SortField::Title => SortField::Priority,
            SortField::Priority => SortField::DueDate,
            SortField::DueDate => SortField::Title,
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SortField {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "title" => Ok(SortField::Title),
            "priority" => Ok(SortField::Priority),
            "due" | "due-date" | "due_date" | "duedate" => Ok(SortField::DueDate),
            other => Err(anyhow!(
                "Unknown sort field '{}': expected title|priority|due-date",
                other
            )),
        }
    }
}

impl ValueEnum for SortField {
    fn value_variants<'a>() -> &'a [Self] {
        &SortField::ALL
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(clap::builder::PossibleValue::new(self.as_str()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggle(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "Ascending",
            SortDirection::Descending => "Descending",
        }
    }

    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

/// The fixed set of page sizes offered to the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PageSize {
    #[default]
    Ten,
    TwentyFive,
    Fifty,
}

impl PageSize {
    pub const ALL: [PageSize; 3] = [PageSize::Ten, PageSize::TwentyFive, PageSize::Fifty];

    pub fn get(self) -> usize {
        match self {
            PageSize::Ten => 10,
            PageSize::TwentyFive => 25,
            PageSize::Fifty => 50,
        }
    }

    pub fn next(self) -> Self {
        match self {
            PageSize::Ten => PageSize::TwentyFive,
            PageSize::TwentyFive => PageSize::Fifty,
            PageSize::Fifty => PageSize::Ten,
        }
    }
}

impl TryFrom<usize> for PageSize {
    type Error = anyhow::Error;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        PageSize::ALL
            .into_iter()
            .find(|size| size.get() == value)
            .ok_or_else(|| anyhow!("Unsupported page size {}: expected 10, 25 or 50", value))
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// User-controlled parameters for the list. `page` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    search: String,
    sort_field: SortField,
    direction: SortDirection,
    page_size: PageSize,
    page: usize,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            search: String::new(),
            sort_field: SortField::default(),
            direction: SortDirection::default(),
            page_size: PageSize::default(),
            page: 1,
        }
    }
}

impl ViewState {
    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn sort_field(&self) -> SortField {
        self.sort_field
    }

    pub fn direction(&self) -> SortDirection {
        self.direction
    }

    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.search = search.into();
        self.page = 1;
    }

    pub fn set_sort_field(&mut self, field: SortField) {
        self.sort_field = field;
        self.page = 1;
    }

    pub fn set_direction(&mut self, direction: SortDirection) {
        self.direction = direction;
        self.page = 1;
    }

    pub fn toggle_direction(&mut self) {
        self.set_direction(self.direction.toggle());
    }

    pub fn set_page_size(&mut self, size: PageSize) {
        self.page_size = size;
        self.page = 1;
    }

    /// Move to `page`, clamped to `[1, total_pages]`.
    pub fn set_page(&mut self, page: usize, total_pages: usize) {
        self.page = page.clamp(1, total_pages.max(1));
    }

    pub fn next_page(&mut self, total_pages: usize) {
        self.set_page(self.page.saturating_add(1), total_pages);
    }

    pub fn prev_page(&mut self) {
        self.page = self.page.saturating_sub(1).max(1);
    }

    pub fn clamp_page(&mut self, total_pages: usize) {
        self.set_page(self.page, total_pages);
    }

    /// Restore every parameter to its default. The collection is not affected.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagedResult {
    pub items: Vec<Task>,
    pub page: usize,
    pub total_pages: usize,
    pub total_matches: usize,
}

impl PagedResult {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

/// `max(1, ceil(count / page_size))`.
pub fn total_pages(count: usize, page_size: PageSize) -> usize {
    count.div_ceil(page_size.get()).max(1)
}

/// Number of tasks the current search retains, used to clamp the page.
pub fn count_matches(collection: &[Task], view: &ViewState) -> usize {
    let needle = view.search.to_lowercase();
    collection
        .iter()
        .filter(|task| matches_search(task, &needle))
        .count()
}

/// Filter by title, sort by the selected field, and slice out the requested page.
///
/// The sort is stable: tasks with equal keys keep their collection order in
/// both directions. A page beyond the last one yields an empty window.
pub fn compute_view(collection: &[Task], view: &ViewState) -> PagedResult {
    let needle = view.search.to_lowercase();
    let mut matches: Vec<&Task> = collection
        .iter()
        .filter(|task| matches_search(task, &needle))
        .collect();

    matches.sort_by(|a, b| view.direction.apply(compare_by(view.sort_field, a, b)));

    let total_matches = matches.len();
    let size = view.page_size.get();
    let start = view.page.saturating_sub(1).saturating_mul(size);
    let items = matches
        .into_iter()
        .skip(start)
        .take(size)
        .cloned()
        .collect();

    PagedResult {
        items,
        page: view.page,
        total_pages: total_pages(total_matches, view.page_size),
        total_matches,
    }
}

fn matches_search(task: &Task, needle: &str) -> bool {
    needle.is_empty() || task.title.to_lowercase().contains(needle)
}

fn compare_by(field: SortField, a: &Task, b: &Task) -> Ordering {
    match field {
        SortField::Title => a.title.cmp(&b.title),
        // Wire labels, not rank: High < Low < Medium.
        SortField::Priority => a.priority.as_str().cmp(b.priority.as_str()),
        // Undated tasks order before dated ones.
        SortField::DueDate => a.due_date.cmp(&b.due_date),
    }
}
