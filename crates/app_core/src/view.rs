//! Derived display lists: filter, order, group
//!
//! Everything here is a pure function of the store and a [`ViewState`].

use crate::{EntityStore, FileId, FileRecord, Rating, Reference, ReferenceId, SortOrder};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Association status filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusFilter {
    #[default]
    #[serde(rename = "all")]
    All,
    #[serde(rename = "associated")]
    Associated,
    #[serde(rename = "unassociated")]
    Unassociated,
}

/// What the gallery currently shows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    pub status: StatusFilter,
    pub rating: Option<Rating>,
    pub reference: Option<ReferenceId>,
    pub sort_order: SortOrder,
}

impl ViewState {
    /// The single reference being viewed, if any
    ///
    /// A reference filter only counts together with the associated filter.
    pub fn active_reference(&self) -> Option<ReferenceId> {
        match self.status {
            StatusFilter::Associated => self.reference,
            _ => None,
        }
    }

    /// Show only the files of one reference
    pub fn focus_reference(&mut self, reference: ReferenceId) {
        self.status = StatusFilter::Associated;
        self.reference = Some(reference);
    }

    /// Change the status filter; this leaves any single-reference view
    pub fn set_status(&mut self, status: StatusFilter) {
        self.status = status;
        self.reference = None;
    }

    /// Selecting the active rating again clears it
    pub fn toggle_rating(&mut self, rating: Rating) {
        self.rating = if self.rating == Some(rating) { None } else { Some(rating) };
    }

    pub fn toggle_sort_order(&mut self) {
        self.sort_order = self.sort_order.reversed();
    }

    /// Back to all files, any rating, newest first
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// One section of the gallery
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewGroup<'a> {
    /// `None` for the unassociated group
    pub reference: Option<&'a Reference>,
    pub files: Vec<&'a FileRecord>,
}

impl ViewGroup<'_> {
    pub fn is_unassociated(&self) -> bool {
        self.reference.is_none()
    }
}

fn passes_filter(file: &FileRecord, view: &ViewState) -> bool {
    let status_ok = match view.status {
        StatusFilter::All => true,
        StatusFilter::Associated => match view.reference {
            Some(r) => file.reference == Some(r),
            None => file.reference.is_some(),
        },
        StatusFilter::Unassociated => file.reference.is_none(),
    };

    status_ok && view.rating.map_or(true, |target| file.rating == target)
}

fn by_date(order: SortOrder) -> impl Fn(&&FileRecord, &&FileRecord) -> Ordering {
    move |a, b| {
        let date = match order {
            SortOrder::Ascending => a.last_modified.cmp(&b.last_modified),
            SortOrder::Descending => b.last_modified.cmp(&a.last_modified),
        };
        date.then_with(|| a.name.cmp(&b.name)).then_with(|| a.id.cmp(&b.id))
    }
}

/// Filter and order the files of the view, ignoring grouping
pub fn filter_and_sort<'a>(store: &'a EntityStore, view: &ViewState) -> Vec<&'a FileRecord> {
    let mut filtered: Vec<&FileRecord> = store.files().iter().filter(|f| passes_filter(f, view)).collect();

    let custom = view
        .active_reference()
        .and_then(|r| store.custom_order(r).map(|order| (r, order)));

    match custom {
        Some((reference, order)) => {
            let by_id: HashMap<FileId, &FileRecord> = filtered.iter().map(|f| (f.id, *f)).collect();
            let mut placed = HashSet::new();
            let mut ordered: Vec<&FileRecord> = order
                .iter()
                .filter_map(|id| by_id.get(id).copied())
                .filter(|f| f.is_associated_with(reference) && placed.insert(f.id))
                .collect();

            filtered.retain(|f| !placed.contains(&f.id));
            filtered.sort_by(by_date(view.sort_order));
            ordered.extend(filtered);
            ordered
        }
        None => {
            filtered.sort_by(by_date(view.sort_order));
            filtered
        }
    }
}

/// Full gallery projection
pub fn project<'a>(store: &'a EntityStore, view: &ViewState) -> Vec<ViewGroup<'a>> {
    let files = filter_and_sort(store, view);
    if files.is_empty() {
        return Vec::new();
    }

    if let Some(r) = view.active_reference() {
        return match store.reference(r) {
            Some(reference) => vec![ViewGroup {
                reference: Some(reference),
                files,
            }],
            None => Vec::new(),
        };
    }

    let mut by_reference: HashMap<ReferenceId, Vec<&FileRecord>> = HashMap::new();
    let mut unassociated = Vec::new();

    for file in files {
        match file.reference.filter(|r| store.reference(*r).is_some()) {
            Some(r) => by_reference.entry(r).or_default().push(file),
            None => unassociated.push(file),
        }
    }

    let mut groups = Vec::new();

    if matches!(view.status, StatusFilter::All | StatusFilter::Associated) {
        for reference in store.references() {
            if let Some(files) = by_reference.remove(&reference.id) {
                groups.push(ViewGroup {
                    reference: Some(reference),
                    files,
                });
            }
        }
    }

    if matches!(view.status, StatusFilter::All | StatusFilter::Unassociated) && !unassociated.is_empty() {
        groups.push(ViewGroup {
            reference: None,
            files: unassociated,
        });
    }

    groups
}

/// Visible file ids in display order
pub fn visible_ids(groups: &[ViewGroup<'_>]) -> Vec<FileId> {
    groups.iter().flat_map(|g| g.files.iter().map(|f| f.id)).collect()
}

/// Thumbnail for a reference
///
/// First custom-ordered file with a preview, else the most recently modified
/// associated file with one.
pub fn reference_preview(store: &EntityStore, reference: ReferenceId) -> Option<&FileRecord> {
    let from_order = store
        .custom_order(reference)
        .and_then(|order| order.first())
        .and_then(|id| store.file(*id))
        .filter(|f| f.is_associated_with(reference) && f.has_preview());

    from_order.or_else(|| {
        store
            .files_for(reference)
            .filter(|f| f.has_preview())
            .max_by_key(|f| f.last_modified)
    })
}

/// Number of files associated with each reference
pub fn reference_counts(store: &EntityStore) -> HashMap<ReferenceId, usize> {
    let mut counts = HashMap::new();
    for r in store.files().iter().filter_map(|f| f.reference) {
        *counts.entry(r).or_insert(0) += 1;
    }
    counts
}

/// Rating shared by every given file; `None` when empty or mixed
pub fn common_rating<'a, I>(store: &EntityStore, ids: I) -> Option<Rating>
where
    I: IntoIterator<Item = &'a FileId>,
{
    let mut ratings = ids.into_iter().filter_map(|id| store.file(*id)).map(|f| f.rating);
    let first = ratings.next()?;
    ratings.all(|r| r == first).then_some(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NewFile, Origin};

    struct Fixture {
        store: EntityStore,
        files: Vec<FileId>,
        refs: Vec<ReferenceId>,
    }

    /// Six files modified at t=0..5 and two references
    fn fixture() -> Fixture {
        let mut store = EntityStore::new();
        let records: Vec<_> = (0..6)
            .map(|i| NewFile::new(format!("f{}.png", i), vec![i as u8], i as i64).into_record(Origin::Manual))
            .collect();
        let files = records.iter().map(|f| f.id).collect();
        store.add_files(records);
        let refs = store.add_references(["first", "second"]);
        Fixture { store, files, refs }
    }

    fn names(files: &[&FileRecord]) -> Vec<String> {
        files.iter().map(|f| f.name.clone()).collect()
    }

    #[test]
    fn test_sort_by_date() {
        let fx = fixture();
        let mut view = ViewState::default();
        assert_eq!(names(&filter_and_sort(&fx.store, &view))[0], "f5.png");

        view.toggle_sort_order();
        assert_eq!(names(&filter_and_sort(&fx.store, &view))[0], "f0.png");
    }

    #[test]
    fn test_status_filters() {
        let mut fx = fixture();
        fx.store.set_association(&fx.files[..2], Some(fx.refs[0]), 10).unwrap();
        fx.store.set_association(&fx.files[2..3], Some(fx.refs[1]), 10).unwrap();

        let mut view = ViewState::default();
        view.set_status(StatusFilter::Associated);
        assert_eq!(filter_and_sort(&fx.store, &view).len(), 3);

        view.set_status(StatusFilter::Unassociated);
        assert_eq!(filter_and_sort(&fx.store, &view).len(), 3);

        view.focus_reference(fx.refs[1]);
        assert_eq!(names(&filter_and_sort(&fx.store, &view)), vec!["f2.png"]);
    }

    #[test]
    fn test_reference_filter_needs_associated_status() {
        let mut fx = fixture();
        fx.store.set_association(&fx.files[..1], Some(fx.refs[0]), 10).unwrap();

        let view = ViewState {
            reference: Some(fx.refs[0]),
            ..ViewState::default()
        };
        assert_eq!(view.active_reference(), None);
        assert_eq!(filter_and_sort(&fx.store, &view).len(), 6);
    }

    #[test]
    fn test_rating_filter_exact() {
        let mut fx = fixture();
        fx.store.set_rating(&fx.files[..2], Rating::new(3).unwrap());
        fx.store.set_rating(&fx.files[2..3], Rating::new(4).unwrap());

        let mut view = ViewState::default();
        view.toggle_rating(Rating::new(3).unwrap());
        assert_eq!(filter_and_sort(&fx.store, &view).len(), 2);

        view.toggle_rating(Rating::UNRATED);
        assert_eq!(filter_and_sort(&fx.store, &view).len(), 3);

        view.toggle_rating(Rating::UNRATED);
        assert_eq!(view.rating, None);
    }

    #[test]
    fn test_custom_order_first_then_date() {
        let mut fx = fixture();
        let r = fx.refs[0];
        fx.store.set_association(&fx.files[..4], Some(r), 0).unwrap();
        fx.store.reorder_within_reference(r, vec![fx.files[1], fx.files[0]]);

        let mut view = ViewState::default();
        view.focus_reference(r);
        let shown: Vec<FileId> = filter_and_sort(&fx.store, &view).iter().map(|f| f.id).collect();

        assert_eq!(&shown[..2], &[fx.files[1], fx.files[0]]);
        assert_eq!(shown.len(), 4);
    }

    #[test]
    fn test_custom_order_inert_outside_reference_view() {
        let mut fx = fixture();
        let r = fx.refs[0];
        fx.store.set_association(&fx.files[..2], Some(r), 0).unwrap();
        fx.store.reorder_within_reference(r, vec![fx.files[1], fx.files[0]]);

        let mut view = ViewState::default();
        view.set_status(StatusFilter::Associated);
        let shown: Vec<FileId> = filter_and_sort(&fx.store, &view).iter().map(|f| f.id).collect();
        // Equal timestamps fall back to name
        assert_eq!(shown, vec![fx.files[0], fx.files[1]]);

        view.toggle_sort_order();
        let shown: Vec<FileId> = filter_and_sort(&fx.store, &view).iter().map(|f| f.id).collect();
        assert_eq!(shown, vec![fx.files[0], fx.files[1]]);
    }

    #[test]
    fn test_grouping_follows_reference_creation_order() {
        let mut fx = fixture();
        fx.store.set_association(&fx.files[..1], Some(fx.refs[1]), 1).unwrap();
        fx.store.set_association(&fx.files[1..2], Some(fx.refs[0]), 2).unwrap();

        let view = ViewState::default();
        let groups = project(&fx.store, &view);

        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].reference.unwrap().id, fx.refs[0]);
        assert_eq!(groups[1].reference.unwrap().id, fx.refs[1]);
        assert!(groups[2].is_unassociated());
        assert_eq!(groups[2].files.len(), 4);
    }

    #[test]
    fn test_grouping_omits_empty_and_filtered_groups() {
        let mut fx = fixture();
        fx.store.set_association(&fx.files[..1], Some(fx.refs[0]), 1).unwrap();

        let mut view = ViewState::default();
        view.set_status(StatusFilter::Associated);
        let groups = project(&fx.store, &view);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].reference.unwrap().id, fx.refs[0]);

        view.set_status(StatusFilter::Unassociated);
        let groups = project(&fx.store, &view);
        assert_eq!(groups.len(), 1);
        assert!(groups[0].is_unassociated());
    }

    #[test]
    fn test_single_reference_projection() {
        let mut fx = fixture();
        fx.store.set_association(&fx.files[..2], Some(fx.refs[0]), 1).unwrap();

        let mut view = ViewState::default();
        view.focus_reference(fx.refs[0]);
        let groups = project(&fx.store, &view);
        assert_eq!(groups.len(), 1);
        assert_eq!(visible_ids(&groups).len(), 2);

        view.focus_reference(fx.refs[1]);
        assert!(project(&fx.store, &view).is_empty());
    }

    #[test]
    fn test_reference_preview() {
        let mut fx = fixture();
        let r = fx.refs[0];
        assert!(reference_preview(&fx.store, r).is_none());

        fx.store.set_association(&fx.files[..3], Some(r), 7).unwrap();
        fx.store.reorder_within_reference(r, vec![fx.files[2], fx.files[0], fx.files[1]]);
        assert_eq!(reference_preview(&fx.store, r).unwrap().id, fx.files[2]);

        fx.store.reorder_within_reference(r, vec![]);
        assert!(reference_preview(&fx.store, r).is_some());
    }

    #[test]
    fn test_counts_and_common_rating() {
        let mut fx = fixture();
        fx.store.set_association(&fx.files[..2], Some(fx.refs[0]), 1).unwrap();
        assert_eq!(reference_counts(&fx.store).get(&fx.refs[0]), Some(&2));

        fx.store.set_rating(&fx.files[..2], Rating::new(2).unwrap());
        assert_eq!(common_rating(&fx.store, &fx.files[..2]), Some(Rating::new(2).unwrap()));
        assert_eq!(common_rating(&fx.store, &fx.files[..3]), None);
        assert_eq!(common_rating(&fx.store, std::iter::empty()), None);
    }
}
