//! Per-category reference lists.
//!
//! Two disciplines:
//! - [`IdentityList`]: keyed by instance number; a reference can be found again
//!   by its number and a later insert with the same number replaces it.
//! - [`StackList`]: no identity; duplicates are separate entries, iterated in
//!   insertion order.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use worldcell_common::RefNum;
use worldcell_records::{Record, ReferenceSite, TemplateSource};

use crate::{Category, LiveRef, LiveRefVisitor, ResolutionError};

fn resolve<'a, T, S>(site: &ReferenceSite, source: &'a S) -> Result<&'a T, ResolutionError>
where
    T: Record,
    S: TemplateSource<T> + ?Sized,
{
    source.find(&site.ref_id).ok_or_else(|| ResolutionError {
        id: site.ref_id.clone(),
        kind: T::KIND,
    })
}

/// References with a stable per-cell identity, ordered by instance number.
#[derive(Debug)]
pub struct IdentityList<'a, T> {
    list: BTreeMap<RefNum, LiveRef<'a, T>>,
}

impl<T> Default for IdentityList<'_, T> {
    fn default() -> Self {
        Self {
            list: BTreeMap::new(),
        }
    }
}

impl<'a, T: Record> IdentityList<'a, T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the site's template in `source` and insert a live reference for it.
    pub fn resolve_and_insert<S>(
        &mut self,
        site: ReferenceSite,
        source: &'a S,
    ) -> Result<&mut LiveRef<'a, T>, ResolutionError>
    where
        S: TemplateSource<T> + ?Sized,
    {
        let base = resolve(&site, source)?;
        Ok(self.insert(LiveRef::new(site, base)))
    }

    /// Insert keyed by instance number, replacing any reference already holding it.
    pub fn insert(&mut self, live: LiveRef<'a, T>) -> &mut LiveRef<'a, T> {
        match self.list.entry(live.site().refnum) {
            Entry::Occupied(mut entry) => {
                entry.insert(live);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(live),
        }
    }

    /// First live reference whose identifier equals `name` exactly.
    pub fn find_by_name(&self, name: &str) -> Option<&LiveRef<'a, T>> {
        self.list
            .values()
            .find(|r| r.data().is_live() && r.site().ref_id == name)
    }

    pub fn find_by_name_mut(&mut self, name: &str) -> Option<&mut LiveRef<'a, T>> {
        self.list
            .values_mut()
            .find(|r| r.data().is_live() && r.site().ref_id == name)
    }

    pub fn get(&self, refnum: RefNum) -> Option<&LiveRef<'a, T>> {
        self.list.get(&refnum)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LiveRef<'a, T>> {
        self.list.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut LiveRef<'a, T>> {
        self.list.values_mut()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

/// Anonymous, stackable references in insertion order.
#[derive(Debug)]
pub struct StackList<'a, T> {
    list: Vec<LiveRef<'a, T>>,
}

impl<T> Default for StackList<'_, T> {
    fn default() -> Self {
        Self { list: Vec::new() }
    }
}

impl<'a, T: Record> StackList<'a, T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the site's template in `source` and append a live reference for it.
    pub fn resolve_and_insert<S>(
        &mut self,
        site: ReferenceSite,
        source: &'a S,
    ) -> Result<&mut LiveRef<'a, T>, ResolutionError>
    where
        S: TemplateSource<T> + ?Sized,
    {
        let base = resolve(&site, source)?;
        Ok(self.insert(LiveRef::new(site, base)))
    }

    /// Append unconditionally.
    pub fn insert(&mut self, live: LiveRef<'a, T>) -> &mut LiveRef<'a, T> {
        let index = self.list.len();
        self.list.push(live);
        &mut self.list[index]
    }

    /// First live reference whose identifier equals `name` exactly.
    pub fn find_by_name(&self, name: &str) -> Option<&LiveRef<'a, T>> {
        self.list
            .iter()
            .find(|r| r.data().is_live() && r.site().ref_id == name)
    }

    pub fn find_by_name_mut(&mut self, name: &str) -> Option<&mut LiveRef<'a, T>> {
        self.list
            .iter_mut()
            .find(|r| r.data().is_live() && r.site().ref_id == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LiveRef<'a, T>> {
        self.list.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut LiveRef<'a, T>> {
        self.list.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

/// Everything of one category in a cell: statically placed references plus
/// stacked ones added at runtime.
#[derive(Debug)]
pub struct CategoryRefs<'a, T> {
    pub placed: IdentityList<'a, T>,
    pub stacked: StackList<'a, T>,
}

impl<T> Default for CategoryRefs<'_, T> {
    fn default() -> Self {
        Self {
            placed: IdentityList::default(),
            stacked: StackList::default(),
        }
    }
}

impl<'a, T: Record> CategoryRefs<'a, T> {
    /// Resolve a statically placed reference into the identity list.
    pub fn resolve_and_insert<S>(
        &mut self,
        site: ReferenceSite,
        source: &'a S,
    ) -> Result<&mut LiveRef<'a, T>, ResolutionError>
    where
        S: TemplateSource<T> + ?Sized,
    {
        self.placed.resolve_and_insert(site, source)
    }

    pub fn insert_stacked(&mut self, live: LiveRef<'a, T>) -> &mut LiveRef<'a, T> {
        self.stacked.insert(live)
    }

    /// Placed references are searched before stacked ones.
    pub fn find_by_name(&self, name: &str) -> Option<&LiveRef<'a, T>> {
        self.placed
            .find_by_name(name)
            .or_else(|| self.stacked.find_by_name(name))
    }

    pub fn len(&self) -> usize {
        self.placed.len() + self.stacked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placed.is_empty() && self.stacked.is_empty()
    }

    /// Visit placed then stacked references. Returns false if the visitor stopped early.
    pub(crate) fn visit<V: LiveRefVisitor>(
        &mut self,
        category: Category,
        visitor: &mut V,
    ) -> bool {
        self.placed
            .iter_mut()
            .chain(self.stacked.iter_mut())
            .all(|live| visitor.visit(category, live))
    }
}
