use worldcell_records::ReferenceSite;

use crate::RefData;

/// A materialized reference: where it was placed, what it is, and its runtime state.
///
/// The template is borrowed from the content store and is fixed for the life of
/// the reference.
#[derive(Debug)]
pub struct LiveRef<'a, T> {
    base: &'a T,
    site: ReferenceSite,
    data: RefData,
}

impl<T> Clone for LiveRef<'_, T> {
    fn clone(&self) -> Self {
        Self {
            base: self.base,
            site: self.site.clone(),
            data: self.data.clone(),
        }
    }
}

impl<'a, T> LiveRef<'a, T> {
    pub fn new(site: ReferenceSite, base: &'a T) -> Self {
        let data = RefData::from_site(&site);
        Self { base, site, data }
    }

    /// Canonical template this reference was placed from.
    pub fn base(&self) -> &'a T {
        self.base
    }

    pub fn site(&self) -> &ReferenceSite {
        &self.site
    }

    pub fn data(&self) -> &RefData {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut RefData {
        &mut self.data
    }

    /// Site and runtime state together, for visitors.
    pub fn parts_mut(&mut self) -> (&ReferenceSite, &mut RefData) {
        (&self.site, &mut self.data)
    }
}
