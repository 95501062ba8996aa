use worldcell_common::Placement;
use worldcell_records::ReferenceSite;

/// Mutable per-instance state of a live reference.
///
/// Seeded from the reference site at load time; the site itself never changes.
#[derive(Debug, Clone, PartialEq)]
pub struct RefData {
    count: u32,
    enabled: bool,
    placement: Placement,
    scale: f32,
}

impl RefData {
    pub fn from_site(site: &ReferenceSite) -> Self {
        Self {
            count: site.count,
            enabled: true,
            placement: site.placement,
            scale: site.scale,
        }
    }

    /// Stack size. Zero means the reference has been taken or consumed.
    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn set_count(&mut self, count: u32) {
        self.count = count;
    }

    /// A reference is live while its count is non-zero.
    pub fn is_live(&self) -> bool {
        self.count > 0
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn placement(&self) -> &Placement {
        &self.placement
    }

    pub fn set_placement(&mut self, placement: Placement) {
        self.placement = placement;
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.scale = scale;
    }
}
