//! Live-event routing: recorded device + channel → destination instrument.
//!
//! ```text
//! Interactive side                     Scheduling loop
//!     │                                     │
//!     ▼                                     ▼
//! ┌──────────────┐      ArcSwap      ┌──────────────────┐
//! │ RoutingTable │─────────────────▶│ RoutingSnapshot   │
//! │  add/remove  │     commit()      │  resolve()        │
//! └──────────────┘                   └──────────────────┘
//! ```
//!
//! Resolution order: exact device+channel, then device (any channel), then
//! channel (any device), then a catch-all route, then the fallback
//! instrument. Among routes of equal specificity the first added wins.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::{ArcSwap, Guard};
use cadenza_core::{DeviceId, InstrumentId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    /// `None` = any device
    pub device: Option<DeviceId>,
    /// `None` = any channel (0-15)
    pub channel: Option<u8>,
    pub instrument: InstrumentId,
    pub enabled: bool,
}

impl Route {
    pub fn new(instrument: InstrumentId) -> Self {
        Self {
            device: None,
            channel: None,
            instrument,
            enabled: true,
        }
    }

    pub fn for_device(device: DeviceId, instrument: InstrumentId) -> Self {
        Self {
            device: Some(device),
            ..Self::new(instrument)
        }
    }

    pub fn for_channel(channel: u8, instrument: InstrumentId) -> Self {
        Self {
            channel: Some(channel),
            ..Self::new(instrument)
        }
    }

    pub fn for_device_channel(device: DeviceId, channel: u8, instrument: InstrumentId) -> Self {
        Self {
            device: Some(device),
            channel: Some(channel),
            ..Self::new(instrument)
        }
    }

    #[inline]
    pub fn matches(&self, device: DeviceId, channel: u8) -> bool {
        self.enabled
            && self.device.is_none_or(|d| d == device)
            && self.channel.is_none_or(|c| c == channel)
    }
}

/// Immutable routing view read by the scheduling loop.
#[derive(Debug, Clone, Default)]
pub struct RoutingSnapshot {
    lookup: HashMap<(Option<DeviceId>, Option<u8>), InstrumentId>,
    fallback: Option<InstrumentId>,
}

impl RoutingSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    fn from_routes(routes: &[Route], fallback: Option<InstrumentId>) -> Self {
        let mut lookup = HashMap::with_capacity(routes.len());
        for route in routes.iter().filter(|r| r.enabled) {
            lookup
                .entry((route.device, route.channel))
                .or_insert(route.instrument);
        }
        Self { lookup, fallback }
    }

    /// Destination for an event captured on `device`/`channel`.
    pub fn resolve(&self, device: DeviceId, channel: u8) -> Option<InstrumentId> {
        [
            (Some(device), Some(channel)),
            (Some(device), None),
            (None, Some(channel)),
            (None, None),
        ]
        .iter()
        .find_map(|key| self.lookup.get(key).copied())
        .or(self.fallback)
    }

    pub fn fallback(&self) -> Option<InstrumentId> {
        self.fallback
    }
}

pub struct RoutingTable {
    routes: Vec<Route>,
    fallback: Option<InstrumentId>,
    snapshot: Arc<ArcSwap<RoutingSnapshot>>,
    dirty: bool,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            fallback: None,
            snapshot: Arc::new(ArcSwap::from_pointee(RoutingSnapshot::empty())),
            dirty: false,
        }
    }

    /// Shared handle for lock-free readers.
    pub fn snapshot_arc(&self) -> Arc<ArcSwap<RoutingSnapshot>> {
        Arc::clone(&self.snapshot)
    }

    #[inline]
    pub fn load(&self) -> Guard<Arc<RoutingSnapshot>> {
        self.snapshot.load()
    }

    pub fn add(&mut self, route: Route) -> &mut Self {
        self.routes.push(route);
        self.dirty = true;
        self
    }

    pub fn fallback(&mut self, instrument: InstrumentId) -> &mut Self {
        self.fallback = Some(instrument);
        self.dirty = true;
        self
    }

    pub fn clear_fallback(&mut self) -> &mut Self {
        self.fallback = None;
        self.dirty = true;
        self
    }

    /// Drop every route targeting `instrument`, and the fallback if it
    /// points there.
    pub fn remove_instrument(&mut self, instrument: InstrumentId) -> &mut Self {
        self.routes.retain(|r| r.instrument != instrument);
        if self.fallback == Some(instrument) {
            self.fallback = None;
        }
        self.dirty = true;
        self
    }

    pub fn remove_device(&mut self, device: DeviceId) -> &mut Self {
        self.routes.retain(|r| r.device != Some(device));
        self.dirty = true;
        self
    }

    pub fn clear(&mut self) -> &mut Self {
        self.routes.clear();
        self.fallback = None;
        self.dirty = true;
        self
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Publish pending changes to readers.
    pub fn commit(&mut self) {
        if !self.dirty {
            return;
        }
        let snapshot = RoutingSnapshot::from_routes(&self.routes, self.fallback);
        self.snapshot.store(Arc::new(snapshot));
        self.dirty = false;
        tracing::debug!(
            "Committed routing table: {} routes, fallback {:?}",
            self.routes.len(),
            self.fallback
        );
    }
}

impl Default for RoutingTable {
    fn default() -> Self {
        Self::new()
    }
}
