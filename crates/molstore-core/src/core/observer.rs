/// Notification sent to entity observers after an editor recomputed
/// dependent state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityEvent {
    /// Records or bonds were added, removed or renamed.
    TopologyChanged,
    /// Atom positions or the global transform changed.
    GeometryChanged,
}

pub type ObserverCallback = Box<dyn Fn(&EntityEvent)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Ordered list of observer callbacks attached to one entity.
#[derive(Default)]
pub struct ObserverRegistry {
    next_id: u64,
    callbacks: Vec<(ObserverId, ObserverCallback)>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, callback: ObserverCallback) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.callbacks.push((id, callback));
        id
    }

    pub fn remove(&mut self, id: ObserverId) -> bool {
        let before = self.callbacks.len();
        self.callbacks.retain(|(existing, _)| *existing != id);
        self.callbacks.len() != before
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    #[inline]
    pub fn notify(&self, event: EntityEvent) {
        for (_, cb) in &self.callbacks {
            cb(&event);
        }
    }
}

impl std::fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("observers", &self.callbacks.len())
            .finish()
    }
}
