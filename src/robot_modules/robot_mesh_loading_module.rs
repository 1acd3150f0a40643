use std::cell::RefCell;
use indexmap::{IndexMap, IndexSet};
use serde::{Serialize, Deserialize};

/// Receives `(loaded meshes, total meshes, overall percent)`.
pub type LoadProgressCallback = Box<dyn FnMut(usize, usize, f64)>;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoadProgressEvent {
    pub loaded: usize,
    pub total: usize,
    pub percent: f64
}
impl LoadProgressEvent {
    pub fn as_tuple(&self) -> (usize, usize, f64) {
        (self.loaded, self.total, self.percent)
    }
}

/// Aggregates the progress of the independent mesh loads of one robot and decides when the
/// camera gets framed.
///
/// Every `apply_urdf` starts a new generation through `invalidate`.  All other entry points
/// take the generation their load started under and ignore calls from older generations, so
/// completions of a superseded robot cannot touch the counters of the current one.
///
/// Progress is queued as `LoadProgressEvent`s; the owner drains them with `take_events` and
/// hands them to a `ProgressSubscription` once it no longer borrows the module.
pub struct RobotMeshLoadingModule {
    generation: u64,
    total_meshes: usize,
    loaded_meshes: usize,
    pending_mesh_loads: usize,
    per_mesh_progress: IndexMap<usize, f64>,
    completed_meshes: IndexSet<usize>,
    has_been_framed: bool,
    events: Vec<LoadProgressEvent>
}
impl RobotMeshLoadingModule {
    pub fn new() -> Self {
        Self {
            generation: 0,
            total_meshes: 0,
            loaded_meshes: 0,
            pending_mesh_loads: 0,
            per_mesh_progress: IndexMap::new(),
            completed_meshes: IndexSet::new(),
            has_been_framed: false,
            events: vec![]
        }
    }
    /// Forgets everything about the current load, queued events included, and returns the new
    /// generation.
    pub fn invalidate(&mut self) -> u64 {
        self.generation += 1;
        self.total_meshes = 0;
        self.loaded_meshes = 0;
        self.pending_mesh_loads = 0;
        self.per_mesh_progress.clear();
        self.completed_meshes.clear();
        self.has_been_framed = false;
        self.events.clear();
        self.generation
    }
    /// Registers the meshes `0..total` of a load and queues the initial `(0, total, 0)` event.
    pub fn begin(&mut self, generation: u64, total: usize) {
        if generation != self.generation { return; }
        self.total_meshes = total;
        self.loaded_meshes = 0;
        self.pending_mesh_loads = total;
        self.per_mesh_progress = (0..total).map(|i| (i, 0.0)).collect();
        self.completed_meshes.clear();
        if total > 0 { self.queue_event(); }
    }
    pub fn on_mesh_progress(&mut self, generation: u64, mesh_id: usize, percent: f64) {
        if generation != self.generation || self.completed_meshes.contains(&mesh_id) { return; }
        let entry = match self.per_mesh_progress.get_mut(&mesh_id) { Some(e) => { e } None => { return; } };
        *entry = percent.clamp(0.0, 100.0);
        self.queue_event();
    }
    /// Marks a mesh as settled (loaded or failed).  Returns true exactly once per generation:
    /// when the last pending mesh settles and the camera has not been framed yet.
    pub fn on_mesh_complete(&mut self, generation: u64, mesh_id: usize) -> bool {
        if generation != self.generation { return false; }
        if self.completed_meshes.contains(&mesh_id) { return false; }
        match self.per_mesh_progress.get_mut(&mesh_id) {
            Some(e) => { *e = 100.0; }
            None => { return false; }
        }
        self.completed_meshes.insert(mesh_id);
        self.loaded_meshes += 1;
        self.pending_mesh_loads = self.pending_mesh_loads.saturating_sub(1);
        self.queue_event();
        self.claim_framing()
    }
    /// For robots without meshes there is nothing to wait for; framing happens right away
    /// (after the caller's deferred tick).
    pub fn should_frame_without_meshes(&mut self, generation: u64) -> bool {
        if generation != self.generation || self.total_meshes > 0 { return false; }
        self.claim_framing()
    }
    fn claim_framing(&mut self) -> bool {
        if self.pending_mesh_loads == 0 && !self.has_been_framed {
            self.has_been_framed = true;
            return true;
        }
        false
    }
    pub fn progress_percent(&self) -> f64 {
        if self.total_meshes == 0 { return 0.0; }
        self.per_mesh_progress.values().sum::<f64>() / self.total_meshes as f64
    }
    fn queue_event(&mut self) {
        let event = LoadProgressEvent { loaded: self.loaded_meshes, total: self.total_meshes, percent: self.progress_percent() };
        self.events.push(event);
    }
    /// Drains the queued events, oldest first.
    pub fn take_events(&mut self) -> Vec<LoadProgressEvent> {
        std::mem::take(&mut self.events)
    }
    pub fn generation(&self) -> u64 { self.generation }
    pub fn total_meshes(&self) -> usize { self.total_meshes }
    pub fn loaded_meshes(&self) -> usize { self.loaded_meshes }
    pub fn pending_mesh_loads(&self) -> usize { self.pending_mesh_loads }
    pub fn has_been_framed(&self) -> bool { self.has_been_framed }
}
impl Default for RobotMeshLoadingModule {
    fn default() -> Self {
        Self::new()
    }
}

/// Holds the host's progress callback.  The callback is taken out of the cell while it runs,
/// so it may replace or clear the subscription (or touch anything else) without a borrow
/// conflict.  A callback that was replaced during its own call is not put back.
#[derive(Default)]
pub struct ProgressSubscription {
    callback: Option<LoadProgressCallback>,
    version: u64
}
impl ProgressSubscription {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn set(&mut self, callback: Option<LoadProgressCallback>) {
        self.version += 1;
        self.callback = callback;
    }
    pub fn is_subscribed(&self) -> bool {
        self.callback.is_some()
    }
    /// Delivers the events one by one.  Events after an unsubscribe are dropped; events after
    /// a replacement go to the new callback.
    pub fn dispatch(cell: &RefCell<ProgressSubscription>, events: Vec<LoadProgressEvent>) {
        for event in events {
            let (mut callback, version) = {
                let mut s = cell.borrow_mut();
                match s.callback.take() {
                    Some(c) => { (c, s.version) }
                    None => { return; }
                }
            };
            callback(event.loaded, event.total, event.percent);
            let mut s = cell.borrow_mut();
            if s.version == version { s.callback = Some(callback); }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn tuples(m: &mut RobotMeshLoadingModule) -> Vec<(usize, usize, f64)> {
        m.take_events().iter().map(|e| e.as_tuple()).collect()
    }

    #[test]
    fn four_meshes_aggregate_to_full() {
        let mut m = RobotMeshLoadingModule::new();
        let gen = m.invalidate();
        m.begin(gen, 4);
        assert_eq!(tuples(&mut m), vec![(0, 4, 0.0)]);

        m.on_mesh_progress(gen, 2, 50.0);
        assert_eq!(tuples(&mut m), vec![(0, 4, 12.5)]);

        let mut framed = vec![];
        for id in [3, 0, 2, 1] { framed.push(m.on_mesh_complete(gen, id)); }
        assert_eq!(framed, vec![false, false, false, true]);

        let events = tuples(&mut m);
        let loaded: Vec<usize> = events.iter().map(|e| e.0).collect();
        assert_eq!(loaded, vec![1, 2, 3, 4]);
        assert_eq!(*events.last().unwrap(), (4, 4, 100.0));
        assert!(m.take_events().is_empty());
    }

    #[test]
    fn framing_latch_and_double_completion() {
        let mut m = RobotMeshLoadingModule::new();
        let gen = m.invalidate();
        m.begin(gen, 1);
        m.on_mesh_progress(gen, 0, 100.0);
        assert_eq!(m.loaded_meshes(), 0);
        assert!(m.on_mesh_complete(gen, 0));
        assert!(!m.on_mesh_complete(gen, 0));
        m.on_mesh_progress(gen, 0, 10.0);
        assert_eq!(m.progress_percent(), 100.0);
        assert_eq!(m.loaded_meshes(), 1);
        assert!(m.has_been_framed());
        assert_eq!(m.take_events().len(), 3);
    }

    #[test]
    fn stale_generation_is_ignored() {
        let mut m = RobotMeshLoadingModule::new();
        let old = m.invalidate();
        m.begin(old, 2);
        let new = m.invalidate();
        m.begin(new, 1);
        assert!(!m.on_mesh_complete(old, 0));
        m.on_mesh_progress(old, 0, 80.0);
        assert_eq!(m.loaded_meshes(), 0);
        assert_eq!(m.total_meshes(), 1);
        assert_eq!(tuples(&mut m), vec![(0, 1, 0.0)]);
        assert!(m.on_mesh_complete(new, 0));
    }

    #[test]
    fn no_meshes_frames_once_without_events() {
        let mut m = RobotMeshLoadingModule::new();
        let gen = m.invalidate();
        m.begin(gen, 0);
        assert!(m.take_events().is_empty());
        assert!(m.should_frame_without_meshes(gen));
        assert!(!m.should_frame_without_meshes(gen));
    }

    fn event(loaded: usize, total: usize, percent: f64) -> LoadProgressEvent {
        LoadProgressEvent { loaded, total, percent }
    }

    #[test]
    fn callback_can_unsubscribe_itself() {
        let cell = Rc::new(RefCell::new(ProgressSubscription::new()));
        let seen = Rc::new(RefCell::new(vec![]));
        let (c, s) = (cell.clone(), seen.clone());
        cell.borrow_mut().set(Some(Box::new(move |l: usize, t: usize, p: f64| {
            s.borrow_mut().push((l, t, p));
            if l == t { c.borrow_mut().set(None); }
        })));

        ProgressSubscription::dispatch(&cell, vec![event(0, 1, 0.0), event(1, 1, 100.0), event(1, 1, 100.0)]);
        assert_eq!(*seen.borrow(), vec![(0, 1, 0.0), (1, 1, 100.0)]);
        assert!(!cell.borrow().is_subscribed());
    }

    #[test]
    fn callback_replaced_mid_dispatch_hands_over() {
        let cell = Rc::new(RefCell::new(ProgressSubscription::new()));
        let first = Rc::new(RefCell::new(vec![]));
        let second = Rc::new(RefCell::new(vec![]));
        let (c, f, s2) = (cell.clone(), first.clone(), second.clone());
        cell.borrow_mut().set(Some(Box::new(move |l: usize, _t: usize, _p: f64| {
            f.borrow_mut().push(l);
            let s2 = s2.clone();
            c.borrow_mut().set(Some(Box::new(move |l: usize, _t: usize, _p: f64| s2.borrow_mut().push(l))));
        })));

        ProgressSubscription::dispatch(&cell, vec![event(0, 2, 0.0), event(1, 2, 50.0), event(2, 2, 100.0)]);
        assert_eq!(*first.borrow(), vec![0]);
        assert_eq!(*second.borrow(), vec![1, 2]);
        assert!(cell.borrow().is_subscribed());
    }
}
