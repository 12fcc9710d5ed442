//! Linked-step propagation.
//!
//! Once per block, each linkable family is compared against the normalized
//! values seen on the previous pass. An edit on a linked step is copied to
//! every other linked step. The pass runs in ascending step order, so when
//! several linked steps were edited in the same block the highest-indexed
//! edit is the one left standing. The cache is refreshed from the store after
//! the pass, which keeps propagated writes from being seen as new edits.
//!
//! The cache belongs to the audio context; nothing else touches it. Writes go
//! through the store's audio path and never wake an observer.

use crate::params::{MAX_STEPS, ParamHandles, ParamStore, StepParam};

const FAMILIES: usize = StepParam::LINKABLE.len();

#[derive(Debug, Clone)]
pub struct LinkPropagator {
    last: [[f32; MAX_STEPS]; FAMILIES],
    epsilon: f32,
}

impl LinkPropagator {
    pub fn new(epsilon: f32) -> Self {
        LinkPropagator {
            last: [[0.0; MAX_STEPS]; FAMILIES],
            epsilon,
        }
    }

    /// Seed the cache so current values are not treated as edits.
    pub fn prime(&mut self, store: &ParamStore, handles: &ParamHandles) {
        for (slot, family) in StepParam::LINKABLE.into_iter().enumerate() {
            let indices = handles.family(family);
            for (cached, &index) in self.last[slot].iter_mut().zip(indices) {
                *cached = store.normalized(index);
            }
        }
    }

    /// Run one pass over every family. Returns the number of cells rewritten.
    pub fn propagate(&mut self, store: &ParamStore, handles: &ParamHandles) -> usize {
        let mut linked = [false; MAX_STEPS];
        for (step, flag) in linked.iter_mut().enumerate() {
            *flag = handles.is_linked(store, step);
        }

        let mut writes = 0;
        for (slot, family) in StepParam::LINKABLE.into_iter().enumerate() {
            writes += self.propagate_family(slot, handles.family(family), &linked, store);
        }
        if writes > 0 {
            log::trace!(target: "gate::link", "propagated {writes} linked values");
        }
        writes
    }

    fn propagate_family(
        &mut self,
        slot: usize,
        indices: &[usize; MAX_STEPS],
        linked: &[bool; MAX_STEPS],
        store: &ParamStore,
    ) -> usize {
        let cache = &mut self.last[slot];

        let mut current = [0.0_f32; MAX_STEPS];
        let mut edited = [false; MAX_STEPS];
        for step in 0..MAX_STEPS {
            current[step] = store.normalized(indices[step]);
            edited[step] = (current[step] - cache[step]).abs() > self.epsilon;
        }

        let mut writes = 0;
        for source in 0..MAX_STEPS {
            if !(edited[source] && linked[source]) {
                continue;
            }
            let value = current[source];
            for target in 0..MAX_STEPS {
                // The source itself is included in case a lower step overwrote it
                if !linked[target] {
                    continue;
                }
                let index = indices[target];
                if (store.normalized(index) - value).abs() > self.epsilon {
                    store.set_normalized_from_audio(index, value);
                    writes += 1;
                }
            }
        }

        for step in 0..MAX_STEPS {
            cache[step] = store.normalized(indices[step]);
        }
        writes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(linked: &[usize]) -> (ParamStore, ParamHandles, LinkPropagator) {
        let store = ParamStore::default();
        let handles = ParamHandles::resolve(&store).unwrap();
        for &step in linked {
            store.set(&StepParam::Link.key(step), 1.0).unwrap();
        }
        let mut linker = LinkPropagator::new(0.0001);
        linker.prime(&store, &handles);
        (store, handles, linker)
    }

    fn level(store: &ParamStore, step: usize) -> f32 {
        store.get(&StepParam::Level.key(step)).unwrap()
    }

    #[test]
    fn edit_fans_out_to_linked_steps() {
        let (store, handles, mut linker) = setup(&[0, 1, 2]);
        store.set("LVL_1", -6.0).unwrap();
        let writes = linker.propagate(&store, &handles);
        assert_eq!(writes, 2);
        for step in [0, 1, 2] {
            assert!((level(&store, step) + 6.0).abs() < 1e-3, "step {step}: {}", level(&store, step));
        }
        assert_eq!(level(&store, 3), 0.0);
    }

    #[test]
    fn settles_after_one_pass() {
        let (store, handles, mut linker) = setup(&[0, 1, 2]);
        store.set("PAN_2", 0.5).unwrap();
        linker.propagate(&store, &handles);
        assert_eq!(linker.propagate(&store, &handles), 0);
        assert_eq!(linker.propagate(&store, &handles), 0);
    }

    #[test]
    fn unlinked_edit_stays_local() {
        let (store, handles, mut linker) = setup(&[0, 1, 2]);
        store.set("LVL_3", -12.0).unwrap();
        assert_eq!(linker.propagate(&store, &handles), 0);
        assert_eq!(level(&store, 0), 0.0);
        assert!((level(&store, 3) + 12.0).abs() < 1e-3);
    }

    #[test]
    fn later_step_wins_same_block() {
        let (store, handles, mut linker) = setup(&[0, 1, 2, 3]);
        store.set("LVL_1", -6.0).unwrap();
        store.set("LVL_3", -12.0).unwrap();
        linker.propagate(&store, &handles);
        for step in 0..4 {
            assert!((level(&store, step) + 12.0).abs() < 1e-3, "step {step}: {}", level(&store, step));
        }
        assert_eq!(linker.propagate(&store, &handles), 0);
    }

    #[test]
    fn families_are_independent() {
        let (store, handles, mut linker) = setup(&[4, 5]);
        store.set("ON_4", 0.0).unwrap();
        store.set("DUR_5", 0.25).unwrap();
        linker.propagate(&store, &handles);
        assert_eq!(store.get("ON_5").unwrap(), 0.0);
        assert!((store.get("DUR_4").unwrap() - 0.25).abs() < 1e-4);
        assert_eq!(store.get("ON_6").unwrap(), 1.0);
        assert_eq!(store.get("DUR_6").unwrap(), 1.0);
    }

    #[test]
    fn linking_alone_does_not_propagate() {
        let (store, handles, mut linker) = setup(&[0]);
        store.set("LVL_1", -20.0).unwrap();
        linker.propagate(&store, &handles);
        store.set("LINK_1", 1.0).unwrap();
        assert_eq!(linker.propagate(&store, &handles), 0);
        assert_eq!(level(&store, 0), 0.0);
    }

    #[test]
    fn propagated_writes_are_deferred_to_publish() {
        let (store, handles, mut linker) = setup(&[0, 1, 2]);
        let rx = store.changes();
        store.set("LVL_1", -6.0).unwrap();
        assert_eq!(rx.try_iter().count(), 1);

        assert_eq!(linker.propagate(&store, &handles), 2);
        assert_eq!(rx.try_iter().count(), 0);

        assert_eq!(store.publish_pending(), 2);
        let steps: Vec<usize> = rx
            .try_iter()
            .map(|c| handles.family(StepParam::Level).iter().position(|&i| i == c.index).unwrap())
            .collect();
        assert_eq!(steps, vec![0, 2]);
    }

    #[test]
    fn sub_epsilon_noise_is_ignored() {
        let (store, handles, mut linker) = setup(&[0, 1]);
        let idx = handles.step(StepParam::Duration, 0);
        let n = store.normalized(idx);
        // Duration snaps to 0.01, so this lands back on the same value
        store.set_normalized(idx, n - 0.00001);
        assert_eq!(linker.propagate(&store, &handles), 0);
    }
}
