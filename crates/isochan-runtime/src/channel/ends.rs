//! Per-context end associations.
//!
//! Each channel records which contexts have used its send end and its
//! receive end. A record starts `Open`, becomes `Released` when the
//! context lets go of the end, and `Closed` when the channel is closed or
//! the context is torn down.
//!
//! | From | Event | To |
//! |------|-------|----|
//! | (none) | send / recv | `Open` |
//! | (none) | release | `Released` |
//! | `Open` | release | `Released` |
//! | `Released` | send / recv | `Open` |
//! | any | close, teardown | `Closed` |
//! | `Closed` | send / recv | error |

use super::info::{Association, EndsSummary};
use isochan_types::{ChannelEnd, ContextId};

/// State of one context's association with one end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndState {
    Open,
    Released,
    Closed,
}

#[derive(Debug, Clone, Copy)]
struct EndRecord {
    context: ContextId,
    state: EndState,
}

/// The context's end was closed and cannot be used again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndClosed;

#[derive(Debug, Default)]
struct Side {
    records: Vec<EndRecord>,
    num_open: usize,
}

impl Side {
    fn find(&self, ctx: ContextId) -> Option<&EndRecord> {
        self.records.iter().find(|r| r.context == ctx)
    }

    fn find_mut(&mut self, ctx: ContextId) -> Option<&mut EndRecord> {
        self.records.iter_mut().find(|r| r.context == ctx)
    }

    fn associate(&mut self, ctx: ContextId) -> Result<(), EndClosed> {
        match self.find_mut(ctx) {
            Some(record) => match record.state {
                EndState::Open => Ok(()),
                EndState::Released => {
                    record.state = EndState::Open;
                    self.num_open += 1;
                    Ok(())
                }
                EndState::Closed => Err(EndClosed),
            },
            None => {
                self.records.push(EndRecord {
                    context: ctx,
                    state: EndState::Open,
                });
                self.num_open += 1;
                Ok(())
            }
        }
    }

    fn set_state(&mut self, ctx: ContextId, state: EndState, create: bool) {
        match self.find_mut(ctx) {
            Some(record) => {
                if record.state == EndState::Closed {
                    return;
                }
                let was_open = record.state == EndState::Open;
                record.state = state;
                if was_open {
                    self.num_open -= 1;
                }
            }
            None if create => self.records.push(EndRecord {
                context: ctx,
                state,
            }),
            None => {}
        }
    }

    fn close_all(&mut self) {
        for record in &mut self.records {
            record.state = EndState::Closed;
        }
        self.num_open = 0;
    }

    fn state_of(&self, ctx: ContextId) -> Option<EndState> {
        self.find(ctx).map(|r| r.state)
    }

    fn open_contexts(&self) -> impl Iterator<Item = ContextId> + '_ {
        self.records
            .iter()
            .filter(|r| r.state == EndState::Open)
            .map(|r| r.context)
    }
}

/// Send and receive associations of one channel.
#[derive(Debug, Default)]
pub struct ChannelEnds {
    send: Side,
    recv: Side,
}

impl ChannelEnds {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Associates `ctx` with the selected end(s).
    ///
    /// A released association is reopened. A closed one is an error.
    pub fn associate(&mut self, ctx: ContextId, end: ChannelEnd) -> Result<(), EndClosed> {
        let closed = |side: &Side| side.state_of(ctx) == Some(EndState::Closed);
        if (end.includes_send() && closed(&self.send)) || (end.includes_recv() && closed(&self.recv)) {
            return Err(EndClosed);
        }
        if end.includes_send() {
            self.send.associate(ctx)?;
        }
        if end.includes_recv() {
            self.recv.associate(ctx)?;
        }
        Ok(())
    }

    /// Marks `ctx` as released from the selected end(s).
    ///
    /// A context that never used the end gets an already-released record,
    /// so a later check sees it as having let go.
    pub fn release_context(&mut self, ctx: ContextId, end: ChannelEnd) {
        if end.includes_send() {
            self.send.set_state(ctx, EndState::Released, true);
        }
        if end.includes_recv() {
            self.recv.set_state(ctx, EndState::Released, true);
        }
    }

    /// Closes every association on both ends.
    pub fn release_all(&mut self) {
        self.send.close_all();
        self.recv.close_all();
    }

    /// Closes the associations of a torn-down context.
    pub fn clear_context(&mut self, ctx: ContextId) {
        self.send.set_state(ctx, EndState::Closed, false);
        self.recv.set_state(ctx, EndState::Closed, false);
    }

    /// A channel stays open while any association is open, or while no
    /// context has ever been associated.
    #[must_use]
    pub fn is_open(&self) -> bool {
        if self.send.num_open > 0 || self.recv.num_open > 0 {
            return true;
        }
        self.send.records.is_empty() && self.recv.records.is_empty()
    }

    /// Returns `true` if `ctx` holds an open association with every
    /// selected end.
    #[must_use]
    pub fn is_associated(&self, ctx: ContextId, end: ChannelEnd) -> bool {
        let open = |side: &Side| side.state_of(ctx) == Some(EndState::Open);
        (!end.includes_send() || open(&self.send)) && (!end.includes_recv() || open(&self.recv))
    }

    /// Contexts with an open association on any selected end, sorted.
    #[must_use]
    pub fn open_contexts(&self, end: ChannelEnd) -> Vec<ContextId> {
        let mut contexts = Vec::new();
        if end.includes_send() {
            contexts.extend(self.send.open_contexts());
        }
        if end.includes_recv() {
            contexts.extend(self.recv.open_contexts());
        }
        contexts.sort();
        contexts.dedup();
        contexts
    }

    #[must_use]
    pub fn num_send_open(&self) -> usize {
        self.send.num_open
    }

    #[must_use]
    pub fn num_recv_open(&self) -> usize {
        self.recv.num_open
    }

    /// Counts contexts by which ends they use and whether those are still
    /// open, and reports `current`'s own association.
    #[must_use]
    pub fn summary(&self, current: ContextId) -> EndsSummary {
        let mut summary = EndsSummary {
            current_send: association(self.send.state_of(current)),
            current_recv: association(self.recv.state_of(current)),
            ..EndsSummary::default()
        };

        for record in &self.send.records {
            let send_open = record.state == EndState::Open;
            match self.recv.state_of(record.context) {
                None if send_open => summary.send_only += 1,
                None => summary.send_only_released += 1,
                Some(recv) => {
                    let recv_open = recv == EndState::Open;
                    match (send_open, recv_open) {
                        (true, true) => summary.both += 1,
                        (false, false) => summary.both_released += 1,
                        (false, true) => summary.both_send_released += 1,
                        (true, false) => summary.both_recv_released += 1,
                    }
                }
            }
        }
        for record in &self.recv.records {
            if self.send.find(record.context).is_some() {
                continue;
            }
            if record.state == EndState::Open {
                summary.recv_only += 1;
            } else {
                summary.recv_only_released += 1;
            }
        }
        summary
    }
}

fn association(state: Option<EndState>) -> Association {
    match state {
        None => Association::Never,
        Some(EndState::Open) => Association::Associated,
        Some(EndState::Released | EndState::Closed) => Association::Released,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: ContextId = ContextId::new(1);
    const B: ContextId = ContextId::new(2);

    #[test]
    fn fresh_ends_are_open() {
        let ends = ChannelEnds::new();
        assert!(ends.is_open());
        assert_eq!(ends.num_send_open(), 0);
    }

    #[test]
    fn associate_counts_once() {
        let mut ends = ChannelEnds::new();
        ends.associate(A, ChannelEnd::Send).unwrap();
        ends.associate(A, ChannelEnd::Send).unwrap();
        ends.associate(B, ChannelEnd::Recv).unwrap();
        assert_eq!(ends.num_send_open(), 1);
        assert_eq!(ends.num_recv_open(), 1);
        assert!(ends.is_associated(A, ChannelEnd::Send));
        assert!(!ends.is_associated(A, ChannelEnd::Recv));
    }

    #[test]
    fn releasing_last_association_closes() {
        let mut ends = ChannelEnds::new();
        ends.associate(A, ChannelEnd::Send).unwrap();
        ends.associate(B, ChannelEnd::Recv).unwrap();

        ends.release_context(A, ChannelEnd::Send);
        assert!(ends.is_open());
        ends.release_context(B, ChannelEnd::Recv);
        assert!(!ends.is_open());
    }

    #[test]
    fn release_without_association_records_released() {
        let mut ends = ChannelEnds::new();
        ends.release_context(A, ChannelEnd::Both);
        assert!(!ends.is_open());
        let summary = ends.summary(A);
        assert_eq!(summary.both_released, 1);
        assert_eq!(summary.current_send, Association::Released);
    }

    #[test]
    fn released_association_can_reopen() {
        let mut ends = ChannelEnds::new();
        ends.associate(A, ChannelEnd::Send).unwrap();
        ends.release_context(A, ChannelEnd::Send);
        assert_eq!(ends.num_send_open(), 0);

        ends.associate(A, ChannelEnd::Send).unwrap();
        assert_eq!(ends.num_send_open(), 1);
    }

    #[test]
    fn closed_association_cannot_reopen() {
        let mut ends = ChannelEnds::new();
        ends.associate(A, ChannelEnd::Both).unwrap();
        ends.clear_context(A);
        assert_eq!(ends.associate(A, ChannelEnd::Recv), Err(EndClosed));
        assert!(!ends.is_open());
    }

    #[test]
    fn open_counter_drops_once_per_transition() {
        let mut ends = ChannelEnds::new();
        ends.associate(A, ChannelEnd::Both).unwrap();
        ends.associate(B, ChannelEnd::Send).unwrap();
        assert_eq!(ends.num_send_open(), 2);

        // Open -> Released, then Released -> Closed: one decrement only.
        ends.release_context(A, ChannelEnd::Send);
        assert_eq!(ends.num_send_open(), 1);
        ends.clear_context(A);
        assert_eq!(ends.num_send_open(), 1);
        assert_eq!(ends.num_recv_open(), 0);
        assert!(ends.is_open());

        ends.clear_context(B);
        assert_eq!(ends.num_send_open(), 0);
        assert!(!ends.is_open());
    }

    #[test]
    fn clear_context_ignores_unknown_context() {
        let mut ends = ChannelEnds::new();
        ends.clear_context(A);
        assert!(ends.is_open());
        assert_eq!(ends.summary(A).current_send, Association::Never);
    }

    #[test]
    fn release_all_closes_everything() {
        let mut ends = ChannelEnds::new();
        ends.associate(A, ChannelEnd::Send).unwrap();
        ends.associate(B, ChannelEnd::Recv).unwrap();
        ends.release_all();
        assert!(!ends.is_open());
        assert!(ends.open_contexts(ChannelEnd::Both).is_empty());
        assert_eq!(ends.associate(B, ChannelEnd::Recv), Err(EndClosed));
    }

    #[test]
    fn open_contexts_per_end() {
        let mut ends = ChannelEnds::new();
        ends.associate(B, ChannelEnd::Both).unwrap();
        ends.associate(A, ChannelEnd::Send).unwrap();
        assert_eq!(ends.open_contexts(ChannelEnd::Send), vec![A, B]);
        assert_eq!(ends.open_contexts(ChannelEnd::Recv), vec![B]);
        assert_eq!(ends.open_contexts(ChannelEnd::Both), vec![A, B]);
    }

    #[test]
    fn summary_categories() {
        let c = ContextId::new(3);
        let d = ContextId::new(4);
        let mut ends = ChannelEnds::new();
        ends.associate(A, ChannelEnd::Send).unwrap();
        ends.associate(B, ChannelEnd::Recv).unwrap();
        ends.associate(c, ChannelEnd::Both).unwrap();
        ends.associate(d, ChannelEnd::Both).unwrap();
        ends.release_context(d, ChannelEnd::Send);

        let summary = ends.summary(d);
        assert_eq!(summary.send_only, 1);
        assert_eq!(summary.recv_only, 1);
        assert_eq!(summary.both, 1);
        assert_eq!(summary.both_send_released, 1);
        assert_eq!(summary.current_send, Association::Released);
        assert_eq!(summary.current_recv, Association::Associated);
    }

    mod proptest_counters {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Associate(i64, ChannelEnd),
            Release(i64, ChannelEnd),
            Clear(i64),
        }

        fn end() -> impl Strategy<Value = ChannelEnd> {
            prop_oneof![
                Just(ChannelEnd::Send),
                Just(ChannelEnd::Recv),
                Just(ChannelEnd::Both)
            ]
        }

        fn op() -> impl Strategy<Value = Op> {
            prop_oneof![
                (0..4_i64, end()).prop_map(|(c, e)| Op::Associate(c, e)),
                (0..4_i64, end()).prop_map(|(c, e)| Op::Release(c, e)),
                (0..4_i64).prop_map(Op::Clear),
            ]
        }

        proptest! {
            #[test]
            fn open_counters_match_records(ops in proptest::collection::vec(op(), 0..48)) {
                let mut ends = ChannelEnds::new();
                for op in ops {
                    match op {
                        Op::Associate(c, e) => { let _ = ends.associate(ContextId::new(c), e); }
                        Op::Release(c, e) => ends.release_context(ContextId::new(c), e),
                        Op::Clear(c) => ends.clear_context(ContextId::new(c)),
                    }
                    prop_assert_eq!(ends.num_send_open(), ends.open_contexts(ChannelEnd::Send).len());
                    prop_assert_eq!(ends.num_recv_open(), ends.open_contexts(ChannelEnd::Recv).len());
                }
            }
        }
    }
}
