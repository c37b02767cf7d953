//! Identity matching for one owned collection.
//!
//! Persisted members keep their order; created members are appended in
//! incoming order. Orphans are split off so the caller can schedule their
//! subtrees for deletion.

use crate::core::{Result, SyncError};
use crate::model::{Candidate, Entity};
use std::collections::{HashMap, HashSet};

pub(crate) struct CollectionPlan<'d, M, D> {
    members: Vec<(M, &'d D)>,
    orphans: Vec<M>,
    created: usize,
}

impl<'d, M, D> CollectionPlan<'d, M, D>
where
    M: Entity + Default,
    D: Candidate,
{
    pub(crate) fn build(old: Vec<M>, incoming: &'d [D]) -> Result<Self> {
        let mut by_id: HashMap<u64, &'d D> = HashMap::new();
        let mut fresh = Vec::new();
        for candidate in incoming {
            match candidate.id().get() {
                None => fresh.push(candidate),
                Some(id) => {
                    if by_id.insert(id, candidate).is_some() {
                        return Err(SyncError::invalid(
                            "id",
                            format!("{} #{id} appears twice in one collection", D::KIND),
                        ));
                    }
                }
            }
        }

        let known: HashSet<u64> = old.iter().filter_map(|m| m.id().get()).collect();
        if let Some(stray) = by_id.keys().find(|id| !known.contains(*id)) {
            return Err(SyncError::UnknownMember(D::KIND, *stray));
        }

        let mut members = Vec::with_capacity(by_id.len() + fresh.len());
        let mut orphans = Vec::new();
        for member in old {
            match member.id().get().and_then(|id| by_id.get(&id)) {
                Some(candidate) => members.push((member, *candidate)),
                None => orphans.push(member),
            }
        }
        let created = fresh.len();
        members.extend(fresh.into_iter().map(|candidate| (M::default(), candidate)));

        Ok(Self {
            members,
            orphans,
            created,
        })
    }

    /// Whether any member was created or dropped.
    pub(crate) fn membership_changed(&self) -> bool {
        self.created > 0 || !self.orphans.is_empty()
    }

    pub(crate) fn into_parts(self) -> (Vec<(M, &'d D)>, Vec<M>) {
        (self.members, self.orphans)
    }
}
