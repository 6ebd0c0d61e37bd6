use serde::Serialize;
use std::collections::BTreeMap;

use crate::gerrit::OwnersResult;
use crate::owners::{GroupType, OwnerSet};
use crate::review_state::ReviewContext;

/// Files sharing one owner-set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnerGroup {
    /// First file (in sorted order) of the group, used as its display key.
    pub key_file: String,
    pub owners: OwnerSet,
    pub group_type: GroupType,
    pub files: Vec<String>,
}

impl OwnerGroup {
    fn new(key_file: &str, owners: OwnerSet, group_type: GroupType) -> Self {
        Self {
            key_file: key_file.to_string(),
            owners,
            group_type,
            files: vec![key_file.to_string()],
        }
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

/// Groups of one change, split into sections by group type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroupedFiles {
    sections: BTreeMap<GroupType, Vec<OwnerGroup>>,
}

impl GroupedFiles {
    /// Groups of one type, sorted by key file.
    pub fn section(&self, group_type: GroupType) -> &[OwnerGroup] {
        self.sections
            .get(&group_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Non-empty sections in display order.
    pub fn sections(&self) -> impl Iterator<Item = (GroupType, &[OwnerGroup])> {
        GroupType::ALL
            .into_iter()
            .map(|group_type| (group_type, self.section(group_type)))
            .filter(|(_, groups)| !groups.is_empty())
    }

    pub fn groups(&self) -> impl Iterator<Item = &OwnerGroup> {
        self.sections.values().flatten()
    }

    pub fn file_count(&self) -> usize {
        self.groups().map(OwnerGroup::file_count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// True when no file still needs an owner reviewer or an owner vote.
    pub fn all_approved(&self) -> bool {
        self.groups().all(|group| !group.group_type.is_blocking())
    }
}

/// Partitions the changed files into owner groups.
///
/// Files are visited in sorted order so the key of every group is its
/// smallest file. Files missing from `file2owners` or listed without any
/// owner are collected into one `HAS_NO_OWNER` group of their own, even when
/// a listed file has only `*`.
pub fn group_files(result: &OwnersResult, ctx: &ReviewContext) -> GroupedFiles {
    let mut by_owners: BTreeMap<String, OwnerGroup> = BTreeMap::new();
    let mut unowned: Option<OwnerGroup> = None;

    for file in result.all_files() {
        let owners = result
            .file2owners
            .get(&file)
            .map(|owners| OwnerSet::new(owners.iter().cloned()))
            .filter(|owners| !owners.is_empty());
        match owners {
            Some(owners) => match by_owners.get_mut(&owners.key()) {
                Some(group) => group.files.push(file),
                None => {
                    let group_type = owners.classify(ctx);
                    log::debug!("{} starts {} group '{}'", file, group_type, owners);
                    by_owners.insert(owners.key(), OwnerGroup::new(&file, owners, group_type));
                }
            },
            None => match unowned.as_mut() {
                Some(group) => group.files.push(file),
                None => {
                    unowned = Some(OwnerGroup::new(
                        &file,
                        OwnerSet::default(),
                        GroupType::HasNoOwner,
                    ))
                }
            },
        }
    }

    let mut sections: BTreeMap<GroupType, Vec<OwnerGroup>> = BTreeMap::new();
    for group in by_owners.into_values().chain(unowned) {
        sections.entry(group.group_type).or_default().push(group);
    }
    for groups in sections.values_mut() {
        groups.sort_by(|a, b| a.key_file.cmp(&b.key_file));
    }

    GroupedFiles { sections }
}
