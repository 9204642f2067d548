//! Batch grouping: partition a submission by detected source format.

use crate::descriptor::FileDescriptor;
use crate::format::Format;
use std::collections::{BTreeMap, BTreeSet};

/// Partition `files` by source format, preserving the original relative
/// order within each group.
///
/// Pure and O(n). Never drops a file: descriptors with `Format::Unknown`
/// land in their own group, which the engine then reports as unsupported
/// rather than silently omitting. The `BTreeMap` key order gives the engine
/// a stable iteration order across groups.
pub fn group_by_format(files: &[FileDescriptor]) -> BTreeMap<Format, Vec<FileDescriptor>> {
    let mut groups: BTreeMap<Format, Vec<FileDescriptor>> = BTreeMap::new();
    for file in files {
        groups.entry(file.format()).or_default().push(file.clone());
    }
    groups
}

/// Aggregate information about a submission, for listings and validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub count: usize,
    pub total_size_bytes: u64,
    pub formats: BTreeSet<Format>,
}

/// Summarise a file list: count, total byte size, set of formats present.
pub fn summarize(files: &[FileDescriptor]) -> BatchSummary {
    let mut summary = BatchSummary::default();
    for file in files {
        summary.count += 1;
        summary.total_size_bytes += file.size_bytes();
        summary.formats.insert(file.format());
    }
    summary
}
