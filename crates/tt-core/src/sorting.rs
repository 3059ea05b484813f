//! Shared ordering used by every list-rendering command.

use std::{
    cmp::Ordering,
    sync::{PoisonError, RwLock},
};

use crate::manager::types::Torrent;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortField {
    #[default]
    Id,
    Name,
    Age,
    Size,
    Progress,
    DownloadRate,
    UploadRate,
    Downloaded,
    Uploaded,
    Ratio,
}

impl SortField {
    pub const ALL: [SortField; 10] = [
        SortField::Id,
        SortField::Name,
        SortField::Age,
        SortField::Size,
        SortField::Progress,
        SortField::DownloadRate,
        SortField::UploadRate,
        SortField::Downloaded,
        SortField::Uploaded,
        SortField::Ratio,
    ];

    /// Name used by the `sort` command.
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Age => "age",
            Self::Size => "size",
            Self::Progress => "progress",
            Self::DownloadRate => "downspeed",
            Self::UploadRate => "upspeed",
            Self::Downloaded => "download",
            Self::Uploaded => "upload",
            Self::Ratio => "ratio",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase();
        Self::ALL.into_iter().find(|f| f.keyword() == s)
    }

    fn compare(self, a: &Torrent, b: &Torrent) -> Ordering {
        match self {
            Self::Id => a.id.cmp(&b.id),
            Self::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            Self::Age => a.added_date.cmp(&b.added_date),
            Self::Size => a.size_when_done.cmp(&b.size_when_done),
            Self::Progress => a.percent_done.total_cmp(&b.percent_done),
            Self::DownloadRate => a.rate_download.cmp(&b.rate_download),
            Self::UploadRate => a.rate_upload.cmp(&b.rate_upload),
            Self::Downloaded => a.downloaded_ever.cmp(&b.downloaded_ever),
            Self::Uploaded => a.uploaded_ever.cmp(&b.uploaded_ever),
            Self::Ratio => a.upload_ratio.total_cmp(&b.upload_ratio),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SortOrder {
    pub field: SortField,
    pub reversed: bool,
}

impl SortOrder {
    pub fn new(field: SortField, reversed: bool) -> Self {
        Self { field, reversed }
    }

    /// Stable sort: items that compare equal keep their incoming order in
    /// both directions.
    pub fn sort(self, items: &mut [Torrent]) {
        items.sort_by(|a, b| {
            let ord = self.field.compare(a, b);
            if self.reversed {
                ord.reverse()
            } else {
                ord
            }
        });
    }
}

/// Process-wide current order.
///
/// Shared by every chat: a `sort` issued anywhere changes what every
/// subsequent listing shows.
#[derive(Debug, Default)]
pub struct SortState {
    inner: RwLock<SortOrder>,
}

impl SortState {
    pub fn new(order: SortOrder) -> Self {
        Self {
            inner: RwLock::new(order),
        }
    }

    pub fn set(&self, order: SortOrder) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = order;
    }

    pub fn current(&self) -> SortOrder {
        *self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }
}
