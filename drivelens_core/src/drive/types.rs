use serde::{Deserialize, Serialize};

/// Snapshot of one Drive file as returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    /// Byte size; Docs/Sheets/Slides report none.
    #[serde(rename = "size", skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_view_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListPage {
    pub items: Vec<FileRecord>,
    pub requested_offset: u32,
    pub requested_limit: u32,
    pub total_returned: usize,
}

impl ListPage {
    pub fn new(items: Vec<FileRecord>, offset: u32, limit: u32) -> Self {
        let total_returned = items.len();
        Self {
            items,
            requested_offset: offset,
            requested_limit: limit,
            total_returned,
        }
    }

    /// Shape returned to the tool layer: `{data, count, offset, limit}`.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "data": self.items,
            "count": self.total_returned,
            "offset": self.requested_offset,
            "limit": self.requested_limit,
        })
    }
}

/// `files` resource as it comes off the wire. Every field is optional and
/// `size` is a decimal string.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireFile {
    pub id: Option<String>,
    pub name: Option<String>,
    pub mime_type: Option<String>,
    pub size: Option<String>,
    pub web_view_link: Option<String>,
    pub created_time: Option<String>,
    pub modified_time: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireFileList {
    #[serde(default)]
    pub files: Vec<WireFile>,
    pub next_page_token: Option<String>,
}

impl WireFile {
    /// Records without an id or a name are dropped.
    pub(crate) fn into_record(self) -> Option<FileRecord> {
        let id = self.id.filter(|s| !s.trim().is_empty())?;
        let name = self.name.filter(|s| !s.trim().is_empty())?;
        Some(FileRecord {
            id,
            name,
            mime_type: self.mime_type.unwrap_or_default(),
            size_bytes: self.size.and_then(|s| s.trim().parse::<u64>().ok()),
            web_view_link: self.web_view_link,
            created_time: self.created_time,
            modified_time: self.modified_time,
        })
    }
}

impl WireFileList {
    pub(crate) fn into_records(self) -> Vec<FileRecord> {
        self.files
            .into_iter()
            .filter_map(WireFile::into_record)
            .collect()
    }
}
