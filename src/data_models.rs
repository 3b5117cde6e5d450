use serde::Deserialize;
use serde_json::Value;

/// A page matched by the documentation search, ready for a detail fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub id: String,
    pub title: String,
}

/// Title and body of one matched page, in the form it enters the context blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContent {
    pub title: String,
    pub body: String,
}

impl PageContent {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> PageContent {
        PageContent {
            title: title.into(),
            body: body.into(),
        }
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<SearchEntry>,
}

/// One entry of `/rest/api/search`. Content hits carry their id and title under
/// `content`; other endpoints return them directly on the entry.
#[derive(Deserialize, Debug, Default)]
pub struct SearchEntry {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<ContentRef>,
}

#[derive(Deserialize, Debug, Default)]
pub struct ContentRef {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub title: Option<String>,
}

impl SearchEntry {
    /// Returns `None` when the entry has no usable id.
    pub fn into_result(self) -> Option<SearchResult> {
        let (nested_id, nested_title) = match self.content {
            Some(content) => (content.id, content.title),
            None => (None, None),
        };

        let id = nested_id
            .as_ref()
            .and_then(id_to_string)
            .or_else(|| self.id.as_ref().and_then(id_to_string))?;
        let title = nested_title.or(self.title).unwrap_or_default();

        Some(SearchResult { id, title })
    }
}

fn id_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// `/rest/api/content/{id}?expand=body.storage`
#[derive(Deserialize, Debug, Default)]
pub struct ContentDetail {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<ContentBody>,
}

#[derive(Deserialize, Debug, Default)]
pub struct ContentBody {
    #[serde(default)]
    pub storage: Option<StorageBody>,
}

#[derive(Deserialize, Debug, Default)]
pub struct StorageBody {
    #[serde(default)]
    pub value: Option<String>,
}

impl ContentDetail {
    pub fn storage_value(self) -> String {
        self.body
            .and_then(|b| b.storage)
            .and_then(|s| s.value)
            .unwrap_or_default()
    }
}
