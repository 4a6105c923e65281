//! Usage: Source-tenant library documents: paginated listing, removal, and the deletion sweep.

use crate::domain::console_log::ConsoleLog;
use crate::domain::tenants::LibraryDocument;
use crate::gateway::transport::{request_json, request_no_content, HttpRequestConfig, HttpTransport};
use crate::shared::error::AppResult;
use reqwest::Url;
use serde::Deserialize;

pub const PAGE_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LibraryDocumentsPage {
    #[serde(default)]
    library_document_list: Vec<LibraryDocument>,
    #[serde(default)]
    page: PageInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    next_cursor: Option<String>,
}

/// Bounds on how many documents have been loaded after `page` pages; the exact total is only
/// known once the last page arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingProgress {
    pub page: u32,
    pub loaded_more_than: usize,
    pub loaded_at_most: usize,
}

impl ListingProgress {
    fn after_page(page: u32) -> Self {
        let page_usize = page as usize;
        Self {
            page,
            loaded_more_than: (page_usize - 1) * PAGE_SIZE,
            loaded_at_most: page_usize * PAGE_SIZE,
        }
    }

    pub fn message(&self) -> String {
        format!(
            "Loaded more than {} and at most {} templates from the source account.",
            self.loaded_more_than, self.loaded_at_most
        )
    }
}

fn join_api_path(api_base: &str, segments: &[&str]) -> AppResult<Url> {
    let mut url = Url::parse(api_base.trim())
        .map_err(|e| format!("SEC_INVALID_INPUT: invalid api base uri {api_base}: {e}"))?;
    url.path_segments_mut()
        .map_err(|_| format!("SEC_INVALID_INPUT: api base uri cannot carry a path: {api_base}"))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn page_url(api_base: &str, cursor: Option<&str>) -> AppResult<String> {
    let mut url = join_api_path(api_base, &["libraryDocuments"])?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("pageSize", &PAGE_SIZE.to_string());
        if let Some(cursor) = cursor {
            query.append_pair("cursor", cursor);
        }
    }
    Ok(url.to_string())
}

/// Walks every page of the source library (or the first `dev_page_limit` pages).
///
/// The owner filter is applied to each page after it is fetched, so the page cap counts pages,
/// not retained documents. A failed page aborts the walk; nothing partial is returned.
pub async fn list_documents(
    transport: &dyn HttpTransport,
    api_base: &str,
    access_token: &str,
    owner_filter: &str,
    dev_page_limit: Option<u32>,
    on_progress: &mut (dyn FnMut(ListingProgress) + Send),
) -> AppResult<Vec<LibraryDocument>> {
    let owner_filter = owner_filter.trim();
    let mut documents: Vec<LibraryDocument> = Vec::new();
    let mut cursor: Option<String> = None;
    let mut page: u32 = 0;

    loop {
        page += 1;
        let url = page_url(api_base, cursor.as_deref())?;
        let response: LibraryDocumentsPage =
            request_json(transport, HttpRequestConfig::get(url).bearer(access_token)).await?;

        let fetched = response.library_document_list.len();
        if owner_filter.is_empty() {
            documents.extend(response.library_document_list);
        } else {
            documents.extend(
                response
                    .library_document_list
                    .into_iter()
                    .filter(|doc| doc.owner_email == owner_filter),
            );
        }
        tracing::debug!(page, fetched, retained = documents.len(), "library page loaded");

        let next_cursor = response
            .page
            .next_cursor
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        let done = match next_cursor {
            Some(next) => {
                cursor = Some(next);
                dev_page_limit.is_some_and(|limit| page >= limit)
            }
            None => true,
        };

        on_progress(ListingProgress::after_page(page));
        if done {
            break;
        }
    }

    Ok(documents)
}

/// Marks one library document as removed on the source tenant.
pub async fn remove_document(
    transport: &dyn HttpTransport,
    api_base: &str,
    access_token: &str,
    document_id: &str,
) -> AppResult<()> {
    let url = join_api_path(api_base, &["libraryDocuments", document_id.trim(), "state"])?;
    request_no_content(
        transport,
        HttpRequestConfig::put(url.to_string())
            .bearer(access_token)
            .json(serde_json::json!({ "state": "REMOVED" })),
    )
    .await
}

/// `list_documents` with progress and completion mirrored to the console log.
pub async fn load_library(
    transport: &dyn HttpTransport,
    api_base: &str,
    access_token: &str,
    owner_filter: &str,
    dev_page_limit: Option<u32>,
    log: &mut ConsoleLog,
) -> AppResult<Vec<LibraryDocument>> {
    let documents = {
        let mut on_progress = |progress: ListingProgress| log.log(progress.message());
        list_documents(
            transport,
            api_base,
            access_token,
            owner_filter,
            dev_page_limit,
            &mut on_progress,
        )
        .await?
    };
    log.log(format!(
        "Done loading. Loaded {} templates from the source account.",
        documents.len()
    ));
    Ok(documents)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub removed: Vec<String>,
    pub failed: Vec<String>,
    /// Latest complete listing; `None` if no refresh after a delete succeeded.
    pub listing: Option<Vec<LibraryDocument>>,
}

/// Removes each selected document in turn, re-listing the whole library (no owner filter)
/// after every delete. Nothing here is retried and no failure stops the sweep.
pub async fn deletion_sweep(
    transport: &dyn HttpTransport,
    api_base: &str,
    access_token: &str,
    document_ids: &[String],
    dev_page_limit: Option<u32>,
    log: &mut ConsoleLog,
) -> SweepReport {
    let total = document_ids.len();
    let mut report = SweepReport::default();

    for (idx, document_id) in document_ids.iter().enumerate() {
        let k = idx + 1;
        tracing::info!(
            document = k,
            total,
            document_id = %document_id,
            "deleting library document"
        );
        match remove_document(transport, api_base, access_token, document_id).await {
            Ok(()) => report.removed.push(document_id.clone()),
            Err(err) => {
                // An id that is already gone fails here; the next listing shows the real state.
                tracing::warn!(document_id = %document_id, "document removal failed: {}", err);
                report.failed.push(document_id.clone());
            }
        }

        match load_library(transport, api_base, access_token, "", dev_page_limit, log).await {
            Ok(documents) => report.listing = Some(documents),
            Err(err) => {
                tracing::warn!("library refresh after delete failed: {}", err);
                log.log(format!(
                    "Could not refresh the document list after deleting document {k}: {}",
                    err.message()
                ));
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_bounds_widen_per_page() {
        assert_eq!(
            ListingProgress::after_page(1),
            ListingProgress {
                page: 1,
                loaded_more_than: 0,
                loaded_at_most: 100
            }
        );
        assert_eq!(
            ListingProgress::after_page(3).message(),
            "Loaded more than 200 and at most 300 templates from the source account."
        );
    }

    #[test]
    fn page_url_encodes_cursor() {
        let url = page_url("https://api.na1.adobesign.com/api/rest/v6", Some("a+b/c=="))
            .expect("url");
        assert_eq!(
            url,
            "https://api.na1.adobesign.com/api/rest/v6/libraryDocuments?pageSize=100&cursor=a%2Bb%2Fc%3D%3D"
        );
        let first = page_url("http://localhost:4200/commercial-api/", None).expect("url");
        assert_eq!(
            first,
            "http://localhost:4200/commercial-api/libraryDocuments?pageSize=100"
        );
    }

    #[test]
    fn page_body_tolerates_missing_fields() {
        let page: LibraryDocumentsPage = serde_json::from_str(r#"{"libraryDocumentList":[]}"#)
            .expect("decode");
        assert!(page.page.next_cursor.is_none());
        let page: LibraryDocumentsPage = serde_json::from_str(
            r#"{"libraryDocumentList":[{"id":"1","name":"a"}],"page":{"nextCursor":"c1"}}"#,
        )
        .expect("decode");
        assert_eq!(page.library_document_list.len(), 1);
        assert_eq!(page.page.next_cursor.as_deref(), Some("c1"));
    }

    #[test]
    fn state_path_escapes_document_id() {
        let url = join_api_path(
            "https://api.na1.adobesign.com/api/rest/v6",
            &["libraryDocuments", "id with space", "state"],
        )
        .expect("url");
        assert_eq!(
            url.as_str(),
            "https://api.na1.adobesign.com/api/rest/v6/libraryDocuments/id%20with%20space/state"
        );
    }
}
