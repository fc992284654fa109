use crossbeam_channel::{Receiver, Sender};
use log::{debug, warn};
use reqwest::blocking::Client;

use crate::state::UserRow;

/// Header carrying the total row count across all pages.
pub const TOTAL_COUNT_HEADER: &str = "x-total-count";

#[derive(Debug)]
pub enum ApiRequest {
    FetchPage {
        /// Monotonic token; responses older than the latest request are dropped.
        seq: u64,
        page_index: usize,
        page_size: usize,
    },
}

#[derive(Debug)]
pub enum ApiResponse {
    Page {
        seq: u64,
        rows: Vec<UserRow>,
        total_count: usize,
    },
    Failed {
        seq: u64,
        message: String,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server returned {0}")]
    Status(reqwest::StatusCode),
    #[error("missing or invalid x-total-count header")]
    TotalCount,
}

/// Upstream paging is 1-based; ours is 0-based.
pub fn page_url(base_url: &str, page_index: usize, page_size: usize) -> String {
    format!(
        "{}/users?_page={}&_limit={}",
        base_url.trim_end_matches('/'),
        page_index + 1,
        page_size
    )
}

pub fn pages_count(total_count: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    total_count.div_ceil(page_size)
}

pub fn start_api_worker(
    base_url: String,
    req_rx: Receiver<ApiRequest>,
    resp_tx: Sender<ApiResponse>,
) {
    let client = match Client::builder().build() {
        Ok(c) => c,
        Err(e) => {
            // Keep answering so the UI clears its loading flag
            warn!("failed to build HTTP client: {e}");
            while let Ok(ApiRequest::FetchPage { seq, .. }) = req_rx.recv() {
                let _ = resp_tx.send(ApiResponse::Failed {
                    seq,
                    message: format!("HTTP client unavailable: {e}"),
                });
            }
            return;
        }
    };

    while let Ok(req) = req_rx.recv() {
        let ApiRequest::FetchPage {
            seq,
            page_index,
            page_size,
        } = req;
        let resp = match fetch_page(&client, &base_url, page_index, page_size) {
            Ok((rows, total_count)) => {
                debug!(
                    "page {page_index} (size {page_size}): {} rows, total {total_count}",
                    rows.len()
                );
                ApiResponse::Page {
                    seq,
                    rows,
                    total_count,
                }
            }
            Err(e) => {
                warn!("page {page_index} (size {page_size}) failed: {e}");
                ApiResponse::Failed {
                    seq,
                    message: e.to_string(),
                }
            }
        };
        let _ = resp_tx.send(resp);
    }
}

fn fetch_page(
    client: &Client,
    base_url: &str,
    page_index: usize,
    page_size: usize,
) -> Result<(Vec<UserRow>, usize), ApiError> {
    let url = page_url(base_url, page_index, page_size);
    let response = client.get(&url).send()?;
    let status = response.status();
    if !status.is_success() {
        return Err(ApiError::Status(status));
    }
    let total_count = response
        .headers()
        .get(TOTAL_COUNT_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<usize>().ok())
        .ok_or(ApiError::TotalCount)?;
    let rows: Vec<UserRow> = response.json()?;
    Ok((rows, total_count))
}
