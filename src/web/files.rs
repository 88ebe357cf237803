//! Dashboard, upload, rename, delete and download handlers.
//!
//! Each handler makes one call into the [`Library`] and turns the outcome
//! into a notice and a redirect. Nothing here touches a store directly.

use super::AppState;
use super::notice::Notice;
use super::templates::Page;
use axum::Form;
use axum::body::Body;
use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::CookieJar;
use futures::TryStreamExt;
use parcel_library::Library;
use parcel_library::error::{Error as LibraryError, ErrorKind as LibraryErrorKind};
use parcel_metadata::FileRecord;
use serde::{Deserialize, Serialize};
use std::pin::pin;
use tokio_util::io::{ReaderStream, StreamReader};

const FILE_NOT_FOUND: &str = "File not found";

/// A [`FileRecord`] as the templates see it.
#[derive(Serialize)]
struct FileView {
    id: String,
    name: String,
    upload_date: String,
    size: String,
    downloads: u64,
}
impl From<FileRecord> for FileView {
    fn from(record: FileRecord) -> Self {
        Self {
            upload_date: record.upload_date_string(),
            id: record.id,
            name: record.name,
            size: record.size,
            downloads: record.downloads,
        }
    }
}

#[derive(Serialize)]
struct DashboardContext {
    has_notices: bool,
    notices: Vec<Notice>,
    has_files: bool,
    files: Vec<FileView>,
}

pub async fn dashboard(State(state): State<AppState>, jar: CookieJar) -> Response {
    let (jar, mut notices) = state.notices.take(jar).await;
    let files = match state.library.list().await {
        Ok(records) => records.into_iter().map(FileView::from).collect(),
        Err(e) => {
            notices.push(notice_for(&e));
            Vec::new()
        },
    };
    let context = DashboardContext {
        has_notices: !notices.is_empty(),
        notices,
        has_files: !files.is_empty(),
        files,
    };
    (jar, state.templates.respond(Page::Dashboard, context)).into_response()
}

pub async fn upload(State(state): State<AppState>, jar: CookieJar, mut multipart: Multipart) -> Response {
    let notice = receive_upload(&state.library, &mut multipart).await;
    redirect_with(&state, jar, notice, "/dashboard").await
}

/// Store the first `file` field of the form. Other fields are ignored.
async fn receive_upload(library: &Library, multipart: &mut Multipart) -> Notice {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Notice::error("No file selected"),
            Err(e) => {
                tracing::warn!(error = %e, "Malformed upload");
                return Notice::error("Upload failed");
            },
        };
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().map(str::to_owned).unwrap_or_default();
        if filename.is_empty() {
            return Notice::error("No file selected");
        }
        let mut reader = pin!(StreamReader::new(field.map_err(std::io::Error::other)));
        return match library.upload(&filename, &mut reader).await {
            Ok(record) => Notice::success(format!("File \"{}\" uploaded successfully", record.name)),
            Err(e) => notice_for(&e),
        };
    }
}

#[derive(Deserialize)]
pub struct RenameForm {
    #[serde(default)]
    new_name: String,
}

pub async fn rename(
    State(state): State<AppState>,
    Path(id): Path<String>,
    jar: CookieJar,
    Form(form): Form<RenameForm>,
) -> Response {
    let notice = if form.new_name.trim().is_empty() {
        Notice::error("Please provide a new name")
    } else {
        match rename_file(&state.library, &id, &form.new_name).await {
            Ok((old, new)) => Notice::success(format!("File renamed from \"{old}\" to \"{new}\"")),
            Err(e) if matches!(&*e, LibraryErrorKind::InvalidName) => Notice::error("Please provide a new name"),
            Err(e) => notice_for(&e),
        }
    };
    redirect_with(&state, jar, notice, "/dashboard").await
}

async fn rename_file(library: &Library, id: &str, new_name: &str) -> Result<(String, String), LibraryError> {
    let old = library.get(id).await?.name;
    let new = library.rename(id, new_name).await?;
    Ok((old, new))
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<String>, jar: CookieJar) -> Response {
    let notice = match state.library.delete(&id).await {
        Ok(record) => Notice::success(format!("File \"{}\" deleted successfully", record.name)),
        Err(e) => notice_for(&e),
    };
    redirect_with(&state, jar, notice, "/dashboard").await
}

/// Public page describing a file, with a link to fetch it. Viewing it is
/// not a download.
pub async fn download_page(State(state): State<AppState>, Path(id): Path<String>, jar: CookieJar) -> Response {
    match state.library.get(&id).await {
        Ok(record) => {
            let (jar, notices) = state.notices.take(jar).await;
            let context = serde_json::json!({
                "has_notices": !notices.is_empty(),
                "notices": notices,
                "file": FileView::from(record),
            });
            (jar, state.templates.respond(Page::Download, context)).into_response()
        },
        Err(e) => redirect_with(&state, jar, notice_for(&e), "/").await,
    }
}

/// Stream a file to the client as an attachment, counting the download.
pub async fn download_file(State(state): State<AppState>, Path(id): Path<String>, jar: CookieJar) -> Response {
    let download = match state.library.record_download(&id).await {
        Ok(download) => download,
        Err(e) => return redirect_with(&state, jar, notice_for(&e), "/").await,
    };
    let disposition = HeaderValue::from_bytes(format!("attachment; filename=\"{}\"", download.name).as_bytes())
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
    let headers = [
        (header::CONTENT_TYPE, HeaderValue::from_static("application/octet-stream")),
        (header::CONTENT_DISPOSITION, disposition),
    ];
    (headers, Body::from_stream(ReaderStream::new(download.reader))).into_response()
}

async fn redirect_with(state: &AppState, jar: CookieJar, notice: Notice, to: &str) -> Response {
    let jar = state.notices.push(jar, notice).await;
    (jar, Redirect::to(to)).into_response()
}

/// What the operator is told when a library call fails.
fn notice_for(err: &LibraryError) -> Notice {
    match &**err {
        LibraryErrorKind::NotFound(_) => Notice::error(FILE_NOT_FOUND),
        LibraryErrorKind::InvalidName => Notice::error("Invalid file name"),
        LibraryErrorKind::DuplicateKey(_) => {
            tracing::warn!(error = ?err, "Identifier collision");
            Notice::error("Upload collided with an existing file, please try again")
        },
        LibraryErrorKind::Metadata | LibraryErrorKind::Storage => {
            tracing::error!(error = ?err, "Request failed");
            Notice::error("Something went wrong, please try again")
        },
    }
}
