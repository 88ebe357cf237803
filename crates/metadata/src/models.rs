use crate::error::{Error, ErrorKind};
use exn::ResultExt;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{PrimitiveDateTime, UtcDateTime};

/// Upload dates are stored as text in this shape (always UTC), which also
/// sorts chronologically.
const UPLOAD_DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Everything known about one uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Generated identifier; also the blob's file name.
    pub id: String,
    /// Display name, changed by renaming.
    pub name: String,
    /// Whole seconds only; anything finer is lost on storage.
    pub upload_date: UtcDateTime,
    /// Human-readable size, computed once at upload.
    pub size: String,
    pub size_bytes: u64,
    pub downloads: u64,
}
impl FileRecord {
    /// Upload date in its stored text form.
    pub fn upload_date_string(&self) -> String {
        format_upload_date(self.upload_date).unwrap_or_default()
    }
}

fn format_upload_date(date: UtcDateTime) -> Result<String, Error> {
    date.format(UPLOAD_DATE_FORMAT).or_raise(|| ErrorKind::InvalidData("upload date"))
}

#[derive(sqlx::FromRow)]
pub(crate) struct FileRow {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) upload_date: String,
    pub(crate) size: String,
    pub(crate) size_bytes: i64,
    pub(crate) downloads: i64,
}
impl TryFrom<&FileRecord> for FileRow {
    type Error = Error;
    fn try_from(record: &FileRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: record.id.clone(),
            name: record.name.clone(),
            upload_date: format_upload_date(record.upload_date)?,
            size: record.size.clone(),
            size_bytes: i64::try_from(record.size_bytes).or_raise(|| ErrorKind::InvalidData("file size"))?,
            downloads: i64::try_from(record.downloads).or_raise(|| ErrorKind::InvalidData("download count"))?,
        })
    }
}
impl TryFrom<FileRow> for FileRecord {
    type Error = Error;
    fn try_from(row: FileRow) -> Result<Self, Self::Error> {
        let upload_date = PrimitiveDateTime::parse(&row.upload_date, UPLOAD_DATE_FORMAT)
            .or_raise(|| ErrorKind::InvalidData("upload date"))?;
        Ok(Self {
            id: row.id,
            name: row.name,
            upload_date: UtcDateTime::from(upload_date.assume_utc()),
            size: row.size,
            size_bytes: u64::try_from(row.size_bytes).or_raise(|| ErrorKind::InvalidData("file size"))?,
            downloads: u64::try_from(row.downloads).or_raise(|| ErrorKind::InvalidData("download count"))?,
        })
    }
}
