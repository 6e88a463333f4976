//! # 업로드 파일 레지스트리
//!
//! 필드 이름 → 업로드 파일 하나의 평탄한 맵입니다.
//! 파일 내용은 디스크 경로(`tmp_name`) 또는 메모리 버퍼(`content`) 중
//! 하나에서 읽습니다. 메모리 버퍼가 있으면 그쪽이 우선입니다.

use std::io::SeekFrom;
use std::path::PathBuf;

use axum::body::Bytes;
use indexmap::IndexMap;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use super::upload::UploadError;

pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    /// 클라이언트가 선언한 파일 이름
    pub name: String,
    /// 클라이언트가 선언한 MIME 타입
    pub mime: String,
    pub size: u64,
    pub tmp_name: Option<PathBuf>,
    pub content: Option<Bytes>,
    pub error: UploadError,
}

impl UploadedFile {
    pub fn on_disk(name: impl Into<String>, mime: Option<String>, size: u64, path: PathBuf) -> Self {
        Self {
            name: name.into(),
            mime: mime.unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string()),
            size,
            tmp_name: Some(path),
            content: None,
            error: UploadError::Ok,
        }
    }

    pub fn in_memory(name: impl Into<String>, mime: Option<String>, content: Bytes) -> Self {
        Self {
            name: name.into(),
            mime: mime.unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string()),
            size: content.len() as u64,
            tmp_name: None,
            content: Some(content),
            error: UploadError::Ok,
        }
    }

    /// `offset`부터 최대 `maxlen` 바이트를 읽습니다.
    ///
    /// 읽을 수 있는 내용이 없거나 디스크 읽기에 실패하면 None.
    pub async fn contents(&self, offset: u64, maxlen: Option<u64>) -> Option<Bytes> {
        if let Some(content) = &self.content {
            let len = content.len() as u64;
            let start = offset.min(len);
            let end = maxlen.map_or(len, |m| start.saturating_add(m).min(len));
            return Some(content.slice(start as usize..end as usize));
        }
        let path = self.tmp_name.as_ref()?;
        let result: std::io::Result<Vec<u8>> = async {
            let mut file = tokio::fs::File::open(path).await?;
            file.seek(SeekFrom::Start(offset)).await?;
            let mut buf = Vec::new();
            match maxlen {
                Some(max) => {
                    file.take(max).read_to_end(&mut buf).await?;
                }
                None => {
                    file.read_to_end(&mut buf).await?;
                }
            }
            Ok(buf)
        }
        .await;
        match result {
            Ok(buf) => Some(Bytes::from(buf)),
            Err(e) => {
                tracing::warn!("Cannot read upload {}: {}", path.display(), e);
                None
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FileRegistry {
    files: IndexMap<String, UploadedFile>,
}

impl FileRegistry {
    pub fn insert(&mut self, name: impl Into<String>, file: UploadedFile) {
        self.files.insert(name.into(), file);
    }

    pub fn get(&self, name: &str) -> Option<&UploadedFile> {
        self.files.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &UploadedFile)> {
        self.files.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn memory_contents_respect_range() {
        let f = UploadedFile::in_memory("a.txt", None, Bytes::from_static(b"hello world"));
        assert_eq!(f.mime, DEFAULT_MIME_TYPE);
        assert_eq!(f.size, 11);
        assert_eq!(f.contents(0, None).await.unwrap(), "hello world");
        assert_eq!(f.contents(6, Some(3)).await.unwrap(), "wor");
        assert_eq!(f.contents(50, None).await.unwrap(), "");
    }

    #[tokio::test]
    async fn disk_contents_respect_range() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"0123456789").unwrap();
        let f = UploadedFile::on_disk("n.bin", Some("application/pdf".into()), 10, tmp.path().to_path_buf());
        assert_eq!(f.contents(2, Some(4)).await.unwrap(), "2345");
        assert_eq!(f.contents(7, None).await.unwrap(), "789");
    }

    #[tokio::test]
    async fn missing_content_reads_as_none() {
        let f = UploadedFile {
            tmp_name: None,
            content: None,
            ..UploadedFile::in_memory("x", None, Bytes::new())
        };
        assert!(f.contents(0, None).await.is_none());

        let gone = UploadedFile::on_disk("y", None, 1, PathBuf::from("/nonexistent/confreq/y"));
        assert!(gone.contents(0, None).await.is_none());
    }
}
