//! # 업로드 정규화
//!
//! 플랫폼(multipart 파서)이 넘겨주는 업로드 메타데이터를 `FileRegistry`로 옮깁니다.
//!
//! ## 입력 형태
//! - 필드당 파일 하나: `UploadField::Single`
//! - `name[]`처럼 여러 파일을 받는 필드: 평행 배열 `UploadField::Multiple`
//!
//! ## 이름 규칙
//! 인덱스 0(또는 유일한) 파일은 `field`, 나머지는 `field.<인덱스>`입니다.
//! `field[3]`처럼 인덱스를 적어 보낸 파일은 그 인덱스를 그대로 쓰고,
//! `field[]` 파일은 지금까지의 가장 큰 인덱스 다음 번호를 받습니다.
//!
//! ## 전송 오류
//! 크기 초과는 파일마다 "too large" 오류를 남기고, 최대 크기 안내는 배치 전체에서
//! 한 번만 붙입니다. 중단된 전송과 기타 오류는 파일마다 오류 하나씩입니다.
//! 오류 목록은 파라미터가 아니라 `upload_errors` 부속물(annex)로 노출됩니다.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use axum::extract::Multipart;
use indexmap::IndexMap;
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;

use super::files::{FileRegistry, UploadedFile};
use super::params::{list_field_index, list_field_name};
use crate::error::AppError;
use crate::models::MessageItem;

/// 업로드 오류 코드 (0 = 성공, 4 = 파일 없음 등 고정 번호)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadError {
    Ok,
    IniSize,
    FormSize,
    Partial,
    NoFile,
    NoTmpDir,
    CantWrite,
    Extension,
}

impl UploadError {
    pub fn code(self) -> u8 {
        match self {
            UploadError::Ok => 0,
            UploadError::IniSize => 1,
            UploadError::FormSize => 2,
            UploadError::Partial => 3,
            UploadError::NoFile => 4,
            UploadError::NoTmpDir => 6,
            UploadError::CantWrite => 7,
            UploadError::Extension => 8,
        }
    }

    pub fn from_code(code: u8) -> Self {
        match code {
            0 => UploadError::Ok,
            1 => UploadError::IniSize,
            2 => UploadError::FormSize,
            3 => UploadError::Partial,
            4 => UploadError::NoFile,
            6 => UploadError::NoTmpDir,
            7 => UploadError::CantWrite,
            _ => UploadError::Extension,
        }
    }

    fn is_size_violation(self) -> bool {
        matches!(self, UploadError::IniSize | UploadError::FormSize)
    }
}

/// 파일 하나에 대한 플랫폼 메타데이터
#[derive(Debug, Clone, PartialEq)]
pub struct UploadDescriptor {
    pub name: Option<String>,
    pub mime: Option<String>,
    pub size: u64,
    pub tmp_name: Option<PathBuf>,
    pub error: UploadError,
}

/// 여러 파일 필드의 평행 배열 표현. 위치 i의 파일은 `index[i]`번 파일입니다.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadArrays {
    pub index: Vec<usize>,
    pub name: Vec<Option<String>>,
    pub mime: Vec<Option<String>>,
    pub size: Vec<u64>,
    pub tmp_name: Vec<Option<PathBuf>>,
    pub error: Vec<UploadError>,
}

impl UploadArrays {
    /// 가장 큰 인덱스 다음 번호로 추가합니다.
    pub fn push(&mut self, d: UploadDescriptor) {
        let next = self.index.iter().max().map_or(0, |i| i + 1);
        self.push_at(next, d);
    }

    /// 지정한 인덱스로 추가합니다. 이미 있는 인덱스면 그 파일을 바꿉니다.
    pub fn push_at(&mut self, index: usize, d: UploadDescriptor) {
        if let Some(pos) = self.index.iter().position(|i| *i == index) {
            self.name[pos] = d.name;
            self.mime[pos] = d.mime;
            self.size[pos] = d.size;
            self.tmp_name[pos] = d.tmp_name;
            self.error[pos] = d.error;
            return;
        }
        self.index.push(index);
        self.name.push(d.name);
        self.mime.push(d.mime);
        self.size.push(d.size);
        self.tmp_name.push(d.tmp_name);
        self.error.push(d.error);
    }

    /// `error` 배열 길이를 기준으로 파일별 서술자를 만듭니다.
    fn descriptors(&self) -> impl Iterator<Item = (usize, UploadDescriptor)> + '_ {
        (0..self.error.len()).map(move |i| {
            let d = UploadDescriptor {
                name: self.name.get(i).cloned().flatten(),
                mime: self.mime.get(i).cloned().flatten(),
                size: self.size.get(i).copied().unwrap_or(0),
                tmp_name: self.tmp_name.get(i).cloned().flatten(),
                error: self.error[i],
            };
            (self.index.get(i).copied().unwrap_or(i), d)
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UploadField {
    Single(UploadDescriptor),
    Multiple(UploadArrays),
}

/// "이 경로가 정말 업로드 채널로 들어온 파일인가?"를 판정합니다.
///
/// 성공 코드를 가진 서술자가 임의의 파일 시스템 경로를 가리키는 경우를 막습니다.
pub trait UploadChannel {
    fn is_uploaded_file(&self, path: &Path) -> bool;
}

/// 업로드 필드를 평탄한 레지스트리와 메시지 목록으로 정규화합니다.
pub fn normalize_uploads(
    fields: &IndexMap<String, UploadField>,
    channel: &dyn UploadChannel,
    max_filesize: u64,
) -> (FileRegistry, Vec<MessageItem>) {
    let mut files = FileRegistry::default();
    let mut errors = Vec::new();
    let mut too_big = false;

    for (field, upload) in fields {
        let descriptors: Vec<(String, UploadDescriptor)> = match upload {
            UploadField::Single(d) => vec![(field.clone(), d.clone())],
            UploadField::Multiple(arrays) => arrays
                .descriptors()
                .map(|(i, d)| {
                    let name = if i == 0 {
                        field.clone()
                    } else {
                        format!("{}.{}", field, i)
                    };
                    (name, d)
                })
                .collect(),
        };

        for (name, d) in descriptors {
            match d.error {
                UploadError::Ok => match &d.tmp_name {
                    Some(path) if channel.is_uploaded_file(path) => {
                        files.insert(
                            name,
                            UploadedFile::on_disk(
                                d.name.unwrap_or_default(),
                                d.mime,
                                d.size,
                                path.clone(),
                            ),
                        );
                    }
                    _ => {
                        tracing::warn!("Ignoring upload {} outside the upload channel", name);
                    }
                },
                UploadError::NoFile => {}
                err => {
                    let item = if err.is_size_violation() {
                        MessageItem::error("Uploaded file too large")
                    } else if err == UploadError::Partial {
                        MessageItem::error("File upload interrupted")
                    } else {
                        MessageItem::error("Error uploading file")
                    };
                    tracing::debug!("Upload {} failed with code {}", name, err.code());
                    errors.push(item.with_landmark(d.name.clone()));
                    if err.is_size_violation() && !too_big {
                        errors.push(MessageItem::inform(format!(
                            "The maximum upload size is {} bytes.",
                            max_filesize
                        )));
                        too_big = true;
                    }
                }
            }
        }
    }

    (files, errors)
}

/// multipart 파일 파트를 요청 범위 임시 파일로 받아 두는 곳.
///
/// 여기서 만든 경로만 `is_uploaded_file`을 통과합니다.
/// `UploadSpool`이 drop되면 임시 파일도 함께 지워집니다.
#[derive(Debug)]
pub struct UploadSpool {
    dir: PathBuf,
    delivered: HashSet<PathBuf>,
    temps: Vec<TempPath>,
}

impl UploadSpool {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            delivered: HashSet::new(),
            temps: Vec::new(),
        }
    }

    async fn spool_field(
        &mut self,
        field: &mut axum::extract::multipart::Field<'_>,
        file_name: Option<String>,
        max_filesize: u64,
    ) -> UploadDescriptor {
        let mime = field.content_type().map(str::to_string);
        let mut d = UploadDescriptor {
            name: file_name,
            mime,
            size: 0,
            tmp_name: None,
            error: UploadError::Ok,
        };

        if let Err(e) = tokio::fs::create_dir_all(&self.dir).await {
            tracing::warn!("Cannot create upload dir {}: {}", self.dir.display(), e);
            d.error = UploadError::NoTmpDir;
            return d;
        }
        let named = match tempfile::Builder::new()
            .prefix("upload-")
            .suffix(".upload")
            .tempfile_in(&self.dir)
        {
            Ok(named) => named,
            Err(e) => {
                tracing::warn!("Cannot create upload file: {}", e);
                d.error = UploadError::CantWrite;
                return d;
            }
        };
        let (file, path) = named.into_parts();
        let mut file = tokio::fs::File::from_std(file);

        loop {
            match field.chunk().await {
                Ok(Some(chunk)) => {
                    d.size += chunk.len() as u64;
                    if d.size > max_filesize {
                        d.error = UploadError::FormSize;
                        return d;
                    }
                    if let Err(e) = file.write_all(&chunk).await {
                        tracing::warn!("Cannot write upload file: {}", e);
                        d.error = UploadError::CantWrite;
                        return d;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::debug!("Upload stream broken: {}", e);
                    d.error = UploadError::Partial;
                    return d;
                }
            }
        }
        if let Err(e) = file.flush().await {
            tracing::warn!("Cannot flush upload file: {}", e);
            d.error = UploadError::CantWrite;
            return d;
        }

        if d.size == 0 && d.name.as_deref().map_or(true, str::is_empty) {
            d.error = UploadError::NoFile;
            return d;
        }

        self.delivered.insert(path.to_path_buf());
        d.tmp_name = Some(path.to_path_buf());
        self.temps.push(path);
        d
    }
}

impl UploadChannel for UploadSpool {
    fn is_uploaded_file(&self, path: &Path) -> bool {
        self.delivered.contains(path) && path.is_file()
    }
}

/// multipart 본문에서 읽어 낸 결과
#[derive(Debug)]
pub struct MultipartForm {
    /// 파일이 아닌 필드 (이름, 값), 도착 순서대로
    pub fields: Vec<(String, String)>,
    pub uploads: IndexMap<String, UploadField>,
    pub spool: UploadSpool,
}

/// multipart/form-data 본문을 읽어 일반 필드와 업로드로 나눕니다.
pub async fn ingest_multipart(
    mut multipart: Multipart,
    upload_dir: &Path,
    max_filesize: u64,
) -> Result<MultipartForm, AppError> {
    let mut form = MultipartForm {
        fields: Vec::new(),
        uploads: IndexMap::new(),
        spool: UploadSpool::new(upload_dir),
    };

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        let Some(key) = field.name().map(str::to_string) else {
            continue;
        };

        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let d = form
                    .spool
                    .spool_field(&mut field, Some(file_name), max_filesize)
                    .await;
                match list_field_name(&key) {
                    Some(base) => {
                        let entry = form
                            .uploads
                            .entry(base.to_string())
                            .or_insert_with(|| UploadField::Multiple(UploadArrays::default()));
                        if matches!(entry, UploadField::Single(_)) {
                            *entry = UploadField::Multiple(UploadArrays::default());
                        }
                        if let UploadField::Multiple(arrays) = entry {
                            match list_field_index(&key) {
                                Some(index) => arrays.push_at(index, d),
                                None => arrays.push(d),
                            }
                        }
                    }
                    None => {
                        form.uploads.insert(key, UploadField::Single(d));
                    }
                }
            }
            None => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Invalid field '{}': {}", key, e)))?;
                form.fields.push((key, value));
            }
        }
    }

    Ok(form)
}
