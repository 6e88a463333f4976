//! # 요청 본문 접근자
//!
//! 원시 요청 본문을 필요할 때만 읽습니다.
//!
//! ## 상태 전이
//! ```text
//! None
//! Unread ──(메모리로 읽기)──▶ Cached
//!    └────(디스크로 복사)──▶ Spooled ──(메모리로 읽기)──▶ Cached
//! (어느 상태든) ──set()──▶ Explicit
//! ```
//! 스트림은 한 번만 읽히고, 이후 읽기는 캐시된 값을 돌려줍니다.
//! `Spooled`는 스트림을 메모리에 올리지 않고 곧장 임시 파일로 복사한 상태입니다.
//! 상태 전이는 `advance()` 한 곳에서만 일어납니다.

use std::io;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use axum::body::{Body, Bytes};
use futures_util::StreamExt;
use tempfile::TempPath;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// 타입 추정에 쓰는 본문 앞부분 크기
pub const SNIFF_BYTES: usize = 4096;

enum BodyState {
    None,
    // Body는 Sync가 아니므로 Mutex로 감싸 Qrequest 전체를 Sync로 유지합니다
    Unread(Mutex<Body>),
    Spooled,
    Cached(Bytes),
    Explicit(Bytes),
}

enum Want<'a> {
    Memory,
    Disk { dir: &'a Path, extension: &'a str },
}

pub struct BodyAccessor {
    state: BodyState,
    filename: Option<TempPath>,
    max_bytes: usize,
}

impl std::fmt::Debug for BodyAccessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &self.state {
            BodyState::None => "none",
            BodyState::Unread(_) => "unread",
            BodyState::Spooled => "spooled",
            BodyState::Cached(_) => "cached",
            BodyState::Explicit(_) => "explicit",
        };
        f.debug_struct("BodyAccessor")
            .field("state", &state)
            .field("filename", &self.filename.as_deref())
            .finish()
    }
}

impl Default for BodyAccessor {
    fn default() -> Self {
        Self::none()
    }
}

impl BodyAccessor {
    pub fn none() -> Self {
        Self {
            state: BodyState::None,
            filename: None,
            max_bytes: usize::MAX,
        }
    }

    /// 아직 읽지 않은 요청 스트림을 본문 원천으로 삼습니다.
    pub fn from_input(body: Body, max_bytes: usize) -> Self {
        Self {
            state: BodyState::Unread(Mutex::new(body)),
            filename: None,
            max_bytes,
        }
    }

    /// 이미 읽어 둔 요청 본문
    pub fn from_bytes(content: Bytes) -> Self {
        Self {
            state: BodyState::Cached(content),
            filename: None,
            max_bytes: usize::MAX,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self.state, BodyState::None)
    }

    /// 본문을 명시적인 값으로 바꿉니다. 이전에 만든 임시 파일은 버립니다.
    pub fn set(&mut self, content: Bytes) {
        self.state = BodyState::Explicit(content);
        self.filename = None;
    }

    /// 본문 전체. 스트림이면 처음 한 번만 읽어서 캐시합니다.
    pub async fn content(&mut self) -> Option<&Bytes> {
        if let Err(e) = self.advance(Want::Memory).await {
            tracing::warn!("Cannot read request body: {}", e);
        }
        match &self.state {
            BodyState::Cached(b) | BodyState::Explicit(b) => Some(b),
            _ => None,
        }
    }

    /// 본문을 담은 임시 파일 경로. 같은 파일을 계속 재사용합니다.
    ///
    /// 디렉토리를 만들 수 없거나 복사에 실패하면 None.
    pub async fn filename(&mut self, dir: &Path, extension: &str) -> Option<&Path> {
        if let Err(e) = self.advance(Want::Disk { dir, extension }).await {
            tracing::warn!("Cannot copy request body to {}: {}", dir.display(), e);
        }
        self.filename.as_deref()
    }

    /// 타입 추정용 앞부분. 디스크에만 있는 본문은 메모리로 전부 올리지 않습니다.
    pub async fn prefix(&mut self) -> Option<Bytes> {
        if matches!(self.state, BodyState::Spooled) {
            let path = self.filename.as_deref()?;
            let mut buf = Vec::with_capacity(SNIFF_BYTES);
            let read = async {
                let file = tokio::fs::File::open(path).await?;
                file.take(SNIFF_BYTES as u64).read_to_end(&mut buf).await
            }
            .await;
            return match read {
                Ok(_) => Some(Bytes::from(buf)),
                Err(e) => {
                    tracing::warn!("Cannot read body file {}: {}", path.display(), e);
                    None
                }
            };
        }
        let content = self.content().await?;
        Some(content.slice(..content.len().min(SNIFF_BYTES)))
    }

    async fn advance(&mut self, want: Want<'_>) -> io::Result<()> {
        match (want, &self.state) {
            (Want::Memory, BodyState::Unread(_)) => {
                let BodyState::Unread(body) = std::mem::replace(&mut self.state, BodyState::None)
                else {
                    unreachable!()
                };
                let body = body.into_inner().unwrap_or_else(PoisonError::into_inner);
                let bytes = axum::body::to_bytes(body, self.max_bytes)
                    .await
                    .map_err(io::Error::other)?;
                self.state = BodyState::Cached(bytes);
            }
            (Want::Memory, BodyState::Spooled) => {
                let Some(path) = self.filename.as_deref() else {
                    self.state = BodyState::None;
                    return Ok(());
                };
                let bytes = tokio::fs::read(path).await?;
                self.state = BodyState::Cached(Bytes::from(bytes));
            }
            (Want::Disk { .. }, _) if self.filename.is_some() => {}
            (Want::Disk { .. }, BodyState::None) => {}
            (Want::Disk { dir, extension }, _) => {
                tokio::fs::create_dir_all(dir).await?;
                let named = tempfile::Builder::new()
                    .prefix("")
                    .suffix(extension)
                    .rand_bytes(12)
                    .tempfile_in(dir)?;
                let (file, path) = named.into_parts();
                let mut file = tokio::fs::File::from_std(file);

                match std::mem::replace(&mut self.state, BodyState::None) {
                    BodyState::Unread(body) => {
                        let body = body.into_inner().unwrap_or_else(PoisonError::into_inner);
                        let mut stream = body.into_data_stream();
                        let mut total = 0usize;
                        while let Some(chunk) = stream.next().await {
                            let chunk = chunk.map_err(io::Error::other)?;
                            total += chunk.len();
                            file.write_all(&chunk).await?;
                        }
                        file.flush().await?;
                        tracing::debug!("Spooled {} body bytes to {}", total, path.display());
                        self.state = BodyState::Spooled;
                    }
                    state @ (BodyState::Cached(_) | BodyState::Explicit(_)) => {
                        if let BodyState::Cached(b) | BodyState::Explicit(b) = &state {
                            let written = async {
                                file.write_all(b).await?;
                                file.flush().await
                            }
                            .await;
                            // 실패해도 메모리 본문은 그대로 둡니다
                            self.state = state;
                            written?;
                        }
                    }
                    state => self.state = state,
                }
                self.filename = Some(path);
            }
            _ => {}
        }
        Ok(())
    }
}
