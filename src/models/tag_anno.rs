//! # 태그 주석(Tag Annotation) 모델 정의
//!
//! 태그 주석은 특정 태그의 값 순서 안에 끼워 넣는 "구분 행"입니다.
//! 예를 들어 발표 순서 태그에 "Break", "Session 2" 같은 제목 행을 넣을 때 씁니다.
//!
//! ## 구조체 역할
//! - `TagAnnoRow`: DB의 `tag_annos` 테이블 한 행
//! - `TagAnno`: API 응답용 표현
//! - `AnnoStatement` / `AnnoUpdate`: 쓰기 요청 하나에서 만들어지는 배치 문장

use serde::Serialize;
use serde_json::Value;

/// 주석 정보(info) 객체에 복사할 수 있는 필드 목록
pub const ANNO_INFO_FIELDS: [&str; 3] = ["session_title", "time", "location"];

/// `tag_annos` 테이블 한 행에 대응합니다.
///
/// `anno_id`가 NULL인 행은 자리표시 행입니다.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TagAnnoRow {
    pub tag: String,
    pub anno_id: Option<i64>,
    pub tag_index: f64,
    pub heading: Option<String>,
    pub anno_format: Option<i64>,
    pub info_json: Option<String>,
}

/// API 응답에 들어가는 주석 하나
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagAnno {
    pub annoid: i64,
    /// 정렬 인덱스 (태그 값)
    pub tagval: f64,
    /// 제목
    pub legend: Option<String>,
    pub format: Option<i64>,
    /// `session_title`, `time`, `location` 중 저장된 것들
    pub info: Option<Value>,
}

impl TagAnno {
    /// 식별자가 없는 행은 None을 반환합니다.
    pub fn from_row(row: TagAnnoRow) -> Option<Self> {
        let annoid = row.anno_id?;
        let info = row.info_json.as_deref().and_then(|s| {
            serde_json::from_str::<Value>(s)
                .map_err(|e| tracing::warn!("Bad info_json on {}#{}: {}", row.tag, annoid, e))
                .ok()
        });
        Some(Self {
            annoid,
            tagval: row.tag_index,
            legend: row.heading,
            format: row.anno_format,
            info,
        })
    }
}

/// 하나의 주석 행에 대한 필드 갱신
///
/// `heading`이 Some이면 제목을 바꾸고 형식(format)은 NULL로 되돌립니다.
/// 어떤 필드든 갱신되면 `info_json`도 함께 기록됩니다 (비어 있으면 NULL).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnoUpdate {
    pub heading: Option<String>,
    pub tag_index: Option<f64>,
    pub info_json: Option<Option<String>>,
}

impl AnnoUpdate {
    pub fn is_empty(&self) -> bool {
        self.heading.is_none() && self.tag_index.is_none() && self.info_json.is_none()
    }
}

/// 배치 안의 문장 하나. 클라이언트 배열 순서대로 실행됩니다.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnoStatement {
    Insert { anno_id: i64 },
    Update { anno_id: i64, update: AnnoUpdate },
    Delete { anno_id: i64 },
}
