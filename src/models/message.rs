//! # 메시지 항목(MessageItem) 모델
//!
//! 요청 처리 중 쌓이는 사용자용 메시지입니다.
//! 업로드 전송 오류, 태그 주석 필드 검증 실패 등이 이 형태로 수집됩니다.
//!
//! ## JSON 형태
//! ```json
//! { "landmark": "ta/n1/tagval", "message": "Tag value should be a number", "status": 2 }
//! ```

use serde::{Serialize, Serializer};

/// 메시지 심각도
///
/// JSON으로는 정수 상태값(`status`)으로 직렬화됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// 정보성 안내 (-5)
    Inform,
    /// 경고 (1)
    Warning,
    /// 오류 (2)
    Error,
}

impl Severity {
    pub fn status(self) -> i8 {
        match self {
            Severity::Inform => -5,
            Severity::Warning => 1,
            Severity::Error => 2,
        }
    }
}

impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i8(self.status())
    }
}

/// 심각도 + 랜드마크 + 본문으로 구성된 메시지 하나
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageItem {
    /// 메시지가 가리키는 위치 (업로드 파일명, `ta/<key>/<field>` 경로 등)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub landmark: Option<String>,
    pub message: String,
    pub status: Severity,
}

impl MessageItem {
    pub fn new(landmark: Option<String>, message: impl Into<String>, status: Severity) -> Self {
        Self {
            landmark,
            message: message.into(),
            status,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(None, message, Severity::Error)
    }

    pub fn inform(message: impl Into<String>) -> Self {
        Self::new(None, message, Severity::Inform)
    }

    pub fn with_landmark(mut self, landmark: Option<String>) -> Self {
        self.landmark = landmark;
        self
    }

    pub fn is_error(&self) -> bool {
        self.status == Severity::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_status_as_integer() {
        let item = MessageItem::new(
            Some("ta/1/tagval".to_string()),
            "Tag value should be a number",
            Severity::Error,
        );
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["landmark"], "ta/1/tagval");
        assert_eq!(json["status"], 2);

        let note = serde_json::to_value(MessageItem::inform("note")).unwrap();
        assert_eq!(note["status"], -5);
        assert!(note.get("landmark").is_none());
    }
}
