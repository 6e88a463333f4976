//! # MIME 타입 유틸리티
//!
//! `Content-Type` 헤더 정규화, 타입별 파일 확장자, 본문 내용 기반 타입 추정을 담당합니다.

use mime::Mime;

pub const ZIP_MAGIC: &[u8] = b"\x50\x4B\x03\x04";

/// 파라미터(`; charset=...`)를 뗀 소문자 MIME 타입. 해석할 수 없으면 빈 문자열입니다.
///
/// 예: `"Application/JSON; charset=utf-8"` → `"application/json"`
pub fn base_type(content_type: &str) -> String {
    content_type
        .trim()
        .parse::<Mime>()
        .map(|m| m.essence_str().to_string())
        .unwrap_or_default()
}

/// MIME 타입에 맞는 파일 확장자 (점 포함). 모르는 타입이면 빈 문자열입니다.
///
/// 후보가 여럿이면 하위 타입과 같은 이름을 먼저 고릅니다 (`image/jpeg` → `.jpeg`).
pub fn extension(content_type: Option<&str>) -> String {
    let Some(mime) = content_type.and_then(|ct| ct.trim().parse::<Mime>().ok()) else {
        return String::new();
    };
    let Some(candidates) = mime_guess::get_mime_extensions_str(mime.essence_str()) else {
        return String::new();
    };
    candidates
        .iter()
        .find(|ext| **ext == mime.subtype().as_str())
        .or_else(|| candidates.first())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default()
}

/// 본문 앞부분으로 타입을 추정합니다.
///
/// - ZIP 로컬 파일 헤더(`50 4B 03 04`) → `application/zip`
/// - (공백 뒤) `{` 또는 `[` → `application/json`
/// - 그 밖에는 None
pub fn sniff(prefix: &[u8]) -> Option<&'static str> {
    if prefix.starts_with(ZIP_MAGIC) {
        return Some("application/zip");
    }
    match prefix.iter().find(|b| !b.is_ascii_whitespace()) {
        Some(b'{') | Some(b'[') => Some("application/json"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_zip_and_json() {
        assert_eq!(sniff(b"PK\x03\x04rest"), Some("application/zip"));
        assert_eq!(sniff(b"{\"a\":1}"), Some("application/json"));
        assert_eq!(sniff(b" \n\t[1,2]"), Some("application/json"));
        assert_eq!(sniff(b"hello"), None);
        assert_eq!(sniff(b""), None);
        assert_eq!(sniff(b"   "), None);
    }

    #[test]
    fn header_normalization() {
        assert_eq!(base_type("Application/JSON; charset=utf-8"), "application/json");
        assert_eq!(base_type(" text/csv "), "text/csv");
        assert_eq!(base_type("not a type"), "");
        assert_eq!(base_type(""), "");
    }

    #[test]
    fn extensions_follow_registered_types() {
        assert_eq!(extension(Some("application/json; charset=utf-8")), ".json");
        assert_eq!(extension(Some("application/pdf")), ".pdf");
        assert_eq!(extension(Some("image/webp")), ".webp");
        assert_eq!(extension(Some("image/jpeg")), ".jpeg");
        assert!(extension(Some("application/vnd.ms-excel")).starts_with(".xl"));
        assert_eq!(extension(Some("application/x-unknown")), "");
        assert_eq!(extension(Some("garbage")), "");
        assert_eq!(extension(None), "");
    }
}
