//! # 애플리케이션 설정(Configuration) 모듈
//!
//! 환경변수에서 서버 설정값을 읽어오는 모듈입니다.
//! `.env` 파일이나 시스템 환경변수에서 값을 가져옵니다.
//!
//! `Config`는 서버 설정인 동시에 요청에 바인딩되는 사이트(학회) 컨텍스트입니다.
//! `Qrequest::set_conf()`로 요청에 연결되며, 세션 쿠키 기본값과
//! 세션 2단계 네임스페이스 키(`session_key`)를 제공합니다.
//!
//! 설정 항목:
//! - `DATABASE_URL`, `JWT_SECRET`: 필수
//! - `HOST`, `PORT`, `BASE_PATH`
//! - `SESSION_NAME`, `SESSION_KEY`, `SESSION_DOMAIN`, `SESSION_SECURE`,
//!   `SESSION_SAMESITE`, `SESSION_LIFETIME`
//! - `UPLOAD_MAX_FILESIZE`, `MAX_BODY_BYTES`, `TMP_DIR`, `UPLOAD_DIR`

use std::env;
use std::path::PathBuf;

/// 애플리케이션 전체 설정을 담는 구조체
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite 데이터베이스 URL (예: "sqlite:data/confreq.db")
    pub database_url: String,
    /// 신원 토큰(JWT) 검증에 사용하는 비밀키
    pub jwt_secret: String,
    pub host: String,
    pub port: u16,
    /// 애플리케이션 기본 경로. 항상 `/`로 끝납니다.
    pub base_path: String,
    /// 세션 쿠키 이름
    pub session_name: String,
    /// 세션 2단계(테넌트) 네임스페이스 키. None이면 `*_csession` 계열이 동작하지 않습니다.
    pub session_key: Option<String>,
    pub session_domain: Option<String>,
    pub session_secure: bool,
    /// SameSite 정책 ("Strict", "Lax", "None"). 빈 문자열이면 설정하지 않습니다.
    pub session_samesite: String,
    /// 세션 쿠키 유효 기간(초)
    pub session_lifetime: i64,
    /// 업로드 파일 하나의 최대 크기(바이트)
    pub upload_max_filesize: u64,
    /// 요청 본문을 메모리로 읽을 때의 최대 크기(바이트)
    pub max_body_bytes: usize,
    /// 요청 본문 임시 파일 디렉토리
    pub tmp_dir: PathBuf,
    /// multipart 업로드 파일을 스풀링하는 디렉토리
    pub upload_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            jwt_secret: "confreq-dev-secret".to_string(),
            host: "0.0.0.0".to_string(),
            port: 3000,
            base_path: "/".to_string(),
            session_name: "confreq_session".to_string(),
            session_key: None,
            session_domain: None,
            session_secure: false,
            session_samesite: "Lax".to_string(),
            session_lifetime: 86400,
            upload_max_filesize: 16 << 20,
            max_body_bytes: 64 << 20,
            tmp_dir: env::temp_dir().join("confreq"),
            upload_dir: env::temp_dir().join("confreq-uploads"),
        }
    }
}

impl Config {
    /// 환경변수에서 설정값을 읽어 Config 인스턴스를 생성합니다.
    ///
    /// # 에러
    /// `DATABASE_URL`과 `JWT_SECRET`은 필수이며, 없으면 에러가 발생합니다.
    /// 나머지 설정은 `Config::default()`의 값을 기본값으로 사용합니다.
    pub fn from_env() -> Result<Self, env::VarError> {
        let defaults = Self::default();
        Ok(Self {
            database_url: env::var("DATABASE_URL")?,
            jwt_secret: env::var("JWT_SECRET")?,
            host: env::var("HOST").unwrap_or(defaults.host),
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            base_path: env::var("BASE_PATH")
                .map(|p| normalize_base_path(&p))
                .unwrap_or(defaults.base_path),
            session_name: env::var("SESSION_NAME").unwrap_or(defaults.session_name),
            // 빈 문자열은 "설정 안 됨"으로 취급합니다
            session_key: env::var("SESSION_KEY").ok().filter(|k| !k.is_empty()),
            session_domain: env::var("SESSION_DOMAIN").ok().filter(|d| !d.is_empty()),
            session_secure: env::var("SESSION_SECURE")
                .map(|v| matches!(v.as_str(), "1" | "true" | "yes" | "on"))
                .unwrap_or(defaults.session_secure),
            session_samesite: env::var("SESSION_SAMESITE").unwrap_or(defaults.session_samesite),
            session_lifetime: env::var("SESSION_LIFETIME")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.session_lifetime),
            upload_max_filesize: env::var("UPLOAD_MAX_FILESIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.upload_max_filesize),
            max_body_bytes: env::var("MAX_BODY_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_body_bytes),
            tmp_dir: env::var("TMP_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.tmp_dir),
            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
        })
    }
}

/// 기본 경로를 `/`로 시작하고 `/`로 끝나는 형태로 맞춥니다.
///
/// 예: `"conf"` → `"/conf/"`, `""` → `"/"`
pub fn normalize_base_path(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_path_is_slash_delimited() {
        assert_eq!(normalize_base_path(""), "/");
        assert_eq!(normalize_base_path("/"), "/");
        assert_eq!(normalize_base_path("conf"), "/conf/");
        assert_eq!(normalize_base_path("/conf/2024/"), "/conf/2024/");
    }
}
