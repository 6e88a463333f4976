//! # 응답 쿠키
//!
//! `set_cookie`/`set_httponly_cookie`가 만드는 `Set-Cookie` 값을 조립합니다.
//! 지정하지 않은 옵션은 사이트 설정에서 기본값을 가져옵니다.
//!
//! SameSite는 쿠키가 secure이거나 정책이 `None`이 아닐 때만 붙입니다.
//! 브라우저는 `Secure` 없는 `SameSite=None` 쿠키를 거부하기 때문입니다.

use cookie::{Cookie, SameSite};
use time::OffsetDateTime;

use crate::config::Config;

#[derive(Debug, Clone, Default)]
pub struct CookieOptions {
    /// 만료 시각(유닉스 초). 0 이하이면 세션 쿠키
    pub expires: i64,
    pub path: Option<String>,
    pub domain: Option<String>,
    pub secure: Option<bool>,
    pub httponly: bool,
    pub samesite: Option<String>,
}

/// 요청 컨텍스트에서 정해지는 쿠키 기본값
#[derive(Debug, Clone)]
pub struct CookieDefaults {
    pub path: String,
    pub domain: Option<String>,
    pub secure: bool,
    pub samesite: String,
}

impl CookieDefaults {
    pub fn from_config(conf: Option<&Config>, base_path: Option<&str>) -> Self {
        Self {
            path: base_path
                .map(str::to_string)
                .or_else(|| conf.map(|c| c.base_path.clone()))
                .unwrap_or_else(|| "/".to_string()),
            domain: conf.and_then(|c| c.session_domain.clone()),
            secure: conf.is_some_and(|c| c.session_secure),
            samesite: conf
                .map(|c| c.session_samesite.clone())
                .unwrap_or_else(|| "Lax".to_string()),
        }
    }
}

pub fn build_cookie(
    name: &str,
    value: &str,
    opt: CookieOptions,
    defaults: &CookieDefaults,
) -> Cookie<'static> {
    let secure = opt.secure.unwrap_or(defaults.secure);
    let mut cookie = Cookie::build((name.to_string(), value.to_string()))
        .path(opt.path.unwrap_or_else(|| defaults.path.clone()))
        .secure(secure)
        .http_only(opt.httponly)
        .build();

    let domain = opt.domain.or_else(|| defaults.domain.clone()).unwrap_or_default();
    if !domain.is_empty() {
        cookie.set_domain(domain);
    }

    if opt.expires > 0 {
        match OffsetDateTime::from_unix_timestamp(opt.expires) {
            Ok(at) => cookie.set_expires(at),
            Err(e) => tracing::error!("Bad expiry for cookie {}: {}", name, e),
        }
    }

    let samesite = match opt.samesite {
        Some(s) => Some(s),
        None => {
            let s = defaults.samesite.clone();
            (!s.is_empty() && (secure || !s.eq_ignore_ascii_case("none"))).then_some(s)
        }
    };
    if let Some(s) = samesite {
        match parse_samesite(&s) {
            Some(policy) => cookie.set_same_site(policy),
            None => tracing::warn!("Ignoring unknown SameSite policy {:?}", s),
        }
    }

    cookie
}

fn parse_samesite(s: &str) -> Option<SameSite> {
    match s.to_ascii_lowercase().as_str() {
        "strict" => Some(SameSite::Strict),
        "lax" => Some(SameSite::Lax),
        "none" => Some(SameSite::None),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults(secure: bool, samesite: &str) -> CookieDefaults {
        CookieDefaults {
            path: "/conf/".to_string(),
            domain: None,
            secure,
            samesite: samesite.to_string(),
        }
    }

    #[test]
    fn defaults_fill_in_path_and_lax_policy() {
        let c = build_cookie(
            "confreq_session",
            "abc",
            CookieOptions {
                expires: 2_000_000_000,
                httponly: true,
                ..Default::default()
            },
            &defaults(false, "Lax"),
        );
        assert_eq!(c.path(), Some("/conf/"));
        assert_eq!(c.same_site(), Some(SameSite::Lax));
        assert_eq!(c.http_only(), Some(true));
        assert!(c.domain().is_none());
        assert!(c.expires_datetime().is_some());
    }

    #[test]
    fn samesite_none_requires_secure() {
        let opt = CookieOptions::default();
        let insecure = build_cookie("a", "1", opt.clone(), &defaults(false, "None"));
        assert_eq!(insecure.same_site(), None);

        let secure = build_cookie("a", "1", opt, &defaults(true, "None"));
        assert_eq!(secure.same_site(), Some(SameSite::None));
        assert_eq!(secure.secure(), Some(true));
    }

    #[test]
    fn explicit_options_win() {
        let c = build_cookie(
            "a",
            "1",
            CookieOptions {
                path: Some("/x".to_string()),
                domain: Some("example.org".to_string()),
                samesite: Some("Strict".to_string()),
                ..Default::default()
            },
            &defaults(false, "Lax"),
        );
        assert_eq!(c.path(), Some("/x"));
        assert_eq!(c.domain(), Some("example.org"));
        assert_eq!(c.same_site(), Some(SameSite::Strict));
        assert!(c.expires().is_none());
    }
}
