//! # Qrequest: 요청 하나에 대한 정규화된 façade
//!
//! 메서드, 경로, 헤더, 파라미터, 업로드 파일, 본문, 쿠키, 세션을 한 값으로 묶습니다.
//! 핸들러는 HTTP 요청을 직접 보지 않고 이 값의 접근자만 사용합니다.
//!
//! ## 생명주기
//! ```text
//! extract.rs (FromRequest) ──▶ Qrequest ──▶ 핸들러 ──▶ respond() ──▶ Response
//!                                                    (세션 저장 + Set-Cookie)
//! ```
//! 전역 요청 객체는 없습니다. 요청은 핸들러 인자로만 전달되고,
//! 요청이 끝나면 함께 사라집니다 (임시 파일 포함).

pub mod annex;
pub mod body;
pub mod cookie;
pub mod extract;
pub mod files;
pub mod params;
pub mod upload;

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::body::Bytes;
use axum::http::header::SET_COOKIE;
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use percent_encoding::percent_decode_str;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use sqlx::SqlitePool;

use crate::config::{normalize_base_path, Config};
use crate::db;
use crate::error::AppError;
use crate::models::{Contact, SessionList};
use crate::services::mimetype;
use crate::session::Qsession;

pub use annex::AnnexRegistry;
pub use body::BodyAccessor;
pub use self::cookie::CookieOptions;
pub use files::{FileRegistry, UploadedFile};
pub use params::{ParamValue, ParameterStore, ARRAY_MARKER};

use self::cookie::{build_cookie, CookieDefaults};

/// 업로드 전송 오류 목록이 담기는 부속물 이름
pub const UPLOAD_ERRORS_ANNEX: &str = "upload_errors";
const ACTIVE_LIST_ANNEX: &str = "active_list";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Head,
    Put,
    Patch,
    Delete,
    Options,
}

impl Method {
    pub fn parse(method: &str) -> Result<Self, AppError> {
        match method.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "HEAD" => Ok(Method::Head),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            "OPTIONS" => Ok(Method::Options),
            _ => Err(AppError::MethodNotAllowed(method.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Head => "HEAD",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 요청 URI를 애플리케이션 기준으로 나눈 결과
///
/// `/conf/api/taganno/x` (기본 경로 `/conf/`) → page `api`, path `/taganno/x`
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationState {
    pub base_path: String,
    pub page: String,
    /// 비어 있거나 `/`로 시작합니다.
    pub path: String,
}

impl NavigationState {
    pub fn new(base_path: &str, request_path: &str) -> Self {
        let base_path = normalize_base_path(base_path);
        let rest = if let Some(rest) = request_path.strip_prefix(base_path.as_str()) {
            rest
        } else if request_path == base_path.trim_end_matches('/') {
            ""
        } else {
            request_path
        };
        let rest = rest.trim_start_matches('/');
        let (page, path) = match rest.find('/') {
            Some(i) => (&rest[..i], &rest[i..]),
            None => (rest, ""),
        };
        Self {
            page: if page.is_empty() { "index" } else { page }.to_string(),
            path: path.to_string(),
            base_path,
        }
    }

    /// 경로의 n번째 구성 요소. 마지막 요소가 비어 있으면 없는 것으로 봅니다.
    pub fn path_component(&self, n: usize, decoded: bool) -> Option<String> {
        path_component(&self.path, n, decoded)
    }
}

fn path_component(path: &str, n: usize, decoded: bool) -> Option<String> {
    let rest = path.strip_prefix('/')?;
    let parts: Vec<&str> = rest.split('/').collect();
    let part = *parts.get(n)?;
    if n + 1 == parts.len() && part.is_empty() {
        return None;
    }
    Some(if decoded { url_decode(part) } else { part.to_string() })
}

/// `+`를 공백으로 바꾼 뒤 퍼센트 인코딩을 풉니다.
fn url_decode(s: &str) -> String {
    let plus = s.replace('+', " ");
    percent_decode_str(&plus).decode_utf8_lossy().into_owned()
}

/// 헤더 이름 정규화: 소문자, `_` → `-`
fn header_key(name: &str) -> String {
    name.to_ascii_lowercase().replace('_', "-")
}

/// 결과 목록 부속물. 부속물이 없으면 "아직 정하지 않음"입니다.
struct ActiveList(Option<SessionList>);

#[derive(Debug)]
pub struct Qrequest {
    method: Method,
    navigation: NavigationState,
    page: String,
    path: Option<String>,
    referrer: Option<String>,
    headers: HashMap<String, String>,
    cookies: HashMap<String, String>,
    params: ParameterStore,
    files: FileRegistry,
    annexes: AnnexRegistry,
    body: BodyAccessor,
    qsession: Qsession,
    conf: Option<Arc<Config>>,
    user: Contact,
    token_approved: bool,
    post_empty: bool,
    outgoing_cookies: Vec<::cookie::Cookie<'static>>,
    // 업로드 임시 파일은 요청과 함께 지워집니다
    _upload_spool: Option<upload::UploadSpool>,
}

impl Qrequest {
    pub fn new(method: Method, navigation: NavigationState) -> Self {
        Self {
            method,
            page: navigation.page.clone(),
            path: Some(navigation.path.clone()),
            navigation,
            referrer: None,
            headers: HashMap::new(),
            cookies: HashMap::new(),
            params: ParameterStore::new(),
            files: FileRegistry::default(),
            annexes: AnnexRegistry::default(),
            body: BodyAccessor::none(),
            qsession: Qsession::new(),
            conf: None,
            user: Contact::guest(),
            token_approved: false,
            post_empty: false,
            outgoing_cookies: Vec::new(),
            _upload_spool: None,
        }
    }

    // ── 메서드 / 경로 ──

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn is_get(&self) -> bool {
        self.method == Method::Get
    }

    pub fn is_post(&self) -> bool {
        self.method == Method::Post
    }

    pub fn is_head(&self) -> bool {
        self.method == Method::Head
    }

    pub fn navigation(&self) -> &NavigationState {
        &self.navigation
    }

    pub fn set_navigation(&mut self, navigation: NavigationState) -> &mut Self {
        self.page = navigation.page.clone();
        self.path = Some(navigation.path.clone());
        self.navigation = navigation;
        self
    }

    pub fn page(&self) -> &str {
        &self.page
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn set_page(&mut self, page: impl Into<String>, path: Option<String>) -> &mut Self {
        self.page = page.into();
        self.path = path;
        self
    }

    pub fn path_component(&self, n: usize, decoded: bool) -> Option<String> {
        path_component(self.path.as_deref()?, n, decoded)
    }

    pub fn referrer(&self) -> Option<&str> {
        self.referrer.as_deref()
    }

    pub fn set_referrer(&mut self, referrer: Option<String>) -> &mut Self {
        self.referrer = referrer;
        self
    }

    // ── 사이트 컨텍스트 / 사용자 ──

    pub fn conf(&self) -> Option<&Config> {
        self.conf.as_deref()
    }

    pub fn set_conf(&mut self, conf: Arc<Config>) -> &mut Self {
        self.conf = Some(conf);
        self
    }

    pub fn user(&self) -> &Contact {
        &self.user
    }

    pub fn set_user(&mut self, user: Contact) -> &mut Self {
        self.user = user;
        self
    }

    // ── 헤더 / 수신 쿠키 ──

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&header_key(name)).map(String::as_str)
    }

    pub fn set_header(&mut self, name: &str, value: Option<String>) {
        let key = header_key(name);
        match value {
            Some(v) => {
                self.headers.insert(key, v);
            }
            None => {
                self.headers.remove(&key);
            }
        }
    }

    /// 요청에 실려 온 쿠키 값
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub(crate) fn set_incoming_cookie(&mut self, name: String, value: String) {
        self.cookies.insert(name, value);
    }

    // ── 본문 ──

    pub fn has_body(&self) -> bool {
        !self.body.is_none()
    }

    pub(crate) fn set_body_source(&mut self, body: BodyAccessor) {
        self.body = body;
    }

    /// 본문 전체. 스트림은 처음 호출할 때 한 번만 읽습니다.
    pub async fn body(&mut self) -> Option<&Bytes> {
        self.body.content().await
    }

    /// 본문을 담은 임시 파일. 확장자를 주지 않으면 `Content-Type`에서 고릅니다.
    pub async fn body_filename(&mut self, extension: Option<&str>) -> Option<&Path> {
        let extension = match extension {
            Some(ext) => ext.to_string(),
            None => mimetype::extension(self.header("content-type")),
        };
        let dir = self.tmp_dir();
        self.body.filename(&dir, &extension).await
    }

    /// 선언된 `Content-Type`이 있으면 그것을, 없으면 본문 앞부분으로 추정합니다.
    pub async fn body_content_type(&mut self) -> Option<String> {
        if self.body.is_none() {
            return None;
        }
        let declared = self.header("content-type").map(mimetype::base_type);
        if let Some(ct) = declared.filter(|ct| !ct.is_empty()) {
            return Some(ct);
        }
        let prefix = self.body.prefix().await.unwrap_or_default();
        mimetype::sniff(&prefix).map(str::to_string)
    }

    pub fn set_body(&mut self, content: impl Into<Bytes>, content_type: Option<&str>) -> &mut Self {
        self.body.set(content.into());
        if let Some(ct) = content_type {
            self.set_header("content-type", Some(ct.to_string()));
        }
        self
    }

    fn tmp_dir(&self) -> PathBuf {
        self.conf
            .as_ref()
            .map(|c| c.tmp_dir.clone())
            .unwrap_or_else(|| std::env::temp_dir().join("confreq"))
    }

    // ── 파라미터 ──

    pub fn params(&self) -> &ParameterStore {
        &self.params
    }

    pub(crate) fn params_mut(&mut self) -> &mut ParameterStore {
        &mut self.params
    }

    pub fn has(&self, name: &str) -> bool {
        self.params.has(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.params.contains(name)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.params.set(name, value);
        self
    }

    pub fn unset(&mut self, name: &str) -> &mut Self {
        self.params.unset(name);
        self
    }

    pub fn has_a(&self, name: &str) -> bool {
        self.params.has_a(name)
    }

    pub fn get_a(&self, name: &str) -> Option<&[String]> {
        self.params.get_a(name)
    }

    pub fn set_a(&mut self, name: impl Into<String>, list: Vec<String>) -> &mut Self {
        self.params.set_a(name, list);
        self
    }

    /// 스칼라든 리스트든 받아서 알맞은 쪽에 저장합니다.
    pub fn set_req(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> &mut Self {
        self.params.set_req(name, value);
        self
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.params.keys()
    }

    pub fn count(&self) -> usize {
        self.params.len()
    }

    pub fn as_map(&self) -> Map<String, Value> {
        self.params.to_json()
    }

    pub fn subset_as_map(&self, keys: &[&str]) -> Map<String, Value> {
        self.params.subset_to_json(keys)
    }

    /// 파라미터를 타입이 정해진 구조체로 읽습니다.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, AppError> {
        self.params
            .deserialize()
            .map_err(|e| AppError::BadRequest(format!("Invalid parameters: {}", e)))
    }

    // ── 업로드 파일 ──

    pub fn files(&self) -> &FileRegistry {
        &self.files
    }

    pub fn has_files(&self) -> bool {
        !self.files.is_empty()
    }

    pub fn has_file(&self, name: &str) -> bool {
        self.files.contains(name)
    }

    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.files.get(name)
    }

    pub fn set_file(&mut self, name: impl Into<String>, file: UploadedFile) -> &mut Self {
        self.files.insert(name, file);
        self
    }

    /// 메모리 내용을 업로드 파일처럼 등록합니다.
    pub fn set_file_content(
        &mut self,
        name: &str,
        content: impl Into<Bytes>,
        filename: Option<String>,
        mimetype: Option<String>,
    ) -> &mut Self {
        let filename = filename.unwrap_or_else(|| format!("__set_file_content.{}", name));
        self.files
            .insert(name, UploadedFile::in_memory(filename, mimetype, content.into()));
        self
    }

    pub fn file_filename(&self, name: &str) -> Option<&str> {
        self.files.get(name).map(|f| f.name.as_str())
    }

    pub fn file_size(&self, name: &str) -> Option<u64> {
        self.files.get(name).map(|f| f.size)
    }

    pub async fn file_contents(&self, name: &str, offset: u64, maxlen: Option<u64>) -> Option<Bytes> {
        self.files.get(name)?.contents(offset, maxlen).await
    }

    pub(crate) fn install_uploads(&mut self, files: FileRegistry, spool: upload::UploadSpool) {
        self.files = files;
        self._upload_spool = Some(spool);
    }

    // ── 부속물 ──

    pub fn annexes(&self) -> &AnnexRegistry {
        &self.annexes
    }

    pub fn has_annexes(&self) -> bool {
        !self.annexes.is_empty()
    }

    pub fn has_annex(&self, name: &str) -> bool {
        self.annexes.contains(name)
    }

    pub fn annex<T: std::any::Any>(&self, name: &str) -> Option<&T> {
        self.annexes.get(name)
    }

    pub fn annex_mut<T: std::any::Any>(&mut self, name: &str) -> Option<&mut T> {
        self.annexes.get_mut(name)
    }

    /// 이름과 타입이 맞지 않으면 요청을 중단시키는 `AppError::BadAnnex`
    pub fn checked_annex<T: std::any::Any>(&self, name: &str) -> Result<&T, AppError> {
        self.annexes.checked(name)
    }

    pub fn set_annex<T: std::any::Any + Send + Sync>(&mut self, name: impl Into<String>, value: T) {
        self.annexes.set(name, value);
    }

    pub fn has_active_list(&self) -> bool {
        self.annexes
            .get::<ActiveList>(ACTIVE_LIST_ANNEX)
            .is_some_and(|a| a.0.is_some())
    }

    pub fn active_list(&self) -> Option<&SessionList> {
        self.annexes.get::<ActiveList>(ACTIVE_LIST_ANNEX)?.0.as_ref()
    }

    /// 결과 목록은 요청당 한 번만 정할 수 있습니다 (None으로 정하는 것 포함).
    pub fn set_active_list(&mut self, list: Option<SessionList>) -> Result<(), AppError> {
        if self.annexes.contains(ACTIVE_LIST_ANNEX) {
            return Err(AppError::Internal("Active list already set".to_string()));
        }
        self.annexes.set(ACTIVE_LIST_ANNEX, ActiveList(list));
        Ok(())
    }

    // ── 토큰 ──

    pub fn approve_token(&mut self) -> &mut Self {
        self.token_approved = true;
        self
    }

    pub fn valid_token(&self) -> bool {
        self.token_approved
    }

    pub fn valid_post(&self) -> bool {
        self.token_approved && self.is_post()
    }

    pub fn set_post_empty(&mut self) {
        self.post_empty = true;
    }

    pub fn post_empty(&self) -> bool {
        self.post_empty
    }

    /// 권한 표현식 하나를 판정합니다. 모르는 표현식이면 None.
    pub fn xt_allow(&self, e: &str) -> Option<bool> {
        match e {
            "post" => Some(self.valid_post()),
            "anypost" => Some(self.is_post()),
            "getpost" => Some(
                matches!(self.method, Method::Get | Method::Post | Method::Head)
                    && self.token_approved,
            ),
            "get" => Some(self.is_get()),
            "head" => Some(self.is_head()),
            _ => e.strip_prefix("req.").map(|name| self.has(name)),
        }
    }

    // ── 세션 ──

    pub fn qsession(&self) -> &Qsession {
        &self.qsession
    }

    pub fn set_qsession(&mut self, qsession: Qsession) -> &mut Self {
        self.qsession = qsession;
        self
    }

    pub fn open_session(&mut self) {
        self.qsession.open();
    }

    pub fn qsid(&self) -> Option<&str> {
        self.qsession.sid()
    }

    pub fn has_gsession(&self, key: &str) -> bool {
        self.qsession.has(key)
    }

    pub fn gsession(&self, key: &str) -> Option<&Value> {
        self.qsession.get(key)
    }

    pub fn set_gsession(&mut self, key: &str, value: Value) {
        self.qsession.set(key, value);
    }

    pub fn unset_gsession(&mut self, key: &str) {
        self.qsession.unset(key);
    }

    pub fn clear_gsession(&mut self) {
        self.qsession.clear();
    }

    fn session_key(&self) -> Option<&str> {
        self.conf.as_ref()?.session_key.as_deref()
    }

    /// 사이트 네임스페이스(`session_key`) 아래의 세션 값.
    /// `session_key`가 없으면 항상 false/None이고, 쓰기는 무시됩니다.
    pub fn has_csession(&self, key: &str) -> bool {
        self.session_key()
            .is_some_and(|ns| self.qsession.has2(ns, key))
    }

    pub fn csession(&self, key: &str) -> Option<&Value> {
        self.qsession.get2(self.session_key()?, key)
    }

    pub fn set_csession(&mut self, key: &str, value: Value) {
        if let Some(ns) = self.conf.as_ref().and_then(|c| c.session_key.as_deref()) {
            self.qsession.set2(ns, key, value);
        }
    }

    pub fn unset_csession(&mut self, key: &str) {
        if let Some(ns) = self.conf.as_ref().and_then(|c| c.session_key.as_deref()) {
            self.qsession.unset2(ns, key);
        }
    }

    /// 폼에 넣을 post 토큰. 세션이 없으면 먼저 엽니다.
    pub fn post_value(&mut self) -> String {
        self.qsession.open();
        self.maybe_post_value()
    }

    pub fn maybe_post_value(&self) -> String {
        self.qsession.post_token()
    }

    // ── 응답 쿠키 ──

    pub fn set_cookie_opt(&mut self, name: &str, value: &str, opt: CookieOptions) {
        let defaults = CookieDefaults::from_config(self.conf(), Some(&self.navigation.base_path));
        self.outgoing_cookies
            .push(build_cookie(name, value, opt, &defaults));
    }

    pub fn set_cookie(&mut self, name: &str, value: &str, expires_at: i64) {
        self.set_cookie_opt(
            name,
            value,
            CookieOptions {
                expires: expires_at,
                ..Default::default()
            },
        );
    }

    pub fn set_httponly_cookie(&mut self, name: &str, value: &str, expires_at: i64) {
        self.set_cookie_opt(
            name,
            value,
            CookieOptions {
                expires: expires_at,
                httponly: true,
                ..Default::default()
            },
        );
    }

    pub fn outgoing_cookies(&self) -> &[::cookie::Cookie<'static>] {
        &self.outgoing_cookies
    }

    /// 요청을 마무리합니다.
    ///
    /// 세션이 바뀌었으면 저장하고, 새로 연 세션이면 세션 쿠키를 붙인 뒤
    /// 쌓인 `Set-Cookie`를 응답에 추가합니다.
    pub async fn respond(
        mut self,
        pool: &SqlitePool,
        body: impl IntoResponse,
    ) -> Result<Response, AppError> {
        if let Some(sid) = self.qsession.sid().filter(|_| self.qsession.is_modified()) {
            db::save_session(pool, sid, self.qsession.data()).await?;
        }

        if self.qsession.is_fresh() {
            if let Some(sid) = self.qsession.sid().map(str::to_string) {
                let (name, lifetime) = self
                    .conf()
                    .map(|c| (c.session_name.clone(), c.session_lifetime))
                    .unwrap_or_else(|| {
                        let d = Config::default();
                        (d.session_name, d.session_lifetime)
                    });
                let expires = chrono::Utc::now().timestamp() + lifetime;
                self.set_httponly_cookie(&name, &sid, expires);
            }
        }

        let mut response = body.into_response();
        for cookie in &self.outgoing_cookies {
            match HeaderValue::from_str(&cookie.to_string()) {
                Ok(v) => {
                    response.headers_mut().append(SET_COOKIE, v);
                }
                Err(e) => tracing::error!("Cannot encode cookie {}: {}", cookie.name(), e),
            }
        }
        Ok(response)
    }
}
