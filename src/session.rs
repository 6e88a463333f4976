//! # 2단계 세션 저장소 (Qsession)
//!
//! 세션 ID(`sid`)로 식별되는 중첩 맵입니다.
//!
//! ## 네임스페이스
//! - 최상위 키: "전역" 세션 값 (`has`/`get`/`set`/`unset`)
//! - 2단계: 호출자가 고른 네임스페이스 아래의 값 (`has2`/`get2`/`set2`/`unset2`)
//!   같은 세션 데이터를 공유하는 여러 애플리케이션(테넌트)이 서로 충돌하지 않게 합니다.
//!
//! ## 상태
//! ```text
//! 미개설(sid 없음) ──open()──▶ 개설(sid 있음) ──clear()──▶ 비어 있음(sid 유지)
//! ```
//! 세션 데이터 자체는 요청이 소유하고, 요청이 끝날 때 변경된 경우에만
//! `db::save_session`으로 공유 저장소에 기록됩니다 (마지막 기록이 이김).

use rand_core::{OsRng, RngCore};
use serde_json::{Map, Value};

/// 세션이 없을 때의 post 토큰. 빈 문자열과 구별됩니다.
pub const NO_SESSION_TOKEN: &str = ".empty";

const SID_BYTES: usize = 24;

#[derive(Debug, Clone, Default)]
pub struct Qsession {
    sid: Option<String>,
    data: Map<String, Value>,
    modified: bool,
    fresh: bool,
}

impl Qsession {
    pub fn new() -> Self {
        Self::default()
    }

    /// 저장소에서 읽어 온 기존 세션
    pub fn restore(sid: String, data: Map<String, Value>) -> Self {
        Self {
            sid: Some(sid),
            data,
            modified: false,
            fresh: false,
        }
    }

    pub fn sid(&self) -> Option<&str> {
        self.sid.as_deref()
    }

    pub fn is_open(&self) -> bool {
        self.sid.is_some()
    }

    /// 이번 요청에서 새로 열린 세션인지 (세션 쿠키를 보내야 하는지)
    pub fn is_fresh(&self) -> bool {
        self.fresh
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// 세션을 엽니다. 이미 열려 있으면 아무것도 하지 않습니다.
    ///
    /// 새로 열었으면 true.
    pub fn open(&mut self) -> bool {
        if self.sid.is_some() {
            return false;
        }
        self.sid = Some(new_sid());
        self.fresh = true;
        self.modified = true;
        true
    }

    pub fn has(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// 값을 기록합니다. 세션이 아직 없으면 먼저 엽니다.
    pub fn set(&mut self, key: &str, value: Value) {
        self.open();
        self.data.insert(key.to_string(), value);
        self.modified = true;
    }

    pub fn unset(&mut self, key: &str) {
        if self.data.remove(key).is_some() {
            self.modified = true;
        }
    }

    /// 두 단계 모두를 비웁니다. sid는 유지됩니다.
    pub fn clear(&mut self) {
        if self.sid.is_some() || !self.data.is_empty() {
            self.data.clear();
            self.modified = true;
        }
    }

    pub fn has2(&self, namespace: &str, key: &str) -> bool {
        self.namespace(namespace)
            .is_some_and(|ns| ns.contains_key(key))
    }

    pub fn get2(&self, namespace: &str, key: &str) -> Option<&Value> {
        self.namespace(namespace)?.get(key)
    }

    /// 네임스페이스 맵은 처음 기록할 때 만들어집니다.
    pub fn set2(&mut self, namespace: &str, key: &str, value: Value) {
        self.open();
        let slot = self
            .data
            .entry(namespace.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        if let Value::Object(ns) = slot {
            ns.insert(key.to_string(), value);
        }
        self.modified = true;
    }

    /// 마지막 키를 지우면 네임스페이스 맵도 사라집니다.
    pub fn unset2(&mut self, namespace: &str, key: &str) {
        let Some(Value::Object(ns)) = self.data.get_mut(namespace) else {
            return;
        };
        if ns.remove(key).is_some() {
            if ns.is_empty() {
                self.data.remove(namespace);
            }
            self.modified = true;
        }
    }

    /// 세션 ID에서 파생한 post 토큰
    pub fn post_token(&self) -> String {
        post_token(self.sid())
    }

    fn namespace(&self, namespace: &str) -> Option<&Map<String, Value>> {
        self.data.get(namespace)?.as_object()
    }
}

/// 세션 ID에서 post 토큰을 만듭니다.
///
/// - 16자보다 긴 ID: 8번째 문자부터 12자
/// - 그 외: 처음부터 12자
/// - ID가 없거나 비어 있으면 `NO_SESSION_TOKEN`
pub fn post_token(sid: Option<&str>) -> String {
    match sid {
        Some(sid) if !sid.is_empty() => {
            let start = if sid.chars().count() > 16 { 8 } else { 0 };
            let slice: String = sid.chars().skip(start).take(12).collect();
            url::form_urlencoded::byte_serialize(slice.as_bytes()).collect()
        }
        _ => NO_SESSION_TOKEN.to_string(),
    }
}

/// 새 세션 ID (24바이트 난수의 16진 표현)
pub fn new_sid() -> String {
    let mut bytes = [0u8; SID_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
