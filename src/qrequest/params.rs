//! # 요청 파라미터 저장소
//!
//! 쿼리 문자열, 폼 본문에서 온 필드를 하나의 순서 있는 맵으로 보관합니다.
//!
//! 값은 `ParamValue::Scalar` 또는 `ParamValue::List` 중 하나입니다.
//! 한 키가 스칼라이면서 동시에 리스트일 수는 없습니다. 어느 쪽이든
//! 설정하면 다른 쪽은 사라집니다.
//!
//! `get()`은 리스트 항목에 대해 `ARRAY_MARKER`를 돌려줍니다.
//! 실제 리스트가 필요하면 `get_a()`를 써야 합니다.
//! 저장은 태그된 열거형으로 하므로, 클라이언트가 보낸 문자열이 우연히
//! `"__array__"`와 같더라도 리스트로 오인되지 않습니다 (`has_a()`는 false).

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// 리스트 항목에 대해 `get()`이 돌려주는 표시 문자열
pub const ARRAY_MARKER: &str = "__array__";

#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Scalar(String),
    List(Vec<String>),
}

impl ParamValue {
    pub fn to_json(&self) -> Value {
        match self {
            ParamValue::Scalar(s) => Value::String(s.clone()),
            ParamValue::List(l) => Value::Array(l.iter().cloned().map(Value::String).collect()),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Scalar(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Scalar(s)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(l: Vec<String>) -> Self {
        ParamValue::List(l)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParameterStore {
    values: IndexMap<String, ParamValue>,
}

impl ParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.has(name)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(|v| match v {
            ParamValue::Scalar(s) => s.as_str(),
            ParamValue::List(_) => ARRAY_MARKER,
        })
    }

    pub fn value(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values
            .insert(name.into(), ParamValue::Scalar(value.into()));
    }

    pub fn unset(&mut self, name: &str) {
        self.values.shift_remove(name);
    }

    pub fn has_a(&self, name: &str) -> bool {
        matches!(self.values.get(name), Some(ParamValue::List(_)))
    }

    pub fn get_a(&self, name: &str) -> Option<&[String]> {
        match self.values.get(name) {
            Some(ParamValue::List(l)) => Some(l),
            _ => None,
        }
    }

    pub fn set_a(&mut self, name: impl Into<String>, list: Vec<String>) {
        self.values.insert(name.into(), ParamValue::List(list));
    }

    pub fn set_req(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.values.insert(name.into(), value.into());
    }

    /// `name[]` 형태의 반복 필드를 리스트 끝에 추가합니다.
    /// 기존 값이 스칼라였다면 리스트로 바뀝니다.
    pub fn push_list(&mut self, name: &str, value: impl Into<String>) {
        match self.values.get_mut(name) {
            Some(ParamValue::List(l)) => l.push(value.into()),
            _ => {
                self.values
                    .insert(name.to_string(), ParamValue::List(vec![value.into()]));
            }
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn to_json(&self) -> Map<String, Value> {
        self.values
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect()
    }

    pub fn subset_to_json(&self, keys: &[&str]) -> Map<String, Value> {
        keys.iter()
            .filter_map(|k| self.values.get(*k).map(|v| (k.to_string(), v.to_json())))
            .collect()
    }

    /// 파라미터 전체를 타입이 정해진 구조체로 변환합니다.
    ///
    /// 알려진 필드는 구조체 필드로, 그 밖의 필드는 `get()`으로 읽습니다.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.to_json()))
    }

    /// `application/x-www-form-urlencoded` 문자열을 읽어 들입니다.
    ///
    /// `name[]`, `name[3]` 형태의 키는 `name` 리스트에 순서대로 쌓입니다.
    pub fn extend_from_urlencoded(&mut self, input: &[u8]) {
        for (key, value) in url::form_urlencoded::parse(input) {
            self.insert_field(&key, value.into_owned());
        }
    }

    /// 폼 필드 하나를 이름 규칙(`name[]`)에 맞춰 저장합니다.
    pub fn insert_field(&mut self, key: &str, value: String) {
        match list_field_name(key) {
            Some(base) => self.push_list(base, value),
            None => self.set(key, value),
        }
    }
}

/// `name[]`, `name[k]` → `Some("name")`
pub fn list_field_name(key: &str) -> Option<&str> {
    let open = key.find('[')?;
    if open > 0 && key.ends_with(']') {
        Some(&key[..open])
    } else {
        None
    }
}

/// `name[3]` → `Some(3)`. `name[]`이나 숫자가 아닌 키는 None입니다.
pub fn list_field_index(key: &str) -> Option<usize> {
    let base = list_field_name(key)?;
    key[base.len() + 1..key.len() - 1].parse().ok()
}
