//! # 요청 부속물(annex) 레지스트리
//!
//! 클라이언트 파라미터가 아닌, 요청 처리 중에 계산된 상태를 담는 곳입니다.
//! (예: 업로드 오류 목록, 현재 결과 목록)
//!
//! 값은 아무 타입이나 될 수 있으며 꺼낼 때 타입을 지정합니다.
//! `checked_annex`로 잘못된 타입을 요구하는 것은 프로그래머 계약 위반이므로
//! `AppError::BadAnnex`로 요청 전체를 중단시킵니다.

use std::any::Any;
use std::collections::HashMap;

use crate::error::AppError;

#[derive(Default)]
pub struct AnnexRegistry {
    entries: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl std::fmt::Debug for AnnexRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

impl AnnexRegistry {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// 이름과 타입이 모두 맞을 때만 Some
    pub fn get<T: Any>(&self, name: &str) -> Option<&T> {
        self.entries.get(name)?.downcast_ref::<T>()
    }

    pub fn get_mut<T: Any>(&mut self, name: &str) -> Option<&mut T> {
        self.entries.get_mut(name)?.downcast_mut::<T>()
    }

    pub fn checked<T: Any>(&self, name: &str) -> Result<&T, AppError> {
        self.get::<T>(name)
            .ok_or_else(|| AppError::BadAnnex(name.to_string()))
    }

    pub fn set<T: Any + Send + Sync>(&mut self, name: impl Into<String>, value: T) {
        self.entries.insert(name.into(), Box::new(value));
    }

    pub fn remove(&mut self, name: &str) {
        self.entries.remove(name);
    }
}
