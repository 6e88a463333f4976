use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contact {
    pub id: Option<i64>,
    pub email: Option<String>,
    pub is_pc: bool,
    pub is_chair: bool,
}

impl Contact {
    pub fn guest() -> Self {
        Self {
            id: None,
            email: None,
            is_pc: false,
            is_chair: false,
        }
    }

    pub fn is_guest(&self) -> bool {
        self.id.is_none()
    }

    /// `~~tag`는 의장 전용, `<id>~tag`는 해당 사용자의 개인 태그입니다.
    pub fn can_edit_tag_anno(&self, tag: &str) -> bool {
        if self.is_chair {
            return true;
        }
        if !self.is_pc {
            return false;
        }
        match tag.find('~') {
            Some(0) => !tag.starts_with("~~"),
            Some(pos) => self.id.map(|id| id.to_string()).as_deref() == Some(&tag[..pos]),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pc(id: i64) -> Contact {
        Contact {
            id: Some(id),
            email: None,
            is_pc: true,
            is_chair: false,
        }
    }

    #[test]
    fn tag_anno_permissions() {
        assert!(!Contact::guest().can_edit_tag_anno("order"));
        assert!(pc(5).can_edit_tag_anno("order"));
        assert!(pc(5).can_edit_tag_anno("5~mine"));
        assert!(!pc(5).can_edit_tag_anno("6~theirs"));
        assert!(!pc(5).can_edit_tag_anno("~~chair"));

        let chair = Contact {
            is_chair: true,
            ..pc(1)
        };
        assert!(chair.can_edit_tag_anno("~~chair"));
        assert!(chair.can_edit_tag_anno("6~theirs"));
    }
}
