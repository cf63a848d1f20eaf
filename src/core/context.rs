//! 操作者上下文：每次工具 / 存储调用显式携带，不存在全局「当前用户」

use serde::Serialize;

use crate::store::UserId;

/// 发起操作的用户
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Actor {
    pub user_id: UserId,
}

impl Actor {
    pub fn new(user_id: UserId) -> Self {
        Self { user_id }
    }
}
