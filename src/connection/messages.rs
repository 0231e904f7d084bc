//! 控制台消息定义
//!
//! 定义插件与后端之间的逻辑消息协议。字段名是契约的一部分：
//! 每条消息都携带 `type` 判别符和会话标识 `session_id`。
//!
//! ## 消息列表
//! - `console/create_session` - 建立会话订阅通道
//! - `console/input` - 转发终端输入
//! - `console/resize` - 通告终端几何尺寸

use serde::{Deserialize, Serialize};

/// 控制台消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ConsoleMessage {
    /// 建立会话订阅通道；后端通过同一通道持续推送原始输出帧
    #[serde(rename = "console/create_session")]
    CreateSession {
        /// 会话 ID
        session_id: String,
    },

    /// 终端输入数据块（文本，二进制按字节映射为字符）
    #[serde(rename = "console/input")]
    Input {
        /// 会话 ID
        session_id: String,
        /// 输入数据
        data: String,
    },

    /// 终端几何尺寸变化
    #[serde(rename = "console/resize")]
    Resize {
        /// 会话 ID
        session_id: String,
        /// 列数
        cols: u16,
        /// 行数
        rows: u16,
    },
}

impl ConsoleMessage {
    /// 获取消息携带的会话 ID
    pub fn session_id(&self) -> &str {
        match self {
            ConsoleMessage::CreateSession { session_id }
            | ConsoleMessage::Input { session_id, .. }
            | ConsoleMessage::Resize { session_id, .. } => session_id,
        }
    }

    /// 获取消息类型名称
    pub fn message_type(&self) -> &'static str {
        match self {
            ConsoleMessage::CreateSession { .. } => message_types::CREATE_SESSION,
            ConsoleMessage::Input { .. } => message_types::INPUT,
            ConsoleMessage::Resize { .. } => message_types::RESIZE,
        }
    }
}

/// 消息类型常量
pub mod message_types {
    /// 建立会话
    pub const CREATE_SESSION: &str = "console/create_session";
    /// 终端输入
    pub const INPUT: &str = "console/input";
    /// 终端尺寸变化
    pub const RESIZE: &str = "console/resize";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_session_wire_format() {
        let msg = ConsoleMessage::CreateSession {
            session_id: "abc".to_string(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "console/create_session",
                "session_id": "abc",
            })
        );
    }

    #[test]
    fn test_input_wire_format() {
        let msg = ConsoleMessage::Input {
            session_id: "abc".to_string(),
            data: "ls -la\n".to_string(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "console/input",
                "session_id": "abc",
                "data": "ls -la\n",
            })
        );
    }

    #[test]
    fn test_resize_wire_format() {
        let msg = ConsoleMessage::Resize {
            session_id: "abc".to_string(),
            cols: 80,
            rows: 24,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "console/resize",
                "session_id": "abc",
                "cols": 80,
                "rows": 24,
            })
        );
    }

    #[test]
    fn test_roundtrip_deserialize() {
        let json = r#"{"type":"console/resize","session_id":"s1","cols":120,"rows":40}"#;
        let msg: ConsoleMessage = serde_json::from_str(json).unwrap();
        assert_eq!(
            msg,
            ConsoleMessage::Resize {
                session_id: "s1".to_string(),
                cols: 120,
                rows: 40,
            }
        );
    }

    #[test]
    fn test_accessors() {
        let msg = ConsoleMessage::Input {
            session_id: "s1".to_string(),
            data: "a".to_string(),
        };
        assert_eq!(msg.session_id(), "s1");
        assert_eq!(msg.message_type(), message_types::INPUT);
    }
}
