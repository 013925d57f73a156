//! Value Objects
//!
//! 識別子・本文・料金などの不変な値。生成時にバリデーションを行い、
//! 不正な値がドメイン内に入り込まないようにする。

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// 本文の最大長（文字数）のデフォルト値
pub const DEFAULT_MAX_BODY_LENGTH: usize = 2000;

/// Value Object 生成時のバリデーションエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("message body must not be empty")]
    EmptyBody,
    #[error("message body exceeds {max} characters (got {actual})")]
    BodyTooLong { max: usize, actual: usize },
    #[error("terms note exceeds {max} characters (got {actual})")]
    NoteTooLong { max: usize, actual: usize },
    #[error("hourly rate must be greater than zero")]
    NonPositiveRate,
    #[error("a conversation needs two distinct participants")]
    SameParticipant,
}

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            pub const fn value(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }
    };
}

numeric_id!(
    /// ユーザー ID（認証基盤から渡される）
    UserId
);
numeric_id!(
    /// 会話 ID
    ConversationId
);
numeric_id!(
    /// メッセージ ID
    MessageId
);
numeric_id!(
    /// 応募（交渉レコード）ID
    ApplicationId
);
numeric_id!(
    /// 予約 ID
    ReservationId
);

/// WebSocket 接続ごとの識別子
///
/// 同じユーザーが複数タブから接続しても、接続単位で購読を管理できるようにする。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// 新しい接続 ID を生成
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unix タイムスタンプ（ミリ秒, UTC）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub const fn new(millis: i64) -> Self {
        Self(millis)
    }

    pub const fn value(self) -> i64 {
        self.0
    }

    /// RFC 3339 形式の文字列に変換
    pub fn to_rfc3339(self) -> String {
        nounou_shared::time::timestamp_to_rfc3339(self.0)
    }
}

/// メッセージ本文
///
/// 前後の空白を除去した上で、空でないこと・最大長以下であることを保証する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageBody(String);

impl MessageBody {
    /// デフォルトの最大長でバリデーションして生成
    pub fn new(raw: impl Into<String>) -> Result<Self, ValidationError> {
        Self::with_max_length(raw, DEFAULT_MAX_BODY_LENGTH)
    }

    /// 最大長を指定してバリデーションして生成
    pub fn with_max_length(raw: impl Into<String>, max: usize) -> Result<Self, ValidationError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyBody);
        }
        let actual = trimmed.chars().count();
        if actual > max {
            return Err(ValidationError::BodyTooLong { max, actual });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// システムメッセージ用（内部で組み立てた文字列なので検証しない）
    pub(crate) fn system(text: String) -> Self {
        Self(text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// 時給（ユーロセント単位）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HourlyRate(u32);

impl HourlyRate {
    pub fn from_cents(cents: u32) -> Result<Self, ValidationError> {
        if cents == 0 {
            return Err(ValidationError::NonPositiveRate);
        }
        Ok(Self(cents))
    }

    pub const fn cents(self) -> u32 {
        self.0
    }
}

impl fmt::Display for HourlyRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02} €/h", self.0 / 100, self.0 % 100)
    }
}

/// 交渉条件（時給と任意のメモ）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Terms {
    pub hourly_rate: HourlyRate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Terms {
    pub fn new(hourly_rate: HourlyRate, note: Option<String>) -> Self {
        let note = note
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        Self { hourly_rate, note }
    }

    /// メモはシステムメッセージにそのまま埋め込まれるため、本文と同じ上限を課す
    pub fn check_note_length(&self, max: usize) -> Result<(), ValidationError> {
        match self.note.as_deref().map(|note| note.chars().count()) {
            Some(actual) if actual > max => Err(ValidationError::NoteTooLong { max, actual }),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Terms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.note {
            Some(note) => write!(f, "{} ({})", self.hourly_rate, note),
            None => write!(f, "{}", self.hourly_rate),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_body_is_trimmed() {
        // テスト項目: 本文の前後の空白が除去される
        // given (前提条件):
        let raw = "  Bonjour  ";

        // when (操作):
        let body = MessageBody::new(raw).unwrap();

        // then (期待する結果):
        assert_eq!(body.as_str(), "Bonjour");
    }

    #[test]
    fn test_message_body_rejects_blank() {
        // テスト項目: 空白のみの本文はエラーになる
        // given (前提条件):
        let raw = "   \n\t";

        // when (操作):
        let result = MessageBody::new(raw);

        // then (期待する結果):
        assert_eq!(result, Err(ValidationError::EmptyBody));
    }

    #[test]
    fn test_message_body_counts_characters_not_bytes() {
        // テスト項目: 最大長はバイト数ではなく文字数で判定される
        // given (前提条件):
        let accented = "é".repeat(5);

        // when (操作):
        let ok = MessageBody::with_max_length(accented.clone(), 5);
        let too_long = MessageBody::with_max_length(format!("{accented}é"), 5);

        // then (期待する結果):
        assert!(ok.is_ok());
        assert_eq!(
            too_long,
            Err(ValidationError::BodyTooLong { max: 5, actual: 6 })
        );
    }

    #[test]
    fn test_hourly_rate_rejects_zero() {
        // テスト項目: 時給 0 は受け付けない
        // given (前提条件) / when (操作):
        let result = HourlyRate::from_cents(0);

        // then (期待する結果):
        assert_eq!(result, Err(ValidationError::NonPositiveRate));
    }

    #[test]
    fn test_terms_display_and_blank_note() {
        // テスト項目: 空のメモは None として扱われ、表示は €/h 形式になる
        // given (前提条件):
        let rate = HourlyRate::from_cents(1550).unwrap();

        // when (操作):
        let terms = Terms::new(rate, Some("   ".to_string()));

        // then (期待する結果):
        assert_eq!(terms.note, None);
        assert_eq!(terms.to_string(), "15.50 €/h");
    }

    #[test]
    fn test_terms_note_length_is_capped() {
        // テスト項目: メモが上限を超えると NoteTooLong、上限ちょうどなら通る
        // given (前提条件):
        let rate = HourlyRate::from_cents(1500).unwrap();
        let at_limit = Terms::new(rate, Some("é".repeat(10)));
        let too_long = Terms::new(rate, Some("é".repeat(11)));

        // when (操作):
        let ok = at_limit.check_note_length(10);
        let err = too_long.check_note_length(10);

        // then (期待する結果):
        assert_eq!(ok, Ok(()));
        assert_eq!(
            err,
            Err(ValidationError::NoteTooLong {
                max: 10,
                actual: 11
            })
        );
        assert_eq!(Terms::new(rate, None).check_note_length(0), Ok(()));
    }
}
