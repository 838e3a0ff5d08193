//! 指纹服务 - 业务能力层
//!
//! 只负责"去重签名"能力，不关心流程
//!
//! 归一化规则：
//! - 答案：转小写后仅保留字母数字
//! - 符号签名：谜面中非文字字形（emoji 等）的有序序列
//! - 模式分类：由生成器给出，此处视为不透明字符串
//!
//! hash = SHA-256(归一化答案 | 符号签名 | 模式分类)。
//! `is_unique` 只是避免浪费质量评分的快速预检；
//! 真正的唯一性保证是存储层 `fingerprints.hash` 上的唯一索引。

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::StoreError;
use crate::infrastructure::PuzzleStore;
use crate::models::{Fingerprint, PuzzleCandidate};

/// 指纹服务
///
/// 职责：
/// - 计算候选谜题的去重指纹
/// - 提供指纹快速预检
/// - 只处理单个候选
/// - 不关心流程顺序
pub struct FingerprintService;

impl FingerprintService {
    /// 创建新的指纹服务
    pub fn new() -> Self {
        Self
    }

    /// 计算候选谜题的指纹
    pub fn compute(&self, candidate: &PuzzleCandidate) -> Fingerprint {
        self.compute_salted(candidate, None)
    }

    /// 计算带盐指纹
    ///
    /// 兜底池谜题会在多个日期复用同一内容，
    /// 用日期做盐让每条记录仍满足"指纹与记录一一对应"的约束
    pub fn compute_salted(&self, candidate: &PuzzleCandidate, salt: Option<&str>) -> Fingerprint {
        self.compute_parts(&candidate.content, &candidate.answer, &candidate.pattern_type, salt)
    }

    /// 从裸字段计算指纹（兜底谜题没有候选结构时使用）
    pub fn compute_parts(
        &self,
        content: &str,
        answer: &str,
        pattern_type: &str,
        salt: Option<&str>,
    ) -> Fingerprint {
        let normalized_answer = normalize_answer(answer);
        let symbol_signature = symbol_signature(content);

        let mut hasher = Sha256::new();
        hasher.update(normalized_answer.as_bytes());
        hasher.update(b"|");
        hasher.update(symbol_signature.as_bytes());
        hasher.update(b"|");
        hasher.update(pattern_type.as_bytes());
        if let Some(salt) = salt {
            hasher.update(b"|");
            hasher.update(salt.as_bytes());
        }
        let hash = format!("{:x}", hasher.finalize());

        debug!("指纹计算完成: {} (答案: {})", &hash[..16], normalized_answer);

        Fingerprint {
            hash,
            normalized_answer,
            symbol_signature,
            pattern_type: pattern_type.to_string(),
        }
    }

    /// 指纹是否未在历史中出现过（快速预检）
    pub fn is_unique(
        &self,
        store: &PuzzleStore,
        fingerprint: &Fingerprint,
    ) -> Result<bool, StoreError> {
        Ok(!store.fingerprint_exists(&fingerprint.hash)?)
    }
}

impl Default for FingerprintService {
    fn default() -> Self {
        Self::new()
    }
}

/// 答案归一化：小写、仅保留字母数字
fn normalize_answer(answer: &str) -> String {
    answer
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// 提取谜面中的符号签名：非文字、非空白、非 ASCII 标点的字形有序序列
fn symbol_signature(content: &str) -> String {
    content
        .chars()
        .filter(|c| !c.is_alphanumeric() && !c.is_whitespace() && !c.is_ascii_punctuation())
        .collect()
}
