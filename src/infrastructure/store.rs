//! 谜题存储 - 基础设施层
//!
//! 唯一持有 SQLite 连接的模块，只暴露能力（类型化查询、事务插入）。
//!
//! 正确性模型：跨进程的"每日一题"与"指纹全局唯一"两条不变量
//! 完全由存储层唯一索引保证（`puzzles.scheduled_for` 唯一、
//! `fingerprints.hash` 主键），应用层的预检查只是省钱的优化。

use std::path::Path;
use std::sync::Mutex;

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    DifficultyProfile, FallbackTier, Fingerprint, GenerationAttemptLog, GenerationMethod,
    PuzzleRecord, QualityMetrics, Verdict,
};

/// 谜题持久化存储
///
/// 职责：
/// - 持有稀缺资源（数据库连接），只暴露能力
/// - 谜题 + 指纹 + 评分 + 难度档案的原子插入
/// - 按日期查询、指纹快速预检
/// - 追加尝试日志
pub struct PuzzleStore {
    conn: Mutex<Connection>,
}

impl PuzzleStore {
    /// 打开（或创建）数据库文件
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(StoreError::from_sqlite)?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(StoreError::from_sqlite)?;
        conn.pragma_update(None, "synchronous", "NORMAL")
            .map_err(StoreError::from_sqlite)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.ensure_schema()?;
        Ok(store)
    }

    /// 打开内存数据库（测试用）
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(StoreError::from_sqlite)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.ensure_schema()?;
        Ok(store)
    }

    /// 借出底层连接执行任意操作
    ///
    /// 仅供诊断和测试使用，业务代码一律走类型化方法
    pub fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> T) -> Result<T, StoreError> {
        let conn = self.lock()?;
        Ok(f(&conn))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("数据库连接锁中毒".to_string()))
    }

    fn ensure_schema(&self) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS puzzles (
              id TEXT PRIMARY KEY,
              scheduled_for TEXT NOT NULL UNIQUE,
              content TEXT NOT NULL,
              answer TEXT NOT NULL,
              explanation TEXT NOT NULL,
              difficulty INTEGER NOT NULL,
              hints TEXT NOT NULL,
              generation_method TEXT NOT NULL,
              fallback_tier TEXT NOT NULL,
              ai_model TEXT,
              quality_score REAL,
              uniqueness_score REAL,
              created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS fingerprints (
              hash TEXT PRIMARY KEY,
              puzzle_id TEXT NOT NULL,
              normalized_answer TEXT NOT NULL,
              symbol_signature TEXT NOT NULL,
              pattern_type TEXT NOT NULL,
              FOREIGN KEY(puzzle_id) REFERENCES puzzles(id)
            );

            CREATE TABLE IF NOT EXISTS quality_metrics (
              puzzle_id TEXT PRIMARY KEY,
              clarity REAL NOT NULL,
              creativity REAL NOT NULL,
              solvability REAL NOT NULL,
              appropriateness REAL NOT NULL,
              visual_appeal REAL NOT NULL,
              educational_value REAL NOT NULL,
              fun_factor REAL NOT NULL,
              overall_score REAL NOT NULL,
              verdict TEXT NOT NULL,
              adversarial_passed INTEGER NOT NULL,
              FOREIGN KEY(puzzle_id) REFERENCES puzzles(id)
            );

            CREATE TABLE IF NOT EXISTS difficulty_profiles (
              puzzle_id TEXT PRIMARY KEY,
              proposed INTEGER NOT NULL,
              ai_tested INTEGER NOT NULL,
              rule_calculated INTEGER NOT NULL,
              calibrated INTEGER NOT NULL,
              visual_ambiguity INTEGER NOT NULL,
              cognitive_steps INTEGER NOT NULL,
              cultural_knowledge INTEGER NOT NULL,
              vocabulary_level INTEGER NOT NULL,
              pattern_novelty INTEGER NOT NULL,
              FOREIGN KEY(puzzle_id) REFERENCES puzzles(id)
            );

            CREATE TABLE IF NOT EXISTS generation_attempts (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              puzzle_id TEXT,
              scheduled_for TEXT NOT NULL,
              method TEXT NOT NULL,
              attempt INTEGER NOT NULL,
              candidates_seen INTEGER NOT NULL,
              elapsed_ms INTEGER NOT NULL,
              provider TEXT NOT NULL,
              model TEXT NOT NULL,
              estimated_tokens INTEGER NOT NULL,
              created_at TEXT NOT NULL
            );
            ",
        )
        .map_err(StoreError::from_sqlite)?;
        Ok(())
    }

    /// 按日期查询谜题记录
    pub fn find_by_date(&self, date: NaiveDate) -> Result<Option<PuzzleRecord>, StoreError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, scheduled_for, content, answer, explanation, difficulty, hints,
                    generation_method, fallback_tier, ai_model, quality_score,
                    uniqueness_score, created_at
             FROM puzzles WHERE scheduled_for = ?1",
            params![date],
            row_to_record,
        )
        .optional()
        .map_err(StoreError::from_sqlite)
    }

    /// 指纹快速预检（优化，非正确性机制）
    pub fn fingerprint_exists(&self, hash: &str) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let count: u32 = conn
            .query_row(
                "SELECT COUNT(*) FROM fingerprints WHERE hash = ?1",
                params![hash],
                |row| row.get(0),
            )
            .map_err(StoreError::from_sqlite)?;
        Ok(count > 0)
    }

    /// 原子插入：谜题 + 指纹 +（可选）质量评分 +（可选）难度档案
    ///
    /// 同一事务；任一唯一约束冲突回滚整体并返回 `StoreError::Conflict`
    pub fn insert_resolved(
        &self,
        record: &PuzzleRecord,
        fingerprint: &Fingerprint,
        metrics: Option<&QualityMetrics>,
        profile: Option<&DifficultyProfile>,
    ) -> Result<(), StoreError> {
        let hints_json = serde_json::to_string(&record.hints)
            .map_err(|e| StoreError::Query(e.to_string()))?;

        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(StoreError::from_sqlite)?;

        tx.execute(
            "INSERT INTO puzzles
               (id, scheduled_for, content, answer, explanation, difficulty, hints,
                generation_method, fallback_tier, ai_model, quality_score,
                uniqueness_score, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                record.id.to_string(),
                record.scheduled_for,
                record.content,
                record.answer,
                record.explanation,
                record.difficulty,
                hints_json,
                record.generation_method.as_str(),
                record.fallback_tier.as_str(),
                record.ai_model,
                record.quality_score,
                record.uniqueness_score,
                record.created_at,
            ],
        )
        .map_err(StoreError::from_sqlite)?;

        tx.execute(
            "INSERT INTO fingerprints (hash, puzzle_id, normalized_answer, symbol_signature, pattern_type)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                fingerprint.hash,
                record.id.to_string(),
                fingerprint.normalized_answer,
                fingerprint.symbol_signature,
                fingerprint.pattern_type,
            ],
        )
        .map_err(StoreError::from_sqlite)?;

        if let Some(m) = metrics {
            tx.execute(
                "INSERT INTO quality_metrics
                   (puzzle_id, clarity, creativity, solvability, appropriateness,
                    visual_appeal, educational_value, fun_factor, overall_score,
                    verdict, adversarial_passed)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    record.id.to_string(),
                    m.dimensions.clarity,
                    m.dimensions.creativity,
                    m.dimensions.solvability,
                    m.dimensions.appropriateness,
                    m.dimensions.visual_appeal,
                    m.dimensions.educational_value,
                    m.dimensions.fun_factor,
                    m.overall_score,
                    m.verdict.as_str(),
                    m.adversarial_passed,
                ],
            )
            .map_err(StoreError::from_sqlite)?;
        }

        if let Some(p) = profile {
            tx.execute(
                "INSERT INTO difficulty_profiles
                   (puzzle_id, proposed, ai_tested, rule_calculated, calibrated,
                    visual_ambiguity, cognitive_steps, cultural_knowledge,
                    vocabulary_level, pattern_novelty)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    record.id.to_string(),
                    p.proposed,
                    p.ai_tested,
                    p.rule_calculated,
                    p.calibrated,
                    p.visual_ambiguity,
                    p.cognitive_steps,
                    p.cultural_knowledge,
                    p.vocabulary_level,
                    p.pattern_novelty,
                ],
            )
            .map_err(StoreError::from_sqlite)?;
        }

        tx.commit().map_err(StoreError::from_sqlite)?;
        debug!(
            "落库成功: {} ({})",
            record.scheduled_for,
            record.generation_method.as_str()
        );
        Ok(())
    }

    /// 追加一条生成尝试日志
    pub fn insert_attempt_log(&self, log: &GenerationAttemptLog) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO generation_attempts
               (puzzle_id, scheduled_for, method, attempt, candidates_seen,
                elapsed_ms, provider, model, estimated_tokens, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                log.puzzle_id.map(|id| id.to_string()),
                log.scheduled_for,
                log.method,
                log.attempt,
                log.candidates_seen,
                log.elapsed_ms as i64,
                log.provider,
                log.model,
                log.estimated_tokens as i64,
                log.created_at,
            ],
        )
        .map_err(StoreError::from_sqlite)?;
        Ok(())
    }

    /// 某日期已落库的记录数（测试 / 诊断用）
    pub fn count_for_date(&self, date: NaiveDate) -> Result<u32, StoreError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT COUNT(*) FROM puzzles WHERE scheduled_for = ?1",
            params![date],
            |row| row.get(0),
        )
        .map_err(StoreError::from_sqlite)
    }

    /// 指纹总数（测试 / 诊断用）
    pub fn fingerprint_count(&self) -> Result<u32, StoreError> {
        let conn = self.lock()?;
        conn.query_row("SELECT COUNT(*) FROM fingerprints", [], |row| row.get(0))
            .map_err(StoreError::from_sqlite)
    }

    /// 读取某谜题的质量评分（测试 / 诊断用）
    pub fn find_metrics(&self, puzzle_id: Uuid) -> Result<Option<QualityMetrics>, StoreError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT clarity, creativity, solvability, appropriateness, visual_appeal,
                    educational_value, fun_factor, overall_score, verdict, adversarial_passed
             FROM quality_metrics WHERE puzzle_id = ?1",
            params![puzzle_id.to_string()],
            |row| {
                Ok(QualityMetrics {
                    dimensions: crate::models::DimensionScores {
                        clarity: row.get(0)?,
                        creativity: row.get(1)?,
                        solvability: row.get(2)?,
                        appropriateness: row.get(3)?,
                        visual_appeal: row.get(4)?,
                        educational_value: row.get(5)?,
                        fun_factor: row.get(6)?,
                    },
                    overall_score: row.get(7)?,
                    verdict: Verdict::from_str(&row.get::<_, String>(8)?),
                    adversarial_passed: row.get(9)?,
                })
            },
        )
        .optional()
        .map_err(StoreError::from_sqlite)
    }
}

/// 行 → 谜题记录
fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<PuzzleRecord> {
    let id_text: String = row.get(0)?;
    let hints_json: String = row.get(6)?;
    let method_text: String = row.get(7)?;
    let tier_text: String = row.get(8)?;

    Ok(PuzzleRecord {
        id: Uuid::parse_str(&id_text).unwrap_or_else(|_| Uuid::nil()),
        scheduled_for: row.get(1)?,
        content: row.get(2)?,
        answer: row.get(3)?,
        explanation: row.get(4)?,
        difficulty: row.get(5)?,
        hints: serde_json::from_str(&hints_json).unwrap_or_default(),
        generation_method: GenerationMethod::from_str(&method_text),
        fallback_tier: FallbackTier::from_str(&tier_text),
        ai_model: row.get(9)?,
        quality_score: row.get(10)?,
        uniqueness_score: row.get(11)?,
        created_at: row.get(12)?,
    })
}
