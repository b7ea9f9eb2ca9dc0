use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "coding_task_type", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum CodingTaskType {
    #[default]
    FillBlank,
    PredictOutput,
    Reorder,
    FixBug,
    Mcq,
}

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "difficulty", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "question_type", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum QuestionType {
    #[default]
    Mcq,
    PredictOutput,
}

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "writing_task_type", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum WritingTaskType {
    #[default]
    ExplainSolution,
    CodeComment,
    CommitMessage,
    RewriteProfessional,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Lesson {
    pub id: Uuid,
    pub mission_id: Uuid,
    pub content: String,
    pub estimated_time_10min: i32,
    pub estimated_time_20min: i32,
    pub estimated_time_30min: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct VocabWord {
    pub id: Uuid,
    pub mission_id: Uuid,
    pub word: String,
    pub meaning: String,
    pub example_sentence: Option<String>,
    pub category: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct CodingTask {
    pub id: Uuid,
    pub mission_id: Uuid,
    pub task_type: CodingTaskType,
    pub prompt: String,
    pub starter_code: Option<String>,
    pub expected_answer: String,
    pub explanation: Option<String>,
    pub options: Option<String>, // JSON array or loose comma list
    pub difficulty: Difficulty,
    pub order_index: i32,
    pub created_at: DateTime<Utc>,
}

impl CodingTask {
    pub fn parsed_options(&self) -> Vec<String> {
        parse_options(self.options.as_deref())
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct QuizQuestion {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub question_type: QuestionType,
    pub question_text: String,
    pub code_snippet: Option<String>,
    pub options: String,
    pub correct_answer: String,
    pub explanation: Option<String>,
    pub order_index: i32,
    pub created_at: DateTime<Utc>,
}

impl QuizQuestion {
    pub fn parsed_options(&self) -> Vec<String> {
        parse_options(Some(&self.options))
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct WritingTask {
    pub id: Uuid,
    pub mission_id: Uuid,
    pub task_type: WritingTaskType,
    pub prompt: String,
    pub context: Option<String>,
    pub min_words: i32,
    pub max_words: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct WritingSubmission {
    pub id: Uuid,
    pub user_id: String,
    pub writing_task_id: Uuid,
    pub submission_text: String,
    pub word_count: i32,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreateWritingSubmission {
    pub writing_task_id: Uuid,
    pub submission_text: String,
    pub word_count: i32,
}

impl WritingSubmission {
    pub async fn create(
        pool: &SqlitePool,
        user_id: &str,
        data: &CreateWritingSubmission,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, WritingSubmission>(
            r#"INSERT INTO english_writing_submissions (id, user_id, writing_task_id, submission_text, word_count)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING id, user_id, writing_task_id, submission_text, word_count, submitted_at"#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(data.writing_task_id)
        .bind(&data.submission_text)
        .bind(data.word_count)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_user(pool: &SqlitePool, user_id: &str) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, WritingSubmission>(
            r#"SELECT id, user_id, writing_task_id, submission_text, word_count, submitted_at
               FROM english_writing_submissions
               WHERE user_id = $1
               ORDER BY submitted_at ASC"#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }
}

/// Every authored content section stored for one mission. Sections may be empty.
#[derive(Debug, Clone, Default)]
pub struct StoredContent {
    pub lesson: Option<Lesson>,
    pub vocab_words: Vec<VocabWord>,
    pub coding_tasks: Vec<CodingTask>,
    pub quiz_questions: Vec<QuizQuestion>,
    pub writing_task: Option<WritingTask>,
}

impl StoredContent {
    pub async fn load(pool: &SqlitePool, mission_id: Uuid) -> Result<Self, sqlx::Error> {
        let lesson = sqlx::query_as::<_, Lesson>(
            r#"SELECT id, mission_id, content, estimated_time_10min, estimated_time_20min, estimated_time_30min, created_at
               FROM lessons
               WHERE mission_id = $1
               ORDER BY created_at ASC
               LIMIT 1"#,
        )
        .bind(mission_id)
        .fetch_optional(pool)
        .await?;

        let vocab_words = sqlx::query_as::<_, VocabWord>(
            r#"SELECT id, mission_id, word, meaning, example_sentence, category, created_at
               FROM vocab_words
               WHERE mission_id = $1
               ORDER BY created_at ASC"#,
        )
        .bind(mission_id)
        .fetch_all(pool)
        .await?;

        let coding_tasks = sqlx::query_as::<_, CodingTask>(
            r#"SELECT id, mission_id, task_type, prompt, starter_code, expected_answer, explanation, options, difficulty, order_index, created_at
               FROM coding_tasks
               WHERE mission_id = $1
               ORDER BY order_index ASC, created_at ASC"#,
        )
        .bind(mission_id)
        .fetch_all(pool)
        .await?;

        // Only the first quiz of a mission is used.
        let quiz_questions = sqlx::query_as::<_, QuizQuestion>(
            r#"SELECT id, quiz_id, question_type, question_text, code_snippet, options, correct_answer, explanation, order_index, created_at
               FROM quiz_questions
               WHERE quiz_id = (
                   SELECT id FROM quizzes WHERE mission_id = $1 ORDER BY created_at ASC LIMIT 1
               )
               ORDER BY order_index ASC, created_at ASC"#,
        )
        .bind(mission_id)
        .fetch_all(pool)
        .await?;

        let writing_task = sqlx::query_as::<_, WritingTask>(
            r#"SELECT id, mission_id, task_type, prompt, context, min_words, max_words, created_at
               FROM english_writing_tasks
               WHERE mission_id = $1
               ORDER BY created_at ASC
               LIMIT 1"#,
        )
        .bind(mission_id)
        .fetch_optional(pool)
        .await?;

        Ok(StoredContent {
            lesson,
            vocab_words,
            coding_tasks,
            quiz_questions,
            writing_task,
        })
    }
}

/// Parse an authored option list. Accepts a JSON array, or a loose list split
/// on newlines and on commas outside double quotes, with surrounding quotes
/// stripped from each item. Blank items are dropped.
pub fn parse_options(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Vec::new();
    };

    let json = raw
        .starts_with('[')
        .then(|| serde_json::from_str::<Vec<serde_json::Value>>(raw).ok())
        .flatten();
    if let Some(values) = json {
        return values
            .into_iter()
            .map(|value| match value {
                serde_json::Value::String(s) => s.trim().to_string(),
                other => other.to_string(),
            })
            .filter(|s| !s.is_empty())
            .collect();
    }

    let inner = raw.strip_prefix('[').unwrap_or(raw);
    let inner = inner.strip_suffix(']').unwrap_or(inner);

    let mut items = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for ch in inner.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            ',' if !in_quotes => items.push(std::mem::take(&mut current)),
            '\n' => items.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    items.push(current);

    items
        .iter()
        .map(|item| strip_quotes(item.trim()))
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn strip_quotes(item: &str) -> &str {
    let quotes: &[char] = &['"', '\'', '`'];
    let item = item.strip_prefix(quotes).unwrap_or(item);
    item.strip_suffix(quotes).unwrap_or(item).trim()
}
