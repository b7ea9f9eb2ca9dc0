//! Mission content views, the built-in fallback curriculum, and answer checking.

use db::models::{
    mission_content::{
        CodingTask, CodingTaskType, Difficulty, Lesson, QuestionType, QuizQuestion, StoredContent,
        VocabWord, WritingTask, WritingTaskType,
    },
    user_profile::DailyMode,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;
use ts_rs::TS;
use uuid::Uuid;

use super::{catalog::DaySlot, progress_store::ProgressStore};

pub const DEFAULT_MIN_WORDS: i32 = 30;
pub const DEFAULT_MAX_WORDS: i32 = 150;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("coding task {0} not found")]
    CodingTaskNotFound(usize),
}

/// Minutes each step is expected to take for a daily mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
pub struct StepEstimates {
    pub lesson: i32,
    pub vocab: i32,
    pub coding: i32,
    pub quiz: i32,
    pub writing: i32,
}

impl StepEstimates {
    pub fn for_mode(mode: DailyMode) -> Self {
        let [lesson, vocab, coding, quiz, writing] = match mode {
            DailyMode::Ten => [3, 2, 2, 2, 1],
            DailyMode::Twenty => [5, 4, 5, 4, 2],
            DailyMode::Thirty => [8, 6, 8, 6, 2],
        };
        Self {
            lesson,
            vocab,
            coding,
            quiz,
            writing,
        }
    }

    pub fn total(&self) -> i32 {
        self.lesson + self.vocab + self.coding + self.quiz + self.writing
    }
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct LessonView {
    pub content: String,
    pub estimated_minutes: i32,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct VocabView {
    pub word: String,
    pub meaning: String,
    pub example_sentence: Option<String>,
    pub category: String,
}

/// A coding task as served to the learner. The expected answer is only
/// revealed by a check.
#[derive(Debug, Clone, Serialize, TS)]
pub struct CodingTaskView {
    pub task_type: CodingTaskType,
    pub prompt: String,
    pub starter_code: Option<String>,
    pub options: Vec<String>,
    pub difficulty: Difficulty,
    #[serde(skip)]
    pub expected_answer: String,
    #[serde(skip)]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct QuizQuestionView {
    pub question_type: QuestionType,
    pub question_text: String,
    pub code_snippet: Option<String>,
    pub options: Vec<String>,
    #[serde(skip)]
    pub correct_answer: String,
    #[serde(skip)]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct WritingTaskView {
    /// Catalog id; `None` for generated tasks, whose submissions are not recorded
    pub id: Option<Uuid>,
    pub task_type: WritingTaskType,
    pub prompt: String,
    pub context: Option<String>,
    pub min_words: i32,
    pub max_words: i32,
}

/// Which sections came from the store rather than the generated fallback
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, TS)]
pub struct ContentSources {
    pub lesson: bool,
    pub vocab: bool,
    pub coding: bool,
    pub quiz: bool,
    pub writing: bool,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct MissionContent {
    pub title: String,
    pub lesson: LessonView,
    pub vocab_words: Vec<VocabView>,
    pub coding_tasks: Vec<CodingTaskView>,
    pub quiz_questions: Vec<QuizQuestionView>,
    pub writing_task: WritingTaskView,
    pub estimates: StepEstimates,
    pub authored: ContentSources,
}

struct Topic {
    title: String,
    topic: &'static str,
    body: String,
    vocab: Vec<(&'static str, &'static str)>,
    task_prompt: &'static str,
    task_starter: &'static str,
    task_answer: &'static str,
}

/// Built-in curriculum for days without authored content
fn topic_for_day(day_number: i32) -> Topic {
    match day_number {
        4 => Topic {
            title: "Conditional Logic & If-Else".to_string(),
            topic: "If Statements",
            body: "## Making Decisions\nIn Python, we use `if` statements to run code only when certain conditions are met.\n\n```python\ntemperature = 25\nif temperature > 20:\n    print(\"It's a warm day!\")\nelse:\n    print(\"It's cold.\")\n```".to_string(),
            vocab: vec![("boolean", "True or False"), ("indentation", "Leading spaces")],
            task_prompt: "Write an if statement",
            task_starter: "x = 15\n___ x > 10:\n    print(\"Large\")",
            task_answer: "if",
        },
        5 => Topic {
            title: "Lists & Collections".to_string(),
            topic: "Python Lists",
            body: "## Intro to Lists\nLists store multiple items: `fruits = [\"apple\", \"banana\"]`".to_string(),
            vocab: vec![("index", "Position (starts at 0)")],
            task_prompt: "Add to a list",
            task_starter: "nums = [1]\nnums.___ (2)",
            task_answer: "append",
        },
        day => Topic {
            title: format!("Mission {day}: Python Mastery"),
            topic: "Advanced Basics",
            body: format!(
                "## Continuing Your Journey\nFocusing on core syntax and professional logic in Day {day}."
            ),
            vocab: vec![("logic", "Reasoning")],
            task_prompt: "Output a message",
            task_starter: "print(\"___\")",
            task_answer: "Hello",
        },
    }
}

/// Generated content for a day, used whole for placeholder slots and per
/// section for persisted missions with gaps.
pub fn virtual_content(day_number: i32, mode: DailyMode) -> MissionContent {
    let topic = topic_for_day(day_number);
    let estimates = StepEstimates::for_mode(mode);

    MissionContent {
        lesson: LessonView {
            content: format!("# {}\n\n{}", topic.title, topic.body),
            estimated_minutes: estimates.lesson,
        },
        vocab_words: topic
            .vocab
            .iter()
            .map(|(word, meaning)| VocabView {
                word: word.to_string(),
                meaning: meaning.to_string(),
                example_sentence: None,
                category: "programming".to_string(),
            })
            .collect(),
        coding_tasks: vec![CodingTaskView {
            task_type: CodingTaskType::FillBlank,
            prompt: topic.task_prompt.to_string(),
            starter_code: Some(topic.task_starter.to_string()),
            options: Vec::new(),
            difficulty: Difficulty::Easy,
            expected_answer: topic.task_answer.to_string(),
            explanation: Some("Correct!".to_string()),
        }],
        quiz_questions: vec![QuizQuestionView {
            question_type: QuestionType::Mcq,
            question_text: "Objective?".to_string(),
            code_snippet: None,
            options: vec![topic.topic.to_string()],
            correct_answer: topic.topic.to_string(),
            explanation: Some("Correct".to_string()),
        }],
        writing_task: WritingTaskView {
            id: None,
            task_type: WritingTaskType::ExplainSolution,
            prompt: format!("Summarize Day {day_number}"),
            context: None,
            min_words: 5,
            max_words: 50,
        },
        title: topic.title,
        estimates,
        authored: ContentSources::default(),
    }
}

impl From<&VocabWord> for VocabView {
    fn from(word: &VocabWord) -> Self {
        Self {
            word: word.word.clone(),
            meaning: word.meaning.clone(),
            example_sentence: word.example_sentence.clone(),
            category: word.category.clone(),
        }
    }
}

impl From<&CodingTask> for CodingTaskView {
    fn from(task: &CodingTask) -> Self {
        Self {
            task_type: task.task_type,
            prompt: task.prompt.clone(),
            starter_code: task.starter_code.clone(),
            options: task.parsed_options(),
            difficulty: task.difficulty,
            expected_answer: task.expected_answer.clone(),
            explanation: task.explanation.clone(),
        }
    }
}

impl From<&QuizQuestion> for QuizQuestionView {
    fn from(question: &QuizQuestion) -> Self {
        Self {
            question_type: question.question_type,
            question_text: question.question_text.clone(),
            code_snippet: question.code_snippet.clone(),
            options: question.parsed_options(),
            correct_answer: question.correct_answer.clone(),
            explanation: question.explanation.clone(),
        }
    }
}

impl From<&WritingTask> for WritingTaskView {
    fn from(task: &WritingTask) -> Self {
        Self {
            id: Some(task.id),
            task_type: task.task_type,
            prompt: task.prompt.clone(),
            context: task.context.clone(),
            min_words: task.min_words,
            max_words: task.max_words,
        }
    }
}

fn lesson_minutes(lesson: &Lesson, mode: DailyMode) -> i32 {
    match mode {
        DailyMode::Ten => lesson.estimated_time_10min,
        DailyMode::Twenty => lesson.estimated_time_20min,
        DailyMode::Thirty => lesson.estimated_time_30min,
    }
}

/// Overlay stored sections on the generated content for the slot's day.
/// Empty stored sections keep their generated counterpart.
pub fn assemble(slot: &DaySlot, stored: StoredContent, mode: DailyMode) -> MissionContent {
    let mut content = virtual_content(slot.day_number, mode);
    if !slot.is_placeholder() {
        content.title = slot.title.clone();
    }

    if let Some(lesson) = &stored.lesson {
        content.lesson = LessonView {
            content: lesson.content.clone(),
            estimated_minutes: lesson_minutes(lesson, mode),
        };
        content.authored.lesson = true;
    }
    if !stored.vocab_words.is_empty() {
        content.vocab_words = stored.vocab_words.iter().map(VocabView::from).collect();
        content.authored.vocab = true;
    }
    if !stored.coding_tasks.is_empty() {
        content.coding_tasks = stored.coding_tasks.iter().map(CodingTaskView::from).collect();
        content.authored.coding = true;
    }
    if !stored.quiz_questions.is_empty() {
        content.quiz_questions = stored.quiz_questions.iter().map(QuizQuestionView::from).collect();
        content.authored.quiz = true;
    }
    if let Some(task) = &stored.writing_task {
        content.writing_task = WritingTaskView::from(task);
        content.authored.writing = true;
    }

    content
}

/// Content for a slot. Placeholder slots get generated content; an unreadable
/// content store degrades to generated content too.
pub async fn load(store: &dyn ProgressStore, slot: &DaySlot, mode: DailyMode) -> MissionContent {
    let Some(mission_id) = slot.mission_ref.persisted_id() else {
        return virtual_content(slot.day_number, mode);
    };

    let stored = match store.load_content(mission_id).await {
        Ok(stored) => stored,
        Err(e) => {
            warn!(day = slot.day_number, "Failed to load mission content, using generated content: {}", e);
            StoredContent::default()
        }
    };
    assemble(slot, stored, mode)
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CodingAnswer {
    pub answer: String,
    /// Captured output of the learner's run, if they ran their code
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct CodingCheck {
    pub correct: bool,
    pub expected_answer: String,
    pub explanation: Option<String>,
}

/// Case-insensitive, trimmed match of the answer or the run output against the
/// expected answer. Output that contains the expected answer also counts.
pub fn is_coding_answer_correct(expected: &str, answer: &str, output: Option<&str>) -> bool {
    let expected = expected.trim().to_lowercase();
    let answer = answer.trim().to_lowercase();
    let output = output.unwrap_or_default().trim().to_lowercase();
    answer == expected || output == expected || output.contains(&expected)
}

impl MissionContent {
    pub fn check_coding(&self, index: usize, submission: &CodingAnswer) -> Result<CodingCheck, ContentError> {
        let task = self
            .coding_tasks
            .get(index)
            .ok_or(ContentError::CodingTaskNotFound(index))?;
        Ok(CodingCheck {
            correct: is_coding_answer_correct(
                &task.expected_answer,
                &submission.answer,
                submission.output.as_deref(),
            ),
            expected_answer: task.expected_answer.clone(),
            explanation: task.explanation.clone(),
        })
    }

    pub fn score_quiz(&self, answers: &[String]) -> QuizResult {
        score_quiz(&self.quiz_questions, answers)
    }

    pub fn check_writing(&self, text: &str) -> WritingCheck {
        check_writing(&self.writing_task, text)
    }
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct QuizAnswerResult {
    pub correct: bool,
    pub correct_answer: String,
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct QuizResult {
    pub score: i32,
    pub total: i32,
    pub percent: i32,
    pub answers: Vec<QuizAnswerResult>,
}

/// Exact-match scoring. A missing answer counts as wrong.
pub fn score_quiz(questions: &[QuizQuestionView], answers: &[String]) -> QuizResult {
    let results: Vec<QuizAnswerResult> = questions
        .iter()
        .enumerate()
        .map(|(i, question)| QuizAnswerResult {
            correct: answers.get(i).is_some_and(|a| *a == question.correct_answer),
            correct_answer: question.correct_answer.clone(),
            explanation: question.explanation.clone(),
        })
        .collect();

    let score = results.iter().filter(|r| r.correct).count() as i32;
    let total = results.len() as i32;
    let percent = if total > 0 {
        (f64::from(score) / f64::from(total) * 100.0).round() as i32
    } else {
        0
    };

    QuizResult {
        score,
        total,
        percent,
        answers: results,
    }
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct WritingCheck {
    pub word_count: i32,
    pub min_words: i32,
    pub max_words: i32,
    pub valid: bool,
}

pub fn word_count(text: &str) -> i32 {
    text.split_whitespace().count() as i32
}

pub fn check_writing(task: &WritingTaskView, text: &str) -> WritingCheck {
    let count = word_count(text);
    WritingCheck {
        word_count: count,
        min_words: task.min_words,
        max_words: task.max_words,
        valid: (task.min_words..=task.max_words).contains(&count),
    }
}
