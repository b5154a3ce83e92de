//! 情绪状态追踪
//!
//! 基于触发词的简单情绪模型：用户输入命中触发词时切换主情绪，
//! 没有命中时延续最近的情绪或逐渐回落到中性。结果用于给系统提示词着色，
//! 以及作为记忆的情绪标签。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// 情绪历史最多保留的条数
const MAX_HISTORY: usize = 50;
/// 回溯最近情绪时查看的历史条数
const RECENT_WINDOW: usize = 10;
/// 每个命中的触发词带来的情绪偏移
const TRIGGER_SHIFT: f64 = 0.3;
/// 没有触发词时延续最近情绪的偏移
const CARRY_OVER_SHIFT: f64 = 0.2;
/// 文本分析时每个触发词的得分
const ANALYSIS_SCORE: f64 = 0.1;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EmotionType {
    Joy,
    Sadness,
    Anger,
    Fear,
    Surprise,
    Disgust,
    Curiosity,
    Excitement,
    Contentment,
    Neutral,
}

impl EmotionType {
    pub const ALL: [EmotionType; 10] = [
        EmotionType::Joy,
        EmotionType::Sadness,
        EmotionType::Anger,
        EmotionType::Fear,
        EmotionType::Surprise,
        EmotionType::Disgust,
        EmotionType::Curiosity,
        EmotionType::Excitement,
        EmotionType::Contentment,
        EmotionType::Neutral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionType::Joy => "joy",
            EmotionType::Sadness => "sadness",
            EmotionType::Anger => "anger",
            EmotionType::Fear => "fear",
            EmotionType::Surprise => "surprise",
            EmotionType::Disgust => "disgust",
            EmotionType::Curiosity => "curiosity",
            EmotionType::Excitement => "excitement",
            EmotionType::Contentment => "contentment",
            EmotionType::Neutral => "neutral",
        }
    }

    /// 该情绪的触发词
    pub fn triggers(&self) -> &'static [&'static str] {
        match self {
            EmotionType::Joy => &["happy", "great", "wonderful", "amazing", "love", "excited"],
            EmotionType::Sadness => &["sad", "hurt", "miss", "lost", "sorry", "unhappy"],
            EmotionType::Anger => &["angry", "mad", "frustrated", "annoyed", "hate", "upset"],
            EmotionType::Curiosity => &["wonder", "curious", "question", "why", "how", "learn"],
            _ => &[],
        }
    }
}

impl fmt::Display for EmotionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 强度描述词
fn intensity_label(intensity: f64) -> &'static str {
    if intensity < 0.4 {
        "slightly"
    } else if intensity < 0.7 {
        "moderately"
    } else {
        "very"
    }
}

/// 某一时刻的情绪状态
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmotionalState {
    pub primary: EmotionType,
    /// 0.0 - 1.0
    pub intensity: f64,
    pub secondary: BTreeMap<EmotionType, f64>,
    pub timestamp: DateTime<Utc>,
}

impl EmotionalState {
    pub fn neutral(intensity: f64) -> Self {
        Self {
            primary: EmotionType::Neutral,
            intensity,
            secondary: BTreeMap::new(),
            timestamp: Utc::now(),
        }
    }

    /// 记忆中使用的情绪标签，例如 `moderately_joy`
    pub fn label(&self) -> String {
        format!("{}_{}", intensity_label(self.intensity), self.primary)
    }
}

impl Default for EmotionalState {
    fn default() -> Self {
        Self::neutral(0.5)
    }
}

/// 情绪追踪器
#[derive(Debug, Clone, Default)]
pub struct EmotionTracker {
    current: EmotionalState,
    history: Vec<EmotionalState>,
}

impl EmotionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> &EmotionalState {
        &self.current
    }

    pub fn history(&self) -> &[EmotionalState] {
        &self.history
    }

    /// 根据用户输入更新情绪状态
    pub fn update(&mut self, input: &str) {
        let input_lower = input.to_lowercase();
        let mut shifts: BTreeMap<EmotionType, f64> = BTreeMap::new();

        for emotion in EmotionType::ALL {
            for trigger in emotion.triggers() {
                if input_lower.contains(trigger) {
                    *shifts.entry(emotion).or_insert(0.0) += TRIGGER_SHIFT;
                }
            }
        }

        if shifts.is_empty() {
            let recent = self.recent_emotion();
            if recent != EmotionType::Neutral {
                shifts.insert(recent, CARRY_OVER_SHIFT);
            }
        }

        // 并列时取枚举顺序靠前的情绪
        let strongest = shifts
            .iter()
            .fold(None::<(EmotionType, f64)>, |best, (&emotion, &score)| match best {
                Some((_, best_score)) if best_score >= score => best,
                _ => Some((emotion, score)),
            });

        match strongest {
            Some((primary, score)) => {
                shifts.remove(&primary);
                self.current = EmotionalState {
                    primary,
                    intensity: score.min(1.0),
                    secondary: shifts,
                    timestamp: Utc::now(),
                };
                debug!("Emotional state shifted to {}", self.current.label());

                self.history.push(self.current.clone());
                if self.history.len() > MAX_HISTORY {
                    let excess = self.history.len() - MAX_HISTORY;
                    self.history.drain(..excess);
                }
            }
            None if self.current.intensity > 0.3 => {
                self.current.intensity *= 0.8;
            }
            None => {
                self.current = EmotionalState::neutral(0.3);
            }
        }
    }

    /// 最近一次非中性的情绪
    fn recent_emotion(&self) -> EmotionType {
        self.history
            .iter()
            .rev()
            .take(RECENT_WINDOW)
            .map(|state| state.primary)
            .find(|&emotion| emotion != EmotionType::Neutral)
            .unwrap_or(EmotionType::Neutral)
    }

    /// 分析文本中的情绪成分
    pub fn analyze(text: &str) -> BTreeMap<EmotionType, f64> {
        let text_lower = text.to_lowercase();
        EmotionType::ALL
            .iter()
            .filter_map(|emotion| {
                let hits = emotion
                    .triggers()
                    .iter()
                    .filter(|trigger| text_lower.contains(*trigger))
                    .count();
                (hits > 0).then(|| (*emotion, (hits as f64 * ANALYSIS_SCORE).min(1.0)))
            })
            .collect()
    }

    /// 系统提示词中的情绪描述
    pub fn prompt_context(&self) -> String {
        let mut context = format!(
            "Current emotional state: {} {}",
            intensity_label(self.current.intensity),
            self.current.primary
        );

        let significant: Vec<String> = self
            .current
            .secondary
            .iter()
            .filter(|(_, intensity)| **intensity > 0.3)
            .map(|(emotion, intensity)| format!("{} ({:.1})", emotion, intensity))
            .collect();

        if !significant.is_empty() {
            context.push_str(&format!(". Also feeling: {}", significant.join(", ")));
        }

        context
    }

    pub fn memory_label(&self) -> String {
        self.current.label()
    }
}
