//! Module identity and the declared answer shapes of the five lesson days.
//!
//! Field names serialize in camelCase to stay compatible with blobs already
//! stored by the backend.
//!
//! # Invariants
//! - Reading a stored blob never discards what it holds: missing fields take
//!   their defaults, `null` text reads as empty, unknown keys are carried in
//!   `extra` and written back unchanged.
//! - After hydration every list is at least as long as its default.

use crate::model::answers::AnswerShape;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt::{Display, Formatter};

/// Lesson module (day) number.
///
/// Resolved once per page mount; a different day means a new session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModuleId(u32);

impl ModuleId {
    pub const fn new(day: u32) -> Self {
        Self(day)
    }

    /// Parses the route `day` segment, falling back to `page_day` when it is
    /// missing, non-numeric or zero.
    pub fn from_route(segment: Option<&str>, page_day: u32) -> Self {
        let parsed = segment
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .filter(|day| *day > 0);
        Self(parsed.unwrap_or(page_day))
    }

    pub fn day(self) -> u32 {
        self.0
    }
}

impl Display for ModuleId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn blanks(count: usize) -> Vec<String> {
    vec![String::new(); count]
}

/// Grows `items` with default entries up to `len`; longer lists are kept.
fn pad<T: Default + Clone>(items: &mut Vec<T>, len: usize) {
    if items.len() < len {
        items.resize(len, T::default());
    }
}

/// Reads a text answer; `null` is empty and numbers or booleans keep their
/// literal form.
fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(text),
        Value::Null => Ok(String::new()),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(flag.to_string()),
        other => Err(D::Error::custom(format!("expected text, found {other}"))),
    }
}

/// Reads a list of text answers; a `null` list is empty and `null` items are
/// empty strings.
fn text_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let items = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    items
        .into_iter()
        .map(|item| text(item).map_err(D::Error::custom))
        .collect()
}

/// Reads a list of rows; `null` rows take the row default.
fn rows<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    let items = Option::<Vec<Option<T>>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(items.into_iter().map(Option::unwrap_or_default).collect())
}

/// One analogy prompt on Day 1.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Analogy {
    #[serde(deserialize_with = "text")]
    pub analogy: String,
    #[serde(deserialize_with = "text")]
    pub why: String,
}

/// Day 1: genes, DNA and the central dogma.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Day1Answers {
    #[serde(deserialize_with = "text_list")]
    pub worksheet: Vec<String>,
    #[serde(deserialize_with = "rows")]
    pub analogies: Vec<Analogy>,
    #[serde(deserialize_with = "text")]
    pub sim_on: String,
    #[serde(deserialize_with = "text")]
    pub sim_off: String,
    #[serde(deserialize_with = "text")]
    pub sim_observations: String,
    #[serde(deserialize_with = "text_list")]
    pub sim_steps: Vec<String>,
    #[serde(deserialize_with = "text_list")]
    pub discussion: Vec<String>,
    #[serde(deserialize_with = "text_list")]
    pub exit_ticket: Vec<String>,
    /// Stored keys this page does not declare.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Day1Answers {
    fn default() -> Self {
        Self::defaults()
    }
}

impl AnswerShape for Day1Answers {
    fn defaults() -> Self {
        Self {
            worksheet: blanks(4),
            analogies: vec![Analogy::default(); 4],
            sim_on: String::new(),
            sim_off: String::new(),
            sim_observations: String::new(),
            sim_steps: blanks(3),
            discussion: blanks(3),
            exit_ticket: blanks(3),
            extra: Map::new(),
        }
    }

    fn normalize(&mut self) {
        pad(&mut self.worksheet, 4);
        pad(&mut self.analogies, 4);
        pad(&mut self.sim_steps, 3);
        pad(&mut self.discussion, 3);
        pad(&mut self.exit_ticket, 3);
    }
}

/// Day 2: the cell cycle and p53.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Day2Answers {
    #[serde(deserialize_with = "text_list")]
    pub brainstorm: Vec<String>,
    #[serde(deserialize_with = "text_list")]
    pub video: Vec<String>,
    #[serde(deserialize_with = "text_list")]
    pub p53: Vec<String>,
    #[serde(deserialize_with = "text_list")]
    pub cycle: Vec<String>,
    #[serde(deserialize_with = "text_list")]
    pub metaphor: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Day2Answers {
    fn default() -> Self {
        Self::defaults()
    }
}

impl AnswerShape for Day2Answers {
    fn defaults() -> Self {
        Self {
            brainstorm: blanks(4),
            video: blanks(4),
            p53: blanks(6),
            cycle: blanks(3),
            metaphor: blanks(2),
            extra: Map::new(),
        }
    }

    fn normalize(&mut self) {
        pad(&mut self.brainstorm, 4);
        pad(&mut self.video, 4);
        pad(&mut self.p53, 6);
        pad(&mut self.cycle, 3);
        pad(&mut self.metaphor, 2);
    }
}

/// Day 3: mutation patterns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Day3Answers {
    #[serde(deserialize_with = "text_list")]
    pub discussion: Vec<String>,
    #[serde(deserialize_with = "text_list")]
    pub patterns: Vec<String>,
    #[serde(deserialize_with = "text_list")]
    pub detective: Vec<String>,
    #[serde(deserialize_with = "text_list")]
    pub experiment: Vec<String>,
    #[serde(deserialize_with = "text_list")]
    pub exit: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Day3Answers {
    fn default() -> Self {
        Self::defaults()
    }
}

impl AnswerShape for Day3Answers {
    fn defaults() -> Self {
        Self {
            discussion: blanks(2),
            patterns: blanks(2),
            detective: blanks(3),
            experiment: blanks(1),
            exit: blanks(1),
            extra: Map::new(),
        }
    }

    fn normalize(&mut self) {
        pad(&mut self.discussion, 2);
        pad(&mut self.patterns, 2);
        pad(&mut self.detective, 3);
        pad(&mut self.experiment, 1);
        pad(&mut self.exit, 1);
    }
}

/// Genes covered by the Day 4 function table, in display order.
pub const DAY4_GENES: [&str; 3] = ["TP53", "MYC", "EGFR"];

/// One row of the Day 4 gene function table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneFunction {
    #[serde(rename = "fn", deserialize_with = "text")]
    pub function: String,
    #[serde(deserialize_with = "text")]
    pub why: String,
}

/// Day 4: oncogenes and tumor suppressors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Day4Answers {
    #[serde(deserialize_with = "text")]
    pub warmup: String,
    #[serde(deserialize_with = "rows")]
    pub functions: Vec<GeneFunction>,
    #[serde(deserialize_with = "text_list")]
    pub differences: Vec<String>,
    #[serde(deserialize_with = "text")]
    pub story: String,
    #[serde(deserialize_with = "text")]
    pub reflection: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Day4Answers {
    fn default() -> Self {
        Self::defaults()
    }
}

impl AnswerShape for Day4Answers {
    fn defaults() -> Self {
        Self {
            warmup: String::new(),
            functions: vec![GeneFunction::default(); DAY4_GENES.len()],
            differences: blanks(3),
            story: String::new(),
            reflection: String::new(),
            extra: Map::new(),
        }
    }

    fn normalize(&mut self) {
        pad(&mut self.functions, DAY4_GENES.len());
        pad(&mut self.differences, 3);
    }
}

/// Day 5: poster session and reflections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Day5Answers {
    #[serde(deserialize_with = "text")]
    pub warmup: String,
    #[serde(deserialize_with = "text_list")]
    pub poster: Vec<String>,
    #[serde(deserialize_with = "text_list")]
    pub peer: Vec<String>,
    #[serde(deserialize_with = "text_list")]
    pub reflections: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Day5Answers {
    fn default() -> Self {
        Self::defaults()
    }
}

impl AnswerShape for Day5Answers {
    fn defaults() -> Self {
        Self {
            warmup: String::new(),
            poster: blanks(3),
            peer: blanks(2),
            reflections: blanks(2),
            extra: Map::new(),
        }
    }

    fn normalize(&mut self) {
        pad(&mut self.poster, 3);
        pad(&mut self.peer, 2);
        pad(&mut self.reflections, 2);
    }
}
